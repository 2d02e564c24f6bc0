use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use utoipa::ToSchema;

/// One purchasable upsell item, price in minor units
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub image_url: String,
}

/// Raw row as exported by the product sheet. Column names come from the
/// sheet and must survive verbatim.
#[derive(Debug, Deserialize)]
struct SheetRow {
    #[serde(rename = "Timestamp", default)]
    timestamp: String,
    #[serde(rename = "Name", default)]
    submitter: String,
    #[serde(rename = "Item Title")]
    title: String,
    #[serde(rename = "Revshot Markup")]
    markup: String,
    #[serde(rename = "Item Image", default)]
    image: String,
}

#[derive(Debug, Error)]
enum RowError {
    #[error("row has no item title")]
    MissingTitle,
    #[error("unparsable price {0:?}")]
    BadPrice(String),
}

impl SheetRow {
    /// Normalizes a sheet row; the markup column is dollars and becomes
    /// integer cents.
    fn into_item(self) -> Result<CatalogItem, RowError> {
        let name = self.title.trim().to_string();
        if name.is_empty() {
            return Err(RowError::MissingTitle);
        }

        let markup = self.markup.trim();
        let dollars: f64 = markup
            .trim_start_matches('$')
            .parse()
            .map_err(|_| RowError::BadPrice(markup.to_string()))?;

        Ok(CatalogItem {
            id: format!("{}-{}", self.timestamp.trim(), self.submitter.trim()),
            name,
            price: (dollars * 100.0).round() as i64,
            image_url: self.image.trim().to_string(),
        })
    }
}

/// Loads the upsell catalog from a local CSV export of the product sheet.
///
/// Bad rows are logged and skipped so one malformed entry cannot take the
/// whole rack down; a missing or unreadable file degrades to an empty list.
pub struct CatalogReader {
    csv_path: PathBuf,
}

impl CatalogReader {
    pub fn new(csv_path: impl AsRef<Path>) -> Self {
        Self {
            csv_path: csv_path.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self) -> Vec<CatalogItem> {
        let mut reader = match csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.csv_path)
        {
            Ok(reader) => reader,
            Err(e) => {
                warn!(path = %self.csv_path.display(), error = %e, "failed to open catalog source");
                return Vec::new();
            }
        };

        let mut items = Vec::new();
        for (index, record) in reader.deserialize::<SheetRow>().enumerate() {
            match record.map_err(|e| e.to_string()).and_then(|row| {
                row.into_item().map_err(|e| e.to_string())
            }) {
                Ok(item) => items.push(item),
                Err(reason) => warn!(row = index + 1, %reason, "skipping catalog row"),
            }
        }

        if items.is_empty() {
            info!(path = %self.csv_path.display(), "no valid products found in catalog source");
        }
        items
    }
}
