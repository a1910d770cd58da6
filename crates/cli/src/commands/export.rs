//! Order export to CSV files.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use modern_shop_admin::services::{OrderService, ServiceError};
use modern_shop_core::docstore::SharedDocumentStore;
use modern_shop_core::export::orders_workbook;
use thiserror::Error;

use super::ConnectError;

/// Errors that can occur while exporting.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("`--from` ({from}) is after `--to` ({to})")]
    InvertedRange { from: NaiveDate, to: NaiveDate },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Export orders created between `from` and `to` into `out`.
pub async fn orders(from: NaiveDate, to: NaiveDate, out: &Path) -> Result<(), ExportError> {
    if from > to {
        return Err(ExportError::InvertedRange { from, to });
    }
    let documents = super::connect_documents().await?;
    for path in write_orders(documents, from, to, out).await? {
        tracing::info!(path = %path.display(), "Wrote sheet");
    }
    Ok(())
}

/// Write the orders sheet and the items sheet; returns the file paths.
pub async fn write_orders(
    documents: SharedDocumentStore,
    from: NaiveDate,
    to: NaiveDate,
    out: &Path,
) -> Result<Vec<PathBuf>, ExportError> {
    let orders = OrderService::new(documents).all().await?;
    let workbook = orders_workbook(orders, from, to);
    tracing::info!(orders = workbook.orders.rows.len(), "Selected orders");

    tokio::fs::create_dir_all(out)
        .await
        .map_err(|source| ExportError::Write {
            path: out.display().to_string(),
            source,
        })?;

    let mut written = Vec::with_capacity(2);
    for sheet in [workbook.orders, workbook.items] {
        let path = out.join(sheet.file_name(from, to));
        tokio::fs::write(&path, sheet.to_csv())
            .await
            .map_err(|source| ExportError::Write {
                path: path.display().to_string(),
                source,
            })?;
        written.push(path);
    }
    Ok(written)
}
