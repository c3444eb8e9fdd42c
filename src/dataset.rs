//! First-run bootstrap of the data file.
//!
//! The backend starts from a local data file. If that file does not exist yet, the public Nobel
//! Prize dataset is downloaded and written to it as-is, which only happens once, every later
//! start reads the local file.
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::model::Prizes;
use crate::store::json::write_json_atomic;
use crate::{NobelError, Result};

/// Where the initial prize collection is downloaded from
pub const DEFAULT_DATASET_URL: &str = "https://api.nobelprize.org/v1/prize.json";

/// makes sure a data file exists at `path`, downloading it from `url` if it is missing.
///
/// Returns `true` if the dataset was downloaded, `false` if the file was already there.
///
/// # Errors
/// returns [`NobelError::Upstream`] if the dataset could not be fetched, or if the body is not
/// a prize collection (a JSON object with a `prizes` list). No file is written in that case, so
/// the next call tries the download again.
pub async fn ensure_dataset(path: &Path, url: &str) -> Result<bool> {
    if path.is_file() {
        return Ok(false);
    }

    info!("{} not found, downloading it from {}", path.display(), url);
    let dataset = fetch(url).await.map_err(|e| {
        warn!("dataset download failed: {}", e);
        NobelError::Upstream(format!("could not fetch the dataset from {}: {}", url, e))
    })?;

    // the document is stored verbatim, but only once it holds a usable collection
    let prizes = Prizes::deserialize(&dataset).map_err(|e| {
        warn!("the dataset at {} is not a prize collection: {}", url, e);
        NobelError::Upstream(format!("the dataset from {} is not a prize collection: {}", url, e))
    })?;

    write_json_atomic(path, &dataset)?;
    info!("saved {} prizes to {}", prizes.prizes.len(), path.display());
    Ok(true)
}

async fn fetch(url: &str) -> std::result::Result<serde_json::Value, reqwest::Error> {
    reqwest::get(url)
        .await?
        .error_for_status()?
        .json::<serde_json::Value>()
        .await
}
