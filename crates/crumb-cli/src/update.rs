//! Download the Open Cookie Database.

use std::fs;
use std::path::Path;
use std::time::Duration;

use crumb_db::load_database_text;

/// Download the CSV from `url`, check that it parses, and write it to `output`.
/// Returns the number of usable entries.
pub fn update_database(url: &str, output: &Path) -> Result<usize, String> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;
    let text = runtime.block_on(download(url))?;

    let entries = load_database_text(&text).len();
    if entries == 0 {
        return Err(format!("Downloaded database from '{}' contains no entries", url));
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create '{}': {}", parent.display(), e))?;
    }
    fs::write(output, &text).map_err(|e| format!("Failed to write '{}': {}", output.display(), e))?;

    log::info!("Wrote {} entries to {}", entries, output.display());
    Ok(entries)
}

async fn download(url: &str) -> Result<String, String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

    log::info!("Downloading cookie database from {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| format!("Failed to download '{}': {}", url, e))?
        .error_for_status()
        .map_err(|e| format!("Failed to download '{}': {}", url, e))?;

    response
        .text()
        .await
        .map_err(|e| format!("Failed to read response from '{}': {}", url, e))
}
