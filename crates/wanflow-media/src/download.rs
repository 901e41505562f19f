//! Plain HTTP download with atomic-write semantics: a 60s timeout, bytes
//! written on 200 and a failure otherwise, with a write-to-`.part` then
//! rename so a crash mid-download never leaves `dest` populated.

use crate::error::{MediaError, MediaResult};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub async fn download(client: &reqwest::Client, url: &str, dest: &Path) -> MediaResult<()> {
    let response = client
        .get(url)
        .timeout(Duration::from_secs(60))
        .send()
        .await
        .map_err(|e| MediaError::download_failed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(MediaError::download_failed(format!(
            "non-200 response: {}",
            response.status()
        )));
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    let part_path = dest.with_extension("part");
    let bytes = response
        .bytes()
        .await
        .map_err(|e| MediaError::download_failed(e.to_string()))?;

    {
        let mut file = fs::File::create(&part_path).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
    }
    fs::rename(&part_path, dest).await?;

    tracing::debug!(url, bytes = bytes.len(), dest = %dest.display(), "downloaded media");
    Ok(())
}
