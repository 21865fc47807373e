//! Downloading and saving generated images

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Error, Result};

/// Fetch the bytes behind an image URL
pub async fn download_image(http: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| Error::ImageDownloadError(format!("{}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::ImageDownloadError(format!("{}: HTTP {}", url, status)));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::ImageDownloadError(format!("{}: {}", url, e)))?;

    Ok(bytes.to_vec())
}

/// Write image bytes to `path`, creating parent directories
pub fn save_image(data: &[u8], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::ImageSaveError(format!("Failed to create directory: {}", e)))?;
        }
    }

    std::fs::write(path, data)
        .map_err(|e| Error::ImageSaveError(format!("{}: {}", path.display(), e)))?;

    info!(path = %path.display(), bytes = data.len(), "Image saved");
    Ok(())
}

/// Download `url` and save it to `path`
pub async fn download_to(http: &reqwest::Client, url: &str, path: &Path) -> Result<()> {
    let data = download_image(http, url).await?;
    save_image(&data, path)
}

/// Timestamped file name in `base_dir`, keeping the URL's image extension
pub fn default_output_path(base_dir: &Path, url: &str) -> PathBuf {
    use chrono::Local;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let filename = format!("image_{}.{}", timestamp, extension_for(url));

    base_dir.join(filename)
}

fn extension_for(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "jpg",
        Some("webp") => "webp",
        Some("gif") => "gif",
        _ => "png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_output_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = default_output_path(temp_dir.path(), "https://cdn.example.com/out-0.webp");

        assert!(path.to_string_lossy().ends_with(".webp"));
        assert!(path.starts_with(temp_dir.path()));
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("https://x/a.JPEG?sig=1"), "jpg");
        assert_eq!(extension_for("https://x/a.png"), "png");
        assert_eq!(extension_for("https://x/output"), "png");
        assert_eq!(extension_for("not a url"), "png");
    }

    #[test]
    fn test_save_image_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/dir/image.png");

        save_image(b"\x89PNG", &path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"\x89PNG");
    }
}
