//! Attachment download to local disk.
//!
//! Resolves a destination filename from the response headers or the URL,
//! sanitizes it, and streams the body to the download directory.

use crate::error::{Result, SvarError};
use futures::StreamExt;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Downloads attachment URLs into a fixed directory.
pub struct Downloader {
    http: reqwest::Client,
    dir: PathBuf,
}

impl Downloader {
    /// Create a downloader writing into `dir`, with a per-request timeout.
    pub fn new(dir: &Path, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            dir: dir.to_path_buf(),
        })
    }

    /// Download a file and return its local path.
    pub async fn fetch(&self, url: &str) -> Result<PathBuf> {
        if url.is_empty() {
            return Err(SvarError::InvalidInput(
                "no URL provided for download".to_string(),
            ));
        }

        info!("Downloading {}", url);

        let response = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                SvarError::Download(format!("request timed out fetching {}", url))
            } else {
                SvarError::Download(format!("request to {} failed: {}", url, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SvarError::Download(format!(
                "{} returned status {}",
                url, status
            )));
        }

        // Filename: Content-Disposition, else URL path segment, else fallback
        let mut filename = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition)
            .or_else(|| filename_from_url(url))
            .unwrap_or_else(|| "downloaded_attachment".to_string());

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();

        filename = ensure_extension(filename, &content_type);
        filename = sanitize(&filename);

        std::fs::create_dir_all(&self.dir)?;
        let local_path = self.dir.join(&filename);

        let mut file = tokio::fs::File::create(&local_path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                if e.is_timeout() {
                    SvarError::Download(format!("request timed out fetching {}", url))
                } else {
                    SvarError::Download(format!("transfer from {} failed: {}", url, e))
                }
            })?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        debug!("File downloaded to {}", local_path.display());
        Ok(local_path)
    }
}

/// Extract a filename from a Content-Disposition header value.
fn filename_from_disposition(header: &str) -> Option<String> {
    let re = Regex::new(r#"filename="?([^";]+)"?"#).ok()?;
    re.captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_matches(['"', '\'']).to_string())
        .filter(|s| !s.is_empty())
}

/// Derive a filename from the URL's final path segment.
fn filename_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.next_back()?;
    if segment.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(segment).ok()?;
    Some(decoded.into_owned())
}

/// Append an extension inferred from the Content-Type when the name has
/// none. Unknown types default to PDF.
fn ensure_extension(filename: String, content_type: &str) -> String {
    if filename.contains('.') {
        return filename;
    }

    let ext = if content_type.contains("pdf") {
        ".pdf"
    } else if content_type.contains("openxmlformats-officedocument.wordprocessingml.document") {
        ".docx"
    } else if content_type.contains("plain") {
        ".txt"
    } else {
        ".pdf"
    };

    format!("{}{}", filename, ext)
}

/// Reduce a filename to a safe character subset.
fn sanitize(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "sanitized_download.pdf".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_from_disposition() {
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="report.pdf""#),
            Some("report.pdf".to_string())
        );
        assert_eq!(
            filename_from_disposition("attachment; filename=plain.pdf"),
            Some("plain.pdf".to_string())
        );
        assert_eq!(filename_from_disposition("attachment"), None);
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            filename_from_url("https://files.example/a/b/q2%20results.pdf?sig=abc"),
            Some("q2 results.pdf".to_string())
        );
        assert_eq!(filename_from_url("https://files.example/"), None);
    }

    #[test]
    fn test_extension_inference() {
        assert_eq!(ensure_extension("report".into(), "application/pdf"), "report.pdf");
        assert_eq!(
            ensure_extension(
                "minutes".into(),
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            ),
            "minutes.docx"
        );
        assert_eq!(ensure_extension("notes".into(), "text/plain"), "notes.txt");
        // Unknown types default to PDF
        assert_eq!(ensure_extension("blob".into(), "application/octet-stream"), "blob.pdf");
        // Existing extension untouched
        assert_eq!(ensure_extension("done.txt".into(), "application/pdf"), "done.txt");
    }

    #[test]
    fn test_sanitize_strips_unsafe_characters() {
        assert_eq!(sanitize("q2 results (final).pdf"), "q2resultsfinal.pdf");
        assert_eq!(sanitize("../../etc/passwd"), "....etcpasswd");
        assert_eq!(sanitize("///"), "sanitized_download.pdf");
        assert_eq!(sanitize("report-v2_final.pdf"), "report-v2_final.pdf");
    }

    #[tokio::test]
    async fn test_fetch_rejects_empty_url() {
        let tmp = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(tmp.path(), Duration::from_secs(5)).unwrap();
        let err = downloader.fetch("").await.unwrap_err();
        assert!(matches!(err, SvarError::InvalidInput(_)));
    }
}
