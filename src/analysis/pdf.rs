//! PDF page rasterization via poppler command-line tools.
//!
//! Uses `pdfinfo` to determine the page count and `pdftoppm` to render
//! pages to PNG images in a working directory.

use crate::error::{Result, SvarError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Query the number of pages in a PDF using pdfinfo.
pub async fn page_count(path: &Path) -> Result<u32> {
    let result = Command::new("pdfinfo").arg(path).output().await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SvarError::ToolNotFound("pdfinfo".into()));
        }
        Err(e) => {
            return Err(SvarError::Analysis(format!("pdfinfo failed to run: {e}")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SvarError::Analysis(format!(
            "pdfinfo could not read the file: {}",
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|rest| rest.trim().parse::<u32>().ok())
        .ok_or_else(|| SvarError::Analysis("could not determine page count".into()))
}

/// Render pages 1..=max_pages of a PDF to PNG files, in page order.
///
/// A PDF shorter than `max_pages` simply yields fewer images. Returns the
/// rendered file paths sorted by page number.
pub async fn render_pages(
    path: &Path,
    max_pages: u32,
    dpi: u32,
    work_dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(work_dir)?;
    let prefix = work_dir.join("page");

    let result = Command::new("pdftoppm")
        .arg("-png")
        .arg("-r").arg(dpi.to_string())
        .arg("-f").arg("1")
        .arg("-l").arg(max_pages.to_string())
        .arg(path)
        .arg(&prefix)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SvarError::ToolNotFound("pdftoppm".into()));
        }
        Err(e) => {
            return Err(SvarError::Analysis(format!("pdftoppm failed to run: {e}")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SvarError::Analysis(format!(
            "page rasterization failed (corrupt or password-protected PDF?): {}",
            stderr.trim()
        )));
    }

    let mut pages: Vec<(u32, PathBuf)> = std::fs::read_dir(work_dir)?
        .flatten()
        .filter_map(|entry| {
            let p = entry.path();
            page_number(&p).map(|n| (n, p))
        })
        .collect();
    pages.sort_by_key(|(n, _)| *n);

    debug!("Rasterized {} page(s) from {}", pages.len(), path.display());
    Ok(pages.into_iter().map(|(_, p)| p).collect())
}

/// Extract the page number from a pdftoppm output filename
/// (`page-1.png`, `page-07.png`, ...).
fn page_number(path: &Path) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(".png")?;
    let digits = stem.rsplit('-').next()?;
    digits.parse::<u32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_number_parsing() {
        assert_eq!(page_number(Path::new("/tmp/x/page-1.png")), Some(1));
        assert_eq!(page_number(Path::new("/tmp/x/page-07.png")), Some(7));
        assert_eq!(page_number(Path::new("/tmp/x/page-12.png")), Some(12));
        assert_eq!(page_number(Path::new("/tmp/x/page-1.jpg")), None);
        assert_eq!(page_number(Path::new("/tmp/x/notes.png")), None);
    }

    #[test]
    fn test_page_ordering_is_numeric_not_lexicographic() {
        let mut pages: Vec<(u32, PathBuf)> = ["page-10.png", "page-2.png", "page-1.png"]
            .iter()
            .map(|n| {
                let p = PathBuf::from(format!("/tmp/x/{}", n));
                (page_number(&p).unwrap(), p)
            })
            .collect();
        pages.sort_by_key(|(n, _)| *n);

        let order: Vec<u32> = pages.iter().map(|(n, _)| *n).collect();
        assert_eq!(order, vec![1, 2, 10]);
    }
}
