//! Binary responses (generated documents).

use std::path::{Path, PathBuf};

use reqwest::Response;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderName};
use tracing::info;

use super::ApiError;

const DEFAULT_FILENAME: &str = "download.bin";

#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl DownloadedFile {
    pub(crate) async fn from_response(
        response: Response,
        fallback_filename: Option<&str>,
    ) -> Result<Self, ApiError> {
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let disposition = header(CONTENT_DISPOSITION);
        let content_type = header(CONTENT_TYPE);

        let filename = disposition
            .as_deref()
            .and_then(filename_from_disposition)
            .or_else(|| fallback_filename.and_then(sanitize_filename))
            .unwrap_or_else(|| DEFAULT_FILENAME.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Decode(format!("cannot read download body: {e}")))?
            .to_vec();

        Ok(Self { filename, content_type, bytes })
    }

    /// Write into `dir` (created if missing) and return the full path.
    pub async fn save_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&self.filename);
        tokio::fs::write(&path, &self.bytes).await?;
        info!(path = %path.display(), bytes = self.bytes.len(), "file saved");
        Ok(path)
    }
}

/// `attachment; filename="report.docx"` → `report.docx`.
fn filename_from_disposition(value: &str) -> Option<String> {
    value.split(';').map(str::trim).find_map(|part| {
        let (key, raw) = part.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        sanitize_filename(raw.trim().trim_matches('"'))
    })
}

/// Last path component only, so a server-supplied name cannot escape the
/// target directory.
fn sanitize_filename(raw: &str) -> Option<String> {
    let name = Path::new(raw).file_name()?.to_str()?.trim();
    (!name.is_empty() && name != "..").then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn disposition_quoted_and_bare() {
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="plan.docx""#).as_deref(),
            Some("plan.docx")
        );
        assert_eq!(
            filename_from_disposition("attachment; filename=deck.pptx").as_deref(),
            Some("deck.pptx")
        );
        assert_eq!(filename_from_disposition("inline"), None);
    }

    #[test]
    fn traversal_is_stripped() {
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename(""), None);
    }

    #[tokio::test]
    async fn save_writes_bytes() {
        let tmp = TempDir::new().unwrap();
        let file = DownloadedFile {
            filename: "report.xlsx".into(),
            content_type: None,
            bytes: vec![1, 2, 3],
        };
        let path = file.save_to(&tmp.path().join("out")).await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), vec![1, 2, 3]);
    }
}
