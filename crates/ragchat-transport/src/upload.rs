// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Knowledge-base upload: one multipart `POST` with a single `file` field.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use ragchat_config::ServerConfig;
use reqwest::multipart::{Form, Part};
use thiserror::Error;
use tracing::{debug, info};

/// Form field the upload endpoint reads the document from.
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("only plain-text (.txt) documents can be uploaded, got '{0}'")]
    UnsupportedFileType(String),

    #[error("could not read '{0}': {1}")]
    Io(String, #[source] std::io::Error),

    #[error("upload request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upload rejected with status {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },
}

/// Client for the document upload endpoint.  Cheap to clone.
#[derive(Clone)]
pub struct UploadClient {
    client: reqwest::Client,
    upload_url: String,
}

impl UploadClient {
    pub fn new(cfg: &ServerConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if cfg.connect_timeout_secs > 0 {
            builder = builder.connect_timeout(Duration::from_secs(cfg.connect_timeout_secs));
        }
        Ok(Self {
            client: builder.build().context("building HTTP client")?,
            upload_url: cfg.upload_url(),
        })
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    /// Upload the document at `path`.  Returns the server's response text.
    pub async fn upload(&self, path: &Path) -> Result<String, UploadError> {
        ensure_plain_text(path)?;

        let shown = path.display().to_string();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| UploadError::Io(shown.clone(), e))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.txt".into());

        debug!(url = %self.upload_url, file = %shown, bytes = bytes.len(), "uploading document");

        let part = Part::bytes(bytes).file_name(file_name).mime_str("text/plain")?;
        let form = Form::new().part(UPLOAD_FIELD, part);
        let resp = self.client.post(&self.upload_url).multipart(form).send().await?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(UploadError::Status { status, body: body.trim().to_string() });
        }
        info!(file = %shown, %status, "document uploaded");
        Ok(body)
    }
}

/// Accept only `.txt` files (case-insensitive extension check).
pub fn ensure_plain_text(path: &Path) -> Result<(), UploadError> {
    let is_txt = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
    if is_txt {
        Ok(())
    } else {
        Err(UploadError::UnsupportedFileType(path.display().to_string()))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn txt_extension_is_accepted_case_insensitively() {
        assert!(ensure_plain_text(Path::new("notes.txt")).is_ok());
        assert!(ensure_plain_text(Path::new("/tmp/NOTES.TXT")).is_ok());
    }

    #[test]
    fn other_extensions_are_rejected() {
        for p in ["paper.pdf", "README", "archive.txt.gz"] {
            let err = ensure_plain_text(Path::new(p)).unwrap_err();
            assert!(matches!(err, UploadError::UnsupportedFileType(_)), "{p}");
        }
    }

    #[tokio::test]
    async fn missing_file_reports_io_error() {
        let client = UploadClient::new(&ServerConfig::default()).unwrap();
        let err = client
            .upload(Path::new("/tmp/ragchat_definitely_missing.txt"))
            .await
            .unwrap_err();
        match err {
            UploadError::Io(shown, _) => assert_eq!(shown, "/tmp/ragchat_definitely_missing.txt"),
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_type_never_touches_the_network() {
        let cfg = ServerConfig { base_url: "http://127.0.0.1:1".into(), ..ServerConfig::default() };
        let client = UploadClient::new(&cfg).unwrap();
        let err = client.upload(Path::new("slides.pptx")).await.unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedFileType(_)));
    }

    #[test]
    fn upload_url_comes_from_config() {
        let client = UploadClient::new(&ServerConfig::default()).unwrap();
        assert_eq!(client.upload_url(), "http://localhost:8080/upload");
    }
}
