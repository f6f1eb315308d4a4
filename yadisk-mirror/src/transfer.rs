use std::io;
use std::path::Path;

use futures_util::StreamExt;
use md5::Context;
use reqwest::Client;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use url::Url;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result of one completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub bytes: u64,
    pub md5: String,
    /// `Some(false)` when an expected digest was supplied and did not match.
    pub checksum_ok: Option<bool>,
}

#[derive(Clone)]
pub struct Downloader {
    http: Client,
}

impl Downloader {
    pub fn new() -> Self {
        Self::with_http(Client::new())
    }

    pub fn with_http(http: Client) -> Self {
        Self { http }
    }

    /// Streams `url` into `target`, truncating any existing file.
    ///
    /// The body is written chunk by chunk and never buffered whole. An
    /// interrupted transfer leaves a short file behind, which the next size
    /// check flags for another download.
    pub async fn download(
        &self,
        url: &Url,
        target: &Path,
        expected_md5: Option<&str>,
    ) -> Result<DownloadReport, TransferError> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(target).await?;
        let mut stream = response.bytes_stream();
        let mut md5 = Context::new();
        let mut bytes = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            md5.consume(&chunk);
            bytes += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;

        let md5 = format!("{:x}", md5.compute());
        let checksum_ok = expected_md5.map(|expected| md5.eq_ignore_ascii_case(expected));
        Ok(DownloadReport {
            bytes,
            md5,
            checksum_ok,
        })
    }
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn url(server: &MockServer, path: &str) -> Url {
        Url::parse(&format!("{}{path}", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn downloads_file_to_target_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/file"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello"))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let target = dir.path().join("nested/out.txt");
        let report = Downloader::new()
            .download(&url(&server, "/file"), &target, None)
            .await
            .unwrap();

        assert_eq!(std::fs::read(target).unwrap(), b"hello");
        assert_eq!(report.bytes, 5);
        assert_eq!(report.md5, "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(report.checksum_ok, None);
    }

    #[tokio::test]
    async fn overwrites_existing_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/file"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new"))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let target = dir.path().join("out.txt");
        std::fs::write(&target, b"much longer stale content").unwrap();

        Downloader::new()
            .download(&url(&server, "/file"), &target, None)
            .await
            .unwrap();

        assert_eq!(std::fs::read(target).unwrap(), b"new");
    }

    #[tokio::test]
    async fn reports_md5_mismatch_without_failing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/file"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello"))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let target = dir.path().join("bad.txt");
        let report = Downloader::new()
            .download(&url(&server, "/file"), &target, Some("deadbeef"))
            .await
            .unwrap();

        assert_eq!(report.checksum_ok, Some(false));
        assert!(target.exists());
    }

    #[tokio::test]
    async fn http_error_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let target = dir.path().join("gone.txt");
        let err = Downloader::new()
            .download(&url(&server, "/gone"), &target, None)
            .await
            .expect_err("expected http error");

        assert!(matches!(err, TransferError::Request(_)));
        assert!(!target.exists());
    }
}
