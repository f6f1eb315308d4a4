//! Depth-first mirroring of a public share into a local directory tree.
//!
//! Every directory is listed page by page; each file entry is checked
//! against the local copy and downloaded when it is not satisfied, and each
//! subdirectory is walked completely before the next sibling is handled.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};
use yadisk_core::{ApiErrorClass, Listing, PublicApiError, PublicClient, PublicFile, RemoteEntry};

use crate::check::{FileCheck, check_local_file};
use crate::paths::{PathError, REMOTE_ROOT, join_remote, local_path_for};
use crate::transfer::{Downloader, TransferError};

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("listing {path} failed: {source}")]
    Listing {
        path: String,
        #[source]
        source: PublicApiError,
    },
    #[error("downloading {path} failed: {source}")]
    Transfer {
        path: String,
        #[source]
        source: TransferError,
    },
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Path(#[from] PathError),
}

impl MirrorError {
    /// How the remote API failed, when the walk stopped on a listing request.
    pub fn api_class(&self) -> Option<ApiErrorClass> {
        match self {
            MirrorError::Listing { source, .. } => source.classification(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MirrorOptions {
    pub target_root: PathBuf,
    pub verify_only: bool,
    pub verify_checksums: bool,
    /// Pause before every listing request.
    pub delay: Duration,
    /// Requested listing page size; `None` leaves it to the server.
    pub page_size: Option<u32>,
}

impl MirrorOptions {
    pub fn new(target_root: impl Into<PathBuf>) -> Self {
        Self {
            target_root: target_root.into(),
            verify_only: false,
            verify_checksums: false,
            delay: Duration::ZERO,
            page_size: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorStats {
    pub directories: u64,
    pub pages: u64,
    pub satisfied: u64,
    pub downloaded: u64,
    /// Files that needed a download but were left alone in verify-only mode.
    pub pending: u64,
    pub mismatched: u64,
    /// Downloads whose content did not match the advertised MD5.
    pub corrupt_downloads: u64,
    pub unavailable: u64,
    pub structural_errors: u64,
}

pub struct MirrorWalker {
    client: PublicClient,
    downloader: Downloader,
    options: MirrorOptions,
}

impl MirrorWalker {
    pub fn new(client: PublicClient, downloader: Downloader, options: MirrorOptions) -> Self {
        Self {
            client,
            downloader,
            options,
        }
    }

    pub fn options(&self) -> &MirrorOptions {
        &self.options
    }

    /// Mirrors the whole share identified by `public_key`.
    ///
    /// Malformed listings only abandon their own subtree. Transport and
    /// filesystem failures end the walk with an error.
    pub async fn run(&self, public_key: &str) -> Result<MirrorStats, MirrorError> {
        let mut stats = MirrorStats::default();
        self.visit_directory(public_key, REMOTE_ROOT, &mut stats).await?;
        info!(
            directories = stats.directories,
            pages = stats.pages,
            satisfied = stats.satisfied,
            downloaded = stats.downloaded,
            pending = stats.pending,
            mismatched = stats.mismatched,
            corrupt_downloads = stats.corrupt_downloads,
            unavailable = stats.unavailable,
            structural_errors = stats.structural_errors,
            "mirror finished"
        );
        Ok(stats)
    }

    async fn visit_directory(
        &self,
        public_key: &str,
        remote_path: &str,
        stats: &mut MirrorStats,
    ) -> Result<(), MirrorError> {
        let local_dir = local_path_for(&self.options.target_root, remote_path)?;
        stats.directories += 1;

        let mut offset = 0u32;
        loop {
            if !self.options.delay.is_zero() {
                tokio::time::sleep(self.options.delay).await;
            }
            info!(path = remote_path, "getting");
            debug!(path = remote_path, offset, "listing page");
            tokio::fs::create_dir_all(&local_dir)
                .await
                .map_err(|source| MirrorError::Io {
                    path: local_dir.clone(),
                    source,
                })?;

            let listing = self
                .client
                .list(public_key, remote_path, offset, self.options.page_size)
                .await
                .map_err(|source| MirrorError::Listing {
                    path: remote_path.to_string(),
                    source,
                })?;
            stats.pages += 1;

            let page = match listing {
                Listing::File(file) => {
                    // The path names a file itself: handle it alone, no paging.
                    return self.visit_file_entry(remote_path, &file, stats).await;
                }
                Listing::Directory(page) => page,
                Listing::Malformed(payload) => {
                    stats.structural_errors += 1;
                    let dump = serde_json::to_string_pretty(&payload)
                        .unwrap_or_else(|_| payload.to_string());
                    error!(
                        path = remote_path,
                        offset,
                        "object should be a directory, but it is not:\n{dump}"
                    );
                    return Ok(());
                }
            };

            for entry in &page.items {
                match entry {
                    RemoteEntry::File(file) => {
                        self.visit_file_entry(remote_path, file, stats).await?;
                    }
                    RemoteEntry::Directory { name } => match join_remote(remote_path, name) {
                        Ok(child) => {
                            Box::pin(self.visit_directory(public_key, &child, stats)).await?;
                        }
                        Err(err) => {
                            stats.structural_errors += 1;
                            error!(path = remote_path, "skipping directory entry: {err}");
                        }
                    },
                    RemoteEntry::Unavailable { name } => {
                        stats.unavailable += 1;
                        warn!(
                            path = remote_path,
                            name = name.as_str(),
                            "file has no download link, skipping"
                        );
                    }
                }
            }

            match page.next_offset() {
                Some(next) => offset = next,
                None => return Ok(()),
            }
        }
    }

    async fn visit_file_entry(
        &self,
        parent: &str,
        file: &PublicFile,
        stats: &mut MirrorStats,
    ) -> Result<(), MirrorError> {
        let remote_path = match join_remote(parent, &file.name) {
            Ok(path) => path,
            Err(err) => {
                stats.structural_errors += 1;
                error!(path = parent, "skipping file entry: {err}");
                return Ok(());
            }
        };
        let local_path = local_path_for(&self.options.target_root, &remote_path)?;
        self.process_file(&remote_path, &local_path, file, stats)
            .await
    }

    async fn process_file(
        &self,
        remote_path: &str,
        local_path: &Path,
        file: &PublicFile,
        stats: &mut MirrorStats,
    ) -> Result<(), MirrorError> {
        info!(path = remote_path, "processing");
        let check = check_local_file(
            local_path,
            file.size,
            &file.md5,
            self.options.verify_checksums,
        )
        .await
        .map_err(|source| MirrorError::Io {
            path: local_path.to_path_buf(),
            source,
        })?;

        match &check {
            FileCheck::Satisfied => {
                stats.satisfied += 1;
                info!(path = remote_path, "already downloaded, checks passed");
                return Ok(());
            }
            FileCheck::Missing => debug!(path = remote_path, "missing in target dir"),
            FileCheck::SizeMismatch { actual } => {
                stats.mismatched += 1;
                warn!(
                    path = remote_path,
                    expected = file.size,
                    actual,
                    "size mismatch"
                );
            }
            FileCheck::ChecksumMismatch { actual } => {
                stats.mismatched += 1;
                warn!(
                    path = remote_path,
                    expected = file.md5.as_str(),
                    actual = actual.as_str(),
                    "checksum mismatch"
                );
            }
        }

        if self.options.verify_only {
            stats.pending += 1;
            info!(path = remote_path, "verify only, not downloading");
            return Ok(());
        }

        info!(path = remote_path, size = file.size, "downloading");
        let expected_md5 = self
            .options
            .verify_checksums
            .then_some(file.md5.as_str());
        let report = self
            .downloader
            .download(&file.download_url, local_path, expected_md5)
            .await
            .map_err(|source| MirrorError::Transfer {
                path: remote_path.to_string(),
                source,
            })?;
        stats.downloaded += 1;

        if report.checksum_ok == Some(false) {
            stats.corrupt_downloads += 1;
            warn!(
                path = remote_path,
                expected = file.md5.as_str(),
                actual = report.md5.as_str(),
                "downloaded content does not match checksum"
            );
        } else if report.bytes != file.size {
            warn!(
                path = remote_path,
                expected = file.size,
                actual = report.bytes,
                "downloaded size differs from listing"
            );
        }
        Ok(())
    }
}
