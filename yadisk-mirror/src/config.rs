use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use reqwest::Client;
use yadisk_core::{DEFAULT_BASE_URL, PublicClient};

use crate::transfer::Downloader;
use crate::walker::{MirrorOptions, MirrorWalker};

const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_DELAY_SECS: &str = "0.1";
const DEFAULT_TIMEOUT_SECS: &str = "60";
const DEFAULT_CONNECT_TIMEOUT_SECS: &str = "30";

#[derive(Parser, Debug, Clone)]
#[command(name = "yadisk-mirror", version, about = "Yandex.Disk public folder downloader.")]
pub struct CliArgs {
    /// Public share link or key of the folder (or single file) to mirror
    pub url: String,

    /// Local output directory
    #[arg(
        short = 'o',
        value_name = "PATH",
        env = "YADISK_OUTPUT",
        default_value = DEFAULT_OUTPUT_DIR
    )]
    pub output_path: PathBuf,

    /// Check local files and report, but never download
    #[arg(long = "verify_only", visible_alias = "verify-only")]
    pub verify_only: bool,

    /// Compare MD5 checksums in addition to sizes
    #[arg(long = "verify_checksums", visible_alias = "verify-checksums")]
    pub verify_checksums: bool,

    /// Seconds to wait before every listing request
    #[arg(
        long,
        value_name = "SECONDS",
        env = "YADISK_DELAY",
        default_value = DEFAULT_DELAY_SECS,
        value_parser = parse_seconds
    )]
    pub delay: Duration,

    /// Number of entries to request per listing page
    #[arg(
        long,
        value_name = "N",
        env = "YADISK_PAGE_SIZE",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub page_size: Option<u32>,

    /// Timeout for a single listing request, 0 disables it
    #[arg(
        long,
        value_name = "SECONDS",
        env = "YADISK_TIMEOUT",
        default_value = DEFAULT_TIMEOUT_SECS,
        value_parser = parse_seconds
    )]
    pub timeout: Duration,

    /// Timeout for establishing any connection, 0 disables it
    #[arg(
        long,
        value_name = "SECONDS",
        env = "YADISK_CONNECT_TIMEOUT",
        default_value = DEFAULT_CONNECT_TIMEOUT_SECS,
        value_parser = parse_seconds
    )]
    pub connect_timeout: Duration,

    /// Base URL of the Yandex Disk REST API
    #[arg(
        long,
        value_name = "URL",
        env = "YADISK_API_BASE_URL",
        default_value = DEFAULT_BASE_URL
    )]
    pub api_base_url: String,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    pub fn mirror_options(&self) -> MirrorOptions {
        MirrorOptions {
            target_root: self.output_path.clone(),
            verify_only: self.verify_only,
            verify_checksums: self.verify_checksums,
            delay: self.delay,
            page_size: self.page_size,
        }
    }

    pub fn build_walker(&self) -> anyhow::Result<MirrorWalker> {
        let mut builder = Client::builder();
        if let Some(timeout) = non_zero(self.connect_timeout) {
            builder = builder.connect_timeout(timeout);
        }
        let http = builder.build().context("failed to build http client")?;
        let client = PublicClient::with_http(http.clone(), &self.api_base_url)
            .with_context(|| format!("invalid api base url: {}", self.api_base_url))?
            .with_request_timeout(non_zero(self.timeout));
        Ok(MirrorWalker::new(
            client,
            Downloader::with_http(http),
            self.mirror_options(),
        ))
    }
}

fn non_zero(duration: Duration) -> Option<Duration> {
    (!duration.is_zero()).then_some(duration)
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("`{value}` is not a number of seconds"))?;
    Duration::try_from_secs_f64(secs)
        .map_err(|_| format!("`{value}` must be a finite, non-negative number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("yadisk-mirror").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults_match_documented_values() {
        let args = parse(&["https://disk.yandex.ru/d/abc"]);
        assert_eq!(args.url, "https://disk.yandex.ru/d/abc");
        assert_eq!(args.output_path, PathBuf::from("output"));
        assert!(!args.verify_only);
        assert!(!args.verify_checksums);
        assert_eq!(args.delay, Duration::from_millis(100));
        assert_eq!(args.page_size, None);
        assert_eq!(args.timeout, Duration::from_secs(60));
        assert_eq!(args.api_base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn accepts_underscore_and_dash_flags() {
        let args = parse(&["key", "-o", "mirror", "--verify_only", "--verify-checksums"]);
        assert_eq!(args.output_path, PathBuf::from("mirror"));
        assert!(args.verify_only);
        assert!(args.verify_checksums);

        let options = args.mirror_options();
        assert_eq!(options.target_root, PathBuf::from("mirror"));
        assert!(options.verify_only);
        assert!(options.verify_checksums);
    }

    #[test]
    fn delay_accepts_fractional_seconds() {
        let args = parse(&["key", "--delay", "1.5"]);
        assert_eq!(args.delay, Duration::from_millis(1500));
    }

    #[test]
    fn rejects_negative_delay() {
        let result = CliArgs::try_parse_from(["yadisk-mirror", "key", "--delay", "-1"]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_zero_page_size() {
        let result = CliArgs::try_parse_from(["yadisk-mirror", "key", "--page-size", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn zero_timeout_disables_it() {
        assert_eq!(non_zero(Duration::ZERO), None);
        assert_eq!(
            non_zero(Duration::from_secs(5)),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn url_is_required() {
        assert!(CliArgs::try_parse_from(["yadisk-mirror"]).is_err());
    }
}
