//! HTTP downloads with progress tracking
//!
//! Streams a resource into a file or an in-memory buffer. The saved file
//! name comes from the `Content-Disposition` header when present, otherwise
//! from the last path segment of the final (post-redirect) URL.
//!
//! # Example
//!
//! ```no_run
//! use cpo_core::RuntimeConfig;
//! use cpo_deps::download::Downloader;
//!
//! # async fn run() -> cpo_deps::Result<()> {
//! let downloader = Downloader::new(&RuntimeConfig::default())?.with_progress(false);
//! let path = downloader
//!     .download_to_file("https://example.com/tool.tar.gz", Default::default(), None, None)
//!     .await?;
//! println!("Downloaded to: {:?}", path);
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use cpo_core::RuntimeConfig;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION};
use reqwest::Response;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Default chunk size for buffered writes (1MB)
pub const DOWNLOAD_CHUNK_SIZE: usize = 1024 * 1024;

/// File name used when neither the headers nor the URL provide one
const FALLBACK_FILE_NAME: &str = "download";

/// Basic authentication credentials
#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: Option<String>,
}

/// Streaming HTTP downloader
#[derive(Debug, Clone)]
pub struct Downloader {
    /// HTTP client
    client: reqwest::Client,

    /// Enable progress bars
    show_progress: bool,

    /// Write buffer size
    chunk_size: usize,

    /// Timeout for API requests (downloads use the client timeout)
    api_timeout: Duration,
}

impl Downloader {
    /// Create a downloader from the runtime configuration
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.network.user_agent)
            .timeout(Duration::from_secs(config.network.download_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            show_progress: config.display.progress,
            chunk_size: config.network.download_chunk_size.max(1),
            api_timeout: Duration::from_secs(config.network.http_timeout_secs),
        })
    }

    /// Enable or disable progress bars
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Underlying HTTP client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Timeout applied to API requests
    pub fn api_timeout(&self) -> Duration {
        self.api_timeout
    }

    /// Download `url` into `target_dir` (the OS temp directory when omitted)
    ///
    /// Returns the path of the saved file.
    pub async fn download_to_file(
        &self,
        url: &str,
        headers: HeaderMap,
        auth: Option<&BasicAuth>,
        target_dir: Option<&Path>,
    ) -> Result<PathBuf> {
        let mut request = self.client.get(url).headers(headers);
        if let Some(auth) = auth {
            request = request.basic_auth(&auth.username, auth.password.as_ref());
        }

        let response = Self::check_status(url, request.send().await?)?;
        let file_name = response_file_name(&response);

        let target_dir = target_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir);
        tokio::fs::create_dir_all(&target_dir).await?;

        let file_path = target_dir.join(&file_name);
        let partial_path = target_dir.join(format!("{}.part", file_name));

        debug!("Downloading {} to {:?}", url, file_path);

        let progress = self.progress_bar(response.content_length(), &file_name, false);
        let written = self.write_body(response, &partial_path, &progress).await;
        progress.finish_and_clear();

        if let Err(err) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&partial_path).await {
                debug!("Could not remove partial download {:?}: {}", partial_path, cleanup);
            }
            return Err(err);
        }

        tokio::fs::rename(&partial_path, &file_path).await?;
        info!(
            "Downloaded {} ({})",
            file_name,
            human_readable_size(progress.position())
        );

        Ok(file_path)
    }

    /// Stream a response body into `path`
    async fn write_body(
        &self,
        response: Response,
        path: &Path,
        progress: &ProgressBar,
    ) -> Result<()> {
        let file = tokio::fs::File::create(path).await?;
        let mut writer = tokio::io::BufWriter::with_capacity(self.chunk_size, file);

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk: bytes::Bytes = chunk?;
            writer.write_all(&chunk).await?;
            progress.inc(chunk.len() as u64);
        }

        writer.flush().await?;
        Ok(())
    }

    /// Download `url` into `buffer`, returning the derived file name
    pub async fn download_to_buffer(
        &self,
        url: &str,
        buffer: &mut Vec<u8>,
        silent: bool,
    ) -> Result<String> {
        let response = Self::check_status(url, self.client.get(url).send().await?)?;
        let file_name = response_file_name(&response);

        if let Some(length) = response.content_length() {
            buffer.reserve(length.min(self.chunk_size as u64 * 64) as usize);
        }

        let progress = self.progress_bar(response.content_length(), &file_name, silent);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk: bytes::Bytes = chunk?;
            buffer.extend_from_slice(&chunk);
            progress.inc(chunk.len() as u64);
        }
        progress.finish_and_clear();

        debug!("Downloaded {} into memory ({} bytes)", file_name, buffer.len());
        Ok(file_name)
    }

    /// Fetch a small text document such as a mirror's `release.txt`
    pub async fn fetch_text(&self, url: &str, headers: HeaderMap) -> Result<String> {
        let request = self
            .client
            .get(url)
            .headers(headers)
            .timeout(self.api_timeout);
        let response = Self::check_status(url, request.send().await?)?;
        Ok(response.text().await?)
    }

    /// Map non-2xx responses onto [`Error::RemoteApi`]
    fn check_status(url: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(Error::remote_api(url, status.as_u16()))
        }
    }

    fn progress_bar(&self, total: Option<u64>, file_name: &str, silent: bool) -> ProgressBar {
        if silent || !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = match total {
            Some(total) => {
                let pb = ProgressBar::new(total);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
                        .expect("Invalid progress bar template")
                        .progress_chars("#>-"),
                );
                pb
            }
            None => ProgressBar::new_spinner(),
        };
        pb.set_message(format!("Downloading {}", file_name));
        pb
    }
}

fn content_disposition_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)filename="?([^";]+)"?"#).expect("content disposition pattern is valid")
    })
}

/// Extract the file name from a `Content-Disposition` header value
pub fn file_name_from_content_disposition(value: &str) -> Option<String> {
    let captures = content_disposition_pattern().captures(value)?;
    base_name(captures[1].trim())
}

/// Extract the last non-empty path segment of a URL
pub fn file_name_from_url(url: &reqwest::Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .and_then(base_name)
}

fn base_name(name: &str) -> Option<String> {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .map(str::to_string)
}

fn response_file_name(response: &Response) -> String {
    response
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(file_name_from_content_disposition)
        .or_else(|| file_name_from_url(response.url()))
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}

/// Convert bytes to human-readable size
fn human_readable_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}
