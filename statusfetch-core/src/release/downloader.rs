//! Release downloader with manual redirect following and progress reporting.
//!
//! Redirects are followed by hand so the hop count can be capped and each
//! hop logged. The response body is buffered in memory; the archive never
//! touches disk before extraction.

use futures::StreamExt;
use reqwest::header::LOCATION;
use reqwest::StatusCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::config::InstallerConfig;
use crate::error::{InstallError, Result};

/// Upper bound for pre-allocating the body buffer from Content-Length.
const MAX_PREALLOC_BYTES: u64 = 64 * 1024 * 1024;

// ============================================================================
// URL Validation
// ============================================================================

/// Parses a download URL and checks it uses HTTP(S) and names a host.
fn validate_url(url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str).map_err(|e| InstallError::InvalidUrl {
        url: url_str.to_string(),
        reason: e.to_string(),
    })?;

    check_scheme(url)
}

fn check_scheme(url: Url) -> Result<Url> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(InstallError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    if url.host_str().is_none() {
        return Err(InstallError::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}

// ============================================================================
// Download Progress
// ============================================================================

/// Progress information during a download.
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    /// Bytes downloaded so far.
    pub bytes_downloaded: u64,
    /// Total bytes expected (if known from Content-Length header).
    pub total_bytes: Option<u64>,
    /// Progress percentage (0.0 to 100.0), or None if total is unknown.
    pub percent: Option<f32>,
}

impl DownloadProgress {
    fn new(bytes_downloaded: u64, total_bytes: Option<u64>) -> Self {
        let percent = total_bytes.map(|total| {
            if total > 0 {
                (bytes_downloaded as f32 / total as f32) * 100.0
            } else {
                0.0
            }
        });

        Self {
            bytes_downloaded,
            total_bytes,
            percent,
        }
    }
}

// ============================================================================
// Downloader
// ============================================================================

/// HTTP client for release artifacts.
pub struct Downloader {
    client: reqwest::Client,
    timeout: Duration,
    max_redirects: usize,
    cancel: CancellationToken,
}

impl Downloader {
    /// Builds a downloader from the configured timeouts and redirect cap.
    pub fn new(config: &InstallerConfig, cancel: CancellationToken) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(concat!("statusfetch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(InstallError::HttpClient)?;

        Ok(Self {
            client,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
            cancel,
        })
    }

    /// Fetches `url` into memory, following up to `max_redirects` redirects.
    ///
    /// # Errors
    ///
    /// - [`InstallError::InvalidUrl`] for non-HTTP(S) or unparsable URLs,
    ///   including redirect targets.
    /// - [`InstallError::TooManyRedirects`] when the cap is exceeded.
    /// - [`InstallError::DownloadFailed`] for any terminal status other than
    ///   200, including a redirect without `Location`.
    /// - [`InstallError::Timeout`] / [`InstallError::Network`] for transport
    ///   failures.
    /// - [`InstallError::Cancelled`] if the token fires.
    pub async fn fetch<F>(&self, url: &str, progress_cb: F) -> Result<Vec<u8>>
    where
        F: Fn(DownloadProgress),
    {
        let mut current = validate_url(url)?;
        let mut redirects = 0usize;

        let response = loop {
            debug!("GET {}", current);
            let response = self.send(&current).await?;
            let status = response.status();

            if status.is_redirection() {
                if let Some(location) = response.headers().get(LOCATION) {
                    if redirects >= self.max_redirects {
                        return Err(InstallError::TooManyRedirects {
                            limit: self.max_redirects,
                            url: url.to_string(),
                        });
                    }

                    let location = location.to_str().map_err(|e| InstallError::InvalidUrl {
                        url: current.to_string(),
                        reason: format!("unreadable Location header: {}", e),
                    })?;
                    let next = current
                        .join(location)
                        .map_err(|e| InstallError::InvalidUrl {
                            url: location.to_string(),
                            reason: e.to_string(),
                        })
                        .and_then(check_scheme)?;

                    debug!(
                        "Following {} redirect to {} (secure: {})",
                        status.as_u16(),
                        next,
                        next.scheme() == "https"
                    );
                    current = next;
                    redirects += 1;
                    continue;
                }
            }

            if status != StatusCode::OK {
                return Err(InstallError::DownloadFailed {
                    status: status.as_u16(),
                    url: current.to_string(),
                });
            }

            break response;
        };

        let total_bytes = response.content_length();
        debug!("Content-Length: {:?}", total_bytes);

        let capacity = total_bytes.unwrap_or(0).min(MAX_PREALLOC_BYTES) as usize;
        let mut buffer = Vec::with_capacity(capacity);
        let mut stream = response.bytes_stream();

        progress_cb(DownloadProgress::new(0, total_bytes));

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(InstallError::Cancelled),
                next = stream.next() => next,
            };

            let Some(chunk_result) = next else {
                break;
            };
            let chunk = chunk_result.map_err(|e| self.request_error(&current, e))?;

            buffer.extend_from_slice(&chunk);
            progress_cb(DownloadProgress::new(buffer.len() as u64, total_bytes));
        }

        info!(
            "Download complete: {} bytes from {} ({} redirect(s))",
            buffer.len(),
            current,
            redirects
        );

        Ok(buffer)
    }

    async fn send(&self, url: &Url) -> Result<reqwest::Response> {
        let request = self.client.get(url.clone()).send();

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(InstallError::Cancelled),
            result = request => result.map_err(|e| self.request_error(url, e)),
        }
    }

    fn request_error(&self, url: &Url, source: reqwest::Error) -> InstallError {
        if source.is_timeout() {
            InstallError::Timeout {
                url: url.to_string(),
                after: self.timeout,
            }
        } else {
            InstallError::Network {
                url: url.to_string(),
                source,
            }
        }
    }
}
