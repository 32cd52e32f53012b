//! Page loading from URLs, files, and stdin.
//!
//! URL fetching needs the `fetch` feature; files and stdin are always
//! available.

use std::fs;
use std::path::PathBuf;

#[cfg(feature = "fetch")]
use std::time::Duration;

#[cfg(feature = "fetch")]
use reqwest::Client;
#[cfg(feature = "fetch")]
use url::Url;

use crate::{ReadmarkError, Result};

/// HTTP client configuration for fetching web pages.
#[cfg(feature = "fetch")]
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
}

#[cfg(feature = "fetch")]
impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 30, user_agent: concat!("Mozilla/5.0 (compatible; readmark/", env!("CARGO_PKG_VERSION"), ")").to_string() }
    }
}

/// Fetches HTML content from an http(s) URL.
///
/// Redirects are followed; non-success statuses are errors.
#[cfg(feature = "fetch")]
pub async fn fetch_url(url: &str, config: &FetchConfig) -> Result<String> {
    let parsed_url = Url::parse(url).map_err(|e| ReadmarkError::InvalidUrl(e.to_string()))?;

    if !matches!(parsed_url.scheme(), "http" | "https") {
        return Err(ReadmarkError::InvalidUrl(format!("unsupported scheme: {}", parsed_url.scheme())));
    }

    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .build()
        .map_err(ReadmarkError::HttpError)?;

    tracing::debug!(url = %parsed_url, timeout = config.timeout, "fetching page");

    let response = client
        .get(parsed_url)
        .header("User-Agent", &config.user_agent)
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() { ReadmarkError::Timeout { timeout: config.timeout } } else { ReadmarkError::HttpError(e) }
        })?
        .error_for_status()?;

    let content = response.text().await?;

    Ok(content)
}

/// Reads HTML content from a local file.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(ReadmarkError::FileNotFound(path_buf))
    } else {
        fs::read_to_string(&path_buf).map_err(ReadmarkError::from)
    }
}

/// Reads HTML content from standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "fetch")]
    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, 30);
        assert!(config.user_agent.contains("readmark"));
    }

    #[cfg(feature = "fetch")]
    #[test]
    fn test_fetch_url_invalid() {
        let config = FetchConfig::default();
        let result = std::thread::spawn(move || {
            tokio::runtime::Runtime::new().unwrap().block_on(fetch_url("not-a-url", &config))
        })
        .join()
        .unwrap();

        assert!(matches!(result, Err(ReadmarkError::InvalidUrl(_))));
    }

    #[cfg(feature = "fetch")]
    #[test]
    fn test_fetch_url_rejects_other_schemes() {
        let config = FetchConfig::default();
        let result = std::thread::spawn(move || {
            tokio::runtime::Runtime::new().unwrap().block_on(fetch_url("file:///etc/hosts", &config))
        })
        .join()
        .unwrap();

        assert!(matches!(result, Err(ReadmarkError::InvalidUrl(_))));
    }

    #[test]
    fn test_fetch_file_not_found() {
        let result = fetch_file("/nonexistent/path/file.html");
        assert!(matches!(result, Err(ReadmarkError::FileNotFound(_))));
    }

    #[test]
    fn test_fetch_file_reads_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<p>hello</p>").unwrap();
        assert_eq!(fetch_file(path.to_str().unwrap()).unwrap(), "<p>hello</p>");
    }
}
