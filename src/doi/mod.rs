mod error;
mod work;

pub use error::DoiError;
pub use work::AuthorField;
use work::Work;

use crate::ui::UI;
use reqwest::header;
use serde::Deserialize;
use std::fs::File;
use std::io::{Seek, Write};
use std::time::Duration;
use tracing::debug;

const CROSSREF_API_URL: &str = "https://api.crossref.org/works/";
const DOI_RESOLVER_URL: &str = "https://doi.org/";
const CITEPROC_JSON: &str = "application/vnd.citationstyles.csl+json";
const MAILTO_ENV: &str = "CROSSREF_MAILTO";

#[derive(Deserialize)]
struct CrossrefResponse {
    message: Work,
}

/// HTTP client for DOI metadata and article downloads.
///
/// Construct once per invocation; the underlying connection pool and TLS
/// setup are reused for every request.
pub struct DoiClient {
    client: reqwest::Client,
}

impl DoiClient {
    pub fn new() -> Result<Self, DoiError> {
        let user_agent = match std::env::var(MAILTO_ENV) {
            Ok(mailto) if !mailto.trim().is_empty() => format!(
                "{}/{} (mailto:{})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                mailto.trim()
            ),
            _ => format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        };
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(20))
            .build()?;
        Ok(DoiClient { client })
    }

    /// Works record from the crossref.org REST API.
    pub async fn crossref_work(&self, doi: &str) -> Result<Work, DoiError> {
        let url = crossref_url(doi);
        let body = self.get_text(&url, "application/json").await?;
        let response: CrossrefResponse =
            serde_json::from_str(&body).map_err(|source| DoiError::Decode {
                doi: doi.to_string(),
                source,
            })?;
        Ok(response.message)
    }

    /// Citeproc JSON through doi.org content negotiation. Works for both
    /// crossref.org and datacite.org DOIs.
    pub async fn citeproc(&self, doi: &str) -> Result<Work, DoiError> {
        let url = doi_url(doi);
        let body = self.get_text(&url, CITEPROC_JSON).await?;
        serde_json::from_str(&body).map_err(|source| DoiError::Decode {
            doi: doi.to_string(),
            source,
        })
    }

    /// Confirms that a URL answers before anything is written.
    pub async fn check_connection(&self, url: &str) -> Result<(), DoiError> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(DoiError::from_request)?;
        // some publishers refuse HEAD but serve GET
        if response.status() == reqwest::StatusCode::METHOD_NOT_ALLOWED {
            return Ok(());
        }
        check_status(url, response.status())
    }

    /// Downloads a file into an anonymous temporary file, showing a progress
    /// bar when the size is known. The returned file is rewound.
    pub async fn download(&self, url: &str) -> Result<File, DoiError> {
        let mut response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/pdf,application/octet-stream,*/*")
            .send()
            .await
            .map_err(DoiError::from_request)?;
        check_status(url, response.status())?;

        let total_size = response.content_length().unwrap_or(0);
        let progress = if total_size > 0 {
            UI::download_progress(total_size, url)
        } else {
            UI::spinner("Downloading", url)
        };
        let mut file = tempfile::tempfile().map_err(DoiError::Spool)?;
        let mut received = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(DoiError::from_request)? {
            file.write_all(&chunk).map_err(DoiError::Spool)?;
            received += chunk.len() as u64;
            progress.inc(chunk.len() as u64);
        }
        file.rewind().map_err(DoiError::Spool)?;
        UI::finish_with_message(progress, "Downloaded", &format!("{} bytes", received));
        Ok(file)
    }

    async fn get_text(&self, url: &str, accept: &str) -> Result<String, DoiError> {
        debug!(url, "requesting metadata");
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, accept)
            .send()
            .await
            .map_err(DoiError::from_request)?;
        check_status(url, response.status())?;
        response.text().await.map_err(DoiError::from_request)
    }
}

fn check_status(url: &str, status: reqwest::StatusCode) -> Result<(), DoiError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(DoiError::BadUrl {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

/// Query-encodes the DOI, `/` included.
pub fn crossref_url(doi: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(doi.trim().as_bytes()).collect();
    format!("{}{}", CROSSREF_API_URL, encoded)
}

pub fn doi_url(doi: &str) -> String {
    format!("{}{}", DOI_RESOLVER_URL, doi.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        assert_eq!(
            crossref_url("10.1038/ngeo102"),
            "https://api.crossref.org/works/10.1038%2Fngeo102"
        );
        assert_eq!(
            crossref_url("10.1002/(SICI)1099 x"),
            "https://api.crossref.org/works/10.1002%2F%28SICI%291099+x"
        );
        assert_eq!(doi_url(" 10.1038/ngeo102 "), "https://doi.org/10.1038/ngeo102");
    }

    #[test]
    fn test_check_status() {
        assert!(check_status("https://doi.org/x", reqwest::StatusCode::OK).is_ok());
        let err = check_status("https://doi.org/x", reqwest::StatusCode::NOT_FOUND).unwrap_err();
        assert_eq!(err.to_string(), "Check URL: https://doi.org/x (HTTP 404)");
    }

    #[tokio::test]
    async fn test_download_is_spooled_to_a_file() {
        use std::io::Read;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await.unwrap();
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\n\
                      Content-Length: 8\r\nConnection: close\r\n\r\n%PDF-1.4",
                )
                .await
                .unwrap();
        });

        let client = DoiClient::new().unwrap();
        let mut file = client
            .download(&format!("http://{}/article.pdf", address))
            .await
            .unwrap();
        let mut contents = String::new();
        file.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "%PDF-1.4");
    }

    #[test]
    fn test_crossref_envelope() {
        let body = r#"{"status": "ok", "message": {"type": "journal-article",
            "author": [{"family": "Rignot", "given": "E"}],
            "published-print": {"date-parts": [[2008, 2]]}}}"#;
        let response: CrossrefResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.message.first_family().as_deref(), Some("Rignot"));
        assert_eq!(response.message.year().as_deref(), Some("2008"));
    }
}
