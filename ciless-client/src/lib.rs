//! ciless HTTP Clients
//!
//! Thin, typed HTTP clients for the two collaborators of the webhook bridge:
//! - [`GitHubClient`]: reads a file at a ref through the repository contents API
//! - [`ClusterClient`]: gets, creates and replaces build templates
//!
//! # Example
//!
//! ```no_run
//! use ciless_client::GitHubClient;
//!
//! # async fn example() -> ciless_client::Result<()> {
//! let client = GitHubClient::new("https://api.github.com", "ghp_token")?;
//! let raw = client
//!     .get_file_at_ref("octo", "app", ".ciless.yaml", "feature-1")
//!     .await?;
//! println!("{} bytes", raw.len());
//! # Ok(())
//! # }
//! ```

mod cluster;
pub mod error;
mod github;

// Re-export commonly used types
pub use cluster::ClusterClient;
pub use error::{ClientError, Result};
pub use github::GitHubClient;

use serde::de::DeserializeOwned;

/// User agent sent on every request; the contents API rejects anonymous agents
pub const USER_AGENT: &str = concat!("ciless-webhook/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// Response Handlers
// =============================================================================

/// Return the response if its status is a success, or the error body as a
/// [`ClientError`]. A 404 becomes [`ClientError::NotFound`] carrying `what`.
async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound(what.to_string()));
    }

    Err(ClientError::api_error(status.as_u16(), error_text))
}

/// Handle an API response and deserialize JSON
async fn handle_response<T: DeserializeOwned>(response: reqwest::Response, what: &str) -> Result<T> {
    let response = check_status(response, what).await?;

    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

fn trim_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}

/// Single-connection HTTP server answering with a canned response
#[cfg(test)]
pub(crate) mod test_server {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    pub(crate) async fn serve_once(status: u16, body: &str) -> String {
        serve_capture(status, body).await.0
    }

    /// Returns the base URL and a handle resolving to the raw request text
    pub(crate) async fn serve_capture(status: u16, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let body = body.to_string();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;

            let response = format!(
                "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            request
        });

        (format!("http://{}", addr), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];

        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&request);
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= end + 4 + content_length {
                    break;
                }
            }
        }

        String::from_utf8_lossy(&request).into_owned()
    }
}
