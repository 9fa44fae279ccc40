use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;

// Discord rejects uploads above this size for unboosted guilds.
const MAX_DOWNLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server answered {0}")]
    Status(reqwest::StatusCode),
    #[error("file is larger than {limit} bytes")]
    TooLarge { limit: usize },
}

/// A downloaded file, ready to be re-uploaded.
#[derive(Debug, Clone)]
pub struct RemoteFile {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Downloads welcome images and message attachments.
pub struct MediaFetcher {
    client: Client,
    max_bytes: usize,
}

impl MediaFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "User-Agent",
            HeaderValue::from_static(concat!("Kodachi/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            max_bytes: MAX_DOWNLOAD_BYTES,
        })
    }

    /// Same client, with a different size cap.
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub async fn fetch(&self, url: &str) -> Result<RemoteFile, FetchError> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let limit = self.max_bytes;
        if response
            .content_length()
            .is_some_and(|len| len > limit as u64)
        {
            return Err(FetchError::TooLarge { limit });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // Content-Length may be missing or wrong, so count while reading.
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if bytes.len() + chunk.len() > limit {
                return Err(FetchError::TooLarge { limit });
            }
            bytes.extend_from_slice(&chunk);
        }

        tracing::debug!(url, size = bytes.len(), "Downloaded remote file");

        Ok(RemoteFile {
            content_type,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves `response` verbatim to one client, then closes the socket.
    async fn serve_once(response: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(&response).await;
            let _ = socket.shutdown().await;
        });

        format!("http://{}/file.png", addr)
    }

    #[tokio::test]
    async fn test_fetch_returns_body_and_content_type() {
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: 4\r\nConnection: close\r\n\r\nabcd"
                .to_vec(),
        )
        .await;

        let file = MediaFetcher::new().unwrap().fetch(&url).await.unwrap();
        assert_eq!(file.bytes, b"abcd");
        assert_eq!(file.content_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_error_status() {
        let url = serve_once(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec(),
        )
        .await;

        let err = MediaFetcher::new().unwrap().fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(s) if s == reqwest::StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_fetch_rejects_declared_oversize() {
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Length: 64\r\nConnection: close\r\n\r\n".to_vec(),
        )
        .await;

        let fetcher = MediaFetcher::new().unwrap().with_max_bytes(16);
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 16 }));
    }

    #[tokio::test]
    async fn test_fetch_caps_body_without_content_length() {
        let mut response = b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n".to_vec();
        response.extend(std::iter::repeat(b'x').take(64));
        let url = serve_once(response).await;

        let fetcher = MediaFetcher::new().unwrap().with_max_bytes(16);
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 16 }));
    }
}
