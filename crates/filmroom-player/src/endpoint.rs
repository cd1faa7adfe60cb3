//! Platform-specific control endpoints: a Unix domain socket path, or a
//! named pipe on Windows.

use tokio::io::{AsyncRead, AsyncWrite};

/// A connected control stream.
pub trait IpcStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> IpcStream for T {}

/// Endpoint used when none is configured.
#[must_use]
pub fn default_endpoint() -> String {
    if cfg!(windows) {
        r"\\.\pipe\filmroom-mpv".to_string()
    } else {
        std::env::temp_dir()
            .join("filmroom-mpv.sock")
            .to_string_lossy()
            .into_owned()
    }
}

/// Open a stream to the endpoint.
#[cfg(unix)]
pub async fn open(endpoint: &str) -> std::io::Result<Box<dyn IpcStream>> {
    let stream = tokio::net::UnixStream::connect(endpoint).await?;
    Ok(Box::new(stream))
}

/// Open a stream to the endpoint.
#[cfg(windows)]
pub async fn open(endpoint: &str) -> std::io::Result<Box<dyn IpcStream>> {
    let pipe = tokio::net::windows::named_pipe::ClientOptions::new().open(endpoint)?;
    Ok(Box::new(pipe))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint_is_deterministic() {
        assert_eq!(default_endpoint(), default_endpoint());
        assert!(default_endpoint().contains("filmroom-mpv"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_open_missing_socket_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("absent.sock");
        assert!(open(&path.to_string_lossy()).await.is_err());
    }
}
