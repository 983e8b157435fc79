//! Server address validation.
//!
//! The configured backend address is checked once at startup: it must parse,
//! use plain http or https, and carry a host. The canonical form has no
//! trailing slash so endpoint paths can be appended directly.

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ServerUrlError {
    #[error("invalid server URL: {0}")]
    Parse(#[from] url::ParseError),
    #[error("unsupported scheme '{0}' (use http or https)")]
    UnsupportedScheme(String),
    #[error("server URL has no host")]
    MissingHost,
}

/// Validate a server base address and return its canonical form.
pub fn validate_server_url(input: &str) -> Result<String, ServerUrlError> {
    let url = Url::parse(input.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ServerUrlError::UnsupportedScheme(other.to_string())),
    }

    if url.host_str().is_none() {
        return Err(ServerUrlError::MissingHost);
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert_eq!(
            validate_server_url("http://127.0.0.1:5000").unwrap(),
            "http://127.0.0.1:5000"
        );
        assert_eq!(
            validate_server_url("https://notes.example.com/").unwrap(),
            "https://notes.example.com"
        );
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(matches!(
            validate_server_url("ftp://notes.example.com"),
            Err(ServerUrlError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(validate_server_url("not a url").is_err());
    }

    #[test]
    fn trims_whitespace_and_trailing_slash() {
        assert_eq!(
            validate_server_url("  http://localhost:5000/  ").unwrap(),
            "http://localhost:5000"
        );
    }
}
