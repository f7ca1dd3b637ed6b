//! Error type definitions for the M3U importer
//!
//! Each stage of the import pipeline owns an error enum; `AppError` wraps
//! them at operation boundaries so callers can propagate with `?`.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Playlist could not be retrieved from a URL
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Playlist file could not be read or decoded
    #[error("Read error: {0}")]
    Read(#[from] ReadError),

    /// A single channel submission to the storage collaborator failed
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// The requested transition is not valid for the current session state
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Invalid configuration values
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Errors raised while fetching a playlist over HTTP
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid playlist URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// Network failures, including timeouts
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx response
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Playlist at {url} exceeds {max_bytes} bytes")]
    TooLarge { url: String, max_bytes: u64 },
}

/// Errors raised while reading a local or uploaded playlist
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{name} is not valid UTF-8 text: {source}")]
    Decode {
        name: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// Upload body rejected before it was read (for example over the size limit)
    #[error("Upload {name} rejected: {message}")]
    Upload {
        name: String,
        status: u16,
        message: String,
    },
}

/// A failed `POST /api/channels` submission
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Submission of '{name}' failed: {source}")]
    Request {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Submission of '{name}' rejected with HTTP {status}: {body}")]
    Rejected {
        name: String,
        status: u16,
        body: String,
    },
}

/// Invalid import-session transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session is busy ({state})")]
    Busy { state: String },

    #[error("No playlist is staged")]
    NotStaged,

    #[error("Index {index} is out of range ({len} staged records)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No channels are selected")]
    NothingSelected,
}

impl AppError {
    /// Create a configuration error with a custom message
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl FetchError {
    pub fn invalid_url<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn request<U: Into<String>>(url: U, source: reqwest::Error) -> Self {
        Self::Request {
            url: url.into(),
            source,
        }
    }
}

impl SessionError {
    pub fn busy<S: std::fmt::Display>(state: S) -> Self {
        Self::Busy {
            state: state.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_converts_into_app_error() {
        let error: AppError = SessionError::IndexOutOfRange { index: 4, len: 2 }.into();
        assert_eq!(
            error.to_string(),
            "Session error: Index 4 is out of range (2 staged records)"
        );
    }

    #[test]
    fn test_read_error_message_names_the_input() {
        let source = String::from_utf8(vec![0xff, 0xfe]).unwrap_err();
        let error = ReadError::Decode {
            name: "playlist.m3u".to_string(),
            source,
        };
        assert!(error.to_string().starts_with("playlist.m3u is not valid UTF-8 text"));
    }
}
