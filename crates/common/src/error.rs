//! Error types shared across ActSim crates.

use std::path::PathBuf;

/// Top-level error type for ActSim operations.
#[derive(Debug, thiserror::Error)]
pub enum ActsimError {
    #[error("Recording error: {message}")]
    Recording { message: String },

    #[error("Processing error: {message}")]
    Processing { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ActsimError.
pub type ActsimResult<T> = Result<T, ActsimError>;

impl ActsimError {
    pub fn recording(msg: impl Into<String>) -> Self {
        Self::Recording {
            message: msg.into(),
        }
    }

    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helper_constructors_format_message() {
        let err = ActsimError::encode("ffmpeg exited with status 1");
        assert_eq!(err.to_string(), "Encode error: ffmpeg exited with status 1");

        let err = ActsimError::FileNotFound {
            path: PathBuf::from("rec/layer.json"),
        };
        assert_eq!(err.to_string(), "File not found: rec/layer.json");
    }

    #[test]
    fn test_io_error_converts() {
        fn fails() -> ActsimResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(ActsimError::Io(_))));
    }
}
