use thiserror::Error;

pub type Result<T> = std::result::Result<T, SignError>;

#[derive(Debug, Error)]
pub enum SignError {
    #[error("network error: {0}")]
    Network(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("corrupt document: {0}")]
    CorruptDocument(String),
    #[error("page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: u32, count: u32 },
    #[error("unsupported image format: {0}")]
    UnsupportedImageFormat(String),
    #[error("serialization failed: {0}")]
    Serialization(String),
    #[error("invalid viewport {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },
}

impl SignError {
    /// Stable identifier rendered by the host UI.
    pub fn code(&self) -> &'static str {
        match self {
            SignError::Network(_) => "network_error",
            SignError::Storage(_) => "storage_error",
            SignError::NotFound(_) => "not_found",
            SignError::MalformedInput(_) => "malformed_input",
            SignError::CorruptDocument(_) => "corrupt_document",
            SignError::PageOutOfRange { .. } => "page_out_of_range",
            SignError::UnsupportedImageFormat(_) => "unsupported_image_format",
            SignError::Serialization(_) => "serialization_error",
            SignError::InvalidViewport { .. } => "invalid_viewport",
        }
    }

    pub(crate) fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        SignError::Storage(format!("{context}:{err}"))
    }

    pub(crate) fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            SignError::NotFound(path.display().to_string())
        } else {
            SignError::storage(&path.display().to_string(), err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::Path;

    #[test]
    fn missing_file_maps_to_not_found() {
        let err = SignError::from_io(
            Path::new("/nope.pdf"),
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, SignError::NotFound(_)));
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn other_io_failures_map_to_storage() {
        let err = SignError::from_io(
            Path::new("/ro.pdf"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.code(), "storage_error");
        assert!(err.to_string().contains("/ro.pdf"));
    }
}
