use crate::error::Result;
use crate::features::codec;

/// A captured signature, kept both as the pad's base64 payload and as raw PNG bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureImage {
    pub encoded: String,
    pub bytes: Vec<u8>,
}

impl SignatureImage {
    /// Builds an image from the pad's `data:image/png;base64,...` output.
    /// An empty drawing yields `Ok(None)`.
    pub fn from_capture(raw: &str) -> Result<Option<Self>> {
        let payload = codec::strip_data_url(raw).trim();
        if payload.is_empty() {
            return Ok(None);
        }
        let bytes = codec::decode(payload)?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            encoded: payload.to_string(),
            bytes,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SignError;

    #[test]
    fn decodes_pad_output() {
        let sig = SignatureImage::from_capture("data:image/png;base64,iVBORw0KGgo=")
            .unwrap()
            .expect("image");
        assert_eq!(sig.encoded, "iVBORw0KGgo=");
        assert_eq!(&sig.bytes[..4], b"\x89PNG");
    }

    #[test]
    fn empty_capture_produces_nothing() {
        assert!(SignatureImage::from_capture("data:image/png;base64,").unwrap().is_none());
        assert!(SignatureImage::from_capture("   ").unwrap().is_none());
    }

    #[test]
    fn garbage_capture_is_malformed() {
        let err = SignatureImage::from_capture("data:image/png;base64,@@@@").unwrap_err();
        assert!(matches!(err, SignError::MalformedInput(_)));
    }
}
