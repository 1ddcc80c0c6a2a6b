use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;

use crate::error::{Result, SignError};

/// Bytes per encode step. Multiple of 3 so intermediate chunks never carry padding.
pub const CHUNK_SIZE: usize = 0x8000 - (0x8000 % 3);

/// Characters per decode step. Multiple of 4 for the same reason.
const DECODE_CHUNK_CHARS: usize = 0x8000;

pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(CHUNK_SIZE) {
        B64.encode_string(chunk, &mut out);
    }
    out
}

pub fn decode(text: &str) -> Result<Vec<u8>> {
    let compact: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let mut out = Vec::with_capacity(compact.len() / 4 * 3);
    for (idx, chunk) in compact.chunks(DECODE_CHUNK_CHARS).enumerate() {
        B64.decode_vec(chunk, &mut out).map_err(|e| {
            SignError::MalformedInput(format!(
                "base64_decode_failed@{}:{e}",
                idx * DECODE_CHUNK_CHARS
            ))
        })?;
    }
    Ok(out)
}

/// Drops a leading `data:<mime>;base64,` header if one is present.
pub fn strip_data_url(text: &str) -> &str {
    let trimmed = text.trim_start();
    if !trimmed.starts_with("data:") {
        return trimmed;
    }
    match trimmed.find(";base64,") {
        Some(pos) => &trimmed[pos + ";base64,".len()..],
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn round_trips_empty_single_and_large_buffers() {
        for len in [0usize, 1, 100_000] {
            let bytes = sample(len);
            let text = encode(&bytes);
            assert_eq!(decode(&text).expect("decode"), bytes, "len {len}");
        }
    }

    #[test]
    fn chunked_encoding_matches_single_pass() {
        let bytes = sample(CHUNK_SIZE * 3 + 7);
        assert_eq!(encode(&bytes), B64.encode(&bytes));
    }

    #[test]
    fn rejects_characters_outside_alphabet() {
        let err = decode("abc$def=").unwrap_err();
        assert!(matches!(err, SignError::MalformedInput(_)));
    }

    #[test]
    fn ignores_line_breaks() {
        let text = encode(b"signature bytes");
        let wrapped = format!("{}\n{}", &text[..8], &text[8..]);
        assert_eq!(decode(&wrapped).unwrap(), b"signature bytes");
    }

    #[test]
    fn strips_png_data_url_header() {
        assert_eq!(strip_data_url("data:image/png;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_url("QUJD"), "QUJD");
        assert_eq!(strip_data_url("data:text/plain,hello"), "data:text/plain,hello");
    }
}
