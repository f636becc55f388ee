/// Decode plain text as UTF-8, falling back to Latin-1.
///
/// Latin-1 maps every byte to the code point of the same value, so this never fails.
pub(super) fn read_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(error) => {
            tracing::debug!(
                valid_up_to = error.valid_up_to(),
                "Text is not valid UTF-8; decoding as Latin-1"
            );
            bytes.iter().copied().map(char::from).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_utf8() {
        assert_eq!(read_text("naïve café".as_bytes()), "naïve café");
    }

    #[test]
    fn falls_back_to_latin1() {
        // "café" encoded as Latin-1; 0xE9 alone is invalid UTF-8.
        let bytes = [0x63, 0x61, 0x66, 0xE9];
        assert_eq!(read_text(&bytes), "café");
    }

    #[test]
    fn latin1_fallback_keeps_every_byte() {
        let bytes: Vec<u8> = (0x80..=0xFF).collect();
        let decoded = read_text(&bytes);
        assert_eq!(decoded.chars().count(), bytes.len());
    }
}
