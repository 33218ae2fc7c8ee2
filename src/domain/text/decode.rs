use encoding_rs::EUC_KR;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("file is empty")]
    Empty,
    #[error("file is neither UTF-8 nor EUC-KR text")]
    UnknownEncoding,
}

/// Decode an uploaded text file: strict UTF-8 first, then legacy EUC-KR.
pub fn decode_text_file(bytes: &[u8]) -> Result<String, DecodeError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(utf8_error) => {
            tracing::debug!(
                valid_up_to = utf8_error.valid_up_to(),
                "File is not valid UTF-8, trying EUC-KR"
            );
            let (decoded, had_errors) = EUC_KR.decode_without_bom_handling(bytes);
            if had_errors {
                return Err(DecodeError::UnknownEncoding);
            }
            decoded.into_owned()
        }
    };

    if text.trim().is_empty() {
        return Err(DecodeError::Empty);
    }

    Ok(text)
}
