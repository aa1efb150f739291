use crate::domain::DomainError;

/// Plain text from an uploaded file. PDFs are detected by content type,
/// extension or magic bytes; everything else is decoded as lossy UTF-8.
pub fn extract_text(
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> Result<String, DomainError> {
    if is_pdf(file_name, content_type, bytes) {
        return pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| DomainError::validation(format!("could not read PDF {file_name}: {e}")));
    }
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

fn is_pdf(file_name: &str, content_type: &str, bytes: &[u8]) -> bool {
    content_type.eq_ignore_ascii_case("application/pdf")
        || file_name.to_ascii_lowercase().ends_with(".pdf")
        || bytes.starts_with(b"%PDF-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passthrough() {
        let text = extract_text("notes.txt", "text/plain", b"Osmosis\nDiffusion").unwrap();
        assert_eq!(text, "Osmosis\nDiffusion");
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let text = extract_text("a.md", "text/markdown", &[b'o', b'k', 0xff]).unwrap();
        assert!(text.starts_with("ok"));
    }

    #[test]
    fn test_pdf_detection() {
        assert!(is_pdf("Lecture.PDF", "application/octet-stream", b""));
        assert!(is_pdf("upload", "", b"%PDF-1.7"));
        assert!(!is_pdf("notes.txt", "text/plain", b"hello"));
    }

    #[test]
    fn test_broken_pdf_is_validation_error() {
        let err = extract_text("bad.pdf", "application/pdf", b"not a pdf").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
