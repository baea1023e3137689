/// Media types the intake accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Jpeg,
    Pdf,
}

impl MediaType {
    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Pdf => "application/pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "jpg",
            MediaType::Pdf => "pdf",
        }
    }

    /// Map a client-declared MIME string onto the allow-list.
    pub fn from_declared(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" | "image/jpg" => Some(MediaType::Jpeg),
            "application/pdf" => Some(MediaType::Pdf),
            _ => None,
        }
    }
}

/// Capability for deriving a file's true media type from its leading bytes.
/// Resolved once at startup and injected into the pipeline, so the sniffing
/// step itself carries no initialization logic.
pub trait TypeSniffer: Send + Sync {
    fn detect(&self, bytes: &[u8]) -> Option<MediaType>;
}

/// Magic-byte sniffer for the allow-listed formats.
pub struct MagicSniffer;

impl TypeSniffer for MagicSniffer {
    fn detect(&self, bytes: &[u8]) -> Option<MediaType> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(MediaType::Jpeg);
        }
        if bytes.starts_with(b"%PDF-") {
            return Some(MediaType::Pdf);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_jpeg_and_pdf_signatures() {
        let sniffer = MagicSniffer;
        assert_eq!(sniffer.detect(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]), Some(MediaType::Jpeg));
        assert_eq!(sniffer.detect(b"%PDF-1.7 rest"), Some(MediaType::Pdf));
    }

    #[test]
    fn plain_text_and_executables_are_not_recognized() {
        let sniffer = MagicSniffer;
        assert_eq!(sniffer.detect(b"hello world"), None);
        // PE header of a renamed executable
        assert_eq!(sniffer.detect(b"MZ\x90\x00\x03"), None);
        assert_eq!(sniffer.detect(&[]), None);
    }

    #[test]
    fn declared_type_mapping_covers_jpeg_alias() {
        assert_eq!(MediaType::from_declared("image/jpg"), Some(MediaType::Jpeg));
        assert_eq!(MediaType::from_declared("text/plain"), None);
    }
}
