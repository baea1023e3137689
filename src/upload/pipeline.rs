use std::sync::Arc;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::error::ApiError;
use crate::upload::normalize::normalize_jpeg;
use crate::upload::scan::{MalwareScanner, ScanVerdict};
use crate::upload::sniff::{MediaType, TypeSniffer};

/// Per-file size ceiling, enforced at the multipart layer.
pub const MAX_FILE_BYTES: usize = 2 * 1024 * 1024;
/// Per-request file count ceiling.
pub const MAX_FILES_PER_REQUEST: usize = 5;

/// One uploaded file as received from the transport layer.
#[derive(Debug)]
pub struct IncomingFile {
    pub declared_type: String,
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// A file that cleared the whole validation pipeline and is ready to persist.
#[derive(Debug)]
pub struct ValidatedFile {
    pub stored_name: String,
    pub media_type: MediaType,
    pub bytes: Vec<u8>,
}

/// The ordered, fail-fast upload validation pipeline. Capabilities are
/// resolved once at startup and injected; the steps themselves hold no
/// conditional initialization.
pub struct UploadPipeline {
    sniffer: Arc<dyn TypeSniffer>,
    scanner: Arc<dyn MalwareScanner>,
}

impl UploadPipeline {
    pub fn new(sniffer: Arc<dyn TypeSniffer>, scanner: Arc<dyn MalwareScanner>) -> Self {
        UploadPipeline { sniffer, scanner }
    }

    /// Run one file through the five pipeline stages in order:
    /// declared-type filter, signature verification, malware scan,
    /// normalization, safe naming.
    pub fn validate_file(&self, file: IncomingFile) -> Result<ValidatedFile, ApiError> {
        let declared = MediaType::from_declared(&file.declared_type).ok_or_else(|| {
            ApiError::UnsupportedType(format!(
                "declared type {} is not accepted (JPEG or PDF only)",
                file.declared_type
            ))
        })?;

        let sniffed = self.sniffer.detect(&file.bytes).ok_or_else(|| {
            ApiError::SignatureMismatch("content signature not recognized".to_string())
        })?;
        if sniffed != declared {
            return Err(ApiError::SignatureMismatch(format!(
                "declared {} but content is {}",
                declared.mime(),
                sniffed.mime()
            )));
        }

        match self.scanner.scan(&file.bytes) {
            ScanVerdict::Clean => {}
            ScanVerdict::Found(name) => {
                return Err(ApiError::MalwareDetected(name));
            }
            ScanVerdict::Error(detail) => {
                // Fail-closed: an inconclusive scan never passes.
                return Err(ApiError::Internal(format!(
                    "malware scan unavailable: {}",
                    detail
                )));
            }
        }

        let bytes = match sniffed {
            MediaType::Jpeg => normalize_jpeg(&file.bytes)?,
            MediaType::Pdf => file.bytes,
        };

        Ok(ValidatedFile {
            stored_name: safe_name(sniffed),
            media_type: sniffed,
            bytes,
        })
    }

    /// Validate a whole request batch. All-or-nothing: the first failing
    /// file fails the batch.
    pub fn validate_batch(&self, files: Vec<IncomingFile>) -> Result<Vec<ValidatedFile>, ApiError> {
        let mut validated = Vec::with_capacity(files.len());
        for file in files {
            let name = file.file_name.clone().unwrap_or_default();
            match self.validate_file(file) {
                Ok(v) => validated.push(v),
                Err(e) => {
                    tracing::warn!("Upload batch rejected at file '{}': {}", name, e.kind());
                    return Err(e);
                }
            }
        }
        Ok(validated)
    }
}

/// Generate the storage filename: epoch millis plus a random component plus
/// the extension of the sniffed type. The client-supplied filename never
/// reaches the storage path.
fn safe_name(media_type: MediaType) -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!(
        "{}-{}.{}",
        Utc::now().timestamp_millis(),
        random,
        media_type.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::scan::StaticScanner;
    use crate::upload::sniff::MagicSniffer;

    fn pipeline(verdict: ScanVerdict) -> UploadPipeline {
        UploadPipeline::new(Arc::new(MagicSniffer), Arc::new(StaticScanner(verdict)))
    }

    fn sample_jpeg() -> Vec<u8> {
        use image::codecs::jpeg::JpegEncoder;
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(2, 2));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_with_encoder(JpegEncoder::new_with_quality(&mut out, 90))
            .unwrap();
        out.into_inner()
    }

    fn sample_pdf() -> Vec<u8> {
        b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\ntrailer\n<<>>\n%%EOF".to_vec()
    }

    fn incoming(declared: &str, bytes: Vec<u8>) -> IncomingFile {
        IncomingFile {
            declared_type: declared.to_string(),
            file_name: Some("../../etc/passwd.pdf".to_string()),
            bytes,
        }
    }

    #[test]
    fn clean_jpeg_and_pdf_pass() {
        let p = pipeline(ScanVerdict::Clean);
        let out = p
            .validate_batch(vec![
                incoming("image/jpeg", sample_jpeg()),
                incoming("application/pdf", sample_pdf()),
            ])
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].media_type, MediaType::Jpeg);
        assert_eq!(out[1].media_type, MediaType::Pdf);
    }

    #[test]
    fn unlisted_declared_type_is_unsupported() {
        let p = pipeline(ScanVerdict::Clean);
        let err = p
            .validate_file(incoming("text/plain", b"hello".to_vec()))
            .unwrap_err();
        assert_eq!(err.kind(), "UNSUPPORTED_TYPE");
    }

    #[test]
    fn declared_pdf_with_text_content_is_a_signature_mismatch() {
        let p = pipeline(ScanVerdict::Clean);
        let err = p
            .validate_file(incoming("application/pdf", b"just some text".to_vec()))
            .unwrap_err();
        assert_eq!(err.kind(), "SIGNATURE_MISMATCH");
    }

    #[test]
    fn declared_pdf_with_jpeg_content_is_a_signature_mismatch() {
        let p = pipeline(ScanVerdict::Clean);
        let err = p
            .validate_file(incoming("application/pdf", sample_jpeg()))
            .unwrap_err();
        assert_eq!(err.kind(), "SIGNATURE_MISMATCH");
    }

    #[test]
    fn flagged_file_is_rejected() {
        let p = pipeline(ScanVerdict::Found("Eicar-Test-Signature".into()));
        let err = p
            .validate_file(incoming("application/pdf", sample_pdf()))
            .unwrap_err();
        assert_eq!(err.kind(), "MALWARE_DETECTED");
    }

    #[test]
    fn scan_error_fails_closed() {
        let p = pipeline(ScanVerdict::Error("daemon unreachable".into()));
        let err = p
            .validate_file(incoming("application/pdf", sample_pdf()))
            .unwrap_err();
        assert_eq!(err.kind(), "INTERNAL");
    }

    #[test]
    fn one_bad_file_fails_the_whole_batch() {
        let p = pipeline(ScanVerdict::Clean);
        let err = p
            .validate_batch(vec![
                incoming("application/pdf", sample_pdf()),
                incoming("application/pdf", b"spoofed".to_vec()),
            ])
            .unwrap_err();
        assert_eq!(err.kind(), "SIGNATURE_MISMATCH");
    }

    #[test]
    fn stored_names_are_fresh_and_never_reuse_client_names() {
        let p = pipeline(ScanVerdict::Clean);
        let a = p.validate_file(incoming("application/pdf", sample_pdf())).unwrap();
        let b = p.validate_file(incoming("application/pdf", sample_pdf())).unwrap();
        assert_ne!(a.stored_name, b.stored_name);
        assert!(a.stored_name.ends_with(".pdf"));
        assert!(!a.stored_name.contains("passwd"));
        assert!(!a.stored_name.contains(".."));
    }
}
