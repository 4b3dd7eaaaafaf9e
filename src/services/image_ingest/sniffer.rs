use super::{DetectedType, FileTypeSniffer};

/// Magic-byte sniffing via `infer`. Declared names and content types are never consulted.
pub struct InferSniffer;

impl FileTypeSniffer for InferSniffer {
    fn detect(&self, bytes: &[u8]) -> Option<DetectedType> {
        infer::get(bytes).map(|kind| DetectedType {
            extension: kind.extension().to_string(),
            mime_type: kind.mime_type().to_string(),
        })
    }
}
