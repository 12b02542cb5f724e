/// Bytes read from the start of an upload to identify its type.
pub const PROBE_BYTES: usize = 1024;

/// MIME type of a buffer, judged from its magic bytes.
///
/// Buffers without a known signature are `text/plain` when they decode as
/// UTF-8 and `application/octet-stream` otherwise.
pub fn detect_content_type(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "application/x-empty".into();
    }
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type().into();
    }
    // The probe may cut a multi-byte character at the end.
    match std::str::from_utf8(bytes) {
        Ok(_) => "text/plain".into(),
        Err(e) if e.error_len().is_none() => "text/plain".into(),
        Err(_) => "application/octet-stream".into(),
    }
}
