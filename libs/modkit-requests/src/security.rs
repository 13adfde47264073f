//! HTTP security utilities.

/// Maximum body preview size for error messages (8KB).
///
/// When a call ends with a non-2xx status, the response body is included in
/// the error message for debugging. This limits how much of it is copied.
pub const ERROR_BODY_PREVIEW_LIMIT: usize = 8 * 1024;

/// Lossy UTF-8 preview of `body`, cut at [`ERROR_BODY_PREVIEW_LIMIT`] bytes.
pub(crate) fn body_preview(body: &[u8]) -> String {
    if body.len() <= ERROR_BODY_PREVIEW_LIMIT {
        return String::from_utf8_lossy(body).into_owned();
    }
    let mut preview = String::from_utf8_lossy(&body[..ERROR_BODY_PREVIEW_LIMIT]).into_owned();
    preview.push_str("...");
    preview
}
