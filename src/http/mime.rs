//! MIME type detection based on file extensions.

use std::path::Path;

/// Served when the extension is missing or unknown.
pub const DEFAULT_MIME: &str = "application/octet-stream";

const MIME_TYPES: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("htm", "text/html"),
    ("txt", "text/plain"),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("pdf", "application/pdf"),
];

/// Looks up the MIME type for `path` by its extension, ignoring case.
///
/// # Example
///
/// ```
/// # use liso::http::mime::mime_type;
/// assert_eq!(mime_type("www/index.HTML"), "text/html");
/// assert_eq!(mime_type("archive.tar"), "application/octet-stream");
/// ```
pub fn mime_type(path: impl AsRef<Path>) -> &'static str {
    let Some(ext) = path.as_ref().extension().and_then(|e| e.to_str()) else {
        return DEFAULT_MIME;
    };

    MIME_TYPES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_extension_is_octet_stream() {
        assert_eq!(mime_type("/srv/README"), DEFAULT_MIME);
        assert_eq!(mime_type("/srv/.hidden"), DEFAULT_MIME);
    }

    #[test]
    fn last_extension_wins() {
        assert_eq!(mime_type("bundle.min.js"), "application/javascript");
        assert_eq!(mime_type("photo.png.txt"), "text/plain");
    }
}
