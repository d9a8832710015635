use filedock_core::FileCategory;

const DOCUMENT_MARKERS: [&str; 5] = ["pdf", "word", "document", "text/", "rtf"];
const ARCHIVE_MARKERS: [&str; 4] = ["zip", "rar", "tar", "gzip"];

/// Map a MIME type to its category. First matching rule wins.
pub fn classify(mime_type: &str) -> FileCategory {
    let mime = normalize_mime_type(mime_type);

    if mime.starts_with("image/") {
        FileCategory::Image
    } else if mime.starts_with("video/") {
        FileCategory::Video
    } else if mime.starts_with("audio/") {
        FileCategory::Audio
    } else if DOCUMENT_MARKERS.iter().any(|m| mime.contains(m)) {
        FileCategory::Document
    } else if ARCHIVE_MARKERS.iter().any(|m| mime.contains(m)) {
        FileCategory::Archive
    } else {
        FileCategory::Other
    }
}

/// Drop MIME parameters (`; charset=...`) and lowercase.
pub fn normalize_mime_type(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}
