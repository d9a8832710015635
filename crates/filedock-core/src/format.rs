//! Presentation helpers shared by the API projections.

const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Format a byte count using the largest unit that keeps the value below 1024,
/// rounded to two decimals with trailing zeros dropped (`1536` -> `"1.5 KB"`).
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, SIZE_UNITS[unit])
}

/// Turn a stored location into something a browser can fetch.
///
/// Absolute URLs pass through; locations relative to the local public root
/// become web-root-relative.
pub fn resolve_public_url(location: &str) -> String {
    if location.starts_with("http://") || location.starts_with("https://") {
        location.to_string()
    } else {
        format!("/{}", location.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_zero() {
        assert_eq!(format_file_size(0), "0 Bytes");
    }

    #[test]
    fn test_format_bytes_and_kilobytes() {
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1023), "1023 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(12288), "12 KB");
    }

    #[test]
    fn test_format_rounds_to_two_decimals() {
        assert_eq!(format_file_size(1_234_567), "1.18 MB");
        assert_eq!(format_file_size(5 * 1024 * 1024 * 1024), "5 GB");
    }

    #[test]
    fn test_format_caps_at_terabytes() {
        let bytes = 2048u64 * 1024 * 1024 * 1024 * 1024;
        assert_eq!(format_file_size(bytes), "2048 TB");
    }

    #[test]
    fn test_resolve_local_path() {
        assert_eq!(
            resolve_public_url("uploads/image/original/a.jpg"),
            "/uploads/image/original/a.jpg"
        );
        assert_eq!(resolve_public_url("/uploads/x.bin"), "/uploads/x.bin");
    }

    #[test]
    fn test_resolve_hosted_url_unchanged() {
        let url = "https://cdn.example.com/images/image/original/a.jpg";
        assert_eq!(resolve_public_url(url), url);
    }
}
