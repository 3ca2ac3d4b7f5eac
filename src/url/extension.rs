use url::Url;

/// Path extensions that never lead to a searchable HTML page
pub const SKIP_EXTENSIONS: &[&str] = &[
    // Images
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".svg", ".webp", ".ico",
    // Documents
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx",
    // Archives and binaries
    ".zip", ".rar", ".7z", ".tar", ".gz", ".exe", ".dmg", ".bin",
    // Media
    ".mp3", ".mp4", ".wav", ".avi", ".mov",
    // Stylesheets, scripts and data
    ".css", ".js", ".json", ".xml", ".csv", ".txt", ".map",
    // Fonts
    ".woff", ".woff2", ".ttf", ".eot",
];

/// Checks whether the URL path ends in one of the given extensions
///
/// The comparison is case-insensitive and only looks at the path, so a
/// query string such as `?format=.pdf` does not trigger a skip.
pub fn has_skipped_extension(url: &Url, skip_list: &[&str]) -> bool {
    let path = url.path().to_lowercase();
    skip_list.iter().any(|ext| path.ends_with(ext))
}
