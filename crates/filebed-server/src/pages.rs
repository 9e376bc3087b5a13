//! Static HTML

const INDEX_TEMPLATE: &str = include_str!("../assets/index.html");

/// The upload page with the size limit filled in
pub fn index_page(max_upload_bytes: u64) -> String {
    let max_mb = max_upload_bytes / (1024 * 1024);
    INDEX_TEMPLATE.replace("{{MAX_SIZE_MB}}", &max_mb.to_string())
}

/// Escape text for HTML element content and double-quoted attributes
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
