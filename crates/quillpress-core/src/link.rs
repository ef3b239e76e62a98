//! Helpers for permalinks and output paths.

/// Output file for a permalink: `.html` links stay as they are, anything
/// else is treated as a directory holding `index.html`.
pub fn format_index_html(link: &str) -> String {
    if link.ends_with(".html") {
        return link.to_string();
    }
    format!("{}/index.html", link.trim_end_matches('/'))
}

/// Replace every `{{ key }}` placeholder (whitespace tolerant) in `layout`.
pub fn fill_placeholder(layout: &str, key: &str, value: &str) -> String {
    let mut out = String::with_capacity(layout.len() + value.len());
    let mut rest = layout;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) if after[..end].trim() == key => {
                out.push_str(&rest[..start]);
                out.push_str(value);
                rest = &after[end + 2..];
            }
            _ => {
                out.push_str(&rest[..start + 2]);
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
