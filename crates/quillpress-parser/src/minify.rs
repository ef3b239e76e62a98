//! HTML minification.

/// Minify an HTML document.
///
/// Closing tags and the `<html>`/`<head>` openers are kept so themes that
/// rely on them for styling still work.
pub fn minify_html(raw: &[u8]) -> Vec<u8> {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = true;
    minify_html::minify(raw, &cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_collapses_whitespace() {
        let raw = b"<html>\n  <head>\n    <title> Hi </title>\n  </head>\n  <body>\n    <p>text</p>\n  </body>\n</html>\n";
        let out = minify_html(raw);

        assert!(out.len() < raw.len());
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("<p>text</p>"));
        assert!(text.contains("<html>"));
    }

    #[test]
    fn test_minify_drops_comments() {
        let out = minify_html(b"<p>a<!-- note -->b</p>");
        let text = String::from_utf8(out).expect("utf8");
        assert!(!text.contains("note"));
    }
}
