//! Code block highlighting.

use syntect::{
    highlighting::{Theme, ThemeSet},
    html::highlighted_html_for_string,
    parsing::{SyntaxReference, SyntaxSet},
};

/// Theme used when none is configured.
pub const DEFAULT_THEME: &str = "InspiredGitHub";

/// Highlights fenced code blocks with syntect, falling back to escaped text.
#[derive(Debug)]
pub struct SyntaxHighlighter {
    syntaxes: SyntaxSet,
    themes: ThemeSet,
    theme: String,
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self::new(DEFAULT_THEME)
    }
}

impl SyntaxHighlighter {
    /// Create a highlighter. Unknown theme names fall back to the first bundled theme.
    pub fn new(theme: &str) -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            themes: ThemeSet::load_defaults(),
            theme: theme.to_string(),
        }
    }

    /// Render `code` as HTML, highlighted when `lang` is known.
    pub fn highlight(&self, code: &str, lang: Option<&str>) -> String {
        let highlighted = self
            .syntax_for(lang)
            .zip(self.active_theme())
            .and_then(|(syntax, theme)| {
                highlighted_html_for_string(code, &self.syntaxes, syntax, theme).ok()
            });

        highlighted.unwrap_or_else(|| plain_block(code, lang))
    }

    fn syntax_for(&self, lang: Option<&str>) -> Option<&SyntaxReference> {
        let lang = lang?.trim();
        if lang.is_empty() {
            return None;
        }
        self.syntaxes.find_syntax_by_token(lang)
    }

    fn active_theme(&self) -> Option<&Theme> {
        self.themes
            .themes
            .get(&self.theme)
            .or_else(|| self.themes.themes.values().next())
    }
}

fn plain_block(code: &str, lang: Option<&str>) -> String {
    let class = lang
        .filter(|l| !l.trim().is_empty())
        .map(|l| format!(" class=\"language-{}\"", html_escape(l.trim())))
        .unwrap_or_default();
    format!("<pre><code{class}>{}</code></pre>\n", html_escape(code))
}

/// Escape HTML special characters.
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_known_language() {
        let highlighter = SyntaxHighlighter::default();
        let html = highlighter.highlight("fn main() {}\n", Some("rust"));

        assert!(html.starts_with("<pre"));
        assert!(html.contains("main"));
        assert!(html.contains("style="));
    }

    #[test]
    fn test_unknown_language_is_escaped_plain_block() {
        let highlighter = SyntaxHighlighter::default();
        let html = highlighter.highlight("a < b", Some("no-such-lang"));

        assert_eq!(
            html,
            "<pre><code class=\"language-no-such-lang\">a &lt; b</code></pre>\n"
        );
    }

    #[test]
    fn test_no_language() {
        let highlighter = SyntaxHighlighter::default();
        let html = highlighter.highlight("plain text", None);
        assert_eq!(html, "<pre><code>plain text</code></pre>\n");
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        let highlighter = SyntaxHighlighter::new("does-not-exist");
        let html = highlighter.highlight("let x = 1;", Some("rust"));
        assert!(html.contains("style="));
    }
}
