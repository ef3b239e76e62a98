//! quillpress parser library
//!
//! Markdown rendering, code highlighting and HTML minification.

pub mod markdown;
pub mod minify;
pub mod syntax;

pub use markdown::MarkdownRenderer;
pub use minify::minify_html;
pub use syntax::SyntaxHighlighter;
