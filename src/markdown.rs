//! Markdown to HTML conversion for item bodies.

use pulldown_cmark::{Options, Parser, html as md_html};

/// Render Markdown source to an HTML fragment.
///
/// Tables, footnotes and strikethrough are enabled on top of CommonMark.
pub fn render_markdown(source: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_FOOTNOTES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(source, options);
    let mut html = String::with_capacity(source.len() * 3 / 2);
    md_html::push_html(&mut html, parser);
    html
}
