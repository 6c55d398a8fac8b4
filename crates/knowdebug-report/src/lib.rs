//! knowdebug-report: Render assessment reports to HTML and Markdown.

pub mod html;
pub mod markdown;

pub use html::{generate_html, write_html_report};
pub use markdown::{generate_markdown, write_markdown_report};
