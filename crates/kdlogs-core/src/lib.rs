//! Log processing for kdlogs
//!
//! This crate extracts JSON log records from a document, filters them and
//! renders the visible ones through an output template.

mod document;
mod extract;
mod filter;
mod markup;
mod session;
mod template;
mod timestamp;

pub use document::{ElementId, LogDocument, LogElement, StyleBlock};
pub use extract::{extract, ParsedLog, WorkingSet};
pub use filter::{matches, CompiledFilter};
pub use markup::{stylesheet, Markup, STYLE_ELEMENT_ID};
pub use session::LogSession;
pub use template::{render, template_or_default, Field, FormatToken, Template};
pub use timestamp::parse_timestamp_in;

// Re-export types used in our public API
pub use kdlogs_types::{FilterConfig, LevelVariant, LogRecord, Request, Response, StyleClass};
