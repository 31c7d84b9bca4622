use std::cell::OnceCell;
use std::ops::{Index, IndexMut};

use crate::markup::{stylesheet, STYLE_ELEMENT_ID};

/// Position of an element in document order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

/// A host-owned element whose text is one JSON log line
#[derive(Clone, Debug, Default)]
pub struct LogElement {
    /// What the element currently shows
    content: String,

    /// Original text, captured the first time the element is read
    raw_source: OnceCell<String>,

    hidden: bool,
}

impl LogElement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            content: text.into(),
            raw_source: OnceCell::new(),
            hidden: false,
        }
    }

    /// Current displayed content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Original text, if it has been captured yet
    pub fn raw_source(&self) -> Option<&str> {
        self.raw_source.get().map(String::as_str)
    }

    /// Capture the displayed content as the raw source on first call; later
    /// calls return the first capture no matter what is displayed now
    pub fn capture_raw_source(&self) -> &str {
        self.raw_source.get_or_init(|| self.content.clone())
    }

    pub fn set_content(&mut self, content: String) {
        self.content = content;
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }
}

/// Injected style block
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleBlock {
    pub id: &'static str,
    pub css: String,
}

/// Candidate log elements in document order, plus page-level state
#[derive(Clone, Debug, Default)]
pub struct LogDocument {
    elements: Vec<LogElement>,
    style: Option<StyleBlock>,
}

impl LogDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document with one element per text
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            elements: texts.into_iter().map(LogElement::new).collect(),
            style: None,
        }
    }

    /// Append an element and return its id
    pub fn push(&mut self, text: impl Into<String>) -> ElementId {
        self.elements.push(LogElement::new(text));
        ElementId(self.elements.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements with their ids, in document order
    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &LogElement)> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, element)| (ElementId(i), element))
    }

    /// Elements that are not hidden, in document order
    pub fn visible(&self) -> impl Iterator<Item = (ElementId, &LogElement)> {
        self.elements().filter(|(_, element)| !element.is_hidden())
    }

    /// Add the log stylesheet unless it is already present.
    /// Returns true when the block was added by this call.
    pub fn inject_styles(&mut self) -> bool {
        if self.style.is_some() {
            return false;
        }
        self.style = Some(StyleBlock {
            id: STYLE_ELEMENT_ID,
            css: stylesheet(),
        });
        true
    }

    pub fn style(&self) -> Option<&StyleBlock> {
        self.style.as_ref()
    }
}

impl Index<ElementId> for LogDocument {
    type Output = LogElement;

    fn index(&self, id: ElementId) -> &LogElement {
        &self.elements[id.0]
    }
}

impl IndexMut<ElementId> for LogDocument {
    fn index_mut(&mut self, id: ElementId) -> &mut LogElement {
        &mut self.elements[id.0]
    }
}
