use tracing::debug;

use kdlogs_types::LogRecord;

use crate::document::{ElementId, LogDocument};

/// A parsed record paired with the element it came from
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedLog {
    pub element: ElementId,
    pub record: LogRecord,
}

/// Result of one extraction pass over a document
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorkingSet {
    /// Parsed records in document order
    entries: Vec<ParsedLog>,

    /// Elements whose text is not a JSON object
    rejected: Vec<ElementId>,
}

impl WorkingSet {
    pub fn entries(&self) -> &[ParsedLog] {
        &self.entries
    }

    pub fn rejected(&self) -> &[ElementId] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse every element of the document into a fresh working set.
///
/// Each element's raw source is captured the first time it is seen, so
/// re-running after rendering still parses the original JSON.
pub fn extract(document: &LogDocument) -> WorkingSet {
    let mut set = WorkingSet::default();

    for (id, element) in document.elements() {
        match LogRecord::from_json(element.capture_raw_source()) {
            Ok(record) => set.entries.push(ParsedLog {
                element: id,
                record,
            }),
            Err(e) => {
                debug!(element = id.0, error = %e, "Skipping element without a JSON log record");
                set.rejected.push(id);
            }
        }
    }

    set
}
