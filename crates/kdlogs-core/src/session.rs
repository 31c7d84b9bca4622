use chrono::{FixedOffset, Local, TimeZone};
use tracing::{debug, info};

use kdlogs_types::{FilterConfig, Request, Response};

use crate::document::LogDocument;
use crate::extract::{extract, WorkingSet};
use crate::filter::CompiledFilter;
use crate::markup::Markup;
use crate::template::Template;

/// Runs extract, filter and render passes over a document
#[derive(Clone, Debug, Default)]
pub struct LogSession {
    /// Working set of the last run
    working_set: WorkingSet,

    markup: Markup,

    /// Zone for timestamps without an offset and for the time window;
    /// `None` means the local zone
    offset: Option<FixedOffset>,
}

impl LogSession {
    pub fn new(markup: Markup) -> Self {
        Self {
            markup,
            ..Default::default()
        }
    }

    /// Read times in a fixed offset instead of the local zone
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Working set built by the last run
    pub fn working_set(&self) -> &WorkingSet {
        &self.working_set
    }

    /// Extract, filter and render the document; returns the visible count.
    ///
    /// Matching elements get the rendered line as content and are shown;
    /// the rest, including elements that do not parse, are hidden.
    pub fn apply(
        &mut self,
        document: &mut LogDocument,
        format: Option<&str>,
        filter: &FilterConfig,
    ) -> usize {
        match self.offset {
            Some(offset) => self.apply_in(document, format, filter, &offset),
            None => self.apply_in(document, format, filter, &Local),
        }
    }

    fn apply_in<Tz: TimeZone>(
        &mut self,
        document: &mut LogDocument,
        format: Option<&str>,
        filter: &FilterConfig,
        tz: &Tz,
    ) -> usize {
        if document.inject_styles() {
            debug!("Injected log stylesheet");
        }

        let working_set = extract(document);
        let template = Template::parse_or_default(format);
        let filter = CompiledFilter::new(filter);

        for &id in working_set.rejected() {
            document[id].set_hidden(true);
        }

        for entry in working_set.entries() {
            let element = &mut document[entry.element];
            if filter.matches_in(&entry.record, tz) {
                element.set_content(template.render_in(&entry.record, self.markup, tz));
                element.set_hidden(false);
            } else {
                element.set_hidden(true);
            }
        }

        let visible = working_set
            .entries()
            .iter()
            .filter(|entry| !document[entry.element].is_hidden())
            .count();
        info!("Visible logs after filtering: {}", visible);

        self.working_set = working_set;
        visible
    }

    /// Answer a request message
    pub fn handle(&mut self, document: &mut LogDocument, request: Request) -> Response {
        match request {
            Request::ParseLogs { format, filter } => {
                let filter = filter.unwrap_or_default();
                Response {
                    visible: self.apply(document, format.as_deref(), &filter),
                }
            }
        }
    }
}
