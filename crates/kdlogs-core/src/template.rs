//! Output templates
//!
//! A template is literal text interleaved with `{Name}` or `{Name:Spec}`
//! placeholders. Placeholders that do not scan cleanly stay literal.

use chrono::{Local, TimeZone};
use kdlogs_types::{value_text, LevelVariant, LogRecord, StyleClass, DEFAULT_TEMPLATE};

use crate::markup::Markup;
use crate::timestamp::{parse_timestamp_in, utc_clock};

/// Spec selecting the UTC time of day for `{Timestamp}`
const SPEC_CLOCK: &str = "HH:mm:ss";

/// Spec selecting the three-letter upper-case form of `{Level}`
const SPEC_UPPER3: &str = "u3";

/// Field a placeholder refers to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Field {
    Timestamp,
    Level,
    Message,
    Exception,
    NewLine,
    Property(String),
}

impl Field {
    fn from_name(name: &str) -> Self {
        match name {
            "Timestamp" => Self::Timestamp,
            "Level" => Self::Level,
            "Message" => Self::Message,
            "Exception" => Self::Exception,
            "NewLine" => Self::NewLine,
            other => Self::Property(other.to_string()),
        }
    }
}

/// One piece of a parsed template
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormatToken {
    Literal(String),
    Placeholder { field: Field, spec: Option<String> },
}

/// A parsed template, ready to render any number of records
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    tokens: Vec<FormatToken>,
}

/// Outcome of scanning from a `{`
enum Scan<'a> {
    Placeholder {
        name: &'a str,
        spec: Option<&'a str>,
        len: usize,
    },
    /// The brace is not the start of a placeholder
    Literal,
}

impl Template {
    /// Scan a template left to right into literal runs and placeholders
    pub fn parse(template: &str) -> Self {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut pos = 0;

        while let Some(offset) = template[pos..].find('{') {
            let brace = pos + offset;
            literal.push_str(&template[pos..brace]);

            match scan_brace(&template[brace..]) {
                Scan::Placeholder { name, spec, len } => {
                    if !literal.is_empty() {
                        tokens.push(FormatToken::Literal(std::mem::take(&mut literal)));
                    }
                    tokens.push(FormatToken::Placeholder {
                        field: Field::from_name(name),
                        spec: spec.map(str::to_string),
                    });
                    pos = brace + len;
                }
                Scan::Literal => {
                    literal.push('{');
                    pos = brace + 1;
                }
            }
        }

        literal.push_str(&template[pos..]);
        if !literal.is_empty() {
            tokens.push(FormatToken::Literal(literal));
        }

        Self { tokens }
    }

    /// Parse the caller's template, or the default one when none is given
    pub fn parse_or_default(template: Option<&str>) -> Self {
        Self::parse(template_or_default(template))
    }

    pub fn tokens(&self) -> &[FormatToken] {
        &self.tokens
    }

    /// Render a record with the given markup, reading naive times as local
    pub fn render(&self, record: &LogRecord, markup: Markup) -> String {
        self.render_in(record, markup, &Local)
    }

    /// Render a record, reading timestamps without an offset in `tz`
    pub fn render_in<Tz: TimeZone>(&self, record: &LogRecord, markup: Markup, tz: &Tz) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                FormatToken::Literal(text) => out.push_str(text),
                FormatToken::Placeholder { field, spec } => {
                    render_field(&mut out, record, field, spec.as_deref(), markup, tz)
                }
            }
        }
        out
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::parse(DEFAULT_TEMPLATE)
    }
}

/// The caller's template, falling back to the default when absent or empty
pub fn template_or_default(template: Option<&str>) -> &str {
    template.filter(|t| !t.is_empty()).unwrap_or(DEFAULT_TEMPLATE)
}

/// Render a record with a template string using HTML markers
pub fn render(record: &LogRecord, template: &str) -> String {
    Template::parse(template).render(record, Markup::Html)
}

/// Scan a placeholder starting at `s`, which begins with `{`.
///
/// Two states: the name (no `}`, `:` or `{`) and, after a `:`, the spec
/// (no `}`). Both must be non-empty and the placeholder must be closed.
fn scan_brace(s: &str) -> Scan<'_> {
    let body = &s[1..];
    let mut spec_start = None;

    for (i, c) in body.char_indices() {
        match (spec_start, c) {
            (None, '}') if i > 0 => {
                return Scan::Placeholder {
                    name: &body[..i],
                    spec: None,
                    len: i + 2,
                };
            }
            (None, ':') if i > 0 => spec_start = Some(i + 1),
            (None, '}' | ':' | '{') => return Scan::Literal,
            (Some(start), '}') if i > start => {
                return Scan::Placeholder {
                    name: &body[..start - 1],
                    spec: Some(&body[start..i]),
                    len: i + 2,
                };
            }
            (Some(_), '}') => return Scan::Literal,
            _ => {}
        }
    }

    Scan::Literal
}

fn render_field<Tz: TimeZone>(
    out: &mut String,
    record: &LogRecord,
    field: &Field,
    spec: Option<&str>,
    markup: Markup,
    tz: &Tz,
) {
    match field {
        Field::Timestamp => {
            markup.push_styled(out, StyleClass::Timestamp, &format_timestamp(record, spec, tz));
        }
        Field::Level => {
            let level = record.level();
            let class = LevelVariant::from_level(level.as_deref()).style();
            let text = match (level, spec) {
                (None, _) => String::new(),
                (Some(level), Some(SPEC_UPPER3)) => {
                    level.chars().take(3).collect::<String>().to_uppercase()
                }
                (Some(level), _) => level,
            };
            markup.push_styled(out, class, &text);
        }
        Field::Message => {
            markup.push_styled(out, StyleClass::Message, &record.message());
        }
        Field::Exception => {
            if let Some(exception) = record.exception() {
                markup.push_styled(out, StyleClass::Exception, &exception);
            }
        }
        Field::NewLine => out.push('\n'),
        Field::Property(key) => {
            if let Some(value) = record.property(key) {
                markup.push_value(out, &value_text(value));
            }
        }
    }
}

fn format_timestamp<Tz: TimeZone>(record: &LogRecord, spec: Option<&str>, tz: &Tz) -> String {
    let Some(raw) = record.timestamp() else {
        return String::new();
    };
    let Some(parsed) = parse_timestamp_in(raw, tz) else {
        return String::new();
    };
    match spec {
        Some(SPEC_CLOCK) => utc_clock(&parsed),
        _ => value_text(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn record(json: &str) -> LogRecord {
        LogRecord::from_json(json).unwrap()
    }

    fn placeholder(name: &str, spec: Option<&str>) -> FormatToken {
        FormatToken::Placeholder {
            field: Field::from_name(name),
            spec: spec.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_default_template() {
        let template = Template::default();
        assert_eq!(
            template.tokens(),
            &[
                FormatToken::Literal("[".to_string()),
                placeholder("Timestamp", Some("HH:mm:ss")),
                FormatToken::Literal(" ".to_string()),
                placeholder("Level", Some("u3")),
                FormatToken::Literal("] ".to_string()),
                placeholder("Message", Some("lj")),
                placeholder("NewLine", None),
                placeholder("Exception", None),
            ]
        );
    }

    #[test]
    fn test_malformed_braces_stay_literal() {
        for text in ["{}", "{:x}", "{Level:}", "{Level", "plain } text", "a{b:c"] {
            assert_eq!(
                Template::parse(text).tokens(),
                &[FormatToken::Literal(text.to_string())],
                "template {text:?}"
            );
        }
    }

    #[test]
    fn test_nested_brace_restarts_at_inner() {
        let template = Template::parse("{{Level}}");
        assert_eq!(
            template.tokens(),
            &[
                FormatToken::Literal("{".to_string()),
                placeholder("Level", None),
                FormatToken::Literal("}".to_string()),
            ]
        );

        let template = Template::parse("{a{Message}");
        assert_eq!(
            template.tokens(),
            &[
                FormatToken::Literal("{a".to_string()),
                placeholder("Message", None),
            ]
        );
    }

    #[test]
    fn test_spec_may_contain_colons() {
        let template = Template::parse("{Timestamp:HH:mm:ss}");
        assert_eq!(template.tokens(), &[placeholder("Timestamp", Some("HH:mm:ss"))]);
    }

    #[test]
    fn test_render_default_template() {
        let r = record(
            r#"{"Timestamp":"2024-01-01T10:15:30Z","Level":"Information","RenderedMessage":"Started"}"#,
        );
        assert_eq!(
            render(&r, DEFAULT_TEMPLATE),
            "[<span class='kd-log-timestamp'>10:15:30</span> \
             <span class='kd-log-level-info'>INF</span>] \
             <span class='kd-log-message'>Started</span>\n"
        );
    }

    #[test]
    fn test_empty_exception_emits_no_marker() {
        let r = record(r#"{"Level":"Error","RenderedMessage":"x","Exception":""}"#);
        let out = render(&r, DEFAULT_TEMPLATE);
        assert!(!out.contains("kd-log-exception"));
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn test_exception_marker() {
        let r = record(r#"{"RenderedMessage":"Failed","Exception":"boom"}"#);
        assert_eq!(
            render(&r, "{Exception}"),
            "<span class='kd-log-exception'>boom</span>"
        );
    }

    #[test]
    fn test_timestamp_specs() {
        let r = record(r#"{"Timestamp":"2024-01-01T10:15:30.5+02:00"}"#);
        assert_eq!(
            render(&r, "{Timestamp:HH:mm:ss}"),
            "<span class='kd-log-timestamp'>08:15:30</span>"
        );
        assert_eq!(
            render(&r, "{Timestamp}"),
            "<span class='kd-log-timestamp'>2024-01-01T10:15:30.5+02:00</span>"
        );

        let r = record(r#"{"Timestamp":"not a date"}"#);
        assert_eq!(render(&r, "{Timestamp}"), "<span class='kd-log-timestamp'></span>");

        let r = record("{}");
        assert_eq!(
            render(&r, "{Timestamp:HH:mm:ss}"),
            "<span class='kd-log-timestamp'></span>"
        );
    }

    #[test]
    fn test_naive_timestamp_clock_is_utc() {
        let r = record(r#"{"Timestamp":"2024-01-01T10:15:30"}"#);
        let plus_one = FixedOffset::east_opt(3600).unwrap();
        let template = Template::parse("{Timestamp:HH:mm:ss}");
        assert_eq!(template.render_in(&r, Markup::Plain, &plus_one), "09:15:30");
        assert_eq!(template.render_in(&r, Markup::Plain, &Utc), "10:15:30");
        assert_eq!(
            Template::parse("{Timestamp}").render_in(&r, Markup::Plain, &plus_one),
            "2024-01-01T10:15:30"
        );
    }

    #[test]
    fn test_level_variant_ignores_spec() {
        let r = record(r#"{"Level":"information"}"#);
        assert_eq!(
            render(&r, "{Level}"),
            "<span class='kd-log-level-info'>information</span>"
        );
        assert_eq!(
            render(&r, "{Level:u3}"),
            "<span class='kd-log-level-info'>INF</span>"
        );

        let r = record(r#"{"Level":"Warning"}"#);
        assert_eq!(render(&r, "{Level:u3}"), "<span class='kd-log-level-warn'>WAR</span>");

        let r = record(r#"{"Level":"Fatal"}"#);
        assert_eq!(render(&r, "{Level:u3}"), "<span class='kd-log-level-def'>FAT</span>");

        let r = record(r#"{"Level":"er"}"#);
        assert_eq!(render(&r, "{Level:u3}"), "<span class='kd-log-level-def'>ER</span>");

        let r = record("{}");
        assert_eq!(render(&r, "{Level:u3}"), "<span class='kd-log-level-def'></span>");
    }

    #[test]
    fn test_message_falls_back_to_template() {
        let r = record(r#"{"MessageTemplate":"User {Id} logged in"}"#);
        assert_eq!(
            render(&r, "{Message:lj}"),
            "<span class='kd-log-message'>User {Id} logged in</span>"
        );
    }

    #[test]
    fn test_property_tokens() {
        let r = record(
            r#"{"SourceContext":"Api.Orders","Properties":{"RequestId":42,"Tags":["a","b"],"Flag":false}}"#,
        );
        assert_eq!(
            render(&r, "{SourceContext}|{RequestId}|{Tags}|{Flag}|{Missing}|"),
            r#"Api.Orders|42|[&quot;a&quot;,&quot;b&quot;]|false||"#
        );
        assert_eq!(
            Template::parse("{Tags}").render(&r, Markup::Plain),
            r#"["a","b"]"#
        );
    }

    #[test]
    fn test_newline_and_literals_pass_through() {
        let r = record(r#"{"RenderedMessage":"m"}"#);
        assert_eq!(
            Template::parse("<b>{NewLine}</b>").render(&r, Markup::Plain),
            "<b>\n</b>"
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        let r = record(
            r#"{"Timestamp":"2024-01-01T10:16:00Z","Level":"Error","RenderedMessage":"Failed","Exception":"boom"}"#,
        );
        let template = Template::default();
        let first = template.render(&r, Markup::Html);
        for _ in 0..3 {
            assert_eq!(template.render(&r, Markup::Html), first);
        }
    }

    #[test]
    fn test_empty_format_uses_default() {
        assert_eq!(template_or_default(Some("")), DEFAULT_TEMPLATE);
        assert_eq!(template_or_default(None), DEFAULT_TEMPLATE);
        assert_eq!(template_or_default(Some("{Message}")), "{Message}");
    }
}
