use crossterm::style::{style, Attribute, Stylize};

use kdlogs_types::StyleClass;

/// Id of the style block injected into a document
pub const STYLE_ELEMENT_ID: &str = "kd-log-style";

/// How style markers are written into rendered output
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Markup {
    /// `<span class='...'>` wrappers, values HTML-escaped
    #[default]
    Html,
    /// ANSI terminal colors
    Ansi,
    /// No markers at all
    Plain,
}

impl Markup {
    /// Parse a markup name as used in config files and flags
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "html" => Some(Self::Html),
            "ansi" | "color" | "terminal" => Some(Self::Ansi),
            "plain" | "text" => Some(Self::Plain),
            _ => None,
        }
    }

    /// Append `text` wrapped in the marker for `class`
    pub fn push_styled(&self, out: &mut String, class: StyleClass, text: &str) {
        match self {
            Self::Html => {
                out.push_str("<span class='");
                out.push_str(class.css_class());
                out.push_str("'>");
                push_escaped(out, text);
                out.push_str("</span>");
            }
            Self::Ansi => {
                let mut styled = style(text).with(class.color());
                if class.is_bold() {
                    styled = styled.attribute(Attribute::Bold);
                }
                if class.is_italic() {
                    styled = styled.attribute(Attribute::Italic);
                }
                out.push_str(&styled.to_string());
            }
            Self::Plain => out.push_str(text),
        }
    }

    /// Append an unstyled value
    pub fn push_value(&self, out: &mut String, text: &str) {
        match self {
            Self::Html => push_escaped(out, text),
            Self::Ansi | Self::Plain => out.push_str(text),
        }
    }
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

/// CSS rules for every style class
pub fn stylesheet() -> String {
    let mut css = String::new();
    for class in StyleClass::ALL {
        css.push_str(&format!(
            ".{} {{ {} }}\n",
            class.css_class(),
            class.css_declarations()
        ));
    }
    css
}
