//! RFC 6570 URI templates, up to level 3, for string-valued variables.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

static VARNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9_]|%[0-9A-Fa-f]{2})(?:\.?(?:[A-Za-z0-9_]|%[0-9A-Fa-f]{2}))*$")
        .expect("varname pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unclosed expression starting at byte {0}")]
    Unclosed(usize),
    #[error("empty expression at byte {0}")]
    EmptyExpression(usize),
    #[error("invalid variable name {0:?}")]
    InvalidVariable(String),
    #[error("invalid prefix modifier on {0:?}")]
    InvalidPrefix(String),
}

#[derive(Debug, Clone, Copy)]
struct Operator {
    first: &'static str,
    separator: &'static str,
    named: bool,
    if_empty: &'static str,
    allow_reserved: bool,
}

impl Operator {
    fn from_char(c: char) -> Option<Self> {
        let op = match c {
            '+' => Self::new("", ",", false, "", true),
            '#' => Self::new("#", ",", false, "", true),
            '.' => Self::new(".", ".", false, "", false),
            '/' => Self::new("/", "/", false, "", false),
            ';' => Self::new(";", ";", true, "", false),
            '?' => Self::new("?", "&", true, "=", false),
            '&' => Self::new("&", "&", true, "=", false),
            _ => return None,
        };
        Some(op)
    }

    const fn simple() -> Self {
        Self::new("", ",", false, "", false)
    }

    const fn new(
        first: &'static str,
        separator: &'static str,
        named: bool,
        if_empty: &'static str,
        allow_reserved: bool,
    ) -> Self {
        Self {
            first,
            separator,
            named,
            if_empty,
            allow_reserved,
        }
    }
}

#[derive(Debug)]
struct VarSpec<'a> {
    name: &'a str,
    prefix: Option<usize>,
}

/// A URI template with its current parameter bindings.
#[derive(Debug, Clone, Default)]
pub struct UriTemplate {
    template: String,
    parameters: BTreeMap<String, String>,
}

impl UriTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Binds `name` to `value`, replacing any previous binding.
    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn set_parameters<I, K, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in values {
            self.set_parameter(name, value);
        }
        self
    }

    /// Expands every expression; variables without a binding are dropped.
    pub fn resolve(&self) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        let mut offset = 0;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let start = offset + open;
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                return Err(TemplateError::Unclosed(start));
            };
            let expression = &after[..close];
            if expression.is_empty() {
                return Err(TemplateError::EmptyExpression(start));
            }
            self.expand(expression, &mut out)?;
            let consumed = open + 1 + close + 1;
            rest = &rest[consumed..];
            offset += consumed;
        }
        out.push_str(rest);
        Ok(out)
    }

    fn expand(&self, expression: &str, out: &mut String) -> Result<(), TemplateError> {
        let mut chars = expression.chars();
        let (operator, body) = match chars.next().and_then(Operator::from_char) {
            Some(op) => (op, chars.as_str()),
            None => (Operator::simple(), expression),
        };

        let specs = body
            .split(',')
            .map(parse_varspec)
            .collect::<Result<Vec<_>, _>>()?;

        let mut first = true;
        for spec in specs {
            let Some(value) = self.parameters.get(spec.name) else {
                continue;
            };
            out.push_str(if first {
                operator.first
            } else {
                operator.separator
            });
            first = false;

            if operator.named {
                out.push_str(spec.name);
                if value.is_empty() {
                    out.push_str(operator.if_empty);
                    continue;
                }
                out.push('=');
            }

            let value = match spec.prefix {
                Some(len) => truncate_chars(value, len),
                None => value.as_str(),
            };
            encode_into(value, operator.allow_reserved, out);
        }
        Ok(())
    }
}

fn parse_varspec(raw: &str) -> Result<VarSpec<'_>, TemplateError> {
    // Explode has no effect on string values.
    let raw = raw.strip_suffix('*').unwrap_or(raw);
    let (name, prefix) = match raw.split_once(':') {
        Some((name, len)) => {
            let len = len
                .parse::<usize>()
                .ok()
                .filter(|n| (1..10_000).contains(n))
                .ok_or_else(|| TemplateError::InvalidPrefix(raw.to_string()))?;
            (name, Some(len))
        }
        None => (raw, None),
    };
    if !is_valid_variable_name(name) {
        return Err(TemplateError::InvalidVariable(name.to_string()));
    }
    Ok(VarSpec { name, prefix })
}

fn truncate_chars(value: &str, len: usize) -> &str {
    match value.char_indices().nth(len) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

/// Characters RFC 3986 calls unreserved pass through; everything else is encoded.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Unreserved plus reserved characters, for `{+var}` and `{#var}`.
const UNRESERVED_OR_RESERVED: &AsciiSet = &UNRESERVED
    .remove(b':')
    .remove(b'/')
    .remove(b'?')
    .remove(b'#')
    .remove(b'[')
    .remove(b']')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

/// Whether `name` is a valid RFC 6570 variable name.
pub fn is_valid_variable_name(name: &str) -> bool {
    VARNAME.is_match(name)
}

/// Percent-encodes everything but unreserved characters, braces included, so
/// the result is safe as literal template text.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, UNRESERVED).to_string()
}

fn encode_into(value: &str, allow_reserved: bool, out: &mut String) {
    if !allow_reserved {
        out.extend(utf8_percent_encode(value, UNRESERVED));
        return;
    }

    // Existing pct-encoded triplets are kept as they are.
    let mut rest = value;
    while let Some(pos) = rest.find('%') {
        let (head, tail) = rest.split_at(pos);
        out.extend(utf8_percent_encode(head, UNRESERVED_OR_RESERVED));
        let is_triplet = tail
            .as_bytes()
            .get(1..3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if is_triplet {
            out.push_str(&tail[..3]);
            rest = &tail[3..];
        } else {
            out.push_str("%25");
            rest = &tail[1..];
        }
    }
    out.extend(utf8_percent_encode(rest, UNRESERVED_OR_RESERVED));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> UriTemplate {
        let mut template = UriTemplate::new("");
        template
            .set_parameter("var", "value")
            .set_parameter("hello", "Hello World!")
            .set_parameter("path", "/foo/bar")
            .set_parameter("empty", "")
            .set_parameter("x", "1024")
            .set_parameter("y", "768");
        template
    }

    fn expand(template: &str) -> String {
        let mut t = sample();
        t.template = template.to_string();
        t.resolve().expect("template resolves")
    }

    #[test]
    fn simple_and_reserved_expansion() {
        assert_eq!(expand("{var}"), "value");
        assert_eq!(expand("{hello}"), "Hello%20World%21");
        assert_eq!(expand("{+path}/here"), "/foo/bar/here");
        assert_eq!(expand("{+hello}"), "Hello%20World!");
        assert_eq!(expand("{x,y}"), "1024,768");
    }

    #[test]
    fn operators_follow_rfc_6570() {
        assert_eq!(expand("{#path}"), "#/foo/bar");
        assert_eq!(expand("X{.var}"), "X.value");
        assert_eq!(expand("{/var,x}/here"), "/value/1024/here");
        assert_eq!(expand("{;x,y,empty}"), ";x=1024;y=768;empty");
        assert_eq!(expand("{?x,y,empty}"), "?x=1024&y=768&empty=");
        assert_eq!(expand("?fixed=yes{&x}"), "?fixed=yes&x=1024");
        assert_eq!(expand("{var:3}"), "val");
    }

    #[test]
    fn undefined_variables_are_dropped() {
        assert_eq!(expand("/r?n=a{&missing}"), "/r?n=a");
        assert_eq!(expand("{?missing,x}"), "?x=1024");
        assert_eq!(expand("a{missing}b"), "ab");
    }

    #[test]
    fn percent_triplets_survive_reserved_expansion() {
        let mut t = UriTemplate::new("{+v}|{v}");
        t.set_parameter("v", "50%25");
        assert_eq!(t.resolve().unwrap(), "50%25|50%2525");
    }

    #[test]
    fn non_ascii_and_stray_percent_are_encoded() {
        let mut t = UriTemplate::new("{v}|{+v}");
        t.set_parameter("v", "caf\u{e9} 100%");
        assert_eq!(t.resolve().unwrap(), "caf%C3%A9%20100%25|caf%C3%A9%20100%25");
    }

    #[test]
    fn components_are_safe_as_literal_text() {
        assert_eq!(encode_component("my time&line"), "my%20time%26line");
        assert_eq!(encode_component("{x}#y"), "%7Bx%7D%23y");
        assert_eq!(encode_component("plain_name-1.0~"), "plain_name-1.0~");
    }

    #[test]
    fn variable_names_follow_rfc_6570() {
        assert!(is_valid_variable_name("requestId"));
        assert!(is_valid_variable_name("a.b_c"));
        assert!(!is_valid_variable_name("request-id"));
        assert!(!is_valid_variable_name(""));
    }

    #[test]
    fn malformed_templates_are_rejected() {
        assert_eq!(
            UriTemplate::new("/a{b").resolve(),
            Err(TemplateError::Unclosed(2))
        );
        assert_eq!(
            UriTemplate::new("/a{}").resolve(),
            Err(TemplateError::EmptyExpression(2))
        );
        assert!(matches!(
            UriTemplate::new("{a b}").resolve(),
            Err(TemplateError::InvalidVariable(_))
        ));
        assert!(matches!(
            UriTemplate::new("{a:0}").resolve(),
            Err(TemplateError::InvalidPrefix(_))
        ));
    }
}
