/// Encodes values for placement inside HTML markup.
pub trait HtmlEncoder: Send + Sync {
    fn attribute_encode(&self, value: &str) -> String;
}

/// Escapes the characters that can terminate or corrupt a quoted attribute.
#[derive(Debug, Clone, Default)]
pub struct HtmlAttributeEncoder;

impl HtmlEncoder for HtmlAttributeEncoder {
    fn attribute_encode(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len());
        for c in value.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&#39;"),
                _ => out.push(c),
            }
        }
        out
    }
}
