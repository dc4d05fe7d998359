//! HTML tag rendering.
//!
//! The composer only needs two shapes of tag: void tags (`<meta>`, `<link>`)
//! and tags with raw content (`<style>`, `<script>`). Anything richer belongs
//! to a templating layer outside this crate.

use std::collections::BTreeMap;

/// HTML attributes, rendered in key order.
pub type Attributes = BTreeMap<String, String>;

/// Build [`Attributes`] from `(name, value)` pairs.
pub fn attrs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Attributes
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Renders single HTML tags from a name and an attribute map.
pub trait TagRenderer: Send + Sync {
    /// A tag without content or closing tag, e.g. `<link rel="stylesheet">`.
    fn void_tag(&self, name: &str, attributes: &Attributes) -> String;

    /// A tag wrapping raw (unescaped) content, e.g. `<script>…</script>`.
    fn content_tag(&self, name: &str, content: &str, attributes: &Attributes) -> String;
}

/// Default [`TagRenderer`]: HTML5 syntax, escaped attribute values.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTagRenderer;

impl HtmlTagRenderer {
    fn attributes(attributes: &Attributes) -> String {
        let mut out = String::new();
        for (name, value) in attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attribute(value));
            out.push('"');
        }
        out
    }
}

impl TagRenderer for HtmlTagRenderer {
    fn void_tag(&self, name: &str, attributes: &Attributes) -> String {
        format!("<{}{}>", name, Self::attributes(attributes))
    }

    fn content_tag(&self, name: &str, content: &str, attributes: &Attributes) -> String {
        format!("<{}{}>{}</{}>", name, Self::attributes(attributes), content, name)
    }
}

/// Escape a string for use inside a double-quoted attribute value.
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// Wrap markup in an IE conditional comment.
pub fn conditional_comment(condition: &str, markup: &str) -> String {
    format!("<!--[if {}]>\n{}\n<![endif]-->", condition, markup)
}
