//! Section composer: collected registries → head / body-begin / body-end HTML.
//!
//! Fixed order:
//! - head: meta tags, link tags, CSS files, inline CSS, head JS files, head inline JS
//! - body-begin: begin JS files, begin inline JS
//! - body-end: end JS files, end inline JS, ready inline JS, load inline JS

use super::{Registry, WebView, PH_BODY_BEGIN, PH_BODY_END, PH_HEAD};
use crate::html::attrs;
use crate::position::Position;
use crate::ViewError;

/// The three composed fragments of a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    pub head: String,
    pub body_begin: String,
    pub body_end: String,
}

impl Sections {
    /// Substitute the first occurrence of each placeholder in `content`.
    ///
    /// Placeholders are located in `content` itself, so a token appearing
    /// inside a substituted fragment is left alone.
    pub fn apply(&self, content: &str) -> String {
        let mut slots: Vec<(usize, &str, &str)> = [
            (PH_HEAD, self.head.as_str()),
            (PH_BODY_BEGIN, self.body_begin.as_str()),
            (PH_BODY_END, self.body_end.as_str()),
        ]
        .into_iter()
        .filter_map(|(token, fragment)| content.find(token).map(|at| (at, token, fragment)))
        .collect();
        slots.sort_by_key(|&(at, _, _)| at);

        let mut out = String::with_capacity(
            content.len() + self.head.len() + self.body_begin.len() + self.body_end.len(),
        );
        let mut last = 0;
        for (at, token, fragment) in slots {
            out.push_str(&content[last..at]);
            out.push_str(fragment);
            last = at + token.len();
        }
        out.push_str(&content[last..]);
        out
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_empty() && self.body_begin.is_empty() && self.body_end.is_empty()
    }
}

fn push_registry(lines: &mut Vec<String>, registry: Option<&Registry>) {
    if let Some(registry) = registry.filter(|r| !r.is_empty()) {
        lines.push(registry.join("\n"));
    }
}

impl WebView {
    /// Drain pending bundles, render all three fragments, then clear the view.
    ///
    /// The view is cleared even when draining fails.
    pub fn compose(&mut self) -> Result<Sections, ViewError> {
        let result = self.register_pending_bundles().map(|()| Sections {
            head: self.render_head_html(),
            body_begin: self.render_body_begin_html(),
            body_end: self.render_body_end_html(),
        });
        self.clear();
        result
    }

    /// Compose and substitute the fragments into a rendered page.
    pub fn render_layout(&mut self, content: &str) -> Result<String, ViewError> {
        Ok(self.compose()?.apply(content))
    }

    /// Render the head fragment from the current registries.
    pub fn render_head_html(&self) -> String {
        let mut lines = Vec::new();
        push_registry(&mut lines, Some(&self.meta_tags));
        push_registry(&mut lines, Some(&self.link_tags));
        push_registry(&mut lines, Some(&self.css_files));
        push_registry(&mut lines, Some(&self.css));
        push_registry(&mut lines, self.js_files.get(Position::Head));
        self.push_inline_script(&mut lines, Position::Head);
        lines.join("\n")
    }

    /// Render the body-begin fragment from the current registries.
    pub fn render_body_begin_html(&self) -> String {
        let mut lines = Vec::new();
        push_registry(&mut lines, self.js_files.get(Position::Begin));
        self.push_inline_script(&mut lines, Position::Begin);
        lines.join("\n")
    }

    /// Render the body-end fragment from the current registries.
    pub fn render_body_end_html(&self) -> String {
        let mut lines = Vec::new();
        push_registry(&mut lines, self.js_files.get(Position::End));
        self.push_inline_script(&mut lines, Position::End);
        self.push_inline_script(&mut lines, Position::Ready);
        self.push_inline_script(&mut lines, Position::Load);
        lines.join("\n")
    }

    fn push_inline_script(&self, lines: &mut Vec<String>, position: Position) {
        if let Some(blocks) = self.js.get(position) {
            lines.push(self.render_inline_script(&blocks.join("\n"), position));
        }
    }

    fn render_inline_script(&self, code: &str, position: Position) -> String {
        let code = match position {
            Position::Ready => format!("jQuery(document).ready(function () {{\n{}\n}});", code),
            Position::Load => format!("jQuery(window).load(function () {{\n{}\n}});", code),
            _ => code.to_string(),
        };
        self.tags
            .content_tag("script", &code, &attrs([("type", "text/javascript")]))
    }
}
