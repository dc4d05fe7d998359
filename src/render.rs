//! Render pipeline around the composer.
//!
//! Template engines are external: anything implementing [`Renderer`] can
//! produce markup, registering resources on the [`WebView`] as it goes.
//! Before/after hooks are passed explicitly through [`RenderHooks`]; a
//! before-hook can cancel the render, an after-hook can rewrite the output.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::view::WebView;
use crate::ViewError;

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

/// State passed to render hooks.
#[derive(Debug)]
pub struct ViewEvent<'a> {
    /// Name of the view being rendered.
    pub view: &'a str,
    pub params: &'a Value,
    /// Rendering result. Only set for after-hooks, which may replace it.
    pub output: Option<String>,
    /// Set to `false` in a before-hook to cancel the render.
    pub is_valid: bool,
}

type Hook = Box<dyn Fn(&mut ViewEvent<'_>) + Send + Sync>;

#[derive(Default)]
pub struct RenderHooks {
    before: Vec<Hook>,
    after: Vec<Hook>,
}

impl std::fmt::Debug for RenderHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderHooks")
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}

impl RenderHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ViewEvent<'_>) + Send + Sync + 'static,
    {
        self.before.push(Box::new(hook));
        self
    }

    pub fn after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ViewEvent<'_>) + Send + Sync + 'static,
    {
        self.after.push(Box::new(hook));
        self
    }

    fn run_before(&self, view: &str, params: &Value) -> bool {
        let mut event = ViewEvent {
            view,
            params,
            output: None,
            is_valid: true,
        };
        for hook in &self.before {
            hook(&mut event);
        }
        event.is_valid
    }

    fn run_after(&self, view: &str, params: &Value, output: String) -> String {
        if self.after.is_empty() {
            return output;
        }
        let mut event = ViewEvent {
            view,
            params,
            output: Some(output),
            is_valid: true,
        };
        for hook in &self.after {
            hook(&mut event);
        }
        event.output.unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Produces markup for a named view.
pub trait Renderer {
    fn render(&self, view: &str, params: &Value, web_view: &mut WebView) -> Result<String, ViewError>;
}

/// Outcome of [`WebView::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Output(String),
    /// A before-hook cancelled the render.
    Cancelled,
}

impl Rendered {
    pub fn into_output(self) -> Option<String> {
        match self {
            Rendered::Output(output) => Some(output),
            Rendered::Cancelled => None,
        }
    }
}

impl WebView {
    /// Render one view through `renderer`, running `hooks` around it.
    pub fn render(
        &mut self,
        renderer: &dyn Renderer,
        view: &str,
        params: &Value,
        hooks: &RenderHooks,
    ) -> Result<Rendered, ViewError> {
        if !hooks.run_before(view, params) {
            return Ok(Rendered::Cancelled);
        }
        let output = renderer.render(view, params, self)?;
        Ok(Rendered::Output(hooks.run_after(view, params, output)))
    }

    /// Render `view`, wrap it in `layout` (bound as `content`), and compose
    /// the registered assets into the placeholders.
    ///
    /// The view is cleared on every exit path.
    pub fn render_page(
        &mut self,
        renderer: &dyn Renderer,
        view: &str,
        layout: &str,
        params: &Value,
        hooks: &RenderHooks,
    ) -> Result<Rendered, ViewError> {
        let mut scope = self.scope();

        let content = match scope.render(renderer, view, params, hooks)? {
            Rendered::Output(content) => content,
            Rendered::Cancelled => return Ok(Rendered::Cancelled),
        };

        let mut layout_params = match params {
            Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        layout_params.insert("content".into(), Value::String(content));
        let layout_params = Value::Object(layout_params);

        let page = match scope.render(renderer, layout, &layout_params, hooks)? {
            Rendered::Output(page) => page,
            Rendered::Cancelled => return Ok(Rendered::Cancelled),
        };

        Ok(Rendered::Output(scope.render_layout(&page)?))
    }
}

// ---------------------------------------------------------------------------
// MarkupRenderer
// ---------------------------------------------------------------------------

/// Named markup templates with `{{ marker }}` expansion.
///
/// Recognized markers: `head`, `begin_body`, `end_body` (placeholder
/// tokens), `title` (the view's title) and any top-level param (strings as
/// is, other scalars via their JSON form). An unknown marker is an error.
#[derive(Debug, Clone, Default)]
pub struct MarkupRenderer {
    templates: HashMap<String, String>,
}

fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("marker pattern is valid")
    })
}

impl MarkupRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.insert(name, template);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(name.into(), template.into());
    }
}

impl Renderer for MarkupRenderer {
    fn render(&self, view: &str, params: &Value, web_view: &mut WebView) -> Result<String, ViewError> {
        let template = self
            .templates
            .get(view)
            .ok_or_else(|| ViewError::Render(format!("unknown view `{}`", view)))?;

        let mut out = String::with_capacity(template.len());
        let mut last = 0;
        for caps in marker_pattern().captures_iter(template) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&template[last..whole.start()]);
            match name.as_str() {
                "head" => out.push_str(web_view.head()),
                "begin_body" => out.push_str(web_view.begin_body()),
                "end_body" => out.push_str(web_view.end_body()?),
                "title" => out.push_str(web_view.title.as_deref().unwrap_or_default()),
                other => match params.get(other) {
                    Some(Value::String(s)) => out.push_str(s),
                    Some(Value::Null) => {}
                    Some(value) => out.push_str(&value.to_string()),
                    None => {
                        return Err(ViewError::Render(format!(
                            "unbound marker `{}` in view `{}`",
                            other, view
                        )))
                    }
                },
            }
            last = whole.end();
        }
        out.push_str(&template[last..]);
        Ok(out)
    }
}
