use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context};
use log::info;
use serde::Deserialize;
use serde_json::Value;
use webview_assets::html::Attributes;
use webview_assets::{
    Aliases, AssetManager, AssetManagerConfig, FileOptions, MarkupRenderer, Position, RenderHooks,
    Rendered, StaticBundleSource, WebView,
};

/// A page description read from stdin.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PageInput {
    #[serde(default)]
    manager: AssetManagerConfig,
    #[serde(default)]
    aliases: Aliases,
    #[serde(default)]
    declarations: StaticBundleSource,
    #[serde(default)]
    ready_bundle: Option<String>,
    #[serde(default)]
    page: PageResources,
    #[serde(default)]
    params: Value,
    layout: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PageResources {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    meta_tags: Vec<TagInput>,
    #[serde(default)]
    link_tags: Vec<TagInput>,
    #[serde(default)]
    css: Vec<CodeInput>,
    #[serde(default)]
    css_files: Vec<FileInput>,
    #[serde(default)]
    js: Vec<ScriptInput>,
    #[serde(default)]
    js_files: Vec<FileInput>,
    #[serde(default)]
    bundles: Vec<BundleInput>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TagInput {
    attributes: Attributes,
    #[serde(default)]
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CodeInput {
    code: String,
    #[serde(default)]
    attributes: Attributes,
    #[serde(default)]
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptInput {
    code: String,
    #[serde(default)]
    position: Option<Position>,
    #[serde(default)]
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileInput {
    url: String,
    #[serde(default)]
    options: FileOptions,
    #[serde(default)]
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BundleInput {
    name: String,
    #[serde(default)]
    position: Option<Position>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(err) = run() {
        eprintln!("[webview-assets] {:#}", err);
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let out = parse_out()?;

    let mut stdin_payload = String::new();
    io::stdin()
        .read_to_string(&mut stdin_payload)
        .context("failed to read stdin")?;

    if stdin_payload.trim().is_empty() {
        bail!("stdin payload is empty");
    }

    let input: PageInput = serde_json::from_str(&stdin_payload).context("invalid input JSON")?;
    let html = compose_page(input)?;

    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create dir '{}'", parent.display()))?;
            }
            fs::write(&path, &html)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            info!("wrote {} bytes to {}", html.len(), path.display());
        }
        None => io::stdout()
            .write_all(html.as_bytes())
            .context("failed to write stdout")?,
    }

    Ok(())
}

fn compose_page(input: PageInput) -> anyhow::Result<String> {
    let manager = AssetManager::new(
        input.manager,
        Arc::new(input.declarations),
        Arc::new(input.aliases),
    )
    .context("invalid asset manager configuration")?;

    let mut view = WebView::new(Arc::new(manager));
    if let Some(bundle) = input.ready_bundle {
        view = view.with_ready_bundle(bundle);
    }

    let mut scope = view.scope();
    let page = input.page;
    scope.title = page.title;

    for tag in page.meta_tags {
        scope.register_meta_tag(tag.attributes, tag.key.as_deref());
    }
    for tag in page.link_tags {
        scope.register_link_tag(tag.attributes, tag.key.as_deref());
    }
    for block in page.css {
        scope.register_css(&block.code, block.attributes, block.key.as_deref());
    }
    for file in page.css_files {
        scope
            .register_css_file(&file.url, file.options, file.key.as_deref())
            .with_context(|| format!("failed to register CSS file '{}'", file.url))?;
    }
    for block in page.js {
        scope
            .register_js(&block.code, block.position, block.key.as_deref())
            .context("failed to register inline JS")?;
    }
    for file in page.js_files {
        scope
            .register_js_file(&file.url, file.options, file.key.as_deref())
            .with_context(|| format!("failed to register JS file '{}'", file.url))?;
    }
    for bundle in &page.bundles {
        scope
            .register_asset_bundle(&bundle.name, bundle.position)
            .with_context(|| format!("failed to register bundle '{}'", bundle.name))?;
    }

    let renderer = MarkupRenderer::new().with("layout", input.layout);
    let rendered = scope
        .render(&renderer, "layout", &input.params, &RenderHooks::new())
        .context("failed to render layout")?;
    let Rendered::Output(content) = rendered else {
        bail!("layout render was cancelled");
    };

    let html = scope
        .render_layout(&content)
        .context("failed to compose page sections")?;
    info!(
        "composed page ({} bundles requested, {} bytes)",
        page.bundles.len(),
        html.len()
    );
    Ok(html)
}

fn parse_out() -> anyhow::Result<Option<PathBuf>> {
    let mut out: Option<PathBuf> = None;
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out" => {
                let value = args.next().context("missing value for --out")?;
                out = Some(PathBuf::from(value));
            }
            _ => bail!("unknown argument '{arg}'. usage: webview-assets [--out <path>] < page.json"),
        }
    }

    Ok(out)
}
