//! Section composition: fixed output order, keyed registries, inline JS
//! wrappers and clearing.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use webview_assets::html::attrs;
use webview_assets::view::{PH_BODY_BEGIN, PH_BODY_END, PH_HEAD};
use webview_assets::{
    AssetManager, AssetManagerConfig, Attributes, BundleDeclaration, FileOptions, NoAliases, Position,
    Sections, StaticBundleSource, WebView,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn empty_view() -> WebView {
    WebView::new(Arc::new(AssetManager::with_source(StaticBundleSource::new())))
}

fn view_with(source: StaticBundleSource) -> WebView {
    WebView::new(Arc::new(AssetManager::with_source(source)))
}

fn view_with_config(config: AssetManagerConfig, source: StaticBundleSource) -> WebView {
    let manager = AssetManager::new(config, Arc::new(source), Arc::new(NoAliases)).unwrap();
    WebView::new(Arc::new(manager))
}

fn inline(code: &str) -> String {
    format!(r#"<script type="text/javascript">{}</script>"#, code)
}

// ============================================================================
// Output order
// ============================================================================

#[test]
fn head_follows_fixed_order() {
    let mut view = empty_view();

    // Registered in reverse order on purpose.
    view.register_js("f();", Some(Position::Head), None).unwrap();
    view.register_js_file("/e.js", FileOptions::at(Position::Head), None)
        .unwrap();
    view.register_css("d{}", Attributes::new(), Some("d"));
    view.register_css_file("/c.css", FileOptions::default(), Some("c"))
        .unwrap();
    view.register_link_tag(attrs([("rel", "b"), ("href", "/b")]), None);
    view.register_meta_tag(attrs([("name", "a")]), Some("a"));

    let sections = view.compose().unwrap();
    assert_eq!(
        sections.head,
        [
            r#"<meta name="a">"#,
            r#"<link href="/b" rel="b">"#,
            r#"<link href="/c.css" rel="stylesheet">"#,
            "<style>d{}</style>",
            r#"<script src="/e.js"></script>"#,
            inline("f();").as_str(),
        ]
        .join("\n")
    );
    assert_eq!(sections.body_begin, "");
    assert_eq!(sections.body_end, "");
}

#[test]
fn body_begin_has_files_then_inline() {
    let mut view = empty_view();
    view.register_js("init();", Some(Position::Begin), None).unwrap();
    view.register_js_file("/begin.js", FileOptions::at(Position::Begin), None)
        .unwrap();

    let sections = view.compose().unwrap();
    assert_eq!(
        sections.body_begin,
        format!(r#"<script src="/begin.js"></script>{}{}"#, "\n", inline("init();"))
    );
}

#[test]
fn body_end_wraps_ready_and_load() {
    let mut view = empty_view();
    view.register_js("load();", Some(Position::Load), None).unwrap();
    view.register_js("ready();", None, None).unwrap();
    view.register_js("end();", Some(Position::End), None).unwrap();
    view.register_js_file("/end.js", FileOptions::default(), None)
        .unwrap();

    let sections = view.compose().unwrap();
    assert_eq!(
        sections.body_end,
        [
            r#"<script src="/end.js"></script>"#.to_string(),
            inline("end();"),
            inline("jQuery(document).ready(function () {\nready();\n});"),
            inline("jQuery(window).load(function () {\nload();\n});"),
        ]
        .join("\n")
    );
}

#[test]
fn inline_blocks_share_one_script_per_position() {
    let mut view = empty_view();
    view.register_js("one();", Some(Position::End), None).unwrap();
    view.register_js("two();", Some(Position::End), None).unwrap();

    let body_end = view.compose().unwrap().body_end;
    assert_eq!(body_end, inline("one();\ntwo();"));
}

#[test]
fn file_options_render_as_attributes() {
    let mut view = empty_view();
    view.register_js_file(
        "/app.js",
        FileOptions::default().attr("defer", "defer").attr("data-x", "a\"b"),
        None,
    )
    .unwrap();
    view.register_css_file(
        "/ie.css",
        FileOptions {
            condition: Some("lt IE 9".into()),
            ..Default::default()
        },
        None,
    )
    .unwrap();
    view.register_css_file(
        "/fallback.css",
        FileOptions {
            noscript: true,
            ..Default::default()
        },
        None,
    )
    .unwrap();

    let sections = view.compose().unwrap();
    assert_eq!(
        sections.body_end,
        r#"<script data-x="a&quot;b" defer="defer" src="/app.js"></script>"#
    );
    assert_eq!(
        sections.head,
        [
            "<!--[if lt IE 9]>",
            r#"<link href="/ie.css" rel="stylesheet">"#,
            "<![endif]-->",
            r#"<noscript><link href="/fallback.css" rel="stylesheet"></noscript>"#,
        ]
        .join("\n")
    );
}

// ============================================================================
// Keyed registries
// ============================================================================

#[test]
fn same_key_overwrites_in_place() {
    let mut view = empty_view();
    view.register_css_file("/a.css", FileOptions::default(), Some("theme"))
        .unwrap();
    view.register_css_file("/b.css", FileOptions::default(), None)
        .unwrap();
    view.register_css_file("/c.css", FileOptions::default(), Some("theme"))
        .unwrap();

    assert_eq!(view.css_files().len(), 2);
    let head = view.compose().unwrap().head;
    assert_eq!(
        head,
        [
            r#"<link href="/c.css" rel="stylesheet">"#,
            r#"<link href="/b.css" rel="stylesheet">"#,
        ]
        .join("\n")
    );
}

#[test]
fn identical_content_is_deduplicated() {
    let mut view = empty_view();
    view.register_js("track();", Some(Position::End), None).unwrap();
    view.register_js("track();", Some(Position::End), None).unwrap();
    view.register_meta_tag(attrs([("charset", "utf-8")]), None);
    view.register_meta_tag(attrs([("charset", "utf-8")]), None);
    view.register_js_file("/a.js", FileOptions::default(), None)
        .unwrap();
    view.register_js_file("/a.js", FileOptions::default(), None)
        .unwrap();

    assert_eq!(view.js().get(Position::End).map(|r| r.len()), Some(1));
    assert_eq!(view.meta_tags().len(), 1);
    assert_eq!(view.js_files().len(), 1);
}

#[test]
fn distinct_content_never_shares_a_default_key() {
    let mut view = empty_view();
    // These two collide under a 32-bit string hash.
    view.register_js("Aa", Some(Position::End), None).unwrap();
    view.register_js("BB", Some(Position::End), None).unwrap();
    view.register_css("Aa", Attributes::new(), None);
    view.register_css("BB", Attributes::new(), None);

    let sections = view.compose().unwrap();
    assert_eq!(sections.body_end, inline("Aa\nBB"));
    assert_eq!(sections.head, "<style>Aa</style>\n<style>BB</style>");
}

#[test]
fn deferred_file_positions_render_at_end() {
    let mut view = view_with(StaticBundleSource::new().with(
        "X",
        BundleDeclaration {
            js: vec!["//cdn.example.com/x.js".into()],
            ..Default::default()
        },
    ));
    view.register_js_file("/late.js", FileOptions::at(Position::Ready), None)
        .unwrap();
    view.register_js_file("/later.js", FileOptions::at(Position::Load), None)
        .unwrap();
    view.register_asset_bundle("X", Some(Position::Load)).unwrap();

    let sections = view.compose().unwrap();
    assert_eq!(sections.head, "");
    assert_eq!(sections.body_begin, "");
    assert_eq!(
        sections.body_end,
        [
            r#"<script src="/late.js"></script>"#,
            r#"<script src="/later.js"></script>"#,
            r#"<script src="//cdn.example.com/x.js"></script>"#,
        ]
        .join("\n")
    );
}

#[test]
fn js_fn_is_evaluated_and_trimmed() {
    let mut view = empty_view();
    view.register_js_fn(|| "\n  boot();\n".to_string(), Some(Position::End), None)
        .unwrap();
    assert_eq!(view.compose().unwrap().body_end, inline("boot();"));
}

// ============================================================================
// Bundles in the composition
// ============================================================================

#[test]
fn grid_and_core_land_in_their_fragments() {
    let mut view = view_with(
        StaticBundleSource::new()
            .with(
                "Grid",
                BundleDeclaration {
                    base_url: Some("/static/grid".into()),
                    css: vec!["grid.css".into()],
                    depends: vec!["Core".into()],
                    ..Default::default()
                },
            )
            .with(
                "Core",
                BundleDeclaration {
                    base_url: Some("/static/core/".into()),
                    js: vec!["core.js".into()],
                    ..Default::default()
                },
            ),
    );
    view.register_css("body{}", Attributes::new(), None);
    view.register_asset_bundle("Grid", None).unwrap();

    let sections = view.compose().unwrap();
    assert_eq!(
        sections.head,
        [
            r#"<link href="/static/grid/grid.css" rel="stylesheet">"#,
            "<style>body{}</style>",
        ]
        .join("\n")
    );
    assert_eq!(
        sections.body_end,
        r#"<script src="/static/core/core.js"></script>"#
    );
}

#[test]
fn end_body_drains_bundles_early() {
    let mut view = view_with(StaticBundleSource::new().with(
        "Core",
        BundleDeclaration {
            js: vec!["https://cdn.example.com/core.js".into()],
            ..Default::default()
        },
    ));
    view.register_asset_bundle("Core", None).unwrap();
    assert!(view.js_files().is_empty());

    assert_eq!(view.end_body().unwrap(), PH_BODY_END);
    assert_eq!(view.asset_bundles().count(), 0);
    assert_eq!(view.js_files().len(), 1);

    assert_eq!(
        view.compose().unwrap().body_end,
        r#"<script src="https://cdn.example.com/core.js"></script>"#
    );
}

#[test]
fn ready_bundle_is_registered_for_deferred_js() {
    let mut view = view_with(StaticBundleSource::new().with(
        "Jquery",
        BundleDeclaration {
            base_url: Some("/vendor".into()),
            js: vec!["jquery.js".into()],
            ..Default::default()
        },
    ))
    .with_ready_bundle("Jquery");

    view.register_js("end();", Some(Position::End), None).unwrap();
    assert_eq!(view.asset_bundles().count(), 0);

    view.register_js("go();", None, None).unwrap();
    assert_eq!(view.asset_bundles().count(), 1);

    let body_end = view.compose().unwrap().body_end;
    assert_eq!(
        body_end,
        [
            r#"<script src="/vendor/jquery.js"></script>"#.to_string(),
            inline("end();"),
            inline("jQuery(document).ready(function () {\ngo();\n});"),
        ]
        .join("\n")
    );
}

#[test]
fn concat_emits_one_package_per_extension() {
    let source = StaticBundleSource::new().with(
        "app.assets.GridAsset",
        BundleDeclaration {
            base_url: Some("/static".into()),
            js: vec!["a.js".into(), "b.js".into()],
            css: vec!["a.css".into()],
            concat: Some(true),
            ..Default::default()
        },
    );
    let manager = Arc::new(AssetManager::with_source(source));
    let mut view = WebView::new(Arc::clone(&manager));

    let bundle = view
        .register_asset_bundle("app.assets.GridAsset", None)
        .unwrap();
    let sections = view.compose().unwrap();

    assert_eq!(
        sections.body_end,
        format!(r#"<script src="{}"></script>"#, manager.package_url(&bundle, "js"))
    );
    assert_eq!(
        sections.head,
        format!(
            r#"<link href="{}" rel="stylesheet">"#,
            manager.package_url(&bundle, "css")
        )
    );
    assert!(sections.body_end.contains("/assets/grid-"));
}

#[test]
fn asset_map_redirects_bundle_files() {
    let mut config = AssetManagerConfig {
        base_url: "/assets".into(),
        base_path: "/srv/assets".into(),
        ..Default::default()
    };
    config
        .asset_map
        .insert("jquery.js".into(), "//cdn.example.com/jquery.min.js".into());

    let mut view = view_with_config(
        config,
        StaticBundleSource::new().with(
            "Jquery",
            BundleDeclaration {
                base_url: Some("/vendor".into()),
                js: vec!["dist/jquery.js".into()],
                ..Default::default()
            },
        ),
    );
    view.register_asset_bundle("Jquery", None).unwrap();
    assert_eq!(
        view.compose().unwrap().body_end,
        r#"<script src="//cdn.example.com/jquery.min.js"></script>"#
    );
}

#[test]
fn compress_minifies_inline_css() {
    let config = AssetManagerConfig {
        base_url: "/assets".into(),
        base_path: "/srv/assets".into(),
        compress: Some(true),
        ..Default::default()
    };
    let mut view = view_with_config(config, StaticBundleSource::new());
    view.register_css(".a {\n  color: red;\n}\n", Attributes::new(), None);
    assert_eq!(view.compose().unwrap().head, "<style>.a{color:red}</style>");
}

// ============================================================================
// Clearing
// ============================================================================

#[test]
fn compose_clears_everything() {
    let mut view = view_with(StaticBundleSource::new().with(
        "Core",
        BundleDeclaration {
            js: vec!["core.js".into()],
            ..Default::default()
        },
    ));
    view.register_meta_tag(attrs([("name", "x")]), None);
    view.register_link_tag(attrs([("rel", "icon")]), None);
    view.register_css("a{}", Attributes::new(), None);
    view.register_css_file("/a.css", FileOptions::default(), None)
        .unwrap();
    view.register_js("x();", None, None).unwrap();
    view.register_js_file("/a.js", FileOptions::default(), None)
        .unwrap();
    view.register_asset_bundle("Core", None).unwrap();

    let first = view.compose().unwrap();
    assert!(!first.is_empty());
    assert!(view.is_empty());
    assert_eq!(view.compose().unwrap(), Sections::default());
}

#[test]
fn scope_clears_on_drop() {
    let mut view = empty_view();
    {
        let mut scope = view.scope();
        scope.register_js("x();", None, None).unwrap();
        scope
            .register_css_file("/a.css", FileOptions::default(), None)
            .unwrap();
        assert!(!scope.is_empty());
    }
    assert!(view.is_empty());
}

#[test]
fn placeholder_inside_fragment_is_not_substituted() {
    let mut view = empty_view();
    let code = format!("var token = \"{}\";", PH_BODY_BEGIN);
    view.register_js(&code, Some(Position::Head), None).unwrap();
    view.register_js("begin();", Some(Position::Begin), None).unwrap();

    let page = format!("<head>{PH_HEAD}</head><body>{PH_BODY_BEGIN}{PH_BODY_END}</body>");
    let html = view.render_layout(&page).unwrap();
    assert_eq!(
        html,
        format!(
            "<head>{}</head><body>{}</body>",
            inline(&code),
            inline("begin();")
        )
    );
}

#[test]
fn render_layout_substitutes_first_placeholder_only() {
    let mut view = empty_view();
    view.register_css_file("/a.css", FileOptions::default(), None)
        .unwrap();
    view.register_js("go();", Some(Position::End), None).unwrap();

    let page = format!(
        "<head>{PH_HEAD}</head><body>{PH_BODY_BEGIN}main{PH_BODY_END}</body>{PH_HEAD}"
    );
    let html = view.render_layout(&page).unwrap();
    assert_eq!(
        html,
        format!(
            r#"<head><link href="/a.css" rel="stylesheet"></head><body>main{}</body>{}"#,
            inline("go();"),
            PH_HEAD
        )
    );
}
