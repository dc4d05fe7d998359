//! Utility functions shared by the manager and the view.
//!
//! - Content digests (registry keys) and stable name hashing (package names)
//! - URL and path helpers
//! - Inline CSS minification

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::Browsers;
use sha2::{Digest, Sha256};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Stable Hashing
// ---------------------------------------------------------------------------

/// 32-bit string hash rendered as 8 hex digits.
///
/// Stable across runs and platforms. Short and collision-prone, so it only
/// names packages; registry keys use [`content_key`].
pub fn stable_hash_8(content: &str) -> String {
    let mut hash: i32 = 0;
    for byte in content.bytes() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(byte as i32);
    }
    let normalized = hash.wrapping_abs() as u32;
    format!("{normalized:08x}")
}

/// Default registry key for a piece of content without an explicit key:
/// the hex SHA-256 of the content.
pub fn content_key(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

// ---------------------------------------------------------------------------
// URLs and Paths
// ---------------------------------------------------------------------------

/// A URL is relative unless it carries a scheme (`https://…`) or is
/// protocol-relative (`//cdn…`). Root-relative paths (`/js/app.js`) count
/// as relative.
pub fn is_relative_url(url: &str) -> bool {
    !url.starts_with("//") && !url.contains("://")
}

/// Join a base URL or path with a relative asset.
pub fn join_url(base: &str, asset: &str) -> String {
    format!("{}/{}", base, asset)
}

/// Normalize a single file URL so it can live in a bundle with an empty base URL.
pub fn ad_hoc_asset(url: &str) -> String {
    if url.starts_with("//") {
        url.to_string()
    } else {
        url.trim_start_matches('/').to_string()
    }
}

/// Lowercase extension of a path, ignoring any query string or fragment.
pub fn file_extension(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rfind('.') {
        Some(idx) if idx + 1 < file.len() => file[idx + 1..].to_lowercase(),
        _ => String::new(),
    }
}

/// Last segment of a qualified bundle name (`app.assets.GridAsset` → `GridAsset`).
pub fn short_name(name: &str) -> &str {
    let after_dot = name.rsplit('.').next().unwrap_or(name);
    let after_backslash = after_dot.rsplit('\\').next().unwrap_or(after_dot);
    after_backslash.rsplit("::").next().unwrap_or(after_backslash)
}

// ---------------------------------------------------------------------------
// CSS Minification
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CssError {
    #[error("CSS parse error: {0}")]
    Parse(String),

    #[error("CSS minify error: {0}")]
    Minify(String),

    #[error("CSS print error: {0}")]
    Print(String),
}

/// Minify a CSS block.
pub fn minify_css(code: &str) -> Result<String, CssError> {
    let mut stylesheet = StyleSheet::parse(code, ParserOptions::default())
        .map_err(|e| CssError::Parse(e.to_string()))?;

    stylesheet
        .minify(MinifyOptions {
            targets: Browsers::default().into(),
            ..Default::default()
        })
        .map_err(|e| CssError::Minify(e.to_string()))?;

    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..Default::default()
        })
        .map_err(|e| CssError::Print(e.to_string()))?;

    Ok(result.code)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
