//! HTML pages of the report.
//!
//! Page content is pluggable through `PageRenderer`. The bundled
//! `SummaryPageRenderer` writes a bare page listing the context values; richer
//! templates belong to the caller.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::AppError;

/// Page files written into the report root, in this order.
pub const PAGES: [&str; 7] = [
    "index.html",
    "data.html",
    "model.html",
    "benchmark.html",
    "minimization.html",
    "raw.html",
    "config.html",
];

pub type PageContext = Map<String, Value>;

pub trait PageRenderer {
    fn render(&self, page: &str, context: &PageContext) -> Result<String, AppError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryPageRenderer;

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

impl PageRenderer for SummaryPageRenderer {
    fn render(&self, page: &str, context: &PageContext) -> Result<String, AppError> {
        let title = page.trim_end_matches(".html");
        let mut html = format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n<h1>{}</h1>\n<table>\n",
            escape(title),
            escape(title)
        );
        for (key, value) in context {
            let text = match value {
                Value::String(s) => s.clone(),
                other => serde_json::to_string(other)
                    .map_err(|e| AppError::io(format!("Failed to render '{key}': {e}")))?,
            };
            html.push_str(&format!(
                "<tr><th>{}</th><td>{}</td></tr>\n",
                escape(key),
                escape(&text)
            ));
        }
        html.push_str("</table>\n</body>\n</html>\n");
        Ok(html)
    }
}

/// Render and write every page into `dir`.
pub fn write_pages(
    dir: &Path,
    renderer: &dyn PageRenderer,
    context: &PageContext,
) -> Result<Vec<PathBuf>, AppError> {
    let mut written = Vec::with_capacity(PAGES.len());
    for page in PAGES {
        let html = renderer.render(page, context)?;
        let path = dir.join(page);
        fs::write(&path, html)
            .map_err(|e| AppError::io(format!("Failed to write page '{}': {e}", path.display())))?;
        debug!(path = %path.display(), "Wrote page.");
        written.push(path);
    }
    Ok(written)
}
