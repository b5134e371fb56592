//! Server-rendered HTML pages
//!
//! Templates live in `templates/` and are compiled into the binary.
//! Every page gets the footer settings and the content navigation.

mod pages;

use anyhow::{anyhow, Context as _, Result};
use rust_embed::RustEmbed;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error as StdError;
use tera::{Context, Tera};

pub use pages::router;

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct Templates;

/// One entry of the header navigation
#[derive(Debug, Serialize)]
pub struct NavLink {
    pub label: &'static str,
    pub url: String,
}

/// Tera instance holding the embedded templates
pub struct PageRenderer {
    tera: Tera,
}

impl PageRenderer {
    pub fn new() -> Result<Self> {
        let mut sources = Vec::new();
        for name in Templates::iter() {
            let file = Templates::get(&name)
                .ok_or_else(|| anyhow!("Embedded template vanished: {}", name))?;
            let source = String::from_utf8(file.data.into_owned())
                .with_context(|| format!("Template is not UTF-8: {}", name))?;
            sources.push((name.to_string(), source));
        }

        // parents first so child templates resolve on the first pass
        sources.sort_by_key(|(name, _)| name != "base.html");

        let mut tera = Tera::default();
        tera.add_raw_templates(sources)
            .map_err(|e| anyhow!(describe(&e)))
            .context("Failed to load page templates")?;
        tera.register_filter("price", price_filter);

        tracing::debug!("Loaded {} page templates", tera.get_template_names().count());
        Ok(Self { tera })
    }

    pub fn render(&self, template: &str, context: &Context) -> Result<String> {
        self.tera
            .render(template, context)
            .map_err(|e| anyhow!("Failed to render '{}': {}", template, describe(&e)))
    }

    /// Minimal page used when even `error.html` fails to render
    pub fn fallback_page(status: u16, message: &str) -> String {
        format!(
            "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"UTF-8\"><title>{status}</title></head>\
             <body><h1>{status}</h1><p>{}</p><p><a href=\"/\">Home</a></p></body></html>",
            tera::escape_html(message)
        )
    }
}

/// Header links for every content kind
pub fn nav_links() -> Vec<NavLink> {
    crate::models::ContentKind::ALL
        .iter()
        .map(|kind| NavLink {
            label: kind.label(),
            url: format!("/{}", kind.route_slug()),
        })
        .collect()
}

/// Cents to a decimal price string, `1250` -> `12.50`
pub fn format_price(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

fn price_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let cents = value
        .as_i64()
        .ok_or_else(|| tera::Error::msg("price filter expects an integer amount in cents"))?;
    Ok(Value::String(format_price(cents)))
}

/// Flatten a Tera error and its causes into one line
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(&format!("\n  Caused by: {}", cause));
        source = cause.source();
    }
    message
}
