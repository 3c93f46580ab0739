//! HTML task templates.
//!
//! A project's template contains `${field}` placeholders. The set of
//! placeholder names is extracted when the project is saved and must match
//! the header of every CSV uploaded for that project. Rendering substitutes
//! one CSV row into the template.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::CoreError;

/// Regex pattern matching `${field}` placeholders.
pub const FIELD_PATTERN: &str = r"\$\{(\w+)\}";

/// Maximum template size in bytes.
pub const MAX_TEMPLATE_LENGTH: usize = 1_000_000;

static FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(FIELD_PATTERN).expect("valid regex"));

/// Validate a template body: must be non-empty and within the size limit.
pub fn validate_template(html: &str) -> Result<(), CoreError> {
    if html.trim().is_empty() {
        return Err(CoreError::Validation(
            "HTML template must not be empty".to_string(),
        ));
    }
    if html.len() > MAX_TEMPLATE_LENGTH {
        return Err(CoreError::Validation(format!(
            "HTML template exceeds maximum length of {MAX_TEMPLATE_LENGTH} bytes (got {})",
            html.len()
        )));
    }
    Ok(())
}

/// Extract the names of all `${field}` placeholders.
///
/// Names are returned in order of first appearance, without duplicates.
pub fn extract_field_names(html: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in FIELD_RE.captures_iter(html) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Substitute `fields` into the template.
///
/// Values are HTML-escaped. Placeholders with no matching field are left
/// untouched so a broken template is visible in the preview.
pub fn render(html: &str, fields: &HashMap<String, String>) -> String {
    FIELD_RE
        .replace_all(html, |caps: &Captures| match fields.get(&caps[1]) {
            Some(value) => escape_html(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Escape the five HTML-significant characters.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}
