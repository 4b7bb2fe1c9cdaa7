//! `{{name}}` placeholder rendering for HTML email bodies.
//!
//! Rendering is a single pass over the template: substituted values are
//! never rescanned, so a submitter typing `{{summary}}` into a form field
//! cannot pull other values into the message.

use std::collections::HashMap;

use transfer_core::{Error, Result};

pub const RECEIPT_TEMPLATE: &str = include_str!("../templates/receipt_email.html");
pub const DIGITAL_SECTION_TEMPLATE: &str = include_str!("../templates/digital_section.html");
pub const PHYSICAL_SECTION_TEMPLATE: &str = include_str!("../templates/physical_section.html");
pub const VERIFY_TEMPLATE: &str = include_str!("../templates/verify_email.html");

/// Values for one render call.
#[derive(Debug, Default, Clone)]
pub struct TemplateVars {
    values: HashMap<String, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plain-text value; it is HTML-escaped.
    pub fn text(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.values
            .insert(key.to_string(), escape_html(value.as_ref()));
        self
    }

    /// Add an already rendered HTML fragment, inserted as is.
    pub fn html(mut self, key: &str, fragment: impl Into<String>) -> Self {
        self.values.insert(key.to_string(), fragment.into());
        self
    }
}

/// Escape the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Substitute every `{{name}}` in `template`.
///
/// A placeholder without a value is an error.
pub fn render(template: &str, vars: &TemplateVars) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| Error::Mail("unterminated placeholder in template".to_string()))?;
        let key = after[..end].trim();
        let value = vars
            .values
            .get(key)
            .ok_or_else(|| Error::Mail(format!("no value for placeholder {{{{{}}}}}", key)))?;
        out.push_str(value);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}
