// crates/rt-config/src/template.rs
// ============================================================================
// Module: RT Config Templates
// Description: Variable substitution applied before HCL decoding.
// Purpose: Let one config file serve every environment and account.
// Dependencies: regex, tera
// ============================================================================

//! ## Overview
//! Config files are rendered with [`tera`] before they are decoded. Two
//! variables are available, each under two names: `Environment` /
//! `environment` and `AwsAccountId` / `account_id`. Existing documents
//! reference them with a leading dot (`{{.Environment}}`); those field
//! references are rewritten to plain variable references before rendering.

use std::borrow::Cow;
use std::error::Error as _;
use std::sync::LazyLock;

use regex::Regex;
use tera::Context;
use tera::Tera;

use crate::error::LoadErrorKind;

/// Matches `{{.Name}}` field references, keeping whitespace-trim markers.
static FIELD_REFERENCE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"\{\{(-?)\s*\.([A-Za-z_][A-Za-z0-9_]*)\s*(-?)\}\}")
});

/// Values substituted into a config template.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateVariables<'a> {
    /// Environment label, may be empty.
    pub environment: &'a str,
    /// Cloud account identifier, may be empty.
    pub account_id: &'a str,
}

/// Renders `text` with `variables`.
///
/// # Errors
///
/// Returns [`LoadErrorKind::Template`] when the template does not parse or
/// references an unknown variable.
pub fn render(text: &str, variables: TemplateVariables<'_>) -> Result<String, LoadErrorKind> {
    let mut context = Context::new();
    context.insert("Environment", variables.environment);
    context.insert("environment", variables.environment);
    context.insert("AwsAccountId", variables.account_id);
    context.insert("account_id", variables.account_id);
    let text = rewrite_field_references(text)?;
    let rendered = Tera::one_off(&text, &context, false)
        .map_err(|err| LoadErrorKind::Template(error_chain(&err)))?;
    tracing::debug!(bytes = rendered.len(), "rendered config template");
    Ok(rendered)
}

/// Rewrites `{{.Name}}` to `{{ Name }}`.
fn rewrite_field_references(text: &str) -> Result<Cow<'_, str>, LoadErrorKind> {
    let pattern = FIELD_REFERENCE
        .as_ref()
        .map_err(|err| LoadErrorKind::Template(format!("field reference pattern is unavailable: {err}")))?;
    Ok(pattern.replace_all(text, "{{${1} ${2} ${3}}}"))
}

/// Joins an error with its sources; tera keeps the useful detail in the chain.
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
