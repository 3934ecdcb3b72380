//! CF-010: Template parsing pipeline.
//!
//! Runs the stages in order:
//! 1. Format guard over the raw bytes
//! 2. Decode (YAML node tree, JSON fallback)
//! 3. Short-form tag resolution (YAML only)
//! 4. Template building, with long-form resolution per field
//! 5. Reference graph

use super::builder::TemplateBuilder;
use super::error::TemplateError;
use super::graph::build_reference_graph;
use super::guard::check_format;
use super::loader::{load_document, Document};
use super::short_form::resolve_short_form;
use super::types::Template;
use std::path::Path;

/// Parse a template file from disk. The path becomes the source label.
pub fn parse_template_file(path: &Path) -> Result<Template, TemplateError> {
    let content = std::fs::read(path).map_err(|source| TemplateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_template(&content, &path.display().to_string())
}

/// Parse template bytes. `source_name` labels errors and the result.
pub fn parse_template(content: &[u8], source_name: &str) -> Result<Template, TemplateError> {
    check_format(content).map_err(|reason| TemplateError::RejectedFormat {
        source_name: source_name.to_string(),
        reason,
    })?;

    let (root, mut warnings) = match load_document(content, source_name)? {
        Document::Tagged(tree) => resolve_short_form(&tree),
        Document::Plain(value) => (value, Vec::new()),
    };

    let mut template = TemplateBuilder::new(source_name).build(root)?;
    warnings.append(&mut template.warnings);
    template.warnings = warnings;
    template.reference_graph = build_reference_graph(&template);

    tracing::debug!(
        source = source_name,
        resources = template.resources.len(),
        warnings = template.warnings.len(),
        "parsed template"
    );
    Ok(template)
}
