//! CF-006: Template builder.
//!
//! Turns a resolved root mapping into a typed [`Template`]. Each section is
//! optional; unknown top-level keys are ignored. Long-form intrinsics are
//! resolved per field as entities are built, so warnings carry the path of
//! the field they came from.

use super::error::TemplateError;
use super::long_form::LongFormResolver;
use super::short_form::key_path;
use super::types::*;
use indexmap::IndexMap;

/// Logical-id prefix of `Fn::ForEach` loop entries, which are skipped.
pub const FOR_EACH_PREFIX: &str = "Fn::ForEach::";

/// Builds one [`Template`] from a root value.
#[derive(Debug)]
pub struct TemplateBuilder {
    source: String,
    resolver: LongFormResolver,
}

impl TemplateBuilder {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            resolver: LongFormResolver::new(),
        }
    }

    /// Consume the builder and produce the template. The reference graph is
    /// left empty; warnings hold only what the long-form pass found.
    pub fn build(mut self, root: Value) -> Result<Template, TemplateError> {
        let mut root = match root {
            Value::Mapping(map) => map,
            other => {
                return Err(TemplateError::Build {
                    source_name: self.source,
                    message: format!("expected a mapping at the template root, got {}", other.shape()),
                })
            }
        };

        let mut template = Template::new(&self.source);

        if let Some(version) = root.get("AWSTemplateFormatVersion").and_then(text) {
            template.format_version = version;
        }
        template.description = root.get("Description").and_then(text);

        for (id, def) in section(&mut root, "Parameters") {
            match def {
                Value::Mapping(props) => {
                    let parameter = self.build_parameter(&id, props);
                    template.parameters.insert(id, parameter);
                }
                other => skip_definition("Parameters", &id, &other),
            }
        }

        for (id, def) in section(&mut root, "Mappings") {
            match def {
                Value::Mapping(table) => {
                    let mapping = self.build_mapping(&id, table);
                    template.mappings.insert(id, mapping);
                }
                other => skip_definition("Mappings", &id, &other),
            }
        }

        for (id, expr) in section(&mut root, "Conditions") {
            let expression = self.resolver.resolve(expr, &format!("Conditions.{}", id));
            template.conditions.insert(
                id.clone(),
                Condition {
                    logical_id: id,
                    expression,
                },
            );
        }

        for (id, def) in section(&mut root, "Resources") {
            match def {
                Value::Mapping(fields) => {
                    let resource = self.build_resource(&id, fields);
                    template.resources.insert(id, resource);
                }
                other => skip_definition("Resources", &id, &other),
            }
        }

        for (id, def) in section(&mut root, "Outputs") {
            match def {
                Value::Mapping(fields) => {
                    let output = self.build_output(&id, fields);
                    template.outputs.insert(id, output);
                }
                other => skip_definition("Outputs", &id, &other),
            }
        }

        tracing::debug!(
            source = %template.source,
            parameters = template.parameters.len(),
            resources = template.resources.len(),
            outputs = template.outputs.len(),
            "built template"
        );

        template.warnings = self.resolver.into_warnings();
        Ok(template)
    }

    fn build_parameter(&mut self, id: &str, mut props: IndexMap<String, Value>) -> Parameter {
        let mut param = Parameter::new(id);
        let base = format!("Parameters.{}", id);

        if let Some(t) = props.get("Type").and_then(text) {
            param.param_type = t;
        }
        param.description = props.get("Description").and_then(text);
        param.default = props
            .shift_remove("Default")
            .map(|v| self.resolver.resolve(v, &key_path(&base, "Default")));
        if let Some(Value::Sequence(values)) = props.shift_remove("AllowedValues") {
            let allowed = self
                .resolver
                .resolve(Value::Sequence(values), &key_path(&base, "AllowedValues"));
            if let Value::Sequence(values) = allowed {
                param.allowed_values = values;
            }
        }
        param.allowed_pattern = props.get("AllowedPattern").and_then(text);
        param.min_length = props.get("MinLength").and_then(Value::as_u64);
        param.max_length = props.get("MaxLength").and_then(Value::as_u64);
        param.min_value = props.get("MinValue").and_then(Value::as_f64);
        param.max_value = props.get("MaxValue").and_then(Value::as_f64);
        param.constraint_description = props.get("ConstraintDescription").and_then(text);
        param.no_echo = match props.get("NoEcho") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        };

        param
    }

    fn build_mapping(&mut self, id: &str, table: IndexMap<String, Value>) -> Mapping {
        let mut entries = IndexMap::new();
        for (top_key, second) in table {
            match second {
                Value::Mapping(inner) => {
                    let base = format!("Mappings.{}.{}", id, top_key);
                    entries.insert(top_key, self.resolve_fields(inner, &base));
                }
                other => {
                    tracing::debug!(mapping = id, key = %top_key, shape = %other.shape(), "skipping non-mapping entry");
                }
            }
        }

        Mapping {
            logical_id: id.to_string(),
            entries,
        }
    }

    fn build_resource(&mut self, id: &str, mut fields: IndexMap<String, Value>) -> Resource {
        let resource_type = fields.get("Type").and_then(text).unwrap_or_default();
        let mut resource = Resource::new(id, &resource_type);
        let base = format!("Resources.{}", id);

        if let Some(Value::Mapping(props)) = fields.shift_remove("Properties") {
            let props_path = key_path(&base, "Properties");
            resource.properties = self.resolve_fields(props, &props_path);
        }

        resource.depends_on = match fields.get("DependsOn") {
            Some(Value::Sequence(items)) => items.iter().filter_map(text).collect(),
            Some(single) => text(single).into_iter().collect(),
            None => Vec::new(),
        };

        resource.condition = fields.get("Condition").and_then(text);
        resource.deletion_policy = fields.get("DeletionPolicy").and_then(text);
        resource.update_replace_policy = fields.get("UpdateReplacePolicy").and_then(text);

        if let Some(Value::Mapping(metadata)) = fields.shift_remove("Metadata") {
            let metadata_path = key_path(&base, "Metadata");
            resource.metadata = self.resolve_fields(metadata, &metadata_path);
        }

        resource
    }

    fn build_output(&mut self, id: &str, mut fields: IndexMap<String, Value>) -> Output {
        let base = format!("Outputs.{}", id);

        let value = match fields.shift_remove("Value") {
            Some(v) => self.resolver.resolve(v, &key_path(&base, "Value")),
            None => Value::Null,
        };

        let export_name = match fields.shift_remove("Export") {
            Some(Value::Mapping(mut export)) => export
                .shift_remove("Name")
                .map(|name| self.resolver.resolve(name, &format!("{}.Export.Name", base))),
            _ => None,
        };

        Output {
            logical_id: id.to_string(),
            value,
            description: fields.get("Description").and_then(text),
            export_name,
            condition: fields.get("Condition").and_then(text),
        }
    }

    fn resolve_fields(
        &mut self,
        fields: IndexMap<String, Value>,
        base: &str,
    ) -> IndexMap<String, Value> {
        fields
            .into_iter()
            .map(|(name, value)| {
                let path = key_path(base, &name);
                (name, self.resolver.resolve(value, &path))
            })
            .collect()
    }
}

/// Take a top-level section's entries, dropping `Fn::ForEach` loops.
fn section(root: &mut IndexMap<String, Value>, name: &str) -> Vec<(String, Value)> {
    match root.shift_remove(name) {
        Some(Value::Mapping(entries)) => entries
            .into_iter()
            .filter(|(id, _)| {
                let keep = !id.starts_with(FOR_EACH_PREFIX);
                if !keep {
                    tracing::debug!(section = name, id = %id, "skipping Fn::ForEach entry");
                }
                keep
            })
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            tracing::debug!(section = name, shape = %other.shape(), "section is not a mapping");
            Vec::new()
        }
    }
}

fn skip_definition(section: &str, id: &str, def: &Value) {
    tracing::debug!(section, id, shape = %def.shape(), "skipping non-mapping definition");
}

/// Scalar text of a field, treating null as absent.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => other.scalar_text(),
    }
}
