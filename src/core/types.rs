//! CF-001: Intermediate representation for CloudFormation templates.
//!
//! Defines the value model (plain values mixed with intrinsic function calls),
//! the typed template entities, and the soft-warning type produced when an
//! intrinsic is malformed but tolerated. All types derive Serialize so the IR
//! can be dumped as JSON.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

// ============================================================================
// Values
// ============================================================================

/// A template value: a plain YAML/JSON value or an intrinsic function call.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Sequence(Vec<Value>),
    /// Key order follows the document; equality ignores it.
    Mapping(IndexMap<String, Value>),
    Intrinsic(Box<Intrinsic>),
    /// Absent value, with the reason resolution gave up.
    Unresolved(Unresolved),
}

impl Value {
    /// Borrow the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_intrinsic(&self) -> Option<&Intrinsic> {
        match self {
            Self::Intrinsic(i) => Some(i),
            _ => None,
        }
    }

    /// Literal text of a scalar. Null renders as the empty string.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Self::Null => Some(String::new()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(n) => Some(n.to_string()),
            Self::String(s) => Some(s.clone()),
            Self::Sequence(_) | Self::Mapping(_) | Self::Intrinsic(_) | Self::Unresolved(_) => None,
        }
    }

    /// Numeric payload as f64 (integers included).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Self::Sequence(items) => Shape::Sequence { len: items.len() },
            Self::Mapping(_) => Shape::Mapping,
            Self::Intrinsic(_) => Shape::Intrinsic,
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::String(_) | Self::Unresolved(_) => {
                Shape::Scalar
            }
        }
    }

    /// Build a float value; non-finite floats keep their text form.
    pub fn from_f64(f: f64) -> Self {
        match serde_json::Number::from_f64(f) {
            Some(n) => Self::Number(n),
            None => Self::String(f.to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Intrinsic> for Value {
    fn from(i: Intrinsic) -> Self {
        Self::Intrinsic(Box::new(i))
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Mapping(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Structural shape of a node or value, reported in warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    Scalar,
    Sequence { len: usize },
    Mapping,
    Alias,
    Intrinsic,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => write!(f, "scalar"),
            Self::Sequence { len } => write!(f, "{}-element sequence", len),
            Self::Mapping => write!(f, "mapping"),
            Self::Alias => write!(f, "alias"),
            Self::Intrinsic => write!(f, "intrinsic"),
        }
    }
}

/// Why a value could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "unresolved", rename_all = "snake_case")]
pub enum Unresolved {
    /// An alias led back to a node already on the traversal path.
    AliasCycle,
    /// A non-scalar node carried a tag that names no intrinsic.
    UnknownTag { tag: String },
    /// A known intrinsic with an argument shape it does not accept.
    Malformed { intrinsic: IntrinsicKind, shape: Shape },
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AliasCycle => write!(f, "alias cycle"),
            Self::UnknownTag { tag } => write!(f, "unknown tag !{}", tag),
            Self::Malformed { intrinsic, shape } => {
                write!(f, "malformed {}: unexpected {}", intrinsic, shape)
            }
        }
    }
}

// ============================================================================
// Intrinsic functions
// ============================================================================

/// Payload-free discriminant of [`Intrinsic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IntrinsicKind {
    Ref,
    GetAtt,
    Sub,
    Join,
    Select,
    #[serde(rename = "GetAZs")]
    GetAzs,
    If,
    Equals,
    And,
    Or,
    Not,
    Condition,
    FindInMap,
    Base64,
    Cidr,
    ImportValue,
    Split,
    Transform,
    ValueOf,
}

impl IntrinsicKind {
    pub const ALL: [IntrinsicKind; 19] = [
        Self::Ref,
        Self::GetAtt,
        Self::Sub,
        Self::Join,
        Self::Select,
        Self::GetAzs,
        Self::If,
        Self::Equals,
        Self::And,
        Self::Or,
        Self::Not,
        Self::Condition,
        Self::FindInMap,
        Self::Base64,
        Self::Cidr,
        Self::ImportValue,
        Self::Split,
        Self::Transform,
        Self::ValueOf,
    ];

    /// CloudFormation name, which is also the short-form tag (`!GetAtt`).
    pub fn name(self) -> &'static str {
        match self {
            Self::Ref => "Ref",
            Self::GetAtt => "GetAtt",
            Self::Sub => "Sub",
            Self::Join => "Join",
            Self::Select => "Select",
            Self::GetAzs => "GetAZs",
            Self::If => "If",
            Self::Equals => "Equals",
            Self::And => "And",
            Self::Or => "Or",
            Self::Not => "Not",
            Self::Condition => "Condition",
            Self::FindInMap => "FindInMap",
            Self::Base64 => "Base64",
            Self::Cidr => "Cidr",
            Self::ImportValue => "ImportValue",
            Self::Split => "Split",
            Self::Transform => "Transform",
            Self::ValueOf => "ValueOf",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Wrapper key in long form: bare for `Ref`/`Condition`, `Fn::` otherwise.
    pub fn long_form_key(self) -> String {
        match self {
            Self::Ref | Self::Condition => self.name().to_string(),
            other => format!("{}{}", FN_PREFIX, other.name()),
        }
    }

    /// Inverse of [`IntrinsicKind::long_form_key`].
    pub fn from_long_form_key(key: &str) -> Option<Self> {
        match key {
            "Ref" => Some(Self::Ref),
            "Condition" => Some(Self::Condition),
            _ => key
                .strip_prefix(FN_PREFIX)
                .and_then(Self::from_name)
                .filter(|k| !matches!(k, Self::Ref | Self::Condition)),
        }
    }
}

impl fmt::Display for IntrinsicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Namespace prefix of long-form function keys.
pub const FN_PREFIX: &str = "Fn::";

/// A parsed intrinsic function call. Each variant fixes its argument shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "intrinsic", content = "args")]
pub enum Intrinsic {
    Ref(String),
    GetAtt {
        resource: String,
        attribute: String,
    },
    Sub {
        template: String,
        variables: Option<Value>,
    },
    Join {
        delimiter: String,
        values: Value,
    },
    Select {
        index: Value,
        list: Value,
    },
    /// Region argument; the empty string means the current region.
    #[serde(rename = "GetAZs")]
    GetAzs(Value),
    If {
        condition: String,
        when_true: Value,
        when_false: Value,
    },
    Equals(Value, Value),
    And(Vec<Value>),
    Or(Vec<Value>),
    Not(Value),
    Condition(String),
    FindInMap {
        map: Value,
        top_key: Value,
        second_key: Value,
    },
    Base64(Value),
    Cidr {
        ip_block: Value,
        count: Value,
        cidr_bits: Value,
    },
    ImportValue(Value),
    Split {
        delimiter: String,
        source: Value,
    },
    Transform(Value),
    ValueOf(Vec<Value>),
}

impl Intrinsic {
    pub fn kind(&self) -> IntrinsicKind {
        match self {
            Self::Ref(_) => IntrinsicKind::Ref,
            Self::GetAtt { .. } => IntrinsicKind::GetAtt,
            Self::Sub { .. } => IntrinsicKind::Sub,
            Self::Join { .. } => IntrinsicKind::Join,
            Self::Select { .. } => IntrinsicKind::Select,
            Self::GetAzs(_) => IntrinsicKind::GetAzs,
            Self::If { .. } => IntrinsicKind::If,
            Self::Equals(..) => IntrinsicKind::Equals,
            Self::And(_) => IntrinsicKind::And,
            Self::Or(_) => IntrinsicKind::Or,
            Self::Not(_) => IntrinsicKind::Not,
            Self::Condition(_) => IntrinsicKind::Condition,
            Self::FindInMap { .. } => IntrinsicKind::FindInMap,
            Self::Base64(_) => IntrinsicKind::Base64,
            Self::Cidr { .. } => IntrinsicKind::Cidr,
            Self::ImportValue(_) => IntrinsicKind::ImportValue,
            Self::Split { .. } => IntrinsicKind::Split,
            Self::Transform(_) => IntrinsicKind::Transform,
            Self::ValueOf(_) => IntrinsicKind::ValueOf,
        }
    }

    /// Nested value arguments, in argument order. String-typed arguments
    /// (names, delimiters, templates) are not included.
    pub fn values(&self) -> Vec<&Value> {
        match self {
            Self::Ref(_) | Self::GetAtt { .. } | Self::Condition(_) => vec![],
            Self::Sub { variables, .. } => variables.iter().collect(),
            Self::Join { values, .. } => vec![values],
            Self::Select { index, list } => vec![index, list],
            Self::If {
                when_true,
                when_false,
                ..
            } => vec![when_true, when_false],
            Self::Equals(a, b) => vec![a, b],
            Self::And(items) | Self::Or(items) | Self::ValueOf(items) => items.iter().collect(),
            Self::FindInMap {
                map,
                top_key,
                second_key,
            } => vec![map, top_key, second_key],
            Self::Cidr {
                ip_block,
                count,
                cidr_bits,
            } => vec![ip_block, count, cidr_bits],
            Self::Split { source, .. } => vec![source],
            Self::GetAzs(v)
            | Self::Not(v)
            | Self::Base64(v)
            | Self::ImportValue(v)
            | Self::Transform(v) => vec![v],
        }
    }

    /// Mutable [`Intrinsic::values`], each paired with its position in the
    /// argument list. `None` means the payload itself is the argument
    /// (`Base64`, `ImportValue`, `Transform`, `GetAZs`).
    pub fn args_mut(&mut self) -> Vec<(Option<usize>, &mut Value)> {
        match self {
            Self::Ref(_) | Self::GetAtt { .. } | Self::Condition(_) => vec![],
            Self::Sub { variables, .. } => variables.iter_mut().map(|v| (Some(1), v)).collect(),
            Self::Join { values, .. } => vec![(Some(1), values)],
            Self::Select { index, list } => vec![(Some(0), index), (Some(1), list)],
            Self::If {
                when_true,
                when_false,
                ..
            } => vec![(Some(1), when_true), (Some(2), when_false)],
            Self::Equals(a, b) => vec![(Some(0), a), (Some(1), b)],
            Self::And(items) | Self::Or(items) | Self::ValueOf(items) => {
                items.iter_mut().enumerate().map(|(i, v)| (Some(i), v)).collect()
            }
            Self::FindInMap {
                map,
                top_key,
                second_key,
            } => vec![(Some(0), map), (Some(1), top_key), (Some(2), second_key)],
            Self::Cidr {
                ip_block,
                count,
                cidr_bits,
            } => vec![(Some(0), ip_block), (Some(1), count), (Some(2), cidr_bits)],
            Self::Split { source, .. } => vec![(Some(1), source)],
            Self::Not(v) => vec![(Some(0), v)],
            Self::GetAzs(v) | Self::Base64(v) | Self::ImportValue(v) | Self::Transform(v) => {
                vec![(None, v)]
            }
        }
    }
}

// ============================================================================
// Template entities
// ============================================================================

/// A template parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub logical_id: String,

    /// Declared type (defaults to "String")
    #[serde(rename = "type")]
    pub param_type: String,

    pub description: Option<String>,
    pub default: Option<Value>,
    pub allowed_values: Vec<Value>,
    pub allowed_pattern: Option<String>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub constraint_description: Option<String>,
    pub no_echo: bool,
}

impl Parameter {
    pub fn new(logical_id: &str) -> Self {
        Self {
            logical_id: logical_id.to_string(),
            param_type: "String".to_string(),
            description: None,
            default: None,
            allowed_values: Vec::new(),
            allowed_pattern: None,
            min_length: None,
            max_length: None,
            min_value: None,
            max_value: None,
            constraint_description: None,
            no_echo: false,
        }
    }
}

/// A template resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub logical_id: String,

    /// Type identifier (e.g., "AWS::S3::Bucket")
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Property values (may contain intrinsics)
    pub properties: IndexMap<String, Value>,

    /// Explicit predecessors, in declaration order
    pub depends_on: Vec<String>,

    /// Guarding condition name
    pub condition: Option<String>,

    pub deletion_policy: Option<String>,
    pub update_replace_policy: Option<String>,

    /// Opaque metadata block
    pub metadata: IndexMap<String, Value>,
}

impl Resource {
    pub fn new(logical_id: &str, resource_type: &str) -> Self {
        Self {
            logical_id: logical_id.to_string(),
            resource_type: resource_type.to_string(),
            properties: IndexMap::new(),
            depends_on: Vec::new(),
            condition: None,
            deletion_policy: None,
            update_replace_policy: None,
            metadata: IndexMap::new(),
        }
    }

    /// Service segment ("S3" in "AWS::S3::Bucket"); empty below three segments.
    pub fn service(&self) -> &str {
        self.type_segments().map(|(service, _)| service).unwrap_or("")
    }

    /// Kind segment ("Bucket" in "AWS::S3::Bucket"); empty below three segments.
    pub fn kind(&self) -> &str {
        self.type_segments().map(|(_, kind)| kind).unwrap_or("")
    }

    fn type_segments(&self) -> Option<(&str, &str)> {
        let mut segments = self.resource_type.split(TYPE_DELIMITER);
        let _namespace = segments.next()?;
        let service = segments.next()?;
        let kind = segments.next()?;
        Some((service, kind))
    }
}

/// Delimiter between resource type segments.
pub const TYPE_DELIMITER: &str = "::";

/// A two-level lookup table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mapping {
    pub logical_id: String,
    pub entries: IndexMap<String, IndexMap<String, Value>>,
}

impl Mapping {
    /// Look up `entries[top_key][second_key]`.
    pub fn lookup(&self, top_key: &str, second_key: &str) -> Option<&Value> {
        self.entries.get(top_key)?.get(second_key)
    }
}

/// A named condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    pub logical_id: String,

    /// Usually an Equals/And/Or/Not intrinsic
    pub expression: Value,
}

/// A template output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Output {
    pub logical_id: String,
    pub value: Value,
    pub description: Option<String>,

    /// Export name (often a Sub intrinsic)
    pub export_name: Option<Value>,

    pub condition: Option<String>,
}

/// Per-entity list of referenced logical names, in traversal order.
pub type ReferenceGraph = IndexMap<String, Vec<String>>;

/// A tolerated problem found while resolving intrinsics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    /// Dotted document path (e.g., "Resources.Bucket.Properties.Name")
    pub location: String,
    pub reason: Unresolved,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.reason)
    }
}

/// Default `AWSTemplateFormatVersion`.
pub const DEFAULT_FORMAT_VERSION: &str = "2010-09-09";

/// Root of the IR: one parsed template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    pub description: Option<String>,
    pub format_version: String,
    pub parameters: IndexMap<String, Parameter>,
    pub mappings: IndexMap<String, Mapping>,
    pub conditions: IndexMap<String, Condition>,
    pub resources: IndexMap<String, Resource>,
    pub outputs: IndexMap<String, Output>,

    /// Where the template came from (file path or caller label)
    pub source: String,

    pub reference_graph: ReferenceGraph,
    pub warnings: Vec<ParseWarning>,
}

impl Template {
    pub fn new(source: &str) -> Self {
        Self {
            description: None,
            format_version: DEFAULT_FORMAT_VERSION.to_string(),
            parameters: IndexMap::new(),
            mappings: IndexMap::new(),
            conditions: IndexMap::new(),
            resources: IndexMap::new(),
            outputs: IndexMap::new(),
            source: source.to_string(),
            reference_graph: ReferenceGraph::new(),
            warnings: Vec::new(),
        }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Logical names referenced by `logical_id` (empty if unknown).
    pub fn references(&self, logical_id: &str) -> &[String] {
        self.reference_graph
            .get(logical_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cf001_intrinsic_kind_names() {
        assert_eq!(IntrinsicKind::Ref.name(), "Ref");
        assert_eq!(IntrinsicKind::GetAzs.name(), "GetAZs");
        assert_eq!(IntrinsicKind::ValueOf.to_string(), "ValueOf");
        for kind in IntrinsicKind::ALL {
            assert_eq!(IntrinsicKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(IntrinsicKind::from_name("Rain::S3"), None);
    }

    #[test]
    fn test_cf001_long_form_keys() {
        assert_eq!(IntrinsicKind::Ref.long_form_key(), "Ref");
        assert_eq!(IntrinsicKind::Condition.long_form_key(), "Condition");
        assert_eq!(IntrinsicKind::GetAtt.long_form_key(), "Fn::GetAtt");
        for kind in IntrinsicKind::ALL {
            assert_eq!(
                IntrinsicKind::from_long_form_key(&kind.long_form_key()),
                Some(kind)
            );
        }
        assert_eq!(IntrinsicKind::from_long_form_key("Fn::Ref"), None);
        assert_eq!(IntrinsicKind::from_long_form_key("Fn::ForEach::Items"), None);
        assert_eq!(IntrinsicKind::from_long_form_key("GetAtt"), None);
    }

    #[test]
    fn test_cf001_resource_service_and_kind() {
        let cases = [
            ("AWS::S3::Bucket", "S3", "Bucket"),
            ("AWS::EC2::Instance", "EC2", "Instance"),
            ("AWS::Lambda::Function", "Lambda", "Function"),
            ("Custom::Vendor::Thing::Extra", "Vendor", "Thing"),
            ("AWS::S3", "", ""),
            ("InvalidType", "", ""),
            ("", "", ""),
        ];
        for (rt, service, kind) in cases {
            let r = Resource::new("R", rt);
            assert_eq!(r.service(), service, "service of {}", rt);
            assert_eq!(r.kind(), kind, "kind of {}", rt);
        }
    }

    #[test]
    fn test_cf001_template_defaults() {
        let t = Template::new("inline");
        assert_eq!(t.format_version, "2010-09-09");
        assert_eq!(t.source, "inline");
        assert!(t.resources.is_empty());
        assert!(t.reference_graph.is_empty());
        assert!(!t.has_warnings());
        assert!(t.references("Missing").is_empty());
    }

    #[test]
    fn test_cf001_parameter_defaults() {
        let p = Parameter::new("Env");
        assert_eq!(p.param_type, "String");
        assert!(!p.no_echo);
        assert!(p.default.is_none());
    }

    #[test]
    fn test_cf001_mapping_lookup() {
        let mut inner = IndexMap::new();
        inner.insert("AMI".to_string(), Value::from("ami-123"));
        let mapping = Mapping {
            logical_id: "RegionMap".to_string(),
            entries: IndexMap::from([("us-east-1".to_string(), inner)]),
        };
        assert_eq!(
            mapping.lookup("us-east-1", "AMI"),
            Some(&Value::from("ami-123"))
        );
        assert_eq!(mapping.lookup("us-west-2", "AMI"), None);
        assert_eq!(mapping.lookup("us-east-1", "Missing"), None);
    }

    #[test]
    fn test_cf001_mapping_equality_ignores_order() {
        let a = Value::Mapping(IndexMap::from([
            ("x".to_string(), Value::Bool(true)),
            ("y".to_string(), Value::Null),
        ]));
        let b = Value::Mapping(IndexMap::from([
            ("y".to_string(), Value::Null),
            ("x".to_string(), Value::Bool(true)),
        ]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_cf001_scalar_text() {
        assert_eq!(Value::Null.scalar_text().as_deref(), Some(""));
        assert_eq!(Value::Bool(false).scalar_text().as_deref(), Some("false"));
        assert_eq!(
            Value::Number(7.into()).scalar_text().as_deref(),
            Some("7")
        );
        assert_eq!(Value::Sequence(vec![]).scalar_text(), None);
        assert_eq!(Value::from(Intrinsic::Ref("A".into())).scalar_text(), None);
    }

    #[test]
    fn test_cf001_from_json() {
        let json = serde_json::json!({"a": [1, "two", null], "b": {"Ref": "X"}});
        let value = Value::from(json);
        let map = value.as_mapping().unwrap();
        assert_eq!(
            map["a"],
            Value::Sequence(vec![
                Value::Number(1.into()),
                Value::from("two"),
                Value::Null
            ])
        );
        // plain conversion does not resolve wrappers
        assert!(map["b"].as_mapping().is_some());
    }

    #[test]
    fn test_cf001_from_f64_non_finite() {
        assert_eq!(Value::from_f64(f64::NAN), Value::String("NaN".into()));
        assert!(matches!(Value::from_f64(1.5), Value::Number(_)));
    }

    #[test]
    fn test_cf001_intrinsic_values() {
        let i = Intrinsic::If {
            condition: "IsProd".into(),
            when_true: Value::from("a"),
            when_false: Value::from(Intrinsic::Ref("B".into())),
        };
        assert_eq!(i.kind(), IntrinsicKind::If);
        assert_eq!(i.values().len(), 2);
        assert!(Intrinsic::Ref("A".into()).values().is_empty());
        let sub = Intrinsic::Sub {
            template: "${A}".into(),
            variables: None,
        };
        assert!(sub.values().is_empty());
    }

    #[test]
    fn test_cf001_intrinsic_arg_positions() {
        let mut i = Intrinsic::If {
            condition: "IsProd".into(),
            when_true: Value::from("a"),
            when_false: Value::from("b"),
        };
        let positions: Vec<Option<usize>> = i.args_mut().into_iter().map(|(p, _)| p).collect();
        assert_eq!(positions, vec![Some(1), Some(2)]);

        let mut sub = Intrinsic::Sub {
            template: "${A}".into(),
            variables: Some(Value::Mapping(IndexMap::new())),
        };
        let positions: Vec<Option<usize>> = sub.args_mut().into_iter().map(|(p, _)| p).collect();
        assert_eq!(positions, vec![Some(1)]);

        let mut b64 = Intrinsic::Base64(Value::from("x"));
        assert_eq!(b64.args_mut()[0].0, None);
    }

    #[test]
    fn test_cf001_value_serialize() {
        let value = Value::from(Intrinsic::GetAtt {
            resource: "Other".into(),
            attribute: "Arn".into(),
        });
        let json = serde_json::to_string(&value).unwrap();
        assert!(json.contains("\"intrinsic\":\"GetAtt\""));
        assert!(json.contains("\"resource\":\"Other\""));

        let unresolved = Value::Unresolved(Unresolved::AliasCycle);
        let json = serde_json::to_string(&unresolved).unwrap();
        assert_eq!(json, r#"{"unresolved":"alias_cycle"}"#);
    }

    #[test]
    fn test_cf001_warning_display() {
        let w = ParseWarning {
            location: "Resources.B.Properties.Name".into(),
            reason: Unresolved::Malformed {
                intrinsic: IntrinsicKind::Join,
                shape: Shape::Scalar,
            },
        };
        assert_eq!(
            w.to_string(),
            "Resources.B.Properties.Name: malformed Join: unexpected scalar"
        );
    }

    proptest! {
        #[test]
        fn prop_cf001_segments_three_or_more(
            parts in proptest::collection::vec("[A-Za-z0-9]{1,8}", 3..6)
        ) {
            let r = Resource::new("R", &parts.join("::"));
            prop_assert_eq!(r.service(), parts[1].as_str());
            prop_assert_eq!(r.kind(), parts[2].as_str());
        }

        #[test]
        fn prop_cf001_segments_fewer_than_three(
            parts in proptest::collection::vec("[A-Za-z0-9]{1,8}", 0..3)
        ) {
            let r = Resource::new("R", &parts.join("::"));
            prop_assert_eq!(r.service(), "");
            prop_assert_eq!(r.kind(), "");
        }
    }
}
