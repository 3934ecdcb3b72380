//! CF-003: Document loading, from raw bytes to a tagged node tree or a plain value.
//!
//! YAML is read as a stream of parser events and built into an arena of
//! nodes, so custom tags (`!Ref`, `!GetAtt`, ...) survive and `*alias`
//! nodes point back at their anchored node instead of being copied. If YAML
//! parsing fails the content is retried as JSON, which yields a plain
//! [`Value`] tree with no tags.

use std::collections::HashMap;

use yaml_rust2::parser::{Event, EventReceiver, Parser, Tag};
use yaml_rust2::scanner::TScalarStyle;
use yaml_rust2::Yaml;

use super::error::TemplateError;
use super::types::Value;

/// Maximum collection nesting depth accepted by the YAML tree builder.
pub const MAX_DEPTH: usize = 128;

/// Index of a node inside a [`NodeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Scalar node payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl Scalar {
    /// Literal text, as a tag handler sees it.
    pub fn text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::String(s) => s.clone(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
        }
    }

    /// Resolve scalar text. Quoted scalars and `!!str` stay strings; plain
    /// scalars follow the YAML core schema.
    fn resolve(text: String, style: TScalarStyle, tag: Option<&Tag>) -> Self {
        let is_str_tag = tag.is_some_and(|t| t.handle != "!" && t.suffix.ends_with("str"));
        if !matches!(style, TScalarStyle::Plain) || is_str_tag {
            return Self::String(text);
        }
        match Yaml::from_str(&text) {
            Yaml::Null => Self::Null,
            Yaml::Boolean(b) => Self::Bool(b),
            Yaml::Integer(i) => Self::Number(i.into()),
            Yaml::Real(real) => match real.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                Some(f) => Self::Number(f),
                None => Self::String(text),
            },
            _ => Self::String(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Scalar(Scalar),
    Sequence(Vec<NodeId>),
    /// Entries in document order; keys are rendered to text.
    Mapping(Vec<(String, NodeId)>),
    /// Reuse of another node (YAML `*anchor`).
    Alias(NodeId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Custom tag without its leading `!` (e.g., "GetAtt")
    pub tag: Option<String>,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self { tag: None, kind }
    }

    pub fn tagged(tag: &str, kind: NodeKind) -> Self {
        Self {
            tag: Some(tag.to_string()),
            kind,
        }
    }
}

/// Arena of YAML nodes. Node identity is the arena index.
#[derive(Debug, Clone, Default)]
pub struct NodeTree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Panics on ids from another tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Panics on ids from another tree.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True if the root is an untagged mapping.
    pub fn root_is_mapping(&self) -> bool {
        self.root.is_some_and(|id| {
            let node = self.node(id);
            node.tag.is_none() && matches!(node.kind, NodeKind::Mapping(_))
        })
    }
}

/// Strip the leading `!` of a single-bang tag. Standard `!!` tags and
/// verbatim `tag:` URIs are not custom tags.
fn custom_tag(tag: &str) -> Option<&str> {
    let rest = tag.strip_prefix('!')?;
    if rest.is_empty() || rest.starts_with('!') || rest.starts_with("tag:") {
        return None;
    }
    Some(rest)
}

/// Builds a [`NodeTree`] from parser events. Anchors are registered when
/// their node starts, so an alias inside its own anchored node still
/// resolves to that node.
#[derive(Default)]
struct TreeBuilder {
    tree: NodeTree,
    anchors: HashMap<usize, NodeId>,
    /// Open collections, innermost last
    open: Vec<NodeId>,
    /// Key text waiting for its value, one slot per open collection
    keys: Vec<Option<String>>,
    error: Option<String>,
}

impl TreeBuilder {
    fn start(&mut self, kind: NodeKind, anchor: usize, tag: Option<Tag>) -> NodeId {
        let id = self.tree.push(Node {
            tag: tag.as_ref().and_then(tag_name),
            kind,
        });
        if anchor != 0 {
            self.anchors.insert(anchor, id);
        }
        id
    }

    fn open(&mut self, id: NodeId) {
        if self.open.len() >= MAX_DEPTH {
            self.error = Some(format!("nesting deeper than {} levels", MAX_DEPTH));
        }
        self.open.push(id);
        self.keys.push(None);
    }

    fn close(&mut self) {
        self.keys.pop();
        if let Some(id) = self.open.pop() {
            self.attach(id);
        }
    }

    /// Place a finished node into its parent, or make it the root.
    fn attach(&mut self, id: NodeId) {
        let Some(&parent) = self.open.last() else {
            self.tree.set_root(id);
            return;
        };
        let key_text = self.key_text(id);
        let pending = self.keys.last_mut();
        match &mut self.tree.node_mut(parent).kind {
            NodeKind::Sequence(items) => items.push(id),
            NodeKind::Mapping(entries) => {
                if let Some(slot) = pending {
                    match slot.take() {
                        Some(key) => entries.push((key, id)),
                        None => *slot = Some(key_text),
                    }
                }
            }
            NodeKind::Scalar(_) | NodeKind::Alias(_) => {}
        }
    }

    /// Render a node used as a mapping key. Collection keys become empty.
    fn key_text(&self, id: NodeId) -> String {
        match &self.tree.node(id).kind {
            NodeKind::Scalar(Scalar::Null) => "null".to_string(),
            NodeKind::Scalar(scalar) => scalar.text(),
            NodeKind::Alias(target) if *target != id => self.key_text(*target),
            _ => String::new(),
        }
    }
}

impl EventReceiver for TreeBuilder {
    fn on_event(&mut self, event: Event) {
        if self.error.is_some() {
            return;
        }
        match event {
            Event::Scalar(text, style, anchor, tag) => {
                let scalar = Scalar::resolve(text, style, tag.as_ref());
                let id = self.start(NodeKind::Scalar(scalar), anchor, tag);
                self.attach(id);
            }
            Event::SequenceStart(anchor, tag) => {
                let id = self.start(NodeKind::Sequence(Vec::new()), anchor, tag);
                self.open(id);
            }
            Event::MappingStart(anchor, tag) => {
                let id = self.start(NodeKind::Mapping(Vec::new()), anchor, tag);
                self.open(id);
            }
            Event::SequenceEnd | Event::MappingEnd => self.close(),
            Event::Alias(anchor) => match self.anchors.get(&anchor) {
                Some(&target) => {
                    let id = self.tree.push(Node::new(NodeKind::Alias(target)));
                    self.attach(id);
                }
                None => self.error = Some(format!("unknown anchor id {}", anchor)),
            },
            _ => {}
        }
    }
}

/// Custom tag name of a parser tag, if it is one.
fn tag_name(tag: &Tag) -> Option<String> {
    custom_tag(&format!("{}{}", tag.handle, tag.suffix)).map(str::to_string)
}

/// Parse the first YAML document of `text` into a node tree.
fn parse_yaml(text: &str) -> Result<NodeTree, String> {
    let mut builder = TreeBuilder::default();
    Parser::new_from_str(text)
        .load(&mut builder, false)
        .map_err(|e| e.to_string())?;
    match builder.error {
        Some(e) => Err(e),
        None => Ok(builder.tree),
    }
}

/// A decoded document, before intrinsic resolution.
#[derive(Debug, Clone)]
pub enum Document {
    /// YAML node tree with custom tags preserved
    Tagged(NodeTree),
    /// JSON value tree (no tag metadata)
    Plain(Value),
}

/// Decode template bytes. YAML first, JSON as fallback; the root must be a mapping.
pub fn load_document(content: &[u8], source_name: &str) -> Result<Document, TemplateError> {
    let text = std::str::from_utf8(content).map_err(|e| TemplateError::Decode {
        source_name: source_name.to_string(),
        yaml: e.to_string(),
        json: e.to_string(),
    })?;

    let yaml_err = match parse_yaml(text) {
        Ok(tree) => {
            tracing::debug!(source = source_name, nodes = tree.len(), "decoded YAML node tree");
            if !tree.root_is_mapping() {
                return Err(TemplateError::Structure {
                    source_name: source_name.to_string(),
                });
            }
            return Ok(Document::Tagged(tree));
        }
        Err(e) => e,
    };

    tracing::debug!(source = source_name, error = %yaml_err, "YAML decode failed, trying JSON");
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(json) if json.is_object() => Ok(Document::Plain(Value::from(json))),
        Ok(_) => Err(TemplateError::Structure {
            source_name: source_name.to_string(),
        }),
        Err(json_err) => Err(TemplateError::Decode {
            source_name: source_name.to_string(),
            yaml: yaml_err.to_string(),
            json: json_err.to_string(),
        }),
    }
}
