//! CF-004: Short-form intrinsic resolution (`!Ref`, `!GetAtt`, `!Sub`, ...).
//!
//! Walks a [`NodeTree`] depth-first and converts it to a [`Value`] tree,
//! replacing each custom-tagged node by the matching [`Intrinsic`]. The tag's
//! node kind selects the arity. A recognised tag on the wrong node shape, an
//! unknown tag on a non-scalar, and an alias leading back to a node on the
//! current path all resolve to [`Value::Unresolved`] and are recorded as
//! warnings.

use super::loader::{NodeId, NodeKind, NodeTree};
use super::types::{Intrinsic, IntrinsicKind, ParseWarning, Shape, Unresolved, Value};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Resolve a node tree. Returns the value tree and the warnings met on the way.
pub fn resolve_short_form(tree: &NodeTree) -> (Value, Vec<ParseWarning>) {
    let mut resolver = ShortFormResolver {
        tree,
        on_path: HashSet::new(),
        warnings: Vec::new(),
    };
    let value = match tree.root() {
        Some(root) => resolver.node(root, ""),
        None => Value::Null,
    };
    (value, resolver.warnings)
}

struct ShortFormResolver<'a> {
    tree: &'a NodeTree,
    /// Nodes on the current traversal path
    on_path: HashSet<NodeId>,
    warnings: Vec<ParseWarning>,
}

impl ShortFormResolver<'_> {
    fn node(&mut self, id: NodeId, path: &str) -> Value {
        if !self.on_path.insert(id) {
            return self.unresolved(path, Unresolved::AliasCycle);
        }

        let tree = self.tree;
        let value = match tree.node(id).tag.as_deref() {
            Some(tag) => self.tagged(id, tag, path),
            None => self.contents(id, path),
        };

        self.on_path.remove(&id);
        value
    }

    /// Convert a node ignoring its tag.
    fn contents(&mut self, id: NodeId, path: &str) -> Value {
        let tree = self.tree;
        match &tree.node(id).kind {
            NodeKind::Scalar(s) => s.to_value(),
            NodeKind::Sequence(items) => Value::Sequence(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, child)| self.node(*child, &index_path(path, i)))
                    .collect(),
            ),
            NodeKind::Mapping(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, child) in entries {
                    let value = self.node(*child, &key_path(path, key));
                    map.insert(key.clone(), value);
                }
                Value::Mapping(map)
            }
            NodeKind::Alias(target) => self.node(*target, path),
        }
    }

    fn tagged(&mut self, id: NodeId, tag: &str, path: &str) -> Value {
        let Some(kind) = IntrinsicKind::from_name(tag) else {
            // Unknown scalar tags are taken as a reference to their text.
            if let NodeKind::Scalar(s) = &self.tree.node(id).kind {
                return Value::from(Intrinsic::Ref(s.text()));
            }
            return self.unresolved(
                path,
                Unresolved::UnknownTag {
                    tag: tag.to_string(),
                },
            );
        };

        match self.intrinsic(kind, id, path) {
            Some(intrinsic) => Value::from(intrinsic),
            None => {
                let shape = self.shape(id);
                self.unresolved(
                    path,
                    Unresolved::Malformed {
                        intrinsic: kind,
                        shape,
                    },
                )
            }
        }
    }

    /// Build the intrinsic for `kind` from node `id`, or None on a shape mismatch.
    fn intrinsic(&mut self, kind: IntrinsicKind, id: NodeId, path: &str) -> Option<Intrinsic> {
        let tree = self.tree;
        let node_kind = &tree.node(id).kind;
        let items: &[NodeId] = match node_kind {
            NodeKind::Sequence(items) => items,
            _ => &[],
        };
        let scalar = match node_kind {
            NodeKind::Scalar(s) => Some(s.text()),
            _ => None,
        };
        let is_sequence = matches!(node_kind, NodeKind::Sequence(_));
        let is_mapping = matches!(node_kind, NodeKind::Mapping(_));
        let arg = |i: usize| index_path(path, i);

        let intrinsic = match kind {
            IntrinsicKind::Ref => Intrinsic::Ref(scalar?),
            IntrinsicKind::Condition => Intrinsic::Condition(scalar?),
            IntrinsicKind::GetAtt => {
                if let Some(text) = scalar {
                    let (resource, attribute) = text.split_once('.')?;
                    Intrinsic::GetAtt {
                        resource: resource.to_string(),
                        attribute: attribute.to_string(),
                    }
                } else if items.len() == 2 {
                    Intrinsic::GetAtt {
                        resource: self.literal(items[0])?,
                        attribute: self.literal(items[1])?,
                    }
                } else {
                    return None;
                }
            }
            IntrinsicKind::Sub => {
                if let Some(template) = scalar {
                    Intrinsic::Sub {
                        template,
                        variables: None,
                    }
                } else if matches!(items.len(), 1 | 2) {
                    let template = self.literal(items[0])?;
                    let variables = items.get(1).map(|v| self.node(*v, &arg(1)));
                    Intrinsic::Sub {
                        template,
                        variables,
                    }
                } else {
                    return None;
                }
            }
            IntrinsicKind::Join if items.len() == 2 => Intrinsic::Join {
                delimiter: self.literal(items[0])?,
                values: self.node(items[1], &arg(1)),
            },
            IntrinsicKind::Select if items.len() == 2 => Intrinsic::Select {
                index: self.node(items[0], &arg(0)),
                list: self.node(items[1], &arg(1)),
            },
            IntrinsicKind::GetAzs => match scalar {
                Some(region) => Intrinsic::GetAzs(Value::String(region)),
                None if is_sequence && items.is_empty() => Intrinsic::GetAzs(Value::from("")),
                None if items.len() == 1 => Intrinsic::GetAzs(self.node(items[0], &arg(0))),
                None if is_mapping => Intrinsic::GetAzs(self.contents(id, path)),
                None => return None,
            },
            IntrinsicKind::If if items.len() == 3 => Intrinsic::If {
                condition: self.literal(items[0])?,
                when_true: self.node(items[1], &arg(1)),
                when_false: self.node(items[2], &arg(2)),
            },
            IntrinsicKind::Equals if items.len() == 2 => {
                Intrinsic::Equals(self.node(items[0], &arg(0)), self.node(items[1], &arg(1)))
            }
            IntrinsicKind::And if items.len() >= 2 => Intrinsic::And(self.all(items, path)),
            IntrinsicKind::Or if items.len() >= 2 => Intrinsic::Or(self.all(items, path)),
            IntrinsicKind::Not if items.len() == 1 => Intrinsic::Not(self.node(items[0], &arg(0))),
            IntrinsicKind::FindInMap if items.len() == 3 => Intrinsic::FindInMap {
                map: self.node(items[0], &arg(0)),
                top_key: self.node(items[1], &arg(1)),
                second_key: self.node(items[2], &arg(2)),
            },
            IntrinsicKind::Base64 => Intrinsic::Base64(self.contents(id, path)),
            IntrinsicKind::Cidr if items.len() == 3 => Intrinsic::Cidr {
                ip_block: self.node(items[0], &arg(0)),
                count: self.node(items[1], &arg(1)),
                cidr_bits: self.node(items[2], &arg(2)),
            },
            IntrinsicKind::ImportValue => Intrinsic::ImportValue(self.contents(id, path)),
            IntrinsicKind::Split if items.len() == 2 => Intrinsic::Split {
                delimiter: self.literal(items[0])?,
                source: self.node(items[1], &arg(1)),
            },
            IntrinsicKind::Transform if is_mapping => Intrinsic::Transform(self.contents(id, path)),
            IntrinsicKind::ValueOf if items.len() >= 2 => Intrinsic::ValueOf(self.all(items, path)),
            _ => return None,
        };
        Some(intrinsic)
    }

    fn all(&mut self, items: &[NodeId], path: &str) -> Vec<Value> {
        items
            .iter()
            .enumerate()
            .map(|(i, child)| self.node(*child, &index_path(path, i)))
            .collect()
    }

    /// Text of an untagged scalar node (names, delimiters, templates).
    fn literal(&self, id: NodeId) -> Option<String> {
        let node = self.tree.node(id);
        match (&node.tag, &node.kind) {
            (None, NodeKind::Scalar(s)) => Some(s.text()),
            _ => None,
        }
    }

    fn shape(&self, id: NodeId) -> Shape {
        match &self.tree.node(id).kind {
            NodeKind::Scalar(_) => Shape::Scalar,
            NodeKind::Sequence(items) => Shape::Sequence { len: items.len() },
            NodeKind::Mapping(_) => Shape::Mapping,
            NodeKind::Alias(_) => Shape::Alias,
        }
    }

    fn unresolved(&mut self, path: &str, reason: Unresolved) -> Value {
        tracing::warn!(location = path, %reason, "unresolved short-form value");
        self.warnings.push(ParseWarning {
            location: path.to_string(),
            reason: reason.clone(),
        });
        Value::Unresolved(reason)
    }
}

/// `base.key`, or `key` at the root.
pub(crate) fn key_path(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", base, key)
    }
}

pub(crate) fn index_path(base: &str, index: usize) -> String {
    format!("{}[{}]", base, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loader::{load_document, Document, Node, Scalar};

    fn resolve(yaml: &str) -> (IndexMap<String, Value>, Vec<ParseWarning>) {
        let tree = match load_document(yaml.as_bytes(), "test.yaml").unwrap() {
            Document::Tagged(tree) => tree,
            Document::Plain(_) => panic!("expected tagged tree"),
        };
        let (value, warnings) = resolve_short_form(&tree);
        match value {
            Value::Mapping(map) => (map, warnings),
            other => panic!("root resolved to {:?}", other),
        }
    }

    fn s(text: &str) -> Value {
        Value::from(text)
    }

    fn intrinsic(value: &Value) -> &Intrinsic {
        value
            .as_intrinsic()
            .unwrap_or_else(|| panic!("not an intrinsic: {:?}", value))
    }

    #[test]
    fn test_cf004_ref_and_condition() {
        let (map, warnings) = resolve("A: !Ref Env\nB: !Condition IsProd\n");
        assert!(warnings.is_empty());
        assert_eq!(intrinsic(&map["A"]), &Intrinsic::Ref("Env".into()));
        assert_eq!(intrinsic(&map["B"]), &Intrinsic::Condition("IsProd".into()));
    }

    #[test]
    fn test_cf004_getatt_forms_agree() {
        let (map, _) = resolve("A: !GetAtt Other.Arn\nB: !GetAtt [Other, Arn]\n");
        let expected = Intrinsic::GetAtt {
            resource: "Other".into(),
            attribute: "Arn".into(),
        };
        assert_eq!(intrinsic(&map["A"]), &expected);
        assert_eq!(intrinsic(&map["B"]), &expected);
    }

    #[test]
    fn test_cf004_getatt_nested_attribute() {
        let (map, _) = resolve("A: !GetAtt Db.Endpoint.Address\n");
        assert_eq!(
            intrinsic(&map["A"]),
            &Intrinsic::GetAtt {
                resource: "Db".into(),
                attribute: "Endpoint.Address".into(),
            }
        );
    }

    #[test]
    fn test_cf004_sub_forms() {
        let yaml = r#"
A: !Sub "${Env}-bucket"
B: !Sub
  - "${Name}-x"
  - Name: !Ref Env
"#;
        let (map, _) = resolve(yaml);
        assert_eq!(
            intrinsic(&map["A"]),
            &Intrinsic::Sub {
                template: "${Env}-bucket".into(),
                variables: None
            }
        );
        match intrinsic(&map["B"]) {
            Intrinsic::Sub {
                template,
                variables: Some(Value::Mapping(vars)),
            } => {
                assert_eq!(template, "${Name}-x");
                assert_eq!(intrinsic(&vars["Name"]), &Intrinsic::Ref("Env".into()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_cf004_sequence_functions() {
        let yaml = r#"
Join: !Join ["-", [!Ref A, b]]
Select: !Select [0, !GetAZs ""]
If: !If [IsProd, yes, no]
Equals: !Equals [!Ref Env, prod]
And: !And [!Condition A, !Condition B]
Or: !Or [!Condition A, !Condition B, !Condition C]
Not: !Not [!Condition A]
Find: !FindInMap [RegionMap, !Ref "AWS::Region", AMI]
Cidr: !Cidr [!GetAtt Vpc.CidrBlock, 6, 8]
Split: !Split [",", "a,b,c"]
ValueOf: !ValueOf [Param, Attr]
"#;
        let (map, warnings) = resolve(yaml);
        assert!(warnings.is_empty(), "{:?}", warnings);

        assert_eq!(
            intrinsic(&map["Join"]),
            &Intrinsic::Join {
                delimiter: "-".into(),
                values: Value::Sequence(vec![Intrinsic::Ref("A".into()).into(), s("b")]),
            }
        );
        assert_eq!(
            intrinsic(&map["Select"]),
            &Intrinsic::Select {
                index: Value::Number(0.into()),
                list: Intrinsic::GetAzs(s("")).into(),
            }
        );
        assert_eq!(
            intrinsic(&map["If"]),
            &Intrinsic::If {
                condition: "IsProd".into(),
                when_true: s("yes"),
                when_false: s("no"),
            }
        );
        assert_eq!(intrinsic(&map["Equals"]).kind(), IntrinsicKind::Equals);
        assert_eq!(intrinsic(&map["And"]).values().len(), 2);
        assert_eq!(intrinsic(&map["Or"]).values().len(), 3);
        assert_eq!(
            intrinsic(&map["Not"]),
            &Intrinsic::Not(Intrinsic::Condition("A".into()).into())
        );
        assert_eq!(
            intrinsic(&map["Find"]),
            &Intrinsic::FindInMap {
                map: s("RegionMap"),
                top_key: Intrinsic::Ref("AWS::Region".into()).into(),
                second_key: s("AMI"),
            }
        );
        assert_eq!(intrinsic(&map["Cidr"]).kind(), IntrinsicKind::Cidr);
        assert_eq!(
            intrinsic(&map["Split"]),
            &Intrinsic::Split {
                delimiter: ",".into(),
                source: s("a,b,c"),
            }
        );
        assert_eq!(
            intrinsic(&map["ValueOf"]),
            &Intrinsic::ValueOf(vec![s("Param"), s("Attr")])
        );
    }

    #[test]
    fn test_cf004_open_shaped_functions() {
        let yaml = r#"
B64: !Base64 data
B64Nested: !Base64
  Fn::Join: ["", [a, b]]
Import: !ImportValue SharedStack-Value
Transform: !Transform
  Name: AWS::Include
  Parameters:
    Location: s3://bucket/file.yaml
AzsMap: !GetAZs {Ref: "AWS::Region"}
AzsSeq: !GetAZs [us-east-1]
"#;
        let (map, warnings) = resolve(yaml);
        assert!(warnings.is_empty(), "{:?}", warnings);
        assert_eq!(intrinsic(&map["B64"]), &Intrinsic::Base64(s("data")));
        match intrinsic(&map["B64Nested"]) {
            Intrinsic::Base64(Value::Mapping(inner)) => assert!(inner.contains_key("Fn::Join")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            intrinsic(&map["Import"]),
            &Intrinsic::ImportValue(s("SharedStack-Value"))
        );
        match intrinsic(&map["Transform"]) {
            Intrinsic::Transform(Value::Mapping(inner)) => {
                assert_eq!(inner["Name"], s("AWS::Include"))
            }
            other => panic!("unexpected {:?}", other),
        }
        match intrinsic(&map["AzsMap"]) {
            Intrinsic::GetAzs(Value::Mapping(inner)) => assert_eq!(inner["Ref"], s("AWS::Region")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(intrinsic(&map["AzsSeq"]), &Intrinsic::GetAzs(s("us-east-1")));
    }

    #[test]
    fn test_cf004_malformed_is_unresolved() {
        let yaml = r#"
Resources:
  B:
    Properties:
      Name: !Join "not-a-list"
      Cond: !If [OnlyTwo, x]
      Ref: !Ref [a, b]
"#;
        let (map, warnings) = resolve(yaml);
        let props = map["Resources"].as_mapping().unwrap()["B"].as_mapping().unwrap()
            ["Properties"]
            .as_mapping()
            .unwrap();
        assert_eq!(
            props["Name"],
            Value::Unresolved(Unresolved::Malformed {
                intrinsic: IntrinsicKind::Join,
                shape: Shape::Scalar,
            })
        );
        assert_eq!(
            props["Cond"],
            Value::Unresolved(Unresolved::Malformed {
                intrinsic: IntrinsicKind::If,
                shape: Shape::Sequence { len: 2 },
            })
        );
        assert!(matches!(props["Ref"], Value::Unresolved(_)));

        assert_eq!(warnings.len(), 3);
        assert_eq!(warnings[0].location, "Resources.B.Properties.Name");
        assert_eq!(warnings[1].location, "Resources.B.Properties.Cond");
    }

    #[test]
    fn test_cf004_getatt_without_dot_is_malformed() {
        let (map, warnings) = resolve("A: !GetAtt JustAName\n");
        assert!(matches!(map["A"], Value::Unresolved(Unresolved::Malformed { .. })));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_cf004_unknown_tags() {
        let (map, warnings) = resolve("A: !Custom value\nB: !Custom [1, 2]\n");
        assert_eq!(intrinsic(&map["A"]), &Intrinsic::Ref("value".into()));
        assert_eq!(
            map["B"],
            Value::Unresolved(Unresolved::UnknownTag {
                tag: "Custom".into()
            })
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].location, "B");
    }

    #[test]
    fn test_cf004_anchor_reuse_is_not_a_cycle() {
        let yaml = r#"
Shared: &tags
  - Key: Env
    Value: !Ref Env
A: *tags
B: *tags
"#;
        let (map, warnings) = resolve(yaml);
        assert!(warnings.is_empty());
        assert_eq!(map["A"], map["B"]);
        assert_eq!(map["A"], map["Shared"]);
    }

    #[test]
    fn test_cf004_alias_cycle_terminates() {
        // root: { Self: <alias to root> }
        let mut tree = NodeTree::new();
        let root = tree.push(Node::new(NodeKind::Mapping(vec![])));
        let alias = tree.push(Node::new(NodeKind::Alias(root)));
        tree.node_mut(root).kind = NodeKind::Mapping(vec![("Self".into(), alias)]);
        tree.set_root(root);

        let (value, warnings) = resolve_short_form(&tree);
        let map = value.as_mapping().unwrap();
        assert_eq!(map["Self"], Value::Unresolved(Unresolved::AliasCycle));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].location, "Self");
    }

    #[test]
    fn test_cf004_transitive_cycle_inside_intrinsic() {
        // root: { A: !Not [ { B: <alias to A's sequence> } ] }
        let mut tree = NodeTree::new();
        let seq = tree.push(Node::tagged("Not", NodeKind::Sequence(vec![])));
        let alias = tree.push(Node::new(NodeKind::Alias(seq)));
        let inner = tree.push(Node::new(NodeKind::Mapping(vec![("B".into(), alias)])));
        tree.node_mut(seq).kind = NodeKind::Sequence(vec![inner]);
        let root = tree.push(Node::new(NodeKind::Mapping(vec![("A".into(), seq)])));
        tree.set_root(root);

        let (value, warnings) = resolve_short_form(&tree);
        let a = &value.as_mapping().unwrap()["A"];
        match a.as_intrinsic() {
            Some(Intrinsic::Not(Value::Mapping(m))) => {
                assert_eq!(m["B"], Value::Unresolved(Unresolved::AliasCycle))
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_cf004_tagged_alias_target_is_malformed() {
        let mut tree = NodeTree::new();
        let leaf = tree.push(Node::new(NodeKind::Scalar(Scalar::String("x".into()))));
        let alias = tree.push(Node::tagged("Join", NodeKind::Alias(leaf)));
        let root = tree.push(Node::new(NodeKind::Mapping(vec![("J".into(), alias)])));
        tree.set_root(root);

        let (value, _) = resolve_short_form(&tree);
        assert_eq!(
            value.as_mapping().unwrap()["J"],
            Value::Unresolved(Unresolved::Malformed {
                intrinsic: IntrinsicKind::Join,
                shape: Shape::Alias,
            })
        );
    }

    #[test]
    fn test_cf004_paths() {
        assert_eq!(key_path("", "Resources"), "Resources");
        assert_eq!(key_path("Resources", "B"), "Resources.B");
        assert_eq!(index_path("Tags", 2), "Tags[2]");
    }
}
