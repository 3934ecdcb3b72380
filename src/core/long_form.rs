//! CF-005: Long-form intrinsic resolution (`{"Ref": ...}`, `{"Fn::GetAtt": ...}`).
//!
//! Rewrites single-key wrapper mappings into [`Intrinsic`] values with the
//! same argument shapes the short-form resolver produces. The payload is
//! resolved before it is matched. Intrinsics already in the tree keep their
//! shape while their arguments are resolved, which makes the pass idempotent
//! and lets mixed short/long syntax converge.
//!
//! A `Fn::` wrapper whose payload has the wrong shape stays an ordinary
//! mapping and is recorded as a warning. Bare `Ref`/`Condition` keys with a
//! non-scalar payload are ordinary mappings (IAM policy `Condition` blocks)
//! and are not reported.

use super::short_form::{index_path, key_path};
use super::types::{Intrinsic, IntrinsicKind, ParseWarning, Unresolved, Value};
use indexmap::IndexMap;

/// Resolve long-form intrinsics, discarding warnings.
pub fn resolve_long_form(value: Value) -> Value {
    LongFormResolver::new().resolve(value, "")
}

/// Long-form resolver that keeps the warnings it produces.
#[derive(Debug, Default)]
pub struct LongFormResolver {
    warnings: Vec<ParseWarning>,
}

impl LongFormResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<ParseWarning> {
        self.warnings
    }

    /// Resolve `value`; `path` is the document location used in warnings.
    pub fn resolve(&mut self, value: Value, path: &str) -> Value {
        match value {
            Value::Mapping(map) if map.len() == 1 => self.single_key(map, path),
            Value::Mapping(map) => Value::Mapping(
                map.into_iter()
                    .map(|(k, v)| {
                        let child = key_path(path, &k);
                        (k, self.resolve(v, &child))
                    })
                    .collect(),
            ),
            Value::Sequence(items) => Value::Sequence(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| self.resolve(v, &index_path(path, i)))
                    .collect(),
            ),
            Value::Intrinsic(mut intrinsic) => {
                for (position, arg) in intrinsic.args_mut() {
                    let child = match position {
                        Some(i) => index_path(path, i),
                        None => path.to_string(),
                    };
                    *arg = self.resolve(std::mem::take(arg), &child);
                }
                Value::Intrinsic(intrinsic)
            }
            scalar @ (Value::Null
            | Value::Bool(_)
            | Value::Number(_)
            | Value::String(_)
            | Value::Unresolved(_)) => scalar,
        }
    }

    fn single_key(&mut self, map: IndexMap<String, Value>, path: &str) -> Value {
        let mut entries = map.into_iter();
        let Some((key, payload)) = entries.next() else {
            return Value::Mapping(IndexMap::new());
        };

        let child = key_path(path, &key);
        let payload = self.resolve(payload, &child);

        let Some(kind) = IntrinsicKind::from_long_form_key(&key) else {
            return Value::Mapping(IndexMap::from([(key, payload)]));
        };

        match build_intrinsic(kind, payload) {
            Ok(intrinsic) => Value::from(intrinsic),
            Err(payload) => {
                if !matches!(kind, IntrinsicKind::Ref | IntrinsicKind::Condition) {
                    let reason = Unresolved::Malformed {
                        intrinsic: kind,
                        shape: payload.shape(),
                    };
                    tracing::warn!(location = %path, %reason, "long-form wrapper left as mapping");
                    self.warnings.push(ParseWarning {
                        location: path.to_string(),
                        reason,
                    });
                }
                Value::Mapping(IndexMap::from([(key, payload)]))
            }
        }
    }
}

/// Match a resolved payload against the argument shape of `kind`.
/// Hands the payload back untouched when it does not fit.
fn build_intrinsic(kind: IntrinsicKind, payload: Value) -> Result<Intrinsic, Value> {
    match (kind, payload) {
        (IntrinsicKind::Ref, p) => match p.scalar_text() {
            Some(name) => Ok(Intrinsic::Ref(name)),
            None => Err(p),
        },
        (IntrinsicKind::Condition, p) => match p.scalar_text() {
            Some(name) => Ok(Intrinsic::Condition(name)),
            None => Err(p),
        },
        (IntrinsicKind::GetAtt, Value::Sequence(items)) if items.len() == 2 => {
            match (items[0].scalar_text(), items[1].scalar_text()) {
                (Some(resource), Some(attribute)) => Ok(Intrinsic::GetAtt {
                    resource,
                    attribute,
                }),
                _ => Err(Value::Sequence(items)),
            }
        }
        (IntrinsicKind::GetAtt, p) => match p.scalar_text() {
            Some(text) => match text.split_once('.') {
                Some((resource, attribute)) => Ok(Intrinsic::GetAtt {
                    resource: resource.to_string(),
                    attribute: attribute.to_string(),
                }),
                None => Err(p),
            },
            None => Err(p),
        },
        (IntrinsicKind::Sub, Value::Sequence(mut items)) if matches!(items.len(), 1 | 2) => {
            match items[0].scalar_text() {
                Some(template) => {
                    let variables = if items.len() == 2 { items.pop() } else { None };
                    Ok(Intrinsic::Sub {
                        template,
                        variables,
                    })
                }
                None => Err(Value::Sequence(items)),
            }
        }
        (IntrinsicKind::Sub, p) => match p.scalar_text() {
            Some(template) => Ok(Intrinsic::Sub {
                template,
                variables: None,
            }),
            None => Err(p),
        },
        (IntrinsicKind::Join, Value::Sequence(items)) if items.len() == 2 => {
            match items[0].scalar_text() {
                Some(delimiter) => {
                    let [_, values] = take_array(items);
                    Ok(Intrinsic::Join { delimiter, values })
                }
                None => Err(Value::Sequence(items)),
            }
        }
        (IntrinsicKind::Select, Value::Sequence(items)) if items.len() == 2 => {
            let [index, list] = take_array(items);
            Ok(Intrinsic::Select { index, list })
        }
        (IntrinsicKind::GetAzs, Value::Sequence(mut items)) if items.len() <= 1 => {
            Ok(Intrinsic::GetAzs(items.pop().unwrap_or_else(|| Value::from(""))))
        }
        (IntrinsicKind::GetAzs, p @ (Value::Mapping(_) | Value::Intrinsic(_))) => {
            Ok(Intrinsic::GetAzs(p))
        }
        (IntrinsicKind::GetAzs, p) => match p.scalar_text() {
            Some(region) => Ok(Intrinsic::GetAzs(Value::String(region))),
            None => Err(p),
        },
        (IntrinsicKind::If, Value::Sequence(items)) if items.len() == 3 => {
            match items[0].scalar_text() {
                Some(condition) => {
                    let [_, when_true, when_false] = take_array(items);
                    Ok(Intrinsic::If {
                        condition,
                        when_true,
                        when_false,
                    })
                }
                None => Err(Value::Sequence(items)),
            }
        }
        (IntrinsicKind::Equals, Value::Sequence(items)) if items.len() == 2 => {
            let [a, b] = take_array(items);
            Ok(Intrinsic::Equals(a, b))
        }
        (IntrinsicKind::And, Value::Sequence(items)) if items.len() >= 2 => {
            Ok(Intrinsic::And(items))
        }
        (IntrinsicKind::Or, Value::Sequence(items)) if items.len() >= 2 => Ok(Intrinsic::Or(items)),
        (IntrinsicKind::Not, Value::Sequence(items)) if items.len() == 1 => {
            let [condition] = take_array(items);
            Ok(Intrinsic::Not(condition))
        }
        (IntrinsicKind::FindInMap, Value::Sequence(items)) if items.len() == 3 => {
            let [map, top_key, second_key] = take_array(items);
            Ok(Intrinsic::FindInMap {
                map,
                top_key,
                second_key,
            })
        }
        (IntrinsicKind::Base64, p) => Ok(Intrinsic::Base64(p)),
        (IntrinsicKind::Cidr, Value::Sequence(items)) if items.len() == 3 => {
            let [ip_block, count, cidr_bits] = take_array(items);
            Ok(Intrinsic::Cidr {
                ip_block,
                count,
                cidr_bits,
            })
        }
        (IntrinsicKind::ImportValue, p) => Ok(Intrinsic::ImportValue(p)),
        (IntrinsicKind::Split, Value::Sequence(items)) if items.len() == 2 => {
            match items[0].scalar_text() {
                Some(delimiter) => {
                    let [_, source] = take_array(items);
                    Ok(Intrinsic::Split { delimiter, source })
                }
                None => Err(Value::Sequence(items)),
            }
        }
        (IntrinsicKind::Transform, p @ Value::Mapping(_)) => Ok(Intrinsic::Transform(p)),
        (IntrinsicKind::ValueOf, Value::Sequence(items)) if items.len() >= 2 => {
            Ok(Intrinsic::ValueOf(items))
        }
        (_, p) => Err(p),
    }
}

/// Move a sequence whose length the caller already checked into an array.
fn take_array<const N: usize>(items: Vec<Value>) -> [Value; N] {
    let mut iter = items.into_iter();
    std::array::from_fn(|_| iter.next().unwrap_or_default())
}
