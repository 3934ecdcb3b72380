//! CF-007: Reference graph and dependency ordering.
//!
//! The reference graph records, per resource and output, every logical name
//! its expressions mention: `Ref` targets, `GetAtt` resources and `Sub`
//! placeholders. Targets are not checked against the template, so names of
//! parameters, pseudo-parameters and undeclared entities all appear.
//!
//! `Sub` placeholders are filtered on two rules, not only the `AWS::`
//! prefix: `${!Literal}` escapes are literal text and are not references,
//! so they never enter the graph.
//!
//! Ordering uses Kahn's algorithm with deterministic (alphabetical)
//! tie-breaking. Nodes caught in cycles are appended in sorted order.

use super::types::{Intrinsic, ReferenceGraph, Template, Value};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

/// Pseudo-parameter namespace, excluded from `Sub` placeholders.
pub const PSEUDO_PREFIX: &str = "AWS::";

static SUB_PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").ok());

/// Build the reference graph of `template`.
///
/// Every resource and output gets an entry, possibly empty. Resource
/// properties are visited first, then output values and export names.
/// Duplicates are kept in traversal order.
pub fn build_reference_graph(template: &Template) -> ReferenceGraph {
    let mut graph = ReferenceGraph::new();

    for (id, resource) in &template.resources {
        let refs = graph.entry(id.clone()).or_default();
        for value in resource.properties.values() {
            collect_references(value, refs);
        }
    }

    for (id, output) in &template.outputs {
        let refs = graph.entry(id.clone()).or_default();
        collect_references(&output.value, refs);
        if let Some(name) = &output.export_name {
            collect_references(name, refs);
        }
    }

    tracing::debug!(
        entities = graph.len(),
        edges = graph.values().map(Vec::len).sum::<usize>(),
        "built reference graph"
    );
    graph
}

/// Append every logical name referenced inside `value` to `out`.
pub fn collect_references(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Intrinsic(intrinsic) => {
            match intrinsic.as_ref() {
                Intrinsic::Ref(target) => out.push(target.clone()),
                Intrinsic::GetAtt { resource, .. } => out.push(resource.clone()),
                Intrinsic::Sub { template, .. } => out.extend(sub_placeholders(template)),
                _ => {}
            }
            for arg in intrinsic.values() {
                collect_references(arg, out);
            }
        }
        Value::Sequence(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        Value::Mapping(map) => {
            for item in map.values() {
                collect_references(item, out);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Unresolved(_) => {}
    }
}

/// Logical names named by `${...}` placeholders in a `Sub` template.
///
/// `${Name.Attr}` yields `Name`. `${AWS::...}` placeholders and `${!Literal}`
/// escapes yield nothing.
pub fn sub_placeholders(template: &str) -> Vec<String> {
    let Some(re) = SUB_PLACEHOLDER.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(template)
        .filter_map(|caps| {
            let inner = caps.get(1)?.as_str();
            if inner.starts_with('!') {
                return None;
            }
            let name = inner.split('.').next().unwrap_or(inner);
            if name.starts_with(PSEUDO_PREFIX) {
                None
            } else {
                Some(name.to_string())
            }
        })
        .collect()
}

/// Order `nodes` so each comes after its dependencies.
///
/// `deps(node)` lists what `node` depends on. Dependencies outside `nodes`
/// are ignored and repeated edges count once. When several nodes are ready
/// the alphabetically smallest goes first. Nodes left over by a cycle are
/// appended in sorted order.
pub fn topological_order<F>(nodes: &[String], deps: F) -> Vec<String>
where
    F: Fn(&str) -> Vec<String>,
{
    let known: BTreeSet<&str> = nodes.iter().map(String::as_str).collect();
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for &node in &known {
        in_degree.entry(node).or_insert(0);
        let node_deps: BTreeSet<String> = deps(node).into_iter().collect();
        for dep in &node_deps {
            if let Some(&dep) = known.get(dep.as_str()) {
                *in_degree.entry(node).or_insert(0) += 1;
                dependents.entry(dep).or_default().push(node);
            }
        }
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(&id, _)| id)
        .collect();

    let mut order = Vec::with_capacity(known.len());
    while let Some(current) = ready.pop_first() {
        order.push(current.to_string());
        for &dependent in dependents.get(current).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    if order.len() != known.len() {
        let ordered: BTreeSet<&str> = order.iter().map(String::as_str).collect();
        let cycle_members: Vec<String> =
            known.difference(&ordered).map(|s| s.to_string()).collect();
        tracing::warn!(
            members = %cycle_members.join(", "),
            "dependency cycle detected; appending members in sorted order"
        );
        order.extend(cycle_members);
    }

    order
}

impl Template {
    /// Resources in deployment order: `DependsOn` edges plus reference-graph
    /// edges that point at other resources.
    pub fn deployment_order(&self) -> Vec<String> {
        let ids: Vec<String> = self.resources.keys().cloned().collect();
        topological_order(&ids, |id| {
            let mut deps: Vec<String> = self
                .resources
                .get(id)
                .map(|r| r.depends_on.clone())
                .unwrap_or_default();
            deps.extend(self.references(id).iter().cloned());
            deps
        })
    }
}
