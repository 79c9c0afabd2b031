use crate::models::graph::{ImportGraphReport, ImportKind, Layer};
use std::collections::BTreeSet;
use std::fmt::Write;

/// Node budget keeps diagrams below Mermaid's practical rendering limits.
const MAX_NODES: usize = 30;

/// Deterministic `graph TD` rendering of the import graph, focused on the
/// highest-degree modules.
pub fn generate(graph: &ImportGraphReport) -> String {
    let mut included: BTreeSet<&str> = graph
        .hubs
        .iter()
        .take(MAX_NODES)
        .map(|h| h.module.as_str())
        .collect();
    if included.is_empty() {
        for node in graph.nodes.iter().take(MAX_NODES) {
            included.insert(node.as_str());
        }
    }

    let mut output = String::from("graph TD\n");
    for node in &included {
        let layer = graph.layers.get(*node).copied().unwrap_or(Layer::Core);
        let id = sanitize_id(node);
        let label = escape_label(node);
        let node_def = match layer {
            Layer::Foundation => format!("{id}[({label})]"),
            Layer::Orchestration => format!("{id}{{{{{label}}}}}"),
            _ => format!("{id}[{label}]"),
        };
        let _ = writeln!(output, "    {node_def}");
    }
    output.push('\n');

    for edge in &graph.edges {
        if edge.kind != ImportKind::Internal || !edge.resolved {
            continue;
        }
        if !included.contains(edge.source.as_str()) || !included.contains(edge.target.as_str()) {
            continue;
        }
        let _ = writeln!(
            output,
            "    {} --> {}",
            sanitize_id(edge.source.as_str()),
            sanitize_id(edge.target.as_str())
        );
    }
    output
}

fn sanitize_id(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn escape_label(name: &str) -> String {
    name.replace('"', "&quot;").replace(['[', ']', '{', '}'], "_")
}
