//! Provenance graph construction and DOT emission.
//!
//! Command and file nodes alternate along edges: input file -> command ->
//! output file. Nodes and edges are sets, so records that repeat a
//! relationship (e.g. the sidecars of one multi-output command) collapse.
use crate::audit::AuditRecord;
use crate::settings::ReportStyle;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvenanceGraph {
    pub command_nodes: BTreeSet<String>,
    pub file_nodes: BTreeSet<String>,
    /// Directed `(from, to)` pairs.
    pub edges: BTreeSet<(String, String)>,
}

pub fn build_graph<'a, I>(records: I) -> ProvenanceGraph
where
    I: IntoIterator<Item = &'a AuditRecord>,
{
    let mut graph = ProvenanceGraph::default();
    for record in records {
        let command = command_label(record);
        for input in &record.inputs {
            let input = escape_label(input);
            graph.edges.insert((input.clone(), command.clone()));
            graph.file_nodes.insert(input);
        }
        for output in &record.outputs {
            let output = escape_label(output);
            graph.edges.insert((command.clone(), output.clone()));
            graph.file_nodes.insert(output);
        }
        graph.command_nodes.insert(command);
    }
    graph
}

/// The first executor's command, quote-escaped for use as a DOT label.
pub fn command_label(record: &AuditRecord) -> String {
    escape_label(&record.command_line())
}

impl ProvenanceGraph {
    pub fn to_dot(&self, style: &ReportStyle) -> String {
        let mut dot = String::from("DIGRAPH G {\n");
        dot.push_str(&format!("  node [{}];\n", style.node_defaults));
        for node in &self.command_nodes {
            dot.push_str(&format!("  \"{node}\" [fillcolor=\"{}\"]\n", style.command_fill));
        }
        for node in &self.file_nodes {
            dot.push_str(&format!("  \"{node}\" [fillcolor=\"{}\"]\n", style.file_fill));
        }
        for (from, to) in &self.edges {
            dot.push_str(&format!("  \"{from}\" -> \"{to}\"\n"));
        }
        dot.push('}');
        dot.push('\n');
        dot
    }
}

fn escape_label(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}
