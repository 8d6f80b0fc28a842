use crate::config::LayoutMode;
use crate::graph::{EdgeKind, Graph, Handle, NodeKind};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDump {
    pub mode: LayoutMode,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub kind: &'static str,
    pub label: Option<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub selectable: bool,
    pub draggable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<[String; 2]>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: Handle,
    pub target_handle: Handle,
    pub kind: EdgeKind,
    pub relationship: Option<String>,
    pub label: Option<String>,
}

impl GraphDump {
    pub fn from_graph(graph: &Graph, mode: LayoutMode) -> Self {
        let nodes = graph
            .nodes
            .iter()
            .map(|node| {
                let (kind, label, parents) = match &node.kind {
                    NodeKind::Member(display) => ("member", Some(display.label()), None),
                    NodeKind::Junction(junction) => (
                        "junction",
                        None,
                        Some([junction.parent1.clone(), junction.parent2.clone()]),
                    ),
                };
                NodeDump {
                    id: node.id.clone(),
                    kind,
                    label,
                    x: node.position.x,
                    y: node.position.y,
                    width: node.width,
                    height: node.height,
                    selectable: node.selectable(),
                    draggable: node.draggable(),
                    parents,
                }
            })
            .collect();

        let edges = graph
            .edges
            .iter()
            .map(|edge| EdgeDump {
                id: edge.id.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                source_handle: edge.source_handle,
                target_handle: edge.target_handle,
                kind: edge.kind,
                relationship: edge.relationship.as_ref().map(|kind| kind.to_string()),
                label: edge.label.clone(),
            })
            .collect();

        GraphDump { mode, nodes, edges }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn write_graph_dump(path: &Path, graph: &Graph, mode: LayoutMode) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = GraphDump::from_graph(graph, mode);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
