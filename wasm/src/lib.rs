use family_tree_graph::layout_dump::GraphDump;
use family_tree_graph::{Config, LayoutMode, MemoryStore, TreeDocument, TreeEngine, parse_tree};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphOptions {
    mode: Option<String>,
    node_spacing: Option<f32>,
    rank_spacing: Option<f32>,
    member_width: Option<f32>,
    member_height: Option<f32>,
}

fn build_config(options: GraphOptions) -> Result<Config, String> {
    let mut config = Config::default();
    if let Some(mode) = options.mode.as_deref() {
        config.engine.mode =
            LayoutMode::from_token(mode).ok_or_else(|| format!("unknown layout mode `{mode}`"))?;
    }
    if let Some(v) = options.node_spacing {
        config.layout.node_spacing = v;
    }
    if let Some(v) = options.rank_spacing {
        config.layout.rank_spacing = v;
    }
    if let Some(v) = options.member_width {
        config.layout.member_width = v;
    }
    if let Some(v) = options.member_height {
        config.layout.member_height = v;
    }
    Ok(config)
}

fn graph_json(tree: &str, options: GraphOptions) -> Result<String, String> {
    let config = build_config(options)?;
    let mut doc: TreeDocument = if tree.trim_start().starts_with('{') {
        serde_json::from_str(tree).map_err(|error| error.to_string())?
    } else {
        parse_tree(tree).map_err(|error| error.to_string())?
    };
    if doc.tree_id.is_empty() {
        doc.tree_id = "tree".to_string();
    }
    let tree_id = doc.tree_id.clone();

    let mut engine = TreeEngine::new(&tree_id, MemoryStore::with_tree(doc), config);
    engine.refresh().map_err(|error| error.to_string())?;
    serde_json::to_string(&GraphDump::from_graph(engine.graph(), engine.mode()))
        .map_err(|error| error.to_string())
}

/// Builds the renderable graph for a tree given as JSON or `.ftree` text.
#[wasm_bindgen]
pub fn family_graph_json(tree_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<GraphOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        GraphOptions::default()
    };

    graph_json(tree_json, options).map_err(|error| JsValue::from_str(&error))
}
