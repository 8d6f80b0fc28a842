use crate::config::{LayoutMode, load_config};
use crate::engine::TreeEngine;
use crate::ir::TreeDocument;
use crate::layout_dump::{GraphDump, write_graph_dump};
use crate::parser::{looks_like_tree_text, parse_tree};
use crate::store::MemoryStore;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use flexi_logger::Logger;
use log::info;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "ftree", version, about = "Family-tree graph engine: junctions, spouse alignment and layout")]
pub struct Args {
    /// Input file (tree JSON or .ftree text) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file for the graph JSON. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON/JSON5 file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Layout mode; overrides the config file
    #[arg(short = 'm', long = "mode", value_enum)]
    pub mode: Option<ModeArg>,

    /// Log level or spec (e.g. "debug", "family_tree_graph=trace")
    #[arg(long = "log-level", default_value = "warn")]
    pub log_level: String,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ModeArg {
    Auto,
    Manual,
}

impl From<ModeArg> for LayoutMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Auto => LayoutMode::Auto,
            ModeArg::Manual => LayoutMode::Manual,
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let _logger = Logger::try_with_env_or_str(&args.log_level)?
        .log_to_stderr()
        .start()?;

    let mut config = load_config(args.config.as_deref())?;
    if let Some(mode) = args.mode {
        config.engine.mode = mode.into();
    }

    let input = read_input(args.input.as_deref())?;
    let mut tree = parse_input(&input)?;
    if tree.tree_id.is_empty() {
        tree.tree_id = "tree".to_string();
    }
    let tree_id = tree.tree_id.clone();
    info!(
        "loaded tree {tree_id}: {} members, {} relationships",
        tree.members.len(),
        tree.relationships.len()
    );

    let mut engine = TreeEngine::new(&tree_id, MemoryStore::with_tree(tree), config);
    engine.refresh()?;

    match args.output.as_deref() {
        Some(path) => write_graph_dump(path, engine.graph(), engine.mode())?,
        None => println!("{}", GraphDump::from_graph(engine.graph(), engine.mode()).to_json()?),
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn parse_input(input: &str) -> Result<TreeDocument> {
    if looks_like_tree_text(input) {
        return Ok(parse_tree(input)?);
    }
    serde_json::from_str(input).map_err(|err| anyhow::anyhow!("input is neither tree text nor tree JSON: {err}"))
}
