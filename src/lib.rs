#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod drag;
pub mod engine;
pub mod graph;
pub mod history;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod signature;
pub mod store;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, EngineConfig, LayoutConfig, LayoutMode, load_config};
pub use engine::{ConnectOutcome, EngineError, Publish, RelatedAs, Rejection, TreeEngine};
pub use graph::{Graph, assemble_graph};
pub use ir::{DisplayIdentity, Member, Position, Relationship, RelationshipKind, TreeDocument};
pub use layout::{DagreLayout, LayoutProvider};
pub use parser::parse_tree;
pub use store::{MemoryStore, StoreError, TreeStore};
