//! Turns member and relationship records into the node/edge model handed to
//! the renderer: couples with shared children are routed through a synthetic
//! junction node and the relationships it absorbs are not drawn again.

mod assemble;
mod classify;
mod couples;
pub(crate) mod types;

pub use assemble::{Assembly, assemble_graph};
pub use classify::{Classification, ParentLink, classify_relationships};
pub use couples::{CoupleKey, JunctionSynthesis, junction_edge_id, synthesize_junctions};
pub use types::*;
