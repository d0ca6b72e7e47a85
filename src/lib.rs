//! # schema-flatten
//!
//! Flatten a nested JSON-Schema-like document into named record blocks.
//!
//! Every compound field (an `object`, or an `array` of objects) becomes its
//! own record; the parent keeps a reference to it. Records are merged by name,
//! ordered deepest first, and rendered with the top-level `root` record last.
//!
//! ```no_run
//! use serde_json::json;
//! use schema_flatten::{flatten, render::{MarkupRenderer, Renderer}, walker::WalkOptions};
//!
//! let doc = json!({"properties": {
//!     "name": {"type": "string"},
//!     "addr": {"type": "object", "properties": {"city": {"type": "string"}}}
//! }});
//! let assembly = flatten(&doc, &WalkOptions::default()).unwrap();
//! for line in MarkupRenderer::default().render(&assembly).unwrap() {
//!     println!("{line}");
//! }
//! ```
//!
//! - [`walker`]: recursive decomposition into record instances
//! - [`assemble`]: merging, depth attachment and ordering
//! - [`render`]: markup and JSON line renderers
//! - [`cli`]: the `schema-flatten` binary's loader and options
pub mod assemble;
pub mod cli;
pub mod config;
pub mod error;
pub mod ir;
pub mod jq_exec;
pub mod path_de;
pub mod render;
pub mod walker;

pub use config::GeneratorConfig;
pub use error::{Result, SchemaError};
pub use ir::{Assembly, FieldKind, FieldSpec, RecordDefinition, RecordInstance};

use serde_json::Value;

/// Walk `document` and assemble the ordered record set.
pub fn flatten(document: &Value, options: &walker::WalkOptions) -> Result<Assembly> {
    let walk = walker::walk_document(document, options)?;
    tracing::debug!(instances = walk.instances.len(), max_depth = walk.max_depth, "walk finished");
    Ok(assemble::assemble(&walk))
}
