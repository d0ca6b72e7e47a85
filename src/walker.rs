//! Recursive schema walk.
//!
//! Visits the `properties` tree depth-first and decomposes every compound
//! field (object, or array of objects) into its own record. Each call to
//! [`SchemaWalker::walk`] produces one [`RecordInstance`]; instances sharing a
//! name are merged later by the assembler.
//!
//! Record names move through three states: unvisited, in progress, resolved.
//! A resolved name is treated as elementary wherever it shows up again, so a
//! record is expanded once and referenced afterwards. Reaching a name that is
//! still in progress is a re-entry, handled per [`ReentryPolicy`].
pub mod classify;

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::error::{display_path, Result, SchemaError};
use crate::ir::{InstanceKey, RecordInstance, ROOT_RECORD};
use classify::{declare, inner_properties, is_elementary_schema};

pub const DEFAULT_MAX_DEPTH: usize = 64;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// What to do when a record name is reached again while it is still being
/// walked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReentryPolicy {
    /// Fail with [`SchemaError::Cyclic`].
    #[default]
    Reject,
    /// Walk the nested occurrence as a new instance of the same record.
    Expand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    InProgress,
    Resolved,
}

#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Field names dropped at every level.
    pub skip_fields: Vec<String>,
    pub reentry: ReentryPolicy,
    /// Deepest record depth allowed; the root record sits at depth 1.
    pub max_depth: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            skip_fields: vec!["id".to_string()],
            reentry: ReentryPolicy::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl WalkOptions {
    fn skips(&self, key: &str) -> bool {
        self.skip_fields.iter().any(|f| f == key)
    }
}

/// Mutable state of one walk. Built fresh for every document.
#[derive(Debug, Default)]
pub struct WalkContext {
    instances: Vec<RecordInstance>,       // creation order
    visits: HashMap<String, usize>,       // per-name visit counter
    resolution: HashMap<String, Resolution>,
    max_depth: usize,
}

/// Everything the walk produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalkOutput {
    pub instances: Vec<RecordInstance>,
    pub max_depth: usize,
}

impl WalkOutput {
    pub fn instances_of<'a>(&'a self, record: &'a str) -> impl Iterator<Item = &'a RecordInstance> + 'a {
        self.instances.iter().filter(move |i| i.record() == record)
    }

    pub fn first_instance(&self, record: &str) -> Option<&RecordInstance> {
        self.instances.iter().find(|i| i.record() == record && i.key.ordinal == 1)
    }
}

pub struct SchemaWalker<'o> {
    options: &'o WalkOptions,
    ctx: WalkContext,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

/// Walks a whole document: its top-level `properties` become the `root` record.
pub fn walk_document(document: &Value, options: &WalkOptions) -> Result<WalkOutput> {
    let Some(Value::Object(props)) = document.get("properties") else {
        return Err(SchemaError::MissingProperties {
            field: ROOT_RECORD.to_string(),
            path: display_path(""),
        });
    };
    SchemaWalker::new(options).walk_root(props)
}

impl<'o> SchemaWalker<'o> {
    pub fn new(options: &'o WalkOptions) -> Self {
        Self { options, ctx: WalkContext::default() }
    }

    pub fn walk_root(mut self, props: &Map<String, Value>) -> Result<WalkOutput> {
        self.ctx.resolution.insert(ROOT_RECORD.to_string(), Resolution::InProgress);
        self.walk(props, ROOT_RECORD, 0, "")?;
        self.ctx.resolution.insert(ROOT_RECORD.to_string(), Resolution::Resolved);
        Ok(self.finish())
    }

    /// Records one visit of `node` under `record`, one level below `parent_depth`.
    ///
    /// Compound fields are resolved into their own records before the field's
    /// declaration is appended here.
    pub fn walk(
        &mut self,
        node: &Map<String, Value>,
        record: &str,
        parent_depth: usize,
        path: &str,
    ) -> Result<()> {
        let depth = parent_depth + 1;
        if depth > self.options.max_depth {
            return Err(SchemaError::DepthLimit {
                depth,
                limit: self.options.max_depth,
                path: display_path(path),
            });
        }
        self.ctx.max_depth = self.ctx.max_depth.max(depth);

        let ordinal = {
            let n = self.ctx.visits.entry(record.to_string()).or_default();
            *n += 1;
            *n
        };
        let slot = self.ctx.instances.len();
        let key = InstanceKey { record: record.to_string(), ordinal };
        debug!(instance = %key, depth, "walking record");
        self.ctx.instances.push(RecordInstance::new(key, depth));

        for (key, value) in node {
            let field_path = format!("{path}/{key}");
            if self.options.skips(key) {
                trace!(path = %field_path, "skipping field");
                continue;
            }
            if !self.is_elementary(key, value, &field_path)? {
                self.resolve_record(key, value, depth, &field_path)?;
            }
            let field = declare(key, value, &field_path)?;
            self.ctx.instances[slot].fields.push(field);
        }
        Ok(())
    }

    /// Turns compound field `key` into a resolved record.
    ///
    /// Compound members of its inner mapping are resolved first (one level
    /// deeper, recursively), so by the time the inner mapping is walked every
    /// member is elementary and the record is a base object.
    fn resolve_record(
        &mut self,
        key: &str,
        value: &Value,
        parent_depth: usize,
        path: &str,
    ) -> Result<()> {
        if self.resolution(key) == Some(Resolution::InProgress) {
            match self.options.reentry {
                ReentryPolicy::Reject => {
                    return Err(SchemaError::Cyclic {
                        record: key.to_string(),
                        path: display_path(path),
                    });
                }
                ReentryPolicy::Expand => {
                    warn!(record = key, path = %display_path(path), "re-entering record in progress");
                }
            }
        }

        let inner = inner_properties(key, value, path)?;
        self.ctx.resolution.insert(key.to_string(), Resolution::InProgress);

        let pending = self.compound_members(inner, path)?;
        if pending.is_empty() {
            debug!(record = key, "base object");
        } else {
            debug!(record = key, members = pending.len(), "pre-resolving compound members");
        }
        for (member, member_value) in pending {
            if self.resolution(member) == Some(Resolution::Resolved) {
                continue;
            }
            let member_path = format!("{path}/{member}");
            self.resolve_record(member, member_value, parent_depth + 1, &member_path)?;
        }

        self.walk(inner, key, parent_depth, path)?;
        self.ctx.resolution.insert(key.to_string(), Resolution::Resolved);
        Ok(())
    }

    /// Whether every non-skipped member of `inner` is elementary.
    pub fn is_base_object(&self, inner: &Map<String, Value>, path: &str) -> Result<bool> {
        Ok(self.compound_members(inner, path)?.is_empty())
    }

    fn compound_members<'a>(
        &self,
        inner: &'a Map<String, Value>,
        path: &str,
    ) -> Result<Vec<(&'a str, &'a Value)>> {
        let mut out = Vec::new();
        for (key, value) in inner {
            if self.options.skips(key) {
                continue;
            }
            if !self.is_elementary(key, value, &format!("{path}/{key}"))? {
                out.push((key.as_str(), value));
            }
        }
        Ok(out)
    }

    /// A resolved record name short-circuits as elementary.
    fn is_elementary(&self, key: &str, value: &Value, path: &str) -> Result<bool> {
        if self.resolution(key) == Some(Resolution::Resolved) {
            return Ok(true);
        }
        is_elementary_schema(value, path)
    }

    pub fn resolution(&self, record: &str) -> Option<Resolution> {
        self.ctx.resolution.get(record).copied()
    }

    pub fn finish(self) -> WalkOutput {
        WalkOutput {
            instances: self.ctx.instances,
            max_depth: self.ctx.max_depth,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FieldKind, FieldSpec};
    use serde_json::json;

    fn walk(doc: Value) -> WalkOutput {
        walk_document(&doc, &WalkOptions::default()).unwrap()
    }

    fn keys(out: &WalkOutput) -> Vec<String> {
        out.instances.iter().map(|i| i.key.to_string()).collect()
    }

    #[test]
    fn nested_object_becomes_its_own_record() {
        let out = walk(json!({"properties": {
            "name": {"type": "string"},
            "addr": {"type": "object", "properties": {"city": {"type": "string"}}}
        }}));
        assert_eq!(keys(&out), vec!["root#1", "addr#1"]);
        let root = out.first_instance("root").unwrap();
        assert_eq!(root.depth, 1);
        assert_eq!(root.fields, vec![
            FieldSpec::new("name", FieldKind::scalar("string")),
            FieldSpec::new("addr", FieldKind::record("addr")),
        ]);
        let addr = out.first_instance("addr").unwrap();
        assert_eq!(addr.depth, 2);
        assert_eq!(addr.fields, vec![FieldSpec::new("city", FieldKind::scalar("string"))]);
        assert_eq!(out.max_depth, 2);
    }

    #[test]
    fn null_field_is_a_string() {
        let out = walk(json!({"properties": {"note": null}}));
        let root = out.first_instance("root").unwrap();
        assert_eq!(root.fields, vec![FieldSpec::new("note", FieldKind::scalar("string"))]);
    }

    #[test]
    fn id_is_skipped_at_every_level() {
        let out = walk(json!({"properties": {
            "id": {"type": "integer"},
            "user": {"type": "object", "properties": {
                "id": {"type": "integer"},
                "profile": {"type": "object", "properties": {
                    "id": {"type": "object", "properties": {"x": {"type": "string"}}},
                    "bio": {"type": "string"}
                }}
            }}
        }}));
        for instance in &out.instances {
            assert!(instance.fields.iter().all(|f| f.name != "id"), "{}", instance.key);
        }
        assert!(out.first_instance("id").is_none());
    }

    #[test]
    fn compound_members_are_resolved_before_their_parent() {
        let out = walk(json!({"properties": {
            "order": {"type": "object", "properties": {
                "total": {"type": "float"},
                "lines": {"type": "array", "properties": [{"type": "object", "properties": {
                    "sku": {"type": "string"},
                    "product": {"type": "object", "properties": {"title": {"type": "string"}}}
                }}]}
            }}
        }}));
        assert_eq!(keys(&out), vec!["root#1", "product#1", "lines#1", "order#1"]);
        let depth = |r: &str| out.first_instance(r).unwrap().depth;
        assert_eq!((depth("order"), depth("lines"), depth("product")), (2, 3, 4));
        assert_eq!(out.first_instance("lines").unwrap().fields, vec![
            FieldSpec::new("sku", FieldKind::scalar("string")),
            FieldSpec::new("product", FieldKind::record("product")),
        ]);
        assert_eq!(out.first_instance("order").unwrap().fields, vec![
            FieldSpec::new("total", FieldKind::scalar("float")),
            FieldSpec::list("lines", FieldKind::record("lines")),
        ]);
    }

    #[test]
    fn several_compound_members_are_all_pre_resolved() {
        let out = walk(json!({"properties": {
            "pair": {"type": "object", "properties": {
                "left": {"type": "object", "properties": {"v": {"type": "integer"}}},
                "right": {"type": "object", "properties": {"v": {"type": "integer"}}}
            }}
        }}));
        assert_eq!(keys(&out), vec!["root#1", "left#1", "right#1", "pair#1"]);
    }

    #[test]
    fn resolved_name_is_referenced_not_expanded_again() {
        let out = walk(json!({"properties": {
            "home": {"type": "object", "properties": {"city": {"type": "string"}}},
            "work": {"type": "object", "properties": {
                "home": {"type": "object", "properties": {"zip": {"type": "string"}}}
            }}
        }}));
        assert_eq!(out.instances_of("home").count(), 1);
        assert_eq!(out.first_instance("work").unwrap().fields, vec![
            FieldSpec::new("home", FieldKind::record("home")),
        ]);
    }

    #[test]
    fn reentry_is_rejected_by_default() {
        let doc = json!({"properties": {
            "node": {"type": "object", "properties": {
                "label": {"type": "string"},
                "node": {"type": "object", "properties": {"leaf": {"type": "integer"}}}
            }}
        }});
        let err = walk_document(&doc, &WalkOptions::default()).unwrap_err();
        match err {
            SchemaError::Cyclic { record, path } => {
                assert_eq!(record, "node");
                assert_eq!(path, "/node/node");
            }
            other => panic!("expected Cyclic, got {other:?}"),
        }
    }

    #[test]
    fn reentry_expands_into_a_second_instance() {
        let doc = json!({"properties": {
            "node": {"type": "object", "properties": {
                "label": {"type": "string"},
                "node": {"type": "object", "properties": {"leaf": {"type": "integer"}}}
            }}
        }});
        let options = WalkOptions { reentry: ReentryPolicy::Expand, ..WalkOptions::default() };
        let out = walk_document(&doc, &options).unwrap();
        assert_eq!(keys(&out), vec!["root#1", "node#1", "node#2"]);
        let depths: Vec<usize> = out.instances_of("node").map(|i| i.depth).collect();
        assert_eq!(depths, vec![3, 2]);
    }

    #[test]
    fn field_named_root_is_a_reentry() {
        let doc = json!({"properties": {
            "root": {"type": "object", "properties": {"x": {"type": "string"}}}
        }});
        let err = walk_document(&doc, &WalkOptions::default()).unwrap_err();
        assert!(matches!(err, SchemaError::Cyclic { ref record, .. } if record == "root"));
    }

    #[test]
    fn depth_limit_is_enforced() {
        let doc = json!({"properties": {
            "a": {"type": "object", "properties": {
                "b": {"type": "object", "properties": {"c": {"type": "string"}}}
            }}
        }});
        let options = WalkOptions { max_depth: 2, ..WalkOptions::default() };
        let err = walk_document(&doc, &options).unwrap_err();
        assert!(matches!(err, SchemaError::DepthLimit { depth: 3, limit: 2, .. }));
    }

    #[test]
    fn missing_root_properties_is_an_error() {
        let err = walk_document(&json!({"type": "object"}), &WalkOptions::default()).unwrap_err();
        assert!(matches!(err, SchemaError::MissingProperties { ref field, .. } if field == "root"));
    }

    #[test]
    fn base_object_check_honors_resolved_names() {
        let options = WalkOptions::default();
        let mut walker = SchemaWalker::new(&options);
        let inner = json!({
            "city": {"type": "string"},
            "geo": {"type": "object", "properties": {"lat": {"type": "float"}}}
        });
        let inner = inner.as_object().unwrap();
        assert!(!walker.is_base_object(inner, "/addr").unwrap());
        walker.ctx.resolution.insert("geo".into(), Resolution::Resolved);
        assert!(walker.is_base_object(inner, "/addr").unwrap());
    }
}
