// Flat record IR shared by the walker, the assembler and the renderers.
// No serde_json::Value here.

use std::fmt;
use serde::Serialize;

pub const ROOT_RECORD: &str = "root";

/// What a field declaration points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// `string`, `integer` or `float`.
    Scalar(String),
    /// Reference to another record block.
    Record(String),
}

impl FieldKind {
    pub fn scalar(name: impl Into<String>) -> Self { Self::Scalar(name.into()) }
    pub fn record(name: impl Into<String>) -> Self { Self::Record(name.into()) }

    /// The value rendered into the `type` attribute.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Scalar(name) | Self::Record(name) => name,
        }
    }

    pub fn is_record(&self) -> bool { matches!(self, Self::Record(_)) }
}

/// One field declaration. See [`FieldSpec::renders_same`] for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub list: bool,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), kind, list: false }
    }
    pub fn list(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), kind, list: true }
    }

    /// Same name, same `type` attribute, same qualifier.
    pub fn renders_same(&self, other: &FieldSpec) -> bool {
        self.name == other.name
            && self.kind.type_name() == other.kind.type_name()
            && self.list == other.list
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InstanceKey {
    pub record: String,
    pub ordinal: usize, // 1-based, unique per record name
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.record, self.ordinal)
    }
}

/// A single visit of a compound node during the walk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordInstance {
    pub key: InstanceKey,
    pub fields: Vec<FieldSpec>, // declaration order
    pub depth: usize,           // root visit = 1
}

impl RecordInstance {
    pub fn new(key: InstanceKey, depth: usize) -> Self {
        Self { key, fields: Vec::new(), depth }
    }
    pub fn record(&self) -> &str { &self.key.record }
}

/// Merged view of every instance sharing one record name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordDefinition {
    pub name: String,
    pub fields: Vec<FieldSpec>, // first-seen order, no duplicates
    pub depth: usize,           // max over instances
    #[serde(skip)]
    pub first_visit: usize,     // creation index of the first instance
}

impl RecordDefinition {
    pub fn new(name: impl Into<String>, first_visit: usize) -> Self {
        Self { name: name.into(), fields: Vec::new(), depth: 0, first_visit }
    }

    /// Append every field not already declared; keeps first-seen order.
    pub fn absorb<'a>(&mut self, fields: impl IntoIterator<Item = &'a FieldSpec>) {
        for field in fields {
            if !self.fields.iter().any(|seen| seen.renders_same(field)) {
                self.fields.push(field.clone());
            }
        }
    }

    pub fn from_instance(instance: &RecordInstance, first_visit: usize) -> Self {
        let mut def = Self::new(instance.record(), first_visit);
        def.absorb(&instance.fields);
        def.depth = instance.depth;
        def
    }
}

/// Output of the assembler, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assembly {
    /// Non-root records, deepest first.
    pub records: Vec<RecordDefinition>,
    /// Root block, taken from the first root visit.
    pub root: RecordDefinition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorb_skips_identical_declarations() {
        let mut def = RecordDefinition::new("addr", 0);
        let city = FieldSpec::new("city", FieldKind::scalar("string"));
        let zips = FieldSpec::list("zips", FieldKind::scalar("integer"));
        def.absorb(&[city.clone(), zips.clone()]);
        def.absorb(&[zips.clone(), city.clone()]);
        assert_eq!(def.fields, vec![city, zips]);
    }

    #[test]
    fn absorb_compares_rendered_declarations() {
        let mut def = RecordDefinition::new("shape", 0);
        let as_scalar = FieldSpec::new("point", FieldKind::scalar("point"));
        let as_record = FieldSpec::new("point", FieldKind::record("point"));
        def.absorb(&[as_scalar.clone()]);
        def.absorb(&[as_record]);
        assert_eq!(def.fields, vec![as_scalar]);
    }

    #[test]
    fn list_flag_distinguishes_declarations() {
        let a = FieldSpec::new("tags", FieldKind::scalar("string"));
        let b = FieldSpec::list("tags", FieldKind::scalar("string"));
        assert_ne!(a, b);
        assert!(!a.renders_same(&b));
    }

    #[test]
    fn instance_key_display() {
        let key = InstanceKey { record: "points".into(), ordinal: 2 };
        assert_eq!(key.to_string(), "points#2");
    }
}
