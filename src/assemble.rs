//! Merge record instances into definitions and order them for emission.
use indexmap::IndexMap;
use tracing::debug;

use crate::ir::{Assembly, RecordDefinition, RecordInstance, ROOT_RECORD};
use crate::walker::WalkOutput;

/// Union the fields of every instance into one definition per record name.
///
/// Definitions appear in order of their first instance; fields keep
/// first-seen order and identical declarations are kept once.
pub fn merge(instances: &[RecordInstance]) -> IndexMap<String, RecordDefinition> {
    let mut definitions: IndexMap<String, RecordDefinition> = IndexMap::new();
    for (index, instance) in instances.iter().enumerate() {
        definitions
            .entry(instance.record().to_string())
            .or_insert_with(|| RecordDefinition::new(instance.record(), index))
            .absorb(&instance.fields);
    }
    definitions
}

/// Give each definition the deepest depth among its instances, then sort
/// deepest first. Equal depths keep first-visit order.
pub fn attach_depth_and_order(
    definitions: IndexMap<String, RecordDefinition>,
    instances: &[RecordInstance],
) -> Vec<RecordDefinition> {
    let mut ordered: Vec<RecordDefinition> = definitions
        .into_values()
        .map(|mut def| {
            let deepest = instances
                .iter()
                .filter(|i| i.record() == def.name)
                .map(|i| i.depth)
                .max()
                .unwrap_or(0);
            def.depth = def.depth.max(deepest);
            def
        })
        .collect();
    ordered.sort_by(|a, b| b.depth.cmp(&a.depth).then(a.first_visit.cmp(&b.first_visit)));
    ordered
}

/// Runs merge and ordering, and splits off the root block.
///
/// The root block comes from the first root visit, not from the merged
/// definition.
pub fn assemble(walk: &WalkOutput) -> Assembly {
    let definitions = merge(&walk.instances);
    let mut records = attach_depth_and_order(definitions, &walk.instances);
    records.retain(|def| def.name != ROOT_RECORD);

    let root = walk
        .instances
        .iter()
        .enumerate()
        .find(|(_, i)| i.record() == ROOT_RECORD && i.key.ordinal == 1)
        .map(|(index, i)| RecordDefinition::from_instance(i, index))
        .unwrap_or_else(|| RecordDefinition::new(ROOT_RECORD, 0));

    debug!(records = records.len(), root_fields = root.fields.len(), "assembled records");
    Assembly { records, root }
}
