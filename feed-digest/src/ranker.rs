use crate::types::{Group, Item, RankedGroup};
use std::collections::{BTreeMap, HashMap};

/// Newest first. Ties keep no particular order.
pub fn rank(items: &[Item]) -> Vec<Item> {
    rank_owned(items.to_vec())
}

fn rank_owned(mut items: Vec<Item>) -> Vec<Item> {
    items.sort_unstable_by(|a, b| b.timestamp.cmp(&a.timestamp));
    items
}

/// Attach each group's flags to its ranked bucket.
///
/// Identifiers that decode to the same name (`music` and `music#`) share one
/// bucket, so they come out as a single group carrying the union of their flags.
pub fn rank_groups(
    groups: &[Group],
    mut buckets: HashMap<String, Vec<Item>>,
) -> BTreeMap<String, RankedGroup> {
    let mut ranked: BTreeMap<String, RankedGroup> = BTreeMap::new();

    for group in groups {
        let entry = ranked.entry(group.name.clone()).or_default();
        entry.selected |= group.flags.selected;
        entry.muted |= group.flags.muted;
        if let Some(items) = buckets.remove(&group.name) {
            entry.items.extend(items);
        }
    }

    for group in ranked.values_mut() {
        group.items = rank_owned(std::mem::take(&mut group.items));
    }
    ranked
}
