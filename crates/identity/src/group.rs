use std::collections::BTreeMap;

use crate::mapping::MappingLookup;
use crate::model::ContactRecord;
use crate::resolver::{IdentityResolver, ResolutionSource};

/// One canonical identity and every record that resolves to it.
#[derive(Debug, Clone)]
pub struct IdentityGroup {
    pub canonical: String,
    /// Ordered by `created_at` ascending; equal timestamps keep snapshot order.
    pub records: Vec<ContactRecord>,
    /// How each non-canonical member resolved, keyed by record id.
    pub sources: BTreeMap<i64, ResolutionSource>,
}

impl IdentityGroup {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_degraded(&self) -> bool {
        self.sources.values().any(|s| s.is_degraded())
    }

    pub fn source_of(&self, id: i64) -> ResolutionSource {
        self.sources
            .get(&id)
            .copied()
            .unwrap_or(ResolutionSource::AlreadyCanonical)
    }
}

/// Partition records by canonical identity.
///
/// Canonical records key themselves without a lookup. Groups come back in
/// canonical-identity order so a sweep walks them deterministically.
pub fn group_records<M: MappingLookup>(
    records: &[ContactRecord],
    resolver: &IdentityResolver<M>,
) -> Vec<IdentityGroup> {
    let mut groups: BTreeMap<String, IdentityGroup> = BTreeMap::new();

    for record in records {
        let (canonical, source) = if record.is_canonical() {
            (record.identity_value.clone(), None)
        } else {
            let resolution = resolver.resolve_detailed(&record.identity_value);
            (resolution.canonical, Some(resolution.source))
        };

        let group = groups
            .entry(canonical.clone())
            .or_insert_with(|| IdentityGroup {
                canonical,
                records: Vec::new(),
                sources: BTreeMap::new(),
            });
        if let Some(source) = source {
            group.sources.insert(record.id, source);
        }
        group.records.push(record.clone());
    }

    groups
        .into_values()
        .map(|mut group| {
            group.records.sort_by_key(|r| r.created_at);
            group
        })
        .collect()
}

/// Plain `canonical -> records` view of [`group_records`].
pub fn group_by_identity<M: MappingLookup>(
    records: &[ContactRecord],
    resolver: &IdentityResolver<M>,
) -> BTreeMap<String, Vec<ContactRecord>> {
    group_records(records, resolver)
        .into_iter()
        .map(|group| (group.canonical, group.records))
        .collect()
}
