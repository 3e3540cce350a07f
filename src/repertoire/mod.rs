//! Ordered store of code points, sequences, ranges and their variants.

mod entry;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

pub use entry::{CodePointEntry, Context, RangeDecl, Variant};

use crate::error::{LgrError, Result};
use crate::unicode::PointSet;

/// One item of the serialization order: ranges appear once.
#[derive(Debug, Clone, Copy)]
pub enum RepertoireItem<'a> {
    Entry(&'a CodePointEntry),
    Range(&'a RangeDecl),
}

/// Entries indexed by their first code point.
///
/// Each bucket holds the single code point and every sequence starting with
/// it, longest first, so prefix lookups return candidates in the order the
/// greedy decomposition tries them.
#[derive(Debug, Clone, Default)]
pub struct Repertoire {
    entries: BTreeMap<u32, Vec<CodePointEntry>>,
    /// Sorted by lower bound, non-overlapping.
    ranges: Vec<RangeDecl>,
}

impl Repertoire {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, counting every range member.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, cp: &[u32]) -> bool {
        self.get(cp).is_some()
    }

    pub fn get(&self, cp: &[u32]) -> Option<&CodePointEntry> {
        let first = *cp.first()?;
        self.entries.get(&first)?.iter().find(|e| e.cp == cp)
    }

    fn get_mut(&mut self, cp: &[u32]) -> Option<&mut CodePointEntry> {
        let first = *cp.first()?;
        self.entries.get_mut(&first)?.iter_mut().find(|e| e.cp == cp)
    }

    pub fn add_entry(&mut self, entry: CodePointEntry) -> Result<()> {
        if entry.cp.is_empty() {
            return Err(LgrError::EmptyCodePoints);
        }
        if self.contains(&entry.cp) {
            return Err(LgrError::AlreadyExists(entry.cp));
        }
        let bucket = self.entries.entry(entry.first_cp()).or_default();
        bucket.push(entry);
        sort_bucket(bucket);
        Ok(())
    }

    /// Declare `first..=last`. Fails before touching the repertoire when the
    /// bounds are reversed, the range overlaps another range, or a member
    /// already exists as an entry.
    pub fn add_range(&mut self, range: RangeDecl) -> Result<()> {
        let (first, last) = (range.first, range.last);
        if first > last {
            return Err(LgrError::InvalidParameter(format!(
                "range first {first:04X} is greater than last {last:04X}"
            )));
        }
        let idx = self.ranges.partition_point(|r| r.first < first);
        let overlaps_prev = idx > 0 && self.ranges[idx - 1].overlaps(first, last);
        let overlaps_next = self
            .ranges
            .get(idx)
            .is_some_and(|r| r.overlaps(first, last));
        if overlaps_prev || overlaps_next {
            return Err(LgrError::RangeOverlap { first, last });
        }
        if let Some(cp) = (first..=last).find(|&cp| self.contains(&[cp])) {
            return Err(LgrError::AlreadyExists(vec![cp]));
        }
        for cp in first..=last {
            let bucket = self.entries.entry(cp).or_default();
            bucket.push(range.member(cp));
            sort_bucket(bucket);
        }
        self.ranges.insert(idx, range);
        Ok(())
    }

    /// Remove a single entry or sequence. Range members can only go with
    /// their whole range.
    pub fn delete_entry(&mut self, cp: &[u32]) -> Result<CodePointEntry> {
        let entry = self.get(cp).ok_or_else(|| LgrError::NotFound(cp.to_vec()))?;
        if let Some((first, last)) = entry.range {
            return Err(LgrError::RangeMember {
                cp: cp.to_vec(),
                first,
                last,
            });
        }
        self.take_entry(cp).ok_or_else(|| LgrError::NotFound(cp.to_vec()))
    }

    fn take_entry(&mut self, cp: &[u32]) -> Option<CodePointEntry> {
        let first = *cp.first()?;
        let bucket = self.entries.get_mut(&first)?;
        let pos = bucket.iter().position(|e| e.cp == cp)?;
        let entry = bucket.remove(pos);
        if bucket.is_empty() {
            self.entries.remove(&first);
        }
        Some(entry)
    }

    /// Remove a range exactly as it was declared.
    pub fn delete_range(&mut self, first: u32, last: u32) -> Result<RangeDecl> {
        let idx = self.range_index(first, last)?;
        let range = self.ranges.remove(idx);
        for cp in first..=last {
            self.take_entry(&[cp]);
        }
        Ok(range)
    }

    /// Turn a declared range into independent single code point entries
    /// carrying the range attributes.
    pub fn expand_range(&mut self, first: u32, last: u32) -> Result<()> {
        let idx = self.range_index(first, last)?;
        self.ranges.remove(idx);
        for cp in first..=last {
            if let Some(entry) = self.get_mut(&[cp]) {
                entry.range = None;
            }
        }
        Ok(())
    }

    pub fn expand_ranges(&mut self) {
        let bounds: Vec<(u32, u32)> = self.ranges.iter().map(|r| (r.first, r.last)).collect();
        for (first, last) in bounds {
            // Bounds come from the declared list.
            let _ = self.expand_range(first, last);
        }
    }

    fn range_index(&self, first: u32, last: u32) -> Result<usize> {
        self.ranges
            .iter()
            .position(|r| r.first == first && r.last == last)
            .ok_or_else(|| LgrError::NotFound(vec![first, last]))
    }

    pub fn ranges(&self) -> &[RangeDecl] {
        &self.ranges
    }

    /// Drop reference `id` from every entry, variant and range.
    pub(crate) fn strip_reference(&mut self, id: &str) {
        for entry in self.entries.values_mut().flatten() {
            entry.references.retain(|r| r != id);
            for variant in &mut entry.variants {
                variant.references.retain(|r| r != id);
            }
        }
        for range in &mut self.ranges {
            range.references.retain(|r| r != id);
        }
    }

    pub fn add_variant(&mut self, cp: &[u32], variant: Variant) -> Result<()> {
        let entry = self
            .get_mut(cp)
            .ok_or_else(|| LgrError::NotFound(cp.to_vec()))?;
        if let Some((first, last)) = entry.range {
            return Err(LgrError::RangeMember {
                cp: cp.to_vec(),
                first,
                last,
            });
        }
        if entry.find_variant(&variant.cp, &variant.context).is_some() {
            return Err(LgrError::VariantAlreadyExists {
                cp: cp.to_vec(),
                variant: variant.cp,
            });
        }
        entry.variants.push(variant);
        Ok(())
    }

    pub fn delete_variant(
        &mut self,
        cp: &[u32],
        variant: &[u32],
        context: &Context,
    ) -> Result<Variant> {
        let entry = self
            .get_mut(cp)
            .ok_or_else(|| LgrError::NotFound(cp.to_vec()))?;
        let pos = entry
            .variants
            .iter()
            .position(|v| v.cp.as_slice() == variant && &v.context == context)
            .ok_or_else(|| LgrError::VariantNotFound {
                cp: cp.to_vec(),
                variant: variant.to_vec(),
            })?;
        Ok(entry.variants.remove(pos))
    }

    pub fn get_variants(&self, cp: &[u32]) -> Result<&[Variant]> {
        self.get(cp)
            .map(CodePointEntry::variants)
            .ok_or_else(|| LgrError::NotFound(cp.to_vec()))
    }

    /// Entries starting with `first`, longest first.
    pub fn entries_with_prefix(
        &self,
        first: u32,
        only_with_variants: bool,
    ) -> Vec<&CodePointEntry> {
        self.entries
            .get(&first)
            .map(|bucket| {
                bucket
                    .iter()
                    .filter(|e| !only_with_variants || e.has_variants())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every entry in code point order, range members included.
    pub fn entries(&self) -> impl Iterator<Item = &CodePointEntry> {
        self.entries.values().flat_map(|bucket| bucket.iter().rev())
    }

    /// Serialization order: entries in code point order with each range
    /// reported once, at its first member.
    pub fn iter(&self) -> impl Iterator<Item = RepertoireItem<'_>> {
        self.entries().filter_map(|entry| match entry.range {
            None => Some(RepertoireItem::Entry(entry)),
            Some((first, last)) if entry.cp[0] == first => self
                .ranges
                .iter()
                .find(|r| r.first == first && r.last == last)
                .map(RepertoireItem::Range),
            Some(_) => None,
        })
    }

    /// Code points carrying each tag.
    pub fn tag_index(&self) -> BTreeMap<String, PointSet> {
        let mut index: BTreeMap<String, PointSet> = BTreeMap::new();
        for entry in self.entries() {
            for tag in &entry.tags {
                index.entry(tag.clone()).or_default().insert(entry.cp[0]);
            }
        }
        index
    }

    /// Connected components of the variant relation with more than one
    /// member, keyed by their smallest code point sequence.
    ///
    /// Descriptive only: edges are followed in both directions, edges to
    /// missing targets are skipped, and a component is an equivalence class
    /// only for a symmetric, transitive repertoire.
    pub fn variant_sets(&self) -> BTreeMap<Vec<u32>, BTreeSet<Vec<u32>>> {
        let mut adjacency: HashMap<&[u32], Vec<&[u32]>> = HashMap::new();
        for entry in self.entries() {
            for variant in entry.variants() {
                if variant.cp != entry.cp && self.contains(&variant.cp) {
                    adjacency
                        .entry(entry.cp.as_slice())
                        .or_default()
                        .push(variant.cp.as_slice());
                    adjacency
                        .entry(variant.cp.as_slice())
                        .or_default()
                        .push(entry.cp.as_slice());
                }
            }
        }
        let mut visited: HashSet<&[u32]> = HashSet::new();
        let mut sets = BTreeMap::new();
        for entry in self.entries() {
            let start: &[u32] = &entry.cp;
            if !adjacency.contains_key(start) || !visited.insert(start) {
                continue;
            }
            let mut component = BTreeSet::new();
            let mut worklist = vec![start];
            while let Some(cp) = worklist.pop() {
                component.insert(cp.to_vec());
                for &next in adjacency.get(cp).into_iter().flatten() {
                    if visited.insert(next) {
                        worklist.push(next);
                    }
                }
            }
            if let Some(key) = component.first().cloned() {
                if component.len() > 1 {
                    sets.insert(key, component);
                }
            }
        }
        sets
    }
}

/// Longest first; `entries()` walks buckets backwards to get code point order.
fn sort_bucket(bucket: &mut [CodePointEntry]) {
    bucket.sort_by(|a, b| b.cp.len().cmp(&a.cp.len()).then_with(|| b.cp.cmp(&a.cp)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(cp: &[u32]) -> CodePointEntry {
        CodePointEntry::new(cp.to_vec())
    }

    fn variant(cp: &[u32], ty: &str) -> Variant {
        Variant::new(cp.to_vec(), Some(ty))
    }

    #[test]
    fn duplicate_entry_rejected() {
        let mut rep = Repertoire::new();
        rep.add_entry(entry(&[0x61])).unwrap();
        assert_eq!(
            rep.add_entry(entry(&[0x61])),
            Err(LgrError::AlreadyExists(vec![0x61]))
        );
        assert!(rep.add_entry(entry(&[0x61, 0x62])).is_ok());
        assert_eq!(rep.len(), 2);
    }

    #[test]
    fn prefix_lookup_is_longest_first() {
        let mut rep = Repertoire::new();
        rep.add_entry(entry(&[0x61])).unwrap();
        rep.add_entry(entry(&[0x61, 0x62, 0x63])).unwrap();
        rep.add_entry(entry(&[0x61, 0x62])).unwrap();
        let lens: Vec<usize> = rep
            .entries_with_prefix(0x61, false)
            .iter()
            .map(|e| e.cp.len())
            .collect();
        assert_eq!(lens, vec![3, 2, 1]);
        assert!(rep.entries_with_prefix(0x61, true).is_empty());
        assert!(rep.entries_with_prefix(0x7A, false).is_empty());
    }

    #[test]
    fn ranges_reject_reversed_bounds_and_overlaps() {
        let mut rep = Repertoire::new();
        assert!(matches!(
            rep.add_range(RangeDecl::new(10, 5)),
            Err(LgrError::InvalidParameter(_))
        ));
        assert!(rep.is_empty());
        rep.add_range(RangeDecl::new(0x41, 0x45)).unwrap();
        assert_eq!(
            rep.add_range(RangeDecl::new(0x45, 0x50)),
            Err(LgrError::RangeOverlap {
                first: 0x45,
                last: 0x50
            })
        );
        assert_eq!(
            rep.add_range(RangeDecl::new(0x30, 0x41)),
            Err(LgrError::RangeOverlap {
                first: 0x30,
                last: 0x41
            })
        );
        rep.add_entry(entry(&[0x61])).unwrap();
        assert_eq!(
            rep.add_range(RangeDecl::new(0x60, 0x62)),
            Err(LgrError::AlreadyExists(vec![0x61]))
        );
        assert_eq!(rep.len(), 6);
    }

    #[test]
    fn range_members_cannot_be_removed_alone() {
        let mut rep = Repertoire::new();
        rep.add_range(RangeDecl::new(0x41, 0x43)).unwrap();
        assert!(matches!(
            rep.delete_entry(&[0x42]),
            Err(LgrError::RangeMember { .. })
        ));
        assert!(rep.delete_range(0x41, 0x42).is_err());
        rep.delete_range(0x41, 0x43).unwrap();
        assert!(rep.is_empty());
        assert!(rep.ranges().is_empty());
    }

    #[test]
    fn expand_range_keeps_attributes() {
        let mut rep = Repertoire::new();
        let mut range = RangeDecl::new(0x41, 0x45);
        range.comment = Some("capitals".into());
        range.tags = vec!["upper".into()];
        range.references = vec!["0".into()];
        range.context = Context::When("r1".into());
        rep.add_range(range).unwrap();
        rep.expand_range(0x41, 0x45).unwrap();
        assert!(rep.ranges().is_empty());
        let members: Vec<_> = rep.entries().collect();
        assert_eq!(members.len(), 5);
        for e in members {
            assert_eq!(e.range, None);
            assert_eq!(e.comment.as_deref(), Some("capitals"));
            assert_eq!(e.tags, vec!["upper".to_string()]);
            assert_eq!(e.references, vec!["0".to_string()]);
            assert_eq!(e.context, Context::When("r1".into()));
        }
    }

    #[test]
    fn iteration_reports_ranges_once() {
        let mut rep = Repertoire::new();
        rep.add_entry(entry(&[0x30])).unwrap();
        rep.add_range(RangeDecl::new(0x41, 0x43)).unwrap();
        rep.add_entry(entry(&[0x61, 0x62])).unwrap();
        rep.add_entry(entry(&[0x61])).unwrap();
        let items: Vec<String> = rep
            .iter()
            .map(|item| match item {
                RepertoireItem::Entry(e) => format!("{:?}", e.cp),
                RepertoireItem::Range(r) => format!("{}-{}", r.first, r.last),
            })
            .collect();
        assert_eq!(items, vec!["[48]", "65-67", "[97]", "[97, 98]"]);
    }

    #[test]
    fn variants_on_ranges_are_refused() {
        let mut rep = Repertoire::new();
        rep.add_range(RangeDecl::new(0x41, 0x43)).unwrap();
        assert!(matches!(
            rep.add_variant(&[0x41], variant(&[0x42], "blocked")),
            Err(LgrError::RangeMember { .. })
        ));
    }

    #[test]
    fn variants_are_keyed_by_target_and_context() {
        let mut rep = Repertoire::new();
        rep.add_entry(entry(&[0x61])).unwrap();
        rep.add_variant(&[0x61], variant(&[0x62], "blocked")).unwrap();
        assert!(matches!(
            rep.add_variant(&[0x61], variant(&[0x62], "allocatable")),
            Err(LgrError::VariantAlreadyExists { .. })
        ));
        let mut conditional = variant(&[0x62], "allocatable");
        conditional.context = Context::When("r".into());
        rep.add_variant(&[0x61], conditional).unwrap();
        assert_eq!(rep.get_variants(&[0x61]).unwrap().len(), 2);
        rep.delete_variant(&[0x61], &[0x62], &Context::Always).unwrap();
        assert_eq!(rep.get_variants(&[0x61]).unwrap().len(), 1);
        assert!(rep.delete_variant(&[0x61], &[0x62], &Context::Always).is_err());
        assert!(matches!(rep.get_variants(&[0x7A]), Err(LgrError::NotFound(_))));
    }

    #[test]
    fn variant_sets_follow_edges() {
        let mut rep = Repertoire::new();
        for cp in [0x61, 0x62, 0x63, 0x64] {
            rep.add_entry(entry(&[cp])).unwrap();
        }
        rep.add_variant(&[0x62], variant(&[0x61], "blocked")).unwrap();
        rep.add_variant(&[0x61], variant(&[0x63], "blocked")).unwrap();
        // Missing targets are ignored.
        rep.add_variant(&[0x64], variant(&[0x7A], "blocked")).unwrap();
        let sets = rep.variant_sets();
        assert_eq!(sets.len(), 1);
        let set = &sets[&vec![0x61]];
        assert_eq!(set.len(), 3);
        assert!(set.contains(&vec![0x62]));
    }

    #[test]
    fn tag_index_collects_members() {
        let mut rep = Repertoire::new();
        let mut range = RangeDecl::new(0x61, 0x63);
        range.tags = vec!["letter".into()];
        rep.add_range(range).unwrap();
        let index = rep.tag_index();
        assert_eq!(index["letter"].len(), 3);
    }
}
