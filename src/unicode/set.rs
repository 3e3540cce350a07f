//! Code point sets as sorted, non-overlapping inclusive ranges.

use std::fmt;

use crate::cp::{MAX_CODE_POINT, SURROGATE_FIRST, SURROGATE_LAST};

/// A set of code points stored as an inversion list of inclusive ranges.
///
/// Ranges are kept sorted, disjoint and non-adjacent so two sets with the
/// same members compare equal.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct PointSet {
    ranges: Vec<(u32, u32)>,
}

impl PointSet {
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Every code point `0..=0x10FFFF`.
    pub fn all() -> Self {
        Self {
            ranges: vec![(0, MAX_CODE_POINT)],
        }
    }

    pub fn from_range(first: u32, last: u32) -> Self {
        let mut set = Self::new();
        set.insert_range(first, last);
        set
    }

    pub fn from_ranges<I: IntoIterator<Item = (u32, u32)>>(ranges: I) -> Self {
        let mut set = Self::new();
        for (first, last) in ranges {
            set.insert_range(first, last);
        }
        set
    }

    pub fn insert(&mut self, cp: u32) {
        self.insert_range(cp, cp);
    }

    /// Insert `first..=last`, merging with overlapping or adjacent ranges.
    pub fn insert_range(&mut self, first: u32, last: u32) {
        let (first, last) = if first <= last {
            (first, last)
        } else {
            (last, first)
        };
        let last = last.min(MAX_CODE_POINT);
        if first > last {
            return;
        }
        // First range that could touch the new one.
        let start = self
            .ranges
            .partition_point(|&(_, hi)| hi.saturating_add(1) < first);
        let mut lo = first;
        let mut hi = last;
        let mut end = start;
        while end < self.ranges.len() && self.ranges[end].0 <= hi.saturating_add(1) {
            lo = lo.min(self.ranges[end].0);
            hi = hi.max(self.ranges[end].1);
            end += 1;
        }
        self.ranges.splice(start..end, std::iter::once((lo, hi)));
    }

    pub fn contains(&self, cp: u32) -> bool {
        let idx = self.ranges.partition_point(|&(_, hi)| hi < cp);
        self.ranges
            .get(idx)
            .is_some_and(|&(lo, hi)| lo <= cp && cp <= hi)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of code points in the set.
    pub fn len(&self) -> usize {
        self.ranges
            .iter()
            .map(|&(lo, hi)| (hi - lo) as usize + 1)
            .sum()
    }

    pub fn ranges(&self) -> &[(u32, u32)] {
        &self.ranges
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.ranges.iter().flat_map(|&(lo, hi)| lo..=hi)
    }

    pub fn union(&self, other: &PointSet) -> PointSet {
        let mut out = self.clone();
        for &(lo, hi) in &other.ranges {
            out.insert_range(lo, hi);
        }
        out
    }

    pub fn complement(&self) -> PointSet {
        let mut ranges = Vec::with_capacity(self.ranges.len() + 1);
        let mut next = 0u32;
        for &(lo, hi) in &self.ranges {
            if lo > next {
                ranges.push((next, lo - 1));
            }
            next = hi.saturating_add(1);
        }
        if next <= MAX_CODE_POINT {
            ranges.push((next, MAX_CODE_POINT));
        }
        PointSet { ranges }
    }

    pub fn intersection(&self, other: &PointSet) -> PointSet {
        let mut ranges = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let (a_lo, a_hi) = self.ranges[i];
            let (b_lo, b_hi) = other.ranges[j];
            let lo = a_lo.max(b_lo);
            let hi = a_hi.min(b_hi);
            if lo <= hi {
                ranges.push((lo, hi));
            }
            if a_hi < b_hi {
                i += 1;
            } else {
                j += 1;
            }
        }
        PointSet { ranges }
    }

    pub fn difference(&self, other: &PointSet) -> PointSet {
        self.intersection(&other.complement())
    }

    pub fn symmetric_difference(&self, other: &PointSet) -> PointSet {
        self.difference(other).union(&other.difference(self))
    }

    /// Regex character class text, `(?!)` for the empty set.
    ///
    /// Surrogates are left out since the pattern engine only sees scalars.
    pub fn to_class_pattern(&self) -> String {
        let scalars = self.difference(&PointSet::from_range(SURROGATE_FIRST, SURROGATE_LAST));
        if scalars.ranges.is_empty() {
            return "(?!)".to_string();
        }
        let mut out = String::from("[");
        for &(lo, hi) in &scalars.ranges {
            if lo == hi {
                out.push_str(&format!("\\x{{{lo:X}}}"));
            } else {
                out.push_str(&format!("\\x{{{lo:X}}}-\\x{{{hi:X}}}"));
            }
        }
        out.push(']');
        out
    }
}

impl FromIterator<u32> for PointSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut set = PointSet::new();
        for cp in iter {
            set.insert(cp);
        }
        set
    }
}

impl fmt::Debug for PointSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .ranges
            .iter()
            .map(|&(lo, hi)| {
                if lo == hi {
                    format!("{lo:04X}")
                } else {
                    format!("{lo:04X}-{hi:04X}")
                }
            })
            .collect();
        write!(f, "PointSet[{}]", parts.join(" "))
    }
}
