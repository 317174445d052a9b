//! Score Aggregator Service
//!
//! Pure domain logic turning the records of one signal kind into a single
//! weighted region vote.

use crate::domain::entities::{RegionVote, SignalRecord};
use crate::domain::value_objects::{CountryCode, SignalKind};
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, HashSet};

/// Running totals for one candidate region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct GroupScore {
    /// Sum of member sample counts
    total: u64,
    /// Largest single member sample count
    peak: u64,
}

/// Score aggregator for region votes.
///
/// Records are grouped by region and each group is weighted by the sum of
/// its members' sample counts. No time decay is applied. Ties are broken
/// by the group holding the single strongest record, then by the smallest
/// region code.
pub struct ScoreAggregator;

impl ScoreAggregator {
    /// Aggregate the records of one signal kind into at most one vote.
    ///
    /// Returns `None` when no record carries a region.
    pub fn vote(kind: SignalKind, records: &[SignalRecord]) -> Option<RegionVote> {
        let groups = Self::group_scores(records);

        let (region, score) = groups
            .into_iter()
            .max_by(|(a_region, a), (b_region, b)| Self::rank(a_region, a, b_region, b))?;

        Some(RegionVote {
            region,
            weight: score.total as f64,
            kind,
        })
    }

    /// Drop every record whose key was already seen, keeping the first.
    pub fn coalesce(records: &[SignalRecord]) -> Vec<&SignalRecord> {
        let mut seen = HashSet::with_capacity(records.len());
        records.iter().filter(|r| seen.insert(r.key)).collect()
    }

    /// Per-region totals, keyed in region order.
    fn group_scores(records: &[SignalRecord]) -> BTreeMap<CountryCode, GroupScore> {
        let mut groups: BTreeMap<CountryCode, GroupScore> = BTreeMap::new();

        for record in Self::coalesce(records) {
            let Some(region) = &record.region else {
                continue;
            };
            let group = groups.entry(region.clone()).or_default();
            group.total = group.total.saturating_add(record.samples);
            group.peak = group.peak.max(record.samples);
        }

        groups
    }

    /// Greater means stronger.
    fn rank(
        a_region: &CountryCode,
        a: &GroupScore,
        b_region: &CountryCode,
        b: &GroupScore,
    ) -> Ordering {
        (a.total, a.peak, Reverse(a_region)).cmp(&(b.total, b.peak, Reverse(b_region)))
    }
}
