//! Source Fusion Service
//!
//! Pure domain logic combining the evidence of every signal source into a
//! single region. Sources are consulted in strict trust order:
//! bluetooth, wifi, cellular, then IP geolocation.

use crate::domain::entities::{RegionVote, ResolutionResult, SignalRecord};
use crate::domain::services::region_table::RegionTable;
use crate::domain::services::score_aggregator::ScoreAggregator;
use crate::domain::value_objects::{CountryCode, Fallback, SignalKind};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Result of one sub-lookup.
///
/// `Unavailable` marks a source that failed or timed out. Consumers read it
/// exactly like an empty result.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome<T> {
    Available(T),
    Unavailable,
}

impl<T: Default> Default for SourceOutcome<T> {
    fn default() -> Self {
        Self::Available(T::default())
    }
}

impl SourceOutcome<Vec<SignalRecord>> {
    pub fn records(&self) -> &[SignalRecord] {
        match self {
            Self::Available(records) => records,
            Self::Unavailable => &[],
        }
    }
}

impl SourceOutcome<Option<CountryCode>> {
    pub fn region(&self) -> Option<&CountryCode> {
        match self {
            Self::Available(region) => region.as_ref(),
            Self::Unavailable => None,
        }
    }
}

/// Everything gathered for one resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evidence {
    pub bluetooth: SourceOutcome<Vec<SignalRecord>>,
    pub wifi: SourceOutcome<Vec<SignalRecord>>,
    pub cellular: SourceOutcome<Vec<SignalRecord>>,
    pub ip: SourceOutcome<Option<CountryCode>>,
}

impl Evidence {
    pub fn records(&self, kind: SignalKind) -> &[SignalRecord] {
        match kind {
            SignalKind::Bluetooth => self.bluetooth.records(),
            SignalKind::Wifi => self.wifi.records(),
            SignalKind::Cellular => self.cellular.records(),
        }
    }

    pub fn ip_region(&self) -> Option<&CountryCode> {
        self.ip.region()
    }
}

/// What a strategy concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome {
    Resolved(ResolutionResult),
    /// Nothing decisive here; ask the next strategy.
    Defer,
}

/// One link of the priority chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Bluetooth, then wifi. Trusted outright.
    ShortRange,
    /// Cell towers, with IP used only to settle shared country codes.
    Cellular,
    /// IP geolocation alone.
    Ip,
}

impl Strategy {
    /// Evaluation order, most trusted first.
    pub const CHAIN: [Strategy; 3] = [Self::ShortRange, Self::Cellular, Self::Ip];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortRange => "short_range",
            Self::Cellular => "cellular",
            Self::Ip => "ip",
        }
    }

    pub fn evaluate(&self, evidence: &Evidence, table: &RegionTable) -> StrategyOutcome {
        match self {
            Self::ShortRange => Self::short_range(evidence),
            Self::Cellular => Self::cellular(evidence, table),
            Self::Ip => match evidence.ip_region() {
                Some(region) => StrategyOutcome::Resolved(ResolutionResult::found(
                    region.clone(),
                    Fallback::Ipf,
                )),
                None => StrategyOutcome::Defer,
            },
        }
    }

    fn short_range(evidence: &Evidence) -> StrategyOutcome {
        SignalKind::ALL
            .into_iter()
            .filter(SignalKind::is_short_range)
            .find_map(|kind| ScoreAggregator::vote(kind, evidence.records(kind)))
            .map(|vote| ResolutionResult::found(vote.region, Fallback::None))
            .map(StrategyOutcome::Resolved)
            .unwrap_or(StrategyOutcome::Defer)
    }

    fn cellular(evidence: &Evidence, table: &RegionTable) -> StrategyOutcome {
        let records = evidence.records(SignalKind::Cellular);
        let Some(vote) = ScoreAggregator::vote(SignalKind::Cellular, records) else {
            return StrategyOutcome::Defer;
        };

        let result = match Self::dominant_mcc(records, &vote) {
            Some(mcc) => Self::settle_cell_vote(records, vote, mcc, evidence.ip_region(), table),
            None => ResolutionResult::found(vote.region, Fallback::None),
        };
        StrategyOutcome::Resolved(result)
    }

    /// Decide between the cell vote and the IP region for the dominant code.
    fn settle_cell_vote(
        records: &[SignalRecord],
        vote: RegionVote,
        dominant: u16,
        ip_region: Option<&CountryCode>,
        table: &RegionTable,
    ) -> ResolutionResult {
        let observed = ScoreAggregator::coalesce(records)
            .into_iter()
            .filter(|r| r.region.is_some())
            .filter_map(|r| r.key.mcc());
        if !table.is_ambiguous(dominant) || table.common_country(observed).is_some() {
            return ResolutionResult::found(vote.region, Fallback::None);
        }

        match ip_region {
            Some(ip) if table.candidates(dominant).contains(ip) => {
                ResolutionResult::found(ip.clone(), Fallback::Ipf)
            }
            _ => ResolutionResult::found(vote.region, Fallback::None),
        }
    }

    /// Mobile country code carrying the most samples for the winning region.
    fn dominant_mcc(records: &[SignalRecord], vote: &RegionVote) -> Option<u16> {
        let mut totals: BTreeMap<u16, u64> = BTreeMap::new();
        for record in ScoreAggregator::coalesce(records) {
            if record.region.as_ref() != Some(&vote.region) {
                continue;
            }
            if let Some(mcc) = record.key.mcc() {
                let total = totals.entry(mcc).or_default();
                *total = total.saturating_add(record.samples);
            }
        }

        totals
            .into_iter()
            .max_by_key(|(mcc, total)| (*total, Reverse(*mcc)))
            .map(|(mcc, _)| mcc)
    }
}

/// Source fusion service.
///
/// Runs the strategy chain over the gathered evidence. Holds only the
/// shared, read-only region table, so one instance serves any number of
/// concurrent resolutions.
#[derive(Debug, Clone)]
pub struct SourceFusion {
    table: Arc<RegionTable>,
}

impl SourceFusion {
    pub fn new(table: Arc<RegionTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RegionTable {
        &self.table
    }

    /// Resolve the region for the given evidence.
    ///
    /// The first strategy that resolves wins; when every one defers the
    /// region is not found.
    pub fn fuse(&self, evidence: &Evidence) -> ResolutionResult {
        for strategy in Strategy::CHAIN {
            if let StrategyOutcome::Resolved(result) = strategy.evaluate(evidence, &self.table) {
                tracing::debug!(
                    "strategy {} resolved region={:?} fallback={}",
                    strategy.as_str(),
                    result.region,
                    result.fallback
                );
                return result;
            }
        }
        ResolutionResult::not_found()
    }
}
