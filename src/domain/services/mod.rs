mod country_names;
mod region_table;
mod score_aggregator;
mod source_fusion;

pub use country_names::{CountryNames, CountryNamesError};
pub use region_table::{RegionTable, RegionTableError};
pub use score_aggregator::ScoreAggregator;
pub use source_fusion::{Evidence, SourceFusion, SourceOutcome, Strategy, StrategyOutcome};
