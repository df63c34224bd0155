/// Aggregation engine: pure functions from a row subset to summary records.
///
/// Nothing here keeps state between calls; every filter change recomputes
/// from scratch. Missing answers never enter a numerator or denominator,
/// and aggregates over nothing come back as `None` rather than `0` or NaN.

pub mod aggregate;
pub mod kpi;
pub mod metrics;
pub mod text;
