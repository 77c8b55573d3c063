//! `tafel-insights` - event clustering and per-embed analytics sessions.
//!
//! Teacher dashboards observe one or more embeds: events are fetched and
//! subscribed to over the realtime connection, aggregated into
//! count-by-error-type and count-by-time-bucket series, and exposed as
//! chart-ready data.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Time-bucket clustering of events.
pub mod date_clusters;
/// Per-embed analytics session.
pub mod embed;
/// Count-by-error-type aggregation.
pub mod error_clusters;
/// Aggregation over a set of observed embeds.
pub mod multi;
/// Chart-ready series types.
pub mod series;
/// Student submissions keyed by user.
pub mod submissions;
/// Student test results keyed by user.
pub mod test_results;

pub use date_clusters::{ClusterResolution, DateClass, DateClusterMaps};
pub use embed::{EmbedAnalytics, SubscriptionState};
pub use error_clusters::ErrorClusters;
pub use multi::MultiEmbedAnalytics;
pub use series::{Series, SeriesPoint};
pub use submissions::{Submission, Submissions};
pub use test_results::{TestResult, TestResults};
