//! Chart-ready series types.

use serde::Serialize;
use smol_str::SmolStr;

/// One data point of a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct SeriesPoint<X> {
    pub x: X,
    pub y: u64,
}

/// A named series of `{x, y}` values, consumed by the charting layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct Series<X> {
    pub name: SmolStr,
    pub values: Vec<SeriesPoint<X>>,
}

impl<X> Series<X> {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new(name: impl Into<SmolStr>, values: Vec<SeriesPoint<X>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Sum of all `y` values.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.values.iter().map(|point| point.y).sum()
    }
}
