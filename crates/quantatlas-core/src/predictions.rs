//! Per-age prediction series as parsed from the exported asset files.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Predicted values for one region at one age.
///
/// Exported files carry either a single scalar for the whole structure
/// (e.g. volume) or one value per mesh vertex.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PredictionValues {
    /// One value per mesh vertex, in vertex order.
    PerVertex(Vec<f64>),
    /// A single scalar covering the whole structure.
    Scalar(f64),
}

impl PredictionValues {
    /// Mean of the values; `None` for an empty per-vertex sequence.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::PerVertex(values) => {
                if values.is_empty() {
                    None
                } else {
                    Some(values.iter().sum::<f64>() / values.len() as f64)
                }
            }
        }
    }

    /// Value for the given vertex index.
    ///
    /// Scalar series yield the same value for every vertex; per-vertex
    /// series shorter than the mesh read missing entries as `0.0`.
    #[must_use]
    pub fn value_at(&self, vertex: usize) -> f64 {
        match self {
            Self::Scalar(v) => *v,
            Self::PerVertex(values) => values.get(vertex).copied().unwrap_or(0.0),
        }
    }

    /// Iterate over all scalar values in the series entry.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        match self {
            Self::Scalar(v) => Values::Scalar(std::iter::once(*v)),
            Self::PerVertex(values) => Values::PerVertex(values.iter().copied()),
        }
    }
}

enum Values<A, B> {
    Scalar(A),
    PerVertex(B),
}

impl<A: Iterator<Item = f64>, B: Iterator<Item = f64>> Iterator for Values<A, B> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        match self {
            Self::Scalar(it) => it.next(),
            Self::PerVertex(it) => it.next(),
        }
    }
}

/// Mapping from age in years to predicted values for one region and one
/// prediction type.
///
/// Asset documents key the map with stringified integer ages (19..=80);
/// the ordered map makes the missing-age fallback deterministic.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct PredictionSeries(BTreeMap<u8, PredictionValues>);

impl PredictionSeries {
    /// Build a series from explicit age/value pairs.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = (u8, PredictionValues)>) -> Self {
        Self(entries.into_iter().collect())
    }

    /// Values for the given age, falling back to the lowest available age
    /// when the exact key is absent. `None` only for an empty series.
    #[must_use]
    pub fn resolve(&self, age: u8) -> Option<&PredictionValues> {
        self.0.get(&age).or_else(|| self.0.values().next())
    }

    /// Values for exactly the given age.
    #[must_use]
    pub fn get(&self, age: u8) -> Option<&PredictionValues> {
        self.0.get(&age)
    }

    /// Ages present in the series, ascending.
    pub fn ages(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.keys().copied()
    }

    /// Whether the series holds no ages at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
