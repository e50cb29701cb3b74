//! Global color scale computation.

use quantatlas_core::{ColorScale, LoadedEntry};

/// Derive the shared color scale for the loaded entries at one age.
///
/// Pools every scalar of every entry's series for the active prediction
/// type, resolving the selected age with the series' deterministic
/// lowest-age fallback, and returns the pool minimum and maximum. Entries
/// without a series for the active type contribute nothing; an empty pool
/// yields an unresolved scale.
#[must_use]
pub fn compute_color_scale<'a>(
    entries: impl IntoIterator<Item = &'a LoadedEntry>,
    prediction_type: &str,
    age: u8,
) -> ColorScale {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut seen = false;

    for entry in entries {
        let Some(series) = entry.series(prediction_type) else {
            continue;
        };
        let Some(values) = series.resolve(age) else {
            continue;
        };
        for v in values.iter() {
            min = min.min(v);
            max = max.max(v);
            seen = true;
        }
    }

    if seen {
        ColorScale::new(min, max)
    } else {
        ColorScale::unresolved()
    }
}
