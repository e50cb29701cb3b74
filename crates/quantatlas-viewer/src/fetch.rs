//! Batched progressive asset loading.
//!
//! A load cycle requests one `(region, side)` pair per displayed mesh.
//! Pairs are dispatched in fixed-size batches: batches run strictly in
//! sequence to bound concurrent requests, while the pairs inside a batch
//! fetch concurrently. Each completed batch yields a [`BatchResult`] that
//! the viewer controller folds into its entry map, so meshes appear
//! progressively instead of all at once.
//!
//! Mesh geometry is cached across load cycles keyed by pair: switching the
//! prediction type re-fetches only the prediction series.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use quantatlas_core::catalog::{AtlasCatalog, Region, Side};
use quantatlas_core::{AtlasError, EntryKey, MeshGeometry, PredictionSeries};

use crate::source::AssetSource;

/// Number of pairs dispatched per batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// One mesh to load: a region on one hemisphere.
#[derive(Clone, Debug)]
pub struct FetchPair {
    /// Entry key `{region_id}-{side}`.
    pub key: EntryKey,
    /// Region to load.
    pub region: &'static Region,
    /// Hemisphere to load.
    pub side: Side,
}

/// Resolve the pairs to fetch for a region selection.
///
/// Preserves catalog order; unknown identifiers are skipped. Bilateral
/// regions contribute both hemispheres only while bilateral display is
/// enabled.
#[must_use]
pub fn resolve_fetch_list(
    catalog: &AtlasCatalog,
    selected_ids: &[String],
    bilateral_enabled: bool,
) -> Vec<FetchPair> {
    catalog
        .regions()
        .all()
        .iter()
        .filter(|region| selected_ids.iter().any(|id| id == region.id))
        .flat_map(|region| {
            region.sides(bilateral_enabled).iter().map(move |&side| FetchPair {
                key: EntryKey::new(region.id, side),
                region,
                side,
            })
        })
        .collect()
}

/// Successfully loaded assets for one pair.
#[derive(Clone, Debug)]
pub struct PairPayload {
    /// Entry key of the pair.
    pub key: EntryKey,
    /// Region loaded.
    pub region: &'static Region,
    /// Hemisphere loaded.
    pub side: Side,
    /// Mesh geometry (cached or freshly fetched).
    pub mesh: Arc<MeshGeometry>,
    /// Prediction series for the requested type.
    pub series: PredictionSeries,
}

/// Merged outcome of one completed batch.
#[derive(Clone, Debug)]
pub struct BatchResult {
    /// Generation stamp of the load cycle this batch belongs to.
    pub generation: u64,
    /// Prediction type the cycle fetched.
    pub prediction_type: String,
    /// Pairs that loaded in this batch.
    pub loaded: Vec<PairPayload>,
    /// Pairs that failed in this batch.
    pub failed: usize,
    /// Pairs loaded so far across the whole cycle.
    pub completed: usize,
    /// Total pairs requested by the cycle.
    pub total: usize,
    /// Completion percentage, rounded to the nearest integer.
    pub progress: u8,
}

/// Fetches assets in batches and caches mesh geometry across cycles.
pub struct AssetFetcher {
    source: Arc<dyn AssetSource>,
    catalog: Arc<AtlasCatalog>,
    geometry_cache: HashMap<EntryKey, Arc<MeshGeometry>>,
    batch_size: usize,
}

impl AssetFetcher {
    /// Fetcher over the given source and catalog.
    #[must_use]
    pub fn new(source: Arc<dyn AssetSource>, catalog: Arc<AtlasCatalog>) -> Self {
        Self {
            source,
            catalog,
            geometry_cache: HashMap::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Override the batch size (tests only need small batches).
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Number of cached mesh geometries.
    #[must_use]
    pub fn cached_meshes(&self) -> usize {
        self.geometry_cache.len()
    }

    /// Drop cached geometry for pairs outside the given set.
    ///
    /// Called on region-selection changes so deselected meshes do not
    /// accumulate for the lifetime of the process.
    pub fn retain_cache(&mut self, keys: &[EntryKey]) {
        self.geometry_cache.retain(|key, _| keys.contains(key));
    }

    /// Start a load cycle over the given pairs.
    ///
    /// The session borrows the fetcher for its whole cycle; dropping it
    /// abandons the remaining batches (results of in-flight requests are
    /// discarded on arrival, matching cooperative cancellation).
    pub fn begin(
        &mut self,
        pairs: Vec<FetchPair>,
        prediction_type: &str,
        generation: u64,
    ) -> LoadSession<'_> {
        debug!(
            pairs = pairs.len(),
            prediction_type, generation, "starting load cycle"
        );
        LoadSession {
            fetcher: self,
            pairs,
            prediction_type: prediction_type.to_string(),
            generation,
            cursor: 0,
            completed: 0,
        }
    }
}

/// An in-flight load cycle; yields batch results strictly in sequence.
pub struct LoadSession<'a> {
    fetcher: &'a mut AssetFetcher,
    pairs: Vec<FetchPair>,
    prediction_type: String,
    generation: u64,
    cursor: usize,
    completed: usize,
}

impl LoadSession<'_> {
    /// Generation stamp this cycle was started with.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Total pairs requested by this cycle.
    #[must_use]
    pub fn total(&self) -> usize {
        self.pairs.len()
    }

    /// Dispatch the next batch and wait for all of its pairs.
    ///
    /// Returns `None` once every pair has been dispatched. Pairs fail
    /// independently: a failed fetch or a malformed document is logged,
    /// counted, and excluded from the batch payload without affecting
    /// the rest of the batch.
    pub async fn next_batch(&mut self) -> Option<BatchResult> {
        if self.cursor >= self.pairs.len() {
            return None;
        }
        let end = (self.cursor + self.fetcher.batch_size).min(self.pairs.len());
        let batch: Vec<FetchPair> = self.pairs[self.cursor..end].to_vec();
        self.cursor = end;

        let requests: Vec<_> = batch
            .into_iter()
            .map(|pair| {
                let source = Arc::clone(&self.fetcher.source);
                let cached = self.fetcher.geometry_cache.get(&pair.key).cloned();
                let mesh_path = self.fetcher.catalog.mesh_path(pair.region, pair.side);
                let pred_path = self
                    .fetcher
                    .catalog
                    .prediction_path(pair.region, &self.prediction_type);
                async move {
                    let outcome = fetch_pair(&*source, cached, &mesh_path, &pred_path).await;
                    (pair, outcome)
                }
            })
            .collect();

        let mut loaded = Vec::new();
        let mut failed = 0usize;
        for (pair, outcome) in join_all(requests).await {
            match outcome {
                Ok((mesh, newly_fetched, series)) => {
                    if newly_fetched {
                        self.fetcher
                            .geometry_cache
                            .insert(pair.key.clone(), Arc::clone(&mesh));
                    }
                    loaded.push(PairPayload {
                        key: pair.key,
                        region: pair.region,
                        side: pair.side,
                        mesh,
                        series,
                    });
                }
                Err(err) => {
                    warn!(pair = %pair.key, error = %err, "pair failed to load");
                    failed += 1;
                }
            }
        }

        self.completed += loaded.len();
        let progress = (self.completed as f64 / self.pairs.len() as f64 * 100.0).round() as u8;

        Some(BatchResult {
            generation: self.generation,
            prediction_type: self.prediction_type.clone(),
            loaded,
            failed,
            completed: self.completed,
            total: self.pairs.len(),
            progress,
        })
    }
}

/// Fetch one pair, reusing cached geometry when available.
async fn fetch_pair(
    source: &dyn AssetSource,
    cached: Option<Arc<MeshGeometry>>,
    mesh_path: &str,
    pred_path: &str,
) -> Result<(Arc<MeshGeometry>, bool, PredictionSeries), AtlasError> {
    match cached {
        Some(mesh) => {
            let series = source.fetch_predictions(pred_path).await?;
            Ok((mesh, false, series))
        }
        None => {
            let (mesh, series) = tokio::try_join!(
                source.fetch_mesh(mesh_path),
                source.fetch_predictions(pred_path)
            )?;
            mesh.validate(mesh_path)?;
            Ok((Arc::new(mesh), true, series))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use quantatlas_core::PredictionValues;

    /// Scripted source: serves a fixed tetrahedron mesh and a two-age
    /// series, counts every request, and fails listed paths.
    pub(crate) struct MockSource {
        pub mesh_calls: Mutex<Vec<String>>,
        pub pred_calls: Mutex<Vec<String>>,
        pub failing: HashSet<String>,
    }

    impl MockSource {
        pub fn new() -> Self {
            Self {
                mesh_calls: Mutex::new(Vec::new()),
                pred_calls: Mutex::new(Vec::new()),
                failing: HashSet::new(),
            }
        }

        pub fn failing(paths: &[&str]) -> Self {
            let mut source = Self::new();
            source.failing = paths.iter().map(|p| (*p).to_string()).collect();
            source
        }

        pub fn mesh_fetches(&self, path: &str) -> usize {
            self.mesh_calls
                .lock()
                .unwrap()
                .iter()
                .filter(|p| *p == path)
                .count()
        }
    }

    #[async_trait]
    impl AssetSource for MockSource {
        async fn fetch_mesh(&self, path: &str) -> Result<MeshGeometry, AtlasError> {
            self.mesh_calls.lock().unwrap().push(path.to_string());
            if self.failing.contains(path) {
                return Err(AtlasError::AssetNotFound {
                    path: path.to_string(),
                    status: 404,
                });
            }
            Ok(MeshGeometry {
                vertices: vec![
                    [0.0, 0.0, 0.0],
                    [1.0, 0.0, 0.0],
                    [0.0, 1.0, 0.0],
                    [0.0, 0.0, 1.0],
                ],
                faces: vec![[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]],
            })
        }

        async fn fetch_predictions(&self, path: &str) -> Result<PredictionSeries, AtlasError> {
            self.pred_calls.lock().unwrap().push(path.to_string());
            if self.failing.contains(path) {
                return Err(AtlasError::AssetNotFound {
                    path: path.to_string(),
                    status: 404,
                });
            }
            Ok(PredictionSeries::from_entries([
                (30, PredictionValues::PerVertex(vec![1.0, 2.0, 3.0, 4.0])),
                (40, PredictionValues::PerVertex(vec![2.0, 4.0, 6.0, 8.0])),
            ]))
        }
    }

    fn catalog() -> Arc<AtlasCatalog> {
        Arc::new(AtlasCatalog::standard())
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_fetch_list_bilateral_pair() {
        let catalog = AtlasCatalog::standard();
        let pairs = resolve_fetch_list(&catalog, &ids(&["STN"]), true);
        let keys: Vec<_> = pairs.iter().map(|p| p.key.to_string()).collect();
        assert_eq!(keys, vec!["STN-L", "STN-R"]);
    }

    #[test]
    fn test_fetch_list_single_sided_region() {
        let catalog = AtlasCatalog::standard();
        // Fornix has no left/right split: one pair even with bilateral on.
        let pairs = resolve_fetch_list(&catalog, &ids(&["fx"]), true);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].key.to_string(), "fx-L");
    }

    #[test]
    fn test_fetch_list_ignores_unknown_ids() {
        let catalog = AtlasCatalog::standard();
        let pairs = resolve_fetch_list(&catalog, &ids(&["STN", "NOPE"]), false);
        assert_eq!(pairs.len(), 1);
    }

    #[tokio::test]
    async fn test_twelve_pairs_two_rounds() {
        let catalog = catalog();
        // 6 bilateral regions -> 12 pairs with bilateral display on.
        let selected = ids(&["AMG", "GPe", "GPi", "RN", "SN", "STN"]);
        let pairs = resolve_fetch_list(&catalog, &selected, true);
        assert_eq!(pairs.len(), 12);

        let source = Arc::new(MockSource::new());
        let mut fetcher = AssetFetcher::new(source, catalog);
        let mut session = fetcher.begin(pairs, "iron_median", 1);

        let first = session.next_batch().await.unwrap();
        assert_eq!(first.loaded.len(), 10);
        // round(10 / 12 * 100) = 83, not reset between rounds.
        assert_eq!(first.progress, 83);

        let second = session.next_batch().await.unwrap();
        assert_eq!(second.loaded.len(), 2);
        assert_eq!(second.completed, 12);
        assert_eq!(second.progress, 100);

        assert!(session.next_batch().await.is_none());
    }

    #[tokio::test]
    async fn test_geometry_cache_skips_mesh_refetch() {
        let catalog = catalog();
        let source = Arc::new(MockSource::new());
        let mut fetcher = AssetFetcher::new(Arc::clone(&source) as Arc<dyn AssetSource>, Arc::clone(&catalog));

        let pairs = resolve_fetch_list(&catalog, &ids(&["STN"]), true);
        let mut session = fetcher.begin(pairs.clone(), "iron_median", 1);
        while session.next_batch().await.is_some() {}

        // Same selection, new prediction type: only predictions re-fetch.
        let mut session = fetcher.begin(pairs, "qsm_median", 2);
        while session.next_batch().await.is_some() {}

        assert_eq!(source.mesh_fetches("exported_meshes/STN-L_mesh.json"), 1);
        assert_eq!(source.mesh_fetches("exported_meshes/STN-R_mesh.json"), 1);
        assert_eq!(source.pred_calls.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_pair_failure_is_isolated() {
        let catalog = catalog();
        let source = Arc::new(MockSource::failing(&["exported_meshes/STN-R_mesh.json"]));
        let mut fetcher = AssetFetcher::new(source, Arc::clone(&catalog));

        let pairs = resolve_fetch_list(&catalog, &ids(&["STN"]), true);
        let mut session = fetcher.begin(pairs, "iron_median", 1);
        let batch = session.next_batch().await.unwrap();

        assert_eq!(batch.failed, 1);
        assert_eq!(batch.loaded.len(), 1);
        assert_eq!(batch.loaded[0].key.to_string(), "STN-L");
        // Failures never count toward completion.
        assert_eq!(batch.completed, 1);
        assert_eq!(batch.progress, 50);
    }

    #[tokio::test]
    async fn test_failed_pair_not_cached() {
        let catalog = catalog();
        let source = Arc::new(MockSource::failing(&[
            "exported_predictions/STN_iron_median_predictions.json",
        ]));
        let mut fetcher = AssetFetcher::new(source, Arc::clone(&catalog));

        let pairs = resolve_fetch_list(&catalog, &ids(&["STN"]), false);
        let mut session = fetcher.begin(pairs, "iron_median", 1);
        let batch = session.next_batch().await.unwrap();

        assert_eq!(batch.failed, 1);
        // The prediction fetch failed, so the pair's mesh was not committed.
        assert_eq!(fetcher.cached_meshes(), 0);
    }

    #[tokio::test]
    async fn test_retain_cache_drops_deselected() {
        let catalog = catalog();
        let source = Arc::new(MockSource::new());
        let mut fetcher = AssetFetcher::new(source, Arc::clone(&catalog));

        let pairs = resolve_fetch_list(&catalog, &ids(&["STN", "RN"]), false);
        let mut session = fetcher.begin(pairs, "iron_median", 1);
        while session.next_batch().await.is_some() {}
        assert_eq!(fetcher.cached_meshes(), 2);

        fetcher.retain_cache(&[EntryKey::new("STN", Side::L)]);
        assert_eq!(fetcher.cached_meshes(), 1);
    }
}
