use super::*;
use crate::progress::ProgressReporter;
use crate::store::Store;
use async_trait::async_trait;
use movie_catalog_models::{EnrichmentItem, FetchOutcome, OutcomeTally};
use movie_catalog_sources::{CatalogError, PosterCatalog};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy)]
enum Behavior {
    Poster,
    NoPoster,
    LookupStatus,
    ImageStatus,
    Timeout,
    Transport,
    Hang,
    Panic,
}

/// Scripted catalog keyed by external id. Unknown ids return a poster.
struct FakeCatalog {
    behaviors: HashMap<String, Behavior>,
    delay: Duration,
    lookups: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeCatalog {
    fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
            delay: Duration::ZERO,
            lookups: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn with(mut self, external_id: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(external_id.to_string(), behavior);
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn behavior(&self, external_id: &str) -> Behavior {
        self.behaviors.get(external_id).copied().unwrap_or(Behavior::Poster)
    }

    /// Hold one in-flight slot for the configured delay.
    async fn occupy(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PosterCatalog for FakeCatalog {
    fn catalog_name(&self) -> &str {
        "fake"
    }

    async fn locate_poster(&self, external_id: &str) -> Result<Option<String>, CatalogError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.occupy().await;

        let url = format!("https://images.test/{}.jpg", external_id);
        match self.behavior(external_id) {
            Behavior::Poster | Behavior::ImageStatus => Ok(Some(url)),
            Behavior::NoPoster => Ok(None),
            Behavior::LookupStatus => Err(CatalogError::Status { url, status: 404 }),
            Behavior::Timeout => Err(CatalogError::Timeout {
                url,
                timeout: Duration::from_secs(5),
            }),
            Behavior::Transport => Err(CatalogError::Transport {
                url,
                message: "connection refused".to_string(),
            }),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            }
            Behavior::Panic => panic!("catalog blew up on {}", external_id),
        }
    }

    async fn download_poster(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        let external_id = url
            .trim_start_matches("https://images.test/")
            .trim_end_matches(".jpg");
        self.occupy().await;
        match self.behavior(external_id) {
            Behavior::ImageStatus => Err(CatalogError::Status {
                url: url.to_string(),
                status: 403,
            }),
            _ => Ok(format!("poster:{}", external_id).into_bytes()),
        }
    }
}

#[derive(Default)]
struct RecordingReporter {
    calls: Mutex<Vec<(usize, usize)>>,
    finished: AtomicUsize,
}

impl ProgressReporter for RecordingReporter {
    fn progress(&self, completed: usize, total: usize, _tally: &OutcomeTally) {
        self.calls.lock().unwrap().push((completed, total));
    }

    fn finish(&self, _report: &DispatchReport) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    store: Store,
    cache: AssetCache,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let cache = AssetCache::new(dir.path().join("movie_posters"));
        cache.ensure_dir().unwrap();
        Self {
            _dir: dir,
            store: Store::open_in_memory().unwrap(),
            cache,
        }
    }

    fn item(&self, movie_id: i64, external_id: &str) -> EnrichmentItem {
        let (movie, _) = self
            .store
            .get_or_create_movie(movie_id, &format!("Movie {}", movie_id))
            .unwrap();
        EnrichmentItem::new(movie, external_id)
    }

    fn fetcher(&self, catalog: Arc<FakeCatalog>) -> PosterFetcher {
        PosterFetcher::new(catalog, self.cache.clone(), self.store.clone())
    }

    fn poster(&self, movie_id: i64) -> Option<String> {
        self.store.get_movie(movie_id).unwrap().poster
    }
}

#[tokio::test]
async fn test_download_writes_file_and_reference() {
    let fx = Fixture::new();
    let catalog = Arc::new(FakeCatalog::new());
    let item = fx.item(1, "862");

    let outcome = fx.fetcher(catalog).fetch(&item).await;
    assert_eq!(outcome, FetchOutcome::Downloaded);
    assert_eq!(std::fs::read(fx.cache.path_for(1)).unwrap(), b"poster:862");
    assert_eq!(fx.poster(1).as_deref(), Some("movie_posters/1.jpg"));
}

#[tokio::test]
async fn test_cached_file_skips_network_and_backfills() {
    let fx = Fixture::new();
    let catalog = Arc::new(FakeCatalog::new());
    let item = fx.item(1, "862");
    fx.cache.write(1, b"already here").await.unwrap();

    let outcome = fx.fetcher(catalog.clone()).fetch(&item).await;
    assert_eq!(outcome, FetchOutcome::Skipped);
    assert_eq!(catalog.lookups.load(Ordering::SeqCst), 0);
    assert_eq!(fx.poster(1).as_deref(), Some("movie_posters/1.jpg"));
    assert_eq!(std::fs::read(fx.cache.path_for(1)).unwrap(), b"already here");
}

#[tokio::test]
async fn test_cached_file_keeps_existing_reference() {
    let fx = Fixture::new();
    let item = fx.item(1, "862");
    fx.store.set_poster(1, "movie_posters/custom.jpg").unwrap();
    fx.cache.write(1, b"cached").await.unwrap();

    let outcome = fx.fetcher(Arc::new(FakeCatalog::new())).fetch(&item).await;
    assert_eq!(outcome, FetchOutcome::Skipped);
    assert_eq!(fx.poster(1).as_deref(), Some("movie_posters/custom.jpg"));
}

#[tokio::test]
async fn test_failures_map_to_outcomes_without_side_effects() {
    let fx = Fixture::new();
    let catalog = Arc::new(
        FakeCatalog::new()
            .with("1", Behavior::NoPoster)
            .with("2", Behavior::LookupStatus)
            .with("3", Behavior::ImageStatus)
            .with("4", Behavior::Timeout)
            .with("5", Behavior::Transport),
    );
    let fetcher = fx.fetcher(catalog);

    let cases = [
        (1, FetchOutcome::Missing),
        (2, FetchOutcome::Missing),
        (3, FetchOutcome::Missing),
        (4, FetchOutcome::Timeout),
        (5, FetchOutcome::Error),
    ];
    for (movie_id, expected) in cases {
        let item = fx.item(movie_id, &movie_id.to_string());
        assert_eq!(fetcher.fetch(&item).await, expected, "movie {}", movie_id);
        assert!(!fx.cache.path_for(movie_id).exists());
        assert_eq!(fx.poster(movie_id), None);
    }
}

#[tokio::test]
async fn test_write_failure_is_error() {
    let fx = Fixture::new();
    let item = fx.item(1, "862");
    let broken = AssetCache::new(fx.cache.dir().join("does-not-exist"));
    let fetcher = PosterFetcher::new(Arc::new(FakeCatalog::new()), broken, fx.store.clone());

    assert_eq!(fetcher.fetch(&item).await, FetchOutcome::Error);
    assert_eq!(fx.poster(1), None);
}

#[tokio::test]
async fn test_dispatch_reports_progress_at_interval_and_end() {
    let fx = Fixture::new();
    let catalog = Arc::new(FakeCatalog::new().with("3", Behavior::NoPoster));
    let items: Vec<_> = (1..=25).map(|id| fx.item(id, &id.to_string())).collect();
    let reporter = RecordingReporter::default();

    let dispatcher = PosterDispatcher::new(fx.fetcher(catalog), 5, 10);
    let report = dispatcher
        .run(items, CancellationToken::new(), &reporter)
        .await
        .unwrap();

    assert_eq!(report.total, 25);
    assert_eq!(report.completed, 25);
    assert!(!report.interrupted);
    assert_eq!(report.tally.downloaded, 24);
    assert_eq!(report.tally.missing, 1);
    assert_eq!(report.tally.total(), 25);
    assert_eq!(*reporter.calls.lock().unwrap(), vec![(10, 25), (20, 25), (25, 25)]);
    assert_eq!(reporter.finished.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_dispatch_never_exceeds_worker_count() {
    let fx = Fixture::new();
    let catalog = Arc::new(FakeCatalog::new().with_delay(Duration::from_millis(20)));
    let items: Vec<_> = (1..=20).map(|id| fx.item(id, &id.to_string())).collect();

    let dispatcher = PosterDispatcher::new(fx.fetcher(catalog.clone()), 5, 10);
    let report = dispatcher
        .run(items, CancellationToken::new(), &RecordingReporter::default())
        .await
        .unwrap();

    assert_eq!(report.completed, 20);
    let peak = catalog.max_in_flight.load(Ordering::SeqCst);
    assert!(peak <= 5, "peak concurrency was {}", peak);
    assert!(peak > 1);
}

#[tokio::test]
async fn test_worker_panic_finishes_reporter_before_failing() {
    let fx = Fixture::new();
    let catalog = Arc::new(FakeCatalog::new().with("2", Behavior::Panic));
    let items: Vec<_> = (1..=3).map(|id| fx.item(id, &id.to_string())).collect();
    let reporter = RecordingReporter::default();

    let dispatcher = PosterDispatcher::new(fx.fetcher(catalog), 1, 10);
    let result = dispatcher.run(items, CancellationToken::new(), &reporter).await;

    assert!(matches!(result, Err(DispatchError::WorkerFault(_))));
    assert_eq!(reporter.finished.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_second_run_skips_everything() {
    let fx = Fixture::new();
    let catalog = Arc::new(FakeCatalog::new());
    let items: Vec<_> = (1..=3).map(|id| fx.item(id, &id.to_string())).collect();
    let dispatcher = PosterDispatcher::new(fx.fetcher(catalog.clone()), 2, 10);

    dispatcher
        .run(items.clone(), CancellationToken::new(), &RecordingReporter::default())
        .await
        .unwrap();
    let lookups = catalog.lookups.load(Ordering::SeqCst);

    let report = dispatcher
        .run(items, CancellationToken::new(), &RecordingReporter::default())
        .await
        .unwrap();
    assert_eq!(report.tally.skipped, 3);
    assert_eq!(catalog.lookups.load(Ordering::SeqCst), lookups);
}

#[tokio::test]
async fn test_empty_work_list() {
    let fx = Fixture::new();
    let reporter = RecordingReporter::default();
    let dispatcher = PosterDispatcher::new(fx.fetcher(Arc::new(FakeCatalog::new())), 5, 10);

    let report = dispatcher.run(Vec::new(), CancellationToken::new(), &reporter).await.unwrap();
    assert_eq!(report.total, 0);
    assert_eq!(report.completed, 0);
    assert!(reporter.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_cancellation_returns_promptly() {
    let fx = Fixture::new();
    let mut catalog = FakeCatalog::new();
    for id in 3..=10 {
        catalog = catalog.with(&id.to_string(), Behavior::Hang);
    }
    let items: Vec<_> = (1..=10).map(|id| fx.item(id, &id.to_string())).collect();
    let dispatcher = PosterDispatcher::new(fx.fetcher(Arc::new(catalog)), 2, 1);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        dispatcher.run(items, cancel, &RecordingReporter::default()),
    )
    .await
    .expect("dispatcher did not stop after cancellation")
    .unwrap();

    assert!(report.interrupted);
    assert_eq!(report.completed, 2);
    assert_eq!(report.tally.downloaded, 2);
}

#[tokio::test]
async fn test_already_cancelled_starts_nothing() {
    let fx = Fixture::new();
    let catalog = Arc::new(FakeCatalog::new());
    let items = vec![fx.item(1, "1")];
    let cancel = CancellationToken::new();
    cancel.cancel();

    let dispatcher = PosterDispatcher::new(fx.fetcher(catalog.clone()), 5, 10);
    let report = dispatcher.run(items, cancel, &RecordingReporter::default()).await.unwrap();
    assert!(report.interrupted);
    assert_eq!(report.completed, 0);
    assert_eq!(catalog.lookups.load(Ordering::SeqCst), 0);
}

#[test]
fn test_catalog_errors_map_to_outcomes() {
    use super::fetcher::outcome_for;
    let status = CatalogError::Status { url: "u".into(), status: 500 };
    let decode = CatalogError::Decode { url: "u".into(), message: "bad json".into() };
    assert_eq!(outcome_for(&status), FetchOutcome::Missing);
    assert_eq!(outcome_for(&decode), FetchOutcome::Error);
}
