use std::sync::Arc;

use portal_cache::{ExistenceFilter, ExistenceFilterConfig, MokaUrlCache};
use portal_redirector::{CachedRepository, Redirector, RedirectorError, RedirectorService};
use portal_sequence::InMemorySequence;
use portal_shortener::{Shortener, ShortenerError, ShortenerService};
use portal_storage::InMemoryRepository;

const DOMAIN: &str = "https://por.tl";

struct Engine {
    store: Arc<InMemoryRepository>,
    shortener: ShortenerService<Arc<InMemoryRepository>, InMemorySequence>,
    redirector: RedirectorService<Arc<InMemoryRepository>, MokaUrlCache>,
}

fn engine() -> Engine {
    let store = Arc::new(InMemoryRepository::new());
    Engine {
        shortener: ShortenerService::new(Arc::clone(&store), InMemorySequence::new(), DOMAIN),
        redirector: RedirectorService::new(CachedRepository::new(
            Arc::clone(&store),
            MokaUrlCache::new(),
        )),
        store,
    }
}

fn code_of(short_url: &str) -> &str {
    short_url.rsplit('/').next().unwrap()
}

#[tokio::test]
async fn convert_then_redirect_round_trips() {
    let engine = engine();
    let long_url = "https://example.com/some/long/path?with=query";

    let short_url = engine.shortener.convert(long_url).await.unwrap();
    assert!(short_url.starts_with("https://por.tl/"));

    assert_eq!(
        engine.redirector.redirect(code_of(&short_url)).await.unwrap(),
        long_url
    );
}

#[tokio::test]
async fn many_urls_round_trip_to_distinct_codes() {
    let engine = engine();

    let mut short_urls = Vec::new();
    for i in 0..200 {
        short_urls.push(
            engine
                .shortener
                .convert(&format!("https://example.com/{i}"))
                .await
                .unwrap(),
        );
    }

    let mut distinct = short_urls.clone();
    distinct.sort();
    distinct.dedup();
    assert_eq!(distinct.len(), 200);

    for (i, short_url) in short_urls.iter().enumerate() {
        assert_eq!(
            engine.redirector.redirect(code_of(short_url)).await.unwrap(),
            format!("https://example.com/{i}")
        );
    }
}

#[tokio::test]
async fn duplicate_convert_keeps_single_mapping() {
    let engine = engine();

    let first = engine.shortener.convert("https://example.com").await.unwrap();
    assert!(matches!(
        engine.shortener.convert("https://example.com").await,
        Err(ShortenerError::AlreadyMapped(existing)) if existing == first
    ));
    assert_eq!(engine.store.len(), 1);
}

#[tokio::test]
async fn filter_built_at_startup_still_resolves_new_codes() {
    let engine = engine();
    let before = engine.shortener.convert("https://before.example").await.unwrap();

    let filter = ExistenceFilter::load(engine.store.as_ref(), ExistenceFilterConfig::default())
        .await
        .unwrap();
    let redirector = engine.redirector.clone().with_filter(Arc::new(filter));

    let after = engine.shortener.convert("https://after.example").await.unwrap();

    assert_eq!(
        redirector.redirect(code_of(&before)).await.unwrap(),
        "https://before.example"
    );
    assert_eq!(
        redirector.redirect(code_of(&after)).await.unwrap(),
        "https://after.example"
    );
    assert!(matches!(
        redirector.redirect("QQQQQQQQQQ").await,
        Err(RedirectorError::NotFound(_))
    ));
}
