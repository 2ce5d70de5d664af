use std::time::Duration;

use portal_cache::RedisUrlCache;
use portal_core::{ShortCode, UrlCache};
use portal_test_infra::redis::RedisMaster;
use redis::AsyncCommands;

struct Fixture {
    _redis: RedisMaster,
    conn: redis::aio::MultiplexedConnection,
}

impl Fixture {
    async fn start() -> Self {
        let redis = RedisMaster::new().await.expect("start redis");
        let url = redis.url().await.expect("redis url");
        let client = redis::Client::open(url.as_str()).expect("redis client");
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .expect("redis connection");

        Self {
            _redis: redis,
            conn,
        }
    }
}

fn code(s: &str) -> ShortCode {
    ShortCode::parse(s).unwrap()
}

#[tokio::test]
async fn get_and_set_raw_url() {
    let fixture = Fixture::start().await;
    let cache = RedisUrlCache::new(fixture.conn.clone());
    let c = code("abc123");

    assert!(cache.get_url(&c).await.unwrap().is_none());

    cache
        .set_url(&c, "https://example.com/a?b=c", Some(Duration::from_secs(60)))
        .await
        .unwrap();

    assert_eq!(
        cache.get_url(&c).await.unwrap().as_deref(),
        Some("https://example.com/a?b=c")
    );

    // Values are stored as plain strings under the prefixed key.
    let mut conn = fixture.conn.clone();
    let raw: Option<String> = conn.get("portal:url:abc123").await.unwrap();
    assert_eq!(raw.as_deref(), Some("https://example.com/a?b=c"));
}

#[tokio::test]
async fn set_with_ttl_expires() {
    let fixture = Fixture::start().await;
    let cache = RedisUrlCache::new(fixture.conn.clone());
    let c = code("expire");

    cache
        .set_url(&c, "https://example.com", Some(Duration::from_secs(1)))
        .await
        .unwrap();
    assert!(cache.get_url(&c).await.unwrap().is_some());

    let mut conn = fixture.conn.clone();
    let ttl: i64 = conn.ttl("portal:url:expire").await.unwrap();
    assert!((0..=1).contains(&ttl));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(cache.get_url(&c).await.unwrap().is_none());
}

#[tokio::test]
async fn set_without_ttl_persists() {
    let fixture = Fixture::start().await;
    let cache = RedisUrlCache::new(fixture.conn.clone());
    let c = code("forever");

    cache.set_url(&c, "https://example.com", None).await.unwrap();

    let mut conn = fixture.conn.clone();
    let ttl: i64 = conn.ttl("portal:url:forever").await.unwrap();
    assert_eq!(ttl, -1);
}

#[tokio::test]
async fn custom_prefix_isolates_keys() {
    let fixture = Fixture::start().await;
    let a = RedisUrlCache::with_prefix(fixture.conn.clone(), "a:");
    let b = RedisUrlCache::with_prefix(fixture.conn.clone(), "b:");
    let c = code("shared");

    a.set_url(&c, "https://a.example", None).await.unwrap();

    assert_eq!(
        a.get_url(&c).await.unwrap().as_deref(),
        Some("https://a.example")
    );
    assert!(b.get_url(&c).await.unwrap().is_none());
}
