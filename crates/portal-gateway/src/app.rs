use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{create_url_handler, get_url_handler, health_handler, redirect_handler};
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/{short_code}", get(redirect_handler))
            .route("/v1/urls", post(create_url_handler))
            .route("/v1/urls/{*short_url}", get(get_url_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CreateUrlResponse, ErrorResponse, GetUrlResponse};
    use crate::reachability::{ProbeError, UrlProbe};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use portal_cache::MokaUrlCache;
    use portal_redirector::{CachedRepository, RedirectorService};
    use portal_sequence::InMemorySequence;
    use portal_shortener::ShortenerService;
    use portal_storage::InMemoryRepository;
    use serde::de::DeserializeOwned;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct StubProbe {
        reachable: bool,
    }

    #[async_trait]
    impl UrlProbe for StubProbe {
        async fn check(&self, _url: &str) -> Result<(), ProbeError> {
            if self.reachable {
                Ok(())
            } else {
                Err(ProbeError::Status(404))
            }
        }
    }

    fn router_with_probe(reachable: bool) -> Router {
        let store = Arc::new(InMemoryRepository::new());
        let shortener = ShortenerService::new(
            Arc::clone(&store),
            InMemorySequence::new(),
            "https://por.tl",
        );
        let redirector =
            RedirectorService::new(CachedRepository::new(store, MokaUrlCache::new()));

        App::router(AppState::new(
            Arc::new(shortener),
            Arc::new(redirector),
            Some(Arc::new(StubProbe { reachable })),
        ))
    }

    fn router() -> Router {
        router_with_probe(true)
    }

    fn create(long_url: &str) -> Request<Body> {
        Request::post("/v1/urls")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({ "long_url": long_url }).to_string(),
            ))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn json<T: DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health() {
        let response = router().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn create_then_resolve() {
        let app = router();

        let response = app
            .clone()
            .oneshot(create("https://example.com/page"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: CreateUrlResponse = json(response).await;
        assert_eq!(created.short_url, "https://por.tl/d");

        let response = app.clone().oneshot(get("/v1/urls/por.tl/d")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let resolved: GetUrlResponse = json(response).await;
        assert_eq!(resolved.long_url, "https://example.com/page");

        let response = app.oneshot(get("/v1/urls/d/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn short_code_redirects_with_found() {
        let app = router();
        app.clone()
            .oneshot(create("https://example.com/page"))
            .await
            .unwrap();

        let response = app.oneshot(get("/d")).await.unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://example.com/page"
        );
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let app = router();
        app.clone()
            .oneshot(create("https://example.com"))
            .await
            .unwrap();

        let response = app.oneshot(create("https://example.com")).await.unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn shortening_a_short_url_is_rejected() {
        let app = router();
        app.clone()
            .oneshot(create("https://example.com"))
            .await
            .unwrap();

        let response = app.oneshot(create("https://por.tl/d")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unreachable_url_is_not_shortened() {
        let app = router_with_probe(false);

        let response = app
            .clone()
            .oneshot(create("https://dead.example"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        // Nothing was issued, so the first code is still free.
        let response = app.oneshot(get("/d")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_url_is_bad_request() {
        let response = router_with_probe(false)
            .oneshot(create("   "))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_code_is_not_found() {
        let response = router().oneshot(get("/abc")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: ErrorResponse = json(response).await;
        assert_eq!(body.error, "short code not found: abc");
    }

    #[tokio::test]
    async fn invalid_code_is_bad_request() {
        let response = router().oneshot(get("/my-code")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
