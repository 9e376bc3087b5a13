//! HTTP server: routes, cache front, auth gate
//!
//! Cacheable GETs (`/`, `/bing-images`, `/{key}`) are looked up in the
//! response cache by full public URL before any component runs, and
//! populated right after a successful response is built.

use axum::{
    body::Body,
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::{header, HeaderMap, HeaderName, StatusCode, Uri},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use chrono::Utc;
use edge_response_cache::{CacheStats, CachedResponse, ContentClass};
use filebed_db::SortOrder;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};

use crate::auth::is_authorized;
use crate::error::{AppError, UploadError};
use crate::gallery::render_page;
use crate::ingest::Upload;
use crate::pages::index_page;
use crate::state::{AppState, SharedState};

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const JSON_CONTENT_TYPE: &str = "application/json";

const CDN_CACHE_CONTROL: HeaderName = HeaderName::from_static("cdn-cache-control");
const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    uptime_secs: u64,
    cache: CacheStats,
}

#[derive(Serialize)]
struct UploadResponse {
    data: String,
}

#[derive(Deserialize)]
struct GalleryQuery {
    page: Option<String>,
    #[serde(default)]
    order: SortOrder,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DeletePayload {
    Keys(Vec<String>),
    Object { keys: Vec<String> },
}

impl DeletePayload {
    fn into_keys(self) -> Vec<String> {
        match self {
            DeletePayload::Keys(keys) | DeletePayload::Object { keys } => keys,
        }
    }
}

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    let config = state.config.clone();
    let body_limit = usize::try_from(config.body_limit_bytes).unwrap_or(usize::MAX);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/bing-images", get(bing_images))
        .route("/delete-images", post(delete_images))
        .route(&format!("/{}", config.admin_path), get(admin_gallery))
        .route("/{key}", get(media))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: SharedState) -> std::io::Result<()> {
    let port = state.config.port;
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

fn require_auth(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    if is_authorized(headers, state.config.credentials.as_ref()) {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

/// Full public URL of the request, used as the cache key
fn cache_key(state: &AppState, uri: &Uri) -> String {
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    format!("{}{}", state.config.origin, path)
}

/// Cache key for a media read, built from the decoded key so that every
/// spelling of it shares the entry a delete purges
fn media_cache_key(state: &AppState, key: &str, uri: &Uri) -> String {
    match uri.query() {
        Some(query) => format!("{}?{}", state.config.media_url(key), query),
        None => state.config.media_url(key),
    }
}

fn replay(cached: &CachedResponse, cache_status: &'static str) -> Response {
    let cache_control = cached.cache_control();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, cached.content_type.clone()),
            (header::CACHE_CONTROL, cache_control.clone()),
            (CDN_CACHE_CONTROL, cache_control),
            (X_CACHE, cache_status.to_string()),
        ],
        Body::from(cached.body.clone()),
    )
        .into_response()
}

async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let cache = state.cache.stats().await;
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0) as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        cache,
    })
}

/// Upload page; gated before the cache lookup when auth is enabled
async fn root(
    State(state): State<SharedState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, AppError> {
    if state.config.enable_auth {
        require_auth(&state, &headers)?;
    }

    let key = cache_key(&state, &uri);
    if let Some(cached) = state.cache.get(&key).await {
        return Ok(replay(&cached, "HIT"));
    }

    let page = CachedResponse::new(
        ContentClass::Html,
        HTML_CONTENT_TYPE,
        state.config.ttl.for_class(ContentClass::Html),
        Bytes::from(index_page(state.config.max_upload_bytes)),
    );
    state.cache.put(&key, page.clone()).await;
    Ok(replay(&page, "MISS"))
}

async fn upload(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| UploadError::InvalidForm(e.body_text()))?;
    let limit = state.ingest.max_upload_bytes();

    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, limit))?;
        let Some(field) = field else {
            return Err(UploadError::InvalidForm("no file field in form".to_string()).into());
        };

        // Plain text fields are skipped; the first file is the upload
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let declared_content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;

        let ingested = state
            .ingest
            .ingest(Upload {
                bytes,
                filename,
                declared_content_type,
            })
            .await?;
        return Ok(Json(UploadResponse { data: ingested.url }));
    }
}

fn multipart_error(err: axum::extract::multipart::MultipartError, limit: u64) -> UploadError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::PayloadTooLarge { size: None, limit }
    } else {
        UploadError::InvalidForm(err.body_text())
    }
}

/// Stored object by key
async fn media(State(state): State<SharedState>, Path(key): Path<String>, uri: Uri) -> Response {
    let cache_url = media_cache_key(&state, &key, &uri);
    if let Some(cached) = state.cache.get(&cache_url).await {
        return replay(&cached, "HIT");
    }

    match state.resolver.resolve(&key).await {
        Ok(resolved) => {
            let response = CachedResponse::new(
                ContentClass::Media,
                &resolved.content_type,
                resolved.max_age_secs,
                resolved.body,
            );
            state.cache.put(&cache_url, response.clone()).await;
            replay(&response, "MISS")
        }
        Err(e) => e.into_response(),
    }
}

async fn admin_gallery(
    State(state): State<SharedState>,
    headers: HeaderMap,
    query: Result<Query<GalleryQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    require_auth(&state, &headers)?;
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let page = parse_page(query.page.as_deref());
    let listing = state.gallery.list(page, query.order).await?;
    let html = render_page(
        &listing,
        query.order,
        &state.config.admin_path,
        &state.config.origin,
    );

    Ok(([(header::CACHE_CONTROL, "no-store")], Html(html)).into_response())
}

/// Lenient page number: missing, garbage or below 1 all mean page 1
fn parse_page(raw: Option<&str>) -> u32 {
    raw.and_then(|p| p.trim().parse::<i64>().ok())
        .map(|p| p.clamp(1, i64::from(u32::MAX)) as u32)
        .unwrap_or(1)
}

async fn delete_images(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<DeletePayload>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_auth(&state, &headers)?;

    let Json(payload) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let deleted = state.gallery.delete(&payload.into_keys()).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

async fn bing_images(State(state): State<SharedState>, uri: Uri) -> Result<Response, AppError> {
    let key = cache_key(&state, &uri);
    if let Some(cached) = state.cache.get(&key).await {
        return Ok(replay(&cached, "HIT"));
    }

    let list = state.backgrounds.fetch().await.map_err(|e| {
        warn!(error = %e, "Failed to fetch background images");
        AppError::BadGateway(e.to_string())
    })?;
    let body = serde_json::to_vec(&list).map_err(|e| AppError::Internal(e.to_string()))?;

    let response = CachedResponse::new(
        ContentClass::Api,
        JSON_CONTENT_TYPE,
        state.config.ttl.for_class(ContentClass::Api),
        Bytes::from(body),
    );
    state.cache.put(&key, response.clone()).await;
    Ok(replay(&response, "MISS"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::keys::FixedClock;
    use axum::http::Request;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use filebed_db::{connect_in_memory, media as media_rows, migrate::migrate};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use telegram_blob_relay::{BlobRelay, FetchLocation, MemoryRelay};
    use tokio::sync::Notify;
    use tower::ServiceExt;

    const BOUNDARY: &str = "filebed-test-boundary";

    struct TestApp {
        router: Router,
        relay: Arc<MemoryRelay>,
        state: SharedState,
    }

    fn test_config(extra: &[(&str, &str)]) -> Config {
        let mut vars: HashMap<String, String> = [
            ("DOMAIN", "files.example.com"),
            ("USERNAME", "admin"),
            ("PASSWORD", "secret"),
            ("MAX_SIZE_MB", "1"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in extra {
            vars.insert(k.to_string(), v.to_string());
        }
        Config::from_lookup(|name| vars.get(name).cloned()).unwrap()
    }

    async fn app_with_relay(config: Config, relay: Arc<dyn BlobRelay>) -> (Router, SharedState) {
        let pool = connect_in_memory().await.unwrap();
        migrate(&pool).await.unwrap();
        let clock = Arc::new(FixedClock::new(1_700_000_000_000));

        let state = Arc::new(AppState::new(config, pool, relay, None, clock).unwrap());
        (create_router(state.clone()), state)
    }

    async fn test_app(extra: &[(&str, &str)]) -> TestApp {
        let config = test_config(extra);
        let relay = Arc::new(MemoryRelay::new(config.max_upload_bytes));
        let (router, state) = app_with_relay(config, relay.clone()).await;
        TestApp {
            router,
            relay,
            state,
        }
    }

    /// Holds every fetch until the test releases it
    struct GatedRelay {
        inner: MemoryRelay,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl BlobRelay for GatedRelay {
        async fn store(
            &self,
            bytes: Bytes,
            content_type: &str,
            filename: &str,
        ) -> telegram_blob_relay::Result<String> {
            self.inner.store(bytes, content_type, filename).await
        }

        async fn resolve(&self, blob_ref: &str) -> telegram_blob_relay::Result<FetchLocation> {
            self.inner.resolve(blob_ref).await
        }

        async fn fetch(&self, location: &FetchLocation) -> telegram_blob_relay::Result<Bytes> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.fetch(location).await
        }
    }

    fn multipart_body(filename: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
             Content-Type: {ct}\r\n\r\n",
            b = BOUNDARY,
            f = filename,
            ct = content_type
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn upload_request(filename: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(filename, content_type, bytes)))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn authed(builder: axum::http::request::Builder) -> axum::http::request::Builder {
        builder.header(
            header::AUTHORIZATION,
            format!("Basic {}", STANDARD.encode("admin:secret")),
        )
    }

    fn delete_request(payload: serde_json::Value) -> Request<Body> {
        authed(Request::builder().method("POST").uri("/delete-images"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn body_bytes(response: Response) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = test_app(&[]).await;
        let response = app.router.oneshot(get("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
        assert!(json["uptime_secs"].as_u64().is_some());
        assert!(json["cache"]["entries"].as_u64().is_some());
    }

    #[tokio::test]
    async fn test_upload_then_read_back() {
        let app = test_app(&[]).await;
        let response = app
            .router
            .clone()
            .oneshot(upload_request("cat.png", "image/png", b"\x89PNG-bytes"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["data"], "https://files.example.com/1700000000000.png");

        let response = app
            .router
            .clone()
            .oneshot(get("/1700000000000.png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers().clone();
        assert_eq!(headers[header::CONTENT_TYPE], "image/png");
        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=86400");
        assert_eq!(headers["cdn-cache-control"], "public, max-age=86400");
        assert_eq!(headers["x-cache"], "MISS");
        assert_eq!(&body_bytes(response).await[..], b"\x89PNG-bytes");

        let response = app
            .router
            .oneshot(get("/1700000000000.png"))
            .await
            .unwrap();
        assert_eq!(response.headers()["x-cache"], "HIT");
        assert_eq!(&body_bytes(response).await[..], b"\x89PNG-bytes");
    }

    #[tokio::test]
    async fn test_oversize_upload_is_rejected_before_relay() {
        let app = test_app(&[]).await;
        let big = vec![0u8; 1024 * 1024 + 10];
        let response = app
            .router
            .oneshot(upload_request("big.mp4", "video/mp4", &big))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json = json_body(response).await;
        assert_eq!(json["error"], "File exceeds the 1 MB limit");
        assert_eq!(app.relay.store_calls(), 0);
    }

    #[tokio::test]
    async fn test_body_over_transport_limit_is_payload_too_large() {
        let app = test_app(&[]).await;
        // Past the 1 MB upload limit and the 1 MiB multipart headroom
        let big = vec![0u8; 3 * 1024 * 1024];
        let response = app
            .router
            .oneshot(upload_request("huge.mp4", "video/mp4", &big))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json = json_body(response).await;
        assert_eq!(json["error"], "File exceeds the 1 MB limit");
        assert_eq!(app.relay.store_calls(), 0);
        assert_eq!(media_rows::count(&app.state.pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_upload_is_bad_request() {
        let app = test_app(&[]).await;
        let response = app
            .router
            .oneshot(upload_request("empty.png", "image/png", b""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_relay_failure_surfaces_diagnostic() {
        let app = test_app(&[]).await;
        app.relay
            .fail_next_store("Too Many Requests: retry after 5")
            .await;

        let response = app
            .router
            .oneshot(upload_request("a.png", "image/png", b"data"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = json_body(response).await;
        assert!(json["error"].as_str().unwrap().contains("retry after 5"));
        assert_eq!(media_rows::count(&app.state.pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_key_is_empty_404() {
        let app = test_app(&[]).await;
        let response = app.router.oneshot(get("/1234.png")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_revoked_reference_is_bad_gateway() {
        let app = test_app(&[]).await;
        app.router
            .clone()
            .oneshot(upload_request("a.png", "image/png", b"data"))
            .await
            .unwrap();
        app.relay.revoke("mem-1").await;

        let response = app
            .router
            .oneshot(get("/1700000000000.png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(media_rows::get(&app.state.pool, "1700000000000.png")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_get_upload_is_method_not_allowed() {
        let app = test_app(&[]).await;
        let response = app.router.oneshot(get("/upload")).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_delete_twice_then_not_found() {
        let app = test_app(&[]).await;
        app.router
            .clone()
            .oneshot(upload_request("a.png", "image/png", b"data"))
            .await
            .unwrap();
        // Warm the cache so the purge is observable
        let warm = app
            .router
            .clone()
            .oneshot(get("/1700000000000.png"))
            .await
            .unwrap();
        assert_eq!(warm.headers()["x-cache"], "MISS");

        let response = app
            .router
            .clone()
            .oneshot(delete_request(json!(["1700000000000.png"])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["deleted"], 1);

        let response = app
            .router
            .clone()
            .oneshot(delete_request(json!({
                "keys": ["https://files.example.com/1700000000000.png"]
            })))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["deleted"], 0);

        let response = app
            .router
            .oneshot(get("/1700000000000.png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_encoded_key_spelling_is_purged_by_delete() {
        let app = test_app(&[]).await;
        app.router
            .clone()
            .oneshot(upload_request("a.png", "image/png", b"data"))
            .await
            .unwrap();

        let response = app
            .router
            .clone()
            .oneshot(get("/1700000000000%2Epng"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-cache"], "MISS");

        // Both spellings share one cache entry
        let response = app
            .router
            .clone()
            .oneshot(get("/1700000000000.png"))
            .await
            .unwrap();
        assert_eq!(response.headers()["x-cache"], "HIT");

        let response = app
            .router
            .clone()
            .oneshot(delete_request(json!(["1700000000000.png"])))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["deleted"], 1);

        for uri in ["/1700000000000%2Epng", "/1700000000000.png", "/1700000000000%2epng?v=1"] {
            let response = app.router.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_read_in_flight_during_delete_is_not_cached() {
        let config = test_config(&[]);
        let relay = Arc::new(GatedRelay {
            inner: MemoryRelay::new(config.max_upload_bytes),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let (router, state) = app_with_relay(config, relay.clone()).await;
        router
            .clone()
            .oneshot(upload_request("a.png", "image/png", b"data"))
            .await
            .unwrap();

        let read = tokio::spawn(router.clone().oneshot(get("/1700000000000.png")));
        relay.entered.notified().await;

        let response = router
            .clone()
            .oneshot(delete_request(json!(["1700000000000.png"])))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["deleted"], 1);

        relay.release.notify_one();
        let response = read.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(&body_bytes(response).await[..], b"data");

        let response = router.oneshot(get("/1700000000000.png")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(state.cache.stats().await.entries, 0);
    }

    #[tokio::test]
    async fn test_delete_requires_auth() {
        let app = test_app(&[]).await;
        let request = Request::builder()
            .method("POST")
            .uri("/delete-images")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("[\"1.png\"]"))
            .unwrap();

        let response = app.router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_delete_rejects_malformed_payload() {
        let app = test_app(&[]).await;
        let response = app
            .router
            .oneshot(delete_request(json!({ "nope": 1 })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_gallery_requires_auth() {
        let app = test_app(&[]).await;
        let response = app.router.oneshot(get("/admin")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[header::WWW_AUTHENTICATE],
            "Basic realm=\"Admin\""
        );
    }

    #[tokio::test]
    async fn test_admin_gallery_checks_auth_before_query() {
        let app = test_app(&[]).await;
        let response = app
            .router
            .clone()
            .oneshot(get("/admin?order=bogus"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let request = authed(Request::builder().uri("/admin?order=bogus"))
            .body(Body::empty())
            .unwrap();
        let response = app.router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_gallery_lists_uploads() {
        let app = test_app(&[("ADMIN_PATH", "gallery")]).await;
        app.router
            .clone()
            .oneshot(upload_request("a.png", "image/png", b"data"))
            .await
            .unwrap();

        let request = authed(Request::builder().uri("/gallery?page=0&order=asc"))
            .body(Body::empty())
            .unwrap();
        let response = app.router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");

        let html = String::from_utf8(body_bytes(response).await.to_vec()).unwrap();
        assert!(html.contains("1 files, page 1 of 1"));
        assert!(html.contains("1700000000000.png"));
    }

    #[tokio::test]
    async fn test_root_page_is_cached() {
        let app = test_app(&[]).await;
        let first = app.router.clone().oneshot(get("/")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()["x-cache"], "MISS");
        assert_eq!(first.headers()[header::CACHE_CONTROL], "public, max-age=3600");
        let html = String::from_utf8(body_bytes(first).await.to_vec()).unwrap();
        assert!(html.contains("Maximum file size: 1 MB"));

        let second = app.router.oneshot(get("/")).await.unwrap();
        assert_eq!(second.headers()["x-cache"], "HIT");
    }

    #[tokio::test]
    async fn test_root_page_gated_when_auth_enabled() {
        let app = test_app(&[("ENABLE_AUTH", "true")]).await;
        let response = app.router.clone().oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let request = authed(Request::builder().uri("/")).body(Body::empty()).unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // A cached copy is not served to unauthenticated clients
        let response = app.router.oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_background_images_replay_with_api_ttl() {
        let upstream_hits = Arc::new(AtomicUsize::new(0));
        let counter = upstream_hits.clone();
        let archive = Router::new().route(
            "/HPImageArchive.aspx",
            axum::routing::get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(json!({ "images": [{ "url": "/th?id=OHR.Fox.jpg", "title": "Fox" }] }))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move { axum::serve(listener, archive).await });

        let app = test_app(&[("BACKGROUND_BASE_URL", &base)]).await;
        let first = app.router.clone().oneshot(get("/bing-images")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()["x-cache"], "MISS");
        assert_eq!(first.headers()[header::CACHE_CONTROL], "public, max-age=300");
        assert_eq!(first.headers()[header::CONTENT_TYPE], "application/json");
        let json = json_body(first).await;
        assert_eq!(json["status"], true);
        assert_eq!(json["data"][0]["url"], format!("{}/th?id=OHR.Fox.jpg", base));
        assert_eq!(json["data"][0]["title"], "Fox");

        let second = app.router.oneshot(get("/bing-images")).await.unwrap();
        assert_eq!(second.headers()["x-cache"], "HIT");
        assert_eq!(second.headers()["cdn-cache-control"], "public, max-age=300");
        assert_eq!(upstream_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_background_archive_down_is_bad_gateway() {
        let app = test_app(&[("BACKGROUND_BASE_URL", "http://127.0.0.1:9")]).await;
        let response = app.router.oneshot(get("/bing-images")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_parse_page() {
        assert_eq!(parse_page(None), 1);
        assert_eq!(parse_page(Some("3")), 3);
        assert_eq!(parse_page(Some("0")), 1);
        assert_eq!(parse_page(Some("-4")), 1);
        assert_eq!(parse_page(Some("abc")), 1);
    }
}
