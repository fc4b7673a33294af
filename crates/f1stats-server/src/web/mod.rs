//! HTTP front-end.
//!
//! Reads only ever look at the live generation in the cache. The refresh
//! endpoints wait for the refresh and answer with its summary.

pub mod page;

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use f1stats_core::{CacheError, ConstructorRecord, RefreshController, RefreshError, RefreshSummary};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{error, warn};

type AppState = State<Arc<RefreshController>>;

pub fn router(controller: Arc<RefreshController>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/constructors", get(list_constructors))
        .route("/api/refresh", post(repopulate))
        .route("/api/refresh/race-stats", post(refresh_race_stats))
        .route("/healthz", get(healthz))
        .with_state(controller)
}

/// Error body returned by every endpoint.
#[derive(Debug)]
struct ApiFailure {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<CacheError> for ApiFailure {
    fn from(err: CacheError) -> Self {
        error!(error = %err, "Cache read failed");
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: err.to_string(),
        }
    }
}

impl From<RefreshError> for ApiFailure {
    fn from(err: RefreshError) -> Self {
        let status = match err {
            RefreshError::AlreadyRunning => StatusCode::CONFLICT,
            RefreshError::Aborted(_) => StatusCode::BAD_GATEWAY,
            RefreshError::Cache(_) | RefreshError::TimedOut(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

async fn index(State(controller): AppState) -> Result<Html<String>, ApiFailure> {
    let records = controller.list_all_records().await?;
    let age = controller
        .cache()
        .current()
        .await?
        .map(|pointer| pointer.age_display());
    Ok(Html(page::render(&records, age.as_deref())))
}

async fn list_constructors(
    State(controller): AppState,
) -> Result<Json<Vec<ConstructorRecord>>, ApiFailure> {
    Ok(Json(controller.list_all_records().await?))
}

async fn repopulate(State(controller): AppState) -> Result<Json<RefreshSummary>, ApiFailure> {
    finish(tokio::spawn(async move { controller.repopulate().await })).await
}

async fn refresh_race_stats(
    State(controller): AppState,
) -> Result<Json<RefreshSummary>, ApiFailure> {
    finish(tokio::spawn(async move { controller.refresh_race_stats().await })).await
}

/// Wait for a refresh running on its own task.
///
/// The task owns the in-flight guard, so the refresh runs to completion even
/// when the client goes away before the response is written.
async fn finish(
    task: JoinHandle<Result<RefreshSummary, RefreshError>>,
) -> Result<Json<RefreshSummary>, ApiFailure> {
    match task.await {
        Ok(result) => Ok(Json(result?)),
        Err(e) => {
            error!(error = %e, "Refresh task failed");
            Err(ApiFailure {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "Refresh task failed".to_string(),
            })
        }
    }
}

async fn healthz(State(controller): AppState) -> impl IntoResponse {
    match controller.cache().ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "error": e.to_string() })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request},
    };
    use f1stats_core::{
        ApiError, CacheManager, ConstructorInfo, FlagTable, MemoryStore, RefreshConfig,
        RepopulateStrategy, Season, StatsSource,
    };
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    /// Two champions with fixed statistics. Listing can be switched off and
    /// title lookups slowed down.
    #[derive(Default)]
    struct FixedSource {
        down: AtomicBool,
        title_delay_ms: AtomicU64,
    }

    fn info(id: &str, name: &str, nationality: &str) -> ConstructorInfo {
        ConstructorInfo {
            id: id.to_string(),
            url: format!("http://en.wikipedia.org/wiki/{}", name),
            name: name.to_string(),
            nationality: nationality.to_string(),
        }
    }

    #[async_trait]
    impl StatsSource for FixedSource {
        async fn list_champion_entities(&self) -> Result<Vec<ConstructorInfo>, ApiError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(ApiError::Unavailable("503 Service Unavailable".to_string()));
            }
            Ok(vec![
                info("ferrari", "Ferrari", "Italian"),
                info("mclaren", "McLaren", "British"),
            ])
        }

        async fn list_title_seasons(&self, id: &str) -> Result<Vec<Season>, ApiError> {
            let delay = self.title_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            Ok(match id {
                "ferrari" => vec![2000, 2001, 2002],
                _ => vec![1998],
            })
        }

        async fn count_race_starts(&self, _id: &str) -> Result<u32, ApiError> {
            Ok(100)
        }

        async fn count_race_wins(&self, id: &str) -> Result<u32, ApiError> {
            Ok(if id == "ferrari" { 50 } else { 20 })
        }

        async fn list_active_seasons(&self, _id: &str) -> Result<Vec<Season>, ApiError> {
            Ok((1996..=2005).collect())
        }
    }

    fn app() -> (Arc<FixedSource>, Arc<RefreshController>, Router) {
        app_with(RefreshConfig::default())
    }

    fn app_with(config: RefreshConfig) -> (Arc<FixedSource>, Arc<RefreshController>, Router) {
        let source = Arc::new(FixedSource::default());
        let controller = Arc::new(RefreshController::new(
            source.clone(),
            Arc::new(FlagTable::embedded()),
            CacheManager::new(Arc::new(MemoryStore::new()), "f1stats"),
            config,
        ));
        let router = router(controller.clone());
        (source, controller, router)
    }

    async fn send(router: &Router, method: Method, uri: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_constructors_empty_before_refresh() {
        let (_, _, router) = app();
        let (status, body) = send(&router, Method::GET, "/api/constructors").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn test_refresh_then_list() {
        let (_, _, router) = app();

        let (status, body) = send(&router, Method::POST, "/api/refresh").await;
        assert_eq!(status, StatusCode::OK);
        let summary: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(summary["stored"], 2);
        assert_eq!(summary["failed"], 0);

        let (status, body) = send(&router, Method::GET, "/api/constructors").await;
        assert_eq!(status, StatusCode::OK);
        let records: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(records[0]["id"], "ferrari");
        assert_eq!(records[0]["titleCount"], 3);
        assert_eq!(records[0]["countryFlagRef"], "/web/static/flags/flag-italy.svg");
        assert_eq!(records[1]["winRateDisplay"], "20.00% (20 wins from 100 starts)");
    }

    #[tokio::test]
    async fn test_race_stats_refresh_endpoint() {
        let (_, _, router) = app();
        send(&router, Method::POST, "/api/refresh").await;

        let (status, body) = send(&router, Method::POST, "/api/refresh/race-stats").await;
        assert_eq!(status, StatusCode::OK);
        let summary: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(summary["generation"], 1);
        assert_eq!(summary["stored"], 2);
    }

    #[tokio::test]
    async fn test_aborted_refresh_is_bad_gateway() {
        let (source, _, router) = app();
        source.down.store(true, Ordering::SeqCst);

        let (status, body) = send(&router, Method::POST, "/api/refresh").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("could not list constructors"));
    }

    #[tokio::test]
    async fn test_index_renders_table() {
        let (_, _, router) = app();

        let (status, body) = send(&router, Method::GET, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("No data cached yet"));

        send(&router, Method::POST, "/api/refresh").await;
        let (_, body) = send(&router, Method::GET, "/").await;
        assert!(body.contains("Updated just now"));
        assert!(body.contains(">McLaren</a>"));
        assert!(body.contains("<td>1996-2005</td>"));
    }

    #[tokio::test]
    async fn test_refresh_survives_client_going_away() {
        let (source, controller, router) = app_with(RefreshConfig {
            strategy: RepopulateStrategy::Flush,
            ..RefreshConfig::default()
        });
        send(&router, Method::POST, "/api/refresh").await;
        assert_eq!(controller.list_all_records().await.unwrap().len(), 2);

        source.title_delay_ms.store(300, Ordering::SeqCst);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/refresh")
            .body(Body::empty())
            .unwrap();
        let abandoned =
            tokio::time::timeout(Duration::from_millis(50), router.clone().oneshot(request)).await;
        assert!(abandoned.is_err());
        assert!(controller.is_running());

        tokio::time::timeout(Duration::from_secs(5), async {
            while controller.is_running() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(controller.list_all_records().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_refresh_is_conflict() {
        let (source, controller, router) = app();
        source.title_delay_ms.store(200, Ordering::SeqCst);

        let first = tokio::spawn({
            let router = router.clone();
            async move { send(&router, Method::POST, "/api/refresh").await }
        });
        while !controller.is_running() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let (status, _) = send(&router, Method::POST, "/api/refresh/race-stats").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(first.await.unwrap().0, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_healthz() {
        let (_, _, router) = app();
        let (status, body) = send(&router, Method::GET, "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_refresh_rejects_wrong_method() {
        let (_, _, router) = app();
        let (status, _) = send(&router, Method::GET, "/api/refresh").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_refresh_error_status_mapping() {
        let conflict = ApiFailure::from(RefreshError::AlreadyRunning);
        assert_eq!(conflict.status, StatusCode::CONFLICT);

        let timeout = ApiFailure::from(RefreshError::TimedOut(std::time::Duration::from_secs(1)));
        assert_eq!(timeout.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
