//! HTTP facade over the core services.

mod environments;
mod error;
mod logs;
mod query;
mod tables;
mod transfer;

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use devlog_core::DevlogState;
use serde::Serialize;

/// Build the application router.
pub fn router(state: Arc<DevlogState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/logs", get(logs::list_logs))
        .route("/api/logs/clear", post(logs::clear_logs))
        .route("/api/environments", get(environments::list_environments))
        .route("/api/query", post(query::run_query))
        .route("/api/tables/{env}", get(tables::list_tables))
        .route("/api/table/{env}/{table}", get(tables::table_rows))
        .route("/api/migrate", post(transfer::migrate))
        .route("/api/migrate-all", post(transfer::migrate_all))
        .route("/api/merge", post(transfer::merge))
        .route("/api/verify", post(transfer::verify))
        .with_state(state)
}

/// `{success, message}` acknowledgement.
#[derive(Serialize)]
pub struct StatusMessage {
    success: bool,
    message: String,
}

impl StatusMessage {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    uptime_seconds: u64,
}

async fn healthz(State(state): State<Arc<DevlogState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "devlog",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime().as_secs(),
    })
}

/// Treat empty strings like absent request fields.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use devlog_core::DevlogConfig;
    use reqwest::StatusCode;
    use serde_json::{json, Value};

    /// Serve the router on an ephemeral port with no databases configured.
    async fn spawn_app() -> (String, Arc<DevlogState>) {
        let state = Arc::new(DevlogState::initialize(DevlogConfig::default()));
        let app = router(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), state)
    }

    async fn post_json(url: &str, body: Value) -> (StatusCode, Value) {
        let resp = reqwest::Client::new().post(url).json(&body).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    async fn get_json(url: &str) -> (StatusCode, Value) {
        let resp = reqwest::get(url).await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    #[tokio::test]
    async fn test_healthz() {
        let (base, _) = spawn_app().await;
        let (status, body) = get_json(&format!("{base}/healthz")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "devlog");
        assert!(body["uptimeSeconds"].is_u64());
    }

    #[tokio::test]
    async fn test_query_rejects_unknown_environment() {
        let (base, _) = spawn_app().await;
        let (status, body) =
            post_json(&format!("{base}/api/query"), json!({"env": "staging", "sql": "SELECT 1"}))
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "invalid environment"}));
    }

    #[tokio::test]
    async fn test_query_missing_parameters() {
        let (base, _) = spawn_app().await;
        for body in [json!({}), json!({"env": "offline"}), json!({"env": "offline", "sql": ""})] {
            let (status, body) = post_json(&format!("{base}/api/query"), body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "missing env or sql parameter");
        }
    }

    #[tokio::test]
    async fn test_query_without_pool_is_unavailable() {
        let (base, _) = spawn_app().await;
        let (status, body) =
            post_json(&format!("{base}/api/query"), json!({"env": "offline", "sql": "SELECT 1"}))
                .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "OFFLINE database is not connected");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let (base, _) = spawn_app().await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/api/query"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_table_routes() {
        let (base, _) = spawn_app().await;

        let (status, body) = get_json(&format!("{base}/api/tables/staging")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid environment");

        let (status, body) = get_json(&format!("{base}/api/tables/online")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "ONLINE database is not connected");

        let (status, _) = get_json(&format!("{base}/api/table/offline/users?limit=-1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get_json(&format!("{base}/api/table/offline/users?limit=10&offset=5")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_transfers_need_both_pools() {
        let (base, _) = spawn_app().await;

        let (status, body) = post_json(&format!("{base}/api/migrate"), json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "missing table parameter");

        for route in ["migrate", "merge", "verify"] {
            let (status, body) =
                post_json(&format!("{base}/api/{route}"), json!({"table": "users"})).await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "route {route}");
            assert_eq!(body["error"], "database connections are incomplete");
        }

        let (status, _) = post_json(&format!("{base}/api/migrate-all"), json!({})).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_environments_report_disconnected() {
        let (base, _) = spawn_app().await;
        let (status, body) = get_json(&format!("{base}/api/environments")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["offline"]["name"], "OFFLINE (test)");
        assert_eq!(body["offline"]["status"], "disconnected");
        assert_eq!(body["online"]["dbUrl"], "not configured");
    }

    #[tokio::test]
    async fn test_logs_filter_and_clear() {
        let (base, _) = spawn_app().await;

        // Startup recorded one warning per unconfigured environment.
        let (status, body) = get_json(&format!("{base}/api/logs?level=warn")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["limit"], 100);
        assert_eq!(body["offset"], 0);

        let (status, body) = get_json(&format!("{base}/api/logs?level=debug")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = post_json(&format!("{base}/api/logs/clear"), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "message": "logs cleared"}));

        let (_, body) = get_json(&format!("{base}/api/logs?level=all&limit=10")).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["logs"][0]["level"], "info");
        assert_eq!(body["logs"][0]["message"], "logs cleared");
    }
}
