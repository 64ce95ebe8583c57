//! Integration tests for the Kubernetes source against a fake API server.

use axum::{
    Json, Router,
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use tripod_core::source::{KubernetesSource, MetadataSource};
use tripod_core::{RegionTable, SourceError, build_report};

const TOKEN: &str = "sa-token";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

async fn pods(headers: HeaderMap, Path(namespace): Path<String>) -> impl IntoResponse {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let items = match namespace.as_str() {
        "default" => json!([
            {
                "metadata": {
                    "name": "svc-a",
                    "annotations": {
                        "dataCategories": "[{\"name\":\"email\"}]",
                        "necessity": "contract"
                    }
                },
                "spec": { "nodeName": "node-1" }
            },
            {
                "metadata": { "name": "svc-b" },
                "spec": { "nodeName": "node-1" }
            },
            {
                "metadata": { "name": "svc-c" },
                "spec": { "nodeName": "node-gone" }
            }
        ]),
        "empty" => json!([]),
        _ => return StatusCode::FORBIDDEN.into_response(),
    };
    Json(json!({ "kind": "PodList", "items": items })).into_response()
}

async fn node(headers: HeaderMap, Path(name): Path<String>) -> impl IntoResponse {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match name.as_str() {
        "node-1" => Json(json!({
            "metadata": {
                "name": "node-1",
                "labels": { "topology.kubernetes.io/region": "us-west1" },
                "annotations": { "node.alpha.kubernetes.io/ttl": "30d" }
            }
        }))
        .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_api_server() -> String {
    let app = Router::new()
        .route("/api/v1/namespaces/{namespace}/pods", get(pods))
        .route("/api/v1/nodes/{name}", get(node));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn source(base_url: &str, namespace: &str, token: Option<&str>) -> KubernetesSource {
    KubernetesSource::new(
        reqwest::Client::new(),
        base_url,
        namespace,
        token.map(String::from),
    )
}

#[tokio::test]
async fn test_snapshot_lists_units_and_known_hosts() {
    let base = spawn_api_server().await;
    let snapshot = source(&base, "default", Some(TOKEN))
        .snapshot()
        .await
        .unwrap();

    let names: Vec<_> = snapshot.units.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["svc-a", "svc-b", "svc-c"]);
    assert_eq!(snapshot.hosts.len(), 1);
    assert_eq!(snapshot.hosts["node-1"].ttl(), "30d");
    assert!(!snapshot.hosts.contains_key("node-gone"));
}

#[tokio::test]
async fn test_vanished_node_fails_report() {
    let base = spawn_api_server().await;
    let snapshot = source(&base, "default", Some(TOKEN))
        .snapshot()
        .await
        .unwrap();
    let err = build_report(&snapshot, RegionTable::builtin()).unwrap_err();
    assert_eq!(err.unit, "svc-c");
}

#[tokio::test]
async fn test_empty_namespace() {
    let base = spawn_api_server().await;
    let snapshot = source(&base, "empty", Some(TOKEN))
        .snapshot()
        .await
        .unwrap();
    assert!(snapshot.units.is_empty());
    let report = build_report(&snapshot, RegionTable::builtin()).unwrap();
    assert_eq!(report.score.num_pods, 0);
}

#[tokio::test]
async fn test_forbidden_namespace_is_status_error() {
    let base = spawn_api_server().await;
    let err = source(&base, "kube-system", Some(TOKEN))
        .snapshot()
        .await
        .unwrap_err();
    match err {
        SourceError::Status { status, url } => {
            assert_eq!(status, 403);
            assert!(url.ends_with("/api/v1/namespaces/kube-system/pods"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let base = spawn_api_server().await;
    let err = source(&base, "default", None).snapshot().await.unwrap_err();
    assert!(matches!(err, SourceError::Status { status: 401, .. }));
}

#[tokio::test]
async fn test_unreachable_api_server() {
    let err = source("http://127.0.0.1:1", "default", Some(TOKEN))
        .snapshot()
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Http(_)));
}
