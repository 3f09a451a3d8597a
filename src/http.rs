//! HTTP read API
//!
//! - `GET /tx/:hash` -> tx with block context, or `null`
//! - `GET /range/:start/:stop` -> txids indexed at heights `start..=stop`
//!
//! Parameters are validated before they reach the query service.

use crate::chain::{display_hash, parse_display_hash};
use crate::error::IndexError;
use crate::query::{QueryService, TxMeta};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tracing::error;

/// Request failures mapped to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed path parameter.
    BadRequest(String),
    /// Index fault while serving the request.
    Internal(IndexError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(e) => {
                if e.is_integrity_fault() {
                    error!("Index integrity fault while serving request: {}", e);
                } else {
                    error!("Request failed: {}", e);
                }
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": e.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

impl From<IndexError> for ApiError {
    fn from(e: IndexError) -> Self {
        ApiError::Internal(e)
    }
}

/// Build the API router.
pub fn router(query: QueryService) -> Router {
    Router::new()
        .route("/tx/:hash", get(get_tx))
        .route("/range/:start/:stop", get(get_range))
        .with_state(query)
}

/// Build the API router under a path prefix such as `/opri`.
pub fn mount(prefix: &str, query: QueryService) -> Router {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        router(query)
    } else {
        Router::new().nest(prefix, router(query))
    }
}

async fn get_tx(
    State(query): State<QueryService>,
    Path(hash): Path<String>,
) -> Result<Json<Option<TxMeta>>, ApiError> {
    let txid = parse_display_hash(&hash).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(query.get_meta(txid)?))
}

async fn get_range(
    State(query): State<QueryService>,
    Path((start, stop)): Path<(String, String)>,
) -> Result<Json<Vec<String>>, ApiError> {
    let start = parse_height("start", &start)?;
    let stop = parse_height("stop", &stop)?;
    if start > stop {
        return Err(ApiError::BadRequest(format!(
            "start ({}) must not exceed stop ({})",
            start, stop
        )));
    }

    let hashes = query
        .get_range(start, stop)?
        .map(|txid| txid.map(|txid| display_hash(&txid)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(hashes))
}

/// Parse a decimal u32 height. Signs, whitespace, and overflow are rejected.
fn parse_height(name: &str, s: &str) -> Result<u32, ApiError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::BadRequest(format!(
            "{} must be an unsigned integer, got '{}'",
            name, s
        )));
    }
    s.parse::<u32>()
        .map_err(|_| ApiError::BadRequest(format!("{} out of range: {}", name, s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::TxHashes;
    use crate::query::tests::Harness;
    use crate::testutil::{anchor_script, TxBuilder};
    use axum::body::Body;
    use axum::http::Request;
    use bitcoin::Transaction;
    use serde_json::Value;
    use tower::ServiceExt;

    fn anchor_tx(seed: u32) -> Transaction {
        TxBuilder::new(seed).output(0, anchor_script([4u8; 32])).build()
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_get_tx() {
        let mut harness = Harness::new();
        let tx = anchor_tx(1);
        harness.mine(vec![TxBuilder::new(99).output(50, vec![0x51]).build(), tx.clone()]);
        let app = router(harness.query.clone());

        let uri = format!("/tx/{}", display_hash(&tx.txid_hash()));
        let (status, body) = get_json(app, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["hash"], display_hash(&tx.txid_hash()));
        assert_eq!(body["height"], 1);
        assert_eq!(body["index"], 1);
    }

    #[tokio::test]
    async fn test_get_tx_not_found_is_null() {
        let harness = Harness::new();
        let app = router(harness.query.clone());

        let (status, body) = get_json(app, &format!("/tx/{}", "ab".repeat(32))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn test_get_tx_rejects_bad_hash() {
        let harness = Harness::new();

        let not_hex = format!("/tx/{}", "zz".repeat(32));
        for uri in ["/tx/xyz", "/tx/abcd", not_hex.as_str()] {
            let (status, body) = get_json(router(harness.query.clone()), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_get_range() {
        let mut harness = Harness::new();
        let first = anchor_tx(1);
        let second = anchor_tx(2);
        harness.mine(vec![first.clone()]);
        harness.mine(vec![second.clone()]);
        harness.mine(vec![TxBuilder::new(3).output(1, vec![0x51]).build()]);

        let (status, body) = get_json(router(harness.query.clone()), "/range/1/3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!([display_hash(&first.txid_hash()), display_hash(&second.txid_hash())])
        );

        let (status, body) = get_json(router(harness.query.clone()), "/range/3/3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_get_range_rejects_bad_heights() {
        let harness = Harness::new();
        for uri in [
            "/range/abc/5",
            "/range/1/-2",
            "/range/+1/5",
            "/range/0/4294967296",
            "/range/5/1",
        ] {
            let (status, body) = get_json(router(harness.query.clone()), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert!(body["error"].is_string());
        }

        let (status, _) = get_json(router(harness.query.clone()), "/range/0/4294967295").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_mount_under_prefix() {
        let harness = Harness::new();
        let (status, body) = get_json(mount("/opri", harness.query.clone()), "/opri/range/0/0").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));

        let (status, _) = get_json(mount("/", harness.query.clone()), "/range/0/0").await;
        assert_eq!(status, StatusCode::OK);
    }
}
