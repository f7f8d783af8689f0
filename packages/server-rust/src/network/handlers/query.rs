//! Query endpoint: exposes handles of local services matching a query.
//!
//! The request body is a `ServiceQuery`, the response the full handle list
//! for it, both in the encoding named by the request's `content-type`
//! (JSON unless it is `application/msgpack`).

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use invoker_core::{Encoding, HandleRecord, ServiceQuery};
use serde_json::json;
use tracing::{debug, warn};

use super::AppState;

/// Handles `POST /{invoker_path}/query`.
///
/// 400 on an undecodable body or an invalid query, 503 while the node is not
/// serving.
pub async fn query_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !state.shutdown.health_state().is_accepting() {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "node is not serving");
    }
    let _guard = state.shutdown.in_flight_guard();

    let encoding =
        Encoding::from_content_type(headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()));

    let query: ServiceQuery = match encoding.decode(&body) {
        Ok(query) => query,
        Err(error) => {
            debug!(%error, "undecodable query body");
            return error_response(StatusCode::BAD_REQUEST, &error.to_string());
        }
    };

    let handles = match state.handles.assure_handles(&query, state.lookup.as_ref()) {
        Ok(handles) => handles,
        Err(error) => {
            debug!(%error, "query rejected");
            return error_response(StatusCode::BAD_REQUEST, &error.to_string());
        }
    };

    let records: Vec<HandleRecord> = handles.iter().map(|h| h.record()).collect();
    match encoding.encode(&records) {
        Ok(bytes) => ([(CONTENT_TYPE, encoding.content_type())], bytes).into_response(),
        Err(error) => {
            warn!(%error, "cannot encode handle list");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "cannot encode handle list")
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::to_bytes;
    use axum::http::HeaderValue;
    use invoker_core::codec::MSGPACK_CONTENT_TYPE;
    use invoker_core::{Invocation, Value};

    use super::*;
    use crate::network::handlers::test_support::{state, state_with};
    use crate::proxy::InvocationError;
    use crate::registry::LocalServices;
    use crate::traits::Microservice;

    struct Noop;

    #[async_trait]
    impl Microservice for Noop {
        async fn dispatch(&self, _invocation: Invocation) -> Result<Value, InvocationError> {
            Ok(Value::Null)
        }
    }

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    async fn body_bytes(response: Response) -> Bytes {
        to_bytes(response.into_body(), usize::MAX).await.unwrap()
    }

    fn ready_state_with_orders(instances: usize) -> AppState {
        let services = Arc::new(LocalServices::new());
        for _ in 0..instances {
            services.register(ServiceQuery::new("orders", "OrderService"), Arc::new(Noop));
        }
        let state = state_with(services);
        state.shutdown.set_ready();
        state
    }

    #[tokio::test]
    async fn returns_handles_for_matching_services() {
        let state = ready_state_with_orders(2);
        let body = serde_json::to_vec(&ServiceQuery::new("orders", "OrderService")).unwrap();

        let response = query_handler(State(state.clone()), json_headers(), body.clone().into()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let first: Vec<HandleRecord> = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].host, "node-a:8080");

        let response = query_handler(State(state), json_headers(), body.into()).await;
        let second: Vec<HandleRecord> = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn msgpack_request_gets_msgpack_response() {
        let state = ready_state_with_orders(1);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(MSGPACK_CONTENT_TYPE));
        let body = rmp_serde::to_vec_named(&ServiceQuery::new("orders", "OrderService")).unwrap();

        let response = query_handler(State(state), headers, body.into()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            MSGPACK_CONTENT_TYPE
        );
        let records: Vec<HandleRecord> = rmp_serde::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn unknown_query_yields_empty_list() {
        let state = ready_state_with_orders(1);
        let body = serde_json::to_vec(&ServiceQuery::new("billing", "BillingService")).unwrap();

        let response = query_handler(State(state), json_headers(), body.into()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let records: Vec<HandleRecord> = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let state = ready_state_with_orders(1);
        let response = query_handler(State(state), json_headers(), Bytes::from_static(b"{nope")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_query_is_bad_request_and_creates_nothing() {
        let state = ready_state_with_orders(1);
        let body = serde_json::to_vec(&ServiceQuery::new("orders", "")).unwrap();

        let response = query_handler(State(state.clone()), json_headers(), body.into()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(json["error"].as_str().unwrap().contains("contract"));
        assert!(state.handles.is_empty());
    }

    #[tokio::test]
    async fn refuses_queries_before_ready() {
        let body = serde_json::to_vec(&ServiceQuery::new("orders", "OrderService")).unwrap();
        let response = query_handler(State(state()), json_headers(), body.into()).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
