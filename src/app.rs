use crate::app_state::{AppState, SharedAppState};
use crate::cli::CommandLineArgs;
use crate::error::VizzError;
use crate::metrics;
use crate::operation::Query;
use crate::operations;
use crate::validated_query::ValidatedQuery;

use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;
use std::time::Duration;
use tower::Layer;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

/// Application service: the router with trailing slashes removed from request paths.
pub type Service = NormalizePath<Router>;

/// Returns a [Router] serving the query API over `state`.
///
/// # Arguments
///
/// * `state`: Shared application state
/// * `request_timeout`: Maximum time to spend on a single request
pub fn router(state: SharedAppState, request_timeout: Duration) -> Router {
    fn api() -> Router<SharedAppState> {
        Router::new()
            .route("/options", get(query_handler::<operations::Options>))
            .route("/materials", get(query_handler::<operations::Materials>))
            .route("/months", get(query_handler::<operations::Months>))
            .route("/data", get(query_handler::<operations::Data>))
            .route("/compare", get(query_handler::<operations::Compare>))
    }

    Router::new()
        .nest("/api", api())
        .route("/metrics", get(metrics::metrics_handler))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .on_request(metrics::request_counter)
                        .on_response(metrics::record_response_metrics),
                )
                .layer(TimeoutLayer::new(request_timeout))
                // The frontend is served from another origin.
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Returns the application [Service], opening the document store selected on the command line.
///
/// # Arguments
///
/// * `args`: Command line arguments
pub fn service(args: &CommandLineArgs) -> Result<Service, VizzError> {
    let state = Arc::new(AppState::new(args)?);
    let router = router(state, args.request_timeout());
    Ok(NormalizePathLayer::trim_trailing_slash().layer(router))
}

/// Handler for query operations
///
/// Executes the query `Q` against the shared document store and returns its output as JSON.
///
/// # Arguments
///
/// * `state`: Shared application state
/// * `params`: Validated query parameters
async fn query_handler<Q: Query>(
    State(state): State<SharedAppState>,
    ValidatedQuery(params): ValidatedQuery<Q::Params>,
) -> Result<Json<Q::Output>, VizzError> {
    tracing::debug!("{} query with {:?}", Q::NAME, params);
    let output = Q::execute(state.store.as_ref(), &params)
        .instrument(tracing::info_span!("query", name = Q::NAME))
        .await?;
    Ok(Json(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::INTERNAL_SERVER_ERROR_MESSAGE;
    use crate::store::memory_store::MemoryStore;
    use crate::store::{DocumentStore, Record};
    use crate::test_utils;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{self, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt; // for `oneshot`

    fn test_state(store: impl DocumentStore + 'static) -> SharedAppState {
        Arc::new(AppState::with_store(Arc::new(store)))
    }

    async fn get_request(app: Router, uri: &str) -> Response {
        app.oneshot(
            Request::builder()
                .method(http::Method::GET)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn get(uri: &str) -> Response {
        let app = router(
            test_state(test_utils::get_test_store()),
            Duration::from_secs(5),
        );
        get_request(app, uri).await
    }

    // Jump through the hoops to get the body as JSON.
    async fn body_json(response: Response) -> Value {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn options() {
        let response = get("/api/options").await;
        assert_eq!(StatusCode::OK, response.status());
        assert_eq!(
            json!({"years": ["2019", "2020"]}),
            body_json(response).await
        );
    }

    #[tokio::test]
    async fn materials() {
        let response = get("/api/materials?year=2019").await;
        assert_eq!(StatusCode::OK, response.status());
        assert_eq!(
            json!({"materials": ["Aluminium", "brass"]}),
            body_json(response).await
        );
    }

    #[tokio::test]
    async fn materials_missing_year() {
        for uri in ["/api/materials", "/api/materials?year="] {
            let response = get(uri).await;
            assert_eq!(StatusCode::BAD_REQUEST, response.status());
            let body = body_json(response).await;
            assert_eq!(json!("request parameters are not valid"), body["error"]);
            assert!(body["caused_by"][0]
                .as_str()
                .unwrap()
                .contains("year is required"));
        }
    }

    #[tokio::test]
    async fn materials_absent_year() {
        let response = get("/api/materials?year=1999").await;
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, response.status());
        assert_eq!(
            json!({"error": INTERNAL_SERVER_ERROR_MESSAGE}),
            body_json(response).await
        );
    }

    #[tokio::test]
    async fn months() {
        let response = get("/api/months?year=2020&material=Steel").await;
        assert_eq!(StatusCode::OK, response.status());
        assert_eq!(json!({"months": ["Jan", "Feb"]}), body_json(response).await);
    }

    #[tokio::test]
    async fn months_missing_material() {
        let response = get("/api/months?year=2020").await;
        assert_eq!(StatusCode::BAD_REQUEST, response.status());
    }

    #[tokio::test]
    async fn data_missing_material() {
        for uri in ["/api/data?year=2020", "/api/data?year=2020&material="] {
            let response = get(uri).await;
            assert_eq!(StatusCode::BAD_REQUEST, response.status());
            let body = body_json(response).await;
            let causes = body["caused_by"][0].as_str().unwrap();
            assert!(causes.contains("material is required"), "{causes}");
            assert!(!causes.contains("year is required"), "{causes}");
        }
    }

    #[tokio::test]
    async fn data_all() {
        let response = get("/api/data?year=2020&material=All").await;
        assert_eq!(StatusCode::OK, response.status());
        assert_eq!(
            json!({"data": {"JAN": 15, "FEB": 25}}),
            body_json(response).await
        );
    }

    #[tokio::test]
    async fn data_material_with_space() {
        let store = MemoryStore::new().with_partition(
            "2020",
            vec![test_utils::record(
                json!({"Material": "Mild Steel", "Jan": 1.5, "jan": 1}),
            )],
        );
        let app = router(test_state(store), Duration::from_secs(5));
        let response = get_request(app, "/api/data?year=2020&material=Mild%20Steel").await;
        assert_eq!(StatusCode::OK, response.status());
        assert_eq!(json!({"data": {"JAN": 2.5}}), body_json(response).await);
    }

    #[tokio::test]
    async fn compare() {
        let response = get("/api/compare?year=2020&month1=Jan&month2=Feb").await;
        assert_eq!(StatusCode::OK, response.status());
        assert_eq!(
            json!([
                {"material": "Steel", "percentageDifference": "100.00"},
                {"material": "Wood", "percentageDifference": "undefined"},
            ]),
            body_json(response).await
        );
    }

    #[tokio::test]
    async fn compare_missing_months() {
        let response = get("/api/compare?year=2020").await;
        assert_eq!(StatusCode::BAD_REQUEST, response.status());
        let body = body_json(response).await;
        let causes = body["caused_by"][0].as_str().unwrap();
        assert!(causes.contains("month1 is required"), "{causes}");
        assert!(causes.contains("month2 is required"), "{causes}");
        assert!(!causes.contains("year is required"), "{causes}");
    }

    #[tokio::test]
    async fn metrics() {
        let response = get("/metrics").await;
        assert_eq!(StatusCode::OK, response.status());
    }

    #[tokio::test]
    async fn unknown_route() {
        let response = get("/api/nothing").await;
        assert_eq!(StatusCode::NOT_FOUND, response.status());
    }

    #[tokio::test]
    async fn trailing_slash() {
        let app = NormalizePathLayer::trim_trailing_slash().layer(router(
            test_state(test_utils::get_test_store()),
            Duration::from_secs(5),
        ));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/options/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, response.status());
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let app = router(
            test_state(test_utils::get_test_store()),
            Duration::from_secs(5),
        );
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/options")
                    .header(http::header::ORIGIN, "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            "*",
            response.headers()[http::header::ACCESS_CONTROL_ALLOW_ORIGIN]
        );
    }

    /// A store that never answers in time.
    struct SlowStore {}

    #[async_trait]
    impl DocumentStore for SlowStore {
        async fn list_partitions(&self) -> Result<Vec<String>, VizzError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![])
        }

        async fn find_all(&self, _partition: &str) -> Result<Vec<Record>, VizzError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn request_timeout() {
        let app = router(test_state(SlowStore {}), Duration::from_millis(10));
        let response = get_request(app, "/api/options").await;
        assert_eq!(StatusCode::REQUEST_TIMEOUT, response.status());
    }
}
