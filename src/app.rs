//! HTTP API of the taxi analysis server

use crate::analysis::{
    AnalysisContext, DataQuality, FareAnalysis, PandemicImpact, PaymentAnalysis,
    TemporalPatterns, TripProfile,
};
use crate::app_state::SharedAppState;
use crate::error::AnalysisError;
use crate::metrics;
use crate::models::{self, CacheStatus, FilterParams, Removed, RetainRequest};
use crate::query::Section;
use crate::validated_json::{ValidatedJson, ValidatedQuery};

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tower::Layer;
use tower::ServiceBuilder;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;

/// Returns a [axum::Router] with all taxi analysis routes
///
/// # Arguments
///
/// * `state`: Shared state holding the analysis context
fn router(state: SharedAppState) -> Router {
    fn v1() -> Router<SharedAppState> {
        Router::new()
            .route("/quality", get(quality))
            .route("/temporal", get(temporal))
            .route("/trip", get(trip))
            .route("/fare", get(fare))
            .route("/payment", get(payment))
            .route("/pandemic", get(pandemic))
            .route("/catalog", get(catalog))
            .route("/cache", get(cache_status).delete(clear_cache))
            .route("/cache/retain", post(retain_sections))
            .layer(
                ServiceBuilder::new().layer(
                    TraceLayer::new_for_http()
                        .on_request(metrics::request_counter)
                        .on_response(metrics::record_response_metrics),
                ),
            )
    }

    Router::new()
        .route("/metrics", get(metrics::metrics_handler))
        .nest("/v1", v1())
        .with_state(state)
}

/// Taxi analysis Service type alias
///
/// This type implements [tower_service::Service].
pub type Service = NormalizePath<Router>;

/// Returns a [crate::app::Service] with all taxi analysis routes
///
/// The service strips trailing slashes from request paths.
///
/// # Arguments
///
/// * `state`: Shared state holding the analysis context
pub fn service(state: SharedAppState) -> Service {
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}

/// Run one façade call on the blocking thread pool.
///
/// A task permit is held for the duration of the call, bounding concurrent analyses.
/// Parallel scans fan out to rayon from the blocking thread. Façade calls must not run on a
/// rayon worker: a worker waiting on a cache slot could steal a request for the same slot.
///
/// # Arguments
///
/// * `state`: Shared application state
/// * `params`: Validated filter parameters
/// * `analysis`: The façade method to call
async fn analyse<T, F>(
    state: SharedAppState,
    params: FilterParams,
    analysis: F,
) -> Result<Json<T>, AnalysisError>
where
    T: Send + 'static,
    F: FnOnce(&AnalysisContext, &FilterParams) -> Result<T, AnalysisError> + Send + 'static,
{
    let _task = state.resource_manager.task().await?;
    let context = Arc::clone(&state.context);
    let result = tokio::task::spawn_blocking(move || analysis(&context, &params)).await??;
    Ok(Json(result))
}

async fn quality(
    State(state): State<SharedAppState>,
    ValidatedQuery(params): ValidatedQuery<FilterParams>,
) -> Result<Json<DataQuality>, AnalysisError> {
    analyse(state, params, AnalysisContext::data_quality).await
}

async fn temporal(
    State(state): State<SharedAppState>,
    ValidatedQuery(params): ValidatedQuery<FilterParams>,
) -> Result<Json<TemporalPatterns>, AnalysisError> {
    analyse(state, params, AnalysisContext::temporal_patterns).await
}

async fn trip(
    State(state): State<SharedAppState>,
    ValidatedQuery(params): ValidatedQuery<FilterParams>,
) -> Result<Json<TripProfile>, AnalysisError> {
    analyse(state, params, AnalysisContext::trip_profile).await
}

async fn fare(
    State(state): State<SharedAppState>,
    ValidatedQuery(params): ValidatedQuery<FilterParams>,
) -> Result<Json<FareAnalysis>, AnalysisError> {
    analyse(state, params, AnalysisContext::fare_analysis).await
}

async fn payment(
    State(state): State<SharedAppState>,
    ValidatedQuery(params): ValidatedQuery<FilterParams>,
) -> Result<Json<PaymentAnalysis>, AnalysisError> {
    analyse(state, params, AnalysisContext::payment_analysis).await
}

async fn pandemic(
    State(state): State<SharedAppState>,
    ValidatedQuery(params): ValidatedQuery<FilterParams>,
) -> Result<Json<PandemicImpact>, AnalysisError> {
    analyse(state, params, AnalysisContext::pandemic_impact).await
}

async fn catalog() -> Json<BTreeMap<Section, Vec<&'static str>>> {
    Json(models::catalog())
}

async fn cache_status(State(state): State<SharedAppState>) -> Json<CacheStatus> {
    let cache = state.context.cache();
    Json(CacheStatus {
        entries: cache.len(),
        sections: cache.section_counts(),
    })
}

async fn clear_cache(State(state): State<SharedAppState>) -> Json<Removed> {
    Json(Removed {
        removed: state.context.clear_cache(),
    })
}

async fn retain_sections(
    State(state): State<SharedAppState>,
    ValidatedJson(request): ValidatedJson<RetainRequest>,
) -> Json<Removed> {
    Json(Removed {
        removed: state.context.retain_sections(&request.sections()),
    })
}
