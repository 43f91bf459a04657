use axum::{Json, extract::State};
use queryfan_core::proto::{QueryRequest, QueryResponse};

/// `Query`: admit, orchestrate, and answer with result metadata. Domain
/// outcomes (rejection, loop suppression) ride in the body status.
pub(crate) async fn query(
	State(services): State<crate::State>,
	Json(request): Json<QueryRequest>,
) -> Json<QueryResponse> {
	Json(services.orchestrator.handle_query(request).await)
}
