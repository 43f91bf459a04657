use axum::{Json, extract::State};
use queryfan_core::proto::MetricsResponse;

/// `GetMetrics`: the tracker's counters and rolling statistics, verbatim.
pub(crate) async fn metrics(State(services): State<crate::State>) -> Json<MetricsResponse> {
	let server = &services.server;
	let local = server.local();
	let ledger = services.admission.snapshot();

	Json(MetricsResponse {
		process_id: server.id,
		role: local.role,
		team: local.team,
		active_requests: ledger.active_total,
		queue_size: 0,
		avg_processing_time_ms: server.metrics.avg_query_ms(),
		data_files_loaded: services.data.files_loaded() as u32,
		is_healthy: server.running(),
	})
}
