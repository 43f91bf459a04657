use std::{any::Any, sync::Arc, time::Duration};

use axum::{Router, extract::DefaultBodyLimit};
use http::StatusCode;
use queryfan_api::State;
use queryfan_core::proto::Status;
use queryfan_service::Services;
use tower::ServiceBuilder;
use tower_http::{
	catch_panic::CatchPanicLayer,
	timeout::TimeoutLayer,
	trace::{DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

const BODY_LIMIT: usize = 1024 * 1024;

pub(crate) fn build(services: &Arc<Services>) -> axum::routing::IntoMakeService<Router> {
	let layers = ServiceBuilder::new()
		.layer(
			TraceLayer::new_for_http()
				.on_failure(DefaultOnFailure::new().level(Level::ERROR))
				.on_request(DefaultOnRequest::new().level(Level::TRACE))
				.on_response(DefaultOnResponse::new().level(Level::DEBUG)),
		)
		.layer(TimeoutLayer::new(Duration::from_secs(
			services.server.config.client.request_timeout,
		)))
		.layer(DefaultBodyLimit::max(BODY_LIMIT))
		.layer(CatchPanicLayer::custom(catch_panic));

	let state: State = services.clone();
	let router = queryfan_api::router::build(Router::new())
		.layer(layers)
		.with_state(state);

	router.into_make_service()
}

/// Unexpected panics inside a handler must not kill the process; they map to
/// an `INTERNAL_ERROR` response at the transport boundary.
#[allow(clippy::needless_pass_by_value)]
fn catch_panic(panic: Box<dyn Any + Send + 'static>) -> http::Response<axum::body::Body> {
	let detail = panic
		.downcast_ref::<&str>()
		.map(ToString::to_string)
		.or_else(|| panic.downcast_ref::<String>().cloned())
		.unwrap_or_else(|| "unknown panic".to_owned());

	tracing::error!("request handler panicked: {detail}");

	let body = serde_json::json!({
		"status": Status::InternalError,
		"message": "internal error",
	});

	http::Response::builder()
		.status(StatusCode::INTERNAL_SERVER_ERROR)
		.header(http::header::CONTENT_TYPE, "application/json")
		.body(axum::body::Body::from(body.to_string()))
		.expect("static response builds")
}
