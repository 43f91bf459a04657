use axum::{
	Router,
	routing::{get, post},
};

use crate::{State, server};

/// The three operations of the neighbor wire protocol.
pub fn build(router: Router<State>) -> Router<State> {
	router
		.route("/v1/query", post(server::query))
		.route("/v1/chunk/:uid/:index", get(server::chunk))
		.route("/v1/metrics", get(server::metrics))
}
