use axum::{
	Json,
	extract::{Path, State},
};
use queryfan_core::proto::{ChunkResponse, Status};
use tracing::trace;

/// `GetChunk`: either a valid chunk or a terminal status, returned verbatim
/// from the cache.
pub(crate) async fn chunk(
	State(services): State<crate::State>,
	Path((uid, index)): Path<(String, u32)>,
) -> Json<ChunkResponse> {
	match services.cache.get_chunk(&uid, index) {
		| Ok(chunk) => Json(chunk),
		| Err(e) => {
			trace!(%uid, index, "chunk lookup failed: {e}");
			Json(ChunkResponse {
				uid,
				index,
				total_chunks: 0,
				data: String::new(),
				is_last: true,
				status: match e.status() {
					| status @ (Status::UidUnknown | Status::UidExpired) => status,
					| _ => Status::InternalError,
				},
			})
		},
	}
}
