use std::{borrow::Cow, fmt};

use axum::response::IntoResponse;
use http::StatusCode;

use crate::{
	overlay::{NodeId, Team},
	proto::Status,
};

#[derive(thiserror::Error)]
pub enum Error {
	// std
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
	#[error("{0}")]
	Utf8(#[from] std::str::Utf8Error),
	#[error("{0}")]
	ParseInt(#[from] std::num::ParseIntError),

	// third-party
	#[error("Join error: {0}")]
	Join(#[from] tokio::task::JoinError),
	#[error("Config error: {0}")]
	Figment(#[from] figment::Error),
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
	#[error("Request error: {0}")]
	Reqwest(#[from] reqwest::Error),
	#[error("{0}")]
	Http(#[from] http::Error),
	#[error("{0}")]
	Base64(#[from] base64::DecodeError),

	// queryfan
	#[error("There was a problem with the '{0}' directive in your configuration: {1}")]
	Config(&'static str, Cow<'static, str>),
	#[error("admission rejected, team {0} budget exhausted")]
	CapacityExhausted(Team),
	#[error("node already present in hops")]
	LoopSuppressed,
	#[error("neighbor {0} unreachable: {1}")]
	NeighborUnreachable(NodeId, Cow<'static, str>),
	#[error("unknown result uid {0}")]
	UidUnknown(String),
	#[error("result uid {0} expired")]
	UidExpired(String),

	// unique / untyped
	#[error("{0}")]
	Err(Cow<'static, str>),
}

impl Error {
	/// The wire status this error surfaces as.
	pub fn status(&self) -> Status {
		match self {
			| Self::CapacityExhausted(_) => Status::CapacityExhausted,
			| Self::LoopSuppressed => Status::LoopSuppressed,
			| Self::NeighborUnreachable(..) | Self::Reqwest(_) => Status::NeighborUnreachable,
			| Self::UidUnknown(_) => Status::UidUnknown,
			| Self::UidExpired(_) => Status::UidExpired,
			| _ => Status::InternalError,
		}
	}

	pub fn status_code(&self) -> StatusCode {
		match self {
			| Self::CapacityExhausted(_) => StatusCode::TOO_MANY_REQUESTS,
			| Self::LoopSuppressed => StatusCode::OK,
			| Self::NeighborUnreachable(..) => StatusCode::BAD_GATEWAY,
			| Self::UidUnknown(_) => StatusCode::NOT_FOUND,
			| Self::UidExpired(_) => StatusCode::GONE,
			| _ => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl fmt::Debug for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{self}") }
}

impl IntoResponse for Error {
	fn into_response(self) -> axum::response::Response {
		let body = serde_json::json!({
			"status": self.status(),
			"message": self.to_string(),
		});

		(self.status_code(), axum::Json(body)).into_response()
	}
}
