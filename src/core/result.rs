use crate::Error;

/// Result type alias used across the workspace. Defaults the Ok-type to unit
/// and the Err-type to our Error.
pub type Result<T = (), E = Error> = std::result::Result<T, E>;
