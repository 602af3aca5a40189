use crate::api::error::ApiError;

/// Deliberate kill-switch: the on-server camera test surface is disabled
/// and answers 503 instead of being removed, so clients get an explicit
/// signal rather than a 404.
pub async fn camera_test() -> ApiError {
    ApiError::Disabled("camera test endpoints are disabled")
}
