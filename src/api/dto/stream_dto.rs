//! Stream control DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query string of `GET /ws/stream`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StreamQuery {
    /// Subscriber name matched against envelope targets.
    pub name: String,
}

/// Request body for `POST /streams/quit`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct QuitStreamRequest {
    /// Subscriber name prefix; all streams when absent or empty.
    #[serde(default)]
    pub target: Option<String>,
}

/// Response body for `POST /streams/quit`.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuitStreamResponse {
    /// Streams that were told to close.
    pub closed: usize,
}
