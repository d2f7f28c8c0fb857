//! Liveness check: `GET /v1/health`.

use serde::{Deserialize, Serialize};

/// Body of `GET /v1/health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Always `"ok"` when the server answers.
    pub status: String,

    /// Which storage backend the server runs on (`"memory"` or `"sqlite"`).
    pub storage: String,

    pub version: String,
}
