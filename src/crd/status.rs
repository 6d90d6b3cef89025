//! # CustomSecret Status
//!
//! Observed state, owned exclusively by the reconciler.

use serde::{Deserialize, Serialize};

/// Status of the CustomSecret resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomSecretStatus {
    /// Time of the last successful generation (RFC3339)
    #[serde(default)]
    pub last_updated: String,
    /// Name of the Secret holding the generated material
    #[serde(default)]
    pub secret_name: String,
    /// `metadata.generation` of the spec the current Secret was generated from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}
