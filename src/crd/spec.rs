//! # CustomSecret Spec
//!
//! Desired state for a generated secret.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// CustomSecret Custom Resource Definition
///
/// Declares that a Kubernetes `Secret` named `<name>-secret` holding generated
/// credentials should exist next to this resource, optionally rotated on a
/// fixed period.
///
/// # Example
///
/// ```yaml
/// apiVersion: app.mydomain.com/v1
/// kind: CustomSecret
/// metadata:
///   name: alice
///   namespace: default
/// spec:
///   secretType: basic-auth
///   username: ""
///   passwordLength: 12
///   rotationPeriod: 1h
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "CustomSecret",
    group = "app.mydomain.com",
    version = "v1",
    namespaced,
    status = "crate::crd::CustomSecretStatus",
    shortname = "csec",
    printcolumn = r#"{"name":"Type", "type":"string", "jsonPath":".spec.secretType"}, {"name":"Secret", "type":"string", "jsonPath":".status.secretName"}, {"name":"Last Updated", "type":"string", "jsonPath":".status.lastUpdated"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CustomSecretSpec {
    /// Kind of secret to generate: `basic-auth` or `jwt`
    /// Kept as a plain string so that values outside the enum still reach the
    /// reconciler and are reported instead of failing deserialization
    pub secret_type: String,
    /// Username for `basic-auth` secrets, defaults to `admin` when empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Number of characters in the generated `basic-auth` password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_length: Option<i64>,
    /// How often the secret is regenerated
    /// Format: Go duration string (e.g., "90s", "1h", "24h", "1h30m")
    /// Empty or unset disables rotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_period: Option<String>,
}

impl CustomSecretSpec {
    /// Rotation period with the empty string folded into "not set"
    ///
    /// Any other value, whitespace included, is handed to the duration parser
    /// as written.
    #[must_use]
    pub fn rotation_period(&self) -> Option<&str> {
        self.rotation_period
            .as_deref()
            .filter(|period| !period.is_empty())
    }
}

/// Secret kinds the generator knows how to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretKind {
    /// `username` + random alphanumeric `password`
    BasicAuth,
    /// Placeholder `jwt` token
    Jwt,
}

impl SecretKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretKind::BasicAuth => "basic-auth",
            SecretKind::Jwt => "jwt",
        }
    }
}

impl fmt::Display for SecretKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecretKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic-auth" => Ok(SecretKind::BasicAuth),
            "jwt" => Ok(SecretKind::Jwt),
            other => Err(other.to_string()),
        }
    }
}
