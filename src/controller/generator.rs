//! # Credential Generator
//!
//! Produces the payload of the Secret for a requested secret kind.
//!
//! Generation is a pure function of its inputs plus the OS random source.
//! Nothing here touches the cluster.
//!
//! ## Password alphabet
//!
//! Passwords draw one random byte per character and map it `byte % 62` into
//! `a-z`, `A-Z`, `0-9` (in that order). Since 256 is not a multiple of 62 the
//! first 8 characters of the alphabet (`a`..`h`) are drawn 5 times out of 256
//! rather than 4, roughly 25% more often than the rest. This keeps the output
//! distribution identical to existing deployments of the controller.
//! TODO: switch to rejection sampling once consumers accept a changed distribution.

use k8s_openapi::ByteString;
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

use crate::crd::SecretKind;

/// Username used for `basic-auth` secrets when none is given
pub const DEFAULT_USERNAME: &str = "admin";

/// Token stored in `jwt` secrets
///
/// JWT issuance is not implemented; the field carries this literal value.
pub const JWT_PLACEHOLDER_TOKEN: &str = "dummy-jwt-token";

/// Characters a generated password is made of
pub const PASSWORD_ALPHABET: &[u8; 62] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const FIELD_USERNAME: &str = "username";
pub const FIELD_PASSWORD: &str = "password";
pub const FIELD_JWT: &str = "jwt";

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("unsupported secret type '{0}' (expected 'basic-auth' or 'jwt')")]
    UnsupportedKind(String),
    #[error("passwordLength must not be negative, got {0}")]
    InvalidPasswordLength(i64),
    #[error("failed to read from the OS random source: {0}")]
    Entropy(#[from] rand::Error),
}

/// Generated secret payload: field name to raw bytes
///
/// Values are zeroed when the material is dropped and never printed by `Debug`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretMaterial {
    fields: BTreeMap<String, Vec<u8>>,
}

impl SecretMaterial {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.fields.insert(field.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[u8]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Field value as UTF-8, `None` if missing or not valid UTF-8
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(|v| std::str::from_utf8(v).ok())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert into the `data` map of a Kubernetes Secret
    ///
    /// The returned buffers are plain copies and are not zeroized on drop.
    /// Callers must scrub them once the Secret has been sent, see
    /// `store::cluster::scrub_secret`.
    #[must_use]
    pub fn to_secret_data(&self) -> BTreeMap<String, ByteString> {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), ByteString(v.clone())))
            .collect()
    }
}

impl Drop for SecretMaterial {
    fn drop(&mut self) {
        for value in self.fields.values_mut() {
            value.zeroize();
        }
    }
}

impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretMaterial")
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Generate secret material for `kind`
///
/// `username` and `password_length` are only read for `basic-auth`. A missing
/// password length behaves like zero and yields an empty password.
///
/// # Errors
///
/// - [`GeneratorError::UnsupportedKind`] if `kind` is neither `basic-auth` nor `jwt`
/// - [`GeneratorError::InvalidPasswordLength`] for a negative length
/// - [`GeneratorError::Entropy`] if the OS random source fails
pub fn generate(
    kind: &str,
    username: Option<&str>,
    password_length: Option<i64>,
) -> Result<SecretMaterial, GeneratorError> {
    let kind: SecretKind = kind.parse().map_err(GeneratorError::UnsupportedKind)?;

    let mut material = SecretMaterial::new();
    match kind {
        SecretKind::BasicAuth => {
            let username = username
                .filter(|u| !u.is_empty())
                .unwrap_or(DEFAULT_USERNAME);
            let length = password_length.unwrap_or(0);
            let length = usize::try_from(length)
                .ok()
                .ok_or(GeneratorError::InvalidPasswordLength(length))?;
            let password = random_password(length)?;

            material.insert(FIELD_USERNAME, username);
            material.insert(FIELD_PASSWORD, password.as_bytes());
        }
        SecretKind::Jwt => {
            material.insert(FIELD_JWT, JWT_PLACEHOLDER_TOKEN);
        }
    }

    Ok(material)
}

/// Random password of exactly `length` characters from [`PASSWORD_ALPHABET`]
///
/// # Errors
///
/// Returns [`GeneratorError::Entropy`] if the OS random source fails.
pub fn random_password(length: usize) -> Result<Zeroizing<String>, GeneratorError> {
    let mut bytes = Zeroizing::new(vec![0u8; length]);
    OsRng.try_fill_bytes(&mut bytes)?;

    let password = bytes
        .iter()
        .map(|b| char::from(PASSWORD_ALPHABET[usize::from(*b) % PASSWORD_ALPHABET.len()]))
        .collect::<String>();

    Ok(Zeroizing::new(password))
}
