use crate::config::AppConfig;
use crate::error::PipeError;
use http::header::AUTHORIZATION;
use rustc_hash::FxHashSet;

/// Compact key index used in hot-path authentication.
pub enum AllowedClientKeys {
    /// No keys configured: every request is accepted.
    Disabled,
    /// Stored pre-formatted as the full `Bearer <key>` header value.
    Single { bearer: Box<str> },
    Multiple(FxHashSet<String>),
}

/// Extract the `Authorization: Bearer <key>` API key.
///
/// # Errors
///
/// Returns `PipeError::Auth` when no bearer key is present.
pub fn extract_api_key(headers: &http::HeaderMap) -> Result<&str, PipeError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or_else(|| PipeError::Auth("Missing API key".to_string()))
}

/// Authenticate an incoming request against pre-indexed `allowed_keys`.
///
/// # Errors
///
/// Returns `PipeError::Auth` when the API key is missing or invalid.
pub fn authenticate(
    headers: &http::HeaderMap,
    allowed_keys: &AllowedClientKeys,
) -> Result<(), PipeError> {
    match allowed_keys {
        AllowedClientKeys::Disabled => Ok(()),
        AllowedClientKeys::Single { bearer } => match headers.get(AUTHORIZATION) {
            Some(value) if value.as_bytes() == bearer.as_bytes() => Ok(()),
            Some(_) => Err(PipeError::Auth("Invalid API key".to_string())),
            None => Err(PipeError::Auth("Missing API key".to_string())),
        },
        AllowedClientKeys::Multiple(allowed_set) => {
            let client_key = extract_api_key(headers)?;
            if allowed_set.contains(client_key) {
                Ok(())
            } else {
                Err(PipeError::Auth("Invalid API key".to_string()))
            }
        }
    }
}

/// Build a hash-set index for allowed client keys.
#[must_use]
pub fn build_allowed_key_set(config: &AppConfig) -> AllowedClientKeys {
    let mut allowed_set: FxHashSet<String> = config
        .client_authentication
        .allowed_keys
        .iter()
        .cloned()
        .collect();

    match allowed_set.len() {
        0 => AllowedClientKeys::Disabled,
        1 => match allowed_set.drain().next() {
            Some(single_key) => AllowedClientKeys::Single {
                bearer: format!("Bearer {single_key}").into_boxed_str(),
            },
            None => AllowedClientKeys::Disabled,
        },
        _ => AllowedClientKeys::Multiple(allowed_set),
    }
}
