//! Address and sub-protocol validation.

// ============================================================================
// Imports
// ============================================================================

use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashSet;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// HTTP token grammar (RFC 7230 `tchar`), the shape of a sub-protocol name.
static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[!#$%&'*+\-.^_`|~0-9A-Za-z]+$").expect("token regex is valid"));

// ============================================================================
// Functions
// ============================================================================

/// Parses a socket address.
///
/// `http`/`https` are accepted and rewritten to `ws`/`wss`.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if the address does not parse, uses
/// another scheme, or carries a fragment.
pub fn parse_address(address: &str) -> Result<Url> {
    let mut url = Url::parse(address)
        .map_err(|e| Error::invalid_argument(format!("invalid socket address {address:?}: {e}")))?;

    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => {
            return Err(Error::invalid_argument(format!(
                "unsupported socket scheme {other:?}"
            )));
        }
    };

    if url.scheme() != scheme && url.set_scheme(scheme).is_err() {
        return Err(Error::invalid_argument(format!(
            "cannot rewrite {address:?} to scheme {scheme}"
        )));
    }

    if url.fragment().is_some() {
        return Err(Error::invalid_argument(format!(
            "socket address {address:?} must not contain a fragment"
        )));
    }

    Ok(url)
}

/// Validates a requested sub-protocol list.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for a name that is not a token or a
/// name listed twice.
pub fn validate_protocols<S: AsRef<str>>(protocols: &[S]) -> Result<Vec<String>> {
    let mut seen = FxHashSet::default();

    protocols
        .iter()
        .map(|p| {
            let name = p.as_ref();
            if !TOKEN.is_match(name) {
                return Err(Error::invalid_argument(format!(
                    "invalid sub-protocol {name:?}"
                )));
            }
            if !seen.insert(name.to_string()) {
                return Err(Error::invalid_argument(format!(
                    "duplicate sub-protocol {name:?}"
                )));
            }
            Ok(name.to_string())
        })
        .collect()
}

/// Returns the serialized origin of a socket address.
#[inline]
#[must_use]
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

// ============================================================================
// Tests
// ============================================================================
