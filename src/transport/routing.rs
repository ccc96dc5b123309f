//! Emulate-or-native routing.
//!
//! A target is emulated only when it lives on the same origin as the
//! execution context, since that is the only place the request/response
//! backend can reach it. Socket schemes are mapped to their request
//! equivalents before comparing: `ws` → `http`, `wss` → `https`.

// ============================================================================
// Imports
// ============================================================================

use url::{Origin, Url};

// ============================================================================
// Route
// ============================================================================

/// Where a socket connection is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Emulated over the request/response transport.
    Emulated,
    /// Native duplex channel.
    Native,
}

/// Returns the origin of `url` with its scheme mapped to the request scheme.
#[must_use]
pub fn request_origin(url: &Url) -> Origin {
    let scheme = match url.scheme() {
        "ws" => "http",
        "wss" => "https",
        other => other,
    };

    if scheme == url.scheme() {
        return url.origin();
    }

    let mut normalized = url.clone();
    match normalized.set_scheme(scheme) {
        Ok(()) => normalized.origin(),
        Err(()) => url.origin(),
    }
}

/// Returns `true` if `target` should be carried by the emulation.
#[must_use]
pub fn should_emulate(target: &Url, context_origin: &Url) -> bool {
    let target = request_origin(target);
    target.is_tuple() && target == request_origin(context_origin)
}

/// Picks the [`Route`] for `target`.
#[inline]
#[must_use]
pub fn route(target: &Url, context_origin: &Url) -> Route {
    if should_emulate(target, context_origin) {
        Route::Emulated
    } else {
        Route::Native
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("valid url")
    }

    #[test]
    fn test_same_origin_emulates() {
        let origin = url("http://app.local:8080/");
        assert!(should_emulate(&url("ws://app.local:8080/feed"), &origin));
        assert_eq!(route(&url("ws://app.local:8080/feed"), &origin), Route::Emulated);
    }

    #[test]
    fn test_secure_scheme_maps() {
        let origin = url("https://app.local/");
        assert!(should_emulate(&url("wss://app.local/feed"), &origin));
        assert!(!should_emulate(&url("ws://app.local/feed"), &origin));
    }

    #[test]
    fn test_default_ports_compare_equal() {
        let origin = url("http://app.local/");
        assert!(should_emulate(&url("ws://app.local:80/feed"), &origin));
    }

    #[test]
    fn test_cross_origin_is_native() {
        let origin = url("http://app.local:8080/");
        assert_eq!(route(&url("ws://app.local:9090/"), &origin), Route::Native);
        assert_eq!(route(&url("ws://other.local:8080/"), &origin), Route::Native);
    }
}
