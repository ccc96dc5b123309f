//! Close codes and close argument rules.

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Normal closure.
pub const NORMAL_CLOSURE: u16 = 1000;

/// No status code was present in the close notification.
pub const NO_STATUS_RECEIVED: u16 = 1005;

/// Connection dropped without a close notification (transport failure).
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Maximum close reason length in UTF-8 bytes.
pub const MAX_REASON_BYTES: usize = 123;

// ============================================================================
// Validation
// ============================================================================

/// Validates the arguments of an application-initiated close.
///
/// Applications may only use 1000 or the 3000-4999 range; the reason must
/// fit in [`MAX_REASON_BYTES`].
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if either argument is out of range.
pub fn validate(code: u16, reason: &str) -> Result<()> {
    if code != NORMAL_CLOSURE && !(3000..=4999).contains(&code) {
        return Err(Error::invalid_argument(format!(
            "close code {code} is neither 1000 nor in 3000-4999"
        )));
    }

    if reason.len() > MAX_REASON_BYTES {
        return Err(Error::invalid_argument(format!(
            "close reason is {} bytes, limit is {MAX_REASON_BYTES}",
            reason.len()
        )));
    }

    Ok(())
}

/// Returns `true` if `code` denotes a clean close.
#[inline]
#[must_use]
pub const fn is_clean(code: u16) -> bool {
    code == NORMAL_CLOSURE
}

// ============================================================================
// Tests
// ============================================================================
