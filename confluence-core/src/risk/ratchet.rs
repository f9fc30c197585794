//! Trailing-stop ratchet
//!
//! **Core Rule:** a long trailing stop may rise, never fall.
//!
//! The proposed level is `highest_price × (1 − trailing_pct)`. A price that
//! dips after a new high proposes a lower level, which the ratchet ignores.

/// Level in force after proposing `proposed` against `current`.
///
/// Returns `max(current, proposed)`. Non-finite proposals are ignored.
///
/// # Example
/// ```
/// use confluence_core::risk::ratchet_up;
///
/// assert_eq!(ratchet_up(95.0, 100.0), 100.0);
/// assert_eq!(ratchet_up(100.0, 90.0), 100.0);
/// ```
pub fn ratchet_up(current: f64, proposed: f64) -> f64 {
    if proposed.is_finite() {
        current.max(proposed)
    } else {
        current
    }
}
