//! Classification of raw automation-layer error messages.
//!
//! Browser automation surfaces many benign races while pages navigate or tear
//! down. Those must not trip the circuit breaker. A separate class covers
//! profile/lock conflicts, where the fix is process cleanup, not a reconnect.

use sessionkeeper_types::TransportError;

/// Benign races during teardown/navigation (matched case-insensitively).
pub const TRANSIENT_PATTERNS: &[&str] = &[
    "target closed",
    "session closed",
    "protocol error",
    "execution context was destroyed",
    "page has been closed",
    "page closed",
    "requesting main frame too early",
    "cannot find context with specified id",
    "navigation failed because browser has disconnected",
];

/// Another browser owns the profile, or the browser binary is misconfigured.
pub const LOCK_CONFLICT_PATTERNS: &[&str] = &[
    "already running",
    "profile directory",
    "profile appears to be in use",
    "singletonlock",
    "processsingleton",
    "executablepath",
    "could not find expected browser",
    "failed to launch the browser process",
];

/// Map a raw message to a tagged [`TransportError`].
///
/// Lock conflicts win over transient matches: a launch failure that also
/// mentions a closed target still needs cleanup.
pub fn classify_message(message: &str) -> TransportError {
    let lower = message.to_lowercase();

    if LOCK_CONFLICT_PATTERNS.iter().any(|p| lower.contains(p)) {
        return TransportError::lock_conflict(message);
    }
    if TRANSIENT_PATTERNS.iter().any(|p| lower.contains(p)) {
        return TransportError::transient(message);
    }
    TransportError::critical(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessionkeeper_types::ErrorClass;

    #[test]
    fn test_transient_fixtures() {
        let fixtures = [
            "Protocol error (Runtime.callFunctionOn): Target closed.",
            "Protocol error (Network.getResponseBody): Session closed. Most likely the page has been closed.",
            "Execution context was destroyed, most likely because of a navigation.",
            "Requesting main frame too early!",
            "Navigation failed because browser has disconnected!",
        ];
        for msg in fixtures {
            assert_eq!(classify_message(msg).class(), ErrorClass::Transient, "{msg}");
        }
    }

    #[test]
    fn test_lock_conflict_fixtures() {
        let fixtures = [
            "The browser is already running for /data/sessions/session-sales. Use a different `userDataDir` or stop the running browser first.",
            "Failed to create /data/sessions/a/SingletonLock: File exists",
            "The profile appears to be in use by another Chromium process",
            "Could not find expected browser (chrome) locally. Specify executablePath.",
        ];
        for msg in fixtures {
            assert_eq!(classify_message(msg).class(), ErrorClass::LockConflict, "{msg}");
        }
    }

    #[test]
    fn test_unmatched_is_critical() {
        let err = classify_message("net::ERR_NAME_NOT_RESOLVED at https://web.whatsapp.com");
        assert_eq!(err.class(), ErrorClass::Critical);
        assert!(err.message().contains("ERR_NAME_NOT_RESOLVED"));
    }

    #[test]
    fn test_lock_conflict_wins_over_transient() {
        let err = classify_message("Failed to launch the browser process! Target closed");
        assert_eq!(err.class(), ErrorClass::LockConflict);
    }
}
