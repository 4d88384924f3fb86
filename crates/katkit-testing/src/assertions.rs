//! Assertions over message sequences.
//!
//! Messages are compared through their canonical string form in one of
//! three modes:
//!
//! - **exact**: each message equals the expected string;
//! - **pattern**: each message matches a regex anchored at its start;
//! - **affix**: each message starts with a prefix and ends with a suffix
//!   (an empty string skips that check).
//!
//! All modes pair messages with expectations positionally and then check
//! the lengths separately, so a surplus or missing message is reported even
//! when every paired element matches.
//!
//! The `check_*` functions return a [`HarnessError`]; the `assert_*`
//! functions and macros panic with the same message.

use crate::error::HarnessError;
use regex::Regex;
use std::fmt::Display;

fn check_msgs_length(actual: usize, expected: usize) -> Result<(), HarnessError> {
    if actual < expected {
        Err(HarnessError::assertion(format!(
            "Too few messages received: expected {expected}, got {actual}."
        )))
    } else if actual > expected {
        Err(HarnessError::assertion(format!(
            "Too many messages received: expected {expected}, got {actual}."
        )))
    } else {
        Ok(())
    }
}

/// Check that each message's canonical form equals the expected string.
pub fn check_msgs_equal<M: Display>(actual: &[M], expected: &[&str]) -> Result<(), HarnessError> {
    for (index, (msg, want)) in actual.iter().zip(expected).enumerate() {
        let got = msg.to_string();
        if got != *want {
            return Err(HarnessError::assertion(format!(
                "Message {index} differs: expected '{want}', got '{got}'."
            )));
        }
    }
    check_msgs_length(actual.len(), expected.len())
}

/// Check that each message's canonical form matches a pattern at its start.
pub fn check_msgs_match<M: Display>(actual: &[M], patterns: &[&str]) -> Result<(), HarnessError> {
    for (msg, pattern) in actual.iter().zip(patterns) {
        let anchored = Regex::new(&format!("^(?:{pattern})"))?;
        let got = msg.to_string();
        if !anchored.is_match(&got) {
            return Err(HarnessError::assertion(format!(
                "Message did not match pattern '{pattern}': {got}"
            )));
        }
    }
    check_msgs_length(actual.len(), patterns.len())
}

/// Check that each message's canonical form has the expected prefix and
/// suffix.
pub fn check_msgs_like<M: Display>(
    actual: &[M],
    expected: &[(&str, &str)],
) -> Result<(), HarnessError> {
    for (msg, (prefix, suffix)) in actual.iter().zip(expected) {
        let got = msg.to_string();
        if !prefix.is_empty() && !got.starts_with(prefix) {
            return Err(HarnessError::assertion(format!(
                "Message '{got}' does not start with '{prefix}'."
            )));
        }
        if !suffix.is_empty() && !got.ends_with(suffix) {
            return Err(HarnessError::assertion(format!(
                "Message '{got}' does not end with '{suffix}'."
            )));
        }
    }
    check_msgs_length(actual.len(), expected.len())
}

/// Assert that each message's canonical form equals the expected string.
///
/// # Panics
///
/// Panics on the first mismatch or on a length mismatch.
#[track_caller]
pub fn assert_msgs_equal<M: Display>(actual: &[M], expected: &[&str]) {
    if let Err(e) = check_msgs_equal(actual, expected) {
        panic!("{e}");
    }
}

/// Assert that each message's canonical form matches a pattern at its start.
///
/// # Panics
///
/// Panics on an invalid pattern, the first mismatch, or a length mismatch.
#[track_caller]
pub fn assert_msgs_match<M: Display>(actual: &[M], patterns: &[&str]) {
    if let Err(e) = check_msgs_match(actual, patterns) {
        panic!("{e}");
    }
}

/// Assert that each message's canonical form has the expected affixes.
///
/// # Panics
///
/// Panics on the first mismatch or on a length mismatch.
#[track_caller]
pub fn assert_msgs_like<M: Display>(actual: &[M], expected: &[(&str, &str)]) {
    if let Err(e) = check_msgs_like(actual, expected) {
        panic!("{e}");
    }
}

/// Assert exact message equality.
///
/// # Example
///
/// ```rust
/// use katkit_core::Message;
/// use katkit_testing::assert_msgs_equal;
///
/// let msgs = vec![Message::reply("watchdog").arg("ok")];
/// assert_msgs_equal!(msgs, ["!watchdog ok"]);
/// ```
#[macro_export]
macro_rules! assert_msgs_equal {
    ($actual:expr, [$($expected:expr),* $(,)?]) => {
        $crate::assertions::assert_msgs_equal(&$actual, &[$($expected),*])
    };
}

/// Assert messages match patterns.
///
/// # Example
///
/// ```rust
/// use katkit_core::Message;
/// use katkit_testing::assert_msgs_match;
///
/// let msgs = vec![Message::reply("watchdog").arg("ok")];
/// assert_msgs_match!(msgs, [r"^!watchdog ok$"]);
/// ```
#[macro_export]
macro_rules! assert_msgs_match {
    ($actual:expr, [$($pattern:expr),* $(,)?]) => {
        $crate::assertions::assert_msgs_match(&$actual, &[$($pattern),*])
    };
}

/// Assert messages have the given `(prefix, suffix)` affixes.
///
/// # Example
///
/// ```rust
/// use katkit_core::Message;
/// use katkit_testing::assert_msgs_like;
///
/// let msgs = vec![Message::reply("slow-command").arg("ok").with_mid(3u64)];
/// assert_msgs_like!(msgs, [("!slow-command[3]", "ok")]);
/// ```
#[macro_export]
macro_rules! assert_msgs_like {
    ($actual:expr, [$($expected:expr),* $(,)?]) => {
        $crate::assertions::assert_msgs_like(&$actual, &[$($expected),*])
    };
}
