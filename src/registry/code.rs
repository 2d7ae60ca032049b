//! Join-code allocation.
//!
//! Codes are 5-digit integers drawn uniformly from a fixed range. Uniqueness
//! only holds among currently active sessions, so this function must be
//! called while holding the registry's code-index lock: the uniqueness check
//! and the insertion that claims the code form one critical section.

use std::collections::HashSet;

use rand::Rng;

/// Inclusive bounds of the join-code space (always 5 digits).
pub const CODE_MIN: u32 = 10_000;
pub const CODE_MAX: u32 = 99_999;

/// Bounded collision retries before giving up. With a 90 000-code space this
/// only trips when the active-session count approaches the space size.
const MAX_ATTEMPTS: usize = 32;

/// Draw a code not present in `existing`.
///
/// # Errors
///
/// Returns [`CodeSpaceExhausted`] after the bounded retry budget so creation
/// fails fast instead of looping forever.
pub fn allocate(existing: &HashSet<u32>) -> Result<u32, CodeSpaceExhausted> {
    let mut rng = rand::thread_rng();
    for _ in 0..MAX_ATTEMPTS {
        let code = rng.gen_range(CODE_MIN..=CODE_MAX);
        if !existing.contains(&code) {
            return Ok(code);
        }
    }
    Err(CodeSpaceExhausted)
}

/// The retry budget ran out; creation should fail with a retryable conflict.
#[derive(Debug, thiserror::Error)]
#[error("join code space exhausted")]
pub struct CodeSpaceExhausted;
