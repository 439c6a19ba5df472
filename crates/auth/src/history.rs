//! Password history: minimum-age and non-reuse enforcement.
//!
//! The history is newest-first and bounded; the current password is always
//! the head record, so reuse checks cover it without a separate comparison.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Most recent hashes retained (and checked for reuse).
pub const HISTORY_CAPACITY: usize = 12;

/// Minimum age before a password may be changed again.
pub fn min_password_age() -> Duration {
    Duration::hours(24)
}

/// One prior (or current) password.
///
/// Invariant: never stores plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordRecord {
    pub hash: String,
    pub changed_at: DateTime<Utc>,
}

/// Bounded, newest-first sequence of password records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHistory {
    records: Vec<PasswordRecord>,
}

impl PasswordHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a history with an initial record.
    pub fn starting_with(hash: String, changed_at: DateTime<Utc>) -> Self {
        Self {
            records: vec![PasswordRecord { hash, changed_at }],
        }
    }

    /// The current password record (head of the history).
    pub fn current(&self) -> Option<&PasswordRecord> {
        self.records.first()
    }

    /// Prepend a new record, dropping the oldest beyond capacity.
    pub fn push(&mut self, hash: String, changed_at: DateTime<Utc>) {
        self.records.insert(0, PasswordRecord { hash, changed_at });
        self.records.truncate(HISTORY_CAPACITY);
    }

    pub fn iter(&self) -> impl Iterator<Item = &PasswordRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Why a password change was refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDenied {
    #[error("password was changed less than 24 hours ago")]
    TooRecent,

    #[error("password was used recently and cannot be reused")]
    Reused,
}

/// Decide whether a password change may proceed.
///
/// `reuses` must be the same verify primitive used for current-password
/// checks, applied to each stored hash sequentially; the scan short-circuits
/// on the first match.
pub fn can_change<F>(
    now: DateTime<Utc>,
    last_changed_at: DateTime<Utc>,
    history: &PasswordHistory,
    mut reuses: F,
) -> Result<(), ChangeDenied>
where
    F: FnMut(&str) -> bool,
{
    if now - last_changed_at < min_password_age() {
        return Err(ChangeDenied::TooRecent);
    }

    if history
        .iter()
        .take(HISTORY_CAPACITY)
        .any(|record| reuses(&record.hash))
    {
        return Err(ChangeDenied::Reused);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reuse checks are parameterized over the verify primitive, so tests can
    // use plain equality instead of a real (slow) hash.
    fn fake_digest(plaintext: &str) -> String {
        format!("digest:{plaintext}")
    }

    fn matches(candidate: &str) -> impl FnMut(&str) -> bool + '_ {
        move |stored| stored == fake_digest(candidate)
    }

    #[test]
    fn change_within_24h_is_too_recent() {
        let now = Utc::now();
        let history = PasswordHistory::starting_with(fake_digest("p1"), now - Duration::hours(1));

        let denied = can_change(
            now,
            history.current().unwrap().changed_at,
            &history,
            matches("p2"),
        )
        .unwrap_err();
        assert_eq!(denied, ChangeDenied::TooRecent);
    }

    #[test]
    fn reusing_a_recent_password_is_denied() {
        let now = Utc::now();
        let mut history =
            PasswordHistory::starting_with(fake_digest("p1"), now - Duration::days(30));
        history.push(fake_digest("p2"), now - Duration::days(2));

        let denied = can_change(
            now,
            history.current().unwrap().changed_at,
            &history,
            matches("p1"),
        )
        .unwrap_err();
        assert_eq!(denied, ChangeDenied::Reused);
    }

    #[test]
    fn history_rotates_at_capacity() {
        let start = Utc::now() - Duration::days(100);
        let mut history = PasswordHistory::starting_with(fake_digest("p1"), start);

        // Changes #2..=#13: after #13 the history holds 12 records and the
        // first password has rotated out.
        for n in 2..=13 {
            history.push(fake_digest(&format!("p{n}")), start + Duration::days(2 * n));
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);

        let now = start + Duration::days(2 * 13) + Duration::days(2);

        // Password #1 rotated out, so it may be used again.
        assert!(can_change(
            now,
            history.current().unwrap().changed_at,
            &history,
            matches("p1"),
        )
        .is_ok());

        // Password #13 is the current head and is denied.
        assert_eq!(
            can_change(
                now,
                history.current().unwrap().changed_at,
                &history,
                matches("p13"),
            )
            .unwrap_err(),
            ChangeDenied::Reused
        );
    }

    #[test]
    fn fresh_candidate_after_min_age_is_allowed() {
        let now = Utc::now();
        let history =
            PasswordHistory::starting_with(fake_digest("p1"), now - Duration::hours(25));

        assert!(can_change(
            now,
            history.current().unwrap().changed_at,
            &history,
            matches("brand-new"),
        )
        .is_ok());
    }
}
