//! Hash-based issue identifiers.
//!
//! IDs have the form `{prefix}-{hash}` where the hash is a base36 rendering
//! of a SHA256 digest over the issue content, the creating actor, the
//! creation instant and a retry nonce (e.g. `proj-a3f8`).
//!
//! The hash length adapts to the number of known IDs so that IDs stay short
//! for small trackers and collision-resistant for large ones:
//!
//! - up to 500 issues: 4 chars
//! - up to 1,500 issues: 5 chars
//! - up to 50,000 issues: 6 chars
//! - beyond: 7 chars
//!
//! Every generated or imported ID is registered, and a candidate that
//! collides with a registered ID is retried with the next nonce.

use crate::domain::IssueId;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

const BASE36_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const MAX_NONCE: u32 = 100;
const MAX_HASH_LENGTH: usize = 12;

/// Errors that can occur during ID generation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdGenerationError {
    /// Unable to generate a unique ID after exhausting all nonces and lengths
    #[error("Unable to generate unique ID after {attempts} attempts")]
    CollisionExhausted {
        /// Total candidates tried
        attempts: u32,
    },
}

/// Hash-based ID generator with collision detection.
#[derive(Debug)]
pub struct IdGenerator {
    prefix: String,
    existing: HashSet<IssueId>,
}

impl IdGenerator {
    /// Create a generator for IDs with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            existing: HashSet::new(),
        }
    }

    /// Register an existing ID so it is never generated again.
    pub fn register(&mut self, id: IssueId) {
        self.existing.insert(id);
    }

    /// Forget a deleted ID.
    pub fn release(&mut self, id: &IssueId) {
        self.existing.remove(id);
    }

    /// Whether `id` is already registered.
    #[must_use]
    pub fn contains(&self, id: &IssueId) -> bool {
        self.existing.contains(id)
    }

    /// Generate and register a new unique ID.
    ///
    /// # Errors
    ///
    /// Returns `CollisionExhausted` if every nonce at every length collides,
    /// which requires the ID space to be practically full.
    pub fn generate(
        &mut self,
        title: &str,
        description: &str,
        actor: &str,
    ) -> Result<IssueId, IdGenerationError> {
        let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let mut attempts = 0;

        for length in self.adaptive_length()..=MAX_HASH_LENGTH {
            for nonce in 0..MAX_NONCE {
                attempts += 1;
                let id = self.candidate(title, description, actor, timestamp, nonce, length);
                if self.existing.insert(id.clone()) {
                    if attempts > 1 {
                        debug!(%id, attempts, "Generated unique ID after collision retries");
                    }
                    return Ok(id);
                }
            }
            warn!(length, "All nonces exhausted, increasing ID length");
        }

        Err(IdGenerationError::CollisionExhausted { attempts })
    }

    fn candidate(
        &self,
        title: &str,
        description: &str,
        actor: &str,
        timestamp: i64,
        nonce: u32,
        length: usize,
    ) -> IssueId {
        let mut hasher = Sha256::new();
        hasher.update(format!("{title}|{description}|{actor}|{timestamp}|{nonce}").as_bytes());
        let digest = hasher.finalize();
        IssueId::new(format!(
            "{}-{}",
            self.prefix,
            encode_base36(&digest[..8], length)
        ))
    }

    fn adaptive_length(&self) -> usize {
        match self.existing.len() {
            0..=500 => 4,
            501..=1500 => 5,
            1501..=50_000 => 6,
            _ => 7,
        }
    }
}

/// Encode up to eight bytes as a base36 string of exactly `length` chars.
///
/// Lengths beyond what a u64 can fill are left-padded with `0`.
fn encode_base36(bytes: &[u8], length: usize) -> String {
    let mut n = bytes
        .iter()
        .take(8)
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));

    let mut out = vec![b'0'; length];
    for slot in out.iter_mut().rev() {
        *slot = BASE36_CHARS[(n % 36) as usize];
        n /= 36;
    }
    out.into_iter().map(char::from).collect()
}
