//! ID, token and clock generators
//!
//! Generators are process-wide, stateless from the caller's point of view and
//! safe to share between concurrent transactions. Uniqueness of what they
//! produce is always re-checked against the index buckets at write time.

use crate::error::{Error, Result};
use crate::id::Id;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of new identifiers
pub trait IdGenerator: Send + Sync {
    /// Next unique, non-zero id
    fn id(&self) -> Id;
}

/// Source of bearer tokens and session keys
pub trait TokenGenerator: Send + Sync {
    fn token(&self) -> Result<String>;
}

/// Source of the current time
pub trait TimeGenerator: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

// 2020-01-01T00:00:00Z
const EPOCH_MS: u64 = 1_577_836_800_000;
const MACHINE_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const MACHINE_MASK: u64 = (1 << MACHINE_BITS) - 1;

#[derive(Debug, Default)]
struct SnowflakeState {
    last_ms: u64,
    sequence: u64,
}

/// Time-ordered id generator: milliseconds since 2020, machine id, sequence
#[derive(Debug)]
pub struct SnowflakeGenerator {
    machine: u64,
    state: Mutex<SnowflakeState>,
}

impl SnowflakeGenerator {
    /// Generator with a random machine id
    pub fn new() -> Self {
        Self::with_machine_id(fastrand::u64(..=MACHINE_MASK))
    }

    pub fn with_machine_id(machine: u64) -> Self {
        Self {
            machine: machine & MACHINE_MASK,
            state: Mutex::new(SnowflakeState::default()),
        }
    }

    fn next(&self) -> u64 {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut now = current_millis().max(state.last_ms);
        if now == state.last_ms {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                // Sequence exhausted within this millisecond; borrow the next one.
                now = state.last_ms + 1;
            }
        } else {
            state.sequence = 0;
        }
        state.last_ms = now;

        ((now.saturating_sub(EPOCH_MS)) << (MACHINE_BITS + SEQUENCE_BITS))
            | (self.machine << SEQUENCE_BITS)
            | state.sequence
    }
}

impl Default for SnowflakeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SnowflakeGenerator {
    fn id(&self) -> Id {
        loop {
            let id = Id::new(self.next());
            if id.valid() {
                return id;
            }
        }
    }
}

fn current_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(EPOCH_MS)
}

/// Deterministic generator handing out 1, 2, 3, ...
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first.max(1)),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn id(&self) -> Id {
        Id::new(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

/// URL-safe base64 of `size` bytes read from the operating system RNG
#[derive(Debug, Clone)]
pub struct RandomTokenGenerator {
    size: usize,
}

impl RandomTokenGenerator {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl TokenGenerator for RandomTokenGenerator {
    fn token(&self) -> Result<String> {
        let mut bytes = vec![0u8; self.size];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| Error::internal("unable to read random bytes").with_source(e))?;
        Ok(URL_SAFE.encode(bytes))
    }
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct RealTimeGenerator;

impl TimeGenerator for RealTimeGenerator {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct FixedTimeGenerator {
    now: Mutex<DateTime<Utc>>,
}

impl FixedTimeGenerator {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl TimeGenerator for FixedTimeGenerator {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn snowflake_ids_are_unique_and_nonzero() {
        let generator = SnowflakeGenerator::with_machine_id(7);
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let id = generator.id();
            assert!(id.valid());
            assert!(seen.insert(id), "duplicate id {}", id);
        }
    }

    #[test]
    fn snowflake_is_safe_across_threads() {
        let generator = Arc::new(SnowflakeGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || (0..1000).map(|_| generator.id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 4000);
    }

    #[test]
    fn sequential_generator_never_yields_zero() {
        let generator = SequentialIdGenerator::starting_at(0);
        assert_eq!(generator.id(), Id::new(1));
        assert_eq!(generator.id(), Id::new(2));
    }

    #[test]
    fn tokens_are_url_safe_and_sized() {
        let generator = RandomTokenGenerator::new(64);
        let token = generator.token().unwrap();
        // 64 bytes of base64 with padding
        assert_eq!(token.len(), 88);
        assert!(!token.contains('+') && !token.contains('/'));
        assert_ne!(token, generator.token().unwrap());
    }

    #[test]
    fn fixed_clock_advances_on_request() {
        let start = Utc::now();
        let clock = FixedTimeGenerator::new(start);
        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now(), start + Duration::minutes(5));
    }
}
