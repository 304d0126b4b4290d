//! Prompt id generation.
//!
//! Ids are random UUIDs drawn from the OS generator. If that generator is
//! unavailable the timestamp fallback keeps working, with a per-millisecond
//! sequence so ids created in the same millisecond stay distinct.

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::warn;

#[derive(Debug)]
pub struct IdGenerator {
    secure: bool,
    last_ms: i64,
    sequence: u32,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            secure: true,
            last_ms: i64::MIN,
            sequence: 0,
        }
    }

    /// Generator that always uses the timestamp fallback.
    pub fn timestamp_only() -> Self {
        Self {
            secure: false,
            ..Self::new()
        }
    }

    /// Produce a new id; `now_ms` feeds the fallback path.
    pub fn next_id(&mut self, now_ms: i64) -> String {
        if self.secure {
            let mut bytes = [0u8; 16];
            match OsRng.try_fill_bytes(&mut bytes) {
                Ok(()) => return uuid::Builder::from_random_bytes(bytes).into_uuid().to_string(),
                Err(e) => {
                    warn!(error = %e, "Secure random generator unavailable, using timestamp ids");
                    self.secure = false;
                }
            }
        }
        self.fallback_id(now_ms)
    }

    fn fallback_id(&mut self, now_ms: i64) -> String {
        // Clock going backwards still advances the sequence
        if now_ms > self.last_ms {
            self.last_ms = now_ms;
            self.sequence = 0;
            return now_ms.to_string();
        }

        self.sequence += 1;
        format!("{}-{}", self.last_ms, self.sequence)
    }
}
