//! Sampling of determinized boards.

use engine_core::Determinize;
use rand_chacha::ChaCha20Rng;
use tracing::{debug, warn};

/// One sampled board and whether constraints had to be relaxed to get it.
#[derive(Debug, Clone)]
pub struct Determinization<B> {
    pub board: B,
    pub relaxed: bool,
}

/// Retries constrained sampling a bounded number of times before falling
/// back to a relaxed sample.
#[derive(Debug, Clone, Copy)]
pub struct Determinizer {
    attempts: u32,
}

impl Determinizer {
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
        }
    }

    /// Sample a board consistent with `knowledge`.
    ///
    /// Never fails: when every constrained attempt is rejected the hidden
    /// information is dealt uniformly among the items not known to be
    /// excluded.
    pub fn sample<D: Determinize>(
        &self,
        knowledge: &D,
        rng: &mut ChaCha20Rng,
    ) -> Determinization<D::Board> {
        for attempt in 0..self.attempts {
            match knowledge.sample(rng) {
                Ok(board) => {
                    return Determinization {
                        board,
                        relaxed: false,
                    }
                }
                Err(e) => debug!(attempt, error = %e, "determinization attempt rejected"),
            }
        }

        warn!(
            attempts = self.attempts,
            "no consistent determinization found, using relaxed sample"
        );
        Determinization {
            board: knowledge.sample_relaxed(rng),
            relaxed: true,
        }
    }
}
