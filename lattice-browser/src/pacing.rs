//! Human-like pacing for scrolls, sleeps, and typing.
//!
//! Constant-interval, constant-distance automation is a detectable
//! signature, so every scroll distance and sleep in the engine is jittered.
//! The random source is owned by [`Pacer`] and seedable, so tests can supply
//! a deterministic sequence.

use crate::page::PageElement;
use lattice_common::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;

/// Randomness and delay source shared by the scroll engine and login typing.
#[derive(Debug)]
pub struct Pacer {
    rng: Mutex<StdRng>,
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new()
    }
}

impl Pacer {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic pacer for tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut guard = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// Scroll factor for the exhaustive scroll, drawn from `[0.75, 1.0)`.
    /// Draws landing at or above 1.0 are rejected and redrawn.
    pub fn scroll_factor(&self) -> f64 {
        self.with_rng(|rng| loop {
            let factor = rng.gen::<f64>() + 0.75;
            if factor < 1.0 {
                return factor;
            }
        })
    }

    /// Height coefficient for a single lazy scroll step, in `[0.1, 0.2)`.
    pub fn lazy_coefficient(&self) -> f64 {
        self.with_rng(|rng| (rng.gen::<f64>() + 1.0) / 10.0)
    }

    /// Sleep for a random duration in `[min_ms, max_ms)` milliseconds.
    pub async fn random_delay(&self, min_ms: u64, max_ms: u64) {
        let ms = if max_ms > min_ms {
            self.with_rng(|rng| rng.gen_range(min_ms..max_ms))
        } else {
            min_ms
        };
        sleep(Duration::from_millis(ms)).await;
    }

    /// Post-scroll settle time for the exhaustive scroll, `[1000 ms, 6000 ms)`.
    pub async fn settle_delay(&self) {
        self.random_delay(1_000, 6_000).await;
    }

    /// Type the provided text with small random delays between characters.
    pub async fn type_text_human_like(&self, element: &PageElement, text: &str) -> Result<()> {
        for ch in text.chars() {
            element.send_keys(&ch.to_string()).await?;
            self.random_delay(30, 150).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_factor_stays_in_range() {
        let pacer = Pacer::seeded(7);
        for _ in 0..10_000 {
            let f = pacer.scroll_factor();
            assert!((0.75..1.0).contains(&f), "factor out of range: {f}");
        }
    }

    #[test]
    fn lazy_coefficient_stays_in_range() {
        let pacer = Pacer::seeded(11);
        for _ in 0..10_000 {
            let c = pacer.lazy_coefficient();
            assert!((0.1..0.2).contains(&c), "coefficient out of range: {c}");
        }
    }

    #[test]
    fn seeded_pacers_are_deterministic() {
        let a = Pacer::seeded(42);
        let b = Pacer::seeded(42);
        let draws_a: Vec<f64> = (0..32).map(|_| a.scroll_factor()).collect();
        let draws_b: Vec<f64> = (0..32).map(|_| b.scroll_factor()).collect();
        assert_eq!(draws_a, draws_b);
    }
}
