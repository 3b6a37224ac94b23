//! Round lifecycle: waiting → countdown → playing → gameover → reset
//!
//! Transitions are evaluated on every tick (timer expiry) and on every slot
//! assign/release (occupancy change). Deadlines are absolute instants so the
//! controller can be driven with synthetic clocks in tests.

use crate::game::{BallState, MatchState, PaddleState};
use log::info;
use rand::Rng;
use shared::{Phase, Slot, COUNTDOWN_MS, GAMEOVER_MS};
use std::time::{Duration, Instant};

/// Pause before each serve
pub const COUNTDOWN: Duration = Duration::from_millis(COUNTDOWN_MS);
/// How long the final score stays up before the reset
pub const GAMEOVER: Duration = Duration::from_millis(GAMEOVER_MS);

impl MatchState {
    /// Re-evaluates the phase after an occupancy change.
    pub fn evaluate(&mut self, ready: [bool; 2], now: Instant) {
        if ready.iter().all(|filled| *filled) {
            if !self.running {
                self.schedule_countdown(now);
            }
        } else {
            self.running = false;
            self.phase = Phase::Waiting;
            self.countdown_deadline = None;
        }
    }

    /// Parks the ball and starts the pre-serve countdown. Positions and scores are kept.
    pub fn schedule_countdown(&mut self, now: Instant) {
        self.running = false;
        self.phase = Phase::Countdown;
        self.countdown_deadline = Some(now + COUNTDOWN);
    }

    /// Parks the ball, records the winner and starts the reset timer.
    pub fn enter_gameover(&mut self, winner: Slot, now: Instant) {
        self.running = false;
        self.phase = Phase::Gameover;
        self.winner = Some(winner);
        self.gameover_deadline = Some(now + GAMEOVER);
    }

    /// Fires any elapsed phase timer. Only meaningful while the ball is parked.
    pub fn expire_timers<R: Rng + ?Sized>(&mut self, ready: [bool; 2], now: Instant, rng: &mut R) {
        if self.phase == Phase::Countdown {
            if let Some(deadline) = self.countdown_deadline {
                if now >= deadline {
                    info!("Serve: {}-{}", self.scores[0], self.scores[1]);
                    self.running = true;
                    self.phase = Phase::Playing;
                    self.countdown_deadline = None;
                }
            }
        }

        if self.phase == Phase::Gameover {
            if let Some(deadline) = self.gameover_deadline {
                if now >= deadline {
                    self.reset(rng);
                    self.evaluate(ready, now);
                }
            }
        }
    }

    /// Whole seconds left on the countdown, rounded up.
    pub fn countdown_seconds(&self, now: Instant) -> Option<u64> {
        self.countdown_deadline.map(|deadline| {
            let remaining = deadline.saturating_duration_since(now).as_millis() as u64;
            remaining.div_ceil(1000)
        })
    }

    /// Full reset: scores, paddles, winner and a fresh serve in a random direction.
    /// Phase is left for [`MatchState::evaluate`] to decide.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let toward = if rng.gen_bool(0.5) {
            Slot::Right
        } else {
            Slot::Left
        };

        self.paddles = [PaddleState::centered(), PaddleState::centered()];
        self.scores = [0, 0];
        self.winner = None;
        self.gameover_deadline = None;
        self.ball = BallState::serve(toward, rng);
    }
}
