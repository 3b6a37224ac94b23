//! Authoritative match state and the fixed-step physics/rules engine
//!
//! A tick moves both paddles, then either advances the round timers (while
//! the ball is parked) or integrates the ball: wall bounce, paddle returns and
//! scoring, in that order.

use log::info;
use rand::Rng;
use shared::{
    centered_ball, centered_paddle_y, BallView, PaddleView, Phase, Slot, Snapshot, BALL_SIZE,
    BALL_SPEED, BALL_SPEED_INCREMENT, BALL_SPEED_MAX, GAME_HEIGHT, GAME_WIDTH, PADDLE_HEIGHT,
    PADDLE_MAX_Y, PADDLE_SPEED, PADDLE_WIDTH, WIN_SCORE,
};
use std::f32::consts::PI;
use std::time::Instant;

/// One player's paddle
#[derive(Debug, Clone, PartialEq)]
pub struct PaddleState {
    /// Top edge, kept within [0, PADDLE_MAX_Y]
    pub y: f32,
    /// Latest input, in [-1, 1]
    pub direction: f32,
}

impl PaddleState {
    /// Vertically centred and idle
    pub fn centered() -> Self {
        Self {
            y: centered_paddle_y(),
            direction: 0.0,
        }
    }

    /// Moves by one tick of input and clamps to the playfield
    fn step(&mut self) {
        self.y = (self.y + self.direction * PADDLE_SPEED).clamp(0.0, PADDLE_MAX_Y);
    }

    /// Vertical overlap between the ball and the paddle, edges inclusive
    fn overlaps(&self, ball: &BallState) -> bool {
        ball.y + BALL_SIZE >= self.y && ball.y <= self.y + PADDLE_HEIGHT
    }

    /// Vertical offset of the ball centre from the paddle centre, where ±1 is the paddle edge.
    fn hit_offset(&self, ball: &BallState) -> f32 {
        let ball_center = ball.y + BALL_SIZE / 2.0;
        let paddle_center = self.y + PADDLE_HEIGHT / 2.0;
        (ball_center - paddle_center) / (PADDLE_HEIGHT / 2.0)
    }
}

/// Ball position (top-left corner) and velocity in units per tick
#[derive(Debug, Clone, PartialEq)]
pub struct BallState {
    pub x: f32,
    pub y: f32,
    /// Horizontal velocity; the sign is the direction of travel
    pub vx: f32,
    pub vy: f32,
}

impl BallState {
    /// Centred ball travelling toward `toward` at the base speed, with a
    /// random vertical component within ±54°.
    pub fn serve<R: Rng + ?Sized>(toward: Slot, rng: &mut R) -> Self {
        let (x, y) = centered_ball();
        let angle = (rng.gen::<f32>() * 0.6 - 0.3) * PI;
        let sign = match toward {
            Slot::Left => -1.0,
            Slot::Right => 1.0,
        };

        Self {
            x,
            y,
            vx: BALL_SPEED * sign,
            vy: BALL_SPEED * angle.sin(),
        }
    }

    fn integrate(&mut self) {
        self.x += self.vx;
        self.y += self.vy;
    }

    /// Reflects off the top and bottom walls, snapping back inside the playfield
    fn bounce_walls(&mut self) {
        if self.y <= 0.0 || self.y + BALL_SIZE >= GAME_HEIGHT {
            self.vy = -self.vy;
            self.y = self.y.clamp(0.0, GAME_HEIGHT - BALL_SIZE);
        }
    }

    /// Reflects the ball off a paddle so it travels away from `wall`.
    fn return_from(&mut self, wall: Slot, paddle: &PaddleState) {
        let speed = (self.vx.abs() + BALL_SPEED_INCREMENT).min(BALL_SPEED_MAX);
        self.vx = match wall {
            Slot::Left => speed,
            Slot::Right => -speed,
        };
        self.vy = speed * paddle.hit_offset(self);
    }
}

/// Everything the server simulates for the single match it hosts
#[derive(Debug, Clone)]
pub struct MatchState {
    /// Indexed by [`Slot::index`]
    pub paddles: [PaddleState; 2],
    pub ball: BallState,
    /// Points per slot, never above `WIN_SCORE`
    pub scores: [u32; 2],
    /// True only while the ball is in play
    pub running: bool,
    pub phase: Phase,
    /// When the pending serve happens; set only during a countdown
    pub countdown_deadline: Option<Instant>,
    /// When a finished match resets; set only during gameover
    pub gameover_deadline: Option<Instant>,
    /// Slot that reached `WIN_SCORE`, until the next reset
    pub winner: Option<Slot>,
}

impl MatchState {
    /// Fresh match in the waiting phase with a serve in a random direction
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let toward = if rng.gen_bool(0.5) {
            Slot::Right
        } else {
            Slot::Left
        };

        Self {
            paddles: [PaddleState::centered(), PaddleState::centered()],
            ball: BallState::serve(toward, rng),
            scores: [0, 0],
            running: false,
            phase: Phase::Waiting,
            countdown_deadline: None,
            gameover_deadline: None,
            winner: None,
        }
    }

    /// Stores a direction already clamped to [-1, 1]
    pub fn set_direction(&mut self, slot: Slot, direction: f32) {
        self.paddles[slot.index()].direction = direction;
    }

    /// Advances the match by one fixed step. `ready` is the slot occupancy.
    pub fn tick<R: Rng + ?Sized>(&mut self, ready: [bool; 2], now: Instant, rng: &mut R) {
        for paddle in &mut self.paddles {
            paddle.step();
        }

        if !self.running {
            self.expire_timers(ready, now, rng);
            return;
        }

        self.phase = Phase::Playing;
        self.ball.integrate();
        self.ball.bounce_walls();

        let [left, right] = &self.paddles;
        if self.ball.x <= PADDLE_WIDTH && left.overlaps(&self.ball) {
            self.ball.return_from(Slot::Left, left);
        }
        if self.ball.x + BALL_SIZE >= GAME_WIDTH - PADDLE_WIDTH && right.overlaps(&self.ball) {
            self.ball.return_from(Slot::Right, right);
        }

        if self.ball.x + BALL_SIZE < 0.0 {
            self.award_point(Slot::Right, now, rng);
        } else if self.ball.x > GAME_WIDTH {
            self.award_point(Slot::Left, now, rng);
        }
    }

    /// Credits `scorer`, then either ends the match or serves toward the scorer
    fn award_point<R: Rng + ?Sized>(&mut self, scorer: Slot, now: Instant, rng: &mut R) {
        let score = &mut self.scores[scorer.index()];
        *score += 1;

        if *score >= WIN_SCORE {
            info!(
                "Slot {} wins {}-{}",
                scorer.index(),
                self.scores[scorer.index()],
                self.scores[scorer.opponent().index()]
            );
            self.enter_gameover(scorer, now);
        } else {
            self.ball = BallState::serve(scorer, rng);
            self.schedule_countdown(now);
        }
    }

    /// Wire view of the match for broadcasting
    pub fn snapshot(&self, players_ready: [bool; 2], now: Instant) -> Snapshot {
        Snapshot {
            paddles: [
                PaddleView {
                    y: self.paddles[0].y,
                },
                PaddleView {
                    y: self.paddles[1].y,
                },
            ],
            ball: BallView {
                x: self.ball.x,
                y: self.ball.y,
            },
            scores: self.scores,
            running: self.running,
            players_ready,
            phase: self.phase,
            countdown: self.countdown_seconds(now),
            winner: self.winner.map(|slot| slot.index() as u8),
        }
    }
}
