use serde::{Deserialize, Serialize};

pub const GAME_WIDTH: f32 = 800.0;
pub const GAME_HEIGHT: f32 = 500.0;
pub const PADDLE_WIDTH: f32 = 12.0;
pub const PADDLE_HEIGHT: f32 = 90.0;
pub const BALL_SIZE: f32 = 12.0;
pub const PADDLE_SPEED: f32 = 6.0;
pub const BALL_SPEED: f32 = 5.0;
pub const BALL_SPEED_INCREMENT: f32 = 0.35;
pub const BALL_SPEED_MAX: f32 = 10.0;
pub const WIN_SCORE: u32 = 7;
pub const COUNTDOWN_MS: u64 = 3000;
pub const GAMEOVER_MS: u64 = 5000;
pub const TICK_RATE: u32 = 60;

/// Highest y a paddle may occupy.
pub const PADDLE_MAX_Y: f32 = GAME_HEIGHT - PADDLE_HEIGHT;

/// One of the two fixed player positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Left,
    Right,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::Left, Slot::Right];

    pub fn index(self) -> usize {
        match self {
            Slot::Left => 0,
            Slot::Right => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Slot> {
        match index {
            0 => Some(Slot::Left),
            1 => Some(Slot::Right),
            _ => None,
        }
    }

    pub fn opponent(self) -> Slot {
        match self {
            Slot::Left => Slot::Right,
            Slot::Right => Slot::Left,
        }
    }
}

/// Lifecycle stage of a match round
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Waiting,
    Countdown,
    Playing,
    Gameover,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PaddleView {
    pub y: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct BallView {
    pub x: f32,
    pub y: f32,
}

/// Serialized match state pushed to every occupied slot each tick
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub paddles: [PaddleView; 2],
    pub ball: BallView,
    pub scores: [u32; 2],
    pub running: bool,
    pub players_ready: [bool; 2],
    pub phase: Phase,
    pub countdown: Option<u64>,
    pub winner: Option<u8>,
}

/// Server → client messages
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Assign { index: u8 },
    Full,
    State(Snapshot),
}

impl ServerMessage {
    pub fn assign(slot: Slot) -> Self {
        ServerMessage::Assign {
            index: slot.index() as u8,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Client → server messages
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Input { direction: f64 },
}

impl ClientMessage {
    /// Parses an inbound frame. Anything that is not a well-formed input
    /// message yields `None`.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Direction clamped to [-1, 1].
    pub fn direction(&self) -> f32 {
        match self {
            ClientMessage::Input { direction } => clamp_direction(*direction),
        }
    }
}

pub fn clamp_direction(direction: f64) -> f32 {
    if direction.is_nan() {
        return 0.0;
    }
    direction.clamp(-1.0, 1.0) as f32
}

pub fn centered_paddle_y() -> f32 {
    (GAME_HEIGHT - PADDLE_HEIGHT) / 2.0
}

pub fn centered_ball() -> (f32, f32) {
    ((GAME_WIDTH - BALL_SIZE) / 2.0, (GAME_HEIGHT - BALL_SIZE) / 2.0)
}
