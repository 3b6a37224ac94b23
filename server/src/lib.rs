//! # Pong Server Library
//!
//! This library provides the authoritative server for a two-player Pong match.
//! It owns the canonical match state, applies player inputs, runs the fixed-step
//! physics and round lifecycle, and broadcasts a snapshot to both players after
//! every change.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Ball, paddles, scores and phase live only on the server. Clients send a
//! paddle direction and render whatever snapshot arrives next.
//!
//! ### Slot Management
//! Exactly two player slots exist. The first two connections are assigned
//! left and right; further connections are told the room is full and closed.
//! A disconnect frees its slot and resets the match.
//!
//! ### State Broadcasting
//! A snapshot goes out after every tick (60 Hz) and every slot change. The
//! protocol is snapshot based, so a missed message is healed by the next one.
//!
//! ## Architecture Design
//!
//! ### Single-Owner Event Loop
//! One task owns the [`game::MatchState`] and the
//! [`client_manager::SessionRegistry`]. Connection tasks only parse frames and
//! forward [`network::NetworkEvent`]s over a channel, so state is never shared
//! and needs no locks. Inputs are last-write-wins: the latest direction seen
//! before a tick boundary is the one applied on that tick.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! Match state and the per-tick physics step: paddle movement, wall bounce,
//! paddle returns with angled deflection, and scoring.
//!
//! ### Lifecycle Module (`lifecycle`)
//! Phase transitions waiting → countdown → playing → gameover and the
//! countdown/gameover timers.
//!
//! ### Client Manager Module (`client_manager`)
//! The two-slot session registry and snapshot delivery.
//!
//! ### Network Module (`network`)
//! WebSocket transport and the server loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind("0.0.0.0:3000").await?;
//!
//!     // Accepts connections, ticks the match at 60Hz and broadcasts
//!     // snapshots until the process is stopped.
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod game;
pub mod lifecycle;
pub mod network;
