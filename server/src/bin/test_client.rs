//! Headless player for exercising a running server.
//!
//! Connects over WebSocket, takes whichever slot it is assigned and steers
//! its paddle toward the ball on every snapshot.

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use shared::{ClientMessage, Phase, ServerMessage, Snapshot, BALL_SIZE, PADDLE_HEIGHT};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server WebSocket URL
    #[arg(short, long, default_value = "ws://127.0.0.1:3000")]
    url: String,

    /// Stop after this many state messages
    #[arg(short, long)]
    ticks: Option<u64>,
}

/// Paddle direction that moves toward the ball, with a small dead zone
fn chase_ball(snapshot: &Snapshot, index: usize) -> f64 {
    let paddle_center = snapshot.paddles[index].y + PADDLE_HEIGHT / 2.0;
    let ball_center = snapshot.ball.y + BALL_SIZE / 2.0;
    let gap = ball_center - paddle_center;

    if gap > PADDLE_HEIGHT / 6.0 {
        1.0
    } else if gap < -PADDLE_HEIGHT / 6.0 {
        -1.0
    } else {
        0.0
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let (ws, _) = connect_async(args.url.as_str()).await?;
    info!("Connected to {}", args.url);
    let (mut sender, mut receiver) = ws.split();

    let mut index: Option<usize> = None;
    let mut last_direction = 0.0;
    let mut last_phase = None;
    let mut states: u64 = 0;

    while let Some(frame) = receiver.next().await {
        let text = match frame? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let message = match ServerMessage::from_json(&text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Unparseable message from server: {}", e);
                continue;
            }
        };

        match message {
            ServerMessage::Assign { index: slot } => {
                info!("Assigned slot {}", slot);
                index = Some(slot as usize);
            }
            ServerMessage::Full => {
                info!("Room is full");
                break;
            }
            ServerMessage::State(snapshot) => {
                states += 1;

                if last_phase != Some(snapshot.phase) {
                    info!(
                        "Phase {:?}, score {}-{}, winner {:?}",
                        snapshot.phase, snapshot.scores[0], snapshot.scores[1], snapshot.winner
                    );
                    last_phase = Some(snapshot.phase);
                }

                if let Some(index) = index {
                    let direction = if snapshot.phase == Phase::Playing {
                        chase_ball(&snapshot, index)
                    } else {
                        0.0
                    };

                    // Only send on change; the server keeps the last direction.
                    if direction != last_direction {
                        let input = ClientMessage::Input { direction }.to_json()?;
                        sender.send(Message::Text(input.into())).await?;
                        last_direction = direction;
                    }
                }

                if args.ticks.is_some_and(|limit| states >= limit) {
                    break;
                }
            }
        }
    }

    let _ = sender.close().await;
    info!("Disconnected after {} state messages", states);
    Ok(())
}
