//! Integration tests for the Pong server
//!
//! These tests run a real server on an ephemeral port and talk to it over
//! WebSocket exactly like the browser client does.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use server::network::Server;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn start_server() -> SocketAddr {
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

async fn connect(addr: SocketAddr) -> Socket {
    let (ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
    ws
}

/// Next JSON message, or None once the server has closed the connection
async fn next_json(ws: &mut Socket) -> Option<Value> {
    loop {
        let frame = timeout(WAIT, ws.next()).await.expect("timed out waiting")?;
        match frame {
            Ok(Message::Text(text)) => return Some(serde_json::from_str(&text).unwrap()),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

/// Skips messages until one satisfies `predicate`
async fn wait_for<F>(ws: &mut Socket, predicate: F) -> Value
where
    F: Fn(&Value) -> bool,
{
    loop {
        let message = next_json(ws).await.expect("connection closed");
        if predicate(&message) {
            return message;
        }
    }
}

/// CONNECTION LIFECYCLE TESTS
mod lifecycle_tests {
    use super::*;

    /// Two players get slots 0 and 1 and the countdown starts
    #[tokio::test]
    async fn two_players_are_assigned_and_countdown_starts() {
        let addr = start_server().await;

        let mut left = connect(addr).await;
        assert_eq!(
            next_json(&mut left).await,
            Some(json!({"type": "assign", "index": 0}))
        );

        let mut right = connect(addr).await;
        assert_eq!(
            next_json(&mut right).await,
            Some(json!({"type": "assign", "index": 1}))
        );

        let state = wait_for(&mut right, |m| m["type"] == "state").await;
        assert_eq!(state["playersReady"], json!([true, true]));
        assert_eq!(state["phase"], "countdown");
        assert_eq!(state["running"], false);
        assert_eq!(state["countdown"], 3);
        assert_eq!(state["scores"], json!([0, 0]));
        assert_eq!(state["winner"], Value::Null);
    }

    /// A lone player sees a waiting snapshot
    #[tokio::test]
    async fn single_player_waits() {
        let addr = start_server().await;
        let mut left = connect(addr).await;

        let state = wait_for(&mut left, |m| m["type"] == "state").await;
        assert_eq!(state["playersReady"], json!([true, false]));
        assert_eq!(state["phase"], "waiting");
        assert_eq!(state["countdown"], Value::Null);
    }

    /// A third connection is told the room is full and closed, never assigned
    #[tokio::test]
    async fn third_connection_is_rejected() {
        let addr = start_server().await;
        let mut left = connect(addr).await;
        let mut right = connect(addr).await;
        next_json(&mut left).await;
        next_json(&mut right).await;

        let mut extra = connect(addr).await;
        assert_eq!(next_json(&mut extra).await, Some(json!({"type": "full"})));
        assert_eq!(next_json(&mut extra).await, None);
    }

    /// Closing one connection mid-match resets scores and returns to waiting
    #[tokio::test]
    async fn disconnect_resets_match() {
        let addr = start_server().await;
        let mut left = connect(addr).await;
        let mut right = connect(addr).await;
        wait_for(&mut left, |m| m["phase"] == "countdown").await;
        next_json(&mut right).await;

        right.close(None).await.unwrap();

        let state = wait_for(&mut left, |m| m["playersReady"] == json!([true, false])).await;
        assert_eq!(state["phase"], "waiting");
        assert_eq!(state["scores"], json!([0, 0]));
        assert_eq!(state["running"], false);
    }

    /// The freed slot is handed to the next connection
    #[tokio::test]
    async fn freed_slot_is_reassigned() {
        let addr = start_server().await;
        let mut left = connect(addr).await;
        let mut right = connect(addr).await;
        next_json(&mut left).await;
        next_json(&mut right).await;

        left.close(None).await.unwrap();
        wait_for(&mut right, |m| m["playersReady"] == json!([false, true])).await;

        let mut replacement = connect(addr).await;
        assert_eq!(
            next_json(&mut replacement).await,
            Some(json!({"type": "assign", "index": 0}))
        );
    }
}

/// INPUT HANDLING TESTS
mod input_tests {
    use super::*;

    /// Directional input moves the paddle in subsequent snapshots
    #[tokio::test]
    async fn input_moves_paddle() {
        let addr = start_server().await;
        let mut left = connect(addr).await;
        let first = wait_for(&mut left, |m| m["type"] == "state").await;
        let start_y = first["paddles"][0]["y"].as_f64().unwrap();

        left.send(Message::Text(
            json!({"type": "input", "direction": -1}).to_string().into(),
        ))
        .await
        .unwrap();

        let moved = wait_for(&mut left, |m| {
            m["type"] == "state" && m["paddles"][0]["y"].as_f64().unwrap() < start_y
        })
        .await;
        assert!(moved["paddles"][0]["y"].as_f64().unwrap() >= 0.0);
    }

    /// Malformed frames are ignored and the connection stays open
    #[tokio::test]
    async fn malformed_messages_are_dropped() {
        let addr = start_server().await;
        let mut left = connect(addr).await;
        next_json(&mut left).await;

        for frame in [
            "not json".to_string(),
            json!({"type": "input", "direction": "up"}).to_string(),
            json!({"type": "chat", "text": "hi"}).to_string(),
        ] {
            left.send(Message::Text(frame.into())).await.unwrap();
        }

        let state = wait_for(&mut left, |m| m["type"] == "state").await;
        assert_eq!(state["playersReady"], json!([true, false]));

        let later = wait_for(&mut left, |m| m["type"] == "state").await;
        let centered = shared::centered_paddle_y() as f64;
        assert!((later["paddles"][0]["y"].as_f64().unwrap() - centered).abs() < 0.001);
    }
}
