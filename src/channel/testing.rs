//! Loopback WebSocket server that plays scripted conversations.
//!
//! Each accepted connection follows one [`Script`]: send the greeting,
//! wait for the client's first text frame (the job announcement), run the
//! steps, then record whatever the client still sends until it goes away.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) enum Step {
    Send(String),
    /// Send a close frame.
    Close,
    /// Drop the TCP connection without a close frame.
    Hangup,
    /// Write an unmasked text frame straight to the socket, bypassing the
    /// WebSocket state machine.  Works after `Close`, when `Send` would be
    /// refused.
    RawText(String),
}

impl Step {
    pub(crate) fn send(line: &str) -> Self {
        Step::Send(line.to_string())
    }
}

pub(crate) struct Script {
    /// Frames sent right after the handshake, before the announcement.
    pub greeting: Vec<String>,
    pub steps: Vec<Step>,
}

impl Script {
    pub(crate) fn steps(steps: Vec<Step>) -> Self {
        Self {
            greeting: Vec::new(),
            steps,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ConnectionLog {
    /// Text frames received from the client, in order.
    pub received: Vec<String>,
    /// The client closed or dropped the connection.
    pub client_gone: bool,
}

/// Bind to an ephemeral port and serve one connection per script.
///
/// Returns the `ws://` URL and a task yielding one log per connection.
pub(crate) async fn scripted_server(
    scripts: Vec<Script>,
) -> (String, JoinHandle<Vec<ConnectionLog>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let url = format!("ws://{addr}/ws/commentary");

    let task = tokio::spawn(async move {
        let mut connections = Vec::new();
        for script in scripts {
            let (stream, _) = listener.accept().await.expect("accept");
            connections.push(tokio::spawn(serve_connection(stream, script)));
        }
        let mut logs = Vec::new();
        for conn in connections {
            logs.push(conn.await.expect("connection task"));
        }
        logs
    });

    (url, task)
}

async fn serve_connection(stream: TcpStream, script: Script) -> ConnectionLog {
    let mut log = ConnectionLog::default();
    let Ok(mut ws) = accept_async(stream).await else {
        return log;
    };

    for line in script.greeting {
        let _ = ws.send(Message::Text(line)).await;
    }

    match tokio::time::timeout(READ_TIMEOUT, ws.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => log.received.push(text),
        _ => {
            log.client_gone = true;
            return log;
        }
    }

    for step in script.steps {
        match step {
            Step::Send(line) => {
                let _ = ws.send(Message::Text(line)).await;
            }
            Step::Close => {
                let _ = ws.send(Message::Close(None)).await;
            }
            Step::Hangup => return log,
            Step::RawText(line) => {
                let payload = line.as_bytes();
                assert!(payload.len() < 126, "raw frames use the short length form");
                let mut frame = vec![0x81, payload.len() as u8];
                frame.extend_from_slice(payload);
                let socket = ws.get_mut();
                let _ = socket.write_all(&frame).await;
                let _ = socket.flush().await;
            }
        }
    }

    loop {
        match tokio::time::timeout(READ_TIMEOUT, ws.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => log.received.push(text),
            Ok(Some(Ok(_))) => {}
            Ok(Some(Err(_))) | Ok(None) => {
                log.client_gone = true;
                break;
            }
            Err(_) => break,
        }
    }

    log
}
