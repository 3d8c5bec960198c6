use clap::Parser;

use futures_util::{future, pin_mut, StreamExt};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use futures_channel::mpsc;
use serde_json::json;
use shutterman::cli::GIT_VERSION;
use std::error::Error;
use url::Url;

/// Example: bridge console. Type `target <0-100>`, `identify`, or raw JSON.
#[derive(Parser)]
#[clap(name = "Shutterman bridge client", version = GIT_VERSION)]
struct Opts {
    #[clap(default_value = "ws://127.0.0.1:9000/accessory")]
    pub url: Url,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let opts: Opts = Opts::parse();

    let (ws_stream, _) = connect_async(opts.url).await?;
    println!("websocket connected");

    let (stdin_tx, stdin_rx) = mpsc::unbounded();
    let (ws_tx, ws_rx) = ws_stream.split();

    tokio::spawn(read_stdin(stdin_tx));

    let stdin_to_ws = stdin_rx.map(Ok).forward(ws_tx);
    let ws_to_stdout = {
        ws_rx.for_each(|message| async {
            let mut data = match message {
                Ok(message) => message.into_data(),
                Err(e) => format!("websocket error: {}", e).into_bytes(),
            };
            data.push(b'\n');
            tokio::io::stdout()
                .write_all(&data)
                .await
                .expect("failed to write stdout");
        })
    };

    pin_mut!(stdin_to_ws, ws_to_stdout);
    future::select(stdin_to_ws, ws_to_stdout).await;

    Ok(())
}

fn frame(line: &str) -> Option<String> {
    let mut words = line.split_whitespace();
    match (words.next(), words.next()) {
        (Some("target"), Some(value)) => {
            let value: serde_json::Value =
                serde_json::from_str(value).unwrap_or_else(|_| json!(value));
            Some(
                json!({"type": "write", "characteristic": "target_position", "value": value})
                    .to_string(),
            )
        }
        (Some("identify"), None) => Some(json!({"type": "identify"}).to_string()),
        (Some(_), _) => Some(line.to_string()),
        (None, _) => None,
    }
}

async fn read_stdin(tx: mpsc::UnboundedSender<Message>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(text) = frame(line.trim()) {
            if tx.unbounded_send(Message::text(text)).is_err() {
                break;
            }
        }
    }
}
