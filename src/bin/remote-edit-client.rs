//! Interactive client for remote-edit.
//!
//! Prompts for a message type, composes the frame, sends it and prints the
//! server's answer. Type 0 to close the connection.

use clap::Parser;
use remote_edit::client::{Client, ClientError};
use remote_edit::protocol::{Frame, MessageType};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

const SEPARATOR: &str = "--------------------------------------------------";

/// Command-line arguments for the client
#[derive(Parser, Debug)]
#[command(name = "remote-edit-client")]
#[command(version = "0.1.0")]
#[command(about = "Interactive client for a remote-edit server", long_about = None)]
struct Args {
    /// Unix socket path of the server
    socket: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut client = Client::connect(&args.socket).await?;
    println!("Successfully connected to the server!");
    println!("{SEPARATOR}");

    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        println!(
            "To send a message to the server, type the corresponding number, or type 0 to close the connection\n\
             1 -> Ok\n\
             2 -> Write\n\
             3 -> Clear\n\
             4 -> Error\n\
             5 -> Ping"
        );

        let Some(line) = input.next_line().await? else {
            break;
        };

        let frame = match line.trim().parse::<u8>() {
            Ok(0) => break,
            Ok(code) => match MessageType::from_u8(code) {
                Some(msg_type) => compose(msg_type, &mut input).await?,
                None => {
                    println!("There is no message associated with this input");
                    println!("{SEPARATOR}");
                    continue;
                }
            },
            Err(_) => {
                println!("There is no message associated with this input");
                println!("{SEPARATOR}");
                continue;
            }
        };

        println!("Sending {}...", frame.msg_type);
        match client.send(&frame).await {
            Ok(None) => println!("Message sent!"),
            Ok(Some(response)) => {
                println!("Message sent!");
                print_response(&response);
            }
            Err(ClientError::InvalidResponse(e)) => {
                println!("Validation of the server response failed");
                println!("Error: {e}");
            }
            Err(e) => {
                println!("{e}");
                return Ok(());
            }
        }
        println!("{SEPARATOR}");
    }

    client.shutdown().await?;
    println!("Connection closed");
    Ok(())
}

/// Build a frame, prompting for content where the type carries one.
async fn compose(
    msg_type: MessageType,
    input: &mut Lines<BufReader<Stdin>>,
) -> std::io::Result<Frame> {
    let frame = match msg_type {
        MessageType::Ok => Frame::ok(),
        MessageType::Write => {
            println!("A write message needs content. Please enter it now:");
            Frame::write(input.next_line().await?.unwrap_or_default())
        }
        MessageType::Clear => Frame::clear(),
        MessageType::Error => {
            println!("An error message can be specified. Please enter it now or hit enter to leave it empty:");
            Frame::error(input.next_line().await?.unwrap_or_default())
        }
        MessageType::Ping => Frame::ping(),
    };
    Ok(frame)
}

fn print_response(response: &Frame) {
    match response.msg_type {
        MessageType::Ok => println!("Received OK from server"),
        MessageType::Error => {
            println!("Received ERROR from server");
            println!("Error: {}", response.content_lossy());
        }
        other => println!("Received unexpected message type from server: {other}"),
    }
}
