//! End-to-end protocol exchange against a live server on a Unix socket.

use remote_edit::client::Client;
use remote_edit::config::Config;
use remote_edit::protocol::{encode_header, encode_raw, Frame, MessageType, ValidationError};
use remote_edit::server::Server;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

struct TestServer {
    _tmp: TempDir,
    socket_path: PathBuf,
    file_path: PathBuf,
    task: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn start() -> Self {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            socket_path: tmp.path().join("edit.sock"),
            file_path: tmp.path().join("target.txt"),
            max_content_length: i32::MAX as u32,
            log_level: "info".to_string(),
        };

        let server = Server::bind(&config).unwrap();
        let task = tokio::spawn(async move {
            let _ = server.run().await;
        });

        TestServer {
            _tmp: tmp,
            socket_path: config.socket_path,
            file_path: config.file_path,
            task,
        }
    }

    async fn client(&self) -> Client {
        Client::connect(&self.socket_path).await.unwrap()
    }

    fn contents(&self) -> Vec<u8> {
        std::fs::read(&self.file_path).unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn assert_error(frame: &Frame, expected: &ValidationError) {
    assert_eq!(frame.msg_type, MessageType::Error);
    assert_eq!(frame.content_lossy(), expected.to_string());
}

#[tokio::test]
async fn test_write_hello_wire_bytes() {
    let server = TestServer::start().await;
    let mut stream = UnixStream::connect(&server.socket_path).await.unwrap();

    stream
        .write_all(&[0x02, 0, 0, 0, 0, 0, 0, 0x05, 0x68, 0x65, 0x6C, 0x6C, 0x6F])
        .await
        .unwrap();

    let mut response = [0u8; 8];
    stream.read_exact(&mut response).await.unwrap();
    assert_eq!(response, [1, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(server.contents(), b"hello\n");
}

#[tokio::test]
async fn test_ping_wire_bytes() {
    let server = TestServer::start().await;
    let mut stream = UnixStream::connect(&server.socket_path).await.unwrap();

    stream.write_all(&[5, 0, 0, 0, 0, 0, 0, 0]).await.unwrap();

    let mut response = [0u8; 8];
    stream.read_exact(&mut response).await.unwrap();
    assert_eq!(response, [1, 0, 0, 0, 0, 0, 0, 0]);
}

#[tokio::test]
async fn test_ok_with_forged_length_is_rejected() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    let content = b"should not be here";
    assert_eq!(content.len(), 18);
    client.send_raw(&encode_raw(1, content)).await.unwrap();

    let response = client.receive().await.unwrap();
    assert_error(&response, &ValidationError::ContentNotEmpty(MessageType::Ok));
}

#[tokio::test]
async fn test_clear_and_ping_with_content_are_rejected() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    for msg_type in [MessageType::Clear, MessageType::Ping] {
        client
            .send_raw(&encode_raw(msg_type.as_u8(), b"should not be here"))
            .await
            .unwrap();
        let response = client.receive().await.unwrap();
        assert_error(&response, &ValidationError::ContentNotEmpty(msg_type));
    }
}

#[tokio::test]
async fn test_ok_and_error_get_no_response() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    assert_eq!(client.send(&Frame::ok()).await.unwrap(), None);
    assert_eq!(client.send(&Frame::error("client problem")).await.unwrap(), None);

    // The next answer belongs to the PING, nothing was queued before it.
    assert_eq!(client.send(&Frame::ping()).await.unwrap(), Some(Frame::ok()));
}

#[tokio::test]
async fn test_clear_is_idempotent() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    client.send(&Frame::write("line")).await.unwrap();
    assert_eq!(server.contents(), b"line\n");

    for _ in 0..2 {
        assert_eq!(client.send(&Frame::clear()).await.unwrap(), Some(Frame::ok()));
        assert_eq!(server.contents(), b"");
    }
}

#[tokio::test]
async fn test_declared_length_longer_than_content() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    let content = b"write this, please";
    let mut wire = encode_header(2, content.len() as u32 + 4).to_vec();
    wire.extend_from_slice(content);
    client.send_raw(&wire).await.unwrap();

    let response = client.receive().await.unwrap();
    assert_error(&response, &ValidationError::ContentTooShort);
    assert_eq!(server.contents(), b"");
}

#[tokio::test]
async fn test_declared_length_shorter_than_content() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    let content = b"write this, please";
    let mut wire = encode_header(2, content.len() as u32 - 4).to_vec();
    wire.extend_from_slice(content);
    client.send_raw(&wire).await.unwrap();

    // The declared prefix is written and acknowledged.
    assert_eq!(client.receive().await.unwrap(), Frame::ok());
    assert_eq!(server.contents(), b"write this, pl\n");

    // The leftover "ease" is read as the next frame and rejected.
    let response = client.receive().await.unwrap();
    assert_error(&response, &ValidationError::MessageTooShort);
}

#[tokio::test]
async fn test_unknown_type() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    client.send_raw(&encode_raw(0xFF, b"")).await.unwrap();
    let response = client.receive().await.unwrap();
    assert_error(&response, &ValidationError::UnknownMessageType(0xFF));

    // The connection stays usable.
    assert_eq!(client.send(&Frame::ping()).await.unwrap(), Some(Frame::ok()));
}

#[tokio::test]
async fn test_garbage_input() {
    let server = TestServer::start().await;

    for len in [5usize, 50] {
        let mut client = server.client().await;
        let mut bytes = pseudo_random_bytes(1234, len);
        bytes[0] = 0xFF;
        client.send_raw(&bytes).await.unwrap();

        let response = client.receive().await.unwrap();
        assert_eq!(response.msg_type, MessageType::Error);
    }
}

#[tokio::test]
async fn test_concurrent_writers() {
    let server = TestServer::start().await;
    let mut first = server.client().await;
    let mut second = server.client().await;

    let first_line = Frame::write("first connection");
    let second_line = Frame::write("second connection");
    let (a, b) = tokio::join!(first.send(&first_line), second.send(&second_line));
    assert_eq!(a.unwrap(), Some(Frame::ok()));
    assert_eq!(b.unwrap(), Some(Frame::ok()));

    let contents = String::from_utf8(server.contents()).unwrap();
    let mut lines: Vec<&str> = contents.lines().collect();
    lines.sort_unstable();
    assert_eq!(lines, ["first connection", "second connection"]);
    assert_eq!(contents.matches('\n').count(), 2);
}

#[tokio::test]
async fn test_many_connections_many_lines() {
    let server = TestServer::start().await;
    let mut tasks = vec![];

    for conn in 0..8 {
        let mut client = server.client().await;
        tasks.push(tokio::spawn(async move {
            for i in 0..25 {
                let line = format!("conn-{conn}-line-{i}-{}", "x".repeat(512));
                let response = client.send(&Frame::write(line)).await.unwrap();
                assert_eq!(response, Some(Frame::ok()));
            }
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }

    let contents = String::from_utf8(server.contents()).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 8 * 25);
    for line in lines {
        assert!(line.starts_with("conn-"));
        assert!(line.ends_with(&"x".repeat(512)));
    }
}

#[tokio::test]
async fn test_deleted_file_is_recreated() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    std::fs::remove_file(&server.file_path).unwrap();
    assert_eq!(client.send(&Frame::write("back")).await.unwrap(), Some(Frame::ok()));
    assert_eq!(server.contents(), b"back\n");
}

#[tokio::test]
async fn test_disconnect_does_not_affect_others() {
    let server = TestServer::start().await;
    let mut stays = server.client().await;

    {
        let mut leaves = server.client().await;
        leaves.send_raw(&[0xFF, 1, 2]).await.unwrap();
        leaves.shutdown().await.unwrap();
    }

    assert_eq!(stays.send(&Frame::ping()).await.unwrap(), Some(Frame::ok()));
}

fn pseudo_random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 56) as u8
        })
        .collect()
}
