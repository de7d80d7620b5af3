//! A throwaway PostgREST stand-in for store tests: records `METHOD /path` of every request and
//! answers with a status chosen per request.

use std::sync::{Arc, Mutex};

use reqwest::Client;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};
use url::Url;

pub type Requests = Arc<Mutex<Vec<String>>>;

/// Serves until the test ends. The `fail_post`-th POST (1 based) gets a 500, everything else
/// succeeds.
pub async fn serve(fail_post: Option<usize>) -> (Url, Requests) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
    let requests = Requests::default();
    let log = Arc::clone(&requests);
    tokio::spawn(async move {
        let mut posts = 0;
        loop {
            let (mut socket, _) = listener.accept().await.unwrap();
            let head = read_request(&mut socket).await;
            let mut line = head.lines().next().unwrap_or_default().split(' ');
            let method = line.next().unwrap_or_default().to_string();
            let path = line.next().unwrap_or_default();
            let path = path.split('?').next().unwrap_or_default();
            if method == "POST" {
                posts += 1;
            }
            let status = if method == "POST" && Some(posts) == fail_post {
                "500 Internal Server Error"
            } else {
                "201 Created"
            };
            log.lock().unwrap().push(format!("{method} {path}"));
            let response =
                format!("HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        }
    });
    (url, requests)
}

pub fn client() -> Client {
    Client::builder().no_proxy().build().unwrap()
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
