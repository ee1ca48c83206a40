//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::Path,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Redirect},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use app_proxy_gateway::{GatewayConfig, HttpServer, Shutdown};

/// Start a raw backend that answers every request with `head` and `body`.
///
/// `head` is the status line plus any extra header lines, without the
/// trailing blank line; `Content-Length` and `Connection` are added here.
pub async fn start_mock_backend(head: &'static str, body: &'static str) -> SocketAddr {
    start_raw_backend(head, body.as_bytes().to_vec()).await
}

/// Like [`start_mock_backend`], for bodies that are not text (e.g. gzip).
pub async fn start_raw_backend(head: &'static str, body: Vec<u8>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = Arc::new(body);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let body = body.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 8192];
                        let _ = socket.read(&mut buf).await;
                        let head = format!(
                            "{}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                            head,
                            body.len()
                        );
                        let _ = socket.write_all(head.as_bytes()).await;
                        let _ = socket.write_all(&body).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Send `request_target` verbatim over a raw connection and return the
/// response body. Used where an HTTP client would normalize the path.
pub async fn raw_get(addr: SocketAddr, request_target: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        request_target, addr
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    let response = String::from_utf8_lossy(&response).into_owned();
    match response.split_once("\r\n\r\n") {
        Some((_, body)) => body.to_string(),
        None => response,
    }
}

/// Start an axum backend that echoes what it received as JSON.
///
/// Special paths: `/redirect` (303 to `/landed`), `/slow` (sleeps 3s),
/// `/status/{code}` (answers with that status).
pub async fn start_echo_backend() -> SocketAddr {
    let app = Router::new()
        .route("/redirect", get(|| async { Redirect::to("/landed?from=redirect") }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "finally"
            }),
        )
        .route(
            "/status/{code}",
            get(|Path(code): Path<u16>| async move {
                let status = StatusCode::from_u16(code).unwrap_or(StatusCode::IM_A_TEAPOT);
                (status, format!("status {}", code))
            }),
        )
        .fallback(echo);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
        .collect();

    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    }))
}

/// A port with nothing listening on it.
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Default config pointing at `upstream`.
pub fn config_for(upstream: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.upstream.target_origin = format!("http://{}", upstream);
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config
}

/// Start the gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
