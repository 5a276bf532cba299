// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/node/plain.rs
// Version: 2.0.1
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file implements the plain fallback transport of the Luna miner, located
// in the node subdirectory. Each call opens a TCP connection to the node,
// POSTs a minimal JSON-RPC document to `{node_url}/rpc` over HTTP/1.1 and reads
// the answer until the node closes the connection. No TLS: https nodes are
// reported as unavailable on this path.
//
// Tree Location:
// - src/node/plain.rs (PlainTransport)
// - Depends on: tokio, url, async-trait, node::messages

use crate::core::types::{BlockSubmission, NetworkStatus, SubmitReply, TransportKind, WorkTemplate};
use crate::node::messages::RpcProtocol;
use crate::node::transport::{NodeTransport, TransportError};
use crate::utils::user_agent::user_agent;
use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, lookup_host};
use url::Url;

const LOG_TARGET: &str = "luna::miner::node::plain";

/// Largest response body the fallback will buffer
const MAX_RESPONSE_BYTES: u64 = 8 * 1024 * 1024;

pub struct PlainTransport {
    host: String,
    port: u16,
    rpc_path: String,
    tls: bool,
    protocol: RpcProtocol,
}

impl PlainTransport {
    pub fn new(node_url: &str) -> Result<Self, TransportError> {
        let url = Url::parse(node_url).map_err(|e| TransportError::Unavailable(format!("invalid node URL: {}", e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| TransportError::Unavailable("node URL has no host".to_string()))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| TransportError::Unavailable("node URL has no port".to_string()))?;
        let rpc_path = format!("{}/rpc", url.path().trim_end_matches('/'));
        Ok(Self {
            host,
            port,
            rpc_path,
            tls: url.scheme() == "https",
            protocol: RpcProtocol::new(),
        })
    }

    /// Resolve either an IP literal or a hostname
    async fn resolve_node_address(&self) -> Result<SocketAddr, TransportError> {
        let host = self.host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = host.parse() {
            return Ok(SocketAddr::new(ip, self.port));
        }
        let mut addrs = lookup_host((host, self.port))
            .await
            .map_err(|e| TransportError::Unreachable(format!("cannot resolve {}: {}", self.host, e)))?;
        addrs
            .next()
            .ok_or_else(|| TransportError::Unreachable(format!("no addresses found for {}", self.host)))
    }

    async fn connect(&self) -> Result<TcpStream, TransportError> {
        let addr = self.resolve_node_address().await?;
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| TransportError::Unreachable(format!("connect to {} failed: {}", addr, e)))?;
        stream
            .set_nodelay(true)
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;
        Ok(stream)
    }

    async fn call<T: DeserializeOwned>(&self, request: Value) -> Result<T, TransportError> {
        if self.tls {
            return Err(TransportError::Unavailable(
                "plain transport cannot reach https nodes".to_string(),
            ));
        }

        let body = serde_json::to_vec(&request).map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        let host_header = if self.port == 80 {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        };
        let head = format!(
            "POST {} HTTP/1.1\r\nHost: {}\r\nUser-Agent: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.rpc_path,
            host_header,
            user_agent(),
            body.len()
        );

        debug!(target: LOG_TARGET, "JSON-RPC {} to {}:{}", request["method"], self.host, self.port);

        let mut stream = self.connect().await?;
        let io_err = |e: std::io::Error| TransportError::Unreachable(format!("connection failed: {}", e));
        stream.write_all(head.as_bytes()).await.map_err(io_err)?;
        stream.write_all(&body).await.map_err(io_err)?;
        stream.flush().await.map_err(io_err)?;

        let mut raw = Vec::new();
        (&mut stream)
            .take(MAX_RESPONSE_BYTES)
            .read_to_end(&mut raw)
            .await
            .map_err(io_err)?;

        let response = HttpResponse::parse(&raw)?;
        match response.status {
            200..=299 => RpcProtocol::parse_response(&response.body),
            400..=499 => Err(TransportError::Rejected {
                reason: RpcProtocol::parse_response::<Value>(&response.body)
                    .err()
                    .and_then(|e| match e {
                        TransportError::Rejected { reason } => Some(reason),
                        _ => None,
                    })
                    .unwrap_or_else(|| format!("HTTP {}", response.status)),
            }),
            status => Err(TransportError::InvalidResponse(format!("HTTP {}", status))),
        }
    }
}

#[async_trait]
impl NodeTransport for PlainTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Plain
    }

    async fn fetch_work(&self) -> Result<WorkTemplate, TransportError> {
        self.call(self.protocol.get_work_request()).await
    }

    async fn submit_block(&self, block: &BlockSubmission) -> Result<SubmitReply, TransportError> {
        let reply: SubmitReply = self.call(self.protocol.submit_block_request(block)).await?;
        if !reply.success {
            return Err(TransportError::Rejected {
                reason: reply.message.unwrap_or_else(|| "block rejected".to_string()),
            });
        }
        Ok(reply)
    }

    async fn sync_status(&self) -> Result<NetworkStatus, TransportError> {
        self.call(self.protocol.sync_status_request()).await
    }
}

/// Minimal HTTP/1.1 response reader: status line, headers, plain or chunked body
#[derive(Debug)]
struct HttpResponse {
    status: u16,
    body: Vec<u8>,
}

impl HttpResponse {
    fn parse(raw: &[u8]) -> Result<Self, TransportError> {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .ok_or_else(|| TransportError::InvalidResponse("truncated HTTP response".to_string()))?;
        let head = std::str::from_utf8(&raw[..split])
            .map_err(|_| TransportError::InvalidResponse("non-UTF-8 HTTP headers".to_string()))?;
        let body = &raw[split + 4..];

        let mut lines = head.split("\r\n");
        let status = lines
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or_else(|| TransportError::InvalidResponse("bad HTTP status line".to_string()))?;

        let mut chunked = false;
        let mut content_length = None;
        for line in lines {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if name.eq_ignore_ascii_case("transfer-encoding") && value.eq_ignore_ascii_case("chunked") {
                chunked = true;
            } else if name.eq_ignore_ascii_case("content-length") {
                let len = value
                    .parse::<usize>()
                    .map_err(|_| TransportError::InvalidResponse(format!("bad Content-Length: {}", value)))?;
                content_length = Some(len);
            }
        }

        let body = if chunked {
            decode_chunked(body)?
        } else {
            match content_length {
                Some(len) if len > body.len() => {
                    return Err(TransportError::InvalidResponse(format!(
                        "body shorter than Content-Length ({} < {})",
                        body.len(),
                        len
                    )));
                }
                Some(len) => body[..len].to_vec(),
                None => body.to_vec(),
            }
        };
        Ok(Self { status, body })
    }
}

fn decode_chunked(mut data: &[u8]) -> Result<Vec<u8>, TransportError> {
    let bad = || TransportError::InvalidResponse("bad chunked encoding".to_string());
    let mut out = Vec::with_capacity(data.len());
    loop {
        let line_end = data.windows(2).position(|w| w == b"\r\n").ok_or_else(bad)?;
        let size_text = std::str::from_utf8(&data[..line_end]).map_err(|_| bad())?;
        let size_text = size_text.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_text, 16).map_err(|_| bad())?;
        data = &data[line_end + 2..];
        if size == 0 {
            return Ok(out);
        }
        let end = size.checked_add(2).ok_or_else(bad)?;
        if data.len() < end || &data[size..end] != b"\r\n" {
            return Err(bad());
        }
        out.extend_from_slice(&data[..size]);
        data = &data[end..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_path_follows_node_path() {
        let transport = PlainTransport::new("http://127.0.0.1:5000/api/").unwrap();
        assert_eq!(transport.rpc_path, "/api/rpc");
        assert_eq!(transport.port, 5000);

        let transport = PlainTransport::new("https://bank.linglin.art").unwrap();
        assert_eq!(transport.rpc_path, "/rpc");
        assert_eq!(transport.port, 443);
        assert!(transport.tls);
    }

    #[test]
    fn test_parse_content_length_response() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n{}trailing";
        let response = HttpResponse::parse(raw).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"{}");
    }

    #[test]
    fn test_parse_chunked_response() {
        let raw = b"HTTP/1.1 503 Service Unavailable\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5;ext\r\npedia\r\n0\r\n\r\n";
        let response = HttpResponse::parse(raw).unwrap();
        assert_eq!(response.status, 503);
        assert_eq!(response.body, b"Wikipedia");
    }

    #[test]
    fn test_truncated_response_is_invalid() {
        assert!(matches!(
            HttpResponse::parse(b"HTTP/1.1 200 OK\r\nContent-Le"),
            Err(TransportError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_oversized_chunk_size_is_invalid() {
        assert!(matches!(
            decode_chunked(b"ffffffffffffffff\r\nab\r\n0\r\n\r\n"),
            Err(TransportError::InvalidResponse(_))
        ));
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nfffffffffffffffffff\r\nab\r\n0\r\n\r\n";
        assert!(matches!(HttpResponse::parse(raw), Err(TransportError::InvalidResponse(_))));
    }

    #[test]
    fn test_malformed_chunks_are_invalid() {
        // size line is not hex
        assert!(decode_chunked(b"zz\r\nab\r\n0\r\n\r\n").is_err());
        // chunk shorter than announced
        assert!(decode_chunked(b"5\r\nab\r\n").is_err());
        // missing CRLF after chunk data
        assert!(decode_chunked(b"2\r\nabXY0\r\n\r\n").is_err());
        // no terminating zero chunk
        assert!(decode_chunked(b"2\r\nab\r\n").is_err());
    }

    #[test]
    fn test_malformed_headers_are_invalid() {
        let cases: [&[u8]; 5] = [
            b"HTTP/1.1\r\n\r\n{}",
            b"HTTP/1.1 abc OK\r\n\r\n{}",
            b"HTTP/1.1 200 OK\r\nContent-Length: -1\r\n\r\n{}",
            b"HTTP/1.1 200 OK\r\nContent-Length: 99999999999999999999999\r\n\r\n{}",
            b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n{}",
        ];
        for raw in cases {
            assert!(
                matches!(HttpResponse::parse(raw), Err(TransportError::InvalidResponse(_))),
                "accepted {:?}",
                String::from_utf8_lossy(raw)
            );
        }
        assert!(matches!(
            HttpResponse::parse(b"HTTP/1.1 200 OK\r\n\xff\xfe: x\r\n\r\n{}"),
            Err(TransportError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_header_lines_without_colon_are_skipped() {
        let raw = b"HTTP/1.1 200 OK\r\nX-Odd-Line\r\ncontent-length: 2\r\n\r\n{}";
        let response = HttpResponse::parse(raw).unwrap();
        assert_eq!(response.body, b"{}");
    }

    #[tokio::test]
    async fn test_https_node_is_unavailable() {
        let transport = PlainTransport::new("https://bank.linglin.art").unwrap();
        let err = transport.sync_status().await.unwrap_err();
        assert!(matches!(err, TransportError::Unavailable(_)));
        assert!(err.is_transport_level());
    }
}

// Changelog:
// - v2.0.1 (2025-07-09): Hardened the response reader against malformed nodes.
//   - Chunk sizes use checked arithmetic and chunk data must end in CRLF.
//   - Unparseable or overlong Content-Length is reported as an invalid response.
// - v2.0.0 (2025-07-02): Rebuilt the pool TCP client as the plain node transport.
//   - Keeps IP-or-hostname resolution and TCP_NODELAY connections.
//   - Speaks one HTTP/1.1 JSON-RPC exchange per call instead of line-delimited Stratum.
// - v1.1.0 (2025-06-23): Added DNS resolution support.
