use std::time::SystemTime;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::Response;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Headers the writer always produces itself; caller-supplied copies are dropped.
const MANAGED_HEADERS: &[&str] = &[
    "content-type",
    "content-length",
    "date",
    "server",
    "connection",
    "transfer-encoding",
];

/// Serializes a response into wire bytes.
///
/// Header order is fixed: Content-Type, Content-Length, Date, Server,
/// Connection, then the response's extra headers. Content-Length is always
/// the byte length of `resp.body`.
pub fn serialize_response(resp: &Response, server_name: &str, date: SystemTime) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256 + resp.body.len());

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    push_header(&mut buf, "Content-Type", &resp.content_type);
    push_header(&mut buf, "Content-Length", &resp.body.len().to_string());
    push_header(&mut buf, "Date", &httpdate::fmt_http_date(date));
    push_header(&mut buf, "Server", server_name);
    push_header(&mut buf, "Connection", "close");

    for (k, v) in &resp.headers {
        if !is_valid_name(k) || MANAGED_HEADERS.iter().any(|m| k.eq_ignore_ascii_case(m)) {
            continue;
        }
        push_header(&mut buf, k, v);
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    // Body
    buf.extend_from_slice(&resp.body);

    buf
}

/// Names must be non-empty printable ASCII without a colon.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_graphic() && b != b':')
}

fn push_header(buf: &mut Vec<u8>, name: &str, value: &str) {
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(b": ");
    // CR/LF in a value would let a handler smuggle extra headers
    for &b in value.as_bytes() {
        if b != b'\r' && b != b'\n' {
            buf.push(b);
        }
    }
    buf.extend_from_slice(b"\r\n");
}

pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl ResponseWriter {
    pub fn new(response: &Response, server_name: &str) -> Self {
        Self {
            buffer: serialize_response(response, server_name, SystemTime::now()),
            written: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        stream.flush().await?;
        Ok(())
    }
}
