use crate::http::request::{Method, Request};
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use url::form_urlencoded;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// More bytes are needed before a decision can be made.
    #[error("request is incomplete")]
    Incomplete,
    /// The peer closed the stream without sending a single byte.
    #[error("connection sent no data")]
    EmptyRequest,
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),
    #[error("request line is not valid UTF-8")]
    InvalidEncoding,
}

/// The pieces of a request line after the request-target has been split.
#[derive(Debug, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub version: String,
}

/// Parses one request out of `buf`.
///
/// `eof` tells the parser the peer has stopped sending: an unterminated
/// header block is then accepted as-is and a short body is returned with
/// `truncated` set instead of [`ParseError::Incomplete`].
///
/// On success returns the request and the number of bytes consumed.
pub fn parse_http_request(buf: &[u8], eof: bool) -> Result<(Request, usize), ParseError> {
    if buf.is_empty() {
        return Err(if eof {
            ParseError::EmptyRequest
        } else {
            ParseError::Incomplete
        });
    }

    // Reject a bad request line as soon as it is complete
    let first_end = match find_line_end(buf, 0) {
        Some((end, _)) => end,
        None if eof => buf.len(),
        None => return Err(ParseError::Incomplete),
    };
    let request_line = std::str::from_utf8(strip_cr(&buf[..first_end]))
        .map_err(|_| ParseError::InvalidEncoding)?;
    let RequestLine {
        method,
        path,
        query,
        version,
    } = parse_request_line(request_line)?;

    let (header_lines, body_start) = split_header_block(buf, eof).ok_or(ParseError::Incomplete)?;

    let mut headers = HashMap::new();
    for line in header_lines {
        let line = String::from_utf8_lossy(line);
        if let Some((name, value)) = parse_header_line(&line) {
            headers.insert(name, value);
        }
    }

    let content_length = headers
        .get("content-length")
        .and_then(|v: &String| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = Vec::new();
    let mut truncated = false;
    let mut consumed = body_start;

    if method.accepts_body() && content_length > 0 {
        let available = buf.len() - body_start;
        if available >= content_length {
            body = buf[body_start..body_start + content_length].to_vec();
            consumed = body_start + content_length;
        } else if eof {
            body = buf[body_start..].to_vec();
            consumed = buf.len();
            truncated = true;
        } else {
            return Err(ParseError::Incomplete);
        }
    }

    let request = Request {
        method,
        path,
        version,
        headers,
        query,
        body,
        truncated,
    };

    Ok((request, consumed))
}

/// Splits a request line into method, decoded path, query and version.
///
/// The line must consist of exactly three non-empty tokens separated by
/// single spaces. Trailing whitespace is ignored.
pub fn parse_request_line(line: &str) -> Result<RequestLine, ParseError> {
    let parts: Vec<&str> = line.trim_end().split(' ').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(ParseError::MalformedRequestLine(line.to_string()));
    }

    let method = Method::from_str(parts[0])
        .ok_or_else(|| ParseError::MalformedRequestLine(line.to_string()))?;

    let (raw_path, query) = match parts[1].split_once('?') {
        Some((path, qs)) => (path, parse_query(qs)),
        None => (parts[1], HashMap::new()),
    };

    Ok(RequestLine {
        method,
        path: percent_decode_str(raw_path).decode_utf8_lossy().into_owned(),
        query,
        version: parts[2].to_string(),
    })
}

/// Decodes a query string into a map.
///
/// Pairs are split on `&`, then on the first `=`. Pairs without `=` are
/// dropped. Keys and values use form decoding (`+` is a space).
pub fn parse_query(qs: &str) -> HashMap<String, String> {
    qs.split('&')
        .filter(|pair| pair.contains('='))
        .filter_map(|pair| form_urlencoded::parse(pair.as_bytes()).next())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Splits a header line on its first colon, returning the lower-cased
/// trimmed name and the trimmed value.
pub fn parse_header_line(line: &str) -> Option<(String, String)> {
    let (name, value) = line.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_ascii_lowercase(), value.trim().to_string()))
}

/// Returns the header lines (request line excluded) and the offset of the
/// first body byte, or `None` if the blank line has not arrived yet.
fn split_header_block(buf: &[u8], eof: bool) -> Option<(Vec<&[u8]>, usize)> {
    let (_, mut start) = find_line_end(buf, 0).or(if eof {
        Some((buf.len(), buf.len()))
    } else {
        None
    })?;

    let mut lines = Vec::new();
    loop {
        match find_line_end(buf, start) {
            Some((end, next)) => {
                let line = strip_cr(&buf[start..end]);
                if line.is_empty() {
                    return Some((lines, next));
                }
                lines.push(line);
                start = next;
            }
            None if eof => {
                let rest = strip_cr(&buf[start..]);
                if !rest.is_empty() {
                    lines.push(rest);
                }
                return Some((lines, buf.len()));
            }
            None => return None,
        }
    }
}

/// Finds the next `\n` at or after `from`; returns its index and the index
/// just past it.
fn find_line_end(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    buf[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|i| (from + i, from + i + 1))
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}
