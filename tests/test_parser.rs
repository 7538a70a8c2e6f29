use sentinel::http::parser::{
    ParseError, parse_header_line, parse_http_request, parse_query, parse_request_line,
};
use sentinel::http::request::Method;

#[test]
fn test_parse_simple_get_request() {
    let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let (parsed, consumed) = parse_http_request(req, false).unwrap();

    assert_eq!(parsed.method, Method::GET);
    assert_eq!(parsed.path, "/");
    assert_eq!(parsed.version, "HTTP/1.1");
    assert_eq!(parsed.headers.get("host").unwrap(), "example.com");
    assert!(parsed.query.is_empty());
    assert_eq!(consumed, req.len());
}

#[test]
fn test_parse_post_request_with_body() {
    let req = b"POST /api HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\n\r\nhello";
    let (parsed, consumed) = parse_http_request(req, false).unwrap();

    assert_eq!(parsed.method, Method::POST);
    assert_eq!(parsed.path, "/api");
    assert_eq!(parsed.body, b"hello".to_vec());
    assert!(!parsed.truncated);
    assert_eq!(consumed, req.len());
}

#[test]
fn test_parse_put_request_with_body() {
    let req = b"PUT /item HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc";
    let (parsed, _) = parse_http_request(req, false).unwrap();

    assert_eq!(parsed.method, Method::PUT);
    assert_eq!(parsed.body, b"abc".to_vec());
}

#[test]
fn test_body_ignored_for_get() {
    let req = b"GET /x HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
    let (parsed, consumed) = parse_http_request(req, false).unwrap();

    assert!(parsed.body.is_empty());
    assert_eq!(consumed, req.len() - 5);
}

#[test]
fn test_body_is_exactly_content_length() {
    let req = b"POST /api HTTP/1.1\r\nContent-Length: 3\r\n\r\nabcdef";
    let (parsed, consumed) = parse_http_request(req, false).unwrap();

    assert_eq!(parsed.body, b"abc".to_vec());
    assert_eq!(consumed, req.len() - 3);
}

#[test]
fn test_non_numeric_content_length_reads_no_body() {
    let req = b"POST /api HTTP/1.1\r\nContent-Length: lots\r\n\r\nabc";
    let (parsed, _) = parse_http_request(req, false).unwrap();

    assert!(parsed.body.is_empty());
}

#[test]
fn test_header_names_lower_cased_and_trimmed() {
    let req = b"GET /path HTTP/1.1\r\n  User-Agent :  test-client  \r\nACCEPT: */*\r\n\r\n";
    let (parsed, _) = parse_http_request(req, false).unwrap();

    assert_eq!(parsed.headers.get("user-agent").unwrap(), "test-client");
    assert_eq!(parsed.headers.get("accept").unwrap(), "*/*");
    assert_eq!(parsed.header("Accept"), Some("*/*"));
}

#[test]
fn test_header_value_split_on_first_colon() {
    let req = b"GET / HTTP/1.1\r\nHost: localhost:8080\r\n\r\n";
    let (parsed, _) = parse_http_request(req, false).unwrap();

    assert_eq!(parsed.header("host"), Some("localhost:8080"));
}

#[test]
fn test_duplicate_header_later_wins() {
    let req = b"GET / HTTP/1.1\r\nX-Tag: one\r\nx-tag: two\r\n\r\n";
    let (parsed, _) = parse_http_request(req, false).unwrap();

    assert_eq!(parsed.header("x-tag"), Some("two"));
}

#[test]
fn test_header_line_without_colon_is_skipped() {
    let req = b"GET / HTTP/1.1\r\nBrokenHeader\r\nHost: a\r\n\r\n";
    let (parsed, _) = parse_http_request(req, false).unwrap();

    assert_eq!(parsed.headers.len(), 1);
    assert_eq!(parsed.header("host"), Some("a"));
}

#[test]
fn test_path_and_query_split() {
    let req = b"GET /search?q=hello%20world&x= HTTP/1.1\r\n\r\n";
    let (parsed, _) = parse_http_request(req, false).unwrap();

    assert_eq!(parsed.path, "/search");
    assert_eq!(parsed.query.len(), 2);
    assert_eq!(parsed.query_param("q"), Some("hello world"));
    assert_eq!(parsed.query_param("x"), Some(""));
}

#[test]
fn test_query_pairs_without_equals_are_ignored() {
    let query = parse_query("flag&a=1&&b=2=3");

    assert_eq!(query.len(), 2);
    assert_eq!(query.get("a").map(String::as_str), Some("1"));
    assert_eq!(query.get("b").map(String::as_str), Some("2=3"));
    assert!(!query.contains_key("flag"));
}

#[test]
fn test_query_decodes_plus_and_percent_in_keys() {
    let query = parse_query("full+name=Ada+Lovelace&k%26=v%3D");

    assert_eq!(query.get("full name").map(String::as_str), Some("Ada Lovelace"));
    assert_eq!(query.get("k&").map(String::as_str), Some("v="));
}

#[test]
fn test_path_is_percent_decoded() {
    let line = parse_request_line("GET /..%2fsecrets.txt HTTP/1.1").unwrap();
    assert_eq!(line.path, "/../secrets.txt");

    let line = parse_request_line("GET /a+b%20c HTTP/1.1").unwrap();
    assert_eq!(line.path, "/a+b c");
}

#[test]
fn test_method_is_upper_cased() {
    let (parsed, _) = parse_http_request(b"get / HTTP/1.1\r\n\r\n", false).unwrap();
    assert_eq!(parsed.method, Method::GET);

    let (parsed, _) = parse_http_request(b"PURGE /cache HTTP/1.1\r\n\r\n", false).unwrap();
    assert_eq!(parsed.method, Method::Other("PURGE".to_string()));
}

#[test]
fn test_parse_various_http_methods() {
    let methods = vec![
        ("GET", Method::GET),
        ("POST", Method::POST),
        ("PUT", Method::PUT),
        ("DELETE", Method::DELETE),
        ("HEAD", Method::HEAD),
        ("OPTIONS", Method::OPTIONS),
        ("PATCH", Method::PATCH),
    ];

    for (method_str, expected_method) in methods {
        let req = format!("{} / HTTP/1.1\r\n\r\n", method_str);
        let (parsed, _) = parse_http_request(req.as_bytes(), false).unwrap();
        assert_eq!(parsed.method, expected_method);
    }
}

#[test]
fn test_malformed_request_lines() {
    for line in ["GET", "GET /", "", "GET  / HTTP/1.1", "GET / HTTP/1.1 extra"] {
        let req = format!("{line}\r\n\r\n");
        let result = parse_http_request(req.as_bytes(), false);
        assert!(
            matches!(result, Err(ParseError::MalformedRequestLine(_))),
            "line {line:?} gave {result:?}"
        );
    }
}

#[test]
fn test_trailing_whitespace_after_version_is_ignored() {
    for raw in [&b"GET /a HTTP/1.1 \r\n\r\n"[..], b"GET /a HTTP/1.1\t \r\n\r\n"] {
        let (parsed, _) = parse_http_request(raw, false).unwrap();
        assert_eq!(parsed.path, "/a");
        assert_eq!(parsed.version, "HTTP/1.1");
    }
}

#[test]
fn test_malformed_line_detected_before_header_block_ends() {
    let result = parse_http_request(b"NONSENSE\r\nHost: x\r\n", false);
    assert!(matches!(result, Err(ParseError::MalformedRequestLine(_))));
}

#[test]
fn test_parse_incomplete_request_missing_blank_line() {
    let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n";
    let result = parse_http_request(req, false);

    assert!(matches!(result, Err(ParseError::Incomplete)));
}

#[test]
fn test_eof_terminates_header_block() {
    let req = b"GET /late HTTP/1.1\r\nHost: example.com";
    let (parsed, consumed) = parse_http_request(req, true).unwrap();

    assert_eq!(parsed.path, "/late");
    assert_eq!(parsed.header("host"), Some("example.com"));
    assert_eq!(consumed, req.len());
}

#[test]
fn test_parse_incomplete_request_partial_body() {
    let req = b"POST /api HTTP/1.1\r\nContent-Length: 10\r\n\r\nhello";
    let result = parse_http_request(req, false);

    assert!(matches!(result, Err(ParseError::Incomplete)));
}

#[test]
fn test_short_body_at_eof_is_truncated() {
    let req = b"POST /api HTTP/1.1\r\nContent-Length: 10\r\n\r\nhello";
    let (parsed, _) = parse_http_request(req, true).unwrap();

    assert_eq!(parsed.body, b"hello".to_vec());
    assert!(parsed.truncated);
}

#[test]
fn test_empty_stream() {
    assert!(matches!(parse_http_request(b"", true), Err(ParseError::EmptyRequest)));
    assert!(matches!(parse_http_request(b"", false), Err(ParseError::Incomplete)));
}

#[test]
fn test_non_utf8_request_line() {
    let result = parse_http_request(b"GET /\xff HTTP/1.1\r\n\r\n", false);
    assert!(matches!(result, Err(ParseError::InvalidEncoding)));
}

#[test]
fn test_parse_request_with_binary_body() {
    let req = b"POST /upload HTTP/1.1\r\nContent-Length: 4\r\n\r\n\x00\x01\x02\x03";
    let (parsed, _) = parse_http_request(req, false).unwrap();

    assert_eq!(parsed.body, vec![0, 1, 2, 3]);
}

#[test]
fn test_parse_header_line() {
    assert_eq!(
        parse_header_line("Content-Type: text/html"),
        Some(("content-type".to_string(), "text/html".to_string()))
    );
    assert_eq!(parse_header_line("no colon here"), None);
    assert_eq!(parse_header_line(": orphan"), None);
}
