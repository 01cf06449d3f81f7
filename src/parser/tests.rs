//! Tests for the HTTP parser.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::str::FromStr;

    use tokio::io::BufReader;

    use crate::parser::{
        parse_request, read_head, read_request, request_line_of, Error, HttpRequest, HttpVersion, Method,
        MAX_HEAD_BYTES,
    };

    fn request_with(version: HttpVersion, connection: Option<&str>) -> HttpRequest {
        let mut headers = HashMap::new();
        if let Some(value) = connection {
            headers.insert("connection".to_string(), value.to_string());
        }
        HttpRequest::new(Method::GET, "/".to_string(), version, headers)
    }

    #[test]
    fn test_parse_simple_get_request() {
        let request = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let result = parse_request(request, "10.0.0.1").unwrap();
        assert_eq!(result.method, Method::GET);
        assert_eq!(result.resource, "/index.html");
        assert_eq!(result.version, HttpVersion::HTTP_1_1);
        assert_eq!(result.headers.get("host").unwrap(), "example.com");
        assert_eq!(result.client, "10.0.0.1");
        assert_eq!(result.request_line, "GET /index.html HTTP/1.1");
    }

    #[test]
    fn test_header_names_are_lowercased() {
        let request = b"GET / HTTP/1.1\r\nUser-Agent: test\r\nACCEPT: */*\r\n\r\n";
        let result = parse_request(request, "").unwrap();
        assert_eq!(result.headers.get("user-agent").unwrap(), "test");
        assert_eq!(result.headers.get("accept").unwrap(), "*/*");
        assert!(result.has_header("User-Agent"));
        assert_eq!(result.get_header("ACCEPT").unwrap(), "*/*");
    }

    #[test]
    fn test_headers_with_multiple_colons() {
        let request = b"GET / HTTP/1.1\r\nX-Test: value:with:colons\r\n\r\n";
        let result = parse_request(request, "").unwrap();
        assert_eq!(result.headers.get("x-test").unwrap(), "value:with:colons");
    }

    #[test]
    fn test_header_values_are_trimmed() {
        let request = b"GET / HTTP/1.1\r\nHost:   example.com  \r\nX-Empty:\r\n\r\n";
        let result = parse_request(request, "").unwrap();
        assert_eq!(result.headers.get("host").unwrap(), "example.com");
        assert_eq!(result.headers.get("x-empty").unwrap(), "");
    }

    #[test]
    fn test_duplicate_headers_are_comma_joined_in_order() {
        let request =
            b"GET / HTTP/1.1\r\nAccept: text/html\r\nX-Other: 1\r\naccept: text/plain\r\nAccept: */*\r\n\r\n";
        let result = parse_request(request, "").unwrap();
        assert_eq!(result.headers.get("accept").unwrap(), "text/html,text/plain,*/*");
        assert_eq!(result.headers.len(), 2);
    }

    #[test]
    fn test_malformed_request_table() {
        let cases: Vec<(&[u8], u16)> = vec![
            (&b"GET /x\r\n\r\n"[..], 400),
            (&b"POST / HTTP/1.1\r\n\r\n"[..], 501),
            (&b"GET nope HTTP/1.1\r\n\r\n"[..], 400),
            (&b"GET / HTTP/1\r\n\r\n"[..], 400),
        ];

        for (request, status) in cases {
            let err = parse_request(request, "").unwrap_err();
            assert_eq!(err.status(), Some(status), "request {:?}", String::from_utf8_lossy(request));
        }
    }

    #[test]
    fn test_request_line_split_on_single_spaces() {
        let request = b"GET  /index.html HTTP/1.1\r\n\r\n";
        let result = parse_request(request, "");
        assert!(matches!(result, Err(Error::MalformedRequestLine(_))));
    }

    #[test]
    fn test_unknown_and_unimplemented_methods() {
        for verb in ["POST", "HEAD", "DELETE", "BREW", "get"] {
            let request = format!("{verb} / HTTP/1.1\r\n\r\n");
            let result = parse_request(request.as_bytes(), "");
            assert!(matches!(result, Err(Error::UnsupportedMethod(ref m)) if m == verb));
        }
    }

    #[test]
    fn test_invalid_versions() {
        for spec in [
            "HTTP/1",
            "HTTP/1.1.1",
            "HTTP/x.1",
            "HTTP/1.-1",
            "HTTP/1.",
            "HTTP/.1",
            "HTTPS/1.1",
            "HTTP/1.1/2",
            "http/1.1",
        ] {
            let request = format!("GET / {spec}\r\n\r\n");
            let result = parse_request(request.as_bytes(), "");
            assert!(
                matches!(result, Err(Error::InvalidVersion(ref v)) if v == spec),
                "{spec} should be rejected"
            );
        }
    }

    #[test]
    fn test_version_accepts_any_non_negative_integers() {
        let request = b"GET / HTTP/12.034\r\n\r\n";
        let result = parse_request(request, "").unwrap();
        assert_eq!(result.version, HttpVersion::new(12, 34));
    }

    #[test]
    fn test_request_line_round_trip() {
        let resources = ["/", "/index.html", "/a/b/c.txt", "/search?q=1", "/%20space"];
        let versions = [(0, 0), (0, 9), (1, 0), (1, 1), (2, 0), (10, 42), (u32::MAX, 7)];

        for method in Method::IMPLEMENTED {
            for resource in resources {
                for (major, minor) in versions {
                    let line = format!("{method} {resource} HTTP/{major}.{minor}\r\n\r\n");
                    let parsed = parse_request(line.as_bytes(), "").unwrap();
                    assert_eq!(parsed.method, *method);
                    assert_eq!(parsed.resource, resource);
                    assert_eq!(parsed.version, HttpVersion::new(major, minor));
                }
            }
        }
    }

    #[test]
    fn test_invalid_header_format() {
        let request = b"GET / HTTP/1.1\r\nInvalidHeader\r\n\r\n";
        let result = parse_request(request, "");
        assert!(matches!(result, Err(Error::InvalidHeaderFormat(ref l)) if l == "InvalidHeader"));
        assert_eq!(result.unwrap_err().status(), Some(400));
    }

    #[test]
    fn test_header_names_with_separators_are_rejected() {
        for name in ["X Test", "X(Test)", "a/b", "k=v", "we@ther", "tab\tbed", "Host "] {
            let request = format!("GET / HTTP/1.1\r\n{name}: value\r\n\r\n");
            let result = parse_request(request.as_bytes(), "");
            assert!(matches!(result, Err(Error::InvalidHeaderName(_))), "{name:?} should be rejected");
        }
    }

    #[test]
    fn test_malformed_utf8_in_request() {
        let request = b"GET / HTTP/1.1\r\nX-Test: \xFF\xFF\r\n\r\n";
        let result = parse_request(request, "");
        assert!(matches!(result, Err(Error::InvalidEncoding)));
    }

    #[test]
    fn test_path_is_percent_decoded_without_query() {
        let request = b"GET /docs/my%20file%2Etxt?download=1 HTTP/1.1\r\n\r\n";
        let result = parse_request(request, "").unwrap();
        assert_eq!(result.path().unwrap(), "/docs/my file.txt");
        assert_eq!(result.resource, "/docs/my%20file%2Etxt?download=1");
    }

    #[test]
    fn test_path_keeps_plus_signs() {
        let request = b"GET /c++/a+b%2Bc.txt HTTP/1.1\r\n\r\n";
        let result = parse_request(request, "").unwrap();
        assert_eq!(result.path().unwrap(), "/c++/a+b+c.txt");
    }

    #[test]
    fn test_request_line_of_raw_head() {
        assert_eq!(
            request_line_of(b"POST /upload HTTP/1.1\r\nHost: x\r\n\r\n").as_deref(),
            Some("POST /upload HTTP/1.1")
        );
        assert_eq!(request_line_of(b"GET /x").as_deref(), Some("GET /x"));
        assert_eq!(request_line_of(b"\r\n\r\n"), None);
    }

    #[test]
    fn test_path_with_invalid_utf8_escape() {
        let request = b"GET /%FF HTTP/1.1\r\n\r\n";
        let result = parse_request(request, "").unwrap();
        assert!(matches!(result.path(), Err(Error::InvalidEncoding)));
    }

    #[test]
    fn test_keep_alive_table() {
        let cases = [
            (HttpVersion::HTTP_1_1, None, true),
            (HttpVersion::HTTP_1_0, None, false),
            (HttpVersion::HTTP_1_0, Some("Keep-Alive"), true),
            (HttpVersion::HTTP_1_1, Some("close"), false),
            (HttpVersion::HTTP_1_1, Some("CLOSE"), false),
            (HttpVersion::HTTP_1_0, Some("keep-alive"), true),
            (HttpVersion::HTTP_1_0, Some("upgrade"), false),
            (HttpVersion::new(2, 0), None, true),
            (HttpVersion::new(0, 9), None, false),
        ];

        for (version, connection, expected) in cases {
            let request = request_with(version, connection);
            assert_eq!(request.keep_alive(), expected, "{version} / {connection:?}");
        }
    }

    #[test]
    fn test_version_ordering_and_display() {
        assert!(HttpVersion::new(1, 10) > HttpVersion::new(1, 9));
        assert!(HttpVersion::new(2, 0) > HttpVersion::HTTP_1_1);
        assert_eq!(HttpVersion::HTTP_1_0.to_string(), "HTTP/1.0");
        assert_eq!(HttpVersion::from_str("HTTP/1.1").unwrap(), HttpVersion::HTTP_1_1);
    }

    #[test]
    fn test_method_display() {
        assert_eq!(Method::GET.to_string(), "GET");
        assert_eq!(Method::from_str("GET").unwrap(), Method::GET);
    }

    #[tokio::test]
    async fn test_read_request_stops_at_blank_line() {
        let bytes = b"GET /a HTTP/1.1\r\nHost: x\r\n\r\nGET /b HTTP/1.0\r\n\r\n".to_vec();
        let mut reader = BufReader::new(&bytes[..]);

        let first = read_request(&mut reader, "peer").await.unwrap();
        assert_eq!(first.resource, "/a");
        assert_eq!(first.headers.get("host").unwrap(), "x");

        let second = read_request(&mut reader, "peer").await.unwrap();
        assert_eq!(second.resource, "/b");
        assert_eq!(second.version, HttpVersion::HTTP_1_0);

        let third = read_request(&mut reader, "peer").await;
        assert!(matches!(third, Err(Error::EndOfStream)));
    }

    #[tokio::test]
    async fn test_read_request_end_of_stream_mid_head() {
        let bytes = b"GET /a HTTP/1.1\r\nHost: x\r\n".to_vec();
        let mut reader = BufReader::new(&bytes[..]);
        let result = read_request(&mut reader, "peer").await;
        assert!(matches!(result, Err(Error::EndOfStream)));
        assert_eq!(Error::EndOfStream.status(), None);
    }

    #[tokio::test]
    async fn test_read_request_bare_lf_does_not_end_line() {
        let bytes = b"GET /a HTTP/1.1\r\nX-Test: one\ntwo\r\n\r\n".to_vec();
        let mut reader = BufReader::new(&bytes[..]);
        let result = read_request(&mut reader, "peer").await.unwrap();
        assert_eq!(result.headers.get("x-test").unwrap(), "one\ntwo");
    }

    #[tokio::test]
    async fn test_read_request_rejects_oversized_head() {
        let mut bytes = b"GET / HTTP/1.1\r\n".to_vec();
        let filler = format!("X-Filler: {}\r\n", "a".repeat(1024));
        while bytes.len() <= crate::parser::MAX_HEAD_BYTES {
            bytes.extend_from_slice(filler.as_bytes());
        }
        bytes.extend_from_slice(b"\r\n");

        let mut reader = BufReader::new(&bytes[..]);
        let result = read_request(&mut reader, "peer").await;
        assert!(matches!(result, Err(Error::HeadTooLarge(_))));
        assert_eq!(result.unwrap_err().status(), Some(400));
    }

    #[tokio::test]
    async fn test_endless_line_is_cut_off_at_the_limit() {
        let mut bytes = b"GET /".to_vec();
        bytes.extend(std::iter::repeat(b'a').take(8 * 1024 * 1024));

        let mut rest: &[u8] = &bytes;
        let result = read_request(&mut rest, "peer").await;
        assert!(matches!(result, Err(Error::HeadTooLarge(MAX_HEAD_BYTES))));

        let consumed = bytes.len() - rest.len();
        assert!(consumed <= MAX_HEAD_BYTES + 1, "consumed {consumed} bytes");
    }

    #[tokio::test]
    async fn test_open_stream_without_line_feed_is_rejected() {
        let (mut client, server) = tokio::io::duplex(16 * 1024);
        let writer = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            let chunk = vec![b'a'; 8 * 1024];
            let _ = client.write_all(b"GET /").await;
            loop {
                if client.write_all(&chunk).await.is_err() {
                    break;
                }
            }
        });

        let mut reader = BufReader::new(server);
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), read_head(&mut reader))
            .await
            .expect("head must be rejected without waiting for the peer");
        assert!(matches!(result, Err(Error::HeadTooLarge(_))));

        writer.abort();
    }

    #[tokio::test]
    async fn test_head_at_the_limit_is_accepted() {
        let mut bytes = b"GET / HTTP/1.1\r\nX-Filler: ".to_vec();
        let fill = MAX_HEAD_BYTES - bytes.len() - 4;
        bytes.extend(std::iter::repeat(b'a').take(fill));
        bytes.extend_from_slice(b"\r\n\r\n");
        assert_eq!(bytes.len(), MAX_HEAD_BYTES);

        let mut rest: &[u8] = &bytes;
        let head = read_head(&mut rest).await.unwrap();
        assert_eq!(head.len(), MAX_HEAD_BYTES);
        assert!(rest.is_empty());
    }
}
