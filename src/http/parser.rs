use crate::http::request::{Method, Request};
use crate::http::response::StatusCode;

/// Marks the end of a request header block.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

const PROTOCOL: &str = "HTTP/1.1";

/// Reasons a framed request is rejected.
///
/// Every variant except `Incomplete` maps to the status the client receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// No complete header block yet.
    Incomplete,
    /// Request line missing or not `METHOD /path PROTOCOL`.
    InvalidRequest,
    /// Path contains a `..` sequence.
    PathTraversal,
    /// Method is not GET, HEAD or POST.
    InvalidMethod,
    /// Protocol token is `HTTP/x.y` but not HTTP/1.1.
    UnsupportedVersion,
    /// Protocol token is not an HTTP version at all.
    InvalidVersion,
    /// A header line without a colon.
    InvalidHeader,
    /// Content-Length is not a number.
    InvalidContentLength,
}

impl ParseError {
    /// Status code of the response that answers this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ParseError::InvalidMethod => StatusCode::NotImplemented,
            ParseError::UnsupportedVersion => StatusCode::VersionNotSupported,
            _ => StatusCode::BadRequest,
        }
    }
}

/// Result of looking for the next request in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// A full request (headers plus declared body) of this many bytes.
    Complete(usize),
    /// More bytes are needed.
    Partial,
    /// The request declares more bytes than `limit` can ever hold.
    TooLarge,
}

/// Finds the next request frame at the start of `buf`.
///
/// A frame ends after the header terminator plus `Content-Length` body bytes.
/// An unparsable Content-Length frames the header block alone so the parser
/// can reject it.
pub fn next_frame(buf: &[u8], limit: usize) -> Frame {
    let Some(headers_end) = find_headers_end(buf) else {
        return Frame::Partial;
    };
    let head_len = headers_end + HEADER_TERMINATOR.len();

    let body_len = header_value(&buf[..head_len], "Content-Length")
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let total = head_len.saturating_add(body_len);
    if total > limit {
        Frame::TooLarge
    } else if buf.len() < total {
        Frame::Partial
    } else {
        Frame::Complete(total)
    }
}

/// Counts complete frames at the front of `buf`, stopping at `cap`.
pub fn count_frames(buf: &[u8], limit: usize, cap: usize) -> usize {
    let mut count = 0;
    let mut rest = buf;
    while count < cap {
        match next_frame(rest, limit) {
            Frame::Complete(len) => {
                count += 1;
                rest = &rest[len..];
            }
            _ => break,
        }
    }
    count
}

/// Parses and validates one framed request.
///
/// Checks run in a fixed order and the first failure wins: header block,
/// request line, path shape, traversal, method, protocol, then headers.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    let headers_end = find_headers_end(buf).ok_or(ParseError::Incomplete)?;
    let header_bytes = &buf[..headers_end];
    let body_bytes = &buf[headers_end + HEADER_TERMINATOR.len()..];

    let line_end = find(header_bytes, b"\r\n").unwrap_or(header_bytes.len());
    if line_end == 0 {
        return Err(ParseError::InvalidRequest);
    }

    let request_line =
        std::str::from_utf8(&header_bytes[..line_end]).map_err(|_| ParseError::InvalidRequest)?;

    let mut parts = request_line.splitn(3, ' ');
    let method_str = parts.next().filter(|s| !s.is_empty());
    let path = parts.next().filter(|s| !s.is_empty());
    let version = parts.next().filter(|s| !s.is_empty());

    let (Some(method_str), Some(path), Some(version)) = (method_str, path, version) else {
        return Err(ParseError::InvalidRequest);
    };
    if !path.starts_with('/') {
        return Err(ParseError::InvalidRequest);
    }
    if path.contains("..") {
        return Err(ParseError::PathTraversal);
    }

    let method = Method::from_str(method_str).ok_or(ParseError::InvalidMethod)?;

    if !version.eq_ignore_ascii_case(PROTOCOL) {
        let looks_like_http = version
            .get(..5)
            .is_some_and(|p| p.eq_ignore_ascii_case("HTTP/"));
        return Err(if looks_like_http {
            ParseError::UnsupportedVersion
        } else {
            ParseError::InvalidVersion
        });
    }

    // Headers
    let mut headers = Vec::new();
    if line_end < header_bytes.len() {
        let rest = std::str::from_utf8(&header_bytes[line_end + 2..])
            .map_err(|_| ParseError::InvalidHeader)?;

        for line in rest.split("\r\n") {
            if line.is_empty() {
                continue;
            }

            let (key, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;

            headers.push((key.trim().to_string(), value.trim().to_string()));
        }
    }

    // Body
    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
        .map(|(_, v)| v.parse::<usize>().map_err(|_| ParseError::InvalidContentLength))
        .transpose()?
        .unwrap_or(0);

    if body_bytes.len() < content_length {
        return Err(ParseError::Incomplete);
    }

    let request = Request {
        method,
        path: path.to_string(),
        version: version.to_string(),
        headers,
        body: body_bytes[..content_length].to_vec(),
    };

    let total_consumed = headers_end + HEADER_TERMINATOR.len() + content_length;
    Ok((request, total_consumed))
}

/// Extracts a header value from a raw header block.
///
/// The name matches case-insensitively and only at the start of a header
/// line, never on the request line. Surrounding whitespace is trimmed.
pub fn header_value<'a>(headers: &'a [u8], key: &str) -> Option<&'a str> {
    let text = std::str::from_utf8(headers).ok()?;
    text.split("\r\n").skip(1).find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim().eq_ignore_ascii_case(key).then_some(value.trim())
    })
}

/// Whether the raw header block asks for `Connection: keep-alive`.
pub fn wants_keep_alive(headers: &[u8]) -> bool {
    header_value(headers, "Connection").is_some_and(|v| v.eq_ignore_ascii_case("keep-alive"))
}

pub fn find_headers_end(buf: &[u8]) -> Option<usize> {
    find(buf, HEADER_TERMINATOR)
}

fn find(buf: &[u8], needle: &[u8]) -> Option<usize> {
    buf.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";

        let (parsed, consumed) = parse_http_request(req).unwrap();

        assert_eq!(parsed.path, "/");
        assert_eq!(parsed.header("Host").unwrap(), "example.com");
        assert_eq!(consumed, req.len());
    }

    #[test]
    fn frames_include_declared_body() {
        let buf = b"POST / HTTP/1.1\r\nContent-Length: 3\r\n\r\nabcGET";
        assert_eq!(next_frame(buf, 4096), Frame::Complete(buf.len() - 3));
    }

    #[test]
    fn frame_waits_for_body() {
        let buf = b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc";
        assert_eq!(next_frame(buf, 4096), Frame::Partial);
    }

    #[test]
    fn frame_larger_than_limit() {
        let buf = b"POST / HTTP/1.1\r\nContent-Length: 99999\r\n\r\n";
        assert_eq!(next_frame(buf, 4096), Frame::TooLarge);
    }

    #[test]
    fn count_stops_at_cap() {
        let one = b"GET / HTTP/1.1\r\n\r\n";
        let buf: Vec<u8> = one.iter().copied().cycle().take(one.len() * 12).collect();
        assert_eq!(count_frames(&buf, 4096, 10), 10);
        assert_eq!(count_frames(&buf[..one.len() * 3 + 4], 4096, 10), 3);
    }

    #[test]
    fn header_value_ignores_request_line() {
        let head = b"GET /Connection:x HTTP/1.1\r\nconnection:  Keep-Alive \r\n\r\n";
        assert_eq!(header_value(head, "Connection"), Some("Keep-Alive"));
        assert!(wants_keep_alive(head));
    }
}
