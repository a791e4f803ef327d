/// Generic HTTP request/response model shared by every HTTP-like trigger
use std::io::{self, Read};

use url::Url;

use super::header_map::HeaderMultiMap;

/// Platform-agnostic HTTP request
///
/// Produced fresh by each request projection; the URL is synthetic and only
/// used as a structured view of host, path and query.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: String,
    pub url: Url,
    pub headers: HeaderMultiMap,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Body length in bytes
    pub fn content_length(&self) -> usize {
        self.body.len()
    }

    /// First value of a query parameter
    pub fn query(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// All values of a query parameter in order
    pub fn query_all(&self, key: &str) -> Vec<String> {
        self.url
            .query_pairs()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .collect()
    }
}

/// Response body source
///
/// A `Reader` is consumed exactly once by the response projection and dropped
/// as soon as it has been drained, on success and on error alike.
#[derive(Default)]
pub enum ResponseBody {
    #[default]
    Empty,
    Bytes(Vec<u8>),
    Reader(Box<dyn Read + Send>),
}

impl ResponseBody {
    /// Drain the body into memory, releasing any reader
    pub fn read_all(self) -> io::Result<Vec<u8>> {
        match self {
            ResponseBody::Empty => Ok(Vec::new()),
            ResponseBody::Bytes(bytes) => Ok(bytes),
            ResponseBody::Reader(mut reader) => {
                let mut buffer = Vec::new();
                reader.read_to_end(&mut buffer)?;
                Ok(buffer)
            }
        }
    }
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseBody::Empty => f.write_str("Empty"),
            ResponseBody::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            ResponseBody::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(bytes: Vec<u8>) -> Self {
        ResponseBody::Bytes(bytes)
    }
}

impl From<String> for ResponseBody {
    fn from(text: String) -> Self {
        ResponseBody::Bytes(text.into_bytes())
    }
}

impl From<&str> for ResponseBody {
    fn from(text: &str) -> Self {
        ResponseBody::Bytes(text.as_bytes().to_vec())
    }
}

/// Platform-agnostic HTTP response produced by a handler
#[derive(Debug, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMultiMap,
    pub body: ResponseBody,
    /// Cookies for shapes with a dedicated cookie list (HTTP API v2)
    pub cookies: Vec<String>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Append a header value
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<ResponseBody>) -> Self {
        self.body = body.into();
        self
    }

    /// Stream the body from a reader that is drained once during projection
    pub fn with_reader(mut self, reader: impl Read + Send + 'static) -> Self {
        self.body = ResponseBody::Reader(Box::new(reader));
        self
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookies.push(cookie.into());
        self
    }

    /// `Content-Type` header value
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("Content-Type")
    }
}
