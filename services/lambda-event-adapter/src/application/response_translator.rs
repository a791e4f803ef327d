/// レスポンス方向の変換
///
/// 汎用`HttpResponse`をトリガー種別ごとのレスポンス構造に射影する。
/// ボディのReaderは射影中に一度だけ読み切り、成功・失敗どちらでも解放する。
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::io;

use thiserror::Error;
use tracing::warn;

use super::codec::{self, BodyEncoding, TextPolicy};
use crate::domain::{
    ApiGatewayProxyResponse, ApiGatewayV2HttpResponse, FunctionUrlResponse, HeaderMultiMap,
    HttpResponse, ResponseBody,
};

const SET_COOKIE: &str = "Set-Cookie";

/// ボディ読み込み失敗（部分的成功）
///
/// `partial`にはステータス、ヘッダー、エンコードフラグが設定済みで、ボディだけが空。
#[derive(Debug, Error)]
#[error("failed to read response body: {source}")]
pub struct BodyReadError<T: Debug> {
    pub partial: T,
    #[source]
    pub source: io::Error,
}

/// ボディを後から設定できるレスポンス構造
trait EncodedBody: Debug {
    fn set_body(&mut self, body: String, is_base64_encoded: bool);
}

impl EncodedBody for ApiGatewayProxyResponse {
    fn set_body(&mut self, body: String, is_base64_encoded: bool) {
        self.body = body;
        self.is_base64_encoded = is_base64_encoded;
    }
}

impl EncodedBody for ApiGatewayV2HttpResponse {
    fn set_body(&mut self, body: String, is_base64_encoded: bool) {
        self.body = body;
        self.is_base64_encoded = is_base64_encoded;
    }
}

impl EncodedBody for FunctionUrlResponse {
    fn set_body(&mut self, body: String, is_base64_encoded: bool) {
        self.body = body;
        self.is_base64_encoded = is_base64_encoded;
    }
}

/// ボディを読み切ってレスポンスに設定する
///
/// 読み込みに失敗した場合もヘッダー等は保持したまま`BodyReadError`で返す。
fn fill_body<T: EncodedBody>(
    mut partial: T,
    body: ResponseBody,
    encoding: BodyEncoding,
) -> Result<T, BodyReadError<T>> {
    partial.set_body(String::new(), encoding == BodyEncoding::Binary);

    match body.read_all() {
        Ok(bytes) => {
            let (body, is_base64_encoded) = codec::encode_body(&bytes, encoding);
            partial.set_body(body, is_base64_encoded);
            Ok(partial)
        }
        Err(source) => {
            warn!(error = %source, "レスポンスボディの読み込みに失敗");
            Err(BodyReadError { partial, source })
        }
    }
}

/// ヘッダーを単一値マップと複数値マップに畳み込む
///
/// すべてのキーは単一値マップに先頭の値を持ち、値が2つ以上のキーだけが
/// 複数値マップにも全値を順序どおりに持つ。
fn fold_headers(
    headers: &HeaderMultiMap,
) -> (BTreeMap<String, String>, BTreeMap<String, Vec<String>>) {
    let mut single = BTreeMap::new();
    let mut multi = BTreeMap::new();

    for (name, values) in headers.iter() {
        let Some(first) = values.first() else {
            continue;
        };
        single.insert(name.to_string(), first.clone());
        if values.len() > 1 {
            multi.insert(name.to_string(), values.to_vec());
        }
    }

    (single, multi)
}

/// 専用の`cookies`を持たない形状向けに、CookieをSet-Cookieヘッダーへ戻す
fn headers_with_cookies(mut headers: HeaderMultiMap, cookies: Vec<String>) -> HeaderMultiMap {
    for cookie in cookies {
        headers.add(SET_COOKIE, cookie);
    }
    headers
}

/// API Gateway REST（v1）レスポンスに射影する
pub fn to_api_gateway_proxy_response(
    response: HttpResponse,
) -> Result<ApiGatewayProxyResponse, BodyReadError<ApiGatewayProxyResponse>> {
    let HttpResponse {
        status,
        headers,
        body,
        cookies,
    } = response;
    let headers = headers_with_cookies(headers, cookies);

    let encoding = codec::body_encoding(headers.get("Content-Type"), TextPolicy::Gateway);
    let (single, multi) = fold_headers(&headers);

    let partial = ApiGatewayProxyResponse {
        status_code: status,
        headers: single,
        multi_value_headers: multi,
        ..Default::default()
    };

    fill_body(partial, body, encoding)
}

/// API Gateway WebSocketレスポンスに射影する（REST v1と同じ形）
pub fn to_websocket_response(
    response: HttpResponse,
) -> Result<ApiGatewayProxyResponse, BodyReadError<ApiGatewayProxyResponse>> {
    to_api_gateway_proxy_response(response)
}

/// API Gateway HTTP API（v2）レスポンスに射影する
///
/// Set-Cookieヘッダー（大文字小文字を区別しない）はすべて`cookies`に移し、
/// ヘッダーマップには残さない。
pub fn to_api_gateway_v2_response(
    response: HttpResponse,
) -> Result<ApiGatewayV2HttpResponse, BodyReadError<ApiGatewayV2HttpResponse>> {
    let HttpResponse {
        status,
        mut headers,
        body,
        cookies: explicit_cookies,
    } = response;

    let mut cookies = headers.remove(SET_COOKIE).unwrap_or_default();
    cookies.extend(explicit_cookies);

    let encoding = codec::body_encoding(headers.get("Content-Type"), TextPolicy::Gateway);
    let (single, multi) = fold_headers(&headers);

    let partial = ApiGatewayV2HttpResponse {
        status_code: status,
        headers: single,
        multi_value_headers: multi,
        cookies,
        ..Default::default()
    };

    fill_body(partial, body, encoding)
}

/// Lambda Function URLレスポンスに射影する
///
/// 複数値ヘッダーの概念がないため、値は`", "`で連結する。
pub fn to_function_url_response(
    response: HttpResponse,
) -> Result<FunctionUrlResponse, BodyReadError<FunctionUrlResponse>> {
    let HttpResponse {
        status,
        headers,
        body,
        cookies,
    } = response;
    let headers = headers_with_cookies(headers, cookies);

    let encoding = codec::body_encoding(headers.get("Content-Type"), TextPolicy::FunctionUrl);
    let joined = headers
        .iter()
        .map(|(name, values)| (name.to_string(), values.join(", ")))
        .collect();

    let partial = FunctionUrlResponse {
        status_code: status,
        headers: joined,
        ..Default::default()
    };

    fill_body(partial, body, encoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use std::io::{Cursor, Read};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FailingReader {
        dropped: Arc<AtomicBool>,
    }

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "upstream closed"))
        }
    }

    impl Drop for FailingReader {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    // ==================== REST v1 ====================

    #[test]
    fn test_v1_header_folding() {
        let response = HttpResponse::new(200)
            .with_header("Content-Type", "text/plain")
            .with_header("Vary", "Accept")
            .with_header("Vary", "Origin")
            .with_header("vary", "Cookie")
            .with_body("hello");

        let projected = to_api_gateway_proxy_response(response).unwrap();

        assert_eq!(projected.status_code, 200);
        assert_eq!(projected.headers.len(), 2);
        assert_eq!(projected.headers["Content-Type"], "text/plain");
        assert_eq!(projected.headers["Vary"], "Accept");
        assert_eq!(projected.multi_value_headers.len(), 1);
        assert_eq!(
            projected.multi_value_headers["Vary"],
            vec!["Accept", "Origin", "Cookie"]
        );
        assert_eq!(projected.body, "hello");
        assert!(!projected.is_base64_encoded);
    }

    #[test]
    fn test_v1_binary_body() {
        let bytes = vec![0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a];
        let response = HttpResponse::new(200)
            .with_header("Content-Type", "image/png")
            .with_body(bytes.clone());

        let projected = to_api_gateway_proxy_response(response).unwrap();

        assert!(projected.is_base64_encoded);
        assert_eq!(STANDARD.decode(&projected.body).unwrap(), bytes);
    }

    #[test]
    fn test_v1_missing_content_type_is_binary() {
        let projected = to_api_gateway_proxy_response(HttpResponse::new(200).with_body("x")).unwrap();
        assert!(projected.is_base64_encoded);
        assert_eq!(projected.body, "eA==");
    }

    #[test]
    fn test_v1_cookies_become_set_cookie_headers() {
        let response = HttpResponse::new(200)
            .with_header("Set-Cookie", "a=1")
            .with_cookie("b=2");

        let projected = to_api_gateway_proxy_response(response).unwrap();

        assert_eq!(projected.headers["Set-Cookie"], "a=1");
        assert_eq!(projected.multi_value_headers["Set-Cookie"], vec!["a=1", "b=2"]);
    }

    #[test]
    fn test_websocket_uses_v1_shape() {
        let response = HttpResponse::new(200)
            .with_header("Content-Type", "application/json")
            .with_body(r#"{"ok":true}"#);

        let projected = to_websocket_response(response).unwrap();

        assert_eq!(projected.body, r#"{"ok":true}"#);
        assert!(!projected.is_base64_encoded);
    }

    // ==================== HTTP API v2 ====================

    #[test]
    fn test_v2_extracts_set_cookie() {
        let response = HttpResponse::new(302)
            .with_header("Content-Type", "application/json")
            .with_header("Set-Cookie", "a=1")
            .with_header("set-cookie", "b=2")
            .with_header("Location", "/next")
            .with_cookie("c=3")
            .with_body("{}");

        let projected = to_api_gateway_v2_response(response).unwrap();

        assert_eq!(projected.status_code, 302);
        assert_eq!(projected.cookies, vec!["a=1", "b=2", "c=3"]);
        assert!(
            !projected
                .headers
                .keys()
                .any(|k| k.eq_ignore_ascii_case("set-cookie"))
        );
        assert!(projected.multi_value_headers.is_empty());
        assert_eq!(projected.headers["Location"], "/next");
        assert!(!projected.is_base64_encoded);
        assert_eq!(projected.body, "{}");
    }

    // ==================== Function URL ====================

    #[test]
    fn test_function_url_joins_values() {
        let response = HttpResponse::new(200)
            .with_header("Content-Type", "application/javascript")
            .with_header("Cache-Control", "no-cache")
            .with_header("Cache-Control", "no-store")
            .with_body("console.log(1)");

        let projected = to_function_url_response(response).unwrap();

        assert_eq!(projected.headers["Cache-Control"], "no-cache, no-store");
        assert_eq!(projected.body, "console.log(1)");
        assert!(!projected.is_base64_encoded);
    }

    #[test]
    fn test_function_url_binary_body() {
        let response = HttpResponse::new(200)
            .with_header("Content-Type", "application/octet-stream")
            .with_reader(Cursor::new(vec![0u8, 255]));

        let projected = to_function_url_response(response).unwrap();

        assert!(projected.is_base64_encoded);
        assert_eq!(projected.body, "AP8=");
    }

    // ==================== 部分的成功 ====================

    #[test]
    fn test_body_read_failure_returns_partial_response() {
        let dropped = Arc::new(AtomicBool::new(false));
        let response = HttpResponse::new(503)
            .with_header("Content-Type", "application/json")
            .with_header("Retry-After", "5")
            .with_reader(FailingReader {
                dropped: dropped.clone(),
            });

        let err = to_api_gateway_proxy_response(response).unwrap_err();

        assert_eq!(err.source.kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(err.partial.status_code, 503);
        assert_eq!(err.partial.headers["Retry-After"], "5");
        assert!(err.partial.body.is_empty());
        assert!(!err.partial.is_base64_encoded);
        // Readerはエラー時も解放される
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_body_read_failure_v2_keeps_cookies() {
        let dropped = Arc::new(AtomicBool::new(false));
        let response = HttpResponse::new(200)
            .with_header("Set-Cookie", "a=1")
            .with_reader(FailingReader {
                dropped: dropped.clone(),
            });

        let err = to_api_gateway_v2_response(response).unwrap_err();

        assert_eq!(err.partial.cookies, vec!["a=1"]);
        assert!(err.partial.is_base64_encoded);
        assert!(dropped.load(Ordering::SeqCst));
    }
}
