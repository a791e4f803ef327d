/// リクエスト方向の変換
///
/// HTTP系トリガー（REST v1 / HTTP API v2 / Function URL / WebSocket）の
/// ペイロードを汎用`HttpRequest`に射影する。必須でないフィールドが
/// 欠落・不正な場合は空値として扱い、エラーにするのはBase64デコード失敗と
/// URL組み立て失敗のみ。
use aws_lambda_events::event::apigw::{
    ApiGatewayProxyRequest, ApiGatewayV2httpRequest, ApiGatewayWebsocketProxyRequest,
};
use aws_lambda_events::event::lambda_function_urls::LambdaFunctionUrlRequest;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use super::codec;
use crate::domain::{HeaderMultiMap, HttpRequest, TriggerKind};

/// `requestContext.domainName`がない場合のホスト
pub const PLACEHOLDER_HOST: &str = "localhost";

/// 変換エラー
#[derive(Debug, Error)]
pub enum TranslateError {
    /// Base64ボディのデコード失敗
    #[error("failed to decode base64 body: {0}")]
    Decode(#[from] base64::DecodeError),

    /// 合成したURLのパース失敗
    #[error("failed to parse synthesized url {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// 種別に対応しない操作
    #[error("{operation} is not supported for {kind} events")]
    Unsupported {
        operation: &'static str,
        kind: TriggerKind,
    },

    /// 型付きイベントとの相互変換失敗
    #[error("failed to convert typed event: {0}")]
    Serde(#[from] serde_json::Error),
}

/// ペイロード全体を汎用HTTPリクエストに射影する
///
/// # 処理フロー
/// 1. メソッド（`requestContext.http.method` → `httpMethod`）
/// 2. URL（ホスト、パス、クエリ）
/// 3. ボディ（必要に応じてBase64デコード）
/// 4. ヘッダー（`headers`と`multiValueHeaders`を統合）
pub fn project_request(event: &Map<String, Value>) -> Result<HttpRequest, TranslateError> {
    let method = resolve_method(event).unwrap_or_default().to_string();
    let url = resolve_url(event)?;
    let body = resolve_body(event)?;
    let headers = resolve_headers(event);

    Ok(HttpRequest {
        method,
        url,
        headers,
        body,
    })
}

/// オブジェクト型のフィールドを取得
fn object_field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    object.get(key).and_then(Value::as_object)
}

/// 文字列型のフィールドを取得
fn str_field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

/// `requestContext.http`（v2 / Function URL）
fn http_description(event: &Map<String, Value>) -> Option<&Map<String, Value>> {
    object_field(event, "requestContext").and_then(|context| object_field(context, "http"))
}

/// HTTPメソッドを解決する
///
/// v2 / Function URLの`requestContext.http.method`を優先し、
/// なければv1 / WebSocketのトップレベル`httpMethod`を使う。
pub fn resolve_method(event: &Map<String, Value>) -> Option<&str> {
    http_description(event)
        .and_then(|http| str_field(http, "method"))
        .or_else(|| str_field(event, "httpMethod"))
}

/// パスを解決する
///
/// `requestContext.http`があればその`path`、なければトップレベルの`path`。
pub fn resolve_path(event: &Map<String, Value>) -> &str {
    match http_description(event) {
        Some(http) => str_field(http, "path"),
        None => str_field(event, "path"),
    }
    .unwrap_or("")
}

/// クエリ文字列を解決する
///
/// `rawQueryString` → `queryStringParameters` → `multiValueQueryStringParameters`
/// の順に評価し、最初に空でなかったものだけを使う（マージしない）。
pub fn resolve_query(event: &Map<String, Value>) -> String {
    if let Some(raw) = str_field(event, "rawQueryString").filter(|raw| !raw.is_empty()) {
        return raw.to_string();
    }

    let single = object_field(event, "queryStringParameters")
        .map(codec::encode_single_value_query)
        .unwrap_or_default();
    if !single.is_empty() {
        return single;
    }

    object_field(event, "multiValueQueryStringParameters")
        .map(codec::encode_multi_value_query)
        .unwrap_or_default()
}

/// 合成URLを組み立てる
///
/// ホストは`requestContext.domainName`、なければ`localhost`。
/// パスには必ず先頭の`/`を付ける。
pub fn resolve_url(event: &Map<String, Value>) -> Result<Url, TranslateError> {
    let host = object_field(event, "requestContext")
        .and_then(|context| str_field(context, "domainName"))
        .filter(|domain| !domain.is_empty())
        .unwrap_or(PLACEHOLDER_HOST);

    let mut url = format!("http://{host}");

    let path = resolve_path(event);
    if !path.starts_with('/') {
        url.push('/');
    }
    url.push_str(path);

    let query = resolve_query(event);
    if !query.is_empty() {
        url.push('?');
        url.push_str(&query);
    }

    Url::parse(&url).map_err(|source| TranslateError::Parse { url, source })
}

/// ボディを解決する
///
/// `body`がなければ空。`isBase64Encoded`がtrueならデコードする。
pub fn resolve_body(event: &Map<String, Value>) -> Result<Vec<u8>, TranslateError> {
    let Some(body) = str_field(event, "body") else {
        return Ok(Vec::new());
    };

    let is_base64_encoded = event
        .get("isBase64Encoded")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Ok(codec::decode_body(body, is_base64_encoded)?)
}

/// ヘッダーを解決する
///
/// `headers`と`multiValueHeaders`の値を追加セマンティクスで取り込む。
/// 同じキーが両方にある場合、API Gatewayは同じ値を両方に載せてくるため
/// `multiValueHeaders`側の値だけを採用する。
pub fn resolve_headers(event: &Map<String, Value>) -> HeaderMultiMap {
    let mut headers = HeaderMultiMap::new();
    let multi = object_field(event, "multiValueHeaders");

    if let Some(single) = object_field(event, "headers") {
        let only_single: Map<String, Value> = single
            .iter()
            .filter(|(name, _)| {
                !multi.is_some_and(|multi| {
                    multi
                        .iter()
                        .any(|(key, value)| key.eq_ignore_ascii_case(name) && value.is_array())
                })
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        codec::add_json_headers(&mut headers, &only_single);
    }

    if let Some(multi) = multi {
        codec::add_json_headers(&mut headers, multi);
    }

    headers
}

// ==================== 型付きイベントからの変換 ====================

/// 型付きイベントをワイヤー形式に戻し、非型付きの変換規則で射影する
fn project_typed<T: Serialize>(event: &T) -> Result<HttpRequest, TranslateError> {
    let value = serde_json::to_value(event)?;
    let empty = Map::new();
    project_request(value.as_object().unwrap_or(&empty))
}

/// API Gateway REST（v1）リクエストを変換
pub fn from_api_gateway_proxy_request(
    event: &ApiGatewayProxyRequest,
) -> Result<HttpRequest, TranslateError> {
    project_typed(event)
}

/// API Gateway HTTP API（v2）リクエストを変換
pub fn from_api_gateway_v2_request(
    event: &ApiGatewayV2httpRequest,
) -> Result<HttpRequest, TranslateError> {
    project_typed(event)
}

/// API Gateway WebSocketリクエストを変換
pub fn from_websocket_request(
    event: &ApiGatewayWebsocketProxyRequest,
) -> Result<HttpRequest, TranslateError> {
    project_typed(event)
}

/// Lambda Function URLリクエストを変換
pub fn from_function_url_request(
    event: &LambdaFunctionUrlRequest,
) -> Result<HttpRequest, TranslateError> {
    project_typed(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    // ==================== メソッド/パス ====================

    #[test]
    fn test_method_prefers_http_description() {
        let event = object(json!({
            "httpMethod": "GET",
            "requestContext": {"http": {"method": "PUT"}}
        }));
        assert_eq!(resolve_method(&event), Some("PUT"));
    }

    #[test]
    fn test_method_falls_back_to_top_level() {
        let event = object(json!({"httpMethod": "DELETE", "requestContext": {"httpMethod": "DELETE"}}));
        assert_eq!(resolve_method(&event), Some("DELETE"));
        assert_eq!(resolve_method(&object(json!({}))), None);
    }

    #[test]
    fn test_path_uses_http_description_when_present() {
        let event = object(json!({
            "path": "/ignored",
            "requestContext": {"http": {"path": "/v2/items"}}
        }));
        assert_eq!(resolve_path(&event), "/v2/items");
    }

    // ==================== URL ====================

    #[test]
    fn test_url_defaults_to_localhost() {
        let event = object(json!({"path": "no/leading/slash"}));
        let url = resolve_url(&event).unwrap();
        assert_eq!(url.as_str(), "http://localhost/no/leading/slash");
    }

    #[test]
    fn test_url_uses_domain_name() {
        let event = object(json!({
            "path": "/items",
            "requestContext": {"domainName": "abc.execute-api.us-east-1.amazonaws.com"}
        }));
        let url = resolve_url(&event).unwrap();
        assert_eq!(url.host_str(), Some("abc.execute-api.us-east-1.amazonaws.com"));
        assert_eq!(url.path(), "/items");
    }

    #[test]
    fn test_url_empty_domain_name_falls_back() {
        let event = object(json!({"requestContext": {"domainName": ""}}));
        let url = resolve_url(&event).unwrap();
        assert_eq!(url.host_str(), Some(PLACEHOLDER_HOST));
        assert_eq!(url.path(), "/");
    }

    #[test]
    fn test_url_parse_error() {
        let event = object(json!({"requestContext": {"domainName": "bad host:port:x"}}));
        let err = resolve_url(&event).unwrap_err();
        assert!(matches!(err, TranslateError::Parse { .. }));
    }

    // ==================== クエリ ====================

    #[test]
    fn test_raw_query_string_wins() {
        let event = object(json!({
            "rawQueryString": "a=1&a=2",
            "queryStringParameters": {"b": "2"}
        }));
        assert_eq!(resolve_query(&event), "a=1&a=2");
    }

    #[test]
    fn test_empty_raw_query_string_falls_through() {
        let event = object(json!({
            "rawQueryString": "",
            "queryStringParameters": {"b": "2"}
        }));
        assert_eq!(resolve_query(&event), "b=2");
    }

    /// 単一値マップが空でなければ複数値マップは使われない（既知の制限）
    #[test]
    fn test_single_value_query_shadows_multi_value() {
        let event = object(json!({
            "queryStringParameters": {"foo": "bar"},
            "multiValueQueryStringParameters": {"foo2": ["bar1", "bar2"]}
        }));
        assert_eq!(resolve_query(&event), "foo=bar");
    }

    #[test]
    fn test_multi_value_query_used_when_single_empty() {
        let event = object(json!({
            "queryStringParameters": null,
            "multiValueQueryStringParameters": {"foo2": ["bar1", "bar2"]}
        }));
        assert_eq!(resolve_query(&event), "foo2=bar1&foo2=bar2");
    }

    // ==================== ボディ ====================

    #[test]
    fn test_body_absent_is_empty() {
        assert!(resolve_body(&object(json!({}))).unwrap().is_empty());
        assert!(resolve_body(&object(json!({"body": null}))).unwrap().is_empty());
    }

    #[test]
    fn test_body_plain_and_base64() {
        let plain = object(json!({"body": "hello", "isBase64Encoded": false}));
        assert_eq!(resolve_body(&plain).unwrap(), b"hello");

        let encoded = object(json!({"body": "aGVsbG8=", "isBase64Encoded": true}));
        assert_eq!(resolve_body(&encoded).unwrap(), b"hello");
    }

    #[test]
    fn test_body_decode_error() {
        let event = object(json!({"body": "%%%", "isBase64Encoded": true}));
        let err = resolve_body(&event).unwrap_err();
        assert!(matches!(err, TranslateError::Decode(_)));
    }

    // ==================== ヘッダー ====================

    #[test]
    fn test_headers_merge_sources() {
        let event = object(json!({
            "headers": {"Host": "example.com", "Via": "1.1 x"},
            "multiValueHeaders": {"Via": ["1.1 x", "1.2 y"], "Accept": ["a", "b"]}
        }));

        let headers = resolve_headers(&event);

        assert_eq!(headers.get_all("Host"), ["example.com"]);
        assert_eq!(headers.get_all("Via"), ["1.1 x", "1.2 y"]);
        assert_eq!(headers.get_all("accept"), ["a", "b"]);
    }

    #[test]
    fn test_headers_single_value_sequence() {
        let event = object(json!({"headers": {"X-Forwarded-For": ["1.1.1.1", "2.2.2.2"]}}));
        let headers = resolve_headers(&event);
        assert_eq!(headers.get_all("x-forwarded-for").len(), 2);
    }

    // ==================== 全体 ====================

    #[test]
    fn test_project_request_minimal_event() {
        let request = project_request(&object(json!({"requestContext": {"http": {}}}))).unwrap();
        assert_eq!(request.method, "");
        assert_eq!(request.url.as_str(), "http://localhost/");
        assert!(request.headers.is_empty());
        assert_eq!(request.content_length(), 0);
    }

    #[test]
    fn test_typed_rest_request() {
        let event: ApiGatewayProxyRequest = serde_json::from_value(json!({
            "resource": "/{proxy+}",
            "path": "/path/to/resource",
            "httpMethod": "POST",
            "headers": {"Via": "1.1 x"},
            "multiValueHeaders": {"Via": ["1.1 x", "1.2 y"]},
            "queryStringParameters": {"foo": "bar"},
            "multiValueQueryStringParameters": {"foo": ["bar"]},
            "requestContext": {
                "accountId": "123456789012",
                "resourcePath": "/{proxy+}",
                "httpMethod": "POST",
                "stage": "prod",
                "domainName": "api.example.com"
            },
            "body": "eyJ0ZXN0IjoiYm9keSJ9",
            "isBase64Encoded": true
        }))
        .unwrap();

        let request = from_api_gateway_proxy_request(&event).unwrap();

        assert_eq!(request.method, "POST");
        assert_eq!(request.url.host_str(), Some("api.example.com"));
        assert_eq!(request.url.path(), "/path/to/resource");
        assert_eq!(request.query("foo"), Some("bar".to_string()));
        assert_eq!(request.body, br#"{"test":"body"}"#);
        // 型付きイベントのヘッダー名は小文字になるが、値は両方のマップから取り込む
        assert_eq!(request.headers.get_all("Via"), vec!["1.1 x", "1.2 y"]);
    }

    #[test]
    fn test_typed_websocket_request() {
        let event: ApiGatewayWebsocketProxyRequest = serde_json::from_value(json!({
            "headers": {"Host": "ws.example.com", "Sec-WebSocket-Version": "13"},
            "multiValueHeaders": {
                "Host": ["ws.example.com"],
                "Sec-WebSocket-Version": ["13"]
            },
            "requestContext": {
                "routeKey": "$connect",
                "eventType": "CONNECT",
                "connectionId": "L0SM9cOFvHcCIhw=",
                "domainName": "ws.example.com",
                "stage": "prod",
                "apiId": "abcd1234",
                "requestId": "L0SM9HzOFvHcCIh="
            },
            "isBase64Encoded": false
        }))
        .unwrap();

        let request = from_websocket_request(&event).unwrap();

        assert_eq!(request.method, "");
        assert_eq!(request.url.as_str(), "http://ws.example.com/");
        assert_eq!(request.headers.get("sec-websocket-version"), Some("13"));
        assert!(request.body.is_empty());
    }

    #[test]
    fn test_typed_v2_request() {
        let event: ApiGatewayV2httpRequest = serde_json::from_value(json!({
            "version": "2.0",
            "routeKey": "$default",
            "rawPath": "/my/path",
            "rawQueryString": "parameter1=value1&parameter1=value2&parameter2=value",
            "headers": {"header1": "value1", "content-type": "application/json"},
            "queryStringParameters": {"parameter1": "value1,value2", "parameter2": "value"},
            "requestContext": {
                "accountId": "123456789012",
                "apiId": "api-id",
                "domainName": "id.execute-api.us-east-1.amazonaws.com",
                "domainPrefix": "id",
                "http": {
                    "method": "POST",
                    "path": "/my/path",
                    "protocol": "HTTP/1.1",
                    "sourceIp": "192.0.2.1",
                    "userAgent": "agent"
                },
                "requestId": "id",
                "routeKey": "$default",
                "stage": "$default",
                "time": "12/Mar/2020:19:03:58 +0000",
                "timeEpoch": 1583348638390i64
            },
            "body": "eyJrIjoidiJ9",
            "isBase64Encoded": true
        }))
        .unwrap();

        let request = from_api_gateway_v2_request(&event).unwrap();

        assert_eq!(request.method, "POST");
        assert_eq!(request.url.host_str(), Some("id.execute-api.us-east-1.amazonaws.com"));
        assert_eq!(request.url.path(), "/my/path");
        assert_eq!(request.query_all("parameter1"), vec!["value1", "value2"]);
        assert_eq!(request.headers.get("Header1"), Some("value1"));
        assert_eq!(request.body, br#"{"k":"v"}"#);
    }

    #[test]
    fn test_typed_function_url_request() {
        let event: LambdaFunctionUrlRequest = serde_json::from_value(json!({
            "version": "2.0",
            "rawPath": "/hello",
            "rawQueryString": "name=world",
            "headers": {"accept": "text/plain"},
            "requestContext": {
                "accountId": "anonymous",
                "apiId": "url-id",
                "domainName": "url-id.lambda-url.us-west-2.on.aws",
                "domainPrefix": "url-id",
                "http": {
                    "method": "GET",
                    "path": "/hello",
                    "protocol": "HTTP/1.1",
                    "sourceIp": "123.123.123.123",
                    "userAgent": "agent"
                },
                "requestId": "id",
                "time": "12/Mar/2020:19:03:58 +0000",
                "timeEpoch": 1583348638390i64
            },
            "isBase64Encoded": false
        }))
        .unwrap();

        let request = from_function_url_request(&event).unwrap();

        assert_eq!(request.method, "GET");
        assert_eq!(request.url.path(), "/hello");
        assert_eq!(request.query("name"), Some("world".to_string()));
        assert_eq!(request.headers.get("Accept"), Some("text/plain"));
        assert!(request.body.is_empty());
    }
}
