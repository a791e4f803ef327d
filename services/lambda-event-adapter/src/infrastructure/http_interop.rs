/// lambda_http型との相互変換
///
/// lambda_httpの`Request`/`Response`で書かれたハンドラーを
/// 汎用HTTPハンドラーとしてDispatcherに登録できるようにする。
use std::future::Future;
use std::sync::Arc;

use lambda_http::{Body, Request, Response};
use thiserror::Error;

use crate::application::TriggerHandler;
use crate::domain::{HeaderMultiMap, HttpRequest, HttpResponse};

/// 相互変換エラー
#[derive(Debug, Error)]
pub enum InteropError {
    /// lambda_http::Requestを組み立てられない
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] lambda_http::http::Error),

    /// 文字列として読めないヘッダー値
    #[error("header value is not visible ASCII: {0}")]
    InvalidHeaderValue(String),

    /// 変換できない種類のレスポンスボディ
    #[error("unsupported response body: {0}")]
    UnsupportedBody(String),
}

/// 汎用リクエストをlambda_http::Requestに変換する
pub fn to_lambda_http_request(request: HttpRequest) -> Result<Request, InteropError> {
    let mut builder = lambda_http::http::Request::builder()
        .method(request.method.as_str())
        .uri(request.url.as_str());

    for (name, values) in request.headers.iter() {
        for value in values {
            builder = builder.header(name, value.as_str());
        }
    }

    let body = if request.body.is_empty() {
        Body::Empty
    } else {
        Body::from(request.body)
    };

    Ok(builder.body(body)?)
}

/// lambda_http::Responseを汎用レスポンスに変換する
pub fn from_lambda_http_response(response: Response<Body>) -> Result<HttpResponse, InteropError> {
    let (parts, body) = response.into_parts();

    let mut headers = HeaderMultiMap::new();
    for (name, value) in parts.headers.iter() {
        let value = value
            .to_str()
            .map_err(|_| InteropError::InvalidHeaderValue(name.to_string()))?;
        headers.add(name.as_str(), value);
    }

    let bytes = match body {
        Body::Empty => Vec::new(),
        Body::Text(text) => text.into_bytes(),
        Body::Binary(bytes) => bytes,
        #[allow(unreachable_patterns)]
        other => return Err(InteropError::UnsupportedBody(format!("{other:?}"))),
    };

    Ok(HttpResponse {
        status: parts.status.as_u16(),
        headers,
        body: bytes.into(),
        cookies: Vec::new(),
    })
}

/// lambda_httpスタイルのハンドラーをHTTPハンドラーとして包む
pub fn lambda_http_handler<F, Fut>(f: F) -> TriggerHandler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response<Body>, lambda_runtime::Error>> + Send + 'static,
{
    let f = Arc::new(f);

    TriggerHandler::http(move |request: HttpRequest| {
        let f = Arc::clone(&f);
        async move {
            let request = to_lambda_http_request(request)?;
            let response = f(request).await?;
            Ok::<HttpResponse, lambda_runtime::Error>(from_lambda_http_response(response)?)
        }
    })
}
