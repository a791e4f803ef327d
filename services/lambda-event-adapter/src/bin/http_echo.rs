/// HTTPエコーLambdaエントリポイント
///
/// REST / HTTP API / Function URL / WebSocketのいずれのトリガーでも受け付け、
/// 正規化したリクエストの内容をJSONで返す。
use lambda_event_adapter::application::{Dispatcher, TriggerHandler};
use lambda_event_adapter::domain::{HttpRequest, HttpResponse};
use lambda_event_adapter::infrastructure::{init_logging, is_running_on_lambda, run};
use lambda_runtime::Error;
use serde_json::{Map, Value, json};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // 構造化ログを初期化
    init_logging();

    info!(on_lambda = is_running_on_lambda(), "HTTPエコーLambda関数を初期化");

    run(Dispatcher::new(TriggerHandler::http(handler))).await
}

/// 受信したリクエストをJSONで返す
async fn handler(request: HttpRequest) -> Result<HttpResponse, Error> {
    info!(method = %request.method, path = %request.url.path(), "リクエスト受信");

    let body = serde_json::to_vec(&describe(&request))?;

    Ok(HttpResponse::new(200)
        .with_header("Content-Type", "application/json")
        .with_body(body))
}

/// リクエストの内容をJSONにする
fn describe(request: &HttpRequest) -> Value {
    let headers: Map<String, Value> = request
        .headers
        .iter()
        .map(|(name, values)| (name.to_string(), json!(values)))
        .collect();

    json!({
        "method": request.method,
        "url": request.url.as_str(),
        "path": request.url.path(),
        "query": request.url.query(),
        "headers": headers,
        "body": String::from_utf8_lossy(&request.body),
    })
}
