/// Lambdaランタイムとの接続
///
/// lambda_runtimeからペイロードを受け取り、Dispatcherで1回分の変換サイクルを実行する。
use std::sync::Arc;

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::{error, info};

use crate::application::Dispatcher;

/// Dispatcherをハンドラーとしてランタイムを起動する
pub async fn run(dispatcher: Dispatcher) -> Result<(), Error> {
    let dispatcher = Arc::new(dispatcher);

    info!(handler = dispatcher.handler().name(), "Lambdaランタイム起動");

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let dispatcher = Arc::clone(&dispatcher);
        async move { handle(&dispatcher, event).await }
    }))
    .await
}

/// 1回の呼び出しを処理する
///
/// 失敗はリクエストIDとともにログに残し、ランタイムへエラーとして返す。
pub async fn handle(dispatcher: &Dispatcher, event: LambdaEvent<Value>) -> Result<Value, Error> {
    let (payload, context) = event.into_parts();
    let request_id = context.request_id;

    match dispatcher.dispatch(payload).await {
        Ok(output) => Ok(output),
        Err(err) => {
            error!(request_id = %request_id, error = %err, "イベント処理失敗");
            Err(err.into())
        }
    }
}
