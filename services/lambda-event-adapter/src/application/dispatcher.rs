/// ハンドラーディスパッチ
///
/// 1回の呼び出しでペイロードの分類、リクエスト変換、ハンドラー実行、
/// レスポンス変換を順に行う。登録できるハンドラーは1つで、受け付ける
/// トリガー種別は登録時のバリアントで決まる。
use std::fmt::Debug;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

use aws_lambda_events::event::apigw::ApiGatewayWebsocketProxyRequest;
use aws_lambda_events::event::eventbridge::EventBridgeEvent;
use aws_lambda_events::event::ses::SimpleEmailEvent;
use aws_lambda_events::event::sns::SnsEvent;
use aws_lambda_events::event::sqs::SqsEvent;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use super::classified_event::ClassifiedEvent;
use super::event_classifier::ClassifyError;
use super::request_translator::TranslateError;
use super::response_translator::{self, BodyReadError};
use crate::domain::{ApiGatewayProxyResponse, HttpRequest, HttpResponse, TriggerKind};

/// ハンドラーが返すFuture
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, lambda_runtime::Error>> + Send>>;

/// 登録済みコールバック
pub type Callback<I, O> = Arc<dyn Fn(I) -> BoxFuture<O> + Send + Sync>;

/// ディスパッチエラー
#[derive(Debug, Error)]
pub enum DispatchError {
    /// ペイロードを分類できない
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    /// リクエスト変換失敗
    #[error(transparent)]
    Translate(#[from] TranslateError),

    /// 登録済みハンドラーがこの種別を扱わない（設定エラー）
    #[error("no handler registered for {kind} events (registered: {registered})")]
    NoHandler {
        registered: &'static str,
        kind: TriggerKind,
    },

    /// ハンドラー自身のエラー
    #[error("handler failed: {0}")]
    Handler(lambda_runtime::Error),

    /// レスポンスボディの読み込み失敗
    #[error("failed to read response body: {0}")]
    ResponseBody(#[source] io::Error),

    /// 型付きイベント/レスポンスの変換失敗
    #[error("failed to convert payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// トリガー種別ごとのハンドラー
///
/// 1つのバリアントだけが有効で、扱える種別は次のとおり。
/// - `Http`: REST v1 / HTTP API v2 / Function URL / WebSocket
/// - `Websocket`: WebSocket（型付き）
/// - `Sns` / `Sqs` / `SimpleEmail`: 各Recordsバッチ
/// - `EventBridge`: ルールとスケジューラー
/// - `Raw`: 分類せずにペイロードをそのまま受け取る
#[derive(Clone)]
pub enum TriggerHandler {
    Http(Callback<HttpRequest, HttpResponse>),
    Websocket(Callback<ApiGatewayWebsocketProxyRequest, ApiGatewayProxyResponse>),
    Sns(Callback<SnsEvent, ()>),
    Sqs(Callback<SqsEvent, ()>),
    SimpleEmail(Callback<SimpleEmailEvent, ()>),
    EventBridge(Callback<EventBridgeEvent, ()>),
    Raw(Callback<Value, Value>),
}

/// async関数をコールバックに包む
fn callback<I, O, F, Fut>(f: F) -> Callback<I, O>
where
    I: 'static,
    O: 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, lambda_runtime::Error>> + Send + 'static,
{
    Arc::new(move |input: I| -> BoxFuture<O> { Box::pin(f(input)) })
}

impl TriggerHandler {
    pub fn http<F, Fut>(f: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, lambda_runtime::Error>> + Send + 'static,
    {
        Self::Http(callback(f))
    }

    pub fn websocket<F, Fut>(f: F) -> Self
    where
        F: Fn(ApiGatewayWebsocketProxyRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ApiGatewayProxyResponse, lambda_runtime::Error>>
            + Send
            + 'static,
    {
        Self::Websocket(callback(f))
    }

    pub fn sns<F, Fut>(f: F) -> Self
    where
        F: Fn(SnsEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), lambda_runtime::Error>> + Send + 'static,
    {
        Self::Sns(callback(f))
    }

    pub fn sqs<F, Fut>(f: F) -> Self
    where
        F: Fn(SqsEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), lambda_runtime::Error>> + Send + 'static,
    {
        Self::Sqs(callback(f))
    }

    pub fn simple_email<F, Fut>(f: F) -> Self
    where
        F: Fn(SimpleEmailEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), lambda_runtime::Error>> + Send + 'static,
    {
        Self::SimpleEmail(callback(f))
    }

    pub fn event_bridge<F, Fut>(f: F) -> Self
    where
        F: Fn(EventBridgeEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), lambda_runtime::Error>> + Send + 'static,
    {
        Self::EventBridge(callback(f))
    }

    pub fn raw<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, lambda_runtime::Error>> + Send + 'static,
    {
        Self::Raw(callback(f))
    }

    /// ログ/エラー用の名前
    pub fn name(&self) -> &'static str {
        match self {
            TriggerHandler::Http(_) => "Http",
            TriggerHandler::Websocket(_) => "Websocket",
            TriggerHandler::Sns(_) => "Sns",
            TriggerHandler::Sqs(_) => "Sqs",
            TriggerHandler::SimpleEmail(_) => "SimpleEmail",
            TriggerHandler::EventBridge(_) => "EventBridge",
            TriggerHandler::Raw(_) => "Raw",
        }
    }

    /// このハンドラーが種別を扱えるか
    pub fn serves(&self, kind: TriggerKind) -> bool {
        match self {
            TriggerHandler::Http(_) => kind.is_http(),
            TriggerHandler::Websocket(_) => kind == TriggerKind::ApiGatewayWebsocket,
            TriggerHandler::Sns(_) => kind == TriggerKind::Sns,
            TriggerHandler::Sqs(_) => kind == TriggerKind::Sqs,
            TriggerHandler::SimpleEmail(_) => kind == TriggerKind::SimpleEmail,
            TriggerHandler::EventBridge(_) => kind.is_event_bridge(),
            TriggerHandler::Raw(_) => true,
        }
    }
}

impl Debug for TriggerHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TriggerHandler::{}(..)", self.name())
    }
}

/// 1つのハンドラーを保持し、ペイロードごとに変換サイクルを実行する
#[derive(Debug, Clone)]
pub struct Dispatcher {
    handler: TriggerHandler,
}

impl Dispatcher {
    pub fn new(handler: TriggerHandler) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &TriggerHandler {
        &self.handler
    }

    /// 1件のペイロードを処理する
    ///
    /// # 処理フロー
    /// 1. ペイロードを分類（`Raw`ハンドラーは分類せずにそのまま渡す）
    /// 2. 種別に応じた入力に変換してハンドラーを実行
    /// 3. HTTP系は種別ごとのレスポンス形状に変換
    ///
    /// ハンドラーが種別を扱えない場合は`DispatchError::NoHandler`。
    pub async fn dispatch(&self, payload: Value) -> Result<Value, DispatchError> {
        let handler = match &self.handler {
            TriggerHandler::Raw(handler) => {
                return handler(payload).await.map_err(DispatchError::Handler);
            }
            handler => handler,
        };

        let event = ClassifiedEvent::new(&payload)?;
        let kind = event.kind();

        info!(
            kind = %kind,
            handler = handler.name(),
            records = event.records().len(),
            "イベントをディスパッチ"
        );

        match handler {
            TriggerHandler::Http(handler) if self.handler.serves(kind) => {
                let request = event.to_http_request()?;
                let response = handler(request).await.map_err(DispatchError::Handler)?;
                project_http_response(kind, response)
            }
            TriggerHandler::Websocket(handler) => {
                let request = event
                    .websocket_request()?
                    .ok_or_else(|| self.no_handler(kind))?;
                let response = handler(request).await.map_err(DispatchError::Handler)?;
                Ok(serde_json::to_value(response)?)
            }
            TriggerHandler::Sns(handler) => {
                let records = event.sns_event()?.ok_or_else(|| self.no_handler(kind))?;
                handler(records).await.map_err(DispatchError::Handler)?;
                Ok(Value::Null)
            }
            TriggerHandler::Sqs(handler) => {
                let records = event.sqs_event()?.ok_or_else(|| self.no_handler(kind))?;
                handler(records).await.map_err(DispatchError::Handler)?;
                Ok(Value::Null)
            }
            TriggerHandler::SimpleEmail(handler) => {
                let records = event
                    .simple_email_event()?
                    .ok_or_else(|| self.no_handler(kind))?;
                handler(records).await.map_err(DispatchError::Handler)?;
                Ok(Value::Null)
            }
            TriggerHandler::EventBridge(handler) => {
                let detail = event
                    .event_bridge_event()?
                    .ok_or_else(|| self.no_handler(kind))?;
                handler(detail).await.map_err(DispatchError::Handler)?;
                Ok(Value::Null)
            }
            // HTTP系以外の種別を受けたHTTPハンドラー
            _ => Err(self.no_handler(kind)),
        }
    }

    fn no_handler(&self, kind: TriggerKind) -> DispatchError {
        error!(
            registered = self.handler.name(),
            kind = %kind,
            "ハンドラーが登録されていない種別"
        );
        DispatchError::NoHandler {
            registered: self.handler.name(),
            kind,
        }
    }
}

/// 汎用レスポンスを種別ごとのレスポンス形状に変換する
pub fn project_http_response(
    kind: TriggerKind,
    response: HttpResponse,
) -> Result<Value, DispatchError> {
    match kind {
        TriggerKind::ApiGateway => {
            serialize_projection(response_translator::to_api_gateway_proxy_response(response))
        }
        TriggerKind::ApiGatewayWebsocket => {
            serialize_projection(response_translator::to_websocket_response(response))
        }
        TriggerKind::ApiGatewayV2 => {
            serialize_projection(response_translator::to_api_gateway_v2_response(response))
        }
        TriggerKind::LambdaFunctionUrl => {
            serialize_projection(response_translator::to_function_url_response(response))
        }
        other => Err(DispatchError::Translate(TranslateError::Unsupported {
            operation: "project_http_response",
            kind: other,
        })),
    }
}

fn serialize_projection<T: Serialize + Debug>(
    projected: Result<T, BodyReadError<T>>,
) -> Result<Value, DispatchError> {
    match projected {
        Ok(response) => Ok(serde_json::to_value(response)?),
        Err(BodyReadError { partial, source }) => {
            error!(partial = ?partial, error = %source, "レスポンスボディの読み込みに失敗");
            Err(DispatchError::ResponseBody(source))
        }
    }
}
