/// 分類済みイベント
///
/// 生ペイロードと判定済みの種別を組にして保持し、種別ごとのアクセサを提供する。
/// ペイロードは借用するだけで、呼び出しをまたいで保持しない。
use aws_lambda_events::event::apigw::{
    ApiGatewayProxyRequest, ApiGatewayV2httpRequest, ApiGatewayWebsocketProxyRequest,
};
use aws_lambda_events::event::eventbridge::EventBridgeEvent;
use aws_lambda_events::event::lambda_function_urls::LambdaFunctionUrlRequest;
use aws_lambda_events::event::ses::SimpleEmailEvent;
use aws_lambda_events::event::sns::SnsEvent;
use aws_lambda_events::event::sqs::SqsEvent;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use url::Url;

use super::event_classifier::{classify_object, describe, ClassifyError};
use super::request_translator::{self, TranslateError};
use crate::domain::{HeaderMultiMap, HttpRequest, TriggerKind};

/// 種別判定済みのペイロード
#[derive(Debug, Clone, Copy)]
pub struct ClassifiedEvent<'a> {
    raw: &'a Value,
    fields: &'a Map<String, Value>,
    kind: TriggerKind,
}

impl<'a> ClassifiedEvent<'a> {
    /// ペイロードを分類する
    ///
    /// オブジェクトでない、またはどの種別にも該当しない場合は`ClassifyError`。
    pub fn new(raw: &'a Value) -> Result<Self, ClassifyError> {
        let fields = raw
            .as_object()
            .ok_or_else(|| ClassifyError::NotAnObject(describe(raw)))?;
        let kind = classify_object(fields)?;

        Ok(Self { raw, fields, kind })
    }

    pub fn kind(&self) -> TriggerKind {
        self.kind
    }

    pub fn raw(&self) -> &'a Value {
        self.raw
    }

    /// `Records`配列の各レコード（SNS / SQS / SES以外は空）
    pub fn records(&self) -> &'a [Value] {
        if !self.kind.is_record_batch() {
            return &[];
        }
        self.fields
            .get("Records")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// HTTP系でない種別に対する操作のエラー
    fn unsupported(&self, operation: &'static str) -> TranslateError {
        TranslateError::Unsupported {
            operation,
            kind: self.kind,
        }
    }

    // ==================== HTTPアクセサ ====================

    /// HTTPメソッド
    ///
    /// `requestContext`を持たない種別ではエラーを返す。
    pub fn method(&self) -> Result<String, TranslateError> {
        if !self.kind.is_http() {
            return Err(self.unsupported("method"));
        }
        Ok(request_translator::resolve_method(self.fields)
            .unwrap_or_default()
            .to_string())
    }

    /// リクエストヘッダー（HTTP系以外は空）
    pub fn headers(&self) -> HeaderMultiMap {
        if !self.kind.is_http() {
            return HeaderMultiMap::new();
        }
        request_translator::resolve_headers(self.fields)
    }

    /// リクエストボディ（HTTP系以外、または`body`がない場合は空）
    pub fn body(&self) -> Result<Vec<u8>, TranslateError> {
        if !self.kind.is_http() {
            return Ok(Vec::new());
        }
        request_translator::resolve_body(self.fields)
    }

    /// 合成URL
    ///
    /// URLを持たない種別ではエラーを返す。
    pub fn url(&self) -> Result<Url, TranslateError> {
        if !self.kind.is_http() {
            return Err(self.unsupported("url"));
        }
        request_translator::resolve_url(self.fields)
    }

    /// 汎用HTTPリクエストに射影する
    pub fn to_http_request(&self) -> Result<HttpRequest, TranslateError> {
        if !self.kind.is_http() {
            return Err(self.unsupported("to_http_request"));
        }
        request_translator::project_request(self.fields)
    }

    // ==================== 型付きアクセサ ====================

    /// 種別が一致する場合だけ型付きイベントにデコードする
    fn typed<T: DeserializeOwned>(&self, matches: bool) -> Result<Option<T>, serde_json::Error> {
        if !matches {
            return Ok(None);
        }
        T::deserialize(self.raw).map(Some)
    }

    pub fn api_gateway_request(&self) -> Result<Option<ApiGatewayProxyRequest>, serde_json::Error> {
        self.typed(self.kind == TriggerKind::ApiGateway)
    }

    pub fn api_gateway_v2_request(
        &self,
    ) -> Result<Option<ApiGatewayV2httpRequest>, serde_json::Error> {
        self.typed(self.kind == TriggerKind::ApiGatewayV2)
    }

    pub fn websocket_request(
        &self,
    ) -> Result<Option<ApiGatewayWebsocketProxyRequest>, serde_json::Error> {
        self.typed(self.kind == TriggerKind::ApiGatewayWebsocket)
    }

    pub fn function_url_request(
        &self,
    ) -> Result<Option<LambdaFunctionUrlRequest>, serde_json::Error> {
        self.typed(self.kind == TriggerKind::LambdaFunctionUrl)
    }

    pub fn sns_event(&self) -> Result<Option<SnsEvent>, serde_json::Error> {
        self.typed(self.kind == TriggerKind::Sns)
    }

    pub fn sqs_event(&self) -> Result<Option<SqsEvent>, serde_json::Error> {
        self.typed(self.kind == TriggerKind::Sqs)
    }

    pub fn simple_email_event(&self) -> Result<Option<SimpleEmailEvent>, serde_json::Error> {
        self.typed(self.kind == TriggerKind::SimpleEmail)
    }

    /// EventBridgeイベント（ルール、スケジューラー共通）
    pub fn event_bridge_event(&self) -> Result<Option<EventBridgeEvent>, serde_json::Error> {
        self.typed(self.kind.is_event_bridge())
    }
}
