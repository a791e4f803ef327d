/// イベント種別判定
///
/// 型タグを持たないLambdaペイロードを、フィールドの有無と形状だけで
/// トリガー種別に分類する。判定は決定表として上から順に評価し、
/// 最初に該当したルールが採用される。
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::domain::TriggerKind;

/// エラーメッセージに埋め込む値の最大長
const MAX_DESCRIBED_LEN: usize = 512;

/// 分類失敗時のエラー
///
/// いずれも問題のあったフィールドと実際の値を含む。
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClassifyError {
    /// ペイロード自体がオブジェクトでない
    #[error("event is not an object: {0}")]
    NotAnObject(String),

    /// Recordsが空、または先頭要素がオブジェクトでない
    #[error("records is not an array of objects: {0}")]
    RecordsNotArrayOfObjects(String),

    /// Records[0]がSNS/SQS/SESのいずれにも該当しない
    #[error("unknown record format: {0}")]
    UnknownRecordFormat(String),

    /// requestContextがオブジェクトでない
    #[error("requestContext is not an object: {0}")]
    RequestContextNotAnObject(String),

    /// requestContextが既知のいずれの形にも該当しない
    #[error("unknown requestContext format: {0}")]
    UnknownRequestContext(String),

    /// sourceが既知の値でない
    #[error("unknown source: {0}")]
    UnknownSource(String),

    /// どのルールにも該当しない
    #[error("unknown event format: {0}")]
    UnknownEventFormat(String),
}

/// 1ルールの判定結果
///
/// `None`はルール対象のキーが存在しない（次のルールへ進む）ことを表す。
type Verdict = Option<Result<TriggerKind, ClassifyError>>;

/// トップレベルの決定表（評価順が優先順位）
const RULES: [(&str, fn(&Map<String, Value>) -> Verdict); 3] = [
    ("Records", records_rule),
    ("requestContext", request_context_rule),
    ("source", source_rule),
];

/// Records[0]のフィンガープリント
const RECORD_FINGERPRINTS: [(&str, TriggerKind); 3] = [
    ("Sns", TriggerKind::Sns),
    ("messageId", TriggerKind::Sqs),
    ("ses", TriggerKind::SimpleEmail),
];

/// requestContextのフィンガープリント
///
/// WebSocketの接続/切断フレームはrouteKeyも持つため、statusを最初に判定する。
const REQUEST_CONTEXT_FINGERPRINTS: [(&str, TriggerKind); 4] = [
    ("status", TriggerKind::ApiGatewayWebsocket),
    ("routeKey", TriggerKind::ApiGatewayV2),
    ("httpMethod", TriggerKind::ApiGateway),
    ("http", TriggerKind::LambdaFunctionUrl),
];

/// EventBridgeのsource値
const SOURCE_VALUES: [(&str, TriggerKind); 2] = [
    ("aws.events", TriggerKind::EventBridgeRules),
    ("aws.scheduler", TriggerKind::EventBridgeScheduler),
];

/// ペイロードのトリガー種別を判定する
///
/// 外部状態を参照しない純粋関数で、同じ入力には常に同じ結果を返す。
///
/// # 引数
/// * `raw` - JSONデコード済みのペイロード
///
/// # 戻り値
/// * `Ok(TriggerKind)` - 判定できた種別（`Unknown`は返さない）
/// * `Err(ClassifyError)` - 構造が認識できない場合
pub fn classify(raw: &Value) -> Result<TriggerKind, ClassifyError> {
    let event = raw
        .as_object()
        .ok_or_else(|| ClassifyError::NotAnObject(describe(raw)))?;

    classify_object(event)
}

/// オブジェクト化済みのペイロードを判定する
pub fn classify_object(event: &Map<String, Value>) -> Result<TriggerKind, ClassifyError> {
    for (key, rule) in RULES {
        if let Some(verdict) = rule(event) {
            debug!(rule = key, verdict = ?verdict, "トリガー種別判定");
            return verdict;
        }
    }

    Err(ClassifyError::UnknownEventFormat(describe_map(event)))
}

fn records_rule(event: &Map<String, Value>) -> Verdict {
    let records = event.get("Records")?;

    let first = records
        .as_array()
        .and_then(|array| array.first())
        .and_then(Value::as_object);
    let Some(record) = first else {
        return Some(Err(ClassifyError::RecordsNotArrayOfObjects(describe(
            records,
        ))));
    };

    Some(
        match_fingerprint(record, &RECORD_FINGERPRINTS)
            .ok_or_else(|| ClassifyError::UnknownRecordFormat(describe_map(record))),
    )
}

fn request_context_rule(event: &Map<String, Value>) -> Verdict {
    let request_context = event.get("requestContext")?;

    let Some(context) = request_context.as_object() else {
        return Some(Err(ClassifyError::RequestContextNotAnObject(describe(
            request_context,
        ))));
    };

    Some(
        match_fingerprint(context, &REQUEST_CONTEXT_FINGERPRINTS)
            .ok_or_else(|| ClassifyError::UnknownRequestContext(describe_map(context))),
    )
}

fn source_rule(event: &Map<String, Value>) -> Verdict {
    let source = event.get("source")?;

    let kind = source.as_str().and_then(|value| {
        SOURCE_VALUES
            .iter()
            .find(|(expected, _)| *expected == value)
            .map(|(_, kind)| *kind)
    });

    Some(kind.ok_or_else(|| ClassifyError::UnknownSource(describe(source))))
}

/// キーの存在だけで判定するフィンガープリント照合
fn match_fingerprint(
    object: &Map<String, Value>,
    fingerprints: &[(&str, TriggerKind)],
) -> Option<TriggerKind> {
    fingerprints
        .iter()
        .find(|(key, _)| object.contains_key(*key))
        .map(|(_, kind)| *kind)
}

/// 診断用に値を文字列化（長すぎる場合は切り詰める）
pub(crate) fn describe(value: &Value) -> String {
    let mut text = value.to_string();
    if text.len() > MAX_DESCRIBED_LEN {
        let mut end = MAX_DESCRIBED_LEN;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        text.push_str("...");
    }
    text
}

fn describe_map(map: &Map<String, Value>) -> String {
    describe(&Value::Object(map.clone()))
}
