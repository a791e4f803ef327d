// ボディ/クエリ/Content-Typeの共通コーデック
//
// リクエスト方向・レスポンス方向の両方から使われる小さな変換群。

use base64::engine::general_purpose::STANDARD;
use base64::{DecodeError, Engine as _};
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::domain::HeaderMultiMap;

/// レスポンスボディの表現形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    /// UTF-8文字列のまま返す
    Text,
    /// Base64エンコードして返す（isBase64Encoded=true）
    Binary,
}

/// テキスト判定の規則
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextPolicy {
    /// text/*、json、xmlをテキストとみなす。MIMEパース失敗はバイナリ
    Gateway,
    /// Gatewayに加えてjavascript、cssもテキスト。MIMEパース失敗時は生の値で判定
    FunctionUrl,
}

/// Content-Typeからボディの表現形式を決定する
///
/// # 引数
/// * `content_type` - Content-Typeヘッダー値（未設定は`None`）
/// * `policy` - トリガー形状ごとの判定規則
pub fn body_encoding(content_type: Option<&str>, policy: TextPolicy) -> BodyEncoding {
    let raw = content_type.unwrap_or("");

    let mime_type = match (parse_media_type(raw), policy) {
        (Some(mime_type), _) => mime_type,
        (None, TextPolicy::Gateway) => return BodyEncoding::Binary,
        (None, TextPolicy::FunctionUrl) => raw.trim().to_ascii_lowercase(),
    };

    let mut text = mime_type.starts_with("text/")
        || mime_type.contains("json")
        || mime_type.contains("xml");
    if policy == TextPolicy::FunctionUrl {
        text = text || mime_type.contains("javascript") || mime_type.contains("css");
    }

    if text {
        BodyEncoding::Text
    } else {
        BodyEncoding::Binary
    }
}

/// Content-Typeからパラメーターを除いたMIMEタイプを取り出す
///
/// `type/subtype`の形でない場合は`None`。結果は小文字に正規化する。
pub fn parse_media_type(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next()?.trim();
    let (main, sub) = essence.split_once('/')?;

    if !is_token(main) || !is_token(sub) {
        return None;
    }

    Some(essence.to_ascii_lowercase())
}

/// RFC 7230のtoken文字だけで構成されているか
fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

/// ボディをレスポンス用の文字列に変換する
///
/// # 戻り値
/// `(body, is_base64_encoded)`
pub fn encode_body(bytes: &[u8], encoding: BodyEncoding) -> (String, bool) {
    match encoding {
        BodyEncoding::Text => (String::from_utf8_lossy(bytes).into_owned(), false),
        BodyEncoding::Binary => (STANDARD.encode(bytes), true),
    }
}

/// リクエストボディ文字列をバイト列に戻す
pub fn decode_body(body: &str, is_base64_encoded: bool) -> Result<Vec<u8>, DecodeError> {
    if is_base64_encoded {
        STANDARD.decode(body)
    } else {
        Ok(body.as_bytes().to_vec())
    }
}

/// 単一値マップ（`queryStringParameters`）をクエリ文字列にエンコードする
///
/// キー順にソートし、文字列でない値は無視する。
pub fn encode_single_value_query(params: &Map<String, Value>) -> String {
    let mut pairs: Vec<(&str, &str)> = params
        .iter()
        .filter_map(|(key, value)| value.as_str().map(|v| (key.as_str(), v)))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    encode_pairs(pairs)
}

/// 複数値マップ（`multiValueQueryStringParameters`）を繰り返しの`k=v`に展開する
///
/// キー順にソートし、同じキー内の値の順序は保持する。
pub fn encode_multi_value_query(params: &Map<String, Value>) -> String {
    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort();

    let pairs = keys.into_iter().flat_map(|key| {
        params[key.as_str()]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .map(move |value| (key.as_str(), value))
    });

    encode_pairs(pairs)
}

fn encode_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// JSONのヘッダーマップを追加セマンティクスでマルチマップに取り込む
///
/// 値は文字列、または文字列の配列のどちらでもよい。それ以外は無視する。
pub fn add_json_headers(headers: &mut HeaderMultiMap, source: &Map<String, Value>) {
    for (name, value) in source {
        match value {
            Value::String(text) => headers.add(name.as_str(), text.as_str()),
            Value::Array(items) => {
                for text in items.iter().filter_map(Value::as_str) {
                    headers.add(name.as_str(), text);
                }
            }
            _ => {}
        }
    }
}
