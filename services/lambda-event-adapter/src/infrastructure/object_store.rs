//! コンテンツストア（S3）モジュール
//!
//! プレフィックス単位の一覧取得、キー指定の取得・書き込み・削除を提供する。
//! 一覧は`/`区切りで、共通プレフィックスはディレクトリとして返す。

use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::primitives::{ByteStream, DateTime as SdkDateTime};
use aws_sdk_s3::types::{CommonPrefix, Object};
use aws_sdk_s3::Client as S3Client;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use super::config::ObjectStoreConfig;
use crate::domain::HttpResponse;

/// 一覧のパス区切り
pub const PATH_DELIMITER: &str = "/";

/// コンテンツストア操作のエラー型
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    /// AWS SDK エラー
    #[error("AWS S3 APIエラー: {0}")]
    AwsSdkError(String),
    /// オブジェクト本文の読み込みエラー
    #[error("オブジェクト読み込みエラー: {0}")]
    BodyReadError(String),
    /// ローカルファイルの読み込みエラー
    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),
}

/// 一覧の1エントリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    /// 共通プレフィックス（ディレクトリ）ならtrue
    pub is_dir: bool,
    pub size: Option<i64>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// 一覧結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectListing {
    pub items: Vec<StoredObject>,
    /// 続きがある場合の継続トークン
    pub next_continuation_token: Option<String>,
}

/// 取得したオブジェクトのメタデータ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub key: String,
    pub size: Option<i64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
}

/// 取得したオブジェクト
#[derive(Debug, Clone)]
pub struct ObjectContent {
    pub metadata: ObjectMetadata,
    pub body: Vec<u8>,
}

impl ObjectContent {
    /// 本文を読み出すReader
    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.body.as_slice())
    }

    /// 200レスポンスとして返す
    ///
    /// Content-Typeはメタデータ、なければキーの拡張子から決める。
    pub fn into_response(self) -> HttpResponse {
        let content_type = self
            .metadata
            .content_type
            .unwrap_or_else(|| content_type_for_key(&self.metadata.key));

        HttpResponse::new(200)
            .with_header("Content-Type", content_type)
            .with_body(self.body)
    }
}

/// キーの拡張子からContent-Typeを推定する（不明ならapplication/octet-stream）
pub fn content_type_for_key(key: &str) -> String {
    mime_guess::from_path(key)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// コンテンツストア操作トレイト（テスト用の抽象化）
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// プレフィックス配下を一覧する
    ///
    /// # 引数
    /// * `prefix` - 一覧するプレフィックス
    /// * `continuation_token` - 前回の一覧で返された継続トークン
    async fn list(
        &self,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ObjectListing, ObjectStoreError>;

    /// キーを指定してオブジェクトを取得する
    async fn get(&self, key: &str) -> Result<ObjectContent, ObjectStoreError>;

    /// Content-Typeを指定して書き込む
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str)
    -> Result<(), ObjectStoreError>;

    /// キーを指定して削除する
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;

    /// キーの拡張子からContent-Typeを推定して書き込む
    async fn put_data(&self, key: &str, body: Vec<u8>) -> Result<(), ObjectStoreError> {
        self.put(key, body, &content_type_for_key(key)).await
    }

    /// ローカルファイルを書き込む（Content-Typeはファイル名から推定）
    async fn put_file(&self, key: &str, path: &Path) -> Result<(), ObjectStoreError> {
        let body = tokio::fs::read(path).await?;
        let content_type = content_type_for_key(&path.to_string_lossy());
        self.put(key, body, &content_type).await
    }
}

/// SDKの日時をchronoに変換
fn to_chrono(value: Option<&SdkDateTime>) -> Option<DateTime<Utc>> {
    value.and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos()))
}

/// ListObjectsV2の結果を一覧に変換する
///
/// プレフィックス自身と同じキーは除外し、共通プレフィックスはディレクトリとして末尾に追加する。
fn build_listing(
    prefix: &str,
    contents: &[Object],
    common_prefixes: &[CommonPrefix],
    next_continuation_token: Option<&str>,
) -> ObjectListing {
    let files = contents.iter().filter_map(|object| {
        let key = object.key()?;
        (key != prefix).then(|| StoredObject {
            key: key.to_string(),
            is_dir: false,
            size: object.size(),
            last_modified: to_chrono(object.last_modified()),
        })
    });

    let dirs = common_prefixes.iter().filter_map(|common| {
        common.prefix().map(|key| StoredObject {
            key: key.to_string(),
            is_dir: true,
            size: None,
            last_modified: None,
        })
    });

    ObjectListing {
        items: files.chain(dirs).collect(),
        next_continuation_token: next_continuation_token.map(str::to_string),
    }
}

/// 実際のAWS S3 SDKを使用した実装
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: S3Client, config: &ObjectStoreConfig) -> Self {
        Self {
            client,
            bucket: config.bucket().to_string(),
        }
    }

    /// AWS設定からデフォルトのクライアントを作成
    pub async fn from_config(config: &ObjectStoreConfig) -> Self {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(S3Client::new(&aws_config), config)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list(
        &self,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ObjectListing, ObjectStoreError> {
        info!(bucket = %self.bucket, prefix = %prefix, "S3一覧取得開始");

        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .delimiter(PATH_DELIMITER)
            .set_continuation_token(continuation_token.map(str::to_string))
            .send()
            .await
            .map_err(|err| {
                warn!(bucket = %self.bucket, prefix = %prefix, error = %err, "S3一覧取得エラー");
                ObjectStoreError::AwsSdkError(err.to_string())
            })?;

        Ok(build_listing(
            prefix,
            output.contents(),
            output.common_prefixes(),
            output.next_continuation_token(),
        ))
    }

    async fn get(&self, key: &str) -> Result<ObjectContent, ObjectStoreError> {
        info!(bucket = %self.bucket, key = %key, "S3オブジェクト取得開始");

        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                warn!(bucket = %self.bucket, key = %key, error = %err, "S3オブジェクト取得エラー");
                ObjectStoreError::AwsSdkError(err.to_string())
            })?;

        let metadata = ObjectMetadata {
            key: key.to_string(),
            size: output.content_length(),
            last_modified: to_chrono(output.last_modified()),
            content_type: output.content_type().map(str::to_string),
        };

        let body = output
            .body
            .collect()
            .await
            .map_err(|err| ObjectStoreError::BodyReadError(err.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(ObjectContent { metadata, body })
    }

    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        info!(
            bucket = %self.bucket,
            key = %key,
            content_type = %content_type,
            size = body.len(),
            "S3オブジェクト書き込み開始"
        );

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map(|_| ())
            .map_err(|err| {
                warn!(bucket = %self.bucket, key = %key, error = %err, "S3オブジェクト書き込みエラー");
                ObjectStoreError::AwsSdkError(err.to_string())
            })
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        info!(bucket = %self.bucket, key = %key, "S3オブジェクト削除");

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map(|_| ())
            .map_err(|err| ObjectStoreError::AwsSdkError(err.to_string()))
    }
}
