/// 環境変数由来の設定
///
/// コンテンツストア（S3）とメッセージキュー（SQS）の接続先を読み込む。
/// AWS認証情報とリージョンはaws-configのデフォルトチェーンに任せる。
use thiserror::Error;

/// バケット名の環境変数
pub const OBJECT_STORE_BUCKET_VAR: &str = "OBJECT_STORE_BUCKET";

/// キューURLの環境変数
pub const QUEUE_URL_VAR: &str = "QUEUE_URL";

/// FIFOキューのURL接尾辞
const FIFO_SUFFIX: &str = ".fifo";

/// 設定エラー
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
}

/// 必須の値を取得する（空文字列は未設定扱い）
fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<String, ConfigError> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// コンテンツストア設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStoreConfig {
    bucket: String,
}

impl ObjectStoreConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
        }
    }

    /// 環境変数`OBJECT_STORE_BUCKET`から読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の参照関数から読み込む
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self::new(required(&lookup, OBJECT_STORE_BUCKET_VAR)?))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// メッセージキュー設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    queue_url: String,
}

impl QueueConfig {
    pub fn new(queue_url: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
        }
    }

    /// 環境変数`QUEUE_URL`から読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の参照関数から読み込む
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self::new(required(&lookup, QUEUE_URL_VAR)?))
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    /// URLが`.fifo`で終わるキューはFIFO
    pub fn is_fifo(&self) -> bool {
        self.queue_url.ends_with(FIFO_SUFFIX)
    }
}
