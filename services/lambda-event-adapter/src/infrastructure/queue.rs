//! メッセージキュー（SQS）モジュール
//!
//! テキストメッセージの送信と、FIFOキュー向けのグループID・重複排除IDの管理を提供する。

use async_trait::async_trait;
use aws_sdk_sqs::Client as SqsClient;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::QueueConfig;

/// キュー操作のエラー型
#[derive(Debug, Error)]
pub enum QueueError {
    /// AWS SDK エラー
    #[error("AWS SQS APIエラー: {0}")]
    AwsSdkError(String),
    /// 送信結果にメッセージIDがない
    #[error("SQSレスポンスにメッセージIDがありません")]
    MissingMessageId,
}

/// 送信リクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub queue_url: String,
    pub body: String,
    pub group_id: Option<String>,
    pub deduplication_id: Option<String>,
}

/// 送信結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub message_id: String,
    /// FIFOキューのみ
    pub sequence_number: Option<String>,
}

/// SQS操作トレイト（テスト用の抽象化）
#[async_trait]
pub trait QueueOps: Send + Sync {
    /// メッセージを1件送信する
    async fn send_message(&self, request: SendMessageRequest) -> Result<SendReceipt, QueueError>;
}

/// 実際のAWS SQS SDKを使用した実装
pub struct SqsQueueOps {
    client: SqsClient,
}

impl SqsQueueOps {
    pub fn new(client: SqsClient) -> Self {
        Self { client }
    }

    /// AWS設定からデフォルトのクライアントを作成
    pub async fn from_config() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(SqsClient::new(&config))
    }
}

#[async_trait]
impl QueueOps for SqsQueueOps {
    async fn send_message(&self, request: SendMessageRequest) -> Result<SendReceipt, QueueError> {
        info!(
            queue_url = %request.queue_url,
            message_length = request.body.len(),
            group_id = ?request.group_id,
            "SQSメッセージ送信開始"
        );

        let result = self
            .client
            .send_message()
            .queue_url(&request.queue_url)
            .message_body(request.body)
            .set_message_group_id(request.group_id)
            .set_message_deduplication_id(request.deduplication_id)
            .send()
            .await;

        match result {
            Ok(output) => {
                let message_id = output
                    .message_id()
                    .ok_or(QueueError::MissingMessageId)?
                    .to_string();

                info!(
                    queue_url = %request.queue_url,
                    message_id = %message_id,
                    "SQS SendMessage成功"
                );

                Ok(SendReceipt {
                    message_id,
                    sequence_number: output.sequence_number().map(str::to_string),
                })
            }
            Err(err) => {
                warn!(
                    queue_url = %request.queue_url,
                    error = %err,
                    "SQS SendMessageエラー"
                );
                Err(QueueError::AwsSdkError(err.to_string()))
            }
        }
    }
}

/// 1つのキューへの送信者
///
/// FIFOキューではグループIDと、次の1回だけ使う重複排除IDを保持する。
/// 送信は`&mut self`を取るため、同じインスタンスからの送信は常に直列になる。
pub struct QueueSender<Q: QueueOps> {
    ops: Q,
    queue_url: String,
    fifo: bool,
    group_id: Option<String>,
    next_deduplication_id: Option<String>,
}

impl<Q: QueueOps> QueueSender<Q> {
    pub fn new(ops: Q, config: &QueueConfig) -> Self {
        Self {
            ops,
            queue_url: config.queue_url().to_string(),
            fifo: config.is_fifo(),
            group_id: None,
            next_deduplication_id: None,
        }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    pub fn is_fifo(&self) -> bool {
        self.fifo
    }

    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    /// グループIDを設定する（FIFOキュー以外では無視してfalse）
    pub fn set_message_group_id(&mut self, group_id: impl Into<String>) -> bool {
        if !self.fifo {
            return false;
        }
        self.group_id = Some(group_id.into());
        true
    }

    /// 次回送信の重複排除IDを設定する（FIFOキュー以外では無視してfalse）
    pub fn set_next_deduplication_id(&mut self, deduplication_id: impl Into<String>) -> bool {
        if !self.fifo {
            return false;
        }
        self.next_deduplication_id = Some(deduplication_id.into());
        true
    }

    /// メッセージを送信する
    ///
    /// 保留中の重複排除IDはこの送信で消費される。FIFOキューでグループIDが
    /// 未設定なら生成して以降も使い続け、重複排除IDが未設定なら送信ごとに生成する。
    pub async fn send(&mut self, message: impl Into<String>) -> Result<SendReceipt, QueueError> {
        let mut deduplication_id = self.next_deduplication_id.take();

        if self.fifo {
            let group_id = self
                .group_id
                .get_or_insert_with(|| Uuid::new_v4().to_string());
            let deduplication_id = deduplication_id.get_or_insert_with(|| Uuid::new_v4().to_string());
            debug!(group_id = %group_id, deduplication_id = %deduplication_id, "FIFO送信ID");
        }

        self.ops
            .send_message(SendMessageRequest {
                queue_url: self.queue_url.clone(),
                body: message.into(),
                group_id: self.group_id.clone(),
                deduplication_id,
            })
            .await
    }
}
