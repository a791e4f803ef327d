/// ログ基盤モジュール
///
/// Lambda環境向けにtracingの構造化ログ（JSON）を設定する。
use std::sync::Once;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// ログサブスクライバー初期化用の同期プリミティブ
static INIT: Once = Once::new();

/// `RUST_LOG`未設定時のフィルター
const DEFAULT_FILTER: &str = "info";

/// Lambda環境向けのログサブスクライバーを初期化する
///
/// CloudWatch向けにフラット化したJSONを出力する。フィルターは`RUST_LOG`、
/// 未設定ならinfo。複数回呼び出しても最初の1回だけ初期化される。
///
/// # 使用例
/// ```ignore
/// use lambda_event_adapter::infrastructure::init_logging;
///
/// init_logging();
/// tracing::info!(kind = "SQS", "イベント受信");
/// ```
pub fn init_logging() {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .flatten_event(true)
            .with_current_span(false);

        // 他のサブスクライバーが既に登録済みなら、そちらを使い続ける
        if let Err(err) = tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
        {
            eprintln!("ログサブスクライバーの初期化に失敗: {err}");
        }
    });
}

/// テスト用のログサブスクライバーを初期化する（人間が読みやすい形式）
#[cfg(test)]
pub fn init_test_logging() {
    static TEST_INIT: Once = Once::new();

    TEST_INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_test_writer()
            .with_target(true)
            .compact();

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::application::classify;

    #[test]
    fn test_init_logging_idempotent() {
        init_test_logging();
        init_test_logging();
        init_logging();
        init_logging();
    }

    /// 登録済みのサブスクライバーがあっても初期化がpanicしないこと
    #[test]
    fn test_init_logging_keeps_existing_subscriber() {
        init_test_logging();
        init_logging();

        assert!(tracing::dispatcher::has_been_set());
        tracing::info!("既存のサブスクライバーで出力");
    }

    /// 分類処理のdebugログがサブスクライバー下で出力できること
    #[test]
    fn test_classification_logs_under_subscriber() {
        init_test_logging();

        let span = tracing::info_span!("invocation", request_id = "req-1");
        let _guard = span.enter();

        let kind = classify(&json!({"source": "aws.events"})).unwrap();
        tracing::info!(kind = %kind, "分類完了");
    }
}
