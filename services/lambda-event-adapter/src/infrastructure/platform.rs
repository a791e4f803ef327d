//! 実行プラットフォームの判定
//!
//! ハーネスが設定する環境変数でサーバーレス環境上の実行かどうかを判断する。

/// プラットフォーム指示子の環境変数
pub const PLATFORM_ENV_VAR: &str = "serverless_platform";

/// Lambdaを示す値（小文字化、前後空白除去後に比較）
const LAMBDA_PLATFORM_VALUES: [&str; 4] = ["lambda", "aws_lambda", "aws lambda", "aws-lambda"];

/// 値がLambdaを示すか
pub fn is_serverless_platform(value: &str) -> bool {
    let normalized = value.trim().to_lowercase();
    LAMBDA_PLATFORM_VALUES.contains(&normalized.as_str())
}

/// 環境変数からLambda上で実行中かを判定する
pub fn is_running_on_lambda() -> bool {
    std::env::var(PLATFORM_ENV_VAR)
        .map(|value| is_serverless_platform(&value))
        .unwrap_or(false)
}
