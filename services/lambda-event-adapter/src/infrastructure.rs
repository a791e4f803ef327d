// インフラストラクチャ層モジュール
pub mod config;
pub mod http_interop;
pub mod logging;
pub mod object_store;
pub mod platform;
pub mod queue;
pub mod runtime;

// 再エクスポート
pub use config::{ConfigError, ObjectStoreConfig, QueueConfig};
pub use http_interop::{lambda_http_handler, InteropError};
pub use logging::init_logging;
pub use object_store::{
    content_type_for_key, ObjectContent, ObjectListing, ObjectMetadata, ObjectStore,
    ObjectStoreError, S3ObjectStore, StoredObject,
};
pub use platform::{is_running_on_lambda, is_serverless_platform, PLATFORM_ENV_VAR};
pub use queue::{QueueError, QueueOps, QueueSender, SendMessageRequest, SendReceipt, SqsQueueOps};
pub use runtime::run;
