// アプリケーション層モジュール
pub mod classified_event;
pub mod codec;
pub mod dispatcher;
pub mod event_classifier;
pub mod request_translator;
pub mod response_translator;

// 再エクスポート
pub use classified_event::ClassifiedEvent;
pub use dispatcher::{DispatchError, Dispatcher, TriggerHandler};
pub use event_classifier::{classify, ClassifyError};
pub use request_translator::TranslateError;
pub use response_translator::BodyReadError;
