// Domain layer modules
pub mod gateway_response;
pub mod header_map;
pub mod http_message;
pub mod trigger_kind;

// Re-exports
pub use gateway_response::{ApiGatewayProxyResponse, ApiGatewayV2HttpResponse, FunctionUrlResponse};
pub use header_map::HeaderMultiMap;
pub use http_message::{HttpRequest, HttpResponse, ResponseBody};
pub use trigger_kind::TriggerKind;
