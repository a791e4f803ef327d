/// Trigger shape of a Lambda invocation payload
///
/// The payload carries no explicit type tag; the kind is decided structurally
/// by `application::event_classifier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TriggerKind {
    /// Structure not recognized
    #[default]
    Unknown,

    /// Lambda Function URL request (`requestContext.http`)
    LambdaFunctionUrl,

    /// API Gateway REST API proxy request, payload v1 (`requestContext.httpMethod`)
    ApiGateway,

    /// API Gateway HTTP API request, payload v2 (`requestContext.routeKey`)
    ApiGatewayV2,

    /// API Gateway WebSocket request (`requestContext.status`)
    ApiGatewayWebsocket,

    /// SNS notification (`Records[0].Sns`)
    Sns,

    /// SQS batch (`Records[0].messageId`)
    Sqs,

    /// SES receipt (`Records[0].ses`)
    SimpleEmail,

    /// EventBridge rule (`source == "aws.events"`)
    EventBridgeRules,

    /// EventBridge Scheduler (`source == "aws.scheduler"`)
    EventBridgeScheduler,
}

impl TriggerKind {
    /// Stable name used in logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Unknown => "Unknown",
            TriggerKind::LambdaFunctionUrl => "LambdaFunctionURL",
            TriggerKind::ApiGateway => "APIGateway",
            TriggerKind::ApiGatewayV2 => "APIGatewayV2",
            TriggerKind::ApiGatewayWebsocket => "APIGatewayWebsocket",
            TriggerKind::Sns => "SNS",
            TriggerKind::Sqs => "SQS",
            TriggerKind::SimpleEmail => "SimpleEmail",
            TriggerKind::EventBridgeRules => "EventBridgeRules",
            TriggerKind::EventBridgeScheduler => "EventBridgeScheduler",
        }
    }

    /// Check if the payload is an HTTP-like request that projects onto a generic HTTP request
    pub fn is_http(&self) -> bool {
        matches!(
            self,
            TriggerKind::LambdaFunctionUrl
                | TriggerKind::ApiGateway
                | TriggerKind::ApiGatewayV2
                | TriggerKind::ApiGatewayWebsocket
        )
    }

    /// Check if the payload is a `Records` batch
    pub fn is_record_batch(&self) -> bool {
        matches!(
            self,
            TriggerKind::Sns | TriggerKind::Sqs | TriggerKind::SimpleEmail
        )
    }

    /// Check if the payload is an EventBridge event
    pub fn is_event_bridge(&self) -> bool {
        matches!(
            self,
            TriggerKind::EventBridgeRules | TriggerKind::EventBridgeScheduler
        )
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
