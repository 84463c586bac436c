//! Boundary traits between the gateway controller and its transport
//! collaborators. Implementations live elsewhere: the TCP device client in
//! `resgw-client`, the public listener in `resgwd`, test doubles in
//! `resgw-gateway::testing`.

use async_trait::async_trait;

use crate::error::GatewayResult;
use crate::models::{CorrelationId, SubRequest};

/// Device-side transport collaborator.
///
/// The controller dispatches each sub-request through this seam and feeds
/// the returned body back into its own response-arrival path, so a
/// successful exchange reports in exactly once. A failed exchange produces
/// no callback; the sub-request still counts toward the expected total and
/// the timeout policy covers the gap. No retries.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Perform one exchange with the target device and return the raw
    /// response body.
    async fn dispatch(&self, request: &SubRequest) -> GatewayResult<String>;
}

/// Public-side transport collaborator.
///
/// Called exactly once per public request (never for discovery probes)
/// with the complete, preformatted response text.
pub trait PublicResponder: Send + Sync {
    /// Deliver the response for the given public request
    fn respond(&self, correlation_id: CorrelationId, response: String);
}
