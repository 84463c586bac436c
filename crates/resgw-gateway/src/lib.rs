//! resgw-gateway - request routing, service discovery, and response
//! correlation for the resource gateway.
//!
//! The [`Controller`] fans one public request out into per-device
//! sub-requests, correlates the arriving sub-responses, and merges them
//! into a single public response under a per-request deadline. Newly
//! registered devices are probed for their service catalog through the
//! same correlation machinery, keyed by negated device ids.

pub mod controller;
pub mod discovery;
pub mod mailbox;
pub mod response;
pub mod router;
pub mod testing;
pub mod timeout;

pub use controller::{Controller, CorrelationRecord, DEFAULT_RESPONSE_TIMEOUT};
pub use mailbox::ResponseMailbox;
pub use router::{Route, DATA_FORMAT_PREFIX, FORM_TOKEN};
pub use timeout::{FinalizeFn, TimeoutScheduler, TokioScheduler};
