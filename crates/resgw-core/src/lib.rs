//! resgw-core - Core types and traits for the resource gateway
//!
//! This crate provides the data model, the device catalog, and the boundary
//! traits that connect the gateway controller to its transport collaborators
//! (public listener, device client).

pub mod catalog;
pub mod error;
pub mod models;
pub mod scan;
pub mod transport;

pub use catalog::Catalog;
pub use error::{GatewayError, GatewayResult};
pub use models::*;
pub use transport::{DeviceTransport, PublicResponder};
