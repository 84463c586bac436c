//! Data model for the resource gateway

mod device;
mod request;

pub use device::{
    Device, DeviceId, ServiceDescriptor, ServiceInstance, ServiceRange, ServiceType, ServiceTypeId,
};
pub use request::{CorrelationId, DeviceAddress, RequestLine, SubRequest, Verb};
