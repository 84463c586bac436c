//! Test doubles for exercising the controller without live devices.
//!
//! `ScriptedTransport` answers sub-requests from per-device scripts and
//! records everything dispatched; `RecordingResponder` captures delivered
//! public responses; `ManualScheduler` holds armed deadlines until the
//! test fires them, making timeout behavior deterministic.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use resgw_core::{
    CorrelationId, DeviceTransport, GatewayError, GatewayResult, PublicResponder, SubRequest,
};

use crate::timeout::{FinalizeFn, TimeoutScheduler};

/// Canned behavior of one simulated device
#[derive(Debug, Clone)]
pub enum DeviceScript {
    /// Answer every sub-request with this body
    Reply(String),
    /// Accept the sub-request and never answer
    Silent,
    /// Fail the exchange outright
    Fail(String),
}

/// Device transport that answers from per-device scripts
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, DeviceScript>>,
    dispatched: Mutex<Vec<SubRequest>>,
}

impl ScriptedTransport {
    /// Create a transport with no scripts; unscripted devices fail
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the script for one device
    pub fn script(&self, device_name: &str, script: DeviceScript) {
        self.scripts.lock().insert(device_name.to_string(), script);
    }

    /// Every sub-request dispatched so far, in dispatch order
    pub fn dispatched(&self) -> Vec<SubRequest> {
        self.dispatched.lock().clone()
    }
}

#[async_trait]
impl DeviceTransport for ScriptedTransport {
    async fn dispatch(&self, request: &SubRequest) -> GatewayResult<String> {
        self.dispatched.lock().push(request.clone());
        let script = self.scripts.lock().get(&request.target.name).cloned();
        match script {
            Some(DeviceScript::Reply(body)) => Ok(body),
            Some(DeviceScript::Fail(reason)) => Err(GatewayError::Transport(reason)),
            Some(DeviceScript::Silent) => {
                std::future::pending::<()>().await;
                unreachable!("pending future resolved")
            }
            None => Err(GatewayError::Transport(format!(
                "no script for {}",
                request.target.name
            ))),
        }
    }
}

/// Responder that records every delivered public response
#[derive(Default)]
pub struct RecordingResponder {
    responses: Mutex<Vec<(CorrelationId, String)>>,
}

impl RecordingResponder {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delivered response, in delivery order
    pub fn responses(&self) -> Vec<(CorrelationId, String)> {
        self.responses.lock().clone()
    }

    /// The first response delivered for `correlation_id`, if any
    pub fn response_for(&self, correlation_id: CorrelationId) -> Option<String> {
        self.responses
            .lock()
            .iter()
            .find(|(id, _)| *id == correlation_id)
            .map(|(_, response)| response.clone())
    }
}

impl PublicResponder for RecordingResponder {
    fn respond(&self, correlation_id: CorrelationId, response: String) {
        self.responses.lock().push((correlation_id, response));
    }
}

/// Scheduler that holds armed deadlines until the test fires them
#[derive(Default)]
pub struct ManualScheduler {
    armed: Mutex<Vec<(CorrelationId, Duration, FinalizeFn)>>,
}

impl ManualScheduler {
    /// Create a scheduler with nothing armed
    pub fn new() -> Self {
        Self::default()
    }

    /// Deadlines armed and not yet fired
    pub fn armed(&self) -> Vec<(CorrelationId, Duration)> {
        self.armed
            .lock()
            .iter()
            .map(|(id, deadline, _)| (*id, *deadline))
            .collect()
    }

    /// Fire every armed deadline for `correlation_id`
    pub fn fire(&self, correlation_id: CorrelationId) {
        let fired: Vec<FinalizeFn> = {
            let mut armed = self.armed.lock();
            let mut fired = Vec::new();
            let mut kept = Vec::new();
            for entry in armed.drain(..) {
                if entry.0 == correlation_id {
                    fired.push(entry.2);
                } else {
                    kept.push(entry);
                }
            }
            *armed = kept;
            fired
        };
        // invoked outside the lock: finalize re-enters the controller
        for finalize in fired {
            finalize();
        }
    }

    /// Fire everything armed, oldest first
    pub fn fire_all(&self) {
        let fired: Vec<FinalizeFn> = {
            self.armed
                .lock()
                .drain(..)
                .map(|(_, _, finalize)| finalize)
                .collect()
        };
        for finalize in fired {
            finalize();
        }
    }
}

impl TimeoutScheduler for ManualScheduler {
    fn arm(&self, correlation_id: CorrelationId, deadline: Duration, finalize: FinalizeFn) {
        self.armed.lock().push((correlation_id, deadline, finalize));
    }
}

/// Let spawned dispatch tasks run to completion
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(25)).await;
}
