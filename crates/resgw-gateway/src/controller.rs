//! Correlation & aggregation engine.
//!
//! The controller owns the table of in-flight public requests. Listener
//! tasks, dispatch tasks, and deadline tasks all converge here; every
//! read-modify-write on the record table happens under one lock, and no
//! lock is held across an await point. Finalization removes the record
//! under that lock, which makes it atomic and idempotent: a deadline
//! firing after early completion, or a straggling sub-response arriving
//! after finalization, is a logged no-op.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use resgw_core::{
    Catalog, CorrelationId, Device, DeviceTransport, GatewayError, GatewayResult, PublicResponder,
    RequestLine, SubRequest,
};

use crate::discovery;
use crate::response;
use crate::router::{self, Route};
use crate::timeout::TimeoutScheduler;

/// Default deadline before a public request is answered with whatever
/// sub-responses have arrived
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Tracking record for one in-flight public request (or discovery probe).
///
/// Invariant: `responses` keys are a subset of `pending_subrequests` keys.
/// A record is created exactly once per request and removed when the
/// merged answer is produced (or, for probes, when the response is
/// parsed); its presence in the table is the "not yet finalized" state.
#[derive(Debug)]
pub struct CorrelationRecord {
    /// Correlation id this record is keyed by
    pub correlation_id: CorrelationId,
    /// Raw public request line (the probe line for discovery records)
    pub public_request_line: String,
    /// When the request was registered
    pub received_at: DateTime<Utc>,
    /// Dispatched sub-requests awaiting a response, by device name
    pub pending_subrequests: BTreeMap<String, SubRequest>,
    /// Raw response bodies arrived so far, by device name
    pub responses: BTreeMap<String, String>,
}

impl CorrelationRecord {
    fn new(correlation_id: CorrelationId, public_request_line: &str) -> Self {
        Self {
            correlation_id,
            public_request_line: public_request_line.to_string(),
            received_at: Utc::now(),
            pending_subrequests: BTreeMap::new(),
            responses: BTreeMap::new(),
        }
    }
}

/// Request-routing, discovery, and response-correlation engine.
///
/// Cheap to clone: clones share the same record table and catalog, so the
/// listener, dispatch tasks, and deadline tasks all hold handles to one
/// engine.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    catalog: Arc<Catalog>,
    device_transport: Arc<dyn DeviceTransport>,
    public: Arc<dyn PublicResponder>,
    scheduler: Arc<dyn TimeoutScheduler>,
    response_timeout: Duration,
    records: Mutex<HashMap<CorrelationId, CorrelationRecord>>,
    next_correlation_id: AtomicI64,
    shutdown: watch::Sender<bool>,
}

impl Controller {
    /// Create a controller with the default response deadline
    pub fn new(
        catalog: Arc<Catalog>,
        device_transport: Arc<dyn DeviceTransport>,
        public: Arc<dyn PublicResponder>,
        scheduler: Arc<dyn TimeoutScheduler>,
    ) -> Self {
        Self::with_config(
            catalog,
            device_transport,
            public,
            scheduler,
            DEFAULT_RESPONSE_TIMEOUT,
        )
    }

    /// Create a controller with a custom response deadline
    pub fn with_config(
        catalog: Arc<Catalog>,
        device_transport: Arc<dyn DeviceTransport>,
        public: Arc<dyn PublicResponder>,
        scheduler: Arc<dyn TimeoutScheduler>,
        response_timeout: Duration,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(ControllerInner {
                catalog,
                device_transport,
                public,
                scheduler,
                response_timeout,
                records: Mutex::new(HashMap::new()),
                next_correlation_id: AtomicI64::new(1),
                shutdown,
            }),
        }
    }

    /// The device catalog this controller populates and routes against
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.inner.catalog
    }

    /// Number of in-flight correlation records (probes included)
    pub fn in_flight(&self) -> usize {
        self.inner.records.lock().len()
    }

    /// Register a device and probe it for its service catalog.
    ///
    /// The probe is recorded like a normal request, keyed by the negated
    /// device id, so the generic response-arrival path can be reused. No
    /// deadline is armed for probes: a silent device simply never
    /// populates the catalog.
    pub fn register_device(&self, name: &str, ip: &str, port: u16) -> GatewayResult<Device> {
        if name.trim().is_empty() || ip.trim().is_empty() || port == 0 {
            return Err(GatewayError::InvalidAddress(format!(
                "{}@{}:{}",
                name, ip, port
            )));
        }
        let device = self.inner.catalog.add_device(name, ip, port)?;
        info!(device = %device.name, device_id = device.id, "device registered, probing services");

        let probe = discovery::probe_request(&device);
        let mut record = CorrelationRecord::new(probe.correlation_id, &probe.request_line);
        record
            .pending_subrequests
            .insert(device.name.clone(), probe.clone());
        self.inner
            .records
            .lock()
            .insert(probe.correlation_id, record);
        self.spawn_dispatch(probe);
        Ok(device)
    }

    /// Register one inbound public request and return its correlation id.
    ///
    /// Unsupported or unparsable requests are answered immediately with
    /// the gateway error body; the form page is answered immediately from
    /// the catalog. Both bypass the record table and the deadline. All
    /// other requests are routed, dispatched, and armed with the response
    /// deadline, including requests that produced zero sub-requests,
    /// which the deadline resolves to the not-found outcome.
    pub fn register_public_request(&self, raw: &str) -> CorrelationId {
        let correlation_id = self.inner.next_correlation_id.fetch_add(1, Ordering::Relaxed);
        let Some(request) = RequestLine::parse(raw) else {
            warn!(correlation_id, "unsupported public request");
            self.inner
                .public
                .respond(correlation_id, response::unsupported());
            return correlation_id;
        };
        debug!(
            correlation_id,
            verb = %request.verb,
            path = %request.path,
            "public request registered"
        );

        match router::route(&self.inner.catalog, correlation_id, &request) {
            Route::Form(document) => {
                self.inner
                    .public
                    .respond(correlation_id, response::form_page(&document));
            }
            Route::Dispatch(subrequests) => {
                let mut record = CorrelationRecord::new(correlation_id, raw);
                for subrequest in &subrequests {
                    record
                        .pending_subrequests
                        .insert(subrequest.target.name.clone(), subrequest.clone());
                }
                self.inner.records.lock().insert(correlation_id, record);
                for subrequest in subrequests {
                    self.spawn_dispatch(subrequest);
                }

                let controller = self.clone();
                self.inner.scheduler.arm(
                    correlation_id,
                    self.inner.response_timeout,
                    Box::new(move || controller.finalize(correlation_id)),
                );
            }
        }
        correlation_id
    }

    /// Hand one sub-request to the device transport. A failed exchange is
    /// logged and never reported back; the missing response is covered by
    /// the deadline. No retries.
    fn spawn_dispatch(&self, subrequest: SubRequest) {
        let controller = self.clone();
        let transport = Arc::clone(&self.inner.device_transport);
        tokio::spawn(async move {
            let device_name = subrequest.target.name.clone();
            match transport.dispatch(&subrequest).await {
                Ok(body) => {
                    controller.on_sub_response(subrequest.correlation_id, &device_name, body)
                }
                Err(error) => {
                    warn!(
                        correlation_id = subrequest.correlation_id,
                        device = %device_name,
                        %error,
                        "sub-request dispatch failed"
                    );
                }
            }
        });
    }

    /// Record one arriving sub-response.
    ///
    /// Negative correlation ids are discovery responses: the probe record
    /// is retired and the body parsed into the catalog. Positive ids
    /// finalize as soon as every expected response has arrived; stragglers
    /// into an already-finalized request are ignored.
    pub fn on_sub_response(&self, correlation_id: CorrelationId, device_name: &str, body: String) {
        let mut records = self.inner.records.lock();
        let Some(record) = records.get_mut(&correlation_id) else {
            debug!(
                correlation_id,
                device = %device_name,
                "sub-response for finished request, ignoring"
            );
            return;
        };
        record.responses.insert(device_name.to_string(), body);
        let discovery_response = correlation_id < 0;
        let complete =
            !discovery_response && record.responses.len() >= record.pending_subrequests.len();

        if discovery_response {
            let record = records.remove(&correlation_id);
            drop(records);
            if let Some(record) = record {
                self.register_discovered_services(&record, device_name);
            }
            return;
        }
        drop(records);
        if complete {
            self.finalize(correlation_id);
        }
    }

    fn register_discovered_services(&self, record: &CorrelationRecord, device_name: &str) {
        let Some(probe) = record.pending_subrequests.get(device_name) else {
            debug!(device = %device_name, "discovery response without matching probe");
            return;
        };
        let Some(body) = record.responses.get(device_name) else {
            return;
        };
        let instances = discovery::register_services(&self.inner.catalog, &probe.target, body);
        info!(device = %device_name, instances, "discovery complete");
    }

    /// Produce and deliver the merged answer for `correlation_id`, then
    /// discard its record. Idempotent: the record is taken out of the
    /// table under the lock, so a second call finds nothing and returns.
    pub fn finalize(&self, correlation_id: CorrelationId) {
        let record = self.inner.records.lock().remove(&correlation_id);
        let Some(record) = record else {
            debug!(correlation_id, "finalize for finished request, ignoring");
            return;
        };

        let response = if record.responses.is_empty() {
            response::not_found()
        } else {
            response::merged(&record.responses)
        };
        info!(
            correlation_id,
            responses = record.responses.len(),
            expected = record.pending_subrequests.len(),
            "finalizing public request"
        );
        self.inner.public.respond(correlation_id, response);
    }

    /// Ask the host program to stop serving. Safe to call more than once.
    pub fn shutdown(&self) {
        info!("shutdown requested");
        let _ = self.inner.shutdown.send(true);
    }

    /// Watch side of the shutdown signal, for the host's accept loop
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.inner.shutdown.subscribe()
    }
}
