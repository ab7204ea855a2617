//! Scan request proxy - arbitration between app scan requests and the engine.
//!
//! The proxy owns the throttle state, the result cache and the callback
//! registry. It is driven from a single owner: public entry points are
//! called directly, while engine callbacks, death notices and settings
//! changes arrive as [`ProxyEvent`]s and are applied by
//! [`ScanRequestProxy::dispatch_pending`] or
//! [`ScanRequestProxy::handle_event`].

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, trace, warn};

use crate::cache::{MergeOutcome, ScanResultCache};
use crate::clock::Clock;
use crate::config::ThrottleConfig;
use crate::domain::{
    Broadcast, CallerClass, CallerId, HiddenNetwork, NetworkObservation, RequestId, ScanData,
    ScanOutcome, ScanSettings,
};
use crate::error::{Error, Result};
use crate::events::{self, EventSender, ListenerSource, ProxyEvent};
use crate::ports::{
    BroadcastTransport, EngineProvider, HiddenNetworkProvider, ImportanceOracle,
    PermissionOracle, ScanEngine, ScanMetrics, SettingsStore,
};
use crate::registry::{CallbackRegistry, CallbackToken, ScanListener, ScanResultsCallback};
use crate::throttle::{Admission, Decision, ThrottlePolicy};

/// External collaborators the proxy talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub engine_provider: Arc<dyn EngineProvider>,
    pub importance: Arc<dyn ImportanceOracle>,
    pub permissions: Arc<dyn PermissionOracle>,
    /// Hidden networks from saved network configurations.
    pub saved_networks: Arc<dyn HiddenNetworkProvider>,
    /// Hidden networks from app network suggestions.
    pub suggestions: Arc<dyn HiddenNetworkProvider>,
    pub settings: Arc<dyn SettingsStore>,
    pub metrics: Arc<dyn ScanMetrics>,
    pub broadcaster: Arc<dyn BroadcastTransport>,
    pub clock: Arc<dyn Clock>,
}

/// The scan request proxy.
///
/// # Usage Pattern
/// The owner calls the public entry points and regularly applies queued
/// events with `dispatch_pending()`, or hands the proxy to
/// [`crate::service::ProxyService`] which does both on one tokio task.
pub struct ScanRequestProxy {
    // Collaborators
    engine_provider: Arc<dyn EngineProvider>,
    permissions: Arc<dyn PermissionOracle>,
    saved_networks: Arc<dyn HiddenNetworkProvider>,
    suggestions: Arc<dyn HiddenNetworkProvider>,
    settings: Arc<dyn SettingsStore>,
    metrics: Arc<dyn ScanMetrics>,
    broadcaster: Arc<dyn BroadcastTransport>,

    // Owned state
    throttle: ThrottlePolicy,
    cache: ScanResultCache,
    callbacks: CallbackRegistry,

    // Event queue
    events: EventSender,
    event_rx: Option<UnboundedReceiver<ProxyEvent>>,

    // Engine handle, retrieved lazily
    engine: Option<Arc<dyn ScanEngine>>,

    scanning_enabled: bool,
    scanning_for_hidden_networks: bool,
    verbose_logging: bool,
}

impl ScanRequestProxy {
    /// Create a proxy. Nothing is asked of the engine until first use.
    pub fn new(collaborators: Collaborators, throttle_config: ThrottleConfig) -> Self {
        let Collaborators {
            engine_provider,
            importance,
            permissions,
            saved_networks,
            suggestions,
            settings,
            metrics,
            broadcaster,
            clock,
        } = collaborators;

        let throttle = ThrottlePolicy::new(
            throttle_config,
            settings.scan_throttle_enabled(),
            clock,
            importance,
        );
        let (events, event_rx) = events::channel();

        Self {
            engine_provider,
            permissions,
            saved_networks,
            suggestions,
            settings,
            metrics,
            broadcaster,
            throttle,
            cache: ScanResultCache::new(),
            callbacks: CallbackRegistry::new(),
            events,
            event_rx: Some(event_rx),
            engine: None,
            scanning_enabled: false,
            scanning_for_hidden_networks: false,
            verbose_logging: false,
        }
    }

    /// Posting end of this proxy's event queue.
    pub fn event_sender(&self) -> EventSender {
        self.events.clone()
    }

    /// Get the engine handle, doing first-time setup on the first success.
    fn retrieve_engine(&mut self) -> Option<Arc<dyn ScanEngine>> {
        if let Some(engine) = &self.engine {
            return Some(engine.clone());
        }

        let Some(engine) = self.engine_provider.scan_engine() else {
            error!("Failed to retrieve scan engine");
            return None;
        };

        engine.register_scan_listener(ScanListener::global(self.events.clone()));

        let events = self.events.clone();
        self.settings.register_change_listener(Box::new(move |enabled| {
            events.post(ProxyEvent::ThrottleSettingChanged(enabled));
        }));
        let throttle_enabled = self.settings.scan_throttle_enabled();
        self.throttle.set_enabled(throttle_enabled);
        info!(throttle_enabled, "Scan engine retrieved");

        self.engine = Some(engine.clone());
        Some(engine)
    }

    // MARK: - Scanning State

    /// Enable or disable scanning.
    ///
    /// `hidden_networks` selects whether one-shot requests also probe for
    /// hidden networks. Disabling clears the cached results; enabling
    /// again keeps them.
    pub fn enable_scanning(&mut self, enable: bool, hidden_networks: bool) {
        if enable {
            self.set_scanning_enabled(true);
            self.scanning_for_hidden_networks = hidden_networks;
            info!(hidden_networks, "Scanning enabled");
        } else {
            self.set_scanning_enabled(false);
            info!("Scanning disabled");
        }
    }

    fn set_scanning_enabled(&mut self, enable: bool) {
        let Some(engine) = self.retrieve_engine() else {
            return;
        };
        engine.set_scanning_enabled(enable);
        self.scanning_enabled = enable;
        self.broadcaster.send(Broadcast::availability(enable));
        if !enable {
            self.clear_scan_results();
        }
    }

    pub fn is_scanning_enabled(&self) -> bool {
        self.scanning_enabled
    }

    // MARK: - Scan Requests

    /// Start a one-shot scan on behalf of an app.
    ///
    /// Returns true iff the request was forwarded to the engine.
    pub fn start_scan(&mut self, uid: u32, package: &str) -> bool {
        self.try_start_scan(uid, package).is_ok()
    }

    /// Like [`start_scan`](Self::start_scan), returning why a request was
    /// not forwarded.
    pub fn try_start_scan(&mut self, uid: u32, package: &str) -> Result<RequestId> {
        let caller = CallerId::new(uid, package);

        let Some(engine) = self.retrieve_engine() else {
            self.broadcaster
                .send(Broadcast::failure_to_package(&caller.package));
            return Err(Error::EngineUnavailable);
        };

        let elevated = self.permissions.is_elevated(uid);
        let admission = self.throttle.admit(&caller, elevated);
        self.log_admission(&caller, &admission);

        if admission.was_evaluated() {
            self.metrics.increment_external_app_oneshot_scan_requests();
        }

        if let Decision::Throttled(class) = admission.decision {
            match class {
                CallerClass::Foreground => self
                    .metrics
                    .increment_foreground_app_oneshot_scan_requests_throttled(),
                CallerClass::Background => self
                    .metrics
                    .increment_background_app_oneshot_scan_requests_throttled(),
            }
            self.broadcaster
                .send(Broadcast::failure_to_package(&caller.package));
            return Err(Error::Throttled { caller, class });
        }

        self.metrics.set_work_source(&caller);
        self.metrics.set_importance(admission.importance);

        let settings = ScanSettings::one_shot(elevated, self.hidden_network_list());
        let request_id = RequestId::new();
        let listener = ScanListener::for_request(request_id, caller.clone(), self.events.clone());

        debug!(%request_id, %caller, ?settings, "Forwarding scan request");
        engine.start_scan(settings, listener, caller);
        Ok(request_id)
    }

    fn hidden_network_list(&self) -> Vec<HiddenNetwork> {
        if !self.scanning_for_hidden_networks {
            return Vec::new();
        }
        let mut networks = self.saved_networks.retrieve_hidden_network_list(false);
        networks.extend(self.suggestions.retrieve_hidden_network_list(false));
        networks
    }

    fn log_admission(&self, caller: &CallerId, admission: &Admission) {
        if self.verbose_logging {
            debug!(
                %caller,
                decision = ?admission.decision,
                importance = admission.importance,
                "Scan request admission"
            );
        } else {
            trace!(
                %caller,
                decision = ?admission.decision,
                importance = admission.importance,
                "Scan request admission"
            );
        }
    }

    /// Forget the foreground request window of an app removed for `uid`.
    pub fn clear_scan_request_timestamps_for_app(&mut self, package: &str, uid: u32) {
        let caller = CallerId::new(uid, package);
        if self.throttle.clear_timestamps_for_caller(&caller) {
            debug!(%caller, "Cleared scan request timestamps");
        }
    }

    // MARK: - Scan Results

    /// Copy of every cached result.
    pub fn get_scan_results(&self) -> Vec<NetworkObservation> {
        self.cache.snapshot()
    }

    pub fn get_scan_result(&self, bssid: &str) -> Option<NetworkObservation> {
        self.cache.lookup(bssid)
    }

    pub fn clear_scan_results(&mut self) {
        self.cache.clear();
        debug!("Cleared scan results");
    }

    // MARK: - Results Callbacks

    /// Register a results-available callback, replacing any registration
    /// with the same token.
    pub fn register_scan_results_callback(
        &mut self,
        callback: Arc<dyn ScanResultsCallback>,
    ) -> Result<()> {
        self.callbacks.register(callback, self.events.clone())
    }

    pub fn unregister_scan_results_callback(&mut self, token: CallbackToken) -> bool {
        self.callbacks.unregister(token)
    }

    pub fn registered_callback_count(&self) -> usize {
        self.callbacks.len()
    }

    // MARK: - Settings

    /// Toggle throttling and persist the new value.
    pub fn set_scan_throttle_enabled(&mut self, enable: bool) -> Result<()> {
        self.settings.set_scan_throttle_enabled(enable)?;
        self.throttle.set_enabled(enable);
        info!(enable, "Scan throttling updated");
        Ok(())
    }

    pub fn is_scan_throttle_enabled(&self) -> bool {
        self.throttle.is_enabled()
    }

    pub fn enable_verbose_logging(&mut self, verbose: bool) {
        self.verbose_logging = verbose;
    }

    pub fn throttle(&self) -> &ThrottlePolicy {
        &self.throttle
    }

    // MARK: - Event Dispatch

    /// Apply every event already queued. Returns how many were applied.
    pub fn dispatch_pending(&mut self) -> usize {
        let Some(mut rx) = self.event_rx.take() else {
            return 0;
        };

        let mut applied = 0;
        while let Ok(event) = rx.try_recv() {
            self.handle_event(event);
            applied += 1;
        }

        self.event_rx = Some(rx);
        applied
    }

    /// Wait for the next event. Returns `None` if the receiver was detached.
    pub async fn recv_event(&mut self) -> Option<ProxyEvent> {
        match self.event_rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Take the event receiver so another task can poll it alongside the proxy.
    pub(crate) fn detach_event_receiver(&mut self) -> Option<UnboundedReceiver<ProxyEvent>> {
        self.event_rx.take()
    }

    pub(crate) fn attach_event_receiver(&mut self, rx: UnboundedReceiver<ProxyEvent>) {
        self.event_rx = Some(rx);
    }

    /// Apply one event. Scan results and failures yield an outcome.
    pub fn handle_event(&mut self, event: ProxyEvent) -> Option<ScanOutcome> {
        match event {
            ProxyEvent::ScanResults {
                source: ListenerSource::Global,
                data,
            } => Some(self.on_global_results(data)),
            ProxyEvent::ScanResults {
                source: ListenerSource::Request { request_id, .. },
                ..
            } => {
                // Successes are handled through the global listener.
                trace!(%request_id, "Ignoring per-request results");
                None
            }
            ProxyEvent::ScanFailure {
                source: ListenerSource::Global,
                code,
                reason,
            } => {
                debug!(code, %reason, "Global scan listener failure");
                None
            }
            ProxyEvent::ScanFailure {
                source: ListenerSource::Request { request_id, caller },
                code,
                reason,
            } => {
                let e = Error::EngineReportedFailure { code, reason };
                warn!(%request_id, %caller, error = %e, "Scan request failed");
                self.broadcaster.send(Broadcast::results(false));
                Some(ScanOutcome {
                    success: false,
                    is_full_band_scan: false,
                    request_id: Some(request_id),
                })
            }
            ProxyEvent::CallbackDied { token, generation } => {
                if self.callbacks.handle_death(token, generation) {
                    debug!(%token, "Results callback died");
                }
                None
            }
            ProxyEvent::ThrottleSettingChanged(enabled) => {
                debug!(enabled, "Scan throttle setting changed");
                self.throttle.set_enabled(enabled);
                None
            }
        }
    }

    fn on_global_results(&mut self, data: Vec<ScanData>) -> ScanOutcome {
        match self.cache.apply(&data) {
            Ok(MergeOutcome::Replaced { entries }) => {
                self.broadcaster.send(Broadcast::results(true));
                let notified = self.callbacks.notify_all();
                debug!(entries, notified, "Full band scan results cached");
                ScanOutcome {
                    success: true,
                    is_full_band_scan: true,
                    request_id: None,
                }
            }
            Ok(MergeOutcome::Merged { added }) => {
                debug!(added, "Partial scan results merged");
                ScanOutcome {
                    success: true,
                    is_full_band_scan: false,
                    request_id: None,
                }
            }
            Err(e) => {
                error!(error = %e, "Discarding scan results");
                self.broadcaster.send(Broadcast::results(false));
                ScanOutcome {
                    success: false,
                    is_full_band_scan: false,
                    request_id: None,
                }
            }
        }
    }
}
