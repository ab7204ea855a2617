//! Integration tests for the scan request proxy.
//!
//! These tests drive the proxy through its public entry points with the
//! in-process adapters standing in for the host, covering:
//! - Enable/disable sequencing and engine retrieval
//! - Scan settings and hidden network probing
//! - Result caching for full and partial scans
//! - Foreground, background and exception-list throttling
//! - Results callbacks, replacement and death handling

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use scanproxy_core::adapters::oracle::IMPORTANCE_CACHED;
use scanproxy_core::adapters::{
    CountingMetrics, MemorySettingsStore, QueuedBroadcaster, SimulatedScanEngine,
    StaticEngineProvider, StaticHiddenNetworks, StaticImportanceOracle, StaticPermissionOracle,
};
use scanproxy_core::domain::{BroadcastTarget, DeliveryGroupPolicy, ReportEvents};
use scanproxy_core::ports::SettingsStore;
use scanproxy_core::{
    Broadcast, CallbackToken, CallerId, Clock, Collaborators, DeathRecipient, Error, HiddenNetwork,
    ManualClock, NetworkObservation, ScanBands, ScanData, ScanRequestProxy, ScanResultsCallback,
    ScanType, ThrottleConfig,
};

const TEST_UID: u32 = 5;
const TEST_OTHER_UID: u32 = 1_005;
const PACKAGE_1: &str = "com.test.1";
const PACKAGE_2: &str = "com.test.2";
const START_MS: u64 = 782;
const FG_MAX: usize = 4;
const FG_WINDOW_MS: u64 = 120_000;
const BG_INTERVAL_MS: u64 = 1_800_000;

// =============================================================================
// Test Helpers
// =============================================================================

struct Fixture {
    clock: Arc<ManualClock>,
    engine: Arc<SimulatedScanEngine>,
    engine_provider: Arc<StaticEngineProvider>,
    importance: Arc<StaticImportanceOracle>,
    permissions: Arc<StaticPermissionOracle>,
    saved_networks: Arc<StaticHiddenNetworks>,
    suggestions: Arc<StaticHiddenNetworks>,
    settings: Arc<MemorySettingsStore>,
    metrics: Arc<CountingMetrics>,
    broadcaster: Arc<QueuedBroadcaster>,
    proxy: ScanRequestProxy,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(ThrottleConfig::default())
    }

    fn with_config(config: ThrottleConfig) -> Self {
        let clock = Arc::new(ManualClock::new(START_MS));
        let engine = Arc::new(SimulatedScanEngine::new());
        let engine_provider = Arc::new(StaticEngineProvider::new(engine.clone()));
        let importance = Arc::new(StaticImportanceOracle::default());
        let permissions = Arc::new(StaticPermissionOracle::new());
        let saved_networks = Arc::new(StaticHiddenNetworks::new(["test_ssid_1", "test_ssid_2"]));
        let suggestions = Arc::new(StaticHiddenNetworks::new(["test_ssid_3", "test_ssid_4"]));
        let settings = Arc::new(MemorySettingsStore::default());
        let metrics = Arc::new(CountingMetrics::new());
        let broadcaster = Arc::new(QueuedBroadcaster::new());

        let collaborators = Collaborators {
            engine_provider: engine_provider.clone(),
            importance: importance.clone(),
            permissions: permissions.clone(),
            saved_networks: saved_networks.clone(),
            suggestions: suggestions.clone(),
            settings: settings.clone(),
            metrics: metrics.clone(),
            broadcaster: broadcaster.clone(),
            clock: clock.clone(),
        };

        Self {
            clock,
            engine,
            engine_provider,
            importance,
            permissions,
            saved_networks,
            suggestions,
            settings,
            metrics,
            broadcaster,
            proxy: ScanRequestProxy::new(collaborators, config),
        }
    }

    /// Enable scanning and drop the availability broadcast.
    fn enable_scanning(&mut self) {
        self.proxy.enable_scanning(true, false);
        assert_eq!(self.broadcaster.take_pending(), vec![Broadcast::availability(true)]);
    }

    fn deliver(&mut self, data: ScanData) {
        self.engine.deliver_results(vec![data]);
        self.proxy.dispatch_pending();
    }

    fn assert_cache_matches(&self, data: &ScanData) {
        let mut cached = self.proxy.get_scan_results();
        let mut expected = data.results.clone();
        cached.sort_by(|a, b| a.bssid.cmp(&b.bssid));
        expected.sort_by(|a, b| a.bssid.cmp(&b.bssid));
        assert_eq!(cached, expected);
    }

    /// Check the request counters: evaluated requests and admitted requests.
    fn assert_metrics(&self, external_requests: u64, admitted: u64) {
        let snapshot = self.metrics.snapshot();
        assert_eq!(snapshot.external_app_oneshot_scan_requests, external_requests);
        assert_eq!(snapshot.work_source_updates, admitted);
        assert_eq!(snapshot.importance_updates, admitted);
    }
}

fn scan_data_1() -> ScanData {
    ScanData::synthetic(1, ScanBands::ALL, &[2417, 2427, 5180, 5160])
}

fn scan_data_2() -> ScanData {
    ScanData::synthetic(2, ScanBands::ALL, &[2412, 2422, 5175, 5170])
}

fn failure_to(package: &str) -> Broadcast {
    Broadcast::failure_to_package(package)
}

/// Results callback that records what the registry does with it.
struct TestCallback {
    token: CallbackToken,
    notifications: AtomicUsize,
    unlinks: AtomicUsize,
    recipient: Mutex<Option<DeathRecipient>>,
    dead: bool,
}

impl TestCallback {
    fn new(token: u64) -> Arc<Self> {
        Self::with_liveness(token, false)
    }

    fn already_dead(token: u64) -> Arc<Self> {
        Self::with_liveness(token, true)
    }

    fn with_liveness(token: u64, dead: bool) -> Arc<Self> {
        Arc::new(Self {
            token: CallbackToken(token),
            notifications: AtomicUsize::new(0),
            unlinks: AtomicUsize::new(0),
            recipient: Mutex::new(None),
            dead,
        })
    }

    fn notifications(&self) -> usize {
        self.notifications.load(Ordering::SeqCst)
    }

    /// Simulate the owning process dying.
    fn die(&self) {
        if let Some(recipient) = self.recipient.lock().clone() {
            recipient.binder_died();
        }
    }
}

impl ScanResultsCallback for TestCallback {
    fn token(&self) -> CallbackToken {
        self.token
    }

    fn on_scan_results_available(&self) {
        self.notifications.fetch_add(1, Ordering::SeqCst);
    }

    fn link_to_death(&self, recipient: DeathRecipient) -> scanproxy_core::Result<()> {
        if self.dead {
            return Err(Error::CallbackDead(self.token.to_string()));
        }
        *self.recipient.lock() = Some(recipient);
        Ok(())
    }

    fn unlink_to_death(&self, recipient: &DeathRecipient) {
        let mut current = self.recipient.lock();
        if current.as_ref() == Some(recipient) {
            *current = None;
        }
        self.unlinks.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Enable / Disable
// =============================================================================

#[test]
fn test_enable_scanning() {
    let mut f = Fixture::new();
    f.proxy.enable_scanning(true, false);

    assert_eq!(f.engine.global_listener_count(), 1);
    assert_eq!(f.engine.scanning_enabled_calls(), vec![true]);
    assert_eq!(f.broadcaster.take_pending(), vec![Broadcast::availability(true)]);
    assert_eq!(f.broadcaster.sticky(), Some(Broadcast::availability(true)));
    assert_eq!(f.settings.listener_count(), 1);
}

#[test]
fn test_disable_scanning() {
    let mut f = Fixture::new();
    f.proxy.enable_scanning(false, false);

    // The global listener is registered even when the first call disables.
    assert_eq!(f.engine.global_listener_count(), 1);
    assert_eq!(f.engine.scanning_enabled_calls(), vec![false]);
    assert_eq!(f.broadcaster.take_pending(), vec![Broadcast::availability(false)]);
    assert!(!f.proxy.is_scanning_enabled());
}

#[test]
fn test_enable_without_engine_does_nothing() {
    let mut f = Fixture::new();
    f.engine_provider.set_engine(None);
    f.proxy.enable_scanning(true, false);

    assert!(!f.proxy.is_scanning_enabled());
    assert!(!f.broadcaster.has_pending());
}

// =============================================================================
// Start Scan
// =============================================================================

#[test]
fn test_start_scan_fail_without_engine() {
    let mut f = Fixture::new();
    f.engine_provider.set_engine(None);

    assert!(!f.proxy.start_scan(TEST_UID, PACKAGE_1));
    assert_eq!(f.broadcaster.take_pending(), vec![failure_to(PACKAGE_1)]);
    assert!(matches!(
        f.proxy.try_start_scan(TEST_UID, PACKAGE_1),
        Err(Error::EngineUnavailable)
    ));
    f.assert_metrics(0, 0);
}

#[test]
fn test_start_scan_success() {
    let mut f = Fixture::new();
    f.enable_scanning();

    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));

    let request = f.engine.last_request().unwrap();
    assert_eq!(request.settings.band, ScanBands::ALL);
    assert_eq!(request.settings.scan_type, ScanType::LowLatency);
    assert_eq!(
        request.settings.report_events,
        ReportEvents::AFTER_EACH_SCAN.union(ReportEvents::FULL_SCAN_RESULT)
    );
    assert!(request.settings.hidden_networks.is_empty());
    assert!(request.settings.six_ghz_psc_only);
    assert_eq!(request.work_source, CallerId::new(TEST_UID, PACKAGE_1));
    assert!(!f.broadcaster.has_pending());

    f.assert_metrics(1, 1);
    let snapshot = f.metrics.snapshot();
    assert_eq!(snapshot.last_work_source, Some(CallerId::new(TEST_UID, PACKAGE_1)));
    assert_eq!(snapshot.last_importance, Some(100));
}

#[test]
fn test_start_scan_success_from_app_with_network_settings() {
    let mut f = Fixture::new();
    f.enable_scanning();
    f.permissions.grant_network_settings(TEST_UID);

    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));

    let request = f.engine.last_request().unwrap();
    assert_eq!(request.settings.scan_type, ScanType::HighAccuracy);
    assert!(!request.settings.six_ghz_psc_only);
    f.assert_metrics(0, 1);
}

#[test]
fn test_start_scan_success_from_app_with_network_setup_wizard() {
    let mut f = Fixture::new();
    f.enable_scanning();
    f.permissions.grant_setup_wizard(TEST_UID);

    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));

    let request = f.engine.last_request().unwrap();
    assert_eq!(request.settings.scan_type, ScanType::HighAccuracy);
    f.assert_metrics(0, 1);
}

#[test]
fn test_start_scan_with_hidden_network_scanning_disabled() {
    let mut f = Fixture::new();
    f.proxy.enable_scanning(true, false);

    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));

    assert_eq!(f.saved_networks.retrievals(), 0);
    assert_eq!(f.suggestions.retrievals(), 0);
    assert!(f.engine.last_request().unwrap().settings.hidden_networks.is_empty());
}

#[test]
fn test_start_scan_with_hidden_network_scanning_enabled() {
    let mut f = Fixture::new();
    f.proxy.enable_scanning(true, true);

    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));

    assert_eq!(f.saved_networks.retrievals(), 1);
    assert_eq!(f.suggestions.retrievals(), 1);
    let hidden = f.engine.last_request().unwrap().settings.hidden_networks;
    assert_eq!(
        hidden,
        ["test_ssid_1", "test_ssid_2", "test_ssid_3", "test_ssid_4"]
            .into_iter()
            .map(HiddenNetwork::new)
            .collect::<Vec<_>>()
    );
}

#[test]
fn test_successive_scan_requests_dont_use_same_listener() {
    let mut f = Fixture::new();
    f.enable_scanning();

    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));
    f.clock.advance(1);
    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));

    let requests = f.engine.requests();
    assert_eq!(requests.len(), 2);
    assert_ne!(requests[0].listener, requests[1].listener);
    assert_ne!(requests[0].listener.request_id(), requests[1].listener.request_id());
}

// =============================================================================
// Scan Results
// =============================================================================

#[test]
fn test_partial_scan_is_cached() {
    let mut f = Fixture::new();
    let callback = TestCallback::new(1);
    f.proxy.register_scan_results_callback(callback.clone()).unwrap();
    f.enable_scanning();
    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));
    assert!(f.proxy.get_scan_results().is_empty());

    f.deliver(ScanData::synthetic(1, ScanBands::BOTH, &[2417, 2427, 5180]));

    assert_eq!(callback.notifications(), 0);
    assert!(!f.broadcaster.has_pending());
    assert_eq!(f.proxy.get_scan_results().len(), 3);
}

#[test]
fn test_scan_success() {
    let mut f = Fixture::new();
    let callback = TestCallback::new(1);
    f.proxy.register_scan_results_callback(callback.clone()).unwrap();
    f.enable_scanning();
    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));

    let data = scan_data_1();
    f.deliver(data.clone());

    let broadcasts = f.broadcaster.take_pending();
    assert_eq!(broadcasts, vec![Broadcast::results(true)]);
    match &broadcasts[0] {
        Broadcast::ScanResultsAvailable {
            target, options, ..
        } => {
            assert_eq!(*target, BroadcastTarget::AllUsers);
            let options = options.as_ref().unwrap();
            assert_eq!(options.policy, DeliveryGroupPolicy::MostRecent);
            assert!(options.defer_until_active);
        }
        other => panic!("unexpected broadcast {:?}", other),
    }
    assert_eq!(callback.notifications(), 1);
    f.assert_cache_matches(&data);
    assert_eq!(
        f.proxy.get_scan_result(&data.results[0].bssid),
        Some(data.results[0].clone())
    );
}

#[test]
fn test_scan_success_without_6ghz_and_60ghz_bands() {
    let mut f = Fixture::new();
    let callback = TestCallback::new(1);
    f.proxy.register_scan_results_callback(callback.clone()).unwrap();
    f.enable_scanning();
    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));
    f.deliver(ScanData::synthetic(1, ScanBands::BOTH, &[2417]));

    f.clock.advance(1);
    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));
    let bands = ScanBands::BOTH.union(ScanBands::GHZ_5_DFS);
    let data = ScanData::synthetic(2, bands, &[2412, 5260, 5500]);
    f.deliver(data.clone());

    assert_eq!(f.broadcaster.take_pending(), vec![Broadcast::results(true)]);
    assert_eq!(callback.notifications(), 1);
    f.assert_cache_matches(&data);
}

#[test]
fn test_scan_failure() {
    let mut f = Fixture::new();
    f.enable_scanning();
    let request_id = f.proxy.try_start_scan(TEST_UID, PACKAGE_1).unwrap();

    assert!(f.engine.fail_request(request_id, -1, "test_failure"));
    f.proxy.dispatch_pending();

    assert_eq!(f.broadcaster.take_pending(), vec![Broadcast::results(false)]);
    assert!(f.proxy.get_scan_results().is_empty());
}

#[test]
fn test_global_listener_failure_only_logged() {
    let mut f = Fixture::new();
    f.enable_scanning();

    assert_eq!(f.engine.fail_globally(-1, "test_failure"), 1);
    assert_eq!(f.proxy.dispatch_pending(), 1);
    assert!(!f.broadcaster.has_pending());
}

#[test]
fn test_scan_success_overwrites_previous_results() {
    let mut f = Fixture::new();
    f.enable_scanning();

    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));
    f.deliver(scan_data_1());
    f.assert_cache_matches(&scan_data_1());

    f.clock.advance(1);
    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));
    f.deliver(scan_data_2());
    f.assert_cache_matches(&scan_data_2());
    assert!(f.proxy.get_scan_result(&scan_data_1().results[0].bssid).is_none());

    assert_eq!(
        f.broadcaster.take_pending(),
        vec![Broadcast::results(true), Broadcast::results(true)]
    );
}

#[test]
fn test_scan_failure_does_not_overwrite_previous_results() {
    let mut f = Fixture::new();
    f.enable_scanning();

    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));
    f.deliver(scan_data_1());

    f.clock.advance(1);
    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));
    assert!(f.engine.fail_last_request(-1, "test_failure"));
    f.proxy.dispatch_pending();

    assert_eq!(
        f.broadcaster.take_pending(),
        vec![Broadcast::results(true), Broadcast::results(false)]
    );
    f.assert_cache_matches(&scan_data_1());
}

#[test]
fn test_new_scan_request_after_invalid_scan_datas() {
    let mut f = Fixture::new();
    f.enable_scanning();
    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));

    f.engine.deliver_results(vec![scan_data_1(), scan_data_2()]);
    f.proxy.dispatch_pending();
    assert_eq!(f.broadcaster.take_pending(), vec![Broadcast::results(false)]);
    assert!(f.proxy.get_scan_results().is_empty());
    assert!(f.proxy.get_scan_result(&scan_data_1().results[0].bssid).is_none());

    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_2));
    f.deliver(scan_data_2());
    assert_eq!(f.broadcaster.take_pending(), vec![Broadcast::results(true)]);
    f.assert_cache_matches(&scan_data_2());

    f.assert_metrics(2, 2);
}

#[test]
fn test_toggle_scan_state_clears_scan_results() {
    let mut f = Fixture::new();
    f.enable_scanning();
    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));
    f.deliver(scan_data_1());

    // Re-enabling keeps the cache.
    f.proxy.enable_scanning(true, false);
    f.assert_cache_matches(&scan_data_1());

    f.proxy.enable_scanning(false, false);
    assert!(f.proxy.get_scan_results().is_empty());
    assert_eq!(f.engine.scanning_enabled_calls(), vec![true, true, false]);
    assert_eq!(f.broadcaster.sticky(), Some(Broadcast::availability(false)));

    f.proxy.enable_scanning(true, false);
    assert!(f.proxy.get_scan_results().is_empty());
    assert_eq!(f.engine.global_listener_count(), 1);
}

#[test]
fn test_full_internal_scan_results_overwrite_previous_results() {
    let mut f = Fixture::new();
    f.enable_scanning();

    f.deliver(scan_data_1());
    f.deliver(scan_data_2());

    f.assert_cache_matches(&scan_data_2());
    f.assert_metrics(0, 0);
}

#[test]
fn test_partial_internal_scan_results_append_to_previous_results() {
    let mut f = Fixture::new();
    let callback = TestCallback::new(1);
    f.proxy.register_scan_results_callback(callback.clone()).unwrap();
    f.enable_scanning();

    f.deliver(scan_data_1());
    assert_eq!(f.proxy.get_scan_results().len(), 4);

    f.deliver(ScanData::synthetic(3, ScanBands::GHZ_24, &[2412, 2462]));
    assert_eq!(f.proxy.get_scan_results().len(), 6);
    assert_eq!(callback.notifications(), 1);
    assert_eq!(f.broadcaster.take_pending(), vec![Broadcast::results(true)]);
}

#[test]
fn test_get_scan_results_returns_copy() {
    let mut f = Fixture::new();
    f.enable_scanning();
    f.deliver(scan_data_1());

    let mut results = f.proxy.get_scan_results();
    results.clear();
    results.push(NetworkObservation::new("00:00:00:00:00:00", "injected", 2412));

    assert_eq!(f.proxy.get_scan_results().len(), 4);
    assert!(f.proxy.get_scan_result("00:00:00:00:00:00").is_none());
}

#[test]
fn test_hidden_network_returns_named_result() {
    let mut f = Fixture::new();
    f.enable_scanning();

    let blank = NetworkObservation::new("AA:BB:CC:DD:EE:FF", "", 2412).with_rssi(-50);
    let named = NetworkObservation::new("aa:bb:cc:dd:ee:ff", "hidden_ssid", 2412).with_rssi(-55);

    f.deliver(ScanData::new(1, ScanBands::ALL, vec![blank.clone(), named.clone()]));
    assert_eq!(f.proxy.get_scan_results(), vec![named.clone()]);

    f.deliver(ScanData::new(2, ScanBands::ALL, vec![named.clone(), blank]));
    assert_eq!(f.proxy.get_scan_results(), vec![named.clone()]);
    assert_eq!(f.proxy.get_scan_result("AA:BB:CC:DD:EE:FF"), Some(named));
}

// =============================================================================
// Foreground Throttling
// =============================================================================

/// Send `FG_MAX` requests one millisecond apart, all admitted.
fn fill_foreground_window(f: &mut Fixture, uid: u32, package: &str) -> u64 {
    let first = f.clock.elapsed_since_boot_ms();
    for i in 0..FG_MAX as u64 {
        f.clock.set(first + i);
        assert!(f.proxy.start_scan(uid, package));
    }
    first
}

#[test]
fn test_foreground_scan_for_package_in_exception_list_not_throttled() {
    let config = ThrottleConfig::default().with_exception_packages([PACKAGE_1]);
    let mut f = Fixture::with_config(config);
    f.enable_scanning();

    for _ in 0..FG_MAX + 1 {
        assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));
        f.clock.advance(1);
    }

    assert!(f
        .proxy
        .throttle()
        .foreground_timestamps(&CallerId::new(TEST_UID, PACKAGE_1))
        .is_empty());
    f.assert_metrics(FG_MAX as u64 + 1, FG_MAX as u64 + 1);
}

#[test]
fn test_successive_scan_request_from_same_fg_app_throttled() {
    let mut f = Fixture::new();
    f.enable_scanning();
    let first = fill_foreground_window(&mut f, TEST_UID, PACKAGE_1);

    f.clock.set(first + FG_MAX as u64);
    let err = f.proxy.try_start_scan(TEST_UID, PACKAGE_1).unwrap_err();
    assert!(matches!(err, Error::Throttled { .. }));

    assert_eq!(f.broadcaster.take_pending(), vec![failure_to(PACKAGE_1)]);
    assert_eq!(f.engine.request_count(), FG_MAX);
    f.assert_metrics(FG_MAX as u64 + 1, FG_MAX as u64);
    assert_eq!(
        f.metrics.snapshot().foreground_app_oneshot_scan_requests_throttled,
        1
    );
}

#[test]
fn test_successive_scan_request_from_same_fg_app_not_throttled() {
    let mut f = Fixture::new();
    f.enable_scanning();
    let first = fill_foreground_window(&mut f, TEST_UID, PACKAGE_1);

    f.clock.set(first + FG_WINDOW_MS + 1);
    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));
    f.assert_metrics(FG_MAX as u64 + 1, FG_MAX as u64 + 1);
}

#[test]
fn test_successive_scan_request_from_app_with_network_settings_not_throttled() {
    let mut f = Fixture::new();
    f.enable_scanning();
    f.permissions.grant_network_settings(TEST_UID);

    for _ in 0..FG_MAX + 1 {
        assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));
    }
    f.assert_metrics(0, FG_MAX as u64 + 1);
}

#[test]
fn test_successive_scan_request_from_app_with_setup_wizard_not_throttled() {
    let mut f = Fixture::new();
    f.enable_scanning();
    f.permissions.grant_setup_wizard(TEST_UID);

    for _ in 0..FG_MAX + 1 {
        assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));
    }
    f.assert_metrics(0, FG_MAX as u64 + 1);
}

#[test]
fn test_successive_scan_request_when_throttling_is_disabled_not_throttled() {
    let mut f = Fixture::new();
    f.enable_scanning();
    f.proxy.set_scan_throttle_enabled(false).unwrap();
    assert!(!f.settings.scan_throttle_enabled());

    for _ in 0..FG_MAX + 1 {
        assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));
    }
    f.assert_metrics(0, FG_MAX as u64 + 1);
}

#[test]
fn test_settings_store_change_reaches_proxy() {
    let mut f = Fixture::new();
    f.enable_scanning();
    assert!(f.proxy.is_scan_throttle_enabled());

    // Another writer flips the persisted flag.
    f.settings.set_scan_throttle_enabled(false).unwrap();
    f.proxy.dispatch_pending();
    assert!(!f.proxy.is_scan_throttle_enabled());

    for _ in 0..FG_MAX + 1 {
        assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));
    }
}

#[test]
fn test_successive_scan_request_from_different_fg_apps_not_throttled() {
    let mut f = Fixture::new();
    f.enable_scanning();
    let first = fill_foreground_window(&mut f, TEST_UID, PACKAGE_1);

    f.clock.set(first + FG_MAX as u64);
    fill_foreground_window(&mut f, TEST_UID, PACKAGE_2);
    f.assert_metrics(2 * FG_MAX as u64, 2 * FG_MAX as u64);
}

#[test]
fn test_successive_scan_request_after_removal_and_reinstall_not_throttled() {
    let mut f = Fixture::new();
    f.enable_scanning();
    let first = fill_foreground_window(&mut f, TEST_UID, PACKAGE_1);

    f.proxy.clear_scan_request_timestamps_for_app(PACKAGE_1, TEST_UID);
    f.clock.set(first + FG_MAX as u64);
    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));
    f.assert_metrics(FG_MAX as u64 + 1, FG_MAX as u64 + 1);
}

#[test]
fn test_successive_scan_request_after_removal_on_another_user_throttled() {
    let mut f = Fixture::new();
    f.enable_scanning();
    let first = fill_foreground_window(&mut f, TEST_UID, PACKAGE_1);

    f.proxy.clear_scan_request_timestamps_for_app(PACKAGE_1, TEST_OTHER_UID);
    f.clock.set(first + FG_MAX as u64);
    assert!(!f.proxy.start_scan(TEST_UID, PACKAGE_1));

    assert_eq!(f.broadcaster.take_pending(), vec![failure_to(PACKAGE_1)]);
    f.assert_metrics(FG_MAX as u64 + 1, FG_MAX as u64);
}

// =============================================================================
// Background Throttling
// =============================================================================

#[test]
fn test_background_scan_for_package_in_exception_list_not_throttled() {
    let config = ThrottleConfig::default().with_exception_packages([PACKAGE_1]);
    let mut f = Fixture::with_config(config);
    f.enable_scanning();
    f.importance.set_importance(PACKAGE_1, IMPORTANCE_CACHED);

    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));
    f.clock.advance(1);
    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));

    assert_eq!(f.proxy.throttle().last_background_admission_ms(), None);
    assert_eq!(
        f.metrics.snapshot().background_app_oneshot_scan_requests_throttled,
        0
    );
}

#[test]
fn test_successive_scan_request_from_bg_apps_throttled() {
    let mut f = Fixture::new();
    f.enable_scanning();
    f.importance.set_importance(PACKAGE_1, IMPORTANCE_CACHED);
    f.importance.set_importance(PACKAGE_2, IMPORTANCE_CACHED);

    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));
    f.clock.advance(1);
    let err = f.proxy.try_start_scan(TEST_UID, PACKAGE_2).unwrap_err();
    assert!(matches!(err, Error::Throttled { .. }));

    assert_eq!(f.broadcaster.take_pending(), vec![failure_to(PACKAGE_2)]);
    f.assert_metrics(2, 1);
    assert_eq!(
        f.metrics.snapshot().background_app_oneshot_scan_requests_throttled,
        1
    );
}

#[test]
fn test_successive_scan_request_from_bg_apps_not_throttled() {
    let mut f = Fixture::new();
    f.enable_scanning();
    f.importance.set_importance(PACKAGE_1, IMPORTANCE_CACHED);
    f.importance.set_importance(PACKAGE_2, IMPORTANCE_CACHED);

    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));
    f.clock.advance(BG_INTERVAL_MS + 1);
    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_2));

    f.assert_metrics(2, 2);
    assert_eq!(
        f.metrics.snapshot().last_importance,
        Some(IMPORTANCE_CACHED)
    );
}

// =============================================================================
// Results Callbacks
// =============================================================================

#[test]
fn test_scan_success_with_multiple_callbacks() {
    let mut f = Fixture::new();
    let callbacks: Vec<_> = (1..=3).map(TestCallback::new).collect();
    for callback in &callbacks {
        f.proxy.register_scan_results_callback(callback.clone()).unwrap();
    }
    f.enable_scanning();
    assert!(f.proxy.start_scan(TEST_UID, PACKAGE_1));

    f.deliver(scan_data_1());

    for callback in &callbacks {
        assert_eq!(callback.notifications(), 1);
    }
}

#[test]
fn test_replaces_old_callback_when_registering_twice() {
    let mut f = Fixture::new();
    let first = TestCallback::new(7);
    let second = TestCallback::new(7);
    f.proxy.register_scan_results_callback(first.clone()).unwrap();
    let stale = first.recipient.lock().clone().unwrap();
    f.proxy.register_scan_results_callback(second.clone()).unwrap();

    assert_eq!(first.unlinks.load(Ordering::SeqCst), 1);
    assert_eq!(f.proxy.registered_callback_count(), 1);

    f.enable_scanning();
    f.deliver(scan_data_1());
    assert_eq!(first.notifications(), 0);
    assert_eq!(second.notifications(), 1);

    // A late death notice for the replaced registration changes nothing.
    stale.binder_died();
    assert_eq!(f.proxy.dispatch_pending(), 1);
    assert_eq!(f.proxy.registered_callback_count(), 1);
}

#[test]
fn test_unregister_scan_results_callback_on_death() {
    let mut f = Fixture::new();
    let callback = TestCallback::new(1);
    f.proxy.register_scan_results_callback(callback.clone()).unwrap();

    callback.die();
    f.proxy.dispatch_pending();
    assert_eq!(f.proxy.registered_callback_count(), 0);

    f.enable_scanning();
    f.deliver(scan_data_1());
    assert_eq!(callback.notifications(), 0);
}

#[test]
fn test_unregister_scan_results_callback() {
    let mut f = Fixture::new();
    let callback = TestCallback::new(1);
    f.proxy.register_scan_results_callback(callback.clone()).unwrap();

    assert!(f.proxy.unregister_scan_results_callback(CallbackToken(1)));
    assert!(!f.proxy.unregister_scan_results_callback(CallbackToken(1)));
    assert_eq!(callback.unlinks.load(Ordering::SeqCst), 1);
}

#[test]
fn test_register_dead_callback_fails() {
    let mut f = Fixture::new();
    let callback = TestCallback::already_dead(1);

    let err = f.proxy.register_scan_results_callback(callback).unwrap_err();
    assert!(matches!(err, Error::CallbackDead(_)));
    assert_eq!(f.proxy.registered_callback_count(), 0);
}
