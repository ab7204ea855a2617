//! Simulate command - replay a scan request burst against a simulated engine.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use scanproxy_core::adapters::oracle::{IMPORTANCE_CACHED, IMPORTANCE_FOREGROUND};
use scanproxy_core::adapters::{
    CountingMetrics, MemorySettingsStore, MetricsSnapshot, QueuedBroadcaster, SimulatedScanEngine,
    StaticEngineProvider, StaticHiddenNetworks, StaticImportanceOracle, StaticPermissionOracle,
};
use scanproxy_core::{
    Collaborators, ConfigStore, Error, ManualClock, ProxyService, ScanBands, ScanData,
    ScanRequestProxy,
};

/// Frequencies reported by every simulated scan.
const SIMULATED_FREQUENCIES: &[u32] = &[2412, 2437, 2462, 5180, 5240, 5745];

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Requesting package (repeat for several apps)
    #[arg(short, long = "package", default_value = "com.example.app")]
    packages: Vec<String>,

    /// Uid shared by the requesting packages
    #[arg(long, default_value_t = 10_001)]
    uid: u32,

    /// Requests per package
    #[arg(short = 'n', long, default_value_t = 6)]
    requests: u32,

    /// Simulated time between request rounds, in milliseconds
    #[arg(short, long, default_value_t = 1_000)]
    interval_ms: u64,

    /// Treat the packages as background apps
    #[arg(long)]
    background: bool,

    /// Grant the network settings permission to the uid
    #[arg(long)]
    elevated: bool,

    /// Disable throttling regardless of the saved configuration
    #[arg(long)]
    no_throttle: bool,

    /// Fail every Nth forwarded scan instead of delivering results
    #[arg(long)]
    fail_every: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestRow {
    time_ms: u64,
    package: String,
    forwarded: bool,
    outcome: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    requests: Vec<RequestRow>,
    cached_results: usize,
    broadcasts: usize,
    metrics: MetricsSnapshot,
}

pub async fn run(args: SimulateArgs, verbose: bool, json: bool) -> Result<()> {
    let config = ConfigStore::new()?
        .load()
        .await
        .context("Failed to load configuration")?;

    let clock = Arc::new(ManualClock::new(0));
    let engine = Arc::new(SimulatedScanEngine::new());
    let importance = Arc::new(StaticImportanceOracle::new(if args.background {
        IMPORTANCE_CACHED
    } else {
        IMPORTANCE_FOREGROUND
    }));
    let permissions = Arc::new(StaticPermissionOracle::new());
    if args.elevated {
        permissions.grant_network_settings(args.uid);
    }
    let metrics = Arc::new(CountingMetrics::new());
    let broadcaster = Arc::new(QueuedBroadcaster::new());

    let collaborators = Collaborators {
        engine_provider: Arc::new(StaticEngineProvider::new(engine.clone())),
        importance,
        permissions,
        saved_networks: Arc::new(StaticHiddenNetworks::default()),
        suggestions: Arc::new(StaticHiddenNetworks::default()),
        settings: Arc::new(MemorySettingsStore::new(
            config.scan_throttle_enabled && !args.no_throttle,
        )),
        metrics: metrics.clone(),
        broadcaster: broadcaster.clone(),
        clock: clock.clone(),
    };

    let (handle, task) = ProxyService::spawn(ScanRequestProxy::new(collaborators, config.throttle));
    handle.enable_verbose_logging(verbose).await?;
    handle.enable_scanning(true, false).await?;
    let mut outcomes = handle.subscribe().await?;

    let mut rows = Vec::new();
    let mut forwarded = 0u32;

    for round in 0..args.requests {
        let now_ms = u64::from(round) * args.interval_ms;
        clock.set(now_ms);

        for package in &args.packages {
            let admitted = handle.try_start_scan(args.uid, package).await?;
            let (was_forwarded, outcome) = match admitted {
                Ok(request_id) => {
                    forwarded += 1;
                    let fail = args.fail_every.is_some_and(|n| n > 0 && forwarded % n == 0);
                    if fail {
                        engine.fail_request(request_id, -1, "simulated failure");
                    } else {
                        let data =
                            ScanData::synthetic(forwarded, ScanBands::ALL, SIMULATED_FREQUENCIES);
                        engine.deliver_results(vec![data]);
                    }

                    let result = match outcomes.recv().await {
                        Some(o) if o.success => "scanned",
                        Some(_) => "scan failed",
                        None => return Err(Error::ServiceStopped.into()),
                    };
                    (true, result.to_string())
                }
                Err(Error::Throttled { class, .. }) => (false, format!("throttled ({})", class)),
                Err(e) => return Err(e.into()),
            };

            rows.push(RequestRow {
                time_ms: now_ms,
                package: package.clone(),
                forwarded: was_forwarded,
                outcome,
            });
        }
    }

    let cached_results = handle.get_scan_results().await?.len();
    drop(handle);
    task.await.context("Scan proxy task failed")?;

    let report = Report {
        requests: rows,
        cached_results,
        broadcasts: broadcaster.take_pending().len(),
        metrics: metrics.snapshot(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &Report) {
    println!("{:<10} {:<30} {:<10} OUTCOME", "TIME(ms)", "PACKAGE", "FORWARDED");
    println!("{}", "-".repeat(70));

    for row in &report.requests {
        println!(
            "{:<10} {:<30} {:<10} {}",
            row.time_ms,
            truncate(&row.package, 30),
            if row.forwarded { "yes" } else { "no" },
            row.outcome
        );
    }

    let forwarded = report.requests.iter().filter(|r| r.forwarded).count();
    println!(
        "\nForwarded: {} of {} requests",
        forwarded,
        report.requests.len()
    );
    println!("Cached results: {}", report.cached_results);
    println!("Broadcasts sent: {}", report.broadcasts);
    println!(
        "Throttled: {} foreground, {} background",
        report.metrics.foreground_app_oneshot_scan_requests_throttled,
        report.metrics.background_app_oneshot_scan_requests_throttled
    );
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max - 1).collect();
        format!("{}…", kept)
    }
}
