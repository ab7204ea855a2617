//! Single-task owner for a [`ScanRequestProxy`].
//!
//! [`ProxyService::spawn`] moves the proxy onto a tokio task that applies
//! commands from [`ProxyHandle`]s and the proxy's own events in one loop, so
//! every mutation happens on that task.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::{NetworkObservation, RequestId, ScanOutcome};
use crate::error::{Error, Result};
use crate::proxy::ScanRequestProxy;
use crate::registry::{CallbackToken, ScanResultsCallback};

type Reply<T> = oneshot::Sender<T>;

enum Command {
    EnableScanning {
        enable: bool,
        hidden_networks: bool,
        reply: Reply<()>,
    },
    StartScan {
        uid: u32,
        package: String,
        reply: Reply<Result<RequestId>>,
    },
    GetScanResults {
        reply: Reply<Vec<NetworkObservation>>,
    },
    GetScanResult {
        bssid: String,
        reply: Reply<Option<NetworkObservation>>,
    },
    RegisterCallback {
        callback: Arc<dyn ScanResultsCallback>,
        reply: Reply<Result<()>>,
    },
    UnregisterCallback {
        token: CallbackToken,
        reply: Reply<bool>,
    },
    ClearTimestamps {
        package: String,
        uid: u32,
        reply: Reply<()>,
    },
    SetThrottleEnabled {
        enable: bool,
        reply: Reply<Result<()>>,
    },
    IsThrottleEnabled {
        reply: Reply<bool>,
    },
    SetVerboseLogging {
        verbose: bool,
        reply: Reply<()>,
    },
    Subscribe {
        reply: Reply<mpsc::UnboundedReceiver<ScanOutcome>>,
    },
}

/// Runs a proxy on its own task.
pub struct ProxyService;

impl ProxyService {
    /// Spawn the owner task.
    ///
    /// The task ends once every handle is dropped and gives the proxy back
    /// through the join handle.
    pub fn spawn(proxy: ScanRequestProxy) -> (ProxyHandle, JoinHandle<ScanRequestProxy>) {
        let (tx, rx) = mpsc::channel(64);
        let task = tokio::spawn(run(proxy, rx));
        (ProxyHandle { tx }, task)
    }
}

async fn run(
    mut proxy: ScanRequestProxy,
    mut commands: mpsc::Receiver<Command>,
) -> ScanRequestProxy {
    let Some(mut events) = proxy.detach_event_receiver() else {
        return proxy;
    };
    let mut subscribers: Vec<mpsc::UnboundedSender<ScanOutcome>> = Vec::new();

    info!("Scan proxy service started");
    loop {
        tokio::select! {
            biased;

            Some(event) = events.recv() => {
                if let Some(outcome) = proxy.handle_event(event) {
                    subscribers.retain(|tx| tx.send(outcome).is_ok());
                }
            }
            command = commands.recv() => match command {
                Some(Command::Subscribe { reply }) => {
                    let (tx, rx) = mpsc::unbounded_channel();
                    if reply.send(rx).is_ok() {
                        subscribers.push(tx);
                    }
                }
                Some(command) => apply(&mut proxy, command),
                None => break,
            },
        }
    }

    // Leave nothing queued behind for whoever takes the proxy back.
    while let Ok(event) = events.try_recv() {
        proxy.handle_event(event);
    }
    proxy.attach_event_receiver(events);
    info!("Scan proxy service stopped");
    proxy
}

fn apply(proxy: &mut ScanRequestProxy, command: Command) {
    // A dropped reply only means the caller stopped waiting.
    match command {
        Command::EnableScanning {
            enable,
            hidden_networks,
            reply,
        } => {
            proxy.enable_scanning(enable, hidden_networks);
            let _ = reply.send(());
        }
        Command::StartScan {
            uid,
            package,
            reply,
        } => {
            let _ = reply.send(proxy.try_start_scan(uid, &package));
        }
        Command::GetScanResults { reply } => {
            let _ = reply.send(proxy.get_scan_results());
        }
        Command::GetScanResult { bssid, reply } => {
            let _ = reply.send(proxy.get_scan_result(&bssid));
        }
        Command::RegisterCallback { callback, reply } => {
            let _ = reply.send(proxy.register_scan_results_callback(callback));
        }
        Command::UnregisterCallback { token, reply } => {
            let _ = reply.send(proxy.unregister_scan_results_callback(token));
        }
        Command::ClearTimestamps {
            package,
            uid,
            reply,
        } => {
            proxy.clear_scan_request_timestamps_for_app(&package, uid);
            let _ = reply.send(());
        }
        Command::SetThrottleEnabled { enable, reply } => {
            let _ = reply.send(proxy.set_scan_throttle_enabled(enable));
        }
        Command::IsThrottleEnabled { reply } => {
            let _ = reply.send(proxy.is_scan_throttle_enabled());
        }
        Command::SetVerboseLogging { verbose, reply } => {
            proxy.enable_verbose_logging(verbose);
            let _ = reply.send(());
        }
        Command::Subscribe { .. } => debug!("Subscribe handled by the service loop"),
    }
}

/// Cloneable handle to a running [`ProxyService`].
#[derive(Clone)]
pub struct ProxyHandle {
    tx: mpsc::Sender<Command>,
}

impl ProxyHandle {
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| Error::ServiceStopped)?;
        rx.await.map_err(|_| Error::ServiceStopped)
    }

    pub async fn enable_scanning(&self, enable: bool, hidden_networks: bool) -> Result<()> {
        self.request(|reply| Command::EnableScanning {
            enable,
            hidden_networks,
            reply,
        })
        .await
    }

    /// Returns true iff the request was forwarded to the engine.
    pub async fn start_scan(&self, uid: u32, package: &str) -> Result<bool> {
        Ok(self.try_start_scan(uid, package).await?.is_ok())
    }

    /// Outer error: service gone. Inner error: request not forwarded.
    pub async fn try_start_scan(&self, uid: u32, package: &str) -> Result<Result<RequestId>> {
        let package = package.to_string();
        self.request(|reply| Command::StartScan {
            uid,
            package,
            reply,
        })
        .await
    }

    pub async fn get_scan_results(&self) -> Result<Vec<NetworkObservation>> {
        self.request(|reply| Command::GetScanResults { reply }).await
    }

    pub async fn get_scan_result(&self, bssid: &str) -> Result<Option<NetworkObservation>> {
        let bssid = bssid.to_string();
        self.request(|reply| Command::GetScanResult { bssid, reply })
            .await
    }

    pub async fn register_scan_results_callback(
        &self,
        callback: Arc<dyn ScanResultsCallback>,
    ) -> Result<()> {
        self.request(|reply| Command::RegisterCallback { callback, reply })
            .await?
    }

    pub async fn unregister_scan_results_callback(&self, token: CallbackToken) -> Result<bool> {
        self.request(|reply| Command::UnregisterCallback { token, reply })
            .await
    }

    pub async fn clear_scan_request_timestamps_for_app(
        &self,
        package: &str,
        uid: u32,
    ) -> Result<()> {
        let package = package.to_string();
        self.request(|reply| Command::ClearTimestamps {
            package,
            uid,
            reply,
        })
        .await
    }

    pub async fn set_scan_throttle_enabled(&self, enable: bool) -> Result<()> {
        self.request(|reply| Command::SetThrottleEnabled { enable, reply })
            .await?
    }

    pub async fn is_scan_throttle_enabled(&self) -> Result<bool> {
        self.request(|reply| Command::IsThrottleEnabled { reply }).await
    }

    pub async fn enable_verbose_logging(&self, verbose: bool) -> Result<()> {
        self.request(|reply| Command::SetVerboseLogging { verbose, reply })
            .await
    }

    /// Receive every scan outcome processed from now on.
    pub async fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<ScanOutcome>> {
        self.request(|reply| Command::Subscribe { reply }).await
    }
}
