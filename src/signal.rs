//! Process-wide termination signal dispatcher.
//!
//! Signal delivery is routed through a single dispatcher that forwards to
//! every registered stop hook. Clients inject their stop callback at
//! registration time, so no static client references exist; dropping the
//! returned [`SignalHook`] deregisters the callback.
//!
//! The first registration spawns one listener task for SIGTERM/SIGINT
//! (Ctrl-C on non-unix platforms).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;

use parking_lot::Mutex;
use tracing::{info, warn};

struct SignalDispatcher {
    hooks: Mutex<HashMap<u64, Box<dyn Fn() + Send + Sync>>>,
    next_id: AtomicU64,
    listener_started: AtomicBool,
}

static DISPATCHER: OnceLock<SignalDispatcher> = OnceLock::new();

fn dispatcher() -> &'static SignalDispatcher {
    DISPATCHER.get_or_init(|| SignalDispatcher {
        hooks: Mutex::new(HashMap::new()),
        next_id: AtomicU64::new(0),
        listener_started: AtomicBool::new(false),
    })
}

/// Registration of one stop hook; deregisters on drop.
#[derive(Debug)]
pub struct SignalHook {
    id: u64,
}

impl Drop for SignalHook {
    fn drop(&mut self) {
        dispatcher().hooks.lock().remove(&self.id);
    }
}

/// Registers `hook` to run when the process receives a termination signal.
///
/// Must be called from within a tokio runtime; the first call spawns the
/// listener task.
pub fn register_stop_hook<F>(hook: F) -> SignalHook
where
    F: Fn() + Send + Sync + 'static,
{
    let d = dispatcher();
    ensure_listener(d);

    let id = d.next_id.fetch_add(1, Ordering::Relaxed);
    d.hooks.lock().insert(id, Box::new(hook));
    SignalHook { id }
}

fn ensure_listener(d: &'static SignalDispatcher) {
    if d.listener_started.swap(true, Ordering::SeqCst) {
        return;
    }
    tokio::spawn(listen(d));
}

fn dispatch(d: &SignalDispatcher) {
    let hooks = d.hooks.lock();
    info!(hooks = hooks.len(), "dispatching stop hooks");
    for hook in hooks.values() {
        hook();
    }
}

#[cfg(unix)]
async fn listen(d: &'static SignalDispatcher) {
    use tokio::signal::unix::{signal, SignalKind};

    let sigterm = signal(SignalKind::terminate());
    let sigint = signal(SignalKind::interrupt());
    let (mut sigterm, mut sigint) = match (sigterm, sigint) {
        (Ok(t), Ok(i)) => (t, i),
        _ => {
            warn!("failed to install termination signal handlers");
            return;
        }
    };

    loop {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sigint.recv() => info!("received SIGINT"),
        }
        dispatch(d);
    }
}

#[cfg(not(unix))]
async fn listen(d: &'static SignalDispatcher) {
    loop {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(%error, "failed to listen for Ctrl-C");
            return;
        }
        info!("received Ctrl-C");
        dispatch(d);
    }
}
