// crates/network/src/monitor.rs
//! Connection state monitoring with debounced online transitions

use crate::probe::ReachabilityProbe;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Coarse link class, mirroring the values platform connection APIs report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectiveType {
    #[serde(rename = "slow-2g")]
    Slow2g,
    #[serde(rename = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    ThreeG,
    #[serde(rename = "4g")]
    FourG,
}

/// Optional link quality hints
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectionQuality {
    pub effective_type: EffectiveType,
    /// Estimated downlink bandwidth in megabits per second
    pub downlink_mbps: f64,
    /// Estimated round-trip time in milliseconds
    pub rtt_ms: u32,
    /// User has requested reduced data usage
    pub save_data: bool,
}

/// Current network reachability snapshot. Derived, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectionState {
    pub is_online: bool,
    pub quality: Option<ConnectionQuality>,
}

impl ConnectionState {
    /// Online with no quality information
    pub fn online() -> Self {
        Self {
            is_online: true,
            quality: None,
        }
    }

    /// Offline; quality hints are meaningless and dropped
    pub fn offline() -> Self {
        Self {
            is_online: false,
            quality: None,
        }
    }

    /// Returns true if the user asked for reduced data usage
    pub fn save_data(&self) -> bool {
        self.quality.map_or(false, |q| q.save_data)
    }
}

/// Publishes connection state transitions to subscribers
///
/// Transitions to offline publish immediately (fail fast). Transitions to
/// online are confirmed by one reachability probe round first, so a flapping
/// link does not thrash subscribers.
pub struct ConnectionMonitor {
    probe: Arc<dyn ReachabilityProbe>,
    tx: watch::Sender<ConnectionState>,
}

impl ConnectionMonitor {
    /// Creates a monitor starting in the offline state
    pub fn new(probe: Arc<dyn ReachabilityProbe>) -> Self {
        let (tx, _) = watch::channel(ConnectionState::offline());
        Self { probe, tx }
    }

    /// Returns the current snapshot
    pub fn current(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    /// Subscribes to state changes
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }

    /// Reports loss of connectivity. Published immediately.
    pub fn report_offline(&self) {
        if self.current().is_online {
            log::warn!("connection lost, going offline");
            self.tx.send_replace(ConnectionState::offline());
        }
    }

    /// Reports regained connectivity with optional quality hints.
    ///
    /// The transition is confirmed by the reachability probe before being
    /// published; an unconfirmed report leaves the state offline. Quality
    /// updates while already online are published without re-probing.
    pub async fn report_online(&self, quality: Option<ConnectionQuality>) {
        let state = ConnectionState {
            is_online: true,
            quality,
        };

        if self.current().is_online {
            if self.current() != state {
                self.tx.send_replace(state);
            }
            return;
        }

        if self.probe.is_reachable().await {
            log::info!("connection restored");
            self.tx.send_replace(state);
        } else {
            log::debug!("online report not confirmed by probe, staying offline");
        }
    }

    /// Spawns a background task that probes reachability on an interval and
    /// publishes transitions it discovers. Useful where the platform delivers
    /// no connectivity events.
    pub fn start_polling(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let reachable = monitor.probe.is_reachable().await;
                let online = monitor.current().is_online;
                if reachable && !online {
                    // Probe already confirmed reachability, publish directly
                    log::info!("poller detected connectivity");
                    monitor.tx.send_replace(ConnectionState::online());
                } else if !reachable && online {
                    monitor.report_offline();
                }
            }
        })
    }
}
