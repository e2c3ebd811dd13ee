// crates/network/src/lib.rs
//! Network reachability monitoring for the offline sync core
//!
//! Exposes the current connection state and a subscription mechanism the
//! sync engine uses to trigger sync passes:
//! - `ConnectionState`: online flag plus optional quality hints
//! - `ConnectionMonitor`: debounced state publisher (offline fast, online
//!   confirmed by a probe)
//! - `ReachabilityProbe` / `HttpProbe`: pluggable reachability check

mod error;
mod monitor;
mod probe;

pub use error::{NetworkError, NetworkResult};
pub use monitor::{ConnectionMonitor, ConnectionQuality, ConnectionState, EffectiveType};
pub use probe::{HttpProbe, ReachabilityProbe};
