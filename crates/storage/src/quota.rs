// crates/storage/src/quota.rs
//! Storage quota reporting and thresholding

use crate::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Read-only snapshot of local storage usage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StorageQuota {
    /// Bytes currently used
    pub used: u64,
    /// Bytes still available
    pub available: u64,
    /// Total capacity in bytes
    pub total: u64,
    /// Used fraction of total, as a percentage in [0, 100]
    pub percentage: f64,
}

impl StorageQuota {
    /// Builds a snapshot from used/total byte counts
    pub fn from_bytes(used: u64, total: u64) -> Self {
        let percentage = if total == 0 {
            0.0
        } else {
            (used as f64 / total as f64) * 100.0
        };
        Self {
            used,
            available: total.saturating_sub(used),
            total,
            percentage,
        }
    }
}

/// Reports local storage usage
///
/// Backed by the platform's storage-estimate surface in production; test
/// doubles return fixed values.
pub trait QuotaProbe: Send + Sync {
    /// Returns the current usage snapshot
    fn snapshot(&self) -> StorageQuota;
}

/// Probe returning a configurable snapshot, for tests and simulations
#[derive(Clone)]
pub struct FixedQuotaProbe {
    quota: Arc<Mutex<StorageQuota>>,
}

impl FixedQuotaProbe {
    /// Creates a probe with the given used/total bytes
    pub fn new(used: u64, total: u64) -> Self {
        Self {
            quota: Arc::new(Mutex::new(StorageQuota::from_bytes(used, total))),
        }
    }

    /// Replaces the reported usage
    pub fn set_used(&self, used: u64) {
        if let Ok(mut quota) = self.quota.lock() {
            *quota = StorageQuota::from_bytes(used, quota.total);
        }
    }
}

impl QuotaProbe for FixedQuotaProbe {
    fn snapshot(&self) -> StorageQuota {
        self.quota.lock().map(|q| *q).unwrap_or_else(|_| {
            StorageQuota::from_bytes(0, 0)
        })
    }
}

/// Rejects large offline writes once usage crosses a threshold
///
/// The threshold is shared across clones so it can follow runtime config
/// changes.
#[derive(Clone)]
pub struct QuotaGuard {
    probe: Arc<dyn QuotaProbe>,
    threshold_percent: Arc<Mutex<f64>>,
}

impl QuotaGuard {
    /// Creates a guard that rejects large writes above `threshold_percent`
    pub fn new(probe: Arc<dyn QuotaProbe>, threshold_percent: f64) -> Self {
        Self {
            probe,
            threshold_percent: Arc::new(Mutex::new(threshold_percent)),
        }
    }

    /// Returns the current usage snapshot
    pub fn snapshot(&self) -> StorageQuota {
        self.probe.snapshot()
    }

    /// Replaces the rejection threshold
    pub fn set_threshold(&self, percent: f64) {
        if let Ok(mut threshold) = self.threshold_percent.lock() {
            *threshold = percent;
        }
    }

    /// Current rejection threshold, in percent used
    pub fn threshold(&self) -> f64 {
        self.threshold_percent.lock().map(|t| *t).unwrap_or(100.0)
    }

    /// Checks whether a write of `payload_bytes` may be buffered offline.
    ///
    /// Small writes always pass; rejecting a few hundred bytes of metadata
    /// would strand the queue while large session recordings are the actual
    /// capacity risk.
    pub fn check_write(&self, payload_bytes: u64) -> StorageResult<()> {
        const SMALL_WRITE_BYTES: u64 = 64 * 1024;
        if payload_bytes <= SMALL_WRITE_BYTES {
            return Ok(());
        }

        let threshold_percent = self.threshold();
        let quota = self.probe.snapshot();
        if quota.percentage > threshold_percent {
            return Err(StorageError::CapacityExceeded {
                used_percent: quota.percentage,
                threshold_percent,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_from_bytes() {
        let quota = StorageQuota::from_bytes(500, 1000);
        assert_eq!(quota.available, 500);
        assert!((quota.percentage - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_total_is_zero_percent() {
        let quota = StorageQuota::from_bytes(0, 0);
        assert_eq!(quota.percentage, 0.0);
    }

    #[test]
    fn test_small_write_always_allowed() {
        let probe = Arc::new(FixedQuotaProbe::new(990, 1000));
        let guard = QuotaGuard::new(probe, 90.0);
        assert!(guard.check_write(100).is_ok());
    }

    #[test]
    fn test_large_write_rejected_over_threshold() {
        let probe = Arc::new(FixedQuotaProbe::new(950, 1000));
        let guard = QuotaGuard::new(probe, 90.0);
        let result = guard.check_write(10 * 1024 * 1024);
        assert!(matches!(
            result,
            Err(StorageError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn test_large_write_allowed_under_threshold() {
        let probe = Arc::new(FixedQuotaProbe::new(100, 1000));
        let guard = QuotaGuard::new(probe, 90.0);
        assert!(guard.check_write(10 * 1024 * 1024).is_ok());
    }

    #[test]
    fn test_threshold_update_reflected() {
        let probe = Arc::new(FixedQuotaProbe::new(500, 1000));
        let guard = QuotaGuard::new(probe, 90.0);
        assert!(guard.check_write(10 * 1024 * 1024).is_ok());

        guard.set_threshold(40.0);
        assert!(guard.check_write(10 * 1024 * 1024).is_err());

        // Clones see the same threshold
        let clone = guard.clone();
        clone.set_threshold(90.0);
        assert!(guard.check_write(10 * 1024 * 1024).is_ok());
    }

    #[test]
    fn test_probe_update_reflected() {
        let probe = Arc::new(FixedQuotaProbe::new(100, 1000));
        let guard = QuotaGuard::new(probe.clone(), 90.0);
        assert!(guard.check_write(1024 * 1024).is_ok());

        probe.set_used(999);
        assert!(guard.check_write(1024 * 1024).is_err());
    }
}
