//! Phase-based host/device time correlation.
//!
//! The device exposes only a 2-bit frame counter. Consecutive observations
//! are unwrapped into a tick count, converted with the nominal tick rate, and
//! the host/device offset is tracked with [`AdaKF`]. The mapping is rebuilt
//! when an observation disagrees by more than `reset_time_s` or the fitted
//! drift exceeds `rate_error`.
//!
//! Unwrapping assumes fewer than one full cycle of ticks between updates.
//! After [`TimeCorrelator::sync_lost`] the gap length is unknown, so the
//! next update reseeds the mapping.

use contracts::{Phase, TimeCorrelator, TimeSyncConfig};
use tracing::{debug, trace, warn};

use crate::adakf::AdaKF;

/// Drift-correcting phase correlator
#[derive(Debug, Clone)]
pub struct PhaseTimeSync {
    config: TimeSyncConfig,
    filter: Option<AdaKF>,
    /// Host time mapped to zero in filter coordinates (µs)
    anchor_utime: i64,
    last_host_utime: i64,
    last_phase: Option<Phase>,
    /// Unwrapped device ticks since the last (re)sync
    ticks: i64,
    last_device_s: f64,
    updates: u64,
    resync_count: u64,
}

impl PhaseTimeSync {
    pub fn new(config: &TimeSyncConfig) -> Self {
        Self {
            config: config.clone(),
            filter: None,
            anchor_utime: 0,
            last_host_utime: 0,
            last_phase: None,
            ticks: 0,
            last_device_s: 0.0,
            updates: 0,
            resync_count: 0,
        }
    }

    /// Whether at least one observation has been accepted
    pub fn is_synced(&self) -> bool {
        self.filter.is_some()
    }

    /// Current host minus device offset (seconds, relative to the anchor)
    pub fn offset_s(&self) -> Option<f64> {
        self.filter.as_ref().map(AdaKF::offset)
    }

    /// Fitted drift (seconds per second)
    pub fn drift(&self) -> Option<f64> {
        self.filter.as_ref().map(AdaKF::drift)
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    fn wrap(&self) -> u8 {
        self.config.phase_wrap
    }

    fn device_seconds(&self, ticks: i64) -> f64 {
        ticks as f64 / self.config.nominal_rate_hz
    }

    fn seed(&mut self, host_utime: i64, phase: u8) {
        self.ticks = i64::from(phase);
        self.last_device_s = self.device_seconds(self.ticks);
        self.anchor_utime = host_utime;
        self.filter = Some(AdaKF::new(&self.config.adakf, -self.last_device_s));
    }
}

impl TimeCorrelator for PhaseTimeSync {
    fn update(&mut self, host_utime: i64, phase: Phase) {
        let wrap = self.wrap();
        let p = phase.value() % wrap;
        let previous = self.last_phase.replace(Phase::new(p));
        self.last_host_utime = host_utime;
        self.updates += 1;

        let Some(last) = previous else {
            self.seed(host_utime, p);
            return;
        };

        self.ticks += i64::from(Phase::new(p).distance_from(last, wrap));
        let device_s = self.device_seconds(self.ticks);
        let dt = device_s - self.last_device_s;
        let host_s = (host_utime - self.anchor_utime) as f64 * 1e-6;
        let observation = host_s - device_s;

        let Some(filter) = self.filter.as_mut() else {
            self.seed(host_utime, p);
            return;
        };

        let residual = observation - filter.predict_offset(dt);
        let drift = filter.drift();
        if residual.abs() > self.config.reset_time_s || drift.abs() > self.config.rate_error {
            self.resync_count += 1;
            warn!(
                residual_ms = residual * 1e3,
                drift,
                mean_abs_residual_ms = filter.mean_abs_residual() * 1e3,
                resync_count = self.resync_count,
                "time sync diverged, resynchronizing"
            );
            observability::record_timesync_resync();
            self.seed(host_utime, p);
            return;
        }

        let (offset, residual) = filter.update(observation, dt);
        self.last_device_s = device_s;

        if self.updates % 10_000 == 0 {
            debug!(
                offset_ms = offset * 1e3,
                residual_ms = residual * 1e3,
                drift = filter.drift(),
                uncertainty = filter.uncertainty(),
                "time sync state"
            );
        }
    }

    fn estimate_device_time(&self, phase: Phase) -> i64 {
        let (Some(filter), Some(last)) = (self.filter.as_ref(), self.last_phase) else {
            return self.last_host_utime;
        };
        let back = last.distance_from(phase, self.wrap());
        let device_s = self.device_seconds(self.ticks - i64::from(back));
        let host_s = device_s + filter.predict_offset(device_s - self.last_device_s);
        self.anchor_utime + (host_s * 1e6).round() as i64
    }

    fn resync_count(&self) -> u64 {
        self.resync_count
    }

    fn sync_lost(&mut self) {
        trace!(updates = self.updates, "frame alignment lost, reseeding on next update");
        self.last_phase = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE_UTIME: i64 = 1_700_000_000_000_000;

    fn host_utime(tick: i64, rate_hz: f64) -> i64 {
        BASE_UTIME + (tick as f64 * 1e6 / rate_hz).round() as i64
    }

    #[test]
    fn estimate_before_update_is_zero() {
        let sync = PhaseTimeSync::new(&TimeSyncConfig::default());
        assert!(!sync.is_synced());
        assert_eq!(sync.estimate_device_time(Phase::new(2)), 0);
        assert_eq!(sync.resync_count(), 0);
    }

    #[test]
    fn tracks_nominal_rate_clock() {
        let mut sync = PhaseTimeSync::new(&TimeSyncConfig::default());
        let mut last_host = 0;
        for tick in 0..2000_i64 {
            last_host = host_utime(tick, 989.0);
            sync.update(last_host, Phase::new((tick % 4) as u8));
        }

        let estimate = sync.estimate_device_time(Phase::new((1999 % 4) as u8));
        assert!(
            (estimate - last_host).abs() <= 5,
            "estimate {estimate} vs host {last_host}"
        );
        assert_eq!(sync.resync_count(), 0);
        assert_eq!(sync.updates(), 2000);
    }

    #[test]
    fn earlier_phase_maps_to_earlier_frame() {
        let mut sync = PhaseTimeSync::new(&TimeSyncConfig::default());
        for tick in 0..500_i64 {
            sync.update(host_utime(tick, 989.0), Phase::new((tick % 4) as u8));
        }
        let previous = host_utime(498, 989.0);
        let estimate = sync.estimate_device_time(Phase::new((498 % 4) as u8));
        assert!(
            (estimate - previous).abs() <= 5,
            "estimate {estimate} vs host {previous}"
        );
    }

    #[test]
    fn absorbs_rate_error_within_tolerance() {
        // device really ticks at 1 kHz, ~1.1% off nominal
        let mut sync = PhaseTimeSync::new(&TimeSyncConfig::default());
        let mut last_host = 0;
        for tick in 0..4000_i64 {
            last_host = host_utime(tick, 1000.0);
            sync.update(last_host, Phase::new((tick % 4) as u8));
        }
        assert_eq!(sync.resync_count(), 0);
        let estimate = sync.estimate_device_time(Phase::new((3999 % 4) as u8));
        assert!(
            (estimate - last_host).abs() < 500,
            "estimate {estimate} vs host {last_host}"
        );
        let drift = sync.drift().unwrap();
        assert!(drift < 0.0, "drift should be negative, got {drift}");
    }

    #[test]
    fn host_jump_triggers_single_resync() {
        let mut sync = PhaseTimeSync::new(&TimeSyncConfig::default());
        for tick in 0..100_i64 {
            sync.update(host_utime(tick, 989.0), Phase::new((tick % 4) as u8));
        }

        let jump = 500_000;
        let mut last_host = 0;
        for tick in 100..300_i64 {
            last_host = host_utime(tick, 989.0) + jump;
            sync.update(last_host, Phase::new((tick % 4) as u8));
        }

        assert_eq!(sync.resync_count(), 1);
        let estimate = sync.estimate_device_time(Phase::new((299 % 4) as u8));
        assert!(
            (estimate - last_host).abs() <= 5,
            "estimate {estimate} vs host {last_host}"
        );
    }

    #[test]
    fn gap_after_lost_sync_keeps_timestamps_aligned() {
        let mut sync = PhaseTimeSync::new(&TimeSyncConfig::default());
        for tick in 0..2000_i64 {
            sync.update(host_utime(tick, 989.0), Phase::new((tick % 4) as u8));
        }

        // eleven frames go missing while the stream reacquires
        sync.sync_lost();
        for tick in 2011..2200_i64 {
            let host = host_utime(tick, 989.0);
            let phase = Phase::new((tick % 4) as u8);
            sync.update(host, phase);
            let estimate = sync.estimate_device_time(phase);
            assert!(
                (estimate - host).abs() <= 5,
                "tick {tick}: estimate {estimate} vs host {host}"
            );
        }
        assert_eq!(sync.resync_count(), 0);
    }
}
