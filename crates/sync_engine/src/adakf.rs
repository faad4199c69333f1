//! Adaptive Kalman Filter (AdaKF) for host/device clock offset estimation.
//!
//! Implements a lightweight 2-state (offset + drift) Kalman filter with
//! EWMA-based measurement noise tuning.

use std::collections::VecDeque;

use crate::AdaKFConfig;

const MIN_DT: f64 = 1e-6;
const DEFAULT_ALPHA: f64 = 0.85;

/// Adaptive Kalman Filter for the host/device time offset
///
/// State vector x = [offset, drift]^T where:
/// - `offset` is host time minus device time (seconds)
/// - `drift` is the rate of change of the offset (seconds per second)
///
/// Transition matrix F = [[1, Δt], [0, 1]]
/// Observation matrix H = [1, 0]
#[derive(Debug, Clone)]
pub struct AdaKF {
    /// Current state estimate (offset, drift)
    state: [f64; 2],
    /// State covariance matrix
    covariance: [[f64; 2]; 2],
    base_q_offset: f64,
    base_q_drift: f64,
    /// Measurement noise baseline
    base_r: f64,
    /// Current measurement noise
    r: f64,
    /// EWMA of residual variance (for R adaptation)
    ewma_variance: f64,
    /// Residual history for diagnostics
    residual_window: VecDeque<f64>,
    window_size: usize,
    alpha: f64,
    /// Fallback interval when an update carries no elapsed time
    expected_interval: f64,
}

impl AdaKF {
    /// Create a new estimator seeded at `initial_offset`
    pub fn new(config: &AdaKFConfig, initial_offset: f64) -> Self {
        let window_size = config.residual_window.max(3);
        let base_q_offset = config.process_noise.max(1e-15);
        let base_q_drift = (config.process_noise * 0.1).max(1e-15);
        let base_r = config.measurement_noise.max(1e-12);
        let expected_interval = config.expected_interval.unwrap_or(1e-3).max(MIN_DT);

        Self {
            state: [initial_offset, 0.0],
            covariance: [[base_r, 0.0], [0.0, 1e-6]],
            base_q_offset,
            base_q_drift,
            base_r,
            r: base_r,
            ewma_variance: base_r,
            residual_window: VecDeque::with_capacity(window_size),
            window_size,
            alpha: DEFAULT_ALPHA,
            expected_interval,
        }
    }

    /// Offset predicted `dt` seconds after the last update
    pub fn predict_offset(&self, dt: f64) -> f64 {
        self.state[0] + dt * self.state[1]
    }

    /// Update the filter with a new observation.
    ///
    /// * `observation` - observed `t_host - t_device` (seconds)
    /// * `dt` - elapsed device time since last update (seconds)
    ///
    /// Returns the new offset estimate and the innovation residual.
    pub fn update(&mut self, observation: f64, dt: f64) -> (f64, f64) {
        let dt = if dt.is_finite() && dt > 0.0 {
            dt
        } else {
            self.expected_interval
        }
        .max(MIN_DT);

        // ===== Predict step =====
        let offset_pred = self.predict_offset(dt);
        let drift_pred = self.state[1];

        let p00 = self.covariance[0][0];
        let p01 = self.covariance[0][1];
        let p11 = self.covariance[1][1];

        let pred00 = p00 + 2.0 * dt * p01 + dt * dt * p11 + self.base_q_offset * dt;
        let pred01 = p01 + dt * p11;
        let pred11 = p11 + self.base_q_drift * dt;

        // ===== Update step =====
        let residual = observation - offset_pred;
        let s = pred00 + self.r;
        let k0 = pred00 / s;
        let k1 = pred01 / s;

        let new_offset = offset_pred + k0 * residual;
        let new_drift = drift_pred + k1 * residual;

        let new_p00 = (1.0 - k0) * pred00;
        let new_p01 = (1.0 - k0) * pred01;
        let new_p11 = pred11 - k1 * pred01;

        self.state = [new_offset, new_drift];
        self.covariance = [[new_p00.max(0.0), new_p01], [new_p01, new_p11.max(0.0)]];

        self.record_residual(residual);
        self.update_measurement_noise(residual);

        (self.state[0], residual)
    }

    /// Current offset estimate
    pub fn offset(&self) -> f64 {
        self.state[0]
    }

    /// Current drift estimate (seconds per second)
    pub fn drift(&self) -> f64 {
        self.state[1]
    }

    /// Current uncertainty of offset component
    pub fn uncertainty(&self) -> f64 {
        self.covariance[0][0]
    }

    fn record_residual(&mut self, residual: f64) {
        self.residual_window.push_back(residual);
        if self.residual_window.len() > self.window_size {
            self.residual_window.pop_front();
        }
    }

    fn update_measurement_noise(&mut self, residual: f64) {
        self.ewma_variance =
            self.alpha * self.ewma_variance + (1.0 - self.alpha) * residual.powi(2);
        let r_min = self.base_r * 0.1;
        let r_max = self.base_r * 10.0;
        self.r = self.ewma_variance.clamp(r_min, r_max);
    }

    /// Mean absolute residual over the diagnostic window
    pub fn mean_abs_residual(&self) -> f64 {
        if self.residual_window.is_empty() {
            return 0.0;
        }
        self.residual_window.iter().map(|r| r.abs()).sum::<f64>()
            / self.residual_window.len() as f64
    }
}
