//! Gyro 指标收集模块
//!
//! 记录帧锁定、解码、发布与时间同步的运行指标。

use contracts::GyroRecord;
use metrics::{counter, gauge, histogram};

/// 记录帧锁定成功
pub fn record_lock_acquired() {
    counter!("gyro_sync_locks_total").increment(1);
    gauge!("gyro_sync_locked").set(1.0);
}

/// 记录相位失配导致的失锁
pub fn record_sync_lost() {
    counter!("gyro_sync_lost_total").increment(1);
    gauge!("gyro_sync_locked").set(0.0);
}

/// 记录帧解码
pub fn record_frame_decoded(valid: bool) {
    counter!("gyro_sync_frames_total").increment(1);
    if !valid {
        counter!("gyro_sync_invalid_samples_total").increment(1);
    }
}

/// 记录一条已发布的 GyroRecord
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_record_published;
///
/// sink.publish(&record)?;
/// record_record_published(&record);
/// ```
pub fn record_record_published(record: &GyroRecord) {
    counter!("gyro_sync_records_published_total").increment(1);
    gauge!("gyro_sync_last_utime").set(record.utime as f64);
    gauge!("gyro_sync_rate_rads").set(record.rads);
    histogram!("gyro_sync_rate_rads_hist").record(record.rads.abs());
}

/// 记录发布失败
pub fn record_publish_failure(sink_name: &str) {
    counter!(
        "gyro_sync_publish_failures_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);
}

/// 记录时间同步重置
pub fn record_timesync_resync() {
    counter!("gyro_sync_timesync_resyncs_total").increment(1);
}

/// 记录 GyroRecord 分发
pub fn record_record_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "gyro_sync_records_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Gyro 指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct GyroMetricsAggregator {
    /// 总记录数
    pub total_records: u64,

    /// 总采样数
    pub total_samples: u64,

    /// 时间戳倒退次数
    pub non_monotonic: u64,

    /// 角速率统计 (rad/s)
    pub rate_stats: RunningStats,

    /// 相邻记录间隔统计 (毫秒)
    pub interval_stats: RunningStats,

    /// 窗口内采样极差统计 (LSB)
    pub spread_stats: RunningStats,

    last_utime: Option<i64>,
}

impl GyroMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, record: &GyroRecord) {
        self.total_records += 1;
        self.total_samples += record.samples.len() as u64;
        self.rate_stats.push(record.rads);

        if let Some(last) = self.last_utime {
            let interval_us = record.utime - last;
            if interval_us <= 0 {
                self.non_monotonic += 1;
            }
            self.interval_stats.push(interval_us as f64 / 1000.0);
        }
        self.last_utime = Some(record.utime);

        if let (Some(min), Some(max)) = (record.samples.iter().min(), record.samples.iter().max()) {
            self.spread_stats.push(f64::from(max - min));
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let has_intervals = self.interval_stats.count() > 0 && self.interval_stats.mean() > 0.0;
        let record_rate_hz = if has_intervals {
            1000.0 / self.interval_stats.mean()
        } else {
            0.0
        };
        MetricsSummary {
            total_records: self.total_records,
            total_samples: self.total_samples,
            non_monotonic: self.non_monotonic,
            record_rate_hz,
            rate_rads: StatsSummary::from(&self.rate_stats),
            interval_ms: StatsSummary::from(&self.interval_stats),
            sample_spread: StatsSummary::from(&self.spread_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_records: u64,
    pub total_samples: u64,
    pub non_monotonic: u64,
    pub record_rate_hz: f64,
    pub rate_rads: StatsSummary,
    pub interval_ms: StatsSummary,
    pub sample_spread: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Gyro Metrics Summary ===")?;
        writeln!(f, "Total records: {}", self.total_records)?;
        writeln!(f, "Total samples: {}", self.total_samples)?;
        writeln!(f, "Record rate: {:.2} Hz", self.record_rate_hz)?;
        writeln!(f, "Non-monotonic timestamps: {}", self.non_monotonic)?;
        writeln!(f, "Rate (rad/s): {}", self.rate_rads)?;
        writeln!(f, "Record interval (ms): {}", self.interval_ms)?;
        writeln!(f, "Sample spread (LSB): {}", self.sample_spread)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.6}, max={:.6}, mean={:.6}, std={:.6} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
