//! Mock 陀螺仪数据源
//!
//! 用于无硬件环境的测试，按配置生成 6 字节帧流。

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{BufMut, Bytes, BytesMut};
use contracts::{ByteSource, ContractError, MockSourceConfig, Phase, RawFrame, FRAME_LEN};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::error::{IngestionError, Result};
use crate::metrics::IngestionMetrics;

const RATE_MIN: i32 = -(1 << 21);
const RATE_MAX: i32 = (1 << 21) - 1;

/// Mock 陀螺仪源
///
/// 生成带可控噪声、无效帧和相位破坏的字节流。
pub struct MockGyroSource {
    config: MockSourceConfig,
    rng: StdRng,
    frame: [u8; FRAME_LEN],
    pos: usize,
    generated: u64,
    started: Option<Instant>,
    metrics: Arc<IngestionMetrics>,
}

impl MockGyroSource {
    /// 创建新的 Mock 源
    pub fn new(config: MockSourceConfig, metrics: Arc<IngestionMetrics>) -> Result<Self> {
        if config.start_offset >= FRAME_LEN {
            return Err(IngestionError::InvalidMock {
                message: format!("start_offset {} must be below {FRAME_LEN}", config.start_offset),
            });
        }
        if let Some(rate) = config.rate_hz {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(IngestionError::InvalidMock {
                    message: format!("rate_hz must be positive, got {rate}"),
                });
            }
        }

        debug!(
            frames = ?config.frames,
            start_offset = config.start_offset,
            rate_hz = ?config.rate_hz,
            seed = config.seed,
            "mock gyro source created"
        );

        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            // 首帧从 start_offset 处开始输出
            pos: FRAME_LEN,
            frame: [0; FRAME_LEN],
            generated: 0,
            started: None,
            metrics,
            config,
        })
    }

    /// 已生成的帧数
    pub fn frames_generated(&self) -> u64 {
        self.generated
    }

    fn next_frame(&mut self) -> std::result::Result<(), ContractError> {
        if self.config.frames.is_some_and(|limit| self.generated >= limit) {
            return Err(ContractError::stream_closed("mock"));
        }
        self.pace();

        let k = self.generated;
        let seq = k + 1;
        let mut phase =
            Phase::new(((u64::from(self.config.start_phase) + k) % u64::from(Phase::CYCLE)) as u8);
        if self.config.corrupt_every.is_some_and(|n| n > 0 && seq % n == 0) {
            phase = phase.next().next();
            trace!(frame = k, "phase corrupted");
        }
        let valid = !self.config.invalid_every.is_some_and(|n| n > 0 && seq % n == 0);

        let noise = self.config.noise.abs();
        let jitter = if noise > 0 {
            self.rng.random_range(-noise..=noise)
        } else {
            0
        };
        let rate = self
            .config
            .base_rate
            .saturating_add(jitter)
            .clamp(RATE_MIN, RATE_MAX);

        self.frame = *RawFrame::encode(valid, rate, phase).as_bytes();
        self.pos = if k == 0 { self.config.start_offset } else { 0 };
        self.generated += 1;
        self.metrics.record_frame_generated();
        Ok(())
    }

    fn pace(&mut self) {
        let Some(rate_hz) = self.config.rate_hz else {
            return;
        };
        let started = *self.started.get_or_insert_with(Instant::now);
        let due = started + Duration::from_secs_f64(self.generated as f64 / rate_hz);
        let now = Instant::now();
        if due > now {
            std::thread::sleep(due - now);
        }
    }
}

impl ByteSource for MockGyroSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn next_byte(&mut self) -> std::result::Result<u8, ContractError> {
        if self.pos == FRAME_LEN {
            self.next_frame()?;
        }
        let byte = self.frame[self.pos];
        self.pos += 1;
        self.metrics.record_byte();
        Ok(byte)
    }
}

/// 确定性帧流构造器
///
/// ```ignore
/// let capture = FrameStreamBuilder::new()
///     .offset(2)
///     .frames((0..100).map(|k| (true, k as i32)))
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct FrameStreamBuilder {
    buf: BytesMut,
    phase: Phase,
    offset: usize,
}

impl FrameStreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置下一帧的相位
    pub fn start_phase(mut self, phase: u8) -> Self {
        self.phase = Phase::new(phase);
        self
    }

    /// 丢弃流开头的字节数
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// 追加一帧，相位自动递增
    pub fn frame(mut self, valid: bool, rate: i32) -> Self {
        let phase = self.phase;
        self.phase = phase.next();
        self.push(valid, rate, phase)
    }

    /// 追加多帧
    pub fn frames(self, frames: impl IntoIterator<Item = (bool, i32)>) -> Self {
        frames
            .into_iter()
            .fold(self, |builder, (valid, rate)| builder.frame(valid, rate))
    }

    /// 追加一帧相位错误的帧，相位序列照常推进
    pub fn corrupt_frame(self, rate: i32) -> Self {
        let phase = self.phase.next().next();
        let mut builder = self.push(true, rate, phase);
        builder.phase = builder.phase.next();
        builder
    }

    /// 追加原始字节
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.put_slice(bytes);
        self
    }

    pub fn build(self) -> Bytes {
        let mut bytes = self.buf.freeze();
        let skip = self.offset.min(bytes.len());
        bytes.split_off(skip)
    }

    fn push(mut self, valid: bool, rate: i32, phase: Phase) -> Self {
        self.buf.put_slice(RawFrame::encode(valid, rate, phase).as_bytes());
        self
    }
}
