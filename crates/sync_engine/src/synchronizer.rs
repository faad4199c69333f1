//! Frame synchronizer
//!
//! Recovers 6-byte frame alignment from an undelimited byte stream. The only
//! alignment cue is the 2-bit phase in the first byte of each frame, which
//! counts up by one per frame. During acquisition every byte position keeps
//! a run-length of "phase advanced by one since six bytes ago"; the first
//! position to reach `lock_threshold` is declared the frame start.
//!
//! A random stream locks falsely with probability about 4^-threshold per
//! position, and a false lock is dropped on the next mismatched frame.

use contracts::{FrameSyncConfig, Phase, RawFrame, SyncState, FRAME_LEN};
use tracing::{debug, info, warn};

/// Outcome of pushing one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// Byte consumed, nothing to report
    Pending,
    /// Frame alignment acquired on this byte
    Locked,
    /// Phase mismatch at a frame start; the partial frame was discarded
    LostSync,
    /// A complete frame is ready for decoding
    Frame(RawFrame),
}

/// 4-state phase-lock machine
#[derive(Debug, Clone)]
pub struct FrameSynchronizer {
    state: SyncState,
    /// Cyclic byte position (0..6)
    cursor: usize,
    frame: [u8; FRAME_LEN],
    counts: [u32; FRAME_LEN],
    last_phase: [Phase; FRAME_LEN],
    last_sync: Phase,
    lock_threshold: u32,
    verbose: bool,
    locks: u64,
    lost: u64,
}

impl FrameSynchronizer {
    pub fn new(config: &FrameSyncConfig) -> Self {
        Self {
            state: SyncState::Startup,
            cursor: 0,
            frame: [0; FRAME_LEN],
            counts: [0; FRAME_LEN],
            last_phase: [Phase::default(); FRAME_LEN],
            last_sync: Phase::default(),
            lock_threshold: config.lock_threshold.max(1),
            verbose: config.verbose,
            locks: 0,
            lost: 0,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state == SyncState::Locked
    }

    /// Per-position lock statistics (meaningful during acquisition)
    pub fn counts(&self) -> &[u32; FRAME_LEN] {
        &self.counts
    }

    /// Number of times lock was acquired
    pub fn lock_count(&self) -> u64 {
        self.locks
    }

    /// Number of times lock was lost
    pub fn lost_count(&self) -> u64 {
        self.lost
    }

    /// Feed one byte
    pub fn push(&mut self, byte: u8) -> SyncEvent {
        let phase = Phase::of_byte(byte);
        match self.state {
            SyncState::Startup => {
                self.counts = [0; FRAME_LEN];
                self.cursor = 0;
                self.state = SyncState::Acquire1;
                SyncEvent::Pending
            }
            SyncState::Acquire1 => {
                self.last_phase[self.cursor] = phase;
                self.cursor += 1;
                if self.cursor == FRAME_LEN {
                    self.cursor = 0;
                    self.state = SyncState::Acquire2;
                }
                SyncEvent::Pending
            }
            SyncState::Acquire2 => self.acquire(byte, phase),
            SyncState::Locked => self.track(byte, phase),
        }
    }

    fn acquire(&mut self, byte: u8, phase: Phase) -> SyncEvent {
        let i = self.cursor;
        if phase == self.last_phase[i].next() {
            self.counts[i] += 1;
            if self.counts[i] >= self.lock_threshold {
                self.state = SyncState::Locked;
                self.frame[0] = byte;
                self.cursor = 1;
                self.last_sync = phase;
                self.locks += 1;
                info!(position = i, phase = %phase, "frame lock acquired");
                return SyncEvent::Locked;
            }
        } else {
            self.counts[i] = 0;
        }

        self.last_phase[i] = phase;
        self.cursor = (i + 1) % FRAME_LEN;
        if self.verbose && self.cursor == 0 {
            debug!(counts = ?self.counts, "acquiring frame lock");
        }
        SyncEvent::Pending
    }

    fn track(&mut self, byte: u8, phase: Phase) -> SyncEvent {
        let i = self.cursor;
        self.frame[i] = byte;

        if i == 0 {
            let expected = self.last_sync.next();
            if phase != expected {
                self.state = SyncState::Startup;
                self.lost += 1;
                warn!(
                    expected = %expected,
                    observed = %phase,
                    lost_count = self.lost,
                    "lost sync, resynchronizing"
                );
                return SyncEvent::LostSync;
            }
            self.last_sync = phase;
        }

        self.cursor = (i + 1) % FRAME_LEN;
        if i == FRAME_LEN - 1 {
            SyncEvent::Frame(RawFrame::new(self.frame))
        } else {
            SyncEvent::Pending
        }
    }
}
