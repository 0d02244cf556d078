//! Test and helper mocks for feeder_core.
//!
//! Handles are `Clone` and share state, so a test can keep one copy to steer
//! or inspect the device while the other is owned by the component under test.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use feeder_traits::{BoxError, Direction, Motor, RangeSensor, Scale};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

#[derive(Debug, Default)]
struct ScaleScript {
    queue: VecDeque<Option<i32>>,
    fallback: Option<i32>,
    reads: u64,
}

/// Scale that replays queued readings (`None` = failed read), then keeps
/// returning the fallback value.
#[derive(Debug, Clone, Default)]
pub struct ScriptedScale {
    inner: Arc<Mutex<ScaleScript>>,
}

impl ScriptedScale {
    pub fn constant(raw: i32) -> Self {
        let s = Self::default();
        s.set(raw);
        s
    }

    pub fn failing() -> Self {
        Self::default()
    }

    /// Change the steady-state reading.
    pub fn set(&self, raw: i32) {
        lock(&self.inner).fallback = Some(raw);
    }

    /// Make every read fail once the queue drains.
    pub fn fail(&self) {
        lock(&self.inner).fallback = None;
    }

    pub fn push<I: IntoIterator<Item = Option<i32>>>(&self, readings: I) {
        lock(&self.inner).queue.extend(readings);
    }

    pub fn reads(&self) -> u64 {
        lock(&self.inner).reads
    }
}

impl Scale for ScriptedScale {
    fn read(&mut self, _timeout: Duration) -> Result<i32, BoxError> {
        let mut s = lock(&self.inner);
        s.reads += 1;
        let next = match s.queue.pop_front() {
            Some(r) => r,
            None => s.fallback,
        };
        next.ok_or_else(|| "scripted read timeout".into())
    }
}

#[derive(Debug, Default)]
struct MotorLog {
    enabled: bool,
    direction: Option<Direction>,
    high: bool,
    forward: u64,
    backward: u64,
    disables: u64,
    fail_after: Option<u64>,
}

/// Motor that counts rising step edges per direction.
#[derive(Debug, Clone, Default)]
pub struct RecordingMotor {
    inner: Arc<Mutex<MotorLog>>,
}

impl RecordingMotor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every step pulse after `n` successful rising edges.
    pub fn fail_after(&self, n: u64) {
        lock(&self.inner).fail_after = Some(n);
    }

    pub fn forward_steps(&self) -> u64 {
        lock(&self.inner).forward
    }

    pub fn backward_steps(&self) -> u64 {
        lock(&self.inner).backward
    }

    pub fn enabled(&self) -> bool {
        lock(&self.inner).enabled
    }

    /// Number of `set_enabled(false)` calls seen.
    pub fn disables(&self) -> u64 {
        lock(&self.inner).disables
    }
}

impl Motor for RecordingMotor {
    fn set_enabled(&mut self, enabled: bool) -> Result<(), BoxError> {
        let mut m = lock(&self.inner);
        m.enabled = enabled;
        if !enabled {
            m.disables += 1;
        }
        Ok(())
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), BoxError> {
        lock(&self.inner).direction = Some(direction);
        Ok(())
    }

    fn set_step(&mut self, high: bool) -> Result<(), BoxError> {
        let mut m = lock(&self.inner);
        let rising = high && !m.high;
        if rising && m.fail_after.is_some_and(|limit| m.forward + m.backward >= limit) {
            return Err(Box::new(std::io::Error::other("driver fault")));
        }
        m.high = high;
        if rising {
            match m.direction {
                Some(Direction::Forward) => m.forward += 1,
                Some(Direction::Backward) => m.backward += 1,
                None => {}
            }
        }
        Ok(())
    }
}

/// Range sensor replaying queued readings (`None` = failed read), then the
/// fallback.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRange {
    inner: Arc<Mutex<(VecDeque<Option<u16>>, Option<u16>, u64)>>,
}

impl ScriptedRange {
    pub fn constant(mm: u16) -> Self {
        let r = Self::default();
        lock(&r.inner).1 = Some(mm);
        r
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn push<I: IntoIterator<Item = Option<u16>>>(&self, readings: I) {
        lock(&self.inner).0.extend(readings);
    }

    pub fn reads(&self) -> u64 {
        lock(&self.inner).2
    }
}

impl RangeSensor for ScriptedRange {
    fn read_mm(&mut self) -> Result<u16, BoxError> {
        let mut s = lock(&self.inner);
        s.2 += 1;
        let next = match s.0.pop_front() {
            Some(r) => r,
            None => s.1,
        };
        next.ok_or_else(|| "range read failed".into())
    }
}
