//! Interpolation tasks
//!
//! A task blends one scalar from `init_value` to `end_value` over `duration`
//! seconds. It is a plain record: the scheduler supplies the delta time and
//! decides when the task runs.
//!
//! # Termination
//!
//! Progress `t = elapsed / duration` is deliberately not clamped. A task ends
//! only when `|value - end_value| <= threshold`:
//!
//! - **Epsilon mode** (`threshold > 0`, default `0.005`): converges as soon as
//!   the value enters the band around the target.
//! - **Exact mode** (`threshold == 0`): converges only on floating-point
//!   equality. With a duration that isn't a whole number of ticks this never
//!   happens and the task overshoots forever. Use `max_ticks` or cancel it.
//!
//! The same holds in epsilon mode when a single step is wider than the band.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::config::{validate_duration, validate_threshold, SchedulerConfig};
use crate::error::Result;
use crate::owner::{Owner, OwnerId, OwnerLink};

/// Progress callback, invoked with the new value once per tick
pub type UpdateCallback = Box<dyn FnMut(f64)>;

/// Lifecycle state of an interpolation task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskState {
    Active,
    Completed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskState::Active)
    }
}

/// Linear interpolation, `t` unclamped
#[inline]
pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// State of one in-flight interpolation
pub struct InterpolationTask {
    init_value: f64,
    end_value: f64,
    duration: f64,
    elapsed: f64,
    threshold: f64,
    current: f64,
    ticks: u32,
    max_ticks: Option<u32>,
    status: Rc<Cell<TaskState>>,
    callback: Option<UpdateCallback>,
    owner: Option<OwnerLink>,
}

impl InterpolationTask {
    /// Create an active task
    ///
    /// Fails if `duration` is not a finite positive number or `threshold` is
    /// negative or NaN.
    pub fn new(init_value: f64, end_value: f64, duration: f64, threshold: f64) -> Result<Self> {
        validate_duration(duration)?;
        validate_threshold(threshold)?;

        Ok(Self {
            init_value,
            end_value,
            duration,
            elapsed: 0.0,
            threshold,
            // Seeded with the start value, never 0
            current: init_value,
            ticks: 0,
            max_ticks: None,
            status: Rc::new(Cell::new(TaskState::Active)),
            callback: None,
            owner: None,
        })
    }

    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: FnMut(f64) + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn with_max_ticks(mut self, max_ticks: u32) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    pub fn with_owner(mut self, owner: &Owner) -> Self {
        self.owner = Some(owner.link());
        self
    }

    pub fn init_value(&self) -> f64 {
        self.init_value
    }

    pub fn end_value(&self) -> f64 {
        self.end_value
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Most recently computed value
    pub fn value(&self) -> f64 {
        self.current
    }

    /// `elapsed / duration`; may exceed 1.0
    pub fn progress(&self) -> f64 {
        self.elapsed / self.duration
    }

    /// Number of updates applied so far
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn state(&self) -> TaskState {
        self.status.get()
    }

    pub fn is_active(&self) -> bool {
        self.state() == TaskState::Active
    }

    pub fn owner_id(&self) -> Option<OwnerId> {
        self.owner.as_ref().map(OwnerLink::id)
    }

    /// True once the bound owner has been dropped or invalidated
    pub fn is_orphaned(&self) -> bool {
        self.owner.as_ref().is_some_and(|owner| !owner.is_alive())
    }

    /// Whether `value` is close enough to the target to finish
    pub fn is_converged(&self, value: f64) -> bool {
        (value - self.end_value).abs() <= self.threshold
    }

    /// Advance, dispatch, then settle
    ///
    /// The callback sees the new value before the completion test, so the
    /// converged value is always reported. Does nothing once terminal.
    pub fn update(&mut self, dt: f64) {
        if !self.is_active() {
            return;
        }
        let value = self.advance(dt);
        if let Some(callback) = self.callback.as_mut() {
            callback(value);
        }
        self.settle();
    }

    /// Mark the task cancelled. No-op once terminal.
    pub fn cancel(&mut self) -> bool {
        if self.is_active() {
            self.status.set(TaskState::Cancelled);
            true
        } else {
            false
        }
    }

    /// Accumulate `dt` and recompute the value
    pub(crate) fn advance(&mut self, dt: f64) -> f64 {
        self.elapsed += dt;
        self.ticks = self.ticks.saturating_add(1);
        self.current = lerp(self.init_value, self.end_value, self.progress());
        self.current
    }

    /// Apply the completion test and tick limit
    pub(crate) fn settle(&mut self) {
        if !self.is_active() {
            return;
        }
        if self.is_converged(self.current) {
            self.status.set(TaskState::Completed);
        } else if self.max_ticks.is_some_and(|max| self.ticks >= max) {
            tracing::warn!(
                "Interpolation {} -> {} did not converge within {} ticks (value {}), cancelling",
                self.init_value,
                self.end_value,
                self.ticks,
                self.current
            );
            self.status.set(TaskState::Cancelled);
        }
    }

    pub(crate) fn take_callback(&mut self) -> Option<UpdateCallback> {
        self.callback.take()
    }

    pub(crate) fn restore_callback(&mut self, callback: UpdateCallback) {
        self.callback = Some(callback);
    }

    pub(crate) fn status(&self) -> Rc<Cell<TaskState>> {
        Rc::clone(&self.status)
    }
}

impl fmt::Debug for InterpolationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterpolationTask")
            .field("init_value", &self.init_value)
            .field("end_value", &self.end_value)
            .field("duration", &self.duration)
            .field("elapsed", &self.elapsed)
            .field("threshold", &self.threshold)
            .field("current", &self.current)
            .field("ticks", &self.ticks)
            .field("state", &self.state())
            .field("has_callback", &self.callback.is_some())
            .field("owner", &self.owner_id())
            .finish()
    }
}

/// Builder for a task started through `TaskScheduler::start_with`
///
/// Anything left unset falls back to the scheduler's [`SchedulerConfig`].
///
/// ```ignore
/// let handle = scheduler.start_with(
///     LerpRequest::new(1.0, 0.0, 0.25)
///         .owner(&dialog)
///         .on_update(move |alpha| opacity.set(alpha)),
/// )?;
/// ```
pub struct LerpRequest {
    init_value: f64,
    end_value: f64,
    duration: f64,
    threshold: Option<f64>,
    max_ticks: Option<u32>,
    owner: Option<OwnerLink>,
    callback: Option<UpdateCallback>,
}

impl LerpRequest {
    pub fn new(init_value: f64, end_value: f64, duration: f64) -> Self {
        Self {
            init_value,
            end_value,
            duration,
            threshold: None,
            max_ticks: None,
            owner: None,
            callback: None,
        }
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Finish only on exact equality with the target
    pub fn exact(self) -> Self {
        self.threshold(0.0)
    }

    pub fn max_ticks(mut self, max_ticks: u32) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    pub fn owner(mut self, owner: &Owner) -> Self {
        self.owner = Some(owner.link());
        self
    }

    pub fn on_update<F>(mut self, callback: F) -> Self
    where
        F: FnMut(f64) + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    pub(crate) fn build(self, config: &SchedulerConfig) -> Result<InterpolationTask> {
        let threshold = self.threshold.unwrap_or(config.default_threshold);
        let mut task =
            InterpolationTask::new(self.init_value, self.end_value, self.duration, threshold)?;
        task.max_ticks = self.max_ticks.or(config.max_ticks);
        task.owner = self.owner;
        task.callback = self.callback;
        Ok(task)
    }
}
