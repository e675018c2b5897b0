//! Interpolation scheduler
//!
//! Owns every live interpolation task and advances them once per host frame.
//! The host calls [`TaskScheduler::tick`] with the frame delta; tasks are
//! updated in creation order, their callbacks fire with the new value, and
//! tasks that converged or were cancelled leave the live set on that same
//! tick.
//!
//! Callbacks run without any scheduler borrow held, so they may start new
//! tasks, cancel tasks (including their own) or invalidate owners. Tasks
//! started from a callback are first advanced on the following tick.
//!
//! Ticking is not re-entrant: a `tick` issued from inside a callback is
//! ignored (and logged), since it would advance tasks whose callbacks are
//! checked out and could retire them without reporting their final value.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashSet;
use slotmap::{new_key_type, SlotMap};

use crate::clock::FrameClock;
use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError};
use crate::owner::OwnerId;
use crate::task::{InterpolationTask, LerpRequest, TaskState, UpdateCallback};

new_key_type! {
    /// Handle to a registered interpolation task
    pub struct TaskId;
}

impl TaskId {
    /// Convert to raw u64 (for logging or host-side bookkeeping)
    pub fn to_raw(self) -> u64 {
        self.0.as_ffi()
    }
}

/// Internal state of the scheduler
struct SchedulerInner {
    tasks: SlotMap<TaskId, InterpolationTask>,
    /// Creation order, used for dispatch
    order: Vec<TaskId>,
    config: SchedulerConfig,
    /// Owners reported invalid; their tasks never run again
    invalidated: FxHashSet<OwnerId>,
    /// Set while a tick is dispatching callbacks
    ticking: bool,
}

/// Result of the first half of a task update
enum Advance {
    Missing,
    Orphaned,
    Updated(f64, Option<UpdateCallback>),
}

impl SchedulerInner {
    fn new(config: SchedulerConfig) -> Self {
        Self {
            tasks: SlotMap::with_key(),
            order: Vec::new(),
            config,
            invalidated: FxHashSet::default(),
            ticking: false,
        }
    }

    fn is_revoked(&self, owner: Option<OwnerId>) -> bool {
        owner.is_some_and(|owner| self.invalidated.contains(&owner))
    }

    fn insert(&mut self, task: InterpolationTask) -> TaskId {
        let id = self.tasks.insert(task);
        self.order.push(id);
        id
    }

    /// Remove a task from the live set, cancelling it if still active
    fn retire(&mut self, id: TaskId) -> Option<InterpolationTask> {
        let mut task = self.tasks.remove(id)?;
        self.order.retain(|live| *live != id);
        task.cancel();
        tracing::debug!(
            "Retired task {:#x} after {} ticks: {:?} at {}",
            id.to_raw(),
            task.ticks(),
            task.state(),
            task.value()
        );
        Some(task)
    }

    fn advance(&mut self, id: TaskId, dt: f64) -> Advance {
        let Some(task) = self.tasks.get_mut(id) else {
            return Advance::Missing;
        };
        if task.is_orphaned()
            || task
                .owner_id()
                .is_some_and(|owner| self.invalidated.contains(&owner))
        {
            return Advance::Orphaned;
        }
        let value = task.advance(dt);
        Advance::Updated(value, task.take_callback())
    }

    fn owned_by(&self, owner: OwnerId) -> Vec<TaskId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.tasks.get(*id).and_then(|t| t.owner_id()) == Some(owner))
            .collect()
    }
}

impl Drop for SchedulerInner {
    fn drop(&mut self) {
        // Handles outlive the scheduler; make sure none still read Active
        for (_, task) in self.tasks.iter_mut() {
            task.cancel();
        }
    }
}

// ============================================================================
// Shared operations (used by both the scheduler and its weak handles)
// ============================================================================

fn start_task(inner: &Rc<RefCell<SchedulerInner>>, request: LerpRequest) -> Result<TaskHandle> {
    let mut guard = inner.borrow_mut();
    let mut task = request.build(&guard.config)?;
    let status = task.status();

    if task.is_orphaned() || guard.is_revoked(task.owner_id()) {
        // Owner already gone: hand back a handle that is cancelled from the start
        task.cancel();
        tracing::debug!(
            "Not starting interpolation {} -> {}: owner is no longer valid",
            task.init_value(),
            task.end_value()
        );
        drop(guard);
        return Ok(TaskHandle {
            id: TaskId::default(),
            status,
            scheduler: Rc::downgrade(inner),
        });
    }

    tracing::debug!(
        "Starting interpolation {} -> {} over {}s (threshold {})",
        task.init_value(),
        task.end_value(),
        task.duration(),
        task.threshold()
    );

    let id = guard.insert(task);
    Ok(TaskHandle {
        id,
        status,
        scheduler: Rc::downgrade(inner),
    })
}

fn cancel_task(inner: &RefCell<SchedulerInner>, id: TaskId) -> bool {
    let retired = inner.borrow_mut().retire(id);
    retired.is_some()
}

fn invalidate_owner(inner: &RefCell<SchedulerInner>, owner: OwnerId) -> usize {
    let retired: Vec<InterpolationTask> = {
        let mut guard = inner.borrow_mut();
        guard.invalidated.insert(owner);
        let ids = guard.owned_by(owner);
        ids.into_iter().filter_map(|id| guard.retire(id)).collect()
    };
    if !retired.is_empty() {
        tracing::debug!(
            "Owner {} invalidated, cancelled {} task(s)",
            owner.to_raw(),
            retired.len()
        );
    }
    retired.len()
}

/// Negative or non-finite deltas would break the monotonic clock
fn sanitize_delta(dt: f64) -> f64 {
    if dt.is_finite() && dt >= 0.0 {
        dt
    } else {
        tracing::warn!("Ignoring invalid frame delta {}, using 0", dt);
        0.0
    }
}

/// Clears the ticking flag even if a callback panics
struct TickGuard<'a>(&'a RefCell<SchedulerInner>);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.borrow_mut().ticking = false;
    }
}

fn tick_tasks(inner: &RefCell<SchedulerInner>, dt: f64) -> bool {
    let order = {
        let mut guard = inner.borrow_mut();
        if guard.ticking {
            tracing::warn!("Ignoring tick issued from inside a task callback");
            return !guard.tasks.is_empty();
        }
        guard.ticking = true;
        guard.order.clone()
    };
    let _ticking = TickGuard(inner);
    let dt = sanitize_delta(dt);

    // Dropped after all borrows are released
    let mut retired: Vec<InterpolationTask> = Vec::new();
    let mut stale_callbacks: Vec<UpdateCallback> = Vec::new();

    tracing::trace!("Ticking {} task(s) with dt={}", order.len(), dt);

    for id in order {
        let step = inner.borrow_mut().advance(id, dt);
        match step {
            Advance::Missing => {}
            Advance::Orphaned => retired.extend(inner.borrow_mut().retire(id)),
            Advance::Updated(value, mut callback) => {
                if let Some(callback) = callback.as_mut() {
                    callback(value);
                }

                let mut guard = inner.borrow_mut();
                let state = &mut *guard;
                let Some(task) = state.tasks.get_mut(id) else {
                    // Cancelled from inside its own callback
                    stale_callbacks.extend(callback);
                    continue;
                };
                if let Some(callback) = callback {
                    task.restore_callback(callback);
                }

                // Invalidation seen after the callback still wins over completion
                let revoked = task
                    .owner_id()
                    .is_some_and(|owner| state.invalidated.contains(&owner));
                if task.is_orphaned() || revoked {
                    task.cancel();
                } else {
                    task.settle();
                }

                if task.state().is_terminal() {
                    retired.extend(state.retire(id));
                }
            }
        }
    }

    let has_tasks = !inner.borrow().tasks.is_empty();
    drop(retired);
    drop(stale_callbacks);
    has_tasks
}

// ============================================================================
// Task Scheduler
// ============================================================================

/// The scheduler that ticks all live interpolation tasks
///
/// Typically owned by the host loop for the whole session and shared with
/// components through [`SchedulerHandle`].
///
/// # Example
///
/// ```
/// use glide_animation::{FixedClock, TaskScheduler};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let scheduler = TaskScheduler::new();
/// let latest = Rc::new(Cell::new(0.0));
/// let sink = Rc::clone(&latest);
///
/// let handle = scheduler
///     .start(0.0, 10.0, 1.0, move |value| sink.set(value))
///     .unwrap();
///
/// let mut clock = FixedClock::new(0.1);
/// while scheduler.tick_with(&mut clock) {}
///
/// assert!(!handle.is_active());
/// assert!((latest.get() - 10.0).abs() <= 0.005);
/// ```
pub struct TaskScheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner::new(SchedulerConfig::default()))),
        }
    }

    /// Create a scheduler with custom task defaults
    pub fn with_config(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Rc::new(RefCell::new(SchedulerInner::new(config))),
        })
    }

    pub fn config(&self) -> SchedulerConfig {
        self.inner.borrow().config
    }

    /// Get a weak handle to this scheduler for passing to components
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Start interpolating `init_value` to `end_value` over `duration` seconds
    ///
    /// Uses the configured default threshold. Fails fast on a duration that
    /// isn't a finite positive number.
    pub fn start<F>(
        &self,
        init_value: f64,
        end_value: f64,
        duration: f64,
        callback: F,
    ) -> Result<TaskHandle>
    where
        F: FnMut(f64) + 'static,
    {
        self.start_with(LerpRequest::new(init_value, end_value, duration).on_update(callback))
    }

    /// Start a task described by a [`LerpRequest`]
    pub fn start_with(&self, request: LerpRequest) -> Result<TaskHandle> {
        start_task(&self.inner, request)
    }

    /// Cancel a task
    ///
    /// Returns `true` if the task was live. Cancelling a finished task, or a
    /// handle from another scheduler, is a no-op.
    pub fn cancel(&self, handle: &TaskHandle) -> bool {
        if !handle.belongs_to(&self.inner) {
            return false;
        }
        cancel_task(&self.inner, handle.id)
    }

    /// Cancel every task bound to `owner`
    ///
    /// Returns the number of tasks cancelled. None of them receives another
    /// callback.
    pub fn notify_owner_invalid(&self, owner: OwnerId) -> usize {
        invalidate_owner(&self.inner, owner)
    }

    /// Advance all live tasks by `dt` seconds
    ///
    /// Returns true if tasks remain live (need another tick).
    pub fn tick(&self, dt: f64) -> bool {
        tick_tasks(&self.inner, dt)
    }

    /// Advance all live tasks by the clock's next delta
    pub fn tick_with<C: FrameClock + ?Sized>(&self, clock: &mut C) -> bool {
        self.tick(clock.delta())
    }

    /// Number of live tasks
    pub fn task_count(&self) -> usize {
        self.inner.borrow().tasks.len()
    }

    pub fn has_active_tasks(&self) -> bool {
        !self.inner.borrow().tasks.is_empty()
    }

    /// Whether the handle's task is still in the live set
    pub fn contains(&self, handle: &TaskHandle) -> bool {
        handle.belongs_to(&self.inner) && self.inner.borrow().tasks.contains_key(handle.id)
    }

    /// Current value of a live task
    pub fn value(&self, handle: &TaskHandle) -> Option<f64> {
        if !handle.belongs_to(&self.inner) {
            return None;
        }
        self.inner.borrow().tasks.get(handle.id).map(|t| t.value())
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("TaskScheduler")
                .field("tasks", &inner.tasks.len())
                .field("config", &inner.config)
                .finish(),
            Err(_) => f.write_str("TaskScheduler { <ticking> }"),
        }
    }
}

// ============================================================================
// Handles
// ============================================================================

/// A weak handle to the scheduler
///
/// Passed to components that need to start or cancel tasks. It won't keep
/// the scheduler alive; once the scheduler is dropped every operation
/// no-ops and `start` reports [`SchedulerError::SchedulerDropped`].
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Weak<RefCell<SchedulerInner>>,
}

impl SchedulerHandle {
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub fn start<F>(
        &self,
        init_value: f64,
        end_value: f64,
        duration: f64,
        callback: F,
    ) -> Result<TaskHandle>
    where
        F: FnMut(f64) + 'static,
    {
        self.start_with(LerpRequest::new(init_value, end_value, duration).on_update(callback))
    }

    pub fn start_with(&self, request: LerpRequest) -> Result<TaskHandle> {
        let inner = self.inner.upgrade().ok_or(SchedulerError::SchedulerDropped)?;
        start_task(&inner, request)
    }

    pub fn cancel(&self, handle: &TaskHandle) -> bool {
        match self.inner.upgrade() {
            Some(inner) if handle.belongs_to(&inner) => cancel_task(&inner, handle.id),
            _ => false,
        }
    }

    pub fn notify_owner_invalid(&self, owner: OwnerId) -> usize {
        self.inner
            .upgrade()
            .map(|inner| invalidate_owner(&inner, owner))
            .unwrap_or(0)
    }

    pub fn task_count(&self) -> usize {
        self.inner
            .upgrade()
            .map(|inner| inner.borrow().tasks.len())
            .unwrap_or(0)
    }
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Cancellation handle returned when a task starts
///
/// Cheap to clone. The state stays readable after the task has been
/// retired, so callers can tell completion from cancellation.
#[derive(Clone)]
pub struct TaskHandle {
    id: TaskId,
    status: Rc<Cell<TaskState>>,
    scheduler: Weak<RefCell<SchedulerInner>>,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Last state recorded by the scheduler
    pub fn state(&self) -> TaskState {
        self.status.get()
    }

    pub fn is_active(&self) -> bool {
        self.state() == TaskState::Active
    }

    /// Cancel through the owning scheduler. No-op if already terminal.
    pub fn cancel(&self) -> bool {
        match self.scheduler.upgrade() {
            Some(inner) => cancel_task(&inner, self.id),
            None => false,
        }
    }

    fn belongs_to(&self, inner: &Rc<RefCell<SchedulerInner>>) -> bool {
        std::ptr::eq(self.scheduler.as_ptr(), Rc::as_ptr(inner))
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::owner::Owner;

    type Log = Rc<RefCell<Vec<f64>>>;

    fn log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn sink(log: &Log) -> impl FnMut(f64) + 'static {
        let log = Rc::clone(log);
        move |value| log.borrow_mut().push(value)
    }

    #[test]
    fn test_scheduler_tick() {
        let scheduler = TaskScheduler::new();
        let values = log();
        scheduler.start(0.0, 100.0, 1.0, sink(&values)).unwrap();

        assert!(scheduler.tick(0.1));

        let value = values.borrow()[0];
        assert!(value > 0.0);
    }

    #[test]
    fn test_ten_ticks_reach_target() {
        let scheduler = TaskScheduler::new();
        let values = log();
        let handle = scheduler
            .start_with(
                LerpRequest::new(0.0, 10.0, 1.0)
                    .threshold(0.005)
                    .on_update(sink(&values)),
            )
            .unwrap();

        for _ in 0..10 {
            scheduler.tick(0.1);
        }

        assert_eq!(handle.state(), TaskState::Completed);
        assert_eq!(scheduler.task_count(), 0);
        let last = *values.borrow().last().unwrap();
        assert!((9.995..=10.0).contains(&last), "final value {last}");
        assert!(values.borrow().len() <= 10);
    }

    #[test]
    fn test_first_callback_is_near_init_value() {
        let scheduler = TaskScheduler::new();
        let values = log();
        scheduler.start(40.0, 80.0, 2.0, sink(&values)).unwrap();

        scheduler.tick(1.0 / 120.0);

        let first = values.borrow()[0];
        assert!((first - 40.0).abs() < 0.5, "first value {first}");
    }

    #[test]
    fn test_completed_task_removed_same_tick() {
        let scheduler = TaskScheduler::new();
        let handle = scheduler.start(0.0, 1.0, 0.5, |_| {}).unwrap();

        assert!(scheduler.tick(0.25));
        assert!(scheduler.contains(&handle));
        assert!(!scheduler.tick(0.25));
        assert!(!scheduler.contains(&handle));
        assert_eq!(handle.state(), TaskState::Completed);
    }

    #[test]
    fn test_start_rejects_invalid_duration() {
        let scheduler = TaskScheduler::new();
        assert_eq!(
            scheduler.start(0.0, 1.0, 0.0, |_| {}).unwrap_err(),
            SchedulerError::InvalidDuration(0.0)
        );
        assert_eq!(
            scheduler.start(0.0, 1.0, -1.0, |_| {}).unwrap_err(),
            SchedulerError::InvalidDuration(-1.0)
        );
        assert_eq!(scheduler.task_count(), 0);
    }

    #[test]
    fn test_task_without_callback() {
        let scheduler = TaskScheduler::new();
        let handle = scheduler
            .start_with(LerpRequest::new(0.0, 2.0, 1.0))
            .unwrap();

        scheduler.tick(0.5);
        assert_eq!(scheduler.value(&handle), Some(1.0));
        scheduler.tick(0.5);
        assert_eq!(handle.state(), TaskState::Completed);
    }

    #[test]
    fn test_dispatch_in_creation_order() {
        let scheduler = TaskScheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for tag in 0..4 {
            let order = Rc::clone(&order);
            scheduler
                .start(0.0, 1.0, 10.0, move |_| order.borrow_mut().push(tag))
                .unwrap();
        }

        scheduler.tick(0.1);
        assert_eq!(*order.borrow(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let scheduler = TaskScheduler::new();
        let values = log();
        let handle = scheduler.start(0.0, 1.0, 1.0, sink(&values)).unwrap();

        scheduler.tick(0.1);
        assert!(scheduler.cancel(&handle));
        assert!(!scheduler.cancel(&handle));
        assert!(!handle.cancel());

        scheduler.tick(0.1);
        scheduler.tick(0.1);

        assert_eq!(values.borrow().len(), 1);
        assert_eq!(handle.state(), TaskState::Cancelled);
        assert_eq!(scheduler.task_count(), 0);
    }

    #[test]
    fn test_cancel_finished_task_is_noop() {
        let scheduler = TaskScheduler::new();
        let handle = scheduler.start(0.0, 1.0, 0.1, |_| {}).unwrap();
        scheduler.tick(0.1);

        assert_eq!(handle.state(), TaskState::Completed);
        assert!(!scheduler.cancel(&handle));
        assert_eq!(handle.state(), TaskState::Completed);
    }

    #[test]
    fn test_cancel_ignores_foreign_handle() {
        let a = TaskScheduler::new();
        let b = TaskScheduler::new();
        let handle_a = a.start(0.0, 1.0, 1.0, |_| {}).unwrap();
        let _handle_b = b.start(0.0, 1.0, 1.0, |_| {}).unwrap();

        assert!(!b.cancel(&handle_a));
        assert_eq!(b.task_count(), 1);
        assert!(handle_a.is_active());
    }

    #[test]
    fn test_owner_invalidation_cancels_only_its_tasks() {
        let scheduler = TaskScheduler::new();
        let doomed = Owner::new();
        let survivor = Owner::new();
        let doomed_calls = Rc::new(Cell::new(0));
        let survivor_values = log();

        let mut doomed_handles = Vec::new();
        for _ in 0..3 {
            let calls = Rc::clone(&doomed_calls);
            doomed_handles.push(
                scheduler
                    .start_with(
                        LerpRequest::new(0.0, 1.0, 1.0)
                            .owner(&doomed)
                            .on_update(move |_| calls.set(calls.get() + 1)),
                    )
                    .unwrap(),
            );
        }
        let survivor_handle = scheduler
            .start_with(
                LerpRequest::new(0.0, 1.0, 1.0)
                    .owner(&survivor)
                    .on_update(sink(&survivor_values)),
            )
            .unwrap();

        scheduler.tick(0.1);
        assert_eq!(doomed_calls.get(), 3);

        assert_eq!(scheduler.notify_owner_invalid(doomed.id()), 3);
        scheduler.tick(0.1);
        scheduler.tick(0.1);

        assert_eq!(doomed_calls.get(), 3);
        assert!(doomed_handles
            .iter()
            .all(|h| h.state() == TaskState::Cancelled));
        assert!(survivor_handle.is_active());
        assert_eq!(survivor_values.borrow().len(), 3);
    }

    #[test]
    fn test_dropped_owner_cancels_before_update() {
        let scheduler = TaskScheduler::new();
        let owner = Owner::new();
        let values = log();
        let handle = scheduler
            .start_with(
                LerpRequest::new(0.0, 1.0, 1.0)
                    .owner(&owner)
                    .on_update(sink(&values)),
            )
            .unwrap();

        scheduler.tick(0.1);
        drop(owner);
        assert!(!scheduler.tick(0.1));

        assert_eq!(values.borrow().len(), 1);
        assert_eq!(handle.state(), TaskState::Cancelled);
    }

    #[test]
    fn test_invalidation_wins_over_completion() {
        let scheduler = TaskScheduler::new();
        let owner = Rc::new(Owner::new());
        let values = log();

        // First task invalidates the owner while the second is about to finish
        let trigger = Rc::clone(&owner);
        scheduler
            .start(0.0, 1.0, 10.0, move |_| trigger.invalidate())
            .unwrap();
        let handle = scheduler
            .start_with(
                LerpRequest::new(0.0, 1.0, 0.1)
                    .owner(&owner)
                    .on_update(sink(&values)),
            )
            .unwrap();

        scheduler.tick(0.1);

        assert!(values.borrow().is_empty());
        assert_eq!(handle.state(), TaskState::Cancelled);
    }

    #[test]
    fn test_callback_can_cancel_itself() {
        let scheduler = TaskScheduler::new();
        let slot: Rc<RefCell<Option<TaskHandle>>> = Rc::new(RefCell::new(None));
        let calls = Rc::new(Cell::new(0));

        let inner_slot = Rc::clone(&slot);
        let inner_calls = Rc::clone(&calls);
        let handle = scheduler
            .start(0.0, 1.0, 1.0, move |_| {
                inner_calls.set(inner_calls.get() + 1);
                if let Some(handle) = inner_slot.borrow().as_ref() {
                    handle.cancel();
                }
            })
            .unwrap();
        *slot.borrow_mut() = Some(handle.clone());

        scheduler.tick(0.1);
        scheduler.tick(0.1);

        assert_eq!(calls.get(), 1);
        assert_eq!(handle.state(), TaskState::Cancelled);
        assert_eq!(scheduler.task_count(), 0);
    }

    #[test]
    fn test_callback_can_start_task() {
        let scheduler = TaskScheduler::new();
        let handle = scheduler.handle();
        let chained = log();
        let chained_sink = Rc::clone(&chained);
        let started = Rc::new(Cell::new(false));
        let started_flag = Rc::clone(&started);

        scheduler
            .start(0.0, 1.0, 0.1, move |_| {
                if !started_flag.replace(true) {
                    let sink = Rc::clone(&chained_sink);
                    handle
                        .start(1.0, 0.0, 1.0, move |v| sink.borrow_mut().push(v))
                        .unwrap();
                }
            })
            .unwrap();

        scheduler.tick(0.1);
        assert!(started.get());
        assert!(chained.borrow().is_empty());
        assert_eq!(scheduler.task_count(), 1);

        scheduler.tick(0.1);
        assert_eq!(chained.borrow().len(), 1);
    }

    #[test]
    fn test_exact_mode_never_converges_off_grid() {
        let scheduler = TaskScheduler::new();
        let handle = scheduler
            .start_with(LerpRequest::new(0.0, 10.0, 1.0).exact())
            .unwrap();

        for _ in 0..1_000 {
            scheduler.tick(0.3);
        }

        assert!(handle.is_active());
        assert_eq!(scheduler.task_count(), 1);
    }

    #[test]
    fn test_exact_mode_converges_on_grid() {
        let scheduler = TaskScheduler::new();
        let handle = scheduler
            .start_with(LerpRequest::new(0.0, 8.0, 1.0).exact())
            .unwrap();

        for _ in 0..4 {
            scheduler.tick(0.25);
        }

        assert_eq!(handle.state(), TaskState::Completed);
    }

    #[test]
    fn test_config_tick_limit() {
        let scheduler = TaskScheduler::with_config(SchedulerConfig::exact().with_max_ticks(5)).unwrap();
        let handle = scheduler.start(0.0, 10.0, 1.0, |_| {}).unwrap();

        for _ in 0..5 {
            scheduler.tick(0.3);
        }

        assert_eq!(handle.state(), TaskState::Cancelled);
        assert_eq!(scheduler.task_count(), 0);
    }

    #[test]
    fn test_invalid_delta_treated_as_zero() {
        let scheduler = TaskScheduler::new();
        let values = log();
        scheduler.start(3.0, 6.0, 1.0, sink(&values)).unwrap();

        scheduler.tick(-1.0);
        scheduler.tick(f64::NAN);

        assert_eq!(*values.borrow(), vec![3.0, 3.0]);
    }

    #[test]
    fn test_handle_weak_reference() {
        let (handle, task) = {
            let scheduler = TaskScheduler::new();
            let task = scheduler.start(0.0, 1.0, 1.0, |_| {}).unwrap();
            (scheduler.handle(), task)
        };

        // Scheduler is dropped, handle should not be alive
        assert!(!handle.is_alive());
        assert_eq!(task.state(), TaskState::Cancelled);

        // Operations should safely no-op
        assert_eq!(
            handle.start(0.0, 1.0, 1.0, |_| {}).unwrap_err(),
            SchedulerError::SchedulerDropped
        );
        assert!(!handle.cancel(&task));
        assert!(!task.cancel());
        assert_eq!(handle.task_count(), 0);
    }

    #[test]
    fn test_owner_stays_invalid_after_notify() {
        let scheduler = TaskScheduler::new();
        let owner = Owner::new();
        scheduler.notify_owner_invalid(owner.id());

        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let handle = scheduler
            .start_with(
                LerpRequest::new(0.0, 1.0, 1.0)
                    .owner(&owner)
                    .on_update(move |_| counter.set(counter.get() + 1)),
            )
            .unwrap();

        assert_eq!(handle.state(), TaskState::Cancelled);
        for _ in 0..3 {
            scheduler.tick(0.1);
        }

        assert_eq!(calls.get(), 0);
        assert_eq!(scheduler.task_count(), 0);
        assert!(!handle.cancel());
    }

    #[test]
    fn test_start_with_dropped_owner_is_cancelled() {
        let scheduler = TaskScheduler::new();
        let owner = Owner::new();
        owner.invalidate();

        let handle = scheduler
            .start_with(LerpRequest::new(0.0, 1.0, 1.0).owner(&owner))
            .unwrap();

        assert_eq!(handle.state(), TaskState::Cancelled);
        assert_eq!(scheduler.task_count(), 0);
    }

    #[test]
    fn test_nested_tick_is_ignored() {
        let scheduler = Rc::new(TaskScheduler::new());
        let values = log();
        let weak = Rc::downgrade(&scheduler);
        let mut record = sink(&values);

        let handle = scheduler
            .start(0.0, 1.0, 1.0, move |value| {
                record(value);
                if let Some(scheduler) = weak.upgrade() {
                    scheduler.tick(0.5);
                }
            })
            .unwrap();

        assert!(scheduler.tick(0.5));
        assert_eq!(*values.borrow(), vec![0.5]);
        assert!(handle.is_active());

        assert!(!scheduler.tick(0.5));
        assert_eq!(*values.borrow(), vec![0.5, 1.0]);
        assert_eq!(handle.state(), TaskState::Completed);
    }

    #[test]
    fn test_handle_notify_owner_invalid() {
        let scheduler = TaskScheduler::new();
        let handle = scheduler.handle();
        let owner = Owner::new();
        let other = Owner::new();

        let owned = scheduler
            .start_with(LerpRequest::new(0.0, 1.0, 1.0).owner(&owner))
            .unwrap();
        let unrelated = scheduler
            .start_with(LerpRequest::new(0.0, 1.0, 1.0).owner(&other))
            .unwrap();

        assert_eq!(handle.notify_owner_invalid(owner.id()), 1);
        assert_eq!(owned.state(), TaskState::Cancelled);
        assert!(unrelated.is_active());
        assert_eq!(handle.task_count(), 1);

        drop(scheduler);
        assert_eq!(handle.notify_owner_invalid(other.id()), 0);
    }
}
