//! Glide Animation
//!
//! Frame-cooperative interpolation: a scalar is blended from a start value
//! to a target over several frames, with progress reported through a
//! callback on every tick.
//!
//! # Features
//!
//! - **Tick-driven**: the host loop supplies the frame delta, nothing runs on
//!   its own
//! - **Configurable termination**: epsilon band (default `0.005`) or exact
//!   match
//! - **Cancellation handles**: idempotent, safe to use from inside callbacks
//! - **Owner lifecycles**: tasks bound to a host object stop when it goes away
//!
//! # Example
//!
//! ```
//! use glide_animation::{LerpRequest, Owner, TaskScheduler};
//!
//! let scheduler = TaskScheduler::new();
//! let window = Owner::new();
//!
//! let fade = scheduler
//!     .start_with(
//!         LerpRequest::new(1.0, 0.0, 0.5)
//!             .owner(&window)
//!             .on_update(|alpha| println!("alpha = {alpha}")),
//!     )
//!     .unwrap();
//!
//! scheduler.tick(1.0 / 60.0);
//! assert!(fade.is_active());
//!
//! // Window closed: the fade stops without another callback
//! scheduler.notify_owner_invalid(window.id());
//! assert!(!fade.is_active());
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod owner;
pub mod scheduler;
pub mod task;

pub use clock::{FixedClock, FrameClock, InstantClock};
pub use config::{SchedulerConfig, DEFAULT_COMPLETION_THRESHOLD};
pub use error::{Result, SchedulerError};
pub use owner::{Owner, OwnerId};
pub use scheduler::{SchedulerHandle, TaskHandle, TaskId, TaskScheduler};
pub use task::{lerp, InterpolationTask, LerpRequest, TaskState, UpdateCallback};
