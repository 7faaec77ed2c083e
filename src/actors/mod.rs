//! Task-based scheduling and fan-out
//!
//! Each component runs as an independent async task communicating via Tokio
//! channels and cancellation tokens.
//!
//! ## Architecture Overview
//!
//! ```text
//!                 ┌────────────────┐
//!                 │  JobRegistry   │  one loop per active monitor
//!                 └───────┬────────┘
//!          ┌──────────────┼──────────────┐
//!   ┌──────▼──────┐              ┌───────▼─────┐
//!   │ Scheduler-1 │     ...      │ Scheduler-N │
//!   └──────┬──────┘              └───────┬─────┘
//!          │   ConcurrencyLimiter + ProbeExecutor
//!          └──────────────┬──────────────┘
//!                 ┌───────▼────────┐
//!                 │   ResultSink   │──── storage (metric log, cached status)
//!                 └───────┬────────┘
//!                         │ publish (never waits)
//!                 ┌───────▼────────┐
//!                 │ BroadcastHub   │  sole owner of the observer set
//!                 └───────┬────────┘
//!              ┌──────────┼──────────┐
//!          Observer-1  Observer-2  Observer-N
//! ```
//!
//! ## Components
//!
//! - **JobRegistry / SchedulerLoop**: start, replace and stop per-monitor loops
//! - **ResultSink**: persists outcomes, recomputes uptime, publishes updates
//! - **BroadcastHub**: serializes register/unregister/broadcast on one task
//! - **Retention**: daily sweep of expired metrics

pub mod hub;
pub mod messages;
pub mod registry;
pub mod retention;
pub mod scheduler;
pub mod sink;

pub use hub::HubHandle;
pub use messages::{MonitorUpdate, ObserverId, UpdateEvent};
pub use registry::JobRegistry;
pub use scheduler::JobContext;
pub use sink::{ResultSink, uptime_percentage};
