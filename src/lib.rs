//! Client-side core of the TaskSwap demo marketplace: persisted snapshot
//! store, event bus, task lifecycle, premium cadence and starter gating.

pub mod app;
pub mod attachments;
pub mod cadence;
pub mod config;
pub mod error;
pub mod events;
pub mod gates;
pub mod lifecycle;
pub mod logging;
pub mod pricing;
pub mod query;
pub mod store;
pub mod types;

pub use app::{App, AppBuilder};
pub use config::Config;
pub use error::StoreError;
pub use events::{Channel, Event, EventBus, Subscription, Toast};
pub use gates::{Section, StarterGates};
pub use lifecycle::{Outcome, PickedFile, Task, TaskEngine, TaskStatus};
pub use store::{LoadOutcome, StateStore};
pub use types::{AppState, FileRef, StarterTask, TaskId};
