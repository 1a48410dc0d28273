pub mod config;
pub mod derive;
pub mod gateway;
pub mod model;
pub mod notify;
pub mod store;
pub mod wire;

pub use config::AppConfig;
pub use derive::TaskStats;
pub use gateway::{GatewayError, HttpGateway, MemoryGateway, TaskGateway};
pub use model::*;
pub use notify::{Notice, NoticeLevel, Notifier, RecordingNotifier, TracingNotifier};
pub use store::{MutationKind, Outcome, StoreError, TaskStore};
