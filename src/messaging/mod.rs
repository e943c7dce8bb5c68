//! Asynchronous task bridge
//!
//! Producers publish analyzer tasks on `<prefix>.index`, `<prefix>.analyze`
//! and `<prefix>.delete`. The bridge decodes each delivery, runs it through the
//! [`AnalyzerService`](crate::search::AnalyzerService) and settles it with a
//! JSON [`TaskReply`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐    ┌──────────────────┐
//! │ NatsTaskSource   │    │ ChannelTaskSource│
//! │ (queue group)    │    │ (in-process)     │
//! └────────┬─────────┘    └────────┬─────────┘
//!          └───────────┬───────────┘
//!                      ▼
//! ┌─────────────────────────────────────────────────┐
//! │  TaskBridge                                      │
//! │  - decode, reject malformed                      │
//! │  - bounded in-flight workers                     │
//! │  - ack once the pipeline returns                 │
//! └─────────────────────────────────────────────────┘
//!                      │
//!                      ▼
//!              AnalyzerService
//! ```
//!
//! # Example
//!
//! ```no_run
//! use log_analyzer::config::BackendConfig;
//! use log_analyzer::messaging::{MessagingConfig, NatsTaskSource, TaskBridge};
//! use log_analyzer::search::{AnalyzerService, SearchConfig};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = AnalyzerService::new(&BackendConfig::default(), SearchConfig::default())?;
//!     let config = MessagingConfig::default();
//!
//!     let source = NatsTaskSource::connect(&config).await?;
//!     let bridge = TaskBridge::new(Arc::new(service), &config);
//!     bridge.run(source, CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod memory;
pub mod nats;
pub mod service;
pub mod traits;

pub use config::{MessagingConfig, NatsConfig};
pub use error::{MessagingError, MessagingResult};
pub use events::{AnalyzerTask, ReplyStatus, TaskKind, TaskReply};
pub use memory::{channel, ChannelTaskSource, TaskOutcome, TaskSubmitter};
pub use nats::NatsTaskSource;
pub use service::TaskBridge;
pub use traits::{Delivery, TaskSource};
