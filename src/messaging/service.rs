//! Task bridge: turns queued tasks into analyzer pipeline runs

use crate::messaging::config::MessagingConfig;
use crate::messaging::error::{MessagingError, MessagingResult};
use crate::messaging::events::{AnalyzerTask, TaskKind, TaskReply};
use crate::messaging::traits::{Delivery, TaskSource};
use crate::metrics::TASKS_PROCESSED_TOTAL;
use crate::search::{AnalyzerService, SearchError, SearchResult};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Consumes deliveries from a [`TaskSource`] and runs them against the analyzer
///
/// A delivery is acknowledged only after its pipeline call returns. Malformed
/// deliveries are rejected and never reach the pipeline.
#[derive(Clone)]
pub struct TaskBridge {
    service: Arc<AnalyzerService>,
    subject_prefix: String,
    max_in_flight: usize,
}

impl TaskBridge {
    pub fn new(service: Arc<AnalyzerService>, config: &MessagingConfig) -> Self {
        Self {
            service,
            subject_prefix: config.subject_prefix.clone(),
            max_in_flight: config.max_in_flight.max(1),
        }
    }

    /// Run until `shutdown` fires or the source is exhausted, then wait for in-flight tasks
    pub async fn run<S>(&self, mut source: S, shutdown: CancellationToken) -> MessagingResult<()>
    where
        S: TaskSource,
    {
        let permits = Arc::new(Semaphore::new(self.max_in_flight));
        info!(max_in_flight = self.max_in_flight, "Task bridge started");

        loop {
            let permit = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                permit = permits.clone().acquire_owned() => permit
                    .map_err(|e| MessagingError::Closed(e.to_string()))?,
            };

            let delivery = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                delivery = source.next_delivery() => delivery,
            };

            let delivery = match delivery {
                Ok(Some(delivery)) => delivery,
                Ok(None) => {
                    debug!("Task source exhausted");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Failed to receive task");
                    drop(permit);
                    self.drain(&permits).await;
                    return Err(e);
                }
            };

            let bridge = self.clone();
            let cancel = shutdown.child_token();
            tokio::spawn(async move {
                bridge.handle(delivery, cancel).await;
                drop(permit);
            });
        }

        self.drain(&permits).await;
        source.close().await?;
        info!("Task bridge stopped");
        Ok(())
    }

    async fn drain(&self, permits: &Semaphore) {
        // every permit back means no task is still running
        if let Ok(all) = permits.acquire_many(self.max_in_flight as u32).await {
            drop(all);
        }
    }

    /// Decode, execute, and settle one delivery
    pub async fn handle(&self, delivery: Box<dyn Delivery>, cancel: CancellationToken) {
        let kind = TaskKind::from_subject(delivery.subject(), &self.subject_prefix);
        let decoded = kind
            .ok_or_else(|| {
                SearchError::MalformedPayload(format!("unknown task subject {}", delivery.subject()))
            })
            .and_then(|kind| AnalyzerTask::decode(kind, delivery.payload()));

        let task = match decoded {
            Ok(task) => task,
            Err(e) => {
                warn!(subject = %delivery.subject(), error = %e, "Rejecting malformed task");
                record(kind, "rejected");
                let reply = TaskReply::error(kind, None, &e);
                if let Err(e) = delivery.reject(reply.to_bytes()).await {
                    warn!(error = %e, "Failed to reject task");
                }
                return;
            }
        };

        debug!(kind = %task.kind(), project = %task.project(), "Processing task");
        let (reply, outcome) = match self.execute(&task, &cancel).await {
            Ok(result) => (TaskReply::ok(&task, result), "ok"),
            Err(e) => {
                warn!(kind = %task.kind(), project = %task.project(), error = %e, "Task failed");
                (
                    TaskReply::error(Some(task.kind()), Some(task.project()), &e),
                    "failed",
                )
            }
        };

        record(Some(task.kind()), outcome);
        if let Err(e) = delivery.ack(reply.to_bytes()).await {
            warn!(kind = %task.kind(), error = %e, "Failed to acknowledge task");
        }
    }

    async fn execute(
        &self,
        task: &AnalyzerTask,
        cancel: &CancellationToken,
    ) -> SearchResult<serde_json::Value> {
        let value = match task {
            AnalyzerTask::Index { project, launches } => {
                serde_json::to_value(self.service.index_launches(project, launches).await?)?
            }
            AnalyzerTask::Analyze { project, launches } => serde_json::to_value(
                self.service
                    .analyze_launches(project, launches, cancel)
                    .await?,
            )?,
            AnalyzerTask::Delete { project } => {
                serde_json::to_value(self.service.delete_index(project).await?)?
            }
        };
        Ok(value)
    }
}

fn record(kind: Option<TaskKind>, outcome: &str) {
    let kind = kind.map(|k| k.as_str()).unwrap_or("unknown");
    TASKS_PROCESSED_TOTAL
        .with_label_values(&[kind, outcome])
        .inc();
}
