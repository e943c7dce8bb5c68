//! In-process task source backed by a tokio channel

use crate::messaging::error::{MessagingError, MessagingResult};
use crate::messaging::events::TaskKind;
use crate::messaging::traits::{Delivery, TaskSource};
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

/// How a submitted task was settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Acked(Vec<u8>),
    Rejected(Vec<u8>),
}

impl TaskOutcome {
    pub fn body(&self) -> &[u8] {
        match self {
            TaskOutcome::Acked(body) | TaskOutcome::Rejected(body) => body,
        }
    }
}

/// Create a connected submitter/source pair
pub fn channel(prefix: impl Into<String>, capacity: usize) -> (TaskSubmitter, ChannelTaskSource) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        TaskSubmitter {
            tx,
            prefix: prefix.into(),
        },
        ChannelTaskSource { rx },
    )
}

/// Producer half; dropping every submitter ends the source
#[derive(Clone)]
pub struct TaskSubmitter {
    tx: mpsc::Sender<ChannelDelivery>,
    prefix: String,
}

impl TaskSubmitter {
    /// Submit a task; the receiver resolves once the bridge settles it
    pub async fn submit(
        &self,
        kind: TaskKind,
        payload: Vec<u8>,
    ) -> MessagingResult<oneshot::Receiver<TaskOutcome>> {
        self.submit_raw(format!("{}.{}", self.prefix, kind), payload).await
    }

    /// Submit on an arbitrary subject
    pub async fn submit_raw(
        &self,
        subject: String,
        payload: Vec<u8>,
    ) -> MessagingResult<oneshot::Receiver<TaskOutcome>> {
        let (outcome_tx, outcome_rx) = oneshot::channel();
        self.tx
            .send(ChannelDelivery {
                subject,
                payload,
                outcome: outcome_tx,
            })
            .await
            .map_err(|_| MessagingError::Closed("task source dropped".to_string()))?;
        Ok(outcome_rx)
    }
}

/// Consumer half
pub struct ChannelTaskSource {
    rx: mpsc::Receiver<ChannelDelivery>,
}

#[async_trait]
impl TaskSource for ChannelTaskSource {
    async fn next_delivery(&mut self) -> MessagingResult<Option<Box<dyn Delivery>>> {
        Ok(self
            .rx
            .recv()
            .await
            .map(|delivery| Box::new(delivery) as Box<dyn Delivery>))
    }

    async fn close(&mut self) -> MessagingResult<()> {
        self.rx.close();
        Ok(())
    }
}

struct ChannelDelivery {
    subject: String,
    payload: Vec<u8>,
    outcome: oneshot::Sender<TaskOutcome>,
}

impl ChannelDelivery {
    fn settle(self, outcome: TaskOutcome) -> MessagingResult<()> {
        self.outcome
            .send(outcome)
            .map_err(|_| MessagingError::Closed("submitter stopped waiting".to_string()))
    }
}

#[async_trait]
impl Delivery for ChannelDelivery {
    fn subject(&self) -> &str {
        &self.subject
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }

    async fn ack(self: Box<Self>, reply: Vec<u8>) -> MessagingResult<()> {
        self.settle(TaskOutcome::Acked(reply))
    }

    async fn reject(self: Box<Self>, reply: Vec<u8>) -> MessagingResult<()> {
        self.settle(TaskOutcome::Rejected(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_and_settle() {
        let (submitter, mut source) = channel("analyzer", 4);
        let outcome = submitter
            .submit(TaskKind::Delete, b"{}".to_vec())
            .await
            .unwrap();

        let delivery = source.next_delivery().await.unwrap().unwrap();
        assert_eq!(delivery.subject(), "analyzer.delete");
        assert_eq!(delivery.payload(), b"{}");
        delivery.ack(b"done".to_vec()).await.unwrap();

        assert_eq!(outcome.await.unwrap(), TaskOutcome::Acked(b"done".to_vec()));
    }

    #[tokio::test]
    async fn test_source_ends_when_submitters_dropped() {
        let (submitter, mut source) = channel("analyzer", 1);
        drop(submitter);
        assert!(source.next_delivery().await.unwrap().is_none());
    }
}
