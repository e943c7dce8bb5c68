//! NATS task source

use crate::messaging::config::MessagingConfig;
use crate::messaging::error::{MessagingError, MessagingResult};
use crate::messaging::traits::{Delivery, TaskSource};
use async_nats::{Client, Subscriber};
use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, info};

/// Queue subscription on `<prefix>.*`, shared with other replicas through the queue group
pub struct NatsTaskSource {
    client: Client,
    subscriber: Subscriber,
}

impl NatsTaskSource {
    /// Connect and subscribe
    pub async fn connect(config: &MessagingConfig) -> MessagingResult<Self> {
        if config.nats.servers.is_empty() {
            return Err(MessagingError::ConfigurationError(
                "at least one NATS server is required".to_string(),
            ));
        }

        // comma-separated server list
        let servers = config.nats.servers.join(",");
        let client = async_nats::ConnectOptions::new()
            .name(config.nats.connection_name.as_str())
            .connect(&servers)
            .await
            .map_err(|e| MessagingError::ConnectionFailed(format!("NATS connection failed: {}", e)))?;

        let subject = config.wildcard_subject();
        let subscriber = client
            .queue_subscribe(subject.clone(), config.queue_group.clone())
            .await
            .map_err(|e| MessagingError::SubscribeFailed(format!("NATS subscribe failed: {}", e)))?;

        info!(
            subject = %subject,
            queue_group = %config.queue_group,
            "Subscribed to task subjects"
        );

        Ok(Self { client, subscriber })
    }
}

#[async_trait]
impl TaskSource for NatsTaskSource {
    async fn next_delivery(&mut self) -> MessagingResult<Option<Box<dyn Delivery>>> {
        let Some(msg) = self.subscriber.next().await else {
            return Ok(None);
        };

        Ok(Some(Box::new(NatsDelivery {
            client: self.client.clone(),
            subject: msg.subject.to_string(),
            reply: msg.reply.map(|reply| reply.to_string()),
            payload: msg.payload.to_vec(),
        })))
    }

    async fn close(&mut self) -> MessagingResult<()> {
        self.subscriber
            .unsubscribe()
            .await
            .map_err(|e| MessagingError::SubscribeFailed(format!("NATS unsubscribe failed: {}", e)))?;
        self.client
            .flush()
            .await
            .map_err(|e| MessagingError::PublishFailed(format!("NATS flush failed: {}", e)))
    }
}

/// Core NATS has no redelivery; settling a message publishes the reply to the requester
struct NatsDelivery {
    client: Client,
    subject: String,
    reply: Option<String>,
    payload: Vec<u8>,
}

impl NatsDelivery {
    async fn respond(self, body: Vec<u8>) -> MessagingResult<()> {
        let Some(reply) = self.reply else {
            debug!(subject = %self.subject, "Task had no reply subject");
            return Ok(());
        };

        self.client
            .publish(reply, body.into())
            .await
            .map_err(|e| MessagingError::PublishFailed(format!("NATS publish failed: {}", e)))
    }
}

#[async_trait]
impl Delivery for NatsDelivery {
    fn subject(&self) -> &str {
        &self.subject
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }

    async fn ack(self: Box<Self>, reply: Vec<u8>) -> MessagingResult<()> {
        self.respond(reply).await
    }

    async fn reject(self: Box<Self>, reply: Vec<u8>) -> MessagingResult<()> {
        self.respond(reply).await
    }
}
