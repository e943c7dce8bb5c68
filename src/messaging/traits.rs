//! Messaging trait abstractions

use crate::messaging::error::MessagingResult;
use async_trait::async_trait;

/// One delivered task message, settled exactly once
#[async_trait]
pub trait Delivery: Send {
    /// Subject (routing designation) the message arrived on
    fn subject(&self) -> &str;

    /// Raw message body
    fn payload(&self) -> &[u8];

    /// Acknowledge processing, sending `reply` back to the producer
    async fn ack(self: Box<Self>, reply: Vec<u8>) -> MessagingResult<()>;

    /// Refuse an unprocessable message, sending `reply` back to the producer
    async fn reject(self: Box<Self>, reply: Vec<u8>) -> MessagingResult<()>;
}

/// Source of task deliveries
#[async_trait]
pub trait TaskSource: Send {
    /// Wait for the next delivery; `None` once the source is exhausted
    async fn next_delivery(&mut self) -> MessagingResult<Option<Box<dyn Delivery>>>;

    /// Stop receiving and release the connection
    async fn close(&mut self) -> MessagingResult<()>;
}
