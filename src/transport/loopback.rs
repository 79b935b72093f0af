//! In-memory transport that plays the device side from a script.
//!
//! Every complete outbound frame is handed to a responder closure, whose reply
//! is split into notification chunks and delivered to the current subscriber.
//! Used by the exchange tests and the demo program.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::channel::mpsc;
use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::trace;

use super::{Transport, TransportError};
use crate::core::{ClientSlot, CHUNK_SIZE, FRAME_HEADER_LEN};
use crate::protocol::codec::notification_frame;

/// Checksum bytes trailing every outbound frame
const CHECKSUM_LEN: usize = 2;

/// Produces the device's reply to one complete outbound frame
pub type Responder = Box<dyn FnMut(&[u8]) -> Option<Bytes> + Send>;

/// Shared record of every chunk written, in write order
#[derive(Debug, Clone, Default)]
pub struct WriteLog(Arc<Mutex<Vec<Bytes>>>);

impl WriteLog {
    fn push(&self, chunk: Bytes) {
        if let Ok(mut chunks) = self.0.lock() {
            chunks.push(chunk);
        }
    }

    /// Snapshot of all chunks written so far
    pub fn chunks(&self) -> Vec<Bytes> {
        self.0.lock().map(|chunks| chunks.clone()).unwrap_or_default()
    }

    /// Complete outbound frames reassembled from the written chunks
    pub fn frames(&self) -> Vec<Bytes> {
        let mut frames = Vec::new();
        let mut pending = BytesMut::new();
        for chunk in self.chunks() {
            pending.extend_from_slice(&chunk);
            while let Some(len) = complete_frame_len(&pending) {
                frames.push(pending.split_to(len).freeze());
            }
        }
        frames
    }
}

/// Length of the outbound frame at the start of `buffer`, once complete
fn complete_frame_len(buffer: &[u8]) -> Option<usize> {
    if buffer.len() < FRAME_HEADER_LEN {
        return None;
    }
    let len = FRAME_HEADER_LEN + buffer[2] as usize + CHECKSUM_LEN;
    (buffer.len() >= len).then_some(len)
}

/// Builds a device reply addressed to the slot the request came from
pub fn reply(request: &[u8], payload: &[u8]) -> Option<Bytes> {
    let slot = ClientSlot::new(*request.first()?).ok()?;
    notification_frame(slot, payload)
}

/// Scripted in-memory transport
pub struct LoopbackTransport {
    responder: Responder,
    log: WriteLog,
    outbound: BytesMut,
    subscriber: Option<mpsc::UnboundedSender<Bytes>>,
    notification_chunk_size: usize,
    write_delay: Duration,
    write_error: Option<TransportError>,
    subscribe_error: Option<TransportError>,
}

impl LoopbackTransport {
    /// Creates a transport that answers each frame with `responder`
    pub fn new<F>(responder: F) -> Self
    where
        F: FnMut(&[u8]) -> Option<Bytes> + Send + 'static,
    {
        LoopbackTransport {
            responder: Box::new(responder),
            log: WriteLog::default(),
            outbound: BytesMut::new(),
            subscriber: None,
            notification_chunk_size: CHUNK_SIZE,
            write_delay: Duration::ZERO,
            write_error: None,
            subscribe_error: None,
        }
    }

    /// A device that never answers
    pub fn silent() -> Self {
        LoopbackTransport::new(|_| None)
    }

    /// A device that answers every frame with the same payload
    pub fn answering(payload: Vec<u8>) -> Self {
        LoopbackTransport::new(move |request| reply(request, &payload))
    }

    /// Handle for inspecting writes after the transport is moved away
    pub fn write_log(&self) -> WriteLog {
        self.log.clone()
    }

    /// Delays each chunk write, simulating acknowledged writes over the air
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    /// Size of notification chunks replies are split into
    pub fn with_notification_chunk_size(mut self, size: usize) -> Self {
        self.notification_chunk_size = size.max(1);
        self
    }

    /// Fails every write with `error`
    pub fn failing_writes(mut self, error: TransportError) -> Self {
        self.write_error = Some(error);
        self
    }

    /// Fails every subscription with `error`
    pub fn failing_subscriptions(mut self, error: TransportError) -> Self {
        self.subscribe_error = Some(error);
        self
    }

    /// Pushes raw chunks to the current subscriber, outside any exchange
    pub fn inject(&self, chunk: Bytes) {
        if let Some(subscriber) = &self.subscriber {
            let _ = subscriber.unbounded_send(chunk);
        }
    }

    fn deliver(&mut self, reply: Bytes) {
        let Some(subscriber) = &self.subscriber else {
            trace!("reply dropped, nobody subscribed");
            return;
        };
        for start in (0..reply.len()).step_by(self.notification_chunk_size) {
            let end = (start + self.notification_chunk_size).min(reply.len());
            let _ = subscriber.unbounded_send(reply.slice(start..end));
        }
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), TransportError> {
        if let Some(error) = &self.write_error {
            return Err(error.clone());
        }
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
        self.log.push(chunk.clone());
        self.outbound.extend_from_slice(&chunk);

        while let Some(len) = complete_frame_len(&self.outbound) {
            let frame = self.outbound.split_to(len).freeze();
            if let Some(reply) = (self.responder)(&frame[..]) {
                self.deliver(reply);
            }
        }
        Ok(())
    }

    async fn notifications(&mut self) -> Result<BoxStream<'static, Bytes>, TransportError> {
        if let Some(error) = &self.subscribe_error {
            return Err(error.clone());
        }
        let (tx, rx) = mpsc::unbounded();
        // A new subscription replaces the previous one, as a re-enabled
        // characteristic notification would.
        self.subscriber = Some(tx);
        Ok(rx.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reply_split_into_chunks() {
        let mut transport = LoopbackTransport::answering(vec![0xAA; 24]);
        let mut notifications = transport.notifications().await.unwrap();

        transport.write_chunk(Bytes::from_static(&[0x02, 0x30, 0x00, 0x12, 0x34])).await.unwrap();

        let first = notifications.next().await.unwrap();
        let second = notifications.next().await.unwrap();
        assert_eq!(first.len(), 20);
        assert_eq!(&first[..3], &[0x42, 0x01, 24]);
        assert_eq!(second.len(), 7);
    }

    #[tokio::test]
    async fn test_responder_sees_whole_frames() {
        let mut transport = LoopbackTransport::new(|frame| {
            assert_eq!(frame.len(), 7);
            reply(frame, &[0x00])
        });
        let mut notifications = transport.notifications().await.unwrap();

        transport.write_chunk(Bytes::from_static(&[0x01, 0x36, 0x02])).await.unwrap();
        transport.write_chunk(Bytes::from_static(&[0x05, 0x00, 0xAB, 0xCD])).await.unwrap();

        assert_eq!(&notifications.next().await.unwrap()[..], &[0x41, 0x01, 0x01, 0x00]);
        assert_eq!(transport.write_log().chunks().len(), 2);
        assert_eq!(transport.write_log().frames().len(), 1);
    }

    #[tokio::test]
    async fn test_injected_errors() {
        let mut transport = LoopbackTransport::silent().failing_writes(TransportError::Disconnected);
        assert_eq!(
            transport.write_chunk(Bytes::from_static(&[0])).await,
            Err(TransportError::Disconnected)
        );

        let mut transport = LoopbackTransport::silent().failing_subscriptions(TransportError::NotReady);
        assert!(transport.notifications().await.is_err());
    }
}
