//! Transport boundary
//!
//! The engine consumes exactly two primitives from the wireless stack: an
//! ordered, acknowledged chunk write and a stream of raw notification chunks.
//! Connecting and characteristic discovery happen before a transport is handed
//! to the engine.

pub mod loopback;

pub use self::loopback::{LoopbackTransport, WriteLog};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

/// Faults reported by a transport implementation
///
/// These never leave the exchange layer; they are translated into
/// [`crate::Error`] at that boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("radio unavailable")]
    Unavailable,

    #[error("peripheral not found")]
    NotFound,

    #[error("connect failed: {0}")]
    ConnectFailed(String),

    #[error("peripheral not ready")]
    NotReady,

    #[error("peripheral disconnected")]
    Disconnected,

    #[error("operation already in progress")]
    AlreadyInProgress,

    #[error("operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// A connected link to one controller device
///
/// Only the serialized channel touches a transport, so implementations need
/// no internal locking.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Writes one chunk and waits for the peripheral's acknowledgement
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), TransportError>;

    /// Subscribes to notification chunks
    ///
    /// Chunks arriving after this call returns are delivered on the stream,
    /// so subscribing before writing cannot lose a fast response.
    async fn notifications(&mut self) -> Result<BoxStream<'static, Bytes>, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), TransportError> {
        (**self).write_chunk(chunk).await
    }

    async fn notifications(&mut self) -> Result<BoxStream<'static, Bytes>, TransportError> {
        (**self).notifications().await
    }
}
