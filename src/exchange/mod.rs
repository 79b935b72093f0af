//! Protocol exchange orchestration
//!
//! An [`Exchanger`] turns a command into the device's notification: it encodes
//! the frame, takes exclusive use of the transport through the serialized
//! channel, writes the chunks, and waits for the first notification that
//! decodes against the issuing command. Transport faults are translated into
//! [`crate::Error`] here and go no further.
//!
//! The exchanger never touches device runtime state; callers apply returned
//! notifications to a [`crate::protocol::DeviceRuntimeState`] themselves.

mod orchestrator;

use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::channel::{serial_channel, ChannelPhase, ChannelWorker, SerialChannel};
use crate::core::{Config, Result};
use crate::protocol::{codec, Command, Notification};
use crate::transport::Transport;

use self::orchestrator::run_exchange;

/// Executes commands against one device, one exchange at a time
pub struct Exchanger<T> {
    channel: SerialChannel<T>,
    config: Arc<Config>,
}

impl<T> Clone for Exchanger<T> {
    fn clone(&self) -> Self {
        Exchanger {
            channel: self.channel.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T: Transport> Exchanger<T> {
    /// Creates an exchanger whose worker has not started yet
    ///
    /// Commands executed before the worker runs wait in the queue.
    pub fn new(config: Config) -> Result<(Self, ChannelWorker<T>)> {
        config.validate()?;
        let (channel, worker) = serial_channel();
        Ok((
            Exchanger {
                channel,
                config: Arc::new(config),
            },
            worker,
        ))
    }

    /// Creates an exchanger and starts its worker on `transport`
    ///
    /// The join handle returns the transport once every exchanger clone is
    /// dropped and queued exchanges have finished.
    pub fn spawn(transport: T, config: Config) -> Result<(Self, JoinHandle<T>)> {
        let (exchanger, worker) = Exchanger::new(config)?;
        Ok((exchanger, worker.spawn(transport)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn phase(&self) -> ChannelPhase {
        self.channel.phase()
    }

    /// Exchanges waiting behind the one in flight
    pub fn queued(&self) -> usize {
        self.channel.queued()
    }

    /// Sends `command` and returns the notification it produced
    #[instrument(skip_all, fields(command = ?command.kind(), device = %command.device_id))]
    pub async fn execute(&self, command: Command) -> Result<Notification> {
        let frame = codec::encode(&command)?;
        let config = self.config.clone();
        self.channel
            .submit(move |transport: &mut T| {
                async move { run_exchange(transport, &command, frame, &config).await }.boxed()
            })
            .await?
    }

    /// Like [`execute`](Self::execute), but stops waiting when `cancel` fires
    ///
    /// Returns `Ok(None)` if cancelled before the exchange reached the
    /// transport. Once writing has begun the exchange runs to completion in
    /// the background and the caller gets [`crate::Error::OperationCancelled`].
    #[instrument(skip_all, fields(command = ?command.kind(), device = %command.device_id))]
    pub async fn execute_cancellable(
        &self,
        command: Command,
        cancel: &CancellationToken,
    ) -> Result<Option<Notification>> {
        let frame = codec::encode(&command)?;
        let config = self.config.clone();
        let outcome = self
            .channel
            .submit_cancellable(
                move |transport: &mut T| {
                    async move { run_exchange(transport, &command, frame, &config).await }.boxed()
                },
                cancel,
            )
            .await?;
        outcome.transpose()
    }
}
