use bytes::Bytes;
use futures::StreamExt;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::core::{Config, Error, ExchangeStage, PeripheralFault, Result};
use crate::protocol::{association, codec, Command, FrameReassembler, Notification};
use crate::transport::Transport;

/// Runs one exchange with the transport held exclusively
///
/// The outer bound wraps the whole exchange; the stage it reports is whichever
/// step was in progress when it fired.
pub(crate) async fn run_exchange<T: Transport>(
    transport: &mut T,
    command: &Command,
    frame: Bytes,
    config: &Config,
) -> Result<Notification> {
    let mut stage = ExchangeStage::Write;
    let outcome = timeout(
        config.exchange_timeout,
        exchange_steps(transport, command, frame, config, &mut stage),
    )
    .await;

    match outcome {
        Ok(result) => result,
        Err(_) => {
            warn!(%stage, "exchange exceeded its outer bound");
            Err(Error::NotificationNotReceived {
                command: command.kind(),
                stage,
            })
        }
    }
}

async fn exchange_steps<T: Transport>(
    transport: &mut T,
    command: &Command,
    frame: Bytes,
    config: &Config,
    stage: &mut ExchangeStage,
) -> Result<Notification> {
    let slot = command.transmit_credentials().slot;

    // Subscribe first so a fast response cannot slip past.
    let mut notifications = transport.notifications().await?;

    *stage = ExchangeStage::Write;
    let chunks = codec::chunk(&frame, config.chunk_size);
    let count = chunks.len();
    for chunk in chunks {
        trace!(len = chunk.len(), "writing chunk");
        transport.write_chunk(chunk).await?;
    }
    debug!(chunks = count, slot = slot.get(), "frame written");

    *stage = ExchangeStage::Notification;
    let mut reassembler = FrameReassembler::new(slot);
    let wait = async {
        while let Some(chunk) = notifications.next().await {
            trace!(len = chunk.len(), "notification chunk");
            let Some(frame) = reassembler.accumulate(&chunk) else {
                continue;
            };
            if let Some(notification) = codec::decode(&frame, command) {
                return Ok(notification);
            }
        }
        Err(Error::PeripheralUnreachable(PeripheralFault::Disconnected))
    };

    let notification = match timeout(config.notification_timeout, wait).await {
        Ok(result) => result?,
        Err(_) => {
            warn!(command = ?command.kind(), "no notification before timeout");
            return Err(Error::NotificationNotReceived {
                command: command.kind(),
                stage: ExchangeStage::Notification,
            });
        }
    };

    check_association(command, notification)
}

/// Rejects a notification the issuing command cannot produce
pub(crate) fn check_association(command: &Command, notification: Notification) -> Result<Notification> {
    if association::accepts(command.kind(), notification.kind()) {
        debug!(notification = ?notification.kind(), "exchange complete");
        Ok(notification)
    } else {
        warn!(
            command = ?command.kind(),
            received = ?notification.kind(),
            "notification shape does not match issuing command"
        );
        Err(Error::ProtocolDecode {
            command: command.kind(),
            received: notification.kind(),
        })
    }
}
