//! showerlink: protocol engine for Bluetooth LE digital shower controllers
//!
//! The library encodes typed commands into checksummed, chunked frames,
//! reassembles and decodes the device's notifications against the command that
//! triggered them, and serializes every exchange over the single shared
//! transport. A small runtime state machine tracks water flow and the lockout
//! window that follows stopping it.
//!
//! ```no_run
//! use showerlink::protocol::{Command, CommandBody};
//! use showerlink::transport::LoopbackTransport;
//! use showerlink::{Config, Credentials, DeviceId, Exchanger};
//!
//! # async fn run() -> showerlink::Result<()> {
//! let transport = LoopbackTransport::silent();
//! let (exchanger, _worker) = Exchanger::spawn(transport, Config::default())?;
//! let command = Command::new(DeviceId::random(), Credentials::PAIRING, CommandBody::RequestState);
//! let notification = exchanger.execute(command).await?;
//! # let _ = notification;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod core;
pub mod exchange;
pub mod protocol;
pub mod transport;
pub mod util;

// Re-export commonly used items
pub use crate::core::{
    ClientSecret, ClientSlot, Config, Credentials, DeviceId, Error, ExchangeStage,
    PeripheralFault, Result, SlotSet,
};
pub use crate::exchange::Exchanger;
pub use crate::protocol::{Command, CommandBody, DeviceRuntimeState, Notification, NotificationBody};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
