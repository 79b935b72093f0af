use serde::{Deserialize, Serialize};

use crate::core::{ClientSecret, ClientSlot, Credentials, DeviceId};

/// Requested water-flow state sent with outlet controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunningMode {
    Off,
    Running,
    Paused,
}

/// One of the device's two physical outlets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outlet {
    First,
    Second,
}

impl Outlet {
    /// Outlet slot number on the wire
    pub fn slot(&self) -> u8 {
        match self {
            Outlet::First => 0,
            Outlet::Second => 1,
        }
    }

    pub fn from_slot(slot: u8) -> Option<Self> {
        match slot {
            0 => Some(Outlet::First),
            1 => Some(Outlet::Second),
            _ => None,
        }
    }
}

/// A stored preset as written to or read from the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetDetails {
    pub preset_slot: u8,
    pub name: String,
    pub outlet: Outlet,
    /// Degrees Celsius, 0.1 resolution
    pub target_temperature: f64,
    /// Whole seconds, 10 second resolution on the wire
    pub duration_seconds: u32,
    pub flow_rate_max: u8,
}

/// Device-wide settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Preset started by the device's own start button
    pub default_preset_slot: u8,
    pub standby_lighting_enabled: bool,
    pub wireless_remote_enabled: bool,
    pub first_outlet_enabled: bool,
    pub second_outlet_enabled: bool,
}

/// Operation-specific content of a command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandBody {
    PairDevice {
        /// Secret the device will bind to the new slot
        secret: ClientSecret,
        client_name: String,
    },
    UnpairDevice {
        /// Slot to release; may differ from the caller's own slot
        client_slot: ClientSlot,
    },
    RequestNickname,
    UpdateNickname {
        nickname: String,
    },
    RequestState,
    RequestDeviceInformation,
    RequestDeviceSettings,
    UpdateDeviceSettings {
        settings: DeviceSettings,
    },
    RequestPresetSlots,
    RequestPresetDetails {
        preset_slot: u8,
    },
    UpdatePresetDetails {
        details: PresetDetails,
    },
    DeletePresetDetails {
        preset_slot: u8,
    },
    StartPreset {
        preset_slot: u8,
    },
    RequestOutletSettings {
        outlet: Outlet,
    },
    UpdateOutletSettings {
        outlet: Outlet,
        maximum_duration_seconds: u32,
        maximum_temperature: f64,
    },
    OperateOutletControls {
        mode: RunningMode,
        target_temperature: f64,
        first_outlet: bool,
        second_outlet: bool,
    },
    RequestPairedClientSlots,
    RequestPairedClientDetails {
        client_slot: ClientSlot,
    },
    Restart,
    FactoryReset,
    RequestTechnicalInformation,
    Unknown {
        opcode: u8,
        payload: Vec<u8>,
    },
}

/// Discriminant of [`CommandBody`], used in errors and the association table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    PairDevice,
    UnpairDevice,
    RequestNickname,
    UpdateNickname,
    RequestState,
    RequestDeviceInformation,
    RequestDeviceSettings,
    UpdateDeviceSettings,
    RequestPresetSlots,
    RequestPresetDetails,
    UpdatePresetDetails,
    DeletePresetDetails,
    StartPreset,
    RequestOutletSettings,
    UpdateOutletSettings,
    OperateOutletControls,
    RequestPairedClientSlots,
    RequestPairedClientDetails,
    Restart,
    FactoryReset,
    RequestTechnicalInformation,
    Unknown,
}

impl CommandBody {
    pub fn kind(&self) -> CommandKind {
        match self {
            CommandBody::PairDevice { .. } => CommandKind::PairDevice,
            CommandBody::UnpairDevice { .. } => CommandKind::UnpairDevice,
            CommandBody::RequestNickname => CommandKind::RequestNickname,
            CommandBody::UpdateNickname { .. } => CommandKind::UpdateNickname,
            CommandBody::RequestState => CommandKind::RequestState,
            CommandBody::RequestDeviceInformation => CommandKind::RequestDeviceInformation,
            CommandBody::RequestDeviceSettings => CommandKind::RequestDeviceSettings,
            CommandBody::UpdateDeviceSettings { .. } => CommandKind::UpdateDeviceSettings,
            CommandBody::RequestPresetSlots => CommandKind::RequestPresetSlots,
            CommandBody::RequestPresetDetails { .. } => CommandKind::RequestPresetDetails,
            CommandBody::UpdatePresetDetails { .. } => CommandKind::UpdatePresetDetails,
            CommandBody::DeletePresetDetails { .. } => CommandKind::DeletePresetDetails,
            CommandBody::StartPreset { .. } => CommandKind::StartPreset,
            CommandBody::RequestOutletSettings { .. } => CommandKind::RequestOutletSettings,
            CommandBody::UpdateOutletSettings { .. } => CommandKind::UpdateOutletSettings,
            CommandBody::OperateOutletControls { .. } => CommandKind::OperateOutletControls,
            CommandBody::RequestPairedClientSlots => CommandKind::RequestPairedClientSlots,
            CommandBody::RequestPairedClientDetails { .. } => {
                CommandKind::RequestPairedClientDetails
            }
            CommandBody::Restart => CommandKind::Restart,
            CommandBody::FactoryReset => CommandKind::FactoryReset,
            CommandBody::RequestTechnicalInformation => CommandKind::RequestTechnicalInformation,
            CommandBody::Unknown { .. } => CommandKind::Unknown,
        }
    }

    /// Whether the command changes water flow and must honour the lockout window
    pub fn is_state_mutating(&self) -> bool {
        matches!(
            self,
            CommandBody::OperateOutletControls { .. }
                | CommandBody::StartPreset { .. }
                | CommandBody::Restart
                | CommandBody::FactoryReset
        )
    }
}

/// An immutable request addressed to one device by one paired client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub device_id: DeviceId,
    pub credentials: Credentials,
    pub body: CommandBody,
}

impl Command {
    pub fn new(device_id: DeviceId, credentials: Credentials, body: CommandBody) -> Self {
        Command {
            device_id,
            credentials,
            body,
        }
    }

    /// Builds a pairing command; it always travels on the reserved pairing slot
    pub fn pair(device_id: DeviceId, secret: ClientSecret, client_name: impl Into<String>) -> Self {
        Command::new(
            device_id,
            Credentials::PAIRING,
            CommandBody::PairDevice {
                secret,
                client_name: client_name.into(),
            },
        )
    }

    pub fn kind(&self) -> CommandKind {
        self.body.kind()
    }

    /// Credentials the frame is actually addressed and checksummed with
    pub fn transmit_credentials(&self) -> Credentials {
        match self.body {
            CommandBody::PairDevice { .. } => Credentials::PAIRING,
            _ => self.credentials,
        }
    }
}
