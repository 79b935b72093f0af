//! Which notification shapes each command may legitimately produce.
//!
//! The wire carries no type tag and no correlation id, so the pairing between
//! an issuing command and its acceptable responses is fixed here rather than
//! inferred from the bytes. Every command may be refused with a generic
//! failure.

use super::command::CommandKind;
use super::notification::NotificationKind;

use NotificationKind as N;

/// Notification kinds accepted in response to `command`, failure excluded
pub fn accepted_kinds(command: CommandKind) -> &'static [NotificationKind] {
    match command {
        CommandKind::PairDevice => &[N::PairSuccess],
        CommandKind::UnpairDevice => &[N::UnpairSuccess],
        CommandKind::RequestNickname => &[N::Nickname],
        CommandKind::RequestState => &[N::DeviceState],
        CommandKind::RequestDeviceInformation => &[N::DeviceInformation],
        CommandKind::RequestDeviceSettings => &[N::DeviceSettings],
        CommandKind::RequestPresetSlots => &[N::PresetSlots],
        CommandKind::RequestPresetDetails => &[N::PresetDetails],
        CommandKind::StartPreset | CommandKind::OperateOutletControls => &[N::ControlsOperated],
        CommandKind::RequestOutletSettings => &[N::OutletSettings],
        CommandKind::RequestPairedClientSlots => &[N::PairedClientSlots],
        CommandKind::RequestPairedClientDetails => &[N::PairedClientDetails],
        CommandKind::RequestTechnicalInformation => &[N::TechnicalInformation],
        CommandKind::UpdateNickname
        | CommandKind::UpdateDeviceSettings
        | CommandKind::UpdatePresetDetails
        | CommandKind::DeletePresetDetails
        | CommandKind::UpdateOutletSettings
        | CommandKind::Restart
        | CommandKind::FactoryReset => &[N::Success],
        CommandKind::Unknown => &[N::Unknown],
    }
}

/// Whether `received` is an acceptable answer to `command`
pub fn accepts(command: CommandKind, received: NotificationKind) -> bool {
    received == NotificationKind::Failure || accepted_kinds(command).contains(&received)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_always_accepted() {
        assert!(accepts(CommandKind::RequestState, N::Failure));
        assert!(accepts(CommandKind::PairDevice, N::Failure));
    }

    #[test]
    fn test_queries_reject_generic_success() {
        assert!(!accepts(CommandKind::RequestState, N::Success));
        assert!(!accepts(CommandKind::RequestPresetSlots, N::Success));
        assert!(accepts(CommandKind::UpdateNickname, N::Success));
    }

    #[test]
    fn test_pairing_special_cases() {
        assert!(accepts(CommandKind::PairDevice, N::PairSuccess));
        assert!(!accepts(CommandKind::PairDevice, N::Success));
        assert!(accepts(CommandKind::UnpairDevice, N::UnpairSuccess));
        assert!(!accepts(CommandKind::UnpairDevice, N::PairSuccess));
    }

    #[test]
    fn test_shared_shapes() {
        assert!(accepts(CommandKind::StartPreset, N::ControlsOperated));
        assert!(accepts(CommandKind::OperateOutletControls, N::ControlsOperated));
        assert!(!accepts(CommandKind::RequestOutletSettings, N::ControlsOperated));
    }
}
