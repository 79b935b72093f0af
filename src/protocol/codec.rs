use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::Encoder;
use tracing::warn;

use crate::core::{ClientSlot, Error, Result, SlotSet, FRAME_HEADER_LEN};
use crate::util::{self, with_checksum};
use super::command::{Command, CommandBody, CommandKind, DeviceSettings, Outlet, PresetDetails, RunningMode};
use super::notification::{
    DeviceInformation, Notification, NotificationBody, OutletSettings, ReportedState,
    TechnicalInformation, ValveState,
};
use super::*;

/// Encodes commands into checksummed wire frames
///
/// Outbound frames are `[client_slot, opcode, length, ...payload, crc_hi, crc_lo]`.
#[derive(Clone, Debug, Default)]
pub struct CommandCodec;

impl CommandCodec {
    /// Creates a new command codec
    pub fn new() -> Self {
        CommandCodec
    }
}

impl<'a> Encoder<&'a Command> for CommandCodec {
    type Error = Error;

    fn encode(&mut self, item: &'a Command, dst: &mut BytesMut) -> Result<()> {
        let credentials = item.transmit_credentials();
        let (opcode, payload) = encode_payload(&item.body, credentials.slot)?;
        let length = u8::try_from(payload.len())
            .map_err(|_| Error::invalid_command(format!("payload of {} bytes", payload.len())))?;

        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
        frame.push(credentials.slot.get());
        frame.push(opcode);
        frame.push(length);
        frame.extend_from_slice(&payload);

        dst.extend_from_slice(&with_checksum(&frame, &credentials.secret));
        Ok(())
    }
}

/// Encodes a command into one complete checksummed frame
pub fn encode(command: &Command) -> Result<Bytes> {
    let mut dst = BytesMut::new();
    CommandCodec::new().encode(command, &mut dst)?;
    Ok(dst.freeze())
}

/// Splits a frame into transport writes of at most `chunk_size` bytes
pub fn chunk(frame: &Bytes, chunk_size: usize) -> Vec<Bytes> {
    let chunk_size = chunk_size.max(1);
    (0..frame.len())
        .step_by(chunk_size)
        .map(|start| frame.slice(start..(start + chunk_size).min(frame.len())))
        .collect()
}

fn running_byte(mode: RunningMode) -> u8 {
    match mode {
        RunningMode::Off => RUNNING_OFF,
        RunningMode::Running => RUNNING_ON,
        RunningMode::Paused => RUNNING_PAUSED,
    }
}

fn outlet_byte(on: bool) -> u8 {
    if on {
        OUTLET_ON
    } else {
        0
    }
}

fn preset_outlet_flag(outlet: Outlet) -> u8 {
    match outlet {
        Outlet::First => 0x01,
        Outlet::Second => 0x02,
    }
}

fn settings_bytes(settings: &DeviceSettings) -> [u8; 4] {
    let mut controller = 0u8;
    if settings.standby_lighting_enabled {
        controller |= 0x01;
    }
    if settings.wireless_remote_enabled {
        controller |= 0x02;
    }
    let mut outlets = 0u8;
    if settings.first_outlet_enabled {
        outlets |= 0x01;
    }
    if settings.second_outlet_enabled {
        outlets |= 0x02;
    }
    [settings.default_preset_slot, controller, outlets, 0]
}

fn preset_bytes(details: &PresetDetails, client_slot: ClientSlot) -> Result<Vec<u8>> {
    let mut payload = Vec::with_capacity(8 + PRESET_NAME_WIDTH);
    payload.push(client_slot.get());
    payload.push(details.preset_slot);
    payload.push(util::encode_preset_temperature(details.target_temperature)?);
    payload.push(details.flow_rate_max);
    payload.push(util::encode_duration(details.duration_seconds)?);
    payload.push(preset_outlet_flag(details.outlet));
    payload.extend_from_slice(&[0, 0]);
    payload.extend_from_slice(&util::pad_string(&details.name, PRESET_NAME_WIDTH)?);
    Ok(payload)
}

/// Maps a command body to its opcode and payload
fn encode_payload(body: &CommandBody, client_slot: ClientSlot) -> Result<(u8, Vec<u8>)> {
    let encoded = match body {
        CommandBody::PairDevice { secret, client_name } => {
            let mut payload = secret.as_bytes().to_vec();
            payload.extend_from_slice(&util::pad_string(client_name, CLIENT_NAME_WIDTH)?);
            (opcode::PAIRING, payload)
        }
        CommandBody::UnpairDevice { client_slot } => (opcode::PAIRING, vec![client_slot.get()]),
        CommandBody::RequestNickname => (opcode::REQUEST_NICKNAME, vec![]),
        CommandBody::UpdateNickname { nickname } => {
            (opcode::UPDATE_NICKNAME, util::pad_string(nickname, NICKNAME_WIDTH)?)
        }
        CommandBody::RequestState => (opcode::REQUEST_STATE, vec![]),
        CommandBody::RequestDeviceInformation => (opcode::REQUEST_DEVICE_INFORMATION, vec![]),
        CommandBody::RequestDeviceSettings => (opcode::REQUEST_DEVICE_SETTINGS, vec![]),
        CommandBody::UpdateDeviceSettings { settings } => {
            (opcode::UPDATE_DEVICE_SETTINGS, settings_bytes(settings).to_vec())
        }
        CommandBody::RequestPresetSlots => (opcode::PRESETS, vec![]),
        CommandBody::RequestPresetDetails { preset_slot } => {
            let selector = PRESET_SELECTOR_BASE
                .checked_add(*preset_slot)
                .ok_or_else(|| Error::invalid_command(format!("preset slot {}", preset_slot)))?;
            (opcode::PRESETS, vec![selector])
        }
        CommandBody::UpdatePresetDetails { details } => {
            (opcode::UPDATE_PRESET_DETAILS, preset_bytes(details, client_slot)?)
        }
        CommandBody::DeletePresetDetails { preset_slot } => {
            (opcode::DELETE_PRESET_DETAILS, vec![*preset_slot])
        }
        CommandBody::StartPreset { preset_slot } => (opcode::START_PRESET, vec![*preset_slot]),
        CommandBody::RequestOutletSettings { outlet } => {
            (opcode::REQUEST_OUTLET_SETTINGS, vec![outlet.slot()])
        }
        CommandBody::UpdateOutletSettings {
            outlet,
            maximum_duration_seconds,
            maximum_temperature,
        } => {
            let mut payload = vec![outlet.slot(), util::encode_duration(*maximum_duration_seconds)?];
            payload.extend_from_slice(&util::encode_temperature(*maximum_temperature)?);
            (opcode::UPDATE_OUTLET_SETTINGS, payload)
        }
        CommandBody::OperateOutletControls {
            mode,
            target_temperature,
            first_outlet,
            second_outlet,
        } => {
            let mut payload = vec![running_byte(*mode)];
            payload.extend_from_slice(&util::encode_temperature(*target_temperature)?);
            payload.push(outlet_byte(*first_outlet));
            payload.push(outlet_byte(*second_outlet));
            (opcode::OPERATE_OUTLET_CONTROLS, payload)
        }
        CommandBody::RequestPairedClientSlots => (opcode::PAIRED_CLIENTS, vec![]),
        CommandBody::RequestPairedClientDetails { client_slot } => {
            (opcode::PAIRED_CLIENTS, vec![CLIENT_SELECTOR_BASE + client_slot.get()])
        }
        CommandBody::Restart => (opcode::SYSTEM, vec![SYSTEM_RESTART]),
        CommandBody::FactoryReset => (opcode::SYSTEM, vec![SYSTEM_FACTORY_RESET]),
        CommandBody::RequestTechnicalInformation => {
            (opcode::REQUEST_TECHNICAL_INFORMATION, vec![])
        }
        CommandBody::Unknown { opcode, payload } => (*opcode, payload.clone()),
    };
    Ok(encoded)
}

/// Decodes a reassembled frame in the context of the command that triggered it
///
/// The wire format reuses payload shapes across commands and carries no type
/// tag, so dispatch is on payload length first and the issuing command second.
/// Combinations that match no known shape are logged and yield `None`.
pub fn decode(frame: &[u8], issuing: &Command) -> Option<Notification> {
    if frame.len() < FRAME_HEADER_LEN || frame.len() != frame[2] as usize + FRAME_HEADER_LEN {
        warn!(len = frame.len(), "frame length does not match its header");
        return None;
    }
    let payload = &frame[FRAME_HEADER_LEN..];

    let body = decode_body(payload, &issuing.body);
    if body.is_none() {
        warn!(
            command = ?issuing.kind(),
            len = payload.len(),
            payload = ?payload,
            "no notification shape for this command and payload length"
        );
    }
    body.map(|body| Notification::new(issuing.device_id, body))
}

fn decode_body(payload: &[u8], issuing: &CommandBody) -> Option<NotificationBody> {
    if let CommandBody::Unknown { .. } = issuing {
        return Some(NotificationBody::Unknown {
            payload: payload.to_vec(),
        });
    }

    let kind = issuing.kind();
    match payload.len() {
        1 => decode_result(payload[0], issuing),
        2 => {
            let slots = SlotSet(u16::from_be_bytes([payload[0], payload[1]]));
            match kind {
                CommandKind::RequestPresetSlots => Some(NotificationBody::PresetSlots { slots }),
                CommandKind::RequestPairedClientSlots => {
                    Some(NotificationBody::PairedClientSlots { slots })
                }
                _ => None,
            }
        }
        4 if kind == CommandKind::RequestDeviceSettings => {
            Some(NotificationBody::DeviceSettings(decode_settings(payload)))
        }
        6 if kind == CommandKind::RequestDeviceInformation => {
            Some(NotificationBody::DeviceInformation(DeviceInformation {
                device_type: payload[0],
                outlet_count: payload[1],
                preset_capacity: payload[2],
                client_capacity: payload[3],
                firmware_major: payload[4],
                firmware_minor: payload[5],
            }))
        }
        10 if kind == CommandKind::RequestState => {
            decode_valve(payload).map(NotificationBody::DeviceState)
        }
        11 => match kind {
            CommandKind::OperateOutletControls | CommandKind::StartPreset => {
                decode_valve(&payload[..10]).map(|valve| NotificationBody::ControlsOperated {
                    valve,
                    preset_slot: payload[10],
                })
            }
            CommandKind::RequestOutletSettings => {
                decode_outlet_settings(payload).map(NotificationBody::OutletSettings)
            }
            _ => None,
        },
        16 => match kind {
            CommandKind::RequestNickname => Some(NotificationBody::Nickname {
                nickname: util::unpad_string(payload),
            }),
            CommandKind::RequestTechnicalInformation => {
                let word = |i: usize| u16::from_be_bytes([payload[i], payload[i + 1]]);
                Some(NotificationBody::TechnicalInformation(TechnicalInformation {
                    valve_type: word(0),
                    valve_software_version: word(2),
                    ui_type: word(4),
                    ui_software_version: word(6),
                    bluetooth_software_version: word(8),
                }))
            }
            _ => None,
        },
        20 => match issuing {
            CommandBody::RequestPairedClientDetails { client_slot } => {
                Some(NotificationBody::PairedClientDetails {
                    client_slot: *client_slot,
                    name: util::unpad_string(payload),
                })
            }
            _ => None,
        },
        24 if kind == CommandKind::RequestPresetDetails => {
            decode_preset(payload).map(NotificationBody::PresetDetails)
        }
        _ => None,
    }
}

/// One-byte payloads: generic result, except pairing and unpairing
///
/// Values below 0x80 are read as success. That boundary comes from field
/// observation and is not guaranteed across firmware versions.
fn decode_result(value: u8, issuing: &CommandBody) -> Option<NotificationBody> {
    if value >= FAILURE_THRESHOLD {
        return Some(NotificationBody::Failure { code: value });
    }
    match issuing {
        CommandBody::PairDevice { .. } => ClientSlot::new(value)
            .ok()
            .map(|client_slot| NotificationBody::PairSuccess { client_slot }),
        CommandBody::UnpairDevice { client_slot } => Some(NotificationBody::UnpairSuccess {
            client_slot: *client_slot,
        }),
        _ => Some(NotificationBody::Success),
    }
}

fn decode_settings(payload: &[u8]) -> DeviceSettings {
    DeviceSettings {
        default_preset_slot: payload[0],
        standby_lighting_enabled: payload[1] & 0x01 != 0,
        wireless_remote_enabled: payload[1] & 0x02 != 0,
        first_outlet_enabled: payload[2] & 0x01 != 0,
        second_outlet_enabled: payload[2] & 0x02 != 0,
    }
}

fn decode_valve(payload: &[u8]) -> Option<ValveState> {
    let state = match payload[0] {
        RUNNING_OFF => ReportedState::Off,
        RUNNING_ON => ReportedState::Running,
        RUNNING_PAUSED => ReportedState::Paused,
        other => {
            warn!(state = other, "unrecognised running state byte");
            return None;
        }
    };
    Some(ValveState {
        state,
        target_temperature: util::decode_temperature([payload[1], payload[2]]),
        actual_temperature: util::decode_temperature([payload[3], payload[4]]),
        first_outlet: payload[5] != 0,
        second_outlet: payload[6] != 0,
        remaining_seconds: u16::from_be_bytes([payload[7], payload[8]]),
        update_counter: payload[9],
    })
}

fn decode_outlet_settings(payload: &[u8]) -> Option<OutletSettings> {
    Some(OutletSettings {
        outlet: Outlet::from_slot(payload[0])?,
        maximum_duration_seconds: util::decode_duration(payload[1]),
        maximum_temperature: util::decode_temperature([payload[3], payload[4]]),
        minimum_temperature: util::decode_temperature([payload[6], payload[7]]),
        threshold_temperature: util::decode_temperature([payload[9], payload[10]]),
    })
}

fn decode_preset(payload: &[u8]) -> Option<PresetDetails> {
    let outlet = match payload[5] {
        0x01 => Outlet::First,
        0x02 => Outlet::Second,
        other => {
            warn!(flag = other, "unrecognised preset outlet flag");
            return None;
        }
    };
    Some(PresetDetails {
        preset_slot: payload[1],
        name: util::unpad_string(&payload[8..8 + PRESET_NAME_WIDTH]),
        outlet,
        target_temperature: util::decode_preset_temperature(payload[2]),
        duration_seconds: util::decode_duration(payload[4]),
        flow_rate_max: payload[3],
    })
}

/// Builds an inbound frame `[0x40 + slot, 0x01, len, ...payload]`
///
/// Used by the loopback transport to play the device side. Returns `None`
/// when the payload is too long for the one-byte length field.
pub fn notification_frame(slot: ClientSlot, payload: &[u8]) -> Option<Bytes> {
    let length = u8::try_from(payload.len()).ok()?;
    let mut frame = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.put_u8(slot.notification_marker());
    frame.put_u8(crate::core::NOTIFICATION_STATUS);
    frame.put_u8(length);
    frame.extend_from_slice(payload);
    Some(frame.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ClientSecret, Credentials, DeviceId};
    use crate::util::crc16;

    fn credentials() -> Credentials {
        Credentials::new(ClientSlot::new(1).unwrap(), ClientSecret([0x11, 0x22, 0x33, 0x44]))
    }

    fn command(body: CommandBody) -> Command {
        Command::new(DeviceId([7; 16]), credentials(), body)
    }

    fn respond(body: CommandBody, payload: &[u8]) -> Option<NotificationBody> {
        let command = command(body);
        let frame = notification_frame(command.transmit_credentials().slot, payload).unwrap();
        decode(&frame, &command).map(|n| n.body)
    }

    /// Payload of an encoded frame, header and checksum stripped
    fn payload_of(frame: &Bytes) -> Vec<u8> {
        frame[FRAME_HEADER_LEN..frame.len() - 2].to_vec()
    }

    fn warm_bath() -> PresetDetails {
        PresetDetails {
            preset_slot: 1,
            name: "Warm Bath".to_string(),
            outlet: Outlet::First,
            target_temperature: 45.0,
            duration_seconds: 1220,
            flow_rate_max: 100,
        }
    }

    #[test]
    fn test_encode_request_state() {
        let frame = encode(&command(CommandBody::RequestState)).unwrap();
        assert_eq!(&frame[..3], &[0x01, opcode::REQUEST_STATE, 0x00]);
        let crc = crc16(&frame[..3], &credentials().secret);
        assert_eq!(&frame[3..], &crc.to_be_bytes());
    }

    #[test]
    fn test_encode_preset_update() {
        let frame = encode(&command(CommandBody::UpdatePresetDetails {
            details: warm_bath(),
        }))
        .unwrap();
        assert_eq!(&frame[..3], &[0x01, opcode::UPDATE_PRESET_DETAILS, 24]);

        let payload = payload_of(&frame);
        assert_eq!(payload.len(), 24);
        assert_eq!(payload[0], 0x01);
        assert_eq!(payload[1], 1);
        assert_eq!(payload[2], 0xC2);
        assert_eq!(payload[3], 100);
        assert_eq!(payload[4], 0x7A);
        assert_eq!(payload[5], 0x01);
        assert_eq!(&payload[6..8], &[0, 0]);
        assert_eq!(&payload[8..17], b"Warm Bath");
        assert!(payload[17..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_pairing_frame_uses_reserved_slot_and_secret() {
        let mut pair = Command::pair(DeviceId([7; 16]), ClientSecret([1, 2, 3, 4]), "Kitchen iPad");
        pair.credentials = credentials();
        let frame = encode(&pair).unwrap();

        assert_eq!(&frame[..3], &[0x00, opcode::PAIRING, 24]);
        assert_eq!(&frame[3..7], &[1, 2, 3, 4]);
        assert_eq!(&frame[7..19], b"Kitchen iPad");
        let body_end = frame.len() - 2;
        let crc = crc16(&frame[..body_end], &ClientSecret::PAIRING);
        assert_eq!(&frame[body_end..], &crc.to_be_bytes());
    }

    #[test]
    fn test_encode_outlet_controls() {
        let frame = encode(&command(CommandBody::OperateOutletControls {
            mode: RunningMode::Running,
            target_temperature: 38.5,
            first_outlet: false,
            second_outlet: true,
        }))
        .unwrap();
        assert_eq!(payload_of(&frame), vec![RUNNING_ON, 0x01, 0x81, 0x00, OUTLET_ON]);
    }

    #[test]
    fn test_encode_selectors() {
        let frame = encode(&command(CommandBody::RequestPresetDetails { preset_slot: 3 })).unwrap();
        assert_eq!(payload_of(&frame), vec![0x43]);

        let frame = encode(&command(CommandBody::RequestPairedClientDetails {
            client_slot: ClientSlot::new(2).unwrap(),
        }))
        .unwrap();
        assert_eq!(payload_of(&frame), vec![0x12]);
    }

    #[test]
    fn test_encode_rejects_oversized_name() {
        let mut details = warm_bath();
        details.name = "A name far too long".to_string();
        let result = encode(&command(CommandBody::UpdatePresetDetails { details }));
        assert!(matches!(result, Err(Error::InvalidCommand(_))));
    }

    #[test]
    fn test_codec_trait_appends_frames() {
        let mut codec = CommandCodec::new();
        let mut dst = BytesMut::new();
        codec.encode(&command(CommandBody::RequestState), &mut dst).unwrap();
        codec.encode(&command(CommandBody::RequestNickname), &mut dst).unwrap();
        assert_eq!(dst.len(), 10);
        assert_eq!(dst[6], opcode::REQUEST_NICKNAME);
    }

    #[test]
    fn test_chunking() {
        let frame = Bytes::from((0..47u8).collect::<Vec<_>>());
        let chunks = chunk(&frame, 20);
        assert_eq!(chunks.iter().map(|c| c.len()).collect::<Vec<_>>(), vec![20, 20, 7]);
        assert_eq!(chunks.concat(), frame.to_vec());
        assert!(chunk(&Bytes::new(), 20).is_empty());
    }

    #[test]
    fn test_decode_generic_result() {
        assert_eq!(
            respond(CommandBody::UpdateNickname { nickname: "Loft".into() }, &[0x00]),
            Some(NotificationBody::Success)
        );
        assert_eq!(
            respond(CommandBody::Restart, &[0x80]),
            Some(NotificationBody::Failure { code: 0x80 })
        );
    }

    #[test]
    fn test_decode_unpair_carries_target_slot() {
        let target = ClientSlot::new(5).unwrap();
        assert_eq!(
            respond(CommandBody::UnpairDevice { client_slot: target }, &[0x00]),
            Some(NotificationBody::UnpairSuccess { client_slot: target })
        );
    }

    #[test]
    fn test_decode_pair_carries_assigned_slot() {
        let pair = Command::pair(DeviceId([7; 16]), ClientSecret([1, 2, 3, 4]), "Phone");
        let frame = notification_frame(ClientSlot::PAIRING, &[0x04]).unwrap();
        assert_eq!(
            decode(&frame, &pair).map(|n| n.body),
            Some(NotificationBody::PairSuccess {
                client_slot: ClientSlot::new(4).unwrap()
            })
        );
        let frame = notification_frame(ClientSlot::PAIRING, &[0x90]).unwrap();
        assert_eq!(
            decode(&frame, &pair).map(|n| n.body),
            Some(NotificationBody::Failure { code: 0x90 })
        );
    }

    #[test]
    fn test_decode_eleven_bytes_depends_on_command() {
        let payload = [RUNNING_ON, 0x01, 0x86, 0x01, 0x80, OUTLET_ON, 0, 0x02, 0x58, 7, 2];
        let decoded = respond(CommandBody::StartPreset { preset_slot: 2 }, &payload);
        match decoded {
            Some(NotificationBody::ControlsOperated { valve, preset_slot }) => {
                assert_eq!(valve.state, ReportedState::Running);
                assert_eq!(valve.target_temperature, 39.0);
                assert_eq!(valve.actual_temperature, 38.4);
                assert!(valve.first_outlet);
                assert!(!valve.second_outlet);
                assert_eq!(valve.remaining_seconds, 600);
                assert_eq!(valve.update_counter, 7);
                assert_eq!(preset_slot, 2);
            }
            other => panic!("Expected ControlsOperated, got {:?}", other),
        }

        let settings = [0x01, 90, 0, 0x01, 0xE0, 0, 0x00, 0xFA, 0, 0x01, 0x90];
        match respond(CommandBody::RequestOutletSettings { outlet: Outlet::Second }, &settings) {
            Some(NotificationBody::OutletSettings(settings)) => {
                assert_eq!(settings.outlet, Outlet::Second);
                assert_eq!(settings.maximum_duration_seconds, 900);
                assert_eq!(settings.maximum_temperature, 48.0);
                assert_eq!(settings.minimum_temperature, 25.0);
                assert_eq!(settings.threshold_temperature, 40.0);
            }
            other => panic!("Expected OutletSettings, got {:?}", other),
        }

        assert_eq!(respond(CommandBody::RequestState, &payload), None);
        assert_eq!(respond(CommandBody::RequestNickname, &payload), None);
    }

    #[test]
    fn test_decode_state() {
        let payload = [RUNNING_PAUSED, 0x01, 0x86, 0x01, 0x80, 0, OUTLET_ON, 0x00, 0x1E, 3];
        match respond(CommandBody::RequestState, &payload) {
            Some(NotificationBody::DeviceState(valve)) => {
                assert_eq!(valve.state, ReportedState::Paused);
                assert!(valve.second_outlet);
                assert_eq!(valve.remaining_seconds, 30);
            }
            other => panic!("Expected DeviceState, got {:?}", other),
        }

        let mut bad = payload;
        bad[0] = 0x09;
        assert_eq!(respond(CommandBody::RequestState, &bad), None);
    }

    #[test]
    fn test_decode_slot_sets() {
        assert_eq!(
            respond(CommandBody::RequestPresetSlots, &[0x00, 0b0000_0101]),
            Some(NotificationBody::PresetSlots { slots: SlotSet(0b101) })
        );
        assert_eq!(
            respond(CommandBody::RequestPairedClientSlots, &[0x00, 0x03]),
            Some(NotificationBody::PairedClientSlots { slots: SlotSet(0x03) })
        );
        assert_eq!(respond(CommandBody::RequestState, &[0x00, 0x03]), None);
    }

    #[test]
    fn test_decode_technical_information() {
        let payload = [0, 1, 0, 2, 0, 3, 0, 4, 0, 5, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            respond(CommandBody::RequestTechnicalInformation, &payload),
            Some(NotificationBody::TechnicalInformation(TechnicalInformation {
                valve_type: 1,
                valve_software_version: 2,
                ui_type: 3,
                ui_software_version: 4,
                bluetooth_software_version: 5,
            }))
        );
    }

    #[test]
    fn test_decode_device_information() {
        assert_eq!(
            respond(CommandBody::RequestDeviceInformation, &[1, 2, 30, 8, 3, 12]),
            Some(NotificationBody::DeviceInformation(DeviceInformation {
                device_type: 1,
                outlet_count: 2,
                preset_capacity: 30,
                client_capacity: 8,
                firmware_major: 3,
                firmware_minor: 12,
            }))
        );
    }

    #[test]
    fn test_decode_paired_client_details() {
        let target = ClientSlot::new(2).unwrap();
        let name = util::pad_string("Hallway Tablet", CLIENT_NAME_WIDTH).unwrap();
        assert_eq!(
            respond(CommandBody::RequestPairedClientDetails { client_slot: target }, &name),
            Some(NotificationBody::PairedClientDetails {
                client_slot: target,
                name: "Hallway Tablet".to_string(),
            })
        );
    }

    #[test]
    fn test_decode_unknown_command_passes_payload() {
        let body = CommandBody::Unknown {
            opcode: 0x99,
            payload: vec![],
        };
        assert_eq!(
            respond(body, &[1, 2, 3]),
            Some(NotificationBody::Unknown { payload: vec![1, 2, 3] })
        );
    }

    #[test]
    fn test_notification_frame_length_limit() {
        let slot = ClientSlot::new(3).unwrap();
        let frame = notification_frame(slot, &[0xAB; 255]).unwrap();
        assert_eq!(&frame[..3], &[0x43, 0x01, 0xFF]);
        assert_eq!(frame.len(), 258);
        assert!(notification_frame(slot, &[0xAB; 256]).is_none());
    }

    #[test]
    fn test_decode_rejects_inconsistent_length() {
        let command = command(CommandBody::RequestState);
        assert!(decode(&[0x41, 0x01, 0x05, 0x00], &command).is_none());
        assert!(decode(&[0x41, 0x01], &command).is_none());
    }

    #[test]
    fn test_preset_round_trip_quantizes() {
        let mut details = warm_bath();
        details.target_temperature = 38.26;
        details.duration_seconds = 1224;
        let frame = encode(&command(CommandBody::UpdatePresetDetails {
            details: details.clone(),
        }))
        .unwrap();

        let decoded = respond(CommandBody::RequestPresetDetails { preset_slot: 1 }, &payload_of(&frame));
        match decoded {
            Some(NotificationBody::PresetDetails(read)) => {
                assert_eq!(read.preset_slot, details.preset_slot);
                assert_eq!(read.name, details.name);
                assert_eq!(read.outlet, details.outlet);
                assert_eq!(read.flow_rate_max, details.flow_rate_max);
                assert!((read.target_temperature - 38.3).abs() < 1e-9);
                assert_eq!(read.duration_seconds, 1220);
            }
            other => panic!("Expected PresetDetails, got {:?}", other),
        }
    }

    #[test]
    fn test_settings_and_nickname_round_trip() {
        let settings = DeviceSettings {
            default_preset_slot: 2,
            standby_lighting_enabled: false,
            wireless_remote_enabled: true,
            first_outlet_enabled: true,
            second_outlet_enabled: false,
        };
        let frame = encode(&command(CommandBody::UpdateDeviceSettings { settings })).unwrap();
        assert_eq!(
            respond(CommandBody::RequestDeviceSettings, &payload_of(&frame)),
            Some(NotificationBody::DeviceSettings(settings))
        );

        let frame = encode(&command(CommandBody::UpdateNickname {
            nickname: "Ensuite".into(),
        }))
        .unwrap();
        assert_eq!(
            respond(CommandBody::RequestNickname, &payload_of(&frame)),
            Some(NotificationBody::Nickname {
                nickname: "Ensuite".into()
            })
        );
    }
}
