use bytes::Bytes;
use showerlink::protocol::{Command, CommandBody, NotificationBody, Outlet, RunningMode};
use showerlink::transport::loopback::reply;
use showerlink::transport::LoopbackTransport;
use showerlink::{ClientSecret, Config, Credentials, DeviceId, DeviceRuntimeState, Exchanger};

/// Minimal device model answering a handful of opcodes
struct SimulatedShower {
    running: u8,
    target: [u8; 2],
    first_outlet: bool,
    counter: u8,
}

impl SimulatedShower {
    fn valve(&self) -> Vec<u8> {
        let outlet = if self.first_outlet { 0x64 } else { 0x00 };
        vec![
            self.running,
            self.target[0],
            self.target[1],
            self.target[0],
            self.target[1],
            outlet,
            0x00,
            0x03,
            0x84,
            self.counter,
        ]
    }

    fn respond(&mut self, frame: &[u8]) -> Option<Bytes> {
        let payload = &frame[3..frame.len() - 2];
        self.counter = self.counter.wrapping_add(1);
        match frame[1] {
            // pairing: hand out slot 1
            0xEB => reply(frame, &[0x01]),
            0x44 => {
                let mut name = b"Ensuite".to_vec();
                name.resize(16, 0);
                reply(frame, &name)
            }
            0x07 => reply(frame, &self.valve()),
            0x10 => reply(
                frame,
                &[payload[0], 0xB4, 0x00, 0x01, 0xE0, 0x00, 0x00, 0xFA, 0x00, 0x01, 0x90],
            ),
            0x87 => {
                self.running = payload[0];
                self.target = [payload[1], payload[2]];
                self.first_outlet = payload[3] != 0;
                let mut controls = self.valve();
                controls.push(0x00);
                reply(frame, &controls)
            }
            _ => reply(frame, &[0x00]),
        }
    }
}

#[tokio::main]
async fn main() -> showerlink::Result<()> {
    tracing_subscriber::fmt::init();

    let mut shower = SimulatedShower {
        running: 0x00,
        target: [0x01, 0x90],
        first_outlet: false,
        counter: 0,
    };
    let transport = LoopbackTransport::new(move |frame| shower.respond(frame));

    let config = Config::default();
    let mut state = DeviceRuntimeState::new(config.lockout_duration);
    let (exchanger, worker) = Exchanger::spawn(transport, config)?;
    let device = DeviceId::random();

    println!("Pairing with simulated shower {}", device);
    let secret = ClientSecret::random();
    let paired = exchanger.execute(Command::pair(device, secret, "showerlink demo")).await?;
    let slot = match paired.body {
        NotificationBody::PairSuccess { client_slot } => client_slot,
        other => {
            eprintln!("Pairing refused: {:?}", other);
            return Ok(());
        }
    };
    println!("- Assigned client slot {}", slot.get());
    let credentials = Credentials::new(slot, secret);

    let nickname = exchanger
        .execute(Command::new(device, credentials, CommandBody::RequestNickname))
        .await?;
    if let NotificationBody::Nickname { nickname } = &nickname.body {
        println!("- Nickname: {}", nickname);
    }

    let settings = exchanger
        .execute(Command::new(
            device,
            credentials,
            CommandBody::RequestOutletSettings {
                outlet: Outlet::First,
            },
        ))
        .await?;
    state.apply(&settings);
    if let NotificationBody::OutletSettings(outlet) = &settings.body {
        println!(
            "- First outlet: {:.1}C to {:.1}C, at most {}s",
            outlet.minimum_temperature, outlet.maximum_temperature, outlet.maximum_duration_seconds
        );
    }

    let steps = [
        (RunningMode::Running, 38.0, true),
        (RunningMode::Off, 38.0, false),
        (RunningMode::Running, 25.0, true),
    ];
    for (mode, temperature, first_outlet) in steps {
        let body = CommandBody::OperateOutletControls {
            mode,
            target_temperature: temperature,
            first_outlet,
            second_outlet: false,
        };
        if body.is_state_mutating() {
            if let Some(remaining) = state.lockout_remaining(tokio::time::Instant::now()) {
                println!("\nLocked out for another {:.1}s, waiting", remaining.as_secs_f64());
            }
            state.wait_for_lockout().await;
        }

        let notification = exchanger
            .execute(Command::new(device, credentials, body))
            .await?;
        match state.apply(&notification) {
            Some(running) => println!("\nRequested {:?} at {:.1}C -> {:?}", mode, temperature, running),
            None => println!("\nRequested {:?}: device answered {:?}", mode, notification.body),
        }
    }

    drop(exchanger);
    let transport = worker
        .await
        .map_err(|e| showerlink::Error::internal(e.to_string()))?;
    println!("\nDone: {} chunks written", transport.write_log().chunks().len());
    Ok(())
}
