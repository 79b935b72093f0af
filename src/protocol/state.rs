use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use super::command::Outlet;
use super::notification::{Notification, NotificationBody, ReportedState, ValveState};

/// Classified water-flow state of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningState {
    /// No water flowing
    Off,
    /// Water flowing at a requested temperature
    Running,
    /// Running with the active outlet held at its configured minimum
    Cold,
    /// Flow suspended by the device
    Paused,
}

/// Runtime state of one device, driven only by decoded notifications
///
/// Commands merely request transitions; the state changes when the device
/// confirms them through a state or controls notification. A transition into
/// [`RunningState::Off`] arms a lockout window if the previous update was
/// recent, and callers wait it out before issuing further mutating commands.
#[derive(Debug, Clone)]
pub struct DeviceRuntimeState {
    running_state: RunningState,
    last_state_received_at: Option<Instant>,
    locked_out_until: Option<Instant>,
    lockout_duration: Duration,
    /// Minimum temperature per outlet, learned from outlet settings
    outlet_minimums: HashMap<Outlet, f64>,
    /// Last valve snapshot applied
    valve: Option<ValveState>,
}

impl DeviceRuntimeState {
    /// Creates a state machine in the off state with no lockout
    pub fn new(lockout_duration: Duration) -> Self {
        DeviceRuntimeState {
            running_state: RunningState::Off,
            last_state_received_at: None,
            locked_out_until: None,
            lockout_duration,
            outlet_minimums: HashMap::new(),
            valve: None,
        }
    }

    pub fn running_state(&self) -> RunningState {
        self.running_state
    }

    pub fn last_state_received_at(&self) -> Option<Instant> {
        self.last_state_received_at
    }

    pub fn locked_out_until(&self) -> Option<Instant> {
        self.locked_out_until
    }

    pub fn lockout_duration(&self) -> Duration {
        self.lockout_duration
    }

    /// Last valve snapshot received from the device
    pub fn valve(&self) -> Option<&ValveState> {
        self.valve.as_ref()
    }

    /// Records an outlet's configured minimum temperature
    pub fn set_outlet_minimum(&mut self, outlet: Outlet, temperature: f64) {
        self.outlet_minimums.insert(outlet, temperature);
    }

    /// Applies a decoded notification received now
    pub fn apply(&mut self, notification: &Notification) -> Option<RunningState> {
        self.apply_at(notification, Instant::now())
    }

    /// Applies a decoded notification received at `now`
    ///
    /// Returns the new running state if the notification carried one.
    pub fn apply_at(&mut self, notification: &Notification, now: Instant) -> Option<RunningState> {
        match &notification.body {
            NotificationBody::DeviceState(valve) => Some(self.apply_valve(valve, now)),
            NotificationBody::ControlsOperated { valve, .. } => Some(self.apply_valve(valve, now)),
            NotificationBody::OutletSettings(settings) => {
                self.set_outlet_minimum(settings.outlet, settings.minimum_temperature);
                None
            }
            _ => None,
        }
    }

    fn apply_valve(&mut self, valve: &ValveState, now: Instant) -> RunningState {
        let next = self.classify(valve);
        self.transition(next, now);
        self.valve = Some(valve.clone());
        next
    }

    fn classify(&self, valve: &ValveState) -> RunningState {
        match valve.state {
            ReportedState::Off => RunningState::Off,
            ReportedState::Paused => RunningState::Paused,
            ReportedState::Running => {
                let at_minimum = valve
                    .active_outlet()
                    .and_then(|outlet| self.outlet_minimums.get(&outlet))
                    .map_or(false, |minimum| {
                        (valve.target_temperature - minimum).abs() < f64::EPSILON
                    });
                if at_minimum {
                    RunningState::Cold
                } else {
                    RunningState::Running
                }
            }
        }
    }

    /// Moves to `next`, arming the lockout on a transition into off
    pub fn transition(&mut self, next: RunningState, now: Instant) {
        let previous = self.running_state;
        if next == RunningState::Off && previous != RunningState::Off {
            let recent = self
                .last_state_received_at
                .map_or(false, |at| now.saturating_duration_since(at) <= self.lockout_duration * 2);
            if recent {
                let until = now + self.lockout_duration;
                info!(lockout = ?self.lockout_duration, "water stopped; lockout armed");
                self.locked_out_until = Some(until);
            } else {
                debug!("water stopped after a stale update; no lockout");
            }
        }
        if previous != next {
            debug!(?previous, ?next, "running state changed");
        }
        self.running_state = next;
        self.last_state_received_at = Some(now);
    }

    /// Time left in the lockout window at `now`
    pub fn lockout_remaining(&self, now: Instant) -> Option<Duration> {
        self.locked_out_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    pub fn is_locked_out(&self, now: Instant) -> bool {
        self.lockout_remaining(now).is_some()
    }

    /// Sleeps until any active lockout window has lapsed
    pub async fn wait_for_lockout(&self) {
        if let Some(until) = self.locked_out_until {
            if until > Instant::now() {
                debug!("waiting for lockout window before mutating command");
                tokio::time::sleep_until(until).await;
            }
        }
    }
}
