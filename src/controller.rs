// Profile controller: apply/toggle orchestration and the deferred settle
// check that re-reads device state after a change.
// Consumes prefs: autoprofile.settle_delay_ms.
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::applier::{ApplyReport, ProfileApplier};
use crate::brightness::{self, BrightnessStrategy};
use crate::error::Result;
use crate::gateway::{CapabilityTier, DeviceGateway};
use crate::prefs::{PrefSpec, keys};
use crate::profile::{BrightnessRange, DeviceProfile, Percent};
use crate::status;

/// Wait before re-reading device state after a change, absorbing rapid
/// successive writes into a single settle point.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Clock abstraction to make settle scheduling deterministic in unit tests.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Minimal fake clock for deterministic settle-timer unit tests.
#[cfg(test)]
#[derive(Clone)]
pub struct FakeClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
}

#[cfg(test)]
impl FakeClock {
    pub fn new(base: Instant) -> Self {
        Self {
            base,
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut offset) = self.offset.lock() {
            *offset = offset.saturating_add(by);
        }
    }
}

#[cfg(test)]
impl Clock for FakeClock {
    fn now(&self) -> Instant {
        let offset = self.offset.lock().map(|d| *d).unwrap_or(Duration::ZERO);
        self.base + offset
    }
}

/// Read the currently observable settings through the gateway. Ring volume
/// and wifi have no read path on the capability surface and stay unset.
pub fn effective_profile(gateway: &dyn DeviceGateway) -> DeviceProfile {
    DeviceProfile {
        ringer: Some(gateway.ringer_mode()),
        vibrate: Some(gateway.vibrate_mode()),
        ring_volume: None,
        wifi: None,
        brightness: Some(Percent::clamped(brightness::current_brightness_percent(
            gateway,
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckState {
    Idle,
    Scheduled(Instant),
}

/// Orchestrates profile application and the settle-then-display cycle.
///
/// The pending re-check is a two-state machine: `request_check` moves
/// Idle to Scheduled, and the scheduled check fires exactly once when the
/// settle delay elapses. A request arriving while Scheduled leaves the
/// running timer untouched; only one timer instance ever exists.
pub struct ProfileController<C: Clock> {
    clock: C,
    settle_delay: Duration,
    applier: ProfileApplier,
    brightness: BrightnessStrategy,
    state: CheckState,
    last_seen: Option<DeviceProfile>,
}

impl<C: Clock> ProfileController<C> {
    pub fn new(clock: C, tier: CapabilityTier, settle_delay: Duration) -> Self {
        Self {
            clock,
            settle_delay,
            applier: ProfileApplier::new(tier),
            brightness: BrightnessStrategy::new(tier),
            state: CheckState::Idle,
            last_seen: None,
        }
    }

    /// Apply a target profile synchronously, then schedule the settle check.
    pub fn apply_now(
        &mut self,
        gateway: &mut dyn DeviceGateway,
        target: &DeviceProfile,
    ) -> ApplyReport {
        let report = self.applier.apply(gateway, target);
        self.request_check();
        report
    }

    /// Flip brightness to the opposite configured bound and schedule the
    /// settle check. Returns the achieved percent, which can differ from the
    /// requested bound once the raw floor is applied.
    pub fn toggle_brightness(
        &mut self,
        gateway: &mut dyn DeviceGateway,
        range: BrightnessRange,
    ) -> Result<Percent> {
        let current = brightness::current_brightness_percent(gateway);
        let target = brightness::toggle_percent(current, range);
        let fraction = self
            .brightness
            .write_brightness(gateway, Percent::clamped(target))?;
        self.request_check();
        Ok(Percent::clamped((fraction * 100.0).round() as u8))
    }

    /// Ask for a deferred re-check. Returns false when a check was already
    /// scheduled, in which case the existing timer keeps running unchanged.
    pub fn request_check(&mut self) -> bool {
        match self.state {
            CheckState::Idle => {
                self.state = CheckState::Scheduled(self.clock.now() + self.settle_delay);
                true
            }
            CheckState::Scheduled(_) => false,
        }
    }

    /// Fire the scheduled check if its settle delay has elapsed, observing
    /// device state as of now (not as of the request). Fires at most once
    /// per scheduled timer.
    pub fn fire_due(&mut self, gateway: &dyn DeviceGateway) -> Option<&DeviceProfile> {
        let CheckState::Scheduled(fire_at) = self.state else {
            return None;
        };
        if self.clock.now() < fire_at {
            return None;
        }
        self.state = CheckState::Idle;
        self.last_seen = Some(effective_profile(gateway));
        self.last_seen.as_ref()
    }

    /// Remaining wait until the scheduled check is due; `None` while Idle.
    pub fn next_wakeup_delay(&self) -> Option<Duration> {
        match self.state {
            CheckState::Idle => None,
            CheckState::Scheduled(fire_at) => {
                Some(fire_at.saturating_duration_since(self.clock.now()))
            }
        }
    }

    pub fn is_scheduled(&self) -> bool {
        matches!(self.state, CheckState::Scheduled(_))
    }

    pub fn last_observed(&self) -> Option<&DeviceProfile> {
        self.last_seen.as_ref()
    }

    /// Human-readable summary of the last observed effective profile.
    pub fn current_status_text(&self) -> String {
        match &self.last_seen {
            Some(profile) => status::status_text(profile),
            None => status::status_text(&DeviceProfile::default()),
        }
    }
}

/// Work item for the controller's event loop. Preference-change callbacks and
/// external broadcast triggers both arrive as `Check`; the loop treats the
/// two sources identically.
#[derive(Debug, Clone)]
pub enum Trigger {
    Check,
    Apply(DeviceProfile),
    ToggleBrightness(BrightnessRange),
    Shutdown,
}

/// Cloneable handle used by trigger sources to request a re-check.
pub type CheckNotify = Arc<dyn Fn() + Send + Sync>;

/// Build a notify handle feeding the given trigger channel.
pub fn check_notify(triggers: &mpsc::Sender<Trigger>) -> CheckNotify {
    let triggers = Arc::new(Mutex::new(triggers.clone()));
    Arc::new(move || {
        if let Ok(triggers) = triggers.lock() {
            let _ = triggers.send(Trigger::Check);
        }
    })
}

/// Single-threaded event loop owning the controller and the gateway. Sleeps
/// until the next settle deadline unless a trigger arrives sooner; exits when
/// every trigger sender is dropped or a `Shutdown` arrives.
pub fn run_loop<C: Clock>(
    mut controller: ProfileController<C>,
    gateway: &mut dyn DeviceGateway,
    triggers: &mpsc::Receiver<Trigger>,
) {
    loop {
        let message = match controller.next_wakeup_delay() {
            Some(delay) => match triggers.recv_timeout(delay) {
                Ok(trigger) => Some(trigger),
                Err(mpsc::RecvTimeoutError::Timeout) => None,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            },
            None => match triggers.recv() {
                Ok(trigger) => Some(trigger),
                Err(_) => break,
            },
        };

        match message {
            Some(Trigger::Check) => {
                controller.request_check();
            }
            Some(Trigger::Apply(profile)) => {
                let report = controller.apply_now(gateway, &profile);
                if report.all_succeeded() {
                    log::info!("applied profile: {report}");
                } else {
                    log::warn!("profile applied with failures: {report}");
                }
            }
            Some(Trigger::ToggleBrightness(range)) => {
                match controller.toggle_brightness(gateway, range) {
                    Ok(percent) => log::info!("brightness changed to {percent}"),
                    Err(err) => log::error!("brightness toggle failed: {err}"),
                }
            }
            Some(Trigger::Shutdown) => break,
            None => {}
        }

        if controller.fire_due(gateway).is_some() {
            log::info!("{}", controller.current_status_text());
        }
    }
}

inventory::submit! {
    PrefSpec {
        key: keys::SETTLE_DELAY_MS,
        default: "1000",
    }
}
