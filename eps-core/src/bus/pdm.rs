//! Switched PDM output with an auto-off timer.

use crate::SimTime;

use super::PowerChannels;

/// Timer limit that permanently disables a switch.
pub const TIMER_LIMIT_DISABLED: u8 = 0x00;
/// Timer limit that never turns a switch off.
pub const TIMER_LIMIT_UNLIMITED: u8 = 0xff;
/// Timer limits and values are counted in 30 second steps.
pub const TIMER_STEP_MS: SimTime = 30_000;

/// Behaviour selected by a switch's timer limit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TimerMode {
    Disabled,
    Unlimited,
    Timed(u8),
}

impl TimerMode {
    #[must_use]
    pub const fn from_limit(limit: u8) -> Self {
        match limit {
            TIMER_LIMIT_DISABLED => TimerMode::Disabled,
            TIMER_LIMIT_UNLIMITED => TimerMode::Unlimited,
            steps => TimerMode::Timed(steps),
        }
    }
}

/// Power distribution switch state.
#[derive(Clone, Debug, PartialEq)]
pub struct PdmSwitch {
    channels: PowerChannels,
    initial_state: bool,
    state: bool,
    timer_limit: u8,
    time_ms: SimTime,
    start_ms: SimTime,
}

impl PdmSwitch {
    /// Switch that starts off with no timer.
    #[must_use]
    pub fn new() -> Self {
        let mut channels = PowerChannels::new();
        channels.set_active(false);
        Self {
            channels,
            initial_state: false,
            state: false,
            timer_limit: TIMER_LIMIT_UNLIMITED,
            time_ms: 0,
            start_ms: 0,
        }
    }

    #[must_use]
    pub const fn channels(&self) -> &PowerChannels {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut PowerChannels {
        &mut self.channels
    }

    #[must_use]
    pub const fn timer_mode(&self) -> TimerMode {
        TimerMode::from_limit(self.timer_limit)
    }

    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        matches!(self.timer_mode(), TimerMode::Disabled)
    }

    /// Reported switch state; a disabled switch always reads off.
    #[must_use]
    pub const fn state(&self) -> bool {
        self.state && !self.is_disabled()
    }

    /// Commanded state flag, before the disabled mask is applied.
    #[must_use]
    pub const fn commanded_state(&self) -> bool {
        self.state
    }

    #[must_use]
    pub const fn initial_state(&self) -> bool {
        self.initial_state
    }

    pub fn set_initial_state(&mut self, on: bool) {
        self.initial_state = on;
    }

    /// Applies a state change. `bus_reset` reports whether the feeding bus is in reset.
    /// A disabled switch ignores requests to turn on.
    pub fn set_state(&mut self, on: bool, bus_reset: bool) {
        if on && self.is_disabled() {
            return;
        }
        self.state = on;
        let active = on && !bus_reset && self.power_up();
        self.channels.set_active(active);
    }

    #[must_use]
    pub const fn timer_limit(&self) -> u8 {
        self.timer_limit
    }

    /// Changes the timer limit. Disabling forces the switch off; otherwise a
    /// switch that is on restarts its window.
    pub fn set_timer_limit(&mut self, limit: u8) {
        self.timer_limit = limit;
        if self.is_disabled() {
            self.state = false;
            self.channels.set_active(false);
        }
        if self.state {
            self.start_ms = self.time_ms;
        }
    }

    /// Elapsed on-time in 30 second steps, saturating at 255.
    #[must_use]
    pub fn timer_value(&self) -> u8 {
        let steps = self.time_ms.saturating_sub(self.start_ms) / TIMER_STEP_MS;
        u8::try_from(steps).unwrap_or(u8::MAX)
    }

    /// Time at which a timed switch turns itself off.
    #[must_use]
    pub fn off_time(&self) -> Option<SimTime> {
        match self.timer_mode() {
            TimerMode::Timed(steps) => Some(
                self.start_ms
                    .saturating_add(SimTime::from(steps).saturating_mul(TIMER_STEP_MS)),
            ),
            TimerMode::Disabled | TimerMode::Unlimited => None,
        }
    }

    #[must_use]
    pub const fn time(&self) -> SimTime {
        self.time_ms
    }

    /// Advances the switch clock. Returns `true` when the timer expired and
    /// turned the switch off.
    pub fn set_time(&mut self, time_ms: SimTime) -> bool {
        self.time_ms = time_ms;
        match self.off_time() {
            Some(off_at) if self.state && time_ms >= off_at => {
                self.state = false;
                self.channels.set_active(false);
                true
            }
            _ => false,
        }
    }

    pub(super) fn on_reset(&mut self, reset: bool) {
        let active = self.state && !reset && self.power_up();
        self.channels.set_active(active);
    }

    // Restarts the timed window when the switch powers up; false when disabled.
    fn power_up(&mut self) -> bool {
        match self.timer_mode() {
            TimerMode::Disabled => false,
            TimerMode::Unlimited => true,
            TimerMode::Timed(_) => {
                self.start_ms = self.time_ms;
                true
            }
        }
    }
}

impl Default for PdmSwitch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_mode_follows_limit() {
        assert_eq!(TimerMode::from_limit(0), TimerMode::Disabled);
        assert_eq!(TimerMode::from_limit(0xff), TimerMode::Unlimited);
        assert_eq!(TimerMode::from_limit(4), TimerMode::Timed(4));
    }

    #[test]
    fn switch_starts_off_with_inactive_channels() {
        let switch = PdmSwitch::new();
        assert!(!switch.state());
        assert!(!switch.channels().voltage().is_active());
        assert_eq!(switch.timer_limit(), TIMER_LIMIT_UNLIMITED);
    }

    #[test]
    fn reset_bus_keeps_channels_inactive() {
        let mut switch = PdmSwitch::new();
        switch.set_state(true, true);
        assert!(switch.state());
        assert!(!switch.channels().current().is_active());

        switch.on_reset(false);
        assert!(switch.channels().current().is_active());
    }

    #[test]
    fn timer_value_saturates() {
        let mut switch = PdmSwitch::new();
        switch.set_state(true, false);
        switch.set_time(TIMER_STEP_MS * 300);
        assert_eq!(switch.timer_value(), u8::MAX);
    }

    #[test]
    fn disabled_switch_ignores_turn_on() {
        let mut switch = PdmSwitch::new();
        switch.set_timer_limit(TIMER_LIMIT_DISABLED);
        switch.set_state(true, false);
        assert!(!switch.commanded_state());
        assert!(!switch.channels().voltage().is_active());

        switch.set_timer_limit(TIMER_LIMIT_UNLIMITED);
        assert!(!switch.state());
        assert!(!switch.channels().voltage().is_active());
    }

    #[test]
    fn unlimited_switch_never_expires() {
        let mut switch = PdmSwitch::new();
        switch.set_state(true, false);
        assert_eq!(switch.off_time(), None);
        assert!(!switch.set_time(TIMER_STEP_MS * 10_000));
        assert!(switch.state());
        assert!(switch.channels().current().is_active());
    }

    #[test]
    fn off_time_saturates_near_end_of_time() {
        let mut switch = PdmSwitch::new();
        switch.set_time(SimTime::MAX - 1);
        switch.set_state(true, false);
        switch.set_timer_limit(4);
        assert_eq!(switch.off_time(), Some(SimTime::MAX));
        assert!(switch.set_time(SimTime::MAX));
        assert!(!switch.state());
    }
}
