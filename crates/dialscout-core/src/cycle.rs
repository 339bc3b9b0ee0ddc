// ── Discovery cycle controller ──
//
// Settle-window debounce for discovery rounds. Devices answer a multicast
// probe drip-fed over anything from milliseconds to seconds, so a round is
// complete only once device/description activity has gone quiet for the
// full window. Every activity re-arms the deadline; termination is
// guaranteed because responses stop.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CycleState {
    /// Not running.
    Idle,
    /// Running, waiting for a round to begin.
    Discovering,
    /// Round activity seen; completion pending the quiet period.
    Settling,
}

#[derive(Debug)]
pub(crate) struct DiscoveryCycle {
    settle_window: Duration,
    state: CycleState,
    /// Only meaningful while `Settling`.
    deadline: Instant,
}

impl DiscoveryCycle {
    pub(crate) fn new(settle_window: Duration) -> Self {
        Self {
            settle_window,
            state: CycleState::Idle,
            deadline: Instant::now(),
        }
    }

    pub(crate) fn start(&mut self) {
        if self.state == CycleState::Idle {
            self.state = CycleState::Discovering;
        }
    }

    pub(crate) fn stop(&mut self) {
        self.state = CycleState::Idle;
    }

    /// A device-list event arrived: (re)arm the settle deadline.
    pub(crate) fn on_device_event(&mut self) {
        self.arm();
    }

    /// A description resolved or errored: the round is still live, push the
    /// deadline out.
    pub(crate) fn on_resolution_activity(&mut self) {
        self.arm();
    }

    pub(crate) fn is_settling(&self) -> bool {
        self.state == CycleState::Settling
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> CycleState {
        self.state
    }

    /// Resolves when the settle deadline passes. Poll only while settling
    /// (the deadline is stale in other states).
    pub(crate) async fn settled(&self) {
        tokio::time::sleep_until(self.deadline).await;
    }

    /// The deadline fired: back to Discovering until the next round.
    pub(crate) fn fire(&mut self) {
        if self.state == CycleState::Settling {
            self.state = CycleState::Discovering;
        }
    }

    fn arm(&mut self) {
        if self.state == CycleState::Idle {
            return;
        }
        self.state = CycleState::Settling;
        self.deadline = Instant::now() + self.settle_window;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(2);

    #[test]
    fn starts_idle_and_ignores_activity_until_started() {
        let mut cycle = DiscoveryCycle::new(WINDOW);
        assert_eq!(cycle.state(), CycleState::Idle);

        cycle.on_device_event();
        assert_eq!(cycle.state(), CycleState::Idle);

        cycle.start();
        assert_eq!(cycle.state(), CycleState::Discovering);
        cycle.on_device_event();
        assert_eq!(cycle.state(), CycleState::Settling);
    }

    #[test]
    fn fire_returns_to_discovering() {
        let mut cycle = DiscoveryCycle::new(WINDOW);
        cycle.start();
        cycle.on_device_event();
        cycle.fire();
        assert_eq!(cycle.state(), CycleState::Discovering);
        assert!(!cycle.is_settling());
    }

    #[test]
    fn stop_from_any_state_goes_idle() {
        let mut cycle = DiscoveryCycle::new(WINDOW);
        cycle.start();
        cycle.on_device_event();
        cycle.stop();
        assert_eq!(cycle.state(), CycleState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_fires_after_quiet_period() {
        let mut cycle = DiscoveryCycle::new(WINDOW);
        cycle.start();
        cycle.on_device_event();

        // Not settled before the window elapses.
        let early = tokio::time::timeout(Duration::from_millis(1500), cycle.settled()).await;
        assert!(early.is_err(), "settled before the quiet period elapsed");

        // The remaining 500ms pass and the deadline fires.
        tokio::time::timeout(Duration::from_secs(1), cycle.settled())
            .await
            .expect("deadline should have fired");
    }

    #[tokio::test(start_paused = true)]
    async fn activity_extends_the_deadline() {
        let mut cycle = DiscoveryCycle::new(WINDOW);
        cycle.start();
        cycle.on_device_event();

        tokio::time::advance(Duration::from_millis(1500)).await;
        cycle.on_resolution_activity();

        // Without the re-arm this would fire 500ms from now; with it, the
        // full window applies again.
        let early = tokio::time::timeout(Duration::from_millis(1900), cycle.settled()).await;
        assert!(early.is_err(), "re-armed deadline fired too early");

        tokio::time::timeout(Duration::from_millis(200), cycle.settled())
            .await
            .expect("re-armed deadline should have fired");
    }
}
