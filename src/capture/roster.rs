//! Camera discovery and stable slot assignment.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tracing::{debug, info, instrument};

use crate::display::ui::{UiCommand, UiDispatcher};
use crate::error::RenderContextClosed;
use crate::shutdown::Shutdown;
use crate::source::CameraSource;
use crate::{RosterRefresh, MAX_SLOTS};

/// Ordered camera ids; position `i` is slot `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterState {
    ids: Vec<String>,
}

impl RosterState {
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = Self::default();
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        state.reconcile(&ids);
        state
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<&str> {
        self.ids.get(slot).map(String::as_str)
    }

    /// Keep survivors in their relative order, drop ids no longer reported,
    /// append new ids, cap at [`MAX_SLOTS`].
    pub fn reconcile(&mut self, reported: &[String]) {
        self.ids.retain(|id| reported.contains(id));
        for id in reported {
            if self.ids.len() >= MAX_SLOTS {
                break;
            }
            if !self.ids.contains(id) {
                self.ids.push(id.clone());
            }
        }
    }

    pub fn reconciled(&self, reported: &[String]) -> Self {
        let mut next = self.clone();
        next.reconcile(reported);
        next
    }
}

/// Read side of the roster, shared with the fetch worker.
#[derive(Debug, Clone, Default)]
pub struct RosterHandle {
    inner: Arc<ArcSwap<RosterState>>,
}

impl RosterHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> Arc<RosterState> {
        self.inner.load_full()
    }

    pub(crate) fn publish(&self, state: RosterState) {
        self.inner.store(Arc::new(state));
    }
}

/// User-visible connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    Connecting,
    WaitingForFeed,
    Streaming,
}

impl FeedStatus {
    pub fn message(&self) -> Option<&'static str> {
        match self {
            FeedStatus::Connecting => Some("Connecting to server..."),
            FeedStatus::WaitingForFeed => Some("Waiting for camera feed..."),
            FeedStatus::Streaming => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The roster query failed; nothing was changed.
    Unreachable,
    Unchanged,
    Refreshed { active: usize },
}

pub struct RosterPoller<S> {
    source: S,
    roster: RosterHandle,
    state: RosterState,
    last_count: usize,
    policy: RosterRefresh,
    ui: UiDispatcher,
    interval: Duration,
    shutdown: Shutdown,
}

impl<S: CameraSource> RosterPoller<S> {
    pub fn new(
        source: S,
        roster: RosterHandle,
        ui: UiDispatcher,
        policy: RosterRefresh,
        interval: Duration,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            source,
            roster,
            state: RosterState::default(),
            last_count: 0,
            policy,
            ui,
            interval,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        info!("Roster poller started ({:?} refresh)", self.policy);
        loop {
            let interval = self.interval;
            if !self.shutdown.sleep(interval).await {
                break;
            }
            if self.poll_once().await.is_err() {
                info!("Render context closed, stopping roster poller");
                break;
            }
        }
        info!("Roster poller stopped");
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn poll_once(&mut self) -> Result<PollOutcome, RenderContextClosed> {
        let reported = match self.source.camera_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                debug!("Roster query failed: {}", e);
                self.ui
                    .dispatch(UiCommand::Status(FeedStatus::Connecting))
                    .await?;
                return Ok(PollOutcome::Unreachable);
            }
        };

        let status = if reported.is_empty() {
            FeedStatus::WaitingForFeed
        } else {
            FeedStatus::Streaming
        };
        self.ui.dispatch(UiCommand::Status(status)).await?;

        let next = self.state.reconciled(&reported);
        let refresh = match self.policy {
            RosterRefresh::Count => reported.len() != self.last_count,
            RosterRefresh::Membership => {
                reported.len() != self.last_count || next != self.state
            }
        };
        if !refresh {
            return Ok(PollOutcome::Unchanged);
        }

        self.last_count = reported.len();
        self.state = next;
        self.roster.publish(self.state.clone());

        let active = self.state.len();
        info!("Roster updated: {:?}", self.state.ids());
        self.ui.dispatch(UiCommand::Roster { active }).await?;
        Ok(PollOutcome::Refreshed { active })
    }

    pub fn state(&self) -> &RosterState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::ui;
    use crate::error::SourceError;
    use crate::shutdown;
    use crate::source::CameraData;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// Replays one scripted roster answer per query.
    struct ScriptedRoster(Mutex<VecDeque<Result<Vec<String>, ()>>>);

    impl ScriptedRoster {
        fn new(script: Vec<Result<Vec<String>, ()>>) -> Self {
            Self(Mutex::new(script.into()))
        }
    }

    #[async_trait]
    impl CameraSource for ScriptedRoster {
        async fn camera_ids(&self) -> Result<Vec<String>, SourceError> {
            match self.0.lock().pop_front() {
                Some(Ok(ids)) => Ok(ids),
                _ => Err(SourceError::Unavailable("scripted failure".into())),
            }
        }

        async fn camera_data(&self, _: &str) -> Result<Option<CameraData>, SourceError> {
            Ok(None)
        }
    }

    fn poller(
        script: Vec<Result<Vec<String>, ()>>,
        policy: RosterRefresh,
    ) -> (RosterPoller<ScriptedRoster>, RosterHandle, ui::UiReceiver) {
        let (dispatcher, receiver) = ui::channel(64);
        let (_trigger, shutdown) = shutdown::channel();
        let roster = RosterHandle::new();
        let poller = RosterPoller::new(
            ScriptedRoster::new(script),
            roster.clone(),
            dispatcher,
            policy,
            Duration::from_millis(1),
            shutdown,
        );
        (poller, roster, receiver)
    }

    #[test]
    fn reconcile_keeps_survivors_and_appends() {
        let mut state = RosterState::from_ids(["a", "b", "c"]);
        state.reconcile(&ids(&["d", "c", "a"]));
        assert_eq!(state.ids(), ids(&["a", "c", "d"]).as_slice());
    }

    #[test]
    fn reconcile_caps_at_max_slots() {
        let state = RosterState::from_ids(["1", "2", "3", "4", "5", "6", "7", "8"]);
        assert_eq!(state.len(), MAX_SLOTS);
        assert_eq!(state.get(5), Some("6"));
        assert_eq!(state.get(6), None);
    }

    #[test]
    fn reconcile_ignores_duplicate_reports() {
        let state = RosterState::from_ids(["a", "a", "b"]);
        assert_eq!(state.ids(), ids(&["a", "b"]).as_slice());
    }

    #[tokio::test]
    async fn count_policy_ignores_same_size_swap() {
        let (mut poller, roster, _rx) = poller(
            vec![Ok(ids(&["A", "B", "C"])), Ok(ids(&["B", "C", "D"]))],
            RosterRefresh::Count,
        );

        assert_eq!(
            poller.poll_once().await.unwrap(),
            PollOutcome::Refreshed { active: 3 }
        );
        assert_eq!(poller.poll_once().await.unwrap(), PollOutcome::Unchanged);
        assert_eq!(roster.load().ids(), ids(&["A", "B", "C"]).as_slice());
    }

    #[tokio::test]
    async fn membership_policy_keeps_positions_of_survivors() {
        let (mut poller, roster, _rx) = poller(
            vec![Ok(ids(&["A", "B", "C"])), Ok(ids(&["B", "C", "D"]))],
            RosterRefresh::Membership,
        );

        poller.poll_once().await.unwrap();
        assert_eq!(
            poller.poll_once().await.unwrap(),
            PollOutcome::Refreshed { active: 3 }
        );
        assert_eq!(roster.load().ids(), ids(&["B", "C", "D"]).as_slice());
    }

    #[tokio::test]
    async fn membership_policy_keeps_slot_of_unchanged_ids() {
        let (mut poller, roster, _rx) = poller(
            vec![Ok(ids(&["A", "B", "C"])), Ok(ids(&["A", "C", "D"]))],
            RosterRefresh::Membership,
        );

        poller.poll_once().await.unwrap();
        poller.poll_once().await.unwrap();
        let state = roster.load();
        assert_eq!(state.get(0), Some("A"));
        assert_eq!(state.get(1), Some("C"));
        assert_eq!(state.get(2), Some("D"));
    }

    #[tokio::test]
    async fn failed_query_only_reports_connecting() {
        let (mut poller, roster, rx) = poller(vec![Ok(ids(&["A"])), Err(())], RosterRefresh::Count);

        poller.poll_once().await.unwrap();
        let _ = rx.drain();

        assert_eq!(poller.poll_once().await.unwrap(), PollOutcome::Unreachable);
        assert_eq!(roster.load().ids(), ids(&["A"]).as_slice());
        assert_eq!(
            rx.drain(),
            vec![UiCommand::Status(FeedStatus::Connecting)]
        );
    }

    #[tokio::test]
    async fn empty_roster_waits_for_feed_and_clears_slots() {
        let (mut poller, roster, rx) =
            poller(vec![Ok(ids(&["A", "B"])), Ok(vec![])], RosterRefresh::Count);

        poller.poll_once().await.unwrap();
        let _ = rx.drain();

        assert_eq!(
            poller.poll_once().await.unwrap(),
            PollOutcome::Refreshed { active: 0 }
        );
        assert!(roster.load().is_empty());
        assert_eq!(
            rx.drain(),
            vec![
                UiCommand::Status(FeedStatus::WaitingForFeed),
                UiCommand::Roster { active: 0 },
            ]
        );
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let (dispatcher, _receiver) = ui::channel(64);
        let (trigger, shutdown) = shutdown::channel();
        let poller = RosterPoller::new(
            ScriptedRoster::new(vec![]),
            RosterHandle::new(),
            dispatcher,
            RosterRefresh::Count,
            Duration::from_secs(60),
            shutdown,
        );
        let task = tokio::spawn(poller.run());
        trigger.trigger();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
