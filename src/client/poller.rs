// ==================== UNREAD MESSAGE POLLER ====================
// Fixed-interval loop: every tick spawns one poll task; a tick that finds a
// poll still in flight is skipped. Failures are logged and the schedule
// continues without backoff.

use super::{
    inbox::{ClientError, InboxClient},
    notifications::{toast_title, NotificationStore, PollerState},
};
use crate::models::Message;
use async_trait::async_trait;
use std::io::Write;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::{
    sync::{oneshot, Mutex},
    task::JoinHandle,
    time::{interval, Duration, MissedTickBehavior},
};

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Where unread messages come from
#[async_trait]
pub trait UnreadSource: Send + Sync {
    async fn fetch_unread(&self) -> Result<Vec<Message>, ClientError>;
}

#[async_trait]
impl UnreadSource for InboxClient {
    async fn fetch_unread(&self) -> Result<Vec<Message>, ClientError> {
        InboxClient::fetch_unread(self).await.map(|r| r.new_messages)
    }
}

/// Delivery of an alert to the user
pub trait AlertSink: Send + Sync {
    fn play_sound(&self);
    fn show_toast(&self, title: &str, description: &str);
}

/// Terminal bell plus a log line
pub struct ConsoleAlert;

impl AlertSink for ConsoleAlert {
    fn play_sound(&self) {
        let mut stdout = std::io::stdout();
        if let Err(e) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
            log::debug!("Bell failed: {}", e);
        }
    }

    fn show_toast(&self, title: &str, description: &str) {
        log::info!("🔔 {} {}", title, description);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Another poll was still in flight
    Skipped,
    Failed,
    Updated { unread: usize, alerted: Option<usize> },
}

/// Resets the busy flag when a poll ends, however it ends
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct NotificationPoller {
    source: Arc<dyn UnreadSource>,
    alerts: Arc<dyn AlertSink>,
    store: Arc<Mutex<NotificationStore>>,
    busy: AtomicBool,
    period: Duration,
}

impl NotificationPoller {
    pub fn new(
        source: Arc<dyn UnreadSource>,
        alerts: Arc<dyn AlertSink>,
        store: NotificationStore,
        period: Duration,
    ) -> Self {
        Self {
            source,
            alerts,
            store: Arc::new(Mutex::new(store)),
            busy: AtomicBool::new(false),
            period,
        }
    }

    /// Shared handle to the notification state
    pub fn store(&self) -> Arc<Mutex<NotificationStore>> {
        self.store.clone()
    }

    /// Fetches once and applies the alert rule.
    pub async fn poll_once(&self) -> PollOutcome {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("⏭️ Poll still in flight, skipping tick");
            return PollOutcome::Skipped;
        }
        let _guard = BusyGuard(&self.busy);

        let unread = match self.source.fetch_unread().await {
            Ok(unread) => unread,
            Err(e) => {
                log::warn!("⚠️ Failed to fetch notifications: {}", e);
                return PollOutcome::Failed;
            }
        };

        let (alerted, unread, alert) = {
            let mut store = self.store.lock().await;
            let alerted = store.apply_poll(unread);
            let alert = alerted.map(|n| {
                let resume = store.state;
                store.state = PollerState::Notifying;
                (n, store.sound_enabled, resume)
            });
            (alerted, store.unread_count, alert)
        };

        // Delivered without holding the store so `Notifying` is observable
        if let Some((n, sound, resume)) = alert {
            if sound {
                self.alerts.play_sound();
            }
            self.alerts.show_toast(&toast_title(n), "You have new unread messages");

            let mut store = self.store.lock().await;
            if store.state == PollerState::Notifying {
                store.state = resume;
            }
        }

        PollOutcome::Updated { unread, alerted }
    }

    /// Moves to `Polling` and runs the loop until the handle is stopped.
    /// The first tick fires immediately.
    pub async fn start(self: Arc<Self>) -> PollerHandle {
        self.store.lock().await.state = PollerState::Polling;
        log::info!("🔔 Notification poller started (interval: {:?})", self.period);

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let poller = self.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval(poller.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut in_flight: Vec<JoinHandle<PollOutcome>> = Vec::new();

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        in_flight.retain(|handle| !handle.is_finished());
                        let tick = poller.clone();
                        in_flight.push(tokio::spawn(async move { tick.poll_once().await }));
                    }
                }
            }

            for handle in in_flight {
                if let Err(e) = handle.await {
                    log::warn!("⚠️ Poll task ended abnormally: {}", e);
                }
            }
        });

        PollerHandle {
            stop: Some(stop_tx),
            task: Some(task),
            poller: self,
        }
    }
}

/// Running poller. `stop()` ends the loop and waits for in-flight polls.
pub struct PollerHandle {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    poller: Arc<NotificationPoller>,
}

impl PollerHandle {
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::warn!("⚠️ Poller loop ended abnormally: {}", e);
            }
        }
        self.poller.store.lock().await.state = PollerState::Idle;
        log::info!("🔕 Notification poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    /// Serves queued responses; repeats the last one when the queue runs dry
    struct ScriptedSource {
        responses: StdMutex<Vec<Result<usize, u16>>>,
        calls: StdMutex<usize>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<usize, u16>>) -> Self {
            Self {
                responses: StdMutex::new(responses),
                calls: StdMutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl UnreadSource for ScriptedSource {
        async fn fetch_unread(&self) -> Result<Vec<Message>, ClientError> {
            *self.calls.lock().unwrap() += 1;
            let next = {
                let mut responses = self.responses.lock().unwrap();
                if responses.len() > 1 {
                    responses.remove(0)
                } else {
                    responses[0]
                }
            };
            match next {
                Ok(n) => Ok((0..n).map(|i| Message::new(&format!("m{}", i))).collect()),
                Err(status) => Err(ClientError::Status {
                    status,
                    message: "boom".to_string(),
                }),
            }
        }
    }

    /// Blocks every fetch until released
    struct GatedSource {
        gate: Notify,
    }

    #[async_trait]
    impl UnreadSource for GatedSource {
        async fn fetch_unread(&self) -> Result<Vec<Message>, ClientError> {
            self.gate.notified().await;
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct RecordingAlerts {
        sounds: StdMutex<usize>,
        toasts: StdMutex<Vec<String>>,
    }

    impl AlertSink for RecordingAlerts {
        fn play_sound(&self) {
            *self.sounds.lock().unwrap() += 1;
        }

        fn show_toast(&self, title: &str, _description: &str) {
            self.toasts.lock().unwrap().push(title.to_string());
        }
    }

    /// Reads the poller state at the moment the toast is shown
    #[derive(Default)]
    struct StateRecordingAlerts {
        store: std::sync::OnceLock<Arc<Mutex<NotificationStore>>>,
        seen: StdMutex<Vec<Option<PollerState>>>,
    }

    impl AlertSink for StateRecordingAlerts {
        fn play_sound(&self) {}

        fn show_toast(&self, _title: &str, _description: &str) {
            let state = self
                .store
                .get()
                .and_then(|store| store.try_lock().ok().map(|store| store.state));
            self.seen.lock().unwrap().push(state);
        }
    }

    fn poller(
        source: Arc<dyn UnreadSource>,
        alerts: Arc<RecordingAlerts>,
        sound: bool,
        enabled: bool,
    ) -> Arc<NotificationPoller> {
        Arc::new(NotificationPoller::new(
            source,
            alerts,
            NotificationStore::new(sound, enabled),
            Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        ))
    }

    #[tokio::test]
    async fn alerts_only_when_the_count_grows() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(1), Ok(1), Ok(3), Ok(2)]));
        let alerts = Arc::new(RecordingAlerts::default());
        let poller = poller(source, alerts.clone(), true, true);

        assert_eq!(poller.poll_once().await, PollOutcome::Updated { unread: 1, alerted: None });
        assert_eq!(poller.poll_once().await, PollOutcome::Updated { unread: 1, alerted: None });
        assert_eq!(poller.poll_once().await, PollOutcome::Updated { unread: 3, alerted: Some(2) });
        assert_eq!(poller.poll_once().await, PollOutcome::Updated { unread: 2, alerted: None });

        assert_eq!(*alerts.sounds.lock().unwrap(), 1);
        assert_eq!(*alerts.toasts.lock().unwrap(), vec!["2 new messages!".to_string()]);
    }

    #[tokio::test]
    async fn alert_delivery_sees_the_notifying_state() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(0), Ok(2)]));
        let alerts = Arc::new(StateRecordingAlerts::default());
        let poller = Arc::new(NotificationPoller::new(
            source,
            alerts.clone(),
            NotificationStore::new(true, true),
            Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        ));
        let store = poller.store();
        assert!(alerts.store.set(store.clone()).is_ok());
        store.lock().await.state = PollerState::Polling;

        poller.poll_once().await;
        assert_eq!(poller.poll_once().await, PollOutcome::Updated { unread: 2, alerted: Some(2) });

        assert_eq!(*alerts.seen.lock().unwrap(), vec![Some(PollerState::Notifying)]);
        assert_eq!(store.lock().await.state, PollerState::Polling);
    }

    #[tokio::test]
    async fn muted_sound_still_shows_the_toast() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(0), Ok(1)]));
        let alerts = Arc::new(RecordingAlerts::default());
        let poller = poller(source, alerts.clone(), false, true);

        poller.poll_once().await;
        poller.poll_once().await;

        assert_eq!(*alerts.sounds.lock().unwrap(), 0);
        assert_eq!(alerts.toasts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn disabled_notifications_never_alert() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(0), Ok(5)]));
        let alerts = Arc::new(RecordingAlerts::default());
        let poller = poller(source, alerts.clone(), true, false);

        poller.poll_once().await;
        assert_eq!(poller.poll_once().await, PollOutcome::Updated { unread: 5, alerted: None });
        assert!(alerts.toasts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failures_keep_the_previous_baseline() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(1), Err(500), Ok(2)]));
        let alerts = Arc::new(RecordingAlerts::default());
        let poller = poller(source, alerts.clone(), true, true);

        poller.poll_once().await;
        assert_eq!(poller.poll_once().await, PollOutcome::Failed);
        assert_eq!(poller.poll_once().await, PollOutcome::Updated { unread: 2, alerted: Some(1) });
    }

    #[tokio::test]
    async fn overlapping_polls_are_skipped() {
        let source = Arc::new(GatedSource { gate: Notify::new() });
        let alerts = Arc::new(RecordingAlerts::default());
        let poller = poller(source.clone(), alerts, true, true);

        let first = {
            let poller = poller.clone();
            tokio::spawn(async move { poller.poll_once().await })
        };
        while !poller.busy.load(Ordering::Acquire) {
            tokio::task::yield_now().await;
        }

        assert_eq!(poller.poll_once().await, PollOutcome::Skipped);

        source.gate.notify_one();
        assert_eq!(first.await.unwrap(), PollOutcome::Updated { unread: 0, alerted: None });
        assert!(!poller.busy.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn start_polls_immediately_and_stop_returns_to_idle() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(2)]));
        let alerts = Arc::new(RecordingAlerts::default());
        let poller = poller(source.clone(), alerts, true, true);
        let store = poller.store();

        let handle = poller.clone().start().await;
        assert_eq!(store.lock().await.state, PollerState::Polling);

        while source.calls() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        handle.stop().await;

        let store = store.lock().await;
        assert_eq!(store.state, PollerState::Idle);
        assert_eq!(store.prev_count, Some(2));
        assert_eq!(source.calls(), 1);
    }
}
