// ==================== WATCH SESSION ====================
// One signed-in watcher: the HTTP client, its poller and the notification
// state are started together on sign-in and torn down together on sign-out.

use super::{
    inbox::{ClientError, InboxClient},
    notifications::NotificationStore,
    poller::{AlertSink, NotificationPoller, PollerHandle},
};
use chrono::Utc;
use std::sync::Arc;
use tokio::{sync::Mutex, time::Duration};

pub struct WatchSession {
    client: Arc<InboxClient>,
    poller: Arc<NotificationPoller>,
    handle: PollerHandle,
    username: String,
}

impl WatchSession {
    /// Signs in, seeds the notification state from the profile and starts polling.
    pub async fn start(
        mut client: InboxClient,
        identifier: &str,
        password: &str,
        alerts: Arc<dyn AlertSink>,
        sound_enabled: bool,
        period: Duration,
    ) -> Result<Self, ClientError> {
        let user = client.sign_in(identifier, password).await?;
        log::info!("👤 Signed in as {}", user.username);

        let notifications_enabled = match client.profile().await {
            Ok(profile) => profile.notifications_enabled,
            Err(e) => {
                log::warn!("⚠️ Could not read notification preference, assuming enabled: {}", e);
                true
            }
        };

        let client = Arc::new(client);
        let poller = Arc::new(NotificationPoller::new(
            client.clone(),
            alerts,
            NotificationStore::new(sound_enabled, notifications_enabled),
            period,
        ));
        let handle = poller.clone().start().await;

        Ok(Self {
            client,
            poller,
            handle,
            username: user.username,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn store(&self) -> Arc<Mutex<NotificationStore>> {
        self.poller.store()
    }

    pub async fn mark_read(&self, message_id: &str) -> Result<(), ClientError> {
        self.client.mark_read(message_id).await?;
        self.poller.store().lock().await.mark_read(message_id);
        Ok(())
    }

    pub async fn mark_all_read(&self) -> Result<u64, ClientError> {
        let updated = self.client.mark_all_read().await?;
        self.poller.store().lock().await.mark_all_read();
        Ok(updated)
    }

    /// Persists the preference on the server, then applies it locally.
    pub async fn set_notifications(&self, enabled: bool) -> Result<bool, ClientError> {
        let enabled = self.client.set_notifications(enabled).await?;
        self.poller
            .store()
            .lock()
            .await
            .set_notifications_enabled(enabled, Utc::now());
        Ok(enabled)
    }

    /// Stops polling, drops the notification state and ends the server session.
    pub async fn sign_out(self) -> Result<(), ClientError> {
        let Self {
            client,
            poller,
            handle,
            username,
        } = self;

        handle.stop().await;
        drop(poller);

        client.end_session().await?;
        log::info!("👋 Signed out {}", username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::{notifications::PollerState, testing::spawn_server},
        database::{MemoryUserStore, UserStore},
        models::Message,
        services::auth_service::testing::verified_user,
    };

    struct SilentAlerts;

    impl AlertSink for SilentAlerts {
        fn play_sound(&self) {}
        fn show_toast(&self, _title: &str, _description: &str) {}
    }

    #[actix_web::test]
    async fn session_polls_and_tears_down_on_sign_out() {
        let store = Arc::new(MemoryUserStore::new());
        let user = verified_user(&*store, "alice").await;
        let first = Message::new("first");
        let first_id = first.id.clone();
        store.push_message(&user.user_id, first).await.unwrap();
        store.push_message(&user.user_id, Message::new("second")).await.unwrap();
        let (base_url, server) = spawn_server(store.clone());

        let session = WatchSession::start(
            InboxClient::new(&base_url).unwrap(),
            "alice",
            "password123",
            Arc::new(SilentAlerts),
            true,
            Duration::from_secs(30),
        )
        .await
        .unwrap();
        assert_eq!(session.username(), "alice");
        let notifications = session.store();

        // first tick fires immediately
        for _ in 0..500 {
            if notifications.lock().await.prev_count.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        {
            let state = notifications.lock().await;
            assert_eq!(state.unread_count, 2);
            assert_eq!(state.state, PollerState::Polling);
        }

        session.mark_read(&first_id).await.unwrap();
        assert_eq!(notifications.lock().await.unread_count, 1);
        assert_eq!(session.mark_all_read().await.unwrap(), 1);
        assert_eq!(notifications.lock().await.unread_count, 0);

        assert!(!session.set_notifications(false).await.unwrap());
        assert!(!notifications.lock().await.notifications_enabled);
        let stored = store.find_by_id(&user.user_id).await.unwrap().unwrap();
        assert!(!stored.notifications_enabled);

        session.sign_out().await.unwrap();
        assert_eq!(notifications.lock().await.state, PollerState::Idle);
        // poller and client are gone; only this handle to the state is left
        assert_eq!(Arc::strong_count(&notifications), 1);

        server.stop(true).await;
    }
}
