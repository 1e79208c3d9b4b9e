//! Notification client: polls a running server for unread messages and
//! raises alerts when new ones arrive.

pub mod inbox;
pub mod notifications;
pub mod poller;
pub mod session;

pub use inbox::{ClientError, InboxClient};
pub use notifications::{NotificationStore, PollerState};
pub use poller::{AlertSink, ConsoleAlert, NotificationPoller, PollOutcome, PollerHandle, UnreadSource};
pub use session::WatchSession;
