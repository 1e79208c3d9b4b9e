pub mod auth_service;
pub mod mailer;
pub mod message_service;
pub mod settings_service;
pub mod suggestion_service;

pub use mailer::{HttpMailer, LogMailer, Mailer};
