use crate::{
    database::{
        store::{ReplyOutcome, UserStore, VerificationUpdate},
        MongoDB, USERS_COLLECTION,
    },
    models::{FlagUpdate, Message, NotificationStatusChange, User},
    utils::error::AppError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, to_bson, Document},
    error::{ErrorKind, WriteFailure},
    options::ReturnDocument,
    Collection,
};

const DUPLICATE_KEY: i32 = 11000;

/// `UserStore` backed by the "users" collection.
///
/// Message mutations are expressed as update operators (`$push`, `$pull`,
/// positional `$set`) so each one is a single atomic document update.
#[derive(Clone)]
pub struct MongoUserStore {
    db: MongoDB,
}

impl MongoUserStore {
    pub fn new(db: MongoDB) -> Self {
        Self { db }
    }

    fn users(&self) -> Collection<User> {
        self.db.collection::<User>(USERS_COLLECTION)
    }
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    match e.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == DUPLICATE_KEY,
        _ => e.to_string().contains("E11000"),
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn insert_user(&self, user: User) -> Result<User, AppError> {
        match self.users().insert_one(&user).await {
            Ok(_) => Ok(user),
            Err(e) if is_duplicate_key(&e) => {
                Err(AppError::Conflict("Username or email is already taken".to_string()))
            }
            Err(e) => Err(AppError::database(e)),
        }
    }

    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users().find_one(doc! { "userId": user_id }).await?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.users().find_one(doc! { "username": username }).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users().find_one(doc! { "email": email.to_lowercase() }).await?)
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, AppError> {
        let filter = doc! {
            "$or": [
                { "email": identifier.to_lowercase() },
                { "username": identifier }
            ]
        };
        Ok(self.users().find_one(filter).await?)
    }

    async fn update_verification(&self, user_id: &str, update: VerificationUpdate) -> Result<bool, AppError> {
        let mut set = doc! {
            "verifyCode": to_bson(&update.verify_code)?,
            "verifyCodeExpiry": to_bson(&update.verify_code_expiry)?,
            "isVerified": update.is_verified,
        };
        if let Some(password) = &update.password {
            set.insert("password", password.as_str());
        }

        let result = self
            .users()
            .update_one(doc! { "userId": user_id }, doc! { "$set": set })
            .await?;

        Ok(result.matched_count > 0)
    }

    async fn push_message(&self, user_id: &str, message: Message) -> Result<bool, AppError> {
        let result = self
            .users()
            .update_one(
                doc! { "userId": user_id },
                doc! { "$push": { "messages": to_bson(&message)? } },
            )
            .await?;

        Ok(result.matched_count > 0)
    }

    async fn set_reply(
        &self,
        user_id: &str,
        message_id: &str,
        reply: &str,
        replied_at: DateTime<Utc>,
        allow_overwrite: bool,
    ) -> Result<ReplyOutcome, AppError> {
        let element = if allow_overwrite {
            doc! { "_id": message_id }
        } else {
            doc! { "_id": message_id, "reply": null }
        };

        let result = self
            .users()
            .update_one(
                doc! { "userId": user_id, "messages": { "$elemMatch": element } },
                doc! { "$set": {
                    "messages.$.reply": reply,
                    "messages.$.repliedAt": to_bson(&replied_at)?,
                } },
            )
            .await?;

        if result.matched_count > 0 {
            return Ok(ReplyOutcome::Stored);
        }

        if allow_overwrite {
            return Ok(ReplyOutcome::MessageNotFound);
        }

        // Distinguish "answered already" from "no such message"
        let exists = self
            .users()
            .count_documents(doc! { "userId": user_id, "messages._id": message_id })
            .await?;

        Ok(if exists > 0 {
            ReplyOutcome::AlreadyAnswered
        } else {
            ReplyOutcome::MessageNotFound
        })
    }

    async fn pull_message(&self, user_id: &str, message_id: &str) -> Result<bool, AppError> {
        let result = self
            .users()
            .update_one(
                doc! { "userId": user_id },
                doc! { "$pull": { "messages": { "_id": message_id } } },
            )
            .await?;

        Ok(result.modified_count > 0)
    }

    async fn mark_read(&self, user_id: &str, message_id: &str) -> Result<bool, AppError> {
        let result = self
            .users()
            .update_one(
                doc! { "userId": user_id, "messages._id": message_id },
                doc! { "$set": { "messages.$.isRead": true } },
            )
            .await?;

        Ok(result.matched_count > 0)
    }

    async fn mark_all_read(&self, user_id: &str) -> Result<u64, AppError> {
        // The pre-image of this single update is exactly what it flipped
        let before = self
            .users()
            .find_one_and_update(
                doc! {
                    "userId": user_id,
                    "messages": { "$elemMatch": { "isRead": { "$ne": true } } },
                },
                doc! { "$set": { "messages.$[m].isRead": true } },
            )
            .array_filters(vec![doc! { "m.isRead": { "$ne": true } }])
            .return_document(ReturnDocument::Before)
            .await?;

        Ok(before
            .map(|user| user.messages.iter().filter(|m| !m.is_read).count() as u64)
            .unwrap_or(0))
    }

    async fn update_flags(&self, user_id: &str, update: FlagUpdate) -> Result<Option<User>, AppError> {
        let mut set = Document::new();
        if let Some(accept) = update.is_accepting_messages {
            set.insert("isAcceptingMessages", accept);
        }
        if let Some(show) = update.show_questions {
            set.insert("showQuestions", show);
        }

        if set.is_empty() {
            return self.find_by_id(user_id).await;
        }

        Ok(self
            .users()
            .find_one_and_update(doc! { "userId": user_id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn record_notification_toggle(
        &self,
        user_id: &str,
        enabled: bool,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, AppError> {
        let change = NotificationStatusChange { enabled, timestamp: at };

        Ok(self
            .users()
            .find_one_and_update(
                doc! { "userId": user_id },
                doc! {
                    "$set": { "notificationsEnabled": enabled },
                    "$push": { "notificationStatusChanges": to_bson(&change)? },
                },
            )
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn update_username(&self, user_id: &str, username: &str) -> Result<bool, AppError> {
        let taken = self
            .users()
            .count_documents(doc! { "username": username, "userId": { "$ne": user_id } })
            .await?;
        if taken > 0 {
            return Err(AppError::Conflict("Username is already taken".to_string()));
        }

        match self
            .users()
            .update_one(doc! { "userId": user_id }, doc! { "$set": { "username": username } })
            .await
        {
            Ok(result) => Ok(result.matched_count > 0),
            Err(e) if is_duplicate_key(&e) => {
                Err(AppError::Conflict("Username is already taken".to_string()))
            }
            Err(e) => Err(AppError::database(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_push_and_pull_message() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/anony_exchange_test".to_string());
        let store = MongoUserStore::new(MongoDB::new(&uri).await.unwrap());

        let user = User::new(
            &format!("t{}", &mongodb::bson::oid::ObjectId::new().to_hex()[..12]),
            &format!("{}@example.com", mongodb::bson::oid::ObjectId::new().to_hex()),
            "hash".to_string(),
        );
        let user = store.insert_user(user).await.unwrap();

        let message = Message::new("hello");
        let message_id = message.id.clone();
        assert!(store.push_message(&user.user_id, message).await.unwrap());
        assert!(store.pull_message(&user.user_id, &message_id).await.unwrap());
        assert!(!store.pull_message(&user.user_id, &message_id).await.unwrap());
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_mark_all_read_counts_from_the_same_update() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/anony_exchange_test".to_string());
        let store = MongoUserStore::new(MongoDB::new(&uri).await.unwrap());

        let user = User::new(
            &format!("t{}", &mongodb::bson::oid::ObjectId::new().to_hex()[..12]),
            &format!("{}@example.com", mongodb::bson::oid::ObjectId::new().to_hex()),
            "hash".to_string(),
        );
        let user = store.insert_user(user).await.unwrap();

        let first = Message::new("one");
        let first_id = first.id.clone();
        store.push_message(&user.user_id, first).await.unwrap();
        store.push_message(&user.user_id, Message::new("two")).await.unwrap();
        store.push_message(&user.user_id, Message::new("three")).await.unwrap();
        assert!(store.mark_read(&user.user_id, &first_id).await.unwrap());

        assert_eq!(store.mark_all_read(&user.user_id).await.unwrap(), 2);
        assert_eq!(store.mark_all_read(&user.user_id).await.unwrap(), 0);
        assert_eq!(store.mark_all_read("missing-user").await.unwrap(), 0);
    }
}
