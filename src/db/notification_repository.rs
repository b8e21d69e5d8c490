use async_trait::async_trait;

use crate::db::models::Notification;
use crate::error::AppError;

/// Repository trait for operator broadcasts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// The highest `messageNumber` currently stored, if any.
    async fn max_message_number(&self) -> Result<Option<i64>, AppError>;

    /// Atomically hand out the next message number.
    ///
    /// The counter is first raised to the current maximum so that
    /// collections written before the counter existed keep numbering
    /// upwards.
    async fn allocate_message_number(&self) -> Result<i64, AppError>;

    /// Write a notification under its key, replacing whatever is there.
    async fn put(&self, notification: Notification) -> Result<(), AppError>;

    /// List all notifications.
    async fn list_all(&self) -> Result<Vec<Notification>, AppError>;
}

/// MongoDB implementation of the NotificationRepository.
#[cfg(feature = "server")]
pub struct MongoNotificationRepository {
    collection: mongodb::Collection<Notification>,
    counters: mongodb::Collection<mongodb::bson::Document>,
}

#[cfg(feature = "server")]
impl MongoNotificationRepository {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection("notifications"),
            counters: db.collection("counters"),
        }
    }
}

#[cfg(feature = "server")]
const COUNTER_KEY: &str = "notifications";

#[cfg(feature = "server")]
#[async_trait]
impl NotificationRepository for MongoNotificationRepository {
    async fn max_message_number(&self) -> Result<Option<i64>, AppError> {
        use mongodb::bson::doc;

        let latest = self
            .collection
            .find_one(doc! {})
            .sort(doc! { "messageNumber": -1 })
            .await?;

        Ok(latest.map(|n| n.message_number))
    }

    async fn allocate_message_number(&self) -> Result<i64, AppError> {
        use mongodb::bson::doc;
        use mongodb::options::ReturnDocument;

        let floor = self.max_message_number().await?.unwrap_or(0);

        self.counters
            .update_one(
                doc! { "_id": COUNTER_KEY },
                doc! { "$max": { "value": floor } },
            )
            .upsert(true)
            .await?;

        let counter = self
            .counters
            .find_one_and_update(
                doc! { "_id": COUNTER_KEY },
                doc! { "$inc": { "value": 1_i64 } },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?;

        counter
            .and_then(|c| c.get_i64("value").ok())
            .ok_or_else(|| AppError::Database("Broadcast counter missing after increment".into()))
    }

    async fn put(&self, notification: Notification) -> Result<(), AppError> {
        use mongodb::bson::doc;

        self.collection
            .replace_one(doc! { "_id": &notification.id }, &notification)
            .upsert(true)
            .await?;

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Notification>, AppError> {
        use futures::TryStreamExt;
        use mongodb::bson::doc;

        let cursor = self.collection.find(doc! {}).await?;
        let notifications: Vec<Notification> = cursor.try_collect().await?;
        Ok(notifications)
    }
}
