use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::db::models::Mention;
use crate::error::AppError;

/// A live feed of full, timestamp-ordered snapshots of the mentions
/// collection. A new snapshot is delivered after every change.
pub type MentionStream = BoxStream<'static, Result<Vec<Mention>, AppError>>;

/// Repository trait for chat mentions.
#[async_trait]
pub trait MentionRepository: Send + Sync {
    /// Store a new message.
    async fn post(&self, mention: Mention) -> Result<(), AppError>;

    /// All messages, oldest first.
    async fn snapshot(&self) -> Result<Vec<Mention>, AppError>;

    /// Add `viewer` to the acknowledgment set of a message. Idempotent.
    async fn mark_seen(&self, id: &str, viewer: &str) -> Result<(), AppError>;

    /// Open a standing subscription. The first item is the current snapshot.
    async fn subscribe(&self) -> Result<MentionStream, AppError>;
}

/// Sort a snapshot oldest first, ties broken by id so the order is stable.
pub fn order_by_timestamp(mentions: &mut [Mention]) {
    mentions.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
}

/// MongoDB implementation of the MentionRepository.
///
/// Subscriptions use change streams when the deployment supports them
/// (replica sets) and fall back to polling otherwise.
#[cfg(feature = "server")]
pub struct MongoMentionRepository {
    collection: mongodb::Collection<Mention>,
    poll_interval: std::time::Duration,
}

#[cfg(feature = "server")]
impl MongoMentionRepository {
    pub fn new(db: &mongodb::Database, poll_interval: std::time::Duration) -> Self {
        Self {
            collection: db.collection("secret-chat"),
            poll_interval,
        }
    }
}

#[cfg(feature = "server")]
async fn load_ordered(
    collection: &mongodb::Collection<Mention>,
) -> Result<Vec<Mention>, AppError> {
    use futures::TryStreamExt;
    use mongodb::bson::doc;

    let cursor = collection.find(doc! {}).await?;
    let mut mentions: Vec<Mention> = cursor.try_collect().await?;
    order_by_timestamp(&mut mentions);
    Ok(mentions)
}

#[cfg(feature = "server")]
#[async_trait]
impl MentionRepository for MongoMentionRepository {
    async fn post(&self, mention: Mention) -> Result<(), AppError> {
        self.collection.insert_one(&mention).await?;
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<Mention>, AppError> {
        load_ordered(&self.collection).await
    }

    async fn mark_seen(&self, id: &str, viewer: &str) -> Result<(), AppError> {
        use mongodb::bson::doc;

        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! { "$addToSet": { "seenBy": viewer } },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("Message '{}' not found", id)));
        }
        Ok(())
    }

    async fn subscribe(&self) -> Result<MentionStream, AppError> {
        use futures::TryStreamExt;

        let collection = self.collection.clone();
        let poll_interval = self.poll_interval;

        let changes = match collection.watch().await {
            Ok(changes) => Some(changes),
            Err(e) => {
                tracing::info!(
                    "Change streams unavailable ({e}), polling mentions every {:?}",
                    poll_interval
                );
                None
            }
        };

        let stream: MentionStream = Box::pin(async_stream::try_stream! {
            yield load_ordered(&collection).await?;

            match changes {
                Some(mut changes) => {
                    while let Some(_event) = changes.try_next().await? {
                        yield load_ordered(&collection).await?;
                    }
                }
                None => {
                    let mut ticker = tokio::time::interval(poll_interval);
                    // The first tick completes immediately.
                    ticker.tick().await;
                    loop {
                        ticker.tick().await;
                        yield load_ordered(&collection).await?;
                    }
                }
            }
        });

        Ok(stream)
    }
}
