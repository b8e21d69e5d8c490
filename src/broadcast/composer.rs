use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::models::Notification;
use crate::db::notification_repository::NotificationRepository;
use crate::error::AppError;

/// How the next broadcast number is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NumberingStrategy {
    /// Atomic counter kept in the store. Concurrent composers never share a
    /// number.
    #[default]
    Counter,
    /// Read the current maximum and add one. Two composers racing against
    /// the same maximum both get the same number and the later write
    /// replaces the earlier one.
    ReadMax,
}

/// Document key for a broadcast number.
pub fn message_key(number: i64) -> String {
    format!("Message{}", number)
}

/// Compute the number the next broadcast will carry.
pub async fn next_message_number(
    repo: &dyn NotificationRepository,
    strategy: NumberingStrategy,
) -> Result<i64, AppError> {
    match strategy {
        NumberingStrategy::Counter => repo.allocate_message_number().await,
        NumberingStrategy::ReadMax => Ok(repo.max_message_number().await?.unwrap_or(0) + 1),
    }
}

/// A broadcast ready to be confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastPreview {
    pub content: String,
}

/// What the composer made of the operator's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeOutcome {
    /// The input was the reserved unlock phrase. Nothing is published.
    Unlock,
    /// A regular message awaiting explicit confirmation.
    Preview(BroadcastPreview),
}

/// Classify composer input.
///
/// The unlock phrase is matched case-insensitively after trimming.
pub fn compose(input: &str, unlock_phrase: &str) -> Result<ComposeOutcome, AppError> {
    let content = input.trim();
    if content.is_empty() {
        return Err(AppError::validation("content", "Message cannot be empty"));
    }

    if !unlock_phrase.is_empty() && content.to_lowercase() == unlock_phrase.trim().to_lowercase()
    {
        return Ok(ComposeOutcome::Unlock);
    }

    Ok(ComposeOutcome::Preview(BroadcastPreview {
        content: content.to_string(),
    }))
}

/// Write a confirmed broadcast under the next number.
pub async fn publish(
    repo: &dyn NotificationRepository,
    strategy: NumberingStrategy,
    preview: BroadcastPreview,
) -> Result<Notification, AppError> {
    let number = next_message_number(repo, strategy).await?;

    let notification = Notification {
        id: message_key(number),
        content: preview.content,
        timestamp: Utc::now(),
        message_number: number,
    };

    repo.put(notification.clone())
        .await
        .inspect_err(|e| tracing::error!("Error sending message {}: {}", notification.id, e))?;

    tracing::info!("Published broadcast {}", notification.id);
    Ok(notification)
}
