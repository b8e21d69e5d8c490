use chrono::Utc;
use uuid::Uuid;

use crate::db::mention_repository::MentionRepository;
use crate::db::models::Mention;
use crate::error::AppError;

/// Post a chat message as `sender`.
///
/// The body is stored as typed; whitespace-only bodies are rejected. The
/// acknowledgment set starts empty.
pub async fn post_message(
    repo: &dyn MentionRepository,
    sender: &str,
    text: &str,
) -> Result<Mention, AppError> {
    if text.trim().is_empty() {
        return Err(AppError::validation("text", "Message cannot be empty"));
    }

    let mention = Mention {
        id: Uuid::new_v4().to_string(),
        text: text.to_string(),
        sender: sender.to_string(),
        timestamp: Utc::now(),
        seen_by: vec![],
    };

    repo.post(mention.clone()).await?;
    tracing::info!("Chat message {} posted by {}", mention.id, sender);
    Ok(mention)
}
