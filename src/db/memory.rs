use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::db::facility_repository::FacilityRepository;
use crate::db::mention_repository::{order_by_timestamp, MentionRepository, MentionStream};
use crate::db::models::{Facility, FacilityFields, Mention, Notification};
use crate::db::notification_repository::NotificationRepository;
use crate::error::AppError;

/// In-process document store implementing every repository trait.
///
/// Backs demo mode and the integration tests. Mention subscriptions are
/// driven by a `watch` channel that receives a fresh snapshot after every
/// mention write.
pub struct MemoryStore {
    facilities: Mutex<BTreeMap<String, Facility>>,
    notifications: Mutex<BTreeMap<String, Notification>>,
    counter: Mutex<i64>,
    mentions: Mutex<Vec<Mention>>,
    mention_tx: watch::Sender<Vec<Mention>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (mention_tx, _) = watch::channel(Vec::new());
        Self {
            facilities: Mutex::new(BTreeMap::new()),
            notifications: Mutex::new(BTreeMap::new()),
            counter: Mutex::new(0),
            mentions: Mutex::new(Vec::new()),
            mention_tx,
        }
    }

    /// Insert or replace a facility wholesale. Used for seeding.
    pub fn seed_facility(&self, facility: Facility) -> Result<(), AppError> {
        lock(&self.facilities)?.insert(facility.id.clone(), facility);
        Ok(())
    }

    fn publish_mentions(&self, mentions: &[Mention]) {
        let mut snapshot = mentions.to_vec();
        order_by_timestamp(&mut snapshot);
        self.mention_tx.send_replace(snapshot);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, AppError> {
    mutex
        .lock()
        .map_err(|_| AppError::Internal("In-memory store lock poisoned".into()))
}

#[async_trait]
impl FacilityRepository for MemoryStore {
    async fn list_all(&self) -> Result<Vec<Facility>, AppError> {
        Ok(lock(&self.facilities)?.values().cloned().collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Facility>, AppError> {
        Ok(lock(&self.facilities)?.get(id).cloned())
    }

    async fn insert_placeholder(&self, facility: Facility) -> Result<(), AppError> {
        let mut facilities = lock(&self.facilities)?;
        if facilities.contains_key(&facility.id) {
            return Err(AppError::Conflict(
                "A hospital with this Place ID already exists.".into(),
            ));
        }
        facilities.insert(facility.id.clone(), facility);
        Ok(())
    }

    async fn update_fields(
        &self,
        id: &str,
        fields: &FacilityFields,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut facilities = lock(&self.facilities)?;
        let facility = facilities
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Hospital '{}' not found", id)))?;

        facility.name = fields.name.clone();
        facility.full_address = fields.full_address.clone();
        facility.phone_number = fields.phone_number.clone();
        facility.logo_url = fields.logo_url.clone();
        facility.updated_at = Some(updated_at);
        Ok(())
    }

    async fn complete(
        &self,
        id: &str,
        fields: &FacilityFields,
        master_password: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut facilities = lock(&self.facilities)?;
        let facility = facilities.get_mut(id).ok_or_else(|| {
            AppError::NotFound(format!("Reservation for '{}' no longer exists", id))
        })?;

        facility.name = fields.name.clone();
        facility.full_address = fields.full_address.clone();
        facility.phone_number = fields.phone_number.clone();
        facility.logo_url = fields.logo_url.clone();
        facility.master_password = Some(master_password.to_string());
        facility.updated_at = Some(updated_at);
        Ok(())
    }

    async fn set_master_password(&self, id: &str, secret: &str) -> Result<(), AppError> {
        let mut facilities = lock(&self.facilities)?;
        let facility = facilities
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Hospital '{}' not found", id)))?;
        facility.master_password = Some(secret.to_string());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        Ok(lock(&self.facilities)?.remove(id).is_some())
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn max_message_number(&self) -> Result<Option<i64>, AppError> {
        Ok(lock(&self.notifications)?
            .values()
            .map(|n| n.message_number)
            .max())
    }

    async fn allocate_message_number(&self) -> Result<i64, AppError> {
        let floor = self.max_message_number().await?.unwrap_or(0);
        let mut counter = lock(&self.counter)?;
        *counter = (*counter).max(floor) + 1;
        Ok(*counter)
    }

    async fn put(&self, notification: Notification) -> Result<(), AppError> {
        lock(&self.notifications)?.insert(notification.id.clone(), notification);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Notification>, AppError> {
        Ok(lock(&self.notifications)?.values().cloned().collect())
    }
}

#[async_trait]
impl MentionRepository for MemoryStore {
    async fn post(&self, mention: Mention) -> Result<(), AppError> {
        let mut mentions = lock(&self.mentions)?;
        mentions.push(mention);
        self.publish_mentions(&mentions);
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<Mention>, AppError> {
        let mut snapshot = lock(&self.mentions)?.clone();
        order_by_timestamp(&mut snapshot);
        Ok(snapshot)
    }

    async fn mark_seen(&self, id: &str, viewer: &str) -> Result<(), AppError> {
        let mut mentions = lock(&self.mentions)?;
        let Some(mention) = mentions.iter_mut().find(|m| m.id == id) else {
            return Err(AppError::NotFound(format!("Message '{}' not found", id)));
        };
        if mention.seen_by.iter().any(|v| v == viewer) {
            return Ok(());
        }
        mention.seen_by.push(viewer.to_string());
        self.publish_mentions(&mentions);
        Ok(())
    }

    async fn subscribe(&self) -> Result<MentionStream, AppError> {
        let mut rx = self.mention_tx.subscribe();
        let stream: MentionStream = Box::pin(async_stream::stream! {
            let initial = rx.borrow_and_update().clone();
            yield Ok(initial);
            while rx.changed().await.is_ok() {
                let snapshot = rx.borrow_and_update().clone();
                yield Ok(snapshot);
            }
        });
        Ok(stream)
    }
}
