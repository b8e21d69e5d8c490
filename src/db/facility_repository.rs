use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::models::{Facility, FacilityFields};
use crate::error::AppError;

/// Repository trait for facility records.
///
/// This trait allows mocking the database layer in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FacilityRepository: Send + Sync {
    /// List every facility, placeholders included.
    async fn list_all(&self) -> Result<Vec<Facility>, AppError>;

    /// Find a facility by its place id.
    async fn find_by_id(&self, id: &str) -> Result<Option<Facility>, AppError>;

    /// Write a placeholder record. Fails with `Conflict` if the id is taken.
    async fn insert_placeholder(&self, facility: Facility) -> Result<(), AppError>;

    /// Overwrite the editable contact fields and stamp `updatedAt`.
    async fn update_fields(
        &self,
        id: &str,
        fields: &FacilityFields,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// Write every collected field of a completed creation wizard in a
    /// single update.
    async fn complete(
        &self,
        id: &str,
        fields: &FacilityFields,
        master_password: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// Overwrite the access secret.
    async fn set_master_password(&self, id: &str, secret: &str) -> Result<(), AppError>;

    /// Delete a facility. Returns `false` when nothing was deleted.
    async fn delete(&self, id: &str) -> Result<bool, AppError>;
}

/// MongoDB implementation of the FacilityRepository.
#[cfg(feature = "server")]
pub struct MongoFacilityRepository {
    collection: mongodb::Collection<Facility>,
}

#[cfg(feature = "server")]
impl MongoFacilityRepository {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection("hospitals"),
        }
    }
}

#[cfg(feature = "server")]
fn timestamp_bson(ts: &DateTime<Utc>) -> Result<mongodb::bson::Bson, AppError> {
    // Stored with the same serde representation the model reads back.
    mongodb::bson::to_bson(ts).map_err(|e| AppError::Database(e.to_string()))
}

#[cfg(feature = "server")]
#[async_trait]
impl FacilityRepository for MongoFacilityRepository {
    async fn list_all(&self) -> Result<Vec<Facility>, AppError> {
        use futures::TryStreamExt;
        use mongodb::bson::doc;

        let cursor = self.collection.find(doc! {}).await?;
        let facilities: Vec<Facility> = cursor.try_collect().await?;
        Ok(facilities)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Facility>, AppError> {
        use mongodb::bson::doc;

        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn insert_placeholder(&self, facility: Facility) -> Result<(), AppError> {
        use mongodb::error::{ErrorKind, WriteFailure};

        match self.collection.insert_one(&facility).await {
            Ok(_) => Ok(()),
            Err(e) => match *e.kind {
                ErrorKind::Write(WriteFailure::WriteError(ref we)) if we.code == 11000 => {
                    Err(AppError::Conflict(
                        "A hospital with this Place ID already exists.".into(),
                    ))
                }
                _ => Err(e.into()),
            },
        }
    }

    async fn update_fields(
        &self,
        id: &str,
        fields: &FacilityFields,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        use mongodb::bson::doc;

        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "name": &fields.name,
                    "fullAddress": &fields.full_address,
                    "phoneNumber": &fields.phone_number,
                    "logoURL": &fields.logo_url,
                    "updatedAt": timestamp_bson(&updated_at)?,
                } },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("Hospital '{}' not found", id)));
        }
        Ok(())
    }

    async fn complete(
        &self,
        id: &str,
        fields: &FacilityFields,
        master_password: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        use mongodb::bson::doc;

        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "name": &fields.name,
                    "fullAddress": &fields.full_address,
                    "phoneNumber": &fields.phone_number,
                    "logoURL": &fields.logo_url,
                    "masterPassword": master_password,
                    "updatedAt": timestamp_bson(&updated_at)?,
                } },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!(
                "Reservation for '{}' no longer exists",
                id
            )));
        }
        Ok(())
    }

    async fn set_master_password(&self, id: &str, secret: &str) -> Result<(), AppError> {
        use mongodb::bson::doc;

        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "masterPassword": secret } },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("Hospital '{}' not found", id)));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        use mongodb::bson::doc;

        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}
