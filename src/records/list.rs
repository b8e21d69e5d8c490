use chrono::Utc;

use crate::db::facility_repository::FacilityRepository;
use crate::db::models::{Facility, FacilityFields};
use crate::error::AppError;
use crate::records::query::{filter_and_sort, SortKey};

/// A session's local copy of the facilities collection.
///
/// Remote writes go straight to the repository; afterwards the affected
/// document is re-read and the re-read copy replaces the local one, so the
/// list only ever reflects what the store confirmed.
#[derive(Debug, Default, Clone)]
pub struct RecordList {
    items: Vec<Facility>,
    loaded: bool,
}

impl RecordList {
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn replace(&mut self, items: Vec<Facility>) {
        self.items = items;
        self.loaded = true;
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.loaded = false;
    }

    pub fn get(&self, id: &str) -> Option<&Facility> {
        self.items.iter().find(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Filtered, sorted view of the local copy.
    pub fn view(&self, query: &str, sort: SortKey) -> Vec<Facility> {
        filter_and_sort(&self.items, query, sort)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Drop a record that was deleted remotely.
    pub fn remove(&mut self, id: &str) -> Option<Facility> {
        let pos = self.items.iter().position(|f| f.id == id)?;
        Some(self.items.remove(pos))
    }

    /// Merge a confirmed copy of a record, inserting it if unknown.
    pub fn upsert(&mut self, facility: Facility) {
        match self.items.iter_mut().find(|f| f.id == facility.id) {
            Some(existing) => *existing = facility,
            None => self.items.push(facility),
        }
    }
}

/// Fetch the whole collection.
pub async fn fetch_all(repo: &dyn FacilityRepository) -> Result<Vec<Facility>, AppError> {
    repo.list_all()
        .await
        .inspect_err(|e| tracing::error!("Error fetching hospitals: {}", e))
}

/// An edit in progress: the current values loaded into a mutable draft.
#[derive(Debug, Clone)]
pub struct EditDraft {
    id: String,
    pub fields: FacilityFields,
}

impl EditDraft {
    pub fn open(facility: &Facility) -> Self {
        Self {
            id: facility.id.clone(),
            fields: facility.fields(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Write the full draft back and return the record as stored afterwards.
    pub async fn save(self, repo: &dyn FacilityRepository) -> Result<Facility, AppError> {
        repo.update_fields(&self.id, &self.fields, Utc::now())
            .await
            .inspect_err(|e| tracing::error!("Error updating hospital {}: {}", self.id, e))?;

        repo.find_by_id(&self.id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Hospital '{}' disappeared after update", self.id))
        })
    }
}
