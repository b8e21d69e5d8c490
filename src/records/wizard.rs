use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::facility_repository::FacilityRepository;
use crate::db::models::{Facility, FacilityFields};
use crate::error::AppError;

/// Steps of the facility creation wizard, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    Address,
    Logo,
    Name,
    Phone,
    Secret,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        WizardStep::Address,
        WizardStep::Logo,
        WizardStep::Name,
        WizardStep::Phone,
        WizardStep::Secret,
    ];

    fn index(self) -> usize {
        WizardStep::ALL
            .iter()
            .position(|s| *s == self)
            .unwrap_or_default()
    }

    pub fn next(self) -> Option<WizardStep> {
        WizardStep::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<WizardStep> {
        self.index().checked_sub(1).map(|i| WizardStep::ALL[i])
    }
}

/// Values collected across the wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardDraft {
    #[serde(default)]
    pub full_address: String,
    #[serde(rename = "logoURL", default)]
    pub logo_url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub master_password: String,
}

impl WizardDraft {
    fn fields(&self) -> FacilityFields {
        FacilityFields {
            name: self.name.clone(),
            full_address: self.full_address.clone(),
            phone_number: self.phone_number.clone(),
            logo_url: self.logo_url.clone(),
        }
    }
}

/// Result of pressing "next".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved on to this step.
    To(WizardStep),
    /// The last step validated; the wizard can be completed.
    Ready,
}

/// Result of pressing "back".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retreat {
    To(WizardStep),
    /// Back from the first step means leaving the wizard.
    Abandon,
}

/// Multi-step facility creation.
///
/// Reserving writes a placeholder document keyed by the place id so the id
/// cannot be taken while the operator fills in the steps. The wizard ends
/// either in `complete`, which writes every field at once, or in `cancel`,
/// which deletes the placeholder.
#[derive(Debug, Clone)]
pub struct CreateWizard {
    place_id: String,
    step: WizardStep,
    ready: bool,
    draft: WizardDraft,
}

impl CreateWizard {
    /// Validate the place id and write the placeholder.
    pub async fn reserve(repo: &dyn FacilityRepository, place_id: &str) -> Result<Self, AppError> {
        let place_id = place_id.trim();
        if place_id.is_empty() {
            return Err(AppError::validation("placeId", "Place ID is required"));
        }

        if repo.find_by_id(place_id).await?.is_some() {
            return Err(AppError::Conflict(
                "A hospital with this Place ID already exists.".into(),
            ));
        }

        repo.insert_placeholder(Facility::placeholder(place_id, Utc::now()))
            .await
            .inspect_err(|e| {
                tracing::error!("Error creating initial hospital record {}: {}", place_id, e)
            })?;

        tracing::info!("Reserved place id {}", place_id);
        Ok(Self::at_start(place_id))
    }

    /// Pick up an existing reservation, e.g. when the steps were collected
    /// client-side. Fails unless the placeholder is still bare.
    pub async fn resume(repo: &dyn FacilityRepository, place_id: &str) -> Result<Self, AppError> {
        let place_id = place_id.trim();
        match repo.find_by_id(place_id).await? {
            Some(f) if f.is_placeholder() => Ok(Self::at_start(place_id)),
            Some(_) => Err(AppError::Conflict(format!(
                "Hospital '{}' has already been created",
                place_id
            ))),
            None => Err(AppError::NotFound(format!(
                "No reservation for '{}'",
                place_id
            ))),
        }
    }

    fn at_start(place_id: &str) -> Self {
        Self {
            place_id: place_id.to_string(),
            step: WizardStep::Address,
            ready: false,
            draft: WizardDraft::default(),
        }
    }

    pub fn place_id(&self) -> &str {
        &self.place_id
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &WizardDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut WizardDraft {
        self.ready = false;
        &mut self.draft
    }

    fn validate(&self, step: WizardStep) -> Result<(), AppError> {
        match step {
            WizardStep::Address if self.draft.full_address.trim().is_empty() => Err(
                AppError::validation("fullAddress", "Full Address is required"),
            ),
            WizardStep::Name if self.draft.name.trim().is_empty() => Err(
                AppError::validation("name", "Hospital Name is required"),
            ),
            WizardStep::Secret if self.draft.master_password.trim().is_empty() => Err(
                AppError::validation("masterPassword", "Master Password is required"),
            ),
            _ => Ok(()),
        }
    }

    /// Validate the current step and move forward.
    pub fn next(&mut self) -> Result<Advance, AppError> {
        self.validate(self.step)?;
        match self.step.next() {
            Some(step) => {
                self.step = step;
                Ok(Advance::To(step))
            }
            None => {
                self.ready = true;
                Ok(Advance::Ready)
            }
        }
    }

    /// Step back without validation.
    pub fn back(&mut self) -> Retreat {
        self.ready = false;
        match self.step.previous() {
            Some(step) => {
                self.step = step;
                Retreat::To(step)
            }
            None => Retreat::Abandon,
        }
    }

    /// Walk every remaining step with the current draft.
    pub fn advance_to_end(&mut self) -> Result<(), AppError> {
        while !self.ready {
            self.next()?;
        }
        Ok(())
    }

    /// Write every collected field in one update.
    pub async fn complete(self, repo: &dyn FacilityRepository) -> Result<String, AppError> {
        if !self.ready {
            return Err(AppError::BadRequest(format!(
                "Wizard is at the {:?} step and cannot be completed yet",
                self.step
            )));
        }
        // Required fields are checked again in case the draft changed.
        for step in WizardStep::ALL {
            self.validate(step)?;
        }

        repo.complete(
            &self.place_id,
            &self.draft.fields(),
            &self.draft.master_password,
            Utc::now(),
        )
        .await
        .inspect_err(|e| tracing::error!("Error completing hospital {}: {}", self.place_id, e))?;

        tracing::info!("Hospital {} created", self.place_id);
        Ok(self.place_id)
    }

    /// Abandon the wizard and delete the placeholder. Cleanup failures are
    /// logged only.
    pub async fn cancel(self, repo: &dyn FacilityRepository) {
        abandon_reservation(repo, &self.place_id).await;
    }
}

/// Delete a reservation that never completed. Records that already carry
/// their fields are left alone.
pub async fn abandon_reservation(repo: &dyn FacilityRepository, place_id: &str) {
    match repo.find_by_id(place_id).await {
        Ok(Some(f)) if !f.is_placeholder() => {
            tracing::warn!("Refusing to discard completed hospital {}", place_id);
        }
        Ok(_) => {
            if let Err(e) = repo.delete(place_id).await {
                tracing::error!("Error cleaning up incomplete hospital record {}: {}", place_id, e);
            }
        }
        Err(e) => {
            tracing::error!("Error cleaning up incomplete hospital record {}: {}", place_id, e);
        }
    }
}
