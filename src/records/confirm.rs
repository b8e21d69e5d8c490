//! Two-gate confirmations guarding destructive or sensitive actions.
//!
//! Each flow is a small typestate: the typed phrase turns a `Pending*` value
//! into a `Confirmed*` value, and only the confirmed value can perform the
//! remote call. The second gate is the explicit call to `execute`.

use crate::db::facility_repository::FacilityRepository;
use crate::db::models::Facility;
use crate::error::AppError;

/// Phrase an operator must type before deleting a facility.
pub const DELETE_PHRASE: &str = "Yes Delete";

/// Phrase an operator must type before revealing a facility's secret.
pub const REVEAL_PHRASE: &str = "Yes Show";

fn phrase_matches(expected: &str, typed: &str) -> Result<(), AppError> {
    if typed == expected {
        Ok(())
    } else {
        Err(AppError::validation(
            "confirmation",
            format!("Type \"{}\" to continue", expected),
        ))
    }
}

/// A deletion the operator has opened but not yet confirmed.
#[derive(Debug, Clone)]
pub struct PendingDeletion {
    id: String,
    name: String,
}

/// A deletion whose typed phrase matched. Awaiting final acknowledgement.
#[derive(Debug)]
pub struct ConfirmedDeletion {
    id: String,
    name: String,
}

impl PendingDeletion {
    pub fn new(facility: &Facility) -> Self {
        Self {
            id: facility.id.clone(),
            name: facility.name.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// First gate. On mismatch the pending deletion is handed back so the
    /// dialog can stay open.
    pub fn confirm(self, typed: &str) -> Result<ConfirmedDeletion, (Self, AppError)> {
        match phrase_matches(DELETE_PHRASE, typed) {
            Ok(()) => Ok(ConfirmedDeletion {
                id: self.id,
                name: self.name,
            }),
            Err(e) => Err((self, e)),
        }
    }
}

impl ConfirmedDeletion {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Final gate: issue the remote delete. Returns the deleted id.
    pub async fn execute(self, repo: &dyn FacilityRepository) -> Result<String, AppError> {
        match repo.delete(&self.id).await {
            Ok(true) => {
                tracing::info!("Deleted hospital '{}' ({})", self.name, self.id);
                Ok(self.id)
            }
            Ok(false) => Err(AppError::NotFound(format!(
                "Hospital '{}' not found",
                self.id
            ))),
            Err(e) => {
                tracing::error!("Error deleting hospital {}: {}", self.id, e);
                Err(e)
            }
        }
    }
}

/// A secret reveal the operator has opened but not yet confirmed.
#[derive(Debug, Clone)]
pub struct PendingReveal {
    id: String,
}

/// A reveal whose typed phrase matched.
#[derive(Debug)]
pub struct ConfirmedReveal {
    id: String,
}

impl PendingReveal {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn confirm(self, typed: &str) -> Result<ConfirmedReveal, (Self, AppError)> {
        match phrase_matches(REVEAL_PHRASE, typed) {
            Ok(()) => Ok(ConfirmedReveal { id: self.id }),
            Err(e) => Err((self, e)),
        }
    }
}

impl ConfirmedReveal {
    /// Fetch the stored secret. A record without one gets `default_secret`
    /// written to it, and that value is returned.
    pub async fn execute(
        self,
        repo: &dyn FacilityRepository,
        default_secret: &str,
    ) -> Result<String, AppError> {
        let facility = repo
            .find_by_id(&self.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Hospital '{}' not found", self.id)))?;

        match facility.master_password {
            Some(secret) if !secret.is_empty() => Ok(secret),
            _ => {
                tracing::info!("Hospital {} had no master password, writing default", self.id);
                repo.set_master_password(&self.id, default_secret).await?;
                Ok(default_secret.to_string())
            }
        }
    }
}

/// Overwrite a facility's secret after checking the new value and its
/// confirmation.
pub async fn change_master_password(
    repo: &dyn FacilityRepository,
    id: &str,
    new_password: &str,
    confirm_password: &str,
) -> Result<(), AppError> {
    if new_password.trim().is_empty() {
        return Err(AppError::validation("newPassword", "Password cannot be empty"));
    }
    if new_password != confirm_password {
        return Err(AppError::validation("confirmPassword", "Passwords do not match"));
    }

    repo.set_master_password(id, new_password)
        .await
        .inspect_err(|e| tracing::error!("Error updating password for {}: {}", id, e))
}
