use chrono::Utc;
use serde::Deserialize;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::{require_admin, BookingError, Scheduler};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServiceDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: u64,
    pub duration_minutes: u16,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: i32,
}

fn active_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServicePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<u64>,
    pub duration_minutes: Option<u16>,
    pub is_active: Option<bool>,
    pub display_order: Option<i32>,
}

fn validate_service(service: &Service) -> Result<(), BookingError> {
    if service.name.is_empty() {
        return Err(BookingError::Validation("service name is required".into()));
    }
    if service.name.chars().count() > MAX_SERVICE_NAME_LEN {
        return Err(BookingError::Validation(format!(
            "service name must be at most {MAX_SERVICE_NAME_LEN} characters"
        )));
    }
    if service
        .description
        .as_ref()
        .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
    {
        return Err(BookingError::Validation(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    if service.duration_minutes == 0 {
        return Err(BookingError::Validation(
            "durationMinutes must be at least 1".into(),
        ));
    }
    Ok(())
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

impl Scheduler {
    /// Active services for the public; every service when `include_inactive`.
    pub async fn list_services(&self, include_inactive: bool) -> Result<Vec<Service>, BookingError> {
        let mut services = self
            .bounded("list_services", self.store.list_services())
            .await?;
        if !include_inactive {
            services.retain(|s| s.is_active);
        }
        services.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(services)
    }

    pub async fn create_service(&self, claim: &Claim, draft: ServiceDraft) -> Result<Service, BookingError> {
        require_admin(claim)?;
        let service = Service {
            id: Ulid::new(),
            name: draft.name.trim().to_string(),
            description: clean_description(draft.description),
            price: draft.price,
            duration_minutes: draft.duration_minutes,
            is_active: draft.is_active,
            display_order: draft.display_order,
            created_at: Utc::now(),
        };
        validate_service(&service)?;

        let saved = self
            .bounded("save_service", self.store.save_service(service))
            .await?;
        tracing::info!(service_id = %saved.id, name = %saved.name, admin = %claim.user_id, "service created");
        Ok(saved)
    }

    /// Partial update. Deactivating hides the service from booking; existing
    /// appointments keep their price snapshot.
    pub async fn update_service(
        &self,
        claim: &Claim,
        id: Ulid,
        patch: ServicePatch,
    ) -> Result<Service, BookingError> {
        require_admin(claim)?;
        let mut service = self
            .bounded("service", self.store.service(id))
            .await?
            .ok_or_else(|| BookingError::NotFound("service not found".into()))?;

        if let Some(name) = patch.name {
            service.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            service.description = clean_description(Some(description));
        }
        if let Some(price) = patch.price {
            service.price = price;
        }
        if let Some(minutes) = patch.duration_minutes {
            service.duration_minutes = minutes;
        }
        if let Some(active) = patch.is_active {
            service.is_active = active;
        }
        if let Some(order) = patch.display_order {
            service.display_order = order;
        }
        validate_service(&service)?;

        let saved = self
            .bounded("save_service", self.store.save_service(service))
            .await?;
        tracing::info!(service_id = %id, active = saved.is_active, admin = %claim.user_id, "service updated");
        Ok(saved)
    }
}
