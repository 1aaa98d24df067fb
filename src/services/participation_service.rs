use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::database::{AttemptShell, NewParticipation, Repo};
use crate::dto::participant_dto::{AddParticipantsPayload, AddParticipantsResponse};
use crate::error::{Error, Result};
use crate::models::participation::Participation;
use crate::models::user::Assessee;
use crate::services::event_service::EventService;
use crate::services::identity_service::IdentityService;
use crate::services::notification_service::NotificationService;

/// Who takes part in an event and which assessor answers for whom.
#[derive(Clone)]
pub struct ParticipationService {
    repo: Arc<dyn Repo>,
    events: EventService,
    identity: IdentityService,
    notifications: NotificationService,
}

impl ParticipationService {
    pub fn new(
        repo: Arc<dyn Repo>,
        events: EventService,
        identity: IdentityService,
        notifications: NotificationService,
    ) -> Self {
        Self {
            repo,
            events,
            identity,
            notifications,
        }
    }

    /// Resolves every pair before writing; one unknown email aborts the whole
    /// batch. Assessees already in the event are skipped untouched.
    pub async fn add_participants(
        &self,
        event_id: Uuid,
        company_id: Uuid,
        payload: AddParticipantsPayload,
    ) -> Result<AddParticipantsResponse> {
        let event = self
            .events
            .get_owned_event(event_id, company_id)
            .await
            .map_err(Error::into_invalid_request)?;
        payload.validate()?;

        let mut pairs = Vec::with_capacity(payload.participants.len());
        let mut assessees = Vec::with_capacity(payload.participants.len());
        let mut seen = HashSet::new();
        for pair in &payload.participants {
            let assessee = self
                .identity
                .find_assessee(pair.assessee_email.trim())
                .await
                .map_err(Error::into_invalid_request)?;
            let assessor = self
                .identity
                .resolve_assessor_of_company(pair.assessor_email.trim(), company_id)
                .await
                .map_err(Error::into_invalid_request)?;
            // First pairing wins for an assessee listed twice.
            if !seen.insert(assessee.id) {
                continue;
            }
            pairs.push(NewParticipation {
                assessee_id: assessee.id,
                assessor_id: assessor.id,
            });
            assessees.push(assessee);
        }

        let flow = self.repo.flow_try_load(event.test_flow_id).await?.ok_or_else(|| {
            Error::Internal(format!("Test flow {} of event {} is missing", event.test_flow_id, event.id))
        })?;
        let shells: Vec<AttemptShell> = flow
            .tools
            .iter()
            .map(|entry| AttemptShell {
                tool_id: entry.tool.id,
                kind: entry.tool.kind.tag(),
            })
            .collect();

        let requested = payload.participants.len();
        let added = self.repo.participations_add(event.id, pairs, &shells).await?;
        tracing::info!(
            event_id = %event.id,
            requested,
            added = added.len(),
            "participants registered"
        );

        let added_ids: HashSet<Uuid> = added.iter().map(|p| p.assessee_id).collect();
        let invited: Vec<Assessee> = assessees
            .into_iter()
            .filter(|a| added_ids.contains(&a.id))
            .collect();
        self.notifications.invite_participants(&event, invited);

        Ok(AddParticipantsResponse {
            added: added.len(),
            skipped: requested - added.len(),
        })
    }

    pub async fn check_pair_responsibility(
        &self,
        event_id: Uuid,
        assessee_id: Uuid,
        assessor_id: Uuid,
    ) -> Result<bool> {
        Ok(matches!(
            self.repo.participation_find(event_id, assessee_id).await?,
            Some(p) if p.assessor_id == assessor_id
        ))
    }

    pub async fn check_assessee_participation(&self, event_id: Uuid, assessee_id: Uuid) -> Result<bool> {
        Ok(self.repo.participation_find(event_id, assessee_id).await?.is_some())
    }

    pub async fn check_assessor_participation(&self, event_id: Uuid, assessor_id: Uuid) -> Result<bool> {
        Ok(self
            .repo
            .participation_select_by_event(event_id)
            .await?
            .iter()
            .any(|p| p.assessor_id == assessor_id))
    }

    pub async fn require_participation(&self, event_id: Uuid, assessee_id: Uuid) -> Result<Participation> {
        self.repo
            .participation_find(event_id, assessee_id)
            .await?
            .ok_or_else(|| {
                Error::Unauthorized(format!(
                    "You are not a participant of assessment event {}",
                    event_id
                ))
            })
    }

    /// Full roster, for the owning company.
    pub async fn list_participants(
        &self,
        event_id: Uuid,
        company_id: Uuid,
    ) -> Result<Vec<(Participation, Assessee)>> {
        let event = self.events.get_owned_event(event_id, company_id).await?;
        self.with_assessees(self.repo.participation_select_by_event(event.id).await?)
            .await
    }

    /// Pairs the assessor answers for, only while the event is running.
    pub async fn active_participants(
        &self,
        event_id: Uuid,
        assessor_id: Uuid,
    ) -> Result<Vec<(Participation, Assessee)>> {
        let event = self.events.load_event(event_id).await?;
        if !self.check_assessor_participation(event.id, assessor_id).await? {
            return Err(Error::Forbidden(format!(
                "You are not an assessor of assessment event {}",
                event_id
            )));
        }
        if !self.events.is_active(&event).await? {
            return Ok(Vec::new());
        }
        let parts = self
            .repo
            .participation_select_by_event(event.id)
            .await?
            .into_iter()
            .filter(|p| p.assessor_id == assessor_id)
            .collect();
        self.with_assessees(parts).await
    }

    async fn with_assessees(&self, parts: Vec<Participation>) -> Result<Vec<(Participation, Assessee)>> {
        let mut rows = Vec::with_capacity(parts.len());
        for part in parts {
            if let Some(assessee) = self.repo.assessee_try_load(part.assessee_id).await? {
                rows.push((part, assessee));
            }
        }
        Ok(rows)
    }
}
