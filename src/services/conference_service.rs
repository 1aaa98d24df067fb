use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use uuid::Uuid;

use crate::database::Repo;
use crate::error::{Error, Result};
use crate::models::participation::Participation;
use crate::models::video_conference::VideoConferenceRoom;
use crate::services::event_service::EventService;
use crate::services::identity_service::IdentityService;

/// Allocates and tears down rooms on the conferencing platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConferenceProvider: Send + Sync {
    async fn create_room(&self) -> Result<String>;
    async fn end_room(&self, room_id: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct HttpConferenceProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct CreatedRoom {
    room_id: String,
}

impl HttpConferenceProvider {
    pub fn new(client: Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl ConferenceProvider for HttpConferenceProvider {
    async fn create_room(&self) -> Result<String> {
        let created: CreatedRoom = self
            .client
            .post(format!("{}/rooms", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(created.room_id)
    }

    async fn end_room(&self, room_id: &str) -> Result<()> {
        self.client
            .delete(format!("{}/rooms/{}", self.base_url, room_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Stand-in when no conferencing platform is configured.
#[derive(Clone, Default)]
pub struct DisabledConferenceProvider;

#[async_trait]
impl ConferenceProvider for DisabledConferenceProvider {
    async fn create_room(&self) -> Result<String> {
        Err(Error::Unsupported(
            "Video conferencing is not configured.".to_string(),
        ))
    }

    async fn end_room(&self, _room_id: &str) -> Result<()> {
        Ok(())
    }
}

/// One room per participation, opened by the pair or invited roleplayers.
#[derive(Clone)]
pub struct ConferenceService {
    repo: Arc<dyn Repo>,
    events: EventService,
    identity: IdentityService,
    provider: Arc<dyn ConferenceProvider>,
}

impl ConferenceService {
    pub fn new(
        repo: Arc<dyn Repo>,
        events: EventService,
        identity: IdentityService,
        provider: Arc<dyn ConferenceProvider>,
    ) -> Self {
        Self {
            repo,
            events,
            identity,
            provider,
        }
    }

    pub async fn initiate_room(
        &self,
        event_id: Uuid,
        assessee_id: Uuid,
        caller_id: Uuid,
    ) -> Result<VideoConferenceRoom> {
        let event = self
            .events
            .load_event(event_id)
            .await
            .map_err(Error::into_invalid_request)?;
        if !self.events.is_active(&event).await? {
            return Err(Error::BadRequest(format!(
                "Assessment event of id {} is not in progress",
                event.id
            )));
        }
        let part = self
            .repo
            .participation_find(event.id, assessee_id)
            .await?
            .ok_or_else(|| {
                Error::BadRequest(format!(
                    "Assessee {} does not take part in assessment event {}",
                    assessee_id, event.id
                ))
            })?;

        // Roleplayers only exist on a stored room, so membership is settled
        // before anything is created.
        let existing = self.repo.room_find_by_participation(part.id).await?;
        let allowed = caller_id == part.assessee_id
            || caller_id == part.assessor_id
            || existing
                .as_ref()
                .is_some_and(|room| room.roleplayer_ids.contains(&caller_id));
        if !allowed {
            return Err(Error::Unauthorized(
                "You are not a member of this video conference room".to_string(),
            ));
        }
        let room = match existing {
            Some(room) => room,
            None => self.repo.room_get_or_create(part.id).await?,
        };
        if room.is_locked {
            return Err(Error::BadRequest(
                "The video conference room has been locked.".to_string(),
            ));
        }
        if room.external_room_id.is_some() {
            return Ok(room);
        }

        let external = self.provider.create_room().await?;
        let room = self.repo.room_attach_external(room.id, &external).await?;
        if room.external_room_id.as_deref() != Some(external.as_str()) {
            // Lost a race with another initiator; release the spare.
            if let Err(e) = self.provider.end_room(&external).await {
                tracing::warn!(room = %external, error = ?e, "failed to end spare conference room");
            }
        } else {
            tracing::info!(room_id = %room.id, external_room_id = %external, "video conference room allocated");
        }
        Ok(room)
    }

    pub async fn add_roleplayer(
        &self,
        room_id: Uuid,
        roleplayer_email: &str,
        caller_id: Uuid,
    ) -> Result<VideoConferenceRoom> {
        let (room, part) = self.load_for_assessor(room_id, caller_id).await?;
        if room.is_locked {
            return Err(Error::BadRequest(
                "The video conference room has been locked.".to_string(),
            ));
        }
        let event = self.events.load_event(part.event_id).await?;
        let roleplayer = self
            .identity
            .resolve_assessor_of_company(roleplayer_email.trim(), event.company_id)
            .await
            .map_err(Error::into_invalid_request)?;
        self.repo.room_add_roleplayer(room.id, roleplayer.id).await
    }

    /// Idempotent; only the call that actually locks the room ends it on the
    /// platform.
    pub async fn lock_room(&self, room_id: Uuid, caller_id: Uuid) -> Result<VideoConferenceRoom> {
        let (room, _) = self.load_for_assessor(room_id, caller_id).await?;
        let (room, newly_locked) = self.repo.room_lock(room.id).await?;
        if newly_locked {
            tracing::info!(room_id = %room.id, "video conference room locked");
            if let Some(external) = room.external_room_id.as_deref() {
                if let Err(e) = self.provider.end_room(external).await {
                    tracing::error!(room_id = %room.id, error = ?e, "failed to end conference room");
                }
            }
        }
        Ok(room)
    }

    async fn load_for_assessor(
        &self,
        room_id: Uuid,
        caller_id: Uuid,
    ) -> Result<(VideoConferenceRoom, Participation)> {
        let room = self.repo.room_try_load(room_id).await?.ok_or_else(|| {
            Error::NotFound(format!("Video conference room of id {} does not exist", room_id))
        })?;
        let part = self
            .repo
            .participation_try_load(room.participation_id)
            .await?
            .ok_or_else(|| Error::Internal(format!("Room {} has no participation", room.id)))?;
        if part.assessor_id != caller_id {
            return Err(Error::Unauthorized(
                "Only the responsible assessor can manage this video conference room".to_string(),
            ));
        }
        Ok((room, part))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{ParticipationsRepo, RoomsRepo};
    use crate::services::participation_service::tests::{pair, world, World};
    use crate::utils::time::parse_iso_datetime;
    use axum::http::StatusCode;

    async fn running(provider: MockConferenceProvider) -> (World, ConferenceService) {
        let w = world().await;
        w.svc
            .add_participants(w.event.id, w.company.id, pair("sam@mail.test", "ann@acme.test"))
            .await
            .unwrap();
        w.clock.set(parse_iso_datetime("2022-12-02T09:15:00Z").unwrap());
        let shared: Arc<dyn Repo> = Arc::new(w.repo.clone());
        let svc = ConferenceService::new(
            shared.clone(),
            w.events.clone(),
            IdentityService::new(shared),
            Arc::new(provider),
        );
        (w, svc)
    }

    #[tokio::test]
    async fn room_is_allocated_once() {
        let mut provider = MockConferenceProvider::new();
        provider
            .expect_create_room()
            .times(1)
            .returning(|| Ok("ext-1".to_string()));
        let (w, svc) = running(provider).await;

        let first = svc
            .initiate_room(w.event.id, w.assessee.id, w.assessee.id)
            .await
            .unwrap();
        assert_eq!(first.external_room_id.as_deref(), Some("ext-1"));
        let second = svc
            .initiate_room(w.event.id, w.assessee.id, w.assessor.id)
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
    }

    #[tokio::test]
    async fn refused_caller_leaves_no_room_behind() {
        let mut provider = MockConferenceProvider::new();
        provider.expect_create_room().times(0);
        let (w, svc) = running(provider).await;

        let err = svc
            .initiate_room(w.event.id, w.assessee.id, w.other_assessor.id)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        let part = w
            .repo
            .participation_find(w.event.id, w.assessee.id)
            .await
            .unwrap()
            .unwrap();
        assert!(w.repo.room_find_by_participation(part.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn strangers_cannot_join_until_added_as_roleplayer() {
        let mut provider = MockConferenceProvider::new();
        provider
            .expect_create_room()
            .times(1)
            .returning(|| Ok("ext-1".to_string()));
        let (w, svc) = running(provider).await;

        let err = svc
            .initiate_room(w.event.id, w.assessee.id, w.other_assessor.id)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let room = svc
            .initiate_room(w.event.id, w.assessee.id, w.assessor.id)
            .await
            .unwrap();
        let err = svc
            .add_roleplayer(room.id, "bob@acme.test", w.other_assessor.id)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let room = svc
            .add_roleplayer(room.id, "bob@acme.test", w.assessor.id)
            .await
            .unwrap();
        assert_eq!(room.roleplayer_ids, vec![w.other_assessor.id]);
        svc.initiate_room(w.event.id, w.assessee.id, w.other_assessor.id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn roleplayer_must_belong_to_the_company() {
        let mut provider = MockConferenceProvider::new();
        provider
            .expect_create_room()
            .returning(|| Ok("ext-1".to_string()));
        let (w, svc) = running(provider).await;
        let other = w.repo.add_company("Other", "hr@other.test");
        w.repo.add_assessor(other.id, "eve@other.test", "Eve", "Stone");

        let room = svc
            .initiate_room(w.event.id, w.assessee.id, w.assessor.id)
            .await
            .unwrap();
        let err = svc
            .add_roleplayer(room.id, "eve@other.test", w.assessor.id)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn locking_ends_the_room_once() {
        let mut provider = MockConferenceProvider::new();
        provider
            .expect_create_room()
            .times(1)
            .returning(|| Ok("ext-1".to_string()));
        provider
            .expect_end_room()
            .withf(|id| id.to_string() == "ext-1")
            .times(1)
            .returning(|_| Ok(()));
        let (w, svc) = running(provider).await;

        let room = svc
            .initiate_room(w.event.id, w.assessee.id, w.assessee.id)
            .await
            .unwrap();
        assert!(svc.lock_room(room.id, w.assessor.id).await.unwrap().is_locked);
        assert!(svc.lock_room(room.id, w.assessor.id).await.unwrap().is_locked);

        let err = svc
            .initiate_room(w.event.id, w.assessee.id, w.assessee.id)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "The video conference room has been locked.");
    }

    #[tokio::test]
    async fn rooms_open_only_while_the_event_runs() {
        let provider = MockConferenceProvider::new();
        let (w, svc) = running(provider).await;
        w.clock.set(parse_iso_datetime("2022-12-02T12:00:00Z").unwrap());
        let err = svc
            .initiate_room(w.event.id, w.assessee.id, w.assessee.id)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
