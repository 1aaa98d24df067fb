pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Settings;
use crate::database::Repo;
use crate::services::{
    attempt_service::AttemptService,
    conference_service::{ConferenceProvider, ConferenceService},
    event_service::EventService,
    grading_service::GradingService,
    identity_service::IdentityService,
    notification_service::{Mailer, NotificationService},
    participation_service::ParticipationService,
    release_service::ReleaseService,
    test_flow_service::TestFlowService,
    tool_service::ToolService,
};
use crate::utils::time::Clock;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub clock: Arc<dyn Clock>,
    pub settings: Settings,
    pub identity_service: IdentityService,
    pub tool_service: ToolService,
    pub test_flow_service: TestFlowService,
    pub event_service: EventService,
    pub participation_service: ParticipationService,
    pub release_service: ReleaseService,
    pub attempt_service: AttemptService,
    pub grading_service: GradingService,
    pub conference_service: ConferenceService,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn Repo>,
        clock: Arc<dyn Clock>,
        settings: Settings,
        mailer: Arc<dyn Mailer>,
        conference: Arc<dyn ConferenceProvider>,
    ) -> Self {
        let identity_service = IdentityService::new(repo.clone());
        let tool_service = ToolService::new(repo.clone());
        let test_flow_service = TestFlowService::new(repo.clone());
        let event_service = EventService::new(repo.clone(), clock.clone());
        let notification_service = NotificationService::new(mailer, settings.mail_from.clone());
        let participation_service = ParticipationService::new(
            repo.clone(),
            event_service.clone(),
            identity_service.clone(),
            notification_service,
        );
        let release_service = ReleaseService::new(
            repo.clone(),
            event_service.clone(),
            participation_service.clone(),
            clock.clone(),
            settings.poll_interval,
        );
        let attempt_service = AttemptService::new(
            repo.clone(),
            event_service.clone(),
            participation_service.clone(),
        );
        let grading_service = GradingService::new(repo.clone(), participation_service.clone());
        let conference_service = ConferenceService::new(
            repo.clone(),
            event_service.clone(),
            identity_service.clone(),
            conference,
        );

        Self {
            repo,
            clock,
            settings,
            identity_service,
            tool_service,
            test_flow_service,
            event_service,
            participation_service,
            release_service,
            attempt_service,
            grading_service,
            conference_service,
        }
    }
}
