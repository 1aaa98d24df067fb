use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::models::event::AssessmentEvent;
use crate::models::user::Assessee;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailMessage {
    pub subject: String,
    pub text: String,
    pub html: String,
    pub from: String,
    pub to: Vec<String>,
}

/// Outbound mail collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_bulk_mail(&self, messages: Vec<MailMessage>) -> Result<()>;
}

/// Posts the batch as JSON to a mail relay.
#[derive(Clone)]
pub struct HttpMailer {
    client: Client,
    target_url: String,
}

impl HttpMailer {
    pub fn new(client: Client, target_url: String) -> Self {
        Self { client, target_url }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_bulk_mail(&self, messages: Vec<MailMessage>) -> Result<()> {
        let resp = self
            .client
            .post(&self.target_url)
            .json(&serde_json::json!({ "messages": messages }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::Internal(format!(
                "Mail relay answered with status {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

/// Used when no relay is configured.
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_bulk_mail(&self, messages: Vec<MailMessage>) -> Result<()> {
        for message in &messages {
            tracing::info!(to = ?message.to, subject = %message.subject, "mail relay disabled, dropping message");
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct NotificationService {
    mailer: Arc<dyn Mailer>,
    from: String,
}

impl NotificationService {
    pub fn new(mailer: Arc<dyn Mailer>, from: String) -> Self {
        Self { mailer, from }
    }

    /// Fire-and-forget: failures are logged, never reported to the caller.
    pub fn invite_participants(
        &self,
        event: &AssessmentEvent,
        assessees: Vec<Assessee>,
    ) -> Option<JoinHandle<()>> {
        if assessees.is_empty() {
            return None;
        }
        let messages = build_invitations(event, &assessees, &self.from);
        let mailer = self.mailer.clone();
        let event_id = event.id;
        Some(tokio::spawn(async move {
            let count = messages.len();
            match mailer.send_bulk_mail(messages).await {
                Ok(()) => tracing::info!(%event_id, count, "participant invitations sent"),
                Err(e) => tracing::error!(%event_id, error = ?e, "failed to send participant invitations"),
            }
        }))
    }
}

fn build_invitations(event: &AssessmentEvent, assessees: &[Assessee], from: &str) -> Vec<MailMessage> {
    let start = event.start_date.format("%Y-%m-%d %H:%M UTC");
    assessees
        .iter()
        .map(|assessee| MailMessage {
            subject: format!("Invitation to {}", event.name),
            text: format!(
                "Hello {},\n\nYou have been registered for the assessment event \"{}\" starting {}.\n",
                assessee.first_name, event.name, start
            ),
            html: format!(
                "<p>Hello {},</p><p>You have been registered for the assessment event <b>{}</b> starting {}.</p>",
                assessee.first_name, event.name, start
            ),
            from: from.to_string(),
            to: vec![assessee.email.clone()],
        })
        .collect()
}
