use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, BoxStream, StreamExt};
use uuid::Uuid;

use crate::database::Repo;
use crate::dto::task_dto::{ReleaseMessage, ReleasedTool};
use crate::error::{Error, Result};
use crate::models::user::Assessee;
use crate::services::event_clock::{EventClock, ScheduledTool};
use crate::services::event_service::EventService;
use crate::services::participation_service::ParticipationService;
use crate::utils::time::Clock;

/// Release instants still ahead of one subscription, in flow order.
#[derive(Debug, Clone, Default)]
pub struct ReleaseQueue {
    pending: VecDeque<ScheduledTool>,
}

impl ReleaseQueue {
    pub fn new(clock: &EventClock, now: DateTime<Utc>) -> Self {
        Self {
            pending: clock.pending(now).into(),
        }
    }

    /// Pops every entry whose release instant is not after `now`. Several may
    /// fall due in one tick; they come out in flow order.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Vec<ScheduledTool> {
        let mut due = Vec::new();
        while self.pending.front().is_some_and(|s| s.release_at <= now) {
            if let Some(next) = self.pending.pop_front() {
                due.push(next);
            }
        }
        due
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Serves the live task-release stream. Every subscription owns its own
/// queue and timer; nothing is shared between subscribers.
#[derive(Clone)]
pub struct ReleaseService {
    repo: Arc<dyn Repo>,
    events: EventService,
    participations: ParticipationService,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
}

impl ReleaseService {
    pub fn new(
        repo: Arc<dyn Repo>,
        events: EventService,
        participations: ParticipationService,
        clock: Arc<dyn Clock>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            repo,
            events,
            participations,
            clock,
            poll_interval,
        }
    }

    /// Fails before any stream exists unless the event is running and the
    /// caller takes part in it.
    pub async fn subscribe(
        &self,
        event_id: Uuid,
        assessee: &Assessee,
    ) -> Result<BoxStream<'static, ReleaseMessage>> {
        let event = self.events.load_event(event_id).await?;
        let part = self
            .participations
            .require_participation(event.id, assessee.id)
            .await?;
        let event_clock = self.events.clock_for(&event).await?;
        let now = self.clock.now();
        if !event_clock.is_active(now) {
            return Err(Error::NotFound(format!(
                "Active assessment event of id {} does not exist",
                event.id
            )));
        }

        let attempts = self
            .repo
            .attempt_select_by_participation(part.id)
            .await?
            .into_iter()
            .map(|a| (a.tool_id, a.id))
            .collect();
        let queue = ReleaseQueue::new(&event_clock, now);
        tracing::info!(
            event_id = %event.id,
            assessee_id = %assessee.id,
            pending = queue.len(),
            "release subscription opened"
        );

        let sub = Subscription {
            event_id: event.id,
            assessee_id: assessee.id,
            clock: self.clock.clone(),
            interval: self.poll_interval,
            end: event_clock.end(),
            queue,
            attempts,
            ready: VecDeque::new(),
            begun: false,
        };
        Ok(stream::unfold(sub, |mut sub| async move {
            let msg = sub.next_message().await?;
            Some((msg, sub))
        })
        .boxed())
    }

    /// Everything already released to the caller; the live stream never
    /// repeats these after a reconnect.
    pub async fn released_tools(&self, event_id: Uuid, assessee: &Assessee) -> Result<Vec<ReleasedTool>> {
        let event = self.events.load_event(event_id).await?;
        let part = self
            .participations
            .require_participation(event.id, assessee.id)
            .await?;
        let event_clock = self.events.clock_for(&event).await?;
        let attempts: HashMap<Uuid, Uuid> = self
            .repo
            .attempt_select_by_participation(part.id)
            .await?
            .into_iter()
            .map(|a| (a.tool_id, a.id))
            .collect();
        Ok(event_clock
            .released(self.clock.now())
            .map(|s| ReleasedTool::new(s, attempts.get(&s.tool.id).copied()))
            .collect())
    }
}

struct Subscription {
    event_id: Uuid,
    assessee_id: Uuid,
    clock: Arc<dyn Clock>,
    interval: Duration,
    end: DateTime<Utc>,
    queue: ReleaseQueue,
    // tool id -> attempt id
    attempts: HashMap<Uuid, Uuid>,
    ready: VecDeque<ReleaseMessage>,
    begun: bool,
}

impl Subscription {
    /// Begin marker first, then one message per pending tool. Ends once the
    /// queue is drained and the event has concluded.
    async fn next_message(&mut self) -> Option<ReleaseMessage> {
        if !self.begun {
            self.begun = true;
            return Some(ReleaseMessage::begin());
        }
        loop {
            if let Some(msg) = self.ready.pop_front() {
                return Some(msg);
            }
            if self.queue.is_empty() && self.clock.now() >= self.end {
                return None;
            }
            tokio::time::sleep(self.interval).await;

            let now = self.clock.now();
            for due in self.queue.pop_due(now) {
                tracing::info!(
                    event_id = %self.event_id,
                    assessee_id = %self.assessee_id,
                    tool_id = %due.tool.id,
                    "tool released"
                );
                let attempt_id = self.attempts.get(&due.tool.id).copied();
                self.ready
                    .push_back(ReleaseMessage::release(ReleasedTool::new(&due, attempt_id)));
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        tracing::info!(
            event_id = %self.event_id,
            assessee_id = %self.assessee_id,
            remaining = self.queue.len(),
            "release subscription closed"
        );
    }
}
