use super::{
    AttemptShell, AttemptsRepo, EventPatch, EventsRepo, FlowsRepo, NewEvent, NewParticipation,
    NewTestFlow, NewTool, ParticipationsRepo, RoomsRepo, ToolsRepo, UsersRepo,
};
use crate::error::{Error, Result};
use crate::models::{
    event::AssessmentEvent,
    participation::Participation,
    test_flow::{TestFlow, TestFlowTool},
    tool::{AssessmentTool, ToolKind},
    tool_attempt::ToolAttempt,
    user::{Assessee, Assessor, Company},
    video_conference::VideoConferenceRoom,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct PgRepo {
    pool: PgPool,
}

impl PgRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn flow_entries(&self, flow_id: Uuid) -> Result<Vec<TestFlowTool>> {
        let rows = sqlx::query_as::<_, FlowEntryRow>(
            r#"
            SELECT t.id, t.company_id, t.name, t.description, t.details, t.created_at,
                   e.release_time, e.start_working_time
            FROM test_flow_tools e
            JOIN assessment_tools t ON t.id = e.tool_id
            WHERE e.test_flow_id = $1
            ORDER BY e.position ASC
            "#,
        )
        .bind(flow_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(FlowEntryRow::into_entry).collect())
    }

    async fn with_entries(&self, row: FlowRow) -> Result<TestFlow> {
        let tools = self.flow_entries(row.id).await?;
        Ok(TestFlow {
            id: row.id,
            company_id: row.company_id,
            name: row.name,
            tools,
            created_at: row.created_at,
        })
    }

    async fn with_roleplayers(&self, mut room: VideoConferenceRoom) -> Result<VideoConferenceRoom> {
        room.roleplayer_ids = sqlx::query_scalar(
            r#"SELECT assessor_id FROM video_conference_roleplayers WHERE room_id = $1 ORDER BY added_at"#,
        )
        .bind(room.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(room)
    }
}

#[derive(Debug, FromRow)]
struct ToolRow {
    id: Uuid,
    company_id: Uuid,
    name: String,
    description: Option<String>,
    details: Json<ToolKind>,
    created_at: DateTime<Utc>,
}

impl From<ToolRow> for AssessmentTool {
    fn from(row: ToolRow) -> Self {
        AssessmentTool {
            id: row.id,
            company_id: row.company_id,
            name: row.name,
            description: row.description,
            kind: row.details.0,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct FlowRow {
    id: Uuid,
    company_id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct FlowEntryRow {
    #[sqlx(flatten)]
    tool: ToolRow,
    release_time: NaiveTime,
    start_working_time: NaiveTime,
}

impl FlowEntryRow {
    fn into_entry(self) -> TestFlowTool {
        TestFlowTool {
            tool: self.tool.into(),
            release_time: self.release_time,
            start_working_time: self.start_working_time,
        }
    }
}

#[async_trait]
impl UsersRepo for PgRepo {
    async fn company_try_load(&self, id: Uuid) -> Result<Option<Company>> {
        let company = sqlx::query_as::<_, Company>(r#"SELECT id, name, email FROM companies WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(company)
    }

    async fn company_try_load_by_email(&self, email: &str) -> Result<Option<Company>> {
        let company =
            sqlx::query_as::<_, Company>(r#"SELECT id, name, email FROM companies WHERE email = $1"#)
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(company)
    }

    async fn assessor_try_load(&self, id: Uuid) -> Result<Option<Assessor>> {
        let assessor = sqlx::query_as::<_, Assessor>(
            r#"SELECT id, company_id, email, first_name, last_name FROM assessors WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(assessor)
    }

    async fn assessor_try_load_by_email(&self, email: &str) -> Result<Option<Assessor>> {
        let assessor = sqlx::query_as::<_, Assessor>(
            r#"SELECT id, company_id, email, first_name, last_name FROM assessors WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(assessor)
    }

    async fn assessee_try_load(&self, id: Uuid) -> Result<Option<Assessee>> {
        let assessee = sqlx::query_as::<_, Assessee>(
            r#"SELECT id, email, first_name, last_name FROM assessees WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(assessee)
    }

    async fn assessee_try_load_by_email(&self, email: &str) -> Result<Option<Assessee>> {
        let assessee = sqlx::query_as::<_, Assessee>(
            r#"SELECT id, email, first_name, last_name FROM assessees WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(assessee)
    }
}

#[async_trait]
impl ToolsRepo for PgRepo {
    async fn tool_new(&self, tool: NewTool) -> Result<AssessmentTool> {
        let row = sqlx::query_as::<_, ToolRow>(
            r#"
            INSERT INTO assessment_tools (company_id, name, description, kind, details)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, company_id, name, description, details, created_at
            "#,
        )
        .bind(tool.company_id)
        .bind(tool.name)
        .bind(tool.description)
        .bind(tool.kind.tag().as_str())
        .bind(Json(&tool.kind))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn tool_try_load(&self, id: Uuid) -> Result<Option<AssessmentTool>> {
        let row = sqlx::query_as::<_, ToolRow>(
            r#"SELECT id, company_id, name, description, details, created_at FROM assessment_tools WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn tool_select_by_company(&self, company_id: Uuid) -> Result<Vec<AssessmentTool>> {
        let rows = sqlx::query_as::<_, ToolRow>(
            r#"
            SELECT id, company_id, name, description, details, created_at
            FROM assessment_tools
            WHERE company_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl FlowsRepo for PgRepo {
    async fn flow_new(&self, flow: NewTestFlow) -> Result<TestFlow> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, FlowRow>(
            r#"
            INSERT INTO test_flows (company_id, name)
            VALUES ($1, $2)
            RETURNING id, company_id, name, created_at
            "#,
        )
        .bind(flow.company_id)
        .bind(&flow.name)
        .fetch_one(&mut *tx)
        .await?;

        for (position, entry) in flow.entries.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO test_flow_tools (test_flow_id, tool_id, release_time, start_working_time, position)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(row.id)
            .bind(entry.tool_id)
            .bind(entry.release_time)
            .bind(entry.start_working_time)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        self.with_entries(row).await
    }

    async fn flow_try_load(&self, id: Uuid) -> Result<Option<TestFlow>> {
        let row = sqlx::query_as::<_, FlowRow>(
            r#"SELECT id, company_id, name, created_at FROM test_flows WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some(self.with_entries(row).await?)),
            None => Ok(None),
        }
    }

    async fn flow_select_by_company(&self, company_id: Uuid) -> Result<Vec<TestFlow>> {
        let rows = sqlx::query_as::<_, FlowRow>(
            r#"SELECT id, company_id, name, created_at FROM test_flows WHERE company_id = $1 ORDER BY created_at ASC"#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        let mut flows = Vec::with_capacity(rows.len());
        for row in rows {
            flows.push(self.with_entries(row).await?);
        }
        Ok(flows)
    }
}

#[async_trait]
impl EventsRepo for PgRepo {
    async fn event_new(&self, event: NewEvent) -> Result<AssessmentEvent> {
        let event = sqlx::query_as::<_, AssessmentEvent>(
            r#"
            INSERT INTO assessment_events (company_id, name, start_date, test_flow_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(event.company_id)
        .bind(event.name)
        .bind(event.start_date)
        .bind(event.test_flow_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(event)
    }

    async fn event_try_load(&self, id: Uuid) -> Result<Option<AssessmentEvent>> {
        let event =
            sqlx::query_as::<_, AssessmentEvent>(r#"SELECT * FROM assessment_events WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(event)
    }

    async fn event_update(&self, id: Uuid, patch: EventPatch) -> Result<AssessmentEvent> {
        let event = sqlx::query_as::<_, AssessmentEvent>(
            r#"
            UPDATE assessment_events
            SET
                name = COALESCE($1, name),
                start_date = COALESCE($2, start_date),
                test_flow_id = COALESCE($3, test_flow_id),
                updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(patch.name)
        .bind(patch.start_date)
        .bind(patch.test_flow_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        event.ok_or_else(|| Error::NotFound(format!("Assessment event of id {} does not exist", id)))
    }

    async fn event_select_by_company(&self, company_id: Uuid) -> Result<Vec<AssessmentEvent>> {
        let events = sqlx::query_as::<_, AssessmentEvent>(
            r#"SELECT * FROM assessment_events WHERE company_id = $1 ORDER BY start_date ASC"#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn event_select_by_assessor(&self, assessor_id: Uuid) -> Result<Vec<AssessmentEvent>> {
        let events = sqlx::query_as::<_, AssessmentEvent>(
            r#"
            SELECT e.* FROM assessment_events e
            WHERE EXISTS (
                SELECT 1 FROM participations p WHERE p.event_id = e.id AND p.assessor_id = $1
            )
            ORDER BY e.start_date ASC
            "#,
        )
        .bind(assessor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn event_select_by_assessee(&self, assessee_id: Uuid) -> Result<Vec<AssessmentEvent>> {
        let events = sqlx::query_as::<_, AssessmentEvent>(
            r#"
            SELECT e.* FROM assessment_events e
            JOIN participations p ON p.event_id = e.id
            WHERE p.assessee_id = $1
            ORDER BY e.start_date ASC
            "#,
        )
        .bind(assessee_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }
}

#[async_trait]
impl ParticipationsRepo for PgRepo {
    async fn participations_add(
        &self,
        event_id: Uuid,
        pairs: Vec<NewParticipation>,
        shells: &[AttemptShell],
    ) -> Result<Vec<Participation>> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::new();
        for pair in pairs {
            let inserted = sqlx::query_as::<_, Participation>(
                r#"
                INSERT INTO participations (event_id, assessee_id, assessor_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (event_id, assessee_id) DO NOTHING
                RETURNING id, event_id, assessee_id, assessor_id, created_at
                "#,
            )
            .bind(event_id)
            .bind(pair.assessee_id)
            .bind(pair.assessor_id)
            .fetch_optional(&mut *tx)
            .await?;

            let Some(part) = inserted else { continue };
            for shell in shells {
                sqlx::query(
                    r#"
                    INSERT INTO tool_attempts (participation_id, tool_id, kind)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (participation_id, tool_id) DO NOTHING
                    "#,
                )
                .bind(part.id)
                .bind(shell.tool_id)
                .bind(shell.kind.as_str())
                .execute(&mut *tx)
                .await?;
            }
            created.push(part);
        }
        tx.commit().await?;
        Ok(created)
    }

    async fn participation_try_load(&self, id: Uuid) -> Result<Option<Participation>> {
        let part = sqlx::query_as::<_, Participation>(
            r#"SELECT id, event_id, assessee_id, assessor_id, created_at FROM participations WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(part)
    }

    async fn participation_find(
        &self,
        event_id: Uuid,
        assessee_id: Uuid,
    ) -> Result<Option<Participation>> {
        let part = sqlx::query_as::<_, Participation>(
            r#"
            SELECT id, event_id, assessee_id, assessor_id, created_at
            FROM participations
            WHERE event_id = $1 AND assessee_id = $2
            "#,
        )
        .bind(event_id)
        .bind(assessee_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(part)
    }

    async fn participation_select_by_event(&self, event_id: Uuid) -> Result<Vec<Participation>> {
        let parts = sqlx::query_as::<_, Participation>(
            r#"
            SELECT id, event_id, assessee_id, assessor_id, created_at
            FROM participations
            WHERE event_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(parts)
    }
}

#[async_trait]
impl AttemptsRepo for PgRepo {
    async fn attempt_try_load(&self, id: Uuid) -> Result<Option<ToolAttempt>> {
        let attempt = sqlx::query_as::<_, ToolAttempt>(r#"SELECT * FROM tool_attempts WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(attempt)
    }

    async fn attempt_select_by_participation(
        &self,
        participation_id: Uuid,
    ) -> Result<Vec<ToolAttempt>> {
        let attempts = sqlx::query_as::<_, ToolAttempt>(
            r#"SELECT * FROM tool_attempts WHERE participation_id = $1 ORDER BY created_at ASC"#,
        )
        .bind(participation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts)
    }

    async fn attempt_grade(
        &self,
        id: Uuid,
        grade: Option<Decimal>,
        note: Option<String>,
    ) -> Result<ToolAttempt> {
        let attempt = sqlx::query_as::<_, ToolAttempt>(
            r#"
            UPDATE tool_attempts
            SET grade = COALESCE($1, grade), note = COALESCE($2, note), updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(grade)
        .bind(note)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        attempt.ok_or_else(|| Error::NotFound(format!("Tool attempt of id {} does not exist", id)))
    }

    async fn attempt_submit(
        &self,
        id: Uuid,
        submission: JsonValue,
        at: DateTime<Utc>,
    ) -> Result<Option<ToolAttempt>> {
        let attempt = sqlx::query_as::<_, ToolAttempt>(
            r#"
            UPDATE tool_attempts
            SET submission = $1, submitted_at = $2, updated_at = NOW()
            WHERE id = $3 AND submitted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(submission)
        .bind(at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn attempt_any_submitted(&self, event_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM tool_attempts a
                JOIN participations p ON p.id = a.participation_id
                WHERE p.event_id = $1 AND a.submitted_at IS NOT NULL
            )
            "#,
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl RoomsRepo for PgRepo {
    async fn room_get_or_create(&self, participation_id: Uuid) -> Result<VideoConferenceRoom> {
        sqlx::query(
            r#"
            INSERT INTO video_conference_rooms (participation_id)
            VALUES ($1)
            ON CONFLICT (participation_id) DO NOTHING
            "#,
        )
        .bind(participation_id)
        .execute(&self.pool)
        .await?;

        let room = sqlx::query_as::<_, VideoConferenceRoom>(
            r#"SELECT * FROM video_conference_rooms WHERE participation_id = $1"#,
        )
        .bind(participation_id)
        .fetch_one(&self.pool)
        .await?;
        self.with_roleplayers(room).await
    }

    async fn room_find_by_participation(
        &self,
        participation_id: Uuid,
    ) -> Result<Option<VideoConferenceRoom>> {
        let room = sqlx::query_as::<_, VideoConferenceRoom>(
            r#"SELECT * FROM video_conference_rooms WHERE participation_id = $1"#,
        )
        .bind(participation_id)
        .fetch_optional(&self.pool)
        .await?;
        match room {
            Some(room) => Ok(Some(self.with_roleplayers(room).await?)),
            None => Ok(None),
        }
    }

    async fn room_try_load(&self, id: Uuid) -> Result<Option<VideoConferenceRoom>> {
        let room = sqlx::query_as::<_, VideoConferenceRoom>(
            r#"SELECT * FROM video_conference_rooms WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        match room {
            Some(room) => Ok(Some(self.with_roleplayers(room).await?)),
            None => Ok(None),
        }
    }

    async fn room_attach_external(
        &self,
        id: Uuid,
        external_room_id: &str,
    ) -> Result<VideoConferenceRoom> {
        let room = sqlx::query_as::<_, VideoConferenceRoom>(
            r#"
            UPDATE video_conference_rooms
            SET external_room_id = COALESCE(external_room_id, $1)
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(external_room_id)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        self.with_roleplayers(room).await
    }

    async fn room_lock(&self, id: Uuid) -> Result<(VideoConferenceRoom, bool)> {
        let locked = sqlx::query_as::<_, VideoConferenceRoom>(
            r#"
            UPDATE video_conference_rooms
            SET is_locked = TRUE
            WHERE id = $1 AND is_locked = FALSE
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(room) = locked {
            return Ok((self.with_roleplayers(room).await?, true));
        }
        let room = self.room_try_load(id).await?.ok_or_else(|| {
            Error::NotFound(format!("Video conference room of id {} does not exist", id))
        })?;
        Ok((room, false))
    }

    async fn room_add_roleplayer(
        &self,
        id: Uuid,
        assessor_id: Uuid,
    ) -> Result<VideoConferenceRoom> {
        sqlx::query(
            r#"
            INSERT INTO video_conference_roleplayers (room_id, assessor_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id)
        .bind(assessor_id)
        .execute(&self.pool)
        .await?;
        self.room_try_load(id).await?.ok_or_else(|| {
            Error::NotFound(format!("Video conference room of id {} does not exist", id))
        })
    }
}
