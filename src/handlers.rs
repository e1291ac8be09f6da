//! Join/leave handling and the dispatch interface the gateway adapter drives.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serenity::async_trait;
use tracing::{debug, warn};

use crate::audit::{AuditLog, MemberIdentity};
use crate::error::TrackerError;
use crate::score::{self, ScoreBounds};
use crate::session::SessionStore;
use crate::tatsu::ScoreApi;

pub const JOINED_MESSAGE: &str = "Joined a voice channel";
pub const NO_SESSION_MESSAGE: &str = "Left a voice channel without a recorded session";
pub const TOO_SHORT_MESSAGE: &str = "Less than a minute in voice, no points awarded";

fn awarded_message(score: u32) -> String {
    format!("Awarded {score} points for voice time")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceEventKind {
    Join,
    Leave,
}

#[derive(Debug, Clone)]
pub struct VoiceEvent {
    pub kind: VoiceEventKind,
    pub member: MemberIdentity,
    pub at: DateTime<Utc>,
}

#[async_trait]
pub trait VoiceEventHandler: Send + Sync {
    fn kind(&self) -> VoiceEventKind;

    async fn handle(&self, event: &VoiceEvent) -> Result<(), TrackerError>;
}

/// Routes events to the handlers registered for their kind.
#[derive(Clone, Default)]
pub struct Dispatcher {
    handlers: Vec<Arc<dyn VoiceEventHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn VoiceEventHandler>) -> &mut Self {
        self.handlers.push(handler);
        self
    }

    pub async fn dispatch(&self, event: &VoiceEvent) -> Result<(), TrackerError> {
        for handler in self.handlers.iter().filter(|h| h.kind() == event.kind) {
            handler.handle(event).await?;
        }
        Ok(())
    }
}

pub struct JoinHandler {
    sessions: SessionStore,
    audit: Arc<dyn AuditLog>,
}

impl JoinHandler {
    pub fn new(sessions: SessionStore, audit: Arc<dyn AuditLog>) -> Self {
        Self { sessions, audit }
    }
}

#[async_trait]
impl VoiceEventHandler for JoinHandler {
    fn kind(&self) -> VoiceEventKind {
        VoiceEventKind::Join
    }

    async fn handle(&self, event: &VoiceEvent) -> Result<(), TrackerError> {
        self.audit.log(&event.member, JOINED_MESSAGE).await;

        if !self.sessions.record_join(event.member.user_id, event.at).await {
            debug!(user_id = %event.member.user_id, "session already open, keeping first join");
        }
        Ok(())
    }
}

pub struct LeaveHandler {
    sessions: SessionStore,
    audit: Arc<dyn AuditLog>,
    scores: Arc<dyn ScoreApi>,
    bounds: ScoreBounds,
    guild_id: String,
}

impl LeaveHandler {
    pub fn new(
        sessions: SessionStore,
        audit: Arc<dyn AuditLog>,
        scores: Arc<dyn ScoreApi>,
        bounds: ScoreBounds,
        guild_id: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            audit,
            scores,
            bounds,
            guild_id: guild_id.into(),
        }
    }
}

#[async_trait]
impl VoiceEventHandler for LeaveHandler {
    fn kind(&self) -> VoiceEventKind {
        VoiceEventKind::Leave
    }

    async fn handle(&self, event: &VoiceEvent) -> Result<(), TrackerError> {
        let member = &event.member;

        let Some(joined_at) = self.sessions.consume_leave(member.user_id).await else {
            self.audit.log(member, NO_SESSION_MESSAGE).await;
            return Ok(());
        };

        let minutes = elapsed_minutes(joined_at, event.at);
        if minutes < 1 {
            self.audit.log(member, TOO_SHORT_MESSAGE).await;
            return Ok(());
        }

        let total = score::score(minutes, self.bounds, &mut rand::thread_rng());
        let amount = u32::try_from(total).unwrap_or_else(|_| {
            warn!(user_id = %member.user_id, total, "score exceeds u32, saturating");
            u32::MAX
        });

        debug!(user_id = %member.user_id, minutes, score = amount, "submitting voice score");
        self.scores
            .add_score(&self.guild_id, member.user_id, amount)
            .await
            .map_err(|source| TrackerError::ScoringApi {
                user_id: member.user_id.get(),
                source,
            })?;

        self.audit.log(member, &awarded_message(amount)).await;
        Ok(())
    }
}

/// Whole minutes between two instants, ignoring their order.
pub fn elapsed_minutes(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from).num_seconds().unsigned_abs() / 60
}
