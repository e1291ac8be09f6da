use chrono::{DateTime, Utc};
use serenity::all::{ChannelId, GuildId, Ready, UserId};
use serenity::async_trait;
use serenity::model::voice::VoiceState;
use serenity::prelude::*;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::audit::MemberIdentity;
use crate::config::ErrorPolicy;
use crate::error::TrackerError;
use crate::handlers::{Dispatcher, VoiceEvent, VoiceEventKind};

/// The fields of a voice-state update the tracker cares about.
#[derive(Debug, Clone)]
pub struct VoiceTransition {
    pub guild_id: Option<GuildId>,
    pub old_channel: Option<ChannelId>,
    pub new_channel: Option<ChannelId>,
    pub user_id: UserId,
    pub member: Option<MemberIdentity>,
}

/// Bridges serenity voice-state updates to the join/leave dispatcher.
pub struct VoiceHandler {
    dispatcher: Dispatcher,
    guild_id: Option<GuildId>,
    policy: ErrorPolicy,
    fatal: mpsc::Sender<TrackerError>,
}

impl VoiceHandler {
    pub fn new(
        dispatcher: Dispatcher,
        guild_id: Option<GuildId>,
        policy: ErrorPolicy,
        fatal: mpsc::Sender<TrackerError>,
    ) -> Self {
        Self {
            dispatcher,
            guild_id,
            policy,
            fatal,
        }
    }

    fn tracks(&self, guild_id: Option<GuildId>) -> bool {
        match self.guild_id {
            Some(tracked) => guild_id == Some(tracked),
            None => true,
        }
    }

    /// Filters, classifies and dispatches one voice-state change.
    pub async fn on_transition(&self, transition: VoiceTransition, at: DateTime<Utc>) {
        if !self.tracks(transition.guild_id) {
            return;
        }

        let Some(kind) = classify(transition.old_channel, transition.new_channel) else {
            return;
        };

        let member = transition
            .member
            .unwrap_or_else(|| MemberIdentity::from_user_id(transition.user_id));

        let event = VoiceEvent { kind, member, at };
        if let Err(err) = self.dispatcher.dispatch(&event).await {
            self.on_error(err).await;
        }
    }

    async fn on_error(&self, err: TrackerError) {
        error!(%err, "voice event failed");
        if self.policy == ErrorPolicy::Abort && self.fatal.send(err).await.is_err() {
            error!("supervisor is gone, dropping fatal error");
        }
    }
}

/// Join when entering voice from nowhere, leave when dropping out of voice.
/// Moves between channels keep the session open.
pub fn classify(old: Option<ChannelId>, new: Option<ChannelId>) -> Option<VoiceEventKind> {
    match (old, new) {
        (None, Some(_)) => Some(VoiceEventKind::Join),
        (Some(_), None) => Some(VoiceEventKind::Leave),
        _ => None,
    }
}

#[async_trait]
impl EventHandler for VoiceHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, guilds = ready.guilds.len(), "bot running");
    }

    async fn voice_state_update(&self, _ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let transition = VoiceTransition {
            guild_id: new.guild_id,
            old_channel: old.as_ref().and_then(|v| v.channel_id),
            new_channel: new.channel_id,
            user_id: new.user_id,
            member: new.member.as_ref().map(MemberIdentity::from),
        };
        self.on_transition(transition, Utc::now()).await;
    }
}
