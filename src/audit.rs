use std::sync::{Arc, OnceLock};

use serenity::all::{
    ChannelId, CreateEmbed, CreateEmbedAuthor, CreateMessage, Http, Member, UserId,
};
use serenity::async_trait;
use tracing::{info, warn};

/// The parts of a guild member the audit log shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberIdentity {
    pub user_id: UserId,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl MemberIdentity {
    /// Used when the gateway omits the member object.
    pub fn from_user_id(user_id: UserId) -> Self {
        Self {
            user_id,
            display_name: user_id.to_string(),
            avatar_url: None,
        }
    }
}

impl From<&Member> for MemberIdentity {
    fn from(member: &Member) -> Self {
        Self {
            user_id: member.user.id,
            display_name: member.display_name().to_owned(),
            avatar_url: Some(member.face()),
        }
    }
}

/// Fire-and-forget audit trail. Implementations never surface failures.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn log(&self, member: &MemberIdentity, message: &str);
}

/// Posts audit entries as embeds to a fixed text channel, through the
/// gateway client's HTTP handle once it is attached.
pub struct ChannelAuditLog {
    http: OnceLock<Arc<Http>>,
    channel_id: Option<ChannelId>,
}

impl ChannelAuditLog {
    pub fn new(raw_channel_id: &str) -> Self {
        let channel_id = parse_snowflake(raw_channel_id).map(ChannelId::new);
        if channel_id.is_none() {
            warn!(
                channel_id = raw_channel_id,
                "log channel id is not a valid snowflake; audit entries stay local"
            );
        }
        Self {
            http: OnceLock::new(),
            channel_id,
        }
    }

    /// Shares the client's rate limiter. Only the first handle is kept.
    pub fn attach(&self, http: Arc<Http>) {
        if self.http.set(http).is_err() {
            warn!("audit log already attached to an HTTP client");
        }
    }
}

#[async_trait]
impl AuditLog for ChannelAuditLog {
    async fn log(&self, member: &MemberIdentity, message: &str) {
        info!(user_id = %member.user_id, "{message}");

        let (Some(channel_id), Some(http)) = (self.channel_id, self.http.get()) else {
            return;
        };

        let embed = audit_embed(member, message);
        if let Err(err) = channel_id
            .send_message(http, CreateMessage::new().embed(embed))
            .await
        {
            warn!(?err, user_id = %member.user_id, "failed to post audit entry");
        }
    }
}

fn audit_embed(member: &MemberIdentity, message: &str) -> CreateEmbed {
    let mut author = CreateEmbedAuthor::new(&member.display_name);
    if let Some(url) = &member.avatar_url {
        author = author.icon_url(url);
    }
    CreateEmbed::new().author(author).description(message)
}

/// Parses a non-zero Discord snowflake.
pub fn parse_snowflake(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|id| *id != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snowflakes_must_be_non_zero_integers() {
        assert_eq!(parse_snowflake(" 1422179903373185094 "), Some(1422179903373185094));
        assert_eq!(parse_snowflake("0"), None);
        assert_eq!(parse_snowflake(""), None);
        assert_eq!(parse_snowflake("general"), None);
    }

    #[test]
    fn fallback_identity_uses_the_user_id() {
        let identity = MemberIdentity::from_user_id(UserId::new(77));
        assert_eq!(identity.display_name, "77");
        assert_eq!(identity.avatar_url, None);
    }

    #[test]
    fn first_attached_client_wins() {
        let log = ChannelAuditLog::new("1422179903373185094");
        let first = Arc::new(Http::new("first"));

        log.attach(first.clone());
        log.attach(Arc::new(Http::new("second")));

        assert!(Arc::ptr_eq(log.http.get().unwrap(), &first));
    }

    #[tokio::test]
    async fn unattached_log_stays_local() {
        let log = ChannelAuditLog::new("1422179903373185094");
        assert!(log.http.get().is_none());

        // No client yet, so this must return without touching the network.
        log.log(&MemberIdentity::from_user_id(UserId::new(1)), "joined")
            .await;
    }

    #[tokio::test]
    async fn invalid_channel_keeps_entries_local() {
        let log = ChannelAuditLog::new("not-a-channel");
        log.attach(Arc::new(Http::new("token")));
        assert!(log.channel_id.is_none());

        // No channel, so this must return without touching the network.
        log.log(&MemberIdentity::from_user_id(UserId::new(1)), "joined")
            .await;
    }
}
