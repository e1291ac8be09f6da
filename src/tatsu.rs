//! Client for the Tatsu guild score API.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use serenity::async_trait;
use serenity::model::id::UserId;
use tracing::debug;

use crate::error::ScoringApiError;

pub const DEFAULT_BASE_URL: &str = "https://api.tatsu.gg/v1";

/// Tatsu score actions; only additive adjustments are used.
const ACTION_ADD: u8 = 0;

/// Adds points to a member's score within a guild.
#[async_trait]
pub trait ScoreApi: Send + Sync {
    async fn add_score(
        &self,
        guild_id: &str,
        user_id: UserId,
        amount: u32,
    ) -> Result<(), ScoringApiError>;
}

#[derive(Debug, Deserialize)]
struct MemberScore {
    #[serde(default)]
    score: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct TatsuClient {
    http: Client,
    token: String,
    base_url: String,
}

impl TatsuClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            token: token.into(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl ScoreApi for TatsuClient {
    async fn add_score(
        &self,
        guild_id: &str,
        user_id: UserId,
        amount: u32,
    ) -> Result<(), ScoringApiError> {
        let url = format!(
            "{}/guilds/{}/members/{}/score",
            self.base_url, guild_id, user_id
        );

        let response = self
            .http
            .patch(&url)
            .header(reqwest::header::AUTHORIZATION, &self.token)
            .json(&json!({ "action": ACTION_ADD, "amount": amount }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoringApiError::Status { status, body });
        }

        match response.json::<MemberScore>().await {
            Ok(MemberScore { score: Some(score) }) => {
                debug!(user_id = %user_id, score, "tatsu score updated");
            }
            Ok(_) => {}
            Err(err) => debug!(?err, "unreadable tatsu score response"),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn sends_additive_patch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/guilds/111/members/222/score")
            .match_header("authorization", "tatsu-token")
            .match_body(Matcher::Json(json!({ "action": 0, "amount": 42 })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"guild_id":"111","user_id":"222","score":1042}"#)
            .create_async()
            .await;

        let client = TatsuClient::with_base_url("tatsu-token", server.url());
        client
            .add_score("111", UserId::new(222), 42)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("PATCH", "/guilds/1/members/2/score")
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let client = TatsuClient::with_base_url("bad", format!("{}/", server.url()));
        let err = client.add_score("1", UserId::new(2), 5).await.unwrap_err();

        match err {
            ScoringApiError::Status { status, body } => {
                assert_eq!(status.as_u16(), 403);
                assert_eq!(body, "forbidden");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_success_body_is_accepted() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("PATCH", "/guilds/1/members/2/score")
            .with_status(204)
            .create_async()
            .await;

        let client = TatsuClient::with_base_url("token", server.url());
        assert!(client.add_score("1", UserId::new(2), 1).await.is_ok());
    }
}
