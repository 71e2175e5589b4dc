use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url, header::AUTHORIZATION};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    application::repos::{CommentsRepo, RepoError, ViewsRepo},
    domain::comments::CommentRecord,
};

use super::{KvError, comments_key, views_key};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Redis-over-REST client speaking the Upstash command protocol.
#[derive(Clone)]
pub struct UpstashStore {
    http: Client,
    url: Url,
    token: String,
}

#[derive(Debug, Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl UpstashStore {
    pub fn new(url: Url, token: impl Into<String>) -> Result<Self, KvError> {
        let http = Client::builder()
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            url,
            token: token.into(),
        })
    }

    /// Run one command; the reply's `result` is returned as-is.
    async fn command(&self, name: &'static str, args: &[&str]) -> Result<Value, KvError> {
        let mut body = Vec::with_capacity(args.len() + 1);
        body.push(Value::from(name));
        body.extend(args.iter().map(|arg| Value::from(*arg)));

        debug!(command = name, "Sending KV command");
        let response = self
            .http
            .post(self.url.clone())
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        let reply: CommandReply = match serde_json::from_slice(&bytes) {
            Ok(reply) => reply,
            Err(_) if !status.is_success() => {
                return Err(KvError::Status {
                    status: status.as_u16(),
                    message: String::from_utf8_lossy(&bytes).into_owned(),
                });
            }
            Err(err) => return Err(KvError::Decode(format!("{name}: {err}"))),
        };

        if let Some(message) = reply.error {
            return Err(KvError::Command {
                command: name,
                message,
            });
        }
        if !status.is_success() {
            return Err(KvError::Status {
                status: status.as_u16(),
                message: "request rejected".to_string(),
            });
        }
        Ok(reply.result.unwrap_or(Value::Null))
    }
}

fn as_count(command: &str, value: &Value) -> Result<u64, KvError> {
    match value {
        Value::Null => Ok(0),
        Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| KvError::Decode(format!("{command}: negative counter {number}"))),
        Value::String(text) => text
            .parse()
            .map_err(|_| KvError::Decode(format!("{command}: non-numeric counter `{text}`"))),
        other => Err(KvError::Decode(format!(
            "{command}: unexpected counter value {other}"
        ))),
    }
}

fn decode_comment(raw: &Value) -> Option<CommentRecord> {
    let parsed = match raw {
        Value::String(text) => serde_json::from_str(text),
        other => CommentRecord::deserialize(other),
    };
    match parsed {
        Ok(comment) => Some(comment),
        Err(err) => {
            warn!(error = %err, "Skipping malformed comment entry");
            None
        }
    }
}

/// HGETALL replies are either a flat `[field, value, ...]` array or an object.
fn hash_values(value: Value) -> Result<Vec<Value>, KvError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items.into_iter().skip(1).step_by(2).collect()),
        Value::Object(map) => Ok(map.into_iter().map(|(_, value)| value).collect()),
        other => Err(KvError::Decode(format!("HGETALL: unexpected reply {other}"))),
    }
}

#[async_trait]
impl ViewsRepo for UpstashStore {
    async fn get_views(&self, slug: &str) -> Result<u64, RepoError> {
        let value = self.command("GET", &[&views_key(slug)]).await?;
        Ok(as_count("GET", &value)?)
    }

    async fn increment_views(&self, slug: &str) -> Result<u64, RepoError> {
        let value = self.command("INCR", &[&views_key(slug)]).await?;
        Ok(as_count("INCR", &value)?)
    }
}

#[async_trait]
impl CommentsRepo for UpstashStore {
    async fn list_comments(&self, post_id: &str) -> Result<Vec<CommentRecord>, RepoError> {
        let value = self.command("HGETALL", &[&comments_key(post_id)]).await?;
        Ok(hash_values(value)?
            .iter()
            .filter_map(decode_comment)
            .collect())
    }

    async fn find_comment(
        &self,
        post_id: &str,
        comment_id: &str,
    ) -> Result<Option<CommentRecord>, RepoError> {
        let value = self
            .command("HGET", &[&comments_key(post_id), comment_id])
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(decode_comment(&value))
    }

    async fn put_comment(&self, comment: &CommentRecord) -> Result<(), RepoError> {
        let encoded = serde_json::to_string(comment)
            .map_err(|err| RepoError::decode(format!("HSET: {err}")))?;
        self.command(
            "HSET",
            &[&comments_key(&comment.post_id), &comment.id, &encoded],
        )
        .await?;
        Ok(())
    }

    async fn delete_comment(&self, post_id: &str, comment_id: &str) -> Result<bool, RepoError> {
        let value = self
            .command("HDEL", &[&comments_key(post_id), comment_id])
            .await?;
        Ok(as_count("HDEL", &value)? > 0)
    }
}
