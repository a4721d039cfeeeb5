use async_trait::async_trait;
use reqwest::{
    header::{ETAG, IF_MATCH},
    Client, RequestBuilder, Response,
};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{ItemId, PostId, UserId},
    protocol::{Event, Item, NewPost, Post, Profile, UserCalendar, UserSummary},
};
use tracing::debug;
use url::Url;

use crate::{config::Settings, error::ClientError};

/// Attempts made by a read-modify-write before giving up on a contended resource.
pub const MAX_CONFLICT_RETRIES: usize = 3;

/// A fetched record plus the version token the server sent with it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub value: T,
    pub etag: Option<String>,
}

#[async_trait]
pub trait CivixBackend: Send + Sync {
    async fn list_events(&self) -> Result<Vec<Event>, ClientError>;
    async fn get_profile(&self, user_id: UserId) -> Result<Profile, ClientError>;
    async fn get_calendar(&self, user_id: UserId)
        -> Result<Versioned<UserCalendar>, ClientError>;
    /// Replaces the whole event list. `if_match` makes the write conditional.
    async fn put_calendar(
        &self,
        calendar: &UserCalendar,
        if_match: Option<&str>,
    ) -> Result<(), ClientError>;
    async fn list_users(&self) -> Result<Vec<UserSummary>, ClientError>;
    async fn get_item(&self, item_id: ItemId) -> Result<Item, ClientError>;
    async fn list_posts(&self) -> Result<Vec<Post>, ClientError>;
    async fn get_post(&self, post_id: PostId) -> Result<Versioned<Post>, ClientError>;
    async fn create_post(&self, post: &NewPost) -> Result<Post, ClientError>;
    async fn update_post(&self, post: &Post, if_match: Option<&str>) -> Result<(), ClientError>;
}

pub struct HttpBackend {
    http: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| ClientError::Setup(format!("failed to build http client: {err}")))?;
        Self::with_client(http, &settings.api_base_url)
    }

    fn with_client(http: Client, base_url: &str) -> Result<Self, ClientError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|err| ClientError::Setup(format!("invalid api base url '{base_url}': {err}")))?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        let raw = format!("{}{path}", self.base_url);
        Url::parse(&raw).map_err(|err| ClientError::Setup(format!("invalid url '{raw}': {err}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Versioned<T>, ClientError> {
        let url = self.endpoint(path)?;
        debug!(%url, "http: GET");
        let response = ensure_success(self.http.get(url).send().await?).await?;
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .and_then(strong_etag);
        let value = response.json::<T>().await.map_err(ClientError::Decode)?;
        Ok(Versioned { value, etag })
    }

    async fn put_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        if_match: Option<&str>,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(path)?;
        debug!(%url, conditional = if_match.is_some(), "http: PUT");
        let request = with_if_match(self.http.put(url).json(body), if_match);
        ensure_success(request.send().await?).await?;
        Ok(())
    }
}

/// `If-Match` is compared strongly, so a weak tag could never match. Weak tags are dropped
/// and the write goes out unconditionally.
fn strong_etag(tag: &str) -> Option<String> {
    let tag = tag.trim();
    if tag.is_empty() || tag.starts_with("W/") {
        debug!(etag = tag, "http: ignoring weak or empty etag");
        return None;
    }
    Some(tag.to_owned())
}

fn with_if_match(request: RequestBuilder, if_match: Option<&str>) -> RequestBuilder {
    match if_match {
        Some(tag) => request.header(IF_MATCH, tag),
        None => request,
    }
}

async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status { status, body })
}

#[async_trait]
impl CivixBackend for HttpBackend {
    async fn list_events(&self) -> Result<Vec<Event>, ClientError> {
        Ok(self.get_json::<Vec<Event>>("/events/").await?.value)
    }

    async fn get_profile(&self, user_id: UserId) -> Result<Profile, ClientError> {
        Ok(self
            .get_json::<Profile>(&format!("/profiles/{}", user_id.0))
            .await?
            .value)
    }

    async fn get_calendar(
        &self,
        user_id: UserId,
    ) -> Result<Versioned<UserCalendar>, ClientError> {
        self.get_json(&format!("/calendars/{}/", user_id.0)).await
    }

    async fn put_calendar(
        &self,
        calendar: &UserCalendar,
        if_match: Option<&str>,
    ) -> Result<(), ClientError> {
        self.put_json(&format!("/calendars/{}/", calendar.user.0), calendar, if_match)
            .await
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>, ClientError> {
        Ok(self.get_json::<Vec<UserSummary>>("/users/").await?.value)
    }

    async fn get_item(&self, item_id: ItemId) -> Result<Item, ClientError> {
        Ok(self
            .get_json::<Item>(&format!("/items/{}", item_id.0))
            .await?
            .value)
    }

    async fn list_posts(&self) -> Result<Vec<Post>, ClientError> {
        Ok(self.get_json::<Vec<Post>>("/posts/").await?.value)
    }

    async fn get_post(&self, post_id: PostId) -> Result<Versioned<Post>, ClientError> {
        self.get_json(&format!("/posts/{}/", post_id.0)).await
    }

    async fn create_post(&self, post: &NewPost) -> Result<Post, ClientError> {
        let url = self.endpoint("/posts/")?;
        debug!(%url, "http: POST");
        let response = ensure_success(self.http.post(url).json(post).send().await?).await?;
        response.json::<Post>().await.map_err(ClientError::Decode)
    }

    async fn update_post(&self, post: &Post, if_match: Option<&str>) -> Result<(), ClientError> {
        self.put_json(&format!("/posts/{}/", post.id.0), post, if_match)
            .await
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
