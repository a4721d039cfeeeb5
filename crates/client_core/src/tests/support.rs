//! In-process stand-in for the civix REST backend used by the page tests.

use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use shared::{
    domain::{EventId, ItemId, PostId, UserId},
    protocol::{Event, Item, NewPost, Post, Profile, UserCalendar, UserSummary},
};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Default)]
pub struct MockData {
    pub events: Vec<Event>,
    pub profiles: HashMap<i64, Profile>,
    pub calendars: HashMap<i64, UserCalendar>,
    pub calendar_versions: HashMap<i64, u64>,
    pub users: Vec<UserSummary>,
    pub items: HashMap<i64, Item>,
    pub posts: Vec<Post>,
    pub post_versions: HashMap<i64, u64>,
    pub next_post_id: i64,
    pub send_etags: bool,
    /// Send `W/"v{n}"` instead of strong tags. A weak `If-Match` never matches.
    pub weak_etags: bool,
    /// Each queued id is added to the calendar by "another client" right before the next PUT.
    pub foreign_calendar_adds: Vec<EventId>,
    /// Number of upvotes "another client" lands right before the next post PUTs.
    pub foreign_upvotes: u32,
    pub fail_events_with: Option<StatusCode>,
    /// Answer `/events/` with 200 and a body that is not an event list.
    pub malformed_events: bool,
    pub requests: Vec<String>,
}

pub type SharedMock = Arc<Mutex<MockData>>;

pub fn event(id: i64, date: &str, city: &str, state: &str) -> Event {
    Event {
        id: EventId(id),
        title: format!("Event {id}"),
        date: date.to_string(),
        brief_description: format!("brief {id}"),
        full_description: format!("full {id}"),
        street_address: "1 Main St".into(),
        city: city.into(),
        state: state.into(),
        zipcode: "00000".into(),
    }
}

pub fn post(id: i64, item: i64, user: i64, on_right: bool, upvotes: u32, downvotes: u32) -> Post {
    Post {
        id: PostId(id),
        item: ItemId(item),
        user: UserId(user),
        content: format!("post {id}"),
        on_right,
        upvotes,
        downvotes,
    }
}

pub fn user(id: i64, username: &str) -> UserSummary {
    UserSummary {
        id: UserId(id),
        username: username.into(),
    }
}

fn etag_for(version: u64) -> String {
    format!("\"v{version}\"")
}

fn with_etag(mut response: Response, data: &MockData, version: u64) -> Response {
    if data.send_etags {
        let tag = if data.weak_etags {
            format!("W/{}", etag_for(version))
        } else {
            etag_for(version)
        };
        if let Ok(value) = HeaderValue::from_str(&tag) {
            response.headers_mut().insert(header::ETAG, value);
        }
    }
    response
}

fn if_match_is_stale(headers: &HeaderMap, enabled: bool, version: u64) -> bool {
    if !enabled {
        return false;
    }
    match headers.get(header::IF_MATCH).and_then(|v| v.to_str().ok()) {
        Some(tag) => tag != etag_for(version),
        None => false,
    }
}

async fn list_events(State(mock): State<SharedMock>) -> Response {
    let mut data = mock.lock().await;
    data.requests.push("GET /events/".into());
    if let Some(status) = data.fail_events_with {
        return (status, "events unavailable").into_response();
    }
    if data.malformed_events {
        return Json(serde_json::json!({ "not": "a list" })).into_response();
    }
    Json(data.events.clone()).into_response()
}

async fn get_profile(State(mock): State<SharedMock>, Path(user_id): Path<i64>) -> Response {
    let mut data = mock.lock().await;
    data.requests.push(format!("GET /profiles/{user_id}"));
    match data.profiles.get(&user_id) {
        Some(profile) => Json(profile.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn get_calendar(State(mock): State<SharedMock>, Path(user_id): Path<i64>) -> Response {
    let mut data = mock.lock().await;
    data.requests.push(format!("GET /calendars/{user_id}/"));
    let Some(calendar) = data.calendars.get(&user_id).cloned() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let version = data.calendar_versions.get(&user_id).copied().unwrap_or(0);
    with_etag(Json(calendar).into_response(), &data, version)
}

async fn put_calendar(
    State(mock): State<SharedMock>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
    Json(calendar): Json<UserCalendar>,
) -> Response {
    let mut data = mock.lock().await;
    data.requests.push(format!("PUT /calendars/{user_id}/"));

    if let Some(foreign) = data.foreign_calendar_adds.pop() {
        data.calendars
            .entry(user_id)
            .or_insert_with(|| UserCalendar {
                user: UserId(user_id),
                events: Vec::new(),
            })
            .add(foreign);
        *data.calendar_versions.entry(user_id).or_insert(0) += 1;
    }

    let version = data.calendar_versions.get(&user_id).copied().unwrap_or(0);
    if if_match_is_stale(&headers, data.send_etags, version) {
        return StatusCode::PRECONDITION_FAILED.into_response();
    }

    data.calendars.insert(user_id, calendar.clone());
    *data.calendar_versions.entry(user_id).or_insert(0) += 1;
    Json(calendar).into_response()
}

async fn list_users(State(mock): State<SharedMock>) -> Response {
    let mut data = mock.lock().await;
    data.requests.push("GET /users/".into());
    Json(data.users.clone()).into_response()
}

async fn get_item(State(mock): State<SharedMock>, Path(item_id): Path<i64>) -> Response {
    let mut data = mock.lock().await;
    data.requests.push(format!("GET /items/{item_id}"));
    match data.items.get(&item_id) {
        Some(item) => Json(item.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn list_posts(State(mock): State<SharedMock>) -> Response {
    let mut data = mock.lock().await;
    data.requests.push("GET /posts/".into());
    Json(data.posts.clone()).into_response()
}

async fn create_post(State(mock): State<SharedMock>, Json(new_post): Json<NewPost>) -> Response {
    let mut data = mock.lock().await;
    data.requests.push("POST /posts/".into());
    data.next_post_id += 1;
    let created = Post {
        id: PostId(data.next_post_id),
        item: new_post.item,
        user: new_post.user,
        content: new_post.content,
        on_right: new_post.on_right,
        upvotes: new_post.upvotes,
        downvotes: new_post.downvotes,
    };
    data.posts.push(created.clone());
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn get_post(State(mock): State<SharedMock>, Path(post_id): Path<i64>) -> Response {
    let mut data = mock.lock().await;
    data.requests.push(format!("GET /posts/{post_id}/"));
    let Some(found) = data.posts.iter().find(|p| p.id.0 == post_id).cloned() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let version = data.post_versions.get(&post_id).copied().unwrap_or(0);
    with_etag(Json(found).into_response(), &data, version)
}

async fn put_post(
    State(mock): State<SharedMock>,
    Path(post_id): Path<i64>,
    headers: HeaderMap,
    Json(updated): Json<Post>,
) -> Response {
    let mut data = mock.lock().await;
    data.requests.push(format!("PUT /posts/{post_id}/"));

    if data.foreign_upvotes > 0 {
        data.foreign_upvotes -= 1;
        if let Some(existing) = data.posts.iter_mut().find(|p| p.id.0 == post_id) {
            existing.upvotes += 1;
        }
        *data.post_versions.entry(post_id).or_insert(0) += 1;
    }

    let version = data.post_versions.get(&post_id).copied().unwrap_or(0);
    if if_match_is_stale(&headers, data.send_etags, version) {
        return StatusCode::PRECONDITION_FAILED.into_response();
    }

    let Some(existing) = data.posts.iter_mut().find(|p| p.id.0 == post_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    *existing = updated.clone();
    *data.post_versions.entry(post_id).or_insert(0) += 1;
    Json(updated).into_response()
}

pub async fn spawn_mock_backend(data: MockData) -> Result<(String, SharedMock)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let mock: SharedMock = Arc::new(Mutex::new(data));
    let app = Router::new()
        .route("/events/", get(list_events))
        .route("/profiles/:user_id", get(get_profile))
        .route("/calendars/:user_id/", get(get_calendar).put(put_calendar))
        .route("/users/", get(list_users))
        .route("/items/:item_id", get(get_item))
        .route("/posts/", get(list_posts).post(create_post))
        .route("/posts/:post_id/", get(get_post).put(put_post))
        .with_state(Arc::clone(&mock));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), mock))
}

/// Address nothing is listening on, for "no response" failures.
pub async fn unreachable_base_url() -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}"))
}
