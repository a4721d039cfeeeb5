//! Issue page: one item's description and its "for"/"against" comment columns.

use std::{cmp::Reverse, sync::Arc};

use shared::{
    domain::{ItemId, PostId, Side, UserId, Vote},
    error::{remaining_comment_chars, validate_comment, CommentRejected, COMMENT_REJECTED_MESSAGE},
    protocol::{NewPost, Post, UserSummary},
};
use tracing::{debug, info, warn};

use crate::{
    api::{CivixBackend, Versioned, MAX_CONFLICT_RETRIES},
    error::ClientError,
};

/// Item id from the last path segment of a route such as `/issue/12`.
pub fn parse_item_route(route: &str) -> Option<ItemId> {
    let path = route.split(['?', '#']).next().unwrap_or_default();
    path.split('/')
        .filter(|segment| !segment.trim().is_empty())
        .next_back()?
        .trim()
        .parse::<i64>()
        .ok()
        .map(ItemId)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentDraft {
    pub text: String,
    pub side: Side,
}

#[derive(Debug, Clone, Default)]
pub struct IssueState {
    pub users: Vec<UserSummary>,
    pub title: String,
    pub description: String,
    pub for_comments: Vec<Post>,
    pub against_comments: Vec<Post>,
    pub draft: CommentDraft,
    pub error: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Posted(Post),
    Rejected(CommentRejected),
}

pub struct IssuePage {
    backend: Arc<dyn CivixBackend>,
    user_id: UserId,
    item_id: ItemId,
    state: IssueState,
}

impl IssuePage {
    pub fn new(backend: Arc<dyn CivixBackend>, user_id: UserId, item_id: ItemId) -> Self {
        Self {
            backend,
            user_id,
            item_id,
            state: IssueState::default(),
        }
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn state(&self) -> &IssueState {
        &self.state
    }

    pub async fn fetch_comments(&mut self) -> Result<(), ClientError> {
        let loaded = futures::try_join!(
            self.backend.list_users(),
            self.backend.list_posts(),
            self.backend.get_item(self.item_id),
        );
        let (users, posts, item) = match loaded {
            Ok(loaded) => loaded,
            Err(err) => {
                err.report("issue: fetch comments");
                return Err(err);
            }
        };

        let (against, for_side): (Vec<Post>, Vec<Post>) = posts
            .into_iter()
            .filter(|post| post.item == self.item_id)
            .partition(|post| post.side() == Side::Against);
        info!(
            item_id = self.item_id.0,
            for_count = for_side.len(),
            against_count = against.len(),
            "issue: loaded"
        );

        self.state.users = users;
        self.state.title = item.title;
        self.state.description = item.description;
        self.state.for_comments = for_side;
        self.state.against_comments = against;
        Ok(())
    }

    pub fn set_draft_text(&mut self, text: impl Into<String>) {
        self.state.draft.text = text.into();
    }

    pub fn set_draft_side(&mut self, side: Side) {
        self.state.draft.side = side;
    }

    pub fn remaining_chars(&self) -> usize {
        remaining_comment_chars(&self.state.draft.text)
    }

    /// Inline message to show under the comment box, if the last draft was rejected.
    pub fn error_message(&self) -> Option<&'static str> {
        self.state.error.then_some(COMMENT_REJECTED_MESSAGE)
    }

    /// Posts the current draft. A rejected draft sets the error flag and changes no lists.
    /// The draft text is cleared either way.
    pub async fn submit_comment(&mut self) -> Result<SubmitOutcome, ClientError> {
        let text = std::mem::take(&mut self.state.draft.text);
        if let Err(rejected) = validate_comment(&text) {
            debug!(item_id = self.item_id.0, reason = %rejected, "issue: comment rejected");
            self.state.error = true;
            return Ok(SubmitOutcome::Rejected(rejected));
        }
        self.state.error = false;

        let new_post = NewPost::new(self.item_id, self.user_id, text, self.state.draft.side);
        let created = match self.backend.create_post(&new_post).await {
            Ok(created) => created,
            Err(err) => {
                err.report("issue: submit comment");
                return Err(err);
            }
        };
        info!(
            item_id = self.item_id.0,
            post_id = created.id.0,
            side = %created.side(),
            "issue: comment posted"
        );

        match created.side() {
            Side::For => self.state.for_comments.push(created.clone()),
            Side::Against => self.state.against_comments.push(created.clone()),
        }
        if let Err(err) = self.fetch_comments().await {
            debug!(error = %err, "issue: reload after comment failed");
        }
        Ok(SubmitOutcome::Posted(created))
    }

    /// Adds one up or down vote to `post_id` and reloads the comments.
    pub async fn cast_vote(&mut self, post_id: PostId, vote: Vote) -> Result<Post, ClientError> {
        let voted = match self.write_vote(post_id, vote).await {
            Ok(voted) => voted,
            Err(err) => {
                err.report("issue: cast vote");
                return Err(err);
            }
        };
        if let Err(err) = self.fetch_comments().await {
            debug!(error = %err, "issue: reload after vote failed");
        }
        Ok(voted)
    }

    async fn write_vote(&self, post_id: PostId, vote: Vote) -> Result<Post, ClientError> {
        for attempt in 1..=MAX_CONFLICT_RETRIES {
            let Versioned { value: current, etag } = self.backend.get_post(post_id).await?;
            let voted = current.with_vote(vote);
            match self.backend.update_post(&voted, etag.as_deref()).await {
                Ok(()) => {
                    info!(
                        post_id = post_id.0,
                        upvotes = voted.upvotes,
                        downvotes = voted.downvotes,
                        "issue: vote recorded"
                    );
                    return Ok(voted);
                }
                Err(err) if err.is_precondition_failed() => {
                    warn!(post_id = post_id.0, attempt, "issue: post changed since read, retrying");
                }
                Err(err) => return Err(err),
            }
        }
        Err(ClientError::Conflict {
            resource: format!("post {post_id}"),
            attempts: MAX_CONFLICT_RETRIES,
        })
    }

    /// "For" column, highest net score first. Ties keep their fetched order.
    pub fn for_comments(&self) -> Vec<&Post> {
        ranked(&self.state.for_comments)
    }

    /// "Against" column, ordered like [`IssuePage::for_comments`].
    pub fn against_comments(&self) -> Vec<&Post> {
        ranked(&self.state.against_comments)
    }

    pub fn author_name(&self, post: &Post) -> Option<&str> {
        self.state
            .users
            .iter()
            .find(|user| user.id == post.user)
            .map(|user| user.username.as_str())
    }
}

fn ranked(posts: &[Post]) -> Vec<&Post> {
    let mut ranked: Vec<&Post> = posts.iter().collect();
    ranked.sort_by_key(|post| Reverse(post.net_score()));
    ranked
}

#[cfg(test)]
#[path = "tests/issue_tests.rs"]
mod tests;
