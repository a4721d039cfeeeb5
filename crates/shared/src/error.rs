use thiserror::Error;

pub const MAX_COMMENT_CHARS: usize = 280;

/// Inline message shown under the comment box when a draft is rejected.
pub const COMMENT_REJECTED_MESSAGE: &str =
    "Comment must be nonempty and a maximum of 280 characters.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommentRejected {
    #[error("comment is empty")]
    Empty,
    #[error("comment is {chars} characters, limit is 280")]
    TooLong { chars: usize },
}

/// Lengths are counted in characters, not bytes.
pub fn validate_comment(content: &str) -> Result<(), CommentRejected> {
    if content.is_empty() {
        return Err(CommentRejected::Empty);
    }
    let chars = content.chars().count();
    if chars > MAX_COMMENT_CHARS {
        return Err(CommentRejected::TooLong { chars });
    }
    Ok(())
}

pub fn remaining_comment_chars(content: &str) -> usize {
    MAX_COMMENT_CHARS.saturating_sub(content.chars().count())
}
