use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::PostWithAuthor;
use crate::likes::dto::LikeTally;
use crate::profiles::repo_types::Profile;

/// A feed entry: the post, its author and the viewer's like tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub author: Option<Profile>,
    pub likes: LikeTally,
}

impl PostView {
    pub fn new(p: PostWithAuthor, likes: LikeTally) -> Self {
        Self {
            id: p.post.id,
            user_id: p.post.user_id,
            content: p.post.content,
            created_at: p.post.created_at,
            updated_at: p.post.updated_at,
            author: p.author,
            likes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
}

/// GET /posts query: `author` narrows the feed to one profile.
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub author: Option<Uuid>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: i64,
}
