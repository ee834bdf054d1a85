use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::profiles::repo_types::Profile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A post with its author attached for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostWithAuthor {
    pub post: Post,
    pub author: Option<Profile>,
}

/// Flat row of `posts LEFT JOIN profiles`.
#[derive(Debug, FromRow)]
pub struct PostWithAuthorRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub author_id: Option<Uuid>,
    pub author_email: Option<String>,
    pub author_name: Option<String>,
    pub author_bio: Option<String>,
    pub author_avatar_url: Option<String>,
    pub author_created_at: Option<OffsetDateTime>,
    pub author_updated_at: Option<OffsetDateTime>,
}

impl From<PostWithAuthorRow> for PostWithAuthor {
    fn from(r: PostWithAuthorRow) -> Self {
        let author = match (
            r.author_id,
            r.author_email,
            r.author_name,
            r.author_created_at,
            r.author_updated_at,
        ) {
            (Some(id), Some(email), Some(name), Some(created_at), Some(updated_at)) => {
                Some(Profile {
                    id,
                    email,
                    name,
                    bio: r.author_bio,
                    avatar_url: r.author_avatar_url,
                    created_at,
                    updated_at,
                })
            }
            _ => None,
        };
        Self {
            post: Post {
                id: r.id,
                user_id: r.user_id,
                content: r.content,
                created_at: r.created_at,
                updated_at: r.updated_at,
            },
            author,
        }
    }
}

/// Feed query: optional author filter plus a page window.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostFilter {
    pub author: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}
