use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// One user's like on one post.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PostLike {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Aggregated likes of a post as seen by one viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LikeStats {
    pub count: i64,
    pub liked: bool,
}
