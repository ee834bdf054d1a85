use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::LikeStats;

/// Likes of a post as seen by the viewer, or `Unavailable` when the lookup
/// failed. Renders as count 0 / not liked, but is not a real zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LikeTally {
    Known { count: i64, liked: bool },
    Unavailable,
}

impl LikeTally {
    pub fn count(&self) -> i64 {
        match self {
            LikeTally::Known { count, .. } => *count,
            LikeTally::Unavailable => 0,
        }
    }

    pub fn liked(&self) -> bool {
        matches!(self, LikeTally::Known { liked: true, .. })
    }

    pub fn is_known(&self) -> bool {
        matches!(self, LikeTally::Known { .. })
    }
}

impl From<LikeStats> for LikeTally {
    fn from(s: LikeStats) -> Self {
        LikeTally::Known {
            count: s.count,
            liked: s.liked,
        }
    }
}

/// GET /posts/:id/likes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeStatus {
    pub post_id: Uuid,
    pub likes: LikeTally,
}

/// Result of a like write: the state just written plus a fresh tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeChange {
    pub post_id: Uuid,
    pub liked: bool,
    pub changed: bool,
    pub likes: LikeTally,
}
