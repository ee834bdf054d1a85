use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{NewAccount, Store, StoreError, StoreResult};
use crate::auth::repo_types::User;
use crate::likes::repo_types::{LikeStats, PostLike};
use crate::posts::repo_types::{Post, PostFilter, PostWithAuthor};
use crate::profiles::repo_types::{Profile, ProfileChanges};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    profiles: Vec<Profile>,
    // (insertion sequence, post); the sequence breaks created_at ties
    posts: Vec<(u64, Post)>,
    likes: Vec<PostLike>,
    next_seq: u64,
}

/// In-process tables for tests. `fail_likes` makes every like read fail.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_likes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_likes(&self, fail: bool) {
        self.fail_likes.store(fail, Ordering::SeqCst);
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory store poisoned")
    }

    fn check_likes(&self) -> StoreResult<()> {
        if self.fail_likes.load(Ordering::SeqCst) {
            return Err(StoreError::Other(anyhow::anyhow!("post_likes unavailable")));
        }
        Ok(())
    }
}

impl Tables {
    // batch lookup of authors, the way the feed joins without SQL
    fn with_author(&self, post: &Post) -> PostWithAuthor {
        PostWithAuthor {
            post: post.clone(),
            author: self.profiles.iter().find(|p| p.id == post.user_id).cloned(),
        }
    }

    fn post_exists(&self, id: Uuid) -> bool {
        self.posts.iter().any(|(_, p)| p.id == id)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.tables().users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables().users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_account(&self, account: NewAccount<'_>) -> StoreResult<(User, Profile)> {
        let mut t = self.tables();
        if t.users.iter().any(|u| u.email == account.email) {
            return Err(StoreError::Conflict("email"));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: account.email.to_string(),
            password_hash: account.password_hash.to_string(),
            created_at: now,
        };
        let profile = Profile {
            id: user.id,
            email: user.email.clone(),
            name: account.name.to_string(),
            bio: account.bio.map(str::to_string),
            avatar_url: None,
            created_at: now,
            updated_at: now,
        };
        t.users.push(user.clone());
        t.profiles.push(profile.clone());
        Ok((user, profile))
    }

    async fn get_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(self.tables().profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn list_profiles(&self, exclude: Option<Uuid>, limit: i64) -> StoreResult<Vec<Profile>> {
        let t = self.tables();
        let mut out: Vec<Profile> = t
            .profiles
            .iter()
            .filter(|p| Some(p.id) != exclude)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        out.truncate(limit.max(0) as usize);
        Ok(out)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> StoreResult<Option<Profile>> {
        let mut t = self.tables();
        let Some(profile) = t.profiles.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            profile.name = name.clone();
        }
        if let Some(bio) = &changes.bio {
            profile.bio = Some(bio.clone()).filter(|b| !b.is_empty());
        }
        if let Some(url) = &changes.avatar_url {
            profile.avatar_url = Some(url.clone()).filter(|u| !u.is_empty());
        }
        profile.updated_at = OffsetDateTime::now_utc();
        Ok(Some(profile.clone()))
    }

    async fn list_posts(&self, filter: PostFilter) -> StoreResult<Vec<PostWithAuthor>> {
        let t = self.tables();
        let mut rows: Vec<&(u64, Post)> = t
            .posts
            .iter()
            .filter(|(_, p)| filter.author.map_or(true, |a| p.user_id == a))
            .collect();
        rows.sort_by(|(sa, a), (sb, b)| b.created_at.cmp(&a.created_at).then(sb.cmp(sa)));
        Ok(rows
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .map(|(_, p)| t.with_author(p))
            .collect())
    }

    async fn get_post(&self, id: Uuid) -> StoreResult<Option<PostWithAuthor>> {
        let t = self.tables();
        Ok(t.posts
            .iter()
            .find(|(_, p)| p.id == id)
            .map(|(_, p)| t.with_author(p)))
    }

    async fn insert_post(&self, user_id: Uuid, content: &str) -> StoreResult<PostWithAuthor> {
        let mut t = self.tables();
        if !t.profiles.iter().any(|p| p.id == user_id) {
            return Err(StoreError::NotFound("profile"));
        }
        let now = OffsetDateTime::now_utc();
        let post = Post {
            id: Uuid::new_v4(),
            user_id,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        let seq = t.next_seq;
        t.next_seq += 1;
        t.posts.push((seq, post.clone()));
        Ok(t.with_author(&post))
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        if self.remove_like(post_id, user_id).await? {
            return Ok(false);
        }
        self.add_like(post_id, user_id).await?;
        Ok(true)
    }

    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> StoreResult<Option<PostLike>> {
        let mut t = self.tables();
        if !t.post_exists(post_id) {
            return Err(StoreError::NotFound("post"));
        }
        if t.likes.iter().any(|l| l.post_id == post_id && l.user_id == user_id) {
            return Ok(None);
        }
        let like = PostLike {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            created_at: OffsetDateTime::now_utc(),
        };
        t.likes.push(like.clone());
        Ok(Some(like))
    }

    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables();
        let before = t.likes.len();
        t.likes.retain(|l| !(l.post_id == post_id && l.user_id == user_id));
        Ok(t.likes.len() != before)
    }

    async fn count_likes(&self, post_id: Uuid) -> StoreResult<i64> {
        self.check_likes()?;
        Ok(self.tables().likes.iter().filter(|l| l.post_id == post_id).count() as i64)
    }

    async fn is_liked(&self, post_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        self.check_likes()?;
        Ok(self
            .tables()
            .likes
            .iter()
            .any(|l| l.post_id == post_id && l.user_id == user_id))
    }

    async fn like_stats(
        &self,
        post_ids: &[Uuid],
        viewer: Option<Uuid>,
    ) -> StoreResult<HashMap<Uuid, LikeStats>> {
        self.check_likes()?;
        let t = self.tables();
        let mut out: HashMap<Uuid, LikeStats> = HashMap::new();
        for like in t.likes.iter().filter(|l| post_ids.contains(&l.post_id)) {
            let stats = out.entry(like.post_id).or_default();
            stats.count += 1;
            stats.liked |= Some(like.user_id) == viewer;
        }
        Ok(out)
    }
}
