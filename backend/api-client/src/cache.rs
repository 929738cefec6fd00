//! Process-local listing cache
//!
//! Entries expire after a fixed TTL. Likes are applied to cached entries
//! before the server answers and are either reconciled or rolled back.

use crate::models::Post;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct CachedEntry {
    post: Post,
    expires_at: Instant,
}

impl CachedEntry {
    #[inline]
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Like state captured before an optimistic update, used for rollback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeSnapshot {
    pub liked: bool,
    pub like_count: i64,
}

pub struct PostCache {
    entries: DashMap<Uuid, CachedEntry>,
    ttl: Duration,
}

impl PostCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<Post> {
        let expired = match self.entries.get(id) {
            Some(entry) if !entry.is_expired() => return Some(entry.post.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            // guard dropped above; removing while holding it would deadlock
            self.entries.remove(id);
            debug!(post_id = %id, "Post cache entry expired");
        }
        None
    }

    pub fn insert(&self, post: Post) {
        self.entries.insert(
            post.id,
            CachedEntry {
                post,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn invalidate(&self, id: &Uuid) {
        self.entries.remove(id);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current like state of a cached post; `liked_by_me` defaults to `false`
    pub fn like_state(&self, id: &Uuid) -> Option<LikeSnapshot> {
        self.get(id).map(|post| LikeSnapshot {
            liked: post.liked_by_me.unwrap_or(false),
            like_count: post.like_count,
        })
    }

    /// Flip the cached like state and adjust the count; returns the state before the flip
    pub fn apply_like(&self, id: &Uuid, liked: bool) -> Option<LikeSnapshot> {
        let mut entry = self.entries.get_mut(id)?;
        if entry.is_expired() {
            return None;
        }

        let before = LikeSnapshot {
            liked: entry.post.liked_by_me.unwrap_or(false),
            like_count: entry.post.like_count,
        };
        if before.liked != liked {
            let delta = if liked { 1 } else { -1 };
            entry.post.like_count = (entry.post.like_count + delta).max(0);
        }
        entry.post.liked_by_me = Some(liked);
        Some(before)
    }

    /// Overwrite the like state, for reconciliation and rollback
    pub fn set_like(&self, id: &Uuid, liked: bool, like_count: i64) {
        if let Some(mut entry) = self.entries.get_mut(id) {
            entry.post.liked_by_me = Some(liked);
            entry.post.like_count = like_count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PostStatus, PostTier, SellerSummary};
    use chrono::Utc;

    fn post(like_count: i64, liked_by_me: Option<bool>) -> Post {
        Post {
            id: Uuid::new_v4(),
            title: "Samsung A54".into(),
            description: "Boxed, 128GB".into(),
            price: 180_000,
            currency: "XAF".into(),
            location: Some("Yaoundé".into()),
            images: vec![],
            status: PostStatus::Active,
            tier: PostTier::Free,
            tier_expires_at: None,
            view_count: 0,
            like_count,
            liked_by_me,
            seller: SellerSummary {
                id: Uuid::new_v4(),
                name: "Amina".into(),
                avatar_url: None,
            },
            category: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_get_returns_fresh_entries() {
        let cache = PostCache::new(Duration::from_secs(60));
        let p = post(3, None);
        let id = p.id;
        cache.insert(p);

        assert_eq!(cache.get(&id).map(|p| p.like_count), Some(3));
        cache.invalidate(&id);
        assert!(cache.get(&id).is_none());
    }

    #[test]
    fn test_expired_entries_are_evicted() {
        let cache = PostCache::new(Duration::ZERO);
        let p = post(1, None);
        let id = p.id;
        cache.insert(p);

        assert!(cache.get(&id).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_apply_like_adjusts_count_once() {
        let cache = PostCache::new(Duration::from_secs(60));
        let p = post(4, Some(false));
        let id = p.id;
        cache.insert(p);

        let before = cache.apply_like(&id, true).unwrap();
        assert_eq!(before, LikeSnapshot { liked: false, like_count: 4 });
        assert_eq!(cache.like_state(&id), Some(LikeSnapshot { liked: true, like_count: 5 }));

        // already liked: count unchanged
        cache.apply_like(&id, true).unwrap();
        assert_eq!(cache.like_state(&id).unwrap().like_count, 5);

        cache.set_like(&id, before.liked, before.like_count);
        assert_eq!(cache.like_state(&id), Some(before));
    }

    #[test]
    fn test_unlike_never_goes_negative() {
        let cache = PostCache::new(Duration::from_secs(60));
        let p = post(0, Some(true));
        let id = p.id;
        cache.insert(p);

        cache.apply_like(&id, false).unwrap();
        assert_eq!(cache.like_state(&id), Some(LikeSnapshot { liked: false, like_count: 0 }));
    }

    #[test]
    fn test_apply_like_on_missing_post() {
        let cache = PostCache::new(Duration::from_secs(60));
        assert!(cache.apply_like(&Uuid::new_v4(), true).is_none());
    }
}
