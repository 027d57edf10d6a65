use super::ClaimsPrincipal;
use moka::future::Cache as MokaCache;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

/// Maximum number of cached introspection results
const MAX_ENTRIES: u64 = 10_000;

#[derive(Clone)]
struct CachedPrincipal {
    principal: ClaimsPrincipal,
    expires_at: Instant,
}

/// Cache of active introspection results, keyed by a hash of the token so
/// raw tokens are never kept in memory longer than the request
#[derive(Clone)]
pub struct IntrospectionCache {
    cache: MokaCache<String, CachedPrincipal>,
    ttl: Duration,
}

impl IntrospectionCache {
    /// Initialize a new cache whose entries live at most `ttl_secs`
    pub fn new(ttl_secs: u64) -> Self {
        let ttl = Duration::from_secs(ttl_secs);
        let cache = MokaCache::builder()
            .time_to_live(ttl)
            .max_capacity(MAX_ENTRIES)
            .build();
        Self { cache, ttl }
    }

    fn key(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("introspection:{:x}", hasher.finalize())
    }

    /// Store an active result. `token_lifetime` (from the `exp` claim) caps
    /// the entry lifetime below the configured TTL.
    pub async fn insert(
        &self,
        token: &str,
        principal: ClaimsPrincipal,
        token_lifetime: Option<Duration>,
    ) {
        let lifetime = token_lifetime.map_or(self.ttl, |l| l.min(self.ttl));
        if lifetime.is_zero() {
            return;
        }
        let entry = CachedPrincipal {
            principal,
            expires_at: Instant::now() + lifetime,
        };
        self.cache.insert(Self::key(token), entry).await;
    }

    pub async fn get(&self, token: &str) -> Option<ClaimsPrincipal> {
        let key = Self::key(token);
        let entry = self.cache.get(&key).await?;
        if Instant::now() >= entry.expires_at {
            self.cache.invalidate(&key).await;
            return None;
        }
        Some(entry.principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Claim;

    fn principal() -> ClaimsPrincipal {
        ClaimsPrincipal::new(vec![Claim::new("role", "records.user")], "email")
    }

    #[tokio::test]
    async fn test_cache_operations() {
        let cache = IntrospectionCache::new(60);

        cache.insert("token-a", principal(), None).await;
        assert_eq!(cache.get("token-a").await, Some(principal()));
        assert_eq!(cache.get("token-b").await, None);
    }

    #[tokio::test]
    async fn test_entry_expires_with_token() {
        let cache = IntrospectionCache::new(60);

        cache
            .insert("short-lived", principal(), Some(Duration::from_millis(50)))
            .await;
        assert!(cache.get("short-lived").await.is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(cache.get("short-lived").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_token_is_not_cached() {
        let cache = IntrospectionCache::new(60);
        cache
            .insert("expired", principal(), Some(Duration::ZERO))
            .await;
        assert!(cache.get("expired").await.is_none());
    }

    #[test]
    fn test_key_does_not_contain_token() {
        let key = IntrospectionCache::key("my-secret-token");
        assert!(!key.contains("my-secret-token"));
        assert_eq!(key, IntrospectionCache::key("my-secret-token"));
    }
}
