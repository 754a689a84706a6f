//! Identity and subscription collaborator interfaces.
//!
//! Registration, sessions and billing-webhook synchronization live outside
//! this crate; the pipeline only reads the current identity and its
//! subscription state through these seams.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::Result;
use crate::types::Subscription;

/// Read access to subscription state owned by the billing collaborator.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// The identity's subscription, if one was ever created.
    async fn find(&self, identity_id: &str) -> Result<Option<Subscription>>;
}

/// In-memory subscription store for tests and single-instance deployments.
pub struct MemorySubscriptionStore {
    subscriptions: RwLock<HashMap<String, Subscription>>,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
        }
    }

    pub fn upsert(&self, identity_id: &str, subscription: Subscription) {
        self.subscriptions
            .write()
            .insert(identity_id.to_string(), subscription);
    }
}

impl Default for MemorySubscriptionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn find(&self, identity_id: &str) -> Result<Option<Subscription>> {
        Ok(self.subscriptions.read().get(identity_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Plan, SubscriptionStatus};

    #[tokio::test]
    async fn test_find_missing_is_none() {
        let store = MemorySubscriptionStore::new();
        assert!(store.find("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_then_find() {
        let store = MemorySubscriptionStore::new();
        store.upsert(
            "user-1",
            Subscription {
                plan: Plan::Pro,
                status: SubscriptionStatus::Active,
                price_ref: Some("price_pro_monthly".to_string()),
            },
        );

        let found = store.find("user-1").await.unwrap().unwrap();
        assert_eq!(found.plan, Plan::Pro);
        assert_eq!(found.status, SubscriptionStatus::Active);
    }
}
