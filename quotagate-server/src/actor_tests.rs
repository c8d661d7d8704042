#[cfg(test)]
mod tests {
    use crate::actor::{EntitlementActor, EntitlementHandle};
    use crate::types::EntitlementRequest;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use quotagate::{
        Action, Cooldown, CounterStore, Entitlements, Identity, MemoryStore, Plan, PlanTable,
    };

    fn spawn(plans: PlanTable, cooldown_seconds: u64) -> EntitlementHandle {
        let store: Box<dyn CounterStore + Send> =
            Box::new(MemoryStore::builder().capacity(1000).build());
        let engine = Entitlements::new(store, plans);
        EntitlementActor::spawn(100, engine, Cooldown::new(), cooldown_seconds)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 13, 10, 0, 0).unwrap()
    }

    fn request(identity: Identity, tier: &str, at: DateTime<Utc>) -> EntitlementRequest {
        EntitlementRequest {
            identity,
            tier: tier.to_string(),
            timestamp: at,
        }
    }

    #[tokio::test]
    async fn test_admit_then_commit() {
        let handle = spawn(PlanTable::default(), 0);
        let req = request(Identity::Account("1".into()), "free", now());

        let admitted = handle.admit_generation(req.clone()).await.unwrap();
        assert!(admitted.allowed);
        assert_eq!(admitted.remaining, Some(1));
        assert_eq!(admitted.usage.generations_today, 0);

        let committed = handle.commit(req.clone(), Action::Generation).await.unwrap();
        assert!(committed.allowed);
        assert_eq!(committed.remaining, Some(0));
        assert_eq!(committed.usage.generations_lifetime, 1);

        let denied = handle.admit_generation(req).await.unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.message_key.as_deref(), Some("quota.daily_exceeded"));
    }

    #[tokio::test]
    async fn test_cooldown_blocks_second_admission() {
        let handle = spawn(PlanTable::from_plans([Plan::unlimited("pro")]), 30);
        let identity = Identity::Account("1".into());

        let first = handle
            .admit_generation(request(identity.clone(), "pro", now()))
            .await
            .unwrap();
        assert!(first.allowed);

        let second = handle
            .admit_generation(request(identity.clone(), "pro", now() + Duration::seconds(10)))
            .await
            .unwrap();
        assert!(!second.allowed);
        assert_eq!(second.message_key.as_deref(), Some("rate.cooldown"));
        assert_eq!(second.retry_after, 20);

        let third = handle
            .admit_generation(request(identity, "pro", now() + Duration::seconds(30)))
            .await
            .unwrap();
        assert!(third.allowed);
    }

    #[tokio::test]
    async fn test_cooldown_denial_reports_quota_headroom() {
        let handle = spawn(PlanTable::default(), 30);
        let identity = Identity::Account("1".into());

        let first = handle
            .admit_generation(request(identity.clone(), "free", now()))
            .await
            .unwrap();
        assert!(first.allowed);

        let second = handle
            .admit_generation(request(identity, "free", now() + Duration::seconds(10)))
            .await
            .unwrap();
        assert_eq!(second.message_key.as_deref(), Some("rate.cooldown"));
        assert_eq!(second.remaining, Some(1));
    }

    #[tokio::test]
    async fn test_quota_denial_does_not_start_cooldown() {
        let handle = spawn(PlanTable::default(), 30);
        let identity = Identity::Account("1".into());
        let req = request(identity.clone(), "free", now());

        handle.commit(req.clone(), Action::Generation).await.unwrap();
        let denied = handle.admit_generation(req).await.unwrap();
        assert_eq!(denied.message_key.as_deref(), Some("quota.daily_exceeded"));

        // Still the quota answering, not the cooldown
        let later = request(identity, "free", now() + Duration::seconds(5));
        let denied = handle.admit_generation(later).await.unwrap();
        assert_eq!(denied.message_key.as_deref(), Some("quota.daily_exceeded"));
        assert_eq!(denied.retry_after, 0);
    }

    #[tokio::test]
    async fn test_unknown_tier_fails_closed() {
        let handle = spawn(PlanTable::default(), 0);
        let req = request(Identity::Account("1".into()), "enterprise", now());

        let response = handle.commit(req, Action::Generation).await.unwrap();
        assert!(!response.allowed);
        assert_eq!(response.message_key.as_deref(), Some("plan.unknown_tier"));
        assert_eq!(response.usage.generations_lifetime, 0);
    }

    #[tokio::test]
    async fn test_usage_and_plans() {
        let handle = spawn(PlanTable::default(), 0);
        let req = request(Identity::Guest("g".into()), "guest", now());

        handle.commit(req.clone(), Action::CatalogView).await.unwrap();
        let usage = handle.usage(req).await.unwrap();
        assert_eq!(usage.usage.catalog_views_total, 1);
        assert_eq!(usage.usage.generations_lifetime, 0);

        let plans = handle.plans().await.unwrap();
        let names: Vec<_> = plans.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["free", "guest", "pro"]);
    }

    #[tokio::test]
    async fn test_concurrent_commits() {
        let team = Plan {
            daily_generation_limit: Some(10),
            ..Plan::unlimited("team")
        };
        let handle = spawn(PlanTable::from_plans([team]), 0);
        let req = request(Identity::Account("shared".into()), "team", now());

        let mut handles = vec![];
        for _ in 0..20 {
            let h = handle.clone();
            let r = req.clone();
            handles.push(tokio::spawn(async move {
                h.commit(r, Action::Generation).await
            }));
        }

        let mut allowed_count = 0;
        for h in handles {
            if h.await.unwrap().unwrap().allowed {
                allowed_count += 1;
            }
        }

        // Exactly the daily limit gets through
        assert_eq!(allowed_count, 10);
    }
}
