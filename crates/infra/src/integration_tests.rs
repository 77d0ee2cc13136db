//! Integration tests for the full dispatch pipeline.
//!
//! Tests: Coordinator → Scheduler → RewriteProcessor → Generator + ResultStore
//!
//! Verifies:
//! - Failed generations are retried with backoff and never pollute the store
//! - Slow generations time out the caller but still land in the cache
//! - Store outages degrade to uncached service
//! - Admission control and shutdown behave under load

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use retone_core::{RewriteRequest, Tone};

    use crate::coordinator::{Coordinator, CoordinatorConfig, DispatchError};
    use crate::jobs::{SchedulerConfig, SchedulerError};
    use crate::store::{InMemoryResultStore, ResultStore};
    use crate::testing::ScriptedGenerator;

    fn hello() -> RewriteRequest {
        RewriteRequest::new("Hello world", vec![Tone::Casual])
    }

    fn setup(
        config: CoordinatorConfig,
        generator: ScriptedGenerator,
    ) -> (Coordinator, Arc<InMemoryResultStore>, Arc<ScriptedGenerator>) {
        let store = InMemoryResultStore::arc();
        let generator = Arc::new(generator);
        let coordinator = Coordinator::open(config, store.clone(), generator.clone());
        (coordinator, store, generator)
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_transparently() {
        let (coordinator, store, generator) = setup(
            CoordinatorConfig::default(),
            ScriptedGenerator::new("Hey").failing_first(2),
        );
        let started = tokio::time::Instant::now();

        let outcome = coordinator.dispatch(&hello()).await.unwrap();

        assert_eq!(outcome.result, "Hey #3");
        assert_eq!(generator.calls(), 3);
        assert!(started.elapsed() >= Duration::from_secs(6));
        assert!(store.exists(&outcome.cache_key).await);
        assert_eq!(coordinator.stats().retried, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_fail_the_dispatch_and_leave_the_store_alone() {
        let (coordinator, store, generator) = setup(
            CoordinatorConfig::default(),
            ScriptedGenerator::new("never").always_failing(),
        );

        let err = coordinator.dispatch(&hello()).await.unwrap_err();

        match err {
            DispatchError::JobFailed { attempts, error, .. } => {
                assert_eq!(attempts, 3);
                assert!(error.contains("503"));
            }
            other => panic!("expected JobFailed, got {other:?}"),
        }
        assert_eq!(generator.calls(), 3);
        let key = hello().key();
        assert!(!store.exists(&key).await);
        assert!(store.get_versions(&key).await.is_empty());

        let recent = coordinator.recent_jobs();
        assert_eq!(recent.failed.len(), 1);
        assert!(recent.completed.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_generation_times_out_then_lands_in_cache() {
        let (coordinator, _store, generator) = setup(
            CoordinatorConfig::default(),
            ScriptedGenerator::new("Hey").with_delay(Duration::from_secs(40)),
        );
        let started = tokio::time::Instant::now();

        let err = coordinator.dispatch(&hello()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Timeout { .. }));
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(30) && waited < Duration::from_secs(31));

        tokio::time::sleep(Duration::from_secs(15)).await;

        let later = coordinator.dispatch(&hello()).await.unwrap();
        assert!(later.from_cache);
        assert_eq!(later.result, "Hey #1");
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn store_outage_serves_uncached_results() {
        let (coordinator, store, generator) =
            setup(CoordinatorConfig::default(), ScriptedGenerator::new("Hey"));
        store.set_available(false);

        let first = coordinator.dispatch(&hello()).await.unwrap();
        let second = coordinator.dispatch(&hello()).await.unwrap();

        assert!(!first.from_cache);
        assert!(!second.from_cache);
        assert_eq!(generator.calls(), 2);

        let again = coordinator.dispatch(&hello().try_again(true)).await.unwrap();
        assert!(again.fresh_fallback);
    }

    #[tokio::test]
    async fn try_again_with_no_history_is_flagged() {
        let (coordinator, store, _generator) =
            setup(CoordinatorConfig::default(), ScriptedGenerator::new("Hey"));

        let outcome = coordinator.dispatch(&hello().try_again(true)).await.unwrap();

        assert!(outcome.fresh_fallback);
        assert_eq!(outcome.total_attempts, 1);
        assert_eq!(store.get(&outcome.cache_key).await.as_deref(), Some("Hey #1"));
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_rejects_dispatches() {
        let config = CoordinatorConfig {
            scheduler: SchedulerConfig::default().with_workers(1).with_max_queue_depth(1),
            ..Default::default()
        };
        let (coordinator, _store, _generator) =
            setup(config, ScriptedGenerator::new("Hey").with_delay(Duration::from_secs(5)));

        let first = RewriteRequest::new("one", vec![Tone::Casual]);
        let second = RewriteRequest::new("two", vec![Tone::Casual]);
        let third = RewriteRequest::new("three", vec![Tone::Casual]);

        let (a, b, c) = tokio::join!(
            coordinator.dispatch(&first),
            async {
                tokio::task::yield_now().await;
                coordinator.dispatch(&second).await
            },
            async {
                tokio::task::yield_now().await;
                tokio::task::yield_now().await;
                coordinator.dispatch(&third).await
            },
        );

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert!(matches!(
            c,
            Err(DispatchError::Rejected(SchedulerError::QueueFull { depth: 1 }))
        ));
        assert_eq!(coordinator.stats().rejected, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_lets_in_flight_dispatches_finish() {
        let (coordinator, store, _generator) = setup(
            CoordinatorConfig::default(),
            ScriptedGenerator::new("Hey").with_delay(Duration::from_secs(3)),
        );
        let coordinator = Arc::new(coordinator);

        let pending = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.dispatch(&hello()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        coordinator.shutdown().await;

        let outcome = pending.await.unwrap().unwrap();
        assert_eq!(outcome.result, "Hey #1");
        assert!(store.exists(&outcome.cache_key).await);
        assert!(!coordinator.stats().accepting);
        assert!(matches!(
            coordinator.dispatch(&RewriteRequest::new("late", vec![Tone::Casual])).await,
            Err(DispatchError::Rejected(SchedulerError::ShuttingDown))
        ));
    }
}
