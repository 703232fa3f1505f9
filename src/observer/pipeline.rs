use std::collections::BTreeMap;
use std::time::Instant;
use tokio::time::timeout;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};

/// Ring-ordered observer registry for one record type.
///
/// Repositories call `run_before` ahead of their SQL and `run_after` once it
/// has succeeded. Nothing is registered implicitly; each repository wires the
/// observers it needs when it is built.
pub struct ObserverPipeline<R: Send + Sync> {
    observers: BTreeMap<ObserverRing, Vec<Box<dyn Observer<R>>>>,
}

impl<R: Send + Sync> ObserverPipeline<R> {
    pub fn new() -> Self {
        Self { observers: BTreeMap::new() }
    }

    /// Register an observer; observers in a ring stay sorted by priority
    pub fn register_observer(&mut self, observer: impl Observer<R> + 'static) -> &mut Self {
        let ring = observer.ring();
        let name = observer.name();
        let ring_observers = self.observers.entry(ring).or_default();
        ring_observers.push(Box::new(observer));
        ring_observers.sort_by_key(|o| o.priority());

        tracing::debug!("Registered observer '{}' for ring {:?}", name, ring);
        self
    }

    /// Run validation, scoping, and enrichment. Stops at the first ring that reports errors.
    pub async fn run_before(&self, ctx: &mut ObserverContext<R>) -> Result<(), ObserverError> {
        for ring in ObserverRing::before_database() {
            self.execute_ring(ring, ctx).await;

            if ctx.has_errors() {
                tracing::debug!(
                    "Observer pipeline stopped at ring {:?} for {:?} on {}",
                    ring, ctx.operation, ctx.schema_name
                );
                let errors = std::mem::take(&mut ctx.errors);
                if let Some(error) = ObserverError::merge(errors) {
                    return Err(error);
                }
            }
        }
        Ok(())
    }

    /// Run post-persistence observers. Failures are logged, never surfaced:
    /// the write has already happened.
    pub async fn run_after(&self, ctx: &mut ObserverContext<R>) {
        for ring in ObserverRing::after_database() {
            self.execute_ring(ring, ctx).await;
        }
        for error in ctx.errors.drain(..) {
            tracing::warn!("Post-database observer failed on {}: {}", ctx.schema_name, error);
        }
    }

    async fn execute_ring(&self, ring: ObserverRing, ctx: &mut ObserverContext<R>) {
        let Some(observers) = self.observers.get(&ring) else {
            return;
        };

        for observer in observers {
            if !observer.applies_to_operation(ctx.operation) {
                tracing::trace!(
                    "Observer {} skipped - doesn't apply to operation {:?}",
                    observer.name(), ctx.operation
                );
                continue;
            }

            let observer_start = Instant::now();

            // Execute with timeout protection
            let result = timeout(observer.timeout(), observer.execute(ctx)).await;
            let execution_time = observer_start.elapsed();

            match result {
                Ok(Ok(())) => {
                    tracing::trace!("Observer: {} completed in {:?}", observer.name(), execution_time);
                }
                Ok(Err(error)) => {
                    tracing::debug!("Observer: {} failed in {:?}: {}", observer.name(), execution_time, error);
                    ctx.errors.push(error);
                }
                Err(_elapsed) => {
                    tracing::error!("Observer: {} timed out after {:?}", observer.name(), observer.timeout());
                    ctx.errors.push(ObserverError::TimeoutError(format!(
                        "Observer {} timed out after {:?}",
                        observer.name(),
                        observer.timeout()
                    )));
                }
            }
        }
    }
}

impl<R: Send + Sync> Default for ObserverPipeline<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::traits::Operation;
    use async_trait::async_trait;

    #[derive(Debug, Default)]
    struct Note {
        steps: Vec<&'static str>,
    }

    struct Step {
        name: &'static str,
        ring: ObserverRing,
        priority: u8,
        fail: bool,
    }

    #[async_trait]
    impl Observer<Note> for Step {
        fn name(&self) -> &'static str { self.name }
        fn ring(&self) -> ObserverRing { self.ring }
        fn applies_to_operation(&self, op: Operation) -> bool { op == Operation::Create }
        fn priority(&self) -> u8 { self.priority }

        async fn execute(&self, ctx: &mut ObserverContext<Note>) -> Result<(), ObserverError> {
            if let Some(note) = ctx.record_mut() {
                note.steps.push(self.name);
            }
            if self.fail {
                return Err(ObserverError::validation(format!("{} rejected", self.name)));
            }
            Ok(())
        }
    }

    fn step(name: &'static str, ring: ObserverRing, priority: u8, fail: bool) -> Step {
        Step { name, ring, priority, fail }
    }

    #[tokio::test]
    async fn rings_run_in_order_and_priority_within_ring() {
        let mut pipeline = ObserverPipeline::new();
        pipeline
            .register_observer(step("enrich", ObserverRing::Enrichment, 50, false))
            .register_observer(step("validate-late", ObserverRing::InputValidation, 90, false))
            .register_observer(step("validate-early", ObserverRing::InputValidation, 10, false));

        let mut ctx = ObserverContext::create("notes", Note::default());
        pipeline.run_before(&mut ctx).await.unwrap();
        assert_eq!(ctx.record.unwrap().steps, vec!["validate-early", "validate-late", "enrich"]);
    }

    #[tokio::test]
    async fn failing_ring_stops_later_rings_and_collects_messages() {
        let mut pipeline = ObserverPipeline::new();
        pipeline
            .register_observer(step("a", ObserverRing::InputValidation, 10, true))
            .register_observer(step("b", ObserverRing::InputValidation, 20, true))
            .register_observer(step("enrich", ObserverRing::Enrichment, 50, false));

        let mut ctx = ObserverContext::create("notes", Note::default());
        let err = pipeline.run_before(&mut ctx).await.unwrap_err();
        match err {
            ObserverError::ValidationError(m) => assert_eq!(m, vec!["a rejected", "b rejected"]),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(ctx.record.unwrap().steps, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn observers_skip_other_operations() {
        let mut pipeline = ObserverPipeline::new();
        pipeline.register_observer(step("a", ObserverRing::InputValidation, 10, true));

        let filter = crate::filter::Filter::new("notes").unwrap();
        let mut ctx: ObserverContext<Note> = ObserverContext::select("notes", filter);
        assert!(pipeline.run_before(&mut ctx).await.is_ok());
    }

    #[tokio::test]
    async fn after_failures_are_swallowed() {
        let mut pipeline = ObserverPipeline::new();
        pipeline.register_observer(step("audit", ObserverRing::Audit, 50, true));

        let mut ctx = ObserverContext::create("notes", Note::default());
        pipeline.run_after(&mut ctx).await;
        assert!(!ctx.has_errors());
        assert_eq!(ctx.record.unwrap().steps, vec!["audit"]);
    }
}
