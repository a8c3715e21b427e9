//! Applier chain (C8, spec §4.4)
//!
//! The ordered, mode-gated pipeline a committed command batch runs
//! through. Each applier owns one concern (the durable record stores,
//! id-generator high-water marks, schema cache, counts/degrees,
//! consistency) and runs over the *whole* batch before the next
//! applier starts, so an applier never observes a partially-applied
//! batch from one further down the chain. [`ApplicationMode`] decides,
//! per spec §4.4's four toggles, which appliers are even built.

mod cache_invalidation;
mod consistency;
mod counts;
mod high_id;
mod index;
mod neostore;

pub use cache_invalidation::CacheInvalidationApplier;
pub use consistency::ConsistencyCheckingApplier;
pub use counts::CountsApplier;
pub use high_id::HighIdApplier;
pub use index::IndexApplier;
pub use neostore::NeoStoreApplier;

use crate::config::EngineConfig;
use crate::engine::UpdateListener;
use crate::mode::ApplicationMode;
use graphkernel_concurrency::WorkSync;
use graphkernel_core::command::Command;
use graphkernel_core::error::Result;
use graphkernel_schema::SchemaCache;
use graphkernel_storage::StoreRegistry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Shared state one command-batch application walks through the chain.
pub struct ApplyContext<'a> {
    /// The engine's durable stores.
    pub registry: &'a StoreRegistry,
    /// The in-memory schema rule cache.
    pub schema_cache: &'a SchemaCache,
    /// Tracks whether any applier has flagged a structural problem.
    pub health: &'a DatabaseHealth,
    /// Which pipeline is running.
    pub mode: ApplicationMode,
    /// The transaction id the batch commits under.
    pub tx: u64,
    /// The registered index-update listener's single-writer queue, if
    /// one was registered at build time (spec §4.4 applier #6).
    pub index_update_listener: Option<&'a WorkSync<UpdateListener>>,
    /// The registered node-label-update listener's single-writer queue.
    pub node_label_update_listener: Option<&'a WorkSync<UpdateListener>>,
    /// The registered relationship-type-update listener's single-writer
    /// queue.
    pub relationship_type_update_listener: Option<&'a WorkSync<UpdateListener>>,
}

/// One stage of the applier chain.
pub trait CommandApplier: Send + Sync {
    /// Apply `command`'s effect for this applier's concern.
    fn apply(&self, command: &Command, ctx: &ApplyContext) -> Result<()>;

    /// A short, stable name used in health-report messages.
    fn name(&self) -> &'static str;
}

/// Tracks whether the database is still considered structurally sound.
/// Once unhealthy, it stays that way until restarted — mirroring the
/// teacher's convention of treating a consistency violation as fatal
/// rather than attempting to limp onward.
#[derive(Default)]
pub struct DatabaseHealth {
    healthy: AtomicBool,
    reason: Mutex<Option<String>>,
}

impl DatabaseHealth {
    /// A fresh, healthy tracker.
    pub fn new() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            reason: Mutex::new(None),
        }
    }

    /// True unless [`Self::mark_unhealthy`] has ever been called.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    /// The first recorded failure reason, if unhealthy.
    pub fn reason(&self) -> Option<String> {
        self.reason.lock().unwrap().clone()
    }

    /// Flip to unhealthy, recording `reason` if this is the first call.
    pub fn mark_unhealthy(&self, reason: impl Into<String>) {
        let mut slot = self.reason.lock().unwrap();
        if slot.is_none() {
            *slot = Some(reason.into());
        }
        self.healthy.store(false, Ordering::Release);
    }
}

/// The ordered, mode-gated applier pipeline.
pub struct ApplierChain {
    appliers: Vec<Box<dyn CommandApplier>>,
}

impl ApplierChain {
    /// Build the chain for `mode`, gating each optional applier by the
    /// spec §4.4 toggle it belongs to.
    pub fn build(mode: ApplicationMode, config: &EngineConfig) -> Self {
        let mut appliers: Vec<Box<dyn CommandApplier>> = Vec::new();

        if mode.needs_auxiliary_stores() && config.consistency_check_on_apply {
            appliers.push(Box::new(ConsistencyCheckingApplier));
        }
        appliers.push(Box::new(NeoStoreApplier));
        if mode.needs_high_id_tracking() {
            appliers.push(Box::new(HighIdApplier));
        }
        if mode.needs_cache_invalidation_on_updates() {
            appliers.push(Box::new(CacheInvalidationApplier));
        }
        if mode.needs_auxiliary_stores() {
            appliers.push(Box::new(CountsApplier));
            appliers.push(Box::new(IndexApplier));
        }

        Self { appliers }
    }

    /// Run every command in `commands` through each applier in order.
    /// Stops and marks the database unhealthy on the first applier
    /// error.
    pub fn apply_batch(&self, commands: &[Command], ctx: &ApplyContext) -> Result<()> {
        for applier in &self.appliers {
            for command in commands {
                if let Err(e) = applier.apply(command, ctx) {
                    ctx.health.mark_unhealthy(format!("{} failed: {e}", applier.name()));
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_mode_builds_five_appliers() {
        // Consistency, NeoStore, CacheInvalidation, Counts, Index.
        // HighIdApplier is skipped: Internal commits allocate their own
        // ids rather than observing externally-chosen ones.
        let config = EngineConfig::builder().build();
        let chain = ApplierChain::build(ApplicationMode::Internal, &config);
        assert_eq!(chain.appliers.len(), 5);
    }

    #[test]
    fn recovery_mode_skips_auxiliary_and_cache_appliers() {
        let config = EngineConfig::builder().build();
        let chain = ApplierChain::build(ApplicationMode::Recovery, &config);
        // NeoStoreApplier + HighIdApplier only.
        assert_eq!(chain.appliers.len(), 2);
    }

    #[test]
    fn health_starts_healthy_and_latches_first_reason() {
        let health = DatabaseHealth::new();
        assert!(health.is_healthy());
        health.mark_unhealthy("first");
        health.mark_unhealthy("second");
        assert!(!health.is_healthy());
        assert_eq!(health.reason(), Some("first".to_string()));
    }
}
