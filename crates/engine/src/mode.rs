//! Application mode (C8)
//!
//! The four modes spec.md §4.4 names, each carrying its toggles as
//! `const` associated values so [`crate::applier::ApplierChain::build`]
//! is a pure function of the mode — no per-mode branching scattered
//! through the applier bodies themselves. Grounded on the teacher's
//! small enum-with-behavior style used for its WAL `DurabilityMode`.

/// Which pipeline the applier chain is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationMode {
    /// A normal local commit.
    Internal,
    /// A batch applied on behalf of a remote/replicated source.
    External,
    /// Replay from the command log after a crash.
    Recovery,
    /// Undo of a partially applied batch during recovery.
    ReverseRecovery,
}

impl ApplicationMode {
    /// Whether the `HighIdApplier` should run, propagating observed ids
    /// into the id generators (spec §4.4 toggle 1).
    pub const fn needs_high_id_tracking(self) -> bool {
        matches!(self, ApplicationMode::External | ApplicationMode::Recovery)
    }

    /// Whether the `CacheInvalidationApplier` should run (spec §4.4
    /// toggle 2).
    pub const fn needs_cache_invalidation_on_updates(self) -> bool {
        matches!(self, ApplicationMode::Internal | ApplicationMode::External)
    }

    /// Whether the consistency-checking, counts, and index appliers
    /// should run at all (spec §4.4 toggle 3: "appliers 1, 5, 6").
    pub const fn needs_auxiliary_stores(self) -> bool {
        matches!(self, ApplicationMode::Internal | ApplicationMode::External)
    }

    /// Whether this mode acquires locks through a no-op service, since
    /// locks were already acquired and released before the crash being
    /// recovered from (spec §4.4: "RECOVERY and REVERSE_RECOVERY use a
    /// no-op lock service").
    pub const fn uses_noop_locks(self) -> bool {
        matches!(self, ApplicationMode::Recovery | ApplicationMode::ReverseRecovery)
    }

    /// Whether observed ids should be fed back into the id generators at
    /// all, or ignored outright (spec §4.4: "REVERSE_RECOVERY sets the
    /// id-update listener to IGNORE").
    pub const fn id_update_listener(self) -> IdUpdateListener {
        match self {
            ApplicationMode::ReverseRecovery => IdUpdateListener::Ignore,
            _ => IdUpdateListener::Track,
        }
    }
}

/// What the `HighIdApplier` does with an observed id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdUpdateListener {
    /// Advance the id generator's high-water mark.
    Track,
    /// Discard the observation entirely.
    Ignore,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_mode_runs_auxiliary_stores_and_cache_invalidation() {
        let mode = ApplicationMode::Internal;
        assert!(mode.needs_auxiliary_stores());
        assert!(mode.needs_cache_invalidation_on_updates());
        assert!(!mode.needs_high_id_tracking());
        assert!(!mode.uses_noop_locks());
    }

    #[test]
    fn recovery_mode_tracks_high_ids_and_uses_noop_locks() {
        let mode = ApplicationMode::Recovery;
        assert!(mode.needs_high_id_tracking());
        assert!(mode.uses_noop_locks());
        assert!(!mode.needs_auxiliary_stores());
    }

    #[test]
    fn reverse_recovery_ignores_id_updates() {
        assert_eq!(
            ApplicationMode::ReverseRecovery.id_update_listener(),
            IdUpdateListener::Ignore
        );
        assert_eq!(
            ApplicationMode::Internal.id_update_listener(),
            IdUpdateListener::Track
        );
    }
}
