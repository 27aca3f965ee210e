//! Task requests and their finalized form.
//!
//! A request carries everything needed to *construct* a task but is not
//! itself executable: it must first be finalized against the current
//! summary store, which can invalidate it. Invalidation is normal
//! control flow, so finalization returns an enum, not an error.

use blocksum_core::{BlockId, Location};
use blocksum_formula::DetachedCondition;

use crate::interfaces::BlockDomain;
use crate::message::SavedExploration;
use crate::reached::ReachedSet;

/// Where a request came from.
#[derive(Debug)]
pub enum RequestOrigin<D: BlockDomain> {
    /// Initial seeding of an error-side block with the trivial
    /// condition. At most one seed is ever admitted per entry location.
    Seed,

    /// Propagation across the edge from `from` into the target block,
    /// carrying the condition computed on the far side.
    Propagated {
        from: BlockId,
        condition: DetachedCondition,
    },

    /// Resumption of a paused exploration. Admitted only while the
    /// target block's summary version still matches `observed_version`.
    Continuation {
        saved: SavedExploration<D>,
        observed_version: u64,
    },
}

/// A not-yet-committed unit of analysis work.
#[derive(Debug)]
pub struct TaskRequest<D: BlockDomain> {
    pub target: BlockId,
    pub entry: Location,
    pub origin: RequestOrigin<D>,
}

impl<D: BlockDomain> TaskRequest<D> {
    pub fn seed(target: BlockId, entry: Location) -> Self {
        Self {
            target,
            entry,
            origin: RequestOrigin::Seed,
        }
    }

    pub fn propagated(
        target: BlockId,
        entry: Location,
        from: BlockId,
        condition: DetachedCondition,
    ) -> Self {
        Self {
            target,
            entry,
            origin: RequestOrigin::Propagated { from, condition },
        }
    }

    pub fn continuation(
        target: BlockId,
        entry: Location,
        saved: SavedExploration<D>,
        observed_version: u64,
    ) -> Self {
        Self {
            target,
            entry,
            origin: RequestOrigin::Continuation {
                saved,
                observed_version,
            },
        }
    }
}

/// Outcome of finalizing a request against the summary store.
#[derive(Debug)]
pub enum Finalization<D: BlockDomain> {
    /// The request was committed; the task is ready to execute.
    Admitted(ReadyTask<D>),

    /// A newer seed or summary superseded the request. Normal flow;
    /// the request is dropped silently.
    Invalidated,
}

impl<D: BlockDomain> Finalization<D> {
    pub fn is_invalidated(&self) -> bool {
        matches!(self, Finalization::Invalidated)
    }
}

/// A finalized, executable unit of analysis work.
#[derive(Debug)]
pub struct ReadyTask<D: BlockDomain> {
    pub target: BlockId,
    pub entry: Location,
    /// The condition inherited across the incoming edge; trivial for
    /// seeds.
    pub inherited: DetachedCondition,
    /// A saved reached set to resume from, for continuations.
    pub saved: Option<ReachedSet<D>>,
    /// The target block's summary version at finalization time.
    pub observed_version: u64,
}
