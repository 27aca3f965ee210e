//! Per-task reached sets.
//!
//! A reached set is owned by exactly one task for its lifetime. It
//! pairs the states discovered so far with the algorithm's waitlist of
//! states still to be processed, plus the precision the exploration
//! runs under.

use std::collections::VecDeque;
use std::fmt;

use blocksum_core::Location;

use crate::interfaces::{AbstractState, BlockDomain};

/// The reached states and waitlist of one block exploration.
pub struct ReachedSet<D: BlockDomain> {
    precision: D::Precision,
    states: Vec<D::State>,
    waitlist: VecDeque<D::State>,
}

impl<D: BlockDomain> fmt::Debug for ReachedSet<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReachedSet")
            .field("states", &self.states.len())
            .field("waitlist", &self.waitlist.len())
            .finish()
    }
}

impl<D: BlockDomain> ReachedSet<D> {
    /// Start an exploration from a single entry state.
    pub fn new(precision: D::Precision, initial: D::State) -> Self {
        Self {
            precision,
            states: vec![initial.clone()],
            waitlist: VecDeque::from([initial]),
        }
    }

    pub fn precision(&self) -> &D::Precision {
        &self.precision
    }

    pub fn states(&self) -> &[D::State] {
        &self.states
    }

    /// Take the next waiting state, if any.
    pub fn pop_waiting(&mut self) -> Option<D::State> {
        self.waitlist.pop_front()
    }

    /// Add a freshly discovered state: reached and waiting.
    pub fn add(&mut self, state: D::State) {
        self.states.push(state.clone());
        self.waitlist.push_back(state);
    }

    pub fn waitlist_len(&self) -> usize {
        self.waitlist.len()
    }

    /// A per-invocation fixed point: nothing left to process.
    pub fn is_settled(&self) -> bool {
        self.waitlist.is_empty()
    }

    /// Build the pruned reached set a continuation resumes from.
    ///
    /// The waitlist is re-seeded as the new exploration frontier;
    /// states sitting exactly at the block's entry location are
    /// discarded unless that location is a loop head (loop-head states
    /// must survive so repeated invocations can converge).
    pub(crate) fn into_continuation(self, entry: Location, entry_is_loop_head: bool) -> Self {
        let frontier: Vec<D::State> = self
            .waitlist
            .into_iter()
            .filter(|state| entry_is_loop_head || state.location() != entry)
            .collect();
        Self {
            precision: self.precision,
            states: frontier.clone(),
            waitlist: frontier.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocksum_core::{AlgorithmStatus, Block, ShutdownSignal};
    use blocksum_formula::PathCondition;

    use crate::error::DomainError;
    use crate::interfaces::AnalysisAlgorithm;

    #[derive(Clone, Debug, PartialEq)]
    struct Loc(Location);

    impl AbstractState for Loc {
        fn location(&self) -> Location {
            self.0
        }
        fn is_abstraction_point(&self) -> bool {
            false
        }
        fn block_formula(&self) -> PathCondition {
            PathCondition::trivial()
        }
        fn path_formula(&self) -> PathCondition {
            PathCondition::trivial()
        }
    }

    struct LocDomain;

    impl BlockDomain for LocDomain {
        type State = Loc;
        type Precision = ();

        fn initial_state(&self, entry: Location, _block: &Block) -> Result<Loc, DomainError> {
            Ok(Loc(entry))
        }
        fn initial_precision(
            &self,
            _entry: Location,
            _block: &Block,
        ) -> Result<(), DomainError> {
            Ok(())
        }
        fn inject_condition(&self, state: Loc, _condition: &PathCondition) -> Loc {
            state
        }
    }

    // Keeps the trait exercised from this module's perspective.
    struct Drain;

    impl AnalysisAlgorithm<LocDomain> for Drain {
        fn run(
            &self,
            reached: &mut ReachedSet<LocDomain>,
            _shutdown: &ShutdownSignal,
        ) -> Result<AlgorithmStatus, crate::error::EngineError> {
            while reached.pop_waiting().is_some() {}
            Ok(AlgorithmStatus::sound_and_precise())
        }
    }

    #[test]
    fn test_new_reached_set_has_one_waiting_state() {
        let reached: ReachedSet<LocDomain> = ReachedSet::new((), Loc(Location(3)));
        assert_eq!(reached.states().len(), 1);
        assert_eq!(reached.waitlist_len(), 1);
        assert!(!reached.is_settled());
    }

    #[test]
    fn test_drain_settles() {
        let mut reached: ReachedSet<LocDomain> = ReachedSet::new((), Loc(Location(3)));
        reached.add(Loc(Location(4)));
        Drain.run(&mut reached, &ShutdownSignal::new()).unwrap();
        assert!(reached.is_settled());
        assert_eq!(reached.states().len(), 2);
    }

    #[test]
    fn test_continuation_drops_entry_states() {
        let mut reached: ReachedSet<LocDomain> = ReachedSet::new((), Loc(Location(0)));
        reached.add(Loc(Location(5)));
        let pruned = reached.into_continuation(Location(0), false);
        assert_eq!(pruned.states().len(), 1);
        assert_eq!(pruned.states()[0].location(), Location(5));
        assert_eq!(pruned.waitlist_len(), 1);
    }

    #[test]
    fn test_continuation_keeps_loop_head_entry_states() {
        let mut reached: ReachedSet<LocDomain> = ReachedSet::new((), Loc(Location(0)));
        reached.add(Loc(Location(5)));
        let pruned = reached.into_continuation(Location(0), true);
        assert_eq!(pruned.states().len(), 2);
    }
}
