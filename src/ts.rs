//! The interface every transition system offers to the engine: the formulas
//! I, T, constraint, P and ¬P, plus re-constraining with a single number
//! whose meaning stays opaque to the search.
use crate::types::{Clause, Cube, Lit};
use crate::vars::VarPool;

/// How a [`TransitionSystemIF::constrain`] call changed the system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Diff {
    None,
    Tightened,
    Loosened,
}

pub trait TransitionSystemIF {
    fn name(&self) -> &str;

    /// The single initial state, as a full cube over current atoms.
    fn initial(&self) -> &Cube;

    /// Transition relation clauses (may be empty when the relation lives in
    /// the constraint region).
    fn transition(&self) -> &[Clause];

    /// Constraint clauses; swapped wholesale by [`TransitionSystemIF::constrain`].
    fn constraint(&self) -> &[Clause];

    /// The safety property over current atoms, in clausal form.
    fn property(&self) -> &[Clause];

    /// Definitional clauses for the ¬P assumption literals, current and
    /// next. Harmless to assert anywhere.
    fn bad_defs(&self) -> &[Clause];

    /// Assumption literals expressing ¬P over current atoms.
    fn bad_current(&self) -> &[Lit];

    /// Assumption literals expressing ¬P over next atoms.
    fn bad_next(&self) -> &[Lit];

    /// Replace the constraint value, rebuilding the affected clause sets.
    fn constrain(&mut self, pool: &mut VarPool, value: u32) -> Diff;

    fn constraint_num(&self) -> u32;

    fn constraint_str(&self) -> String;

    /// Smallest constraint value worth trying.
    fn constraint_min(&self) -> u32;

    /// Largest meaningful constraint value.
    fn constraint_max(&self) -> u32;

    /// Human-readable form of a state cube, for traces.
    fn describe_state(&self, pool: &VarPool, cube: &Cube) -> String {
        pool.cube_str(cube)
    }

    /// One-paragraph model summary for `--show-only`.
    fn show(&self, pool: &VarPool) -> String;
}
