//! Stateful wrapper around the SAT backend. Three regions live in one
//! varisat instance: the unconditional base (transition relation and fixed
//! assertions), the constraint, and the blocked clauses. varisat cannot pop,
//! so the removable regions are gated by activation literals that every
//! `check` assumes; dropping a region swaps its gate for a fresh one.
use crate::types::{Clause, Cube, Error, Lit, Result};
use crate::vars::VarPool;
use varisat::ExtendFormula;

pub struct Solver {
    sat: varisat::Solver<'static>,
    seed: u64,
    constraint_act: Lit,
    blocked_act: Lit,
    n_clauses: usize,
    last_sat: Option<bool>,
}

impl Solver {
    /// Build with the base and constraint regions asserted, in that order.
    pub fn new(pool: &mut VarPool, seed: u64, base: &[Clause], constraint: &[Clause]) -> Solver {
        let mut s = Solver {
            sat: varisat::Solver::new(),
            seed,
            constraint_act: pool.aux("con"),
            blocked_act: pool.aux("blk"),
            n_clauses: 0,
            last_sat: None,
        };
        for c in base {
            s.add(c);
        }
        let act = s.constraint_act;
        for c in constraint {
            s.add_gated(c, act);
        }
        s
    }

    /// The seed this instance was configured with. The backend itself is
    /// deterministic; the seed tags the run in logs and dumps.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn n_clauses(&self) -> usize {
        self.n_clauses
    }

    fn add(&mut self, c: &Clause) {
        self.sat.add_clause(c.lits());
        self.n_clauses += 1;
    }

    fn add_gated(&mut self, c: &Clause, act: Lit) {
        let mut lits = c.lits().to_vec();
        lits.push(!act);
        self.sat.add_clause(&lits);
        self.n_clauses += 1;
    }

    /// Assert `¬cube` in the blocked region.
    pub fn block(&mut self, cube: &Cube) {
        let act = self.blocked_act;
        self.add_gated(&cube.negate(), act);
    }

    /// Assert `¬cube ∨ ¬act`; the caller owns the gate (delta frames,
    /// one-shot query clauses).
    pub fn block_gated(&mut self, cube: &Cube, act: Lit) {
        self.add_gated(&cube.negate(), act);
    }

    /// Satisfiability under `assumptions` plus the live region gates.
    /// A backend failure is the fatal "unknown".
    pub fn check(&mut self, assumptions: &[Lit]) -> Result<bool> {
        let mut assume = Vec::with_capacity(assumptions.len() + 2);
        assume.extend_from_slice(assumptions);
        assume.push(self.constraint_act);
        assume.push(self.blocked_act);
        self.sat.assume(&assume);
        match self.sat.solve() {
            Ok(sat) => {
                self.last_sat = Some(sat);
                Ok(sat)
            }
            Err(e) => Err(Error::SolverUnknown {
                level: 0,
                assumptions: assumptions.len(),
                reason: e.to_string(),
            }),
        }
    }

    /// The model of the last sat `check`, restricted to current-state atoms.
    pub fn witness_current(&self, pool: &VarPool) -> Cube {
        debug_assert_eq!(self.last_sat, Some(true), "witness without a sat result");
        pool.filter_current(&self.model())
    }

    /// The model of the last sat `check`, restricted to next-state atoms and
    /// mapped back onto the current copies.
    pub fn witness_next(&self, pool: &VarPool) -> Cube {
        debug_assert_eq!(self.last_sat, Some(true), "witness without a sat result");
        pool.filter_next_unprimed(&self.model())
    }

    fn model(&self) -> Vec<Lit> {
        self.sat.model().expect("no model for the last check")
    }

    /// The subset of the caller's assumptions that made the last `check`
    /// unsat, sorted. Region gates are stripped.
    pub fn unsat_core(&self) -> Vec<Lit> {
        debug_assert_eq!(self.last_sat, Some(false), "core without an unsat result");
        let mut core: Vec<Lit> = self
            .sat
            .failed_core()
            .unwrap_or(&[])
            .iter()
            .copied()
            .filter(|l| {
                l.var() != self.constraint_act.var() && l.var() != self.blocked_act.var()
            })
            .collect();
        core.sort_unstable();
        core
    }

    /// Drop the blocked region.
    pub fn reset(&mut self, pool: &mut VarPool) {
        self.blocked_act = pool.aux("blk");
        self.last_sat = None;
    }

    /// Drop the blocked region and re-block `cubes`.
    pub fn reset_with<'a>(
        &mut self,
        pool: &mut VarPool,
        cubes: impl IntoIterator<Item = &'a Cube>,
    ) {
        self.reset(pool);
        for c in cubes {
            self.block(c);
        }
    }

    /// Drop the constraint and blocked regions, then assert `constraint`.
    pub fn reconstrain(&mut self, pool: &mut VarPool, constraint: &[Clause]) {
        self.constraint_act = pool.aux("con");
        self.blocked_act = pool.aux("blk");
        self.last_sat = None;
        let act = self.constraint_act;
        for c in constraint {
            self.add_gated(c, act);
        }
    }

    /// [`Solver::reconstrain`], then re-block `cubes`.
    pub fn reconstrain_with<'a>(
        &mut self,
        pool: &mut VarPool,
        constraint: &[Clause],
        cubes: impl IntoIterator<Item = &'a Cube>,
    ) {
        self.reconstrain(pool, constraint);
        for c in cubes {
            self.block(c);
        }
    }
}
