//! The frame sequence F₀, F₁, …, F_frontier. F₀ owns a solver over the
//! initial state; every later frame is either a solver of its own (fat
//! encoding) or a slice of one shared solver selected by per-level
//! activation literals (delta encoding).
use crate::logger::Logger;
use crate::solver::Solver;
use crate::ts::TransitionSystemIF;
use crate::types::{Clause, Cube, CubeSet, Lit, Result};
use crate::vars::VarPool;
use std::time::Instant;

/// Cubes blocked with a frame as their home, plus the frame's own solver
/// in the fat encoding.
pub struct Frame {
    cubes: CubeSet,
    solver: Option<Solver>,
}

impl Frame {
    fn new(solver: Option<Solver>) -> Frame {
        Frame {
            cubes: CubeSet::new(),
            solver,
        }
    }

    pub fn cubes(&self) -> &CubeSet {
        &self.cubes
    }

    /// Drop every cube strictly weaker than `cube`; returns how many went.
    fn remove_subsumed(&mut self, cube: &Cube) -> usize {
        let before = self.cubes.len();
        self.cubes.retain(|c| !cube.subsumes(c));
        before - self.cubes.len()
    }

    fn insert(&mut self, cube: Cube) -> bool {
        self.cubes.insert(cube)
    }
}

pub struct Frames {
    delta: bool,
    seed: u64,
    frames: Vec<Frame>,
    acts: Vec<Lit>,
    delta_solver: Option<Solver>,
    init_solver: Solver,
}

impl Frames {
    pub fn new(
        pool: &mut VarPool,
        ts: &dyn TransitionSystemIF,
        delta: bool,
        seed: u64,
    ) -> Frames {
        let init_base: Vec<Clause> = ts
            .initial()
            .iter()
            .map(|l| Clause::unit(*l))
            .chain(ts.bad_defs().iter().cloned())
            .collect();
        let init_solver = Solver::new(pool, seed, &init_base, &[]);

        let delta_solver =
            delta.then(|| Solver::new(pool, seed, &Self::main_base(ts), ts.constraint()));

        let mut frames = Frames {
            delta,
            seed,
            frames: Vec::new(),
            acts: vec![pool.aux("act")],
            delta_solver,
            init_solver,
        };
        let f0 = Solver::new(pool, seed, &Self::frame0_base(ts), ts.constraint());
        frames.frames.push(Frame::new(Some(f0)));
        frames
    }

    /// Assertions shared by every frame above F₀: P, T and the ¬P gates.
    fn main_base(ts: &dyn TransitionSystemIF) -> Vec<Clause> {
        ts.property()
            .iter()
            .chain(ts.transition())
            .chain(ts.bad_defs())
            .cloned()
            .collect()
    }

    fn frame0_base(ts: &dyn TransitionSystemIF) -> Vec<Clause> {
        ts.initial()
            .iter()
            .map(|l| Clause::unit(*l))
            .chain(ts.transition().iter().cloned())
            .chain(ts.bad_defs().iter().cloned())
            .collect()
    }

    pub fn frontier(&self) -> usize {
        self.frames.len() - 1
    }

    pub fn frame(&self, i: usize) -> &Frame {
        &self.frames[i]
    }

    /// All cubes blocked at level `i`, across home frames in delta mode.
    pub fn blocked_at(&self, i: usize) -> CubeSet {
        if self.delta {
            self.frames[i..]
                .iter()
                .flat_map(|f| f.cubes.iter().cloned())
                .collect()
        } else {
            self.frames[i].cubes.clone()
        }
    }

    /// Append an empty frame; in delta mode this mints its activation
    /// literal, in fat mode its solver.
    pub fn extend(&mut self, pool: &mut VarPool, ts: &dyn TransitionSystemIF) {
        if self.delta {
            self.acts.push(pool.aux("act"));
            self.frames.push(Frame::new(None));
        } else {
            let solver = Solver::new(pool, self.seed, &Self::main_base(ts), ts.constraint());
            self.frames.push(Frame::new(Some(solver)));
        }
    }

    /// Block `cube` at `level` and everything below, dropping strictly
    /// weaker cubes first.
    pub fn block(&mut self, log: &mut Logger, cube: &Cube, level: usize) {
        let level = level.min(self.frontier());
        log.tabbed(format!("block at {}: {:?}", level, cube));
        for i in 1..=level {
            let gone = self.frames[i].remove_subsumed(cube);
            log.stats.subsumed_cubes.add(i, gone);
        }
        if self.delta {
            if self.frames[level].insert(cube.clone()) {
                let act = self.acts[level];
                self.delta_solver
                    .as_mut()
                    .expect("delta mode without its solver")
                    .block_gated(cube, act);
            }
        } else {
            for i in 1..=level {
                if self.frames[i].insert(cube.clone()) {
                    self.frames[i]
                        .solver
                        .as_mut()
                        .expect("fat frame without a solver")
                        .block(cube);
                }
            }
        }
    }

    fn solver_for(&mut self, frame: usize) -> &mut Solver {
        if self.delta && frame > 0 {
            self.delta_solver.as_mut().expect("delta solver missing")
        } else {
            self.frames[frame]
                .solver
                .as_mut()
                .expect("frame without a solver")
        }
    }

    fn solver_ref(&self, frame: usize) -> &Solver {
        if self.delta && frame > 0 {
            self.delta_solver.as_ref().expect("delta solver missing")
        } else {
            self.frames[frame]
                .solver
                .as_ref()
                .expect("frame without a solver")
        }
    }

    /// Satisfiability at `frame`; delta queries enable every level from
    /// `frame` up through their activation literals.
    pub fn sat(&mut self, log: &mut Logger, frame: usize, assumptions: &[Lit]) -> Result<bool> {
        let mut assume = assumptions.to_vec();
        if self.delta && frame > 0 {
            assume.extend_from_slice(&self.acts[frame..=self.frontier()]);
        }
        let frontier = self.frontier();
        let start = Instant::now();
        let result = self
            .solver_for(frame)
            .check(&assume)
            .map_err(|e| e.at_level(frame));
        log.stats
            .solver_calls
            .add_timed(frontier, start.elapsed().as_secs_f64());
        result
    }

    pub fn witness_current(&self, pool: &VarPool, frame: usize) -> Cube {
        self.solver_ref(frame).witness_current(pool)
    }

    pub fn witness_next(&self, pool: &VarPool, frame: usize) -> Cube {
        self.solver_ref(frame).witness_next(pool)
    }

    /// Unsat core of the last query at `frame`, kept to next-state atoms
    /// and mapped back to the current copies.
    pub fn core_cube(&self, pool: &VarPool, frame: usize) -> Cube {
        Cube::from_lits(
            self.solver_ref(frame)
                .unsat_core()
                .into_iter()
                .filter(|l| pool.is_next(l.var()))
                .map(|l| pool.unprime(l))
                .collect(),
        )
    }

    /// Is there a transition `F_frame ∧ T → cube'`?
    pub fn transition_from_to(
        &mut self,
        log: &mut Logger,
        pool: &mut VarPool,
        frame: usize,
        cube: &Cube,
    ) -> Result<bool> {
        let assumptions = pool.prime_cube(cube);
        self.sat(log, frame, &assumptions)
    }

    /// Consecution with the cube excluded on the near side:
    /// sat of `F_frame ∧ ¬cube ∧ T ∧ cube'`. The query clause is gated by
    /// a one-shot activation literal.
    pub fn trans_source_sat(
        &mut self,
        log: &mut Logger,
        pool: &mut VarPool,
        frame: usize,
        cube: &Cube,
    ) -> Result<bool> {
        let act = pool.aux("qry");
        self.solver_for(frame).block_gated(cube, act);
        let mut assumptions = pool.prime_cube(cube);
        assumptions.push(act);
        self.sat(log, frame, &assumptions)
    }

    /// `¬cube` holds one step after `F_frame ∧ ¬cube`.
    pub fn inductive_rel_to(
        &mut self,
        log: &mut Logger,
        pool: &mut VarPool,
        cube: &Cube,
        frame: usize,
    ) -> Result<bool> {
        Ok(!self.trans_source_sat(log, pool, frame, cube)?)
    }

    /// Does `cube` admit an initial state?
    pub fn intersects_initial(&mut self, cube: &Cube) -> Result<bool> {
        self.init_solver.check(cube.lits())
    }

    /// Push every cube whose negation is inductive at its level one frame
    /// up; report the first level that ends up equal to its successor.
    pub fn propagate(
        &mut self,
        log: &mut Logger,
        pool: &mut VarPool,
        level: usize,
    ) -> Result<Option<usize>> {
        let start = Instant::now();
        let mut invariant = None;
        for i in 1..=level.min(self.frontier() - 1) {
            let cubes: Vec<Cube> = self.frames[i].cubes.iter().cloned().collect();
            for cube in cubes {
                log.stats.propagation_level.add(i, 1);
                if !self.transition_from_to(log, pool, i, &cube)? {
                    self.push_forward(i, &cube);
                }
            }
            if self.frames_equal(i) {
                invariant = Some(i);
                break;
            }
        }
        log.stats
            .propagation_it
            .add_timed(level, start.elapsed().as_secs_f64());
        Ok(invariant)
    }

    fn push_forward(&mut self, i: usize, cube: &Cube) {
        if self.delta {
            self.frames[i].cubes.remove(cube);
            if self.frames[i + 1].insert(cube.clone()) {
                let act = self.acts[i + 1];
                self.delta_solver
                    .as_mut()
                    .expect("delta solver missing")
                    .block_gated(cube, act);
            }
        } else if self.frames[i + 1].insert(cube.clone()) {
            self.frames[i + 1]
                .solver
                .as_mut()
                .expect("fat frame without a solver")
                .block(cube);
        }
    }

    fn frames_equal(&self, i: usize) -> bool {
        if self.delta {
            self.frames[i].cubes.is_empty()
        } else {
            self.frames[i].cubes == self.frames[i + 1].cubes
        }
    }

    /// Full reset to {F₀} under the transition system's current formulas.
    pub fn reset(&mut self, pool: &mut VarPool, ts: &dyn TransitionSystemIF) {
        *self = Frames::new(pool, ts, self.delta, self.seed);
    }

    /// Reset to {F₀, F₁}, keeping every learned cube that still passes
    /// consecution at F₀ under the (loosened) constraint.
    pub fn reset_to_f1(
        &mut self,
        log: &mut Logger,
        pool: &mut VarPool,
        ts: &dyn TransitionSystemIF,
    ) -> Result<usize> {
        let carried: CubeSet = self
            .frames
            .iter()
            .skip(1)
            .flat_map(|f| f.cubes.iter().cloned())
            .collect();
        self.reset(pool, ts);
        self.extend(pool, ts);

        let mut kept = 0;
        for cube in carried {
            if !self.transition_from_to(log, pool, 0, &cube)? {
                self.block(log, &cube, 1);
                kept += 1;
            }
        }
        Ok(kept)
    }

    /// Swap the constraint region under every solver while keeping all
    /// frames and blocked cubes (sound when the constraint tightened).
    pub fn reconstrain(&mut self, pool: &mut VarPool, ts: &dyn TransitionSystemIF) {
        if let Some(f0) = self.frames[0].solver.as_mut() {
            f0.reconstrain(pool, ts.constraint());
        }
        if self.delta {
            // delta clauses stay gated by their level literals
            self.delta_solver
                .as_mut()
                .expect("delta solver missing")
                .reconstrain(pool, ts.constraint());
        } else {
            for f in self.frames.iter_mut().skip(1) {
                f.solver
                    .as_mut()
                    .expect("fat frame without a solver")
                    .reconstrain_with(pool, ts.constraint(), f.cubes.iter());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag;
    use crate::logger::OutLvl;
    use crate::pebbling::PebblingTs;
    use crate::ts::TransitionSystemIF as _;

    fn setup(delta: bool) -> (VarPool, PebblingTs, Frames, Logger) {
        let mut pool = VarPool::new();
        let mut ts = PebblingTs::new(&mut pool, dag::chain(&["a", "b", "c"]), false);
        ts.constrain(&mut pool, 3);
        let frames = Frames::new(&mut pool, &ts, delta, 0);
        let log = Logger::new(OutLvl::Silent, None).unwrap();
        (pool, ts, frames, log)
    }

    fn cube_of(pool: &VarPool, names: &[(&str, bool)]) -> Cube {
        let lits = names
            .iter()
            .map(|(n, sign)| {
                let v = (0..pool.n_vars())
                    .map(varisat::Var::from_index)
                    .find(|v| pool.name(*v) == *n)
                    .unwrap();
                varisat::Lit::from_var(v, !sign)
            })
            .collect();
        Cube::from_lits(lits)
    }

    #[test]
    fn blocking_removes_strictly_weaker_cubes() {
        for delta in [false, true] {
            let (mut pool, ts, mut frames, mut log) = setup(delta);
            frames.extend(&mut pool, &ts);
            frames.extend(&mut pool, &ts);

            let weak = cube_of(&pool, &[("a", true), ("b", true)]);
            let strong = cube_of(&pool, &[("a", true)]);
            frames.block(&mut log, &weak, 2);
            frames.block(&mut log, &strong, 2);

            let blocked = frames.blocked_at(2);
            assert!(blocked.contains(&strong));
            assert!(!blocked.contains(&weak));
            assert_eq!(log.stats.subsumed_cubes.total_count, 2 - delta as usize);
        }
    }

    #[test]
    fn monotone_blocking_reaches_lower_frames() {
        for delta in [false, true] {
            let (mut pool, ts, mut frames, mut log) = setup(delta);
            frames.extend(&mut pool, &ts);
            frames.extend(&mut pool, &ts);

            let cube = cube_of(&pool, &[("a", true), ("b", true), ("c", true)]);
            frames.block(&mut log, &cube, 2);
            // the blocked state has no satisfying assignment at 1 or 2
            for frame in [1usize, 2] {
                assert!(!frames.sat(&mut log, frame, cube.lits()).unwrap());
            }
        }
    }

    #[test]
    fn propagate_pushes_forward_inductive_cubes() {
        for delta in [false, true] {
            let (mut pool, mut ts, _, _) = setup(delta);
            ts.constrain(&mut pool, 1);
            let mut frames = Frames::new(&mut pool, &ts, delta, 0);
            let mut log = Logger::new(OutLvl::Silent, None).unwrap();
            frames.extend(&mut pool, &ts);
            frames.extend(&mut pool, &ts);

            // two pebbles next is outside the bound, so no state reaches this
            let cube = cube_of(&pool, &[("a", true), ("b", true), ("c", false)]);
            frames.block(&mut log, &cube, 1);
            let inv = frames.propagate(&mut log, &mut pool, 1).unwrap();
            assert_eq!(inv, Some(1));
            assert!(frames.blocked_at(2).contains(&cube));
        }
    }

    #[test]
    fn propagate_twice_is_idempotent() {
        for delta in [false, true] {
            let (mut pool, ts, mut frames, mut log) = setup(delta);
            frames.extend(&mut pool, &ts);
            frames.extend(&mut pool, &ts);

            // a full unreachable marking: b pebbled without its support
            let cube = cube_of(&pool, &[("a", false), ("b", true), ("c", true)]);
            frames.block(&mut log, &cube, 1);

            let first = frames.propagate(&mut log, &mut pool, 1).unwrap();
            let snapshot: Vec<CubeSet> = (0..=frames.frontier())
                .map(|i| frames.blocked_at(i))
                .collect();
            let second = frames.propagate(&mut log, &mut pool, 1).unwrap();
            let after: Vec<CubeSet> = (0..=frames.frontier())
                .map(|i| frames.blocked_at(i))
                .collect();
            assert_eq!(first, second);
            assert_eq!(snapshot, after);
        }
    }
}
