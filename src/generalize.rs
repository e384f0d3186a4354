//! Inductive generalization: find the highest frame a blocked cube holds
//! at, then shrink it by greedy literal dropping (MIC) with `down` as the
//! repair loop.
use crate::pdr::Pdr;
use crate::ts::TransitionSystemIF;
use crate::types::{Cube, Result};

impl<T: TransitionSystemIF> Pdr<T> {
    /// Largest `j ≤ max` with `¬cube` inductive relative to F_j. The caller
    /// guarantees induction relative to F_{from-1}.
    pub(crate) fn highest_inductive(
        &mut self,
        cube: &Cube,
        from: usize,
        max: usize,
    ) -> Result<usize> {
        debug_assert!(from >= 1);
        let mut highest = from - 1;
        for i in from..=max.min(self.frames.frontier()) {
            if self
                .frames
                .inductive_rel_to(&mut self.log, &mut self.ctx.vars, cube, i)?
            {
                highest = i;
            } else {
                break;
            }
        }
        self.log.tabbed(format!("highest inductive frame {}", highest));
        Ok(highest)
    }

    /// Minimal inductive cube: drop literals one at a time as long as
    /// `down` can restore induction. The retry budget belongs to this
    /// loop; when it runs out the current cube is taken as is.
    pub(crate) fn generalize(&mut self, cube: Cube, level: usize) -> Result<Cube> {
        let mut cube = cube;
        let mut idx = 0;
        let mut failed = 0;
        while idx < cube.len() {
            if failed >= self.ctx.mic_retries {
                self.log.stats.mic_limit_hits += 1;
                break;
            }
            self.log.stats.mic_attempts.add(level, 1);
            let candidate = cube.without(idx);
            match self.down(candidate, level)? {
                Some(shrunk) => {
                    cube = shrunk;
                    failed = 0;
                    // idx now points at the next literal of the new cube
                }
                None => {
                    idx += 1;
                    failed += 1;
                }
            }
        }
        self.log
            .tabbed(format!("generalized to {}", self.ctx.vars.cube_str(&cube)));
        Ok(cube)
    }

    /// Strengthen `cube` toward induction relative to F_level by
    /// intersecting it with counterexamples-to-consecution; fail as soon
    /// as it would cover an initial state.
    pub(crate) fn down(&mut self, mut cube: Cube, level: usize) -> Result<Option<Cube>> {
        loop {
            if self.frames.intersects_initial(&cube)? {
                return Ok(None);
            }
            if !self
                .frames
                .trans_source_sat(&mut self.log, &mut self.ctx.vars, level, &cube)?
            {
                return Ok(Some(cube));
            }
            let witness = self.frames.witness_current(&self.ctx.vars, level);
            let shrunk = cube.intersect(&witness);
            // the witness refutes the cube, so at least one literal goes
            debug_assert!(shrunk.len() < cube.len());
            if shrunk.len() == cube.len() {
                return Ok(None);
            }
            cube = shrunk;
        }
    }

    /// A blocked cube may never cover an initial state. If the unsat core
    /// dropped the literal that kept `state` away from I, restore one.
    pub(crate) fn repair_initiation(&mut self, state: &Cube, core: &mut Cube) -> Result<()> {
        if !self.frames.intersects_initial(core)? {
            return Ok(());
        }
        for l in state.iter() {
            if core.contains(*l) {
                continue;
            }
            if !self.frames.intersects_initial(&Cube::from_lits(vec![*l]))? {
                core.insert(*l);
                debug_assert!(!self.frames.intersects_initial(core)?);
                return Ok(());
            }
        }
        // no single literal separates the core from I; fall back to the
        // full state, which the search guarantees is I-disjoint
        *core = state.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Context;
    use crate::dag;
    use crate::logger::{Logger, OutLvl};
    use crate::pdr::Pdr;
    use crate::pebbling::PebblingTs;
    use crate::types::{Cube, Lit, Var};
    use crate::vars::VarPool;

    fn cube_of(pool: &VarPool, names: &[&str]) -> Cube {
        let lits = names
            .iter()
            .map(|n| {
                let v = (0..pool.n_vars())
                    .map(Var::from_index)
                    .find(|v| pool.name(*v) == *n)
                    .unwrap();
                Lit::from_var(v, false)
            })
            .collect();
        Cube::from_lits(lits)
    }

    #[test]
    fn minimization_shrinks_and_stays_inductive() {
        let mut ctx = Context::new(false, 0, 3);
        let mut ts = PebblingTs::new(&mut ctx.vars, dag::chain(&["a", "b", "c"]), false);
        use crate::ts::TransitionSystemIF as _;
        ts.constrain(&mut ctx.vars, 1);
        let log = Logger::new(OutLvl::Silent, None).unwrap();
        let mut pdr = Pdr::new(ctx, ts, log);
        pdr.frames.extend(&mut pdr.ctx.vars, &pdr.ts);

        // fully pebbled: far outside the one-pebble bound
        let state = cube_of(&pdr.ctx.vars, &["a", "b", "c"]);
        assert!(pdr
            .frames
            .inductive_rel_to(&mut pdr.log, &mut pdr.ctx.vars, &state, 1)
            .unwrap());

        let small = pdr.generalize(state.clone(), 1).unwrap();
        assert!(small.subsumes_eq(&state), "output must be a sub-cube");
        assert!(!small.is_empty());
        assert!(pdr
            .frames
            .inductive_rel_to(&mut pdr.log, &mut pdr.ctx.vars, &small, 1)
            .unwrap());
        assert!(!pdr.frames.intersects_initial(&small).unwrap());
    }
}
