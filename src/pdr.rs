//! The property-directed reachability engine: initiation checks, the
//! obligation-driven backward search, and the strengthen/extend/propagate
//! loop. Generalization lives in `generalize`.
use crate::config::Context;
use crate::frames::Frames;
use crate::logger::Logger;
use crate::obligation::{Obligation, State};
use crate::result::{Outcome, PdrResult, Trace};
use crate::ts::TransitionSystemIF;
use crate::types::{Cube, Result};
use crate::vars::VarPool;
use min_max_heap::MinMaxHeap;
use std::rc::Rc;
use std::time::Instant;

pub struct Pdr<T: TransitionSystemIF> {
    pub(crate) ctx: Context,
    pub(crate) ts: T,
    pub(crate) frames: Frames,
    pub(crate) log: Logger,
}

impl<T: TransitionSystemIF> Pdr<T> {
    pub fn new(mut ctx: Context, ts: T, log: Logger) -> Pdr<T> {
        let frames = Frames::new(&mut ctx.vars, &ts, ctx.delta, ctx.seed);
        Pdr {
            ctx,
            ts,
            frames,
            log,
        }
    }

    pub fn ts(&self) -> &T {
        &self.ts
    }

    pub fn pool(&self) -> &VarPool {
        &self.ctx.vars
    }

    pub fn logger_mut(&mut self) -> &mut Logger {
        &mut self.log
    }

    /// One full run against the current constraint, continuing from
    /// whatever frames a previous run left behind.
    pub fn run(&mut self) -> Result<PdrResult> {
        let start = Instant::now();
        self.log
            .and_whisper(format!("PDR start: {}", self.ts.constraint_str()));

        let outcome = match self.init()? {
            Some(trace) => Outcome::Trace(trace),
            None => self.iterate()?,
        };

        let time = start.elapsed().as_secs_f64();
        self.log.stats.elapsed = time;
        match &outcome {
            Outcome::Invariant { level } => self
                .log
                .and_whisper(format!("invariant at F_{} ({:.3}s)", level, time)),
            Outcome::Trace(t) => self
                .log
                .and_whisper(format!("trace of length {} ({:.3}s)", t.length(), time)),
        }
        Ok(PdrResult {
            outcome,
            time,
            constraint: Some(self.ts.constraint_num()),
        })
    }

    /// The two base cases: a violation in the initial state itself, or one
    /// transition away from it. Run on every call, so a reused frame
    /// sequence is re-grounded after the constraint changed.
    fn init(&mut self) -> Result<Option<Trace>> {
        let bad_now = Cube::from_lits(self.ts.bad_current().to_vec());
        if self.frames.intersects_initial(&bad_now)? {
            self.log.and_whisper("I violates P");
            return Ok(Some(Trace::new(vec![self.ts.initial().clone()])));
        }

        let bad_next = self.ts.bad_next().to_vec();
        if self.frames.sat(&mut self.log, 0, &bad_next)? {
            self.log.and_whisper("I reaches ¬P in one step");
            let s0 = self.frames.witness_current(&self.ctx.vars, 0);
            let s1 = self.frames.witness_next(&self.ctx.vars, 0);
            return Ok(Some(Trace::new(vec![s0, s1])));
        }

        if self.frames.frontier() == 0 {
            self.frames.extend(&mut self.ctx.vars, &self.ts);
        }
        Ok(None)
    }

    /// Strengthen the frontier until no state in it reaches ¬P, then grow
    /// it and propagate; stop at a fixpoint or a completed trace.
    fn iterate(&mut self) -> Result<Outcome> {
        loop {
            let k = self.frames.frontier();
            self.log.show(format!("frame {}", k));
            log::trace!("==== frame {} ====", k);

            loop {
                let bad_next = self.ts.bad_next().to_vec();
                if !self.frames.sat(&mut self.log, k, &bad_next)? {
                    break;
                }
                let cti = self.frames.witness_current(&self.ctx.vars, k);
                let violation = self.frames.witness_next(&self.ctx.vars, k);
                self.log.stats.ctis.add(k, 1);
                self.log
                    .tabbed(format!("cti at {}: {}", k, self.ctx.vars.cube_str(&cti)));

                let state = State::preceding(cti, State::new(violation));
                if let Some(root) = self.block(Obligation::new(k, state, 0), k)? {
                    return Ok(Outcome::Trace(Trace::new(root.unroll())));
                }
            }

            self.frames.extend(&mut self.ctx.vars, &self.ts);
            if let Some(level) = self.frames.propagate(&mut self.log, &mut self.ctx.vars, k)? {
                return Ok(Outcome::Invariant { level });
            }
        }
    }

    /// Obligation-driven backward search. Returns the root of a completed
    /// counter-example chain, or `None` once every obligation is blocked.
    fn block(&mut self, first: Obligation, level: usize) -> Result<Option<Rc<State>>> {
        let mut queue: MinMaxHeap<Obligation> = MinMaxHeap::new();
        queue.push(first);

        while let Some(ob) = queue.pop_min() {
            let start = Instant::now();
            let n = ob.level;
            debug_assert!(n >= 1, "obligations live strictly above F_0");
            self.log.tabbed(format!(
                "obligation at {} depth {}: {}",
                n,
                ob.depth,
                self.ctx.vars.cube_str(&ob.state.cube)
            ));

            if self
                .frames
                .trans_source_sat(&mut self.log, &mut self.ctx.vars, n - 1, &ob.state.cube)?
            {
                // a predecessor exists in F_{n-1}
                let pred_cube = self.frames.witness_current(&self.ctx.vars, n - 1);
                let pred = State::preceding(pred_cube, ob.state.clone());
                if n == 1 || self.frames.intersects_initial(&pred.cube)? {
                    // reached the initial states: the chain is the trace
                    return Ok(Some(pred));
                }
                queue.push(Obligation::new(n - 1, pred, ob.depth + 1));
                queue.push(ob);
            } else {
                // no predecessor: generalize the reason and block it high
                let mut core = self.frames.core_cube(&self.ctx.vars, n - 1);
                self.repair_initiation(&ob.state.cube, &mut core)?;
                let j = self.highest_inductive(&core, n, level)?;
                let generalized = self.generalize(core, j)?;
                self.frames.block(&mut self.log, &generalized, j + 1);
                // the state is excluded up to F_{j+1} now; the next level
                // that can still contain it is j+2
                if j + 2 <= level {
                    queue.push(Obligation::new(j + 2, ob.state.clone(), ob.depth));
                }
            }
            self.log
                .stats
                .obligations_handled
                .add_timed(n, start.elapsed().as_secs_f64());
        }
        Ok(None)
    }

    /// Tighten the constraint in place, keeping all frames. Initiation is
    /// re-performed; if it or propagation alone already decides the new
    /// value, the result comes back without a search.
    pub fn constrain_reset(&mut self, value: u32) -> Result<Option<PdrResult>> {
        self.log.and_show(format!(
            "constrain {} -> {}",
            self.ts.constraint_str(),
            value
        ));
        self.ts.constrain(&mut self.ctx.vars, value);
        self.frames.reconstrain(&mut self.ctx.vars, &self.ts);

        if let Some(trace) = self.init()? {
            return Ok(Some(PdrResult {
                outcome: Outcome::Trace(trace),
                time: 0.0,
                constraint: Some(value),
            }));
        }
        if self.frames.frontier() < 2 {
            return Ok(None);
        }
        let up_to = self.frames.frontier() - 1;
        let closed = self
            .frames
            .propagate(&mut self.log, &mut self.ctx.vars, up_to)?;
        Ok(closed.map(|level| PdrResult::found_invariant(level).with_constraint(value)))
    }

    /// Loosen the constraint, dropping to {F₀, F₁} and revalidating the
    /// learned clauses against the new transition guard.
    pub fn relax_reset(&mut self, value: u32) -> Result<()> {
        self.log
            .and_show(format!("relax {} -> {}", self.ts.constraint_str(), value));
        self.ts.constrain(&mut self.ctx.vars, value);
        let kept = self
            .frames
            .reset_to_f1(&mut self.log, &mut self.ctx.vars, &self.ts)?;
        self.log.show(format!("carried {} clauses into F_1", kept));
        Ok(())
    }

    /// Rebuild from scratch at the given constraint value.
    pub fn basic_reset(&mut self, value: u32) {
        self.log.and_show(format!(
            "reset {} -> {}",
            self.ts.constraint_str(),
            value
        ));
        self.ts.constrain(&mut self.ctx.vars, value);
        self.frames.reset(&mut self.ctx.vars, &self.ts);
    }
}
