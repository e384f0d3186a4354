//! The N-process Peterson mutual-exclusion protocol as a transition system.
//! Each process carries a program counter, a queue level and a free flag
//! (the sign bit of the level); the shared `last` array remembers who
//! entered each level most recently. The property: at most one process in
//! the critical section.
use crate::cnf::{self, Term};
use crate::ts::{Diff, TransitionSystemIF};
use crate::types::{Clause, Cube, Lit};
use crate::vars::{bits_for, StateBits, StateBool, Time, VarPool};

// program counter values
const IDLE: u64 = 0;
const BOUNDCHECK: u64 = 1;
const SETLAST: u64 = 2;
const AWAIT: u64 = 3;
const CRITICAL: u64 = 4;

/// An optional bound on scheduling: who moved last, and how often the
/// scheduler has changed its mind.
struct SwitchCounter {
    bound: u32,
    owner: StateBits,
    switches: StateBits,
}

pub struct PetersonTs {
    n_max: u32,
    procs: u32,
    pc: Vec<StateBits>,
    level: Vec<StateBits>,
    free: Vec<StateBool>,
    last: Vec<StateBits>,
    switching: Option<SwitchCounter>,
    faulty_setlast: bool,

    initial: Cube,
    transition: Vec<Clause>,
    constraint: Vec<Clause>,
    property: Vec<Clause>,
    bad_defs: Vec<Clause>,
    bad_cur: Vec<Lit>,
    bad_next: Vec<Lit>,
}

impl PetersonTs {
    pub fn new(
        pool: &mut VarPool,
        procs: u32,
        n_max: u32,
        max_switches: Option<u32>,
    ) -> PetersonTs {
        Self::build(pool, procs, n_max, max_switches, false)
    }

    /// A deliberately broken variant that skips the `last` write in the
    /// set-last step; it admits runs with two processes in the critical
    /// section and exercises counter-example extraction.
    pub fn faulty(
        pool: &mut VarPool,
        procs: u32,
        n_max: u32,
        max_switches: Option<u32>,
    ) -> PetersonTs {
        Self::build(pool, procs, n_max, max_switches, true)
    }

    fn build(
        pool: &mut VarPool,
        procs: u32,
        n_max: u32,
        max_switches: Option<u32>,
        faulty_setlast: bool,
    ) -> PetersonTs {
        assert!(procs >= 1 && procs <= n_max);
        let n = n_max as usize;
        let pc_bits = bits_for(CRITICAL);
        let level_bits = bits_for((n_max - 1) as u64);

        let pc: Vec<StateBits> = (0..n)
            .map(|i| pool.state_bits(&format!("pc{}", i), pc_bits))
            .collect();
        let level: Vec<StateBits> = (0..n)
            .map(|i| pool.state_bits(&format!("level{}", i), level_bits))
            .collect();
        let free: Vec<StateBool> = (0..n)
            .map(|i| pool.state_bool(&format!("free{}", i)))
            .collect();
        let last: Vec<StateBits> = (0..n.saturating_sub(1))
            .map(|i| pool.state_bits(&format!("last{}", i), level_bits))
            .collect();
        let switching = max_switches.map(|bound| SwitchCounter {
            bound,
            owner: pool.state_bits_holding("owner", (n_max - 1) as u64),
            switches: pool.state_bits_holding("switches", bound as u64 + 1),
        });

        let mut init_lits: Vec<Lit> = Vec::new();
        for i in 0..n {
            init_lits.extend(pc[i].cube(IDLE, Time::Curr));
            init_lits.extend(level[i].cube(0, Time::Curr));
            init_lits.push(free[i].curr());
        }
        for l in &last {
            init_lits.extend(l.cube(0, Time::Curr));
        }
        if let Some(sw) = &switching {
            init_lits.extend(sw.owner.cube(0, Time::Curr));
            init_lits.extend(sw.switches.cube(0, Time::Curr));
        }

        let mut ts = PetersonTs {
            n_max,
            procs,
            pc,
            level,
            free,
            last,
            switching,
            faulty_setlast,
            initial: Cube::from_lits(init_lits),
            transition: Vec::new(),
            constraint: Vec::new(),
            property: Vec::new(),
            bad_defs: Vec::new(),
            bad_cur: Vec::new(),
            bad_next: Vec::new(),
        };
        ts.load_property(pool);
        ts.load_constraint(pool);
        ts
    }

    /// Process `i` holds the lock.
    fn in_critical(&self, i: usize, t: Time) -> Term {
        Term::and(vec![
            self.pc[i].equals(CRITICAL, t),
            Term::Lit(!self.free[i].at(t)),
            self.level[i].equals((self.n_max - 1) as u64, t),
        ])
    }

    fn load_property(&mut self, pool: &mut VarPool) {
        let n = self.n_max as usize;
        let crit_terms: Vec<(Term, Term)> = (0..n)
            .map(|i| (self.in_critical(i, Time::Curr), self.in_critical(i, Time::Next)))
            .collect();
        let mut crit_cur = Vec::with_capacity(n);
        let mut crit_next = Vec::with_capacity(n);
        for (cur, next) in &crit_terms {
            crit_cur.push(cnf::define(cur, pool, &mut self.bad_defs));
            crit_next.push(cnf::define(next, pool, &mut self.bad_defs));
        }

        // P: pairwise at most one holder
        for i in 0..n {
            for j in i + 1..n {
                self.property
                    .push(Clause::from_lits(vec![!crit_cur[i], !crit_cur[j]]));
            }
        }

        // ¬P: some pair holds the lock together
        let two_of = |crit: &[Lit]| {
            let mut pairs = Vec::new();
            for i in 0..n {
                for j in i + 1..n {
                    pairs.push(Term::and(vec![Term::Lit(crit[i]), Term::Lit(crit[j])]));
                }
            }
            Term::or(pairs)
        };
        let bad_cur = cnf::define(&two_of(&crit_cur), pool, &mut self.bad_defs);
        let bad_next = cnf::define(&two_of(&crit_next), pool, &mut self.bad_defs);
        self.bad_cur = vec![bad_cur];
        self.bad_next = vec![bad_next];
    }

    /// The transition disjunction lives in the constraint region, so that
    /// changing the active-process count swaps it like any constraint.
    fn load_constraint(&mut self, pool: &mut VarPool) {
        let mut moves = Vec::new();
        for i in 0..self.procs as usize {
            moves.push(self.tag_move(i, self.t_start(i)));
            moves.push(self.tag_move(i, self.t_boundcheck(i)));
            moves.push(self.tag_move(i, self.t_setlast(i)));
            moves.push(self.tag_move(i, self.t_await(i)));
            moves.push(self.tag_move(i, self.t_release(i)));
        }
        let mut out = Vec::new();
        cnf::assert_term(&Term::or(moves), pool, &mut out);
        if let Some(sw) = &self.switching {
            cnf::assert_term(
                &sw.switches.less_const(sw.bound as u64 + 1, Time::Curr),
                pool,
                &mut out,
            );
            cnf::assert_term(
                &sw.switches.less_const(sw.bound as u64 + 1, Time::Next),
                pool,
                &mut out,
            );
        }
        self.constraint = out;
    }

    /// Under a switch bound, every move records its owner and counts a
    /// switch when the owner changes.
    fn tag_move(&self, i: usize, move_term: Term) -> Term {
        match &self.switching {
            None => move_term,
            Some(sw) => Term::and(vec![
                move_term,
                sw.owner.equals(i as u64, Time::Next),
                Term::ite(
                    sw.owner.equals(i as u64, Time::Curr),
                    sw.switches.unchanged(),
                    sw.switches.incremented(),
                ),
            ]),
        }
    }

    fn stays_pc_except(&self, i: usize) -> Term {
        Term::and(
            (0..self.n_max as usize)
                .filter(|k| *k != i)
                .map(|k| self.pc[k].unchanged())
                .collect(),
        )
    }

    fn stays_level_except(&self, i: usize) -> Term {
        Term::and(
            (0..self.n_max as usize)
                .filter(|k| *k != i)
                .map(|k| self.level[k].unchanged())
                .collect(),
        )
    }

    fn stays_free_except(&self, i: usize) -> Term {
        Term::and(
            (0..self.n_max as usize)
                .filter(|k| *k != i)
                .map(|k| self.free[k].unchanged())
                .collect(),
        )
    }

    fn stays_level(&self) -> Term {
        self.stays_level_except(self.n_max as usize)
    }

    fn stays_free(&self) -> Term {
        self.stays_free_except(self.n_max as usize)
    }

    fn stays_last(&self) -> Term {
        Term::and(self.last.iter().map(|l| l.unchanged()).collect())
    }

    /// idle → boundcheck: enter the queue at level 0.
    fn t_start(&self, i: usize) -> Term {
        Term::and(vec![
            self.pc[i].equals(IDLE, Time::Curr),
            self.pc[i].equals(BOUNDCHECK, Time::Next),
            Term::Lit(self.free[i].curr()),
            Term::Lit(!self.free[i].next()),
            self.level[i].equals(0, Time::Next),
            self.stays_pc_except(i),
            self.stays_level_except(i),
            self.stays_free_except(i),
            self.stays_last(),
        ])
    }

    /// boundcheck: climb further, or the queue is exhausted and the lock
    /// is ours.
    fn t_boundcheck(&self, i: usize) -> Term {
        Term::and(vec![
            self.pc[i].equals(BOUNDCHECK, Time::Curr),
            Term::ite(
                self.level[i].less_const((self.n_max - 1) as u64, Time::Curr),
                self.pc[i].equals(SETLAST, Time::Next),
                self.pc[i].equals(CRITICAL, Time::Next),
            ),
            self.stays_pc_except(i),
            self.stays_level(),
            self.stays_free(),
            self.stays_last(),
        ])
    }

    /// set last: announce ourselves as the latest arrival on our level.
    fn t_setlast(&self, i: usize) -> Term {
        let mut conj = vec![
            self.pc[i].equals(SETLAST, Time::Curr),
            self.pc[i].equals(AWAIT, Time::Next),
        ];
        for x in 0..self.last.len() {
            let write = if self.faulty_setlast {
                self.last[x].unchanged()
            } else {
                Term::ite(
                    self.level[i].equals(x as u64, Time::Curr),
                    self.last[x].equals(i as u64, Time::Next),
                    self.last[x].unchanged(),
                )
            };
            conj.push(write);
        }
        conj.push(self.stays_pc_except(i));
        conj.push(self.stays_level());
        conj.push(self.stays_free());
        Term::and(conj)
    }

    /// await: spin while we are the latest arrival and someone else is at
    /// our level or above, otherwise climb one level.
    fn t_await(&self, i: usize) -> Term {
        let n = self.n_max;

        let mut we_are_last = Vec::new();
        for x in 0..self.last.len() {
            we_are_last.push(Term::implies(
                self.level[i].equals(x as u64, Time::Curr),
                self.last[x].equals(i as u64, Time::Curr),
            ));
        }
        let mut any_higher = Vec::new();
        for k in 0..n as usize {
            if k == i {
                continue;
            }
            // free acts as a sign bit: a free process sits at level -1
            any_higher.push(Term::and(vec![
                Term::Lit(!self.free[k].curr()),
                Term::or(vec![
                    Term::Lit(self.free[i].curr()),
                    Term::not(self.level[k].less_bits(&self.level[i], Time::Curr)),
                ]),
            ]));
        }
        let blocked = Term::and(vec![Term::and(we_are_last), Term::or(any_higher)]);

        let wait = Term::and(vec![
            self.pc[i].equals(AWAIT, Time::Next),
            self.level[i].unchanged(),
        ]);
        let mut climb = vec![self.pc[i].equals(BOUNDCHECK, Time::Next)];
        for x in 0..(n - 1) as u64 {
            climb.push(Term::implies(
                self.level[i].equals(x, Time::Curr),
                self.level[i].equals(x + 1, Time::Next),
            ));
        }
        // level N-1 never waits here, but frame it all the same
        climb.push(Term::implies(
            self.level[i].equals((n - 1) as u64, Time::Curr),
            self.level[i].equals((n - 1) as u64, Time::Next),
        ));

        Term::and(vec![
            self.pc[i].equals(AWAIT, Time::Curr),
            Term::ite(blocked, wait, Term::and(climb)),
            self.stays_pc_except(i),
            self.stays_level_except(i),
            self.stays_free(),
            self.stays_last(),
        ])
    }

    /// critical → idle: release the lock.
    fn t_release(&self, i: usize) -> Term {
        Term::and(vec![
            self.pc[i].equals(CRITICAL, Time::Curr),
            self.level[i].equals((self.n_max - 1) as u64, Time::Curr),
            self.pc[i].equals(IDLE, Time::Next),
            self.level[i].equals(0, Time::Next),
            Term::Lit(!self.free[i].curr()),
            Term::Lit(self.free[i].next()),
            self.stays_pc_except(i),
            self.stays_level_except(i),
            self.stays_free_except(i),
            self.stays_last(),
        ])
    }

    pub fn n_processes(&self) -> u32 {
        self.procs
    }

    pub fn max_processes(&self) -> u32 {
        self.n_max
    }

    /// Decode a witness cube into per-process values.
    pub fn extract_state(&self, cube: &Cube, t: Time) -> PetersonState {
        let n = self.n_max as usize;
        PetersonState {
            pc: (0..n).map(|i| self.pc[i].extract(cube, t)).collect(),
            level: (0..n).map(|i| self.level[i].extract(cube, t)).collect(),
            free: (0..n)
                .map(|i| cube.value_of(self.free[i].at(t).var()).unwrap_or(false))
                .collect(),
            last: self.last.iter().map(|l| l.extract(cube, t)).collect(),
        }
    }
}

impl TransitionSystemIF for PetersonTs {
    fn name(&self) -> &str {
        "peterson"
    }

    fn initial(&self) -> &Cube {
        &self.initial
    }

    fn transition(&self) -> &[Clause] {
        &self.transition
    }

    fn constraint(&self) -> &[Clause] {
        &self.constraint
    }

    fn property(&self) -> &[Clause] {
        &self.property
    }

    fn bad_defs(&self) -> &[Clause] {
        &self.bad_defs
    }

    fn bad_current(&self) -> &[Lit] {
        &self.bad_cur
    }

    fn bad_next(&self) -> &[Lit] {
        &self.bad_next
    }

    fn constrain(&mut self, pool: &mut VarPool, value: u32) -> Diff {
        assert!(value >= 1 && value <= self.n_max);
        let diff = match self.procs {
            old if old == value => Diff::None,
            old if value < old => Diff::Tightened,
            _ => Diff::Loosened,
        };
        self.procs = value;
        self.load_constraint(pool);
        diff
    }

    fn constraint_num(&self) -> u32 {
        self.procs
    }

    fn constraint_str(&self) -> String {
        format!("{} active processes, out of {} max", self.procs, self.n_max)
    }

    fn constraint_min(&self) -> u32 {
        1
    }

    fn constraint_max(&self) -> u32 {
        self.n_max
    }

    fn describe_state(&self, _pool: &VarPool, cube: &Cube) -> String {
        self.extract_state(cube, Time::Curr).to_string()
    }

    fn show(&self, pool: &VarPool) -> String {
        let switches = match &self.switching {
            Some(sw) => format!(", at most {} context switches", sw.bound),
            None => String::new(),
        };
        format!(
            "peterson: {}{}\n{} constraint clauses, {} variables",
            self.constraint_str(),
            switches,
            self.constraint.len(),
            pool.n_vars()
        )
    }
}

/// A decoded protocol state. A free process is displayed at level -1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PetersonState {
    pub pc: Vec<u64>,
    pub level: Vec<u64>,
    pub free: Vec<bool>,
    pub last: Vec<u64>,
}

impl std::fmt::Display for PetersonState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let levels: Vec<String> = self
            .level
            .iter()
            .zip(&self.free)
            .map(|(l, free)| {
                if *free {
                    "-1".to_string()
                } else {
                    l.to_string()
                }
            })
            .collect();
        let pcs: Vec<String> = self.pc.iter().map(u64::to_string).collect();
        let lasts: Vec<String> = self.last.iter().map(u64::to_string).collect();
        write!(
            f,
            "pc [{}] level [{}] last [{}]",
            pcs.join(", "),
            levels.join(", "),
            lasts.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Solver;

    fn two_procs() -> (VarPool, PetersonTs) {
        let mut pool = VarPool::new();
        let ts = PetersonTs::new(&mut pool, 2, 2, None);
        (pool, ts)
    }

    fn step_solver(pool: &mut VarPool, ts: &PetersonTs) -> Solver {
        let mut base = ts.bad_defs().to_vec();
        base.extend_from_slice(ts.transition());
        Solver::new(pool, 0, &base, ts.constraint())
    }

    /// Full current-state cube: proc 0 awaiting at level 0, proc 1 idle.
    fn awaiting_state(ts: &PetersonTs) -> Vec<Lit> {
        let mut lits = ts.pc[0].cube(AWAIT, Time::Curr);
        lits.extend(ts.pc[1].cube(IDLE, Time::Curr));
        lits.extend(ts.level[0].cube(0, Time::Curr));
        lits.extend(ts.level[1].cube(0, Time::Curr));
        lits.push(!ts.free[0].curr());
        lits.push(ts.free[1].curr());
        lits.extend(ts.last[0].cube(0, Time::Curr));
        lits
    }

    #[test]
    fn initial_state_decodes_to_all_idle() {
        let (_pool, ts) = two_procs();
        let s = ts.extract_state(ts.initial(), Time::Curr);
        assert_eq!(s.pc, vec![0, 0]);
        assert_eq!(s.level, vec![0, 0]);
        assert_eq!(s.free, vec![true, true]);
        assert_eq!(s.last, vec![0]);
    }

    #[test]
    fn await_step_leaves_other_levels_alone() {
        let (mut pool, ts) = two_procs();
        let mut solver = step_solver(&mut pool, &ts);
        let state = awaiting_state(&ts);

        // forcing pc0' = 1 singles out the await-climb move of process 0
        let mut move0 = state.clone();
        move0.extend(ts.pc[0].cube(BOUNDCHECK, Time::Next));
        assert!(solver.check(&move0).unwrap());

        // ... under which level1 may not change
        let mut frame_broken = move0.clone();
        frame_broken.extend(ts.level[1].cube(1, Time::Next));
        assert!(!solver.check(&frame_broken).unwrap());

        // ... while level0 must have climbed to 1
        let mut climbed = move0;
        climbed.extend(ts.level[0].cube(1, Time::Next));
        assert!(solver.check(&climbed).unwrap());
    }

    #[test]
    fn awaiting_alone_is_never_blocked() {
        let (mut pool, ts) = two_procs();
        let mut solver = step_solver(&mut pool, &ts);
        // with proc 1 free, the spin branch is unsatisfiable
        let mut spin = awaiting_state(&ts);
        spin.extend(ts.pc[0].cube(AWAIT, Time::Next));
        spin.extend(ts.pc[1].cube(IDLE, Time::Next));
        assert!(!solver.check(&spin).unwrap());
    }

    #[test]
    fn property_rejects_two_holders() {
        let (mut pool, ts) = two_procs();
        let mut base = ts.bad_defs().to_vec();
        base.extend_from_slice(ts.property());
        let mut solver = Solver::new(&mut pool, 0, &base, &[]);

        let holder = |ts: &PetersonTs, i: usize| {
            let mut lits = ts.pc[i].cube(CRITICAL, Time::Curr);
            lits.push(!ts.free[i].curr());
            lits.extend(ts.level[i].cube(1, Time::Curr));
            lits
        };
        let mut both = holder(&ts, 0);
        both.extend(holder(&ts, 1));
        assert!(!solver.check(&both).unwrap());
        assert!(solver.check(&holder(&ts, 0)).unwrap());
    }

    #[test]
    fn bad_literal_means_at_least_two_holders() {
        let (mut pool, ts) = two_procs();
        let mut solver = Solver::new(&mut pool, 0, ts.bad_defs(), &[]);
        // bad plus "proc 1 idle" leaves no second holder
        let mut lits = ts.bad_current().to_vec();
        lits.extend(ts.pc[1].cube(IDLE, Time::Curr));
        assert!(!solver.check(&lits).unwrap());
        assert!(solver.check(ts.bad_current()).unwrap());
    }

    #[test]
    fn switch_counter_steps_on_owner_change() {
        let mut pool = VarPool::new();
        let ts = PetersonTs::new(&mut pool, 2, 2, Some(1));
        let mut solver = step_solver(&mut pool, &ts);
        let sw = ts.switching.as_ref().unwrap();

        // owner was 1; process 0 starting costs a switch
        let mut lits = ts.initial().lits().to_vec();
        lits.retain(|l| !sw.owner.bit(0).curr().var().eq(&l.var()));
        lits.extend(sw.owner.cube(1, Time::Curr));
        lits.extend(ts.pc[0].cube(BOUNDCHECK, Time::Next));
        let mut counted = lits.clone();
        counted.extend(sw.switches.cube(1, Time::Next));
        assert!(solver.check(&counted).unwrap());
        let mut uncounted = lits;
        uncounted.extend(sw.switches.cube(0, Time::Next));
        assert!(!solver.check(&uncounted).unwrap());
    }
}
