//! Reversible pebbling on a DAG as a transition system: one boolean per
//! node, a pebble may flip only while the node's fan-in stays pebbled on
//! both sides of the step, and at most N pebbles may be on the graph.
use crate::cnf::{self, Term};
use crate::dag::Dag;
use crate::ts::{Diff, TransitionSystemIF};
use crate::types::{Clause, Cube, Lit};
use crate::vars::{StateBool, VarPool};

pub struct PebblingTs {
    dag: Dag,
    names: Vec<String>,
    nodes: Vec<StateBool>,
    initial: Cube,
    transition: Vec<Clause>,
    constraint: Vec<Clause>,
    property: Vec<Clause>,
    bad_cur: Vec<Lit>,
    bad_next: Vec<Lit>,
    pebbles: Option<u32>,
}

impl PebblingTs {
    /// Declare the node variables and build I, T and P. The cardinality
    /// constraint is installed separately through `constrain`.
    pub fn new(pool: &mut VarPool, dag: Dag, tseytin: bool) -> PebblingTs {
        let names: Vec<String> = dag.nodes().cloned().collect();
        let nodes: Vec<StateBool> = names.iter().map(|n| pool.state_bool(n)).collect();

        let initial = Cube::from_lits(nodes.iter().map(|n| !n.curr()).collect());

        // target marking: outputs pebbled, everything else clear
        let bad_cur: Vec<Lit> = names
            .iter()
            .zip(&nodes)
            .map(|(n, v)| if dag.is_output(n) { v.curr() } else { !v.curr() })
            .collect();
        let bad_next: Vec<Lit> = bad_cur.iter().map(|l| pool.prime(*l)).collect();

        // P: the target marking has not been reached
        let property = vec![Clause::from_lits(bad_cur.iter().map(|l| !*l).collect())];

        let mut ts = PebblingTs {
            dag,
            names,
            nodes,
            initial,
            transition: Vec::new(),
            constraint: Vec::new(),
            property,
            bad_cur,
            bad_next,
            pebbles: None,
        };
        if tseytin {
            ts.load_transition_tseytin(pool);
        } else {
            ts.load_transition();
        }
        ts
    }

    fn index(&self, name: &str) -> usize {
        self.names
            .binary_search_by(|n| n.as_str().cmp(name))
            .expect("child is a node")
    }

    /// Native CNF: `(v ⊕ v') ⇒ (c ∧ c')` unfolds to four clauses per edge.
    fn load_transition(&mut self) {
        let mut t = Vec::new();
        for (i, name) in self.names.iter().enumerate() {
            let v = &self.nodes[i];
            for child in self.dag.children(name) {
                let c = &self.nodes[self.index(child)];
                t.push(Clause::from_lits(vec![v.curr(), !v.next(), c.curr()]));
                t.push(Clause::from_lits(vec![!v.curr(), v.next(), c.curr()]));
                t.push(Clause::from_lits(vec![v.curr(), !v.next(), c.next()]));
                t.push(Clause::from_lits(vec![!v.curr(), v.next(), c.next()]));
            }
        }
        self.transition = t;
    }

    /// The same relation built as one formula and Tseitin-converted.
    fn load_transition_tseytin(&mut self, pool: &mut VarPool) {
        let mut moves = Vec::new();
        for (i, name) in self.names.iter().enumerate() {
            let v = &self.nodes[i];
            let flip = Term::xor(Term::Lit(v.curr()), Term::Lit(v.next()));
            let mut held = Vec::new();
            for child in self.dag.children(name) {
                let c = &self.nodes[self.index(child)];
                held.push(Term::Lit(c.curr()));
                held.push(Term::Lit(c.next()));
            }
            moves.push(Term::implies(flip, Term::and(held)));
        }
        let mut t = Vec::new();
        cnf::assert_term(&Term::and(moves), pool, &mut t);
        self.transition = t;
    }

    /// Pebbles needed by the target marking itself.
    pub fn f_pebbles(&self) -> u32 {
        self.dag.n_outputs() as u32
    }

    pub fn n_nodes(&self) -> u32 {
        self.dag.n_nodes() as u32
    }

    pub fn pebble_constraint(&self) -> Option<u32> {
        self.pebbles
    }
}

impl TransitionSystemIF for PebblingTs {
    fn name(&self) -> &str {
        &self.dag.name
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
        &[]
    }

    fn bad_current(&self) -> &[Lit] {
        &self.bad_cur
    }

    fn bad_next(&self) -> &[Lit] {
        &self.bad_next
    }

    fn constrain(&mut self, pool: &mut VarPool, value: u32) -> Diff {
        let diff = match self.pebbles {
            Some(old) if old == value => Diff::None,
            Some(old) if value < old => Diff::Tightened,
            Some(_) => Diff::Loosened,
            None => Diff::Tightened,
        };
        let curr: Vec<Lit> = self.nodes.iter().map(|n| n.curr()).collect();
        let next: Vec<Lit> = self.nodes.iter().map(|n| n.next()).collect();
        self.constraint = cnf::at_most_k(&curr, value as usize, pool);
        self.constraint
            .extend(cnf::at_most_k(&next, value as usize, pool));
        self.pebbles = Some(value);
        diff
    }

    fn constraint_num(&self) -> u32 {
        self.pebbles.unwrap_or(u32::MAX)
    }

    fn constraint_str(&self) -> String {
        match self.pebbles {
            Some(p) => format!("{} pebbles", p),
            None => "no pebble bound".to_string(),
        }
    }

    fn constraint_min(&self) -> u32 {
        self.f_pebbles()
    }

    fn constraint_max(&self) -> u32 {
        self.n_nodes()
    }

    fn describe_state(&self, _pool: &VarPool, cube: &Cube) -> String {
        let pebbled: Vec<&str> = self
            .names
            .iter()
            .zip(&self.nodes)
            .filter(|(_, v)| cube.value_of(v.curr().var()).unwrap_or(false))
            .map(|(n, _)| n.as_str())
            .collect();
        format!("{{{}}} ({} pebbled)", pebbled.join(", "), pebbled.len())
    }

    fn show(&self, _pool: &VarPool) -> String {
        format!(
            "{}\npebbling: {} transition clauses, {}",
            self.dag.summary(),
            self.transition.len(),
            self.constraint_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag;
    use crate::solver::Solver;

    fn chain_ts(tseytin: bool) -> (VarPool, PebblingTs) {
        let mut pool = VarPool::new();
        let mut ts = PebblingTs::new(&mut pool, dag::chain(&["a", "b", "c"]), tseytin);
        ts.constrain(&mut pool, 3);
        (pool, ts)
    }

    fn step_solver(pool: &mut VarPool, ts: &PebblingTs) -> Solver {
        let mut base: Vec<Clause> = ts.initial().iter().map(|l| Clause::unit(*l)).collect();
        base.extend_from_slice(ts.transition());
        Solver::new(pool, 0, &base, ts.constraint())
    }

    #[test]
    fn only_free_nodes_flip_from_the_initial_state() {
        for tseytin in [false, true] {
            let (mut pool, ts) = chain_ts(tseytin);
            let mut solver = step_solver(&mut pool, &ts);
            let a = ts.nodes[0];
            let b = ts.nodes[1];
            // a has no children: pebbling it is a legal first move
            assert!(solver.check(&[a.next()]).unwrap());
            // b needs a pebbled on both sides of the step
            assert!(!solver.check(&[b.next()]).unwrap());
        }
    }

    #[test]
    fn cardinality_caps_the_next_marking() {
        // two unconnected nodes, so only the bound restricts the moves
        let mut free = Dag::new("pair");
        free.add_node("x");
        free.add_node("y");
        free.add_output("y").unwrap();
        let mut pool = VarPool::new();
        let mut ts = PebblingTs::new(&mut pool, free, false);
        ts.constrain(&mut pool, 1);
        let mut solver = step_solver(&mut pool, &ts);
        let x = ts.nodes[0];
        let y = ts.nodes[1];
        assert!(solver.check(&[x.next()]).unwrap());
        assert!(!solver.check(&[x.next(), y.next()]).unwrap());
    }

    #[test]
    fn property_excludes_exactly_the_target_marking() {
        let (mut pool, ts) = chain_ts(false);
        let mut solver = Solver::new(&mut pool, 0, ts.property(), &[]);
        assert!(!solver.check(ts.bad_current()).unwrap());
        // any other marking satisfies P
        let a = ts.nodes[0];
        assert!(solver.check(&[a.curr()]).unwrap());
    }

    #[test]
    fn constrain_reports_the_direction_of_change() {
        let (mut pool, mut ts) = chain_ts(false);
        assert_eq!(ts.constrain(&mut pool, 2), Diff::Tightened);
        assert_eq!(ts.constrain(&mut pool, 2), Diff::None);
        assert_eq!(ts.constrain(&mut pool, 3), Diff::Loosened);
        assert_eq!(ts.constraint_num(), 3);
    }
}
