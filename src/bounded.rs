//! Bounded search for a pebbling strategy: per-step copies of the node
//! variables, one cardinality constraint per step, and the target marking
//! as assumptions at the current depth. Incomplete by nature; a depth cap
//! bounds each attempt.
use crate::cnf;
use crate::dag::Dag;
use crate::logger::Logger;
use crate::types::{Error, Lit, Result};
use crate::vars::VarPool;
use std::time::Instant;
use varisat::ExtendFormula;

pub struct BoundedPebbling {
    dag: Dag,
    names: Vec<String>,
    max_depth: usize,
}

/// A found strategy: the pebble bound it respects and the marking per
/// step (names of pebbled nodes).
#[derive(Debug)]
pub struct BoundedResult {
    pub pebbles: Option<u32>,
    pub strategy: Option<Vec<Vec<String>>>,
    pub time: f64,
}

impl BoundedPebbling {
    pub fn new(dag: Dag, max_depth: usize) -> BoundedPebbling {
        let names: Vec<String> = dag.nodes().cloned().collect();
        BoundedPebbling {
            dag,
            names,
            max_depth,
        }
    }

    /// Raise the pebble bound from `start` until an unrolling finds the
    /// target marking.
    pub fn find_for(&self, start: u32, log: &mut Logger) -> Result<BoundedResult> {
        let begin = Instant::now();
        let max = self.names.len() as u32;
        if start > max {
            return Err(Error::Input(format!(
                "cannot start above {} pebbles",
                max
            )));
        }
        for pebbles in start..=max {
            log.and_show(format!("bounded attempt with {} pebbles", pebbles));
            if let Some(strategy) = self.attempt(pebbles)? {
                return Ok(BoundedResult {
                    pebbles: Some(pebbles),
                    strategy: Some(strategy),
                    time: begin.elapsed().as_secs_f64(),
                });
            }
        }
        log.and_whisper(format!(
            "no strategy within {} steps up to {} pebbles",
            self.max_depth, max
        ));
        Ok(BoundedResult {
            pebbles: None,
            strategy: None,
            time: begin.elapsed().as_secs_f64(),
        })
    }

    fn attempt(&self, pebbles: u32) -> Result<Option<Vec<Vec<String>>>> {
        let mut pool = VarPool::new();
        let mut solver = varisat::Solver::new();
        let n = self.names.len();

        // step 0: the empty marking
        let mut steps: Vec<Vec<Lit>> = vec![self.step_vars(&mut pool, 0)];
        for l in &steps[0] {
            solver.add_clause(&[!*l]);
        }
        self.cap(&mut solver, &mut pool, &steps[0], pebbles);

        for depth in 1..=self.max_depth {
            let step = self.step_vars(&mut pool, depth);
            self.push_transition(&mut solver, &steps[depth - 1], &step);
            self.cap(&mut solver, &mut pool, &step, pebbles);
            steps.push(step);

            let target: Vec<Lit> = self.names
                .iter()
                .zip(&steps[depth])
                .map(|(name, l)| if self.dag.is_output(name) { *l } else { !*l })
                .collect();
            solver.assume(&target);
            let sat = solver.solve().map_err(|e| Error::SolverUnknown {
                level: depth,
                assumptions: target.len(),
                reason: e.to_string(),
            })?;
            if sat {
                return Ok(Some(self.extract(&solver, &steps)));
            }
        }
        Ok(None)
    }

    fn step_vars(&self, pool: &mut VarPool, step: usize) -> Vec<Lit> {
        self.names
            .iter()
            .map(|n| pool.aux(&format!("{}.{}", n, step)))
            .collect()
    }

    fn cap(&self, solver: &mut varisat::Solver, pool: &mut VarPool, lits: &[Lit], k: u32) {
        for c in cnf::at_most_k(lits, k as usize, pool) {
            solver.add_clause(c.lits());
        }
    }

    fn push_transition(&self, solver: &mut varisat::Solver, from: &[Lit], to: &[Lit]) {
        for (i, name) in self.names.iter().enumerate() {
            for child in self.dag.children(name) {
                let c = self
                    .names
                    .binary_search_by(|n| n.as_str().cmp(child))
                    .expect("child is a node");
                solver.add_clause(&[from[i], !to[i], from[c]]);
                solver.add_clause(&[!from[i], to[i], from[c]]);
                solver.add_clause(&[from[i], !to[i], to[c]]);
                solver.add_clause(&[!from[i], to[i], to[c]]);
            }
        }
    }

    fn extract(&self, solver: &varisat::Solver, steps: &[Vec<Lit>]) -> Vec<Vec<String>> {
        let model = solver.model().expect("sat without a model");
        let holds = |l: Lit| model.contains(&l);
        steps
            .iter()
            .map(|step| {
                self.names
                    .iter()
                    .zip(step)
                    .filter(|(_, l)| holds(**l))
                    .map(|(n, _)| n.clone())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag;
    use crate::logger::OutLvl;

    #[test]
    fn finds_the_chain_strategy_at_three_pebbles() {
        // unpebbling b mid-chain needs a back on the graph, so the chain
        // of three costs a third pebble
        let bounded = BoundedPebbling::new(dag::chain(&["a", "b", "c"]), 20);
        let mut log = Logger::new(OutLvl::Silent, None).unwrap();
        let res = bounded.find_for(1, &mut log).unwrap();
        assert_eq!(res.pebbles, Some(3));

        let strategy = res.strategy.unwrap();
        assert!(strategy.first().unwrap().is_empty());
        assert_eq!(strategy.last().unwrap(), &vec!["c".to_string()]);
        assert!(strategy.iter().all(|m| m.len() <= 3));
    }

    #[test]
    fn one_pebble_admits_no_strategy() {
        let bounded = BoundedPebbling::new(dag::chain(&["a", "b"]), 8);
        let mut log = Logger::new(OutLvl::Silent, None).unwrap();
        let res = bounded.find_for(1, &mut log).unwrap();
        // the two-node chain needs both pebbles down at once
        assert_eq!(res.pebbles, Some(2));
    }
}
