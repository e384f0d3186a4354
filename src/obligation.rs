//! Proof obligations and the states they carry. A state chains to the one
//! it steps into, so a finished backward search reads off the trace from
//! the initial end.
use crate::types::Cube;
use std::cmp::Ordering;
use std::rc::Rc;

/// A concrete state met during backward search. `next` is the state this
/// one transitions into, one step closer to the property violation.
#[derive(Debug)]
pub struct State {
    pub cube: Cube,
    pub next: Option<Rc<State>>,
}

impl State {
    pub fn new(cube: Cube) -> Rc<State> {
        Rc::new(State { cube, next: None })
    }

    pub fn preceding(cube: Cube, next: Rc<State>) -> Rc<State> {
        Rc::new(State {
            cube,
            next: Some(next),
        })
    }

    /// The cubes from this state onward, in time order.
    pub fn unroll(self: &Rc<State>) -> Vec<Cube> {
        let mut out = Vec::new();
        let mut cur = Some(self.clone());
        while let Some(s) = cur {
            out.push(s.cube.clone());
            cur = s.next.clone();
        }
        out
    }
}

/// "Block `state` at `level`"; `depth` counts how far the backward search
/// had to reach to produce it.
#[derive(Clone, Debug)]
pub struct Obligation {
    pub level: usize,
    pub state: Rc<State>,
    pub depth: usize,
}

impl Obligation {
    pub fn new(level: usize, state: Rc<State>, depth: usize) -> Obligation {
        Obligation {
            level,
            state,
            depth,
        }
    }
}

impl PartialEq for Obligation {
    fn eq(&self, other: &Obligation) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Obligation {}

impl PartialOrd for Obligation {
    fn partial_cmp(&self, other: &Obligation) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Obligation {
    fn cmp(&self, other: &Obligation) -> Ordering {
        self.level
            .cmp(&other.level)
            .then(self.depth.cmp(&other.depth))
            .then_with(|| self.state.cube.cmp(&other.state.cube))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Lit;
    use min_max_heap::MinMaxHeap;

    fn cube(i: isize) -> Cube {
        Cube::from_lits(vec![Lit::from_dimacs(i)])
    }

    #[test]
    fn queue_orders_by_level_then_depth_then_cube() {
        let mut heap = MinMaxHeap::new();
        heap.push(Obligation::new(2, State::new(cube(1)), 0));
        heap.push(Obligation::new(1, State::new(cube(2)), 5));
        heap.push(Obligation::new(1, State::new(cube(3)), 1));
        heap.push(Obligation::new(1, State::new(cube(1)), 1));

        let order: Vec<(usize, usize)> = std::iter::from_fn(|| heap.pop_min())
            .map(|o| (o.level, o.depth))
            .collect();
        assert_eq!(order, vec![(1, 1), (1, 1), (1, 5), (2, 0)]);
    }

    #[test]
    fn unroll_reads_the_chain_in_time_order() {
        let bad = State::new(cube(3));
        let mid = State::preceding(cube(2), bad);
        let root = State::preceding(cube(1), mid);
        assert_eq!(root.unroll(), vec![cube(1), cube(2), cube(3)]);
    }
}
