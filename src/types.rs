//! Basic types: literals, cubes, clauses and the crate-wide error type.
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

pub use varisat::{Lit, Var};

/// An ordered set of cubes; the order is the canonical cube order.
pub type CubeSet = BTreeSet<Cube>;

/// A conjunction of literals over pairwise distinct variables, kept in
/// canonical order (variable index, then sign).
///
/// # Examples
///
/// ```
/// use ipdr::types::{Cube, Lit};
/// let a = Cube::from_lits(vec![Lit::from_dimacs(1)]);
/// let ab = Cube::from_lits(vec![Lit::from_dimacs(2), Lit::from_dimacs(1)]);
/// assert!(a.subsumes(&ab));
/// assert!(!ab.subsumes(&a));
/// assert!(a.subsumes_eq(&a));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cube {
    lits: Vec<Lit>,
}

impl Cube {
    pub fn from_lits(mut lits: Vec<Lit>) -> Cube {
        lits.sort_unstable();
        lits.dedup();
        debug_assert!(
            lits.windows(2).all(|w| w[0].var() != w[1].var()),
            "cube holds a variable twice"
        );
        Cube { lits }
    }

    pub fn lits(&self) -> &[Lit] {
        &self.lits
    }

    pub fn len(&self) -> usize {
        self.lits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lits.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Lit> {
        self.lits.iter()
    }

    pub fn contains(&self, l: Lit) -> bool {
        self.lits.binary_search(&l).is_ok()
    }

    /// The sign this cube assigns to `v`, if any.
    pub fn value_of(&self, v: Var) -> Option<bool> {
        let pos = Lit::from_var(v, false);
        if self.contains(pos) {
            Some(true)
        } else if self.contains(!pos) {
            Some(false)
        } else {
            None
        }
    }

    /// Strict subsumption: `self ⊂ other` as literal sets, so that
    /// `¬self` is a strictly stronger clause than `¬other`.
    pub fn subsumes(&self, other: &Cube) -> bool {
        self.lits.len() < other.lits.len() && self.included_in(other)
    }

    /// Reflexive subsumption: `self ⊆ other`.
    pub fn subsumes_eq(&self, other: &Cube) -> bool {
        self.lits.len() <= other.lits.len() && self.included_in(other)
    }

    fn included_in(&self, other: &Cube) -> bool {
        // both sides are sorted, so a single merge pass decides inclusion
        let mut it = other.lits.iter();
        'scan: for l in &self.lits {
            for r in it.by_ref() {
                match r.cmp(l) {
                    std::cmp::Ordering::Less => continue,
                    std::cmp::Ordering::Equal => continue 'scan,
                    std::cmp::Ordering::Greater => return false,
                }
            }
            return false;
        }
        true
    }

    /// Literals present in both cubes with the same sign.
    pub fn intersect(&self, other: &Cube) -> Cube {
        let lits = self
            .lits
            .iter()
            .filter(|l| other.contains(**l))
            .copied()
            .collect();
        Cube { lits }
    }

    pub fn without(&self, index: usize) -> Cube {
        let mut lits = self.lits.clone();
        lits.remove(index);
        Cube { lits }
    }

    pub fn insert(&mut self, l: Lit) {
        if let Err(pos) = self.lits.binary_search(&l) {
            self.lits.insert(pos, l);
        }
    }

    /// `¬cube`, a clause by De Morgan.
    pub fn negate(&self) -> Clause {
        Clause::from_lits(self.lits.iter().map(|l| !*l).collect())
    }

    /// Number of positively marked atoms.
    pub fn marked(&self) -> usize {
        self.lits.iter().filter(|l| l.is_positive()).count()
    }
}

impl From<Vec<Lit>> for Cube {
    fn from(lits: Vec<Lit>) -> Cube {
        Cube::from_lits(lits)
    }
}

impl<'a> IntoIterator for &'a Cube {
    type Item = &'a Lit;
    type IntoIter = std::slice::Iter<'a, Lit>;
    fn into_iter(self) -> Self::IntoIter {
        self.lits.iter()
    }
}

/// A disjunction of literals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clause {
    lits: Vec<Lit>,
}

impl Clause {
    pub fn from_lits(lits: Vec<Lit>) -> Clause {
        Clause { lits }
    }

    pub fn unit(l: Lit) -> Clause {
        Clause { lits: vec![l] }
    }

    pub fn lits(&self) -> &[Lit] {
        &self.lits
    }

    /// The clause weakened by one more disjunct.
    pub fn or(mut self, l: Lit) -> Clause {
        self.lits.push(l);
        self
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let body: Vec<String> = self.lits.iter().map(|l| format!("{:?}", l)).collect();
        write!(f, "({})", body.join(" | "))
    }
}

/// Crate-wide error type. Verification outcomes are never errors; these
/// cover malformed input and the solver giving up.
#[derive(Debug, Error)]
pub enum Error {
    #[error("input error: {0}")]
    Input(String),

    #[error("solver returned unknown at level {level} under {assumptions} assumptions: {reason}")]
    SolverUnknown {
        level: usize,
        assumptions: usize,
        reason: String,
    },
}

impl Error {
    pub fn at_level(self, l: usize) -> Error {
        match self {
            Error::SolverUnknown {
                assumptions, reason, ..
            } => Error::SolverUnknown {
                level: l,
                assumptions,
                reason,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(i: isize) -> Lit {
        Lit::from_dimacs(i)
    }

    #[test]
    fn cube_is_canonical() {
        let c = Cube::from_lits(vec![lit(3), lit(-2), lit(1)]);
        assert_eq!(c.lits(), &[lit(1), lit(-2), lit(3)]);
        assert_eq!(c.value_of(lit(2).var()), Some(false));
        assert_eq!(c.value_of(lit(4).var()), None);
    }

    #[test]
    fn subsumption_is_strict_on_equal_cubes() {
        let a = Cube::from_lits(vec![lit(1), lit(-2)]);
        let b = Cube::from_lits(vec![lit(1), lit(-2), lit(3)]);
        assert!(a.subsumes(&b));
        assert!(!a.subsumes(&a));
        assert!(a.subsumes_eq(&a));
        // same length, different sign: no inclusion either way
        let c = Cube::from_lits(vec![lit(1), lit(2)]);
        assert!(!a.subsumes_eq(&c) && !c.subsumes_eq(&a));
    }

    #[test]
    fn intersection_keeps_agreeing_literals() {
        let a = Cube::from_lits(vec![lit(1), lit(-2), lit(3)]);
        let b = Cube::from_lits(vec![lit(1), lit(2), lit(3)]);
        assert_eq!(a.intersect(&b), Cube::from_lits(vec![lit(1), lit(3)]));
    }

    #[test]
    fn negation_flips_every_literal() {
        let a = Cube::from_lits(vec![lit(1), lit(-2)]);
        assert_eq!(a.negate().lits(), &[lit(-1), lit(2)]);
    }
}
