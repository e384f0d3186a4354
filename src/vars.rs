//! Primed variables: every state atom exists in a *current* and a *next*
//! copy. `VarPool` is the single allocator behind all solvers, so literals
//! mean the same thing in every solver instance of a run.
use crate::cnf::Term;
use crate::types::{Cube, Lit, Var};

/// Which copy of a state variable a query talks about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Time {
    Curr,
    Next,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Current,
    Next,
    Aux,
}

#[derive(Debug)]
struct VarInfo {
    name: String,
    role: Role,
    /// Positive literal of the twin copy; self for auxiliaries.
    partner: Lit,
}

/// Allocator and name table for every variable of a run: state pairs,
/// Tseitin auxiliaries and activation literals alike.
#[derive(Debug, Default)]
pub struct VarPool {
    infos: Vec<VarInfo>,
}

impl VarPool {
    pub fn new() -> VarPool {
        VarPool { infos: Vec::new() }
    }

    fn alloc(&mut self, name: String, role: Role) -> Lit {
        let l = Lit::from_var(Var::from_index(self.infos.len()), false);
        self.infos.push(VarInfo {
            name,
            role,
            partner: l,
        });
        l
    }

    /// Declare a state variable; allocates the current and the next copy.
    pub fn state_bool(&mut self, name: &str) -> StateBool {
        let curr = self.alloc(name.to_string(), Role::Current);
        let next = self.alloc(format!("{}.p", name), Role::Next);
        self.infos[curr.var().index()].partner = next;
        self.infos[next.var().index()].partner = curr;
        StateBool { curr, next }
    }

    /// Declare a bit-vector wide enough to hold `max_value`.
    pub fn state_bits_holding(&mut self, name: &str, max_value: u64) -> StateBits {
        self.state_bits(name, bits_for(max_value))
    }

    pub fn state_bits(&mut self, name: &str, width: usize) -> StateBits {
        let bits = (0..width)
            .map(|i| self.state_bool(&format!("{}_{}", name, i)))
            .collect();
        StateBits { bits }
    }

    /// A fresh auxiliary (Tseitin gate or activation literal).
    pub fn aux(&mut self, name: &str) -> Lit {
        let tag = format!("__{}{}__", name, self.infos.len());
        self.alloc(tag, Role::Aux)
    }

    pub fn n_vars(&self) -> usize {
        self.infos.len()
    }

    pub fn role(&self, v: Var) -> Role {
        self.infos[v.index()].role
    }

    pub fn is_current(&self, v: Var) -> bool {
        self.role(v) == Role::Current
    }

    pub fn is_next(&self, v: Var) -> bool {
        self.role(v) == Role::Next
    }

    pub fn name(&self, v: Var) -> &str {
        &self.infos[v.index()].name
    }

    /// The same literal over the next-state copy. The argument must be a
    /// current-state literal.
    pub fn prime(&self, l: Lit) -> Lit {
        debug_assert!(self.is_current(l.var()), "priming a non-current literal");
        let p = self.infos[l.var().index()].partner;
        if l.is_negative() {
            !p
        } else {
            p
        }
    }

    /// Inverse of [`VarPool::prime`].
    pub fn unprime(&self, l: Lit) -> Lit {
        debug_assert!(self.is_next(l.var()), "unpriming a non-next literal");
        let c = self.infos[l.var().index()].partner;
        if l.is_negative() {
            !c
        } else {
            c
        }
    }

    /// Cube over next-state atoms, as an assumption list.
    pub fn prime_cube(&self, c: &Cube) -> Vec<Lit> {
        c.iter().map(|l| self.prime(*l)).collect()
    }

    /// Restrict a model to current-state atoms; sorted by construction.
    pub fn filter_current(&self, model: &[Lit]) -> Cube {
        Cube::from_lits(
            model
                .iter()
                .filter(|l| self.is_current(l.var()))
                .copied()
                .collect(),
        )
    }

    /// Restrict a model to next-state atoms and unprime them.
    pub fn filter_next_unprimed(&self, model: &[Lit]) -> Cube {
        Cube::from_lits(
            model
                .iter()
                .filter(|l| self.is_next(l.var()))
                .map(|l| self.unprime(*l))
                .collect(),
        )
    }

    /// Names of all current-state atoms, in canonical variable order.
    pub fn current_names(&self) -> Vec<String> {
        self.infos
            .iter()
            .filter(|i| i.role == Role::Current)
            .map(|i| i.name.clone())
            .collect()
    }

    pub fn lit_str(&self, l: Lit) -> String {
        if l.is_negative() {
            format!("!{}", self.name(l.var()))
        } else {
            self.name(l.var()).to_string()
        }
    }

    pub fn cube_str(&self, c: &Cube) -> String {
        let parts: Vec<String> = c.iter().map(|l| self.lit_str(*l)).collect();
        format!("[{}]", parts.join(" "))
    }
}

/// Number of bits needed to hold `max_value` in standard binary.
pub fn bits_for(max_value: u64) -> usize {
    (64 - max_value.max(1).leading_zeros()) as usize
}

/// A boolean state variable: one atom, two copies.
#[derive(Clone, Copy, Debug)]
pub struct StateBool {
    curr: Lit,
    next: Lit,
}

impl StateBool {
    pub fn curr(&self) -> Lit {
        self.curr
    }

    pub fn next(&self) -> Lit {
        self.next
    }

    pub fn at(&self, t: Time) -> Lit {
        match t {
            Time::Curr => self.curr,
            Time::Next => self.next,
        }
    }

    pub fn unchanged(&self) -> Term {
        Term::iff(Term::Lit(self.curr), Term::Lit(self.next))
    }
}

/// A non-negative integer in standard binary over paired atoms, LSB first.
#[derive(Clone, Debug)]
pub struct StateBits {
    bits: Vec<StateBool>,
}

impl StateBits {
    pub fn width(&self) -> usize {
        self.bits.len()
    }

    pub fn bit(&self, i: usize) -> &StateBool {
        &self.bits[i]
    }

    fn lit(&self, i: usize, v: u64, t: Time) -> Term {
        let l = self.bits[i].at(t);
        if (v >> i) & 1 == 1 {
            Term::Lit(l)
        } else {
            Term::Lit(!l)
        }
    }

    /// The cube forcing exactly the value `v`.
    pub fn cube(&self, v: u64, t: Time) -> Vec<Lit> {
        assert!(v < (1u64 << self.width()), "value out of range");
        (0..self.width())
            .map(|i| {
                let l = self.bits[i].at(t);
                if (v >> i) & 1 == 1 {
                    l
                } else {
                    !l
                }
            })
            .collect()
    }

    pub fn equals(&self, v: u64, t: Time) -> Term {
        Term::and((0..self.width()).map(|i| self.lit(i, v, t)).collect())
    }

    /// `self < n` for a constant `n`: some bit of `n` is 1 where ours is 0
    /// while all higher bits agree.
    pub fn less_const(&self, n: u64, t: Time) -> Term {
        let w = self.width();
        let mut cases = Vec::new();
        for i in 0..w {
            if (n >> i) & 1 == 0 {
                continue;
            }
            let mut conj = vec![Term::Lit(!self.bits[i].at(t))];
            for j in i + 1..w {
                conj.push(self.lit(j, n, t));
            }
            cases.push(Term::and(conj));
        }
        Term::or(cases)
    }

    /// `self < other`, bitwise from the most significant position down.
    pub fn less_bits(&self, other: &StateBits, t: Time) -> Term {
        assert_eq!(self.width(), other.width());
        let w = self.width();
        let mut cases = Vec::new();
        for i in 0..w {
            let mut conj = vec![
                Term::Lit(!self.bits[i].at(t)),
                Term::Lit(other.bits[i].at(t)),
            ];
            for j in i + 1..w {
                conj.push(Term::iff(
                    Term::Lit(self.bits[j].at(t)),
                    Term::Lit(other.bits[j].at(t)),
                ));
            }
            cases.push(Term::and(conj));
        }
        Term::or(cases)
    }

    pub fn unchanged(&self) -> Term {
        Term::and(self.bits.iter().map(|b| b.unchanged()).collect())
    }

    /// Relation `next = curr + 1` (mod 2^w); the carry into bit `j` is the
    /// conjunction of all lower current bits.
    pub fn incremented(&self) -> Term {
        let mut conj = Vec::new();
        for j in 0..self.width() {
            let carry = Term::and(
                (0..j)
                    .map(|m| Term::Lit(self.bits[m].curr()))
                    .collect::<Vec<_>>(),
            );
            conj.push(Term::iff(
                Term::Lit(self.bits[j].next()),
                Term::xor(Term::Lit(self.bits[j].curr()), carry),
            ));
        }
        Term::and(conj)
    }

    /// Read the value back from a witness cube; missing bits default to 0.
    pub fn extract(&self, cube: &Cube, t: Time) -> u64 {
        let mut v = 0u64;
        for (i, b) in self.bits.iter().enumerate() {
            if cube.value_of(b.at(t).var()).unwrap_or(false) {
                v |= 1 << i;
            }
        }
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bits_for_counts_binary_digits() {
        assert_eq!(bits_for(0), 1);
        assert_eq!(bits_for(1), 1);
        assert_eq!(bits_for(2), 2);
        assert_eq!(bits_for(4), 3);
        assert_eq!(bits_for(7), 3);
        assert_eq!(bits_for(8), 4);
    }

    #[test]
    fn priming_round_trips_and_keeps_sign() {
        let mut pool = VarPool::new();
        let x = pool.state_bool("x");
        assert_eq!(pool.prime(x.curr()), x.next());
        assert_eq!(pool.prime(!x.curr()), !x.next());
        assert_eq!(pool.unprime(!x.next()), !x.curr());
        assert_eq!(pool.name(x.next().var()), "x.p");
    }

    #[test]
    fn model_filtering_splits_roles() {
        let mut pool = VarPool::new();
        let x = pool.state_bool("x");
        let y = pool.state_bool("y");
        let a = pool.aux("act");
        let model = vec![x.curr(), !x.next(), !y.curr(), y.next(), a];
        assert_eq!(
            pool.filter_current(&model),
            Cube::from_lits(vec![x.curr(), !y.curr()])
        );
        assert_eq!(
            pool.filter_next_unprimed(&model),
            Cube::from_lits(vec![!x.curr(), y.curr()])
        );
    }

    proptest! {
        #[test]
        fn bitvec_value_round_trips(v in 0u64..32) {
            let mut pool = VarPool::new();
            let bv = pool.state_bits("b", 5);
            let cube = Cube::from_lits(bv.cube(v, Time::Curr));
            prop_assert_eq!(bv.extract(&cube, Time::Curr), v);
            let cube_p = Cube::from_lits(bv.cube(v, Time::Next));
            prop_assert_eq!(bv.extract(&cube_p, Time::Next), v);
        }
    }

    #[test]
    fn extract_defaults_missing_bits_to_zero() {
        let mut pool = VarPool::new();
        let bv = pool.state_bits("b", 3);
        let partial = Cube::from_lits(vec![bv.bit(1).curr()]);
        assert_eq!(bv.extract(&partial, Time::Curr), 2);
    }
}
