//! Propositional terms and their clausal form: Tseitin conversion and the
//! sequential-counter cardinality encoding.
use crate::types::{Clause, Lit};
use crate::vars::VarPool;

/// A formula over literals. Constructors simplify constants away, so `True`
/// and `False` rarely survive past the surface.
#[derive(Clone, Debug)]
pub enum Term {
    True,
    False,
    Lit(Lit),
    Not(Box<Term>),
    And(Vec<Term>),
    Or(Vec<Term>),
}

impl Term {
    pub fn and(ts: Vec<Term>) -> Term {
        let mut kept = Vec::with_capacity(ts.len());
        for t in ts {
            match t {
                Term::True => {}
                Term::False => return Term::False,
                Term::And(inner) => kept.extend(inner),
                other => kept.push(other),
            }
        }
        match kept.len() {
            0 => Term::True,
            1 => kept.pop().unwrap(),
            _ => Term::And(kept),
        }
    }

    pub fn or(ts: Vec<Term>) -> Term {
        let mut kept = Vec::with_capacity(ts.len());
        for t in ts {
            match t {
                Term::False => {}
                Term::True => return Term::True,
                Term::Or(inner) => kept.extend(inner),
                other => kept.push(other),
            }
        }
        match kept.len() {
            0 => Term::False,
            1 => kept.pop().unwrap(),
            _ => Term::Or(kept),
        }
    }

    pub fn not(t: Term) -> Term {
        match t {
            Term::True => Term::False,
            Term::False => Term::True,
            Term::Lit(l) => Term::Lit(!l),
            Term::Not(inner) => *inner,
            other => Term::Not(Box::new(other)),
        }
    }

    pub fn implies(a: Term, b: Term) -> Term {
        Term::or(vec![Term::not(a), b])
    }

    pub fn iff(a: Term, b: Term) -> Term {
        Term::and(vec![
            Term::implies(a.clone(), b.clone()),
            Term::implies(b, a),
        ])
    }

    pub fn xor(a: Term, b: Term) -> Term {
        Term::or(vec![
            Term::and(vec![a.clone(), Term::not(b.clone())]),
            Term::and(vec![Term::not(a), b]),
        ])
    }

    pub fn ite(c: Term, t: Term, e: Term) -> Term {
        Term::and(vec![
            Term::implies(c.clone(), t),
            Term::implies(Term::not(c), e),
        ])
    }
}

/// Tseitin-define `term`: returns a literal equivalent to the term, pushing
/// the definitional clauses onto `out`.
pub fn define(term: &Term, pool: &mut VarPool, out: &mut Vec<Clause>) -> Lit {
    match term {
        Term::Lit(l) => *l,
        Term::Not(inner) => !define(inner, pool, out),
        Term::True => {
            let g = pool.aux("true");
            out.push(Clause::unit(g));
            g
        }
        Term::False => {
            let g = pool.aux("false");
            out.push(Clause::unit(!g));
            g
        }
        Term::And(ts) => {
            let roots: Vec<Lit> = ts.iter().map(|t| define(t, pool, out)).collect();
            let g = pool.aux("and");
            let mut back = vec![g];
            for r in &roots {
                out.push(Clause::from_lits(vec![!g, *r]));
                back.push(!*r);
            }
            out.push(Clause::from_lits(back));
            g
        }
        Term::Or(ts) => {
            let roots: Vec<Lit> = ts.iter().map(|t| define(t, pool, out)).collect();
            let g = pool.aux("or");
            let mut fwd = vec![!g];
            for r in &roots {
                out.push(Clause::from_lits(vec![g, !*r]));
                fwd.push(*r);
            }
            out.push(Clause::from_lits(fwd));
            g
        }
    }
}

/// Convert `term` to clauses that force it, without a root gate where the
/// shape allows it (top-level conjunctions become clause lists, top-level
/// disjunctions a single clause over defined disjuncts).
pub fn assert_term(term: &Term, pool: &mut VarPool, out: &mut Vec<Clause>) {
    match term {
        Term::True => {}
        Term::False => out.push(Clause::from_lits(Vec::new())),
        Term::Lit(l) => out.push(Clause::unit(*l)),
        Term::Not(inner) => {
            let r = define(inner, pool, out);
            out.push(Clause::unit(!r));
        }
        Term::And(ts) => {
            for t in ts {
                assert_term(t, pool, out);
            }
        }
        Term::Or(ts) => {
            let roots: Vec<Lit> = ts.iter().map(|t| define(t, pool, out)).collect();
            out.push(Clause::from_lits(roots));
        }
    }
}

/// At most `k` of `lits` true: Sinz's sequential counter. `s(i, j)` reads
/// "at least j+1 of the first i+1 inputs are true".
pub fn at_most_k(lits: &[Lit], k: usize, pool: &mut VarPool) -> Vec<Clause> {
    let n = lits.len();
    if k >= n {
        return Vec::new();
    }
    if k == 0 {
        return lits.iter().map(|l| Clause::unit(!*l)).collect();
    }

    let mut out = Vec::new();
    // registers for inputs 0..n-1; the last input only caps the count
    let regs: Vec<Vec<Lit>> = (0..n - 1)
        .map(|_| (0..k).map(|_| pool.aux("amk")).collect())
        .collect();

    out.push(Clause::from_lits(vec![!lits[0], regs[0][0]]));
    for j in 1..k {
        out.push(Clause::unit(!regs[0][j]));
    }
    for i in 1..n - 1 {
        out.push(Clause::from_lits(vec![!lits[i], regs[i][0]]));
        out.push(Clause::from_lits(vec![!regs[i - 1][0], regs[i][0]]));
        for j in 1..k {
            out.push(Clause::from_lits(vec![
                !lits[i],
                !regs[i - 1][j - 1],
                regs[i][j],
            ]));
            out.push(Clause::from_lits(vec![!regs[i - 1][j], regs[i][j]]));
        }
        out.push(Clause::from_lits(vec![!lits[i], !regs[i - 1][k - 1]]));
    }
    out.push(Clause::from_lits(vec![!lits[n - 1], !regs[n - 2][k - 1]]));
    out
}
