//! Verification outcomes: an inductive invariant level or a trace, plus the
//! accumulated form an incremental run produces. Also the textual marking
//! tables traces are rendered as.
use crate::types::Cube;
use crate::vars::VarPool;

/// A counter-example run s₀ … sₖ: s₀ satisfies I, sₖ violates P.
#[derive(Clone, Debug)]
pub struct Trace {
    pub states: Vec<Cube>,
    /// Largest number of positively marked atoms in any state.
    pub marked: usize,
}

impl Trace {
    pub fn new(states: Vec<Cube>) -> Trace {
        let marked = states.iter().map(Cube::marked).max().unwrap_or(0);
        Trace { states, marked }
    }

    /// Number of transitions.
    pub fn length(&self) -> usize {
        self.states.len().saturating_sub(1)
    }
}

#[derive(Clone, Debug)]
pub enum Outcome {
    Invariant { level: usize },
    Trace(Trace),
}

/// The outcome of one engine run, with its wall-clock time and the
/// constraint value it ran under.
#[derive(Clone, Debug)]
pub struct PdrResult {
    pub outcome: Outcome,
    pub time: f64,
    pub constraint: Option<u32>,
}

impl PdrResult {
    pub fn found_invariant(level: usize) -> PdrResult {
        PdrResult {
            outcome: Outcome::Invariant { level },
            time: 0.0,
            constraint: None,
        }
    }

    pub fn found_trace(states: Vec<Cube>) -> PdrResult {
        PdrResult {
            outcome: Outcome::Trace(Trace::new(states)),
            time: 0.0,
            constraint: None,
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> PdrResult {
        self.time = seconds;
        self
    }

    pub fn with_constraint(mut self, value: u32) -> PdrResult {
        self.constraint = Some(value);
        self
    }

    pub fn has_invariant(&self) -> bool {
        matches!(self.outcome, Outcome::Invariant { .. })
    }

    pub fn has_trace(&self) -> bool {
        matches!(self.outcome, Outcome::Trace(_))
    }

    pub fn invariant_level(&self) -> Option<usize> {
        match &self.outcome {
            Outcome::Invariant { level } => Some(*level),
            Outcome::Trace(_) => None,
        }
    }

    pub fn trace(&self) -> Option<&Trace> {
        match &self.outcome {
            Outcome::Trace(t) => Some(t),
            Outcome::Invariant { .. } => None,
        }
    }

    /// { invariant index, trace length, total time } for the summary table.
    pub fn listing(&self) -> [String; 3] {
        match &self.outcome {
            Outcome::Invariant { level } => {
                [format!("F_{}", level), String::new(), format!("{:.3}", self.time)]
            }
            Outcome::Trace(t) => [
                String::new(),
                t.states.len().to_string(),
                format!("{:.3}", self.time),
            ],
        }
    }
}

/// One incremental run: every intermediate result in order, and the optimum
/// the walk established.
#[derive(Debug, Default)]
pub struct IpdrResult {
    pub runs: Vec<PdrResult>,
    pub optimum: Option<u32>,
}

impl IpdrResult {
    pub fn new() -> IpdrResult {
        IpdrResult::default()
    }

    pub fn add(&mut self, r: PdrResult) {
        self.runs.push(r);
    }

    pub fn last(&self) -> Option<&PdrResult> {
        self.runs.last()
    }

    pub fn total_time(&self) -> f64 {
        self.runs.iter().map(|r| r.time).sum()
    }

    /// Best proven level over all invariant runs.
    pub fn max_invariant_level(&self) -> Option<usize> {
        self.runs.iter().filter_map(PdrResult::invariant_level).max()
    }

    /// Fewest marked atoms over all trace runs.
    pub fn min_marked(&self) -> Option<usize> {
        self.runs
            .iter()
            .filter_map(|r| r.trace().map(|t| t.marked))
            .min()
    }

    pub fn summary_table(&self) -> String {
        let mut rows = vec![vec![
            "constraint".to_string(),
            "invariant".to_string(),
            "trace".to_string(),
            "time".to_string(),
        ]];
        for r in &self.runs {
            let [inv, trace, time] = r.listing();
            let constraint = r
                .constraint
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());
            rows.push(vec![constraint, inv, trace, time]);
        }
        let mut out = table(&rows);
        out.push_str(&format!("\ntotal time: {:.3}\n", self.total_time()));
        out.push_str(&match self.optimum {
            Some(n) => format!("optimum: {}\n", n),
            None => "optimum: none\n".to_string(),
        });
        out
    }

    pub fn end_result(&self) -> String {
        match self.optimum {
            Some(n) => format!("optimum constraint value: {}", n),
            None => "no optimum exists within the constraint bounds".to_string(),
        }
    }
}

/// Align `rows` into fixed-width columns.
pub fn table(rows: &[Vec<String>]) -> String {
    let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; cols];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }
    rows.iter()
        .map(|row| {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
                .collect();
            cells.join(" | ").trim_end().to_string()
        })
        .collect::<Vec<String>>()
        .join("\n")
}

/// One table cell per header atom: `X` marked, empty clear, `?` unassigned.
pub fn marking(cube: &Cube, header: &[String], pool: &VarPool) -> Vec<String> {
    let mut row = vec!["?".to_string(); header.len()];
    for l in cube {
        let name = pool.name(l.var());
        if let Some(col) = header.iter().position(|h| h == name) {
            row[col] = if l.is_negative() {
                String::new()
            } else {
                "X".to_string()
            };
        }
    }
    row
}

/// Inverse of [`marking`]: per-atom signs, `None` where the row left the
/// atom unassigned.
pub fn parse_marking(header: &[String], row: &[String]) -> Vec<(String, Option<bool>)> {
    header
        .iter()
        .zip(row)
        .map(|(name, cell)| {
            let sign = match cell.trim() {
                "?" => None,
                "" => Some(false),
                _ => Some(true),
            };
            (name.clone(), sign)
        })
        .collect()
}

/// Render a trace as a marking table: one row per state, one column per
/// current-state atom, plus the marked count.
pub fn trace_table(trace: &Trace, pool: &VarPool) -> String {
    let header = pool.current_names();
    let mut rows = Vec::with_capacity(trace.states.len() + 1);
    let mut head = vec!["step".to_string()];
    head.extend(header.iter().cloned());
    head.push("marked".to_string());
    rows.push(head);
    for (i, s) in trace.states.iter().enumerate() {
        let mut row = vec![i.to_string()];
        row.extend(marking(s, &header, pool));
        row.push(s.marked().to_string());
        rows.push(row);
    }
    table(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Lit;

    #[test]
    fn marking_round_trips_signs() {
        let mut pool = VarPool::new();
        let a = pool.state_bool("a");
        let b = pool.state_bool("b");
        let _c = pool.state_bool("c");
        let header = pool.current_names();
        let cube = Cube::from_lits(vec![a.curr(), !b.curr()]);

        let row = marking(&cube, &header, &pool);
        let parsed = parse_marking(&header, &row);
        assert_eq!(
            parsed,
            vec![
                ("a".to_string(), Some(true)),
                ("b".to_string(), Some(false)),
                ("c".to_string(), None),
            ]
        );
    }

    #[test]
    fn trace_counts_marks_and_length() {
        let t = Trace::new(vec![
            Cube::from_lits(vec![Lit::from_dimacs(-1), Lit::from_dimacs(-2)]),
            Cube::from_lits(vec![Lit::from_dimacs(1), Lit::from_dimacs(2)]),
            Cube::from_lits(vec![Lit::from_dimacs(-1), Lit::from_dimacs(2)]),
        ]);
        assert_eq!(t.length(), 2);
        assert_eq!(t.marked, 2);
    }

    #[test]
    fn summary_table_lists_every_run() {
        let mut acc = IpdrResult::new();
        acc.add(PdrResult::found_invariant(2).with_constraint(1).with_duration(0.5));
        acc.add(
            PdrResult::found_trace(vec![Cube::default(), Cube::default()])
                .with_constraint(2)
                .with_duration(0.25),
        );
        acc.optimum = Some(2);
        let text = acc.summary_table();
        assert!(text.contains("F_2"));
        assert!(text.contains("optimum: 2"));
        assert!((acc.total_time() - 0.75).abs() < 1e-9);
    }
}
