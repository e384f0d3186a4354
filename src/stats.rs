//! Run statistics: per-level counters and timers, rendered into the
//! statistics dump at the end of a run.
use std::fmt;

/// One counter, optionally with accumulated wall-clock time, indexed by
/// frame level (or iteration, depending on who feeds it).
#[derive(Debug, Default)]
pub struct Statistic {
    timed: bool,
    pub total_count: usize,
    count: Vec<usize>,
    pub total_time: f64,
    time: Vec<f64>,
}

impl Statistic {
    pub fn new(timed: bool) -> Statistic {
        Statistic {
            timed,
            ..Statistic::default()
        }
    }

    pub fn add(&mut self, i: usize, amount: usize) {
        self.total_count += amount;
        if self.count.len() <= i {
            self.count.resize(i + 1, 0);
        }
        self.count[i] += amount;
    }

    pub fn add_timed(&mut self, i: usize, dt: f64) {
        debug_assert!(self.timed);
        self.add(i, 1);
        self.total_time += dt;
        if self.time.len() <= i {
            self.time.resize(i + 1, 0.0);
        }
        self.time[i] += dt;
    }

    pub fn avg_time(&self, i: usize) -> Option<f64> {
        let t = *self.time.get(i)?;
        let n = *self.count.get(i)?;
        (n > 0).then(|| t / n as f64)
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.timed {
            writeln!(f, "# - total time:  {:.6}", self.total_time)?;
        }
        writeln!(f, "# - total count: {}", self.total_count)?;
        for (i, n) in self.count.iter().enumerate() {
            if self.timed {
                writeln!(
                    f,
                    "# - i={:<3} calls: {:<10} time: {:<12.6} avg: {:.6}",
                    i,
                    n,
                    self.time.get(i).copied().unwrap_or(0.0),
                    self.avg_time(i).unwrap_or(0.0)
                )?;
            } else {
                writeln!(f, "# - i={:<3} count: {}", i, n)?;
            }
        }
        write!(f, "###")
    }
}

/// Everything a run counts. Owned by the logger and threaded by reference
/// through the engine.
#[derive(Debug)]
pub struct Statistics {
    pub solver_calls: Statistic,
    pub obligations_handled: Statistic,
    pub propagation_it: Statistic,
    pub propagation_level: Statistic,
    pub subsumed_cubes: Statistic,
    pub ctis: Statistic,
    pub mic_attempts: Statistic,
    /// How often the retry budget cut a minimization short.
    pub mic_limit_hits: usize,
    pub elapsed: f64,
    pub model: Vec<(String, String)>,
}

impl Default for Statistics {
    fn default() -> Statistics {
        Statistics {
            solver_calls: Statistic::new(true),
            obligations_handled: Statistic::new(true),
            propagation_it: Statistic::new(true),
            propagation_level: Statistic::new(false),
            subsumed_cubes: Statistic::new(false),
            ctis: Statistic::new(false),
            mic_attempts: Statistic::new(false),
            mic_limit_hits: 0,
            elapsed: -1.0,
            model: Vec::new(),
        }
    }
}

impl Statistics {
    pub fn new() -> Statistics {
        Statistics::default()
    }

    pub fn describe_model(&mut self, key: &str, value: String) {
        self.model.push((key.to_string(), value));
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.model.is_empty() {
            writeln!(f, "Model:")?;
            writeln!(f, "--------")?;
            for (k, v) in &self.model {
                writeln!(f, "{} = {}", k, v)?;
            }
        }
        writeln!(f, "Total elapsed time: {:.6}", self.elapsed)?;
        writeln!(f)?;
        writeln!(f, "######################")?;
        writeln!(f, "# Statistics")?;
        writeln!(f, "######################")?;
        writeln!(f, "# Solver calls\n{}", self.solver_calls)?;
        writeln!(f, "# Obligations\n{}", self.obligations_handled)?;
        writeln!(f, "# Propagation per iteration\n{}", self.propagation_it)?;
        writeln!(f, "# Propagation per level\n{}", self.propagation_level)?;
        writeln!(f, "# Subsumed cubes\n{}", self.subsumed_cubes)?;
        writeln!(f, "# Counterexamples to induction\n{}", self.ctis)?;
        writeln!(f, "# Minimization attempts\n{}", self.mic_attempts)?;
        writeln!(f, "# - retry budget hit {} times", self.mic_limit_hits)?;
        write!(f, "######################")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_grow_on_demand() {
        let mut s = Statistic::new(false);
        s.add(3, 2);
        s.add(0, 1);
        assert_eq!(s.total_count, 3);
        assert_eq!(s.avg_time(3), None);
    }

    #[test]
    fn timed_average() {
        let mut s = Statistic::new(true);
        s.add_timed(1, 0.25);
        s.add_timed(1, 0.75);
        assert_eq!(s.total_count, 2);
        assert!((s.avg_time(1).unwrap() - 0.5).abs() < 1e-9);
    }
}
