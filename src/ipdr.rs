//! The incremental driver: repeated engine runs over a walking constraint
//! value, reusing frames between runs. The constraint's meaning is opaque
//! here; the transition system only reports its bounds and the direction
//! of each change.
use crate::config::Tactic;
use crate::pdr::Pdr;
use crate::result::{IpdrResult, PdrResult};
use crate::ts::TransitionSystemIF;
use crate::types::{Error, Result};
use std::time::Instant;

pub struct Ipdr<T: TransitionSystemIF> {
    pdr: Pdr<T>,
    /// Control runs rebuild everything between constraint values, giving
    /// the baseline the reuse strategies are measured against.
    control: bool,
}

impl<T: TransitionSystemIF> Ipdr<T> {
    pub fn new(pdr: Pdr<T>, control: bool) -> Ipdr<T> {
        Ipdr { pdr, control }
    }

    pub fn pdr(&self) -> &Pdr<T> {
        &self.pdr
    }

    pub fn pdr_mut(&mut self) -> &mut Pdr<T> {
        &mut self.pdr
    }

    pub fn into_pdr(self) -> Pdr<T> {
        self.pdr
    }

    /// Pick the first constraint value for a tactic when the user gave
    /// none.
    pub fn start_value(&self, tactic: Tactic, requested: Option<u32>) -> u32 {
        if let Some(n) = requested {
            return n;
        }
        let ts = self.pdr.ts();
        match tactic {
            Tactic::Relax | Tactic::IncJumpTest | Tactic::IncOneTest => ts.constraint_min(),
            Tactic::Constrain | Tactic::Basic | Tactic::BinarySearch => ts.constraint_max(),
        }
    }

    pub fn run(&mut self, tactic: Tactic, start: u32) -> Result<IpdrResult> {
        match tactic {
            Tactic::Basic => self.basic(start),
            Tactic::Relax => self.relax(start),
            Tactic::Constrain => self.constrain(start),
            Tactic::BinarySearch => self.binary_search(),
            Tactic::IncJumpTest => self.relax_jump(start, 10),
            Tactic::IncOneTest => self.relax_jump(start, 1),
        }
    }

    fn basic(&mut self, start: u32) -> Result<IpdrResult> {
        let mut total = IpdrResult::new();
        self.pdr.basic_reset(start);
        let res = self.pdr.run()?;
        if res.has_trace() {
            total.optimum = Some(start);
        }
        total.add(res);
        Ok(total)
    }

    /// Walk the constraint upward; the first trace marks the optimum.
    fn relax(&mut self, start: u32) -> Result<IpdrResult> {
        self.pdr
            .logger_mut()
            .and_whisper(format!("incremental run: relax from {}", start));
        let max = self.pdr.ts().constraint_max();
        let mut total = IpdrResult::new();

        let mut n = start;
        self.pdr.basic_reset(n);
        total.add(self.pdr.run()?);

        while total.last().map_or(false, PdrResult::has_invariant) && n < max {
            n += 1;
            if self.control {
                self.pdr.basic_reset(n);
            } else {
                self.pdr.relax_reset(n)?;
            }
            total.add(self.pdr.run()?);
        }

        if total.last().map_or(false, PdrResult::has_trace) {
            total.optimum = Some(n);
            self.pdr
                .logger_mut()
                .and_whisper(format!("found optimum: {}", n));
        } else {
            self.pdr
                .logger_mut()
                .and_whisper("no optimum exists".to_string());
        }
        Ok(total)
    }

    /// Walk the constraint downward; the last value that still admits a
    /// trace is the optimum. A trace's own footprint shortcuts the walk.
    fn constrain(&mut self, start: u32) -> Result<IpdrResult> {
        self.pdr
            .logger_mut()
            .and_whisper(format!("incremental run: constrain from {}", start));
        let min = self.pdr.ts().constraint_min();
        let mut total = IpdrResult::new();

        let mut n = start;
        self.pdr.basic_reset(n);
        total.add(self.pdr.run()?);
        n = Self::jump_down(&total, n);

        while total.last().map_or(false, PdrResult::has_trace) && n > min {
            n -= 1;
            if self.control {
                self.pdr.basic_reset(n);
                total.add(self.pdr.run()?);
            } else {
                let start_t = Instant::now();
                match self.pdr.constrain_reset(n)? {
                    Some(res) => {
                        // the carried frames already decide this value
                        total.add(res.with_duration(start_t.elapsed().as_secs_f64()));
                    }
                    None => {
                        let overhead = start_t.elapsed().as_secs_f64();
                        let mut res = self.pdr.run()?;
                        res.time += overhead;
                        total.add(res);
                    }
                }
            }
            n = Self::jump_down(&total, n);
        }

        let any_trace = total.runs.iter().any(PdrResult::has_trace);
        if !any_trace {
            self.pdr
                .logger_mut()
                .and_whisper("no optimum exists".to_string());
        } else if total.last().map_or(false, PdrResult::has_invariant) {
            total.optimum = Some(n + 1);
            self.pdr
                .logger_mut()
                .and_whisper(format!("found optimum: {}", n + 1));
        } else {
            // every value down to the floor admits a trace
            total.optimum = Some(n);
            self.pdr
                .logger_mut()
                .and_whisper(format!("found optimum: {}", n));
        }
        Ok(total)
    }

    fn jump_down(total: &IpdrResult, n: u32) -> u32 {
        match total.last().and_then(PdrResult::trace) {
            Some(t) => n.min(t.marked as u32),
            None => n,
        }
    }

    /// Bisect the constraint range with independent runs.
    fn binary_search(&mut self) -> Result<IpdrResult> {
        let mut lo = self.pdr.ts().constraint_min();
        let mut hi = self.pdr.ts().constraint_max();
        self.pdr
            .logger_mut()
            .and_whisper(format!("incremental run: bisect {}..{}", lo, hi));
        let mut total = IpdrResult::new();

        while lo <= hi {
            let mid = lo + (hi - lo) / 2;
            self.pdr.basic_reset(mid);
            let res = self.pdr.run()?;
            let found_trace = res.has_trace();
            total.add(res);
            if found_trace {
                total.optimum = Some(mid);
                match mid.checked_sub(1) {
                    Some(next_hi) if next_hi >= lo => hi = next_hi,
                    _ => break,
                }
            } else {
                lo = mid + 1;
            }
        }
        Ok(total)
    }

    /// One basic run, then a single relaxed jump; measures frame reuse
    /// rather than establishing an optimum.
    fn relax_jump(&mut self, start: u32, step: u32) -> Result<IpdrResult> {
        self.pdr
            .logger_mut()
            .and_whisper(format!("relax jump: start {} step {}", start, step));
        let mut total = IpdrResult::new();
        self.pdr.basic_reset(start);
        total.add(self.pdr.run()?);

        let next = start + step;
        if next <= self.pdr.ts().constraint_max() {
            self.pdr.relax_reset(next)?;
            total.add(self.pdr.run()?);
        } else {
            return Err(Error::Input(format!(
                "jump to {} exceeds the constraint maximum {}",
                next,
                self.pdr.ts().constraint_max()
            )));
        }
        Ok(total)
    }
}
