//! End-to-end Peterson scenarios: mutual exclusion proved for the correct
//! protocol, a violation trace for the broken set-last variant, and the
//! context-switch bound.
use ipdr::config::{Context, Tactic};
use ipdr::ipdr::Ipdr;
use ipdr::logger::{Logger, OutLvl};
use ipdr::pdr::Pdr;
use ipdr::peterson::PetersonTs;
use ipdr::result::Trace;
use ipdr::solver::Solver;
use ipdr::ts::TransitionSystemIF;
use ipdr::vars::Time;

fn silent() -> Logger {
    Logger::new(OutLvl::Silent, None).unwrap()
}

/// Replay a trace against an independently built copy of the protocol.
fn assert_valid_run(build: impl Fn(&mut Context) -> PetersonTs, trace: &Trace) {
    let mut ctx = Context::new(false, 0, 3);
    let ts = build(&mut ctx);

    assert_eq!(&trace.states[0], ts.initial(), "trace must start at I");

    let mut base = ts.bad_defs().to_vec();
    base.extend_from_slice(ts.transition());
    let mut step = Solver::new(&mut ctx.vars, 0, &base, ts.constraint());
    for pair in trace.states.windows(2) {
        let mut assumptions = pair[0].lits().to_vec();
        assumptions.extend(ctx.vars.prime_cube(&pair[1]));
        assert!(
            step.check(&assumptions).unwrap(),
            "illegal protocol step {} -> {}",
            ts.extract_state(&pair[0], Time::Curr),
            ts.extract_state(&pair[1], Time::Curr)
        );
    }

    // the final state exhibits two processes in the critical section
    let last = ts.extract_state(trace.states.last().unwrap(), Time::Curr);
    let holders = last.pc.iter().filter(|pc| **pc == 4).count();
    assert!(holders >= 2, "final state {} is not a violation", last);
}

#[test]
fn one_process_is_trivially_safe() {
    let mut ctx = Context::new(false, 0, 3);
    let ts = PetersonTs::new(&mut ctx.vars, 1, 1, None);
    let mut pdr = Pdr::new(ctx, ts, silent());
    let res = pdr.run().unwrap();
    assert_eq!(res.invariant_level(), Some(1));
}

#[test]
fn two_processes_exclude_each_other() {
    for delta in [false, true] {
        let mut ctx = Context::new(delta, 0, 3);
        let ts = PetersonTs::new(&mut ctx.vars, 2, 2, None);
        let mut pdr = Pdr::new(ctx, ts, silent());
        let res = pdr.run().unwrap();
        assert!(res.has_invariant(), "delta={}", delta);
    }
}

#[test]
fn skipping_the_last_write_breaks_the_lock() {
    for delta in [false, true] {
        let mut ctx = Context::new(delta, 0, 3);
        let ts = PetersonTs::faulty(&mut ctx.vars, 2, 2, None);
        let mut pdr = Pdr::new(ctx, ts, silent());
        let res = pdr.run().unwrap();
        let trace = res.trace().expect("the faulty variant admits a violation");
        assert_valid_run(|ctx| PetersonTs::faulty(&mut ctx.vars, 2, 2, None), trace);
    }
}

#[test]
fn relax_reports_no_optimum_for_the_correct_protocol() {
    let mut ctx = Context::new(false, 0, 3);
    let ts = PetersonTs::new(&mut ctx.vars, 1, 2, None);
    let mut driver = Ipdr::new(Pdr::new(ctx, ts, silent()), false);
    let total = driver.run(Tactic::Relax, 1).unwrap();
    assert_eq!(total.optimum, None);
    assert_eq!(total.runs.len(), 2);
    assert!(total.runs.iter().all(|r| r.has_invariant()));
}

#[test]
fn relax_pins_the_faulty_variant_to_two_processes() {
    let mut ctx = Context::new(false, 0, 3);
    let ts = PetersonTs::faulty(&mut ctx.vars, 1, 2, None);
    let mut driver = Ipdr::new(Pdr::new(ctx, ts, silent()), false);
    let total = driver.run(Tactic::Relax, 1).unwrap();
    assert_eq!(total.optimum, Some(2));
    assert!(total.runs[0].has_invariant());
    assert!(total.runs[1].has_trace());
}

#[test]
fn forbidding_context_switches_serializes_the_schedule() {
    // with no switch allowed only the first process ever runs, so even the
    // broken variant keeps exclusion
    let mut ctx = Context::new(false, 0, 3);
    let ts = PetersonTs::faulty(&mut ctx.vars, 2, 2, Some(0));
    let mut pdr = Pdr::new(ctx, ts, silent());
    assert!(pdr.run().unwrap().has_invariant());
}

#[test]
fn a_single_switch_is_enough_to_collide() {
    let mut ctx = Context::new(false, 0, 3);
    let ts = PetersonTs::faulty(&mut ctx.vars, 2, 2, Some(1));
    let mut pdr = Pdr::new(ctx, ts, silent());
    let res = pdr.run().unwrap();
    assert!(res.has_trace());
}
