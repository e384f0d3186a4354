use clap::Parser;
use ipdr::bounded::BoundedPebbling;
use ipdr::config::{Config, Mode, ModelArg};
use ipdr::dag::Dag;
use ipdr::ipdr::Ipdr;
use ipdr::logger::Logger;
use ipdr::pdr::Pdr;
use ipdr::pebbling::PebblingTs;
use ipdr::peterson::PetersonTs;
use ipdr::result::{self, IpdrResult, PdrResult};
use ipdr::ts::TransitionSystemIF;
use ipdr::types::{Error, Result};
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();
    let cfg = Config::parse();
    match dispatch(&cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ Error::Input(_)) => {
            eprintln!("{}", e);
            ExitCode::from(1)
        }
        Err(e @ Error::SolverUnknown { .. }) => {
            eprintln!("{}", e);
            ExitCode::from(2)
        }
    }
}

fn dispatch(cfg: &Config) -> Result<()> {
    match cfg.experiment {
        Some(reps) if reps > 1 => experiment(cfg, reps),
        _ => run_once(cfg).map(|_| ()),
    }
}

/// Repeat the configured run and summarize the wall-clock times.
fn experiment(cfg: &Config, reps: u32) -> Result<()> {
    let mut times = Vec::with_capacity(reps as usize);
    for i in 0..reps {
        log::info!("experiment repetition {}/{}", i + 1, reps);
        times.push(run_once(cfg)?);
    }
    let mean = times.iter().sum::<f64>() / times.len() as f64;
    let var = times.iter().map(|t| (t - mean) * (t - mean)).sum::<f64>() / times.len() as f64;
    println!(
        "experiment over {} repetitions{}: mean {:.3}s, std dev {:.3}s",
        reps,
        if cfg.control { " (control)" } else { "" },
        mean,
        var.sqrt()
    );
    for (i, t) in times.iter().enumerate() {
        println!("  run {}: {:.3}s", i, t);
    }
    Ok(())
}

fn run_once(cfg: &Config) -> Result<f64> {
    match &cfg.model {
        ModelArg::Pebbling { file } => run_pebbling(cfg, file),
        ModelArg::Peterson {
            procs,
            max,
            switches,
        } => run_peterson(cfg, *procs, max.unwrap_or(*procs), *switches),
    }
}

fn run_pebbling(cfg: &Config, file: &std::path::Path) -> Result<f64> {
    let dag = Dag::from_bench_file(file)?;
    let floor = (dag.n_outputs() as u32).max(1);

    if cfg.mode == Mode::Bounded {
        let mut log = Logger::new(cfg.out_lvl(), cfg.out.as_deref())?;
        let bounded = BoundedPebbling::new(dag, cfg.max_depth);
        let res = bounded.find_for(cfg.pebbles.unwrap_or(floor), &mut log)?;
        if let Some(strategy) = &res.strategy {
            log.whisper(format!(
                "strategy with {} pebbles, {} steps:",
                res.pebbles.unwrap_or(0),
                strategy.len() - 1
            ));
            for (i, marking) in strategy.iter().enumerate() {
                log.whisper(format!("  {:>3} [{}]", i, marking.join(", ")));
            }
        }
        log.flush();
        return Ok(res.time);
    }

    let mut ctx = cfg.context();
    let mut ts = PebblingTs::new(&mut ctx.vars, dag, cfg.tseytin);
    if cfg.show_only {
        println!("{}", ts.show(&ctx.vars));
        return Ok(0.0);
    }
    let start = cfg.pebbles.unwrap_or_else(|| ts.constraint_max());
    ts.constrain(&mut ctx.vars, start);
    let log = Logger::new(cfg.out_lvl(), cfg.out.as_deref())?;
    let pdr = Pdr::new(ctx, ts, log);
    finish(cfg, pdr, cfg.pebbles)
}

fn run_peterson(cfg: &Config, procs: u32, max: u32, switches: Option<u32>) -> Result<f64> {
    if cfg.mode == Mode::Bounded {
        return Err(Error::Input(
            "bounded mode supports the pebbling model only".to_string(),
        ));
    }
    if procs < 1 || procs > max {
        return Err(Error::Input(format!(
            "process count {} outside 1..={}",
            procs, max
        )));
    }
    let mut ctx = cfg.context();
    let ts = PetersonTs::new(&mut ctx.vars, procs, max, switches);
    if cfg.show_only {
        println!("{}", ts.show(&ctx.vars));
        return Ok(0.0);
    }
    let log = Logger::new(cfg.out_lvl(), cfg.out.as_deref())?;
    let pdr = Pdr::new(ctx, ts, log);
    finish(cfg, pdr, Some(procs))
}

fn finish<T: TransitionSystemIF>(
    cfg: &Config,
    mut pdr: Pdr<T>,
    requested: Option<u32>,
) -> Result<f64> {
    match cfg.mode {
        Mode::Pdr => {
            let res = pdr.run()?;
            report_single(&mut pdr, &res);
            Ok(res.time)
        }
        Mode::Ipdr => {
            let mut driver = Ipdr::new(pdr, cfg.control);
            let start = driver.start_value(cfg.tactic, requested);
            let total = driver.run(cfg.tactic, start)?;
            report_incremental(driver.pdr_mut(), &total);
            Ok(total.total_time())
        }
        Mode::Bounded => unreachable!("bounded mode is dispatched earlier"),
    }
}

fn report_single<T: TransitionSystemIF>(pdr: &mut Pdr<T>, res: &PdrResult) {
    if let Some(trace) = res.trace() {
        let table = result::trace_table(trace, pdr.pool());
        let described: Vec<String> = trace
            .states
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{:>3} {}", i, pdr.ts().describe_state(pdr.pool(), s)))
            .collect();
        let log = pdr.logger_mut();
        log.whisper(table);
        for line in described {
            log.show(line);
        }
    }
    let stats = pdr.logger_mut().stats.to_string();
    pdr.logger_mut().show(stats);
    pdr.logger_mut().flush();
}

fn report_incremental<T: TransitionSystemIF>(pdr: &mut Pdr<T>, total: &IpdrResult) {
    let mut tables = Vec::new();
    for res in &total.runs {
        if let Some(trace) = res.trace() {
            tables.push(format!(
                "trace under {}:\n{}",
                res.constraint
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                result::trace_table(trace, pdr.pool())
            ));
        }
    }
    let log = pdr.logger_mut();
    log.whisper(total.summary_table());
    log.whisper(total.end_result());
    for t in tables {
        log.show(t);
    }
    let stats = log.stats.to_string();
    log.show(stats);
    log.flush();
}
