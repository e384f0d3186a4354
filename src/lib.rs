/*!
# Incremental property-directed reachability over SAT

`ipdr` proves or refutes safety properties of two families of finite
transition systems by IC3/PDR: the reversible pebble game on a DAG and the
N-process Peterson mutual-exclusion protocol. A run either produces an
inductive invariant (the property holds in every reachable state) or a
counter-example trace from the initial state to a violation.

On top of a single PDR run, the incremental driver re-runs the engine under
a walking constraint value (the pebble bound, or the number of active
processes), reusing the frame sequence between runs to locate the optimum.

```plain
$ ipdr --mode ipdr --tactic relax --pebbles 1 pebbling circuit.bench
PDR start: 1 pebbles
invariant at F_3 (0.004s)
...
found optimum: 5
```

The SAT backend is [varisat](https://docs.rs/varisat); cardinality
constraints are sequential-counter encoded, and removable solver regions
are emulated with activation literals.
*/
/// Crate `bounded` unrolls the pebbling relation for bounded strategy search.
pub mod bounded;
/// Crate `cnf` provides formula terms, Tseitin conversion and cardinality.
pub mod cnf;
/// Crate `config` provides the run configuration and CLI.
pub mod config;
/// Crate `dag` provides the pebbling graphs and the `.bench` parser.
pub mod dag;
/// Crate `frames` manages the frame sequence and its solvers.
pub mod frames;
/// Crate `generalize` implements inductive generalization (MIC and down).
pub mod generalize;
/// Crate `ipdr` drives incremental runs over a changing constraint.
pub mod ipdr;
/// Crate `logger` provides user output channels and owns the statistics.
pub mod logger;
/// Crate `obligation` provides proof obligations and trace states.
pub mod obligation;
/// Crate `pdr` is the property-directed reachability engine.
pub mod pdr;
/// Crate `pebbling` encodes the reversible pebble game.
pub mod pebbling;
/// Crate `peterson` encodes the Peterson protocol.
pub mod peterson;
/// Crate `result` represents outcomes, traces and run summaries.
pub mod result;
/// Crate `solver` wraps the SAT backend with retractable regions.
pub mod solver;
/// Crate `stats` collects per-level counters and timers.
pub mod stats;
/// Crate `ts` is the transition-system interface.
pub mod ts;
/// Crate `types` provides cubes, clauses and the error type.
pub mod types;
/// Crate `vars` provides the primed variable layer.
pub mod vars;
