//! Directed acyclic graphs for the pebble game, with a `.bench` netlist
//! parser. Inputs are kept apart from game nodes: a leaf wire costs nothing
//! to pebble, so edges from inputs do not constrain moves.
use crate::types::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

#[derive(Debug, Default)]
pub struct Dag {
    pub name: String,
    input: BTreeSet<String>,
    nodes: BTreeSet<String>,
    output: BTreeSet<String>,
    children: BTreeMap<String, Vec<String>>,
    n_edges: usize,
    n_input_edges: usize,
}

impl Dag {
    pub fn new(name: &str) -> Dag {
        Dag {
            name: name.to_string(),
            ..Dag::default()
        }
    }

    pub fn add_input(&mut self, name: &str) {
        self.input.insert(name.to_string());
    }

    pub fn add_node(&mut self, name: &str) {
        self.nodes.insert(name.to_string());
    }

    pub fn add_output(&mut self, name: &str) -> Result<()> {
        if !self.nodes.contains(name) {
            return Err(Error::Input(format!(
                "output {} is not a node of dag {}",
                name, self.name
            )));
        }
        self.output.insert(name.to_string());
        Ok(())
    }

    /// Edges `from[i] → to`. Operands that are inputs are recorded apart
    /// and do not become pebble preconditions.
    pub fn add_edges_to(&mut self, from: &[String], to: &str) -> Result<()> {
        for f in from {
            if self.input.contains(f) {
                self.n_input_edges += 1;
            } else if self.nodes.contains(f) {
                self.children
                    .entry(to.to_string())
                    .or_default()
                    .push(f.clone());
                self.n_edges += 1;
            } else {
                return Err(Error::Input(format!(
                    "operand {} of {} is neither an input nor a node",
                    f, to
                )));
            }
        }
        Ok(())
    }

    /// Fan-in nodes of `name` (inputs excluded).
    pub fn children(&self, name: &str) -> &[String] {
        self.children.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &String> {
        self.nodes.iter()
    }

    pub fn is_output(&self, name: &str) -> bool {
        self.output.contains(name)
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_outputs(&self) -> usize {
        self.output.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "dag {}: {} inputs, {} nodes ({} outputs), {} edges ({} from inputs)",
            self.name,
            self.input.len(),
            self.nodes.len(),
            self.output.len(),
            self.n_edges + self.n_input_edges,
            self.n_input_edges
        )
    }

    pub fn from_bench_file(path: &Path) -> Result<Dag> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Input(format!("cannot read {}: {}", path.display(), e)))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bench".to_string());
        Dag::from_bench(&name, &text)
    }

    /// Parse the `.bench` netlist format: `INPUT(x)`, `OUTPUT(x)` and gate
    /// lines `g = OP(a, b, …)`; `#` starts a comment.
    pub fn from_bench(name: &str, text: &str) -> Result<Dag> {
        let mut dag = Dag::new(name);
        let mut outputs: Vec<String> = Vec::new();
        let mut gates: Vec<(String, Vec<String>)> = Vec::new();

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let bad = |what: &str| {
                Error::Input(format!("{}: line {}: {}", name, lineno + 1, what))
            };
            if let Some(rest) = line.strip_prefix("INPUT") {
                dag.add_input(parse_parens(rest).ok_or_else(|| bad("malformed INPUT"))?);
            } else if let Some(rest) = line.strip_prefix("OUTPUT") {
                outputs.push(
                    parse_parens(rest)
                        .ok_or_else(|| bad("malformed OUTPUT"))?
                        .to_string(),
                );
            } else if let Some((lhs, rhs)) = line.split_once('=') {
                let target = lhs.trim().to_string();
                let rhs = rhs.trim();
                let open = rhs.find('(').ok_or_else(|| bad("malformed gate"))?;
                let inner = rhs[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| bad("malformed gate"))?;
                let operands: Vec<String> = inner
                    .split(',')
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .collect();
                if operands.is_empty() {
                    return Err(bad("gate without operands"));
                }
                gates.push((target, operands));
            } else {
                return Err(bad("unrecognized line"));
            }
        }

        for (g, _) in &gates {
            dag.add_node(g);
        }
        for (g, operands) in &gates {
            dag.add_edges_to(operands, g)?;
        }
        for o in &outputs {
            dag.add_output(o)?;
        }
        Ok(dag)
    }
}

fn parse_parens(s: &str) -> Option<&str> {
    let s = s.trim();
    let inner = s.strip_prefix('(')?.strip_suffix(')')?.trim();
    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}

impl fmt::Display for Dag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for n in &self.nodes {
            writeln!(f, "  {} <- [{}]", n, self.children(n).join(", "))?;
        }
        Ok(())
    }
}

/// The three-node chain used throughout the test suite: a → b → c with
/// output c.
pub fn chain(names: &[&str]) -> Dag {
    let mut dag = Dag::new("chain");
    for n in names {
        dag.add_node(n);
    }
    for w in names.windows(2) {
        dag.add_edges_to(&[w[0].to_string()], w[1]).unwrap();
    }
    if let Some(last) = names.last() {
        dag.add_output(last).unwrap();
    }
    dag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_small_bench() {
        let text = "\
# two-gate circuit
INPUT(i0)
INPUT(i1)
OUTPUT(g1)
g0 = AND(i0, i1)
g1 = NOT(g0)
";
        let dag = Dag::from_bench("tiny", text).unwrap();
        assert_eq!(dag.n_nodes(), 2);
        assert!(dag.is_output("g1"));
        assert_eq!(dag.children("g1"), &["g0".to_string()]);
        // g0 only depends on inputs, which are free
        assert!(dag.children("g0").is_empty());
    }

    #[test]
    fn rejects_undefined_operands() {
        let text = "g0 = AND(phantom)\n";
        assert!(Dag::from_bench("broken", text).is_err());
    }

    #[test]
    fn rejects_outputs_that_are_not_nodes() {
        let text = "INPUT(i)\nOUTPUT(nope)\ng = NOT(i)\n";
        assert!(Dag::from_bench("broken", text).is_err());
    }

    #[test]
    fn chain_builder_links_successors() {
        let dag = chain(&["a", "b", "c"]);
        assert_eq!(dag.n_nodes(), 3);
        assert!(dag.is_output("c"));
        assert_eq!(dag.children("b"), &["a".to_string()]);
        assert_eq!(dag.children("c"), &["b".to_string()]);
    }
}
