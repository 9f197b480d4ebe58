//! Circuit backend: structurally hashed AIG, SAT oracle, probes and sweeping
//!
//! `Circuit` is the single handle through which the rest of the crate builds
//! gates and asks satisfiability questions. It owns the path-condition stack
//! so that constant checks are always answered relative to the branch being
//! explored.

pub mod aig;
pub mod aiger;
pub mod lit;
pub mod probe;
pub mod sat;
pub mod sweep;

pub use aig::Aig;
pub use lit::{Lit, Var};
pub use probe::ProbeId;
pub use sweep::SweepReport;

use crate::config::SweepConfig;
use crate::error::Result;
use probe::ProbeTable;
use sat::SatOracle;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A literal held at a fixed value for the duration of a branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition {
    pub lit: Lit,
    pub value: bool,
}

impl Condition {
    /// The literal that is true exactly when the condition holds
    pub fn assumption(self) -> Lit {
        self.lit.negate_if(!self.value)
    }
}

#[derive(Debug, Default)]
pub struct Circuit {
    aig: Aig,
    sat: SatOracle,
    probes: ProbeTable,
    conditions: Vec<Condition>,
    outputs: Vec<(ProbeId, String)>,
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn aig(&self) -> &Aig {
        &self.aig
    }

    pub fn node_count(&self) -> usize {
        self.aig.node_count()
    }

    pub fn and_count(&self) -> usize {
        self.aig.and_count()
    }

    pub fn new_input(&mut self, name: impl Into<String>) -> Lit {
        self.aig.add_input(name)
    }

    pub fn and(&mut self, a: Lit, b: Lit) -> Lit {
        self.aig.and(a, b)
    }

    pub fn or(&mut self, a: Lit, b: Lit) -> Lit {
        self.aig.or(a, b)
    }

    pub fn xor(&mut self, a: Lit, b: Lit) -> Lit {
        self.aig.xor(a, b)
    }

    pub fn xnor(&mut self, a: Lit, b: Lit) -> Lit {
        self.aig.xnor(a, b)
    }

    pub fn mux(&mut self, c: Lit, t: Lit, f: Lit) -> Lit {
        self.aig.mux(c, t, f)
    }

    pub fn not(&self, a: Lit) -> Lit {
        !a
    }

    /// Constant value without consulting the SAT oracle
    pub fn constant_value(&self, lit: Lit) -> Option<bool> {
        lit.const_value()
    }

    /// Whether `lit` equals `value` in every model of the condition stack
    pub fn is_provably_constant(&mut self, lit: Lit, value: bool) -> bool {
        if let Some(v) = lit.const_value() {
            return v == value;
        }
        self.push_condition(lit, !value);
        let unsat = self.conditions_unsat();
        self.pop_condition();
        unsat == Some(true)
    }

    pub fn push_condition(&mut self, lit: Lit, value: bool) {
        self.conditions.push(Condition { lit, value });
    }

    pub fn pop_condition(&mut self) -> Condition {
        match self.conditions.pop() {
            Some(condition) => condition,
            None => panic!("path-condition stack underflow"),
        }
    }

    pub fn condition_depth(&self) -> usize {
        self.conditions.len()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn assumptions(&self) -> Vec<Lit> {
        self.conditions.iter().map(|c| c.assumption()).collect()
    }

    /// `Some(true)` if no assignment satisfies every stacked condition,
    /// `None` if the oracle could not decide
    pub fn conditions_unsat(&mut self) -> Option<bool> {
        let assumptions = self.assumptions();
        if assumptions.contains(&Lit::FALSE) {
            return Some(true);
        }
        if assumptions.iter().all(|l| *l == Lit::TRUE) {
            return Some(false);
        }
        self.sat.solve(&self.aig, &assumptions).map(|sat| !sat)
    }

    /// Named input values satisfying the condition stack
    pub fn counterexample(&mut self) -> Option<Vec<(String, bool)>> {
        let assumptions = self.assumptions();
        if self.sat.solve(&self.aig, &assumptions) != Some(true) {
            return None;
        }
        let values = self.sat.model_inputs(&self.aig)?;
        Some(
            self.aig
                .input_names()
                .iter()
                .cloned()
                .zip(values)
                .collect(),
        )
    }

    pub fn create_probe(&mut self, lit: Lit) -> ProbeId {
        self.probes.create(lit)
    }

    pub fn probe_lit(&self, id: ProbeId) -> Lit {
        self.probes.lit(id)
    }

    pub fn update_probe(&mut self, id: ProbeId, lit: Lit) {
        self.probes.update(id, lit)
    }

    pub fn delete_probe(&mut self, id: ProbeId) {
        self.probes.delete(id)
    }

    pub fn live_probes(&self) -> usize {
        self.probes.live()
    }

    /// Minimize the graph down to the cone of the live probes.
    ///
    /// `roots` must be live probes; every other live probe, every output and
    /// every stacked condition survives as well. Literals not reachable from
    /// one of those are invalid afterwards.
    pub fn sweep(&mut self, roots: &[ProbeId], config: &SweepConfig) -> Result<SweepReport> {
        let mut keep: Vec<Lit> = roots.iter().map(|&id| self.probes.lit(id)).collect();
        keep.extend(self.probes.lits());
        keep.extend(self.conditions.iter().map(|c| c.lit));

        let (fresh, remap, report) = sweep::sweep(&self.aig, &keep, config)?;
        let mut failure = None;
        self.probes.remap(|lit| match remap.apply(lit) {
            Ok(new) => new,
            Err(err) => {
                failure.get_or_insert(err);
                lit
            }
        });
        for condition in &mut self.conditions {
            condition.lit = remap.apply(condition.lit)?;
        }
        if let Some(err) = failure {
            return Err(err);
        }
        self.aig = fresh;
        self.sat.reset();
        tracing::debug!(
            "sweep: {} -> {} nodes, {} merged, {} SAT calls",
            report.nodes_before,
            report.nodes_after,
            report.merged,
            report.sat_calls
        );
        Ok(report)
    }

    pub fn mark_output(&mut self, lit: Lit, name: impl Into<String>) {
        let probe = self.probes.create(lit);
        self.outputs.push((probe, name.into()));
    }

    /// Drop the `count` most recently marked outputs
    pub fn remove_outputs(&mut self, count: usize) {
        for _ in 0..count {
            match self.outputs.pop() {
                Some((probe, _)) => self.probes.delete(probe),
                None => panic!("no output left to remove"),
            }
        }
    }

    pub fn outputs(&self) -> Vec<(Lit, String)> {
        self.outputs
            .iter()
            .map(|(probe, name)| (self.probes.lit(*probe), name.clone()))
            .collect()
    }

    pub fn write_aiger<W: Write>(&self, out: &mut W) -> Result<()> {
        aiger::write_aiger(&self.aig, &self.outputs(), out)
    }

    pub fn export_aiger(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_aiger(&mut out)?;
        out.flush()?;
        Ok(())
    }

    /// Evaluate literals under an assignment of every input, in input order
    pub fn evaluate(&self, lits: &[Lit], assignment: &[bool]) -> Vec<bool> {
        self.aig.evaluate(lits, assignment)
    }
}
