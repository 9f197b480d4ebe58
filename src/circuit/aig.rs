//! Structurally hashed And-Inverter Graph
//!
//! Every gate is lowered to two-input ANDs with complemented edges. Building
//! the same AND twice returns the same node, and trivial cases (constants,
//! identical or complementary operands) never create a node at all.

use super::lit::{Lit, Var};
use std::collections::HashMap;

/// A node of the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    /// Node 0, the constant false
    Const,
    /// Primary input, carrying its position in the input list
    Input(u32),
    /// AND of two literals, stored with `left <= right`
    And(Lit, Lit),
}

/// And-Inverter Graph with structural hashing
#[derive(Debug, Clone)]
pub struct Aig {
    nodes: Vec<Node>,
    strash: HashMap<(Lit, Lit), Var>,
    inputs: Vec<Var>,
    input_names: Vec<String>,
}

impl Default for Aig {
    fn default() -> Self {
        Self::new()
    }
}

impl Aig {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::Const],
            strash: HashMap::new(),
            inputs: Vec::new(),
            input_names: Vec::new(),
        }
    }

    /// Create a named primary input and return its positive literal
    pub fn add_input(&mut self, name: impl Into<String>) -> Lit {
        let var = self.nodes.len() as Var;
        let index = self.inputs.len() as u32;
        self.nodes.push(Node::Input(index));
        self.inputs.push(var);
        self.input_names.push(name.into());
        Lit::new(var, false)
    }

    /// Total nodes including the constant and the inputs
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn and_count(&self) -> usize {
        self.nodes.len() - 1 - self.inputs.len()
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn node(&self, var: Var) -> Node {
        self.nodes[var as usize]
    }

    pub fn inputs(&self) -> &[Var] {
        &self.inputs
    }

    pub fn input_name(&self, index: usize) -> &str {
        &self.input_names[index]
    }

    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }

    pub fn and(&mut self, a: Lit, b: Lit) -> Lit {
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        if a == Lit::FALSE {
            return Lit::FALSE;
        }
        if a == Lit::TRUE || a == b {
            return b;
        }
        if a == !b {
            return Lit::FALSE;
        }
        if let Some(&var) = self.strash.get(&(a, b)) {
            return Lit::new(var, false);
        }
        let var = self.nodes.len() as Var;
        self.nodes.push(Node::And(a, b));
        self.strash.insert((a, b), var);
        Lit::new(var, false)
    }

    pub fn or(&mut self, a: Lit, b: Lit) -> Lit {
        !self.and(!a, !b)
    }

    pub fn xor(&mut self, a: Lit, b: Lit) -> Lit {
        if let Some(v) = a.const_value() {
            return b.negate_if(v);
        }
        if let Some(v) = b.const_value() {
            return a.negate_if(v);
        }
        if a == b {
            return Lit::FALSE;
        }
        if a == !b {
            return Lit::TRUE;
        }
        // Complemented operands share the node of their regular form
        let flip = a.is_negated() != b.is_negated();
        let (a, b) = (a.regular(), b.regular());
        let left = self.and(a, !b);
        let right = self.and(!a, b);
        self.or(left, right).negate_if(flip)
    }

    pub fn xnor(&mut self, a: Lit, b: Lit) -> Lit {
        !self.xor(a, b)
    }

    /// `c ? t : f`
    pub fn mux(&mut self, c: Lit, t: Lit, f: Lit) -> Lit {
        if let Some(v) = c.const_value() {
            return if v { t } else { f };
        }
        if t == f {
            return t;
        }
        if t == !f {
            return self.xor(c, f);
        }
        match (t.const_value(), f.const_value()) {
            (Some(true), _) => return self.or(c, f),
            (Some(false), _) => return self.and(!c, f),
            (_, Some(true)) => return self.or(!c, t),
            (_, Some(false)) => return self.and(c, t),
            _ => {}
        }
        if c == t {
            return self.or(c, f);
        }
        if c == !t {
            return self.and(!c, f);
        }
        if c == f {
            return self.and(c, t);
        }
        if c == !f {
            return self.or(!c, t);
        }
        let then_part = self.and(c, t);
        let else_part = self.and(!c, f);
        self.or(then_part, else_part)
    }

    /// Bit-parallel simulation: one 64-pattern word per input, one word per node out
    pub fn simulate(&self, input_words: &[u64]) -> Vec<u64> {
        assert_eq!(
            input_words.len(),
            self.inputs.len(),
            "simulation needs one word per input"
        );
        let mut values = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let word = match *node {
                Node::Const => 0,
                Node::Input(index) => input_words[index as usize],
                Node::And(a, b) => lit_word(&values, a) & lit_word(&values, b),
            };
            values.push(word);
        }
        values
    }

    /// Evaluate literals under a single input assignment
    pub fn evaluate(&self, lits: &[Lit], assignment: &[bool]) -> Vec<bool> {
        let words: Vec<u64> = assignment
            .iter()
            .map(|&b| if b { u64::MAX } else { 0 })
            .collect();
        let values = self.simulate(&words);
        lits.iter().map(|&l| lit_word(&values, l) & 1 == 1).collect()
    }

    /// Mark the transitive fan-in of `roots`, indexed by var
    pub fn cone(&self, roots: impl IntoIterator<Item = Lit>) -> Vec<bool> {
        let mut marked = vec![false; self.nodes.len()];
        let mut stack: Vec<Var> = roots.into_iter().map(Lit::var).collect();
        while let Some(var) = stack.pop() {
            if std::mem::replace(&mut marked[var as usize], true) {
                continue;
            }
            if let Node::And(a, b) = self.nodes[var as usize] {
                stack.push(a.var());
                stack.push(b.var());
            }
        }
        marked
    }
}

/// Simulation word of a literal given per-node words
pub fn lit_word(values: &[u64], lit: Lit) -> u64 {
    let word = values[lit.var() as usize];
    if lit.is_negated() {
        !word
    } else {
        word
    }
}
