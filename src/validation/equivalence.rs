//! Concrete/symbolic equivalence checking for the operation library
//!
//! Every operation is computed three ways: natively on concrete operands,
//! as a circuit over fresh inputs evaluated at the same operands, and by a
//! plain 128-bit reference model. All three must agree.

use super::random::{generate_edge_case_operands, generate_random_operands, mask128, RandomOperandConfig};
use crate::circuit::aig::lit_word;
use crate::circuit::Lit;
use crate::context::Context;
use crate::ops;
use crate::vector::Vector;
use std::fmt;

/// An operation under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Sdiv,
    Srem,
    And,
    Or,
    Xor,
    Nand,
    Nor,
    Xnor,
    Shl,
    Lshr,
    Ashr,
    Rotl,
    Rotr,
    Negate,
    Invert,
    Abs,
    Popcount,
    Equal,
    Ult,
    Ule,
    Slt,
    Sle,
    Carry,
    Scarry,
    Sborrow,
}

/// Result of an operation: a vector, or a single flag literal
#[derive(Debug)]
pub enum Outcome {
    Value(Vector),
    Flag(Lit),
}

impl Outcome {
    fn lits(&self) -> Vec<Lit> {
        match self {
            Outcome::Value(v) => v.lits(),
            Outcome::Flag(lit) => vec![*lit],
        }
    }

    fn constant(&self) -> Option<u128> {
        match self {
            Outcome::Value(v) => v.to_u128(),
            Outcome::Flag(lit) => lit.const_value().map(u128::from),
        }
    }

    fn release(self, cx: &mut Context) {
        if let Outcome::Value(v) = self {
            cx.release(v);
        }
    }
}

fn signed(v: u128, width: usize) -> i128 {
    if width >= 128 {
        v as i128
    } else {
        let shift = 128 - width;
        ((v << shift) as i128) >> shift
    }
}

/// Whether a signed result fits in `width` bits
fn fits_signed(value: Option<i128>, width: usize) -> bool {
    match value {
        None => false,
        Some(_) if width >= 128 => true,
        Some(v) => {
            let half = 1i128 << (width - 1);
            (-half..half).contains(&v)
        }
    }
}

impl Op {
    pub const ALL: [Op; 30] = [
        Op::Add,
        Op::Sub,
        Op::Mul,
        Op::Div,
        Op::Rem,
        Op::Sdiv,
        Op::Srem,
        Op::And,
        Op::Or,
        Op::Xor,
        Op::Nand,
        Op::Nor,
        Op::Xnor,
        Op::Shl,
        Op::Lshr,
        Op::Ashr,
        Op::Rotl,
        Op::Rotr,
        Op::Negate,
        Op::Invert,
        Op::Abs,
        Op::Popcount,
        Op::Equal,
        Op::Ult,
        Op::Ule,
        Op::Slt,
        Op::Sle,
        Op::Carry,
        Op::Scarry,
        Op::Sborrow,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Mul => "mul",
            Op::Div => "div",
            Op::Rem => "rem",
            Op::Sdiv => "sdiv",
            Op::Srem => "srem",
            Op::And => "and",
            Op::Or => "or",
            Op::Xor => "xor",
            Op::Nand => "nand",
            Op::Nor => "nor",
            Op::Xnor => "xnor",
            Op::Shl => "shl",
            Op::Lshr => "lshr",
            Op::Ashr => "ashr",
            Op::Rotl => "rotl",
            Op::Rotr => "rotr",
            Op::Negate => "negate",
            Op::Invert => "invert",
            Op::Abs => "abs",
            Op::Popcount => "popcount",
            Op::Equal => "equal",
            Op::Ult => "ult",
            Op::Ule => "ule",
            Op::Slt => "slt",
            Op::Sle => "sle",
            Op::Carry => "carry",
            Op::Scarry => "scarry",
            Op::Sborrow => "sborrow",
        }
    }

    /// Run the operation through the library; unary operations ignore `y`
    pub fn apply(self, cx: &mut Context, x: &Vector, y: &Vector) -> Outcome {
        use Outcome::{Flag, Value};
        match self {
            Op::Add => Value(ops::add(cx, x, y)),
            Op::Sub => Value(ops::sub(cx, x, y)),
            Op::Mul => Value(ops::mul(cx, x, y)),
            Op::Div => Value(ops::div(cx, x, y)),
            Op::Rem => Value(ops::rem(cx, x, y)),
            Op::Sdiv => Value(ops::sdiv(cx, x, y)),
            Op::Srem => Value(ops::srem(cx, x, y)),
            Op::And => Value(ops::and(cx, x, y)),
            Op::Or => Value(ops::or(cx, x, y)),
            Op::Xor => Value(ops::xor(cx, x, y)),
            Op::Nand => Value(ops::nand(cx, x, y)),
            Op::Nor => Value(ops::nor(cx, x, y)),
            Op::Xnor => Value(ops::xnor(cx, x, y)),
            Op::Shl => Value(ops::shl(cx, x, y)),
            Op::Lshr => Value(ops::lshr(cx, x, y)),
            Op::Ashr => Value(ops::ashr(cx, x, y)),
            Op::Rotl => Value(ops::rotl(cx, x, y)),
            Op::Rotr => Value(ops::rotr(cx, x, y)),
            Op::Negate => Value(ops::negate(cx, x)),
            Op::Invert => Value(ops::invert(cx, x)),
            Op::Abs => Value(ops::abs(cx, x)),
            Op::Popcount => Value(ops::popcount(cx, x)),
            Op::Equal => Flag(ops::equal(cx, x, y)),
            Op::Ult => Flag(ops::ult(cx, x, y)),
            Op::Ule => Flag(ops::ule(cx, x, y)),
            Op::Slt => Flag(ops::slt(cx, x, y)),
            Op::Sle => Flag(ops::sle(cx, x, y)),
            Op::Carry => Flag(ops::carry(cx, x, y)),
            Op::Scarry => Flag(ops::scarry(cx, x, y)),
            Op::Sborrow => Flag(ops::sborrow(cx, x, y)),
        }
    }

    /// Reference semantics on plain integers
    pub fn reference(self, a: u128, b: u128, width: usize) -> u128 {
        let m = mask128(width);
        let w = width as u128;
        let (sa, sb) = (signed(a, width), signed(b, width));
        match self {
            Op::Add => a.wrapping_add(b) & m,
            Op::Sub => a.wrapping_sub(b) & m,
            Op::Mul => a.wrapping_mul(b) & m,
            Op::Div if b == 0 => m,
            Op::Div => a / b,
            Op::Rem if b == 0 => a,
            Op::Rem => a % b,
            Op::Sdiv if b == 0 => 0,
            Op::Sdiv => sa.wrapping_div(sb) as u128 & m,
            Op::Srem if b == 0 => a,
            Op::Srem => sa.wrapping_rem(sb) as u128 & m,
            Op::And => a & b,
            Op::Or => a | b,
            Op::Xor => a ^ b,
            Op::Nand => !(a & b) & m,
            Op::Nor => !(a | b) & m,
            Op::Xnor => !(a ^ b) & m,
            Op::Shl if b >= w => 0,
            Op::Shl => (a << b) & m,
            Op::Lshr if b >= w => 0,
            Op::Lshr => a >> b,
            Op::Ashr => (sa >> b.min(127)) as u128 & m,
            Op::Rotl | Op::Rotr => {
                let k = (b % w) as u32;
                if k == 0 {
                    return a;
                }
                let left = if self == Op::Rotl { k } else { width as u32 - k };
                ((a << left) | (a >> (width as u32 - left))) & m
            }
            Op::Negate => a.wrapping_neg() & m,
            Op::Invert => !a & m,
            Op::Abs => sa.unsigned_abs() & m,
            Op::Popcount => a.count_ones() as u128 & m,
            Op::Equal => (a == b) as u128,
            Op::Ult => (a < b) as u128,
            Op::Ule => (a <= b) as u128,
            Op::Slt => (sa < sb) as u128,
            Op::Sle => (sa <= sb) as u128,
            Op::Carry => a.checked_add(b).map_or(true, |s| s > m) as u128,
            Op::Scarry => !fits_signed(sa.checked_add(sb), width) as u128,
            Op::Sborrow => !fits_signed(sa.checked_sub(sb), width) as u128,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One disagreement between the three computations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub op: Op,
    pub width: usize,
    pub a: u128,
    pub b: u128,
    pub expected: u128,
    /// `None` when the concrete path did not produce a constant
    pub concrete: Option<u128>,
    pub symbolic: u128,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}({:#x}, {:#x}): expected {:#x}, concrete {}, symbolic {:#x}",
            self.op,
            self.width,
            self.a,
            self.b,
            self.expected,
            self.concrete
                .map_or_else(|| "symbolic".to_string(), |c| format!("{:#x}", c)),
            self.symbolic
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct EquivalenceReport {
    pub checks: usize,
    pub mismatches: Vec<Mismatch>,
}

impl EquivalenceReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }

    fn absorb(&mut self, other: EquivalenceReport) {
        self.checks += other.checks;
        self.mismatches.extend(other.mismatches);
    }
}

/// Configuration for [`check`]
#[derive(Debug, Clone)]
pub struct CheckConfig {
    pub widths: Vec<usize>,
    pub operands: RandomOperandConfig,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            widths: vec![1, 8, 32, 64, 128],
            operands: RandomOperandConfig::default(),
        }
    }
}

/// Edge cases, random pairs, and the random pairs again with the second
/// operand reduced below the width so shifts see in-range amounts
pub fn operands_for(width: usize, config: &RandomOperandConfig) -> Vec<(u128, u128)> {
    let random = generate_random_operands(width, config);
    let mut operands = generate_edge_case_operands(width);
    operands.extend(random.iter().map(|&(a, b)| (a, b % width as u128)));
    operands.extend(random);
    operands
}

/// Check every operation at one width
pub fn check_width(width: usize, operands: &[(u128, u128)]) -> EquivalenceReport {
    let mut report = EquivalenceReport::default();

    // Symbolic side: one circuit per width, evaluated 64 operand pairs at a time
    let mut cx = Context::new();
    let x = cx.new_symbolic("x", width);
    let y = cx.new_symbolic("y", width);
    let outputs: Vec<(Op, Vec<Lit>)> = Op::ALL
        .iter()
        .map(|&op| {
            let outcome = op.apply(&mut cx, &x, &y);
            let lits = outcome.lits();
            outcome.release(&mut cx);
            (op, lits)
        })
        .collect();

    let mut symbolic: Vec<Vec<u128>> = vec![Vec::with_capacity(operands.len()); outputs.len()];
    for chunk in operands.chunks(64) {
        let mut words = vec![0u64; 2 * width];
        for (j, &(a, b)) in chunk.iter().enumerate() {
            for i in 0..width {
                words[i] |= (((a >> i) & 1) as u64) << j;
                words[width + i] |= (((b >> i) & 1) as u64) << j;
            }
        }
        let values = cx.circuit.aig().simulate(&words);
        for (slot, (_, lits)) in symbolic.iter_mut().zip(&outputs) {
            for j in 0..chunk.len() {
                let value = lits.iter().enumerate().fold(0u128, |acc, (i, &lit)| {
                    acc | ((((lit_word(&values, lit) >> j) & 1) as u128) << i)
                });
                slot.push(value);
            }
        }
    }
    cx.release(x);
    cx.release(y);

    // Concrete side and reference
    let mut cx = Context::new();
    for (k, &(a, b)) in operands.iter().enumerate() {
        let x = cx.pool.constant_u128(width, a);
        let y = cx.pool.constant_u128(width, b);
        for (o, &(op, _)) in outputs.iter().enumerate() {
            let outcome = op.apply(&mut cx, &x, &y);
            let concrete = outcome.constant();
            outcome.release(&mut cx);
            let expected = op.reference(a, b, width);
            let sym = symbolic[o][k];
            report.checks += 1;
            if concrete != Some(expected) || sym != expected {
                report.mismatches.push(Mismatch {
                    op,
                    width,
                    a,
                    b,
                    expected,
                    concrete,
                    symbolic: sym,
                });
            }
        }
        cx.release(x);
        cx.release(y);
    }
    report
}

/// Check every operation at every configured width
pub fn check(config: &CheckConfig) -> EquivalenceReport {
    let mut report = EquivalenceReport::default();
    for &width in &config.widths {
        let operands = operands_for(width, &config.operands);
        let result = check_width(width, &operands);
        tracing::info!(
            "width {}: {} checks, {} mismatches",
            width,
            result.checks,
            result.mismatches.len()
        );
        for mismatch in &result.mismatches {
            tracing::warn!("{}", mismatch);
        }
        report.absorb(result);
    }
    report
}
