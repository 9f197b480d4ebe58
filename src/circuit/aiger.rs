//! Binary AIGER export

use super::aig::{Aig, Node};
use super::lit::Lit;
use crate::error::{Error, Result};
use std::io::Write;

fn write_varint<W: Write>(out: &mut W, mut value: u32) -> Result<()> {
    let mut buf = [0u8; 5];
    let mut len = 0;
    while value >= 0x80 {
        buf[len] = (value as u8 & 0x7f) | 0x80;
        value >>= 7;
        len += 1;
    }
    buf[len] = value as u8;
    out.write_all(&buf[..=len])?;
    Ok(())
}

/// Write `aig` with the given named outputs in binary AIGER format.
///
/// Inputs are renumbered to variables `1..=I` and AND gates follow in
/// creation order, which the binary format requires.
pub fn write_aiger<W: Write>(aig: &Aig, outputs: &[(Lit, String)], out: &mut W) -> Result<()> {
    let mut renumber = vec![0u32; aig.node_count()];
    let mut next = 1u32;
    for &var in aig.inputs() {
        renumber[var as usize] = next;
        next += 1;
    }
    let mut gates = Vec::with_capacity(aig.and_count());
    for var in 0..aig.node_count() as u32 {
        if let Node::And(a, b) = aig.node(var) {
            renumber[var as usize] = next;
            next += 1;
            gates.push((var, a, b));
        }
    }
    let translate = |lit: Lit| -> u32 { renumber[lit.var() as usize] * 2 + lit.is_negated() as u32 };

    let max_var = next - 1;
    writeln!(
        out,
        "aig {} {} 0 {} {}",
        max_var,
        aig.input_count(),
        outputs.len(),
        gates.len()
    )?;
    for (lit, _) in outputs {
        writeln!(out, "{}", translate(*lit))?;
    }
    for &(var, a, b) in &gates {
        let lhs = renumber[var as usize] * 2;
        let (r0, r1) = {
            let (x, y) = (translate(a), translate(b));
            if x >= y {
                (x, y)
            } else {
                (y, x)
            }
        };
        if lhs <= r0 {
            return Err(Error::Export(format!(
                "gate n{} is not in topological order",
                var
            )));
        }
        write_varint(out, lhs - r0)?;
        write_varint(out, r0 - r1)?;
    }
    for (index, name) in aig.input_names().iter().enumerate() {
        writeln!(out, "i{} {}", index, name)?;
    }
    for (index, (_, name)) in outputs.iter().enumerate() {
        writeln!(out, "o{} {}", index, name)?;
    }
    writeln!(out, "c")?;
    writeln!(out, "aigsym {}", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
