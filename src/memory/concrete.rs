//! Dense byte-addressed memory at a fixed base address
//!
//! Each cell holds an 8-bit vector and a literal recording whether the cell
//! has been written. After a symbolic merge that literal can itself be
//! symbolic ("written on one path only").

use crate::circuit::Lit;
use crate::config::Endian;
use crate::context::Context;
use crate::diagnostics::{Diagnostic, MemoryKind};
use crate::ops;
use crate::vector::Vector;

#[derive(Debug)]
pub struct Cell {
    pub value: Vector,
    pub written: Lit,
}

#[derive(Debug)]
pub struct ConcreteMemory {
    base: u64,
    cells: Vec<Cell>,
}

impl ConcreteMemory {
    /// `size` zeroed, unwritten cells starting at `base`
    pub fn new(cx: &mut Context, base: u64, size: usize) -> Self {
        let cells = (0..size)
            .map(|_| Cell {
                value: cx.constant(8, 0),
                written: Lit::FALSE,
            })
            .collect();
        Self { base, cells }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, addr: u64) -> &Cell {
        &self.cells[self.offset(addr, 1)]
    }

    fn offset(&self, addr: u64, n: usize) -> usize {
        let in_range = addr
            .checked_sub(self.base)
            .and_then(|off| usize::try_from(off).ok())
            .filter(|&off| off.checked_add(n).is_some_and(|end| end <= self.cells.len()));
        match in_range {
            Some(off) => off,
            None => panic!(
                "concrete memory access of {} bytes at {:#x} outside [{:#x}, {:#x})",
                n,
                addr,
                self.base,
                self.base + self.cells.len() as u64
            ),
        }
    }

    fn set(&mut self, cx: &mut Context, index: usize, byte: Vector) {
        let old = std::mem::replace(&mut self.cells[index].value, byte);
        cx.release(old);
        self.cells[index].written = Lit::TRUE;
    }

    /// Store `value` (n bytes wide) at `addr` in the given byte order
    pub fn store(&mut self, cx: &mut Context, addr: u64, value: &Vector, endian: Endian) {
        assert!(
            value.width() % 8 == 0,
            "store of {}-bit value is not byte sized",
            value.width()
        );
        let n = value.width() / 8;
        let start = self.offset(addr, n);
        for (i, byte) in ops::split_bytes(cx, value).into_iter().enumerate() {
            let slot = match endian {
                Endian::Little => start + i,
                Endian::Big => start + n - 1 - i,
            };
            self.set(cx, slot, byte);
        }
    }

    pub fn store_le(&mut self, cx: &mut Context, addr: u64, value: &Vector) {
        self.store(cx, addr, value, Endian::Little)
    }

    pub fn store_be(&mut self, cx: &mut Context, addr: u64, value: &Vector) {
        self.store(cx, addr, value, Endian::Big)
    }

    /// Load `n` bytes from `addr`. Unwritten bytes read as zero and each one
    /// records a read-before-write diagnostic.
    pub fn load(&self, cx: &mut Context, addr: u64, n: usize, endian: Endian) -> Vector {
        let start = self.offset(addr, n);
        let mut bytes = Vec::with_capacity(n);
        for i in 0..n {
            let slot = match endian {
                Endian::Little => start + i,
                Endian::Big => start + n - 1 - i,
            };
            let cell = &self.cells[slot];
            if cell.written == Lit::FALSE {
                cx.diagnostics.record(Diagnostic::ReadBeforeWrite {
                    memory: MemoryKind::Concrete,
                    address: format!("{:#x}", self.base + slot as u64),
                });
            }
            bytes.push(cx.dup(&cell.value));
        }
        let value = ops::join_bytes(cx, &bytes);
        cx.pool.release_all(bytes);
        value
    }

    pub fn load_le(&self, cx: &mut Context, addr: u64, n: usize) -> Vector {
        self.load(cx, addr, n, Endian::Little)
    }

    pub fn load_be(&self, cx: &mut Context, addr: u64, n: usize) -> Vector {
        self.load(cx, addr, n, Endian::Big)
    }

    /// True when any of the `n` bytes at `addr` may be unwritten
    pub fn load_rbw(&self, cx: &mut Context, addr: u64, n: usize) -> Lit {
        let start = self.offset(addr, n);
        let mut any = Lit::FALSE;
        for cell in &self.cells[start..start + n] {
            any = cx.circuit.or(any, !cell.written);
        }
        any
    }

    /// Store values back to back, each in the given byte order
    pub fn store_array(&mut self, cx: &mut Context, addr: u64, values: &[Vector], endian: Endian) {
        let mut at = addr;
        for value in values {
            self.store(cx, at, value, endian);
            at += (value.width() / 8) as u64;
        }
    }

    pub fn load_array(
        &self,
        cx: &mut Context,
        addr: u64,
        count: usize,
        elem_bytes: usize,
        endian: Endian,
    ) -> Vec<Vector> {
        (0..count)
            .map(|i| self.load(cx, addr + (i * elem_bytes) as u64, elem_bytes, endian))
            .collect()
    }

    /// Store raw bytes
    pub fn store_bytes(&mut self, cx: &mut Context, addr: u64, bytes: &[u8]) {
        let start = self.offset(addr, bytes.len());
        for (i, &b) in bytes.iter().enumerate() {
            let byte = cx.constant(8, b as u64);
            self.set(cx, start + i, byte);
        }
    }

    /// Independent deep copy
    pub fn copy(&self, cx: &mut Context) -> Self {
        let cells = self
            .cells
            .iter()
            .map(|cell| Cell {
                value: cx.dup(&cell.value),
                written: cell.written,
            })
            .collect();
        Self {
            base: self.base,
            cells,
        }
    }

    pub fn free(self, cx: &mut Context) {
        cx.pool.release_all(self.cells.into_iter().map(|cell| cell.value));
    }

    /// Merge two memories on `c`. A constant condition returns the taken side
    /// untouched; otherwise every cell is multiplexed, except that a cell
    /// never written on one side keeps the other side's contents.
    pub fn ite(cx: &mut Context, c: Lit, t: Self, f: Self) -> Self {
        assert!(
            t.base == f.base && t.cells.len() == f.cells.len(),
            "merging concrete memories with different layouts"
        );
        match c.const_value() {
            Some(true) => {
                f.free(cx);
                return t;
            }
            Some(false) => {
                t.free(cx);
                return f;
            }
            None => {}
        }
        let base = t.base;
        let cells = t
            .cells
            .into_iter()
            .zip(f.cells)
            .map(|(tc, fc)| {
                if fc.written == Lit::FALSE {
                    cx.release(fc.value);
                    tc
                } else if tc.written == Lit::FALSE {
                    cx.release(tc.value);
                    fc
                } else {
                    let value = ops::ite(cx, c, &tc.value, &fc.value);
                    let written = cx.circuit.mux(c, tc.written, fc.written);
                    cx.release(tc.value);
                    cx.release(fc.value);
                    Cell { value, written }
                }
            })
            .collect();
        Self { base, cells }
    }

    /// Visit every literal held by the memory
    pub fn visit_lits(&mut self, f: &mut dyn FnMut(&mut Lit)) {
        for cell in &mut self.cells {
            if let Some(bits) = cell.value.lits_mut() {
                bits.iter_mut().for_each(&mut *f);
            }
            f(&mut cell.written);
        }
    }

    /// Turn cells whose bits all became constant back into words
    pub fn demote(&mut self, cx: &mut Context) {
        for cell in &mut self.cells {
            if cell.value.is_symbolic() && cell.value.is_fully_constant() {
                let placeholder = Vector::from_word(8, 0);
                let value = std::mem::replace(&mut cell.value, placeholder);
                cell.value = cx.pool.demote(value);
            }
        }
    }

    /// Number of symbolic cells
    pub fn symbolic_cells(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| c.value.is_symbolic() || !c.written.is_const())
            .count()
    }
}
