//! Machine state: the memories, heap cursor and circuit of one analysis run
//!
//! A `MachineState` is what a lifter drives. It owns the [`Context`] (circuit,
//! vector pool, diagnostics), the concrete and symbolic memory pair currently
//! in effect and a heap cursor. Branching, merging and circuit garbage
//! collection live in the `fork` and `gc` submodules; the per-operation entry
//! points live in `operations`.

mod fork;
mod gc;
mod operations;

pub use fork::{BranchState, Continuation};

use crate::circuit::{Lit, ProbeId};
use crate::config::{EngineConfig, Endian};
use crate::context::Context;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::memory::{ConcreteMemory, SymMemory, SymbolicStore};
use crate::ops;
use crate::vector::Vector;
use std::io::Write;
use std::path::Path;

/// The concrete and symbolic memory in effect on one path
#[derive(Debug)]
pub struct Memories {
    pub concrete: ConcreteMemory,
    pub symbolic: SymMemory,
}

impl Memories {
    fn copy(&mut self, cx: &mut Context, sym: &mut SymbolicStore) -> Memories {
        Memories {
            concrete: self.concrete.copy(cx),
            symbolic: sym.copy(&mut self.symbolic),
        }
    }

    fn free(self, cx: &mut Context, sym: &mut SymbolicStore) {
        self.concrete.free(cx);
        sym.free(cx, self.symbolic);
    }

    fn ite(cx: &mut Context, sym: &mut SymbolicStore, c: Lit, t: Memories, f: Memories) -> Memories {
        Memories {
            concrete: ConcreteMemory::ite(cx, c, t.concrete, f.concrete),
            symbolic: sym.ite(cx, c, t.symbolic, f.symbolic),
        }
    }
}

/// Resources still live when a machine state is torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LeakReport {
    pub vectors: u64,
    pub memory_nodes: usize,
    pub conditions: usize,
    pub probes: usize,
}

impl LeakReport {
    pub fn is_clean(&self) -> bool {
        *self == LeakReport::default()
    }
}

/// State saved while both sides of a fork run. Kept on a stack so the
/// collector can rewrite every literal still referenced by a suspended
/// branch.
#[derive(Debug)]
struct ForkFrame {
    cond: Lit,
    /// Memories before the branch
    pre: Memories,
    /// The false-side copy while the true side runs, then the true result
    sibling: Option<Memories>,
    pre_heap: Vector,
    /// Heap cursor left by the true side
    sibling_heap: Option<Vector>,
}

#[derive(Debug)]
pub struct MachineState {
    name: String,
    config: EngineConfig,
    cx: Context,
    sym: SymbolicStore,
    memory: Memories,
    heap: Vector,
    frames: Vec<ForkFrame>,
    branch_error: bool,
    fork_budget: usize,
    next_gc: usize,
    gc_runs: usize,
}

impl MachineState {
    /// A machine state with the default configuration.
    ///
    /// Concrete memory covers `cmem_size` bytes from `cmem_base`; symbolic
    /// memory addresses are `address_bits` wide and the heap cursor starts at
    /// `heap_offset`.
    pub fn create(name: &str, cmem_base: u64, cmem_size: usize, heap_offset: u64, address_bits: usize) -> Self {
        assert!(address_bits > 0, "machine state needs a non-empty address space");
        Self::build(name, cmem_base, cmem_size, heap_offset, address_bits, EngineConfig::default())
    }

    pub fn with_config(
        name: &str,
        cmem_base: u64,
        cmem_size: usize,
        heap_offset: u64,
        address_bits: usize,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        if address_bits == 0 {
            return Err(Error::InvalidConfig(
                "address width must be positive".to_string(),
            ));
        }
        Ok(Self::build(name, cmem_base, cmem_size, heap_offset, address_bits, config))
    }

    fn build(
        name: &str,
        cmem_base: u64,
        cmem_size: usize,
        heap_offset: u64,
        address_bits: usize,
        config: EngineConfig,
    ) -> Self {
        let mut cx = Context::with_pool(&config.pool);
        let mut sym = SymbolicStore::new(address_bits, config.auto_compress, config.sat_strengthened_loads);
        let memory = Memories {
            concrete: ConcreteMemory::new(&mut cx, cmem_base, cmem_size),
            symbolic: sym.create(),
        };
        let heap = cx.constant(address_bits, heap_offset);
        tracing::debug!(
            "{}: concrete memory {:#x}+{:#x}, {}-bit symbolic addresses",
            name,
            cmem_base,
            cmem_size,
            address_bits
        );
        Self {
            name: name.to_string(),
            fork_budget: config.fork_depth,
            next_gc: config.gc_threshold,
            config,
            cx,
            sym,
            memory,
            heap,
            frames: Vec::new(),
            branch_error: false,
            gc_runs: 0,
        }
    }

    /// Tear down, releasing the memories and the heap cursor, and report
    /// whatever the driver left behind
    pub fn destroy(self) -> (LeakReport, Diagnostics) {
        let MachineState {
            name,
            mut cx,
            mut sym,
            memory,
            heap,
            frames,
            ..
        } = self;
        assert!(frames.is_empty(), "machine state destroyed inside a branch");
        memory.free(&mut cx, &mut sym);
        cx.release(heap);

        let outputs = cx.circuit.outputs().len();
        let report = LeakReport {
            vectors: cx.pool.live(),
            memory_nodes: sym.live_nodes(),
            conditions: cx.circuit.condition_depth(),
            probes: cx.circuit.live_probes() - outputs,
        };
        let counts = [
            ("vectors", report.vectors),
            ("symbolic memory nodes", report.memory_nodes as u64),
            ("path conditions", report.conditions as u64),
            ("probes", report.probes as u64),
        ];
        for (resource, count) in counts {
            if count > 0 {
                cx.diagnostics.record(Diagnostic::Leak { resource, count });
            }
        }
        if report.is_clean() {
            tracing::debug!("{}: clean teardown", name);
        }
        (report, cx.diagnostics)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn context(&self) -> &Context {
        &self.cx
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.cx
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.cx.diagnostics
    }

    pub fn memory(&self) -> &Memories {
        &self.memory
    }

    pub fn symbolic_store(&self) -> &SymbolicStore {
        &self.sym
    }

    pub fn address_bits(&self) -> usize {
        self.sym.address_bits()
    }

    pub fn heap(&self) -> &Vector {
        &self.heap
    }

    /// Set when the current path was cut short; every caller between the
    /// failure and the enclosing branch must stop and return
    pub fn branch_error(&self) -> bool {
        self.branch_error
    }

    /// Clear a branch error that reached the top of the run
    pub fn clear_branch_error(&mut self) {
        self.branch_error = false;
    }

    /// Forks currently suspended on the stack
    pub fn fork_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn gc_runs(&self) -> usize {
        self.gc_runs
    }

    pub fn node_count(&self) -> usize {
        self.cx.circuit.node_count()
    }

    /// Give up on the current path. Returns input values that reach this
    /// point, or `None` when no input can.
    pub fn abort_path(&mut self) -> Option<Vec<(String, bool)>> {
        self.branch_error = true;
        let reachable = self.cx.circuit.counterexample();
        match &reachable {
            Some(_) => tracing::warn!("{}: path aborted; reachable with the reported inputs", self.name),
            None => tracing::debug!("{}: path aborted; no input reaches it", self.name),
        }
        reachable
    }

    // Values

    pub fn constant(&mut self, width: usize, value: u64) -> Vector {
        self.cx.constant(width, value)
    }

    /// Fresh circuit inputs named `name[0]` upwards
    pub fn new_symbolic(&mut self, name: &str, width: usize) -> Vector {
        self.cx.new_symbolic(name, width)
    }

    pub fn release(&mut self, v: Vector) {
        self.cx.release(v)
    }

    /// Concrete value of an address, which must not be symbolic
    pub fn concrete_address(&self, addr: &Vector) -> u64 {
        match addr.as_u64() {
            Some(a) => a,
            None => panic!("concrete memory address {} is symbolic", addr),
        }
    }

    // Concrete memory

    pub fn store_concrete(&mut self, addr: u64, value: &Vector, endian: Endian) {
        self.memory.concrete.store(&mut self.cx, addr, value, endian)
    }

    pub fn store_concrete_le(&mut self, addr: u64, value: &Vector) {
        self.store_concrete(addr, value, Endian::Little)
    }

    pub fn store_concrete_be(&mut self, addr: u64, value: &Vector) {
        self.store_concrete(addr, value, Endian::Big)
    }

    pub fn load_concrete(&mut self, addr: u64, n: usize, endian: Endian) -> Vector {
        self.memory.concrete.load(&mut self.cx, addr, n, endian)
    }

    pub fn load_concrete_le(&mut self, addr: u64, n: usize) -> Vector {
        self.load_concrete(addr, n, Endian::Little)
    }

    pub fn load_concrete_be(&mut self, addr: u64, n: usize) -> Vector {
        self.load_concrete(addr, n, Endian::Big)
    }

    /// True when any of the `n` bytes at `addr` may be unwritten
    pub fn concrete_unwritten(&mut self, addr: u64, n: usize) -> Lit {
        self.memory.concrete.load_rbw(&mut self.cx, addr, n)
    }

    pub fn store_concrete_array(&mut self, addr: u64, values: &[Vector], endian: Endian) {
        self.memory.concrete.store_array(&mut self.cx, addr, values, endian)
    }

    pub fn load_concrete_array(&mut self, addr: u64, count: usize, elem_bytes: usize, endian: Endian) -> Vec<Vector> {
        self.memory.concrete.load_array(&mut self.cx, addr, count, elem_bytes, endian)
    }

    pub fn store_concrete_bytes(&mut self, addr: u64, bytes: &[u8]) {
        self.memory.concrete.store_bytes(&mut self.cx, addr, bytes)
    }

    // Symbolic memory

    pub fn store_symbolic(&mut self, addr: &Vector, value: &Vector, endian: Endian) {
        self.sym.store(&mut self.cx, &self.memory.symbolic, addr, value, endian)
    }

    pub fn store_symbolic_le(&mut self, addr: &Vector, value: &Vector) {
        self.store_symbolic(addr, value, Endian::Little)
    }

    pub fn store_symbolic_be(&mut self, addr: &Vector, value: &Vector) {
        self.store_symbolic(addr, value, Endian::Big)
    }

    pub fn store_symbolic_int(&mut self, addr: &Vector, value: u64, n: usize, endian: Endian) {
        self.sym.store_int(&mut self.cx, &self.memory.symbolic, addr, value, n, endian)
    }

    pub fn load_symbolic(&mut self, addr: &Vector, n: usize, endian: Endian) -> Vector {
        self.sym.load(&mut self.cx, &self.memory.symbolic, addr, n, endian)
    }

    pub fn load_symbolic_le(&mut self, addr: &Vector, n: usize) -> Vector {
        self.load_symbolic(addr, n, Endian::Little)
    }

    pub fn load_symbolic_be(&mut self, addr: &Vector, n: usize) -> Vector {
        self.load_symbolic(addr, n, Endian::Big)
    }

    pub fn store_symbolic_array_le(&mut self, addr: &Vector, values: &[Vector]) {
        self.sym.store_array(&mut self.cx, &self.memory.symbolic, addr, values, Endian::Little)
    }

    pub fn store_symbolic_array_be(&mut self, addr: &Vector, values: &[Vector]) {
        self.sym.store_array(&mut self.cx, &self.memory.symbolic, addr, values, Endian::Big)
    }

    pub fn load_symbolic_array_le(&mut self, addr: &Vector, count: usize, elem_bytes: usize) -> Vec<Vector> {
        self.sym
            .load_array(&mut self.cx, &self.memory.symbolic, addr, count, elem_bytes, Endian::Little)
    }

    pub fn load_symbolic_array_be(&mut self, addr: &Vector, count: usize, elem_bytes: usize) -> Vec<Vector> {
        self.sym
            .load_array(&mut self.cx, &self.memory.symbolic, addr, count, elem_bytes, Endian::Big)
    }

    /// Drop shadowed writes from the current symbolic memory
    pub fn compress_symbolic(&mut self) -> usize {
        self.sym.compress(&mut self.cx, &self.memory.symbolic)
    }

    // Heap

    /// Bump-allocate `size` bytes, returning the previous cursor
    pub fn heap_alloc(&mut self, size: &Vector) -> Vector {
        assert_eq!(
            size.width(),
            self.heap.width(),
            "heap_alloc: size is {} bits, addresses are {}",
            size.width(),
            self.heap.width()
        );
        let start = self.cx.dup(&self.heap);
        let next = ops::add(&mut self.cx, &self.heap, size);
        let old = std::mem::replace(&mut self.heap, next);
        self.cx.release(old);
        start
    }

    // Circuit access

    /// Mark every bit of `v` as a circuit output `name[i]`
    pub fn mark_output(&mut self, v: &Vector, name: &str) {
        for i in 0..v.width() {
            self.cx.circuit.mark_output(v.bit(i), format!("{}[{}]", name, i));
        }
    }

    pub fn write_aiger<W: Write>(&self, out: &mut W) -> Result<()> {
        self.cx.circuit.write_aiger(out)
    }

    pub fn export_aiger(&self, path: impl AsRef<Path>) -> Result<()> {
        self.cx.circuit.export_aiger(path)
    }

    /// Hand a vector to the circuit so it survives garbage collection; get
    /// it back with [`MachineState::vector_from_probes`]
    pub fn probe_vector(&mut self, v: Vector) -> Vec<ProbeId> {
        let probes = (0..v.width())
            .map(|i| self.cx.circuit.create_probe(v.bit(i)))
            .collect();
        self.cx.release(v);
        probes
    }

    pub fn vector_from_probes(&mut self, probes: Vec<ProbeId>) -> Vector {
        let mut bits = self.cx.pool.bits(probes.len());
        for (bit, probe) in bits.iter_mut().zip(probes) {
            *bit = self.cx.circuit.probe_lit(probe);
            self.cx.circuit.delete_probe(probe);
        }
        self.cx.finish(bits)
    }

    /// Input values satisfying the current path condition
    pub fn counterexample(&mut self) -> Option<Vec<(String, bool)>> {
        self.cx.circuit.counterexample()
    }

    /// Value of `v` under an assignment of every circuit input
    pub fn evaluate(&self, v: &Vector, assignment: &[bool]) -> u128 {
        v.evaluate(&self.cx.circuit, assignment)
    }

    /// Every literal that must survive a sweep, in a fixed order
    fn visit_live_lits(&mut self, f: &mut dyn FnMut(&mut Lit)) {
        self.sym.visit_lits(f);
        self.memory.concrete.visit_lits(f);
        visit_vector(&mut self.heap, f);
        for frame in &mut self.frames {
            f(&mut frame.cond);
            frame.pre.concrete.visit_lits(f);
            if let Some(sibling) = &mut frame.sibling {
                sibling.concrete.visit_lits(f);
            }
            visit_vector(&mut frame.pre_heap, f);
            if let Some(heap) = &mut frame.sibling_heap {
                visit_vector(heap, f);
            }
        }
    }
}

fn visit_vector(v: &mut Vector, f: &mut dyn FnMut(&mut Lit)) {
    if let Some(bits) = v.lits_mut() {
        bits.iter_mut().for_each(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> MachineState {
        MachineState::create("test", 0x1000, 64, 0x8000, 32)
    }

    #[test]
    fn test_create_and_clean_destroy() {
        let ms = state();
        assert_eq!(ms.heap().as_u64(), Some(0x8000));
        assert_eq!(ms.address_bits(), 32);
        let (report, diagnostics) = ms.destroy();
        assert!(report.is_clean(), "{:?}", report);
        assert!(diagnostics.events().is_empty());
    }

    #[test]
    fn test_destroy_reports_leaks() {
        let mut ms = state();
        let _kept = ms.constant(8, 1);
        ms.context_mut().circuit.push_condition(Lit::TRUE, true);
        let (report, diagnostics) = ms.destroy();
        assert_eq!(report.vectors, 1);
        assert_eq!(report.conditions, 1);
        assert_eq!(diagnostics.events().len(), 2);
    }

    #[test]
    fn test_with_config_rejects_zero_address_width() {
        let result = MachineState::with_config("bad", 0, 1, 0, 0, EngineConfig::default());
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_heap_alloc_bumps_cursor() {
        let mut ms = state();
        let size = ms.constant(32, 0x20);
        let first = ms.heap_alloc(&size);
        let second = ms.heap_alloc(&size);
        assert_eq!(first.as_u64(), Some(0x8000));
        assert_eq!(second.as_u64(), Some(0x8020));
        assert_eq!(ms.heap().as_u64(), Some(0x8040));
        for v in [size, first, second] {
            ms.release(v);
        }
        assert!(ms.destroy().0.is_clean());
    }

    #[test]
    fn test_memory_entry_points() {
        let mut ms = state();
        let v = ms.constant(32, 0x1122_3344);
        ms.store_concrete_be(0x1000, &v);
        let back = ms.load_concrete_be(0x1000, 4);
        assert_eq!(back.as_u64(), Some(0x1122_3344));

        let addr = ms.constant(32, 0x9000);
        ms.store_symbolic_le(&addr, &v);
        let sym = ms.load_symbolic_le(&addr, 4);
        assert_eq!(sym.as_u64(), Some(0x1122_3344));
        for v in [v, back, addr, sym] {
            ms.release(v);
        }
        assert!(ms.destroy().0.is_clean());
    }

    #[test]
    #[should_panic(expected = "is symbolic")]
    fn test_concrete_address_must_be_concrete() {
        let mut ms = state();
        let addr = ms.new_symbolic("a", 32);
        ms.concrete_address(&addr);
    }

    #[test]
    fn test_probe_round_trip() {
        let mut ms = state();
        let x = ms.new_symbolic("x", 4);
        let bits = x.lits();
        let probes = ms.probe_vector(x);
        assert_eq!(ms.context().circuit.live_probes(), 4);
        let back = ms.vector_from_probes(probes);
        assert_eq!(back.lits(), bits);
        ms.release(back);
        assert!(ms.destroy().0.is_clean());
    }
}
