//! Content-addressed symbolic memory
//!
//! Memory is a log of `(address, byte)` writes where the address may be any
//! vector. Logs live in nodes of an arena; a node either stands alone, extends
//! an older node (after a copy), or joins two alternatives under a branch
//! condition (after a merge). The shape of the node graph mirrors the fork
//! history of the run.
//!
//! Loading a byte scans the log from newest to oldest, building a chain of
//! multiplexers keyed on address equality, and falls back to the node's
//! ancestry when no entry matches for certain. Nodes shared by several
//! handles are freed by mark and sweep over the live roots.

use crate::circuit::Lit;
use crate::config::Endian;
use crate::context::Context;
use crate::diagnostics::{Diagnostic, MemoryKind};
use crate::ops;
use crate::vector::Vector;
use std::collections::HashMap;

/// Index of a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Owning handle to one symbolic memory
#[derive(Debug, PartialEq, Eq)]
pub struct SymMemory {
    root: NodeId,
}

impl SymMemory {
    pub fn root(&self) -> NodeId {
        self.root
    }
}

#[derive(Debug)]
struct Entry {
    addr: Vector,
    value: Vector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Leaf,
    /// Everything older lives in the parent node
    Inherit(NodeId),
    /// `cond ? t : f`
    Ite { cond: Lit, t: NodeId, f: NodeId },
}

#[derive(Debug)]
struct Node {
    log: Vec<Entry>,
    branch: Branch,
    mark: u64,
    memo: Option<(u64, Vector, Lit)>,
}

impl Node {
    fn new(branch: Branch) -> Self {
        Self {
            log: Vec::new(),
            branch,
            mark: 0,
            memo: None,
        }
    }

    fn children(&self) -> Vec<NodeId> {
        match self.branch {
            Branch::Leaf => Vec::new(),
            Branch::Inherit(parent) => vec![parent],
            Branch::Ite { t, f, .. } => vec![t, f],
        }
    }
}

/// Arena holding every symbolic memory of a machine state
#[derive(Debug)]
pub struct SymbolicStore {
    nodes: Vec<Option<Node>>,
    free_slots: Vec<usize>,
    roots: HashMap<NodeId, usize>,
    address_bits: usize,
    auto_compress: bool,
    sat_loads: bool,
    epoch: u64,
    mark_epoch: u64,
    memoized: Vec<NodeId>,
}

impl SymbolicStore {
    pub fn new(address_bits: usize, auto_compress: bool, sat_loads: bool) -> Self {
        assert!(address_bits > 0, "symbolic memory needs a non-empty address");
        Self {
            nodes: Vec::new(),
            free_slots: Vec::new(),
            roots: HashMap::new(),
            address_bits,
            auto_compress,
            sat_loads,
            epoch: 0,
            mark_epoch: 0,
            memoized: Vec::new(),
        }
    }

    pub fn address_bits(&self) -> usize {
        self.address_bits
    }

    pub fn live_nodes(&self) -> usize {
        self.nodes.len() - self.free_slots.len()
    }

    /// Number of live memory handles
    pub fn live_memories(&self) -> usize {
        self.roots.values().sum()
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free_slots.pop() {
            self.nodes[index] = Some(node);
            NodeId(index)
        } else {
            self.nodes.push(Some(node));
            NodeId(self.nodes.len() - 1)
        }
    }

    fn node(&self, id: NodeId) -> &Node {
        match self.nodes.get(id.0) {
            Some(Some(node)) => node,
            _ => panic!("symbolic memory node {} was freed", id.0),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match self.nodes.get_mut(id.0) {
            Some(Some(node)) => node,
            _ => panic!("symbolic memory node {} was freed", id.0),
        }
    }

    fn add_root(&mut self, id: NodeId) {
        *self.roots.entry(id).or_insert(0) += 1;
    }

    fn remove_root(&mut self, id: NodeId) {
        match self.roots.get_mut(&id) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                self.roots.remove(&id);
            }
            None => panic!("symbolic memory handle {} is not live", id.0),
        }
    }

    /// A fresh, empty memory
    pub fn create(&mut self) -> SymMemory {
        let root = self.alloc(Node::new(Branch::Leaf));
        self.add_root(root);
        SymMemory { root }
    }

    /// Fork `mem` into two independent memories sharing its history.
    ///
    /// `mem` is moved onto a new node of its own so that later stores to
    /// either side stay invisible to the other.
    pub fn copy(&mut self, mem: &mut SymMemory) -> SymMemory {
        let old = mem.root;
        let mine = self.alloc(Node::new(Branch::Inherit(old)));
        let theirs = self.alloc(Node::new(Branch::Inherit(old)));
        self.remove_root(old);
        self.add_root(mine);
        self.add_root(theirs);
        mem.root = mine;
        SymMemory { root: theirs }
    }

    fn check_address(&self, addr: &Vector) {
        assert_eq!(
            addr.width(),
            self.address_bits,
            "symbolic memory address is {} bits, expected {}",
            addr.width(),
            self.address_bits
        );
    }

    pub fn store_byte(&mut self, cx: &mut Context, mem: &SymMemory, addr: &Vector, value: &Vector) {
        self.check_address(addr);
        assert_eq!(value.width(), 8, "symbolic memory stores bytes");
        let auto_compress = self.auto_compress;
        let node = self.node_mut(mem.root);
        if auto_compress {
            let duplicate = node
                .log
                .iter()
                .rposition(|e| ops::sym_equal(&e.addr, addr) == Some(true));
            if let Some(index) = duplicate {
                let old = node.log.remove(index);
                cx.release(old.addr);
                cx.release(old.value);
            }
        }
        let entry = Entry {
            addr: cx.dup(addr),
            value: cx.dup(value),
        };
        self.node_mut(mem.root).log.push(entry);
    }

    /// Load one byte, returning it with the literal that is true when the
    /// address was written on the current path
    pub fn load_byte_written(&mut self, cx: &mut Context, mem: &SymMemory, addr: &Vector) -> (Vector, Lit) {
        self.check_address(addr);
        self.epoch += 1;
        let result = self.load_node(cx, mem.root, addr);
        for id in std::mem::take(&mut self.memoized) {
            if let Some(Some(node)) = self.nodes.get_mut(id.0) {
                if let Some((_, value, _)) = node.memo.take() {
                    cx.release(value);
                }
            }
        }
        result
    }

    /// Load one byte; a never-written address reads as zero and records a
    /// read-before-write diagnostic
    pub fn load_byte(&mut self, cx: &mut Context, mem: &SymMemory, addr: &Vector) -> Vector {
        let (value, written) = self.load_byte_written(cx, mem, addr);
        if written == Lit::FALSE {
            let address = match addr.to_u128() {
                Some(a) => format!("{:#x}", a),
                None => format!("{}", addr),
            };
            cx.diagnostics.record(Diagnostic::ReadBeforeWrite {
                memory: MemoryKind::Symbolic,
                address,
            });
        }
        value
    }

    fn address_eq(&self, cx: &mut Context, a: &Vector, b: &Vector) -> Lit {
        if self.sat_loads {
            ops::equal_sat(cx, a, b)
        } else {
            ops::equal(cx, a, b)
        }
    }

    fn load_node(&mut self, cx: &mut Context, id: NodeId, addr: &Vector) -> (Vector, Lit) {
        if !self.sat_loads {
            if let Some((epoch, value, written)) = &self.node(id).memo {
                if *epoch == self.epoch {
                    let written = *written;
                    return (cx.dup(value), written);
                }
            }
        }

        // Newest first: entries that may match, until one surely does
        let mut candidates: Vec<(Lit, usize)> = Vec::new();
        let mut exact = None;
        let log_len = self.node(id).log.len();
        for index in (0..log_len).rev() {
            let eq = {
                let entry = &self.node(id).log[index];
                self.address_eq(cx, &entry.addr, addr)
            };
            match eq.const_value() {
                Some(false) => continue,
                Some(true) => {
                    exact = Some(index);
                    break;
                }
                None => candidates.push((eq, index)),
            }
        }

        let branch = self.node(id).branch;
        let (mut value, mut written) = match exact {
            Some(index) => (cx.dup(&self.node(id).log[index].value), Lit::TRUE),
            None => match branch {
                Branch::Leaf => (cx.constant(8, 0), Lit::FALSE),
                Branch::Inherit(parent) => self.load_node(cx, parent, addr),
                Branch::Ite { cond, t, f } => {
                    cx.circuit.push_condition(cond, true);
                    let (tv, tw) = self.load_node(cx, t, addr);
                    cx.circuit.pop_condition();
                    cx.circuit.push_condition(cond, false);
                    let (fv, fw) = self.load_node(cx, f, addr);
                    cx.circuit.pop_condition();
                    let merged = ops::ite(cx, cond, &tv, &fv);
                    cx.release(tv);
                    cx.release(fv);
                    (merged, cx.circuit.mux(cond, tw, fw))
                }
            },
        };

        // Oldest candidate innermost so the newest write wins
        for &(eq, index) in candidates.iter().rev() {
            let next = ops::ite(cx, eq, &self.node(id).log[index].value, &value);
            cx.release(value);
            value = next;
            written = cx.circuit.or(eq, written);
        }

        if !self.sat_loads {
            let memo_value = cx.dup(&value);
            let epoch = self.epoch;
            if let Some((_, stale, _)) = self.node_mut(id).memo.replace((epoch, memo_value, written)) {
                cx.release(stale);
            }
            self.memoized.push(id);
        }
        (value, written)
    }

    fn offset_address(&self, cx: &mut Context, addr: &Vector, offset: usize) -> Vector {
        if offset == 0 {
            return cx.dup(addr);
        }
        let delta = cx.constant(self.address_bits, offset as u64);
        let shifted = ops::add(cx, addr, &delta);
        cx.release(delta);
        shifted
    }

    pub fn store(&mut self, cx: &mut Context, mem: &SymMemory, addr: &Vector, value: &Vector, endian: Endian) {
        assert!(
            value.width() % 8 == 0,
            "store of {}-bit value is not byte sized",
            value.width()
        );
        let n = value.width() / 8;
        let bytes = ops::split_bytes(cx, value);
        for (i, byte) in bytes.iter().enumerate() {
            let offset = match endian {
                Endian::Little => i,
                Endian::Big => n - 1 - i,
            };
            let at = self.offset_address(cx, addr, offset);
            self.store_byte(cx, mem, &at, byte);
            cx.release(at);
        }
        cx.pool.release_all(bytes);
    }

    pub fn store_le(&mut self, cx: &mut Context, mem: &SymMemory, addr: &Vector, value: &Vector) {
        self.store(cx, mem, addr, value, Endian::Little)
    }

    pub fn store_be(&mut self, cx: &mut Context, mem: &SymMemory, addr: &Vector, value: &Vector) {
        self.store(cx, mem, addr, value, Endian::Big)
    }

    /// Store an integer constant of `n` bytes
    pub fn store_int(&mut self, cx: &mut Context, mem: &SymMemory, addr: &Vector, value: u64, n: usize, endian: Endian) {
        let v = cx.constant(n * 8, value);
        self.store(cx, mem, addr, &v, endian);
        cx.release(v);
    }

    pub fn load(&mut self, cx: &mut Context, mem: &SymMemory, addr: &Vector, n: usize, endian: Endian) -> Vector {
        let mut bytes = Vec::with_capacity(n);
        for i in 0..n {
            let offset = match endian {
                Endian::Little => i,
                Endian::Big => n - 1 - i,
            };
            let at = self.offset_address(cx, addr, offset);
            bytes.push(self.load_byte(cx, mem, &at));
            cx.release(at);
        }
        let value = ops::join_bytes(cx, &bytes);
        cx.pool.release_all(bytes);
        value
    }

    pub fn load_le(&mut self, cx: &mut Context, mem: &SymMemory, addr: &Vector, n: usize) -> Vector {
        self.load(cx, mem, addr, n, Endian::Little)
    }

    pub fn load_be(&mut self, cx: &mut Context, mem: &SymMemory, addr: &Vector, n: usize) -> Vector {
        self.load(cx, mem, addr, n, Endian::Big)
    }

    /// Store values back to back starting at `addr`
    pub fn store_array(&mut self, cx: &mut Context, mem: &SymMemory, addr: &Vector, values: &[Vector], endian: Endian) {
        let mut offset = 0;
        for value in values {
            let at = self.offset_address(cx, addr, offset);
            self.store(cx, mem, &at, value, endian);
            cx.release(at);
            offset += value.width() / 8;
        }
    }

    pub fn load_array(
        &mut self,
        cx: &mut Context,
        mem: &SymMemory,
        addr: &Vector,
        count: usize,
        elem_bytes: usize,
        endian: Endian,
    ) -> Vec<Vector> {
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let at = self.offset_address(cx, addr, i * elem_bytes);
            out.push(self.load(cx, mem, &at, elem_bytes, endian));
            cx.release(at);
        }
        out
    }

    /// Nodes reachable from `start`, each once
    fn reachable(&mut self, start: NodeId) -> Vec<NodeId> {
        self.mark_epoch += 1;
        let epoch = self.mark_epoch;
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let node = self.node_mut(id);
            if node.mark == epoch {
                continue;
            }
            node.mark = epoch;
            stack.extend(node.children());
            order.push(id);
        }
        order
    }

    /// Drop every log entry shadowed by a newer write to the same address in
    /// the same node, for all nodes reachable from `mem`. Returns the number
    /// of entries removed.
    pub fn compress(&mut self, cx: &mut Context, mem: &SymMemory) -> usize {
        self.reachable(mem.root)
            .into_iter()
            .map(|id| compress_log(cx, &mut self.node_mut(id).log))
            .sum()
    }

    /// `compress` over every allocated node
    pub fn compress_all(&mut self, cx: &mut Context) -> usize {
        self.nodes
            .iter_mut()
            .flatten()
            .map(|node| compress_log(cx, &mut node.log))
            .sum()
    }

    /// Merge two memories on `c`, consuming both handles
    pub fn ite(&mut self, cx: &mut Context, c: Lit, t: SymMemory, f: SymMemory) -> SymMemory {
        match c.const_value() {
            Some(true) => {
                self.free(cx, f);
                t
            }
            Some(false) => {
                self.free(cx, t);
                f
            }
            None => {
                let root = self.alloc(Node::new(Branch::Ite {
                    cond: c,
                    t: t.root,
                    f: f.root,
                }));
                self.remove_root(t.root);
                self.remove_root(f.root);
                self.add_root(root);
                SymMemory { root }
            }
        }
    }

    /// Release a handle and every node no other live handle can reach
    pub fn free(&mut self, cx: &mut Context, mem: SymMemory) {
        self.remove_root(mem.root);
        self.mark_epoch += 1;
        let epoch = self.mark_epoch;
        let mut stack: Vec<NodeId> = self.roots.keys().copied().collect();
        while let Some(id) = stack.pop() {
            let node = self.node_mut(id);
            if node.mark == epoch {
                continue;
            }
            node.mark = epoch;
            stack.extend(node.children());
        }

        let mut stack = vec![mem.root];
        while let Some(id) = stack.pop() {
            let reclaim = matches!(self.nodes.get(id.0), Some(Some(node)) if node.mark != epoch);
            if !reclaim {
                continue;
            }
            if let Some(node) = self.nodes[id.0].take() {
                stack.extend(node.children());
                for entry in node.log {
                    cx.release(entry.addr);
                    cx.release(entry.value);
                }
                if let Some((_, value, _)) = node.memo {
                    cx.release(value);
                }
                self.free_slots.push(id.0);
            }
        }
    }

    /// Visit every literal held by any node
    pub fn visit_lits(&mut self, f: &mut dyn FnMut(&mut Lit)) {
        for node in self.nodes.iter_mut().flatten() {
            for entry in &mut node.log {
                if let Some(bits) = entry.addr.lits_mut() {
                    bits.iter_mut().for_each(&mut *f);
                }
                if let Some(bits) = entry.value.lits_mut() {
                    bits.iter_mut().for_each(&mut *f);
                }
            }
            if let Branch::Ite { cond, .. } = &mut node.branch {
                f(cond);
            }
        }
    }

    /// Turn log entries whose bits all became constant back into words
    pub fn demote(&mut self, cx: &mut Context) {
        for node in self.nodes.iter_mut().flatten() {
            for entry in &mut node.log {
                for v in [&mut entry.addr, &mut entry.value] {
                    if v.is_symbolic() && v.is_fully_constant() {
                        let placeholder = Vector::from_word(1, 0);
                        let taken = std::mem::replace(v, placeholder);
                        *v = cx.pool.demote(taken);
                    }
                }
            }
        }
    }

    /// Total log entries across all nodes
    pub fn entry_count(&self) -> usize {
        self.nodes.iter().flatten().map(|n| n.log.len()).sum()
    }
}

/// Keep only the newest entry per address
fn compress_log(cx: &mut Context, log: &mut Vec<Entry>) -> usize {
    let mut removed = 0;
    let mut kept: Vec<Entry> = Vec::with_capacity(log.len());
    for entry in std::mem::take(log).into_iter().rev() {
        let shadowed = kept
            .iter()
            .any(|k| ops::sym_equal(&k.addr, &entry.addr) == Some(true));
        if shadowed {
            cx.release(entry.addr);
            cx.release(entry.value);
            removed += 1;
        } else {
            kept.push(entry);
        }
    }
    kept.reverse();
    *log = kept;
    removed
}
