//! Circuit garbage collection
//!
//! The circuit only grows while a run executes. Once it passes a moving
//! threshold, every literal the machine still holds is pinned with a probe,
//! the circuit is swept down to the cone of those probes, and the rewritten
//! literals are read back into their owners in the order they were pinned.

use super::MachineState;
use crate::circuit::{Lit, ProbeId};
use crate::context::Context;
use crate::vector::Vector;

impl MachineState {
    /// Collect if the circuit outgrew the threshold, or unconditionally when
    /// `force` is set. Returns `cond` rewritten into the swept circuit.
    ///
    /// # Panics
    ///
    /// If the sweep fails; the circuit can no longer be trusted.
    pub fn collect_garbage(&mut self, cond: Lit, force: bool) -> Lit {
        let before = self.cx.circuit.node_count();
        if !force && before <= self.next_gc {
            return cond;
        }
        if !self.config.auto_compress {
            let removed = self.sym.compress_all(&mut self.cx);
            tracing::debug!("{}: compressed {} symbolic writes", self.name, removed);
        }

        let mut lits = vec![cond];
        self.visit_live_lits(&mut |lit| lits.push(*lit));
        let probes: Vec<ProbeId> = lits
            .iter()
            .map(|&lit| self.cx.circuit.create_probe(lit))
            .collect();

        let report = match self.cx.circuit.sweep(&probes, &self.config.sweep) {
            Ok(report) => report,
            Err(err) => panic!("{}: {}", self.name, err),
        };

        let fresh: Vec<Lit> = probes
            .into_iter()
            .map(|probe| {
                let lit = self.cx.circuit.probe_lit(probe);
                self.cx.circuit.delete_probe(probe);
                lit
            })
            .collect();
        let mut fresh = fresh.into_iter();
        let cond = fresh.next().unwrap_or(cond);
        self.visit_live_lits(&mut |lit| match fresh.next() {
            Some(new) => *lit = new,
            None => panic!("garbage collection lost track of a live literal"),
        });
        self.demote_all();

        self.gc_runs += 1;
        self.next_gc = self.cx.circuit.node_count() + self.config.gc_increment;
        tracing::debug!(
            "{}: gc #{} kept {} literals, {} -> {} nodes, next at {}",
            self.name,
            self.gc_runs,
            lits.len(),
            before,
            report.nodes_after,
            self.next_gc
        );
        cond
    }

    /// Turn every held vector whose bits all became constant back into a word
    fn demote_all(&mut self) {
        self.memory.concrete.demote(&mut self.cx);
        self.sym.demote(&mut self.cx);
        demote_vector(&mut self.cx, &mut self.heap);
        for frame in &mut self.frames {
            frame.pre.concrete.demote(&mut self.cx);
            if let Some(sibling) = &mut frame.sibling {
                sibling.concrete.demote(&mut self.cx);
            }
            demote_vector(&mut self.cx, &mut frame.pre_heap);
            if let Some(heap) = &mut frame.sibling_heap {
                demote_vector(&mut self.cx, heap);
            }
        }
    }
}

fn demote_vector(cx: &mut Context, v: &mut Vector) {
    if v.is_symbolic() && v.is_fully_constant() && v.width() <= crate::vector::WORD_BITS {
        let taken = std::mem::replace(v, Vector::from_word(1, 0));
        *v = cx.pool.demote(taken);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, SweepConfig};

    fn state(sweep: SweepConfig) -> MachineState {
        let config = EngineConfig::default().with_gc(0, 100).with_sweep(sweep);
        MachineState::with_config("gc", 0, 8, 0, 16, config).unwrap()
    }

    #[test]
    fn test_forced_collection_preserves_memory() {
        let mut ms = state(SweepConfig::structural());
        let x = ms.new_symbolic("x", 8);
        let y = ms.new_symbolic("y", 8);
        let sum = ms.add(&x, &y);
        let product = ms.mul(&x, &y);
        let _unused = ms.ult(&y, &x);
        ms.store_concrete_le(0, &sum);
        let addr = ms.constant(16, 0x40);
        ms.store_symbolic_le(&addr, &product);
        for v in [x, y, sum, product] {
            ms.release(v);
        }
        let before = ms.node_count();

        ms.collect_garbage(Lit::TRUE, true);
        assert_eq!(ms.gc_runs(), 1);
        assert!(ms.node_count() < before);

        let sum = ms.load_concrete_le(0, 1);
        let product = ms.load_symbolic_le(&addr, 1);
        for (a, b) in [(3u64, 4u64), (200, 100), (15, 17)] {
            let asg: Vec<bool> = (0..8)
                .map(|i| (a >> i) & 1 == 1)
                .chain((0..8).map(|i| (b >> i) & 1 == 1))
                .collect();
            assert_eq!(ms.evaluate(&sum, &asg), ((a + b) & 0xff) as u128);
            assert_eq!(ms.evaluate(&product, &asg), ((a * b) & 0xff) as u128);
        }
    }

    #[test]
    fn test_fraig_collection_with_reassociated_logic() {
        let mut ms = state(SweepConfig::default());
        let x = ms.new_symbolic("x", 8);
        let y = ms.new_symbolic("y", 8);
        let z = ms.new_symbolic("z", 8);
        let xy = ms.and(&x, &y);
        let left = ms.and(&xy, &z);
        let yz = ms.and(&y, &z);
        let right = ms.and(&x, &yz);
        ms.store_concrete_le(0, &left);
        ms.store_concrete_le(1, &right);
        for v in [x, y, z, xy, left, yz, right] {
            ms.release(v);
        }

        ms.collect_garbage(Lit::TRUE, true);
        assert_eq!(ms.gc_runs(), 1);

        let both = ms.load_concrete_le(0, 2);
        for (a, b, c) in [(0xffu64, 0x0fu64, 0x3cu64), (0xa5, 0x5a, 0xff), (0x81, 0x83, 0x01)] {
            let asg: Vec<bool> = [a, b, c]
                .iter()
                .flat_map(|&v| (0..8).map(move |i| (v >> i) & 1 == 1))
                .collect();
            let expected = (a & b & c) as u128;
            assert_eq!(ms.evaluate(&both, &asg), expected | (expected << 8));
        }
        ms.release(both);
        assert!(ms.destroy().0.is_clean());
    }

    #[test]
    fn test_threshold_moves() {
        let mut ms = state(SweepConfig::default());
        let x = ms.new_symbolic("x", 8);
        let kept = ms.probe_vector(x);
        assert_eq!(ms.collect_garbage(Lit::TRUE, false), Lit::TRUE);
        assert_eq!(ms.gc_runs(), 1);
        // Nothing grew since, so the next call is a no-op
        ms.collect_garbage(Lit::TRUE, false);
        assert_eq!(ms.gc_runs(), 1);
        let x = ms.vector_from_probes(kept);
        assert_eq!(x.width(), 8);
    }

    #[test]
    fn test_condition_survives_collection() {
        let mut ms = state(SweepConfig::default());
        let a = ms.new_symbolic("a", 4);
        let b = ms.new_symbolic("b", 4);
        let c = ms.ult(&a, &b);
        let c = ms.collect_garbage(c, true);
        for (x, y) in [(1u64, 2u64), (5, 3), (7, 7)] {
            let asg: Vec<bool> = (0..4)
                .map(|i| (x >> i) & 1 == 1)
                .chain((0..4).map(|i| (y >> i) & 1 == 1))
                .collect();
            let value = ms.context().circuit.evaluate(&[c], &asg)[0];
            assert_eq!(value, x < y);
        }
    }

    #[test]
    fn test_collection_inside_fork_keeps_suspended_state() {
        let config = EngineConfig::default().with_gc(0, 1);
        let mut ms = MachineState::with_config("gc-fork", 0, 4, 0, 16, config).unwrap();
        let x = ms.new_symbolic("x", 8);
        let three = ms.constant(8, 3);
        let t = ms.mul(&x, &three);
        ms.store_concrete_le(0, &t);
        for v in [x, three, t] {
            ms.release(v);
        }
        let c = ms.context_mut().circuit.new_input("c");
        ms.conditional(
            c,
            &mut |ms| {
                let d = ms.constant(8, 1);
                ms.store_concrete_le(1, &d);
                ms.release(d);
                ms.collect_garbage(Lit::TRUE, true);
                let inner = ms.context_mut().circuit.new_input("d");
                ms.conditional(inner, &mut |_| {}, &mut |_| {}, &mut |_| {}, &mut |_| {}, false);
            },
            &mut |_| {},
            &mut |_| {},
            &mut |_| {},
            false,
        );
        assert!(ms.gc_runs() >= 2);
        let v = ms.load_concrete_le(0, 1);
        // x = 5, c = 1, d = 0
        let mut asg = vec![true, false, true, false, false, false, false, false];
        asg.extend([true, false]);
        assert_eq!(ms.evaluate(&v, &asg), 15);
        ms.release(v);
        assert!(ms.destroy().0.is_clean());
    }
}
