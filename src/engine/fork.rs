//! Conditional branches
//!
//! A branch on a constant condition runs one side. With the SAT oracle
//! enabled, a condition that is constant under the current path condition
//! runs one side with that fact pushed. Anything else forks: both sides run
//! one after the other against private copies of the memories and the heap
//! cursor, then merge under the condition.
//!
//! A side that fails (infeasible, out of fork budget, or aborted by the
//! driver) sets the machine's branch error and contributes nothing to the
//! merged state.

use super::{ForkFrame, Memories, MachineState};
use crate::circuit::Lit;
use crate::diagnostics::Diagnostic;
use crate::ops;

/// Code run on one side of a branch
pub type Continuation<'a> = &'a mut dyn FnMut(&mut MachineState);

/// How a branch was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchState {
    /// Constant condition, true side only
    DirectTrue,
    DirectFalse,
    /// Condition proved constant under the path condition
    FoldedTrue,
    FoldedFalse,
    /// Both sides ran and at least one survived
    Forked,
    /// Nothing survived; the branch error is set
    Errored,
}

impl MachineState {
    /// Branch on `cond`.
    ///
    /// `on_true`/`on_false` run the two sides; their cleanups release
    /// whatever the side allocated. When `use_sat` is set the oracle is asked
    /// whether the condition is already decided by the path condition before
    /// forking.
    pub fn conditional(
        &mut self,
        cond: Lit,
        on_true: Continuation,
        true_cleanup: Continuation,
        on_false: Continuation,
        false_cleanup: Continuation,
        use_sat: bool,
    ) -> BranchState {
        if self.branch_error {
            return BranchState::Errored;
        }
        let cond = self.collect_garbage(cond, false);

        match cond.const_value() {
            Some(true) => return self.run_direct(BranchState::DirectTrue, on_true, true_cleanup),
            Some(false) => return self.run_direct(BranchState::DirectFalse, on_false, false_cleanup),
            None => {}
        }

        if use_sat {
            if self.cx.circuit.is_provably_constant(cond, true) {
                return self.run_folded(cond, true, on_true, true_cleanup);
            }
            if self.cx.circuit.is_provably_constant(cond, false) {
                return self.run_folded(cond, false, on_false, false_cleanup);
            }
        }

        self.fork(cond, on_true, true_cleanup, on_false, false_cleanup)
    }

    fn run_direct(&mut self, state: BranchState, body: Continuation, cleanup: Continuation) -> BranchState {
        body(self);
        if self.branch_error {
            return BranchState::Errored;
        }
        cleanup(self);
        state
    }

    fn run_folded(&mut self, cond: Lit, value: bool, body: Continuation, cleanup: Continuation) -> BranchState {
        self.cx.circuit.push_condition(cond, value);
        if self.cx.circuit.conditions_unsat() == Some(true) {
            tracing::debug!("{}: infeasible path pruned", self.name);
            self.branch_error = true;
            self.cx.circuit.pop_condition();
            return BranchState::Errored;
        }
        body(self);
        if self.branch_error {
            self.cx.circuit.pop_condition();
            return BranchState::Errored;
        }
        cleanup(self);
        self.cx.circuit.pop_condition();
        if value {
            BranchState::FoldedTrue
        } else {
            BranchState::FoldedFalse
        }
    }

    fn fork(
        &mut self,
        cond: Lit,
        on_true: Continuation,
        true_cleanup: Continuation,
        on_false: Continuation,
        false_cleanup: Continuation,
    ) -> BranchState {
        if self.fork_budget == 0 {
            self.cx.diagnostics.record(Diagnostic::ForkBudgetExhausted {
                depth: self.frames.len(),
            });
            self.branch_error = true;
            return BranchState::Errored;
        }
        self.fork_budget -= 1;
        tracing::debug!("{}: fork on {} at depth {}", self.name, cond, self.frames.len());

        let t_mem = self.memory.copy(&mut self.cx, &mut self.sym);
        let f_mem = self.memory.copy(&mut self.cx, &mut self.sym);
        let pre = std::mem::replace(&mut self.memory, t_mem);
        let pre_heap = self.cx.dup(&self.heap);
        self.frames.push(ForkFrame {
            cond,
            pre,
            sibling: Some(f_mem),
            pre_heap,
            sibling_heap: None,
        });

        self.cx.circuit.push_condition(cond, true);
        on_true(self);
        true_cleanup(self);
        let t_err = self.branch_error;
        self.cx.circuit.pop_condition();

        // Swap in the false side; the collector may have rewritten `cond`
        let Some(frame) = self.frames.last_mut() else {
            panic!("fork frame lost while running the true side");
        };
        let Some(f_mem) = frame.sibling.take() else {
            panic!("fork frame has no false-side memory");
        };
        let t_mem = std::mem::replace(&mut self.memory, f_mem);
        frame.sibling = Some(t_mem);
        let restored = self.cx.dup(&frame.pre_heap);
        frame.sibling_heap = Some(std::mem::replace(&mut self.heap, restored));
        let cond = frame.cond;
        self.branch_error = false;

        self.cx.circuit.push_condition(cond, false);
        on_false(self);
        false_cleanup(self);
        let f_err = self.branch_error;
        self.cx.circuit.pop_condition();

        let Some(frame) = self.frames.pop() else {
            panic!("fork frame lost while running the false side");
        };
        self.fork_budget += 1;
        self.merge(frame, t_err, f_err)
    }

    fn merge(&mut self, frame: ForkFrame, t_err: bool, f_err: bool) -> BranchState {
        let ForkFrame {
            cond,
            pre,
            sibling,
            pre_heap,
            sibling_heap,
        } = frame;
        let (Some(t_mem), Some(t_heap)) = (sibling, sibling_heap) else {
            panic!("fork frame is missing the true-side result");
        };

        match (t_err, f_err) {
            (true, true) => {
                tracing::debug!("{}: both sides failed, restoring pre-branch state", self.name);
                let f_mem = std::mem::replace(&mut self.memory, pre);
                t_mem.free(&mut self.cx, &mut self.sym);
                f_mem.free(&mut self.cx, &mut self.sym);
                let f_heap = std::mem::replace(&mut self.heap, pre_heap);
                self.cx.release(f_heap);
                self.cx.release(t_heap);
                self.branch_error = true;
                BranchState::Errored
            }
            (true, false) => {
                tracing::debug!("{}: true side failed, keeping false side", self.name);
                t_mem.free(&mut self.cx, &mut self.sym);
                pre.free(&mut self.cx, &mut self.sym);
                self.cx.release(t_heap);
                self.cx.release(pre_heap);
                self.branch_error = false;
                BranchState::Forked
            }
            (false, true) => {
                tracing::debug!("{}: false side failed, keeping true side", self.name);
                let f_mem = std::mem::replace(&mut self.memory, t_mem);
                f_mem.free(&mut self.cx, &mut self.sym);
                pre.free(&mut self.cx, &mut self.sym);
                let f_heap = std::mem::replace(&mut self.heap, t_heap);
                self.cx.release(f_heap);
                self.cx.release(pre_heap);
                self.branch_error = false;
                BranchState::Forked
            }
            (false, false) => {
                let f_mem = std::mem::replace(&mut self.memory, pre);
                let merged = Memories::ite(&mut self.cx, &mut self.sym, cond, t_mem, f_mem);
                let pre = std::mem::replace(&mut self.memory, merged);
                pre.free(&mut self.cx, &mut self.sym);
                let heap = ops::ite(&mut self.cx, cond, &t_heap, &self.heap);
                let f_heap = std::mem::replace(&mut self.heap, heap);
                self.cx.release(f_heap);
                self.cx.release(t_heap);
                self.cx.release(pre_heap);
                BranchState::Forked
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::vector::Vector;

    fn state() -> MachineState {
        MachineState::create("fork", 0, 16, 0x100, 16)
    }

    fn store_byte(ms: &mut MachineState, addr: u64, value: u64) {
        let v = ms.constant(8, value);
        ms.store_concrete_le(addr, &v);
        ms.release(v);
    }

    #[test]
    fn test_constant_condition_runs_one_side() {
        let mut ms = state();
        let state = ms.conditional(
            Lit::TRUE,
            &mut |ms| store_byte(ms, 0, 1),
            &mut |_| {},
            &mut |ms| store_byte(ms, 0, 2),
            &mut |_| {},
            false,
        );
        assert_eq!(state, BranchState::DirectTrue);
        let v = ms.load_concrete_le(0, 1);
        assert_eq!(v.as_u64(), Some(1));
        assert_eq!(ms.context().circuit.condition_depth(), 0);
    }

    #[test]
    fn test_symbolic_condition_forks_and_merges() {
        let mut ms = state();
        let c = ms.context_mut().circuit.new_input("c");
        let state = ms.conditional(
            c,
            &mut |ms| store_byte(ms, 3, 0x11),
            &mut |_| {},
            &mut |ms| store_byte(ms, 3, 0x22),
            &mut |_| {},
            true,
        );
        assert_eq!(state, BranchState::Forked);
        let v = ms.load_concrete_le(3, 1);
        assert_eq!(ms.evaluate(&v, &[true]), 0x11);
        assert_eq!(ms.evaluate(&v, &[false]), 0x22);
        assert_eq!(ms.fork_depth(), 0);
        ms.release(v);
        assert!(ms.destroy().0.is_clean());
    }

    #[test]
    fn test_provably_constant_condition_is_folded() {
        let mut ms = state();
        let a = ms.context_mut().circuit.new_input("a");
        let inner = std::cell::Cell::new(None);
        ms.conditional(
            a,
            &mut |ms| {
                // `a` already holds here
                let s = ms.conditional(
                    a,
                    &mut |ms| store_byte(ms, 0, 7),
                    &mut |_| {},
                    &mut |ms| store_byte(ms, 0, 9),
                    &mut |_| {},
                    true,
                );
                inner.set(Some(s));
            },
            &mut |_| {},
            &mut |ms| store_byte(ms, 0, 3),
            &mut |_| {},
            true,
        );
        assert_eq!(inner.get(), Some(BranchState::FoldedTrue));
        let v = ms.load_concrete_le(0, 1);
        assert_eq!(ms.evaluate(&v, &[true]), 7);
        assert_eq!(ms.evaluate(&v, &[false]), 3);
    }

    #[test]
    fn test_failed_side_contributes_nothing() {
        let mut ms = state();
        let c = ms.context_mut().circuit.new_input("c");
        let state = ms.conditional(
            c,
            &mut |ms| {
                store_byte(ms, 1, 0xaa);
                ms.abort_path();
            },
            &mut |_| {},
            &mut |ms| store_byte(ms, 1, 0xbb),
            &mut |_| {},
            false,
        );
        assert_eq!(state, BranchState::Forked);
        assert!(!ms.branch_error());
        let v = ms.load_concrete_le(1, 1);
        assert_eq!(v.as_u64(), Some(0xbb));
    }

    #[test]
    fn test_both_sides_failing_restores_state() {
        let mut ms = state();
        store_byte(&mut ms, 2, 0x55);
        let c = ms.context_mut().circuit.new_input("c");
        let state = ms.conditional(
            c,
            &mut |ms| {
                store_byte(ms, 2, 1);
                ms.abort_path();
            },
            &mut |_| {},
            &mut |ms| {
                store_byte(ms, 2, 2);
                ms.abort_path();
            },
            &mut |_| {},
            false,
        );
        assert_eq!(state, BranchState::Errored);
        assert!(ms.branch_error());
        ms.clear_branch_error();
        let v = ms.load_concrete_le(2, 1);
        assert_eq!(v.as_u64(), Some(0x55));
        assert_eq!(ms.heap().as_u64(), Some(0x100));
    }

    #[test]
    fn test_errored_state_short_circuits() {
        let mut ms = state();
        ms.abort_path();
        let state = ms.conditional(
            Lit::TRUE,
            &mut |_| panic!("must not run"),
            &mut |_| {},
            &mut |_| {},
            &mut |_| {},
            false,
        );
        assert_eq!(state, BranchState::Errored);
    }

    fn nest(ms: &mut MachineState, inputs: &[Lit]) {
        let Some((&c, rest)) = inputs.split_first() else {
            return;
        };
        ms.conditional(
            c,
            &mut |ms| nest(ms, rest),
            &mut |_| {},
            &mut |_| {},
            &mut |_| {},
            false,
        );
    }

    #[test]
    fn test_fork_budget_cuts_only_the_deep_side() {
        let config = EngineConfig::default().with_fork_depth(2);
        let mut ms = MachineState::with_config("budget", 0, 4, 0, 16, config).unwrap();
        let inputs: Vec<Lit> = (0..3)
            .map(|i| ms.context_mut().circuit.new_input(format!("c{}", i)))
            .collect();
        nest(&mut ms, &inputs);
        assert!(!ms.branch_error());
        assert_eq!(ms.diagnostics().events().len(), 1);
        assert!(matches!(
            ms.diagnostics().events()[0],
            Diagnostic::ForkBudgetExhausted { depth: 2 }
        ));
        assert!(ms.destroy().0.is_clean());
    }

    #[test]
    fn test_heap_cursor_merges() {
        let mut ms = state();
        let c = ms.context_mut().circuit.new_input("c");
        let alloc = |ms: &mut MachineState, size: u64| {
            let size = ms.constant(16, size);
            let start: Vector = ms.heap_alloc(&size);
            ms.release(size);
            ms.release(start);
        };
        ms.conditional(
            c,
            &mut |ms| alloc(ms, 0x10),
            &mut |_| {},
            &mut |ms| alloc(ms, 0x40),
            &mut |_| {},
            false,
        );
        assert_eq!(ms.evaluate(ms.heap(), &[true]), 0x110);
        assert_eq!(ms.evaluate(ms.heap(), &[false]), 0x140);
    }
}
