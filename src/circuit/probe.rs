//! Probes: stable handles to literals that survive a sweep

use super::lit::Lit;

/// Handle to a probe slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProbeId(usize);

impl ProbeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct ProbeTable {
    slots: Vec<Option<Lit>>,
    free: Vec<usize>,
    live: usize,
}

impl ProbeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, lit: Lit) -> ProbeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            self.slots[index] = Some(lit);
            return ProbeId(index);
        }
        self.slots.push(Some(lit));
        ProbeId(self.slots.len() - 1)
    }

    pub fn lit(&self, id: ProbeId) -> Lit {
        match self.slots.get(id.0) {
            Some(Some(lit)) => *lit,
            _ => panic!("probe {} is not live", id.0),
        }
    }

    pub fn update(&mut self, id: ProbeId, lit: Lit) {
        match self.slots.get_mut(id.0) {
            Some(slot) if slot.is_some() => *slot = Some(lit),
            _ => panic!("probe {} is not live", id.0),
        }
    }

    pub fn delete(&mut self, id: ProbeId) {
        match self.slots.get_mut(id.0) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                self.free.push(id.0);
                self.live -= 1;
            }
            _ => panic!("probe {} deleted twice", id.0),
        }
    }

    pub fn live(&self) -> usize {
        self.live
    }

    /// Literals of every live probe
    pub fn lits(&self) -> impl Iterator<Item = Lit> + '_ {
        self.slots.iter().flatten().copied()
    }

    /// Rewrite every live probe through `f`
    pub fn remap(&mut self, mut f: impl FnMut(Lit) -> Lit) {
        for lit in self.slots.iter_mut().flatten() {
            *lit = f(*lit);
        }
    }
}
