use core::fmt;

use cadre_arith::UPoly;
use hashbrown::HashMap;
use log::debug;

/// A stable handle into the [`PolyArena`]. Handles are small and copyable;
/// two handles are equal iff the interned polynomials are structurally
/// equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PolyId(u32);

impl PolyId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PolyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

static_assertions::assert_eq_size!(PolyId, u32);

/// The owning, deduplicating store for every univariate polynomial produced
/// during projection. All other components hold [`PolyId`] handles; the
/// arena frees every polynomial exactly once on drop.
#[derive(Debug, Default)]
pub struct PolyArena {
    slots: Vec<Option<UPoly>>,
    by_value: HashMap<UPoly, PolyId>,
    free: Vec<u32>,
}

impl PolyArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a polynomial, returning its stable handle and whether it was
    /// newly inserted.
    pub fn intern(&mut self, poly: UPoly) -> (PolyId, bool) {
        if let Some(&id) = self.by_value.get(&poly) {
            return (id, false);
        }
        let id = match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(poly.clone());
                PolyId(slot)
            }
            None => {
                self.slots.push(Some(poly.clone()));
                PolyId((self.slots.len() - 1) as u32)
            }
        };
        self.by_value.insert(poly, id);
        (id, true)
    }

    /// Looks up an already interned polynomial.
    pub fn find(&self, poly: &UPoly) -> Option<PolyId> {
        self.by_value.get(poly).copied()
    }

    pub fn get(&self, id: PolyId) -> &UPoly {
        self.slots[id.index()]
            .as_ref()
            .expect("stale polynomial handle")
    }

    /// Releases a polynomial whose handles are all gone. The slot is
    /// recycled for later interning.
    pub fn release(&mut self, id: PolyId) {
        if let Some(poly) = self.slots[id.index()].take() {
            self.by_value.remove(&poly);
            self.free.push(id.index() as u32);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

impl Drop for PolyArena {
    fn drop(&mut self) {
        if self.len() > 0 {
            debug!("dropping arena with {} polynomials", self.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use cadre_arith::{MPoly, Variable};

    use super::*;

    fn poly(k: i64) -> UPoly {
        let x = Variable::real(0);
        UPoly::new(
            x,
            vec![MPoly::constant(cadre_arith::num_util::int(k)), MPoly::one()],
        )
    }

    #[test]
    fn interning_deduplicates() {
        let mut arena = PolyArena::new();
        let (a, fresh_a) = arena.intern(poly(1));
        let (b, fresh_b) = arena.intern(poly(1));
        let (c, _) = arena.intern(poly(2));
        assert!(fresh_a && !fresh_b);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(a), &poly(1));
    }

    #[test]
    fn release_recycles_slots() {
        let mut arena = PolyArena::new();
        let (a, _) = arena.intern(poly(1));
        arena.release(a);
        assert_eq!(arena.len(), 0);
        assert_eq!(arena.find(&poly(1)), None);
        let (b, fresh) = arena.intern(poly(3));
        assert!(fresh);
        assert_eq!(b.index(), a.index());
    }
}
