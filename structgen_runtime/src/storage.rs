/* Element storage strategies for record-of/set-of values
 *
 * Both strategies implement the same contract; the sequence operations in
 * `sequence` are written once against `ElementStorage`. */

use crate::value::Element;
use std::fmt;
use std::rc::Rc;
use structgen_gen::codegen::shared::plan::Representation;

/* How many values currently see the same backing slots */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Exclusive,
    Shared(usize),
}

pub trait ElementStorage: Clone + fmt::Debug {
    fn create(representation: Representation, elements: Vec<Element>) -> Self;

    fn slots(&self) -> &[Element];

    /* Private slots for mutation, copying shared ones first */
    fn slots_mut(&mut self) -> &mut Vec<Element>;

    fn ownership(&self) -> Ownership;

    fn len(&self) -> usize {
        self.slots().len()
    }

    fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }

    fn get(&self, index: usize) -> Option<&Element> {
        self.slots().get(index)
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut Element> {
        self.slots_mut().get_mut(index)
    }

    /* Grow with unbound slots or drop trailing slots */
    fn resize(&mut self, len: usize) {
        if len != self.len() {
            self.slots_mut().resize(len, None);
        }
    }
}

/* Reference-counted slot arena; clones share slots until one side mutates */
#[derive(Clone, Debug, Default)]
pub struct SharedStore {
    slots: Rc<Vec<Element>>,
}

impl ElementStorage for SharedStore {
    fn create(_representation: Representation, elements: Vec<Element>) -> Self {
        Self {
            slots: Rc::new(elements),
        }
    }

    fn slots(&self) -> &[Element] {
        &self.slots
    }

    fn slots_mut(&mut self) -> &mut Vec<Element> {
        Rc::make_mut(&mut self.slots)
    }

    fn ownership(&self) -> Ownership {
        match Rc::strong_count(&self.slots) {
            1 => Ownership::Exclusive,
            count => Ownership::Shared(count),
        }
    }
}

/* Plain vector, copied on every clone */
#[derive(Clone, Debug, Default)]
pub struct FlatStore {
    slots: Vec<Element>,
}

impl ElementStorage for FlatStore {
    fn create(_representation: Representation, elements: Vec<Element>) -> Self {
        Self { slots: elements }
    }

    fn slots(&self) -> &[Element] {
        &self.slots
    }

    fn slots_mut(&mut self) -> &mut Vec<Element> {
        &mut self.slots
    }

    fn ownership(&self) -> Ownership {
        Ownership::Exclusive
    }
}

/* Storage picked at runtime from the representation flag */
#[derive(Clone, Debug)]
pub enum ElementStore {
    Shared(SharedStore),
    Flat(FlatStore),
}

impl ElementStorage for ElementStore {
    fn create(representation: Representation, elements: Vec<Element>) -> Self {
        match representation {
            Representation::Shared => ElementStore::Shared(SharedStore::create(representation, elements)),
            Representation::Flat => ElementStore::Flat(FlatStore::create(representation, elements)),
        }
    }

    fn slots(&self) -> &[Element] {
        match self {
            ElementStore::Shared(store) => store.slots(),
            ElementStore::Flat(store) => store.slots(),
        }
    }

    fn slots_mut(&mut self) -> &mut Vec<Element> {
        match self {
            ElementStore::Shared(store) => store.slots_mut(),
            ElementStore::Flat(store) => store.slots_mut(),
        }
    }

    fn ownership(&self) -> Ownership {
        match self {
            ElementStore::Shared(store) => store.ownership(),
            ElementStore::Flat(store) => store.ownership(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn shared_store_copies_on_write() {
        let original = SharedStore::create(Representation::Shared, vec![Some(Value::Integer(1))]);
        let mut copy = original.clone();
        assert_eq!(original.ownership(), Ownership::Shared(2));

        *copy.get_mut(0).unwrap() = Some(Value::Integer(2));
        assert_eq!(original.ownership(), Ownership::Exclusive);
        assert_eq!(copy.ownership(), Ownership::Exclusive);
        assert_eq!(original.get(0), Some(&Some(Value::Integer(1))));
        assert_eq!(copy.get(0), Some(&Some(Value::Integer(2))));
    }

    #[test]
    fn flat_store_is_always_exclusive() {
        let original = ElementStore::create(Representation::Flat, vec![None, None]);
        let copy = original.clone();
        assert_eq!(copy.ownership(), Ownership::Exclusive);
        assert_eq!(copy.len(), 2);
        assert!(matches!(original, ElementStore::Flat(_)));
    }
}
