/* Record-of/set-of values
 *
 * One implementation of the sequence operations, parameterized by the
 * element storage strategy. */

use crate::errors::{SemanticError, SemanticResult};
use crate::matching::max_matching;
use crate::storage::{ElementStorage, ElementStore, Ownership};
use crate::value::Element;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use structgen_gen::codegen::shared::plan::Representation;

/// Upper bound on the number of slots a value grows to through indexing,
/// resizing or parameter trees.
pub const MAX_ELEMENTS: usize = 1 << 24;

/// Slot count needed to hold `index`, `None` past [`MAX_ELEMENTS`].
pub fn slots_for_index(index: usize) -> Option<usize> {
    index.checked_add(1).filter(|len| *len <= MAX_ELEMENTS)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqShape {
    pub type_name: Rc<str>,
    pub set_of: bool,
    pub representation: Representation,
}

impl SeqShape {
    pub fn new(type_name: &str, set_of: bool, representation: Representation) -> Self {
        Self {
            type_name: Rc::from(type_name),
            set_of,
            representation,
        }
    }
}

/// Handle on one element slot held by a caller. While a handle is live the
/// slot survives resizes of its value; give it back with
/// [`SeqValue::release`].
#[must_use]
#[derive(Debug, PartialEq, Eq)]
pub struct ElementRef {
    index: usize,
}

impl ElementRef {
    pub fn index(&self) -> usize {
        self.index
    }
}

pub struct SeqValue<S: ElementStorage = ElementStore> {
    shape: SeqShape,
    storage: Option<S>,
    /* slot index -> number of live handles */
    referenced: BTreeMap<usize, usize>,
}

/* Handles belong to the value they were taken from, so a copy starts with none */
impl<S: ElementStorage> Clone for SeqValue<S> {
    fn clone(&self) -> Self {
        Self {
            shape: self.shape.clone(),
            storage: self.storage.clone(),
            referenced: BTreeMap::new(),
        }
    }
}

impl<S: ElementStorage> fmt::Debug for SeqValue<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.storage {
            None => write!(f, "{} <unbound>", self.shape.type_name),
            Some(storage) => f.debug_list().entries(storage.slots()).finish(),
        }
    }
}

impl<S: ElementStorage> PartialEq for SeqValue<S> {
    fn eq(&self, other: &Self) -> bool {
        match (&self.storage, &other.storage) {
            (None, None) => true,
            (Some(a), Some(b)) => slots_equal(a.slots(), b.slots(), self.shape.set_of),
            _ => false,
        }
    }
}

impl<S: ElementStorage> SeqValue<S> {
    pub fn unbound(shape: SeqShape) -> Self {
        Self {
            shape,
            storage: None,
            referenced: BTreeMap::new(),
        }
    }

    pub fn with_elements(shape: SeqShape, elements: Vec<Element>) -> Self {
        let storage = S::create(shape.representation, elements);
        Self {
            shape,
            storage: Some(storage),
            referenced: BTreeMap::new(),
        }
    }

    /* The empty literal `{}` */
    pub fn empty(shape: SeqShape) -> Self {
        Self::with_elements(shape, Vec::new())
    }

    pub fn shape(&self) -> &SeqShape {
        &self.shape
    }

    pub fn type_name(&self) -> &str {
        &self.shape.type_name
    }

    pub fn is_set_of(&self) -> bool {
        self.shape.set_of
    }

    pub fn is_bound(&self) -> bool {
        self.storage.is_some()
    }

    pub fn clean_up(&mut self) {
        self.storage = None;
    }

    pub fn ownership(&self) -> Option<Ownership> {
        self.storage.as_ref().map(ElementStorage::ownership)
    }

    /* Slots of a bound value */
    pub fn elements(&self) -> Option<&[Element]> {
        self.storage.as_ref().map(ElementStorage::slots)
    }

    fn unbound_error(&self, operation: &'static str) -> SemanticError {
        SemanticError::UnboundOperand {
            type_name: self.shape.type_name.to_string(),
            operation,
        }
    }

    fn slots(&self, operation: &'static str) -> SemanticResult<&[Element]> {
        self.elements().ok_or_else(|| self.unbound_error(operation))
    }

    fn storage_mut(&mut self) -> &mut S {
        let representation = self.shape.representation;
        self.storage.get_or_insert_with(|| S::create(representation, Vec::new()))
    }

    fn size_limit(&self, requested: usize) -> SemanticError {
        SemanticError::SizeLimit {
            type_name: self.shape.type_name.to_string(),
            requested,
            limit: MAX_ELEMENTS,
        }
    }

    fn derived(&self, elements: Vec<Element>) -> Self {
        Self::with_elements(self.shape.clone(), elements)
    }

    /// Assignment. Shares the source's slots unless handles are live on this
    /// value, in which case elements are copied into the existing slots.
    pub fn assign(&mut self, other: &Self) -> SemanticResult<()> {
        let source = other.slots("assignment")?;
        if self.referenced.is_empty() {
            self.storage = other.storage.clone();
            return Ok(());
        }
        let keep = source.len().max(self.referenced_span());
        let copied: Vec<Element> = source.to_vec();
        let target = self.storage_mut().slots_mut();
        target.resize(keep, None);
        for (index, slot) in target.iter_mut().enumerate() {
            *slot = copied.get(index).cloned().flatten();
        }
        Ok(())
    }

    /* One past the highest referenced slot */
    fn referenced_span(&self) -> usize {
        self.referenced.keys().next_back().map_or(0, |index| index + 1)
    }

    pub fn size_of(&self) -> SemanticResult<usize> {
        Ok(self.slots("sizeof")?.len())
    }

    /* Length without trailing unbound slots */
    pub fn length_of(&self) -> SemanticResult<usize> {
        let slots = self.slots("lengthof")?;
        Ok(slots.iter().rposition(Option::is_some).map_or(0, |last| last + 1))
    }

    pub fn element_at(&self, index: usize) -> SemanticResult<&Element> {
        let slots = self.slots("indexing")?;
        slots.get(index).ok_or_else(|| SemanticError::IndexOverflow {
            type_name: self.shape.type_name.to_string(),
            index,
            size: slots.len(),
        })
    }

    /// Mutable indexing; binds the value and grows it with unbound slots as
    /// needed.
    pub fn element_at_mut(&mut self, index: usize) -> SemanticResult<&mut Element> {
        let len = slots_for_index(index).ok_or_else(|| self.size_limit(index.saturating_add(1)))?;
        let storage = self.storage_mut();
        if len > storage.len() {
            storage.resize(len);
        }
        Ok(&mut storage.slots_mut()[index])
    }

    pub fn push(&mut self, element: Element) {
        self.storage_mut().slots_mut().push(element);
    }

    /// Resize. Shrinking drops trailing slots, except that slots with live
    /// handles stay allocated with their content cleared.
    pub fn set_size(&mut self, size: usize) -> SemanticResult<()> {
        if size > MAX_ELEMENTS {
            return Err(self.size_limit(size));
        }
        let keep = size.max(self.referenced_span());
        let storage = self.storage_mut();
        if keep != storage.len() {
            storage.resize(keep);
        }
        if keep > size {
            for slot in &mut storage.slots_mut()[size..keep] {
                *slot = None;
            }
        }
        Ok(())
    }

    pub fn equals(&self, other: &Self) -> SemanticResult<bool> {
        let mine = self.slots("comparison")?;
        let theirs = other.slots("comparison")?;
        Ok(slots_equal(mine, theirs, self.shape.set_of))
    }

    /* Comparison with the empty literal `{}` */
    pub fn equals_empty(&self) -> SemanticResult<bool> {
        Ok(self.slots("comparison")?.is_empty())
    }

    pub fn concat(&self, other: &Self) -> SemanticResult<Self> {
        let mut elements = self.slots("concatenation")?.to_vec();
        elements.extend_from_slice(other.slots("concatenation")?);
        Ok(self.derived(elements))
    }

    pub fn subrange(&self, start: usize, count: usize) -> SemanticResult<Self> {
        let slots = self.slots("substr")?;
        let end = self.checked_end(start, count, slots.len())?;
        Ok(self.derived(slots[start..end].to_vec()))
    }

    /* `replace`: swap `count` slots starting at `start` for the replacement */
    pub fn splice(&self, start: usize, count: usize, replacement: &Self) -> SemanticResult<Self> {
        let slots = self.slots("replace")?;
        let inserted = replacement.slots("replace")?;
        let end = self.checked_end(start, count, slots.len())?;
        let mut elements = Vec::with_capacity(slots.len() - count + inserted.len());
        elements.extend_from_slice(&slots[..start]);
        elements.extend_from_slice(inserted);
        elements.extend_from_slice(&slots[end..]);
        Ok(self.derived(elements))
    }

    fn checked_end(&self, start: usize, count: usize, size: usize) -> SemanticResult<usize> {
        match start.checked_add(count) {
            Some(end) if end <= size => Ok(end),
            _ => Err(SemanticError::IndexOverflow {
                type_name: self.shape.type_name.to_string(),
                index: start.saturating_add(count),
                size,
            }),
        }
    }

    pub fn rotate_left(&self, by: usize) -> SemanticResult<Self> {
        let mut elements = self.slots("rotation")?.to_vec();
        if !elements.is_empty() {
            let shift = by % elements.len();
            elements.rotate_left(shift);
        }
        Ok(self.derived(elements))
    }

    pub fn rotate_right(&self, by: usize) -> SemanticResult<Self> {
        let mut elements = self.slots("rotation")?.to_vec();
        if !elements.is_empty() {
            let shift = by % elements.len();
            elements.rotate_right(shift);
        }
        Ok(self.derived(elements))
    }

    /// Take a handle on a slot, binding and growing the value as needed.
    pub fn reference(&mut self, index: usize) -> SemanticResult<ElementRef> {
        self.element_at_mut(index)?;
        *self.referenced.entry(index).or_insert(0) += 1;
        Ok(ElementRef { index })
    }

    pub fn release(&mut self, handle: ElementRef) {
        if let Some(count) = self.referenced.get_mut(&handle.index) {
            *count -= 1;
            if *count == 0 {
                self.referenced.remove(&handle.index);
            }
        }
    }

    pub fn get(&self, handle: &ElementRef) -> Option<&Element> {
        self.elements().and_then(|slots| slots.get(handle.index))
    }

    pub fn get_mut(&mut self, handle: &ElementRef) -> SemanticResult<&mut Element> {
        self.element_at_mut(handle.index)
    }
}

fn slots_equal(a: &[Element], b: &[Element], unordered: bool) -> bool {
    if a.len() != b.len() {
        return false;
    }
    if unordered {
        max_matching(a.len(), b.len(), |l, r| a[l] == b[r]) == a.len()
    } else {
        a.iter().zip(b).all(|(x, y)| x == y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FlatStore, SharedStore};
    use crate::value::Value;

    fn shape(set_of: bool) -> SeqShape {
        SeqShape::new("Ints", set_of, Representation::Shared)
    }

    fn ints<S: ElementStorage>(values: &[i64]) -> SeqValue<S> {
        SeqValue::with_elements(shape(false), values.iter().map(|v| Some(Value::Integer(*v))).collect())
    }

    fn copy_on_write<S: ElementStorage>() {
        let a: SeqValue<S> = ints(&[1, 2, 3]);
        let mut b = SeqValue::unbound(shape(false));
        b.assign(&a).unwrap();
        *b.element_at_mut(1).unwrap() = Some(Value::Integer(20));
        assert_eq!(a.element_at(1).unwrap(), &Some(Value::Integer(2)));
        assert_eq!(b.element_at(1).unwrap(), &Some(Value::Integer(20)));
    }

    #[test]
    fn copy_on_write_holds_for_both_strategies() {
        copy_on_write::<SharedStore>();
        copy_on_write::<FlatStore>();
        copy_on_write::<ElementStore>();
    }

    #[test]
    fn unbound_operations_fail() {
        let value: SeqValue = SeqValue::unbound(shape(false));
        assert!(matches!(value.size_of(), Err(SemanticError::UnboundOperand { .. })));
        assert!(matches!(value.rotate_left(1), Err(SemanticError::UnboundOperand { .. })));
        assert!(matches!(value.equals_empty(), Err(SemanticError::UnboundOperand { .. })));
    }

    #[test]
    fn length_of_trims_trailing_unbound() {
        let mut value: SeqValue = ints(&[1]);
        value.element_at_mut(3).unwrap();
        assert_eq!(value.size_of().unwrap(), 4);
        assert_eq!(value.length_of().unwrap(), 1);
    }

    #[test]
    fn set_size_keeps_referenced_slots() {
        let mut value: SeqValue = ints(&[1, 2, 3, 4]);
        let handle = value.reference(3).unwrap();
        value.set_size(1).unwrap();
        assert_eq!(value.size_of().unwrap(), 4);
        assert_eq!(value.get(&handle), Some(&None));
        value.release(handle);
        value.set_size(1).unwrap();
        assert_eq!(value.size_of().unwrap(), 1);
    }

    #[test]
    fn growth_past_the_size_limit_fails() {
        let mut value: SeqValue = ints(&[1, 2]);
        assert!(matches!(value.element_at_mut(usize::MAX), Err(SemanticError::SizeLimit { .. })));
        assert!(matches!(value.element_at_mut(MAX_ELEMENTS), Err(SemanticError::SizeLimit { .. })));
        assert!(matches!(value.reference(usize::MAX), Err(SemanticError::SizeLimit { .. })));
        assert!(matches!(value.set_size(MAX_ELEMENTS + 1), Err(SemanticError::SizeLimit { .. })));
        assert_eq!(value, ints(&[1, 2]));
    }

    #[test]
    fn structural_operations() {
        let value: SeqValue = ints(&[1, 2, 3, 4]);
        assert_eq!(value.rotate_left(5).unwrap(), ints(&[2, 3, 4, 1]));
        assert_eq!(value.rotate_right(1).unwrap(), ints(&[4, 1, 2, 3]));
        assert_eq!(value.subrange(1, 2).unwrap(), ints(&[2, 3]));
        assert!(matches!(value.subrange(3, 2), Err(SemanticError::IndexOverflow { .. })));
        assert_eq!(value.splice(1, 2, &ints(&[9])).unwrap(), ints(&[1, 9, 4]));
        assert_eq!(value.concat(&ints(&[5])).unwrap(), ints(&[1, 2, 3, 4, 5]));

        let empty: SeqValue = SeqValue::empty(shape(false));
        assert_eq!(empty.rotate_left(3).unwrap().size_of().unwrap(), 0);
    }

    #[test]
    fn set_of_equality_ignores_order() {
        let a: SeqValue = SeqValue::with_elements(shape(true), vec![Some(Value::Integer(1)), Some(Value::Integer(2))]);
        let b: SeqValue = SeqValue::with_elements(shape(true), vec![Some(Value::Integer(2)), Some(Value::Integer(1))]);
        assert!(a.equals(&b).unwrap());
        let c: SeqValue = ints(&[1, 2]);
        let d: SeqValue = ints(&[2, 1]);
        assert!(!c.equals(&d).unwrap());
    }
}
