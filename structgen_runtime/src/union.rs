/* Union values: unbound, or exactly one selected alternative */

use crate::errors::{SemanticError, SemanticResult};
use crate::value::{Element, Value};
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionShape {
    pub type_name: Rc<str>,
    pub alternatives: Rc<[String]>,
}

impl UnionShape {
    pub fn new(type_name: &str, alternatives: Vec<String>) -> Self {
        Self {
            type_name: Rc::from(type_name),
            alternatives: Rc::from(alternatives),
        }
    }
}

#[derive(Clone)]
pub struct UnionValue {
    shape: UnionShape,
    selected: Option<(usize, Box<Element>)>,
}

impl fmt::Debug for UnionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.selected {
            None => write!(f, "{} <unbound>", self.shape.type_name),
            Some((index, element)) => write!(f, "{{ {} := {:?} }}", self.shape.alternatives[*index], element),
        }
    }
}

impl PartialEq for UnionValue {
    fn eq(&self, other: &Self) -> bool {
        self.selected == other.selected
    }
}

impl UnionValue {
    pub fn unbound(shape: UnionShape) -> Self {
        Self { shape, selected: None }
    }

    pub fn shape(&self) -> &UnionShape {
        &self.shape
    }

    pub fn type_name(&self) -> &str {
        &self.shape.type_name
    }

    pub fn alternative_index(&self, name: &str) -> SemanticResult<usize> {
        self.shape
            .alternatives
            .iter()
            .position(|alternative| alternative == name)
            .ok_or_else(|| SemanticError::UnknownAlternative {
                type_name: self.shape.type_name.to_string(),
                name: name.to_string(),
            })
    }

    /* Bound once an alternative is selected and its content is bound */
    pub fn is_bound(&self) -> bool {
        self.selection().is_some_and(|(_, value)| value.is_bound())
    }

    pub fn clean_up(&mut self) {
        self.selected = None;
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected.as_ref().map(|(index, _)| *index)
    }

    pub fn selected_name(&self) -> Option<&str> {
        self.selected_index().map(|index| self.shape.alternatives[index].as_str())
    }

    /* Selected alternative and content of a bound value */
    pub fn selection(&self) -> Option<(usize, &Value)> {
        let (index, element) = self.selected.as_ref()?;
        let element: &Element = element;
        element.as_ref().map(|value| (*index, value))
    }

    pub fn ischosen(&self, name: &str) -> SemanticResult<bool> {
        let index = self.alternative_index(name)?;
        Ok(self.selected_index() == Some(index))
    }

    /// Read access to an alternative; fails unless it is the selected one.
    pub fn field(&self, name: &str) -> SemanticResult<&Element> {
        let index = self.alternative_index(name)?;
        match &self.selected {
            None => Err(SemanticError::UnboundOperand {
                type_name: self.shape.type_name.to_string(),
                operation: "alternative access",
            }),
            Some((active, element)) if *active == index => Ok(&**element),
            Some((active, _)) => Err(SemanticError::WrongAlternative {
                type_name: self.shape.type_name.to_string(),
                requested: name.to_string(),
                active: self.shape.alternatives[*active].clone(),
            }),
        }
    }

    /// Write access to an alternative, switching to it (and discarding the
    /// previous content) when another one is selected.
    pub fn field_mut(&mut self, name: &str) -> SemanticResult<&mut Element> {
        let index = self.alternative_index(name)?;
        Ok(self.field_mut_at(index))
    }

    pub fn field_mut_at(&mut self, index: usize) -> &mut Element {
        if self.selected_index() != Some(index) {
            self.selected = None;
        }
        let (_, element) = self.selected.get_or_insert_with(|| (index, Box::new(None)));
        &mut **element
    }

    pub fn select(&mut self, name: &str, value: Value) -> SemanticResult<()> {
        *self.field_mut(name)? = Some(value);
        Ok(())
    }

    pub fn assign(&mut self, other: &Self) -> SemanticResult<()> {
        if !other.is_bound() {
            return Err(SemanticError::UnboundOperand {
                type_name: other.shape.type_name.to_string(),
                operation: "assignment",
            });
        }
        self.selected = other.selected.clone();
        Ok(())
    }

    pub fn equals(&self, other: &Self) -> SemanticResult<bool> {
        for operand in [self, other] {
            if !operand.is_bound() {
                return Err(SemanticError::UnboundOperand {
                    type_name: operand.shape.type_name.to_string(),
                    operation: "comparison",
                });
            }
        }
        match (self.selection(), other.selection()) {
            (Some((a, x)), Some((b, y))) if a == b => x.equals(y),
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice() -> UnionValue {
        UnionValue::unbound(UnionShape::new("Choice", vec!["a".into(), "b".into()]))
    }

    #[test]
    fn mutating_accessor_switches_alternative() {
        let mut value = choice();
        value.select("a", Value::Integer(1)).unwrap();
        assert!(value.ischosen("a").unwrap());

        let b = value.field_mut("b").unwrap();
        assert_eq!(b, &mut None);
        assert!(!value.is_bound());
        assert_eq!(value.selected_name(), Some("b"));
    }

    #[test]
    fn reading_another_alternative_fails() {
        let mut value = choice();
        value.select("a", Value::Integer(1)).unwrap();
        match value.field("b") {
            Err(SemanticError::WrongAlternative { requested, active, .. }) => {
                assert_eq!(requested, "b");
                assert_eq!(active, "a");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(value.field("c"), Err(SemanticError::UnknownAlternative { .. })));
    }

    #[test]
    fn comparing_unbound_fails() {
        let bound = {
            let mut value = choice();
            value.select("b", Value::from("x")).unwrap();
            value
        };
        assert!(matches!(bound.equals(&choice()), Err(SemanticError::UnboundOperand { .. })));
        assert!(bound.equals(&bound.clone()).unwrap());
    }

    #[test]
    fn assigning_an_unbound_union_fails_and_keeps_the_target() {
        let mut target = choice();
        target.select("a", Value::Integer(7)).unwrap();
        assert!(matches!(target.assign(&choice()), Err(SemanticError::UnboundOperand { .. })));
        assert_eq!(target.selection(), Some((0, &Value::Integer(7))));

        /* a selected alternative without content is still unbound */
        let mut empty = choice();
        empty.field_mut("b").unwrap();
        assert!(target.assign(&empty).is_err());
    }

    #[test]
    fn unions_nest_inside_unions() {
        let outer_shape = UnionShape::new("Outer", vec!["inner".into(), "flag".into()]);
        let mut inner = choice();
        inner.select("b", Value::from("deep")).unwrap();

        let mut outer = UnionValue::unbound(outer_shape);
        outer.select("inner", Value::Union(inner.clone())).unwrap();
        assert!(outer.is_bound());

        let Some(Some(Value::Union(found))) = outer.field("inner").ok() else {
            panic!("inner alternative should hold a union");
        };
        assert_eq!(found, &inner);

        let mut copy = UnionValue::unbound(outer.shape().clone());
        copy.assign(&outer).unwrap();
        assert!(copy.equals(&outer).unwrap());
    }
}
