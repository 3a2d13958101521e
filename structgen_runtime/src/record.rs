/* Record values. Records carry the fields tag rules and open-type
 * constraints refer to; `None` fields are unbound or omitted. */

use crate::errors::{SemanticError, SemanticResult};
use crate::value::{Element, Value};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordShape {
    pub type_name: Rc<str>,
    pub fields: Rc<[String]>,
}

impl RecordShape {
    pub fn new(type_name: &str, fields: Vec<String>) -> Self {
        Self {
            type_name: Rc::from(type_name),
            fields: Rc::from(fields),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordValue {
    shape: RecordShape,
    fields: Option<Vec<Element>>,
}

impl PartialEq for RecordValue {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl RecordValue {
    pub fn unbound(shape: RecordShape) -> Self {
        Self { shape, fields: None }
    }

    pub fn with_fields(shape: RecordShape, fields: Vec<Element>) -> Self {
        Self {
            shape,
            fields: Some(fields),
        }
    }

    pub fn shape(&self) -> &RecordShape {
        &self.shape
    }

    pub fn type_name(&self) -> &str {
        &self.shape.type_name
    }

    pub fn is_bound(&self) -> bool {
        self.fields.is_some()
    }

    pub fn clean_up(&mut self) {
        self.fields = None;
    }

    pub fn fields(&self) -> Option<&[Element]> {
        self.fields.as_deref()
    }

    pub fn field_index(&self, name: &str) -> SemanticResult<usize> {
        self.shape
            .fields
            .iter()
            .position(|field| field == name)
            .ok_or_else(|| SemanticError::UnknownAlternative {
                type_name: self.shape.type_name.to_string(),
                name: name.to_string(),
            })
    }

    pub fn field(&self, name: &str) -> SemanticResult<&Element> {
        let index = self.field_index(name)?;
        match &self.fields {
            Some(fields) => Ok(&fields[index]),
            None => Err(SemanticError::UnboundOperand {
                type_name: self.shape.type_name.to_string(),
                operation: "field access",
            }),
        }
    }

    pub fn field_mut(&mut self, name: &str) -> SemanticResult<&mut Element> {
        let index = self.field_index(name)?;
        Ok(self.field_mut_at(index))
    }

    pub fn field_mut_at(&mut self, index: usize) -> &mut Element {
        let count = self.shape.fields.len();
        let fields = self.fields.get_or_insert_with(|| vec![None; count]);
        &mut fields[index]
    }

    pub fn set(&mut self, name: &str, value: Value) -> SemanticResult<()> {
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
        self.fields = other.fields.clone();
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
        Ok(self == other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> RecordValue {
        RecordValue::unbound(RecordShape::new("Pair", vec!["left".into(), "right".into()]))
    }

    #[test]
    fn assigning_an_unbound_record_fails_and_keeps_the_target() {
        let mut target = pair();
        target.set("left", Value::Integer(1)).unwrap();
        let before = target.clone();

        match target.assign(&pair()) {
            Err(SemanticError::UnboundOperand { type_name, operation }) => {
                assert_eq!(type_name, "Pair");
                assert_eq!(operation, "assignment");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(target, before);

        let mut copy = pair();
        copy.assign(&target).unwrap();
        assert!(copy.equals(&target).unwrap());
        assert_eq!(copy.field("right").unwrap(), &None);
    }
}
