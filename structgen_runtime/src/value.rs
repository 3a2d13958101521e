/* Concrete values of structured types and the primitives they recurse into */

use crate::errors::{SemanticError, SemanticResult};
use crate::record::RecordValue;
use crate::sequence::SeqValue;
use crate::union::UnionValue;

/* One element/field/alternative slot; `None` is unbound (or omitted) */
pub type Element = Option<Value>;

#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    Charstring(String),
    Octetstring(Vec<u8>),
    Seq(SeqValue),
    Union(UnionValue),
    Record(RecordValue),
}

impl Value {
    pub fn type_name(&self) -> &str {
        match self {
            Value::Integer(_) => "integer",
            Value::Boolean(_) => "boolean",
            Value::Charstring(_) => "charstring",
            Value::Octetstring(_) => "octetstring",
            Value::Seq(seq) => seq.type_name(),
            Value::Union(union) => union.type_name(),
            Value::Record(record) => record.type_name(),
        }
    }

    pub fn is_bound(&self) -> bool {
        match self {
            Value::Integer(_) | Value::Boolean(_) | Value::Charstring(_) | Value::Octetstring(_) => true,
            Value::Seq(seq) => seq.is_bound(),
            Value::Union(union) => union.is_bound(),
            Value::Record(record) => record.is_bound(),
        }
    }

    /// Value equality; fails when either operand is unbound.
    pub fn equals(&self, other: &Value) -> SemanticResult<bool> {
        match (self, other) {
            (Value::Seq(a), Value::Seq(b)) => a.equals(b),
            (Value::Union(a), Value::Union(b)) => a.equals(b),
            (Value::Record(a), Value::Record(b)) => a.equals(b),
            _ => {
                for operand in [self, other] {
                    if !operand.is_bound() {
                        return Err(SemanticError::UnboundOperand {
                            type_name: operand.type_name().to_string(),
                            operation: "comparison",
                        });
                    }
                }
                Ok(self == other)
            }
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Charstring(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Octetstring(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> SemanticResult<&SeqValue> {
        match self {
            Value::Seq(seq) => Ok(seq),
            other => Err(mismatch("record of/set of", other)),
        }
    }

    pub fn as_seq_mut(&mut self) -> SemanticResult<&mut SeqValue> {
        match self {
            Value::Seq(seq) => Ok(seq),
            other => Err(mismatch("record of/set of", other)),
        }
    }

    pub fn as_union(&self) -> SemanticResult<&UnionValue> {
        match self {
            Value::Union(union) => Ok(union),
            other => Err(mismatch("union", other)),
        }
    }

    pub fn as_union_mut(&mut self) -> SemanticResult<&mut UnionValue> {
        match self {
            Value::Union(union) => Ok(union),
            other => Err(mismatch("union", other)),
        }
    }

    pub fn as_record(&self) -> SemanticResult<&RecordValue> {
        match self {
            Value::Record(record) => Ok(record),
            other => Err(mismatch("record", other)),
        }
    }

    pub fn as_record_mut(&mut self) -> SemanticResult<&mut RecordValue> {
        match self {
            Value::Record(record) => Ok(record),
            other => Err(mismatch("record", other)),
        }
    }
}

fn mismatch(expected: &str, found: &Value) -> SemanticError {
    SemanticError::TypeMismatch {
        operation: "value access",
        expected: expected.to_string(),
        found: found.type_name().to_string(),
    }
}

/* Structural equality; unbound compares equal to unbound */
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Charstring(a), Value::Charstring(b)) => a == b,
            (Value::Octetstring(a), Value::Octetstring(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => a == b,
            (Value::Union(a), Value::Union(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Charstring(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Charstring(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Octetstring(v)
    }
}

impl From<SeqValue> for Value {
    fn from(v: SeqValue) -> Self {
        Value::Seq(v)
    }
}

impl From<UnionValue> for Value {
    fn from(v: UnionValue) -> Self {
        Value::Union(v)
    }
}

impl From<RecordValue> for Value {
    fn from(v: RecordValue) -> Self {
        Value::Record(v)
    }
}
