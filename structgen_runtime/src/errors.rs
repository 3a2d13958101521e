use std::fmt;
use thiserror::Error;

/// Semantic errors raised by value and template operations. Every variant
/// names the type and the operation that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("{operation} of an unbound value of type '{type_name}'")]
    UnboundOperand {
        type_name: String,
        operation: &'static str,
    },

    #[error("index overflow in a value of type '{type_name}': index {index} is not less than the size {size}")]
    IndexOverflow {
        type_name: String,
        index: usize,
        size: usize,
    },

    #[error("a value of type '{type_name}' cannot grow to {requested} elements (at most {limit})")]
    SizeLimit {
        type_name: String,
        requested: usize,
        limit: usize,
    },

    #[error("accessing alternative '{requested}' of type '{type_name}' while '{active}' is selected")]
    WrongAlternative {
        type_name: String,
        requested: String,
        active: String,
    },

    #[error("type '{type_name}' has no alternative or field named '{name}'")]
    UnknownAlternative { type_name: String, name: String },

    #[error("type mismatch in {operation}: expected {expected}, found {found}")]
    TypeMismatch {
        operation: &'static str,
        expected: String,
        found: String,
    },

    #[error("{operation} of a template that is not a specific value (found {selection})")]
    NotSpecific {
        selection: String,
        operation: &'static str,
    },

    #[error("type '{type_name}' is not known to the registry")]
    UnknownType { type_name: String },
}

pub type SemanticResult<T> = Result<T, SemanticError>;

/// Errors raised while encoding a bound value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("cannot encode an unbound value of type '{type_name}' at {path}")]
    Unbound { type_name: String, path: String },

    #[error("type '{type_name}' has no {format} codec")]
    FormatNotSupported {
        type_name: String,
        format: &'static str,
    },

    #[error("cannot encode '{type_name}': {reason}")]
    Invalid { type_name: String, reason: String },

    #[error(transparent)]
    Semantic(#[from] SemanticError),
}

pub type EncodeResult<T> = Result<T, EncodeError>;

/// Position inside the value tree where a decode failure occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextFrame {
    Type(String),
    Field(String),
    Alternative(String),
    Index(usize),
}

impl fmt::Display for ContextFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextFrame::Type(name) => write!(f, "{}", name),
            ContextFrame::Field(name) => write!(f, ".{}", name),
            ContextFrame::Alternative(name) => write!(f, ".<{}>", name),
            ContextFrame::Index(index) => write!(f, "[{}]", index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("{0}")]
    Malformed(String),

    #[error("no alternative matches TLV tag [{class} {number}]")]
    NoMatchingAlternative { class: String, number: u32 },

    #[error("no alternative of '{type_name}' could be decoded")]
    NoUnionMemberFound { type_name: String },

    #[error("could not decode '{type_name}' by any field: no alternative accepts {category}")]
    CouldNotDecodeByAnyField {
        type_name: String,
        category: &'static str,
    },

    #[error("component relation constraint broken: no row of '{field}' matches ({keys})")]
    BrokenConstraint { field: String, keys: String },

    #[error("{0} trailing bytes after the value")]
    TrailingData(usize),

    #[error("type '{type_name}' has no {format} codec")]
    FormatNotSupported {
        type_name: String,
        format: &'static str,
    },

    #[error(transparent)]
    Semantic(#[from] SemanticError),
}

/// Decode failure with the chain of nested fields, alternatives and indices
/// it happened under, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub kind: DecodeErrorKind,
    pub context: Vec<ContextFrame>,
    /* Another alternative or path may still succeed */
    pub recoverable: bool,
}

impl DecodeError {
    pub fn new(kind: DecodeErrorKind) -> Self {
        Self {
            kind,
            context: Vec::new(),
            recoverable: true,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(DecodeErrorKind::Malformed(message.into()))
    }

    pub fn unexpected_end() -> Self {
        Self::new(DecodeErrorKind::UnexpectedEnd)
    }

    /* Frames are added while unwinding, so each one goes in front */
    pub fn within(mut self, frame: ContextFrame) -> Self {
        self.context.insert(0, frame);
        self
    }

    pub fn terminal(mut self) -> Self {
        self.recoverable = false;
        self
    }

    pub fn path(&self) -> String {
        self.context.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.context.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.path(), self.kind)
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<SemanticError> for DecodeError {
    fn from(err: SemanticError) -> Self {
        DecodeError::new(DecodeErrorKind::Semantic(err))
    }
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Attach a context frame to the error of a decode step.
pub trait DecodeContext<T> {
    fn within(self, frame: impl FnOnce() -> ContextFrame) -> DecodeResult<T>;
}

impl<T> DecodeContext<T> for DecodeResult<T> {
    fn within(self, frame: impl FnOnce() -> ContextFrame) -> DecodeResult<T> {
        self.map_err(|err| err.within(frame()))
    }
}
