/* Structured-type runtime
 *
 * Values, templates and the five codecs that generated code delegates to.
 * Generated façades hold a `Registry` built from the plan set emitted next
 * to them and call into the modules below.
 */

pub mod codec;
pub mod errors;
pub mod matching;
pub mod param;
pub mod record;
pub mod registry;
pub mod sequence;
pub mod storage;
pub mod template;
pub mod union;
pub mod value;

pub use codec::raw::RawDecodeStats;
pub use errors::{ContextFrame, DecodeError, DecodeErrorKind, DecodeResult, EncodeError, EncodeResult, SemanticError, SemanticResult};
pub use param::{parse_param, ParamError, ParamId, ParamItem, ParamNode, ParamValue};
pub use record::{RecordShape, RecordValue};
pub use registry::{DecodeOptions, Registry, RegistryError, RuntimeConfig, Severity};
pub use sequence::{ElementRef, SeqShape, SeqValue};
pub use storage::{ElementStorage, ElementStore, FlatStore, Ownership, SharedStore};
pub use template::{LengthRestriction, RecordTemplate, Selection, SequenceTemplate, Specific, Template, UnionTemplate};
pub use union::{UnionShape, UnionValue};
pub use value::{Element, Value};

/* Plan types generated code is compiled against */
pub use structgen_gen::codegen::shared::plan::{PlanSet, Representation, TypePlan};
pub use structgen_gen::schema::Format;
