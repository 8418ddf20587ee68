use crate::arena::DescriptorId;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    /// A write-once descriptor field was assigned a second time.
    #[error("{field} of {descriptor} is already set")]
    IllegalStateMutation { field: &'static str, descriptor: String },
    #[error("no descriptor with id {0:?}")]
    UnknownDescriptor(DescriptorId),
    #[error("descriptor {id:?} is not a {expected}")]
    UnexpectedDescriptorKind { id: DescriptorId, expected: &'static str },
}
