//! The type model: just enough structure to compare member signatures.

use crate::arena::DescriptorId;
use kore_common::ClassId;
use rustc_hash::FxHashMap;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeConstructor {
    Class(ClassId),
    TypeParameter(DescriptorId),
    /// Stands in for a type that could not be resolved.
    Error,
}

/// A (possibly generic, possibly nullable) type.
///
/// A flexible type is a platform type whose nullability is unknown; it is
/// treated as nullable when used as a supertype and as non-null when used as
/// a subtype.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KType {
    pub constructor: TypeConstructor,
    pub arguments: Vec<KType>,
    pub nullable: bool,
    pub flexible: bool,
}

impl KType {
    pub fn class(class_id: ClassId, arguments: Vec<KType>) -> Self {
        Self {
            constructor: TypeConstructor::Class(class_id),
            arguments,
            nullable: false,
            flexible: false,
        }
    }

    pub fn type_parameter(parameter: DescriptorId) -> Self {
        Self {
            constructor: TypeConstructor::TypeParameter(parameter),
            arguments: Vec::new(),
            nullable: false,
            flexible: false,
        }
    }

    pub fn error() -> Self {
        Self {
            constructor: TypeConstructor::Error,
            arguments: Vec::new(),
            nullable: false,
            flexible: false,
        }
    }

    pub fn make_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn make_flexible(mut self) -> Self {
        self.flexible = true;
        self
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.constructor == TypeConstructor::Error
    }

    #[inline]
    pub fn is_flexible(&self) -> bool {
        self.flexible
    }

    /// Nullability as seen from the supertype side.
    #[inline]
    pub(crate) fn upper_nullable(&self) -> bool {
        self.nullable || self.flexible
    }

    /// Nullability as seen from the subtype side.
    #[inline]
    pub(crate) fn lower_nullable(&self) -> bool {
        self.nullable && !self.flexible
    }

    pub fn class_id(&self) -> Option<&ClassId> {
        match &self.constructor {
            TypeConstructor::Class(class_id) => Some(class_id),
            _ => None,
        }
    }

    /// Replace type parameters by the types `substitution` maps them to. A
    /// nullable parameter stays nullable after substitution.
    pub fn substitute(&self, substitution: &FxHashMap<DescriptorId, KType>) -> KType {
        if let TypeConstructor::TypeParameter(parameter) = &self.constructor
            && let Some(replacement) = substitution.get(parameter)
        {
            let mut replaced = replacement.clone();
            replaced.nullable |= self.nullable;
            replaced.flexible |= self.flexible;
            return replaced;
        }
        KType {
            constructor: self.constructor.clone(),
            arguments: self.arguments.iter().map(|arg| arg.substitute(substitution)).collect(),
            nullable: self.nullable,
            flexible: self.flexible,
        }
    }
}

impl fmt::Display for KType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constructor {
            TypeConstructor::Class(class_id) => match class_id.as_single_fq_name().short_name() {
                Some(name) => write!(f, "{name}")?,
                None => write!(f, "{class_id}")?,
            },
            TypeConstructor::TypeParameter(parameter) => write!(f, "T#{}", parameter.0)?,
            TypeConstructor::Error => f.write_str("[ERROR]")?,
        }
        if !self.arguments.is_empty() {
            f.write_str("<")?;
            for (i, argument) in self.arguments.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{argument}")?;
            }
            f.write_str(">")?;
        }
        if self.flexible {
            f.write_str("!")?;
        } else if self.nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}
