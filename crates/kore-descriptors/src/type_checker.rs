//! Structural type equality and nominal subtyping.
//!
//! The checker knows nothing about where class hierarchies come from; it asks
//! a [`TypeContext`] for supertypes and bounds. Two type constructors are
//! considered the same when they are equal or when the checker's
//! [`TypeConstructorEquality`] axioms say so (platform class aliases, type
//! parameters of two signatures being matched against each other).

use crate::arena::DescriptorId;
use crate::recursion::{RecursionGuard, RecursionProfile, RecursionResult};
use crate::types::{KType, TypeConstructor};
use kore_common::ClassId;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::trace;

/// Extra equalities between type constructors.
pub trait TypeConstructorEquality: Send + Sync {
    fn equals(&self, a: &TypeConstructor, b: &TypeConstructor) -> bool;
}

/// Only identical constructors are equal.
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultTypeEquality;

impl TypeConstructorEquality for DefaultTypeEquality {
    fn equals(&self, a: &TypeConstructor, b: &TypeConstructor) -> bool {
        a == b
    }
}

/// Treats each type parameter of one signature as equal to the parameter at
/// the same position in another, on top of a base set of axioms.
pub struct MatchingTypeParameters<'a> {
    base: &'a dyn TypeConstructorEquality,
    pairs: FxHashMap<DescriptorId, DescriptorId>,
}

impl<'a> MatchingTypeParameters<'a> {
    pub fn new(base: &'a dyn TypeConstructorEquality, first: &[DescriptorId], second: &[DescriptorId]) -> Self {
        debug_assert_eq!(first.len(), second.len());
        Self {
            base,
            pairs: first.iter().copied().zip(second.iter().copied()).collect(),
        }
    }
}

impl TypeConstructorEquality for MatchingTypeParameters<'_> {
    fn equals(&self, a: &TypeConstructor, b: &TypeConstructor) -> bool {
        if self.base.equals(a, b) {
            return true;
        }
        let image = |from: &TypeConstructor| match from {
            TypeConstructor::TypeParameter(id) => self.pairs.get(id).copied(),
            _ => None,
        };
        let matches = |img: Option<DescriptorId>, other: &TypeConstructor| {
            matches!((img, other), (Some(img), TypeConstructor::TypeParameter(other)) if img == *other)
        };
        matches(image(a), b) || matches(image(b), a)
    }
}

/// Hierarchy information the checker needs.
pub trait TypeContext {
    type Error;

    /// Direct supertypes of `class`, written over its own type parameters.
    fn supertypes(&self, class: &ClassId) -> Result<Arc<[KType]>, Self::Error>;

    fn class_type_parameters(&self, class: &ClassId) -> Result<Arc<[DescriptorId]>, Self::Error>;

    fn upper_bounds(&self, parameter: DescriptorId) -> Result<Vec<KType>, Self::Error>;
}

pub struct TypeChecker<'a, C: TypeContext + ?Sized> {
    context: &'a C,
    axioms: &'a dyn TypeConstructorEquality,
}

impl<'a, C: TypeContext + ?Sized> TypeChecker<'a, C> {
    pub fn new(context: &'a C, axioms: &'a dyn TypeConstructorEquality) -> Self {
        Self { context, axioms }
    }

    /// A checker over the same context with different axioms.
    pub fn with_axioms<'b>(&self, axioms: &'b dyn TypeConstructorEquality) -> TypeChecker<'b, C>
    where
        'a: 'b,
    {
        TypeChecker {
            context: self.context,
            axioms,
        }
    }

    pub fn axioms(&self) -> &'a dyn TypeConstructorEquality {
        self.axioms
    }

    fn same_constructor(&self, a: &TypeConstructor, b: &TypeConstructor) -> bool {
        a == b || self.axioms.equals(a, b)
    }

    /// Structural equality. Error types are only equal to error types; a
    /// flexible type matches both nullabilities.
    pub fn equal_types(&self, a: &KType, b: &KType) -> bool {
        if a.is_error() || b.is_error() {
            return a.is_error() && b.is_error();
        }
        if !(a.flexible || b.flexible) && a.nullable != b.nullable {
            return false;
        }
        self.same_constructor(&a.constructor, &b.constructor)
            && a.arguments.len() == b.arguments.len()
            && a.arguments
                .iter()
                .zip(&b.arguments)
                .all(|(x, y)| self.equal_types(x, y))
    }

    /// Whether `sub` is a subtype of `sup`. Error types are related to
    /// everything; type arguments are invariant.
    pub fn is_subtype_of(&self, sub: &KType, sup: &KType) -> Result<bool, C::Error> {
        let mut guard = RecursionGuard::with_profile(RecursionProfile::SupertypeWalk);
        let result = self.is_subtype_guarded(sub, sup, &mut guard);
        if guard.is_exceeded() {
            trace!(target: "kore::resolve", %sub, %sup, "supertype walk limit reached");
        }
        result
    }

    fn is_subtype_guarded(
        &self,
        sub: &KType,
        sup: &KType,
        guard: &mut RecursionGuard<TypeConstructor>,
    ) -> Result<bool, C::Error> {
        if sub.is_error() || sup.is_error() {
            return Ok(true);
        }
        if sub.lower_nullable() && !sup.upper_nullable() {
            return Ok(false);
        }
        if self.same_constructor(&sub.constructor, &sup.constructor) {
            return Ok(sub.arguments.len() == sup.arguments.len()
                && sub
                    .arguments
                    .iter()
                    .zip(&sup.arguments)
                    .all(|(x, y)| self.equal_types(x, y)));
        }

        let candidates: Vec<KType> = match &sub.constructor {
            TypeConstructor::TypeParameter(parameter) => self
                .context
                .upper_bounds(*parameter)?
                .into_iter()
                .map(|bound| {
                    let nullable = bound.nullable || sub.lower_nullable();
                    bound.make_nullable(nullable)
                })
                .collect(),
            TypeConstructor::Class(class_id) => {
                let parameters = self.context.class_type_parameters(class_id)?;
                let substitution: FxHashMap<DescriptorId, KType> = parameters
                    .iter()
                    .copied()
                    .zip(sub.arguments.iter().cloned())
                    .collect();
                self.context
                    .supertypes(class_id)?
                    .iter()
                    .map(|supertype| {
                        let substituted = supertype.substitute(&substitution);
                        let nullable = substituted.nullable || sub.lower_nullable();
                        substituted.make_nullable(nullable)
                    })
                    .collect()
            }
            TypeConstructor::Error => return Ok(true),
        };

        for candidate in candidates {
            let key = candidate.constructor.clone();
            match guard.enter(key.clone()) {
                RecursionResult::Entered => {
                    let result = self.is_subtype_guarded(&candidate, sup, guard);
                    guard.leave(&key);
                    if result? {
                        return Ok(true);
                    }
                }
                RecursionResult::Cycle => continue,
                RecursionResult::DepthExceeded | RecursionResult::IterationExceeded => return Ok(false),
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
#[path = "../tests/type_checker_tests.rs"]
mod tests;
