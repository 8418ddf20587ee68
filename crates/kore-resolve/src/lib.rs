//! Lazy declaration resolution for kore.
//!
//! This crate contains:
//! - [`BindingTrace`] and its slices, the record of what resolution found
//! - [`LockProtectedTrace`] and [`LockBasedLazyResolveStorageManager`], which
//!   tie trace access and caching to one storage lock
//! - [`OverridingUtil`], which decides which members override which and
//!   builds fake overrides for inherited members
//! - [`resolve_overrides`] / [`resolve_static_overrides`], the per-name entry
//!   points used when building a class's member scope
//! - [`ResolveSession`], which resolves a set of JSON declarations on demand

pub mod config;
pub mod declarations;
pub mod error;
pub mod override_resolver;
pub mod overriding;
pub mod platform_map;
pub mod reporter;
pub mod safe_trace;
pub mod session;
pub mod slices;
pub mod storage;
pub mod trace;

pub use config::{MemberCacheKind, SessionConfig};
pub use declarations::{
    ClassDeclaration, DeclarationFile, DeclarationIndex, DeclaredMemberKind, MemberDeclaration, ParameterDeclaration,
    TypeParameterDeclaration, TypeRef,
};
pub use error::{ResolveError, ResolveResult};
pub use override_resolver::{resolve_overrides, resolve_static_overrides};
pub use overriding::{
    ExternalConditionResult, ExternalOverridabilityCondition, OverridabilityResult, OverrideCompatibilityInfo,
    OverridingStrategy, OverridingUtil, resolve_unknown_visibility_for_member,
};
pub use platform_map::{PlatformClassMap, PlatformClassPair};
pub use reporter::{CollectingErrorReporter, ErrorReporter, ReportedProblem, TraceErrorReporter};
pub use safe_trace::LockProtectedTrace;
pub use session::{MemberScope, ResolveSession};
pub use slices::{CLASS_DESCRIPTOR, MEMBER_DESCRIPTOR, MemberDeclarationKey, RESOLVED_MEMBERS, SUPERTYPE_CYCLE};
pub use storage::LockBasedLazyResolveStorageManager;
pub use trace::{
    BindingContext, BindingTrace, BindingTraceContext, DelegatingBindingTrace, Slice, SliceKey, SliceValue, TraceData,
};
