//! A resolve session: lazily builds descriptors for a set of declarations.
//!
//! # Design
//!
//! Every query is a memoized function or lazy value created by the session's
//! storage manager, so each result is computed once no matter how many threads
//! ask for it. Computations run under the manager's single lock; cached reads
//! do not take it.
//!
//! Queries reach back into the session through a `Weak` handle. The caches
//! therefore never keep the session alive, and a handle that outlives its
//! session fails with [`ResolveError::SessionClosed`].
//!
//! Members of a class are resolved per name. `members(class, name)` asks each
//! supertype for its members with that name, which recurses up the hierarchy
//! one memoized step at a time.

use crate::config::{MemberCacheKind, SessionConfig};
use crate::declarations::{
    ClassDeclaration, DeclarationFile, DeclarationIndex, DeclaredMemberKind, MemberDeclaration,
    TypeParameterDeclaration, TypeRef,
};
use crate::error::{ResolveError, ResolveResult};
use crate::override_resolver::{resolve_overrides, resolve_static_overrides};
use crate::overriding::{ExternalOverridabilityCondition, OverridingUtil};
use crate::platform_map::PlatformClassMap;
use crate::reporter::{ErrorReporter, TraceErrorReporter};
use crate::safe_trace::LockProtectedTrace;
use crate::slices::{CLASS_DESCRIPTOR, MEMBER_DESCRIPTOR, RESOLVED_MEMBERS, SUPERTYPE_CYCLE};
use crate::storage::LockBasedLazyResolveStorageManager;
use crate::trace::{BindingContext, BindingTrace, BindingTraceContext};
use indexmap::{IndexMap, IndexSet};
use kore_common::{ClassId, Diagnostic, DiagnosticCode, FqName, Name};
use kore_descriptors::{
    CallableMemberDescriptor, ClassDescriptor, ClassKind, Descriptor, DescriptorArena, DescriptorId,
    DescriptorRenderer, KType, MemberKind, Modality, TypeContext, TypeParameterDescriptor, ValueParameter,
};
use kore_storage::{KeyedCache, LazyValue, LockBasedStorageManager, MemoizedFunction, MemoizedFunctionToNullable, StorageResult};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, debug_span, trace};

/// Type parameter names in scope, mapped to their descriptors.
type TypeScope = FxHashMap<String, DescriptorId>;

type MemberKey = (ClassId, Name);

/// All members of one class, grouped by name.
#[derive(Debug)]
pub struct MemberScope {
    class_id: ClassId,
    members: IndexMap<Name, Arc<[DescriptorId]>>,
}

impl MemberScope {
    pub fn class_id(&self) -> &ClassId {
        &self.class_id
    }

    /// Members named `name`: declared ones first, then fake overrides.
    pub fn get(&self, name: &Name) -> &[DescriptorId] {
        self.members.get(name).map(|members| &members[..]).unwrap_or(&[])
    }

    pub fn names(&self) -> impl Iterator<Item = &Name> {
        self.members.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &[DescriptorId])> {
        self.members.iter().map(|(name, members)| (name, &members[..]))
    }

    /// Total number of members across all names.
    pub fn member_count(&self) -> usize {
        self.members.values().map(|members| members.len()).sum()
    }
}

/// Lazily computed parts of one declared class.
struct LazyClass {
    class_id: ClassId,
    descriptor: DescriptorId,
    declaration: Arc<ClassDeclaration>,
    type_parameters: Arc<[DescriptorId]>,
    scope: TypeScope,
    /// Direct supertypes as declared. Re-entrant requests see an empty list.
    supertypes: LazyValue<Arc<[KType]>>,
    /// `supertypes` without the ones that lead back to this class.
    acyclic_supertypes: LazyValue<Arc<[KType]>>,
    member_names: LazyValue<Arc<[Name]>>,
}

#[derive(Clone)]
pub struct ResolveSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    this: Weak<SessionInner>,
    config: SessionConfig,
    storage: LockBasedLazyResolveStorageManager,
    arena: DescriptorArena,
    trace: LockProtectedTrace<BindingTraceContext>,
    platform_map: PlatformClassMap,
    external_conditions: Vec<Box<dyn ExternalOverridabilityCondition>>,
    declarations: DeclarationIndex,
    any_class: ClassId,
    builtins: FxHashSet<ClassId>,
    classes: MemoizedFunctionToNullable<ClassId, Arc<LazyClass>>,
    declared_members: MemoizedFunction<MemberKey, Arc<[DescriptorId]>>,
    members: MemoizedFunction<MemberKey, Arc<[DescriptorId]>>,
    member_scopes: MemoizedFunction<ClassId, Arc<MemberScope>>,
    type_refs: KeyedCache<String, Arc<TypeRef>>,
}

fn upgrade(weak: &Weak<SessionInner>) -> StorageResult<Arc<SessionInner>> {
    weak.upgrade().ok_or_else(|| ResolveError::SessionClosed.into_storage())
}

fn builtin_class(fq_name: &str) -> ResolveResult<ClassId> {
    Ok(ClassId::top_level(&FqName::parse(fq_name)?)?)
}

impl ResolveSession {
    pub fn new(file: DeclarationFile) -> ResolveResult<Self> {
        Self::with_config(file.classes, file.config)
    }

    pub fn from_json_str(text: &str) -> ResolveResult<Self> {
        Self::new(DeclarationFile::from_json_str(text)?)
    }

    pub fn with_config(classes: Vec<ClassDeclaration>, config: SessionConfig) -> ResolveResult<Self> {
        Self::with_external_conditions(classes, config, Vec::new())
    }

    /// A session whose overridability checks consult `external_conditions`
    /// before comparing signatures.
    pub fn with_external_conditions(
        classes: Vec<ClassDeclaration>,
        config: SessionConfig,
        external_conditions: Vec<Box<dyn ExternalOverridabilityCondition>>,
    ) -> ResolveResult<Self> {
        let declarations = DeclarationIndex::new(classes)?;

        let mut platform_map = PlatformClassMap::with_builtins();
        platform_map.extend(&config.platform_class_map)?;

        let any_class = builtin_class("kotlin.Any")?;
        let mut builtins: FxHashSet<ClassId> = FxHashSet::default();
        builtins.insert(any_class.clone());
        builtins.insert(builtin_class("kotlin.Unit")?);
        builtins.insert(builtin_class("kotlin.Nothing")?);
        for (platform, kotlin) in platform_map.pairs() {
            builtins.insert(platform.clone());
            builtins.insert(kotlin.clone());
        }

        let storage = LockBasedLazyResolveStorageManager::new(LockBasedStorageManager::new(config.debug_name.clone()));
        let trace = storage.create_safe_trace(BindingTraceContext::new());
        debug!(
            target: "kore::resolve",
            storage = %storage.storage(),
            classes = declarations.len(),
            member_cache = ?config.member_cache,
            "creating resolve session"
        );

        let inner = Arc::new_cyclic(|weak: &Weak<SessionInner>| {
            let classes = {
                let weak = weak.clone();
                storage.create_memoized_function_with_nullable_values(move |class_id: &ClassId| {
                    upgrade(&weak)?
                        .create_class(class_id)
                        .map_err(ResolveError::into_storage)
                })
            };
            let declared_members = {
                let weak = weak.clone();
                storage.create_memoized_function(move |(class_id, name): &MemberKey| {
                    upgrade(&weak)?
                        .create_declared_members(class_id, name)
                        .map_err(ResolveError::into_storage)
                })
            };
            let members = {
                let weak = weak.clone();
                storage.create_memoized_function_with_recursion_handler(
                    move |(class_id, name): &MemberKey| {
                        upgrade(&weak)?
                            .compute_members(class_id, name)
                            .map_err(ResolveError::into_storage)
                    },
                    |(class_id, name): &MemberKey, first_time| {
                        if first_time {
                            trace!(target: "kore::resolve", class = %class_id, %name, "members requested recursively");
                        }
                        Ok(Arc::from(Vec::new()))
                    },
                )
            };
            let member_scopes = {
                let weak = weak.clone();
                let compute = move |class_id: &ClassId| {
                    upgrade(&weak)?
                        .compute_member_scope(class_id)
                        .map_err(ResolveError::into_storage)
                };
                match config.member_cache {
                    MemberCacheKind::Strong => storage.create_memoized_function(compute),
                    MemberCacheKind::Weak => storage.create_weakly_retained_memoized_function(compute),
                }
            };

            SessionInner {
                this: weak.clone(),
                type_refs: storage.create_cache_with_not_null_values(),
                config,
                storage,
                arena: DescriptorArena::new(),
                trace,
                platform_map,
                external_conditions,
                declarations,
                any_class,
                builtins,
                classes,
                declared_members,
                members,
                member_scopes,
            }
        });
        Ok(Self { inner })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn storage(&self) -> &LockBasedLazyResolveStorageManager {
        &self.inner.storage
    }

    pub fn arena(&self) -> &DescriptorArena {
        &self.inner.arena
    }

    /// The session trace. Every access goes through the storage lock.
    pub fn trace(&self) -> &LockProtectedTrace<BindingTraceContext> {
        &self.inner.trace
    }

    pub fn platform_map(&self) -> &PlatformClassMap {
        &self.inner.platform_map
    }

    /// Declared classes, in input order.
    pub fn class_ids(&self) -> Vec<ClassId> {
        self.inner.declarations.class_ids().cloned().collect()
    }

    /// The descriptor of a declared class; `None` for unknown classes.
    pub fn class_descriptor(&self, class_id: &ClassId) -> ResolveResult<Option<DescriptorId>> {
        Ok(self.inner.class(class_id)?.map(|class| class.descriptor))
    }

    /// Direct supertypes of a declared class. A class without declared
    /// supertypes extends `kotlin.Any`.
    pub fn supertypes(&self, class_id: &ClassId) -> ResolveResult<Arc<[KType]>> {
        Ok(self.inner.require_class(class_id)?.supertypes.get()?)
    }

    pub fn has_supertype_cycle(&self, class_id: &ClassId) -> bool {
        self.inner.trace.get(SUPERTYPE_CYCLE, class_id).unwrap_or(false)
    }

    /// Members named `name` declared in the class itself.
    pub fn declared_members(&self, class_id: &ClassId, name: &Name) -> ResolveResult<Arc<[DescriptorId]>> {
        Ok(self.inner.declared_members.invoke(&(class_id.clone(), name.clone()))?)
    }

    /// Declared and inherited members named `name`, with overrides bound.
    pub fn members(&self, class_id: &ClassId, name: &Name) -> ResolveResult<Arc<[DescriptorId]>> {
        Ok(self.inner.members.invoke(&(class_id.clone(), name.clone()))?)
    }

    /// Names of all declared and inherited members.
    pub fn member_names(&self, class_id: &ClassId) -> ResolveResult<Arc<[Name]>> {
        Ok(self.inner.require_class(class_id)?.member_names.get()?)
    }

    pub fn member_scope(&self, class_id: &ClassId) -> ResolveResult<Arc<MemberScope>> {
        Ok(self.inner.member_scopes.invoke(class_id)?)
    }

    /// Whether a member scope for `class_id` is currently cached. With a weak
    /// member cache this turns false once every caller has dropped the scope.
    pub fn is_member_scope_cached(&self, class_id: &ClassId) -> bool {
        self.inner.member_scopes.is_computed(class_id)
    }

    /// Resolve every member of every declared class.
    pub fn resolve_all(&self) -> ResolveResult<Vec<Arc<MemberScope>>> {
        let _span = debug_span!(target: "kore::resolve", "resolve_all", classes = self.inner.declarations.len()).entered();
        self.inner
            .declarations
            .class_ids()
            .map(|class_id| self.member_scope(class_id))
            .collect()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.inner.trace.diagnostics()
    }

    pub fn render(&self, descriptor: DescriptorId) -> String {
        DescriptorRenderer::new(&self.inner.arena).render(descriptor)
    }
}

impl fmt::Debug for ResolveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveSession")
            .field("storage", &self.inner.storage)
            .field("classes", &self.inner.declarations.len())
            .field("descriptors", &self.inner.arena.len())
            .finish()
    }
}

// =============================================================================
// Classes
// =============================================================================

impl SessionInner {
    fn class(&self, class_id: &ClassId) -> ResolveResult<Option<Arc<LazyClass>>> {
        Ok(self.classes.invoke(class_id)?)
    }

    fn require_class(&self, class_id: &ClassId) -> ResolveResult<Arc<LazyClass>> {
        self.class(class_id)?
            .ok_or_else(|| ResolveError::UnknownClass(class_id.clone()))
    }

    fn create_class(&self, class_id: &ClassId) -> ResolveResult<Option<Arc<LazyClass>>> {
        let Some(declaration) = self.declarations.get(class_id).cloned() else {
            trace!(target: "kore::resolve", class = %class_id, "no declaration for class");
            return Ok(None);
        };
        let name = class_id
            .short_class_name()
            .cloned()
            .ok_or_else(|| ResolveError::invalid_declaration(class_id.as_string(), "class id has no class name"))?;
        let container = match class_id.outer_class_id() {
            Some(outer) => self.class(&outer)?.map(|outer| outer.descriptor),
            None => None,
        };

        let ids = self.arena.reserve(1 + declaration.type_parameters.len() as u32);
        let descriptor = ids[0];
        let type_parameters: Arc<[DescriptorId]> = Arc::from(&ids[1..]);
        let mut scope = TypeScope::default();
        for (parameter, &id) in declaration.type_parameters.iter().zip(type_parameters.iter()) {
            scope.insert(parameter.name.clone(), id);
        }
        self.fill_type_parameters(&declaration.type_parameters, &type_parameters, descriptor, &scope)?;

        self.arena.fill(
            descriptor,
            Descriptor::Class(Arc::new(ClassDescriptor {
                class_id: class_id.clone(),
                name,
                container,
                kind: declaration.kind,
                modality: declaration.effective_modality(),
                visibility: declaration.visibility,
                type_parameters: type_parameters.to_vec(),
            })),
        )?;
        self.trace.record(CLASS_DESCRIPTOR, class_id.clone(), descriptor);
        debug!(target: "kore::resolve", class = %class_id, descriptor = descriptor.0, "created class descriptor");

        Ok(Some(Arc::new(LazyClass {
            class_id: class_id.clone(),
            descriptor,
            declaration,
            type_parameters,
            scope,
            supertypes: self.supertypes_value(class_id),
            acyclic_supertypes: self.acyclic_supertypes_value(class_id),
            member_names: self.member_names_value(class_id),
        })))
    }

    fn fill_type_parameters(
        &self,
        declarations: &[TypeParameterDeclaration],
        ids: &[DescriptorId],
        container: DescriptorId,
        scope: &TypeScope,
    ) -> ResolveResult<()> {
        for (index, (parameter, &id)) in declarations.iter().zip(ids).enumerate() {
            let upper_bounds = if parameter.upper_bounds.is_empty() {
                vec![KType::class(self.any_class.clone(), Vec::new()).make_nullable(true)]
            } else {
                parameter
                    .upper_bounds
                    .iter()
                    .map(|bound| self.resolve_type(bound, scope))
                    .collect::<ResolveResult<Vec<_>>>()?
            };
            self.arena.fill(
                id,
                Descriptor::TypeParameter(Arc::new(TypeParameterDescriptor {
                    name: Name::identifier(&parameter.name)?,
                    container,
                    index: index as u32,
                    upper_bounds,
                })),
            )?;
        }
        Ok(())
    }

    fn supertypes_value(&self, class_id: &ClassId) -> LazyValue<Arc<[KType]>> {
        let compute = {
            let weak = self.this.clone();
            let class_id = class_id.clone();
            move || {
                upgrade(&weak)?
                    .compute_supertypes(&class_id)
                    .map_err(ResolveError::into_storage)
            }
        };
        let post_compute = {
            let weak = self.this.clone();
            let class_id = class_id.clone();
            move |supertypes: &Arc<[KType]>| {
                upgrade(&weak)?
                    .check_supertype_cycle(&class_id, supertypes)
                    .map_err(ResolveError::into_storage)
            }
        };
        self.storage
            .create_lazy_value_with_post_compute(compute, Some(Arc::from(Vec::new())), post_compute)
    }

    fn acyclic_supertypes_value(&self, class_id: &ClassId) -> LazyValue<Arc<[KType]>> {
        let weak = self.this.clone();
        let class_id = class_id.clone();
        self.storage.create_lazy_value(move || {
            upgrade(&weak)?
                .compute_acyclic_supertypes(&class_id)
                .map_err(ResolveError::into_storage)
        })
    }

    fn member_names_value(&self, class_id: &ClassId) -> LazyValue<Arc<[Name]>> {
        let weak = self.this.clone();
        let class_id = class_id.clone();
        self.storage.create_lazy_value_with_recursion_handler(
            move || {
                upgrade(&weak)?
                    .compute_member_names(&class_id)
                    .map_err(ResolveError::into_storage)
            },
            |_first_time| Ok(Arc::from(Vec::new())),
        )
    }

    // =========================================================================
    // Supertypes
    // =========================================================================

    fn compute_supertypes(&self, class_id: &ClassId) -> ResolveResult<Arc<[KType]>> {
        let class = self.require_class(class_id)?;
        let mut supertypes = Vec::with_capacity(class.declaration.supertypes.len());
        let mut missing = Vec::new();
        for text in &class.declaration.supertypes {
            let supertype = self.resolve_type(text, &class.scope)?;
            if supertype.class_id().is_some() {
                supertypes.push(supertype);
            } else {
                missing.push(text.clone());
            }
        }
        if !missing.is_empty() {
            TraceErrorReporter::new(&self.trace, &self.arena).report_incomplete_hierarchy(class_id, &missing);
        }
        if supertypes.is_empty() && !self.is_root_class(class_id) {
            supertypes.push(KType::class(self.any_class.clone(), Vec::new()));
        }
        Ok(supertypes.into())
    }

    /// Supertypes of any class, declared or not.
    fn direct_supertypes(&self, class_id: &ClassId) -> ResolveResult<Arc<[KType]>> {
        match self.class(class_id)? {
            Some(class) => Ok(class.supertypes.get()?),
            None => Ok(self.builtin_supertypes(class_id)),
        }
    }

    fn builtin_supertypes(&self, class_id: &ClassId) -> Arc<[KType]> {
        if self.is_root_class(class_id) {
            Arc::from(Vec::new())
        } else {
            Arc::from(vec![KType::class(self.any_class.clone(), Vec::new())])
        }
    }

    fn is_root_class(&self, class_id: &ClassId) -> bool {
        self.platform_map.canonical(class_id) == &self.any_class
    }

    /// Whether `target` is `from` or one of its transitive supertypes.
    fn reaches(&self, from: &ClassId, target: &ClassId) -> ResolveResult<bool> {
        let mut visited: FxHashSet<ClassId> = FxHashSet::default();
        let mut stack = vec![from.clone()];
        while let Some(next) = stack.pop() {
            if next == *target {
                return Ok(true);
            }
            if !visited.insert(next.clone()) {
                continue;
            }
            for supertype in self.direct_supertypes(&next)?.iter() {
                if let Some(super_id) = supertype.class_id() {
                    stack.push(super_id.clone());
                }
            }
        }
        Ok(false)
    }

    fn check_supertype_cycle(&self, class_id: &ClassId, supertypes: &[KType]) -> ResolveResult<()> {
        for supertype in supertypes {
            let Some(super_id) = supertype.class_id() else {
                continue;
            };
            if self.reaches(super_id, class_id)? {
                debug!(target: "kore::resolve", class = %class_id, via = %super_id, "cyclic supertypes");
                self.trace.record(SUPERTYPE_CYCLE, class_id.clone(), true);
                self.trace.report(Diagnostic::new(
                    DiagnosticCode::CyclicInheritanceHierarchy,
                    class_id.as_string(),
                    format!("class is its own supertype through {}", super_id.as_string()),
                ));
                return Ok(());
            }
        }
        Ok(())
    }

    fn compute_acyclic_supertypes(&self, class_id: &ClassId) -> ResolveResult<Arc<[KType]>> {
        let supertypes = self.require_class(class_id)?.supertypes.get()?;
        if !self.trace.get(SUPERTYPE_CYCLE, class_id).unwrap_or(false) {
            return Ok(supertypes);
        }
        let mut acyclic = Vec::with_capacity(supertypes.len());
        for supertype in supertypes.iter() {
            match supertype.class_id() {
                Some(super_id) if self.reaches(super_id, class_id)? => {}
                _ => acyclic.push(supertype.clone()),
            }
        }
        Ok(acyclic.into())
    }

    /// Declared classes among the acyclic supertypes.
    fn declared_supertypes(&self, class: &LazyClass) -> ResolveResult<Vec<ClassId>> {
        let supertypes = class.acyclic_supertypes.get()?;
        Ok(supertypes
            .iter()
            .filter_map(KType::class_id)
            .filter(|super_id| self.declarations.get(super_id).is_some())
            .cloned()
            .collect())
    }

    // =========================================================================
    // Members
    // =========================================================================

    fn compute_member_names(&self, class_id: &ClassId) -> ResolveResult<Arc<[Name]>> {
        let class = self.require_class(class_id)?;
        let mut names: IndexSet<Name> = IndexSet::new();
        for member in &class.declaration.members {
            names.insert(Name::identifier(&member.name)?);
        }
        for super_id in self.declared_supertypes(&class)? {
            let super_class = self.require_class(&super_id)?;
            names.extend(super_class.member_names.get()?.iter().cloned());
        }
        Ok(names.into_iter().collect())
    }

    fn create_declared_members(&self, class_id: &ClassId, name: &Name) -> ResolveResult<Arc<[DescriptorId]>> {
        let class = self.require_class(class_id)?;
        let mut members = Vec::new();
        for (index, declaration) in class.declaration.members.iter().enumerate() {
            if declaration.name == name.as_str() {
                members.push(self.create_member(&class, index as u32, declaration)?);
            }
        }
        Ok(members.into())
    }

    fn create_member(&self, class: &LazyClass, index: u32, declaration: &MemberDeclaration) -> ResolveResult<DescriptorId> {
        let ids = self.arena.reserve(1 + declaration.type_parameters.len() as u32);
        let id = ids[0];
        let type_parameters = &ids[1..];

        let mut scope = class.scope.clone();
        for (parameter, &parameter_id) in declaration.type_parameters.iter().zip(type_parameters) {
            scope.insert(parameter.name.clone(), parameter_id);
        }
        self.fill_type_parameters(&declaration.type_parameters, type_parameters, id, &scope)?;

        let receiver = declaration
            .receiver
            .as_deref()
            .map(|receiver| self.resolve_type(receiver, &scope))
            .transpose()?;
        let value_parameters = declaration
            .parameters
            .iter()
            .map(|parameter| {
                Ok(ValueParameter {
                    name: Name::identifier(&parameter.name)?,
                    ty: self.resolve_type(&parameter.ty, &scope)?,
                })
            })
            .collect::<ResolveResult<Vec<_>>>()?;
        let return_type = self.resolve_type(&declaration.return_type, &scope)?;

        let member = match declaration.kind {
            DeclaredMemberKind::Function => MemberKind::Function,
            DeclaredMemberKind::Property => MemberKind::Property {
                is_var: declaration.is_var,
            },
        };
        let modality = declaration.modality.unwrap_or(
            if !declaration.is_static && class.declaration.kind == ClassKind::Interface {
                Modality::Abstract
            } else {
                Modality::Final
            },
        );

        let descriptor = CallableMemberDescriptor::declaration(
            Name::identifier(&declaration.name)?,
            class.descriptor,
            member,
            return_type,
        )
        .with_modality(modality)
        .with_visibility(declaration.visibility)
        .with_static(declaration.is_static)
        .with_extension_receiver(receiver)
        .with_type_parameters(type_parameters.to_vec())
        .with_value_parameters(value_parameters);
        self.arena.fill(id, Descriptor::Callable(Arc::new(descriptor)))?;
        self.trace.record(MEMBER_DESCRIPTOR, (class.class_id.clone(), index), id);
        Ok(id)
    }

    /// Members named `name` of every declared supertype, seen through the
    /// type arguments the class passes to that supertype.
    fn inherited_members(&self, class: &LazyClass, name: &Name) -> ResolveResult<Vec<DescriptorId>> {
        let mut inherited = Vec::new();
        for supertype in class.acyclic_supertypes.get()?.iter() {
            let Some(super_id) = supertype.class_id() else {
                continue;
            };
            if self.declarations.get(super_id).is_none() {
                continue;
            }
            let members = self.members.invoke(&(super_id.clone(), name.clone()))?;
            let substitution: FxHashMap<DescriptorId, KType> = self
                .class_type_parameters(super_id)?
                .iter()
                .copied()
                .zip(supertype.arguments.iter().cloned())
                .collect();
            if substitution.is_empty() {
                inherited.extend(members.iter().copied());
                continue;
            }
            for &id in members.iter() {
                inherited.push(self.substituted_member(id, &substitution)?);
            }
        }
        Ok(inherited)
    }

    /// `id` itself when the substitution leaves its signature unchanged,
    /// otherwise a new substituted copy.
    fn substituted_member(&self, id: DescriptorId, substitution: &FxHashMap<DescriptorId, KType>) -> ResolveResult<DescriptorId> {
        let member = self.arena.callable(id)?;
        let substituted = member.substitute(id, substitution);
        if substituted.return_type == member.return_type
            && substituted.value_parameters == member.value_parameters
            && substituted.extension_receiver == member.extension_receiver
        {
            return Ok(id);
        }
        trace!(target: "kore::resolve", member = %member.name, original = id.0, "substituted inherited member");
        Ok(self.arena.alloc_callable(substituted))
    }

    fn compute_members(&self, class_id: &ClassId, name: &Name) -> ResolveResult<Arc<[DescriptorId]>> {
        let class = self.require_class(class_id)?;
        let declared = self.declared_members.invoke(&(class_id.clone(), name.clone()))?;

        let mut declared_instance = Vec::new();
        let mut declared_static = Vec::new();
        for &id in declared.iter() {
            if self.arena.callable(id)?.is_static {
                declared_static.push(id);
            } else {
                declared_instance.push(id);
            }
        }

        let mut inherited_instance = Vec::new();
        let mut inherited_static = Vec::new();
        for id in self.inherited_members(&class, name)? {
            if self.arena.callable(id)?.is_static {
                inherited_static.push(id);
            } else {
                inherited_instance.push(id);
            }
        }

        let util = OverridingUtil::new(&self.arena, self, &self.platform_map)
            .with_external_conditions(&self.external_conditions);
        let reporter = TraceErrorReporter::new(&self.trace, &self.arena);
        let reporter = if self.config.report_conflicts {
            reporter
        } else {
            reporter.without_conflicts()
        };

        let mut resolved = resolve_overrides(
            &util,
            name,
            &inherited_instance,
            &declared_instance,
            class.descriptor,
            &reporter,
        )?;
        resolved.extend(resolve_static_overrides(
            &util,
            name,
            &inherited_static,
            &declared_static,
            class.descriptor,
            &reporter,
        )?);

        let resolved: Arc<[DescriptorId]> = resolved.into();
        self.trace
            .record(RESOLVED_MEMBERS, (class_id.clone(), name.clone()), Arc::clone(&resolved));
        Ok(resolved)
    }

    fn compute_member_scope(&self, class_id: &ClassId) -> ResolveResult<Arc<MemberScope>> {
        let class = self.require_class(class_id)?;
        let mut members = IndexMap::new();
        for name in class.member_names.get()?.iter() {
            let resolved = self.members.invoke(&(class_id.clone(), name.clone()))?;
            members.insert(name.clone(), resolved);
        }
        Ok(Arc::new(MemberScope {
            class_id: class_id.clone(),
            members,
        }))
    }

    // =========================================================================
    // Type references
    // =========================================================================

    fn resolve_type(&self, text: &str, scope: &TypeScope) -> ResolveResult<KType> {
        let parsed = self.type_refs.compute_if_absent(text.to_string(), || {
            TypeRef::parse(text)
                .map(Arc::new)
                .map_err(ResolveError::into_storage)
        })?;
        Ok(self.resolve_type_ref(&parsed, scope))
    }

    fn resolve_type_ref(&self, type_ref: &TypeRef, scope: &TypeScope) -> KType {
        let parameter = if type_ref.is_simple() {
            scope.get(&type_ref.name).copied()
        } else {
            None
        };
        let resolved = match parameter {
            Some(parameter) => KType::type_parameter(parameter),
            None => match self.find_class(&type_ref.name) {
                Some(class_id) => {
                    let arguments = type_ref
                        .arguments
                        .iter()
                        .map(|argument| self.resolve_type_ref(argument, scope))
                        .collect();
                    KType::class(class_id, arguments)
                }
                None => {
                    trace!(target: "kore::resolve", type_ref = %type_ref, "unresolved type reference");
                    KType::error()
                }
            },
        };
        let resolved = resolved.make_nullable(type_ref.nullable);
        if type_ref.flexible {
            resolved.make_flexible()
        } else {
            resolved
        }
    }

    /// A declared or built-in class with the dotted name `name`. Bare names
    /// are also looked up in the `kotlin` package.
    fn find_class(&self, name: &str) -> Option<ClassId> {
        if let Some(class_id) = self.declarations.find_by_fq_name(name) {
            return Some(class_id.clone());
        }
        let class_id = FqName::parse(name)
            .ok()
            .and_then(|fq_name| ClassId::top_level(&fq_name).ok())?;
        if self.builtins.contains(&class_id) {
            return Some(class_id);
        }
        if !name.contains('.') {
            return self.find_class(&format!("kotlin.{name}"));
        }
        None
    }
}

impl TypeContext for SessionInner {
    type Error = ResolveError;

    fn supertypes(&self, class: &ClassId) -> ResolveResult<Arc<[KType]>> {
        match self.class(class)? {
            Some(lazy) => Ok(lazy.acyclic_supertypes.get()?),
            None => Ok(self.builtin_supertypes(class)),
        }
    }

    fn class_type_parameters(&self, class: &ClassId) -> ResolveResult<Arc<[DescriptorId]>> {
        Ok(match self.class(class)? {
            Some(lazy) => Arc::clone(&lazy.type_parameters),
            None => Arc::from(Vec::new()),
        })
    }

    fn upper_bounds(&self, parameter: DescriptorId) -> ResolveResult<Vec<KType>> {
        Ok(self.arena.type_parameter(parameter)?.upper_bounds.clone())
    }
}
