//! Loads a declarations file and resolves the requested classes.

use crate::args::CliArgs;
use anyhow::{Context, Result, bail};
use kore_common::{ClassId, Diagnostic, FqName};
use kore_descriptors::DescriptorRenderer;
use kore_resolve::{DeclarationFile, MemberCacheKind, ResolveError, ResolveSession};
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct ResolveReport {
    pub classes: Vec<ClassReport>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ResolveReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassReport {
    pub class_id: String,
    pub supertypes: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cyclic: bool,
    pub members: Vec<MemberReport>,
}

#[derive(Debug, Serialize)]
pub struct MemberReport {
    pub name: String,
    /// Rendered descriptors: declared members first, then fake overrides.
    pub descriptors: Vec<String>,
}

/// Read `args.input` and build a session over it.
pub fn load_session(args: &CliArgs) -> Result<ResolveSession> {
    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let file = DeclarationFile::from_json_str(&text)
        .with_context(|| format!("failed to parse {}", args.input.display()))?;
    let mut config = file.config;
    if args.weak_member_cache {
        config.member_cache = MemberCacheKind::Weak;
    }
    let session = ResolveSession::with_config(file.classes, config).context("invalid declarations")?;
    Ok(session)
}

pub fn run(args: &CliArgs) -> Result<ResolveReport> {
    let session = load_session(args)?;
    let class_ids = selected_classes(&session, &args.classes)?;
    let start = Instant::now();

    let classes = match args.jobs {
        Some(jobs) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .context("failed to build worker pool")?;
            pool.install(|| {
                class_ids
                    .par_iter()
                    .map(|class_id| report_class(&session, class_id))
                    .collect::<Result<Vec<_>, _>>()
            })?
        }
        None => class_ids
            .iter()
            .map(|class_id| report_class(&session, class_id))
            .collect::<Result<Vec<_>, _>>()?,
    };

    // Parallel resolution reports in completion order.
    let mut diagnostics = session.diagnostics();
    diagnostics.sort_by(|a, b| (&a.subject, &a.message).cmp(&(&b.subject, &b.message)));

    info!(
        target: "kore::resolve",
        classes = classes.len(),
        diagnostics = diagnostics.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "resolved declarations"
    );
    Ok(ResolveReport { classes, diagnostics })
}

/// `a/b/Outer.Inner` is read as a class id; anything else as a top-level
/// dotted name.
pub fn parse_class_id(text: &str) -> Result<ClassId> {
    let class_id = if text.contains('/') {
        ClassId::from_string(text)
    } else {
        FqName::parse(text).and_then(|fq_name| ClassId::top_level(&fq_name))
    };
    class_id.with_context(|| format!("invalid class name {text:?}"))
}

fn selected_classes(session: &ResolveSession, filter: &[String]) -> Result<Vec<ClassId>> {
    if filter.is_empty() {
        return Ok(session.class_ids());
    }
    let mut class_ids = Vec::with_capacity(filter.len());
    for text in filter {
        let class_id = parse_class_id(text)?;
        if session.class_descriptor(&class_id)?.is_none() {
            bail!("unknown class {text}");
        }
        class_ids.push(class_id);
    }
    Ok(class_ids)
}

fn report_class(session: &ResolveSession, class_id: &ClassId) -> Result<ClassReport, ResolveError> {
    let scope = session.member_scope(class_id)?;
    let supertypes = session.supertypes(class_id)?;
    let renderer = DescriptorRenderer::new(session.arena());
    let members = scope
        .iter()
        .map(|(name, descriptors)| MemberReport {
            name: name.to_string(),
            descriptors: descriptors.iter().map(|&id| session.render(id)).collect(),
        })
        .collect();
    Ok(ClassReport {
        class_id: class_id.as_string(),
        supertypes: supertypes.iter().map(|ty| renderer.render_type(ty)).collect(),
        cyclic: session.has_supertype_cycle(class_id),
        members,
    })
}
