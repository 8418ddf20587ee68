use crate::error::ResolveError;
use crate::platform_map::PlatformClassPair;
use serde::Deserialize;

/// Backing map for the per-class member scope cache.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberCacheKind {
    /// Scopes stay cached for the session's lifetime.
    #[default]
    Strong,
    /// Scopes are dropped once no caller holds them and rebuilt on demand.
    Weak,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Shown in the storage manager's debug text and recursion errors.
    pub debug_name: String,
    pub member_cache: MemberCacheKind,
    pub report_conflicts: bool,
    /// Added on top of the built-in platform class pairs.
    pub platform_class_map: Vec<PlatformClassPair>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debug_name: "resolve session".to_string(),
            member_cache: MemberCacheKind::Strong,
            report_conflicts: true,
            platform_class_map: Vec::new(),
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ResolveError> {
        serde_json::from_str(text).map_err(|error| ResolveError::InvalidConfig(error.to_string()))
    }
}
