//! The declaration input model.
//!
//! Declarations are read from JSON. Types are written as strings:
//!
//! ```text
//! kotlin.collections.List<T>?     nullable generic class type
//! java.lang.String!               flexible (platform) type
//! T                               type parameter in scope
//! ```

use crate::config::SessionConfig;
use crate::error::ResolveError;
use kore_common::ClassId;
use indexmap::IndexMap;
use kore_descriptors::{ClassKind, Modality, Visibility};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationFile {
    #[serde(default)]
    pub config: SessionConfig,
    #[serde(default)]
    pub classes: Vec<ClassDeclaration>,
}

impl DeclarationFile {
    pub fn from_json_str(text: &str) -> Result<Self, ResolveError> {
        serde_json::from_str(text).map_err(|error| ResolveError::invalid_declaration("declaration file", error.to_string()))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDeclaration {
    /// `a/b/Outer.Inner`
    pub id: String,
    #[serde(default = "default_class_kind")]
    pub kind: ClassKind,
    /// Defaults to `abstract` for interfaces and `final` otherwise.
    #[serde(default)]
    pub modality: Option<Modality>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub type_parameters: Vec<TypeParameterDeclaration>,
    #[serde(default)]
    pub supertypes: Vec<String>,
    #[serde(default)]
    pub members: Vec<MemberDeclaration>,
}

fn default_class_kind() -> ClassKind {
    ClassKind::Class
}

impl ClassDeclaration {
    pub fn class_id(&self) -> Result<ClassId, ResolveError> {
        Ok(ClassId::from_string(&self.id)?)
    }

    pub fn effective_modality(&self) -> Modality {
        self.modality.unwrap_or(match self.kind {
            ClassKind::Interface => Modality::Abstract,
            _ => Modality::Final,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeParameterDeclaration {
    pub name: String,
    /// Defaults to `kotlin.Any?`.
    #[serde(default)]
    pub upper_bounds: Vec<String>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredMemberKind {
    #[default]
    Function,
    Property,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDeclaration {
    pub name: String,
    #[serde(default)]
    pub kind: DeclaredMemberKind,
    #[serde(default)]
    pub is_var: bool,
    #[serde(default)]
    pub is_static: bool,
    /// Defaults to `abstract` in interfaces and `final` otherwise.
    #[serde(default)]
    pub modality: Option<Modality>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub type_parameters: Vec<TypeParameterDeclaration>,
    /// Extension receiver type.
    #[serde(default)]
    pub receiver: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterDeclaration>,
    #[serde(default = "default_return_type")]
    pub return_type: String,
}

fn default_return_type() -> String {
    "kotlin.Unit".to_string()
}

#[derive(Clone, Debug, Deserialize)]
pub struct ParameterDeclaration {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

// =============================================================================
// Index
// =============================================================================

/// Declared classes by id, in input order.
#[derive(Debug, Default)]
pub struct DeclarationIndex {
    classes: IndexMap<ClassId, Arc<ClassDeclaration>>,
    /// Dotted fq name (`a.b.Outer.Inner`) to id, for resolving type references.
    by_fq_name: FxHashMap<String, ClassId>,
}

impl DeclarationIndex {
    pub fn new(declarations: Vec<ClassDeclaration>) -> Result<Self, ResolveError> {
        let mut index = Self::default();
        for declaration in declarations {
            let class_id = declaration.class_id()?;
            if index.classes.contains_key(&class_id) {
                return Err(ResolveError::invalid_declaration(
                    class_id.as_string(),
                    "class is declared more than once",
                ));
            }
            index
                .by_fq_name
                .insert(class_id.as_single_fq_name().to_string(), class_id.clone());
            index.classes.insert(class_id, Arc::new(declaration));
        }
        Ok(index)
    }

    pub fn get(&self, class_id: &ClassId) -> Option<&Arc<ClassDeclaration>> {
        self.classes.get(class_id)
    }

    pub fn find_by_fq_name(&self, fq_name: &str) -> Option<&ClassId> {
        self.by_fq_name.get(fq_name)
    }

    pub fn class_ids(&self) -> impl Iterator<Item = &ClassId> {
        self.classes.keys()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

// =============================================================================
// Type references
// =============================================================================

/// A parsed, not yet resolved, type reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeRef {
    /// Dotted name as written.
    pub name: String,
    pub arguments: Vec<TypeRef>,
    pub nullable: bool,
    pub flexible: bool,
}

impl TypeRef {
    pub fn parse(text: &str) -> Result<Self, ResolveError> {
        let mut parser = TypeRefParser { text, pos: 0 };
        let parsed = parser.type_ref()?;
        parser.skip_whitespace();
        if parser.pos != text.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(parsed)
    }

    /// Whether the reference is a bare identifier (possibly a type parameter).
    pub fn is_simple(&self) -> bool {
        self.arguments.is_empty() && !self.name.contains('.')
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
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
            f.write_str("!")
        } else if self.nullable {
            f.write_str("?")
        } else {
            Ok(())
        }
    }
}

struct TypeRefParser<'a> {
    text: &'a str,
    pos: usize,
}

impl TypeRefParser<'_> {
    fn error(&self, reason: &str) -> ResolveError {
        ResolveError::invalid_declaration(
            format!("type '{}'", self.text),
            format!("{reason} at offset {}", self.pos),
        )
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek()
            && c.is_whitespace()
        {
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn identifier(&mut self) -> Result<&str, ResolveError> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(c) = self.peek()
            && (c.is_alphanumeric() || c == '_' || c == '$')
        {
            self.pos += c.len_utf8();
        }
        if start == self.pos {
            return Err(self.error("expected an identifier"));
        }
        Ok(&self.text[start..self.pos])
    }

    fn type_ref(&mut self) -> Result<TypeRef, ResolveError> {
        let mut name = self.identifier()?.to_string();
        while self.eat('.') {
            let segment = self.identifier()?;
            name.push('.');
            name.push_str(segment);
        }

        let mut arguments = Vec::new();
        if self.eat('<') {
            loop {
                arguments.push(self.type_ref()?);
                if self.eat(',') {
                    continue;
                }
                if self.eat('>') {
                    break;
                }
                return Err(self.error("expected ',' or '>'"));
            }
        }

        let flexible = self.eat('!');
        let nullable = !flexible && self.eat('?');
        Ok(TypeRef {
            name,
            arguments,
            nullable,
            flexible,
        })
    }
}

#[cfg(test)]
#[path = "../tests/declarations_tests.rs"]
mod tests;
