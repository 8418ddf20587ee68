//! Human-readable rendering of descriptors for diagnostics and CLI output.

use crate::arena::{DescriptorArena, DescriptorId};
use crate::descriptor::{CallableKind, CallableMemberDescriptor, Descriptor};
use crate::types::{KType, TypeConstructor};
use std::fmt::Write;

pub struct DescriptorRenderer<'a> {
    arena: &'a DescriptorArena,
}

impl<'a> DescriptorRenderer<'a> {
    pub fn new(arena: &'a DescriptorArena) -> Self {
        Self { arena }
    }

    /// Like `KType`'s `Display`, but type parameters are shown by name.
    pub fn render_type(&self, ty: &KType) -> String {
        let mut out = String::new();
        self.write_type(&mut out, ty);
        out
    }

    fn write_type(&self, out: &mut String, ty: &KType) {
        match &ty.constructor {
            TypeConstructor::Class(class_id) => match class_id.short_class_name() {
                Some(name) => out.push_str(name.as_str()),
                None => out.push_str(&class_id.as_string()),
            },
            TypeConstructor::TypeParameter(id) => out.push_str(&self.name_of(*id)),
            TypeConstructor::Error => out.push_str("[ERROR]"),
        }
        if !ty.arguments.is_empty() {
            out.push('<');
            for (i, argument) in ty.arguments.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                self.write_type(out, argument);
            }
            out.push('>');
        }
        if ty.flexible {
            out.push('!');
        } else if ty.nullable {
            out.push('?');
        }
    }

    fn name_of(&self, id: DescriptorId) -> String {
        self.arena
            .get(id)
            .map(|d| d.name().to_string())
            .unwrap_or_else(|| format!("<unknown #{}>", id.0))
    }

    /// `public open fun <T> foo(x: T): String defined in a/b/C`
    pub fn render_member(&self, member: &CallableMemberDescriptor) -> String {
        let mut out = String::new();
        let _ = write!(out, "{} {} ", member.visibility(), member.modality);
        if member.is_static {
            out.push_str("static ");
        }
        if member.kind == CallableKind::FakeOverride {
            out.push_str("/*fake_override*/ ");
        }
        out.push_str(member.member.keyword());
        out.push(' ');
        if !member.type_parameters.is_empty() {
            out.push('<');
            for (i, parameter) in member.type_parameters.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&self.name_of(*parameter));
            }
            out.push_str("> ");
        }
        if let Some(receiver) = &member.extension_receiver {
            self.write_type(&mut out, receiver);
            out.push('.');
        }
        out.push_str(member.name.as_str());
        if member.member.is_function() {
            out.push('(');
            for (i, parameter) in member.value_parameters.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{}: ", parameter.name);
                self.write_type(&mut out, &parameter.ty);
            }
            out.push(')');
        }
        out.push_str(": ");
        self.write_type(&mut out, &member.return_type);
        if let Some(container) = self.container_name(member.container) {
            let _ = write!(out, " defined in {container}");
        }
        out
    }

    fn container_name(&self, id: DescriptorId) -> Option<String> {
        match self.arena.get(id)? {
            Descriptor::Class(class) => Some(class.class_id.as_string()),
            other => Some(other.name().to_string()),
        }
    }

    pub fn render(&self, id: DescriptorId) -> String {
        match self.arena.get(id) {
            Some(Descriptor::Callable(member)) => self.render_member(&member),
            Some(Descriptor::Class(class)) => format!("{} {}", class.visibility, class.class_id.as_string()),
            Some(Descriptor::TypeParameter(parameter)) => parameter.name.to_string(),
            None => format!("<unknown #{}>", id.0),
        }
    }
}
