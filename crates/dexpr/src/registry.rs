//! Type and symbol registries.
//!
//! `Settings` holds everything a parse reads: the known types, the known
//! identifiers, the case-sensitivity rule and the assignment policy. It is
//! mutated by the registration API and treated as frozen while parsing.

use indexmap::IndexMap;
use std::sync::Arc;

use dexpr_parser::TypeProbe;

use crate::error::ConfigurationError;
use crate::eval::Value;
use crate::reflect::{names_match, Member, Method, Reflection, ReferenceType};
use crate::types::{self, Conversion, Type};

/// Words that may never be registered as identifiers or type aliases.
pub const RESERVED_WORDS: &[&str] = &["is", "as", "typeof", "default", "new"];

/// Whether the expression language accepts assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssignmentPolicy {
    /// `=` is rejected at bind time.
    #[default]
    None,
    /// `=` assigns to l-values.
    Equal,
}

/// A registered identifier: a name bound to a value.
#[derive(Debug, Clone)]
pub struct Identifier {
    pub name: Arc<str>,
    pub value: Value,
    pub ty: Type,
}

impl Identifier {
    /// Bind a name to a value; the static type is the value's runtime type.
    pub fn new(name: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        let value = value.into();
        let ty = value.runtime_type();
        Self {
            name: name.into(),
            value,
            ty,
        }
    }

    /// Bind a name to a value under an explicit static type.
    pub fn typed(name: impl Into<Arc<str>>, value: impl Into<Value>, ty: Type) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ty,
        }
    }
}

/// The registries and flags a parse runs against.
#[derive(Clone, Default)]
pub struct Settings {
    case_sensitive: bool,
    assignment: AssignmentPolicy,
    types: IndexMap<String, Arc<ReferenceType>>,
    identifiers: IndexMap<String, Identifier>,
}

impl Settings {
    /// An empty registry with the given case rule.
    pub fn empty(case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            assignment: AssignmentPolicy::None,
            types: IndexMap::new(),
            identifiers: IndexMap::new(),
        }
    }

    /// The canonical storage form of a name under the case rule.
    fn canonical(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }

    /// True when the name is a reserved keyword.
    pub fn is_reserved(name: &str) -> bool {
        RESERVED_WORDS.contains(&name)
    }

    fn check_name(name: &str) -> Result<(), ConfigurationError> {
        if name.is_empty() {
            return Err(ConfigurationError::empty_name());
        }
        if Self::is_reserved(name) {
            return Err(ConfigurationError::reserved_name(name));
        }
        Ok(())
    }

    /// Whether lookups fold case.
    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// The assignment policy.
    pub fn assignment(&self) -> AssignmentPolicy {
        self.assignment
    }

    /// Set the assignment policy.
    pub fn set_assignment(&mut self, policy: AssignmentPolicy) {
        self.assignment = policy;
    }

    /// Register a type. Re-registering an alias replaces the previous
    /// entry entirely, extension methods included.
    pub fn reference_type(&mut self, reference: ReferenceType) -> Result<(), ConfigurationError> {
        Self::check_name(reference.alias())?;
        let key = self.canonical(reference.alias());
        self.types.insert(key, Arc::new(reference));
        Ok(())
    }

    /// Register a pre-built shared type table. Used by the seed groups so
    /// that interpreters share one set of member closures.
    pub(crate) fn reference_type_arc(&mut self, reference: Arc<ReferenceType>) {
        let key = self.canonical(reference.alias());
        self.types.insert(key, reference);
    }

    /// Register an identifier. Last write wins.
    pub fn set_identifier(&mut self, identifier: Identifier) -> Result<(), ConfigurationError> {
        Self::check_name(&identifier.name)?;
        let key = self.canonical(&identifier.name);
        self.identifiers.insert(key, identifier);
        Ok(())
    }

    /// Look up a type alias under the case rule.
    pub fn lookup_type(&self, name: &str) -> Option<&Arc<ReferenceType>> {
        self.types.get(&self.canonical(name))
    }

    /// Look up an identifier under the case rule.
    pub fn lookup_identifier(&self, name: &str) -> Option<&Identifier> {
        self.identifiers.get(&self.canonical(name))
    }

    /// Registered types, in registration order.
    pub fn types(&self) -> impl Iterator<Item = &Arc<ReferenceType>> {
        self.types.values()
    }

    /// Registered identifiers, in registration order.
    pub fn identifiers(&self) -> impl Iterator<Item = &Identifier> {
        self.identifiers.values()
    }

    /// All registrations that target the given static type. Several
    /// aliases may share one target (e.g. a primitive alias plus a member
    /// table for it).
    fn registrations_for(&self, ty: &Type) -> impl Iterator<Item = &Arc<ReferenceType>> {
        let ty = ty.clone();
        self.types.values().filter(move |rt| *rt.target() == ty)
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("case_sensitive", &self.case_sensitive)
            .field("assignment", &self.assignment)
            .field("types", &self.types.len())
            .field("identifiers", &self.identifiers.len())
            .finish()
    }
}

impl Reflection for Settings {
    fn find_members(&self, ty: &Type, name: &str, ignore_case: bool) -> Vec<Member> {
        let mut found = Vec::new();
        for rt in self.registrations_for(ty) {
            for member in rt.members() {
                let matches = match member.name() {
                    Some(member_name) => names_match(member_name, name, ignore_case),
                    // Indexers are addressed without a name.
                    None => name.is_empty(),
                };
                if matches {
                    found.push(member.clone());
                }
            }
        }
        found
    }

    fn conversion(&self, from: &Type, to: &Type) -> Conversion {
        types::conversion(from, to)
    }

    fn extension_methods(&self, receiver: &Type, name: &str, ignore_case: bool) -> Vec<Method> {
        let mut found = Vec::new();
        for rt in self.types.values() {
            for method in rt.extension_methods() {
                if !names_match(&method.name, name, ignore_case) {
                    continue;
                }
                let accepts_receiver = method
                    .sig
                    .params
                    .first()
                    .map(|first| self.conversion(receiver, first).is_implicit())
                    .unwrap_or(false);
                if accepts_receiver {
                    found.push(method.clone());
                }
            }
        }
        found
    }

    fn is_dynamic(&self, ty: &Type) -> bool {
        self.registrations_for(ty).any(|rt| rt.is_dynamic())
    }
}

impl TypeProbe for Settings {
    fn is_type_name(&self, name: &str) -> bool {
        self.lookup_type(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::Property;

    fn string_length() -> ReferenceType {
        ReferenceType::new("string", Type::String).with_property(Property::readonly(
            "Length",
            Type::Int32,
            |recv| match recv {
                Value::String(s) => Ok(Value::Int32(s.chars().count() as i32)),
                other => Err(crate::eval::EvalError::invalid_argument(format!(
                    "expected string, got {}",
                    other.type_name()
                ))),
            },
        ))
    }

    #[test]
    fn register_and_lookup_type() {
        let mut settings = Settings::empty(true);
        settings.reference_type(string_length()).unwrap();

        assert!(settings.lookup_type("string").is_some());
        assert!(settings.lookup_type("String").is_none());
    }

    #[test]
    fn case_insensitive_lookup() {
        let mut settings = Settings::empty(false);
        settings.reference_type(string_length()).unwrap();

        assert!(settings.lookup_type("STRING").is_some());
        assert!(settings.lookup_type("String").is_some());
    }

    #[test]
    fn reserved_names_rejected() {
        let mut settings = Settings::empty(true);
        assert!(settings
            .set_identifier(Identifier::new("typeof", 1))
            .is_err());
        assert!(settings.reference_type(ReferenceType::host("new")).is_err());
        assert!(settings.set_identifier(Identifier::new("", 1)).is_err());
    }

    #[test]
    fn identifier_last_write_wins() {
        let mut settings = Settings::empty(true);
        settings.set_identifier(Identifier::new("x", 1)).unwrap();
        settings.set_identifier(Identifier::new("x", "two")).unwrap();

        let ident = settings.lookup_identifier("x").unwrap();
        assert_eq!(ident.value, Value::string("two"));
        assert_eq!(ident.ty, Type::String);
        assert_eq!(settings.identifiers().count(), 1);
    }

    #[test]
    fn type_reregistration_replaces_members() {
        let mut settings = Settings::empty(true);
        settings.reference_type(string_length()).unwrap();
        settings
            .reference_type(ReferenceType::new("string", Type::String))
            .unwrap();

        assert!(settings
            .find_members(&Type::String, "Length", false)
            .is_empty());
    }

    #[test]
    fn find_members_honours_case_flag() {
        let mut settings = Settings::empty(true);
        settings.reference_type(string_length()).unwrap();

        assert_eq!(
            settings.find_members(&Type::String, "Length", false).len(),
            1
        );
        assert!(settings
            .find_members(&Type::String, "length", false)
            .is_empty());
        assert_eq!(
            settings.find_members(&Type::String, "length", true).len(),
            1
        );
    }

    #[test]
    fn extension_methods_replaced_on_reregistration() {
        let mut settings = Settings::empty(true);
        let ext = ReferenceType::host("StringExtensions").with_method(Method::extension(
            "Reversed",
            vec![Type::String],
            Type::String,
            |args| {
                let s = args[0].to_text();
                Ok(Value::string(s.chars().rev().collect::<String>()))
            },
        ));
        settings.reference_type(ext).unwrap();
        assert_eq!(
            settings
                .extension_methods(&Type::String, "Reversed", false)
                .len(),
            1
        );

        // Re-register the holder type without the extension: it is gone.
        settings
            .reference_type(ReferenceType::host("StringExtensions"))
            .unwrap();
        assert!(settings
            .extension_methods(&Type::String, "Reversed", false)
            .is_empty());
    }
}
