//! Identifier detection: a parse-free pass that classifies the names in an
//! expression without requiring their values.
//!
//! Member names (identifiers following `.`) are skipped and call chains
//! are not validated; the output seeds pre-flight checks in editors and
//! hosts that want to know which parameters a text would need.

use indexmap::IndexSet;
use std::sync::Arc;

use dexpr_parser::{lex_lossy, Token};

use crate::reflect::ReferenceType;
use crate::registry::{Identifier, Settings};

/// Classification of the identifiers appearing in an expression text.
#[derive(Debug, Clone, Default)]
pub struct IdentifiersInfo {
    /// Registered identifiers the text references.
    pub identifiers: Vec<Identifier>,
    /// Registered types the text references.
    pub types: Vec<Arc<ReferenceType>>,
    /// Names that would have to be supplied as parameters.
    pub unknown: Vec<String>,
}

/// Detect and classify every identifier occurrence in `text`.
///
/// Best-effort: unlexable characters are skipped rather than failing the
/// whole detection.
pub fn detect(text: &str, settings: &Settings) -> IdentifiersInfo {
    let tokens = lex_lossy(text);

    let mut info = IdentifiersInfo::default();
    let mut seen_identifiers = IndexSet::new();
    let mut seen_types = IndexSet::new();
    let mut seen_unknown = IndexSet::new();

    let canonical = |name: &str| {
        if settings.case_sensitive() {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    };

    for (i, (token, _)) in tokens.iter().enumerate() {
        let name = match token {
            Token::Ident(name) => name,
            _ => continue,
        };

        // An identifier after '.' is a member name, not a free name.
        if i > 0 && tokens[i - 1].0 == Token::Dot {
            continue;
        }

        if let Some(identifier) = settings.lookup_identifier(name) {
            if seen_identifiers.insert(canonical(name)) {
                info.identifiers.push(identifier.clone());
            }
        } else if let Some(reference) = settings.lookup_type(name) {
            if seen_types.insert(canonical(name)) {
                info.types.push(reference.clone());
            }
        } else if seen_unknown.insert(canonical(name)) {
            info.unknown.push(name.clone());
        }
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Identifier;

    fn settings() -> Settings {
        let mut settings = Settings::empty(true);
        settings
            .set_identifier(Identifier::new("pi", 3.14))
            .unwrap();
        settings
            .reference_type(ReferenceType::host("Customer"))
            .unwrap();
        settings
    }

    #[test]
    fn classifies_identifier_type_and_unknown() {
        let info = detect("pi + Customer.Name + x", &settings());
        assert_eq!(info.identifiers.len(), 1);
        assert_eq!(&*info.identifiers[0].name, "pi");
        assert_eq!(info.types.len(), 1);
        assert_eq!(info.types[0].alias(), "Customer");
        assert_eq!(info.unknown, vec!["x".to_string()]);
    }

    #[test]
    fn member_names_are_skipped() {
        let info = detect("x.Length.Foo", &settings());
        assert_eq!(info.unknown, vec!["x".to_string()]);
    }

    #[test]
    fn duplicates_collapse() {
        let info = detect("x + x * x", &settings());
        assert_eq!(info.unknown, vec!["x".to_string()]);
    }

    #[test]
    fn case_insensitive_duplicates_collapse() {
        let mut settings = Settings::empty(false);
        settings
            .set_identifier(Identifier::new("pi", 3.14))
            .unwrap();
        let info = detect("PI + pi + Foo + foo", &settings);
        assert_eq!(info.identifiers.len(), 1);
        assert_eq!(info.unknown, vec!["Foo".to_string()]);
    }

    #[test]
    fn lex_errors_do_not_hide_names() {
        let info = detect("alpha € beta", &settings());
        assert_eq!(
            info.unknown,
            vec!["alpha".to_string(), "beta".to_string()]
        );
    }
}
