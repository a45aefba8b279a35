//! The interpreter facade: registration, parse, eval, detect.

use std::sync::Arc;

use tracing::debug;

use crate::binder::{self, ParserArguments};
use crate::detect::{self, IdentifiersInfo};
use crate::error::{ConfigurationError, InterpreterError, ParseError};
use crate::eval::{FunctionValue, Value};
use crate::lambda::{Lambda, Parameter};
use crate::reflect::{names_match, ReferenceType};
use crate::registry::{AssignmentPolicy, Identifier, Settings};
use crate::stdlib;
use crate::types::Type;
use crate::visitors::{Visitor, VisitorSet, DISABLE_REFLECTION};

/// Construction options: which seed groups to load and how names compare.
#[derive(Debug, Clone, Copy)]
pub struct InterpreterOptions {
    /// Register the primitive type aliases (`int`, `string`, ...).
    pub primitive_types: bool,
    /// Register the common types: the `string` member set, `Math`,
    /// `Convert`.
    pub common_types: bool,
    /// Register `true`, `false` and `null`.
    pub literal_identifiers: bool,
    /// Fold case in every name lookup. Dynamic members stay
    /// case-sensitive regardless.
    pub case_insensitive: bool,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            primitive_types: true,
            common_types: true,
            literal_identifiers: true,
            case_insensitive: false,
        }
    }
}

impl InterpreterOptions {
    /// No seed groups, case-sensitive.
    pub fn none() -> Self {
        Self {
            primitive_types: false,
            common_types: false,
            literal_identifiers: false,
            case_insensitive: false,
        }
    }

    /// All seed groups with case-insensitive name lookups.
    pub fn case_insensitive() -> Self {
        Self {
            case_insensitive: true,
            ..Self::default()
        }
    }
}

/// An embeddable expression interpreter.
///
/// Registration (`set_variable`, `reference_type`, visitor mutation) is
/// expected to complete before parsing starts; afterwards the interpreter
/// is safe for concurrent `parse`/`eval` calls.
#[derive(Debug, Clone)]
pub struct Interpreter {
    settings: Settings,
    visitors: VisitorSet,
}

impl Interpreter {
    /// A default interpreter: every seed group, case-sensitive.
    pub fn new() -> Self {
        Self::with_options(InterpreterOptions::default())
    }

    /// An interpreter with explicit construction options.
    pub fn with_options(options: InterpreterOptions) -> Self {
        let mut settings = Settings::empty(!options.case_insensitive);

        if options.primitive_types {
            for reference in stdlib::primitive_types() {
                settings.reference_type_arc(reference.clone());
            }
        }
        if options.common_types {
            for reference in stdlib::common_types() {
                settings.reference_type_arc(reference.clone());
            }
        }
        if options.literal_identifiers {
            for identifier in stdlib::literal_identifiers() {
                // Seed names are not reserved; registration cannot fail.
                let _ = settings.set_identifier(identifier.clone());
            }
        }

        Self {
            settings,
            visitors: VisitorSet::with_defaults(),
        }
    }

    /// Whether name lookups are case-sensitive.
    pub fn case_sensitive(&self) -> bool {
        self.settings.case_sensitive()
    }

    /// The settings snapshot a parse reads.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // === Registration ===

    /// Bind a name to a value. Last write wins.
    pub fn set_variable(
        &mut self,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<&mut Self, ConfigurationError> {
        self.settings.set_identifier(Identifier::new(name, value))?;
        Ok(self)
    }

    /// Bind a name to a callable value.
    pub fn set_function(
        &mut self,
        name: &str,
        function: FunctionValue,
    ) -> Result<&mut Self, ConfigurationError> {
        self.set_variable(name, Value::function(function))
    }

    /// Register an identifier with an explicit static type.
    pub fn set_identifier(
        &mut self,
        identifier: Identifier,
    ) -> Result<&mut Self, ConfigurationError> {
        self.settings.set_identifier(identifier)?;
        Ok(self)
    }

    /// Register a host type under its alias; its extension methods join
    /// the extension set.
    pub fn reference_type(
        &mut self,
        reference: ReferenceType,
    ) -> Result<&mut Self, ConfigurationError> {
        self.settings.reference_type(reference)?;
        Ok(self)
    }

    /// Set the assignment policy.
    pub fn enable_assignment(&mut self, policy: AssignmentPolicy) -> &mut Self {
        self.settings.set_assignment(policy);
        self
    }

    /// Append a visitor to the pipeline.
    pub fn add_visitor(&mut self, visitor: Arc<dyn Visitor>) -> &mut Self {
        self.visitors.add(visitor);
        self
    }

    /// Remove the reflection-disabling visitor, allowing expressions to
    /// produce and traverse type handles.
    pub fn enable_reflection(&mut self) -> &mut Self {
        self.visitors.remove(DISABLE_REFLECTION);
        self
    }

    /// Registered types, in registration order.
    pub fn registered_types(&self) -> impl Iterator<Item = &Arc<ReferenceType>> {
        self.settings.types()
    }

    /// Registered identifiers, in registration order.
    pub fn identifiers(&self) -> impl Iterator<Item = &Identifier> {
        self.settings.identifiers()
    }

    // === Parse / eval / detect ===

    /// Parse and bind an expression over the declared parameters.
    pub fn parse(
        &self,
        text: &str,
        parameters: &[Parameter],
    ) -> Result<Lambda, InterpreterError> {
        self.parse_with(text, None, parameters)
    }

    /// Parse, requiring the result to conform to `expected` (or convert
    /// implicitly to it).
    pub fn parse_as(
        &self,
        text: &str,
        expected: &Type,
        parameters: &[Parameter],
    ) -> Result<Lambda, InterpreterError> {
        self.parse_with(text, Some(expected.clone()), parameters)
    }

    /// Parse and invoke in one step, using the values the parameters
    /// carry.
    pub fn eval(
        &self,
        text: &str,
        parameters: &[Parameter],
    ) -> Result<Value, InterpreterError> {
        let lambda = self.parse(text, parameters)?;
        lambda.invoke_with_declared()
    }

    /// `eval` with a typed result.
    pub fn eval_as<T: TryFrom<Value>>(
        &self,
        text: &str,
        parameters: &[Parameter],
    ) -> Result<T, InterpreterError> {
        let value = self.eval(text, parameters)?;
        T::try_from(value.clone()).map_err(|_| {
            InterpreterError::Invocation(
                crate::eval::EvalError::invalid_conversion(
                    &value.type_name(),
                    "requested type",
                )
                .into(),
            )
        })
    }

    /// Classify the identifiers in a text without binding it.
    pub fn detect_identifiers(&self, text: &str) -> IdentifiersInfo {
        detect::detect(text, &self.settings)
    }

    fn parse_with(
        &self,
        text: &str,
        expected: Option<Type>,
        parameters: &[Parameter],
    ) -> Result<Lambda, InterpreterError> {
        self.check_parameters(parameters)?;

        debug!(text, params = parameters.len(), "parsing expression");

        let ast = dexpr_parser::parse(text, &self.settings).map_err(ParseError::from)?;

        let mut args =
            ParserArguments::new(text, &self.settings, &self.settings, expected, parameters);
        let tree = binder::bind(&ast, &mut args)?;
        let tree = self.visitors.apply(tree)?;

        let used_parameters: Vec<Parameter> = args
            .used_parameters
            .iter()
            .map(|&index| parameters[index].clone())
            .collect();

        let lambda = Lambda::new(
            tree,
            text,
            parameters.to_vec(),
            used_parameters,
            args.used_types.into_iter().collect(),
            args.used_identifiers.into_iter().collect(),
        );

        debug!(
            return_type = %lambda.return_type(),
            used = lambda.used_parameters().len(),
            "expression bound"
        );

        Ok(lambda)
    }

    fn check_parameters(&self, parameters: &[Parameter]) -> Result<(), ConfigurationError> {
        let ignore_case = !self.settings.case_sensitive();
        for (i, param) in parameters.iter().enumerate() {
            if param.name.is_empty() {
                return Err(ConfigurationError::empty_name());
            }
            if Settings::is_reserved(&param.name) {
                return Err(ConfigurationError::reserved_name(&param.name));
            }
            if parameters[..i]
                .iter()
                .any(|p| names_match(&p.name, &param.name, ignore_case))
            {
                return Err(ConfigurationError::duplicate_parameter(&param.name));
            }
        }
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_load_all_seeds() {
        let interpreter = Interpreter::new();
        assert!(interpreter.settings().lookup_type("int").is_some());
        assert!(interpreter.settings().lookup_type("Math").is_some());
        assert!(interpreter.settings().lookup_identifier("true").is_some());
        assert!(interpreter.case_sensitive());
    }

    #[test]
    fn bare_options_load_nothing() {
        let interpreter = Interpreter::with_options(InterpreterOptions::none());
        assert_eq!(interpreter.registered_types().count(), 0);
        assert_eq!(interpreter.identifiers().count(), 0);
    }

    #[test]
    fn eval_round_trip() {
        let mut interpreter = Interpreter::new();
        interpreter.set_variable("x", 4).unwrap();
        assert_eq!(interpreter.eval("x * x", &[]).unwrap(), Value::Int32(16));
    }

    #[test]
    fn eval_with_parameter_values() {
        let interpreter = Interpreter::new();
        let value = interpreter
            .eval("a + b", &[
                Parameter::with_value("a", 1),
                Parameter::with_value("b", 2),
            ])
            .unwrap();
        assert_eq!(value, Value::Int32(3));
    }

    #[test]
    fn reserved_parameter_names_rejected() {
        let interpreter = Interpreter::new();
        let err = interpreter
            .parse("1", &[Parameter::new("typeof", Type::Int32)])
            .unwrap_err();
        assert!(matches!(err, InterpreterError::Configuration(_)));
    }

    #[test]
    fn duplicate_parameters_fold_case_when_insensitive() {
        let interpreter = Interpreter::with_options(InterpreterOptions::case_insensitive());
        let declared = [
            Parameter::new("x", Type::Int32),
            Parameter::new("X", Type::Int32),
        ];
        assert!(matches!(
            interpreter.parse("x", &declared),
            Err(InterpreterError::Configuration(_))
        ));
    }
}
