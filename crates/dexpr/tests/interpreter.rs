//! End-to-end interpreter tests: literals, operators, conversions,
//! registry identifiers and the seeded common types.

mod common;

use dexpr::{
    AssignmentPolicy, Decimal, Interpreter, InterpreterError, InterpreterOptions, Parameter,
    ParseErrorKind, Type, Value,
};

fn eval(text: &str) -> Value {
    Interpreter::new().eval(text, &[]).unwrap()
}

fn parse_error(interpreter: &Interpreter, text: &str) -> ParseErrorKind {
    match interpreter.eval(text, &[]) {
        Err(InterpreterError::Parse(e)) => e.kind,
        other => panic!("expected parse error for '{}', got {:?}", text, other),
    }
}

#[test]
fn arithmetic_literals() {
    assert_eq!(eval("1 + 2 * 3"), Value::Int32(7));
    assert_eq!(eval("(1 + 2) * 3"), Value::Int32(9));
    assert_eq!(eval("10 / 4"), Value::Int32(2));
    assert_eq!(eval("10 % 3"), Value::Int32(1));
    assert_eq!(eval("-5 + 3"), Value::Int32(-2));
}

#[test]
fn numeric_promotion() {
    // int + long computes as long
    assert_eq!(eval("1 + 2L"), Value::Int64(3));
    // int + double computes as double
    assert_eq!(eval("1 + 0.5"), Value::Double(1.5));
    // float + float stays single-precision
    assert_eq!(eval("1.5f + 2f"), Value::Single(3.5));
    // char + char computes as int
    assert_eq!(eval("'a' + 'b'"), Value::Int32(195));
    // uint + uint stays uint
    assert_eq!(eval("3u + 4u"), Value::UInt32(7));
    // uint + int computes as long
    assert_eq!(eval("3u + 4"), Value::Int64(7));
}

#[test]
fn decimal_lane() {
    assert_eq!(eval("1.5m + 2m"), Value::Decimal(Decimal(3.5)));
    // decimal mixes with integers
    assert_eq!(eval("1m + 2"), Value::Decimal(Decimal(3.0)));
    // but not with doubles
    let interpreter = Interpreter::new();
    assert!(matches!(
        parse_error(&interpreter, "1m + 2.0"),
        ParseErrorKind::IncompatibleOperands { .. }
    ));
}

#[test]
fn integer_literal_fitting() {
    assert_eq!(eval("2147483647"), Value::Int32(i32::MAX));
    // One past int range widens to long.
    assert_eq!(eval("2147483648"), Value::Int64(2_147_483_648));
    assert_eq!(eval("42u"), Value::UInt32(42));
    assert_eq!(eval("42ul"), Value::UInt64(42));
    assert_eq!(eval("0xFF"), Value::Int32(255));
}

#[test]
fn division_by_zero_is_invocation_error() {
    let interpreter = Interpreter::new();
    match interpreter.eval("1 / 0", &[]) {
        Err(InterpreterError::Invocation(e)) => {
            assert!(e.to_string().contains("division by zero"));
        }
        other => panic!("expected invocation error, got {:?}", other),
    }
}

#[test]
fn overflow_is_invocation_error() {
    let interpreter = Interpreter::new();
    assert!(matches!(
        interpreter.eval("2147483647 + 1", &[]),
        Err(InterpreterError::Invocation(_))
    ));
}

#[test]
fn float_division_never_fails() {
    assert_eq!(eval("1.0 / 0.0"), Value::Double(f64::INFINITY));
}

#[test]
fn comparison_and_logic() {
    assert_eq!(eval("1 < 2 && 2 <= 2"), Value::Bool(true));
    assert_eq!(eval("1 > 2 || false"), Value::Bool(false));
    assert_eq!(eval("!(1 == 2)"), Value::Bool(true));
    assert_eq!(eval("1 != 2"), Value::Bool(true));
    // mixed lanes promote before comparing
    assert_eq!(eval("1 < 1.5"), Value::Bool(true));
    assert_eq!(eval("'a' < 'b'"), Value::Bool(true));
}

#[test]
fn logical_operators_short_circuit() {
    // The right side would divide by zero if evaluated.
    assert_eq!(eval("false && 1 / 0 == 0"), Value::Bool(false));
    assert_eq!(eval("true || 1 / 0 == 0"), Value::Bool(true));
}

#[test]
fn bitwise_and_shift() {
    assert_eq!(eval("6 & 3"), Value::Int32(2));
    assert_eq!(eval("6 | 3"), Value::Int32(7));
    assert_eq!(eval("6 ^ 3"), Value::Int32(5));
    assert_eq!(eval("~0"), Value::Int32(-1));
    assert_eq!(eval("1 << 4"), Value::Int32(16));
    assert_eq!(eval("-8 >> 1"), Value::Int32(-4));
    assert_eq!(eval("true & false"), Value::Bool(false));
    assert_eq!(eval("true ^ true"), Value::Bool(false));
}

#[test]
fn string_literals_and_concat() {
    assert_eq!(eval(r#""foo" + "bar""#), Value::string("foobar"));
    // Either operand being a string concatenates.
    assert_eq!(eval(r#""n = " + 42"#), Value::string("n = 42"));
    assert_eq!(eval(r#"1.5 + " units""#), Value::string("1.5 units"));
}

#[test]
fn string_members_from_common_types() {
    assert_eq!(eval(r#""hello".Length"#), Value::Int32(5));
    assert_eq!(eval(r#""hello".ToUpper()"#), Value::string("HELLO"));
    assert_eq!(eval(r#""  pad  ".Trim()"#), Value::string("pad"));
    assert_eq!(eval(r#""hello".Contains("ell")"#), Value::Bool(true));
    assert_eq!(eval(r#""hello".Substring(1, 3)"#), Value::string("ell"));
    assert_eq!(eval(r#""hello".IndexOf("l")"#), Value::Int32(2));
    assert_eq!(eval(r#""hello"[1]"#), Value::Char('e'));
    assert_eq!(eval(r#""a,b".Replace(",", "-")"#), Value::string("a-b"));
}

#[test]
fn math_and_convert_statics() {
    assert_eq!(eval("Math.Pow(2.0, 10.0)"), Value::Double(1024.0));
    assert_eq!(eval("Math.Abs(-3)"), Value::Int32(3));
    assert_eq!(eval("Math.Max(3, 9)"), Value::Int32(9));
    assert_eq!(eval("Math.Sqrt(81.0)"), Value::Double(9.0));
    assert_eq!(eval("Math.PI > 3.14"), Value::Bool(true));
    assert_eq!(eval(r#"Convert.ToInt32("x" == "x" ? 1.9 : 0.2)"#), Value::Int32(1));
    assert_eq!(eval("Convert.ToString(42)"), Value::string("42"));
    assert_eq!(eval(r#"Convert.ToBoolean("true")"#), Value::Bool(true));
}

#[test]
fn overload_selection_prefers_exact_lane() {
    // Abs(int) exists, so the int literal stays in the int lane.
    assert_eq!(eval("Math.Abs(-5)"), Value::Int32(5));
    assert_eq!(eval("Math.Abs(-5.5)"), Value::Double(5.5));
}

#[test]
fn literal_identifiers_resolve_from_registry() {
    assert_eq!(eval("true"), Value::Bool(true));
    assert_eq!(eval("false || true"), Value::Bool(true));
    assert_eq!(eval("null == null"), Value::Bool(true));
}

#[test]
fn without_literal_seed_true_is_unknown() {
    let interpreter = Interpreter::with_options(InterpreterOptions {
        literal_identifiers: false,
        ..InterpreterOptions::default()
    });
    assert!(matches!(
        parse_error(&interpreter, "true"),
        ParseErrorKind::UnknownIdentifier(name) if name == "true"
    ));
}

#[test]
fn registered_variables_evaluate_to_their_values() {
    let mut interpreter = Interpreter::new();
    interpreter.set_variable("x", 41).unwrap();
    interpreter.set_variable("greeting", "hi").unwrap();

    assert_eq!(interpreter.eval("x + 1", &[]).unwrap(), Value::Int32(42));
    assert_eq!(
        interpreter.eval("greeting + \"!\"", &[]).unwrap(),
        Value::string("hi!")
    );
}

#[test]
fn variable_reregistration_overwrites() {
    let mut interpreter = Interpreter::new();
    interpreter.set_variable("x", 1).unwrap();
    interpreter.set_variable("x", 2).unwrap();
    assert_eq!(interpreter.eval("x", &[]).unwrap(), Value::Int32(2));

    // Changing the type also sticks.
    interpreter.set_variable("x", "now a string").unwrap();
    assert_eq!(
        interpreter.eval("x", &[]).unwrap(),
        Value::string("now a string")
    );
}

#[test]
fn reserved_words_cannot_be_registered() {
    let mut interpreter = Interpreter::new();
    assert!(interpreter.set_variable("typeof", 1).is_err());
    assert!(interpreter.set_variable("new", 1).is_err());
    assert!(interpreter.set_variable("is", 1).is_err());
}

#[test]
fn case_sensitivity_default() {
    let mut interpreter = Interpreter::new();
    interpreter.set_variable("Value", 10).unwrap();
    assert!(interpreter.eval("value", &[]).is_err());
    assert_eq!(interpreter.eval("Value", &[]).unwrap(), Value::Int32(10));
}

#[test]
fn case_insensitive_option() {
    let mut interpreter = Interpreter::with_options(InterpreterOptions::case_insensitive());
    interpreter.set_variable("Value", 10).unwrap();
    assert_eq!(interpreter.eval("VALUE", &[]).unwrap(), Value::Int32(10));
    assert_eq!(interpreter.eval("value + 1", &[]).unwrap(), Value::Int32(11));
    // Member lookups fold case too.
    assert_eq!(
        interpreter.eval(r#""abc".LENGTH"#, &[]).unwrap(),
        Value::Int32(3)
    );
}

#[test]
fn conditional_operator() {
    assert_eq!(eval("1 < 2 ? \"yes\" : \"no\""), Value::string("yes"));
    // Branches converge to the wider type.
    assert_eq!(eval("true ? 1 : 2.5"), Value::Double(1.0));
}

#[test]
fn conditional_branches_must_converge() {
    let interpreter = Interpreter::new();
    assert!(matches!(
        parse_error(&interpreter, "true ? 1 : \"no\""),
        ParseErrorKind::NoCommonType { .. }
    ));
}

#[test]
fn null_coalesce() {
    let mut interpreter = Interpreter::new();
    interpreter
        .set_identifier(dexpr::Identifier::typed(
            "missing",
            Value::Null,
            Type::String,
        ))
        .unwrap();
    interpreter.set_variable("present", "here").unwrap();

    assert_eq!(
        interpreter.eval(r#"missing ?? "fallback""#, &[]).unwrap(),
        Value::string("fallback")
    );
    assert_eq!(
        interpreter.eval(r#"present ?? "fallback""#, &[]).unwrap(),
        Value::string("here")
    );
    assert_eq!(
        interpreter.eval(r#"null ?? "fallback""#, &[]).unwrap(),
        Value::string("fallback")
    );
}

#[test]
fn casts_and_type_tests() {
    assert_eq!(eval("(long) 5"), Value::Int64(5));
    assert_eq!(eval("(int) 3.9"), Value::Int32(3));
    assert_eq!(eval("(char) 65"), Value::Char('A'));
    assert_eq!(eval("5 is int"), Value::Bool(true));
    assert_eq!(eval("5 is long"), Value::Bool(false));
    assert_eq!(eval(r#""s" is string"#), Value::Bool(true));
    assert_eq!(eval(r#""s" as object == null"#), Value::Bool(false));
    assert_eq!(eval("default(int)"), Value::Int32(0));
    assert_eq!(eval("default(string) == null"), Value::Bool(true));
}

#[test]
fn cast_between_unrelated_types_fails_at_bind() {
    let interpreter = Interpreter::new();
    assert!(matches!(
        parse_error(&interpreter, "(int) \"nope\""),
        ParseErrorKind::TypeMismatch { .. }
    ));
}

#[test]
fn unknown_name_reports_position() {
    let interpreter = Interpreter::new();
    match interpreter.eval("1 + nope", &[]) {
        Err(InterpreterError::Parse(e)) => {
            assert!(matches!(e.kind, ParseErrorKind::UnknownIdentifier(ref n) if n == "nope"));
            assert_eq!(e.span, 4..8);
        }
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn assignment_disabled_by_default() {
    let interpreter = Interpreter::new();
    let lambda = interpreter.parse("x = 1", &[Parameter::new("x", Type::Int32)]);
    match lambda {
        Err(InterpreterError::Parse(e)) => {
            assert!(matches!(e.kind, ParseErrorKind::AssignmentDisabled));
        }
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn assignment_to_parameter() {
    let mut interpreter = Interpreter::new();
    interpreter.enable_assignment(AssignmentPolicy::Equal);

    let lambda = interpreter
        .parse("x = x + 1", &[Parameter::new("x", Type::Int32)])
        .unwrap();
    assert_eq!(lambda.invoke(&[Value::Int32(41)]).unwrap(), Value::Int32(42));
}

#[test]
fn assignment_to_registered_identifier_fails() {
    let mut interpreter = Interpreter::new();
    interpreter.enable_assignment(AssignmentPolicy::Equal);
    interpreter.set_variable("x", 1).unwrap();

    assert!(matches!(
        parse_error(&interpreter, "x = 2"),
        ParseErrorKind::AssignmentToConstant(name) if name == "x"
    ));
}

#[test]
fn assignment_to_property_with_setter() {
    let mut interpreter = common::fixture_interpreter();
    interpreter.enable_assignment(AssignmentPolicy::Equal);

    let (customer, value) = common::shared_customer("before", 30);
    interpreter.set_variable("c", value).unwrap();

    let result = interpreter.eval(r#"c.Name = "after""#, &[]).unwrap();
    assert_eq!(result, Value::string("after"));
    assert_eq!(&*customer.name.read().unwrap(), "after");
}

#[test]
fn assignment_to_readonly_property_fails() {
    let mut interpreter = common::fixture_interpreter();
    interpreter.enable_assignment(AssignmentPolicy::Equal);
    interpreter
        .set_variable("c", common::customer_value("x", 1))
        .unwrap();

    assert!(matches!(
        parse_error(&interpreter, "c.Age = 2"),
        ParseErrorKind::NotAnLValue
    ));
}

#[test]
fn universal_to_string() {
    assert_eq!(eval("42.ToString()"), Value::string("42"));
    assert_eq!(eval("true.ToString()"), Value::string("true"));
    assert_eq!(eval("(1.5).ToString()"), Value::string("1.5"));
}

#[test]
fn expected_type_conformance() {
    let interpreter = Interpreter::new();

    // int conforms to long via implicit widening.
    let lambda = interpreter.parse_as("1 + 2", &Type::Int64, &[]).unwrap();
    assert_eq!(lambda.return_type(), &Type::Int64);
    assert_eq!(lambda.invoke(&[]).unwrap(), Value::Int64(3));

    // string does not conform to int.
    assert!(interpreter.parse_as(r#""x""#, &Type::Int32, &[]).is_err());
}

#[test]
fn eval_as_extracts_native_types() {
    let interpreter = Interpreter::new();
    let n: i32 = interpreter.eval_as("40 + 2", &[]).unwrap();
    assert_eq!(n, 42);
    let s: String = interpreter.eval_as(r#""a" + "b""#, &[]).unwrap();
    assert_eq!(s, "ab");
}

#[test]
fn registry_enumeration_is_deterministic() {
    let interpreter = Interpreter::new();
    let aliases: Vec<_> = interpreter
        .registered_types()
        .map(|rt| rt.alias().to_string())
        .collect();
    // Primitives come first, in seed order.
    assert_eq!(aliases[0], "object");
    assert!(aliases.contains(&"Math".to_string()));

    let names: Vec<_> = interpreter
        .identifiers()
        .map(|i| i.name.to_string())
        .collect();
    assert_eq!(names, vec!["true", "false", "null"]);
}
