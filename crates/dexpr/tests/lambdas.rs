//! Lambda artifact tests: reuse, typed closures, usage tracking and the
//! thread-safety contract.

use std::sync::Arc;
use std::thread;

use dexpr::{
    FunctionValue, Interpreter, InterpreterError, Parameter, Type, Value,
};

#[test]
fn lambda_reuse_across_invocations() {
    let interpreter = Interpreter::new();
    let lambda = interpreter
        .parse("x * 2", &[Parameter::new("x", Type::Int32)])
        .unwrap();

    assert_eq!(lambda.invoke(&[Value::Int32(5)]).unwrap(), Value::Int32(10));
    assert_eq!(lambda.invoke(&[Value::Int32(21)]).unwrap(), Value::Int32(42));
}

#[test]
fn used_parameters_subset_of_declared() {
    let interpreter = Interpreter::new();
    let declared = [
        Parameter::new("a", Type::Int32),
        Parameter::new("b", Type::Int32),
        Parameter::new("c", Type::Int32),
    ];
    let lambda = interpreter.parse("a + c", &declared).unwrap();

    let used: Vec<_> = lambda
        .used_parameters()
        .iter()
        .map(|p| p.name.to_string())
        .collect();
    assert_eq!(used, vec!["a", "c"]);
    assert_eq!(lambda.declared_parameters().len(), 3);

    for used in lambda.used_parameters() {
        assert!(lambda
            .declared_parameters()
            .iter()
            .any(|d| d.name == used.name));
    }
}

#[test]
fn used_types_and_identifiers_tracked() {
    let mut interpreter = Interpreter::new();
    interpreter.set_variable("origin", 100).unwrap();

    let lambda = interpreter
        .parse("origin + (int) Math.Floor(1.9)", &[])
        .unwrap();

    assert!(lambda
        .used_identifiers()
        .contains(&"origin".to_string()));
    assert!(lambda.used_types().contains(&"Math".to_string()));
    assert!(lambda.used_types().contains(&"int".to_string()));
    assert_eq!(lambda.invoke(&[]).unwrap(), Value::Int32(101));
}

#[test]
fn invoke_argument_count_must_match() {
    let interpreter = Interpreter::new();
    let lambda = interpreter
        .parse("x + 1", &[Parameter::new("x", Type::Int32)])
        .unwrap();

    assert!(matches!(
        lambda.invoke(&[]),
        Err(InterpreterError::Configuration(_))
    ));
    assert!(matches!(
        lambda.invoke(&[Value::Int32(1), Value::Int32(2)]),
        Err(InterpreterError::Configuration(_))
    ));
}

#[test]
fn invoke_widens_arguments_implicitly() {
    let interpreter = Interpreter::new();
    let lambda = interpreter
        .parse("x + 1L", &[Parameter::new("x", Type::Int64)])
        .unwrap();

    // An int argument widens to the declared long parameter.
    assert_eq!(lambda.invoke(&[Value::Int32(1)]).unwrap(), Value::Int64(2));
    // A string does not.
    assert!(lambda.invoke(&[Value::string("no")]).is_err());
}

#[test]
fn typed_closures() {
    let interpreter = Interpreter::new();

    let lambda = interpreter
        .parse(
            "a + b.Length",
            &[
                Parameter::new("a", Type::Int32),
                Parameter::new("b", Type::String),
            ],
        )
        .unwrap();
    let f = lambda.as_fn2::<i32, String, i32>();
    assert_eq!(f(40, "ab".to_string()).unwrap(), 42);

    let lambda = interpreter.parse("2 + 3", &[]).unwrap();
    let g = lambda.as_fn0::<i32>();
    assert_eq!(g().unwrap(), 5);
}

#[test]
fn duplicate_parameters_rejected() {
    let interpreter = Interpreter::new();
    let declared = [
        Parameter::new("x", Type::Int32),
        Parameter::new("x", Type::Int64),
    ];
    assert!(matches!(
        interpreter.parse("x", &declared),
        Err(InterpreterError::Configuration(_))
    ));
}

#[test]
fn parameters_shadow_identifiers() {
    let mut interpreter = Interpreter::new();
    interpreter.set_variable("x", 1).unwrap();

    let lambda = interpreter
        .parse("x", &[Parameter::new("x", Type::Int32)])
        .unwrap();
    // The declared parameter wins over the registered identifier.
    assert_eq!(lambda.invoke(&[Value::Int32(9)]).unwrap(), Value::Int32(9));
    assert_eq!(lambda.used_parameters().len(), 1);
    assert!(lambda.used_identifiers().is_empty());
}

#[test]
fn registered_functions_are_callable() {
    let mut interpreter = Interpreter::new();
    interpreter
        .set_function(
            "double",
            FunctionValue::new("double", vec![Type::Int32], Type::Int32, |args| {
                match &args[0] {
                    Value::Int32(n) => Ok(Value::Int32(n * 2)),
                    other => Ok(other.clone()),
                }
            }),
        )
        .unwrap();

    assert_eq!(
        interpreter.eval("double(21)", &[]).unwrap(),
        Value::Int32(42)
    );
    // Arity is part of the signature.
    assert!(interpreter.eval("double(1, 2)", &[]).is_err());
}

#[test]
fn extension_methods_apply_after_instance_lookup() {
    let mut interpreter = Interpreter::new();
    interpreter
        .reference_type(
            dexpr::ReferenceType::host("StringExtensions").with_method(dexpr::Method::extension(
                "Shout",
                vec![Type::String],
                Type::String,
                |args| Ok(Value::string(format!("{}!", args[0].to_text().to_uppercase()))),
            )),
        )
        .unwrap();

    assert_eq!(
        interpreter.eval(r#""hey".Shout()"#, &[]).unwrap(),
        Value::string("HEY!")
    );
    // Extension holders remain callable statically.
    assert_eq!(
        interpreter.eval(r#"StringExtensions.Shout("lo")"#, &[]).unwrap(),
        Value::string("LO!")
    );
}

#[test]
fn instance_method_beats_extension() {
    let mut interpreter = Interpreter::new();
    // An extension named like a seeded string instance method loses.
    interpreter
        .reference_type(
            dexpr::ReferenceType::host("Ext").with_method(dexpr::Method::extension(
                "ToUpper",
                vec![Type::String],
                Type::String,
                |_| Ok(Value::string("extension wins")),
            )),
        )
        .unwrap();

    assert_eq!(
        interpreter.eval(r#""abc".ToUpper()"#, &[]).unwrap(),
        Value::string("ABC")
    );
}

#[test]
fn lambda_invocation_is_thread_safe() {
    let interpreter = Interpreter::new();
    let lambda = Arc::new(
        interpreter
            .parse("x * x", &[Parameter::new("x", Type::Int32)])
            .unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let lambda = Arc::clone(&lambda);
            thread::spawn(move || {
                for _ in 0..100 {
                    let result = lambda.invoke(&[Value::Int32(i)]).unwrap();
                    assert_eq!(result, Value::Int32(i * i));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn concurrent_parse_after_registration() {
    let mut interpreter = Interpreter::new();
    interpreter.set_variable("base", 10).unwrap();
    let interpreter = Arc::new(interpreter);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let interpreter = Arc::clone(&interpreter);
            thread::spawn(move || {
                let text = format!("base + {}", i);
                let value = interpreter.eval(&text, &[]).unwrap();
                assert_eq!(value, Value::Int32(10 + i));
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn expression_text_preserved() {
    let interpreter = Interpreter::new();
    let lambda = interpreter.parse("1 + 2", &[]).unwrap();
    assert_eq!(lambda.expression_text(), "1 + 2");
    assert_eq!(lambda.return_type(), &Type::Int32);
}
