//! Shared host-object fixtures for the dexpr integration tests.
//!
//! Not every test binary uses every fixture.
#![allow(dead_code)]

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use dexpr::{
    DynamicObject, EvalError, HostObject, Interpreter, Method, Property, ReferenceType, Type,
    Value,
};

/// A property bag: every member is ad-hoc, discovered at runtime.
pub struct Bag {
    members: HashMap<String, Value>,
}

impl Bag {
    pub fn new(members: impl IntoIterator<Item = (&'static str, Value)>) -> Self {
        Self {
            members: members
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

impl HostObject for Bag {
    fn type_name(&self) -> &str {
        "Bag"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_text(&self) -> String {
        "Bag".to_string()
    }

    fn as_dynamic(&self) -> Option<&dyn DynamicObject> {
        Some(self)
    }
}

impl DynamicObject for Bag {
    fn member_names(&self) -> Vec<String> {
        self.members.keys().cloned().collect()
    }

    fn get_member(&self, name: &str) -> Option<Value> {
        self.members.get(name).cloned()
    }
}

/// The `Bag` registration: dynamic-capable, no static members.
pub fn bag_type() -> ReferenceType {
    ReferenceType::host("Bag").with_dynamic_members()
}

/// A host object with one static property AND a dynamic bag, for
/// precedence tests. The bag also contains a member named like the
/// static one, holding a different value.
pub struct Hybrid {
    bag: HashMap<String, Value>,
}

impl Hybrid {
    pub fn new() -> Self {
        let mut bag = HashMap::new();
        bag.insert("RealProperty".to_string(), Value::string("from the bag"));
        bag.insert("OnlyDynamic".to_string(), Value::Int32(7));
        Self { bag }
    }
}

impl HostObject for Hybrid {
    fn type_name(&self) -> &str {
        "Hybrid"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_text(&self) -> String {
        "a hybrid".to_string()
    }

    fn as_dynamic(&self) -> Option<&dyn DynamicObject> {
        Some(self)
    }
}

impl DynamicObject for Hybrid {
    fn member_names(&self) -> Vec<String> {
        self.bag.keys().cloned().collect()
    }

    fn get_member(&self, name: &str) -> Option<Value> {
        self.bag.get(name).cloned()
    }
}

/// The `Hybrid` registration: a static `RealProperty` plus the dynamic
/// flag.
pub fn hybrid_type() -> ReferenceType {
    ReferenceType::host("Hybrid")
        .with_dynamic_members()
        .with_property(Property::readonly("RealProperty", Type::String, |_| {
            Ok(Value::string("bar"))
        }))
}

/// A plain host object with static members and mutable state.
pub struct Customer {
    pub name: RwLock<String>,
    pub age: i32,
}

impl Customer {
    pub fn new(name: &str, age: i32) -> Self {
        Self {
            name: RwLock::new(name.to_string()),
            age,
        }
    }
}

impl HostObject for Customer {
    fn type_name(&self) -> &str {
        "Customer"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_text(&self) -> String {
        self.name.read().expect("lock poisoned").clone()
    }
}

fn as_customer(value: &Value) -> Result<&Customer, EvalError> {
    match value {
        Value::Object(obj) => obj
            .as_any()
            .downcast_ref::<Customer>()
            .ok_or_else(|| EvalError::invalid_argument("expected a Customer")),
        other => Err(EvalError::invalid_argument(format!(
            "expected a Customer, got {}",
            other.type_name()
        ))),
    }
}

/// The `Customer` registration: readable `Age`, read-write `Name`, a
/// `Greet` method with two overloads.
pub fn customer_type() -> ReferenceType {
    ReferenceType::host("Customer")
        .with_property(Property::readonly("Age", Type::Int32, |recv| {
            Ok(Value::Int32(as_customer(recv)?.age))
        }))
        .with_property(Property::read_write(
            "Name",
            Type::String,
            |recv| {
                Ok(Value::string(
                    as_customer(recv)?.name.read().expect("lock poisoned").clone(),
                ))
            },
            |recv, value| {
                let customer = as_customer(recv)?;
                *customer.name.write().expect("lock poisoned") = value.to_text();
                Ok(())
            },
        ))
        .with_method(Method::instance(
            "Greet",
            vec![],
            Type::String,
            |recv, _| {
                let customer = as_customer(recv)?;
                Ok(Value::string(format!(
                    "hello {}",
                    customer.name.read().expect("lock poisoned")
                )))
            },
        ))
        .with_method(Method::instance(
            "Greet",
            vec![Type::String],
            Type::String,
            |recv, args| {
                let customer = as_customer(recv)?;
                Ok(Value::string(format!(
                    "{} {}",
                    args[0].to_text(),
                    customer.name.read().expect("lock poisoned")
                )))
            },
        ))
}

/// An interpreter with the shared fixtures registered.
#[allow(dead_code)]
pub fn fixture_interpreter() -> Interpreter {
    let mut interpreter = Interpreter::new();
    interpreter.reference_type(bag_type()).unwrap();
    interpreter.reference_type(hybrid_type()).unwrap();
    interpreter.reference_type(customer_type()).unwrap();
    interpreter
}

/// Shorthand for a `Bag` object value.
#[allow(dead_code)]
pub fn bag_value(members: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
    Value::object(Bag::new(members))
}

/// Shorthand for a customer object value.
#[allow(dead_code)]
pub fn customer_value(name: &str, age: i32) -> Value {
    Value::object(Customer::new(name, age))
}

#[allow(dead_code)]
pub fn hybrid_value() -> Value {
    Value::object(Hybrid::new())
}

/// An arc-shared customer, for tests that inspect the host side after
/// evaluation.
#[allow(dead_code)]
pub fn shared_customer(name: &str, age: i32) -> (Arc<Customer>, Value) {
    let customer = Arc::new(Customer::new(name, age));
    let as_host: Arc<dyn HostObject> = customer.clone();
    (customer, Value::Object(as_host))
}
