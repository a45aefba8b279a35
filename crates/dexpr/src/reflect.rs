//! Reflection adapter: the capability surface the binder queries about
//! host types.
//!
//! The core never inspects host structures directly. Hosts describe their
//! types as [`ReferenceType`] member tables at registration time, and the
//! binder consumes them through the [`Reflection`] trait: member listing,
//! overload resolution, conversion classification, extension-method lookup
//! and the dynamic-member capability check. The default implementation
//! answers from the registry; hosts can substitute their own.
//!
//! Dynamic members are probed at invocation time through [`DynamicObject`],
//! implemented by the instance itself. That probe is case-sensitive
//! regardless of the interpreter's case-sensitivity setting.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::eval::{EvalError, Value};
use crate::types::{Conversion, FunctionSig, Type};

/// A host object held by `Value::Object`.
///
/// `as_any` enables members registered for the type to downcast the
/// receiver back to its native form.
pub trait HostObject: Send + Sync {
    /// The registered alias of this object's type. Member binding and
    /// downcasts match on this name.
    fn type_name(&self) -> &str;

    /// Downcast support for member bodies.
    fn as_any(&self) -> &dyn Any;

    /// The text form; backs the universal `ToString()` method.
    fn to_text(&self) -> String {
        self.type_name().to_string()
    }

    /// The dynamic-member surface, for objects that carry an ad-hoc
    /// property bag. Returning `Some` makes instances of the type eligible
    /// for late-bound member access when the type is registered as
    /// dynamic-capable.
    fn as_dynamic(&self) -> Option<&dyn DynamicObject> {
        None
    }
}

/// An ad-hoc property bag: members addressed by string name, discovered at
/// runtime. Lookup is case-sensitive.
pub trait DynamicObject {
    /// The member names currently present.
    fn member_names(&self) -> Vec<String>;

    /// Probe a member by exact name.
    fn get_member(&self, name: &str) -> Option<Value>;
}

/// Getter of a property: receives the receiver (`Value::Null` for statics).
pub type Getter = Arc<dyn Fn(&Value) -> Result<Value, EvalError> + Send + Sync>;

/// Setter of a property: receiver and new value.
pub type Setter = Arc<dyn Fn(&Value, Value) -> Result<(), EvalError> + Send + Sync>;

/// Body of a method: receiver (`Value::Null` for statics) and arguments.
pub type MethodBody = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync>;

/// Indexer getter: receiver and key.
pub type IndexGetter = Arc<dyn Fn(&Value, &Value) -> Result<Value, EvalError> + Send + Sync>;

/// Indexer setter: receiver, key and new value.
pub type IndexSetter = Arc<dyn Fn(&Value, &Value, Value) -> Result<(), EvalError> + Send + Sync>;

/// A property on a registered type.
#[derive(Clone)]
pub struct Property {
    pub name: Arc<str>,
    pub ty: Type,
    pub is_static: bool,
    pub getter: Getter,
    pub setter: Option<Setter>,
}

impl Property {
    /// A read-only instance property.
    pub fn readonly(
        name: impl Into<Arc<str>>,
        ty: Type,
        getter: impl Fn(&Value) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            ty,
            is_static: false,
            getter: Arc::new(getter),
            setter: None,
        }
    }

    /// A read-write instance property.
    pub fn read_write(
        name: impl Into<Arc<str>>,
        ty: Type,
        getter: impl Fn(&Value) -> Result<Value, EvalError> + Send + Sync + 'static,
        setter: impl Fn(&Value, Value) -> Result<(), EvalError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            ty,
            is_static: false,
            getter: Arc::new(getter),
            setter: Some(Arc::new(setter)),
        }
    }

    /// A read-only static property (a named constant like `Math.PI`).
    pub fn static_readonly(name: impl Into<Arc<str>>, value: Value) -> Self {
        let ty = value.runtime_type();
        Self {
            name: name.into(),
            ty,
            is_static: true,
            getter: Arc::new(move |_| Ok(value.clone())),
            setter: None,
        }
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("is_static", &self.is_static)
            .field("writable", &self.setter.is_some())
            .finish()
    }
}

/// A method on a registered type.
#[derive(Clone)]
pub struct Method {
    pub name: Arc<str>,
    pub sig: Arc<FunctionSig>,
    pub is_static: bool,
    /// Extension methods are statics whose first parameter is the
    /// receiver; the binder searches them only after instance resolution
    /// fails.
    pub is_extension: bool,
    pub body: MethodBody,
}

impl Method {
    /// An instance method. The body receives the receiver and the bound
    /// arguments.
    pub fn instance(
        name: impl Into<Arc<str>>,
        params: Vec<Type>,
        result: Type,
        body: impl Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            sig: Arc::new(FunctionSig { params, result }),
            is_static: false,
            is_extension: false,
            body: Arc::new(body),
        }
    }

    /// A static method. The body receives the arguments only.
    pub fn static_fn(
        name: impl Into<Arc<str>>,
        params: Vec<Type>,
        result: Type,
        body: impl Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            sig: Arc::new(FunctionSig { params, result }),
            is_static: true,
            is_extension: false,
            body: Arc::new(move |_, args| body(args)),
        }
    }

    /// An extension method: a static whose first parameter is the
    /// receiver type it extends.
    pub fn extension(
        name: impl Into<Arc<str>>,
        params: Vec<Type>,
        result: Type,
        body: impl Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            sig: Arc::new(FunctionSig { params, result }),
            is_static: true,
            is_extension: true,
            body: Arc::new(move |_, args| body(args)),
        }
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("sig", &self.sig)
            .field("is_static", &self.is_static)
            .field("is_extension", &self.is_extension)
            .finish()
    }
}

/// An indexer on a registered type (`receiver[key]`).
#[derive(Clone)]
pub struct Indexer {
    pub key: Type,
    pub value: Type,
    pub getter: IndexGetter,
    pub setter: Option<IndexSetter>,
}

impl Indexer {
    /// A read-only indexer.
    pub fn readonly(
        key: Type,
        value: Type,
        getter: impl Fn(&Value, &Value) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            key,
            value,
            getter: Arc::new(getter),
            setter: None,
        }
    }

    /// A read-write indexer.
    pub fn read_write(
        key: Type,
        value: Type,
        getter: impl Fn(&Value, &Value) -> Result<Value, EvalError> + Send + Sync + 'static,
        setter: impl Fn(&Value, &Value, Value) -> Result<(), EvalError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            key,
            value,
            getter: Arc::new(getter),
            setter: Some(Arc::new(setter)),
        }
    }
}

impl fmt::Debug for Indexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Indexer")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("writable", &self.setter.is_some())
            .finish()
    }
}

/// A member of a registered type.
#[derive(Debug, Clone)]
pub enum Member {
    Property(Property),
    Method(Method),
    Indexer(Indexer),
}

impl Member {
    /// The member name; indexers have none.
    pub fn name(&self) -> Option<&str> {
        match self {
            Member::Property(p) => Some(&p.name),
            Member::Method(m) => Some(&m.name),
            Member::Indexer(_) => None,
        }
    }
}

/// A registered host type: the public alias expressions use, the static
/// type it denotes, and its member table.
#[derive(Debug, Clone)]
pub struct ReferenceType {
    alias: Arc<str>,
    target: Type,
    members: Vec<Member>,
    dynamic: bool,
}

impl ReferenceType {
    /// Register members for an arbitrary target type. Used to attach
    /// members to primitives (the `string` member set) as well as to host
    /// types.
    pub fn new(alias: impl Into<Arc<str>>, target: Type) -> Self {
        Self {
            alias: alias.into(),
            target,
            members: Vec::new(),
            dynamic: false,
        }
    }

    /// A host type whose static type is named by its alias.
    pub fn host(alias: impl Into<Arc<str>>) -> Self {
        let alias = alias.into();
        let target = Type::Host(alias.clone());
        Self::new(alias, target)
    }

    /// Mark the type as dynamic-capable: member access that fails static
    /// resolution falls back to the instance's property bag.
    pub fn with_dynamic_members(mut self) -> Self {
        self.dynamic = true;
        self
    }

    /// Add a property.
    pub fn with_property(mut self, property: Property) -> Self {
        self.members.push(Member::Property(property));
        self
    }

    /// Add a method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.members.push(Member::Method(method));
        self
    }

    /// Add an indexer.
    pub fn with_indexer(mut self, indexer: Indexer) -> Self {
        self.members.push(Member::Indexer(indexer));
        self
    }

    /// The public alias.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// The static type this registration denotes.
    pub fn target(&self) -> &Type {
        &self.target
    }

    /// All members.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Whether instances may expose an ad-hoc property bag.
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// The extension methods this registration contributes.
    pub fn extension_methods(&self) -> impl Iterator<Item = &Method> {
        self.members.iter().filter_map(|m| match m {
            Member::Method(m) if m.is_extension => Some(m),
            _ => None,
        })
    }
}

/// Compare member names under the interpreter's case rule.
pub(crate) fn names_match(a: &str, b: &str, ignore_case: bool) -> bool {
    if ignore_case {
        a.to_lowercase() == b.to_lowercase()
    } else {
        a == b
    }
}

/// The capability surface the binder queries about types.
pub trait Reflection: Send + Sync {
    /// List the members of a type with the given name, honouring the case
    /// flag. Indexers are returned for an empty name.
    fn find_members(&self, ty: &Type, name: &str, ignore_case: bool) -> Vec<Member>;

    /// Classify the conversion from one type to another.
    fn conversion(&self, from: &Type, to: &Type) -> Conversion;

    /// Extension methods applicable to a receiver type: statics whose
    /// first parameter accepts the receiver.
    fn extension_methods(&self, receiver: &Type, name: &str, ignore_case: bool) -> Vec<Method>;

    /// Whether the type advertises dynamic-member support.
    fn is_dynamic(&self, ty: &Type) -> bool;
}
