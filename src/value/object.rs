//! Runtime introspection for user objects
//!
//! Rust has no reflection, so a type opts in by implementing [`Introspect`]
//! and listing its members on a [`TypeBuilder`]. The resulting
//! [`TypeDescriptor`] is built once per `TypeId` and shared.

use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock, RwLock};

use super::value::Value;

/// Shared handle to a user object inside a [`Value`]
pub type ObjectRef = Arc<dyn Object>;

type GetterFn = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;
type SetterFn = Arc<dyn Fn(&dyn Any, Value) -> Result<(), String> + Send + Sync>;

/// How a readable member was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// A public field
    Field,
    /// A zero-argument method
    Method,
}

/// A readable member of a described type
#[derive(Clone)]
pub struct Member {
    name: String,
    kind: MemberKind,
    get: GetterFn,
}

impl Member {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// Reads the member from `target`. Returns `None` if `target` is not an
    /// instance of the type this member was declared on.
    pub fn read(&self, target: &dyn Any) -> Option<Value> {
        (self.get)(target)
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Declared parameter type of a setter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Boolean,
    Integer,
    Float,
    Text,
    Timestamp,
    List,
    Map,
    Object,
    Any,
}

impl ParamType {
    /// Scores how well `value` fits this parameter.
    ///
    /// 2 for an exact or assignable match, 1 for numeric coercion or a null
    /// passed to a reference-like parameter, 0 when incompatible.
    pub fn score(&self, value: &Value) -> u8 {
        match (self, value) {
            (ParamType::Any, _) => 2,
            (ParamType::Boolean, Value::Boolean(_)) => 2,
            (ParamType::Integer, Value::Integer(_)) => 2,
            (ParamType::Float, Value::Float(_)) => 2,
            (ParamType::Text, Value::Text(_)) => 2,
            (ParamType::Timestamp, Value::Timestamp(_)) => 2,
            (ParamType::List, Value::List(_)) => 2,
            (ParamType::Map, Value::Map(_)) => 2,
            (ParamType::Object, Value::Object(_)) => 2,
            (ParamType::Integer, Value::Float(_)) | (ParamType::Float, Value::Integer(_)) => 1,
            (
                ParamType::Text
                | ParamType::Timestamp
                | ParamType::List
                | ParamType::Map
                | ParamType::Object,
                Value::Null,
            ) => 1,
            _ => 0,
        }
    }

    /// Applies the numeric coercion implied by a score of 1
    pub fn coerce(&self, value: Value) -> Value {
        match (self, value) {
            (ParamType::Integer, Value::Float(f)) => Value::Integer(f.trunc() as i64),
            (ParamType::Float, Value::Integer(i)) => Value::Float(i as f64),
            (_, other) => other,
        }
    }
}

/// A writable member of a described type
#[derive(Clone)]
pub struct SetterMember {
    name: String,
    param: ParamType,
    set: SetterFn,
}

impl SetterMember {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param(&self) -> ParamType {
        self.param
    }

    pub fn apply(&self, target: &dyn Any, value: Value) -> Result<(), String> {
        (self.set)(target, value)
    }
}

impl fmt::Debug for SetterMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetterMember")
            .field("name", &self.name)
            .field("param", &self.param)
            .finish()
    }
}

/// Members of one runtime type
#[derive(Debug)]
pub struct TypeDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    members: Vec<Member>,
    setters: Vec<SetterMember>,
}

impl TypeDescriptor {
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn setters(&self) -> &[SetterMember] {
        &self.setters
    }

    /// Finds a member by exact name and kind
    pub fn find(&self, name: &str, kind: MemberKind) -> Option<&Member> {
        self.members
            .iter()
            .find(|m| m.kind == kind && m.name == name)
    }

    /// Resolves a property name to a member.
    ///
    /// First match wins: field `x`, method `getX`, method `get_x`, method `x`.
    pub fn lookup(&self, property: &str) -> Option<&Member> {
        self.find(property, MemberKind::Field)
            .or_else(|| self.find(&prefixed("get", property), MemberKind::Method))
            .or_else(|| self.find(&format!("get_{}", property), MemberKind::Method))
            .or_else(|| self.find(property, MemberKind::Method))
    }

    /// Setter overloads usable for a property, in resolution order:
    /// `x`, `setX`, `set_x`.
    pub fn setters_for(&self, property: &str) -> Vec<&SetterMember> {
        let names = [
            property.to_string(),
            prefixed("set", property),
            format!("set_{}", property),
        ];
        names
            .iter()
            .flat_map(|n| self.setters.iter().filter(move |s| &s.name == n))
            .collect()
    }
}

/// `get` + `name` -> `getName`
fn prefixed(prefix: &str, name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("{}{}{}", prefix, first.to_uppercase(), chars.as_str()),
        None => prefix.to_string(),
    }
}

/// Collects the members of `T` for its [`TypeDescriptor`]
pub struct TypeBuilder<T> {
    members: Vec<Member>,
    setters: Vec<SetterMember>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Introspect> TypeBuilder<T> {
    fn new() -> Self {
        Self {
            members: Vec::new(),
            setters: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Declares a public field
    pub fn field<V, F>(&mut self, name: &str, read: F) -> &mut Self
    where
        V: Into<Value>,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.push(name, MemberKind::Field, read)
    }

    /// Declares a zero-argument method
    pub fn method<V, F>(&mut self, name: &str, call: F) -> &mut Self
    where
        V: Into<Value>,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.push(name, MemberKind::Method, call)
    }

    /// Declares a one-argument setter. Setters receive `&T`, so mutable
    /// state lives behind interior mutability.
    pub fn setter<F>(&mut self, name: &str, param: ParamType, set: F) -> &mut Self
    where
        F: Fn(&T, Value) -> Result<(), String> + Send + Sync + 'static,
    {
        let set: SetterFn = Arc::new(move |target: &dyn Any, value: Value| {
            match target.downcast_ref::<T>() {
                Some(t) => set(t, value),
                None => Err(format!("target is not a {}", short_type_name::<T>())),
            }
        });
        self.setters.push(SetterMember {
            name: name.to_string(),
            param,
            set,
        });
        self
    }

    fn push<V, F>(&mut self, name: &str, kind: MemberKind, read: F) -> &mut Self
    where
        V: Into<Value>,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        let get: GetterFn =
            Arc::new(move |target: &dyn Any| target.downcast_ref::<T>().map(|t| read(t).into()));
        self.members.push(Member {
            name: name.to_string(),
            kind,
            get,
        });
        self
    }

    fn finish(self) -> TypeDescriptor {
        TypeDescriptor {
            type_id: TypeId::of::<T>(),
            type_name: short_type_name::<T>(),
            members: self.members,
            setters: self.setters,
        }
    }
}

/// Opt-in introspection for user types.
///
/// ```ignore
/// impl Introspect for Person {
///     fn describe(t: &mut TypeBuilder<Self>) {
///         t.field("name", |p| p.name.clone());
///         t.method("getAge", |p| p.age);
///     }
/// }
/// ```
pub trait Introspect: Any + Send + Sync + fmt::Debug + Sized {
    /// Lists the members visible to queries
    fn describe(builder: &mut TypeBuilder<Self>);

    /// Natural ordering between two instances, if the type has one
    fn natural_cmp(&self, _other: &Self) -> Option<Ordering> {
        None
    }

    /// Text used by lexical comparison and LIKE
    fn to_text(&self) -> String {
        format!("{:?}", self)
    }
}

/// Object-safe view of an [`Introspect`] type
pub trait Object: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;

    fn descriptor(&self) -> Arc<TypeDescriptor>;

    fn type_name(&self) -> &'static str;

    fn object_type_id(&self) -> TypeId;

    /// Natural ordering against another object of the same type
    fn compare_to(&self, other: &dyn Object) -> Option<Ordering>;

    fn display_text(&self) -> String;
}

impl<T: Introspect> Object for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn descriptor(&self) -> Arc<TypeDescriptor> {
        descriptor_of::<T>()
    }

    fn type_name(&self) -> &'static str {
        short_type_name::<T>()
    }

    fn object_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn compare_to(&self, other: &dyn Object) -> Option<Ordering> {
        other
            .as_any()
            .downcast_ref::<T>()
            .and_then(|o| self.natural_cmp(o))
    }

    fn display_text(&self) -> String {
        Introspect::to_text(self)
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    // keep generic arguments intact, strip the module path of the head
    let head_end = full.find('<').unwrap_or(full.len());
    match full[..head_end].rfind("::") {
        Some(i) => &full[i + 2..],
        None => full,
    }
}

fn descriptors() -> &'static RwLock<HashMap<TypeId, Arc<TypeDescriptor>>> {
    static DESCRIPTORS: OnceLock<RwLock<HashMap<TypeId, Arc<TypeDescriptor>>>> = OnceLock::new();
    DESCRIPTORS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Returns the descriptor of `T`, building it on first use
pub fn descriptor_of<T: Introspect>() -> Arc<TypeDescriptor> {
    let id = TypeId::of::<T>();
    if let Ok(map) = descriptors().read() {
        if let Some(descriptor) = map.get(&id) {
            return Arc::clone(descriptor);
        }
    }

    let mut builder = TypeBuilder::<T>::new();
    T::describe(&mut builder);
    let descriptor = Arc::new(builder.finish());

    match descriptors().write() {
        Ok(mut map) => Arc::clone(map.entry(id).or_insert(descriptor)),
        // poisoned: serve an uncached descriptor
        Err(_) => descriptor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Account {
        owner: String,
        balance: Mutex<i64>,
    }

    impl Introspect for Account {
        fn describe(t: &mut TypeBuilder<Self>) {
            t.field("owner", |a| a.owner.clone())
                .method("getBalance", |a| a.balance.lock().map(|b| *b).unwrap_or(0))
                .method("is_open", |_| true)
                .setter("setBalance", ParamType::Integer, |a, v| {
                    let mut balance = a.balance.lock().map_err(|e| e.to_string())?;
                    *balance = v.as_i64().ok_or("not a number")?;
                    Ok(())
                });
        }

        fn to_text(&self) -> String {
            format!("Account({})", self.owner)
        }
    }

    fn account() -> Account {
        Account {
            owner: "ann".to_string(),
            balance: Mutex::new(10),
        }
    }

    #[test]
    fn test_lookup_order() {
        let descriptor = descriptor_of::<Account>();
        assert_eq!(descriptor.type_name(), "Account");
        assert_eq!(descriptor.lookup("owner").unwrap().kind(), MemberKind::Field);
        assert_eq!(descriptor.lookup("balance").unwrap().name(), "getBalance");
        assert_eq!(descriptor.lookup("is_open").unwrap().name(), "is_open");
        assert!(descriptor.lookup("missing").is_none());
    }

    #[test]
    fn test_descriptor_is_shared() {
        let a = descriptor_of::<Account>();
        let b = account().descriptor();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_member_read_and_setter() {
        let acct = account();
        let descriptor = descriptor_of::<Account>();
        let balance = descriptor.lookup("balance").unwrap();
        assert_eq!(balance.read(acct.as_any()), Some(Value::Integer(10)));

        let setters = descriptor.setters_for("balance");
        assert_eq!(setters.len(), 1);
        setters[0].apply(acct.as_any(), Value::Integer(99)).unwrap();
        assert_eq!(balance.read(acct.as_any()), Some(Value::Integer(99)));

        // wrong receiver type
        assert!(balance.read(&42_i32).is_none());
    }

    #[test]
    fn test_param_scores() {
        assert_eq!(ParamType::Integer.score(&Value::Integer(1)), 2);
        assert_eq!(ParamType::Integer.score(&Value::Float(1.5)), 1);
        assert_eq!(ParamType::Integer.score(&Value::from("x")), 0);
        assert_eq!(ParamType::Text.score(&Value::Null), 1);
        assert_eq!(ParamType::Boolean.score(&Value::Null), 0);
        assert_eq!(ParamType::Any.score(&Value::Null), 2);
        assert_eq!(ParamType::Integer.coerce(Value::Float(2.9)), Value::Integer(2));
    }

    #[test]
    fn test_display_text() {
        let value = Value::object(account());
        assert_eq!(value.to_text(), "Account(ann)");
        assert_eq!(value.type_name(), "Account");
    }
}
