//! Compiled accessor chains and the shared resolver cache

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

use crate::observability::{log_event_with_fields, Event};
use crate::value::{Member, ObjectRef, SetterMember, Value};

use super::errors::{PropertyResolutionError, ResolutionResult};
use super::path::{PathSegment, PropertyPath};
use super::setter::Setter;

#[derive(Debug, Clone)]
enum Step {
    /// First member, bound to the root type when the getter was compiled
    Bound(Member),
    Member(String),
    Index(usize),
    Key(String),
}

/// Accessor chain compiled for one (root type, path) pair.
///
/// Only the first member is bound at compile time. Intermediate values can
/// have any runtime type, so later members are bound through the resolver's
/// (type, member) binding cache on first use.
#[derive(Debug)]
pub struct Getter {
    path: PropertyPath,
    root_type: Option<TypeId>,
    steps: Vec<Step>,
}

impl Getter {
    fn compile(path: PropertyPath, root: &Value, bindings: &MemberBindings) -> ResolutionResult<Self> {
        let mut steps = Vec::with_capacity(path.len());
        let root_object = root.as_object();

        for (i, segment) in path.segments().iter().enumerate() {
            let step = match (segment, root_object) {
                (PathSegment::Member(name), Some(object)) if i == 0 => {
                    Step::Bound(bindings.bind(object, name, &path)?)
                }
                (PathSegment::Member(name), _) => Step::Member(name.clone()),
                (PathSegment::Index(index), _) => Step::Index(*index),
                (PathSegment::Key(key), _) => Step::Key(key.clone()),
            };
            steps.push(step);
        }

        Ok(Self {
            root_type: root_object.map(|o| o.object_type_id()),
            path,
            steps,
        })
    }

    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    /// Root type this getter was compiled for; `None` for non-object roots
    pub fn root_type(&self) -> Option<TypeId> {
        self.root_type
    }

    fn get(&self, target: &Value, bindings: &MemberBindings) -> ResolutionResult<Value> {
        let mut steps = self.steps.iter();
        let mut current = match steps.next() {
            Some(step) => self.apply(step, target, bindings)?,
            None => return Ok(target.clone()),
        };
        for step in steps {
            current = self.apply(step, &current, bindings)?;
        }
        Ok(current)
    }

    fn apply(&self, step: &Step, value: &Value, bindings: &MemberBindings) -> ResolutionResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        match step {
            Step::Bound(member) => match value {
                Value::Object(object) => match member.read(object.as_any()) {
                    Some(v) => Ok(v),
                    None => self.read_member(member.name(), value, bindings),
                },
                _ => self.read_member(member.name(), value, bindings),
            },
            Step::Member(name) => self.read_member(name, value, bindings),
            Step::Index(index) => match value {
                Value::List(items) => items.get(*index).cloned().ok_or_else(|| {
                    PropertyResolutionError::IndexOutOfBounds {
                        path: self.path.to_string(),
                        index: *index,
                        len: items.len(),
                    }
                }),
                other => Err(PropertyResolutionError::NotIndexable {
                    path: self.path.to_string(),
                    index: *index,
                    found: other.type_name(),
                }),
            },
            Step::Key(key) => match value {
                Value::Map(map) => Ok(map.get(key).cloned().unwrap_or(Value::Null)),
                other => Err(PropertyResolutionError::NotKeyed {
                    path: self.path.to_string(),
                    key: key.clone(),
                    found: other.type_name(),
                }),
            },
        }
    }

    fn read_member(&self, name: &str, value: &Value, bindings: &MemberBindings) -> ResolutionResult<Value> {
        match value {
            Value::Object(object) => {
                let member = bindings.bind(object, name, &self.path)?;
                Ok(member.read(object.as_any()).unwrap_or(Value::Null))
            }
            // maps are schemaless documents: a missing key reads as null
            Value::Map(map) => Ok(map.get(name).cloned().unwrap_or(Value::Null)),
            other => Err(PropertyResolutionError::NoSuchMember {
                path: self.path.to_string(),
                member: name.to_string(),
                type_name: other.type_name(),
            }),
        }
    }
}

/// Per-(type, property name) member bindings, shared by every getter and
/// setter
#[derive(Debug, Default)]
struct MemberBindings {
    bound: RwLock<HashMap<(TypeId, String), Member>>,
    setters: RwLock<HashMap<(TypeId, String), Arc<[SetterMember]>>>,
}

impl MemberBindings {
    fn bind(&self, object: &ObjectRef, name: &str, path: &PropertyPath) -> ResolutionResult<Member> {
        let key = (object.object_type_id(), name.to_string());
        if let Ok(bound) = self.bound.read() {
            if let Some(member) = bound.get(&key) {
                return Ok(member.clone());
            }
        }

        let descriptor = object.descriptor();
        let member = descriptor
            .lookup(name)
            .cloned()
            .ok_or_else(|| PropertyResolutionError::NoSuchMember {
                path: path.to_string(),
                member: name.to_string(),
                type_name: descriptor.type_name().to_string(),
            })?;

        if let Ok(mut bound) = self.bound.write() {
            bound.entry(key).or_insert_with(|| member.clone());
        }
        Ok(member)
    }

    /// Setter overloads for `name` on the object's type, possibly empty
    fn bind_setters(&self, object: &ObjectRef, name: &str) -> Arc<[SetterMember]> {
        let key = (object.object_type_id(), name.to_string());
        if let Ok(setters) = self.setters.read() {
            if let Some(candidates) = setters.get(&key) {
                return Arc::clone(candidates);
            }
        }

        let candidates: Arc<[SetterMember]> = object
            .descriptor()
            .setters_for(name)
            .into_iter()
            .cloned()
            .collect();

        match self.setters.write() {
            Ok(mut setters) => Arc::clone(setters.entry(key).or_insert(candidates)),
            Err(_) => candidates,
        }
    }
}

/// Shared, append-only cache of parsed paths, compiled getters and setters.
///
/// Every cache is compute-once-per-key behind an `RwLock`, so one resolver
/// may be shared by any number of queries and threads.
#[derive(Debug, Default)]
pub struct PropertyResolver {
    paths: RwLock<HashMap<String, Arc<PropertyPath>>>,
    getters: RwLock<HashMap<(Option<TypeId>, String), Arc<Getter>>>,
    setters: RwLock<HashMap<String, Arc<Setter>>>,
    bindings: MemberBindings,
    compilations: AtomicU64,
}

impl PropertyResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide resolver used by contexts that are not given their own
    pub fn global() -> Arc<PropertyResolver> {
        static GLOBAL: OnceLock<Arc<PropertyResolver>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(PropertyResolver::new())))
    }

    /// Parses `text`, reusing an earlier parse of the same text
    pub fn path(&self, text: &str) -> ResolutionResult<Arc<PropertyPath>> {
        if let Ok(paths) = self.paths.read() {
            if let Some(path) = paths.get(text) {
                return Ok(Arc::clone(path));
            }
        }
        let path = Arc::new(PropertyPath::parse(text)?);
        if let Ok(mut paths) = self.paths.write() {
            return Ok(Arc::clone(
                paths.entry(text.to_string()).or_insert(path),
            ));
        }
        Ok(path)
    }

    /// Returns the getter for `path` on values shaped like `target`,
    /// compiling it on first use
    pub fn getter(&self, path: &PropertyPath, target: &Value) -> ResolutionResult<Arc<Getter>> {
        let key = (
            target.as_object().map(|o| o.object_type_id()),
            path.as_str().to_string(),
        );
        if let Ok(getters) = self.getters.read() {
            if let Some(getter) = getters.get(&key) {
                return Ok(Arc::clone(getter));
            }
        }

        let getter = Arc::new(Getter::compile(path.clone(), target, &self.bindings)?);
        self.compilations.fetch_add(1, Ordering::Relaxed);
        let type_name = target.type_name();
        log_event_with_fields(
            Event::GetterCompiled,
            &[("path", path.as_str()), ("type", type_name.as_str())],
        );

        if let Ok(mut getters) = self.getters.write() {
            return Ok(Arc::clone(getters.entry(key).or_insert(getter)));
        }
        Ok(getter)
    }

    /// Resolves `path` against `target`
    pub fn resolve(&self, target: &Value, path: &PropertyPath) -> ResolutionResult<Value> {
        let getter = self.getter(path, target)?;
        getter.get(target, &self.bindings)
    }

    /// Parses and resolves `path` against `target`
    pub fn resolve_str(&self, target: &Value, path: &str) -> ResolutionResult<Value> {
        let path = self.path(path)?;
        self.resolve(target, &path)
    }

    /// Returns the setter for `path`, compiling it on first use
    pub fn setter(&self, path: &PropertyPath) -> ResolutionResult<Arc<Setter>> {
        if let Ok(setters) = self.setters.read() {
            if let Some(setter) = setters.get(path.as_str()) {
                return Ok(Arc::clone(setter));
            }
        }
        let setter = Arc::new(Setter::compile(path)?);
        if let Ok(mut setters) = self.setters.write() {
            return Ok(Arc::clone(
                setters.entry(path.as_str().to_string()).or_insert(setter),
            ));
        }
        Ok(setter)
    }

    /// Assigns `value` to `path` on `target`
    pub fn set(&self, target: &Value, path: &PropertyPath, value: Value) -> ResolutionResult<()> {
        let setter = self.setter(path)?;
        setter.set(self, target, value)
    }

    /// Number of getters compiled so far
    pub fn compilations(&self) -> u64 {
        self.compilations.load(Ordering::Relaxed)
    }

    /// Number of cached getters
    pub fn cached_getters(&self) -> usize {
        self.getters.read().map(|g| g.len()).unwrap_or(0)
    }

    /// Number of (type, member) pairs with bound setter overloads
    pub fn bound_setters(&self) -> usize {
        self.bindings.setters.read().map(|s| s.len()).unwrap_or(0)
    }

    pub(crate) fn setter_candidates(&self, object: &ObjectRef, member: &str) -> Arc<[SetterMember]> {
        self.bindings.bind_setters(object, member)
    }
}
