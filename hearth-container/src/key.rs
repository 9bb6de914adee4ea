//! Service identification keys.
//!
//! [`ServiceKey`] is the identity of a registration: the Rust type the
//! factory produces plus an optional string discriminator for named
//! registrations.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use hearth_support::rendering::{shorten_type_name, suggest_similar};

/// Uniquely identifies a registration inside a container chain.
///
/// Two keys are equal iff their types and names are equal. Keys are
/// cheap to clone and never change after construction.
///
/// # Examples
/// ```
/// use hearth_container::key::ServiceKey;
///
/// let plain = ServiceKey::of::<String>();
/// assert_eq!(plain.name(), None);
///
/// let primary = ServiceKey::named::<String>("primary");
/// let replica = ServiceKey::named::<String>("replica");
/// assert_ne!(primary, replica);
/// assert_ne!(primary, plain);
/// ```
#[derive(Clone)]
pub struct ServiceKey {
    type_id: TypeId,
    type_name: &'static str,
    name: Option<Arc<str>>,
}

impl ServiceKey {
    /// Creates the unnamed key for type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            name: None,
        }
    }

    /// Creates a named key for type `T`.
    ///
    /// Named keys let several registrations of one type live side by side.
    #[inline]
    pub fn named<T: ?Sized + 'static>(name: impl Into<Arc<str>>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            name: Some(name.into()),
        }
    }

    /// Creates the key for `T` with an optional name.
    #[inline]
    pub fn with_name<T: ?Sized + 'static>(name: Option<&str>) -> Self {
        match name {
            Some(name) => Self::named::<T>(name),
            None => Self::of::<T>(),
        }
    }

    /// Creates a key from a raw [`TypeId`] and type name.
    ///
    /// Prefer [`ServiceKey::of`]; this exists for generated code and
    /// type-erased registration paths.
    #[inline]
    pub fn from_raw(type_id: TypeId, type_name: &'static str, name: Option<Arc<str>>) -> Self {
        Self { type_id, type_name, name }
    }

    /// Returns this key with `name` attached, replacing any previous name.
    #[must_use]
    pub fn renamed(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the [`TypeId`] of the service type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the fully qualified type name.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the type name without module paths.
    pub fn short_type_name(&self) -> String {
        shorten_type_name(self.type_name)
    }

    /// Returns the discriminator of a named registration.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns `true` if this key carries a name.
    #[inline]
    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }

    /// Returns `true` if this key identifies type `T`, whatever its name.
    #[inline]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

/// Picks registered keys resembling `requested`, for "did you mean" hints.
///
/// Same-type keys with a different name always qualify.
pub(crate) fn similar_keys<'a>(
    requested: &ServiceKey,
    candidates: impl IntoIterator<Item = &'a ServiceKey>,
) -> Vec<ServiceKey> {
    const LIMIT: usize = 3;

    let candidates: Vec<&ServiceKey> = candidates.into_iter().filter(|k| *k != requested).collect();
    let mut picked: Vec<ServiceKey> = candidates
        .iter()
        .filter(|k| k.type_id == requested.type_id)
        .map(|k| (*k).clone())
        .collect();

    let names: Vec<&str> = candidates.iter().map(|k| k.type_name).collect();
    for name in suggest_similar(requested.type_name, &names, LIMIT) {
        if let Some(key) = candidates.iter().find(|k| k.type_name == name) {
            if !picked.contains(*key) {
                picked.push((*key).clone());
            }
        }
    }

    picked.truncate(LIMIT);
    picked
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.name == other.name
    }
}

impl Eq for ServiceKey {}

// type_name is diagnostic only; identity is (TypeId, name).
impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "ServiceKey({}, name={:?})", self.type_name, name),
            None => write!(f, "ServiceKey({})", self.type_name),
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} (name={:?})", self.type_name, name),
            None => write!(f, "{}", self.type_name),
        }
    }
}
