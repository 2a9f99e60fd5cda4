//! Trigger arguments and argument schemas.
//!
//! Hooks are triggered with [`Args`]: a set of named, type-erased values.
//! Handlers read them back with [`Args::get`], which downcasts to the
//! requested type.
//!
//! A hook may declare an [`ArgSchema`]. In strict scopes every trigger is
//! validated against it: unknown names, missing names and values of the
//! wrong type are rejected before any handler runs.
//!
//! # Example
//!
//! ```
//! use herald_hooks::args::{ArgSchema, ArgType, Args};
//!
//! let schema = ArgSchema::new()
//!     .arg("session")
//!     .typed::<u32>("attempt")
//!     .one_of("label", [ArgType::of::<String>(), ArgType::of::<&'static str>()]);
//!
//! let args = Args::new()
//!     .with("session", 7_u64)
//!     .with("attempt", 1_u32)
//!     .with("label", "retry");
//!
//! assert!(schema.validate(&args).is_ok());
//! assert_eq!(args.get::<u32>("attempt"), Some(&1));
//! ```

use core::any::TypeId;
use core::fmt;
use std::sync::Arc;

use downcast_rs::{DowncastSync, impl_downcast};
use hashbrown::HashMap;

// ─────────────────────────────────────────────────────────────────────────────
// ArgValue
// ─────────────────────────────────────────────────────────────────────────────

/// A value that can be passed as a trigger argument.
///
/// Any `Send + Sync + Debug + 'static` type implements `ArgValue`.
pub trait ArgValue: DowncastSync + fmt::Debug {
    /// Returns the type name for diagnostics.
    fn type_name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

impl<T: Send + Sync + fmt::Debug + 'static> ArgValue for T {}

impl_downcast!(sync ArgValue);

// ─────────────────────────────────────────────────────────────────────────────
// Args
// ─────────────────────────────────────────────────────────────────────────────

/// Named arguments passed to every handler of a trigger.
///
/// Values are reference counted so the same `Args` can be handed to many
/// handlers (and to the internal failure hook) without cloning the values.
#[derive(Clone, Default)]
pub struct Args {
    values: HashMap<String, Arc<dyn ArgValue>>,
}

impl Args {
    /// Creates an empty argument set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an argument and returns `self` for chaining.
    #[must_use]
    pub fn with<T: ArgValue>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts or replaces an argument.
    pub fn insert<T: ArgValue>(&mut self, name: impl Into<String>, value: T) {
        self.values.insert(name.into(), Arc::new(value));
    }

    /// Returns the argument `name` if it exists and has type `T`.
    #[must_use]
    pub fn get<T: ArgValue>(&self, name: &str) -> Option<&T> {
        self.values.get(name)?.downcast_ref::<T>()
    }

    /// Returns the type-erased argument `name`.
    #[must_use]
    pub fn get_raw(&self, name: &str) -> Option<&Arc<dyn ArgValue>> {
        self.values.get(name)
    }

    /// Returns `true` if an argument called `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterates over argument names in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Returns the number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.values.keys().collect();
        names.sort();
        let mut map = f.debug_map();
        for name in names {
            map.entry(name, &self.values[name]);
        }
        map.finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ArgType
// ─────────────────────────────────────────────────────────────────────────────

/// Identifier for an accepted argument type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgType {
    type_id: TypeId,
    type_name: &'static str,
}

impl ArgType {
    /// Creates an `ArgType` for `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name for debugging.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn matches(&self, value: &dyn ArgValue) -> bool {
        value.as_any().type_id() == self.type_id
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ArgSchema
// ─────────────────────────────────────────────────────────────────────────────

/// Errors produced when trigger arguments do not match a hook's schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    /// Arguments that the schema does not declare.
    #[error("unknown arguments specified: {}", .0.join(", "))]
    Unknown(Vec<String>),

    /// A declared argument was not supplied.
    #[error("missing argument '{0}'")]
    Missing(String),

    /// An argument had a type outside the accepted list.
    #[error("incorrect type for argument '{name}': expected {}, got {found}", .expected.join(" | "))]
    IncorrectType {
        /// The argument name.
        name: String,
        /// Names of the accepted types.
        expected: Vec<&'static str>,
        /// Name of the supplied type.
        found: &'static str,
    },
}

/// Declared argument names of a hook, each with optional accepted types.
#[derive(Debug, Clone, Default)]
pub struct ArgSchema {
    entries: Vec<(String, Option<Vec<ArgType>>)>,
}

impl ArgSchema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an argument of any type.
    #[must_use]
    pub fn arg(mut self, name: impl Into<String>) -> Self {
        self.entries.push((name.into(), None));
        self
    }

    /// Declares an argument that must have type `T`.
    #[must_use]
    pub fn typed<T: 'static>(mut self, name: impl Into<String>) -> Self {
        self.entries.push((name.into(), Some(vec![ArgType::of::<T>()])));
        self
    }

    /// Declares an argument that may have any of `types`.
    #[must_use]
    pub fn one_of(
        mut self,
        name: impl Into<String>,
        types: impl IntoIterator<Item = ArgType>,
    ) -> Self {
        self.entries
            .push((name.into(), Some(types.into_iter().collect())));
        self
    }

    /// Returns the declared argument names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Checks `args` against the schema.
    ///
    /// Unknown names are reported first, then the first missing or mistyped
    /// argument in declaration order.
    pub fn validate(&self, args: &Args) -> Result<(), ArgumentError> {
        let mut unknown: Vec<String> = args
            .names()
            .filter(|name| !self.entries.iter().any(|(declared, _)| declared == name))
            .map(str::to_owned)
            .collect();
        if !unknown.is_empty() {
            unknown.sort();
            return Err(ArgumentError::Unknown(unknown));
        }

        for (name, types) in &self.entries {
            let Some(value) = args.get_raw(name) else {
                return Err(ArgumentError::Missing(name.clone()));
            };
            let value: &dyn ArgValue = value.as_ref();
            if let Some(types) = types
                && !types.iter().any(|ty| ty.matches(value))
            {
                return Err(ArgumentError::IncorrectType {
                    name: name.clone(),
                    expected: types.iter().map(ArgType::type_name).collect(),
                    found: value.type_name(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ArgSchema {
        ArgSchema::new()
            .arg("x")
            .typed::<i64>("y")
            .one_of("z", [ArgType::of::<String>(), ArgType::of::<f64>()])
    }

    #[test]
    fn get_downcasts_to_stored_type() {
        let args = Args::new().with("count", 3_usize).with("name", "a".to_string());
        assert_eq!(args.get::<usize>("count"), Some(&3));
        assert_eq!(args.get::<String>("name").map(String::as_str), Some("a"));
        assert_eq!(args.get::<u32>("count"), None);
        assert_eq!(args.get::<usize>("missing"), None);
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn missing_arguments_are_reported() {
        let err = schema().validate(&Args::new().with("x", 1_i64)).unwrap_err();
        assert_eq!(err, ArgumentError::Missing("y".into()));
    }

    #[test]
    fn unknown_arguments_are_reported() {
        let args = Args::new()
            .with("x", 1_i64)
            .with("y", 2_i64)
            .with("z", 1.0_f64)
            .with("w", 0_u8);
        assert_eq!(
            schema().validate(&args).unwrap_err(),
            ArgumentError::Unknown(vec!["w".into()])
        );
    }

    #[test]
    fn wrong_types_are_reported() {
        let args = Args::new()
            .with("x", ())
            .with("y", "str")
            .with("z", 1.0_f64);
        let err = schema().validate(&args).unwrap_err();
        assert!(matches!(err, ArgumentError::IncorrectType { ref name, .. } if name == "y"));
        assert!(err.to_string().contains("incorrect type"));
    }

    #[test]
    fn correct_arguments_pass() {
        let args = Args::new()
            .with("x", vec![1_u8])
            .with("y", 2_i64)
            .with("z", "s".to_string());
        assert!(schema().validate(&args).is_ok());
    }
}
