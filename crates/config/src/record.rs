//! Field descriptors for bindable configuration records.
//!
//! Responsibilities:
//! - Define the `Record` trait a configuration type implements so its fields can be walked.
//! - Define the `Field` trait describing how a single field is zero-checked, assigned and descended into.
//! - Provide `Field` implementations for scalars, strings, paths, maps, `Option`, `Box` and `Vec`.
//! - Provide the `impl_record!` macro that registers a struct's fields.
//!
//! Does NOT handle:
//! - Deciding which environment variables to read (see `binder.rs`).
//! - Decoding whole files into a record (see `format.rs`).
//!
//! Invariants:
//! - `Option` and `Box` are transparent: `kind()` reports the kind of the wrapped value when present.
//! - A sequence grows only by elements that differ from a freshly defaulted element.
//! - Literal values use YAML flow syntax (`8080`, `[1, 2]`, `{a: 1}`).

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::loader::ConfigError;

/// A literal value could not be converted into the field's type.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct LiteralError(String);

impl From<serde_yaml::Error> for LiteralError {
    fn from(error: serde_yaml::Error) -> Self {
        Self(error.to_string())
    }
}

/// Parse a YAML literal into `T`.
pub fn parse_literal<T: DeserializeOwned>(raw: &str) -> Result<T, LiteralError> {
    Ok(serde_yaml::from_str(raw)?)
}

/// Interpret an environment value as a boolean.
///
/// `""`, `"0"`, `"f"` and `"false"` (any case) are false; everything else is true.
pub fn parse_env_bool(raw: &str) -> bool {
    !matches!(raw.to_ascii_lowercase().as_str(), "" | "0" | "f" | "false")
}

/// Name and annotations of one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMeta {
    /// Path segment contributed by the field.
    pub name: &'static str,
    /// Explicit environment variable name; replaces the path-derived names.
    pub env: Option<&'static str>,
    /// YAML literal applied when the field is still zero after env binding.
    pub default: Option<&'static str>,
    /// Whether a zero value after binding is an error.
    pub required: bool,
    /// Whether the field is flattened into its parent's path.
    pub anonymous: bool,
}

impl FieldMeta {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            env: None,
            default: None,
            required: false,
            anonymous: false,
        }
    }

    pub const fn env(mut self, name: &'static str) -> Self {
        self.env = Some(name);
        self
    }

    pub const fn default(mut self, literal: &'static str) -> Self {
        self.default = Some(literal);
        self
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    /// The `env` annotation, ignoring empty names.
    pub fn explicit_env(&self) -> Option<&'static str> {
        self.env.filter(|name| !name.is_empty())
    }

    pub fn has_explicit_env(&self) -> bool {
        self.explicit_env().is_some()
    }

    /// The `default` annotation, ignoring empty literals.
    pub fn default_literal(&self) -> Option<&'static str> {
        self.default.filter(|literal| !literal.is_empty())
    }
}

/// What the binder finds after unwrapping optional layers.
pub enum FieldKind<'a> {
    Scalar,
    Record(&'a mut dyn Record),
    Sequence(&'a mut dyn RecordSequence),
}

/// A single bindable field.
pub trait Field: Send {
    /// True when the field holds its type's zero/empty value.
    fn is_zero(&self) -> bool;

    /// Assign from a YAML literal (a `default` annotation).
    fn assign_literal(&mut self, raw: &str) -> Result<(), LiteralError>;

    /// Assign from an environment variable value.
    fn assign_env(&mut self, raw: &str) -> Result<(), LiteralError> {
        self.assign_literal(raw)
    }

    fn kind(&mut self) -> FieldKind<'_> {
        FieldKind::Scalar
    }
}

/// A configuration record whose fields can be walked by a `FieldVisitor`.
///
/// Implement it with [`impl_record!`](crate::impl_record).
pub trait Record: Send {
    /// Type name used in diagnostics.
    fn record_name(&self) -> &'static str;

    /// Hand every field, with its metadata, to `visitor` in declaration order.
    fn visit_fields(&mut self, visitor: &mut dyn FieldVisitor) -> Result<(), ConfigError>;
}

/// Receives the fields of a record one at a time.
pub trait FieldVisitor {
    fn visit_field(&mut self, meta: &FieldMeta, field: &mut dyn Field) -> Result<(), ConfigError>;
}

/// Type-erased access to a `Vec` field for element binding and growth.
pub trait RecordSequence {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the element type is a record.
    fn holds_records(&self) -> bool;

    /// Kind of the element at `index`; `Scalar` when out of bounds.
    fn element(&mut self, index: usize) -> FieldKind<'_>;

    /// Build a fresh element and let `fill` bind it. The element is appended
    /// when `fill` returns `true` and the element is no longer equal to a
    /// fresh one. Returns whether an element was appended.
    fn grow(
        &mut self,
        fill: &mut dyn FnMut(&mut dyn Record) -> Result<bool, ConfigError>,
    ) -> Result<bool, ConfigError>;
}

macro_rules! scalar_field {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Field for $ty {
                fn is_zero(&self) -> bool {
                    *self == <$ty>::default()
                }

                fn assign_literal(&mut self, raw: &str) -> Result<(), LiteralError> {
                    *self = parse_literal(raw)?;
                    Ok(())
                }
            }
        )*
    };
}

scalar_field!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char
);

impl Field for bool {
    fn is_zero(&self) -> bool {
        !*self
    }

    fn assign_literal(&mut self, raw: &str) -> Result<(), LiteralError> {
        *self = parse_literal(raw)?;
        Ok(())
    }

    fn assign_env(&mut self, raw: &str) -> Result<(), LiteralError> {
        *self = parse_env_bool(raw);
        Ok(())
    }
}

impl Field for String {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    // Plain scalars like `8080` are kept as written when YAML does not read them as a string.
    fn assign_literal(&mut self, raw: &str) -> Result<(), LiteralError> {
        *self = parse_literal(raw).unwrap_or_else(|_| raw.to_string());
        Ok(())
    }

    fn assign_env(&mut self, raw: &str) -> Result<(), LiteralError> {
        *self = raw.to_string();
        Ok(())
    }
}

impl Field for PathBuf {
    fn is_zero(&self) -> bool {
        self.as_os_str().is_empty()
    }

    fn assign_literal(&mut self, raw: &str) -> Result<(), LiteralError> {
        *self = parse_literal(raw).unwrap_or_else(|_| PathBuf::from(raw));
        Ok(())
    }

    fn assign_env(&mut self, raw: &str) -> Result<(), LiteralError> {
        *self = PathBuf::from(raw);
        Ok(())
    }
}

impl<V> Field for HashMap<String, V>
where
    V: DeserializeOwned + Send,
{
    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn assign_literal(&mut self, raw: &str) -> Result<(), LiteralError> {
        *self = parse_literal(raw)?;
        Ok(())
    }
}

impl<V> Field for BTreeMap<String, V>
where
    V: DeserializeOwned + Send,
{
    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn assign_literal(&mut self, raw: &str) -> Result<(), LiteralError> {
        *self = parse_literal(raw)?;
        Ok(())
    }
}

impl<T> Field for Option<T>
where
    T: Field + Default,
{
    fn is_zero(&self) -> bool {
        self.is_none()
    }

    fn assign_literal(&mut self, raw: &str) -> Result<(), LiteralError> {
        let mut inner = T::default();
        inner.assign_literal(raw)?;
        *self = Some(inner);
        Ok(())
    }

    fn assign_env(&mut self, raw: &str) -> Result<(), LiteralError> {
        let mut inner = T::default();
        inner.assign_env(raw)?;
        *self = Some(inner);
        Ok(())
    }

    fn kind(&mut self) -> FieldKind<'_> {
        match self {
            Some(inner) => inner.kind(),
            None => FieldKind::Scalar,
        }
    }
}

impl<T> Field for Box<T>
where
    T: Field,
{
    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }

    fn assign_literal(&mut self, raw: &str) -> Result<(), LiteralError> {
        (**self).assign_literal(raw)
    }

    fn assign_env(&mut self, raw: &str) -> Result<(), LiteralError> {
        (**self).assign_env(raw)
    }

    fn kind(&mut self) -> FieldKind<'_> {
        (**self).kind()
    }
}

impl<T> Field for Vec<T>
where
    T: Field + Default + PartialEq + DeserializeOwned,
{
    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn assign_literal(&mut self, raw: &str) -> Result<(), LiteralError> {
        *self = parse_literal(raw)?;
        Ok(())
    }

    fn kind(&mut self) -> FieldKind<'_> {
        FieldKind::Sequence(self)
    }
}

impl<T> RecordSequence for Vec<T>
where
    T: Field + Default + PartialEq,
{
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn holds_records(&self) -> bool {
        let mut probe = T::default();
        matches!(probe.kind(), FieldKind::Record(_))
    }

    fn element(&mut self, index: usize) -> FieldKind<'_> {
        match self.get_mut(index) {
            Some(element) => element.kind(),
            None => FieldKind::Scalar,
        }
    }

    fn grow(
        &mut self,
        fill: &mut dyn FnMut(&mut dyn Record) -> Result<bool, ConfigError>,
    ) -> Result<bool, ConfigError> {
        let mut candidate = T::default();
        let keep = match candidate.kind() {
            FieldKind::Record(record) => fill(record)?,
            _ => return Ok(false),
        };
        if !keep || candidate == T::default() {
            return Ok(false);
        }
        self.push(candidate);
        Ok(true)
    }
}

/// Implement [`Record`] and [`Field`] for a struct by listing its fields.
///
/// The struct must implement `Default`, `PartialEq` and `Deserialize`.
///
/// ```rust,ignore
/// impl_record!(Database {
///     name: FieldMeta::new("Name").default("app"),
///     password: FieldMeta::new("Password").required(),
/// });
/// ```
#[macro_export]
macro_rules! impl_record {
    ($ty:ty { $($field:ident : $meta:expr),* $(,)? }) => {
        impl $crate::Record for $ty {
            fn record_name(&self) -> &'static str {
                stringify!($ty)
            }

            fn visit_fields(
                &mut self,
                visitor: &mut dyn $crate::FieldVisitor,
            ) -> ::std::result::Result<(), $crate::ConfigError> {
                $( visitor.visit_field(&$meta, &mut self.$field)?; )*
                Ok(())
            }
        }

        impl $crate::Field for $ty {
            fn is_zero(&self) -> bool {
                *self == <$ty as ::std::default::Default>::default()
            }

            fn assign_literal(&mut self, raw: &str) -> ::std::result::Result<(), $crate::LiteralError> {
                *self = $crate::parse_literal(raw)?;
                Ok(())
            }

            fn kind(&mut self) -> $crate::FieldKind<'_> {
                $crate::FieldKind::Record(self)
            }
        }
    };
}
