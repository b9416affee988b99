//! Field-presence wrapper for partial updates.
//!
//! JSON update bodies need three states per field: omitted, explicitly `null`
//! and a concrete value. `Option<T>` collapses the first two, so request DTOs
//! use `Patch<T>` together with `#[serde(default)]`:
//!
//! ```
//! use fitsync::core::Patch;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Body {
//!     #[serde(default)]
//!     memo: Patch<String>,
//! }
//!
//! let omitted: Body = serde_json::from_str("{}").unwrap();
//! let cleared: Body = serde_json::from_str(r#"{"memo":null}"#).unwrap();
//! let set: Body = serde_json::from_str(r#"{"memo":"deload"}"#).unwrap();
//!
//! assert!(omitted.memo.is_missing());
//! assert!(cleared.memo.is_null());
//! assert_eq!(set.memo.as_value(), Some(&"deload".to_string()));
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    /// Field was not part of the request; leave the target unchanged.
    Missing,
    /// Field was sent as an explicit `null`.
    Null,
    /// Field carries a value.
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self::Missing
    }
}

impl<T> Patch<T> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Applies the patch to an optional target: `Null` clears it.
    pub fn apply_to(&self, target: &mut Option<T>)
    where
        T: Clone,
    {
        match self {
            Self::Missing => {}
            Self::Null => *target = None,
            Self::Value(value) => *target = Some(value.clone()),
        }
    }

    /// Applies the patch to a required target: `Null` is treated like `Missing`.
    pub fn apply_required(&self, target: &mut T)
    where
        T: Clone,
    {
        if let Self::Value(value) = self {
            *target = value.clone();
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Value(value),
            None => Self::Null,
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}

impl<T> Serialize for Patch<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Value(value) => serializer.serialize_some(value),
            Self::Missing | Self::Null => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct SetBody {
        #[serde(default)]
        reps: Patch<i32>,
    }

    #[test]
    fn absent_field_is_missing() {
        let body: SetBody = serde_json::from_str("{}").unwrap();
        assert!(body.reps.is_missing());
    }

    #[test]
    fn explicit_null_is_distinguished() {
        let body: SetBody = serde_json::from_str(r#"{"reps":null}"#).unwrap();
        assert!(body.reps.is_null());
    }

    #[test]
    fn apply_to_optional_target() {
        let mut target = Some(8);
        Patch::<i32>::Missing.apply_to(&mut target);
        assert_eq!(target, Some(8));
        Patch::Value(10).apply_to(&mut target);
        assert_eq!(target, Some(10));
        Patch::<i32>::Null.apply_to(&mut target);
        assert_eq!(target, None);
    }

    #[test]
    fn null_does_not_clear_required_target() {
        let mut name = "Squat".to_string();
        Patch::<String>::Null.apply_required(&mut name);
        assert_eq!(name, "Squat");
        Patch::Value("Front Squat".to_string()).apply_required(&mut name);
        assert_eq!(name, "Front Squat");
    }
}
