//! Three-state optional field for partial updates.
//!
//! A JSON payload can omit a field, send it as `null`, or send a value, and
//! for fields like `parentId` those are different requests: omission leaves
//! the stored value alone, `null` clears it. `Option<Option<T>>` can express
//! this but reads poorly at call sites, so [`Patch`] names the cases.
//!
//! Use it on a struct field together with `#[serde(default)]` so that a
//! missing key deserializes to [`Patch::Absent`]:
//!
//! ```
//! use serde::Deserialize;
//! use stackboard_core::model::patch::Patch;
//!
//! #[derive(Deserialize)]
//! struct Body {
//!     #[serde(default)]
//!     parent: Patch<String>,
//! }
//!
//! let omitted: Body = serde_json::from_str("{}").unwrap();
//! let cleared: Body = serde_json::from_str(r#"{"parent": null}"#).unwrap();
//! assert_eq!(omitted.parent, Patch::Absent);
//! assert_eq!(cleared.parent, Patch::Null);
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A field that is absent, explicitly null, or carries a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    /// Field not supplied: leave the stored value unchanged.
    Absent,
    /// Field supplied as `null`: clear the stored value.
    Null,
    /// Field supplied with a value: overwrite the stored value.
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> Patch<T> {
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The carried value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Absent | Self::Null => None,
        }
    }

    /// Convert to the write-side shape: `None` means "do not touch",
    /// `Some(None)` means "clear", `Some(Some(v))` means "set".
    #[must_use]
    pub fn into_update(self) -> Option<Option<T>> {
        match self {
            Self::Absent => None,
            Self::Null => Some(None),
            Self::Value(v) => Some(Some(v)),
        }
    }

    /// Borrowing variant of [`Patch::into_update`].
    #[must_use]
    pub const fn as_update(&self) -> Option<Option<&T>> {
        match self {
            Self::Absent => None,
            Self::Null => Some(None),
            Self::Value(v) => Some(Some(v)),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    /// An explicit option is always "supplied": `None` becomes [`Patch::Null`].
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Value)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Self::from)
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => serializer.serialize_some(v),
            Self::Absent | Self::Null => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Patch;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Body {
        #[serde(default, skip_serializing_if = "Patch::is_absent")]
        parent: Patch<String>,
    }

    #[test]
    fn deserializes_three_states() {
        let absent: Body = serde_json::from_str("{}").unwrap();
        let null: Body = serde_json::from_str(r#"{"parent":null}"#).unwrap();
        let value: Body = serde_json::from_str(r#"{"parent":"sb-1"}"#).unwrap();

        assert_eq!(absent.parent, Patch::Absent);
        assert_eq!(null.parent, Patch::Null);
        assert_eq!(value.parent, Patch::Value("sb-1".to_string()));
    }

    #[test]
    fn serializes_without_collapsing_null_and_absent() {
        let absent = Body { parent: Patch::Absent };
        let null = Body { parent: Patch::Null };
        assert_eq!(serde_json::to_string(&absent).unwrap(), "{}");
        assert_eq!(serde_json::to_string(&null).unwrap(), r#"{"parent":null}"#);
    }

    #[test]
    fn update_shape() {
        assert_eq!(Patch::<u8>::Absent.into_update(), None);
        assert_eq!(Patch::<u8>::Null.into_update(), Some(None));
        assert_eq!(Patch::Value(3).into_update(), Some(Some(3)));
        assert_eq!(Patch::Value(3).as_update(), Some(Some(&3)));
    }

    #[test]
    fn value_only_for_supplied_values() {
        assert_eq!(Patch::Value("sb-1").value(), Some(&"sb-1"));
        assert_eq!(Patch::<&str>::Null.value(), None);
        assert_eq!(Patch::<&str>::Absent.value(), None);
    }
}
