//! Shared value types

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A field that can be left alone, explicitly cleared, or set.
///
/// In YAML: an absent key is `Unset`, `key: null` is `Clear`, and any other
/// value is `Set`. Fields of this type must carry
/// `#[serde(default, skip_serializing_if = "TriState::is_unset")]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriState<T> {
    #[default]
    Unset,
    Clear,
    Set(T),
}

impl<T> TriState<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, TriState::Unset)
    }
}

impl<T> From<Option<T>> for TriState<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => TriState::Set(v),
            None => TriState::Clear,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for TriState<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Only reached when the key is present; absence goes through `Default`.
        Option::<T>::deserialize(deserializer).map(TriState::from)
    }
}

impl<T: Serialize> Serialize for TriState<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TriState::Set(value) => serializer.serialize_some(value),
            TriState::Unset | TriState::Clear => serializer.serialize_none(),
        }
    }
}
