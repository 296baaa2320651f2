use std::sync::Arc;

use serde::Deserialize;

fn deserialize_arc_str<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(String::deserialize(deserializer)?.into())
}

fn serialize_arc_str<S>(v: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(v)
}

#[derive(serde::Deserialize, serde::Serialize, Clone, Default, Eq, PartialEq, Hash)]
pub struct AtomicFixedString(
    #[serde(
        serialize_with = "serialize_arc_str",
        deserialize_with = "deserialize_arc_str"
    )]
    Arc<str>,
);
impl AtomicFixedString {
    /// True when the string is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}
impl From<&str> for AtomicFixedString {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}
impl From<String> for AtomicFixedString {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}
impl From<AtomicFixedString> for Arc<str> {
    fn from(value: AtomicFixedString) -> Self {
        value.0
    }
}
impl AsRef<str> for AtomicFixedString {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}
impl std::ops::Deref for AtomicFixedString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
impl std::fmt::Display for AtomicFixedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}
impl std::fmt::Debug for AtomicFixedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.0, f)
    }
}

/// A credential that must not show up in logs.
///
/// Serializes to its real value so config files round-trip, but `Debug` and
/// `Display` only ever print [`Secret::REDACTED`].
#[derive(serde::Deserialize, serde::Serialize, Clone, Default, Eq, PartialEq)]
#[serde(transparent)]
pub struct Secret(AtomicFixedString);
impl Secret {
    pub const REDACTED: &'static str = "***";

    pub fn expose(&self) -> &str {
        self.0.as_ref()
    }
}
impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}
impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}
impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(Self::REDACTED)
    }
}
impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(Self::REDACTED, f)
    }
}
