//! Serde adapter for link objects
//!
//! Stored documents refer to other documents as `{"id": ...}`. Use with
//! `#[serde(with = "otu_model::serde_link")]` on an id-typed field.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Serialize)]
struct LinkRef<'a, T> {
    id: &'a T,
}

#[derive(Deserialize)]
struct LinkOwned<T> {
    id: T,
}

/// Serialize `id` as `{"id": id}`
///
/// # Errors
/// Propagates serializer errors
pub fn serialize<T, S>(id: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    LinkRef { id }.serialize(serializer)
}

/// Deserialize `{"id": id}` into `id`
///
/// # Errors
/// Fails if the input is not a link object
pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    LinkOwned::<T>::deserialize(deserializer).map(|link| link.id)
}
