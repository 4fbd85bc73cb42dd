// ABOUTME: Phantom-typed cloud identifiers for compile-time type safety.
// ABOUTME: Prevents passing a disk CID where a VM or stemcell CID is expected.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Resource kind markers. Empty enums: never instantiated, only used as type parameters.
pub enum Vm {}
pub enum Disk {}
pub enum Stemcell {}

/// A cloud-assigned identifier for a resource of kind `K`.
#[must_use = "CIDs reference cloud resources and should not be ignored"]
pub struct Cid<K> {
    value: String,
    _kind: PhantomData<K>,
}

impl<K> Cid<K> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _kind: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_inner(self) -> String {
        self.value
    }
}

// Manual impls: K is a marker and carries none of these traits.

impl<K> std::fmt::Debug for Cid<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Cid").field(&self.value).finish()
    }
}

impl<K> Clone for Cid<K> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<K> PartialEq for Cid<K> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<K> Eq for Cid<K> {}

impl<K> Hash for Cid<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<K> std::fmt::Display for Cid<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

impl<K> Serialize for Cid<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, K> Deserialize<'de> for Cid<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::new(value))
    }
}

pub type VmCid = Cid<Vm>;
pub type DiskCid = Cid<Disk>;
pub type StemcellCid = Cid<Stemcell>;
