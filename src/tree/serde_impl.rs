//! Serde support.
//!
//! Every tree serializes as a map in key order. Only natural-order trees
//! on the system allocator deserialize: a comparator closure cannot be
//! reconstructed from data. A repeated key in the input is an error.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{Error as _, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::allocator::SystemAllocator;
use super::comparator::NaturalOrder;
use super::engine::RbTree;

impl<K: Serialize, V: Serialize, C, A> Serialize for RbTree<K, V, C, A> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct RbTreeVisitor<K, V> {
    marker: PhantomData<(K, V)>,
}

impl<'de, K, V> Visitor<'de> for RbTreeVisitor<K, V>
where
    K: Deserialize<'de> + Ord + fmt::Debug,
    V: Deserialize<'de>,
{
    type Value = RbTree<K, V, NaturalOrder, SystemAllocator>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a map with unique keys")
    }

    fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut tree = RbTree::new();
        while let Some((key, value)) = access.next_entry()? {
            if let Err(error) = tree.insert(key, value) {
                return Err(M::Error::custom(format_args!(
                    "{error} for key {:?}",
                    error.key()
                )));
            }
        }
        Ok(tree)
    }
}

impl<'de, K, V> Deserialize<'de> for RbTree<K, V, NaturalOrder, SystemAllocator>
where
    K: Deserialize<'de> + Ord + fmt::Debug,
    V: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(RbTreeVisitor {
            marker: PhantomData,
        })
    }
}
