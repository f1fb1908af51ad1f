//! Insert/remove observers and destroy-time disposal.

/// An entry together with its in-order neighbors.
///
/// Passed to observers right after an insert and right before a remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighborhood<'a, K, V> {
    /// The inserted or removed key.
    pub key: &'a K,
    /// The inserted or removed value.
    pub value: &'a V,
    /// The entry immediately before, if any.
    pub predecessor: Option<(&'a K, &'a V)>,
    /// The entry immediately after, if any.
    pub successor: Option<(&'a K, &'a V)>,
}

/// A callback notified of structural changes.
pub type Observer<K, V> = Box<dyn FnMut(Neighborhood<'_, K, V>) + Send>;

/// What `destroy` does with each entry.
///
/// The integer-keyed tree usually releases values only
/// ([`Disposal::Values`]), the comparator-keyed tree keys and values
/// ([`Disposal::Entries`]). Entries are visited in ascending key order.
pub enum Disposal<'a, K, V> {
    /// Drop every key and value.
    Drop,
    /// Hand every value to the callback, dropping the keys.
    Values(&'a mut dyn FnMut(V)),
    /// Hand every key and value to the callback.
    Entries(&'a mut dyn FnMut(K, V)),
}

impl<K, V> Disposal<'_, K, V> {
    pub(crate) fn dispose(&mut self, key: K, value: V) {
        match self {
            Self::Drop => {}
            Self::Values(release) => release(value),
            Self::Entries(release) => release(key, value),
        }
    }
}
