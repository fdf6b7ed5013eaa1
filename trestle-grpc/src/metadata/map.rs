use faststr::FastStr;

/// An ordered multi-map of call metadata.
///
/// Keys are ASCII-lowercased when entries are added and duplicates are kept,
/// so a header that occurred three times projects to three entries whose
/// relative order survives. Lookups are case-insensitive.
///
/// Entries are [`FastStr`] pairs, which makes cloning a populated map cheap.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataMap {
    entries: Vec<(FastStr, FastStr)>,
}

impl MetadataMap {
    /// Creates an empty map.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map with room for `capacity` entries.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Builds a map from `(key, value)` pairs, keeping their order.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<FastStr>,
        V: Into<FastStr>,
    {
        let iter = pairs.into_iter();
        let mut map = Self::with_capacity(iter.size_hint().0);
        for (key, value) in iter {
            map.append(key, value);
        }
        map
    }

    /// Appends an entry, preserving any existing values for the key.
    pub fn append(&mut self, key: impl Into<FastStr>, value: impl Into<FastStr>) {
        self.entries.push((normalize(key.into()), value.into()));
    }

    /// Replaces all values for the key with a single entry.
    pub fn insert(&mut self, key: impl Into<FastStr>, value: impl Into<FastStr>) {
        let key = normalize(key.into());
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push((key, value.into()));
    }

    /// Returns the first value for the key, if any.
    pub fn get(&self, key: &str) -> Option<&FastStr> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    /// Returns all values for the key, in insertion order.
    pub fn get_all<'map>(&'map self, key: &'map str) -> GetAll<'map> {
        GetAll {
            inner: self.entries.iter(),
            key,
        }
    }

    /// Whether at least one value exists for the key.
    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Removes every value for the key. Returns whether any entry was
    /// removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
        before != self.entries.len()
    }

    /// Number of entries, counting duplicates.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, value)` entries in insertion order.
    #[inline]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.entries.iter(),
        }
    }
}

// Stored keys are always lowercase; lookups rely on it.
fn normalize(key: FastStr) -> FastStr {
    if key.as_str().bytes().any(|b| b.is_ascii_uppercase()) {
        FastStr::from(key.as_str().to_ascii_lowercase())
    } else {
        key
    }
}

impl<K, V> FromIterator<(K, V)> for MetadataMap
where
    K: Into<FastStr>,
    V: Into<FastStr>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

impl<K, V> Extend<(K, V)> for MetadataMap
where
    K: Into<FastStr>,
    V: Into<FastStr>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.append(key, value);
        }
    }
}

/// Iterator over a map's entries, created by [`MetadataMap::iter`].
pub struct Iter<'a> {
    inner: std::slice::Iter<'a, (FastStr, FastStr)>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a FastStr, &'a FastStr);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> {}

/// Iterator over the values of one key, created by [`MetadataMap::get_all`].
pub struct GetAll<'a> {
    inner: std::slice::Iter<'a, (FastStr, FastStr)>,
    key: &'a str,
}

impl<'a> Iterator for GetAll<'a> {
    type Item = &'a FastStr;

    fn next(&mut self) -> Option<Self::Item> {
        for (k, v) in self.inner.by_ref() {
            if k.eq_ignore_ascii_case(self.key) {
                return Some(v);
            }
        }
        None
    }
}

impl<'a> IntoIterator for &'a MetadataMap {
    type Item = (&'a FastStr, &'a FastStr);
    type IntoIter = Iter<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for MetadataMap {
    type Item = (FastStr, FastStr);
    type IntoIter = IntoIter;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.entries.into_iter(),
        }
    }
}

/// Owning entry iterator, created by consuming a [`MetadataMap`].
pub struct IntoIter {
    inner: std::vec::IntoIter<(FastStr, FastStr)>,
}

impl Iterator for IntoIter {
    type Item = (FastStr, FastStr);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for IntoIter {}
