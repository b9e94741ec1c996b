use crate::error::NotecraftError;
use crate::protocol::nbt::Tag;
use crate::types::Result;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read, Write};

/// `namespace:key` pair naming one entry of a [`PersistentDataContainer`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespacedKey {
    namespace: String,
    key: String,
}

fn valid_key_part(value: &str, allow_slash: bool) -> bool {
    !value.is_empty()
        && value.chars().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || "_-.".contains(c) || (allow_slash && c == '/')
        })
}

impl NamespacedKey {
    pub fn new(namespace: &str, key: &str) -> Result<Self> {
        if !valid_key_part(namespace, false) {
            return Err(NotecraftError::ConfigError(format!(
                "Invalid key namespace '{}'",
                namespace
            )));
        }
        if !valid_key_part(key, true) {
            return Err(NotecraftError::ConfigError(format!("Invalid key '{}'", key)));
        }
        Ok(Self {
            namespace: namespace.to_owned(),
            key: key.to_owned(),
        })
    }

    /// Parses `namespace:key`.
    pub fn parse(value: &str) -> Result<Self> {
        match value.split_once(':') {
            Some((namespace, key)) => Self::new(namespace, key),
            None => Err(NotecraftError::ConfigError(format!(
                "Key '{}' has no namespace",
                value
            ))),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for NamespacedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.key)
    }
}

/// Flat key to tag store attached to chunks and items. Nesting is done by serializing an inner
/// container into a byte array value, see [`PersistentDataContainer::set_container`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistentDataContainer {
    entries: BTreeMap<NamespacedKey, Tag>,
}

impl PersistentDataContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn has(&self, key: &NamespacedKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &NamespacedKey> {
        self.entries.keys()
    }

    pub fn remove(&mut self, key: &NamespacedKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn get_tag(&self, key: &NamespacedKey) -> Option<&Tag> {
        self.entries.get(key)
    }

    pub fn set_tag(&mut self, key: NamespacedKey, tag: Tag) {
        self.entries.insert(key, tag);
    }

    pub fn get_string(&self, key: &NamespacedKey) -> Option<&str> {
        self.get_tag(key).and_then(Tag::as_string)
    }

    pub fn set_string(&mut self, key: NamespacedKey, value: impl Into<String>) {
        self.set_tag(key, Tag::String(value.into()));
    }

    pub fn get_long(&self, key: &NamespacedKey) -> Option<i64> {
        self.get_tag(key).and_then(Tag::as_i64)
    }

    pub fn set_long(&mut self, key: NamespacedKey, value: i64) {
        self.set_tag(key, Tag::Long(value));
    }

    pub fn get_int(&self, key: &NamespacedKey) -> Option<i32> {
        self.get_tag(key).and_then(Tag::as_i32)
    }

    pub fn set_int(&mut self, key: NamespacedKey, value: i32) {
        self.set_tag(key, Tag::Int(value));
    }

    /// Booleans are stored as a byte, 1 for true
    pub fn get_bool(&self, key: &NamespacedKey) -> Option<bool> {
        self.get_tag(key).and_then(Tag::as_i8).map(|b| b != 0)
    }

    pub fn set_bool(&mut self, key: NamespacedKey, value: bool) {
        self.set_tag(key, Tag::Byte(value as i8));
    }

    pub fn get_bytes(&self, key: &NamespacedKey) -> Option<Vec<u8>> {
        self.get_tag(key)
            .and_then(Tag::as_byte_array)
            .map(|bytes| bytes.iter().map(|b| *b as u8).collect())
    }

    pub fn set_bytes(&mut self, key: NamespacedKey, value: &[u8]) {
        self.set_tag(key, Tag::ByteArray(value.iter().map(|b| *b as i8).collect()));
    }

    /// Reads a nested container. `Ok(None)` if the key is missing or holds another type.
    pub fn get_container(&self, key: &NamespacedKey) -> io::Result<Option<PersistentDataContainer>> {
        match self.get_bytes(key) {
            Some(bytes) => PersistentDataContainer::from_bytes(&bytes).map(Some),
            None => Ok(None),
        }
    }

    pub fn set_container(
        &mut self,
        key: NamespacedKey,
        container: &PersistentDataContainer,
    ) -> io::Result<()> {
        let bytes = container.serialize_to_bytes()?;
        self.set_bytes(key, &bytes);
        Ok(())
    }

    pub fn to_tag(&self) -> Tag {
        Tag::Compound(
            self.entries
                .iter()
                .map(|(key, tag)| (key.to_string(), tag.clone()))
                .collect(),
        )
    }

    pub fn from_tag(tag: &Tag) -> io::Result<Self> {
        let compound = tag.as_compound().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "Container root isn't a compound")
        })?;

        let mut entries = BTreeMap::new();
        for (name, value) in compound {
            let key = NamespacedKey::parse(name)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
            entries.insert(key, value.clone());
        }
        Ok(Self { entries })
    }

    pub fn serialize_to_bytes(&self) -> io::Result<Vec<u8>> {
        self.to_tag().to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        Self::from_tag(&Tag::from_bytes(bytes)?)
    }

    /// Writes the container gzip-compressed, the way chunk data is saved to disk.
    pub fn write_compressed<W: Write>(&self, writer: W) -> io::Result<W> {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        self.to_tag().write_named(&mut encoder, "")?;
        encoder.finish()
    }

    pub fn read_compressed<R: Read>(reader: R) -> io::Result<Self> {
        let mut decoder = GzDecoder::new(reader);
        let mut bytes = Vec::new();
        decoder.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }
}
