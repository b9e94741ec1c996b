use crate::blocks::coords::PackedCoordinate;
use crate::blocks::definition::CustomBlock;
use crate::blocks::registry::BlockRegistry;
use crate::blocks::store::{PersistentBlockStore, StoreKeys, CURRENT_VERSION_UID};
use crate::host::chunk::{read_chunk, Chunk, ChunkBlockData, ChunkHandle, PersistentChunk};
use crate::host::container::{NamespacedKey, PersistentDataContainer};
use crate::logger::time::unix_timestamp_millis;
use crate::logger::{log, LogSeverity};
use crate::protocol::nbt::Tag;
use crate::types::Result;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;

/// One placed custom block as read from a chunk
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedBlockRecord {
    location: PackedCoordinate,
    block_type: String,
    data: PersistentDataContainer,
}

impl PersistedBlockRecord {
    pub fn location(&self) -> PackedCoordinate {
        self.location
    }

    pub fn x(&self) -> i32 {
        self.location.x()
    }

    pub fn y(&self) -> i32 {
        self.location.y()
    }

    pub fn z(&self) -> i32 {
        self.location.z()
    }

    /// ID of the custom block
    pub fn block_type(&self) -> &str {
        &self.block_type
    }

    /// Every attribute stored for the block, the type included
    pub fn data(&self) -> &PersistentDataContainer {
        &self.data
    }

    pub fn get(&self, key: &NamespacedKey) -> Option<&Tag> {
        self.data.get_tag(key)
    }

    /// The block's container as it is stored in the chunk
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        self.data.serialize_to_bytes()
    }
}

/// Point-in-time copy of a chunk's custom blocks and block data. Never changes after capture,
/// so it can be read from any thread.
#[derive(Debug, Clone)]
pub struct ChunkSnapshot {
    chunk_x: i32,
    chunk_z: i32,
    version: i64,
    captured_at: i64,
    records: HashMap<PackedCoordinate, PersistedBlockRecord>,
    block_data: ChunkBlockData,
}

impl ChunkSnapshot {
    /// Copies the chunk. Fails only if the chunk was written by a newer schema; broken block
    /// entries are logged and left out.
    pub fn capture(chunk: &Chunk, store: &PersistentBlockStore) -> Result<Self> {
        store.check_version(chunk)?;
        Ok(Self {
            chunk_x: chunk.x(),
            chunk_z: chunk.z(),
            version: store.peek_version(chunk).unwrap_or(CURRENT_VERSION_UID),
            captured_at: unix_timestamp_millis(),
            records: read_records(chunk, store.keys()),
            block_data: chunk.block_data_snapshot(),
        })
    }

    /// Captures under the chunk's read lock.
    pub fn capture_handle(handle: &ChunkHandle, store: &PersistentBlockStore) -> Result<Self> {
        Self::capture(&read_chunk(handle), store)
    }

    pub fn chunk_x(&self) -> i32 {
        self.chunk_x
    }

    pub fn chunk_z(&self) -> i32 {
        self.chunk_z
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    /// Unix milliseconds
    pub fn captured_at(&self) -> i64 {
        self.captured_at
    }

    pub fn block_data(&self) -> &ChunkBlockData {
        &self.block_data
    }

    pub fn records(&self) -> impl Iterator<Item = &PersistedBlockRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record_at(&self, x: i32, y: i32, z: i32) -> Option<&PersistedBlockRecord> {
        let coord = PackedCoordinate::pack(x, y, z).ok()?;
        self.records.get(&coord)
    }

    /// Registered block at chunk-local `x`, `y`, `z`. None for records of blocks that are no
    /// longer registered.
    pub fn definition_at(
        &self,
        registry: &BlockRegistry,
        x: i32,
        y: i32,
        z: i32,
    ) -> Option<Arc<dyn CustomBlock>> {
        self.record_at(x, y, z)
            .and_then(|record| registry.find_by_snapshot_record(record))
    }

    /// Real block state at chunk-local `x`, `z` and world `y`
    pub fn block_at(&self, x: i32, y: i32, z: i32) -> Option<u32> {
        self.block_data.block_at(x, y, z)
    }
}

fn read_records<C: PersistentChunk + ?Sized>(
    chunk: &C,
    keys: &StoreKeys,
) -> HashMap<PackedCoordinate, PersistedBlockRecord> {
    let mut records = HashMap::new();
    let blocks = match chunk.persistent_data().get_container(&keys.custom_blocks) {
        Ok(Some(blocks)) => blocks,
        Ok(None) => return records,
        Err(err) => {
            log(
                format!(
                    "Couldn't read custom blocks of chunk {}, {}: {}",
                    chunk.chunk_x(),
                    chunk.chunk_z(),
                    err
                ),
                LogSeverity::Warning,
            );
            return records;
        }
    };

    for key in blocks.keys() {
        let skip = |reason: String| {
            log(
                format!(
                    "Skipping custom block {} in chunk {}, {}: {}",
                    key,
                    chunk.chunk_x(),
                    chunk.chunk_z(),
                    reason
                ),
                LogSeverity::Warning,
            )
        };

        let location = match PackedCoordinate::from_hex(key.key()) {
            Some(location) if key.namespace() == keys.namespace() => location,
            _ => {
                skip("key is not a packed coordinate".to_owned());
                continue;
            }
        };
        let data = match blocks.get_container(key) {
            Ok(Some(data)) => data,
            Ok(None) => {
                skip("value is not a container".to_owned());
                continue;
            }
            Err(err) => {
                skip(err.to_string());
                continue;
            }
        };
        let Some(block_type) = data.get_string(&keys.block_type).map(str::to_owned) else {
            skip("no block type".to_owned());
            continue;
        };

        records.insert(
            location,
            PersistedBlockRecord {
                location,
                block_type,
                data,
            },
        );
    }
    records
}
