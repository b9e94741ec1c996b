use crate::blocks::definition::CustomBlock;
use crate::blocks::registry::BlockRegistry;
use crate::blocks::snapshot::ChunkSnapshot;
use crate::blocks::store::PersistentBlockStore;
use crate::error::NotecraftError;
use crate::host::block_states::BlockStateRegistry;
use crate::host::chunk::read_chunk;
use crate::host::world::World;
use crate::logger::{log, LogSeverity};
use crate::protocol::block_update::BlockUpdatePacket;
use crate::protocol::chunk_data::{ChunkDataPacket, ChunkSections};
use crate::protocol::paletted_container::{block_index, ContainerFormat};
use crate::protocol::section_blocks_update::SectionBlocksUpdatePacket;
use crate::types::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Note block state IDs the client is shown, resolved once against the block state table
#[derive(Debug, Clone)]
pub struct DisguiseTable {
    default_state: u32,
    by_block: HashMap<String, u32>,
}

impl DisguiseTable {
    /// Fails if the table has no note block, or no state for one of the registered blocks.
    pub fn build(registry: &BlockRegistry, block_states: &BlockStateRegistry) -> Result<Self> {
        let default_state = block_states.default_note_block_id().ok_or_else(|| {
            NotecraftError::ConfigError("Block state table has no note_block".to_owned())
        })?;

        let mut by_block = HashMap::new();
        for block in registry.registered() {
            let state = block.noteblock_state();
            let id = state.state_id(block_states).ok_or_else(|| {
                NotecraftError::ConfigError(format!(
                    "No note_block state matches {} of '{}'",
                    state,
                    block.block_id()
                ))
            })?;
            by_block.insert(block.block_id().to_owned(), id);
        }

        Ok(Self {
            default_state,
            by_block,
        })
    }

    /// A plain note block
    pub fn default_state(&self) -> u32 {
        self.default_state
    }

    pub fn state_of(&self, block: &dyn CustomBlock) -> Option<u32> {
        self.by_block.get(block.block_id()).copied()
    }

    pub fn len(&self) -> usize {
        self.by_block.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_block.is_empty()
    }
}

/// Rewrites block states in clientbound packets so custom blocks show up as their note block
/// state and real note blocks always show up plain.
pub struct OutgoingRewriter {
    registry: Arc<BlockRegistry>,
    block_states: Arc<BlockStateRegistry>,
    store: PersistentBlockStore,
    disguises: DisguiseTable,
    biome_direct_bits: u8,
}

impl OutgoingRewriter {
    pub fn new(
        registry: Arc<BlockRegistry>,
        block_states: Arc<BlockStateRegistry>,
        store: PersistentBlockStore,
        biome_direct_bits: u8,
    ) -> Result<Self> {
        let disguises = DisguiseTable::build(&registry, &block_states)?;
        Ok(Self {
            registry,
            block_states,
            store,
            disguises,
            biome_direct_bits,
        })
    }

    pub fn disguises(&self) -> &DisguiseTable {
        &self.disguises
    }

    /// State to send instead of `real`, if any
    fn disguise(&self, block: Option<&dyn CustomBlock>, real: u32) -> Option<u32> {
        match block.and_then(|block| self.disguises.state_of(block)) {
            Some(state) => Some(state),
            None if self.block_states.is_note_block(real) => Some(self.disguises.default_state),
            None => None,
        }
    }

    /// Rewrites a Chunk Data packet in place. The chunk is loaded and captured on another task
    /// while the sections are decoded here. Returns whether the packet changed.
    pub async fn rewrite_chunk(&self, world: &dyn World, packet: &mut ChunkDataPacket) -> bool {
        let (chunk_x, chunk_z) = (packet.chunk_x, packet.chunk_z);
        let chunk = world.chunk_at_async(chunk_x, chunk_z);
        let store = self.store.clone();
        let capture = tokio::spawn(async move {
            let handle = chunk.await.map_err(NotecraftError::from)?;
            ChunkSnapshot::capture_handle(&handle, &store)
        });

        let mut sections = ChunkSections::decode(
            packet.data(),
            ContainerFormat::block_states(self.block_states.direct_bits()),
            ContainerFormat::biomes(self.biome_direct_bits),
        );
        if let Some(err) = &sections.error {
            log(
                format!(
                    "Couldn't decode section {} of chunk {}, {}, leaving it as is: {}",
                    sections.sections.len(),
                    chunk_x,
                    chunk_z,
                    err
                ),
                LogSeverity::Warning,
            );
        }

        let snapshot = match capture.await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(err)) => {
                report(chunk_x, chunk_z, err);
                return false;
            }
            Err(err) => {
                log(
                    format!("Chunk {}, {} capture task failed: {}", chunk_x, chunk_z, err),
                    LogSeverity::Error,
                );
                return false;
            }
        };

        let changed = self.rewrite_sections(&mut sections, &snapshot, world.min_height());
        if !sections.is_dirty() {
            return false;
        }

        let (data, failures) = sections.encode();
        for (index, err) in failures {
            log(
                format!(
                    "Couldn't encode section {} of chunk {}, {}, sending it unchanged: {}",
                    index, chunk_x, chunk_z, err
                ),
                LogSeverity::Warning,
            );
        }
        packet.replace_section_data(data);
        log(
            format!(
                "Rewrote {} blocks in chunk {}, {}",
                changed, chunk_x, chunk_z
            ),
            LogSeverity::Debug,
        );
        true
    }

    fn rewrite_sections(
        &self,
        sections: &mut ChunkSections,
        snapshot: &ChunkSnapshot,
        min_y: i32,
    ) -> usize {
        // (section, block index) -> disguise of the custom block there
        let mut custom = HashMap::new();
        for record in snapshot.records() {
            let Some(block) = self.registry.find_by_snapshot_record(record) else {
                continue;
            };
            let Some(state) = self.disguises.state_of(block.as_ref()) else {
                continue;
            };
            let offset = record.y() - min_y;
            if offset < 0 {
                continue;
            }
            let index = block_index(record.x() as usize, (offset & 15) as usize, record.z() as usize);
            custom.insert(((offset >> 4) as usize, index), state);
        }

        let mut changed = 0;
        for (section_index, decoded) in sections.sections.iter_mut().enumerate() {
            let updates: Vec<(usize, u32, u32)> = decoded
                .section
                .block_states
                .entries()
                .iter()
                .enumerate()
                .filter_map(|(index, &real)| {
                    let disguise = match custom.get(&(section_index, index)) {
                        Some(state) => Some(*state),
                        None if self.block_states.is_note_block(real) => {
                            Some(self.disguises.default_state)
                        }
                        None => None,
                    };
                    disguise.map(|state| (index, real, state))
                })
                .collect();

            for (index, real, state) in updates {
                if decoded.section.block_states.set(index, state) {
                    if self.block_states.is_air(real) {
                        decoded.section.block_count += 1;
                    }
                    decoded.dirty = true;
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Rewrites a Block Update packet in place. Returns whether the packet changed.
    pub async fn rewrite_block_update(
        &self,
        world: &dyn World,
        packet: &mut BlockUpdatePacket,
    ) -> bool {
        let pos = packet.position;
        let handle = match world.chunk_at_async(pos.chunk_x(), pos.chunk_z()).await {
            Ok(handle) => handle,
            Err(err) => {
                report(pos.chunk_x(), pos.chunk_z(), err.into());
                return false;
            }
        };

        let block_type = {
            let chunk = read_chunk(&handle);
            self.store.get_custom_block_type_at(&*chunk, pos)
        };
        let block = match block_type {
            Ok(block_type) => block_type.and_then(|id| self.registry.find_by_id(&id)),
            Err(err) => {
                report(pos.chunk_x(), pos.chunk_z(), err);
                return false;
            }
        };

        match self.disguise(block.as_deref(), packet.block_state as u32) {
            Some(state) if state as i32 != packet.block_state => {
                packet.block_state = state as i32;
                true
            }
            _ => false,
        }
    }

    /// Rewrites an Update Section Blocks packet in place. Returns whether any entry changed.
    pub async fn rewrite_section_update(
        &self,
        world: &dyn World,
        packet: &mut SectionBlocksUpdatePacket,
    ) -> bool {
        let section = packet.section;
        let snapshot = match world.chunk_at_async(section.x, section.z).await {
            Ok(handle) => ChunkSnapshot::capture_handle(&handle, &self.store),
            Err(err) => Err(err.into()),
        };
        let snapshot = match snapshot {
            Ok(snapshot) => snapshot,
            Err(err) => {
                report(section.x, section.z, err);
                return false;
            }
        };

        let mut changed = false;
        for change in &mut packet.changes {
            let pos = section.block_at(change.local_x, change.local_y, change.local_z);
            let block = snapshot.definition_at(
                &self.registry,
                change.local_x as i32,
                pos.y,
                change.local_z as i32,
            );
            if let Some(state) = self.disguise(block.as_deref(), change.block_state as u32) {
                if state as i32 != change.block_state {
                    change.block_state = state as i32;
                    changed = true;
                }
            }
        }
        changed
    }
}

fn report(chunk_x: i32, chunk_z: i32, err: NotecraftError) {
    let severity = match err {
        NotecraftError::UnsupportedSchemaVersion { .. } => LogSeverity::Fatal,
        _ => LogSeverity::Error,
    };
    log(
        format!(
            "Couldn't read custom blocks of chunk {}, {}, sending packet unchanged: {}",
            chunk_x, chunk_z, err
        ),
        severity,
    );
}
