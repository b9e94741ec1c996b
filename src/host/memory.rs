use crate::host::block_states::BlockStateRegistry;
use crate::host::chunk::{read_chunk, write_chunk, Chunk, ChunkHandle};
use crate::host::entity::EntityInfo;
use crate::host::item::ItemStack;
use crate::host::world::{Player, World};
use crate::types::{BlockPos, BoundingBox, Hand};
use futures::future::{self, BoxFuture, FutureExt};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

/// A sound reported through [`World::play_sound`]
#[derive(Debug, Clone, PartialEq)]
pub struct PlayedSound {
    pub pos: BlockPos,
    pub sound: String,
    pub volume: f32,
    pub pitch: f32,
}

/// World kept entirely in memory. Chunks are created on first access, filled with air.
pub struct MemoryWorld {
    name: String,
    min_y: i32,
    height: u32,
    block_states: Arc<BlockStateRegistry>,
    chunks: RwLock<HashMap<(i32, i32), ChunkHandle>>,
    entities: RwLock<Vec<EntityInfo>>,
    sounds: Mutex<Vec<PlayedSound>>,
}

impl MemoryWorld {
    pub fn new(name: &str, min_y: i32, height: u32, block_states: Arc<BlockStateRegistry>) -> Self {
        Self {
            name: name.to_owned(),
            min_y,
            height,
            block_states,
            chunks: RwLock::new(HashMap::new()),
            entities: RwLock::new(Vec::new()),
            sounds: Mutex::new(Vec::new()),
        }
    }

    /// An overworld-shaped world, y from -64 to 319
    pub fn overworld(block_states: Arc<BlockStateRegistry>) -> Self {
        Self::new("world", -64, 384, block_states)
    }

    /// Returns the chunk, creating it if needed.
    pub fn load_chunk(&self, chunk_x: i32, chunk_z: i32) -> ChunkHandle {
        if let Some(handle) = self
            .chunks
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&(chunk_x, chunk_z))
        {
            return handle.clone();
        }

        let mut chunks = self
            .chunks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        chunks
            .entry((chunk_x, chunk_z))
            .or_insert_with(|| {
                Arc::new(RwLock::new(Chunk::new(
                    chunk_x,
                    chunk_z,
                    self.min_y,
                    self.height,
                    0,
                    0,
                )))
            })
            .clone()
    }

    pub fn add_entity(&self, entity: EntityInfo) {
        self.entities
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entity);
    }

    pub fn played_sounds(&self) -> Vec<PlayedSound> {
        self.sounds
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl World for MemoryWorld {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_height(&self) -> i32 {
        self.min_y
    }

    fn max_height(&self) -> i32 {
        self.min_y + self.height as i32
    }

    fn block_states(&self) -> &BlockStateRegistry {
        &self.block_states
    }

    fn chunk_at(&self, chunk_x: i32, chunk_z: i32) -> io::Result<ChunkHandle> {
        Ok(self.load_chunk(chunk_x, chunk_z))
    }

    fn chunk_at_async(&self, chunk_x: i32, chunk_z: i32) -> BoxFuture<'static, io::Result<ChunkHandle>> {
        future::ready(Ok(self.load_chunk(chunk_x, chunk_z))).boxed()
    }

    fn block_at(&self, pos: BlockPos) -> u32 {
        let handle = self.load_chunk(pos.chunk_x(), pos.chunk_z());
        let chunk = read_chunk(&handle);
        chunk
            .block_at(pos.local_x(), pos.y, pos.local_z())
            .unwrap_or(0)
    }

    fn set_block(&self, pos: BlockPos, state: u32) -> bool {
        let handle = self.load_chunk(pos.chunk_x(), pos.chunk_z());
        let mut chunk = write_chunk(&handle);
        chunk.set_block(pos.local_x(), pos.y, pos.local_z(), state)
    }

    fn nearby_entities(&self, area: &BoundingBox) -> Vec<EntityInfo> {
        self.entities
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|entity| entity.bounding_box.intersects(area))
            .cloned()
            .collect()
    }

    fn play_sound(&self, pos: BlockPos, sound: &str, volume: f32, pitch: f32) {
        self.sounds
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(PlayedSound {
                pos,
                sound: sound.to_owned(),
                volume,
                pitch,
            });
    }
}

/// Player whose hands and sneaking state are set directly
pub struct MemoryPlayer {
    uuid: Uuid,
    name: String,
    sneaking: AtomicBool,
    main_hand: Mutex<ItemStack>,
    off_hand: Mutex<ItemStack>,
    world: Arc<MemoryWorld>,
}

impl MemoryPlayer {
    pub fn new(name: &str, world: Arc<MemoryWorld>) -> Self {
        Self {
            uuid: Uuid::new_v3(&Uuid::NAMESPACE_OID, name.as_bytes()),
            name: name.to_owned(),
            sneaking: AtomicBool::new(false),
            main_hand: Mutex::new(ItemStack::empty()),
            off_hand: Mutex::new(ItemStack::empty()),
            world,
        }
    }

    pub fn set_sneaking(&self, sneaking: bool) {
        self.sneaking.store(sneaking, Ordering::SeqCst);
    }

    pub fn set_item_in_hand(&self, hand: Hand, item: ItemStack) {
        let slot = match hand {
            Hand::MainHand => &self.main_hand,
            Hand::OffHand => &self.off_hand,
        };
        *slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = item;
    }
}

impl Player for MemoryPlayer {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_sneaking(&self) -> bool {
        self.sneaking.load(Ordering::SeqCst)
    }

    fn item_in_hand(&self, hand: Hand) -> ItemStack {
        let slot = match hand {
            Hand::MainHand => &self.main_hand,
            Hand::OffHand => &self.off_hand,
        };
        slot.lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn world(&self) -> Arc<dyn World> {
        self.world.clone()
    }
}
