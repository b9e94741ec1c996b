use crate::host::block_states::BlockStateRegistry;
use crate::host::chunk::ChunkHandle;
use crate::host::entity::EntityInfo;
use crate::host::item::ItemStack;
use crate::types::{BlockPos, BoundingBox, Hand};
use futures::future::BoxFuture;
use std::io;
use std::sync::Arc;
use uuid::Uuid;

/// The parts of a server world the plugin talks to
pub trait World: Send + Sync {
    fn name(&self) -> &str;

    /// Lowest buildable y, inclusive
    fn min_height(&self) -> i32;

    /// Highest buildable y, exclusive
    fn max_height(&self) -> i32;

    fn block_states(&self) -> &BlockStateRegistry;

    /// Loads a chunk on the calling thread. Main thread only.
    fn chunk_at(&self, chunk_x: i32, chunk_z: i32) -> io::Result<ChunkHandle>;

    /// Loads (or generates) a chunk. The future may complete on another thread.
    fn chunk_at_async(&self, chunk_x: i32, chunk_z: i32) -> BoxFuture<'static, io::Result<ChunkHandle>>;

    /// Global block state at a position, air outside the world
    fn block_at(&self, pos: BlockPos) -> u32;

    /// Returns false if the position is outside the world.
    fn set_block(&self, pos: BlockPos, state: u32) -> bool;

    fn nearby_entities(&self, area: &BoundingBox) -> Vec<EntityInfo>;

    fn play_sound(&self, pos: BlockPos, sound: &str, volume: f32, pitch: f32);
}

pub trait Player: Send + Sync {
    fn uuid(&self) -> Uuid;

    fn name(&self) -> &str;

    fn is_sneaking(&self) -> bool;

    fn item_in_hand(&self, hand: Hand) -> ItemStack;

    fn world(&self) -> Arc<dyn World>;

    /// Build permission at a position, e.g. spawn protection
    fn can_build(&self, _pos: BlockPos) -> bool {
        true
    }
}
