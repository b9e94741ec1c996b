use crate::blocks::coords::{mod16, PackedCoordinate};
use crate::blocks::definition::CustomBlock;
use crate::error::NotecraftError;
use crate::host::chunk::{write_chunk, PersistentChunk};
use crate::host::container::{NamespacedKey, PersistentDataContainer};
use crate::host::world::{Player, World};
use crate::logger::{log, LogSeverity};
use crate::protocol::nbt::Tag;
use crate::types::{BlockPos, Result};

/// Schema generation written by this build. Chunks stamped with anything newer are refused.
pub const CURRENT_VERSION_UID: i64 = 1;

/// Keys of the persisted chunk schema, all under one namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKeys {
    namespace: String,
    pub version: NamespacedKey,
    pub custom_blocks: NamespacedKey,
    pub block_type: NamespacedKey,
}

impl StoreKeys {
    pub fn new(namespace: &str) -> Result<Self> {
        Ok(Self {
            namespace: namespace.to_owned(),
            version: NamespacedKey::new(namespace, "version_uid")?,
            custom_blocks: NamespacedKey::new(namespace, "custom_blocks")?,
            block_type: NamespacedKey::new(namespace, "custom_block_type")?,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Key of one block's container inside `custom_blocks`
    pub fn block_key(&self, coord: PackedCoordinate) -> Result<NamespacedKey> {
        NamespacedKey::new(&self.namespace, &coord.to_hex())
    }
}

/// Reads and writes custom blocks in a chunk's persistent data.
///
/// Layout:
/// ```text
/// <ns>:version_uid    long
/// <ns>:custom_blocks  container {
///     <ns>:<hex packed coordinate>  container {
///         <ns>:custom_block_type  string
///         ...extra attributes
///     }
/// }
/// ```
/// Containers are nested by serializing them into byte arrays. Writes must happen on the main
/// thread.
#[derive(Debug, Clone)]
pub struct PersistentBlockStore {
    keys: StoreKeys,
}

impl PersistentBlockStore {
    pub fn new(namespace: &str) -> Result<Self> {
        Ok(Self {
            keys: StoreKeys::new(namespace)?,
        })
    }

    pub fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    /// Stored schema version. If the chunk has none yet, `default` is stored and returned.
    pub fn get_version<C: PersistentChunk + ?Sized>(&self, chunk: &mut C, default: i64) -> i64 {
        let data = chunk.persistent_data_mut();
        match data.get_long(&self.keys.version) {
            Some(version) => version,
            None => {
                data.set_long(self.keys.version.clone(), default);
                default
            }
        }
    }

    /// Stored schema version, without stamping anything
    pub fn peek_version<C: PersistentChunk + ?Sized>(&self, chunk: &C) -> Option<i64> {
        chunk.persistent_data().get_long(&self.keys.version)
    }

    /// Fails if the chunk was written by a newer schema.
    pub fn check_version<C: PersistentChunk + ?Sized>(&self, chunk: &C) -> Result<()> {
        match self.peek_version(chunk) {
            Some(found) => ensure_supported(chunk.chunk_x(), chunk.chunk_z(), found),
            None => Ok(()),
        }
    }

    pub fn set_custom_block<C: PersistentChunk + ?Sized>(
        &self,
        chunk: &mut C,
        x: i32,
        y: i32,
        z: i32,
        block: &dyn CustomBlock,
    ) -> Result<()> {
        self.set_persistent_data(
            chunk,
            x,
            y,
            z,
            self.keys.block_type.clone(),
            Tag::String(block.block_id().to_owned()),
        )
    }

    /// Stores an attribute in the container of the block at chunk-local `x`, `y`, `z`,
    /// creating the containers on the way.
    pub fn set_persistent_data<C: PersistentChunk + ?Sized>(
        &self,
        chunk: &mut C,
        x: i32,
        y: i32,
        z: i32,
        key: NamespacedKey,
        value: Tag,
    ) -> Result<()> {
        let block_key = self.keys.block_key(PackedCoordinate::pack(x, y, z)?)?;

        self.check_version(chunk)?;

        let data = chunk.persistent_data_mut();
        let mut blocks = data
            .get_container(&self.keys.custom_blocks)?
            .unwrap_or_default();
        let mut block = blocks.get_container(&block_key)?.unwrap_or_default();

        block.set_tag(key, value);
        blocks.set_container(block_key, &block)?;
        data.set_container(self.keys.custom_blocks.clone(), &blocks)?;
        self.get_version(chunk, CURRENT_VERSION_UID);
        Ok(())
    }

    /// Removes the block's whole container. Returns whether there was one.
    pub fn remove_custom_block<C: PersistentChunk + ?Sized>(
        &self,
        chunk: &mut C,
        x: i32,
        y: i32,
        z: i32,
    ) -> Result<bool> {
        let block_key = self.keys.block_key(PackedCoordinate::pack(x, y, z)?)?;
        self.check_version(chunk)?;

        let data = chunk.persistent_data_mut();
        let Some(mut blocks) = data.get_container(&self.keys.custom_blocks)? else {
            return Ok(false);
        };
        if !blocks.remove(&block_key) {
            return Ok(false);
        }
        data.set_container(self.keys.custom_blocks.clone(), &blocks)?;
        Ok(true)
    }

    pub fn get_custom_block_type<C: PersistentChunk + ?Sized>(
        &self,
        chunk: &C,
        x: i32,
        y: i32,
        z: i32,
    ) -> Result<Option<String>> {
        Ok(self
            .get_persistent_data(chunk, x, y, z, &self.keys.block_type)?
            .as_ref()
            .and_then(Tag::as_string)
            .map(str::to_owned))
    }

    /// An attribute of the block at chunk-local `x`, `y`, `z`. None when the chunk has no
    /// custom blocks, there is no block there, or the block lacks the attribute.
    pub fn get_persistent_data<C: PersistentChunk + ?Sized>(
        &self,
        chunk: &C,
        x: i32,
        y: i32,
        z: i32,
        key: &NamespacedKey,
    ) -> Result<Option<Tag>> {
        let block_key = self.keys.block_key(PackedCoordinate::pack(x, y, z)?)?;
        self.check_version(chunk)?;

        let Some(block) = self.block_container(chunk.persistent_data(), &block_key)? else {
            return Ok(None);
        };
        Ok(block.get_tag(key).cloned())
    }

    fn block_container(
        &self,
        data: &PersistentDataContainer,
        block_key: &NamespacedKey,
    ) -> Result<Option<PersistentDataContainer>> {
        match data.get_container(&self.keys.custom_blocks)? {
            Some(blocks) => Ok(blocks.get_container(block_key)?),
            None => Ok(None),
        }
    }

    pub fn set_custom_block_at<C: PersistentChunk + ?Sized>(
        &self,
        chunk: &mut C,
        pos: BlockPos,
        block: &dyn CustomBlock,
    ) -> Result<()> {
        self.set_custom_block(chunk, mod16(pos.x), pos.y, mod16(pos.z), block)
    }

    pub fn remove_custom_block_at<C: PersistentChunk + ?Sized>(
        &self,
        chunk: &mut C,
        pos: BlockPos,
    ) -> Result<bool> {
        self.remove_custom_block(chunk, mod16(pos.x), pos.y, mod16(pos.z))
    }

    pub fn get_custom_block_type_at<C: PersistentChunk + ?Sized>(
        &self,
        chunk: &C,
        pos: BlockPos,
    ) -> Result<Option<String>> {
        self.get_custom_block_type(chunk, mod16(pos.x), pos.y, mod16(pos.z))
    }

    /// Places `block` at `pos`: stores it in the owning chunk and sets the real block to a plain
    /// note block. Only air is overwritten unless `replace` is set. Returns whether the block
    /// was placed.
    pub fn place(
        &self,
        world: &dyn World,
        pos: BlockPos,
        block: &dyn CustomBlock,
        player: Option<&dyn Player>,
        replace: bool,
        play_sound: bool,
    ) -> Result<bool> {
        if pos.y < world.min_height() || pos.y >= world.max_height() {
            return Ok(false);
        }
        let block_states = world.block_states();
        if !replace && !block_states.is_air(world.block_at(pos)) {
            return Ok(false);
        }
        let disguise = block_states.default_note_block_id().ok_or_else(|| {
            NotecraftError::ConfigError("Block state table has no note_block".to_owned())
        })?;

        let handle = world.chunk_at(pos.chunk_x(), pos.chunk_z())?;
        self.set_custom_block_at(&mut *write_chunk(&handle), pos, block)?;
        world.set_block(pos, disguise);
        if play_sound {
            play_place_sound(world, pos, block);
        }

        log(
            format!(
                "{} placed '{}' at {} {} {} in {}",
                player.map_or("Server", |player| player.name()),
                block.block_id(),
                pos.x,
                pos.y,
                pos.z,
                world.name()
            ),
            LogSeverity::Debug,
        );
        Ok(true)
    }
}

fn ensure_supported(chunk_x: i32, chunk_z: i32, found: i64) -> Result<()> {
    if found > CURRENT_VERSION_UID {
        return Err(NotecraftError::UnsupportedSchemaVersion {
            chunk_x,
            chunk_z,
            found,
            supported: CURRENT_VERSION_UID,
        });
    }
    Ok(())
}

fn play_place_sound(world: &dyn World, pos: BlockPos, block: &dyn CustomBlock) {
    if let Some(sounds) = block.sound_group() {
        world.play_sound(pos, &sounds.place_sound, sounds.volume, sounds.pitch);
    }
}
