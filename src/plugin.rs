use crate::blocks::definition::{CustomBlock, ItemKeys};
use crate::blocks::incoming::PlacementInterceptor;
use crate::blocks::null_block::NullBlock;
use crate::blocks::outgoing::OutgoingRewriter;
use crate::blocks::registry::{BlockRegistry, BlockRegistryBuilder};
use crate::blocks::store::PersistentBlockStore;
use crate::config::PluginConfig;
use crate::host::block_states::BlockStateRegistry;
use crate::host::chunk::write_chunk;
use crate::host::event::{CustomBlockPlaceEvent, EventBus};
use crate::host::item::ItemRegistry;
use crate::host::scheduler::MainThreadExecutor;
use crate::host::world::{Player, World};
use crate::logger::{self, log, LogSeverity};
use crate::protocol::block_update::BlockUpdatePacket;
use crate::protocol::chunk_data::ChunkDataPacket;
use crate::protocol::codec::RawPacket;
use crate::protocol::section_blocks_update::SectionBlocksUpdatePacket;
use crate::protocol::use_item_on::UseItemOnPacket;
use crate::types::{BlockPos, Result};
use std::io;
use std::sync::Arc;

/// The enabled plugin. Built once, then shared by the main thread and every connection task.
pub struct NotecraftPlugin {
    config: PluginConfig,
    block_states: Arc<BlockStateRegistry>,
    registry: Arc<BlockRegistry>,
    store: PersistentBlockStore,
    events: Arc<EventBus<CustomBlockPlaceEvent>>,
    outgoing: OutgoingRewriter,
    incoming: Arc<PlacementInterceptor>,
}

// Needed by `assert_matches!` in the unit tests; several fields are not `Debug`.
#[cfg(test)]
impl std::fmt::Debug for NotecraftPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotecraftPlugin").finish_non_exhaustive()
    }
}

impl NotecraftPlugin {
    /// Registers [`NullBlock`] followed by `blocks`, then freezes the registry. Any rejected
    /// block fails the whole enable.
    pub fn enable(
        config: PluginConfig,
        block_states: Arc<BlockStateRegistry>,
        items: &mut dyn ItemRegistry,
        blocks: Vec<Arc<dyn CustomBlock>>,
    ) -> Result<Self> {
        logger::init(config.log_severity()?);

        let mut builder = BlockRegistryBuilder::new(ItemKeys::new(&config.namespace)?);
        builder.register(items, NullBlock::default)?;
        builder.register_all(items, blocks)?;
        let registry = builder.freeze();

        let store = PersistentBlockStore::new(&config.namespace)?;
        let events = Arc::new(EventBus::new());
        let outgoing = OutgoingRewriter::new(
            registry.clone(),
            block_states.clone(),
            store.clone(),
            config.biome_direct_bits,
        )?;
        let incoming = Arc::new(PlacementInterceptor::new(
            registry.clone(),
            store.clone(),
            events.clone(),
        ));

        log(
            format!(
                "Notecraft enabled with {} custom blocks under namespace '{}'",
                registry.len(),
                config.namespace
            ),
            LogSeverity::Info,
        );

        Ok(Self {
            config,
            block_states,
            registry,
            store,
            events,
            outgoing,
            incoming,
        })
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn block_states(&self) -> &Arc<BlockStateRegistry> {
        &self.block_states
    }

    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &PersistentBlockStore {
        &self.store
    }

    /// Listeners for custom block placements
    pub fn place_events(&self) -> &EventBus<CustomBlockPlaceEvent> {
        &self.events
    }

    /// Forgets the custom block at `pos` once the host has broken it. Main thread only.
    /// Returns whether a custom block was stored there.
    pub fn on_block_break(&self, world: &dyn World, pos: BlockPos) -> Result<bool> {
        let handle = world.chunk_at(pos.chunk_x(), pos.chunk_z())?;
        let removed = self
            .store
            .remove_custom_block_at(&mut *write_chunk(&handle), pos)?;
        if removed {
            log(
                format!(
                    "Removed custom block at {} {} {} in {}",
                    pos.x,
                    pos.y,
                    pos.z,
                    world.name()
                ),
                LogSeverity::Debug,
            );
        }
        Ok(removed)
    }

    /// Rewrites a clientbound packet headed to a player in `world`. Anything that isn't
    /// rewritten, including packets that fail to decode, is returned unchanged.
    pub async fn on_packet_sending(&self, world: &dyn World, packet: RawPacket) -> RawPacket {
        match self.rewrite_outgoing(world, &packet).await {
            Ok(Some(rewritten)) => rewritten,
            Ok(None) => packet,
            Err(err) => {
                log(
                    format!(
                        "Couldn't decode outgoing packet 0x{:02x}, sending it unchanged: {}",
                        packet.id, err
                    ),
                    LogSeverity::Warning,
                );
                packet
            }
        }
    }

    async fn rewrite_outgoing(
        &self,
        world: &dyn World,
        packet: &RawPacket,
    ) -> io::Result<Option<RawPacket>> {
        if packet.is::<ChunkDataPacket>() {
            if !self.config.rewrite_chunks {
                return Ok(None);
            }
            let mut chunk = packet.decode::<ChunkDataPacket>()?;
            if !self.outgoing.rewrite_chunk(world, &mut chunk).await {
                return Ok(None);
            }
            return RawPacket::from_packet(&chunk).map(Some);
        }

        if !self.config.rewrite_block_updates {
            return Ok(None);
        }
        if packet.is::<BlockUpdatePacket>() {
            let mut update = packet.decode::<BlockUpdatePacket>()?;
            if !self.outgoing.rewrite_block_update(world, &mut update).await {
                return Ok(None);
            }
            return RawPacket::from_packet(&update).map(Some);
        }
        if packet.is::<SectionBlocksUpdatePacket>() {
            let mut update = packet.decode::<SectionBlocksUpdatePacket>()?;
            if !self.outgoing.rewrite_section_update(world, &mut update).await {
                return Ok(None);
            }
            return RawPacket::from_packet(&update).map(Some);
        }
        Ok(None)
    }

    /// Handles a serverbound packet from `player`. Returns whether the server should still
    /// receive it.
    pub async fn on_packet_receiving(
        &self,
        executor: &dyn MainThreadExecutor,
        player: Arc<dyn Player>,
        packet: &RawPacket,
    ) -> bool {
        if !self.config.intercept_placement || !packet.is::<UseItemOnPacket>() {
            return true;
        }
        let use_item_on = match packet.decode::<UseItemOnPacket>() {
            Ok(use_item_on) => use_item_on,
            Err(err) => {
                log(
                    format!("Couldn't decode use item on packet: {}", err),
                    LogSeverity::Warning,
                );
                return true;
            }
        };

        match self.incoming.intercept(executor, player, use_item_on).await {
            Ok(placed) => !placed,
            Err(err) => {
                log(
                    format!("Custom block placement failed: {}", err),
                    LogSeverity::Error,
                );
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::definition::{Breakable, SoundEmitting};
    use crate::blocks::noteblock::{Instrument, NoteblockState};
    use crate::error::NotecraftError;
    use crate::host::block_states::fixture;
    use crate::host::chunk::read_chunk;
    use crate::host::item::{ItemIndex, ItemStack};
    use crate::host::memory::MemoryWorld;
    use assert_matches::assert_matches;

    struct Marble;

    impl Breakable for Marble {
        fn break_time(&self, _tool: &ItemStack) -> f64 {
            2.0
        }

        fn drops(&self, _tool: &ItemStack) -> Vec<ItemStack> {
            Vec::new()
        }
    }

    impl SoundEmitting for Marble {}

    impl CustomBlock for Marble {
        fn block_id(&self) -> &str {
            "marble"
        }

        fn noteblock_state(&self) -> NoteblockState {
            NoteblockState::new(Instrument::Flute, 3, false)
        }
    }

    fn enable(config: PluginConfig, blocks: Vec<Arc<dyn CustomBlock>>) -> Result<NotecraftPlugin> {
        NotecraftPlugin::enable(config, Arc::new(fixture()), &mut ItemIndex::new(), blocks)
    }

    #[test]
    fn test_enable_registers_null_block_first() {
        let plugin = enable(PluginConfig::default(), vec![Arc::new(Marble) as Arc<dyn CustomBlock>]).unwrap();
        let ids: Vec<String> = plugin
            .registry()
            .registered()
            .iter()
            .map(|block| block.block_id().to_owned())
            .collect();
        assert_eq!(ids, vec!["null", "marble"]);
    }

    #[test]
    fn test_enable_fails_on_taken_state() {
        struct Impostor;
        impl Breakable for Impostor {
            fn break_time(&self, _tool: &ItemStack) -> f64 {
                0.0
            }

            fn drops(&self, _tool: &ItemStack) -> Vec<ItemStack> {
                Vec::new()
            }
        }
        impl SoundEmitting for Impostor {}
        impl CustomBlock for Impostor {
            fn block_id(&self) -> &str {
                "impostor"
            }

            fn noteblock_state(&self) -> NoteblockState {
                NoteblockState::new(Instrument::Piano, 1, false)
            }
        }

        assert_matches!(
            enable(PluginConfig::default(), vec![Arc::new(Impostor) as Arc<dyn CustomBlock>]),
            Err(NotecraftError::RegistrationError(_))
        );
    }

    #[tokio::test]
    async fn test_disabled_rewrites_pass_packets_through() {
        let config = PluginConfig {
            rewrite_block_updates: false,
            ..PluginConfig::default()
        };
        let plugin = enable(config, Vec::new()).unwrap();
        let world = MemoryWorld::overworld(plugin.block_states().clone());

        let packet = RawPacket::from_packet(&BlockUpdatePacket {
            position: BlockPos::new(0, 64, 0),
            block_state: 700,
        })
        .unwrap();
        assert_eq!(plugin.on_packet_sending(&world, packet.clone()).await, packet);
    }

    #[tokio::test]
    async fn test_block_update_is_rewritten() {
        let plugin = enable(PluginConfig::default(), Vec::new()).unwrap();
        let world = MemoryWorld::overworld(plugin.block_states().clone());

        let packet = RawPacket::from_packet(&BlockUpdatePacket {
            position: BlockPos::new(0, 64, 0),
            block_state: 700,
        })
        .unwrap();
        let rewritten = plugin.on_packet_sending(&world, packet).await;
        assert_eq!(
            rewritten.decode::<BlockUpdatePacket>().unwrap().block_state,
            539
        );
    }

    #[tokio::test]
    async fn test_undecodable_packet_is_sent_unchanged() {
        let plugin = enable(PluginConfig::default(), Vec::new()).unwrap();
        let world = MemoryWorld::overworld(plugin.block_states().clone());

        let packet = RawPacket::new(0x09, vec![0x01]);
        assert_eq!(plugin.on_packet_sending(&world, packet.clone()).await, packet);

        let other = RawPacket::new(0x24, vec![1, 2, 3]);
        assert_eq!(plugin.on_packet_sending(&world, other.clone()).await, other);
    }

    #[test]
    fn test_block_break_forgets_custom_block() {
        let plugin = enable(PluginConfig::default(), Vec::new()).unwrap();
        let world = MemoryWorld::overworld(plugin.block_states().clone());
        let pos = BlockPos::new(-3, 70, 18);
        assert!(plugin
            .store()
            .place(&world, pos, &NullBlock, None, false, false)
            .unwrap());

        world.set_block(pos, 0);
        assert!(plugin.on_block_break(&world, pos).unwrap());
        assert!(!plugin.on_block_break(&world, pos).unwrap());

        let handle = world.load_chunk(pos.chunk_x(), pos.chunk_z());
        let chunk = read_chunk(&handle);
        assert_eq!(plugin.store().get_custom_block_type_at(&*chunk, pos).unwrap(), None);
    }
}
