use crate::blocks::material_info::{blocks_placement, is_interactable, is_replaceable};
use crate::blocks::registry::BlockRegistry;
use crate::blocks::store::PersistentBlockStore;
use crate::host::event::{CustomBlockPlaceEvent, EventBus};
use crate::host::scheduler::{run_on_main, MainThreadExecutor};
use crate::host::world::Player;
use crate::logger::{log, LogSeverity};
use crate::protocol::use_item_on::UseItemOnPacket;
use crate::types::{BoundingBox, Result};
use std::sync::Arc;

/// Turns a right click with a custom block item into a custom block placement.
pub struct PlacementInterceptor {
    registry: Arc<BlockRegistry>,
    store: PersistentBlockStore,
    events: Arc<EventBus<CustomBlockPlaceEvent>>,
}

impl PlacementInterceptor {
    pub fn new(
        registry: Arc<BlockRegistry>,
        store: PersistentBlockStore,
        events: Arc<EventBus<CustomBlockPlaceEvent>>,
    ) -> Self {
        Self {
            registry,
            store,
            events,
        }
    }

    /// Called from the network task. Runs the placement on the main thread and waits for it.
    /// Returns whether the packet must be dropped because a custom block was placed.
    pub async fn intercept(
        self: &Arc<Self>,
        executor: &dyn MainThreadExecutor,
        player: Arc<dyn Player>,
        packet: UseItemOnPacket,
    ) -> Result<bool> {
        let interceptor = self.clone();
        run_on_main(executor, move || {
            interceptor.handle_use_item_on(player.as_ref(), &packet)
        })
        .await?
    }

    /// Main thread only. Returns whether a custom block was placed.
    pub fn handle_use_item_on(&self, player: &dyn Player, packet: &UseItemOnPacket) -> Result<bool> {
        let item = player.item_in_hand(packet.hand);
        let Some(block) = self.registry.find_by_held_item(&item) else {
            return Ok(false);
        };

        let world = player.world();
        let block_states = world.block_states();
        let against = packet.position;
        let against_state = world.block_at(against);

        if !player.is_sneaking() && is_interactable(block_states, against_state) {
            return Ok(false);
        }
        let placed = if is_replaceable(block_states, against_state) {
            against
        } else {
            against.relative(packet.face)
        };

        if placed.y < world.min_height() || placed.y >= world.max_height() {
            return Ok(false);
        }
        let replaced_state = world.block_at(placed);
        if placed != against
            && !block_states.is_air(replaced_state)
            && !is_replaceable(block_states, replaced_state)
        {
            return Ok(false);
        }

        let cell = BoundingBox::of_block(placed);
        if world.nearby_entities(&cell).iter().any(blocks_placement) {
            return Ok(false);
        }

        let Some(disguise) = block_states.default_note_block_id() else {
            return Ok(false);
        };
        world.set_block(placed, disguise);

        let mut event = CustomBlockPlaceEvent::new(
            block.clone(),
            placed,
            replaced_state,
            against,
            item,
            player.uuid(),
            packet.hand,
            player.can_build(placed),
        );
        self.events.publish(&mut event);

        if !event.is_allowed() {
            world.set_block(placed, replaced_state);
            log(
                format!(
                    "Placement of '{}' by {} was cancelled",
                    block.block_id(),
                    player.name()
                ),
                LogSeverity::Debug,
            );
            return Ok(false);
        }

        match self
            .store
            .place(world.as_ref(), placed, block.as_ref(), Some(player), true, true)
        {
            Ok(done) => Ok(done),
            Err(err) => {
                world.set_block(placed, replaced_state);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::definition::{CustomBlock, ItemKeys};
    use crate::blocks::null_block::NullBlock;
    use crate::blocks::registry::BlockRegistryBuilder;
    use crate::host::block_states::fixture;
    use crate::host::chunk::read_chunk;
    use crate::host::entity::{EntityInfo, EntityKind};
    use crate::host::event::Cancellable;
    use crate::host::item::{ItemIndex, ItemStack};
    use crate::host::memory::{MemoryPlayer, MemoryWorld};
    use crate::host::scheduler::main_thread;
    use crate::host::world::World;
    use crate::types::{BlockPos, Direction, Hand};

    struct Setup {
        world: Arc<MemoryWorld>,
        player: Arc<MemoryPlayer>,
        store: PersistentBlockStore,
        events: Arc<EventBus<CustomBlockPlaceEvent>>,
        interceptor: Arc<PlacementInterceptor>,
    }

    fn setup() -> Setup {
        let mut builder = BlockRegistryBuilder::new(ItemKeys::new("notecraft").unwrap());
        builder
            .register(&mut ItemIndex::new(), NullBlock::default)
            .unwrap();
        let registry = builder.freeze();

        let world = Arc::new(MemoryWorld::overworld(Arc::new(fixture())));
        let player = Arc::new(MemoryPlayer::new("Steve", world.clone()));
        player.set_item_in_hand(Hand::MainHand, NullBlock.make_item(registry.item_keys()));

        let store = PersistentBlockStore::new("notecraft").unwrap();
        let events = Arc::new(EventBus::new());
        let interceptor = Arc::new(PlacementInterceptor::new(
            registry,
            store.clone(),
            events.clone(),
        ));
        Setup {
            world,
            player,
            store,
            events,
            interceptor,
        }
    }

    fn click(position: BlockPos, face: Direction) -> UseItemOnPacket {
        UseItemOnPacket {
            hand: Hand::MainHand,
            position,
            face,
            cursor_x: 0.5,
            cursor_y: 1.0,
            cursor_z: 0.5,
            inside_block: false,
            sequence: 1,
        }
    }

    fn stored_type(setup: &Setup, pos: BlockPos) -> Option<String> {
        let handle = setup.world.load_chunk(pos.chunk_x(), pos.chunk_z());
        let chunk = read_chunk(&handle);
        setup.store.get_custom_block_type_at(&*chunk, pos).unwrap()
    }

    #[test]
    fn test_places_on_top_of_clicked_face() {
        let setup = setup();
        let floor = BlockPos::new(3, 63, 7);
        setup.world.set_block(floor, 1);

        let placed = setup
            .interceptor
            .handle_use_item_on(setup.player.as_ref(), &click(floor, Direction::Up))
            .unwrap();
        assert!(placed);

        let pos = BlockPos::new(3, 64, 7);
        assert_eq!(setup.world.block_at(pos), 539);
        assert_eq!(stored_type(&setup, pos), Some("null".to_owned()));
        assert_eq!(setup.world.played_sounds().len(), 1);
    }

    #[test]
    fn test_replaceable_target_is_replaced() {
        let setup = setup();
        let grass = BlockPos::new(0, 64, 0);
        setup.world.set_block(grass, 2005);

        assert!(setup
            .interceptor
            .handle_use_item_on(setup.player.as_ref(), &click(grass, Direction::Up))
            .unwrap());
        assert_eq!(setup.world.block_at(grass), 539);
        assert_eq!(setup.world.block_at(grass.relative(Direction::Up)), 0);
    }

    #[test]
    fn test_interactable_target_needs_sneaking() {
        let setup = setup();
        let chest = BlockPos::new(0, 64, 0);
        setup.world.set_block(chest, 2955);
        let packet = click(chest, Direction::Up);

        assert!(!setup
            .interceptor
            .handle_use_item_on(setup.player.as_ref(), &packet)
            .unwrap());
        assert_eq!(setup.world.block_at(BlockPos::new(0, 65, 0)), 0);

        setup.player.set_sneaking(true);
        assert!(setup
            .interceptor
            .handle_use_item_on(setup.player.as_ref(), &packet)
            .unwrap());
        assert_eq!(setup.world.block_at(BlockPos::new(0, 65, 0)), 539);
    }

    #[test]
    fn test_entities_block_placement() {
        let setup = setup();
        let floor = BlockPos::new(0, 63, 0);
        let cell = BlockPos::new(0, 64, 0);
        setup.world.set_block(floor, 1);

        setup.world.add_entity(EntityInfo::new(
            EntityKind::Item,
            BoundingBox::around_feet(0.5, 64.0, 0.5, 0.25, 0.25),
        ));
        setup.world.add_entity(EntityInfo::new(
            EntityKind::Cow,
            BoundingBox::around_feet(0.5, 64.0, 0.5, 0.9, 1.4),
        ));
        assert!(!setup
            .interceptor
            .handle_use_item_on(setup.player.as_ref(), &click(floor, Direction::Up))
            .unwrap());
        assert_eq!(setup.world.block_at(cell), 0);
        assert_eq!(stored_type(&setup, cell), None);
    }

    #[test]
    fn test_ghost_entities_do_not_block_placement() {
        let setup = setup();
        let floor = BlockPos::new(0, 63, 0);
        setup.world.set_block(floor, 1);
        setup.world.add_entity(EntityInfo::new(
            EntityKind::Item,
            BoundingBox::around_feet(0.5, 64.0, 0.5, 0.25, 0.25),
        ));

        assert!(setup
            .interceptor
            .handle_use_item_on(setup.player.as_ref(), &click(floor, Direction::Up))
            .unwrap());
    }

    #[test]
    fn test_cancelled_event_restores_block() {
        let setup = setup();
        let grass = BlockPos::new(0, 64, 0);
        setup.world.set_block(grass, 2005);
        setup.events.subscribe(|event| {
            assert_eq!(event.replaced_state, 2005);
            assert_eq!(event.block.block_id(), "null");
            event.set_cancelled(true);
        });

        assert!(!setup
            .interceptor
            .handle_use_item_on(setup.player.as_ref(), &click(grass, Direction::Up))
            .unwrap());
        assert_eq!(setup.world.block_at(grass), 2005);
        assert_eq!(stored_type(&setup, grass), None);
        assert!(setup.world.played_sounds().is_empty());
    }

    #[test]
    fn test_other_items_are_ignored() {
        let setup = setup();
        setup
            .player
            .set_item_in_hand(Hand::MainHand, ItemStack::new("paper", 1));
        let floor = BlockPos::new(0, 63, 0);
        setup.world.set_block(floor, 1);

        assert!(!setup
            .interceptor
            .handle_use_item_on(setup.player.as_ref(), &click(floor, Direction::Up))
            .unwrap());
        assert_eq!(setup.world.block_at(BlockPos::new(0, 64, 0)), 0);
    }

    #[test]
    fn test_solid_destination_is_left_alone() {
        let setup = setup();
        let floor = BlockPos::new(0, 63, 0);
        let above = BlockPos::new(0, 64, 0);
        setup.world.set_block(floor, 1);
        setup.world.set_block(above, 10);

        assert!(!setup
            .interceptor
            .handle_use_item_on(setup.player.as_ref(), &click(floor, Direction::Up))
            .unwrap());
        assert_eq!(setup.world.block_at(above), 10);
    }

    #[tokio::test]
    async fn test_intercept_runs_on_main_thread() {
        let setup = setup();
        let (queue, main_loop) = main_thread();
        tokio::spawn(main_loop.run());

        let floor = BlockPos::new(5, 63, 5);
        setup.world.set_block(floor, 1);
        let player: Arc<dyn Player> = setup.player.clone();
        let cancel = setup
            .interceptor
            .intercept(&queue, player, click(floor, Direction::Up))
            .await
            .unwrap();

        assert!(cancel);
        assert_eq!(setup.world.block_at(BlockPos::new(5, 64, 5)), 539);
    }
}
