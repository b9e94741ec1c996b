#![allow(dead_code)]

use bytes::BytesMut;
use notecraft::config::PluginConfig;
use notecraft::host::block_states::BlockStateRegistry;
use notecraft::host::chunk::read_chunk;
use notecraft::host::item::ItemIndex;
use notecraft::host::memory::{MemoryPlayer, MemoryWorld};
use notecraft::host::scheduler::{main_thread, MainThreadQueue};
use notecraft::host::world::{Player, World};
use notecraft::protocol::chunk_data::{ChunkDataPacket, ChunkSections};
use notecraft::protocol::codec::{PacketFrameCodec, RawPacket};
use notecraft::protocol::paletted_container::{block_index, ContainerFormat};
use notecraft::protocol::use_item_on::UseItemOnPacket;
use notecraft::types::{BlockPos, Direction, Hand};
use notecraft::{CustomBlock, NotecraftPlugin};
use std::sync::Arc;
use tokio_util::codec::{Decoder, Encoder};

pub const BIOME_BITS: u8 = 6;

pub fn block_states() -> Arc<BlockStateRegistry> {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/blocks.json");
    Arc::new(BlockStateRegistry::from_file(path).unwrap())
}

/// A plugin, an overworld with one player in it, and a running main thread
pub struct TestServer {
    pub plugin: NotecraftPlugin,
    pub items: ItemIndex,
    pub world: Arc<MemoryWorld>,
    pub player: Arc<MemoryPlayer>,
    pub main_thread: MainThreadQueue,
}

/// Must be called inside a tokio runtime, the main thread loop is spawned on it.
pub fn start_server(blocks: Vec<Arc<dyn CustomBlock>>) -> TestServer {
    let block_states = block_states();
    let mut items = ItemIndex::new();
    let plugin =
        NotecraftPlugin::enable(PluginConfig::default(), block_states.clone(), &mut items, blocks)
            .unwrap();

    let world = Arc::new(MemoryWorld::overworld(block_states));
    let player = Arc::new(MemoryPlayer::new("TestPlayer", world.clone()));
    let (main_thread, main_loop) = main_thread();
    tokio::spawn(main_loop.run());

    TestServer {
        plugin,
        items,
        world,
        player,
        main_thread,
    }
}

impl TestServer {
    pub fn hold(&self, block: &dyn CustomBlock) {
        self.player.set_item_in_hand(
            Hand::MainHand,
            block.make_item(self.plugin.registry().item_keys()),
        );
    }

    /// Sends a right click on `against` through the frame codec. Returns whether the server
    /// still gets the packet.
    pub async fn right_click(&self, against: BlockPos, face: Direction) -> bool {
        let packet = RawPacket::from_packet(&UseItemOnPacket {
            hand: Hand::MainHand,
            position: against,
            face,
            cursor_x: 0.5,
            cursor_y: 0.5,
            cursor_z: 0.5,
            inside_block: false,
            sequence: 1,
        })
        .unwrap();
        let received = round_trip(packet);

        let player: Arc<dyn Player> = self.player.clone();
        self.plugin
            .on_packet_receiving(&self.main_thread, player, &received)
            .await
    }

    /// The chunk packet the client would receive for a chunk, after rewriting
    pub async fn send_chunk(&self, chunk_x: i32, chunk_z: i32) -> ChunkDataPacket {
        let packet = {
            let handle = self.world.load_chunk(chunk_x, chunk_z);
            let chunk = read_chunk(&handle);
            chunk.to_packet(self.world.block_states(), BIOME_BITS).unwrap()
        };
        let raw = RawPacket::from_packet(&packet).unwrap();
        let sent = self
            .plugin
            .on_packet_sending(self.world.as_ref(), round_trip(raw))
            .await;
        round_trip(sent).decode::<ChunkDataPacket>().unwrap()
    }

    pub fn stored_type(&self, pos: BlockPos) -> Option<String> {
        let handle = self.world.load_chunk(pos.chunk_x(), pos.chunk_z());
        let chunk = read_chunk(&handle);
        self.plugin
            .store()
            .get_custom_block_type_at(&*chunk, pos)
            .unwrap()
    }
}

/// Encodes a packet into a length-prefixed frame and reads it back.
pub fn round_trip(packet: RawPacket) -> RawPacket {
    let mut codec = PacketFrameCodec;
    let mut frames = BytesMut::new();
    codec.encode(packet, &mut frames).unwrap();
    codec.decode(&mut frames).unwrap().unwrap()
}

/// Block state at chunk-local `x`, `z` and world `y` of an overworld chunk packet
pub fn block_in_packet(
    packet: &ChunkDataPacket,
    block_states: &BlockStateRegistry,
    x: i32,
    y: i32,
    z: i32,
) -> u32 {
    let sections = ChunkSections::decode(
        packet.data(),
        ContainerFormat::block_states(block_states.direct_bits()),
        ContainerFormat::biomes(BIOME_BITS),
    );
    assert!(sections.error.is_none());
    let offset = (y + 64) as usize;
    sections.sections[offset >> 4]
        .section
        .block_states
        .get(block_index(x as usize, offset & 15, z as usize))
        .unwrap()
}
