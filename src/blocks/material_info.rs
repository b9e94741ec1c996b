use crate::host::block_states::BlockStateRegistry;
use crate::host::entity::{EntityInfo, EntityKind};

/// Blocks a placement goes into instead of next to
const REPLACEABLE: &[&str] = &[
    "hanging_roots",
    "glow_lichen",
    "sculk_vein",
    "short_grass",
    "tall_grass",
    "tall_seagrass",
    "fern",
    "large_fern",
    "dead_bush",
    "vine",
    "warped_roots",
    "crimson_roots",
    "nether_sprouts",
    "seagrass",
    "fire",
    "soul_fire",
];

const INTERACTABLE: &[&str] = &[
    "chest",
    "trapped_chest",
    "ender_chest",
    "lever",
    "daylight_detector",
    "brewing_stand",
    "comparator",
    "repeater",
    "grindstone",
    "lectern",
    "furnace",
    "blast_furnace",
    "smoker",
    "note_block",
    "crafting_table",
    "anvil",
    "chipped_anvil",
    "damaged_anvil",
    "cauldron",
    "composter",
    "loom",
    "stonecutter",
    "bell",
    "cartography_table",
];

const INTERACTABLE_SUFFIXES: &[&str] = &[
    "_door",
    "_trapdoor",
    "_fence_gate",
    "_button",
    "_bed",
    "_sign",
    "_hanging_sign",
];

/// Whether placing against the block puts the new block in its place, e.g. grass or a single
/// snow layer.
pub fn is_replaceable(block_states: &BlockStateRegistry, state: u32) -> bool {
    match block_states.block_name(state) {
        Some("snow") => block_states.property(state, "layers") == Some("1"),
        Some(name) => REPLACEABLE.contains(&name),
        None => false,
    }
}

/// Whether right clicking the block does something, so a placement only happens when sneaking.
pub fn is_interactable(block_states: &BlockStateRegistry, state: u32) -> bool {
    match block_states.block_name(state) {
        Some("jukebox") => block_states.property(state, "has_record") == Some("true"),
        Some(name) => {
            INTERACTABLE.contains(&name)
                || INTERACTABLE_SUFFIXES
                    .iter()
                    .any(|suffix| name.ends_with(suffix))
        }
        None => false,
    }
}

/// Entities that never stop a block from being placed inside them
pub fn is_ghost_entity(kind: EntityKind) -> bool {
    use EntityKind::*;
    matches!(
        kind,
        ExperienceOrb
            | Item
            | Arrow
            | SpectralArrow
            | Trident
            | Snowball
            | Egg
            | EnderPearl
            | Potion
            | Fireball
            | SmallFireball
            | DragonFireball
            | WitherSkull
            | ShulkerBullet
            | LlamaSpit
            | FireworkRocket
            | FishingBobber
            | Painting
            | ItemFrame
            | GlowItemFrame
            | LeashKnot
            | EyeOfEnder
            | FallingBlock
            | LightningBolt
            | EvokerFangs
            | Marker
            | BlockDisplay
            | ItemDisplay
            | TextDisplay
            | Interaction
            | AreaEffectCloud
    )
}

pub fn blocks_placement(entity: &EntityInfo) -> bool {
    !entity.dead && !is_ghost_entity(entity.kind)
}
