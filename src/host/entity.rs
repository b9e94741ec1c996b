use crate::types::BoundingBox;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    Zombie,
    Skeleton,
    Creeper,
    Cow,
    Pig,
    ArmorStand,
    Minecart,
    Boat,
    ExperienceOrb,
    Item,
    Arrow,
    SpectralArrow,
    Trident,
    Snowball,
    Egg,
    EnderPearl,
    Potion,
    Fireball,
    SmallFireball,
    DragonFireball,
    WitherSkull,
    ShulkerBullet,
    LlamaSpit,
    FireworkRocket,
    FishingBobber,
    Painting,
    ItemFrame,
    GlowItemFrame,
    LeashKnot,
    EyeOfEnder,
    FallingBlock,
    LightningBolt,
    EvokerFangs,
    Marker,
    BlockDisplay,
    ItemDisplay,
    TextDisplay,
    Interaction,
    AreaEffectCloud,
}

/// What the world reports about an entity near a block
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInfo {
    pub uuid: Uuid,
    pub kind: EntityKind,
    pub bounding_box: BoundingBox,
    pub dead: bool,
}

impl EntityInfo {
    pub fn new(kind: EntityKind, bounding_box: BoundingBox) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            kind,
            bounding_box,
            dead: false,
        }
    }
}
