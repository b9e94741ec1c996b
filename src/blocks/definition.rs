use crate::blocks::noteblock::{Instrument, NoteblockState};
use crate::host::container::NamespacedKey;
use crate::host::item::ItemStack;
use crate::types::Result;
use std::any::Any;
use std::sync::Arc;

/// Sounds a block makes, as sound event names
#[derive(Debug, Clone, PartialEq)]
pub struct SoundGroup {
    pub break_sound: String,
    pub step_sound: String,
    pub place_sound: String,
    pub hit_sound: String,
    pub fall_sound: String,
    pub volume: f32,
    pub pitch: f32,
}

impl SoundGroup {
    fn named(material: &str) -> Self {
        Self {
            break_sound: format!("block.{}.break", material),
            step_sound: format!("block.{}.step", material),
            place_sound: format!("block.{}.place", material),
            hit_sound: format!("block.{}.hit", material),
            fall_sound: format!("block.{}.fall", material),
            volume: 1.0,
            pitch: 1.0,
        }
    }

    pub fn stone() -> Self {
        Self::named("stone")
    }

    pub fn wood() -> Self {
        Self::named("wood")
    }
}

/// Item tag keys that mark an item stack as a custom block item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemKeys {
    pub custom_item_id: NamespacedKey,
    pub custom_block: NamespacedKey,
}

impl ItemKeys {
    pub fn new(namespace: &str) -> Result<Self> {
        Ok(Self {
            custom_item_id: NamespacedKey::new(namespace, "custom_item_id")?,
            custom_block: NamespacedKey::new(namespace, "custom_block")?,
        })
    }
}

pub trait Breakable {
    /// Seconds to break the block with `tool`
    fn break_time(&self, tool: &ItemStack) -> f64;

    fn is_preferred_tool(&self, _tool: &ItemStack) -> bool {
        false
    }

    fn requires_preferred_tool_for_drops(&self) -> bool {
        false
    }

    fn drops(&self, tool: &ItemStack) -> Vec<ItemStack>;

    fn is_indestructible(&self) -> bool {
        false
    }
}

pub trait SoundEmitting {
    fn sound_group(&self) -> Option<SoundGroup> {
        None
    }
}

/// Lets the registry recover the concrete type behind a `dyn CustomBlock`.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A block type that exists only on the server. Clients see it as a note block in the state
/// returned by [`CustomBlock::noteblock_state`].
pub trait CustomBlock: AsAny + Breakable + SoundEmitting {
    /// Unique ID, `[a-zA-Z0-9_-]+`
    fn block_id(&self) -> &str;

    fn noteblock_state(&self) -> NoteblockState;

    /// Material of the item that places this block. Doesn't affect the placed block.
    fn base_material(&self) -> &str {
        "paper"
    }

    fn display_name(&self) -> String {
        self.block_id().to_owned()
    }

    fn custom_model_data(&self) -> i32 {
        self.noteblock_state().ordinal()
    }

    fn instrument(&self) -> Instrument {
        self.noteblock_state().instrument()
    }

    fn note(&self) -> u8 {
        self.noteblock_state().note()
    }

    fn is_powered(&self) -> bool {
        self.noteblock_state().is_powered()
    }

    /// A fresh stack of one of this block's item.
    fn make_item(&self, keys: &ItemKeys) -> ItemStack {
        let mut item = ItemStack::new(self.base_material(), 1);
        item.custom_model_data = Some(self.custom_model_data());
        item.display_name = Some(self.display_name());
        item.tags
            .set_string(keys.custom_item_id.clone(), self.block_id());
        item.tags.set_bool(keys.custom_block.clone(), true);
        item
    }

    /// Whether `item` places this block: same base material, flagged as a block item, and
    /// carrying this block's ID.
    fn is_block_item(&self, item: &ItemStack, keys: &ItemKeys) -> bool {
        item.material == self.base_material()
            && item.tags.get_bool(&keys.custom_block).unwrap_or(false)
            && item.tags.get_string(&keys.custom_item_id) == Some(self.block_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marble;

    impl Breakable for Marble {
        fn break_time(&self, _tool: &ItemStack) -> f64 {
            1.5
        }

        fn drops(&self, _tool: &ItemStack) -> Vec<ItemStack> {
            vec![ItemStack::new("paper", 1)]
        }
    }

    impl SoundEmitting for Marble {}

    impl CustomBlock for Marble {
        fn block_id(&self) -> &str {
            "marble"
        }

        fn noteblock_state(&self) -> NoteblockState {
            NoteblockState::of(Instrument::Flute, 3, true).unwrap()
        }
    }

    #[test]
    fn test_made_item_is_recognised() {
        let keys = ItemKeys::new("notecraft").unwrap();
        let item = Marble.make_item(&keys);
        assert_eq!(item.material, "paper");
        assert_eq!(item.custom_model_data, Some(5 * 50 + 3 * 2 + 1));
        assert!(Marble.is_block_item(&item, &keys));

        let mut plain = ItemStack::new("paper", 1);
        assert!(!Marble.is_block_item(&plain, &keys));
        plain.tags.set_string(keys.custom_item_id.clone(), "marble");
        assert!(!Marble.is_block_item(&plain, &keys));

        let mut other_material = item.clone();
        other_material.material = "stick".to_owned();
        assert!(!Marble.is_block_item(&other_material, &keys));
    }

    #[test]
    fn test_defaults() {
        assert!(!Marble.is_indestructible());
        assert!(Marble.sound_group().is_none());
        assert_eq!(Marble.instrument(), Instrument::Flute);
        assert_eq!(SoundGroup::stone().place_sound, "block.stone.place");
    }
}
