use crate::blocks::definition::{Breakable, CustomBlock, SoundEmitting, SoundGroup};
use crate::blocks::noteblock::{Instrument, NoteblockState};
use crate::host::item::ItemStack;

const STATE: NoteblockState = NoteblockState::new(Instrument::Piano, 1, false);

/// "Block of Null". Indestructible and drops nothing; registered by the plugin itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBlock;

impl Breakable for NullBlock {
    fn break_time(&self, _tool: &ItemStack) -> f64 {
        0.0
    }

    fn drops(&self, _tool: &ItemStack) -> Vec<ItemStack> {
        Vec::new()
    }

    fn is_indestructible(&self) -> bool {
        true
    }
}

impl SoundEmitting for NullBlock {
    fn sound_group(&self) -> Option<SoundGroup> {
        Some(SoundGroup::stone())
    }
}

impl CustomBlock for NullBlock {
    fn block_id(&self) -> &str {
        "null"
    }

    fn noteblock_state(&self) -> NoteblockState {
        STATE
    }

    fn display_name(&self) -> String {
        "Block of Null".to_owned()
    }
}
