use crate::error::NotecraftError;
use crate::host::block_states::BlockStateRegistry;
use crate::types::Result;
use std::fmt;

pub const MAX_NOTE: u8 = 24;

/// Note block instruments, in the order the client enumerates them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Instrument {
    Piano,
    BassDrum,
    SnareDrum,
    Sticks,
    BassGuitar,
    Flute,
    Bell,
    Guitar,
    Chime,
    Xylophone,
    IronXylophone,
    CowBell,
    Didgeridoo,
    Bit,
    Banjo,
    Pling,
    Zombie,
    Skeleton,
    Creeper,
    Dragon,
    WitherSkeleton,
    Piglin,
    CustomHead,
}

impl Instrument {
    pub const ALL: [Instrument; 23] = [
        Instrument::Piano,
        Instrument::BassDrum,
        Instrument::SnareDrum,
        Instrument::Sticks,
        Instrument::BassGuitar,
        Instrument::Flute,
        Instrument::Bell,
        Instrument::Guitar,
        Instrument::Chime,
        Instrument::Xylophone,
        Instrument::IronXylophone,
        Instrument::CowBell,
        Instrument::Didgeridoo,
        Instrument::Bit,
        Instrument::Banjo,
        Instrument::Pling,
        Instrument::Zombie,
        Instrument::Skeleton,
        Instrument::Creeper,
        Instrument::Dragon,
        Instrument::WitherSkeleton,
        Instrument::Piglin,
        Instrument::CustomHead,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Value of the `instrument` block state property
    pub fn wire_name(self) -> &'static str {
        match self {
            Instrument::Piano => "harp",
            Instrument::BassDrum => "basedrum",
            Instrument::SnareDrum => "snare",
            Instrument::Sticks => "hat",
            Instrument::BassGuitar => "bass",
            Instrument::Flute => "flute",
            Instrument::Bell => "bell",
            Instrument::Guitar => "guitar",
            Instrument::Chime => "chime",
            Instrument::Xylophone => "xylophone",
            Instrument::IronXylophone => "iron_xylophone",
            Instrument::CowBell => "cow_bell",
            Instrument::Didgeridoo => "didgeridoo",
            Instrument::Bit => "bit",
            Instrument::Banjo => "banjo",
            Instrument::Pling => "pling",
            Instrument::Zombie => "zombie",
            Instrument::Skeleton => "skeleton",
            Instrument::Creeper => "creeper",
            Instrument::Dragon => "dragon",
            Instrument::WitherSkeleton => "wither_skeleton",
            Instrument::Piglin => "piglin",
            Instrument::CustomHead => "custom_head",
        }
    }

    pub fn api_name(self) -> &'static str {
        match self {
            Instrument::Piano => "PIANO",
            Instrument::BassDrum => "BASS_DRUM",
            Instrument::SnareDrum => "SNARE_DRUM",
            Instrument::Sticks => "STICKS",
            Instrument::BassGuitar => "BASS_GUITAR",
            Instrument::Flute => "FLUTE",
            Instrument::Bell => "BELL",
            Instrument::Guitar => "GUITAR",
            Instrument::Chime => "CHIME",
            Instrument::Xylophone => "XYLOPHONE",
            Instrument::IronXylophone => "IRON_XYLOPHONE",
            Instrument::CowBell => "COW_BELL",
            Instrument::Didgeridoo => "DIDGERIDOO",
            Instrument::Bit => "BIT",
            Instrument::Banjo => "BANJO",
            Instrument::Pling => "PLING",
            Instrument::Zombie => "ZOMBIE",
            Instrument::Skeleton => "SKELETON",
            Instrument::Creeper => "CREEPER",
            Instrument::Dragon => "DRAGON",
            Instrument::WitherSkeleton => "WITHER_SKELETON",
            Instrument::Piglin => "PIGLIN",
            Instrument::CustomHead => "CUSTOM_HEAD",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.wire_name() == name)
    }
}

/// The instrument, note and powered combination a custom block shows up as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteblockState {
    instrument: Instrument,
    note: u8,
    powered: bool,
}

impl NoteblockState {
    pub fn of(instrument: Instrument, note: u8, powered: bool) -> Result<Self> {
        if note > MAX_NOTE {
            return Err(NotecraftError::RegistrationError(format!(
                "Note {} is out of range! Must be 0 <= note <= {}.",
                note, MAX_NOTE
            )));
        }
        Ok(Self {
            instrument,
            note,
            powered,
        })
    }

    /// Const constructor for states known at compile time.
    ///
    /// # Panics
    /// If `note` is above [`MAX_NOTE`]. In a `const` item this is a compile error.
    pub const fn new(instrument: Instrument, note: u8, powered: bool) -> Self {
        assert!(note <= MAX_NOTE, "note out of range");
        Self {
            instrument,
            note,
            powered,
        }
    }

    pub const DEFAULT_POWERED: NoteblockState = NoteblockState {
        instrument: Instrument::Piano,
        note: 0,
        powered: true,
    };

    pub const DEFAULT_UNPOWERED: NoteblockState = NoteblockState {
        instrument: Instrument::Piano,
        note: 0,
        powered: false,
    };

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// The two states a plain note block can be in. Never given to a custom block.
    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT_POWERED || *self == Self::DEFAULT_UNPOWERED
    }

    /// Dense index over every state, also used as the item's custom model data
    pub fn ordinal(&self) -> i32 {
        (self.instrument.index() * 50 + self.note as usize * 2 + self.powered as usize) as i32
    }

    pub fn from_ordinal(ordinal: i32) -> Option<Self> {
        if !(0..(Instrument::ALL.len() as i32 * 50)).contains(&ordinal) {
            return None;
        }
        let ordinal = ordinal as usize;
        Some(Self {
            instrument: Instrument::ALL[ordinal / 50],
            note: ((ordinal % 50) / 2) as u8,
            powered: ordinal % 2 == 1,
        })
    }

    /// Global block state ID of the note block showing this state
    pub fn state_id(&self, registry: &BlockStateRegistry) -> Option<u32> {
        registry.note_block_state_id(self.instrument.wire_name(), self.note, self.powered)
    }
}

impl fmt::Display for NoteblockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.instrument.api_name(),
            self.note,
            if self.powered { "POWERED" } else { "UNPOWERED" }
        )
    }
}
