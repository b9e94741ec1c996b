pub mod block_update;
pub mod chunk_data;
pub mod codec;
pub mod nbt;
pub mod packet;
pub mod paletted_container;
pub mod section_blocks_update;
pub mod use_item_on;
