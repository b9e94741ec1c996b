pub mod coords;
pub mod definition;
pub mod incoming;
pub mod material_info;
pub mod noteblock;
pub mod null_block;
pub mod outgoing;
pub mod registry;
pub mod snapshot;
pub mod store;
