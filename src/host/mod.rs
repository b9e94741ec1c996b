//! Host-side collaborators: the server objects the custom block core reads and mutates.

pub mod block_states;
pub mod chunk;
pub mod container;
pub mod entity;
pub mod event;
pub mod item;
pub mod memory;
pub mod scheduler;
pub mod world;
