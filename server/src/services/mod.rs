pub mod capacity;
pub mod events;
pub mod scheduler;
