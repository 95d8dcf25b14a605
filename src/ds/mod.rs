pub mod index_table;
pub mod recency_queue;
pub mod slot_arena;

pub use index_table::IndexTable;
pub use recency_queue::RecencyQueue;
pub use slot_arena::{SlotArena, SlotId};
