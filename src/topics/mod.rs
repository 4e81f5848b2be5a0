// Topics — entity annotation for new messages and the hot-topics aggregator.

pub mod aggregator;
pub mod entities;
pub mod traits;
