// Chat log — message models, the windowed subscription, and the compose flows
// that append text and image messages.

pub mod compose;
pub mod log;
pub mod models;
pub mod storage;
