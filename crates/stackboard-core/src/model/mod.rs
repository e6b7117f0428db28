pub mod item;
pub mod patch;

pub use item::{Kind, ParseEnumError, State, TagOperator, UserRef, WorkItem};
pub use patch::Patch;
