pub mod color;
pub mod compose;
