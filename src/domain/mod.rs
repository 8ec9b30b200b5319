pub mod conflict;
pub mod grid;
pub mod timer;
