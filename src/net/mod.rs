pub mod api;
pub mod worker;
