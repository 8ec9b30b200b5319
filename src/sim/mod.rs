pub mod controller;
pub mod event;
pub mod install;
pub mod queue;
pub mod settings;
pub mod view;
