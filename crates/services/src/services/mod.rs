pub mod board;
pub mod board_api;
pub mod board_view;
pub mod config;
pub mod data_store;
pub mod drag_monitor;
pub mod move_resolver;
pub mod registry;
