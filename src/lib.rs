pub mod applier;
pub mod config;
pub mod data;
pub mod frames;
pub mod logging;
pub mod participant;
pub mod publisher;
pub mod registry;
pub mod scene;
pub mod sensors;
pub mod session;
pub mod transport;
pub mod viewer;
