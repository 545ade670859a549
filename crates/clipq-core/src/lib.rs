pub mod config;
pub mod logging;

pub mod clipfile;
pub mod control;
pub mod events;
pub mod queue;
pub mod resolve;
pub mod runner;
pub mod timecode;
