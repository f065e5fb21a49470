pub mod cli;
pub mod client;
pub mod config;
pub mod controller;
pub mod geo;
pub mod input;
pub mod session;
pub mod surface;
pub mod view;
