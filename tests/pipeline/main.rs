#[path = "../support/mod.rs"]
mod support;

mod mover;
mod runner;
