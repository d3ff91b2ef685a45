#[macro_use]
extern crate log;

pub mod a2a;
pub mod ack;
pub mod didexchange;
pub mod thread;
pub mod utils;
