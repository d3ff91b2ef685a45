#[macro_use]
extern crate log;

pub mod did;
pub mod errors;
pub mod protocols;
pub mod signature;
pub mod storage;
pub mod transport;
pub mod utils;
pub mod wallet;
