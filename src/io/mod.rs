//! Side-effecting adapters: subprocess probing, the engine variable store,
//! hardware facts, session placement, and the console frontend.

pub mod command;
pub mod console;
pub mod facts;
pub mod session;
pub mod store;
