//! Result artifact surface: identifier codec, filesystem store, signed
//! download tickets, and the HTTP handlers tying them together.

pub mod handlers;
pub mod identifier;
pub mod store;
pub mod ticket;
