// MIT License - Copyright (c) 2026 Peter Wright
// Connection and request handling

pub mod command;
pub mod connection;

pub use command::CommandEngine;
pub use connection::SatelConnection;
