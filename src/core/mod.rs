// Core module - Command sessions and the transports they drive
pub mod session;
pub mod transport;
