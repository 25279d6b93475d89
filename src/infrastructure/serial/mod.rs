// Serial module - Serial communication implementation
pub mod link;
pub mod ports;

pub use link::SerialLink;
pub use ports::{list_ports, PortInfo};
