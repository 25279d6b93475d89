//! picoctl Library
//!
//! Line-oriented command sessions with a Raspberry Pi Pico over USB serial,
//! plus a codec for the Brain <-> Spine message contract.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;
pub mod protocol;

pub use core::session::{run_interactive, CommandSession, LoopOutcome, Reply, SessionState};
pub use core::transport::{Delay, SimulatedDevice, ThreadDelay, Transport};
pub use domain::config::{CommandTable, DeviceConfig, PicoCtlConfig};
pub use domain::error::{PicoCtlError, PicoCtlResult};
pub use infrastructure::serial::SerialLink;
