use crate::domain::error::{PicoCtlError, PicoCtlResult};
use serde::Serialize;
use serialport::SerialPortType;

/// Raspberry Pi USB vendor id, reported by Pico boards in CDC mode
pub const RASPBERRY_PI_VID: u16 = 0x2E8A;

/// A serial port visible to the host
#[derive(Debug, Clone, Serialize)]
pub struct PortInfo {
    pub name: String,
    pub kind: String,
    pub description: Option<String>,
    pub is_pico: bool,
}

impl PortInfo {
    fn from_serialport(info: serialport::SerialPortInfo) -> Self {
        let (kind, description, is_pico) = match &info.port_type {
            SerialPortType::UsbPort(usb) => (
                format!("usb {:04x}:{:04x}", usb.vid, usb.pid),
                usb.product.clone().or_else(|| usb.manufacturer.clone()),
                usb.vid == RASPBERRY_PI_VID,
            ),
            SerialPortType::PciPort => ("pci".to_string(), None, false),
            SerialPortType::BluetoothPort => ("bluetooth".to_string(), None, false),
            SerialPortType::Unknown => ("unknown".to_string(), None, false),
        };

        Self {
            name: info.port_name,
            kind,
            description,
            is_pico,
        }
    }
}

/// List serial ports, Pico boards first
pub fn list_ports() -> PicoCtlResult<Vec<PortInfo>> {
    let ports = serialport::available_ports()
        .map_err(|e| PicoCtlError::Transport(std::io::Error::from(e)))?;

    let mut ports: Vec<PortInfo> = ports.into_iter().map(PortInfo::from_serialport).collect();
    ports.sort_by(|a, b| b.is_pico.cmp(&a.is_pico).then_with(|| a.name.cmp(&b.name)));
    Ok(ports)
}
