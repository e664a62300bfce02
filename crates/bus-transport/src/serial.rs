use crate::{DriveEnable, HalfDuplexBus, PortInfo, Result, TransportError, WriterLink};
use serialport::{SerialPort, SerialPortType};
use std::time::Duration;

fn port_error(path: &str, e: serialport::Error) -> TransportError {
    match e.kind() {
        serialport::ErrorKind::NoDevice => TransportError::PortNotFound(path.to_string()),
        _ => TransportError::Io(e.to_string()),
    }
}

/// Host serial port as the bus peripheral.
pub type SerialPortLink = WriterLink<Box<dyn SerialPort>>;

/// RS-485 direction control on the RTS line.
pub struct RtsDriveEnable {
    port: Box<dyn SerialPort>,
    active_high: bool,
}

impl RtsDriveEnable {
    pub fn new(port: Box<dyn SerialPort>, active_high: bool) -> Self {
        Self { port, active_high }
    }
}

impl DriveEnable for RtsDriveEnable {
    fn set_drive(&mut self, asserted: bool) -> Result<()> {
        let level = asserted == self.active_high;
        self.port
            .write_request_to_send(level)
            .map_err(|e| TransportError::Io(e.to_string()))
    }
}

/// Open `path` as a half-duplex bus with RTS as drive-enable (active high).
pub fn open_half_duplex(
    path: &str,
    baud_rate: u32,
    tx_timeout: Duration,
) -> Result<HalfDuplexBus<SerialPortLink, RtsDriveEnable>> {
    let port = serialport::new(path, baud_rate)
        .timeout(tx_timeout)
        .open()
        .map_err(|e| port_error(path, e))?;
    let rts = port.try_clone().map_err(|e| port_error(path, e))?;
    let mut drive = RtsDriveEnable::new(rts, true);
    drive.set_drive(false)?;
    tracing::info!(port = path, baud_rate, "half-duplex bus opened");
    Ok(HalfDuplexBus::new(WriterLink::new(port), drive).with_timeout(tx_timeout))
}

pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().map_err(|e| TransportError::Io(e.to_string()))?;
    Ok(ports
        .into_iter()
        .map(|p| {
            let driver = match p.port_type {
                SerialPortType::UsbPort(_) => "usb-serial",
                SerialPortType::BluetoothPort => "bluetooth",
                _ => "serial",
            };
            PortInfo {
                name: p.port_name,
                driver: driver.to_string(),
            }
        })
        .collect())
}
