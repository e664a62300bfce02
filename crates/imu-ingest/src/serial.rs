use crate::{spawn_reader, IngestError, SerialReader, TelemetryLink};
use serialport::SerialPort;
use std::sync::Arc;
use std::time::Duration;

pub fn open_imu_port(path: &str, baud_rate: u32) -> Result<Box<dyn SerialPort>, IngestError> {
    serialport::new(path, baud_rate)
        .open()
        .map_err(|e| match e.kind() {
            serialport::ErrorKind::NoDevice => IngestError::PortNotFound(path.to_string()),
            _ => IngestError::Io(e.to_string()),
        })
}

/// Start a [`SerialReader`] on `port`, treating `idle` of silence as the idle line.
pub fn spawn_serial_reader<const N: usize>(
    mut port: Box<dyn SerialPort>,
    link: Arc<TelemetryLink<N>>,
    idle: Duration,
) -> Result<SerialReader, IngestError> {
    port.set_timeout(idle)
        .map_err(|e| IngestError::Io(e.to_string()))?;
    spawn_reader(port, link)
}
