use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::cell::RefCell;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use bus_transport::{
    DriveEnable, HalfDuplexBus, MockWire, SentFrame, SerialLink, StdDelay, Timestamp,
};
use dxl_protocol::{
    decode_sync_write, ControlAddress, DataWidth, ProtocolVersion, SyncEntry, SyncWrite,
};
use imu_ingest::{parse_attitude, PollOutcome, TelemetryIngest};
use leg_control::{ControlConfig, LegController, MetricsHub};
use motor_registry::LEG_COUNT;

#[derive(Parser, Debug)]
#[command(
    name = "wl",
    version,
    about = "Wheel-leg motor bus and attitude telemetry tool",
    disable_help_subcommand = true
)]
struct Cli {
    /// YAML control config (ports, timing, frame limits, motor table)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Bus backend
    #[arg(long, value_enum, default_value_t = Backend::Mock, global = true)]
    backend: Backend,

    /// Print Prometheus metrics when the command finishes
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    metrics: bool,

    /// Write transmitted frames to an NDJSON file
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Backend {
    Mock,
    Serial,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Switch {
    On,
    Off,
}

impl Switch {
    fn on(self) -> bool {
        self == Switch::On
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a broadcast sync-write frame and print it as hex
    FrameBuild {
        /// Protocol generation (1 or 2)
        #[arg(long, default_value_t = 2u8)]
        protocol: u8,
        /// Control-table address
        #[arg(long)]
        address: u16,
        /// Data width in bytes (1, 2 or 4)
        #[arg(long, default_value_t = 1u16)]
        width: u16,
        /// Targets as ID=VALUE (value decimal or 0x hex); repeatable
        #[arg(long = "entry", value_parser = parse_entry)]
        entries: Vec<SyncEntry>,
        /// Also transmit the frame on the selected backend
        #[arg(long, action = ArgAction::SetTrue)]
        send: bool,
    },
    /// Verify and decode a sync-write frame given as hex bytes
    FrameDecode {
        /// Bytes as hex, space-separated or compact (e.g., "FF FF FE ..." or FFFFFE...)
        #[arg(required = true, num_args = 1..)]
        data: Vec<String>,
    },
    /// Set torque enable on joints and wheels
    Torque {
        #[arg(long, value_enum, default_value_t = Switch::On)]
        hip: Switch,
        #[arg(long, value_enum, default_value_t = Switch::On)]
        knee: Switch,
        #[arg(long, value_enum, default_value_t = Switch::On)]
        wheel: Switch,
    },
    /// Torque off on every actuator
    Estop,
    /// Send joint goal positions in encoder ticks (FR,FL,RR,RL)
    Joints {
        #[arg(long, value_delimiter = ',', required = true)]
        hip: Vec<u32>,
        #[arg(long, value_delimiter = ',', required = true)]
        knee: Vec<u32>,
    },
    /// Send signed wheel speeds (FR,FL,RR,RL); negative turns clockwise
    Wheels {
        #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
        speed: Vec<i16>,
    },
    /// Print the motor table
    RegistryShow {
        /// Emit JSON
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Parse one attitude reading (e.g., "*10.5,-5.2,120.0")
    ImuParse { text: String },
    /// Stream attitude readings from the sensor port
    ImuWatch {
        /// Serial port (defaults to the config's imu.port)
        #[arg(long)]
        port: Option<String>,
        /// Number of readings to print before exiting
        #[arg(long, default_value_t = 10u32)]
        count: u32,
    },
    /// List serial ports for the selected backend
    PortList,
}

/// A command that goes out on the motor bus.
#[derive(Debug)]
enum BusCommand {
    Raw {
        address: ControlAddress,
        entries: Vec<SyncEntry>,
    },
    Torque {
        hip: bool,
        knee: bool,
        wheel: bool,
    },
    Estop,
    Joints {
        hips: [u32; LEG_COUNT],
        knees: [u32; LEG_COUNT],
    },
    Wheels {
        speeds: [i16; LEG_COUNT],
    },
}

struct Session {
    cfg: ControlConfig,
    backend: Backend,
    metrics: Option<MetricsHub>,
    log: Option<String>,
}

fn main() -> Result<()> {
    setup_tracing();
    let Cli {
        config,
        backend,
        metrics,
        log,
        command,
    } = Cli::parse();

    let cfg = match config.as_deref() {
        Some(path) => ControlConfig::load(path)?,
        None => ControlConfig::default(),
    };
    let metrics = if metrics {
        Some(MetricsHub::new().context("metrics init")?)
    } else {
        None
    };
    let session = Session {
        cfg,
        backend,
        metrics,
        log,
    };

    match command {
        Commands::FrameBuild {
            protocol,
            address,
            width,
            entries,
            send,
        } => frame_build(&session, protocol, address, width, entries, send),
        Commands::FrameDecode { data } => frame_decode(&data),
        Commands::Torque { hip, knee, wheel } => dispatch(
            &session,
            BusCommand::Torque {
                hip: hip.on(),
                knee: knee.on(),
                wheel: wheel.on(),
            },
        ),
        Commands::Estop => dispatch(&session, BusCommand::Estop),
        Commands::Joints { hip, knee } => dispatch(
            &session,
            BusCommand::Joints {
                hips: per_leg(hip, "--hip")?,
                knees: per_leg(knee, "--knee")?,
            },
        ),
        Commands::Wheels { speed } => dispatch(
            &session,
            BusCommand::Wheels {
                speeds: per_leg(speed, "--speed")?,
            },
        ),
        Commands::RegistryShow { json } => registry_show(&session.cfg, json),
        Commands::ImuParse { text } => imu_parse(&text),
        Commands::ImuWatch { port, count } => imu_watch(&session, port.as_deref(), count),
        Commands::PortList => port_list(session.backend),
    }?;

    if let Some(m) = &session.metrics {
        print!("{}", m.encode_text());
    }
    Ok(())
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn per_leg<T>(values: Vec<T>, flag: &str) -> Result<[T; LEG_COUNT]> {
    values
        .try_into()
        .map_err(|v: Vec<T>| anyhow::anyhow!("{flag} needs {LEG_COUNT} values, got {}", v.len()))
}

fn parse_entry(s: &str) -> Result<SyncEntry, String> {
    let (id, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ID=VALUE, got '{s}'"))?;
    let id = parse_number(id).ok_or_else(|| format!("invalid id '{id}'"))?;
    let id = u8::try_from(id).map_err(|_| format!("id out of range: {id}"))?;
    let value = parse_number(value).ok_or_else(|| format!("invalid value '{value}'"))?;
    Ok(SyncEntry::new(id, value))
}

fn parse_number(s: &str) -> Option<u32> {
    let t = s.trim();
    match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => t.parse().ok(),
    }
}

fn parse_hex_bytes(items: &[String]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for item in items {
        for t in item.split_whitespace() {
            let t = t.strip_prefix("0x").unwrap_or(t);
            if t.len() % 2 != 0 {
                anyhow::bail!("odd number of hex digits in '{t}'");
            }
            for i in (0..t.len()).step_by(2) {
                let pair = t
                    .get(i..i + 2)
                    .ok_or_else(|| anyhow::anyhow!("invalid hex '{t}'"))?;
                let b = u8::from_str_radix(pair, 16)
                    .map_err(|e| anyhow::anyhow!("invalid hex byte '{pair}': {e}"))?;
                out.push(b);
            }
        }
    }
    Ok(out)
}

fn hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 3);
    for b in bytes {
        let _ = core::fmt::Write::write_fmt(&mut s, format_args!("{b:02X} "));
    }
    s.trim_end().to_string()
}

fn frame_build(
    s: &Session,
    protocol: u8,
    address: u16,
    width: u16,
    entries: Vec<SyncEntry>,
    send: bool,
) -> Result<()> {
    let version = ProtocolVersion::try_from(protocol)?;
    let width = DataWidth::try_from(width)?;
    let address = ControlAddress::new(version, address, width);
    let frame = SyncWrite::new(address, &entries)
        .with_param_capacity(s.cfg.frame_limits.capacity(version))
        .to_vec()?;
    println!("{}", hex(&frame));
    if send {
        dispatch(s, BusCommand::Raw { address, entries })?;
    }
    Ok(())
}

fn frame_decode(data: &[String]) -> Result<()> {
    let bytes = parse_hex_bytes(data)?;
    let decoded = decode_sync_write(&bytes)?;
    println!("{}", serde_json::to_string_pretty(&decoded)?);
    Ok(())
}

fn registry_show(cfg: &ControlConfig, json: bool) -> Result<()> {
    let registry = cfg.registry()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&registry)?);
        return Ok(());
    }
    for (pos, role, id) in registry.joints() {
        println!("{pos:?}\t{role:?}\tid={id}\tprotocol={}", role.protocol());
    }
    for (pos, id) in registry.wheels() {
        println!(
            "{pos:?}\tWheel\tid={id}\tprotocol={}",
            motor_registry::JointRole::Wheel.protocol()
        );
    }
    Ok(())
}

fn imu_parse(text: &str) -> Result<()> {
    let sample = parse_attitude(text.as_bytes())?;
    println!("{}", serde_json::to_string(&sample)?);
    Ok(())
}

fn dispatch(s: &Session, cmd: BusCommand) -> Result<()> {
    match s.backend {
        Backend::Mock => {
            let wire = MockWire::new();
            run_command(s, wire.half_duplex(), cmd)
        }
        Backend::Serial => serial_dispatch(s, cmd),
    }
}

#[cfg(feature = "serial")]
fn serial_dispatch(s: &Session, cmd: BusCommand) -> Result<()> {
    let bus_cfg = &s.cfg.motor_bus;
    let bus = bus_transport::open_half_duplex(&bus_cfg.port, bus_cfg.baud_rate, s.cfg.tx_timeout())
        .with_context(|| format!("opening motor bus {}", bus_cfg.port))?;
    run_command(s, bus, cmd)
}

#[cfg(not(feature = "serial"))]
fn serial_dispatch(_: &Session, _: BusCommand) -> Result<()> {
    anyhow::bail!("serial backend not available (build with --features serial)")
}

fn run_command<L: SerialLink, P: DriveEnable>(
    s: &Session,
    bus: HalfDuplexBus<L, P>,
    cmd: BusCommand,
) -> Result<()> {
    let (link, drive) = bus.into_parts();
    let tap = Tap::new(link);
    let sent = tap.frames();
    let mut ctl = LegController::from_config(&s.cfg, HalfDuplexBus::new(tap, drive), StdDelay)?;
    if let Some(m) = &s.metrics {
        ctl = ctl.with_metrics(m.clone());
    }

    let result = match cmd {
        BusCommand::Raw { address, entries } => ctl.build_and_send(address, &entries),
        BusCommand::Torque { hip, knee, wheel } => ctl.torque_set(hip, knee, wheel),
        BusCommand::Estop => ctl.emergency_stop(),
        BusCommand::Joints { hips, knees } => ctl.send_joint_positions(hips, knees),
        BusCommand::Wheels { speeds } => ctl.send_wheel_speeds(speeds),
    };

    let frames = sent.borrow();
    for f in frames.iter() {
        print_frame(f);
    }
    if let Some(path) = s.log.as_deref() {
        write_log(path, s, &frames)?;
    }
    result?;
    info!(frames = frames.len(), backend = ?s.backend, "command sent");
    Ok(())
}

/// Records every frame the underlying link accepted.
struct Tap<L> {
    inner: L,
    frames: Rc<RefCell<Vec<SentFrame>>>,
}

impl<L> Tap<L> {
    fn new(inner: L) -> Self {
        Self {
            inner,
            frames: Rc::default(),
        }
    }

    fn frames(&self) -> Rc<RefCell<Vec<SentFrame>>> {
        Rc::clone(&self.frames)
    }
}

impl<L: SerialLink> SerialLink for Tap<L> {
    fn submit(&mut self, bytes: &[u8]) -> bus_transport::Result<()> {
        self.inner.submit(bytes)?;
        self.frames.borrow_mut().push(SentFrame {
            bytes: bytes.to_vec(),
            timestamp: Timestamp::now(),
        });
        Ok(())
    }

    fn transmission_complete(&mut self) -> bus_transport::Result<bool> {
        self.inner.transmission_complete()
    }
}

fn rfc3339(ts: Timestamp) -> String {
    ts.0.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "".into())
}

fn print_frame(f: &SentFrame) {
    let summary = decode_sync_write(&f.bytes)
        .map(|d| format!("{} n={}", d.address, d.entries.len()))
        .unwrap_or_else(|e| format!("undecodable: {e}"));
    println!(
        "{summary}\tlen={}\t{}\t{}",
        f.bytes.len(),
        hex(&f.bytes),
        rfc3339(f.timestamp)
    );
}

#[derive(Serialize)]
struct WlLogHeader<'a> {
    format: &'a str,
    version: u32,
    backend: String,
    port: &'a str,
}

#[derive(Serialize)]
struct WlLogRecord {
    ts: String,
    protocol: Option<u8>,
    len: usize,
    data: String,
}

fn write_log(path: &str, s: &Session, frames: &[SentFrame]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating log {path}"))?;
    let mut w = BufWriter::new(file);
    let header = WlLogHeader {
        format: "wllog",
        version: 1,
        backend: format!("{:?}", s.backend),
        port: &s.cfg.motor_bus.port,
    };
    serde_json::to_writer(&mut w, &header)?;
    w.write_all(b"\n")?;
    for f in frames {
        let rec = WlLogRecord {
            ts: rfc3339(f.timestamp),
            protocol: decode_sync_write(&f.bytes)
                .ok()
                .map(|d| d.address.version.number()),
            len: f.bytes.len(),
            data: hex(&f.bytes).replace(' ', ""),
        };
        serde_json::to_writer(&mut w, &rec)?;
        w.write_all(b"\n")?;
    }
    w.flush()?;
    Ok(())
}

fn imu_watch(s: &Session, port: Option<&str>, count: u32) -> Result<()> {
    let mut ingest = TelemetryIngest::<{ imu_ingest::IMU_BUF_SIZE }>::new();
    let source = start_imu_source(s, port, &ingest)?;
    let stdout = std::io::stdout();
    watch_readings(&mut ingest, source, count, s.metrics.as_ref(), &mut stdout.lock())
}

/// Print `count` accepted readings, stopping early if the source thread ends.
fn watch_readings(
    ingest: &mut TelemetryIngest,
    source: ImuSource,
    count: u32,
    metrics: Option<&MetricsHub>,
    out: &mut impl Write,
) -> Result<()> {
    let mut printed = 0u32;
    while printed < count {
        match ingest.poll() {
            PollOutcome::Updated(sample) => {
                serde_json::to_writer(&mut *out, &sample)?;
                out.write_all(b"\n")?;
                printed += 1;
                if let Some(m) = metrics {
                    m.telemetry.accepted.inc();
                }
            }
            PollOutcome::Rejected(e) => {
                tracing::debug!(error = %e, "reading skipped");
                if let Some(m) = metrics {
                    m.telemetry.rejected.inc();
                }
            }
            PollOutcome::Idle if source.is_finished() => {
                // Take a snapshot published just before the thread exited.
                if ingest.link().mailbox().is_ready() {
                    continue;
                }
                source.stop().context("imu source failed")?;
                anyhow::bail!("imu source ended after {printed} of {count} readings");
            }
            PollOutcome::Idle => std::thread::sleep(Duration::from_millis(1)),
        }
    }
    if let Some(m) = metrics {
        m.telemetry
            .dropped_snapshots
            .set(i64::from(ingest.stats().dropped_snapshots));
    }
    out.flush()?;
    source.stop()
}

enum ImuSource {
    Synthetic {
        stop: Arc<AtomicBool>,
        handle: std::thread::JoinHandle<()>,
    },
    Reader(imu_ingest::SerialReader),
}

impl ImuSource {
    fn is_finished(&self) -> bool {
        match self {
            ImuSource::Synthetic { handle, .. } => handle.is_finished(),
            ImuSource::Reader(reader) => reader.is_finished(),
        }
    }

    fn stop(self) -> Result<()> {
        match self {
            ImuSource::Synthetic { stop, handle } => {
                stop.store(true, Ordering::Relaxed);
                handle
                    .join()
                    .map_err(|_| anyhow::anyhow!("synthetic imu thread panicked"))
            }
            ImuSource::Reader(reader) => Ok(reader.stop()?),
        }
    }
}

fn start_imu_source(s: &Session, port: Option<&str>, ingest: &TelemetryIngest) -> Result<ImuSource> {
    let link = ingest.link();
    match s.backend {
        Backend::Mock => {
            let stop = Arc::new(AtomicBool::new(false));
            let stop_flag = Arc::clone(&stop);
            let handle = std::thread::Builder::new()
                .name("imu-mock".into())
                .spawn(move || {
                    let mut k = 0u32;
                    while !stop_flag.load(Ordering::Relaxed) {
                        // One reading per snapshot, published once the last one was taken.
                        if !link.mailbox().is_ready() {
                            let t = k as f32 * 0.5;
                            let line = format!("*{t:.1},{:.1},{:.1}\r\n", -t, 90.0 + t);
                            link.mailbox().try_send(line.as_bytes());
                            k = k.wrapping_add(1);
                        }
                        std::thread::sleep(Duration::from_millis(1));
                    }
                })
                .context("spawning mock imu source")?;
            Ok(ImuSource::Synthetic { stop, handle })
        }
        Backend::Serial => serial_imu_source(s, port, link),
    }
}

#[cfg(feature = "serial")]
fn serial_imu_source(
    s: &Session,
    port: Option<&str>,
    link: Arc<imu_ingest::TelemetryLink>,
) -> Result<ImuSource> {
    let path = port.unwrap_or(&s.cfg.imu.port);
    let serial = imu_ingest::open_imu_port(path, s.cfg.imu.baud_rate)
        .with_context(|| format!("opening imu port {path}"))?;
    let reader = imu_ingest::spawn_serial_reader(serial, link, s.cfg.imu_idle())?;
    info!(port = path, "imu reader started");
    Ok(ImuSource::Reader(reader))
}

#[cfg(not(feature = "serial"))]
fn serial_imu_source(
    _: &Session,
    _: Option<&str>,
    _: Arc<imu_ingest::TelemetryLink>,
) -> Result<ImuSource> {
    anyhow::bail!("serial backend not available (build with --features serial)")
}

fn port_list(backend: Backend) -> Result<()> {
    match backend {
        Backend::Mock => println!("mock0\tmock"),
        Backend::Serial => serial_port_list()?,
    }
    Ok(())
}

#[cfg(feature = "serial")]
fn serial_port_list() -> Result<()> {
    for port in bus_transport::list_ports()? {
        println!("{}\t{}", port.name, port.driver);
    }
    Ok(())
}

#[cfg(not(feature = "serial"))]
fn serial_port_list() -> Result<()> {
    anyhow::bail!("serial backend not available (build with --features serial)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry_forms() {
        assert_eq!(parse_entry("1=2048"), Ok(SyncEntry::new(1, 2048)));
        assert_eq!(parse_entry("0x0B=0x400"), Ok(SyncEntry::new(11, 1024)));
        assert!(parse_entry("300=1").is_err());
        assert!(parse_entry("7").is_err());
    }

    #[test]
    fn test_parse_hex_spaced_and_compact() -> Result<()> {
        let spaced = parse_hex_bytes(&["FF FF FE".to_string()])?;
        let compact = parse_hex_bytes(&["FFFFFE".to_string()])?;
        let split = parse_hex_bytes(&["FF".to_string(), "0xFF".to_string(), "fe".to_string()])?;
        assert_eq!(spaced, vec![0xFF, 0xFF, 0xFE]);
        assert_eq!(compact, spaced);
        assert_eq!(split, spaced);
        assert!(parse_hex_bytes(&["FFF".to_string()]).is_err());
        Ok(())
    }

    #[test]
    fn test_tap_records_only_accepted_frames() -> Result<()> {
        let wire = MockWire::new();
        let mut tap = Tap::new(wire.link());
        let frames = tap.frames();
        tap.submit(&[1, 2])?;
        wire.set_busy(true);
        assert!(tap.submit(&[3]).is_err());
        assert_eq!(frames.borrow().len(), 1);
        assert_eq!(frames.borrow()[0].bytes, vec![1, 2]);
        Ok(())
    }

    struct LostLine;

    impl std::io::Read for LostLine {
        fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn test_watch_returns_reader_error_instead_of_waiting() -> Result<()> {
        let mut ingest = TelemetryIngest::new();
        let reader = imu_ingest::spawn_reader(LostLine, ingest.link())?;
        let mut out = Vec::new();

        let err = watch_readings(&mut ingest, ImuSource::Reader(reader), 3, None, &mut out)
            .err()
            .map(|e| format!("{e:#}"))
            .unwrap_or_default();
        assert!(err.contains("imu source failed"), "{err}");
        assert!(out.is_empty());
        Ok(())
    }

    #[test]
    fn test_watch_reports_synthetic_source_that_exits_early() -> Result<()> {
        let mut ingest = TelemetryIngest::new();
        let link = ingest.link();
        let handle = std::thread::spawn(move || {
            link.mailbox().try_send(b"*1.0,2.0,3.0\r\n");
        });
        let source = ImuSource::Synthetic {
            stop: Arc::new(AtomicBool::new(false)),
            handle,
        };
        let mut out = Vec::new();

        let err = watch_readings(&mut ingest, source, 2, None, &mut out)
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default();
        assert_eq!(err, "imu source ended after 1 of 2 readings");
        assert_eq!(String::from_utf8(out)?, "{\"roll\":1.0,\"pitch\":2.0,\"yaw\":3.0}\n");
        Ok(())
    }

    #[test]
    fn test_per_leg_requires_four() {
        assert!(per_leg(vec![1u32, 2, 3], "--hip").is_err());
        assert!(matches!(per_leg(vec![1u32, 2, 3, 4], "--hip"), Ok([1, 2, 3, 4])));
    }
}
