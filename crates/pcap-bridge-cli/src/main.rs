//! pcap-bridge - command-line front end for the libpcap bindings
//!
//! Lists devices, reads and writes capture files, runs live captures and
//! checks filter expressions.

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use pcap_bridge::{
    BreakHandle, BridgeConfig, CaptureSettings, ConfigLoader, Device, Direction, Linktype,
    LoopOutcome, NextPacket, Packet, PcapError, Session, TimestampPrecision, NETMASK_UNKNOWN,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "pcap-bridge")]
#[command(author = "Oximy")]
#[command(version)]
#[command(about = "Packet capture through the system libpcap", long_about = None)]
struct Cli {
    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format (json, text)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List capture devices
    Devices,

    /// Show the IPv4 network and mask of a device
    Lookup {
        /// Device name
        device: String,
    },

    /// Print packets from a capture file
    Read {
        /// Capture file
        input: PathBuf,

        /// Filter expression
        #[arg(short = 'F', long)]
        filter: Option<String>,

        /// Stop after this many packets (0 = all)
        #[arg(short = 'n', long, default_value = "0")]
        count: usize,

        /// Report timestamps with nanosecond precision
        #[arg(long)]
        nano: bool,
    },

    /// Capture live traffic (requires elevated privileges on most platforms)
    Capture {
        /// Interface to capture on (first active interface if not specified)
        #[arg(short, long)]
        interface: Option<String>,

        /// Filter expression (overrides the config file)
        #[arg(short = 'F', long)]
        filter: Option<String>,

        /// Stop after this many packets (0 = until Ctrl+C)
        #[arg(short = 'n', long, default_value = "0")]
        count: i32,

        /// Write packets to this capture file
        #[arg(short, long)]
        write: Option<PathBuf>,

        /// Enable promiscuous mode
        #[arg(short, long)]
        promiscuous: bool,

        /// Snapshot length (overrides the config file)
        #[arg(short, long)]
        snaplen: Option<i32>,

        /// Direction of traffic to capture
        #[arg(long, value_enum)]
        direction: Option<DirectionArg>,
    },

    /// Compile a filter expression and show the program
    Filter {
        /// Filter expression
        expression: String,

        /// Link-layer type name
        #[arg(short, long, default_value = "EN10MB")]
        linktype: String,

        /// Snapshot length used for compilation
        #[arg(short, long, default_value = "65535")]
        snaplen: i32,

        /// Disable the optimizer
        #[arg(long)]
        no_optimize: bool,

        /// Print each instruction
        #[arg(short, long)]
        dump: bool,
    },

    /// List known link-layer types
    Linktypes,

    /// Show library status and capabilities
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    In,
    Out,
    Inout,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::In => Direction::In,
            DirectionArg::Out => Direction::Out,
            DirectionArg::Inout => Direction::InOut,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.clone());

    // CLI verbose flag takes precedence, then config, then default
    let log_level = resolve_log_level(cli.verbose, &config.logging.level);
    let json = cli.format == "json" || config.logging.format == "json";

    if json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_target(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    if let Err(e) = pcap_bridge::init() {
        // Older libraries reject UTF-8 mode; everything else still works
        warn!("libpcap init failed: {}", e);
    }

    match cli.command {
        Commands::Devices => devices_command(json),
        Commands::Lookup { device } => lookup_command(&device),
        Commands::Read {
            input,
            filter,
            count,
            nano,
        } => read_command(&input, filter.as_deref(), count, nano, json),
        Commands::Capture {
            interface,
            filter,
            count,
            write,
            promiscuous,
            snaplen,
            direction,
        } => {
            let mut settings = config.capture.clone();
            if filter.is_some() {
                settings.filter = filter;
            }
            if let Some(snaplen) = snaplen {
                settings.snaplen = snaplen;
            }
            settings.promiscuous |= promiscuous;
            capture_command(CaptureConfig {
                interface,
                settings,
                count,
                output: write,
                direction: direction.map(Direction::from),
                json,
            })
            .await
        }
        Commands::Filter {
            expression,
            linktype,
            snaplen,
            no_optimize,
            dump,
        } => filter_command(&expression, &linktype, snaplen, !no_optimize, dump),
        Commands::Linktypes => linktypes_command(),
        Commands::Status => status_command(),
    }
}

/// Load configuration from file/env, with fallback to defaults
fn load_config(cli_path: Option<PathBuf>) -> BridgeConfig {
    let loader = ConfigLoader::new().with_cli_path(cli_path);
    match loader.load() {
        Ok(config) => config,
        Err(e) => {
            // Logging is not set up yet
            eprintln!("Failed to load configuration: {}, using defaults", e);
            BridgeConfig::default()
        }
    }
}

fn resolve_log_level(verbose: u8, configured: &str) -> Level {
    if verbose > 0 {
        match verbose {
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    } else {
        match configured.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        }
    }
}

fn devices_command(json: bool) -> anyhow::Result<()> {
    let devices = pcap_bridge::devices().context("failed to enumerate devices")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    if devices.is_empty() {
        println!("No capture devices found (insufficient privileges?)");
        return Ok(());
    }

    for device in &devices {
        print_device(device);
    }
    Ok(())
}

fn print_device(device: &Device) {
    let mut states = Vec::new();
    if device.flags.is_up() {
        states.push("up");
    }
    if device.flags.is_running() {
        states.push("running");
    }
    if device.flags.is_loopback() {
        states.push("loopback");
    }
    if device.flags.is_wireless() {
        states.push("wireless");
    }

    println!("{} [{}]", device.name, states.join(", "));
    if let Some(description) = &device.description {
        println!("    {}", description);
    }
    for address in &device.addresses {
        if let Some(addr) = address.addr {
            match address.netmask {
                Some(mask) => println!("    {} netmask {}", addr, mask),
                None => println!("    {}", addr),
            }
        }
    }
}

fn lookup_command(device: &str) -> anyhow::Result<()> {
    let result = pcap_bridge::lookup_net(device)
        .with_context(|| format!("failed to look up {}", device))?;
    println!("{}: net {} mask {}", device, result.network(), result.netmask());
    Ok(())
}

/// One packet, as printed by `read` and `capture`
#[derive(Debug, Serialize)]
struct PacketSummary {
    index: usize,
    timestamp: String,
    caplen: u32,
    len: u32,
}

impl PacketSummary {
    fn new(index: usize, packet: &Packet<'_>, precision: TimestampPrecision) -> Self {
        Self {
            index,
            timestamp: format_timestamp(packet, precision),
            caplen: packet.header.caplen(),
            len: packet.header.len(),
        }
    }

    fn print(&self, json: bool) {
        if json {
            match serde_json::to_string(self) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to serialize packet summary: {}", e),
            }
        } else if self.caplen < self.len {
            println!(
                "{:>6}  {}  {} bytes (captured {})",
                self.index, self.timestamp, self.len, self.caplen
            );
        } else {
            println!("{:>6}  {}  {} bytes", self.index, self.timestamp, self.len);
        }
    }
}

fn format_timestamp(packet: &Packet<'_>, precision: TimestampPrecision) -> String {
    let ts = packet.header.timestamp(precision);
    let datetime = DateTime::<Utc>::from_timestamp(ts.as_secs() as i64, ts.subsec_nanos())
        .unwrap_or_default();
    match precision {
        TimestampPrecision::Micro => datetime.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        TimestampPrecision::Nano => datetime.format("%Y-%m-%d %H:%M:%S%.9f").to_string(),
    }
}

fn read_command(
    input: &Path,
    filter: Option<&str>,
    count: usize,
    nano: bool,
    json: bool,
) -> anyhow::Result<()> {
    let precision = if nano {
        TimestampPrecision::Nano
    } else {
        TimestampPrecision::Micro
    };
    let mut session = Session::open_offline_with_precision(input, precision)
        .with_context(|| format!("failed to open {}", input.display()))?;
    debug!(
        "Reading {} (linktype {}, format {}.{})",
        input.display(),
        session.datalink()?,
        session.major_version(),
        session.minor_version()
    );

    if let Some(expression) = filter {
        let program = session.compile(expression, true, NETMASK_UNKNOWN)?;
        session.set_filter(&program)?;
    }

    let mut index = 0;
    loop {
        if count > 0 && index >= count {
            break;
        }
        match session.next_packet()? {
            NextPacket::Packet(packet) => {
                index += 1;
                PacketSummary::new(index, &packet, precision).print(json);
            }
            NextPacket::EndOfFile => break,
            NextPacket::Timeout => continue,
        }
    }

    info!("Read {} packets from {}", index, input.display());
    Ok(())
}

struct CaptureConfig {
    interface: Option<String>,
    settings: CaptureSettings,
    count: i32,
    output: Option<PathBuf>,
    direction: Option<Direction>,
    json: bool,
}

/// Pick the first interface that is up and not loopback
fn default_interface() -> anyhow::Result<String> {
    let devices = pcap_bridge::devices()?;
    devices
        .iter()
        .find(|d| d.flags.is_up() && d.flags.is_running() && !d.flags.is_loopback())
        .or_else(|| devices.first())
        .map(|d| d.name.clone())
        .context("no capture devices available")
}

fn open_capture(config: &CaptureConfig, interface: &str) -> anyhow::Result<Session> {
    let mut session = Session::create(interface)?;
    config.settings.apply(&mut session)?;

    if let Some(warning) = session.activate()? {
        warn!("{}: {:?}", interface, warning);
    }

    if let Some(direction) = config.direction {
        session.set_direction(direction)?;
    }

    if let Some(expression) = &config.settings.filter {
        let netmask = pcap_bridge::lookup_net(interface)
            .map(|n| n.mask)
            .unwrap_or(NETMASK_UNKNOWN);
        let program = session.compile(expression, config.settings.optimize, netmask)?;
        session.set_filter(&program)?;
        info!("Filter: {}", expression);
    }

    Ok(session)
}

async fn capture_command(config: CaptureConfig) -> anyhow::Result<()> {
    let interface = match &config.interface {
        Some(name) => name.clone(),
        None => default_interface()?,
    };

    let session = open_capture(&config, &interface)
        .with_context(|| format!("failed to start capture on {}", interface))?;
    let mut dumper = match &config.output {
        Some(path) => Some(
            session
                .dump_open(path)
                .with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => None,
    };

    let precision = config.settings.precision();
    let breaker = session.break_handle();

    println!();
    println!("  pcap-bridge v{}", env!("CARGO_PKG_VERSION"));
    println!("  {}", pcap_bridge::lib_version());
    println!();
    println!("  Capturing on {} ({})", interface, session.datalink()?);
    if let Some(path) = &config.output {
        println!("  Writing to {}", path.display());
    }
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    let count = config.count;
    let json = config.json;
    let mut capture = tokio::task::spawn_blocking(
        move || -> anyhow::Result<(LoopOutcome, Session)> {
            let mut seen = 0;
            let result = run_capture(session, count, |packet| {
                seen += 1;
                match dumper.as_mut() {
                    Some(dumper) => dumper.dump_packet(packet)?,
                    None => PacketSummary::new(seen, packet, precision).print(json),
                }
                Ok(())
            });
            if let Some(mut dumper) = dumper.take() {
                if let Err(e) = dumper.flush() {
                    warn!("Failed to flush capture file: {}", e);
                }
                dumper.close();
            }
            result
        },
    );

    let (outcome, session) = tokio::select! {
        result = &mut capture => result??,
        _ = tokio::signal::ctrl_c() => {
            info!("Stopping capture");
            request_stop(&breaker)?;
            capture.await??
        }
    };

    match session.stats() {
        Ok(stats) => info!(
            "{} packets captured, {} received, {} dropped, {} dropped by interface",
            outcome.packets(),
            stats.received,
            stats.dropped,
            stats.if_dropped
        ),
        Err(e) => debug!("Statistics unavailable: {}", e),
    }
    if outcome.is_broken() {
        info!("Capture interrupted after {} packets", outcome.packets());
    }
    session.close();
    Ok(())
}

/// Run a blocking capture loop, stopping at the first error from `sink`
fn run_capture<F>(
    mut session: Session,
    count: i32,
    mut sink: F,
) -> anyhow::Result<(LoopOutcome, Session)>
where
    F: FnMut(&Packet<'_>) -> anyhow::Result<()>,
{
    let breaker = session.break_handle();
    let mut failed: Option<anyhow::Error> = None;
    let outcome = session.loop_packets(count, |packet| {
        if failed.is_some() {
            return;
        }
        if let Err(e) = sink(&packet) {
            failed = Some(e);
            // The session is borrowed by the loop, so it is still open here
            let _ = breaker.break_loop();
        }
    })?;
    match failed {
        Some(e) => Err(e),
        None => Ok((outcome, session)),
    }
}

/// Break a running capture; a session that is already gone needs no stop
fn request_stop(breaker: &BreakHandle) -> anyhow::Result<()> {
    match breaker.break_loop() {
        Ok(()) | Err(PcapError::SessionClosed) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn filter_command(
    expression: &str,
    linktype: &str,
    snaplen: i32,
    optimize: bool,
    dump: bool,
) -> anyhow::Result<()> {
    let linktype = Linktype::from_name(linktype)?;
    let mut session = Session::open_dead(linktype, snaplen)?;
    let program = match session.compile(expression, optimize, NETMASK_UNKNOWN) {
        Ok(program) => program,
        Err(e) => bail!("invalid filter {:?}: {}", expression, e),
    };

    println!(
        "{:?} on {}: {} instructions",
        expression,
        linktype,
        program.len()
    );
    if dump {
        for (i, insn) in program.instructions().iter().enumerate() {
            println!(
                "({:03}) code 0x{:04x} jt {:<3} jf {:<3} k 0x{:08x}",
                i, insn.code, insn.jt, insn.jf, insn.k
            );
        }
    }
    program.free();
    session.close();
    Ok(())
}

fn linktypes_command() -> anyhow::Result<()> {
    for linktype in Linktype::KNOWN {
        println!(
            "{:>4}  {:<20} {}",
            linktype.0,
            linktype.name().unwrap_or_default(),
            linktype.description_or_dlt()
        );
    }
    Ok(())
}

fn status_command() -> anyhow::Result<()> {
    println!();
    println!("pcap-bridge v{}", env!("CARGO_PKG_VERSION"));
    println!("{}", pcap_bridge::lib_version());
    println!();

    println!(
        "Platform: {} {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );

    let uid = unsafe { libc::getuid() };
    println!("Running as root: {}", uid == 0);

    match pcap_bridge::devices() {
        Ok(devices) => println!("Capture devices: {}", devices.len()),
        Err(e) => println!("Capture devices: unavailable ({})", e),
    }

    if let Some(path) = ConfigLoader::default_config_path() {
        println!("User config: {}", path.display());
    }
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcap_bridge::PacketHeader;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_log_level() {
        assert_eq!(resolve_log_level(0, "debug"), Level::DEBUG);
        assert_eq!(resolve_log_level(0, "bogus"), Level::WARN);
        assert_eq!(resolve_log_level(1, "error"), Level::INFO);
        assert_eq!(resolve_log_level(3, "error"), Level::TRACE);
    }

    #[test]
    fn test_format_timestamp() {
        let data = [0u8; 4];
        let header = PacketHeader::new(0, 1500, 4, 4);
        let packet = Packet {
            header: &header,
            data: &data,
        };
        assert_eq!(
            format_timestamp(&packet, TimestampPrecision::Micro),
            "1970-01-01 00:00:00.001500"
        );
        assert_eq!(
            format_timestamp(&packet, TimestampPrecision::Nano),
            "1970-01-01 00:00:00.000001500"
        );
    }

    fn write_frames(path: &Path, count: usize) {
        let session = Session::open_dead(Linktype::ETHERNET, 65535).unwrap();
        let mut dumper = session.dump_open(path).unwrap();
        let frame = [0u8; 60];
        for i in 0..count {
            let header = PacketHeader::new(i as i64, 0, frame.len() as u32, frame.len() as u32);
            dumper.dump(&header, &frame).unwrap();
        }
        dumper.close();
    }

    #[test]
    fn test_run_capture_stops_on_sink_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("five.pcap");
        write_frames(&path, 5);

        let session = Session::open_offline(&path).unwrap();
        let mut calls = 0;
        let result = run_capture(session, 0, |_| {
            calls += 1;
            if calls == 2 {
                bail!("disk full");
            }
            Ok(())
        });
        let err = result.err().unwrap();
        assert_eq!(err.to_string(), "disk full");
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_run_capture_returns_session() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("three.pcap");
        write_frames(&path, 3);

        let session = Session::open_offline(&path).unwrap();
        let (outcome, session) = run_capture(session, 0, |_| Ok(())).unwrap();
        assert_eq!(outcome, LoopOutcome::Completed { packets: 3 });
        session.close();
    }

    #[test]
    fn test_read_command_on_borrowed_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("two.pcap");
        write_frames(&path, 2);

        read_command(path.as_path(), Some("ip"), 0, false, true).unwrap();
        assert!(read_command(&dir.path().join("missing.pcap"), None, 0, false, false).is_err());
    }

    #[test]
    fn test_request_stop_after_session_closed() {
        let session = Session::open_dead(Linktype::ETHERNET, 65535).unwrap();
        let breaker = session.break_handle();
        request_stop(&breaker).unwrap();
        session.close();
        request_stop(&breaker).unwrap();
    }

    #[test]
    fn test_config_flag_has_no_env_fallback() {
        let cli = Cli::try_parse_from(["pcap-bridge", "status"]).unwrap();
        // PCAP_BRIDGE_CONFIG is resolved by ConfigLoader, not clap
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_parses_capture() {
        let cli = Cli::try_parse_from([
            "pcap-bridge",
            "capture",
            "-i",
            "eth0",
            "-F",
            "tcp port 443",
            "-n",
            "10",
            "--direction",
            "in",
        ])
        .unwrap();
        match cli.command {
            Commands::Capture {
                interface,
                filter,
                count,
                direction,
                ..
            } => {
                assert_eq!(interface.as_deref(), Some("eth0"));
                assert_eq!(filter.as_deref(), Some("tcp port 443"));
                assert_eq!(count, 10);
                assert!(matches!(direction, Some(DirectionArg::In)));
            }
            _ => panic!("expected capture command"),
        }
    }
}
