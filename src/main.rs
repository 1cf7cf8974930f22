use clap::Parser;
use log::warn;
use pingwatch::clock::SystemClock;
use pingwatch::config::{MonitorConfig, DEFAULT_INTERVAL_SECS, DEFAULT_PAYLOAD_SIZE, DEFAULT_THRESHOLD_MS};
use pingwatch::error::MonitorError;
use pingwatch::monitor::Monitor;
use pingwatch::output::{Reporter, TerminalSink};
use pingwatch::resolver;
use pingwatch::socket::RawIcmpSocket;
use std::io;
use std::process::{self, ExitCode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(version, about = "Multi-host ICMP latency monitor", long_about = None)]
struct Args {
    /// RTT threshold in ms above which a host is reported DOWN
    #[arg(short = 'F', long, default_value_t = DEFAULT_THRESHOLD_MS)]
    fail_threshold: f64,

    /// Ping interval in seconds
    #[arg(short, long, default_value_t = DEFAULT_INTERVAL_SECS)]
    interval: f64,

    /// Payload size in bytes
    #[arg(short, long, default_value_t = DEFAULT_PAYLOAD_SIZE)]
    size: usize,

    /// Enable debug output for sending/receiving ICMP
    #[arg(long)]
    debug: bool,

    /// Hosts to monitor
    #[arg(required = true)]
    hosts: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), MonitorError> {
    let config = MonitorConfig::new(args.fail_threshold, args.interval, args.size, args.debug)?;

    // resolve everything before touching the network
    let resolved = resolver::resolve_hosts(&args.hosts)?;

    let identifier = (process::id() & 0xFFFF) as u16;
    let mut socket = RawIcmpSocket::open()?;
    let mut monitor = Monitor::new(config.clone(), identifier, resolved);

    let mut reporter = Reporter::new(TerminalSink::new(io::stdout()), config.threshold_ms, config.verbose);
    reporter.banner(monitor.identifier(), monitor.hosts())?;

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))?;

    monitor.run(&mut socket, &SystemClock::new(), &cancel, |event| {
        if let Err(e) = reporter.report(&event) {
            warn!("failed to write status line: {e}");
        }
    });

    reporter.summary(monitor.entries())?;
    Ok(())
}
