mod error;
mod packet;
mod ping;
mod report;
mod session;
mod stats;
mod util;

use std::io::{self, BufRead, Write};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{App, AppSettings, Arg, ArgMatches};
use colored::*;
use log::{debug, error};

use error::{ProbeError, Result};
use ping::RawTransport;
use report::Reporter;
use session::{Session, SessionConfig};
use stats::SessionStats;

/// Everything needed to start one session.
struct Request {
    host: String,
    config: SessionConfig,
    ttl: Option<u32>,
}

fn main() {
    let mut builder = env_logger::Builder::from_default_env();
    builder.format_timestamp_millis().init();

    let matches = App::new("ring-echo")
        .setting(AppSettings::ColoredHelp)
        .version("v1.0")
        .author("Bryan Becar <becar.bryan@gmail.com>")
        .about("Measure reachability and round-trip latency of a host with ICMP echo.\nRaw sockets need root or CAP_NET_RAW.\nWithout DESTINATION the host, count and timeout are asked for interactively.")
        .arg(Arg::with_name("DESTINATION")
            .help("Hostname or IPv4 address")
            .index(1))
        .arg(Arg::with_name("count")
            .help("Number of probes to send (Default 4)")
            .short("c")
            .takes_value(true))
        .arg(Arg::with_name("timeout")
            .help("Set how long to wait for each reply before timing out (Default 1s)")
            .short("W")
            .takes_value(true))
        .arg(Arg::with_name("interval")
            .help("Set how long to wait in between probes (Default 1s)")
            .short("i")
            .takes_value(true))
        .arg(Arg::with_name("ttl")
            .help("Set ttl on outgoing packets")
            .short("t")
            .takes_value(true))
        .get_matches();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        error!("Error setting Ctrl-C handler: {}", e);
    }

    let result = if matches.is_present("DESTINATION") {
        request_from_args(&matches).and_then(|req| run(&req, &running))
    } else {
        interactive(&running)
    };

    match result {
        Ok(stats) if stats.received > 0 => {}
        Ok(_) => process::exit(1),
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            process::exit(2);
        }
    }
}

fn request_from_args(matches: &ArgMatches) -> Result<Request> {
    let host = matches.value_of("DESTINATION").unwrap_or_default().to_string();
    let defaults = SessionConfig::default();

    let count = match matches.value_of("count") {
        Some(c) => parse_count(c)?,
        None => defaults.count,
    };
    let timeout = match matches.value_of("timeout") {
        Some(t) => parse_duration(t, "timeout")?,
        None => defaults.timeout,
    };
    let interval = match matches.value_of("interval") {
        Some(i) => humantime::parse_duration(i).map_err(|e| {
            ProbeError::InvalidInput(format!("interval {:?} (ex: 1s, 400ms): {}", i, e))
        })?,
        None => defaults.interval,
    };
    let ttl = match matches.value_of("ttl") {
        Some(t) => Some(
            t.parse::<u32>()
                .map_err(|e| ProbeError::InvalidInput(format!("ttl {:?} (ex: 64): {}", t, e)))?,
        ),
        None => None,
    };

    Ok(Request {
        host,
        config: SessionConfig { count, timeout, interval },
        ttl,
    })
}

fn parse_count(s: &str) -> Result<u32> {
    s.trim()
        .parse::<u32>()
        .map_err(|e| ProbeError::InvalidInput(format!("count {:?}: {}", s, e)))
}

/// Durations accept humantime (`400ms`, `2s`) or a plain number of seconds.
fn parse_duration(s: &str, what: &str) -> Result<Duration> {
    let s = s.trim();
    let duration = match s.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Duration::from_secs_f64(secs),
        Ok(_) => {
            return Err(ProbeError::InvalidInput(format!(
                "{} {:?} must be a positive number",
                what, s
            )))
        }
        Err(_) => humantime::parse_duration(s).map_err(|e| {
            ProbeError::InvalidInput(format!("{} {:?} (ex: 1s, 400ms, 1m): {}", what, s, e))
        })?,
    };

    if duration == Duration::from_secs(0) {
        return Err(ProbeError::InvalidInput(format!("{} must be positive", what)));
    }
    Ok(duration)
}

fn run(req: &Request, running: &AtomicBool) -> Result<SessionStats> {
    let destination = util::resolve_dest(&req.host)?;
    debug!("Resolved {} to {}", req.host, destination);

    let mut transport = RawTransport::new();
    if let Some(ttl) = req.ttl {
        transport.set_ttl(ttl);
    }

    let stdout = io::stdout();
    let mut reporter = Reporter::new(stdout.lock());
    Session::new(destination, req.config, transport).run(&req.host, &mut reporter, running)
}

/// Ask for host, count and timeout until a session runs. Anything but a
/// fatal error sends the user back to the first question.
fn interactive(running: &AtomicBool) -> Result<SessionStats> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let attempt = prompt_request(&mut lines).and_then(|req| run(&req, running));
        let retry = match &attempt {
            Ok(_) => false,
            Err(ProbeError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => false,
            Err(e) => !e.is_fatal() && running.load(Ordering::SeqCst),
        };

        match attempt {
            Err(e) if retry => eprintln!("{}", e),
            result => return result,
        }
    }
}

fn prompt_request<I: Iterator<Item = io::Result<String>>>(lines: &mut I) -> Result<Request> {
    let host = prompt(lines, "Input ip/name of the host you want: ")?;
    let count = parse_count(&prompt(lines, "How many times you want to detect: ")?)?;
    let timeout = parse_duration(&prompt(lines, "Input timeout: ")?, "timeout")?;

    Ok(Request {
        host,
        config: SessionConfig {
            count,
            timeout,
            ..SessionConfig::default()
        },
        ttl: None,
    })
}

fn prompt<I: Iterator<Item = io::Result<String>>>(lines: &mut I, question: &str) -> Result<String> {
    print!("{}", question);
    io::stdout().flush()?;

    match lines.next() {
        Some(line) => Ok(line?.trim().to_string()),
        // Nothing more to read, asking again would spin forever
        None => Err(ProbeError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "input closed",
        ))),
    }
}
