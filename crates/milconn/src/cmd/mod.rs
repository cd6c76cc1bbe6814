use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Args, Subcommand, ValueEnum};
use milconn_client::{Client, ClientConfig};
use milconn_transport::{SimTransport, Transport};
use milconn_value::{Address, Interpretation, Value, VarKind, WireValue};
use tracing::debug;

use crate::exit::{client_error, config_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod get;
pub mod probe;
pub mod set;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read one value.
    Get(GetArgs),
    /// Write one value.
    Set(SetArgs),
    /// Poll values on an interval until interrupted.
    Watch(WatchArgs),
    /// Connect and report link state and connect latency.
    Probe(ProbeArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Where and how to reach the controller.
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Controller address.
    #[arg(long, env = "MILCONN_HOST", default_value = "192.168.1.254", global = true)]
    pub host: String,

    /// Controller port.
    #[arg(long, env = "MILCONN_PORT", default_value_t = 60000, global = true)]
    pub port: u16,

    /// Talk to an in-process simulated controller instead of the native engine.
    #[arg(long, global = true)]
    pub sim: bool,

    /// Seed simulated memory, e.g. `dword:150=123.456` (repeatable).
    #[arg(long = "sim-preset", value_name = "KIND:ADDR=VALUE", global = true)]
    pub sim_presets: Vec<String>,

    /// Client timing config (JSON).
    #[arg(long, value_name = "FILE", env = "MILCONN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Connect timeout (e.g. 5s, 500ms). Overrides the config file.
    #[arg(long, value_name = "DURATION", global = true)]
    pub connect_timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Variable kind: bool, byte, word, dword, lword.
    pub kind: VarKind,
    /// Variable address.
    pub address: Address,
    /// How to present the raw value.
    #[arg(long = "as", value_name = "HOW", default_value = "raw")]
    pub interpret: InterpretArg,
    /// Response timeout (e.g. 2s, 500ms). Defaults to the configured get timeout.
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Variable kind: bool, byte, word, dword, lword.
    pub kind: VarKind,
    /// Variable address.
    pub address: Address,
    /// `true`/`false`, an integer (decimal or 0x hex), or a float for dword/lword.
    #[arg(allow_hyphen_values = true)]
    pub value: String,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Variable kind: bool, byte, word, dword, lword.
    pub kind: VarKind,
    /// Addresses to poll.
    #[arg(required = true, num_args = 1..)]
    pub addresses: Vec<Address>,
    /// Poll interval (e.g. 500ms, 1s).
    #[arg(long, default_value = "500ms")]
    pub interval: String,
    /// Stop after N polling rounds.
    #[arg(long)]
    pub count: Option<usize>,
    /// How to present raw values.
    #[arg(long = "as", value_name = "HOW", default_value = "raw")]
    pub interpret: InterpretArg,
    /// Response timeout per read. Defaults to the configured get timeout.
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct ProbeArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum InterpretArg {
    Raw,
    Signed,
    Float,
}

impl From<InterpretArg> for Interpretation {
    fn from(arg: InterpretArg) -> Self {
        match arg {
            InterpretArg::Raw => Interpretation::Raw,
            InterpretArg::Signed => Interpretation::Signed,
            InterpretArg::Float => Interpretation::Float,
        }
    }
}

/// `--as float` only makes sense for the kinds that can hold a float.
pub fn check_interpretation(kind: VarKind, how: Interpretation) -> CliResult<()> {
    if how == Interpretation::Float && !matches!(kind, VarKind::DWord | VarKind::LWord) {
        return Err(CliError::new(
            USAGE,
            format!("--as float needs dword or lword, not {kind}"),
        ));
    }
    Ok(())
}

/// A subcommand that needs a connected client.
pub trait ClientJob {
    fn run<T: Transport>(self, session: &Session<'_, T>) -> CliResult<i32>;
}

/// A connected client plus what it took to get there.
pub struct Session<'a, T: Transport> {
    pub client: &'a Client<T>,
    pub target: &'a Target,
    pub connect_latency: Duration,
}

/// Resolved connection settings.
#[derive(Debug)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub sim: bool,
    pub presets: Vec<(Address, WireValue)>,
    pub config: ClientConfig,
}

impl Target {
    pub fn from_args(args: &ConnectionArgs) -> CliResult<Self> {
        let mut config = match &args.config {
            Some(path) => ClientConfig::from_path(path).map_err(config_error)?,
            None => ClientConfig::default(),
        };
        if let Some(raw) = &args.connect_timeout {
            config.connect_timeout = parse_duration(raw)?;
        }
        if !args.sim && !args.sim_presets.is_empty() {
            return Err(CliError::new(USAGE, "--sim-preset requires --sim"));
        }
        let presets = args
            .sim_presets
            .iter()
            .map(|raw| parse_preset(raw))
            .collect::<CliResult<Vec<_>>>()?;
        Ok(Self {
            host: args.host.clone(),
            port: args.port,
            sim: args.sim,
            presets,
            config,
        })
    }

    pub fn transport_name(&self) -> &'static str {
        if self.sim {
            "sim"
        } else {
            "native"
        }
    }
}

pub fn run(command: Command, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Version(args) => version::run(args),
        Command::Get(args) => with_client(&Target::from_args(conn)?, get::Job::new(args, format)?),
        Command::Set(args) => with_client(&Target::from_args(conn)?, set::Job::new(args, format)?),
        Command::Watch(args) => {
            with_client(&Target::from_args(conn)?, watch::Job::new(args, format)?)
        }
        Command::Probe(_) => with_client(&Target::from_args(conn)?, probe::Job { format }),
    }
}

fn with_client<J: ClientJob>(target: &Target, job: J) -> CliResult<i32> {
    if target.sim {
        let sim = SimTransport::new();
        for (address, value) in &target.presets {
            sim.preset(*address, *value);
        }
        return connect_and_run(Arc::new(sim), target, job);
    }
    with_native_client(target, job)
}

#[cfg(feature = "native")]
fn with_native_client<J: ClientJob>(target: &Target, job: J) -> CliResult<i32> {
    connect_and_run(
        Arc::new(milconn_transport::NativeTransport::new()),
        target,
        job,
    )
}

#[cfg(not(feature = "native"))]
fn with_native_client<J: ClientJob>(_target: &Target, _job: J) -> CliResult<i32> {
    Err(CliError::new(
        USAGE,
        "this build has no native transport (enable the `native` feature) - use --sim",
    ))
}

fn connect_and_run<T: Transport, J: ClientJob>(
    transport: Arc<T>,
    target: &Target,
    job: J,
) -> CliResult<i32> {
    let client = Client::with_config(transport, target.config.clone());
    let started = Instant::now();
    client
        .connect(&target.host, target.port, target.config.connect_timeout)
        .map_err(|err| client_error("connect failed", err))?;
    let session = Session {
        client: &client,
        target,
        connect_latency: started.elapsed(),
    };
    debug!(latency = ?session.connect_latency, "session ready");
    let result = job.run(&session);
    client.disconnect();
    result
}

/// Parse `KIND:ADDR=VALUE`.
pub fn parse_preset(input: &str) -> CliResult<(Address, WireValue)> {
    let usage = || CliError::new(USAGE, format!("invalid --sim-preset {input:?}: expected KIND:ADDR=VALUE"));
    let (kind, rest) = input.split_once(':').ok_or_else(usage)?;
    let (address, value) = rest.split_once('=').ok_or_else(usage)?;
    let kind: VarKind = kind
        .parse()
        .map_err(|err| CliError::new(USAGE, format!("invalid --sim-preset {input:?}: {err}")))?;
    let address: Address = address.trim().parse().map_err(|_| usage())?;
    let wire = Value::parse(kind, value)
        .and_then(|value| value.encode(kind))
        .map_err(|err| CliError::new(USAGE, format!("invalid --sim-preset {input:?}: {err}")))?;
    Ok((address, wire))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let invalid = || CliError::new(USAGE, format!("invalid duration value: {input}"));
    let value: f64 = number.parse().map_err(|_| invalid())?;
    let seconds = match unit {
        "ms" => value / 1000.0,
        _ => value,
    };
    let duration = Duration::try_from_secs_f64(seconds).map_err(|_| invalid())?;

    if duration.is_zero() {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }
    Ok(duration)
}
