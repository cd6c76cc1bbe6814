use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use milconn_transport::Transport;
use milconn_value::Interpretation;
use tracing::{info, warn};

use crate::cmd::{check_interpretation, parse_duration, ClientJob, Session, WatchArgs};
use crate::exit::{client_error, CliError, CliResult, DATA_INVALID, INTERNAL, SUCCESS};
use crate::output::{print_readings, OutputFormat, Reading};

pub struct Job {
    args: WatchArgs,
    how: Interpretation,
    interval: Duration,
    timeout: Option<Duration>,
    format: OutputFormat,
}

impl Job {
    pub fn new(args: WatchArgs, format: OutputFormat) -> CliResult<Self> {
        let how = Interpretation::from(args.interpret);
        check_interpretation(args.kind, how)?;
        let interval = parse_duration(&args.interval)?;
        let timeout = args.timeout.as_deref().map(parse_duration).transpose()?;
        Ok(Self {
            args,
            how,
            interval,
            timeout,
            format,
        })
    }
}

impl ClientJob for Job {
    fn run<T: Transport>(self, session: &Session<'_, T>) -> CliResult<i32> {
        let client = session.client;
        let timeout = self.timeout.unwrap_or(client.config().get_timeout);
        let kind = self.args.kind;
        let stop = install_ctrlc_handler()?;

        let mut rounds = 0usize;
        loop {
            let mut readings = Vec::with_capacity(self.args.addresses.len());
            for &address in &self.args.addresses {
                match client.get(kind, address, timeout) {
                    Ok(wire) => {
                        let value = wire.interpret(self.how).map_err(|err| {
                            CliError::new(DATA_INVALID, format!("watch failed: {err}"))
                        })?;
                        readings.push(Reading::new(address, wire, value));
                    }
                    // Timeouts skip the slot for this round only.
                    Err(err) if err.is_timeout() => {
                        warn!(%kind, address, %err, "no response this round");
                    }
                    Err(err) => return Err(client_error("watch failed", err)),
                }
            }
            print_readings(&readings, self.how, self.format);

            rounds += 1;
            if self.args.count.is_some_and(|count| rounds >= count) {
                return Ok(SUCCESS);
            }
            match stop.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    info!(rounds, "watch interrupted");
                    return Ok(SUCCESS);
                }
            }
        }
    }
}

fn install_ctrlc_handler() -> CliResult<mpsc::Receiver<()>> {
    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))?;
    Ok(rx)
}
