use std::time::Duration;

use milconn_transport::Transport;
use milconn_value::Interpretation;
use tracing::debug;

use crate::cmd::{check_interpretation, parse_duration, ClientJob, GetArgs, Session};
use crate::exit::{client_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_readings, OutputFormat, Reading};

pub struct Job {
    args: GetArgs,
    how: Interpretation,
    timeout: Option<Duration>,
    format: OutputFormat,
}

impl Job {
    pub fn new(args: GetArgs, format: OutputFormat) -> CliResult<Self> {
        let how = Interpretation::from(args.interpret);
        check_interpretation(args.kind, how)?;
        let timeout = args.timeout.as_deref().map(parse_duration).transpose()?;
        Ok(Self {
            args,
            how,
            timeout,
            format,
        })
    }
}

impl ClientJob for Job {
    fn run<T: Transport>(self, session: &Session<'_, T>) -> CliResult<i32> {
        let client = session.client;
        let timeout = self.timeout.unwrap_or(client.config().get_timeout);
        let (kind, address) = (self.args.kind, self.args.address);
        debug!(%kind, address, ?timeout, "get");

        let wire = client
            .get(kind, address, timeout)
            .map_err(|err| client_error("get failed", err))?;
        let value = wire
            .interpret(self.how)
            .map_err(|err| CliError::new(DATA_INVALID, format!("get failed: {err}")))?;

        print_readings(&[Reading::new(address, wire, value)], self.how, self.format);
        Ok(SUCCESS)
    }
}
