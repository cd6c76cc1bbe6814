use milconn_transport::Transport;
use milconn_value::{Address, Value, WireValue};

use crate::cmd::{ClientJob, Session, SetArgs};
use crate::exit::{client_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_write, OutputFormat};

pub struct Job {
    address: Address,
    wire: WireValue,
    format: OutputFormat,
}

impl Job {
    /// Values are checked here so a bad value never costs a connection.
    pub fn new(args: SetArgs, format: OutputFormat) -> CliResult<Self> {
        let wire = Value::parse(args.kind, &args.value)
            .and_then(|value| value.encode(args.kind))
            .map_err(|err| CliError::new(DATA_INVALID, format!("set failed: {err}")))?;
        Ok(Self {
            address: args.address,
            wire,
            format,
        })
    }
}

impl ClientJob for Job {
    fn run<T: Transport>(self, session: &Session<'_, T>) -> CliResult<i32> {
        session
            .client
            .write(self.address, self.wire)
            .map_err(|err| client_error("set failed", err))?;

        print_write(self.address, self.wire, self.format);
        Ok(SUCCESS)
    }
}
