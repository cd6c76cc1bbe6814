use milconn_transport::Transport;

use crate::cmd::{ClientJob, Session};
use crate::exit::{CliResult, CONNECTION_ERROR, SUCCESS};
use crate::output::{print_probe, OutputFormat, ProbeOutput};

pub struct Job {
    pub format: OutputFormat,
}

impl ClientJob for Job {
    fn run<T: Transport>(self, session: &Session<'_, T>) -> CliResult<i32> {
        let connected = session.client.is_connected();
        let out = ProbeOutput {
            transport: session.target.transport_name(),
            host: session.target.host.clone(),
            port: session.target.port,
            connected,
            connect_ms: (session.connect_latency.as_secs_f64() * 1000.0 * 100.0).round() / 100.0,
        };
        print_probe(&out, self.format);
        Ok(if connected { SUCCESS } else { CONNECTION_ERROR })
    }
}
