use std::fmt;

use milconn_client::{ClientError, ConfigError};
use milconn_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const CONNECTION_ERROR: i32 = 3;
pub const SEND_ERROR: i32 = 4;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    let code = match &err {
        ClientError::Connection(_) => CONNECTION_ERROR,
        ClientError::Send { .. } => SEND_ERROR,
        ClientError::Timeout { .. } => TIMEOUT,
        ClientError::Validation(_) => DATA_INVALID,
        ClientError::Transport(TransportError::InvalidHost { .. }) => USAGE,
        ClientError::Transport(TransportError::CreateFailed) => INTERNAL,
        ClientError::Api(_) => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn config_error(err: ConfigError) -> CliError {
    CliError::new(USAGE, format!("config: {err}"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use milconn_value::{ValueError, VarKind};

    use super::*;

    #[test]
    fn client_errors_map_to_stable_codes() {
        let cases = [
            (ClientError::Connection("down".into()), CONNECTION_ERROR),
            (
                ClientError::Send {
                    kind: VarKind::Word,
                    address: 1,
                },
                SEND_ERROR,
            ),
            (
                ClientError::Timeout {
                    kind: VarKind::Bool,
                    address: 0,
                    timeout: Duration::from_secs(2),
                },
                TIMEOUT,
            ),
            (
                ClientError::Validation(ValueError::UnknownKind(9)),
                DATA_INVALID,
            ),
            (ClientError::Api("getter failed".into()), FAILURE),
        ];
        for (err, code) in cases {
            assert_eq!(client_error("op", err).code, code);
        }
    }

    #[test]
    fn message_carries_context() {
        let err = client_error("get failed", ClientError::Connection("not connected".into()));
        assert_eq!(err.to_string(), "get failed: connection error: not connected");
    }
}
