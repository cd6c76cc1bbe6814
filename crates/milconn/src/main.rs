mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::{Command, ConnectionArgs};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "milconn", version, about = "Milteksan PLC/CNC controller client")]
struct Cli {
    #[command(flatten)]
    conn: ConnectionArgs,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() {
                exit::USAGE
            } else {
                exit::SUCCESS
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, &cli.conn, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use milconn_value::VarKind;

    use super::*;

    #[test]
    fn parses_get_with_globals_after_subcommand() {
        let cli = Cli::try_parse_from([
            "milconn", "get", "dword", "150", "--as", "float", "--sim", "--port", "6000",
        ])
        .expect("get args should parse");

        assert!(cli.conn.sim);
        assert_eq!(cli.conn.port, 6000);
        match cli.command {
            Command::Get(args) => {
                assert_eq!(args.kind, VarKind::DWord);
                assert_eq!(args.address, 150);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn set_accepts_negative_float_values() {
        let cli = Cli::try_parse_from(["milconn", "set", "lword", "160", "-2.5"])
            .expect("negative value should parse");
        assert!(matches!(cli.command, Command::Set(ref args) if args.value == "-2.5"));
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = Cli::try_parse_from(["milconn", "get", "qword", "1"])
            .expect_err("unknown kind should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn watch_requires_an_address() {
        let err = Cli::try_parse_from(["milconn", "watch", "word"])
            .expect_err("missing address should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn default_host_and_port() {
        let cli = Cli::try_parse_from(["milconn", "probe"]).expect("probe should parse");
        assert_eq!(cli.conn.host, "192.168.1.254");
        assert_eq!(cli.conn.port, 60000);
    }
}
