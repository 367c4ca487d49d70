//! Purpose: `pairfield` CLI entry point.
//! Role: Binary crate root; parses args, runs commands, emits results on stdout.
//! Invariants: `render` prints bare HTML; `parse`/`normalize` print JSON.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal, Read};
use std::net::SocketAddr;

use clap::{CommandFactory, Parser, Subcommand, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;

mod command_dispatch;
mod serve;

use pairfield::api::{Attrs, Error, ErrorKind, LengthPolicy, PairListWidget, to_exit_code};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Try `pairfield --help`."));
            }
        },
    };

    let widget = cli.widget.build()?;
    command_dispatch::dispatch_command(cli.command, widget)
        .map_err(add_malformed_hint)
        .map_err(add_internal_hint)
}

#[derive(Parser)]
#[command(
    name = "pairfield",
    version,
    about = "Render and parse key/value pair-list form fields",
    long_about = r#"Render a stored JSON pair list ([["key","value"],...]) as paired HTML text inputs,
and turn a submitted form back into the JSON pair list."#,
    after_help = r#"EXAMPLES
  $ pairfield render tags '[["env","prod"],["tier","web"]]'
  $ pairfield --key-attr class=key render tags '[["env","prod"]]'
  $ pairfield parse tags 'json_key%5Btags%5D=env&json_value%5Btags%5D=prod'
  $ pairfield normalize '[["","x"],["a","1"]]'
  $ pairfield serve --bind 127.0.0.1:9710"#,
    arg_required_else_help = true
)]
struct Cli {
    #[command(flatten)]
    widget: WidgetArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug, Clone)]
struct WidgetArgs {
    #[arg(
        long = "key-attr",
        global = true,
        value_name = "NAME=VALUE",
        help = "Repeatable attribute applied to every key input"
    )]
    key_attrs: Vec<String>,
    #[arg(
        long = "value-attr",
        global = true,
        value_name = "NAME=VALUE",
        help = "Repeatable attribute applied to every value input"
    )]
    value_attrs: Vec<String>,
    #[arg(
        long,
        global = true,
        default_value_t = 0,
        help = "Blank input pairs appended after the stored pairs"
    )]
    extra_rows: usize,
    #[arg(
        long,
        global = true,
        help = "Reject submissions whose key and value counts differ (default: truncate)"
    )]
    strict: bool,
}

impl WidgetArgs {
    fn build(&self) -> Result<PairListWidget, Error> {
        let policy = if self.strict {
            LengthPolicy::Reject
        } else {
            LengthPolicy::Truncate
        };
        Ok(PairListWidget::new()
            .with_key_attrs(parse_attrs(&self.key_attrs)?)
            .with_value_attrs(parse_attrs(&self.value_attrs)?)
            .with_length_policy(policy)
            .with_extra_rows(self.extra_rows))
    }
}

fn parse_attrs(assignments: &[String]) -> Result<Attrs, Error> {
    assignments
        .iter()
        .map(|assignment| Attrs::parse_assignment(assignment))
        .collect()
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Render a stored pair list as HTML inputs",
        after_help = r#"EXAMPLES
  $ pairfield render tags '[["env","prod"]]'
  $ echo '[["a","1"]]' | pairfield render tags -"#
    )]
    Render {
        #[arg(help = "Field name used in json_key[NAME] / json_value[NAME]")]
        name: String,
        #[arg(help = "Stored JSON value (omit for none, - for stdin)")]
        value: Option<String>,
    },
    #[command(
        about = "Parse a urlencoded form submission into the stored JSON value",
        after_help = r#"NOTES
  - Prints {"field": NAME, "value": "<json>"}, with "value": null when the field was not submitted
  - Reads the body from stdin when BODY is omitted or -"#
    )]
    Parse {
        #[arg(help = "Field name used in json_key[NAME] / json_value[NAME]")]
        name: String,
        #[arg(help = "application/x-www-form-urlencoded body")]
        body: Option<String>,
    },
    #[command(about = "Drop empty keys and re-encode a stored value")]
    Normalize {
        #[arg(help = "Stored JSON value (omit or - for stdin)")]
        value: Option<String>,
    },
    #[command(about = "Run the loopback demo form host")]
    Serve {
        #[arg(long, default_value = "127.0.0.1:9710", help = "Bind address (host:port)")]
        bind: String,
        #[arg(long, help = "Allow binding to a non-loopback address")]
        allow_non_loopback: bool,
        #[arg(
            long,
            default_value_t = 64 * 1024,
            help = "Maximum request body size in bytes"
        )]
        max_body_bytes: u64,
        #[arg(long, help = "Reject submissions that leave no key/value pair")]
        required: bool,
    },
    #[command(about = "Print shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_bind(bind: &str) -> Result<SocketAddr, Error> {
    bind.parse().map_err(|_| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid bind address")
            .with_hint("Use a host:port value like 127.0.0.1:9710.")
    })
}

fn read_input(arg: Option<String>) -> Result<String, Error> {
    match arg {
        Some(value) if value != "-" => Ok(value),
        Some(_) => read_stdin(),
        None if io::stdin().is_terminal() => Ok(String::new()),
        None => read_stdin(),
    }
}

fn read_stdin() -> Result<String, Error> {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read stdin")
            .with_source(err)
    })?;
    Ok(buf)
}

fn emit_json(value: Value) {
    let json = serde_json::to_string(&value)
        .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn add_malformed_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::MalformedValue => {
            err.with_hint("Stored values must look like [[\"key\",\"value\"],...].")
        }
        ErrorKind::MalformedSubmission => {
            err.with_hint("Submit one json_value[NAME] for each json_key[NAME].")
        }
        _ => err,
    }
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "Unexpected internal failure. Retry with RUST_BACKTRACE=1 and share command/context if it persists.",
    )
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::MalformedValue => "malformed stored value".to_string(),
        ErrorKind::MalformedSubmission => "malformed submission".to_string(),
        ErrorKind::Required => "value is required".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(field) = err.field() {
        inner.insert("field".to_string(), json!(field));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    if let Some(field) = err.field() {
        lines.push(format!("field: {field}"));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!("caused by: {cause}"));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
