//! Purpose: Hold top-level CLI command dispatch for `pairfield`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Output envelopes and exit code semantics stay stable.

use super::*;
use pairfield::api::SubmittedFields;

pub(super) fn dispatch_command(command: Command, widget: PairListWidget) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "pairfield", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Render { name, value } => {
            let value = read_input(value)?;
            let html = widget.render(&name, Some(&value))?;
            if !html.is_empty() {
                println!("{html}");
            }
            Ok(RunOutcome::ok())
        }
        Command::Parse { name, body } => {
            let body = read_input(body)?;
            let fields = SubmittedFields::from_urlencoded(body.trim_end().as_bytes());
            let value = widget.parse(&fields, &name)?;
            emit_json(json!({ "field": name, "value": value }));
            Ok(RunOutcome::ok())
        }
        Command::Normalize { value } => {
            let value = read_input(value)?;
            let normalized = widget.normalize(&value)?;
            emit_json(json!({ "value": normalized }));
            Ok(RunOutcome::ok())
        }
        Command::Serve {
            bind,
            allow_non_loopback,
            max_body_bytes,
            required,
        } => {
            let config = serve::ServeConfig {
                bind: parse_bind(&bind)?,
                allow_non_loopback,
                max_body_bytes,
                required,
                widget,
            };
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve::serve(config))?;
            Ok(RunOutcome::ok())
        }
    }
}
