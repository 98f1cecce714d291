// src/exec/command.rs

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{anyhow, bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::pointer::Pointer;
use crate::exec::backend::{GenerationRequest, OutputGenerator};
use crate::logging::PLUGIN_TARGET;

/// Runs each target's `cmd` through the platform shell.
///
/// The command sees its inputs through the environment:
/// - `GENDAG_OUTPUT`: absolute output path
/// - `GENDAG_SCHEMA`, `GENDAG_DOCUMENTS`: newline-separated raw pointers
/// - `GENDAG_PRESET`: preset name, when set
///
/// Its stdout is the generated text.
#[derive(Debug, Clone, Default)]
pub struct CommandGenerator;

impl CommandGenerator {
    pub fn new() -> Self {
        Self
    }
}

fn join_pointers(pointers: &[Pointer]) -> String {
    pointers
        .iter()
        .map(Pointer::as_str)
        .collect::<Vec<_>>()
        .join("\n")
}

fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

async fn run_command(request: &GenerationRequest) -> Result<String> {
    let Some(cmd_line) = request.cmd.as_deref() else {
        bail!("output '{}' has no `cmd` to generate it", request.output);
    };

    info!(output = %request.output, cmd = %cmd_line, "generating output");

    let mut cmd = shell_command(cmd_line);
    cmd.current_dir(&request.cwd)
        .env("GENDAG_OUTPUT", &request.output_path)
        .env("GENDAG_SCHEMA", join_pointers(&request.schema))
        .env("GENDAG_DOCUMENTS", join_pointers(&request.documents))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(preset) = &request.preset {
        cmd.env("GENDAG_PRESET", preset);
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning generator for output '{}'", request.output))?;

    // Always consume stderr so buffers don't fill; log at debug.
    if let Some(stderr) = child.stderr.take() {
        let output = request.output.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: PLUGIN_TARGET, output = %output, "stderr: {}", line);
            }
        });
    }

    let mut generated = String::new();
    if let Some(mut stdout) = child.stdout.take() {
        stdout
            .read_to_string(&mut generated)
            .await
            .with_context(|| format!("reading generator output for '{}'", request.output))?;
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for generator of output '{}'", request.output))?;

    if !status.success() {
        return Err(anyhow!(
            "generator for output '{}' exited with code {}",
            request.output,
            status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        ));
    }

    debug!(output = %request.output, bytes = generated.len(), "generator finished");
    Ok(generated)
}

impl OutputGenerator for CommandGenerator {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(run_command(request))
    }
}
