//! Interactive prompts for the repository URL and port.

use std::io::{BufRead, Write};

use crate::config::Settings;
use crate::error::Result;
use crate::request::{InstallRequest, Port};

/// Values already supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct RequestInputs {
    pub repo_url: Option<String>,
    pub port: Option<String>,
    /// Take defaults for anything not supplied instead of prompting.
    pub assume_defaults: bool,
}

/// Print `label [default]: `, read one line, fall back to `default` when
/// the answer is empty or input is closed.
pub fn ask<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &str,
    default: &str,
) -> Result<String> {
    write!(output, "{label} [{default}]: ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim();
    if answer.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(answer.to_string())
    }
}

pub fn ask_port<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &str,
    default: Port,
) -> Result<Port> {
    let answer = ask(input, output, label, &default.to_string())?;
    Port::parse(&answer)
}

/// Build the install request, prompting only for what `inputs` lacks.
pub fn collect_request<R: BufRead, W: Write>(
    settings: &Settings,
    inputs: &RequestInputs,
    owner: &str,
    input: &mut R,
    output: &mut W,
) -> Result<InstallRequest> {
    let repo_url = match (&inputs.repo_url, inputs.assume_defaults) {
        (Some(url), _) => url.clone(),
        (None, true) => settings.default_repo_url.clone(),
        (None, false) => ask(input, output, "Repository URL", &settings.default_repo_url)?,
    };

    let default_port = Port::new(settings.default_port)?;
    let port = match (&inputs.port, inputs.assume_defaults) {
        (Some(port), _) => Port::parse(port)?,
        (None, true) => default_port,
        (None, false) => ask_port(input, output, "Port", default_port)?,
    };

    InstallRequest::new(repo_url, port, owner)
}
