//! Shop Management System installer CLI
//!
//! `shop-install` deploys the shop application as a systemd service.
//!
//! ## Commands
//!
//! - `install` (default): prompt for repository and port, then install
//! - `plan`: show what an install would do, without running anything
//! - `unit`: print the service unit for a port
//! - `status`: ask systemd whether the service is active

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use shopdeploy_core::privilege::ESCALATED_FLAG;
use shopdeploy_core::{
    collect_request, init_tracing, is_privileged, reexec_with_sudo, resolve_owner, CheckoutState,
    InstallError, InstallRequest, Port, RequestInputs, ServiceUnit, Settings,
};
use shopdeploy_pipeline::{
    CommandRunner, CommandSpec, InstallPipeline, InstallPlan, InstallReport, SystemRunner,
};
use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "shop-install")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Install the Shop Management System as a systemd service", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and a JSON install report
    #[arg(long, global = true)]
    json: bool,

    /// TOML file overriding install settings
    #[arg(short, long, global = true, env = "SHOP_DEPLOY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    install: InstallArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install or update the application and (re)start its service
    Install(InstallArgs),

    /// Show the install plan without executing it
    Plan(RequestArgs),

    /// Print the systemd unit that would be written
    Unit {
        /// Port placed in the unit environment
        #[arg(short, long)]
        port: Option<String>,

        /// User the service runs as (default: invoking user)
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Show whether the service is active
    Status,
}

#[derive(Args, Debug, Clone, Default)]
struct RequestArgs {
    /// Repository to deploy (prompted when omitted)
    #[arg(long, env = "SHOP_REPO_URL")]
    repo_url: Option<String>,

    /// Port the application listens on (prompted when omitted)
    #[arg(short, long, env = "SHOP_PORT")]
    port: Option<String>,

    /// Owner of the checkout and service user (default: invoking user)
    #[arg(short, long)]
    user: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
struct InstallArgs {
    #[command(flatten)]
    request: RequestArgs,

    /// Accept defaults instead of prompting
    #[arg(short, long)]
    yes: bool,

    /// Print the plan and exit without changing the host
    #[arg(long)]
    dry_run: bool,

    /// Set on the command line re-executed under sudo
    #[arg(long, hide = true)]
    escalated: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    let globals = Globals {
        verbose: cli.verbose,
        json: cli.json,
        config: cli.config,
    };

    match cli.command {
        None => cmd_install(&settings, &cli.install, &globals).await,
        Some(Commands::Install(args)) => cmd_install(&settings, &args, &globals).await,
        Some(Commands::Plan(args)) => cmd_plan(&settings, &args),
        Some(Commands::Unit { port, user }) => {
            cmd_unit(&settings, port.as_deref(), user.as_deref())
        }
        Some(Commands::Status) => cmd_status(&settings).await,
    }
}

/// Global flags, kept for the command line re-run under sudo.
#[derive(Debug, Clone, Default)]
struct Globals {
    verbose: bool,
    json: bool,
    config: Option<PathBuf>,
}

/// Arguments for the sudo re-run, rebuilt from the parsed values.
///
/// sudo resets the environment, so values that came from
/// `SHOP_REPO_URL`, `SHOP_PORT` or `SHOP_DEPLOY_CONFIG` are passed as
/// flags. The config path is made absolute against `cwd`.
fn relaunch_args(globals: &Globals, args: &InstallArgs, cwd: &Path) -> Vec<OsString> {
    let mut argv: Vec<OsString> = Vec::new();
    if globals.verbose {
        argv.push("--verbose".into());
    }
    if globals.json {
        argv.push("--json".into());
    }
    if let Some(config) = &globals.config {
        argv.push("--config".into());
        argv.push(cwd.join(config).into_os_string());
    }

    argv.push("install".into());
    let request = &args.request;
    for (flag, value) in [
        ("--repo-url", &request.repo_url),
        ("--port", &request.port),
        ("--user", &request.user),
    ] {
        if let Some(value) = value {
            argv.push(flag.into());
            argv.push(value.into());
        }
    }
    if args.yes {
        argv.push("--yes".into());
    }
    if args.escalated {
        argv.push(ESCALATED_FLAG.into());
    }
    argv
}

/// Invoking user, unless overridden on the command line.
fn owner_for(user: Option<&str>) -> String {
    match user {
        Some(user) if !user.trim().is_empty() => user.trim().to_string(),
        _ => resolve_owner(
            std::env::var("SUDO_USER").ok().as_deref(),
            std::env::var("USER").ok().as_deref(),
        ),
    }
}

fn inputs_from(args: &RequestArgs, assume_defaults: bool) -> RequestInputs {
    RequestInputs {
        repo_url: args.repo_url.clone(),
        port: args.port.clone(),
        assume_defaults,
    }
}

/// Resolve the request (prompting as needed) and plan against the host.
fn build_plan<R: BufRead, W: Write>(
    settings: &Settings,
    inputs: &RequestInputs,
    owner: &str,
    input: &mut R,
    output: &mut W,
) -> Result<InstallPlan> {
    let request = collect_request(settings, inputs, owner, input, output)
        .context("Invalid install parameters")?;
    let checkout = CheckoutState::probe(&settings.install_dir);
    info!(checkout = ?checkout, dir = %settings.install_dir.display(), "Probed install directory");
    Ok(InstallPlan::build(settings, &request, checkout))
}

/// Re-run under sudo with `relaunch` unless already root.
async fn ensure_privileged(
    runner: &dyn CommandRunner,
    escalated: bool,
    relaunch: &[OsString],
) -> Result<()> {
    let output = runner
        .run(&CommandSpec::new("id", ["-u"]), None)
        .await
        .context("Failed to determine current user id")?;
    if is_privileged(&output.stdout)? {
        return Ok(());
    }
    if escalated {
        return Err(InstallError::Privilege(
            "still not running as root after sudo".to_string(),
        )
        .into());
    }

    info!("Root privileges required, re-running under sudo");
    let exe = std::env::current_exe().context("Cannot locate installer executable")?;
    Err(reexec_with_sudo(&exe, relaunch).into())
}

async fn cmd_install(settings: &Settings, args: &InstallArgs, globals: &Globals) -> Result<()> {
    let json = globals.json;
    let runner = SystemRunner;
    if !args.dry_run {
        let cwd = std::env::current_dir().context("Cannot determine working directory")?;
        let relaunch = relaunch_args(globals, args, &cwd);
        ensure_privileged(&runner, args.escalated, &relaunch).await?;
    }

    let owner = owner_for(args.request.user.as_deref());
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();
    let plan = build_plan(
        settings,
        &inputs_from(&args.request, args.yes),
        &owner,
        &mut input,
        &mut output,
    )?;

    if args.dry_run {
        print!("{}", plan.describe());
        return Ok(());
    }

    let timeout = match settings.step_timeout_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    let report = InstallPipeline::run(&runner, &plan, timeout)
        .await
        .context("Install pipeline failed to run")?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        print_report(&report);
    }

    let report = report.into_result()?;
    if !json {
        println!();
        println!("Installation complete.");
        println!("Open {} in your browser.", report.url);
    }
    Ok(())
}

fn print_report(report: &InstallReport) {
    println!();
    println!("Run ID: {}", report.run_id);
    println!("Status: {}", if report.success { "✓ SUCCEEDED" } else { "✗ FAILED" });
    println!("Duration: {}ms", report.duration_ms);
    println!();

    for step in &report.steps {
        let mark = match step.status {
            shopdeploy_pipeline::StepStatus::Succeeded => "✓",
            shopdeploy_pipeline::StepStatus::Failed => "✗",
            shopdeploy_pipeline::StepStatus::Skipped => "-",
        };
        println!("  {} [{}] {} ({}ms)", mark, step.phase, step.step, step.duration_ms);
    }

    if let Some(failure) = &report.failure {
        println!();
        println!("Failed step: {}", failure.step);
        println!("{}", failure.detail);
    }
}

fn cmd_plan(settings: &Settings, args: &RequestArgs) -> Result<()> {
    let owner = owner_for(args.user.as_deref());
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();
    let plan = build_plan(settings, &inputs_from(args, true), &owner, &mut input, &mut output)?;
    print!("{}", plan.describe());
    Ok(())
}

fn render_unit(settings: &Settings, port: Option<&str>, user: Option<&str>) -> Result<String> {
    let port = match port {
        Some(text) => Port::parse(text)?,
        None => Port::new(settings.default_port)?,
    };
    let request = InstallRequest::new(settings.default_repo_url.clone(), port, owner_for(user))?;
    Ok(ServiceUnit::new(settings, &request).render())
}

fn cmd_unit(settings: &Settings, port: Option<&str>, user: Option<&str>) -> Result<()> {
    print!("{}", render_unit(settings, port, user)?);
    Ok(())
}

async fn cmd_status(settings: &Settings) -> Result<()> {
    let unit = settings.unit_name();
    let output = SystemRunner
        .run(&CommandSpec::new("systemctl", ["is-active", unit.as_str()]), None)
        .await
        .context("Failed to query systemd")?;

    let state = output.stdout.trim();
    println!("{}: {}", unit, if state.is_empty() { "unknown" } else { state });
    if !output.success() {
        anyhow::bail!("{} is not active", unit);
    }
    Ok(())
}
