//! Ordered install plan.

use serde::{Deserialize, Serialize};
use shopdeploy_core::{CheckoutState, InstallRequest, Phase, ServiceUnit, Settings};
use std::fmt::Write as _;
use std::path::Path;

use crate::step::{CommandSpec, Step, StepAction};

/// Everything an install run will do, decided before anything runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallPlan {
    pub request: InstallRequest,
    pub checkout: CheckoutState,
    pub unit: ServiceUnit,
    pub steps: Vec<Step>,
}

impl InstallPlan {
    /// Build the plan for `request` given what is already at the install dir.
    pub fn build(settings: &Settings, request: &InstallRequest, checkout: CheckoutState) -> Self {
        let unit = ServiceUnit::new(settings, request);
        let dir = settings.install_dir.as_path();

        let mut steps = Vec::new();
        steps.extend(package_steps(settings));
        steps.extend(checkout_steps(dir, &request.repo_url, checkout));
        steps.push(Step::command(
            Phase::Ownership,
            CommandSpec::new(
                "chown",
                ["-R".to_string(), format!("{}:", request.owner), path_arg(dir)],
            ),
        ));
        steps.push(Step::command(
            Phase::Environment,
            CommandSpec::new(
                settings.python.clone(),
                ["-m".to_string(), "venv".to_string(), path_arg(&settings.venv_dir())],
            ),
        ));
        steps.extend(dependency_steps(settings));
        steps.push(Step::write_file(
            Phase::ServiceUnit,
            &settings.unit_path(),
            unit.render(),
        ));
        steps.extend(service_steps(&settings.unit_name()));

        Self {
            request: request.clone(),
            checkout,
            unit,
            steps,
        }
    }

    /// URL the application is reachable at once the service is up.
    pub fn url(&self) -> String {
        self.request.access_url()
    }

    pub fn commands(&self) -> impl Iterator<Item = &CommandSpec> {
        self.steps.iter().filter_map(Step::as_command)
    }

    /// Numbered listing for `plan` and `--dry-run`.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Repository: {}", self.request.repo_url);
        let _ = writeln!(out, "Port: {}", self.request.port);
        let _ = writeln!(out, "Owner: {}", self.request.owner);
        let _ = writeln!(out, "Checkout: {:?}", self.checkout);
        let _ = writeln!(out);
        for (i, step) in self.steps.iter().enumerate() {
            let _ = writeln!(out, "{:>2}. [{}] {}", i + 1, step.phase, step.name());
            if let StepAction::WriteFile { contents, .. } = &step.action {
                for line in contents.lines() {
                    let _ = writeln!(out, "      | {line}");
                }
            }
        }
        out
    }
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

fn package_steps(settings: &Settings) -> Vec<Step> {
    let manager = settings.package_manager.as_str();
    let mut install_args = vec!["install".to_string(), "-y".to_string()];
    install_args.extend(settings.packages.iter().cloned());

    vec![
        Step::command(
            Phase::Packages,
            CommandSpec::new(manager, ["update"]).env("DEBIAN_FRONTEND", "noninteractive"),
        ),
        Step::command(
            Phase::Packages,
            CommandSpec::new(manager, install_args).env("DEBIAN_FRONTEND", "noninteractive"),
        ),
    ]
}

/// Fast-forward an existing checkout, otherwise clone fresh.
pub fn checkout_steps(dir: &Path, repo_url: &str, state: CheckoutState) -> Vec<Step> {
    let clone = Step::command(
        Phase::Checkout,
        CommandSpec::new("git", ["clone".to_string(), repo_url.to_string(), path_arg(dir)]),
    );

    match state {
        CheckoutState::Existing => vec![Step::command(
            Phase::Checkout,
            git_in(dir, &["pull", "--ff-only"]),
        )],
        CheckoutState::Stale => vec![Step::remove_dir(Phase::Checkout, dir), clone],
        CheckoutState::Absent => vec![clone],
    }
}

/// `git rev-parse HEAD` in the checkout, for the run report.
pub fn head_command(dir: &Path) -> CommandSpec {
    git_in(dir, &["rev-parse", "HEAD"])
}

/// git against an existing checkout.
///
/// The checkout belongs to the service user after the first run;
/// safe.directory keeps git from refusing it when run as root.
fn git_in(dir: &Path, args: &[&str]) -> CommandSpec {
    let mut all = vec![
        "-c".to_string(),
        format!("safe.directory={}", dir.display()),
        "-C".to_string(),
        path_arg(dir),
    ];
    all.extend(args.iter().map(|a| a.to_string()));
    CommandSpec::new("git", all)
}

fn dependency_steps(settings: &Settings) -> Vec<Step> {
    let pip = path_arg(&settings.pip_bin());
    vec![
        Step::command(
            Phase::Dependencies,
            CommandSpec::new(pip.clone(), ["install", "--upgrade", "pip"]),
        ),
        Step::command(
            Phase::Dependencies,
            CommandSpec::new(
                pip,
                [
                    "install".to_string(),
                    "-r".to_string(),
                    path_arg(&settings.requirements_path()),
                ],
            ),
        ),
    ]
}

fn service_steps(unit_name: &str) -> Vec<Step> {
    ["daemon-reload", "enable", "restart"]
        .into_iter()
        .map(|verb| {
            let mut args = vec![verb.to_string()];
            if verb != "daemon-reload" {
                args.push(unit_name.to_string());
            }
            Step::command(Phase::ServiceManager, CommandSpec::new("systemctl", args))
        })
        .collect()
}
