//! Checkout behaviour against real git repositories in temp dirs.

use shopdeploy_core::{CheckoutState, InstallRequest, Phase, Port, Settings};
use shopdeploy_pipeline::plan::checkout_steps;
use shopdeploy_pipeline::{InstallPipeline, InstallPlan, SystemRunner};
use std::path::Path;
use std::process::Command;
use std::time::Duration;

fn run_git(repo_dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn configure_identity(repo_dir: &Path) {
    run_git(repo_dir, &["config", "user.name", "test-user"]);
    run_git(repo_dir, &["config", "user.email", "test@example.com"]);
}

fn commit_file(repo_dir: &Path, name: &str, contents: &str) {
    std::fs::write(repo_dir.join(name), contents).unwrap();
    run_git(repo_dir, &["add", name]);
    run_git(repo_dir, &["commit", "-m", &format!("update {name}")]);
}

/// Origin repository with an `app.py`, plus install settings pointing at
/// a not-yet-existing checkout directory next to it.
fn setup() -> (tempfile::TempDir, std::path::PathBuf, Settings) {
    let root = tempfile::tempdir().unwrap();
    let origin = root.path().join("origin");
    std::fs::create_dir_all(&origin).unwrap();
    run_git(&origin, &["init"]);
    configure_identity(&origin);
    commit_file(&origin, "app.py", "print('shop')\n");

    let settings = Settings {
        install_dir: root.path().join("install"),
        unit_dir: root.path().join("units"),
        ..Settings::default()
    };
    (root, origin, settings)
}

/// Plan restricted to the checkout phase.
fn checkout_plan(settings: &Settings, origin: &Path) -> InstallPlan {
    let request = InstallRequest::new(
        origin.display().to_string(),
        Port::new(8000).unwrap(),
        "shopkeeper",
    )
    .unwrap();
    let state = CheckoutState::probe(&settings.install_dir);
    let mut plan = InstallPlan::build(settings, &request, state);
    plan.steps = checkout_steps(&settings.install_dir, &request.repo_url, state);
    plan
}

#[tokio::test]
async fn fresh_clone_then_noop_update() {
    let (_root, origin, settings) = setup();

    let first = checkout_plan(&settings, &origin);
    assert_eq!(first.checkout, CheckoutState::Absent);
    let report = InstallPipeline::run(&SystemRunner, &first, Some(Duration::from_secs(60)))
        .await
        .unwrap();
    assert!(report.success, "clone failed: {:?}", report.failure);
    assert!(settings.install_dir.join("app.py").exists());
    assert_eq!(
        report.head_sha.as_deref(),
        Some(run_git(&origin, &["rev-parse", "HEAD"]).as_str())
    );

    let second = checkout_plan(&settings, &origin);
    assert_eq!(second.checkout, CheckoutState::Existing);
    let report = InstallPipeline::run(&SystemRunner, &second, Some(Duration::from_secs(60)))
        .await
        .unwrap();
    assert!(report.success, "no-op pull failed: {:?}", report.failure);
    assert_eq!(report.steps.len(), 1);
}

#[tokio::test]
async fn fast_forward_picks_up_new_commits() {
    let (_root, origin, settings) = setup();
    InstallPipeline::run(&SystemRunner, &checkout_plan(&settings, &origin), None)
        .await
        .unwrap();

    commit_file(&origin, "requirements.txt", "flask\n");

    let report = InstallPipeline::run(&SystemRunner, &checkout_plan(&settings, &origin), None)
        .await
        .unwrap();
    assert!(report.success, "pull failed: {:?}", report.failure);
    assert_eq!(
        std::fs::read_to_string(settings.install_dir.join("requirements.txt")).unwrap(),
        "flask\n"
    );
}

#[tokio::test]
async fn diverged_checkout_fails_in_checkout_phase() {
    let (_root, origin, settings) = setup();
    InstallPipeline::run(&SystemRunner, &checkout_plan(&settings, &origin), None)
        .await
        .unwrap();

    configure_identity(&settings.install_dir);
    commit_file(&settings.install_dir, "local.txt", "local change\n");
    commit_file(&origin, "remote.txt", "remote change\n");

    let report = InstallPipeline::run(&SystemRunner, &checkout_plan(&settings, &origin), None)
        .await
        .unwrap();

    assert!(!report.success);
    let failure = report.failure.expect("failure");
    assert_eq!(failure.phase, Phase::Checkout);
    assert_ne!(failure.exit_code, 0);
    assert!(report.head_sha.is_none());
}

#[tokio::test]
async fn unreachable_remote_fails_clone() {
    let (root, _origin, settings) = setup();
    let missing = root.path().join("no-such-repo");

    let report = InstallPipeline::run(&SystemRunner, &checkout_plan(&settings, &missing), None)
        .await
        .unwrap();

    assert!(!report.success);
    assert_eq!(report.failure.map(|f| f.phase), Some(Phase::Checkout));
    assert!(!settings.install_dir.join(".git").exists());
}
