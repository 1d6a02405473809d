//! Gatewatch - Main entry point.

use std::str::FromStr;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gatewatch_domain::{ApprovalState, MigrationPlanState, RequestDescription};
use gatewatch_engine::infrastructure::settings::WatchSettings;
use gatewatch_engine::App;

const USAGE: &str = "Usage: gatewatch <command>

Commands:
  await <description> <state>     Wait for a request to reach an approval state
  approve <description> <reason>  Approve a pending request
  deny <description> <reason>     Deny a pending request
  verify <description> [reason]   Wait for Pending Approval, approve, wait for Approved
  migration <plan>                Follow a migration plan from Started to Successful";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatewatch_engine=debug,gatewatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = WatchSettings::from_env();
    tracing::info!(
        url = %settings.manageiq_url,
        poll_interval_secs = settings.poll_interval_secs,
        "Starting Gatewatch"
    );

    let app = App::with_manageiq(settings);
    let mut args = std::env::args().skip(1);

    match args.next().as_deref() {
        Some("await") => {
            let description = description_arg(args.next())?;
            let raw_state = args.next().context("missing <state>")?;
            let state = ApprovalState::from_str(&raw_state)?;
            let polling = app.settings.polling_for(&description)?;
            let result = app
                .use_cases
                .approval
                .await_state_with(&description, state, &polling)
                .await?;
            println!(
                "{}: {} after {} attempts ({:?})",
                description, state, result.attempts, result.elapsed
            );
        }
        Some(cmd @ ("approve" | "deny")) => {
            let description = description_arg(args.next())?;
            let reason = args.next().context("missing <reason>")?;
            if cmd == "approve" {
                app.use_cases.approval.approve(&description, &reason).await?;
            } else {
                app.use_cases.approval.deny(&description, &reason).await?;
            }
            println!("{}: {} submitted", description, cmd);
        }
        Some("verify") => {
            let description = description_arg(args.next())?;
            let reason = args.next().unwrap_or_else(|| "Approved".to_string());
            let polling = app.settings.polling_for(&description)?;
            let report = app
                .use_cases
                .approval
                .verify_manual_approval(&description, &reason, &polling)
                .await?;
            println!(
                "{}: manual approval verified (pending after {:?}, approved after {:?})",
                description, report.pending.elapsed, report.approved.elapsed
            );
        }
        Some("migration") => {
            let plan = args.next().context("missing <plan>")?;
            let polling = app.settings.migration_polling()?;
            let reached = app
                .use_cases
                .migration
                .await_milestones(&plan, &MigrationPlanState::SMOKE_SEQUENCE, &polling)
                .await?;
            for step in reached {
                println!(
                    "{}: {} (seen {}) after {} attempts ({:?})",
                    plan, step.milestone, step.observed, step.attempts, step.elapsed
                );
            }
        }
        Some(cmd) => anyhow::bail!("Unknown command: {cmd}\n\n{USAGE}"),
        None => anyhow::bail!("{USAGE}"),
    }

    Ok(())
}

fn description_arg(arg: Option<String>) -> anyhow::Result<RequestDescription> {
    let raw = arg.context("missing <description>")?;
    Ok(RequestDescription::new(raw)?)
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
