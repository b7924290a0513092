use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use std::path::Path;
use std::time::Duration;

use sessionkeeper_core::{AccountStore, JsonAccountStore};
use sessionkeeper_types::{HealthSnapshot, HealthStatus};

fn daemon_url(port: u16, path: &str) -> String {
    format!("http://127.0.0.1:{port}/api{path}")
}

fn client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")
}

fn status_cell(status: HealthStatus) -> Cell {
    let color = match status {
        HealthStatus::Healthy => Color::Green,
        HealthStatus::Warning => Color::Yellow,
        HealthStatus::Unhealthy => Color::Red,
    };
    Cell::new(status).fg(color)
}

pub async fn handle_status(port: u16, json: bool) -> Result<()> {
    let snapshot: HealthSnapshot = client()?
        .get(daemon_url(port, "/health"))
        .send()
        .await
        .with_context(|| format!("Daemon not reachable on port {port}"))?
        .error_for_status()?
        .json()
        .await
        .context("Unexpected health response")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("{} {}", "SessionKeeper Status:".cyan().bold(), snapshot.status);
    if snapshot.accounts.is_empty() {
        println!("{}", "No accounts registered.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Account", "Status", "Uptime", "Failures", "Recoveries"]);
    for account in &snapshot.accounts {
        table.add_row(vec![
            Cell::new(&account.id),
            status_cell(account.status),
            Cell::new(format!("{:.1}%", account.uptime)),
            Cell::new(account.consecutive_failures),
            Cell::new(account.recovery_attempts),
        ]);
    }
    println!("{table}");

    let m = &snapshot.metrics;
    println!(
        "\n{} checks, {} recoveries, {} failures, recovery success {:.1}%",
        m.total_checks, m.total_recoveries, m.total_failures, m.recovery_success_rate
    );
    Ok(())
}

pub fn handle_accounts(data_dir: &Path, json: bool) -> Result<()> {
    let store = JsonAccountStore::open(data_dir)?;
    let accounts = store.list()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&accounts)?);
        return Ok(());
    }

    if accounts.is_empty() {
        println!("{}", "No accounts found.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["ID", "Name", "Linked", "Last State", "Needs QR"]);
    for acc in &accounts {
        let linked = if acc.device_linked {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(&acc.id),
            Cell::new(&acc.display_name),
            linked,
            Cell::new(acc.last_known_state),
            Cell::new(if acc.requires_qr_code { "yes" } else { "-" }),
        ]);
    }

    println!("{table}");
    println!("\n{} accounts total", accounts.len());
    Ok(())
}

pub async fn handle_relink(port: u16, account_id: &str) -> Result<()> {
    client()?
        .post(daemon_url(port, &format!("/accounts/{account_id}/relink")))
        .send()
        .await
        .with_context(|| format!("Daemon not reachable on port {port}"))?
        .error_for_status()
        .with_context(|| format!("Re-link rejected for {account_id}"))?;

    println!("{} Re-link started for {}; scan the new QR code", "✓".green(), account_id.green());
    Ok(())
}
