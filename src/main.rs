mod cli;

use chrono::Utc;
use clap::Parser;
use cli::{Cli, Commands};
use colored::*;
use renewal_bot::{
    baserow::BaserowClient,
    brevo::BrevoClient,
    config::Config,
    error,
    helloasso::HelloAssoClient,
    renewal,
    utils,
};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "renewal_bot=info,info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run { dry_run } => {
            info!("Starting membership renewal run");
            run(&config, dry_run).await
        }

        Commands::Stats { format } => {
            info!("Collecting membership statistics...");
            show_stats(&config, &format).await
        }

        Commands::Check => check(&config),
    };

    if let Err(e) = result {
        error!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}

struct Clients {
    payments: HelloAssoClient,
    members: BaserowClient,
    email: BrevoClient,
}

fn build_clients(config: &Config) -> error::Result<Clients> {
    let http = config.http_client()?;
    Ok(Clients {
        payments: HelloAssoClient::new(http.clone(), config.helloasso.clone()),
        members: BaserowClient::new(http.clone(), config.baserow.clone()),
        email: BrevoClient::new(http, config.brevo.clone()),
    })
}

async fn run(config: &Config, dry_run: bool) -> error::Result<()> {
    let clients = build_clients(config)?;

    if dry_run || config.run.dry_run {
        println!("{}", "DRY RUN: no email will be sent and no member updated".yellow());
    }

    let report = renewal::run_renewal(
        &clients.payments,
        &clients.members,
        &clients.email,
        config,
        dry_run,
        Utc::now(),
    )
    .await?;

    report.summary.print_summary();
    println!();
    report.stats.print_table();

    if report.summary.failures() > 0 {
        println!(
            "{}",
            format!("{} operations failed, see logs", report.summary.failures()).red()
        );
    } else {
        println!("{}", "✓ Renewal run complete".green());
    }

    Ok(())
}

async fn show_stats(config: &Config, format: &str) -> error::Result<()> {
    let clients = build_clients(config)?;
    let stats = renewal::collect_stats(&clients.payments, &clients.members, config).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", "=== Membership Statistics ===".cyan().bold());
    stats.print_table();
    Ok(())
}

fn check(config: &Config) -> error::Result<()> {
    println!("{}", "✓ Configuration loaded".green());
    println!("\n{}", "Configuration:".cyan());
    println!("  HelloAsso API:      {}", config.helloasso.api_url);
    println!("  Organization:       {}", config.helloasso.org_slug);
    println!("  Payments from:      {}", config.helloasso.from_date);
    println!("  Client ID:          {}", utils::mask_secret(&config.helloasso.client_id));
    println!("  Client secret:      {}", utils::mask_secret(&config.helloasso.client_secret));
    println!("  Baserow API:        {}", config.baserow.api_url);
    println!("  Member table:       {}", config.baserow.member_table_id);
    println!("  Baserow token:      {}", utils::mask_secret(&config.baserow.api_token));
    println!("  Brevo API:          {}", config.brevo.api_url);
    println!("  Brevo key:          {}", utils::mask_secret(&config.brevo.api_key));
    println!(
        "  Sender:             {} <{}>",
        config.brevo.sender_name, config.brevo.sender_email
    );
    println!("  Reminder interval:  {} days", config.reminder.min_interval_days);
    println!("  Validity:           {} months", config.membership.validity_months);
    if config.reminder.allowlist.is_empty() {
        println!("  Allowlist:          (everyone)");
    } else {
        println!("  Allowlist:          {}", config.reminder.allowlist.join(", "));
    }
    println!("  Dry run:            {}", config.run.dry_run);

    println!("\n{}", "Ready to use! Try running:".cyan());
    println!("  {} to preview a run", "renewal-bot run --dry-run".yellow());
    println!("  {} to view statistics", "renewal-bot stats".yellow());
    Ok(())
}
