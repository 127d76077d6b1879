//! Ticketflow CLI
//!
//! The `ticketflow` command submits work tickets into the remediation
//! pipeline and inspects their persisted state.
//!
//! ## Commands
//!
//! - `submit`: Run a ticket through the pipeline (sync or fire-and-forget)
//! - `status`: Lightweight status check for one ticket
//! - `show`: Full incident record for one ticket
//! - `list`: Paginated incident summaries, newest first
//! - `history`: Incident plus its complete audit trail
//! - `demo`: Process the built-in sample tickets

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;

use incident_store::{SurrealIncidentStore, TicketId};
use ticketflow_core::{ServiceConfig, TicketPipeline, TicketService};

#[derive(Parser)]
#[command(name = "ticketflow")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-stage ticket remediation pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a raw ticket (JSON) into the pipeline
    Submit {
        /// Path to a JSON file containing the raw ticket
        #[arg(short, long, conflicts_with = "data")]
        file: Option<PathBuf>,

        /// Inline JSON ticket payload
        #[arg(short, long)]
        data: Option<String>,

        /// Fire-and-forget: return a receipt immediately and process in the
        /// background (poll with `status`)
        #[arg(short, long)]
        background: bool,
    },

    /// Show the current status of a ticket
    Status {
        /// Ticket identifier
        ticket_id: String,
    },

    /// Show the full incident record for a ticket
    Show {
        /// Ticket identifier
        ticket_id: String,
    },

    /// List incident summaries, newest first
    List {
        /// Maximum number of summaries to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Number of summaries to skip
        #[arg(short, long, default_value = "0")]
        offset: usize,
    },

    /// Show an incident together with its audit trail
    History {
        /// Ticket identifier
        ticket_id: String,
    },

    /// Process the built-in sample tickets
    Demo,

    /// Check storage connectivity
    Health,
}

/// Sample tickets used by `ticketflow demo`.
fn demo_tickets() -> Vec<serde_json::Value> {
    vec![
        serde_json::json!({
            "ticket_id": "INC0012345",
            "priority": "High",
            "category": "Infrastructure",
            "subcategory": "Middleware",
            "description": "Install Apache HTTP Server 2.4.x on production web server",
            "ci_name": "web-server-prod-01",
            "environment": "production",
            "requested_by": "john.doe@company.com",
        }),
        serde_json::json!({
            "ticket_id": "INC0012346",
            "priority": "Medium",
            "category": "Infrastructure",
            "subcategory": "Application Server",
            "description": "Upgrade Tomcat from 9.0.x to 10.1.x on staging environment",
            "ci_name": "app-server-staging-02",
            "environment": "staging",
            "requested_by": "jane.smith@company.com",
        }),
    ]
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
    ticketflow_core::init_tracing(cli.json, level);

    // Initialize storage and the service facade
    let store = Arc::new(
        SurrealIncidentStore::from_env()
            .await
            .context("Failed to connect to ticketflow database")?,
    );
    let pipeline = Arc::new(TicketPipeline::new(store.clone()));
    let service = TicketService::with_config(pipeline, store, ServiceConfig::from_env());

    match cli.command {
        Commands::Submit {
            file,
            data,
            background,
        } => cmd_submit(&service, file.as_deref(), data.as_deref(), background).await,
        Commands::Status { ticket_id } => cmd_status(&service, &ticket_id).await,
        Commands::Show { ticket_id } => cmd_show(&service, &ticket_id).await,
        Commands::List { limit, offset } => cmd_list(&service, limit, offset).await,
        Commands::History { ticket_id } => cmd_history(&service, &ticket_id).await,
        Commands::Demo => cmd_demo(&service).await,
        Commands::Health => cmd_health(&service).await,
    }
}

/// Load the raw ticket payload from a file or an inline argument.
fn load_payload(file: Option<&std::path::Path>, data: Option<&str>) -> Result<serde_json::Value> {
    let raw = match (file, data) {
        (Some(path), _) => std::fs::read_to_string(path)
            .context(format!("Failed to read ticket file: {path:?}"))?,
        (None, Some(inline)) => inline.to_string(),
        (None, None) => bail!("either --file or --data is required"),
    };
    serde_json::from_str(&raw).context("Failed to parse ticket as JSON")
}

async fn cmd_submit(
    service: &TicketService,
    file: Option<&std::path::Path>,
    data: Option<&str>,
    background: bool,
) -> Result<()> {
    let payload = load_payload(file, data)?;

    if background {
        let receipt = service
            .submit_background(payload)
            .await
            .context("Submission rejected")?;
        println!("{}", serde_json::to_string_pretty(&receipt)?);
        return Ok(());
    }

    let state = service
        .submit(payload)
        .await
        .context("Ticket processing failed")?;

    println!("Ticket {} processed", state.ticket.ticket_id);
    for message in &state.messages {
        println!("  - {message}");
    }
    if let Some(report) = &state.validation_report {
        println!("Outcome: {}", report.overall_status);
    }
    Ok(())
}

async fn cmd_status(service: &TicketService, ticket_id: &str) -> Result<()> {
    let status = service
        .get_status(&TicketId::from(ticket_id))
        .await
        .context("Failed to read ticket status")?;

    match status {
        Some(view) => println!("{}", serde_json::to_string_pretty(&view)?),
        None => bail!("no incident found for ticket {ticket_id}"),
    }
    Ok(())
}

async fn cmd_show(service: &TicketService, ticket_id: &str) -> Result<()> {
    let incident = service
        .get_full(&TicketId::from(ticket_id))
        .await
        .context("Failed to read incident")?;

    match incident {
        Some(incident) => println!("{}", serde_json::to_string_pretty(&incident)?),
        None => bail!("no incident found for ticket {ticket_id}"),
    }
    Ok(())
}

async fn cmd_list(service: &TicketService, limit: Option<usize>, offset: usize) -> Result<()> {
    let summaries = service
        .list_summaries(limit, offset)
        .await
        .context("Failed to list incidents")?;

    if summaries.is_empty() {
        println!("No incidents found");
        return Ok(());
    }

    for summary in summaries {
        println!(
            "{}  {:<10} {:<10} {}  (created {})",
            summary.ticket_id,
            summary.status,
            summary.priority,
            summary.environment,
            summary.created_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    Ok(())
}

async fn cmd_history(service: &TicketService, ticket_id: &str) -> Result<()> {
    let history = service
        .get_history(&TicketId::from(ticket_id))
        .await
        .context("Failed to read incident history")?;

    let Some(history) = history else {
        bail!("no incident found for ticket {ticket_id}");
    };

    println!("{}", serde_json::to_string_pretty(&history.incident)?);
    println!("\nAudit trail (newest first):");
    for entry in &history.audit {
        println!(
            "  {}  {:<22} {:<18} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.action,
            entry.agent,
            entry.details,
        );
    }
    Ok(())
}

async fn cmd_health(service: &TicketService) -> Result<()> {
    service
        .healthy()
        .await
        .context("Storage connectivity check failed")?;
    println!("ok: storage reachable");
    Ok(())
}

async fn cmd_demo(service: &TicketService) -> Result<()> {
    for raw in demo_tickets() {
        let ticket_id = raw["ticket_id"].as_str().unwrap_or("unknown").to_string();
        match service.submit(raw).await {
            Ok(state) => {
                let outcome = state
                    .validation_report
                    .as_ref()
                    .map(|r| r.overall_status.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                println!("{ticket_id}: {outcome}");
            }
            Err(err) => println!("{ticket_id}: rejected ({err})"),
        }
    }
    Ok(())
}
