//! Backfills attribution rows for every unlinked order created in a date range.

use anyhow::{Context, Result, anyhow, ensure};
use attribution::{
    attribution::{LinkOptions, Linker},
    config::ConfigLoader,
    db,
    handlers::reports::parse_bound,
    repositories::{AttributionRepository, OrderRepository},
    telemetry::init_tracing,
};
use clap::Parser;
use tracing::info;

/// Link unlinked orders to their touchpoints
#[derive(Debug, Parser)]
#[command(name = "link_orders", version, about)]
struct Args {
    /// Inclusive start (YYYY-MM-DD or RFC3339)
    #[arg(long)]
    start: String,

    /// Inclusive end (YYYY-MM-DD covers the whole day, or RFC3339)
    #[arg(long)]
    end: String,

    /// Attribution window in days (defaults to the configured window)
    #[arg(long)]
    window_days: Option<u32>,

    /// Only link orders with this status
    #[arg(long)]
    status: Option<String>,

    /// Report what would be linked without writing anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Default)]
struct Summary {
    scanned: usize,
    already_linked: usize,
    linked: usize,
    direct: usize,
    rows: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    init_tracing(&config).context("initializing tracing")?;

    let start = parse_bound(&args.start, false)
        .ok_or_else(|| anyhow!("invalid --start '{}'", args.start))?;
    let end =
        parse_bound(&args.end, true).ok_or_else(|| anyhow!("invalid --end '{}'", args.end))?;
    ensure!(start <= end, "--start must not be after --end");

    let mut options: LinkOptions = config.attribution.link_options();
    if let Some(window_days) = args.window_days {
        ensure!(
            (1..=365).contains(&window_days),
            "--window-days must be between 1 and 365"
        );
        options.window_days = window_days;
    }

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;
    db::run_migrations(&db).await?;

    let orders = OrderRepository::new(&db)
        .list_in_range(start, end, args.status.as_deref())
        .await
        .context("listing orders")?;

    let linker = Linker::new(db.clone(), options);
    let attributions = AttributionRepository::new(&db);
    let mut summary = Summary::default();

    for order in orders {
        summary.scanned += 1;

        if attributions
            .exists_for_order(order.id)
            .await
            .with_context(|| format!("checking attributions for order {}", order.id))?
        {
            summary.already_linked += 1;
            continue;
        }

        if args.dry_run {
            info!(order_id = %order.id, external_id = %order.order_id, "would link order");
            continue;
        }

        let rows = linker
            .link(order.id)
            .await
            .with_context(|| format!("linking order {}", order.id))?;

        if rows.is_empty() {
            summary.direct += 1;
        } else {
            summary.linked += 1;
            summary.rows += rows.len();
        }
    }

    let pending = summary.scanned - summary.already_linked;
    if args.dry_run {
        println!(
            "Dry run: {} orders scanned, {} already linked, {} would be linked (window {} days)",
            summary.scanned, summary.already_linked, pending, options.window_days
        );
    } else {
        println!(
            "Linked {} orders ({} attribution rows); {} direct; {} already linked; {} scanned",
            summary.linked, summary.rows, summary.direct, summary.already_linked, summary.scanned
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_required_range_and_flags() {
        let args = Args::parse_from([
            "link_orders",
            "--start",
            "2025-01-01",
            "--end",
            "2025-01-31",
            "--window-days",
            "7",
            "--dry-run",
        ]);

        assert_eq!(args.start, "2025-01-01");
        assert_eq!(args.window_days, Some(7));
        assert!(args.dry_run);
        assert!(args.status.is_none());
    }

    #[test]
    fn missing_end_is_rejected() {
        assert!(Args::try_parse_from(["link_orders", "--start", "2025-01-01"]).is_err());
    }
}
