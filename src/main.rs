mod assets;
mod config;
mod documents;
mod error;
mod images;
mod migrate;
mod parser;
mod reconcile;
mod seed;
mod store;
mod verify;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};

use crate::assets::AssetIndex;
use crate::config::{Settings, StoreBackend};
use crate::documents::DocumentLibrary;
use crate::images::ImageResolver;
use crate::store::{PostStore, ProductQuery, RestStore, SqliteStore};

const FAILURES_SHOWN: usize = 20;
const GROUPS_SHOWN: usize = 25;

#[derive(Parser)]
#[command(
    name = "catalog_migrator",
    about = "Migrate legacy product pages into structured content and clean up the catalog"
)]
struct Cli {
    /// Config file (default: ./migrator.toml, if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert legacy HTML pages into structured content
    Migrate {
        /// Re-migrate a single product
        #[arg(long)]
        slug: Option<String>,
        /// Max products to migrate (default: whole catalog)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Find regional duplicates (dry run unless --apply)
    Dedupe {
        /// Actually delete the planned ids
        #[arg(long)]
        apply: bool,
    },
    /// Show the image path resolved for a slug
    Image { slug: String },
    /// Check every product's image against the local asset directory
    ImageAudit,
    /// Insert the bundled category pages that are missing
    Seed,
    /// Spot-check one migrated product
    Verify,
    /// Show product / migration counts
    Stats,
    /// Convert the technical reference page into a JSON data file
    Technical {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Image { slug } => show_image(&settings, &slug),
        Commands::Technical { input, output } => {
            let input = input.unwrap_or_else(|| settings.technical_source.clone());
            let output = output.unwrap_or_else(|| settings.technical_output.clone());
            write_technical(&input, &output)
        }
        command => match settings.store {
            StoreBackend::Sqlite => {
                let store = SqliteStore::connect(&settings.database_path, &settings.company_id)
                    .with_context(|| {
                        format!("Failed to open {}", settings.database_path.display())
                    })?;
                run(&store, &settings, command).await
            }
            StoreBackend::Rest => {
                let url = settings.rest_url.as_deref().context("rest_url is not set")?;
                let store =
                    RestStore::new(url, settings.rest_key.as_deref(), &settings.company_id)?
                        .with_page_size(settings.page_size);
                run(&store, &settings, command).await
            }
        },
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn run<S: PostStore>(store: &S, settings: &Settings, command: Commands) -> Result<()> {
    match command {
        Commands::Migrate { slug, limit } => {
            let container = settings.container()?;
            let library = DocumentLibrary::new(&settings.document_root, &settings.document_extension);
            let query = ProductQuery { slug, limit };
            let report = migrate::migrate_all(store, &library, &container, &query)
                .await
                .context("Failed to list products")?;
            if report.total() == 0 {
                println!("No products found.");
                return Ok(());
            }

            println!(
                "Migrated {} of {} products ({} failed).",
                report.success,
                report.total(),
                report.failed
            );
            for (kind, count) in report.failure_kinds() {
                println!("  {:<20} {}", kind, count);
            }
            if !report.failures.is_empty() {
                println!("\n--- Failures ---");
                for f in report.failures.iter().take(FAILURES_SHOWN) {
                    println!("  {}: {}", truncate(&f.slug, 60), f.error);
                }
                if report.failures.len() > FAILURES_SHOWN {
                    println!("  ... and {} more", report.failures.len() - FAILURES_SHOWN);
                }
            }
            Ok(())
        }
        Commands::Dedupe { apply } => {
            let entries = store
                .list_products(&ProductQuery::default())
                .await
                .context("Failed to list products")?;
            let report = reconcile::diagnose(&entries);
            let plan = reconcile::plan_deletions(&entries);

            for g in report.groups.iter().take(GROUPS_SHOWN) {
                println!("{:<50} {}", truncate(&g.identity, 47), g.slugs.join(", "));
            }
            if report.group_count() > GROUPS_SHOWN {
                println!("... and {} more groups", report.group_count() - GROUPS_SHOWN);
            }
            println!(
                "\n{} products | {} duplicate groups | {} surplus | {} planned deletions",
                entries.len(),
                report.group_count(),
                report.surplus,
                plan.len()
            );

            if plan.is_empty() {
                println!("Nothing to delete.");
                return Ok(());
            }
            if !apply {
                println!("Dry run. Re-run with --apply to delete.");
                return Ok(());
            }

            let outcomes =
                reconcile::execute_deletions(store, &plan, settings.delete_chunk_size).await;
            for o in &outcomes {
                match &o.result {
                    Ok(n) => println!("Batch {:>3}: deleted {}/{}", o.batch, n, o.requested),
                    Err(e) => {
                        println!("Batch {:>3}: FAILED ({} ids): {}", o.batch, o.requested, e)
                    }
                }
            }
            let deleted: usize = outcomes.iter().map(reconcile::BatchOutcome::deleted).sum();
            let failed_batches = outcomes.iter().filter(|o| o.result.is_err()).count();
            println!(
                "Deleted {} of {} ({} of {} batches failed).",
                deleted,
                plan.len(),
                failed_batches,
                outcomes.len()
            );
            Ok(())
        }
        Commands::ImageAudit => {
            let resolver = ImageResolver::from_settings(settings)?;
            let index = AssetIndex::scan(&settings.asset_dir);
            debug!(files = index.len(), overrides = resolver.override_count(), "Indexed assets");
            if index.is_empty() {
                warn!(dir = %settings.asset_dir.display(), "Asset directory is empty or missing");
            }
            let entries = store
                .list_products(&ProductQuery::default())
                .await
                .context("Failed to list products")?;
            let report = assets::audit(&entries, &resolver, &index);

            println!("Total:   {}", report.total);
            println!("Found:   {}", report.found);
            println!("Missing: {}", report.missing);
            if !report.samples.is_empty() {
                println!("\n--- Missing (first {}) ---", report.samples.len());
                for m in &report.samples {
                    println!("  {:<60} {}", truncate(&m.slug, 57), m.path);
                }
            }
            Ok(())
        }
        Commands::Seed => {
            let posts = seed::builtin_categories()?;
            let report = seed::seed_missing(store, &posts).await?;
            println!(
                "Seeded {} categories ({} already present, {} failed).",
                report.created, report.existing, report.failed
            );
            Ok(())
        }
        Commands::Verify => {
            let Some(post) = store.migrated_sample().await? else {
                println!("No migrated products found.");
                return Ok(());
            };
            let s = verify::summarize(&post);
            println!("Product: {} ({})", s.title, s.slug);
            match s.block_count {
                Some(n) if n > 0 => println!("Blocks:  {}", n),
                _ => {
                    println!("Structured content is empty or not a block list.");
                    return Ok(());
                }
            }
            if let Some(first) = &s.first_block {
                println!("First block:\n{}", serde_json::to_string_pretty(first)?);
            }
            match &s.table_title {
                Some(title) => {
                    println!("Table:   {}", title);
                    if let Some(cell) = &s.first_cell {
                        println!("Row 0 cell 0: {}", cell);
                    }
                }
                None => println!("No table found."),
            }
            match (&s.summary_title, &s.summary_preview) {
                (Some(title), preview) => {
                    println!("Summary: {}", title);
                    if let Some(p) = preview {
                        println!("Summary preview: {}", p);
                    }
                }
                (None, _) => println!("No summary section found."),
            }
            Ok(())
        }
        Commands::Stats => {
            let c = store.counts().await?;
            println!("Products: {}", c.total);
            println!("Migrated: {}", c.migrated);
            println!("Pending:  {}", c.total.saturating_sub(c.migrated));
            Ok(())
        }
        Commands::Image { .. } | Commands::Technical { .. } => {
            unreachable!("store-less commands are handled in main")
        }
    }
}

fn show_image(settings: &Settings, slug: &str) -> Result<()> {
    let resolver = ImageResolver::from_settings(settings)?;
    let path = resolver.resolve(Some(slug));
    let local = path
        .strip_prefix(resolver.asset_root())
        .map(|rel| settings.asset_dir.join(rel));
    let state = match &local {
        Some(p) if p.is_file() => "present",
        Some(_) => "missing",
        None => "outside asset root",
    };
    println!("{} ({})", path, state);
    Ok(())
}

fn write_technical(input: &Path, output: &Path) -> Result<()> {
    let html = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let categories = parser::technical::extract_technical(&html);
    let sections: usize = categories.iter().map(|c| c.data.len()).sum();

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    std::fs::write(output, serde_json::to_string_pretty(&categories)?)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Extracted {} categories ({} sections) to {}",
        categories.len(),
        sections,
        output.display()
    );
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
