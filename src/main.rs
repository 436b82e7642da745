//! jpxbrl CLI - statement tables from EDINET/TDnet XBRL filings

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser as ClapParser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use jpxbrl::cache::LinkbaseCache;
use jpxbrl::{
    PeriodKind, Reader, ReaderOptions, RepositoryConfig, Statement, Table, TableOptions, TaxonomyFamily,
    TaxonomyRepository,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// XBRL statement builder for Japanese disclosure filings
#[derive(ClapParser)]
#[command(name = "jpxbrl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Taxonomy cache directory
    #[arg(long, global = true, env = "XBRL_TAXONOMY_ROOT")]
    taxonomy_root: Option<PathBuf>,

    /// Never download taxonomies; only the filing's own documents are read
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct TableArgs {
    /// Also layer calculation arcs (adds weight and total columns)
    #[arg(long)]
    calc: bool,

    /// Context id prefix to keep, e.g. Current
    #[arg(short, long)]
    scope: Option<String>,

    /// Output as JSON
    #[arg(short, long)]
    json: bool,
}

impl TableArgs {
    fn options(&self) -> TableOptions {
        let options = TableOptions::new().with_calculation(self.calc);
        match &self.scope {
            Some(scope) => options.with_scope(scope),
            None => options,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the roles a filing declares
    Roles {
        /// Instance document
        input: PathBuf,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Build the table of one role for one or more filings
    Table {
        /// Instance documents
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Role name, e.g. rol_ConsolidatedBalanceSheet
        #[arg(short, long)]
        role: String,

        #[command(flatten)]
        table: TableArgs,
    },

    /// Build a standard statement, trying each known role name
    Statement {
        /// Instance document
        input: PathBuf,

        #[arg(value_enum)]
        statement: Statement,

        /// Prefer the non-consolidated statement
        #[arg(long)]
        non_consolidated: bool,

        #[command(flatten)]
        table: TableArgs,
    },

    /// Print one fact
    Fact {
        /// Instance document
        input: PathBuf,

        /// prefix:LocalName, or a bare local name
        name: String,
    },

    /// Download and extract the taxonomy in force on a date
    Provision {
        #[arg(short, long, value_enum)]
        family: TaxonomyFamily,

        /// Report date (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,

        #[arg(short, long, value_enum, default_value = "annual")]
        kind: PeriodKind,
    },
}

fn repository(cli: &Cli) -> Result<Option<Arc<TaxonomyRepository>>> {
    if cli.offline {
        return Ok(None);
    }
    let mut config = RepositoryConfig::from_env();
    if let Some(root) = &cli.taxonomy_root {
        config = config.with_root(root);
    }
    let repository = TaxonomyRepository::new(config).context("Failed to set up taxonomy repository")?;
    Ok(Some(Arc::new(repository)))
}

fn open(input: &Path, repository: Option<Arc<TaxonomyRepository>>, cache: Arc<LinkbaseCache>) -> Result<Reader> {
    Reader::with_options(input, repository, ReaderOptions::new().with_cache(cache))
        .with_context(|| format!("Failed to read {}", input.display()))
}

fn print_table(input: &Path, table: &Table, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(table)?);
        return Ok(());
    }

    println!("{} {} {}", "✓".green().bold(), input.display(), table.role.dimmed());
    for row in &table.rows {
        let indent = "  ".repeat(row.depth + 1);
        let label = if row.total {
            row.label.bold()
        } else {
            row.label.normal()
        };
        let weight = match row.weight {
            Some(w) if w < 0.0 => " (-)".red().to_string(),
            _ => String::new(),
        };
        let member = row.member.as_deref().map(|m| format!(" [{m}]")).unwrap_or_default();
        println!(
            "{}{}{}  {}  {}{}",
            indent,
            label,
            weight,
            row.value.cyan(),
            row.context.dimmed(),
            member.dimmed()
        );
    }
    println!("  Rows: {}", table.len());
    Ok(())
}

fn build_tables(
    inputs: &[PathBuf],
    repository: Option<Arc<TaxonomyRepository>>,
    role: &str,
    options: &TableOptions,
) -> Vec<(PathBuf, Result<Table>)> {
    let cache = Arc::new(LinkbaseCache::default());
    let build = |input: &PathBuf| {
        let table = open(input, repository.clone(), Arc::clone(&cache)).and_then(|mut reader| {
            reader
                .build_table(role, options)
                .with_context(|| format!("Failed to build {} for {}", role, input.display()))
        });
        (input.clone(), table)
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        inputs.par_iter().map(build).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        inputs.iter().map(build).collect()
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Roles { input, json } => {
            let cache = Arc::new(LinkbaseCache::default());
            let mut reader = open(input, repository(&cli)?, cache)?;
            let names: Vec<String> = reader.list_roles().keys().cloned().collect();
            for name in &names {
                reader
                    .role_label(name)
                    .with_context(|| format!("Failed to read label of {name}"))?;
            }

            if *json {
                println!("{}", serde_json::to_string_pretty(reader.list_roles())?);
            } else {
                println!("{} {}", "✓".green().bold(), input.display());
                for role in reader.list_roles().values() {
                    println!(
                        "  {}  {}",
                        role.name.bold(),
                        role.label.as_deref().unwrap_or("").dimmed()
                    );
                }
                println!("  Roles: {}", names.len());
            }
        }

        Commands::Table {
            inputs,
            role,
            table,
        } => {
            let start = Instant::now();
            let options = table.options();
            let results = build_tables(inputs, repository(&cli)?, role, &options);

            let mut failed = 0;
            for (input, result) in &results {
                match result {
                    Ok(t) => print_table(input, t, table.json)?,
                    Err(e) => {
                        failed += 1;
                        eprintln!("{} {} {:#}", "✗".red().bold(), input.display(), e);
                    }
                }
            }
            if inputs.len() > 1 && !table.json {
                println!(
                    "  Filings: {} ({} failed) in {:.2}ms",
                    results.len(),
                    failed,
                    start.elapsed().as_secs_f64() * 1000.0
                );
            }
            if failed > 0 {
                std::process::exit(1);
            }
        }

        Commands::Statement {
            input,
            statement,
            non_consolidated,
            table,
        } => {
            let cache = Arc::new(LinkbaseCache::default());
            let mut reader = open(input, repository(&cli)?, cache)?;
            let result = reader
                .statement(*statement, !non_consolidated, &table.options())
                .with_context(|| format!("No {} in {}", statement.name(), input.display()))?;
            print_table(input, &result, table.json)?;
        }

        Commands::Fact { input, name } => {
            let cache = Arc::new(LinkbaseCache::default());
            let reader = open(input, None, cache)?;
            match reader.find_fact(name) {
                Some(fact) => {
                    let unit = fact
                        .unit_ref
                        .as_deref()
                        .map(|id| reader.facts().unit_measure(id).unwrap_or(id))
                        .unwrap_or("");
                    println!(
                        "{} {} = {} {} ({})",
                        "✓".green().bold(),
                        fact.qualified_name(),
                        fact.value.cyan(),
                        unit,
                        fact.context_ref.dimmed()
                    );
                }
                None => {
                    println!("{} {} not reported", "✗".red().bold(), name);
                    std::process::exit(1);
                }
            }
        }

        Commands::Provision { family, date, kind } => {
            let repository = repository(&cli)?.context("--offline cannot provision taxonomies")?;
            let version = family
                .version_for(*date, *kind)
                .with_context(|| format!("No {} taxonomy in force on {}", family.name(), date))?;
            let start = Instant::now();
            let dir = repository
                .provision(&version)
                .with_context(|| format!("Failed to provision {} {}", family.name(), version.version))?;
            println!(
                "{} {} {} at {} ({:.1}s)",
                "✓".green().bold(),
                family.name(),
                version.version,
                dir.display(),
                start.elapsed().as_secs_f64()
            );
        }
    }

    Ok(())
}
