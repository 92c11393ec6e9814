#![forbid(unsafe_code)]

use std::io::IsTerminal as _;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{CommandFactory as _, Parser, Subcommand};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::debug;

use crate::config::{self, Config};
use crate::job::{
    FileJobStore, Job, JobBook, JobFilter, JobPatch, JobStats, JobStatus, NewJob, Phase, Priority,
};
use crate::logging;
use crate::output::table::{Cell, Table};
use crate::sheet::dates::{format_rfc3339, format_short, format_short_opt, parse_date};
use crate::sheet::{self, DecodeOptions, ExportFormat, RenderOptions, RowWarning};
use crate::sync::MergeSummary;

#[derive(Debug, Parser)]
#[command(
    name = "valvetrack",
    version,
    about = "Valve repair job tracker with spreadsheet import/export"
)]
pub struct Cli {
    /// Debug logging on stderr
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "ls")]
    List(ListArgs),
    Show(ShowArgs),
    Add(AddArgs),
    Edit(EditArgs),
    #[command(alias = "rm")]
    Delete(DeleteArgs),
    Import(ImportArgs),
    Export(ExportArgs),
    Stats(StatsArgs),
    /// Append five demo jobs
    Sample,
    /// Remove every job
    Reset(ResetArgs),
    Config(ConfigArgs),
    Completion(CompletionArgs),
    Version,
}

#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Filter by status (pending, in-progress, on-hold, completed)
    #[arg(short = 's', long = "status", value_parser = parse_status)]
    pub status: Option<JobStatus>,
    /// Filter by priority (low, medium, high)
    #[arg(short = 'p', long = "priority", value_parser = parse_priority)]
    pub priority: Option<Priority>,
    /// Case-insensitive text search
    #[arg(short = 'q', long = "search")]
    pub search: Option<String>,
    /// Output in JSON format
    #[arg(long = "json", conflicts_with = "csv")]
    pub json: bool,
    /// Output as CSV
    #[arg(long = "csv")]
    pub csv: bool,
    /// Show IDs, descriptions and estimated completion
    #[arg(short = 'l', long = "long")]
    pub long: bool,
}

#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Job ID, valve ID, or unique ID prefix
    pub pattern: String,
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct AddArgs {
    #[arg(long = "valve-id")]
    pub valve_id: String,
    #[arg(short = 'd', long = "description")]
    pub description: String,
    /// Percent complete (0-100)
    #[arg(
        long = "percent",
        default_value_t = 0,
        value_parser = clap::value_parser!(u8).range(0..=100)
    )]
    pub percent: u8,
    #[arg(short = 'p', long = "priority", value_parser = parse_priority, default_value = "medium")]
    pub priority: Priority,
    #[arg(short = 'a', long = "assigned-to")]
    pub assigned_to: Option<String>,
    #[arg(short = 'n', long = "notes")]
    pub notes: Option<String>,
    /// Estimated completion (YYYY-MM-DD, MM/DD/YYYY or RFC 3339)
    #[arg(long = "eta", value_parser = parse_eta)]
    pub eta: Option<OffsetDateTime>,
}

#[derive(Debug, Parser)]
pub struct EditArgs {
    /// Job ID, valve ID, or unique ID prefix
    pub pattern: String,
    #[arg(long = "valve-id")]
    pub valve_id: Option<String>,
    #[arg(short = 'd', long = "description")]
    pub description: Option<String>,
    #[arg(long = "percent", value_parser = clap::value_parser!(u8).range(0..=100))]
    pub percent: Option<u8>,
    #[arg(short = 'p', long = "priority", value_parser = parse_priority)]
    pub priority: Option<Priority>,
    /// Empty string clears the technician
    #[arg(short = 'a', long = "assigned-to")]
    pub assigned_to: Option<String>,
    /// Empty string clears the notes
    #[arg(short = 'n', long = "notes")]
    pub notes: Option<String>,
    #[arg(long = "eta", value_parser = parse_eta, conflicts_with = "clear_eta")]
    pub eta: Option<OffsetDateTime>,
    #[arg(long = "clear-eta")]
    pub clear_eta: bool,
}

#[derive(Debug, Parser)]
pub struct DeleteArgs {
    /// Job ID, valve ID, or unique ID prefix
    pub pattern: String,
    /// Skip the confirmation prompt
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
}

#[derive(Debug, Parser)]
pub struct ImportArgs {
    /// Spreadsheet file (.xlsx, .xls, .ods or .csv)
    pub file: PathBuf,
    /// Report what would change without saving
    #[arg(long = "dry-run")]
    pub dry_run: bool,
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct ExportArgs {
    /// xlsx or csv (defaults to export.format)
    #[arg(short = 'f', long = "format", value_parser = parse_format)]
    pub format: Option<ExportFormat>,
    /// Jobs table only, no statistics sheet
    #[arg(long = "compact")]
    pub compact: bool,
    /// Output directory (defaults to export.out_dir)
    #[arg(short = 'o', long = "out")]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct StatsArgs {
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct ResetArgs {
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
}

#[derive(Debug, Parser)]
pub struct CompletionArgs {
    pub shell: clap_complete::Shell,
}

#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub cmd: ConfigCmd,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCmd {
    List,
    Set(ConfigSetArgs),
    Get(ConfigGetArgs),
}

#[derive(Debug, Parser)]
pub struct ConfigSetArgs {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Parser)]
pub struct ConfigGetArgs {
    pub key: String,
}

fn parse_status(raw: &str) -> Result<JobStatus, String> {
    JobStatus::parse(raw)
        .ok_or_else(|| "expected one of: pending, in-progress, on-hold, completed".to_owned())
}

fn parse_priority(raw: &str) -> Result<Priority, String> {
    Priority::parse(raw).ok_or_else(|| "expected one of: low, medium, high".to_owned())
}

fn parse_format(raw: &str) -> Result<ExportFormat, String> {
    ExportFormat::parse(raw).ok_or_else(|| "expected xlsx or csv".to_owned())
}

fn parse_eta(raw: &str) -> Result<OffsetDateTime, String> {
    parse_date(raw).ok_or_else(|| format!("unrecognized date '{raw}'"))
}

pub async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli).await;
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let verbose = cli.verbose;
    match cli.cmd {
        Commands::Config(args) => cmd_config(args),
        Commands::Completion(args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "valvetrack", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Version => Ok(cmd_version()),
        Commands::List(args) => cmd_list(&setup(verbose).await?, &args),
        Commands::Show(args) => cmd_show(&setup(verbose).await?, &args),
        Commands::Add(args) => cmd_add(&setup(verbose).await?, args),
        Commands::Edit(args) => cmd_edit(&setup(verbose).await?, args),
        Commands::Delete(args) => cmd_delete(&setup(verbose).await?, &args),
        Commands::Import(args) => cmd_import(&setup(verbose).await?, args).await,
        Commands::Export(args) => cmd_export(&setup(verbose).await?, &args),
        Commands::Stats(args) => cmd_stats(&setup(verbose).await?, &args),
        Commands::Sample => cmd_sample(&setup(verbose).await?),
        Commands::Reset(args) => cmd_reset(&setup(verbose).await?, &args),
    }
}

/// Loads the config and installs logging at its level.
async fn setup(verbose: bool) -> anyhow::Result<Config> {
    let cfg = load_cfg().await?;
    logging::init(cfg.log.level, verbose)?;
    Ok(cfg)
}

async fn load_cfg() -> anyhow::Result<Config> {
    let cfg = tokio::task::spawn_blocking(|| -> anyhow::Result<Config> {
        let (cfg, _paths) = config::load()?;
        Ok(cfg)
    })
    .await??;
    Ok(cfg)
}

fn open_book(cfg: &Config) -> anyhow::Result<JobBook<FileJobStore>> {
    let path = cfg.store_path()?;
    debug!(path = %path.display(), "opening job store");
    Ok(JobBook::new(FileJobStore::new(path)))
}

fn use_color(cfg: &Config) -> bool {
    cfg.ui.color && std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<ExitCode> {
    match args.cmd {
        ConfigCmd::List => {
            print!("{}", config::list_resolved_toml()?);
            Ok(ExitCode::SUCCESS)
        }
        ConfigCmd::Set(set) => {
            config::set_value_string(&set.key, &set.value)?;
            println!("Set {} = {}", set.key, set.value);
            Ok(ExitCode::SUCCESS)
        }
        ConfigCmd::Get(get) => match config::get_value_string(&get.key)? {
            Some(v) => {
                println!("{v}");
                Ok(ExitCode::SUCCESS)
            }
            None => anyhow::bail!(
                "configuration key '{}' not found - see 'valvetrack config list'",
                get.key
            ),
        },
    }
}

fn cmd_list(cfg: &Config, args: &ListArgs) -> anyhow::Result<ExitCode> {
    let book = open_book(cfg)?;
    let filter = JobFilter {
        status: args.status,
        priority: args.priority,
        search: args.search.clone(),
    };
    let jobs = book.list(&filter)?;

    if args.json {
        print_json(&jobs)?;
        return Ok(ExitCode::SUCCESS);
    }

    let table = job_table(&jobs, args.long || args.csv, !args.csv && use_color(cfg));
    if args.csv {
        table.write_csv()?;
        return Ok(ExitCode::SUCCESS);
    }
    if table.is_empty() {
        println!("No jobs found.");
        return Ok(ExitCode::SUCCESS);
    }
    table.print()?;
    Ok(ExitCode::SUCCESS)
}

fn job_table(jobs: &[Job], long: bool, color: bool) -> Table {
    let mut headers = vec!["VALVE ID", "PHASE", "%", "PRIORITY", "ASSIGNED TO", "UPDATED"];
    if long {
        headers.insert(0, "ID");
        headers.extend(["ETA", "DESCRIPTION"]);
    }
    let mut table = Table::new(headers).with_color(color);
    for job in jobs {
        let mut row: Vec<Cell> = Vec::with_capacity(9);
        if long {
            row.push(job.id.as_str().into());
        }
        row.push(job.valve_id.as_str().into());
        row.push(Cell::colored(job.status_label(), job.color().ansi()));
        row.push(job.percent_complete.to_string().into());
        row.push(job.priority.as_str().into());
        row.push(job.assigned_to.as_deref().unwrap_or("-").into());
        row.push(format_short(job.updated_at).into());
        if long {
            row.push(format_short_opt(job.estimated_completion).into());
            row.push(job.description.as_str().into());
        }
        table.row(row);
    }
    table
}

fn cmd_show(cfg: &Config, args: &ShowArgs) -> anyhow::Result<ExitCode> {
    let job = open_book(cfg)?.find(&args.pattern)?;
    if args.json {
        print_json(&job)?;
        return Ok(ExitCode::SUCCESS);
    }
    print_job_details(&job, use_color(cfg));
    Ok(ExitCode::SUCCESS)
}

fn print_job_details(job: &Job, color: bool) {
    let phase = if color {
        format!("{}{}\x1b[0m", job.color().ansi(), job.status_label())
    } else {
        job.status_label().to_owned()
    };
    println!("Valve: {} (ID: {})", job.valve_id, job.id);
    println!("Description: {}", job.description);
    println!(
        "Progress: {}% - {phase} ({})",
        job.percent_complete,
        job.status().title()
    );
    println!("Priority: {}", job.priority);
    if let Some(tech) = job.assigned_to.as_deref() {
        println!("Assigned to: {tech}");
    }
    println!("Created: {}", format_rfc3339(job.created_at));
    println!("Updated: {}", format_rfc3339(job.updated_at));
    if let Some(eta) = job.estimated_completion {
        println!("Est. completion: {}", format_short(eta));
    }
    if let Some(notes) = job.notes.as_deref() {
        println!("\nNotes:\n{notes}");
    }
}

fn cmd_add(cfg: &Config, args: AddArgs) -> anyhow::Result<ExitCode> {
    let book = open_book(cfg)?;
    let input = NewJob {
        valve_id: args.valve_id,
        description: args.description,
        priority: args.priority,
        assigned_to: args.assigned_to,
        notes: args.notes,
        percent_complete: args.percent,
        estimated_completion: args.eta,
    };
    let job = book.create(input, OffsetDateTime::now_utc())?;
    println!(
        "Created job {} for valve {} ({})",
        job.id,
        job.valve_id,
        job.status_label()
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_edit(cfg: &Config, args: EditArgs) -> anyhow::Result<ExitCode> {
    let book = open_book(cfg)?;
    let target = book.find(&args.pattern)?;
    let patch = JobPatch {
        valve_id: args.valve_id,
        description: args.description,
        priority: args.priority,
        assigned_to: args.assigned_to,
        notes: args.notes,
        percent_complete: args.percent,
        estimated_completion: if args.clear_eta {
            Some(None)
        } else {
            args.eta.map(Some)
        },
    };
    if patch.is_empty() {
        anyhow::bail!("nothing to change - pass at least one field to edit");
    }
    let job = book.update(&target.id, patch, OffsetDateTime::now_utc())?;
    println!(
        "Updated valve {} ({}% - {})",
        job.valve_id,
        job.percent_complete,
        job.status_label()
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_delete(cfg: &Config, args: &DeleteArgs) -> anyhow::Result<ExitCode> {
    let book = open_book(cfg)?;
    let job = book.find(&args.pattern)?;
    let prompt = format!("Delete job for valve {} ({})?", job.valve_id, job.description);
    if !args.yes && !confirm(&prompt)? {
        println!("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    }
    let removed = book.delete(&job.id)?;
    println!("Deleted job for valve {}", removed.valve_id);
    Ok(ExitCode::SUCCESS)
}

#[derive(Debug, Serialize)]
struct ImportReport<'a> {
    file: String,
    dry_run: bool,
    rows: usize,
    #[serde(flatten)]
    summary: MergeSummary,
    warnings: &'a [RowWarning],
}

async fn cmd_import(cfg: &Config, args: ImportArgs) -> anyhow::Result<ExitCode> {
    let opts = DecodeOptions {
        valve_id_prefix: cfg.import.valve_id_prefix.clone(),
    };
    let now = OffsetDateTime::now_utc();
    let file = args.file.clone();
    let batch = tokio::task::spawn_blocking(move || sheet::parse_file(&file, &opts, now))
        .await?
        .with_context(|| format!("failed to import {}", args.file.display()))?;

    if batch.is_empty() {
        anyhow::bail!("no valid data found in {}", args.file.display());
    }
    if !args.json {
        for w in &batch.warnings {
            eprintln!("warning: {w}");
        }
    }

    let rows = batch.jobs.len();
    let warnings = batch.warnings.clone();
    let book = open_book(cfg)?;
    let summary = if args.dry_run {
        book.preview_import(batch, now)?
    } else {
        book.import(batch, now)?
    };

    if args.json {
        print_json(&ImportReport {
            file: args.file.display().to_string(),
            dry_run: args.dry_run,
            rows,
            summary,
            warnings: &warnings,
        })?;
        return Ok(ExitCode::SUCCESS);
    }

    let verb = if args.dry_run { "Would import" } else { "Imported" };
    println!(
        "{verb} {rows} jobs from {} ({} added, {} updated)",
        args.file.display(),
        summary.added,
        summary.updated
    );
    if !warnings.is_empty() {
        println!("{} warning(s) reported above.", warnings.len());
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_export(cfg: &Config, args: &ExportArgs) -> anyhow::Result<ExitCode> {
    let book = open_book(cfg)?;
    let jobs = book.list(&JobFilter::default())?;
    let format = args.format.unwrap_or(cfg.export.format);
    let opts = if args.compact {
        RenderOptions::compact()
    } else {
        RenderOptions {
            include_stats: cfg.export.include_stats,
            compact: false,
        }
    };
    let dir = match args.out.as_deref() {
        Some(p) => config::expand_path(&p.to_string_lossy())?,
        None => cfg.export_dir()?,
    };

    let report = sheet::render_rows(&jobs, opts);
    let path = sheet::write_report(
        &report,
        format,
        &dir,
        &cfg.export.file_prefix,
        OffsetDateTime::now_utc(),
    )?;
    println!(
        "Exported {} jobs to {}",
        jobs.len(),
        config::tilde_path(&path.to_string_lossy())
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_stats(cfg: &Config, args: &StatsArgs) -> anyhow::Result<ExitCode> {
    let stats = open_book(cfg)?.stats()?;
    if args.json {
        print_json(&stats)?;
        return Ok(ExitCode::SUCCESS);
    }
    print_stats(&stats, use_color(cfg))?;
    Ok(ExitCode::SUCCESS)
}

fn print_stats(stats: &JobStats, color: bool) -> anyhow::Result<()> {
    println!("Total jobs: {}", stats.total);
    println!("Average progress: {}%\n", stats.average_progress);

    let mut by_status = Table::new(["STATUS", "COUNT"]);
    for s in JobStatus::ALL {
        by_status.row([s.title().to_owned(), stats.status_count(s).to_string()]);
    }
    by_status.print()?;
    println!();

    let mut by_priority = Table::new(["PRIORITY", "COUNT"]);
    for p in Priority::ALL {
        by_priority.row([p.as_str().to_owned(), stats.priority_count(p).to_string()]);
    }
    by_priority.print()?;
    println!();

    let mut by_phase = Table::new(["PHASE", "COUNT"]).with_color(color);
    for phase in Phase::ALL {
        by_phase.row([
            Cell::colored(phase.label(), phase.color().ansi()),
            stats.phase_count(phase).to_string().into(),
        ]);
    }
    by_phase.print()?;
    Ok(())
}

fn cmd_sample(cfg: &Config) -> anyhow::Result<ExitCode> {
    let added = open_book(cfg)?.load_sample(OffsetDateTime::now_utc())?;
    println!("Added {} sample jobs", added.len());
    Ok(ExitCode::SUCCESS)
}

fn cmd_reset(cfg: &Config, args: &ResetArgs) -> anyhow::Result<ExitCode> {
    let book = open_book(cfg)?;
    let count = book.all()?.len();
    if count == 0 {
        println!("No jobs to remove.");
        return Ok(ExitCode::SUCCESS);
    }
    if !args.yes && !confirm(&format!("Remove all {count} jobs?"))? {
        println!("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    }
    book.reset()?;
    println!("Removed {count} jobs.");
    Ok(ExitCode::SUCCESS)
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    if !std::io::stdin().is_terminal() {
        anyhow::bail!("confirmation requires a TTY - pass --yes to proceed");
    }
    print!("{prompt} [y/N]: ");
    std::io::Write::flush(&mut std::io::stdout())?;
    let mut input = String::new();
    let _ = std::io::stdin().read_line(&mut input)?;
    let resp = input.trim().to_lowercase();
    Ok(resp == "y" || resp == "yes")
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    print!("{out}");
    Ok(())
}

fn cmd_version() -> ExitCode {
    println!("valvetrack version {}", env!("CARGO_PKG_VERSION"));
    if let Some(commit) = option_env!("VALVETRACK_GIT_COMMIT") {
        println!("  commit: {commit}");
    }
    println!("  rust: {}", rustc_version_runtime::version());
    println!(
        "  os/arch: {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_list_filters() {
        let cli = Cli::try_parse_from([
            "valvetrack", "list", "--status", "in progress", "-p", "HIGH", "--csv",
        ])
        .unwrap();
        let Commands::List(args) = cli.cmd else {
            panic!("expected list");
        };
        assert_eq!(args.status, Some(JobStatus::InProgress));
        assert_eq!(args.priority, Some(Priority::High));
        assert!(args.csv);
        assert!(Cli::try_parse_from(["valvetrack", "list", "--json", "--csv"]).is_err());
    }

    #[test]
    fn add_validates_percent_and_eta() {
        assert!(
            Cli::try_parse_from([
                "valvetrack", "add", "--valve-id", "V", "-d", "x", "--percent", "101",
            ])
            .is_err()
        );
        let cli = Cli::try_parse_from([
            "valvetrack", "add", "--valve-id", "V", "-d", "x", "--eta", "06/15/2024",
        ])
        .unwrap();
        let Commands::Add(args) = cli.cmd else {
            panic!("expected add");
        };
        assert_eq!(args.eta, Some(datetime!(2024-06-15 0:00 UTC)));
        assert_eq!(args.priority, Priority::Medium);
    }

    #[test]
    fn edit_eta_flags_conflict() {
        assert!(
            Cli::try_parse_from([
                "valvetrack", "edit", "V", "--eta", "2024-06-15", "--clear-eta",
            ])
            .is_err()
        );
    }

    #[test]
    fn long_table_has_extra_columns() {
        let now = datetime!(2024-06-01 0:00 UTC);
        let jobs = crate::job::sample::sample_jobs(now);
        let short = job_table(&jobs, false, false);
        let long = job_table(&jobs, true, false);
        assert!(!short.is_empty());
        assert!(!long.is_empty());
    }
}
