mod config;
mod csv;
mod remote;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;

use estad_core::frequency::{build_grouped, build_simple};
use estad_core::report::compose_with_ai;
use estad_core::value::{numeric_only, parse_values};
use estad_core::{
    descriptive, inference, AnalysisType, BinCount, Dataset, DatasetSummary, DescriptiveStats,
    EducationLevel, FrequencyTable, Project, ProjectUpdate, Report, ReportGenerator, Repository,
    Snapshot, StatisticRecord, TableKind, Value, Variable, VariableKind,
};
use estad_store::SqliteStore;

use crate::config::Config;
use crate::remote::{HttpReportGenerator, TutorClient};

type Repo = Repository<SqliteStore>;

#[derive(Parser)]
#[command(
    name = "estad",
    version,
    about = "Descriptive statistics workbench: frequency tables, measures and reports"
)]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Manage the data loaded into a project
    Dataset {
        #[command(subcommand)]
        command: DatasetCommands,
    },

    /// Frequency table of a variable
    Freq {
        #[command(flatten)]
        data: DataArgs,

        /// Group numeric values into classes
        #[arg(long)]
        grouped: bool,

        /// Number of classes (implies --grouped; default from config)
        #[arg(long)]
        bins: Option<usize>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Descriptive statistics of a variable
    Stats {
        #[command(flatten)]
        data: DataArgs,

        /// Percentile to report (0-100)
        #[arg(long)]
        percentile: Option<f64>,

        /// Decile to report (0-10)
        #[arg(long)]
        decile: Option<f64>,

        /// Quartile to report (0-4)
        #[arg(long)]
        quartile: Option<f64>,

        /// Save the result with the project
        #[arg(long)]
        save: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Pearson correlation between two variables
    Correlate {
        #[command(flatten)]
        pair: PairArgs,
    },

    /// Least-squares regression of y on x
    Regress {
        #[command(flatten)]
        pair: PairArgs,

        /// Predict y for this x
        #[arg(long)]
        predict: Option<f64>,
    },

    /// Confidence interval for the mean
    Interval {
        #[command(flatten)]
        data: DataArgs,

        /// Confidence level: 90, 95 or 99 (default from config)
        #[arg(long)]
        level: Option<u8>,
    },

    /// One-sample t test for the mean
    Ttest {
        #[command(flatten)]
        data: DataArgs,

        /// Hypothesized mean
        #[arg(long)]
        mu: f64,

        /// Confidence level: 90, 95 or 99 (default from config)
        #[arg(long)]
        level: Option<u8>,
    },

    /// Skewness, kurtosis and normality check
    Shape {
        #[command(flatten)]
        data: DataArgs,
    },

    /// Generate or show project reports
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },

    /// Ask the statistics tutor a question
    Ask {
        /// Question text
        question: String,

        /// Education level of the answer (default from config)
        #[arg(long)]
        level: Option<CliLevel>,
    },

    /// Export every collection as JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import collections from a JSON export
    Import {
        /// Export file
        file: PathBuf,
    },

    /// Delete all projects, datasets, statistics and reports
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Show the active configuration
    Config,
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Create a new project
    Create {
        /// Project name
        name: String,

        /// Education level (default from config)
        #[arg(short, long)]
        level: Option<CliLevel>,

        /// Kind of analysis
        #[arg(short, long, default_value = "univariado")]
        analysis: CliAnalysis,

        /// Free-text description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// List projects
    List {
        /// Only projects of this level
        #[arg(short, long)]
        level: Option<CliLevel>,
    },

    /// Show a project and its data
    Show {
        /// Project ID
        id: String,
    },

    /// Change project fields
    Update {
        /// Project ID
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        level: Option<CliLevel>,

        #[arg(long)]
        analysis: Option<CliAnalysis>,
    },

    /// Delete a project with its datasets, statistics and reports
    Delete {
        /// Project ID
        id: String,
    },
}

#[derive(Subcommand)]
enum DatasetCommands {
    /// Add a variable typed on the command line
    Add {
        /// Project ID
        #[arg(short, long)]
        project: String,

        /// Variable name
        #[arg(short, long)]
        variable: String,

        /// Values, separated by commas or spaces
        values: String,

        /// Variable type (inferred from the values if omitted)
        #[arg(short, long)]
        kind: Option<CliKind>,

        /// Add to the project's latest dataset instead of creating a new one
        #[arg(long)]
        append: bool,
    },

    /// Import a CSV file: header row, one column per variable
    Import {
        /// Project ID
        #[arg(short, long)]
        project: String,

        /// CSV file
        file: PathBuf,
    },

    /// List datasets of a project
    List {
        /// Project ID
        #[arg(short, long)]
        project: String,
    },

    /// Delete every dataset of a project
    Clear {
        /// Project ID
        #[arg(short, long)]
        project: String,
    },

    /// List the built-in sample datasets, or load one into a new project
    Example {
        /// Sample ID (omit to list the samples)
        id: Option<String>,

        /// Only list samples for this level
        #[arg(short, long)]
        level: Option<CliLevel>,
    },
}

#[derive(Subcommand)]
enum ReportCommands {
    /// Generate a report for a project's latest dataset
    Generate {
        /// Project ID
        #[arg(short, long)]
        project: String,

        /// Skip the remote service and compose locally
        #[arg(long)]
        local: bool,
    },

    /// Print the saved report of a project
    Show {
        /// Project ID
        #[arg(short, long)]
        project: String,
    },
}

/// Where the values of a single variable come from.
#[derive(Args)]
struct DataArgs {
    /// Project whose datasets hold the variable
    #[arg(short, long)]
    project: Option<String>,

    /// Variable name
    #[arg(short, long)]
    variable: Option<String>,

    /// Inline values instead of stored data
    #[arg(long, conflicts_with_all = ["project", "variable"])]
    values: Option<String>,
}

/// Paired variables, stored or inline.
#[derive(Args)]
struct PairArgs {
    /// Project whose datasets hold both variables
    #[arg(short, long)]
    project: Option<String>,

    /// Name of the x variable, or inline x values without --project
    #[arg(short)]
    x: String,

    /// Name of the y variable, or inline y values without --project
    #[arg(short)]
    y: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliLevel {
    Primario,
    Secundario,
    Superior,
}

impl From<CliLevel> for EducationLevel {
    fn from(val: CliLevel) -> Self {
        match val {
            CliLevel::Primario => EducationLevel::Primario,
            CliLevel::Secundario => EducationLevel::Secundario,
            CliLevel::Superior => EducationLevel::Superior,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliAnalysis {
    Univariado,
    Bivariado,
}

impl From<CliAnalysis> for AnalysisType {
    fn from(val: CliAnalysis) -> Self {
        match val {
            CliAnalysis::Univariado => AnalysisType::Univariado,
            CliAnalysis::Bivariado => AnalysisType::Bivariado,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliKind {
    Nominal,
    Ordinal,
    Discrete,
    Continuous,
}

impl From<CliKind> for VariableKind {
    fn from(val: CliKind) -> Self {
        match val {
            CliKind::Nominal => VariableKind::Nominal,
            CliKind::Ordinal => VariableKind::Ordinal,
            CliKind::Discrete => VariableKind::Discrete,
            CliKind::Continuous => VariableKind::Continuous,
        }
    }
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("dev", "estad", "estad")
        .map(|dirs| dirs.data_dir().join("estad.db"))
        .unwrap_or_else(|| PathBuf::from("estad.db"))
}

fn open_repo(db: Option<PathBuf>, cfg: &Config) -> Result<Repo> {
    let path = db
        .or_else(|| cfg.store.path.as_ref().map(PathBuf::from))
        .unwrap_or_else(default_db_path);
    debug!(path = %path.display(), "opening store");
    let store = SqliteStore::new(&path).context("failed to open database")?;
    Ok(Repository::new(store))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config()?;
    if let Commands::Config = cli.command {
        return cmd_config(&cfg);
    }
    let repo = open_repo(cli.db, &cfg)?;

    match cli.command {
        Commands::Project { command } => match command {
            ProjectCommands::Create {
                name,
                level,
                analysis,
                description,
            } => {
                let level = match level {
                    Some(l) => l.into(),
                    None => cfg.report.level()?,
                };
                cmd_project_create(&repo, name, level, analysis.into(), description)
            }
            ProjectCommands::List { level } => cmd_project_list(&repo, level.map(Into::into)),
            ProjectCommands::Show { id } => cmd_project_show(&repo, &id),
            ProjectCommands::Update {
                id,
                name,
                description,
                level,
                analysis,
            } => cmd_project_update(
                &repo,
                &id,
                ProjectUpdate {
                    name,
                    description,
                    education_level: level.map(Into::into),
                    analysis_type: analysis.map(Into::into),
                },
            ),
            ProjectCommands::Delete { id } => cmd_project_delete(&repo, &id),
        },
        Commands::Dataset { command } => match command {
            DatasetCommands::Add {
                project,
                variable,
                values,
                kind,
                append,
            } => cmd_dataset_add(&repo, &project, variable, &values, kind.map(Into::into), append),
            DatasetCommands::Import { project, file } => cmd_dataset_import(&repo, &project, &file),
            DatasetCommands::List { project } => cmd_dataset_list(&repo, &project),
            DatasetCommands::Clear { project } => cmd_dataset_clear(&repo, &project),
            DatasetCommands::Example { id, level } => {
                cmd_dataset_example(&repo, id.as_deref(), level.map(Into::into))
            }
        },
        Commands::Freq {
            data,
            grouped,
            bins,
            json,
        } => cmd_freq(&repo, &cfg, &data, grouped, bins, json),
        Commands::Stats {
            data,
            percentile,
            decile,
            quartile,
            save,
            json,
        } => {
            let positions = Positions {
                percentile: percentile.unwrap_or(cfg.analysis.percentile),
                decile: decile.unwrap_or(cfg.analysis.decile),
                quartile: quartile.unwrap_or(cfg.analysis.quartile),
            };
            cmd_stats(&repo, &data, positions, save, json)
        }
        Commands::Correlate { pair } => cmd_correlate(&repo, &pair),
        Commands::Regress { pair, predict } => cmd_regress(&repo, &pair, predict),
        Commands::Interval { data, level } => {
            cmd_interval(&repo, &data, level.unwrap_or(cfg.analysis.confidence_level))
        }
        Commands::Ttest { data, mu, level } => {
            cmd_ttest(&repo, &data, mu, level.unwrap_or(cfg.analysis.confidence_level))
        }
        Commands::Shape { data } => cmd_shape(&repo, &data),
        Commands::Report { command } => match command {
            ReportCommands::Generate { project, local } => {
                cmd_report_generate(&repo, &cfg, &project, local)
            }
            ReportCommands::Show { project } => cmd_report_show(&repo, &project),
        },
        Commands::Ask { question, level } => {
            let level = match level {
                Some(l) => l.into(),
                None => cfg.report.level()?,
            };
            cmd_ask(&cfg, &question, level)
        }
        Commands::Export { output } => cmd_export(&repo, output.as_deref()),
        Commands::Import { file } => cmd_import(&repo, &file),
        Commands::Clear { yes } => cmd_clear(&repo, yes),
        Commands::Config => cmd_config(&cfg),
    }
}

// ---------------------------------------------------------------------------
// Data resolution
// ---------------------------------------------------------------------------

struct LoadedVariable {
    name: String,
    values: Vec<Value>,
    /// Set when the values come from a stored dataset.
    origin: Option<(String, String)>,
}

fn resolve_project(repo: &Repo, id: &str) -> Result<Project> {
    repo.get_project(id)?
        .ok_or_else(|| anyhow!("project not found: {id}"))
}

/// Newest dataset of the project that has a variable called `name`.
fn find_variable(repo: &Repo, project_id: &str, name: &str) -> Result<(Dataset, Variable)> {
    resolve_project(repo, project_id)?;
    let datasets = repo.list_datasets(project_id)?;
    if datasets.is_empty() {
        bail!("project {project_id} has no data loaded");
    }
    for dataset in datasets.iter().rev() {
        if let Some(var) = dataset.variable(name) {
            return Ok((dataset.clone(), var.clone()));
        }
    }
    bail!("variable not found: {name}")
}

fn load_variable(repo: &Repo, data: &DataArgs) -> Result<LoadedVariable> {
    if let Some(raw) = &data.values {
        return Ok(LoadedVariable {
            name: "datos".into(),
            values: parse_values(raw),
            origin: None,
        });
    }
    let (Some(project), Some(variable)) = (&data.project, &data.variable) else {
        bail!("use --values, or --project together with --variable");
    };
    let (dataset, var) = find_variable(repo, project, variable)?;
    Ok(LoadedVariable {
        name: var.name,
        values: var.values,
        origin: Some((project.clone(), dataset.id)),
    })
}

fn load_numbers(repo: &Repo, data: &DataArgs) -> Result<Vec<f64>> {
    Ok(numeric_only(&load_variable(repo, data)?.values))
}

fn load_pair(repo: &Repo, pair: &PairArgs) -> Result<(Vec<f64>, Vec<f64>)> {
    match &pair.project {
        Some(project) => {
            let (_, x) = find_variable(repo, project, &pair.x)?;
            let (_, y) = find_variable(repo, project, &pair.y)?;
            Ok((numeric_only(&x.values), numeric_only(&y.values)))
        }
        None => Ok((
            numeric_only(&parse_values(&pair.x)),
            numeric_only(&parse_values(&pair.y)),
        )),
    }
}

// ---------------------------------------------------------------------------
// Project commands
// ---------------------------------------------------------------------------

fn cmd_project_create(
    repo: &Repo,
    name: String,
    level: EducationLevel,
    analysis: AnalysisType,
    description: String,
) -> Result<()> {
    if name.trim().is_empty() {
        bail!("project name cannot be empty");
    }
    let mut project = Project::new(name, level, analysis);
    project.description = description;
    let id = repo.create_project(project)?;
    println!("Created project: {id}");
    Ok(())
}

fn cmd_project_list(repo: &Repo, level: Option<EducationLevel>) -> Result<()> {
    let projects = repo.list_projects(level)?;
    if projects.is_empty() {
        println!("No projects yet.");
        return Ok(());
    }

    println!("{:<28} {:<12} {:<12} Name", "ID", "Level", "Analysis");
    println!("{}", "-".repeat(72));
    for p in &projects {
        println!(
            "{:<28} {:<12} {:<12} {}",
            p.id,
            p.education_level.to_string(),
            p.analysis_type.to_string(),
            p.name
        );
    }
    Ok(())
}

fn cmd_project_show(repo: &Repo, id: &str) -> Result<()> {
    let project = resolve_project(repo, id)?;
    let datasets = repo.list_datasets(id)?;
    let statistics = repo.list_statistics(id)?;
    let report = repo.latest_report(id)?;

    println!("Project: {}", project.name);
    println!("  id:          {}", project.id);
    println!("  level:       {}", project.education_level);
    println!("  analysis:    {}", project.analysis_type);
    if !project.description.is_empty() {
        println!("  description: {}", project.description);
    }
    println!(
        "  created:     {}",
        project.created_at.format("%Y-%m-%d %H:%M")
    );
    println!(
        "  updated:     {}",
        project.updated_at.format("%Y-%m-%d %H:%M")
    );
    println!("  datasets:    {}", datasets.len());
    println!("  statistics:  {}", statistics.len());
    if let Some(r) = report {
        println!(
            "  report:      {} ({})",
            r.created_at.format("%Y-%m-%d %H:%M"),
            r.generated_by
        );
    }

    for d in &datasets {
        println!("\n  Dataset {} [{}]", d.id, d.source);
        for v in &d.variables {
            println!("    {:<20} {:<22} n={}", v.name, v.kind.label(), v.len());
        }
    }
    Ok(())
}

fn cmd_project_update(repo: &Repo, id: &str, update: ProjectUpdate) -> Result<()> {
    if update.is_empty() {
        bail!("nothing to update (use --name, --description, --level or --analysis)");
    }
    let project = repo.update_project(id, update)?;
    println!("Updated project: {} ({})", project.id, project.name);
    Ok(())
}

fn cmd_project_delete(repo: &Repo, id: &str) -> Result<()> {
    repo.delete_project(id)?;
    println!("Deleted: {id}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Dataset commands
// ---------------------------------------------------------------------------

fn cmd_dataset_add(
    repo: &Repo,
    project_id: &str,
    name: String,
    raw: &str,
    kind: Option<VariableKind>,
    append: bool,
) -> Result<()> {
    resolve_project(repo, project_id)?;
    let values = parse_values(raw);
    if values.is_empty() {
        bail!("no values given");
    }
    let variable = match kind {
        Some(kind) => Variable::new(name, kind, values),
        None => Variable::inferred(name, values),
    };
    let summary = format!(
        "{} ({}, n={})",
        variable.name,
        variable.kind.label(),
        variable.len()
    );

    if append {
        if let Some(mut dataset) = repo.latest_dataset(project_id)? {
            dataset.variables.retain(|v| v.name != variable.name);
            dataset.variables.push(variable);
            repo.update_dataset(&dataset)?;
            println!("Added {summary} to dataset {}", dataset.id);
            return Ok(());
        }
    }

    let id = repo.create_dataset(Dataset::new(
        project_id.to_string(),
        vec![variable],
        "manual".into(),
    ))?;
    println!("Created dataset {id} with {summary}");
    Ok(())
}

fn cmd_dataset_import(repo: &Repo, project_id: &str, file: &Path) -> Result<()> {
    resolve_project(repo, project_id)?;
    let text =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let variables =
        csv::parse_variables(&text).with_context(|| format!("parsing {}", file.display()))?;
    let source = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "import".into());

    let count = variables.len();
    let id = repo.create_dataset(Dataset::new(project_id.to_string(), variables, source))?;
    println!("Imported {count} variables into dataset {id}");
    Ok(())
}

fn cmd_dataset_list(repo: &Repo, project_id: &str) -> Result<()> {
    resolve_project(repo, project_id)?;
    let datasets = repo.list_datasets(project_id)?;
    if datasets.is_empty() {
        println!("No datasets yet.");
        return Ok(());
    }
    for d in &datasets {
        let names = d
            .variables
            .iter()
            .map(|v| v.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "{} [{}] {}: {}",
            d.id,
            d.source,
            d.created_at.format("%Y-%m-%d %H:%M"),
            names
        );
    }
    Ok(())
}

fn cmd_dataset_clear(repo: &Repo, project_id: &str) -> Result<()> {
    resolve_project(repo, project_id)?;
    let removed = repo.delete_datasets_by_project(project_id)?;
    println!("Deleted {removed} datasets.");
    Ok(())
}

fn cmd_dataset_example(repo: &Repo, id: Option<&str>, level: Option<EducationLevel>) -> Result<()> {
    let Some(id) = id else {
        let samples = estad_core::samples(level);
        if samples.is_empty() {
            println!("No samples for that level.");
            return Ok(());
        }
        for s in &samples {
            let names = s
                .variables
                .iter()
                .map(|v| v.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            println!("{:<14} {:<11} {} ({names})", s.id, s.education_level.to_string(), s.name);
        }
        return Ok(());
    };

    let sample =
        estad_core::find_sample(id).ok_or_else(|| anyhow!("no sample named '{id}'"))?;
    let (project_id, dataset_id) = sample.install(repo)?;
    println!("Created project: {project_id}");
    println!("Created dataset: {dataset_id}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Analysis commands
// ---------------------------------------------------------------------------

fn cmd_freq(
    repo: &Repo,
    cfg: &Config,
    data: &DataArgs,
    grouped: bool,
    bins: Option<usize>,
    json: bool,
) -> Result<()> {
    let loaded = load_variable(repo, data)?;
    let table = if grouped || bins.is_some() {
        let count = bins
            .map(BinCount::Fixed)
            .unwrap_or_else(|| cfg.analysis.bin_count());
        build_grouped(&loaded.values, count)?
    } else {
        build_simple(&loaded.values)
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }
    print_table(&loaded.name, &table);
    Ok(())
}

#[derive(Clone, Copy)]
struct Positions {
    percentile: f64,
    decile: f64,
    quartile: f64,
}

fn cmd_stats(
    repo: &Repo,
    data: &DataArgs,
    positions: Positions,
    save: bool,
    json: bool,
) -> Result<()> {
    let loaded = load_variable(repo, data)?;
    let target = if save {
        Some(save_target(&loaded)?)
    } else {
        None
    };
    let stats = descriptive::compute(&loaded.values);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&loaded.name, &stats, positions);
    }

    if let Some((project_id, dataset_id)) = target {
        let id = repo.save_statistics(StatisticRecord::new(
            project_id,
            dataset_id,
            loaded.name,
            stats,
        ))?;
        println!("Saved statistics: {id}");
    }
    Ok(())
}

/// Project and dataset a `--save` writes to. Inline `--values` have none.
fn save_target(loaded: &LoadedVariable) -> Result<(String, String)> {
    match &loaded.origin {
        Some(origin) => Ok(origin.clone()),
        None => bail!("--save needs --project and --variable"),
    }
}

fn cmd_correlate(repo: &Repo, pair: &PairArgs) -> Result<()> {
    let (xs, ys) = load_pair(repo, pair)?;
    let c = inference::pearson_correlation(&xs, &ys)?;
    println!("n:  {}", c.n);
    println!("r:  {:.4}", c.r);
    println!("r²: {:.4}", c.r2);
    println!("t:  {:.4}", c.t);
    println!("{}", c.describe());
    Ok(())
}

fn cmd_regress(repo: &Repo, pair: &PairArgs, predict: Option<f64>) -> Result<()> {
    let (xs, ys) = load_pair(repo, pair)?;
    let reg = inference::linear_regression(&xs, &ys)?;
    println!("{}", reg.equation());
    println!("n:  {}", reg.n);
    println!("R²: {:.4}", reg.r2);
    println!("r:  {:.4}", reg.r);
    if let Some(se) = reg.standard_error {
        println!("Error estándar de estimación: {se:.4}");
    }
    if let Some(x) = predict {
        println!("ŷ({x}) = {:.4}", reg.predict(x));
    }
    Ok(())
}

fn cmd_interval(repo: &Repo, data: &DataArgs, level: u8) -> Result<()> {
    let values = load_numbers(repo, data)?;
    let ci = inference::confidence_interval(&values, level)?;
    println!("Media:          {:.4}", ci.mean);
    println!("Error estándar: {:.4}", ci.standard_error);
    println!("Margen:         {:.4}", ci.margin);
    println!("IC {}%:         [{:.4}, {:.4}]", ci.level, ci.lower, ci.upper);
    Ok(())
}

fn cmd_ttest(repo: &Repo, data: &DataArgs, mu: f64, level: u8) -> Result<()> {
    let values = load_numbers(repo, data)?;
    let test = inference::mean_hypothesis_test(&values, mu, level)?;
    println!("H₀: μ = {}", test.hypothesized_mean);
    println!("Media observada: {:.4}", test.observed_mean);
    println!("t:               {:.4} (gl = {})", test.t, test.degrees_of_freedom);
    println!("p aprox.:        {}", test.p_value);
    println!("α:               {}", test.alpha);
    println!("{}", test.conclusion());
    Ok(())
}

fn cmd_shape(repo: &Repo, data: &DataArgs) -> Result<()> {
    let values = load_numbers(repo, data)?;
    let shape = inference::distribution_shape(&values)?;
    println!("Asimetría:    {:.4}", shape.skewness);
    println!("Curtosis:     {:.4}", shape.kurtosis);
    println!("Jarque-Bera:  {:.4}", shape.jarque_bera);
    if shape.approximately_normal {
        println!("La distribución es aproximadamente normal.");
    } else {
        println!("La distribución no parece normal.");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Reports and tutor
// ---------------------------------------------------------------------------

fn cmd_report_generate(repo: &Repo, cfg: &Config, project_id: &str, local: bool) -> Result<()> {
    let project = resolve_project(repo, project_id)?;
    let dataset = repo
        .latest_dataset(project_id)?
        .ok_or_else(|| anyhow!("project {project_id} has no data loaded"))?;
    let summary = DatasetSummary::from_dataset(&dataset, cfg.analysis.bin_count());

    let generator = (cfg.remote.enabled && !local).then(|| {
        HttpReportGenerator::new(
            &cfg.remote.base_url,
            Duration::from_secs(cfg.remote.timeout_secs),
        )
    });
    let composed = compose_with_ai(
        generator.as_ref().map(|g| g as &dyn ReportGenerator),
        &project,
        &summary,
    );
    if let Some(notice) = &composed.notice {
        eprintln!("{notice}");
    }

    repo.save_report(Report::new(
        project.id.clone(),
        composed.content.clone(),
        project.education_level,
        composed.source.to_string(),
    ))?;
    println!("{}", composed.content);
    Ok(())
}

fn cmd_report_show(repo: &Repo, project_id: &str) -> Result<()> {
    resolve_project(repo, project_id)?;
    match repo.latest_report(project_id)? {
        Some(report) => println!("{}", report.content),
        None => println!("No report yet. Run `estad report generate -p {project_id}`."),
    }
    Ok(())
}

fn cmd_ask(cfg: &Config, question: &str, level: EducationLevel) -> Result<()> {
    if !cfg.remote.enabled {
        bail!("the tutor needs [remote] enabled = true");
    }
    let client = TutorClient::new(
        &cfg.remote.chat_url,
        Duration::from_secs(cfg.remote.timeout_secs),
    );
    let reply = client.ask(question, level).context("tutor request failed")?;
    println!("{reply}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Backup commands
// ---------------------------------------------------------------------------

fn cmd_export(repo: &Repo, output: Option<&Path>) -> Result<()> {
    let snapshot = repo.export_snapshot()?;
    let json = serde_json::to_string_pretty(&snapshot)?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_import(repo: &Repo, file: &Path) -> Result<()> {
    let text =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let snapshot: Snapshot =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", file.display()))?;
    let replaced = repo.import_snapshot(&snapshot)?;
    println!("Imported {replaced} collections.");
    Ok(())
}

fn cmd_clear(repo: &Repo, yes: bool) -> Result<()> {
    if !yes {
        bail!("this deletes every project; rerun with --yes");
    }
    repo.clear_all()?;
    println!("All data deleted.");
    Ok(())
}

fn cmd_config(cfg: &Config) -> Result<()> {
    println!("Config: {}", config::show_config_path());
    println!();
    println!("[store]");
    println!(
        "  path = {}",
        cfg.store
            .path
            .as_deref()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} (default)", default_db_path().display()))
    );
    println!();
    println!("[analysis]");
    println!("  use_sturges = {}", cfg.analysis.use_sturges);
    println!("  bins = {}", cfg.analysis.bins);
    println!("  percentile = {}", cfg.analysis.percentile);
    println!("  decile = {}", cfg.analysis.decile);
    println!("  quartile = {}", cfg.analysis.quartile);
    println!("  confidence_level = {}", cfg.analysis.confidence_level);
    println!();
    println!("[remote]");
    println!("  enabled = {}", cfg.remote.enabled);
    println!("  base_url = {}", cfg.remote.base_url);
    println!("  chat_url = {}", cfg.remote.chat_url);
    println!("  timeout_secs = {}", cfg.remote.timeout_secs);
    println!();
    println!("[report]");
    println!("  education_level = {}", cfg.report.education_level);
    Ok(())
}

// ---------------------------------------------------------------------------
// Printing
// ---------------------------------------------------------------------------

fn print_table(name: &str, table: &FrequencyTable) {
    println!("Variable: {name} (n={})", table.n);
    if table.is_empty() {
        println!("No data.");
        return;
    }

    match table.kind {
        TableKind::Simple => {
            println!(
                "{:<20} {:>5} {:>8} {:>8} {:>5} {:>8}",
                "Valor", "fi", "fr", "%", "Fi", "Fr"
            );
            println!("{}", "-".repeat(60));
            for r in &table.rows {
                println!(
                    "{:<20} {:>5} {:>8.4} {:>7.1}% {:>5} {:>8.4}",
                    truncate(&r.value, 20),
                    r.absolute_freq,
                    r.relative_freq,
                    r.percent,
                    r.cumulative_absolute,
                    r.cumulative_relative
                );
            }
        }
        TableKind::Grouped => {
            if let Some(width) = table.bin_width {
                println!("Amplitud: {width:.4}");
            }
            println!(
                "{:<24} {:>8} {:>5} {:>8} {:>8} {:>5}",
                "Intervalo", "xi", "fi", "fr", "%", "Fi"
            );
            println!("{}", "-".repeat(64));
            for r in &table.rows {
                let mark = r.class.map(|c| c.class_mark).unwrap_or_default();
                println!(
                    "{:<24} {:>8.2} {:>5} {:>8.4} {:>7.1}% {:>5}",
                    r.value,
                    mark,
                    r.absolute_freq,
                    r.relative_freq,
                    r.percent,
                    r.cumulative_absolute
                );
            }
        }
    }
}

fn print_stats(name: &str, stats: &DescriptiveStats, at: Positions) {
    println!("Variable: {name}");
    println!("  n:        {}", stats.n);
    println!("  moda:     {}", stats.mode);
    let Some(num) = &stats.numeric else {
        return;
    };
    println!("  media:    {:.4}", num.mean);
    println!("  mediana:  {:.4}", num.median);
    println!("  mínimo:   {}", num.min);
    println!("  máximo:   {}", num.max);
    println!("  rango:    {:.4}", num.range);
    println!("  varianza: {:.4} (poblacional)", num.variance_population);
    if let Some(v) = num.variance_sample {
        println!("            {v:.4} (muestral)");
    }
    println!("  desvío:   {:.4} (poblacional)", num.std_dev_population);
    if let Some(s) = num.std_dev_sample {
        println!("            {s:.4} (muestral)");
    }
    match num.coefficient_of_variation {
        Some(cv) => println!("  CV:       {cv:.2}%"),
        None => println!("  CV:       no definido (media 0)"),
    }
    if let Some(se) = num.standard_error {
        println!("  error estándar: {se:.4}");
    }
    let [q1, q2, q3] = num.quartiles;
    println!("  cuartiles: {q1:.4} / {q2:.4} / {q3:.4} (RIC {:.4})", num.interquartile_range());
    let deciles = num
        .deciles
        .iter()
        .map(|d| format!("{d:.2}"))
        .collect::<Vec<_>>()
        .join(" ");
    println!("  deciles:  {deciles}");

    if let Some(p) = stats.percentile(at.percentile) {
        println!("  P{}:      {p:.4}", at.percentile);
    }
    if let Some(d) = stats.decile(at.decile) {
        println!("  D{}:      {d:.4}", at.decile);
    }
    if let Some(q) = stats.quartile(at.quartile) {
        println!("  Q{}:      {q:.4}", at.quartile);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max - 1).collect();
        format!("{cut}…")
    }
}
