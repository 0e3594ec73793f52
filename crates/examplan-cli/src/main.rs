//! examplan CLI - Exam Timetabling Engine
//!
//! Command-line interface for checking sessions, generating timetables,
//! exporting them, and keeping an archive of saved timetables.

mod archive;
mod input;

use anyhow::{bail, Context, Result};
use archive::{TimetableArchive, DEFAULT_ARCHIVE};
use clap::{Args, Parser, Subcommand, ValueEnum};
use examplan_core::{ClashLog, ExamSession, Renderer, StudentId, Timetable};
use examplan_render::{visible_rows, ExcelRenderer, StudentFilter, TextRenderer, DEFAULT_TITLE};
use examplan_solver::{ConflictGraph, RoomAllocator, SearchLimits, SlotCalendar, TimetableEngine};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "examplan")]
#[command(author, version, about = "Exam timetabling engine", long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Archive file for saved timetables
    #[arg(long, global = true, env = "EXAMPLAN_ARCHIVE", default_value = DEFAULT_ARCHIVE)]
    archive: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a session and configuration without scheduling
    Check {
        #[command(flatten)]
        session: SessionArgs,

        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Generate a timetable
    Schedule {
        #[command(flatten)]
        session: SessionArgs,

        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only show exams sat by this student
        #[arg(long, value_name = "ID")]
        student: Option<String>,

        /// Write one timetable per student into this directory
        #[arg(long, value_name = "DIR", conflicts_with_all = ["student", "output"])]
        per_student: Option<PathBuf>,

        /// Backtracking steps before falling back to the greedy pass
        #[arg(long, value_name = "N")]
        max_iterations: Option<usize>,

        /// Save the timetable to the archive under this name
        #[arg(long, value_name = "NAME")]
        save: Option<String>,

        /// Description stored with the timetable
        #[arg(long)]
        description: Option<String>,

        /// Write the clash log to this file
        #[arg(long, value_name = "FILE")]
        log: Option<PathBuf>,
    },

    /// Browse saved timetables
    Archive {
        #[command(subcommand)]
        command: ArchiveCommand,
    },
}

#[derive(Subcommand)]
enum ArchiveCommand {
    /// List saved timetables, newest first
    List,

    /// Export a saved timetable
    Show {
        /// Timetable ID
        id: u64,

        /// Only show exams sat by this student
        #[arg(long, value_name = "ID")]
        student: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write one timetable per student into this directory
        #[arg(long, value_name = "DIR", conflicts_with_all = ["student", "output"])]
        per_student: Option<PathBuf>,
    },
}

/// Where the session comes from: one JSON file or three CSV tables
#[derive(Args)]
struct SessionArgs {
    /// Session file (JSON)
    #[arg(
        value_name = "SESSION",
        required_unless_present = "exams",
        conflicts_with_all = ["rooms", "students", "exams"]
    )]
    session: Option<PathBuf>,

    /// Rooms table (CSV: room_id,capacity)
    #[arg(long, value_name = "CSV", requires_all = ["students", "exams"])]
    rooms: Option<PathBuf>,

    /// Students table (CSV: student_id,full_name)
    #[arg(long, value_name = "CSV", requires_all = ["rooms", "exams"])]
    students: Option<PathBuf>,

    /// Exams table (CSV: exam_id,subject,duration_minutes,student_ids)
    #[arg(long, value_name = "CSV", requires_all = ["rooms", "students"])]
    exams: Option<PathBuf>,
}

impl SessionArgs {
    fn load(&self) -> Result<ExamSession> {
        match (&self.session, &self.rooms, &self.students, &self.exams) {
            (Some(path), ..) => input::load_session(path),
            (None, Some(rooms), Some(students), Some(exams)) => {
                input::load_csv_session(rooms, students, exams)
            }
            _ => bail!("Provide a session file or all of --rooms, --students and --exams"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Xlsx,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(Commands::Check { session, config }) => cmd_check(&session, config.as_deref()),
        Some(Commands::Schedule {
            session,
            config,
            format,
            output,
            student,
            per_student,
            max_iterations,
            save,
            description,
            log,
        }) => {
            let request = ScheduleRequest {
                format,
                output,
                student,
                per_student,
                max_iterations,
                save,
                description,
                log,
                archive: cli.archive,
            };
            cmd_schedule(&session, config.as_deref(), &request)
        }
        Some(Commands::Archive { command }) => match command {
            ArchiveCommand::List => cmd_archive_list(&cli.archive),
            ArchiveCommand::Show {
                id,
                student,
                format,
                output,
                per_student,
            } => {
                let target = match per_student {
                    Some(dir) => ExportTarget::PerStudent(dir),
                    None => ExportTarget::Single { output, student },
                };
                cmd_archive_show(&cli.archive, id, format, &target)
            }
        },
        None => {
            println!("examplan - Exam Timetabling Engine");
            println!("Run with --help for usage information");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// `RUST_LOG` wins over `-v`
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

// ============================================================================
// check
// ============================================================================

fn cmd_check(source: &SessionArgs, config_path: Option<&Path>) -> Result<ExitCode> {
    let session = source.load()?;
    let config = input::load_config(config_path)?;
    session.validate().context("Invalid session")?;
    config.validate().context("Invalid configuration")?;

    let graph = ConflictGraph::build(&session.exams);
    let calendar = SlotCalendar::new(&config);
    let rooms = RoomAllocator::new(&session.rooms);
    let largest = rooms.largest_capacity().unwrap_or(0);

    println!("Session: {}", session_title(&session));
    println!("  Exams: {}", session.exams.len());
    println!("  Rooms: {} (largest: {largest} seats)", session.rooms.len());
    println!("  Students: {}", session.students.len());
    println!(
        "  Conflicts: {} (most for one exam: {})",
        graph.edge_count(),
        graph.max_degree()
    );
    println!(
        "  Period: {} to {} ({} valid days)",
        calendar.start_date(),
        calendar.end_date(),
        calendar.available_days()
    );
    println!(
        "  Available slots: {} ({} per day)",
        calendar.total_slots(),
        calendar.exams_per_day()
    );

    if calendar.total_slots() < session.exams.len() {
        println!(
            "  Warning: {} exams but only {} slots",
            session.exams.len(),
            calendar.total_slots()
        );
    }
    for exam in session.exams.iter().filter(|e| e.student_count() > largest as usize) {
        println!(
            "  Warning: exam {} has {} students but the largest room seats {largest}",
            exam.id,
            exam.student_count()
        );
    }

    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// schedule
// ============================================================================

struct ScheduleRequest {
    format: OutputFormat,
    output: Option<PathBuf>,
    student: Option<String>,
    per_student: Option<PathBuf>,
    max_iterations: Option<usize>,
    save: Option<String>,
    description: Option<String>,
    log: Option<PathBuf>,
    archive: PathBuf,
}

fn cmd_schedule(source: &SessionArgs, config_path: Option<&Path>, request: &ScheduleRequest) -> Result<ExitCode> {
    if request.format == OutputFormat::Xlsx && request.output.is_none() && request.per_student.is_none() {
        bail!("xlsx output requires --output or --per-student");
    }

    let session = source.load()?;
    let config = input::load_config(config_path)?;

    let mut limits = SearchLimits::new();
    if let Some(max) = request.max_iterations {
        limits = limits.max_iterations(max);
    }
    let mut engine = TimetableEngine::new(&session, config)
        .context("Invalid session or configuration")?
        .with_limits(limits);

    info!(session = %session_title(&session), "Scheduling");
    let solved = engine.generate();

    if let Some(path) = &request.log {
        fs::write(path, format!("{}\n", engine.clash_log()))
            .with_context(|| format!("Failed to write clash log: {}", path.display()))?;
    }

    let name = request.save.clone().unwrap_or_else(|| session_title(&session));
    let timetable = match engine.timetable(name) {
        Some(timetable) if solved => timetable,
        _ => {
            eprintln!("{}", engine.clash_log());
            return Ok(ExitCode::FAILURE);
        }
    };
    let timetable = match &request.description {
        Some(description) => timetable.description(description.clone()),
        None => timetable,
    };

    if request.save.is_some() {
        let mut archive = TimetableArchive::open(&request.archive)?;
        let id = archive.save(&timetable, &session.students)?;
        eprintln!("Saved timetable {id} to {}", archive.path().display());
    }

    if let Some(dir) = &request.per_student {
        export_per_student(&timetable, &session.students, request.format, dir)?;
        return Ok(ExitCode::SUCCESS);
    }

    let student = request
        .student
        .as_deref()
        .map(|id| StudentFilter::new(id, session.student_name(id)));
    export(
        &timetable,
        request.format,
        request.output.as_deref(),
        student,
        Some(engine.clash_log()),
    )?;

    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// archive
// ============================================================================

fn cmd_archive_list(path: &Path) -> Result<ExitCode> {
    let archive = TimetableArchive::open(path)?;
    if archive.is_empty() {
        println!("No saved timetables.");
        return Ok(ExitCode::SUCCESS);
    }

    for saved in archive.list() {
        let timetable = &saved.timetable;
        println!(
            "{:>4}  {}  {} ({} to {}, {} exams)",
            saved.id,
            saved.created.format("%Y-%m-%d %H:%M"),
            timetable.name,
            timetable.start_date,
            timetable.end_date,
            timetable.placements.len()
        );
        if let Some(description) = &timetable.description {
            println!("      {description}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// What `archive show` writes
enum ExportTarget {
    /// One timetable to a file or stdout, optionally filtered to a student
    Single {
        output: Option<PathBuf>,
        student: Option<String>,
    },
    /// One file per rostered student
    PerStudent(PathBuf),
}

fn cmd_archive_show(path: &Path, id: u64, format: OutputFormat, target: &ExportTarget) -> Result<ExitCode> {
    if format == OutputFormat::Xlsx && matches!(target, ExportTarget::Single { output: None, .. }) {
        bail!("xlsx output requires --output or --per-student");
    }

    let archive = TimetableArchive::open(path)?;
    let Some(saved) = archive.load(id) else {
        bail!("No saved timetable with ID {id} in {}", path.display());
    };

    match target {
        ExportTarget::PerStudent(dir) => {
            export_per_student(&saved.timetable, &saved.students, format, dir)?;
        }
        ExportTarget::Single { output, student } => {
            let student = student
                .as_deref()
                .map(|sid| StudentFilter::new(sid, saved.student_name(sid)));
            export(&saved.timetable, format, output.as_deref(), student, None)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// Output
// ============================================================================

fn session_title(session: &ExamSession) -> String {
    if session.name.trim().is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        session.name.clone()
    }
}

fn export(
    timetable: &Timetable,
    format: OutputFormat,
    output: Option<&Path>,
    student: Option<StudentFilter>,
    clash_log: Option<&ClashLog>,
) -> Result<()> {
    if format == OutputFormat::Xlsx && output.is_none() {
        bail!("xlsx output requires --output or --per-student");
    }
    debug!(?format, exams = timetable.placements.len(), "Exporting timetable");
    let bytes = render_bytes(timetable, format, student, clash_log)?;
    write_output(output, &bytes)
}

fn render_bytes(
    timetable: &Timetable,
    format: OutputFormat,
    student: Option<StudentFilter>,
    clash_log: Option<&ClashLog>,
) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Text => {
            let text = TextRenderer::new().filter(student).render(timetable)?;
            Ok(text.into_bytes())
        }
        OutputFormat::Json => {
            let view = Timetable {
                placements: visible_rows(timetable, student.as_ref())
                    .into_iter()
                    .cloned()
                    .collect(),
                ..timetable.clone()
            };
            let mut json = serde_json::to_string_pretty(&view)?;
            json.push('\n');
            Ok(json.into_bytes())
        }
        OutputFormat::Xlsx => {
            let mut renderer = ExcelRenderer::new().filter(student);
            if let Some(log) = clash_log {
                renderer = renderer.with_clash_log(log.clone());
            }
            Ok(renderer.render(timetable)?)
        }
    }
}

/// Failures listed by name before the rest are counted
const LISTED_FAILURES: usize = 5;

/// Write one timetable per rostered student into `dir`.
///
/// Files are named `<id>_<name>` with spaces in the name replaced by `_`.
/// Errors only when no file at all could be written.
fn export_per_student(
    timetable: &Timetable,
    roster: &BTreeMap<StudentId, String>,
    format: OutputFormat,
    dir: &Path,
) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let extension = match format {
        OutputFormat::Text => "txt",
        OutputFormat::Json => "json",
        OutputFormat::Xlsx => "xlsx",
    };

    let mut created = 0;
    let mut failures = Vec::new();
    for (sid, name) in roster {
        let path = dir.join(format!("{sid}_{}.{extension}", name.replace(' ', "_")));
        let written = render_bytes(timetable, format, Some(StudentFilter::new(sid, name)), None)
            .and_then(|bytes| {
                fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))
            });
        match written {
            Ok(()) => {
                debug!(student = %sid, path = %path.display(), "Wrote student timetable");
                created += 1;
            }
            Err(e) => failures.push(format!("  {sid}: {e:#}")),
        }
    }

    if created == 0 {
        match failures.first() {
            Some(first) => bail!("No student timetables written to {}:\n{first}", dir.display()),
            None => bail!("No students to export"),
        }
    }

    println!("Created {created} student timetables in {}", dir.display());
    if !failures.is_empty() {
        eprintln!("{} students failed:", failures.len());
        for failure in failures.iter().take(LISTED_FAILURES) {
            eprintln!("{failure}");
        }
        if failures.len() > LISTED_FAILURES {
            eprintln!("  ... and {} more", failures.len() - LISTED_FAILURES);
        }
    }
    Ok(())
}

fn write_output(output: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
            Ok(())
        }
        None => {
            use std::io::Write;
            std::io::stdout().write_all(bytes)?;
            Ok(())
        }
    }
}
