use std::path::PathBuf;

use anyhow::Context;
use chrono::{Datelike, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use log::info;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

mod attendance;
mod db;
mod error;
mod export;
mod import;
mod models;
mod recap;
mod report;

use models::{
    academic_year_for, AttendanceStatus, Gender, MonthSelector, NewJournalEntry, NewStudent,
};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Parser)]
#[command(name = "classroom-recap")]
#[command(about = "Class rosters, daily attendance, teaching journals and monthly recaps", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a sample teacher, class and a few days of attendance
    Seed,
    /// Register or rename a teacher profile
    AddTeacher {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        email: String,
    },
    /// Create a class owned by a teacher
    CreateClass {
        #[arg(long)]
        teacher_email: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "SD")]
        level: String,
        #[arg(long, default_value = "C")]
        phase: String,
        /// Defaults to the current school year, e.g. 2025/2026
        #[arg(long)]
        academic_year: Option<String>,
    },
    /// List a teacher's classes
    Classes {
        #[arg(long)]
        teacher_email: String,
    },
    /// Add a single student to a class
    AddStudent {
        #[arg(long)]
        class: Uuid,
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        nisn: Option<String>,
        /// L or P
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        parent_name: Option<String>,
        #[arg(long)]
        parent_phone: Option<String>,
    },
    /// List the students of a class
    Students {
        #[arg(long)]
        class: Uuid,
    },
    /// Import students from a CSV file
    Import {
        #[arg(long)]
        class: Uuid,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Write an import template CSV
    ImportTemplate {
        #[arg(long, default_value = "student_template.csv")]
        out: PathBuf,
    },
    /// Show attendance for one day
    Attendance {
        #[arg(long)]
        class: Uuid,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Record attendance for one day
    Mark {
        #[arg(long)]
        class: Uuid,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// <student-id>=<H|S|I|A>, repeatable
        #[arg(long = "set", value_parser = parse_mark_arg)]
        marks: Vec<(Uuid, AttendanceStatus)>,
        /// Status for students not otherwise marked
        #[arg(long, value_parser = parse_status_arg)]
        default: Option<AttendanceStatus>,
    },
    /// Teaching journal entries
    Journal {
        #[command(subcommand)]
        command: JournalCommands,
    },
    /// Monthly attendance recap
    Recap {
        #[arg(long)]
        class: Uuid,
        /// 1-12, defaults to the current month
        #[arg(long)]
        month: Option<u32>,
        /// Defaults to the current year
        #[arg(long)]
        year: Option<i32>,
        /// Export to .xlsx or .csv
        #[arg(long)]
        out: Option<PathBuf>,
        /// Export to the default spreadsheet filename
        #[arg(long, conflicts_with = "out")]
        download: bool,
        /// Print the recap as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum JournalCommands {
    /// Add a journal entry
    Add {
        #[arg(long)]
        class: Uuid,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Lesson period, e.g. 1-2
        #[arg(long)]
        period: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        material: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List journal entries, newest first
    List {
        #[arg(long)]
        class: Uuid,
    },
    /// Delete a journal entry
    Delete {
        #[arg(long)]
        id: Uuid,
    },
}

fn parse_mark_arg(value: &str) -> Result<(Uuid, AttendanceStatus), String> {
    attendance::parse_mark(value).map_err(|err| format!("{err:#}"))
}

fn parse_status_arg(value: &str) -> Result<AttendanceStatus, String> {
    attendance::parse_status(value).map_err(|err| err.to_string())
}

fn status_label(status: Option<AttendanceStatus>) -> &'static str {
    status.map_or("not taken", AttendanceStatus::label)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    if let Commands::ImportTemplate { out } = &cli.command {
        std::fs::write(out, import::template_csv())?;
        println!("Template written to {}.", out.display());
        return Ok(());
    }

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;
    let max_connections = match std::env::var("DATABASE_MAX_CONNECTIONS") {
        Ok(value) => value
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?,
        Err(_) => DEFAULT_MAX_CONNECTIONS,
    };

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;
    info!("connected to Postgres with up to {max_connections} connections");

    let today = Utc::now().date_naive();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::AddTeacher { full_name, email } => {
            let profile = db::upsert_profile(&pool, &full_name, &email).await?;
            println!("Teacher {} <{}> ({}).", profile.full_name, profile.email, profile.id);
        }
        Commands::CreateClass {
            teacher_email,
            name,
            level,
            phase,
            academic_year,
        } => {
            let academic_year = academic_year.unwrap_or_else(|| academic_year_for(today));
            let class =
                db::create_class(&pool, &teacher_email, &name, &level, &phase, &academic_year)
                    .await?;
            println!("Created class {} ({}) for {}.", class.name, class.id, class.academic_year);
        }
        Commands::Classes { teacher_email } => {
            let classes = db::list_classes(&pool, &teacher_email).await?;
            if classes.is_empty() {
                println!("No classes yet.");
                return Ok(());
            }

            println!("Classes for {teacher_email}:");
            for class in classes {
                println!(
                    "- {} [{} {}] {} ({}, created {})",
                    class.name,
                    class.level,
                    class.phase,
                    class.academic_year,
                    class.id,
                    class.created_at.date_naive()
                );
            }
        }
        Commands::AddStudent {
            class,
            full_name,
            nisn,
            gender,
            parent_name,
            parent_phone,
        } => {
            let student = NewStudent {
                full_name,
                nisn,
                gender: Gender::from_code(gender.as_deref()),
                parent_name,
                parent_phone,
            };
            let id = db::add_student(&pool, class, &student).await?;
            println!("Added {} ({id}).", student.full_name);
        }
        Commands::Students { class } => {
            let roster = db::fetch_roster(&pool, class).await?;
            if roster.is_empty() {
                println!("No students in this class.");
                return Ok(());
            }

            for (position, student) in roster.iter().enumerate() {
                println!(
                    "{:>3}. {} [{}] ({})",
                    position + 1,
                    student.full_name,
                    student.gender.code().unwrap_or("-"),
                    student.id
                );
            }
        }
        Commands::Import { class, csv } => {
            let file = std::fs::File::open(&csv)
                .with_context(|| format!("failed to open {}", csv.display()))?;
            let students = import::parse_students(file)
                .with_context(|| format!("failed to read {}", csv.display()))?;
            let inserted = db::insert_students(&pool, class, &students).await?;
            println!("Imported {inserted} students from {}.", csv.display());
        }
        // Needs no database; handled before connecting.
        Commands::ImportTemplate { .. } => {}
        Commands::Attendance { class, date } => {
            let date = date.unwrap_or(today);
            let roster = db::fetch_roster(&pool, class).await?;
            let events = db::fetch_attendance(&pool, class, date, date).await?;
            let sheet = attendance::daily_sheet(&roster, &events);

            println!("Attendance for {date}:");
            for line in sheet {
                println!(
                    "- {} [{}] ({}) {}",
                    line.name,
                    line.gender.code().unwrap_or("-"),
                    line.student_id,
                    status_label(line.status)
                );
            }
        }
        Commands::Mark {
            class,
            date,
            marks,
            default,
        } => {
            let date = date.unwrap_or(today);
            let roster = db::fetch_roster(&pool, class).await?;
            let events = db::fetch_attendance(&pool, class, date, date).await?;
            let mut sheet = attendance::daily_sheet(&roster, &events);
            attendance::apply_marks(&mut sheet, &marks, default)?;
            let saved = db::save_attendance(&pool, class, date, &sheet).await?;
            println!("Saved {saved} attendance entries for {date}.");
        }
        Commands::Journal { command } => match command {
            JournalCommands::Add {
                class,
                date,
                period,
                subject,
                material,
                notes,
            } => {
                let entry = NewJournalEntry {
                    date: date.unwrap_or(today),
                    lesson_period: period,
                    subject,
                    material,
                    notes,
                };
                let id = db::add_journal(&pool, class, &entry).await?;
                println!("Journal entry {id} saved for {}.", entry.date);
            }
            JournalCommands::List { class } => {
                let entries = db::list_journals(&pool, class).await?;
                if entries.is_empty() {
                    println!("No journal entries yet.");
                    return Ok(());
                }

                for entry in entries {
                    println!(
                        "- {} period {}: {} ({})",
                        entry.date, entry.lesson_period, entry.subject, entry.id
                    );
                    println!("  {}", entry.material);
                    if let Some(notes) = entry.notes {
                        println!("  Notes: {notes}");
                    }
                }
            }
            JournalCommands::Delete { id } => {
                if db::delete_journal(&pool, id).await? {
                    println!("Journal entry {id} deleted.");
                } else {
                    println!("No journal entry {id}.");
                }
            }
        },
        Commands::Recap {
            class,
            month,
            year,
            out,
            download,
            json,
        } => {
            let period = MonthSelector::new(
                month.unwrap_or_else(|| today.month()),
                year.unwrap_or_else(|| today.year()),
            )?;
            let class_room = db::fetch_class(&pool, class).await?;
            let roster = db::fetch_roster(&pool, class).await?;
            let events =
                db::fetch_attendance(&pool, class, period.first_day(), period.last_day()).await?;
            let monthly = recap::build_recap(&roster, &events, period.month(), period.year())?;

            if json {
                println!("{}", serde_json::to_string_pretty(&monthly)?);
            } else {
                print!("{}", report::render_recap(&monthly, &class_room.name));
            }

            let out = out.or_else(|| {
                download.then(|| PathBuf::from(export::default_filename(&period)))
            });
            if let Some(path) = out {
                if monthly.students.is_empty() {
                    println!("No students to export.");
                    return Ok(());
                }
                let table = export::build_table(&monthly, &period.title());
                export::export_to_path(&table, &path)?;
                println!("Recap written to {}.", path.display());
            }
        }
    }

    Ok(())
}
