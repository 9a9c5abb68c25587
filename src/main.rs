//! course-store admin CLI
//!
//! ## Usage
//!
//! ```bash
//! # Initialize the data directory and database
//! course-store init
//!
//! # Show row counts
//! course-store stats
//!
//! # Run the consistency verifier over every course
//! course-store verify
//!
//! # Verify a single course
//! course-store verify --course <id>
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use course_store::db::{list_courses, verify_all, verify_course};
use course_store::{Config, CourseDb};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "course-store")]
#[command(about = "Structured course storage and ordering engine")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory (overrides config)
    #[arg(long, env = "COURSE_STORE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the data directory, database and default config
    Init,
    /// Print database statistics
    Stats,
    /// List courses, newest first
    List {
        /// Page number, starting at 0
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
    /// Check the contiguous-positions invariant
    Verify {
        /// Restrict the check to one course
        #[arg(long)]
        course: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {:?}", path))?,
        None => Config::default(),
    };
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    match args.command {
        Command::Init => {
            std::fs::create_dir_all(&config.data_dir)
                .with_context(|| format!("failed to create {:?}", config.data_dir))?;
            let _db = CourseDb::open(&config.data_dir)?;
            config.save(config.config_path())?;
            info!("Initialized course store at {:?}", config.data_dir);
        }
        Command::Stats => {
            let db = Arc::new(CourseDb::open(&config.data_dir)?);
            let stats = db.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::List { page } => {
            let db = Arc::new(CourseDb::open(&config.data_dir)?);
            let courses = db.with_conn(|conn| {
                list_courses(conn, config.page_size, page * config.page_size)
            })?;
            println!("{}", serde_json::to_string_pretty(&courses)?);
        }
        Command::Verify { course } => {
            let db = Arc::new(CourseDb::open(&config.data_dir)?);
            let dirty = db.with_conn(|conn| match &course {
                Some(id) => verify_course(conn, id),
                None => verify_all(conn),
            })?;

            if dirty.is_empty() {
                info!("All scopes satisfy the contiguous-positions invariant");
            } else {
                println!("{}", serde_json::to_string_pretty(&dirty)?);
                anyhow::bail!("{} scope(s) with position violations", dirty.len());
            }
        }
    }

    Ok(())
}
