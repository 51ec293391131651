use std::{fs::File, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use simplelog::{ColorChoice, TermLogger, TerminalMode, WriteLogger};

mod commands;
mod config;

/// Work with the courses on a Moodle site through its REST web service.
///
/// The site is taken from AEDUCAR_API_URL and AEDUCAR_API_KEY (a .env file is read too),
/// or from the config file written by `moodle login`.
#[derive(Parser, Debug)]
#[command(name = "moodle", version, about)]
struct Args {
    /// More logging, repeat for more
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save the site's URL and token to the config file
    Login {
        #[arg(long)]
        url: String,
        #[arg(long)]
        token: String,
    },

    /// List every course
    Courses,

    /// Show one course, by id or idnumber
    Course {
        id: Option<i64>,
        #[arg(long, conflicts_with = "id", required_unless_present = "id")]
        idnumber: Option<String>,
    },

    /// Call a web service function directly
    Call {
        function: String,
        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        args: String,
    },

    /// Create a new course
    Create {
        #[command(flatten)]
        fields: commands::Fields,
    },

    /// Change some fields of an existing course
    Update {
        id: i64,
        #[command(flatten)]
        fields: commands::Fields,
    },
}

fn init_logging(args: &Args) -> Result<()> {
    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    match &args.log_file {
        Some(path) => WriteLogger::init(
            level,
            simplelog::Config::default(),
            File::create(path).context("error creating log file")?,
        )?,
        None => TermLogger::init(
            level,
            simplelog::Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        )?,
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    match args.command {
        Command::Login { url, token } => {
            config::save(&moodle_client::Config::new(url, token))?;
        }
        Command::Courses => commands::list(&client()?)?,
        Command::Course { id, idnumber } => commands::show(&client()?, id, idnumber)?,
        Command::Call { function, args } => commands::call(&client()?, &function, &args)?,
        Command::Create { fields } => commands::create(&client()?, fields)?,
        Command::Update { id, fields } => commands::update(&client()?, id, fields)?,
    }

    Ok(())
}

fn client() -> Result<moodle_client::Client> {
    Ok(moodle_client::Client::new(config::load()?))
}
