// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scholar - course-grounded study assistant.
//!
//! This is the binary entry point: course administration, chat, and diagnostics.

mod commands;
mod doctor;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Scholar - course-grounded study assistant.
#[derive(Parser, Debug)]
#[command(name = "scholar", version, about, long_about = None)]
struct Cli {
    /// Configuration file to use instead of the standard lookup.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage courses.
    #[command(subcommand)]
    Course(CourseCommand),
    /// Manage a course's files.
    #[command(subcommand)]
    File(FileCommand),
    /// Inspect course knowledge.
    #[command(subcommand)]
    Knowledge(KnowledgeCommand),
    /// Talk to an assistant and browse transcripts.
    #[command(subcommand)]
    Chat(ChatCommand),
    /// Run diagnostic checks against the environment.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

#[derive(Subcommand, Debug)]
enum CourseCommand {
    /// Create a course.
    Add {
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// User id recorded as the creator.
        #[arg(long, default_value = "admin")]
        by: String,
    },
    /// List courses.
    List,
}

#[derive(Subcommand, Debug)]
enum FileCommand {
    /// Upload a file to a course.
    Add {
        /// Course code or id.
        #[arg(long)]
        course: String,
        /// Local file to upload.
        path: PathBuf,
        /// `behavior` or `content`.
        #[arg(long, default_value = "content")]
        classification: String,
        /// Display name; defaults to the file's name.
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "admin")]
        by: String,
    },
    /// Remove a file.
    Remove { file_id: String },
    /// Move a file to another classification.
    Reclassify {
        file_id: String,
        classification: String,
    },
    /// List a course's files by classification.
    List {
        #[arg(long)]
        course: String,
    },
}

#[derive(Subcommand, Debug)]
enum KnowledgeCommand {
    /// Ingest any new files and print the course's ordered engine handles.
    Resolve {
        #[arg(long)]
        course: String,
    },
}

#[derive(Args, Debug)]
struct UserArg {
    /// Authenticated user id.
    #[arg(long)]
    user: String,
}

#[derive(Subcommand, Debug)]
enum ChatCommand {
    /// Send one message and print the reply.
    Send {
        #[command(flatten)]
        user: UserArg,
        /// Assistant kind (typeX, references, academicReferences, therapyGPT, whatsTrendy, course).
        #[arg(long, default_value = "")]
        kind: String,
        /// Course code or id, for `course` sessions.
        #[arg(long)]
        course: Option<String>,
        /// Continue an existing session.
        #[arg(long)]
        session: Option<String>,
        text: String,
    },
    /// Print a session's transcript.
    History {
        #[command(flatten)]
        user: UserArg,
        #[arg(long)]
        session: String,
        /// Only the most recent N messages.
        #[arg(long)]
        limit: Option<i64>,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// List a user's sessions.
    Sessions {
        #[command(flatten)]
        user: UserArg,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => scholar_config::load_and_validate_path(path),
        None => scholar_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            scholar_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.service.log_level);

    let result = match cli.command {
        Commands::Doctor { plain } => doctor::run_doctor(&config, plain).await,
        command => match commands::Runtime::open(config).await {
            Ok(runtime) => {
                let outcome = dispatch(&runtime, command).await;
                runtime.close().await;
                outcome
            }
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn dispatch(
    runtime: &commands::Runtime,
    command: Commands,
) -> Result<(), scholar_core::ScholarError> {
    match command {
        Commands::Course(CourseCommand::Add {
            code,
            name,
            description,
            by,
        }) => runtime.course_add(&code, &name, description, &by).await,
        Commands::Course(CourseCommand::List) => runtime.course_list().await,
        Commands::File(FileCommand::Add {
            course,
            path,
            classification,
            name,
            by,
        }) => {
            runtime
                .file_add(&course, &path, &classification, name, &by)
                .await
        }
        Commands::File(FileCommand::Remove { file_id }) => runtime.file_remove(&file_id).await,
        Commands::File(FileCommand::Reclassify {
            file_id,
            classification,
        }) => runtime.file_reclassify(&file_id, &classification).await,
        Commands::File(FileCommand::List { course }) => runtime.file_list(&course).await,
        Commands::Knowledge(KnowledgeCommand::Resolve { course }) => {
            runtime.knowledge_resolve(&course).await
        }
        Commands::Chat(ChatCommand::Send {
            user,
            kind,
            course,
            session,
            text,
        }) => {
            runtime
                .chat_send(&user.user, &kind, course, session, &text)
                .await
        }
        Commands::Chat(ChatCommand::History {
            user,
            session,
            limit,
            json,
        }) => runtime.chat_history(&user.user, &session, limit, json).await,
        Commands::Chat(ChatCommand::Sessions { user }) => runtime.chat_sessions(&user.user).await,
        Commands::Doctor { .. } => Ok(()),
    }
}

/// Initialize the tracing subscriber with an env filter.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("scholar={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
