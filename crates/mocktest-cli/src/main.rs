//! The `mocktest` command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

use commands::{Credentials, GlobalOpts};

#[derive(Parser)]
#[command(name = "mocktest", version, about = "Timed multiple-choice practice tests")]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and an editable copy of the question bank
    Init,

    /// Validate question bank TOML files
    Validate {
        /// Path to a bank file or directory (defaults to the bundled bank)
        #[arg(long)]
        bank: Option<PathBuf>,
    },

    /// List subjects and their tests
    Subjects,

    /// Create an account
    Signup {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        /// learner (student) or instructor (faculty)
        #[arg(long, default_value = "learner")]
        role: String,
    },

    /// Take the test of a subject
    Take {
        #[command(flatten)]
        auth: Credentials,

        /// Subject id or name
        #[arg(long)]
        subject: String,

        /// Submit these answers without prompting, e.g. "python-1=B,python-2=C"
        #[arg(long)]
        answers: Option<String>,
    },

    /// List your attempts, or show the review of one
    Results {
        #[command(flatten)]
        auth: Credentials,

        /// Attempt id (defaults to listing every attempt)
        #[arg(long)]
        attempt: Option<String>,

        /// Output format: text, markdown, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Also save the review as JSON to this path
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show your averages and pending tests
    Dashboard {
        #[command(flatten)]
        auth: Credentials,
    },

    /// Class performance analytics (instructors)
    Performance {
        #[command(flatten)]
        auth: Credentials,

        /// Restrict the distribution to one subject
        #[arg(long)]
        subject: Option<String>,

        /// Filter learners by name or email
        #[arg(long)]
        search: Option<String>,
    },

    /// List a subject's questions (instructors)
    Questions {
        #[command(flatten)]
        auth: Credentials,

        #[arg(long)]
        subject: String,

        /// Filter by text or option
        #[arg(long)]
        search: Option<String>,
    },

    /// Create or replace a question (instructors)
    EditQuestion {
        #[command(flatten)]
        auth: Credentials,

        #[arg(long)]
        subject: String,

        /// Question id to replace (a new id is assigned when omitted)
        #[arg(long)]
        id: Option<String>,

        #[arg(long)]
        text: String,

        /// Answer option; repeat for each option in display order
        #[arg(long = "option", required = true)]
        options: Vec<String>,

        /// Letter of the correct option
        #[arg(long)]
        correct: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mocktest=info")),
        )
        .init();

    let cli = Cli::parse();
    let global = cli.global;

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Subjects => commands::subjects::execute(&global).await,
        Commands::Signup {
            name,
            email,
            password,
            role,
        } => commands::signup::execute(&global, name, email, password, role).await,
        Commands::Take {
            auth,
            subject,
            answers,
        } => commands::take::execute(&global, auth, subject, answers).await,
        Commands::Results {
            auth,
            attempt,
            format,
            output,
        } => commands::results::execute(&global, auth, attempt, format, output).await,
        Commands::Dashboard { auth } => commands::dashboard::execute(&global, auth).await,
        Commands::Performance {
            auth,
            subject,
            search,
        } => commands::performance::execute(&global, auth, subject, search).await,
        Commands::Questions {
            auth,
            subject,
            search,
        } => commands::questions::execute(&global, auth, subject, search).await,
        Commands::EditQuestion {
            auth,
            subject,
            id,
            text,
            options,
            correct,
        } => {
            commands::edit_question::execute(&global, auth, subject, id, text, options, correct)
                .await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
