use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eduverse_client::auth::AuthClient;
use eduverse_client::bulk_upload;
use eduverse_client::config::{Config, DEFAULT_LOG_FILTER};
use eduverse_client::confirm::{Confirm, Prompt};
use eduverse_client::quiz::{QuizClient, QuizListParams};
use eduverse_client::session::FileSessionStore;
use eduverse_client::{ApiClient, CourseBuilder, CourseClient, Session};

#[derive(Parser)]
#[command(name = "eduverse")]
#[command(about = "EduVerse course authoring CLI")]
#[command(
    after_help = "Environment:\n  EDUVERSE_API_URL       Backend base URL\n  EDUVERSE_SESSION_FILE  Persisted session\n  RUST_LOG               Log filter"
)]
struct Cli {
    /// Answer yes to every confirmation.
    #[arg(long, global = true, default_value_t = false)]
    yes: bool,
    /// Tenant to act in; defaults to the signed-in user's.
    #[arg(long, global = true)]
    tenant: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },
    Logout,
    Whoami,
    Course {
        #[command(subcommand)]
        command: CourseCommand,
    },
    Quiz {
        #[command(subcommand)]
        command: QuizCommand,
    },
    /// Writes the bulk upload CSV template.
    Template {
        #[arg(long, default_value = bulk_upload::TEMPLATE_FILE_NAME)]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum CourseCommand {
    Show { course_id: String },
    Publish { course_id: String },
    Unpublish { course_id: String },
    ReorderModules {
        course_id: String,
        #[arg(required = true)]
        module_ids: Vec<String>,
    },
    ImportCsv { course_id: String, file: PathBuf },
    Students {
        course_id: String,
        #[arg(long, default_value = "")]
        search: String,
    },
}

#[derive(Subcommand)]
enum QuizCommand {
    List {
        #[arg(long)]
        course: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
}

/// Prompts on the terminal unless `--yes` was given.
struct TerminalConfirm {
    assume_yes: bool,
}

impl Confirm for TerminalConfirm {
    fn confirm(&mut self, prompt: &Prompt) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{}\n{}\n{}? [y/N] ", prompt.title, prompt.message, prompt.confirm_text);
        if std::io::stdout().flush().is_err() {
            return false;
        }
        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line).is_err() {
            return false;
        }
        matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

fn read_password() -> anyhow::Result<String> {
    print!("Password: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let store = Arc::new(FileSessionStore::new(&config.session_file));
    let session = Session::hydrate(store).context("failed to read session file")?;
    let api = ApiClient::new(&config.api_url, session.clone());
    let mut confirm = TerminalConfirm { assume_yes: cli.yes };

    let tenant = || -> anyhow::Result<String> {
        match cli.tenant.clone().or_else(|| session.tenant_id()) {
            Some(t) => Ok(t),
            None => bail!("no tenant: sign in or pass --tenant"),
        }
    };

    match cli.command {
        Commands::Login { ref email, ref password } => {
            let password = match password {
                Some(p) => p.clone(),
                None => read_password()?,
            };
            let user = AuthClient::new(api).login(email, &password).await?;
            println!("signed in as {} ({}), home {}", user.email, user.role, user.role.home_route());
        }
        Commands::Logout => {
            AuthClient::new(api).logout();
            println!("signed out");
        }
        Commands::Whoami => match session.user() {
            Some(user) => {
                println!("{} <{}>", user.full_name.as_deref().unwrap_or("-"), user.email);
                println!("role:   {}", user.role);
                println!("tenant: {}", session.tenant_id().as_deref().unwrap_or("-"));
            }
            None => println!("not signed in"),
        },
        Commands::Template { ref out } => {
            tokio::fs::write(out, bulk_upload::TEMPLATE)
                .await
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("wrote {}", out.display());
        }
        Commands::Course { ref command } => {
            let tenant_id = tenant()?;
            run_course(command, CourseClient::new(api), tenant_id, &mut confirm).await?;
        }
        Commands::Quiz {
            command: QuizCommand::List { ref course, ref search },
        } => {
            let params = QuizListParams {
                tenant_id: Some(tenant()?),
                teacher_id: session.user().and_then(|u| u.teacher_id),
                course_id: course.clone(),
                search: search.clone(),
                ..Default::default()
            };
            let now = chrono::Utc::now();
            for quiz in QuizClient::new(api).list(&params).await? {
                println!(
                    "{}  #{}  {:<24}  due {}  {:?}",
                    quiz.id,
                    quiz.display_number(),
                    quiz.course_name,
                    quiz.due_date.format("%Y-%m-%d"),
                    quiz.effective_status(now),
                );
            }
        }
    }
    Ok(())
}

async fn run_course(
    command: &CourseCommand,
    client: CourseClient,
    tenant_id: String,
    confirm: &mut TerminalConfirm,
) -> anyhow::Result<()> {
    let course_id = match command {
        CourseCommand::Show { course_id }
        | CourseCommand::Publish { course_id }
        | CourseCommand::Unpublish { course_id }
        | CourseCommand::ReorderModules { course_id, .. }
        | CourseCommand::ImportCsv { course_id, .. }
        | CourseCommand::Students { course_id, .. } => course_id.clone(),
    };
    let mut builder = CourseBuilder::new(client, course_id, tenant_id);
    builder.load().await?;

    match command {
        CourseCommand::Show { .. } => {
            if let Some(course) = builder.course() {
                println!("{} [{}] {}", course.title, course.status, course.course_code.as_deref().unwrap_or(""));
                println!("{} lessons, {}", course.total_lessons, course.total_duration);
                for m in &course.modules {
                    println!("{:>3}. {} ({})", m.order, m.title, m.id);
                    for l in &m.lessons {
                        println!("     {:>3}. [{}] {} {}", l.order, l.kind, l.title, l.duration.as_deref().unwrap_or(""));
                    }
                }
            }
        }
        CourseCommand::Publish { .. } => report(builder.set_published(true, confirm).await?, "published"),
        CourseCommand::Unpublish { .. } => report(builder.set_published(false, confirm).await?, "unpublished"),
        CourseCommand::ReorderModules { module_ids, .. } => {
            report(builder.reorder_modules(module_ids).await?, "modules reordered")
        }
        CourseCommand::ImportCsv { file, .. } => {
            let csv = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let count = builder.import_csv(&csv).await?;
            println!("imported {count} module(s)");
        }
        CourseCommand::Students { search, .. } => {
            builder.load_students().await;
            for s in builder.filtered_students(search) {
                println!("{}  {:<24} {:<32} {:>5.1}%", s.id, s.full_name, s.email, s.progress);
            }
        }
    }
    Ok(())
}

fn report(changed: bool, what: &str) {
    if changed {
        println!("{what}");
    } else {
        println!("nothing changed");
    }
}
