//! CLI for cdk-devops.
//!
//! `setup-repo` onboards a new repository into the Azure DevOps project.
//! `pr-comment` posts pipeline results onto the triggering pull request and
//! `env` inspects the per-environment deployment configuration.

use cdk_devops::pull_requests::tag_body;
use cdk_devops::{
    logging, CommentError, CommentId, CommentPoster, CommentRenderer, Credential, DevOpsClient,
    EnvironmentConfig, EnvironmentLoader, ProjectSettings, PullRequestComment,
    PullRequestContext, RepoSetup, ReportSummary, ResultPublisher, SetupRequest, SetupResult,
    StepOutcome,
};
use clap::{Parser, Subcommand};
use std::fmt::Display;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// A setup step or comment could not be completed.
const EXIT_FAILURE: u8 = 1;

/// Configuration, credentials or logging are unusable.
const EXIT_CRITICAL: u8 = 2;

/// cdk-devops - Onboard CDK repositories into Azure DevOps and report CI results on pull requests.
#[derive(Parser, Debug)]
#[command(name = "cdk-devops", author, version, about, long_about = None)]
struct Args {
    /// Also write log output to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a repository with pipelines, branch policies and a pre-commit hook.
    SetupRepo(SetupArgs),

    /// Post pipeline results on the pull request being built.
    PrComment {
        #[command(subcommand)]
        action: CommentAction,
    },

    /// Inspect environment configuration files.
    Env {
        /// Directory holding `<environment>.json` files.
        #[arg(long, global = true, default_value = "config")]
        config_dir: PathBuf,

        #[command(subcommand)]
        action: EnvAction,
    },
}

#[derive(clap::Args, Debug)]
struct SetupArgs {
    /// Azure DevOps Personal Access Token.
    #[arg(
        long = "pat",
        visible_alias = "azure-access-token",
        env = "AZURE_DEVOPS_EXT_PAT",
        hide_env_values = true
    )]
    pat: String,

    /// Name of the repository to create.
    #[arg(long = "rn", visible_alias = "repository-name")]
    repo_name: String,

    /// Path to the project settings file.
    #[arg(long, default_value = "devops.toml")]
    settings: PathBuf,

    /// Git work tree to push and install the hook into.
    #[arg(long, default_value = ".")]
    workdir: PathBuf,
}

#[derive(clap::Args, Debug)]
struct PullRequestArgs {
    /// Pull request to comment on.
    #[arg(long, env = "SYSTEM_PULLREQUEST_PULLREQUESTID")]
    pr_id: u64,
}

#[derive(Subcommand, Debug)]
enum CommentAction {
    /// Post the `cdk diff` output.
    Diff {
        /// File the diff output was written to.
        #[arg(long, default_value = "./output.log")]
        output_file: PathBuf,

        #[command(flatten)]
        pr: PullRequestArgs,
    },

    /// Post each CSV validation report as a table.
    Reports {
        /// Directory holding the synthesized templates and reports.
        #[arg(long, default_value = "./synth/templates/")]
        templates_dir: PathBuf,

        #[command(flatten)]
        pr: PullRequestArgs,
    },

    /// Upload the architecture diagram and link it.
    Diagram {
        /// Diagram image produced by cdk-graph.
        #[arg(long, default_value = "./cdk.out/cdkgraph/diagram.png")]
        diagram: PathBuf,

        #[command(flatten)]
        pr: PullRequestArgs,
    },

    /// Post an arbitrary comment.
    Post {
        /// Tag identifying the thread; posting again with it updates the thread.
        #[arg(long, required_unless_present = "thread_id")]
        tag: Option<String>,

        /// Reply into this thread instead of a tagged thread.
        #[arg(long, conflicts_with = "tag")]
        thread_id: Option<u64>,

        /// Comment body.
        #[arg(long, required_unless_present = "body_file", conflicts_with = "body_file")]
        body: Option<String>,

        /// File holding the comment body.
        #[arg(long)]
        body_file: Option<PathBuf>,

        #[command(flatten)]
        pr: PullRequestArgs,
    },
}

#[derive(Subcommand, Debug)]
enum EnvAction {
    /// Show the configuration of one environment.
    Show {
        /// Environment name, e.g. `dev`.
        name: String,
    },

    /// List every configured environment.
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Explicitly select aws-lc-rs; an already installed provider is fine.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    if let Err(e) = logging::init_from_env(args.log_file.clone()) {
        eprintln!("Failed to initialise logging: {e}");
        return ExitCode::from(EXIT_CRITICAL);
    }

    match args.command {
        Command::SetupRepo(setup) => setup_repo(setup).await,
        Command::PrComment { action } => pr_comment(action).await,
        Command::Env { config_dir, action } => env(config_dir, action),
    }
}

/// Logs `error` and returns `code`.
fn fail(code: u8, error: &dyn Display, message: &str) -> ExitCode {
    error!(error = %error, "{message}");
    ExitCode::from(code)
}

async fn setup_repo(args: SetupArgs) -> ExitCode {
    let settings = match ProjectSettings::load(&args.settings) {
        Ok(settings) => settings,
        Err(e) => return fail(EXIT_CRITICAL, &e, "Failed to load project settings"),
    };
    let client = match DevOpsClient::new(Credential::Basic(args.pat.clone())) {
        Ok(client) => client,
        Err(e) => return fail(EXIT_CRITICAL, &e, "Failed to create Azure DevOps client"),
    };
    let setup = match RepoSetup::new(client, settings) {
        Ok(setup) => setup,
        Err(e) => return fail(EXIT_CRITICAL, &e, "Invalid project settings"),
    };

    let request = SetupRequest::new(args.pat, args.repo_name).with_workdir(args.workdir);
    match setup.setup_repo(&request).await {
        Ok(result) => {
            print_setup_summary(&request.repo_name, &result);
            ExitCode::SUCCESS
        }
        Err(e) => fail(EXIT_FAILURE, &e, "Repository setup failed"),
    }
}

async fn pr_comment(action: CommentAction) -> ExitCode {
    let context = match PullRequestContext::from_env() {
        Ok(context) => context,
        Err(e) => return fail(EXIT_CRITICAL, &e, "Pipeline variables are missing"),
    };
    let poster = match CommentPoster::from_context(&context) {
        Ok(poster) => poster,
        Err(e) => return fail(EXIT_CRITICAL, &e, "Failed to create comment poster"),
    };
    let renderer = match CommentRenderer::new() {
        Ok(renderer) => renderer,
        Err(e) => return fail(EXIT_CRITICAL, &e, "Failed to load comment templates"),
    };
    let publisher =
        ResultPublisher::new(poster, renderer).with_commit_prefix(context.commit_prefix());

    match action {
        CommentAction::Diff { output_file, pr } => {
            report_comment(publisher.publish_diff(pr.pr_id, &output_file).await)
        }
        CommentAction::Reports { templates_dir, pr } => {
            match publisher
                .publish_validation_reports(pr.pr_id, &templates_dir)
                .await
            {
                Ok(summary) => {
                    print_report_summary(&summary);
                    if summary.has_failures() {
                        ExitCode::from(EXIT_FAILURE)
                    } else {
                        ExitCode::SUCCESS
                    }
                }
                Err(e) => fail(EXIT_FAILURE, &e, "Failed to post validation reports"),
            }
        }
        CommentAction::Diagram { diagram, pr } => {
            report_comment(publisher.publish_diagram(pr.pr_id, &diagram).await)
        }
        CommentAction::Post {
            tag,
            thread_id,
            body,
            body_file,
            pr,
        } => {
            let body = match (body, body_file) {
                (Some(body), _) => body,
                (None, Some(path)) => match tokio::fs::read_to_string(&path).await {
                    Ok(body) => body,
                    Err(e) => return fail(EXIT_FAILURE, &e, "Failed to read comment body"),
                },
                (None, None) => {
                    error!("No comment body given");
                    return ExitCode::from(EXIT_CRITICAL);
                }
            };

            let comment = match (tag, thread_id) {
                (_, Some(thread_id)) => PullRequestComment::new(pr.pr_id, body).in_thread(thread_id),
                (Some(tag), None) => PullRequestComment::new(pr.pr_id, tag_body(&tag, &body)),
                (None, None) => PullRequestComment::new(pr.pr_id, body),
            };
            report_comment(publisher.poster().submit(&comment).await)
        }
    }
}

fn report_comment(result: Result<CommentId, CommentError>) -> ExitCode {
    match result {
        Ok(id) => {
            info!(thread_id = id.thread_id, comment_id = id.comment_id, "Comment posted");
            println!("Comment posted: thread {}, comment {}", id.thread_id, id.comment_id);
            ExitCode::SUCCESS
        }
        Err(e) => fail(EXIT_FAILURE, &e, "Failed to post comment"),
    }
}

fn env(config_dir: PathBuf, action: EnvAction) -> ExitCode {
    let loader = EnvironmentLoader::new(config_dir);

    match action {
        EnvAction::Show { name } => match loader.load(&name) {
            Ok(config) => {
                print_environment(&name, &config);
                ExitCode::SUCCESS
            }
            Err(e) => fail(EXIT_FAILURE, &e, "Failed to load environment"),
        },
        EnvAction::List => match loader.load_all() {
            Ok(environments) => {
                println!("Environments ({}):", environments.len());
                for (name, config) in &environments {
                    println!("  {name}: account {} in {}", config.account, config.region);
                }
                ExitCode::SUCCESS
            }
            Err(e) => fail(EXIT_FAILURE, &e, "Failed to load environments"),
        },
    }
}

/// Prints the outcome of each setup step.
fn print_setup_summary(repo_name: &str, result: &SetupResult) {
    println!("\nSummary:");
    println!("  Repository: {repo_name} ({})", result.repository_id);
    for report in &result.steps {
        match &report.outcome {
            StepOutcome::Completed => println!("  {}: completed", report.step),
            StepOutcome::Skipped { reason } => {
                println!("  {}: skipped ({reason})", report.step);
            }
        }
    }
    for (stage, id) in &result.pipelines {
        println!("  Pipeline {stage}: {id}");
    }
}

fn print_report_summary(summary: &ReportSummary) {
    println!("\nSummary:");
    println!("  Reports posted: {}", summary.posted.len());
    println!("  Reports empty: {}", summary.empty.len());
    println!("  Reports failed: {}", summary.failed.len());
}

fn print_environment(name: &str, config: &EnvironmentConfig) {
    println!("Environment: {name}");
    for key in config.keys() {
        if let Some(value) = config.get_value(key) {
            let value = value.as_str().map_or_else(|| value.to_string(), str::to_string);
            println!("  {key}: {value}");
        }
    }
}
