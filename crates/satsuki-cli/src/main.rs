use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use clap::builder::FalseyValueParser;

use satsuki::config::SatsukiConfig;
use satsuki::engine::{ExecutionReport, Executor, Reporter};
use satsuki::environment::{CiEnvironment, platform};
use satsuki::input::Inputs;
use satsuki::resolver::{ResolveContext, prepare, resolve};
use satsuki_git::Git;
use satsuki_github::{DEFAULT_API_URL, GitHubClient};
use satsuki_retry::ThreadSleeper;

#[derive(Parser, Debug)]
#[command(name = "satsuki", version)]
#[command(about = "Upsert or delete GitHub releases and release assets from CI")]
struct Cli {
    /// GitHub API token with repo scope
    #[arg(long, env = "SATS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// upsert (create or update the release, then upload) or delete
    #[arg(short, long, env = "SATS_COMMAND")]
    command: Option<String>,

    /// Delete and recreate the release when the tag points at another commit
    #[arg(long, env = "SATS_RECREATE_OK", value_parser = FalseyValueParser::new())]
    recreate_ok: bool,

    /// Repository slug (owner/name); takes precedence over --user and --repo
    #[arg(short, long, env = "SATS_SLUG")]
    slug: Option<String>,

    /// Repository name
    #[arg(short, long, env = "SATS_REPO")]
    repo: Option<String>,

    /// Repository owner
    #[arg(short, long, env = "SATS_USER")]
    user: Option<String>,

    /// Release title
    #[arg(short = 'n', long, env = "SATS_REL_NAME")]
    rel_name: Option<String>,

    /// Work on the latest release instead of a tag; ignored when a tag is given
    #[arg(long)]
    latest: bool,

    /// Release description
    #[arg(short, long, env = "SATS_BODY")]
    body: Option<String>,

    /// Mark the release as a prerelease
    #[arg(short, long, env = "SATS_PRE", value_parser = FalseyValueParser::new())]
    pre: bool,

    /// Mark the release as a draft
    #[arg(short, long, env = "SATS_DRAFT", value_parser = FalseyValueParser::new())]
    draft: bool,

    /// Print progress details
    #[arg(short, long, env = "SATS_VERBOSE", value_parser = FalseyValueParser::new())]
    verbose: bool,

    /// Delete releases that still exist when cleaning tags
    #[arg(long, env = "SATS_FORCE", value_parser = FalseyValueParser::new())]
    force: bool,

    /// Release tag; may contain placeholders such as $version
    #[arg(short, long, env = "SATS_TAG")]
    tag: Option<String>,

    /// Branch or commit SHA for a new release tag
    #[arg(long, env = "SATS_COMMITISH")]
    commitish: Option<String>,

    /// Also delete the tag when deleting the release
    #[arg(long, env = "SATS_INCLUDE_TAG", value_parser = FalseyValueParser::new())]
    include_tag: bool,

    /// File or glob pattern to upload or delete (repeatable or comma-separated)
    #[arg(short, long = "file", env = "SATS_FILE", value_delimiter = ',')]
    files: Vec<String>,

    /// Asset label: one for all files or one per file (repeatable; SATS_LABEL holds a single label)
    #[arg(short, long = "label", env = "SATS_LABEL")]
    labels: Vec<String>,

    /// MIME type: one for all files or one per file (repeatable or comma-separated)
    #[arg(short, long = "mime", env = "SATS_MIME", value_delimiter = ',')]
    mimes: Vec<String>,

    /// Publish SHA-256 hashes: none, file or label
    #[arg(long, env = "SATS_FILE_SHA")]
    file_sha: Option<String>,

    /// JSON manifest listing files with their labels and MIME types
    #[arg(long, env = "SATS_FILES_FILE")]
    files_file: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "SATS_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Config file (default: .satsuki.toml in the working directory)
    #[arg(long, env = "SATS_CONFIG")]
    config: Option<PathBuf>,

    /// Directory that relative paths are resolved against
    #[arg(long)]
    working_dir: Option<PathBuf>,

    /// Print the execution report as JSON
    #[arg(long)]
    json: bool,
}

struct CliReporter {
    verbose: bool,
}

impl Reporter for CliReporter {
    fn info(&mut self, msg: &str) {
        if self.verbose {
            eprintln!("[info] {msg}");
        }
    }

    fn warn(&mut self, msg: &str) {
        eprintln!("[warn] {msg}");
    }

    fn error(&mut self, msg: &str) {
        eprintln!("[error] {msg}");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut reporter = CliReporter {
        verbose: cli.verbose,
    };

    eprintln!("satsuki {}", env!("CARGO_PKG_VERSION"));

    match run(cli, &mut reporter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let category = err
                .downcast_ref::<satsuki::Error>()
                .map_or("error", |e| e.category().as_str());
            reporter.error(&format!("{category}: {err:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, reporter: &mut dyn Reporter) -> Result<()> {
    let working_dir = match cli.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to determine working directory")?,
    };

    let config = load_config(cli.config.as_deref(), &working_dir)?;
    let env = CiEnvironment::from_process();
    let ctx = ResolveContext {
        env: &env,
        files: &config.files,
        platform: platform(),
    };

    let api_url = cli.api_url.clone();
    let json = cli.json;
    let request = prepare(inputs(cli, working_dir.clone()), &ctx, reporter)?;

    let client = GitHubClient::with_timeout(&api_url, &request.token, config.github.timeout)
        .map_err(satsuki::Error::from)?
        .with_upload_timeout(config.github.upload_timeout);
    let op = resolve(request, &client, reporter)?;

    let git = Git::new(&working_dir, &config.git.remote);
    let mut sleeper = ThreadSleeper;
    let report = Executor::new(&client, &git, &mut sleeper, config.retry.clone())
        .execute(op, reporter)?;

    print_report(&report, json)?;
    Ok(())
}

fn load_config(path: Option<&Path>, working_dir: &Path) -> Result<SatsukiConfig> {
    let config = match path {
        Some(path) => SatsukiConfig::load_from_file(path)?,
        None => SatsukiConfig::load_from_dir(working_dir)?.unwrap_or_default(),
    };
    Ok(config)
}

fn inputs(cli: Cli, working_dir: PathBuf) -> Inputs {
    Inputs {
        token: cli.token,
        slug: cli.slug,
        owner: cli.user,
        repo: cli.repo,
        tag: cli.tag,
        latest: cli.latest,
        command: cli.command,
        rel_name: cli.rel_name,
        body: cli.body,
        prerelease: cli.pre.then_some(true),
        draft: cli.draft.then_some(true),
        commitish: cli.commitish,
        recreate_ok: cli.recreate_ok,
        force: cli.force,
        include_tag: cli.include_tag,
        files: cli.files,
        labels: cli.labels,
        mimes: cli.mimes,
        files_file: cli.files_file,
        file_sha: cli.file_sha,
        working_dir: Some(working_dir),
    }
}

fn print_report(report: &ExecutionReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("command: {}", report.command);
    if let Some(tag) = &report.tag {
        println!("tag: {tag}");
    }
    if let Some(url) = &report.release_url
        && !report.release_deleted
    {
        println!("release: {url}");
    }
    if report.release_deleted {
        println!("release deleted");
    }
    for asset in &report.uploaded {
        println!(
            "uploaded: {} ({} bytes, {} attempt(s))",
            asset.name, asset.size, asset.attempts
        );
    }
    for name in &report.deleted_assets {
        println!("deleted asset: {name}");
    }
    for tag in &report.deleted_tags {
        println!("deleted tag: {tag}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_map_onto_inputs() {
        let cli = Cli::try_parse_from([
            "satsuki", "--token", "t", "-s", "octo/app", "-t", "v1", "-p", "-f", "a.zip", "-f",
            "b.zip", "-l", "Build", "--file-sha", "label",
        ])
        .expect("parse");

        let inputs = inputs(cli, PathBuf::from("/work"));
        assert_eq!(inputs.token.as_deref(), Some("t"));
        assert_eq!(inputs.slug.as_deref(), Some("octo/app"));
        assert_eq!(inputs.tag.as_deref(), Some("v1"));
        assert_eq!(inputs.prerelease, Some(true));
        assert_eq!(inputs.draft, None);
        assert_eq!(inputs.files, vec!["a.zip", "b.zip"]);
        assert_eq!(inputs.labels, vec!["Build"]);
        assert_eq!(inputs.file_sha.as_deref(), Some("label"));
        assert_eq!(inputs.working_dir, Some(PathBuf::from("/work")));
    }

    #[test]
    fn files_and_mimes_accept_comma_lists() {
        let cli = Cli::try_parse_from([
            "satsuki", "-f", "a.zip,b.zip", "-f", "c.zip", "-m", "application/zip,text/plain",
            "-l", "Build 1, linux",
        ])
        .expect("parse");

        let inputs = inputs(cli, PathBuf::from("."));
        assert_eq!(inputs.files, vec!["a.zip", "b.zip", "c.zip"]);
        assert_eq!(inputs.mimes, vec!["application/zip", "text/plain"]);
        assert_eq!(inputs.labels, vec!["Build 1, linux"]);
    }

    #[test]
    fn user_and_repo_short_flags() {
        let cli = Cli::try_parse_from(["satsuki", "-u", "octo", "-r", "app"]).expect("parse");
        let inputs = inputs(cli, PathBuf::from("."));
        assert_eq!(inputs.owner.as_deref(), Some("octo"));
        assert_eq!(inputs.repo.as_deref(), Some("app"));
    }
}
