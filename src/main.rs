use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Arg, ArgMatches, Command};
use colored::Colorize;
use dotenv::dotenv;

use review::model::Model;
use review::{config, error, provider, report, reviewer};

fn cli() -> Command {
  Command::new("review-ai")
    .about("Reviews a GitHub or GitLab merge request with an LLM and writes a Markdown report")
    .arg_required_else_help(true)
    .args_conflicts_with_subcommands(true)
    .arg(Arg::new("merge_request_url").help("URL of the merge request to review"))
    .arg(
      Arg::new("output")
        .short('o')
        .long("output")
        .value_name("DIR")
        .help("Directory to write the report file (default: ./outputs)")
    )
    .subcommand(
      Command::new("config")
        .about("Set or reset configuration options")
        .subcommand_required(true)
        .subcommand(
          Command::new("set")
            .about("Set a configuration option")
            .arg(Arg::new("key").required(true))
            .arg(Arg::new("value").required(true))
        )
        .subcommand(Command::new("reset").about("Reset the configuration file to defaults"))
    )
}

fn run_config(args: &ArgMatches) -> Result<()> {
  match args.subcommand() {
    Some(("set", set_args)) => {
      let key: &String = set_args.get_one("key").expect("key is required");
      let value: &String = set_args.get_one("value").expect("value is required");
      let mut app = config::App::new()?;

      match key.as_str() {
        "model" => app.update_model(value.clone()),
        "openai-api-key" => app.update_openai_api_key(value.clone()),
        "github-api-key" => app.update_github_api_key(value.clone()),
        "gitlab-api-key" => app.update_gitlab_api_key(value.clone()),
        _ => bail!("Unknown configuration option: {key}")
      }
    }
    Some(("reset", _)) => config::App::default().save(),
    _ => unreachable!()
  }
}

async fn run_review(args: &ArgMatches) -> Result<()> {
  let url: &String = args
    .get_one("merge_request_url")
    .context("A merge request URL is required")?;

  log::info!("Starting merge request analysis...");
  log::info!("URL: {url}");

  let model = Model::from(config::APP.model.clone().unwrap_or_default());
  log::info!("AI configured: model={model}");

  if !model.is_local() && config::APP.openai_api_key.is_none() {
    bail!(
      "{} No API key configured for model {}.\n    Run: {}",
      "ERROR:".bold().bright_red(),
      model,
      "review-ai config set openai-api-key <your-key>".yellow()
    );
  }

  let provider = provider::detect(url)?;
  log::info!("Provider detected: {}", provider.name());

  log::info!("Fetching merge request data...");
  let mr = provider
    .fetch_merge_request(url)
    .await
    .context("Failed to fetch merge request data")?;
  log::info!("Data received: '{}'", mr.title);
  log::info!("Author: {}", mr.author.name);

  log::info!("Starting AI analysis...");
  let llm = reviewer::create(model);
  log::info!("Reviewer: {}", llm.name());

  let review = reviewer::review(llm.as_ref(), &mr).await.inspect_err(|err| {
    if error::is_auth_error(err) {
      log::error!("Terminating: AI reviewer unavailable");
    }
  })?;

  log::info!("Building report...");
  let rendered = report::render(&mr, &review);

  log::info!("Saving report...");
  let out_dir = args
    .get_one::<String>("output")
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from("outputs"));
  std::fs::create_dir_all(&out_dir).with_context(|| format!("Failed to create output directory at {out_dir:?}"))?;

  let filename = format!("review-{}.md", Utc::now().format("%Y%m%d-%H%M%S-UTC"));
  let out_path = out_dir.join(filename);
  std::fs::write(&out_path, rendered).with_context(|| format!("Failed to write report to {out_path:?}"))?;
  log::info!("Report saved: {}", out_path.display());

  let (prompt_tokens, completion_tokens) = reviewer::openai::usage();
  if prompt_tokens + completion_tokens > 0 {
    log::info!(
      "Token usage: input {prompt_tokens}, output {completion_tokens}, total {}",
      prompt_tokens + completion_tokens
    );
  }

  log::info!("Analysis completed!");
  Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
  dotenv().ok();
  env_logger::init();

  let args = cli().get_matches();

  match args.subcommand() {
    Some(("config", config_args)) => run_config(config_args),
    _ => run_review(&args).await
  }
}
