use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use newsdesk::config::ClientConfig;
use newsdesk::onboarding::{
    AnswerOutcome, CompanyInput, HttpOnboardingApi, OnboardingApi, OnboardingController,
    StartOutcome,
};

#[derive(Parser)]
#[command(name = "newsdesk", version, about = "Onboarding client for the news curation service")]
struct Cli {
    /// Onboarding service base URL (overrides NEWSDESK_API_URL).
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Onboard a new company interactively.
    Onboard {
        /// Company name; prompted for when omitted.
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        website: Option<String>,
        #[arg(long)]
        sector: Option<String>,
    },
    /// List registered companies.
    Companies,
    /// Print the generated profile of a company.
    Profile { company_id: String },
}

type StdinLines = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the wizard.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.api_url {
        config = config.with_api_url(url);
    }
    let api = Arc::new(HttpOnboardingApi::new(&config)?);
    tracing::debug!(api_url = %api.base_url(), "Onboarding client ready");

    match cli.command {
        Command::Onboard {
            name,
            website,
            sector,
        } => onboard(api, name, website, sector).await,
        Command::Companies => {
            let companies = api.list_companies().await?;
            if companies.is_empty() {
                eprintln!("No companies registered yet.");
            }
            for company in companies {
                println!(
                    "{}\t{}\t{}",
                    company.id, company.name, company.onboarding_status
                );
            }
            Ok(())
        }
        Command::Profile { company_id } => {
            let profile = api
                .get_profile(&company_id)
                .await
                .with_context(|| format!("fetching profile for {company_id}"))?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(())
        }
    }
}

async fn prompt(lines: &mut StdinLines, label: &str) -> anyhow::Result<Option<String>> {
    eprint!("{label}");
    Ok(lines.next_line().await?)
}

async fn onboard(
    api: Arc<dyn OnboardingApi>,
    name: Option<String>,
    website: Option<String>,
    sector: Option<String>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let name = match name {
        Some(name) => name,
        None => prompt(&mut lines, "Company name: ").await?.unwrap_or_default(),
    };
    let mut input = CompanyInput::new(name);
    if let Some(website) = website {
        input = input.with_website(website);
    }
    if let Some(sector) = sector {
        input = input.with_sector(sector);
    }
    if !input.is_valid() {
        bail!("company name must not be empty");
    }

    let controller = OnboardingController::new(api);
    let mut question = match controller.start(input).await {
        StartOutcome::Started(question) => question,
        StartOutcome::Failed(message) => bail!("could not start onboarding: {message}"),
        StartOutcome::Skipped => bail!("onboarding already started"),
    };

    loop {
        println!("\n[{}] {}", question.order_index, question.content);

        let answer = loop {
            match prompt(&mut lines, "> ").await? {
                None => bail!("input closed before onboarding finished"),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line.trim().to_string(),
            }
        };

        match controller.answer(&answer).await {
            AnswerOutcome::NextQuestion(next) => question = next,
            AnswerOutcome::Completed(company) => {
                println!("\nOnboarding complete for {}.", company.name);
                if let Some(profile) = &company.profile_json {
                    println!("{}", serde_json::to_string_pretty(profile)?);
                }
                return Ok(());
            }
            AnswerOutcome::AwaitingQuestions => {
                eprintln!("The service has no further questions; the profile was not generated yet.");
                return Ok(());
            }
            AnswerOutcome::Failed(message) => {
                eprintln!("Error: {message}");
                eprintln!("Please answer again.");
            }
            AnswerOutcome::Skipped => bail!("no active question to answer"),
        }
    }
}
