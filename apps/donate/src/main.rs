use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use donation_core::{
    view::PROCESSING_NOTICE, DonationController, DonationEvent, DonationSnapshot,
    HttpPaymentClient, SubmitError,
};
use shared::domain::{DonationStatus, Network, QUICK_AMOUNTS};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::{self, error::RecvError},
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;
mod effects;
mod render;

use config::load_settings;
use effects::TerminalCelebration;
use render::render;

const CLIP_LINGER: Duration = Duration::from_secs(10);
const CLIP_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "donate", about = "Send a USDC donation through a payment gateway")]
struct Args {
    /// Settings file; defaults to ./donate.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    gateway_url: Option<String>,
    #[arg(long, conflicts_with = "preset")]
    amount: Option<String>,
    /// One of 5.00, 10.00, 25.00, 50.00.
    #[arg(long)]
    preset: Option<String>,
    #[arg(long, conflicts_with = "testnet")]
    mainnet: bool,
    #[arg(long)]
    testnet: bool,
    #[arg(long)]
    interactive: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(url) = args.gateway_url.clone() {
        settings.gateway_url = url;
    }
    if args.mainnet {
        settings.network = Network::Mainnet;
    } else if args.testnet {
        settings.network = Network::Testnet;
    }

    let mut client = HttpPaymentClient::new(&settings.gateway_url)
        .with_context(|| format!("cannot use gateway url '{}'", settings.gateway_url))?;
    if let Some(api_key) = &settings.api_key {
        client = client.with_api_key(api_key.clone());
    }
    info!(
        gateway = %client.base_url(),
        network = %settings.network,
        "donate: payment gateway configured"
    );

    let mut controller = DonationController::new_with_dependencies(
        Arc::new(client),
        Arc::new(TerminalCelebration::from_settings(&settings)),
        settings.controller_options(),
    );
    controller.set_network(settings.network.is_testnet());

    if let Some(amount) = &args.amount {
        if !controller.set_amount(amount) {
            bail!("'{amount}' is not a valid amount; use digits with at most two decimal places");
        }
    }
    if let Some(preset) = &args.preset {
        if !controller.select_preset(preset) {
            bail!(
                "unknown preset '{preset}'; expected one of {}",
                QUICK_AMOUNTS.join(", ")
            );
        }
    }

    if args.interactive {
        run_interactive(controller).await
    } else {
        run_once(controller).await
    }
}

async fn run_once(mut controller: DonationController) -> Result<ExitCode> {
    print!("{}", render(&controller.snapshot()));
    let progress = tokio::spawn(print_progress(controller.subscribe_events()));

    let outcome = controller.submit().await;
    wait_for_clip(&mut controller, CLIP_LINGER).await;
    // Stops a clip that outlived the linger, then closes the event channel so
    // the progress printer drains and exits.
    controller.reset();
    drop(controller);
    let _ = progress.await;

    match outcome {
        Ok(snapshot) => {
            println!();
            print!("{}", render(&snapshot));
            Ok(exit_code_for(&snapshot))
        }
        Err(SubmitError::Validation(err)) => {
            eprintln!("{}", err.user_message());
            Ok(ExitCode::FAILURE)
        }
        Err(err) => bail!(err),
    }
}

async fn wait_for_clip(controller: &mut DonationController, limit: Duration) {
    let deadline = Instant::now() + limit;
    while controller.is_clip_playing() && Instant::now() < deadline {
        tokio::time::sleep(CLIP_POLL_INTERVAL).await;
    }
}

fn exit_code_for(snapshot: &DonationSnapshot) -> ExitCode {
    if snapshot.status == DonationStatus::Completed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn print_progress(mut events: broadcast::Receiver<DonationEvent>) {
    loop {
        match events.recv().await {
            Ok(DonationEvent::StateChanged(snapshot))
                if snapshot.status == DonationStatus::Processing =>
            {
                match &snapshot.transaction_id {
                    None => println!("{PROCESSING_NOTICE}"),
                    Some(id) => println!("Payment {id} initiated, checking status..."),
                }
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => debug!(skipped, "donate: progress events lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Amount(String),
    Preset(String),
    Network(Network),
    Donate,
    Retry,
    Reset,
    Status,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(Command::Status);
    };
    let arg = parts.next();
    if parts.next().is_some() {
        return Err(format!("too many arguments for '{verb}'"));
    }

    match (verb.to_ascii_lowercase().as_str(), arg) {
        ("amount", Some(raw)) => Ok(Command::Amount(raw.to_string())),
        // An empty amount is a legal form state.
        ("amount", None) => Ok(Command::Amount(String::new())),
        ("preset", Some(raw)) => Ok(Command::Preset(raw.trim_start_matches('$').to_string())),
        ("network", Some(raw)) => raw.parse().map(Command::Network),
        ("donate", None) => Ok(Command::Donate),
        ("retry", None) => Ok(Command::Retry),
        ("reset", None) => Ok(Command::Reset),
        ("status", None) => Ok(Command::Status),
        ("help", None) => Ok(Command::Help),
        ("quit" | "exit", None) => Ok(Command::Quit),
        ("preset" | "network", None) => Err(format!("'{verb}' needs a value")),
        _ => Err(format!("unknown command '{line}'; type 'help'")),
    }
}

fn print_help() {
    println!("commands: amount <value> | preset <5.00|10.00|25.00|50.00> | network <testnet|mainnet>");
    println!("          donate | retry | reset | status | help | quit");
}

async fn run_interactive(mut controller: DonationController) -> Result<ExitCode> {
    let progress = tokio::spawn(print_progress(controller.subscribe_events()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("{}", render(&controller.snapshot()));
    print_help();

    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match command {
            Command::Amount(raw) => {
                if !controller.set_amount(&raw) {
                    println!(
                        "'{raw}' is not a valid amount; keeping ${}",
                        controller.amount()
                    );
                }
            }
            Command::Preset(preset) => {
                if !controller.select_preset(&preset) {
                    println!("unknown preset '{preset}'");
                }
            }
            Command::Network(network) => controller.set_network(network.is_testnet()),
            Command::Donate => report_attempt(controller.submit().await),
            Command::Retry => report_attempt(controller.retry().await),
            Command::Reset => controller.reset(),
            Command::Status => {}
            Command::Help => {
                print_help();
                continue;
            }
            Command::Quit => break,
        }

        controller.sync_effects();
        print!("{}", render(&controller.snapshot()));
    }

    controller.reset();
    drop(controller);
    let _ = progress.await;
    Ok(ExitCode::SUCCESS)
}

fn report_attempt(outcome: Result<DonationSnapshot, SubmitError>) {
    match outcome {
        Ok(_) => {}
        Err(SubmitError::Validation(err)) => println!("{}", err.user_message()),
        Err(err) => println!("{err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_form_commands() {
        assert_eq!(
            parse_command("amount 12.50"),
            Ok(Command::Amount("12.50".into()))
        );
        assert_eq!(parse_command("amount"), Ok(Command::Amount(String::new())));
        assert_eq!(
            parse_command("preset $25.00"),
            Ok(Command::Preset("25.00".into()))
        );
        assert_eq!(
            parse_command("NETWORK mainnet"),
            Ok(Command::Network(Network::Mainnet))
        );
        assert_eq!(parse_command("  "), Ok(Command::Status));
        assert_eq!(parse_command("exit"), Ok(Command::Quit));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(parse_command("donate now").is_err());
        assert!(parse_command("network").is_err());
        assert!(parse_command("network devnet").is_err());
        assert!(parse_command("withdraw 5").is_err());
    }

    #[test]
    fn exit_code_reflects_terminal_status() {
        let completed = DonationSnapshot {
            status: DonationStatus::Completed,
            ..DonationSnapshot::default()
        };
        let failed = DonationSnapshot {
            status: DonationStatus::Failed,
            ..DonationSnapshot::default()
        };
        assert_eq!(
            format!("{:?}", exit_code_for(&completed)),
            format!("{:?}", ExitCode::SUCCESS)
        );
        assert_eq!(
            format!("{:?}", exit_code_for(&failed)),
            format!("{:?}", ExitCode::FAILURE)
        );
    }

    #[tokio::test]
    async fn idle_controller_has_no_clip_to_wait_for() {
        let mut controller =
            DonationController::new(Arc::new(donation_core::MissingPaymentCollaborator));
        let started = Instant::now();
        wait_for_clip(&mut controller, Duration::from_secs(5)).await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn cli_flags_parse() {
        let args = Args::try_parse_from(["donate", "--preset", "25.00", "--mainnet"])
            .expect("parse args");
        assert_eq!(args.preset.as_deref(), Some("25.00"));
        assert!(args.mainnet);

        assert!(Args::try_parse_from(["donate", "--mainnet", "--testnet"]).is_err());
        assert!(Args::try_parse_from(["donate", "--amount", "5", "--preset", "5.00"]).is_err());
    }
}
