use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quickcode_core::config::{conflict_rules_path_from_env_value, CONFLICT_RULES_VAR};
use quickcode_core::{
    AnalysisOutcome, CheckOutcome, CodeSuggestion, ConflictRuleSet, CoreConfig, LogExportSink,
    ReviewDecision, ReviewSession,
};

#[derive(Parser)]
#[command(name = "quickcode")]
#[command(about = "QuickCode medical coding assistant CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a clinical note and print the suggested codes
    Analyze {
        /// Note file, or `-` for stdin
        input: String,
    },
    /// Analyse a note, apply review decisions, then optionally check and export
    Review {
        /// Note file, or `-` for stdin
        input: String,
        /// Code to accept (repeatable)
        #[arg(long = "accept", value_name = "CODE")]
        accept: Vec<String>,
        /// Code to reject (repeatable)
        #[arg(long = "reject", value_name = "CODE")]
        reject: Vec<String>,
        /// Run the billing-conflict check over the accepted codes
        #[arg(long)]
        check: bool,
        /// Export the accepted codes to the billing queue log
        #[arg(long)]
        export: bool,
    },
    /// Show the conflict rule table, or validate a YAML rule file
    Rules {
        /// Rule file to load instead of the configured table
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quickcode_core=warn".parse()?)
                .add_directive("quickcode=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Analyze { input }) => {
            let session = build_session()?;
            let note = read_note(&input)?;
            run_analysis(&session, &note).await?;
            print_codes(&session.snapshot().codes);
        }
        Some(Commands::Review {
            input,
            accept,
            reject,
            check,
            export,
        }) => {
            let session = build_session()?;
            let note = read_note(&input)?;
            run_analysis(&session, &note).await?;

            for code in &accept {
                session
                    .set_status(code, ReviewDecision::Accept)
                    .with_context(|| format!("cannot accept {code}"))?;
            }
            for code in &reject {
                session
                    .set_status(code, ReviewDecision::Reject)
                    .with_context(|| format!("cannot reject {code}"))?;
            }
            print_codes(&session.snapshot().codes);

            if check {
                match session.check_conflicts().await {
                    CheckOutcome::Applied(outcome) => {
                        println!("\nConflict check: {}", outcome.message());
                    }
                    CheckOutcome::Stale => {
                        println!("\nConflict check superseded by a later change.");
                    }
                }
            }

            if export {
                let receipt = session.export(&LogExportSink)?;
                tracing::info!(
                    session = %session.id(),
                    receipt = %receipt.id,
                    "accepted codes handed to billing queue"
                );
                println!("\n{}", serde_json::to_string_pretty(&receipt)?);
            }
        }
        Some(Commands::Rules { file }) => {
            let rules = active_rules(file, std::env::var(CONFLICT_RULES_VAR).ok())?;
            if rules.is_empty() {
                println!("No conflict rules configured.");
            } else {
                println!("{} conflict rule(s):", rules.len());
                for (i, rule) in rules.rules().iter().enumerate() {
                    println!("  {}. {}", i + 1, rule.reason());
                }
            }
        }
        None => {
            println!("Use --help for usage");
        }
    }

    Ok(())
}

fn build_session() -> anyhow::Result<ReviewSession> {
    let cfg = CoreConfig::from_env().context("invalid QuickCode configuration")?;
    let gateway = quickcode_core::gemini_gateway(&cfg)?;
    let checker = quickcode_core::configured_checker(&cfg)?;
    Ok(ReviewSession::new(gateway, checker))
}

/// Rule table for `quickcode rules`: `--file` first, then the configured rule file, then the
/// seed table. Does not need the provider key.
fn active_rules(
    file: Option<PathBuf>,
    env_value: Option<String>,
) -> anyhow::Result<ConflictRuleSet> {
    let path = file.or_else(|| conflict_rules_path_from_env_value(env_value));
    quickcode_core::load_conflict_rules(path.as_deref()).with_context(|| match &path {
        Some(path) => format!("invalid rule file {}", path.display()),
        None => "invalid seed rule table".to_string(),
    })
}

async fn run_analysis(session: &ReviewSession, note: &str) -> anyhow::Result<()> {
    match session.start_analysis(note).await {
        Ok(AnalysisOutcome::Applied { .. }) => {
            let snapshot = session.snapshot();
            println!("Summary: {}", snapshot.summary);
            Ok(())
        }
        Ok(AnalysisOutcome::Superseded) => anyhow::bail!("analysis was superseded"),
        Err(err) => {
            let message = session.snapshot().error.unwrap_or_else(|| err.to_string());
            Err(anyhow::Error::new(err).context(message))
        }
    }
}

/// Read the note from `source`, where `-` means stdin.
fn read_note(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut note = String::new();
        std::io::stdin()
            .read_to_string(&mut note)
            .context("failed to read note from stdin")?;
        Ok(note)
    } else {
        let path = Path::new(source);
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read note from {}", path.display()))
    }
}

fn print_codes(codes: &[CodeSuggestion]) {
    if codes.is_empty() {
        println!("No codes suggested.");
        return;
    }
    for c in codes {
        println!(
            "{:<10} {:<7} {:>4.0}% {:<6} [{}] {}",
            c.code,
            c.code_type.label(),
            c.confidence * 100.0,
            c.confidence_band().to_string(),
            c.status.to_string(),
            c.description
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_flags_are_repeatable() {
        let cli = Cli::try_parse_from([
            "quickcode", "review", "note.txt", "--accept", "E11.9", "--accept", "99214",
            "--reject", "I10", "--check",
        ])
        .expect("parse");

        match cli.command {
            Some(Commands::Review {
                input,
                accept,
                reject,
                check,
                export,
            }) => {
                assert_eq!(input, "note.txt");
                assert_eq!(accept, ["E11.9", "99214"]);
                assert_eq!(reject, ["I10"]);
                assert!(check);
                assert!(!export);
            }
            _ => panic!("expected review command"),
        }
    }

    #[test]
    fn analyze_accepts_stdin_marker() {
        let cli = Cli::try_parse_from(["quickcode", "analyze", "-"]).expect("parse");
        assert!(matches!(cli.command, Some(Commands::Analyze { input }) if input == "-"));
    }

    #[test]
    fn rules_default_to_seed_table() {
        let rules = active_rules(None, None).expect("seed rules");
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules.rules()[0].reason(),
            quickcode_core::constants::SEED_RULE_REASON
        );

        let blank = active_rules(None, Some("  ".into())).expect("blank env falls back to seed");
        assert_eq!(blank.len(), 1);
    }

    #[test]
    fn rules_file_flag_wins_over_environment() {
        let err = active_rules(
            Some(PathBuf::from("/definitely/not/flag.yaml")),
            Some("/definitely/not/env.yaml".into()),
        )
        .expect_err("missing file should fail");
        assert!(err.to_string().contains("flag.yaml"));

        let err = active_rules(None, Some("/definitely/not/env.yaml".into()))
            .expect_err("missing file should fail");
        assert!(err.to_string().contains("env.yaml"));
    }

    #[test]
    fn missing_note_file_is_reported() {
        let err = read_note("/definitely/not/here.txt").expect_err("should fail");
        assert!(err.to_string().contains("failed to read note"));
    }
}
