use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use log::info;
use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::handlers::PollService;
use crate::models::VotingMethod;
use crate::tasks::poll_ender;

/// Anonymous polls with slider, ranked, single-choice and veto voting.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// If passed as an argument, will turn on debug logging.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a new poll
    Create {
        /// The poll question
        #[clap(long, value_parser)]
        title: String,
        /// Comma-separated list of options
        #[clap(long, value_parser)]
        options: String,
        /// (default slider) Voting method: slider, ranked, single or veto
        #[clap(long, value_parser, default_value = "slider")]
        method: String,
        /// Only reveal the winner once the poll ends, not the scores
        #[clap(long, takes_value = false)]
        hide_scores: bool,
        /// (optional) Minutes until the poll ends by itself
        #[clap(long, value_parser)]
        duration_minutes: Option<i64>,
    },
    /// Cast a ballot: one number per option, in option order
    #[clap(allow_negative_numbers = true)]
    Vote {
        #[clap(value_parser)]
        poll_id: String,
        #[clap(value_parser, required = true, allow_hyphen_values = true)]
        values: Vec<f64>,
    },
    /// Show a poll, with its scores once it has ended
    Show {
        #[clap(value_parser)]
        poll_id: String,
    },
    /// End an active poll and announce the winner
    End {
        #[clap(value_parser)]
        poll_id: String,
    },
    /// Keep running and end polls when their deadline passes
    Watch,
}

/// Splits a comma-separated option list the way it is typed on the command line.
pub fn parse_options(raw: &str) -> Vec<String> {
    raw.split(',').map(|s| s.trim().to_string()).collect()
}

pub async fn run(command: Command, config: &Config) -> Result<()> {
    let database = Arc::new(Database::new(config).await?);
    let service = Arc::new(PollService::new(database));

    match command {
        Command::Create {
            title,
            options,
            method,
            hide_scores,
            duration_minutes,
        } => {
            let method = method.parse::<VotingMethod>()?;
            let ends_at = duration_minutes
                .filter(|mins| *mins > 0)
                .map(|mins| Utc::now() + Duration::minutes(mins));
            let poll = service
                .create_poll(&title, parse_options(&options), method, hide_scores, ends_at)
                .await?;
            println!("{}", serde_json::to_string_pretty(&poll.view())?);
        }
        Command::Vote { poll_id, values } => {
            service.submit_ballot(&poll_id, values).await?;
            println!("Your vote has been recorded.");
        }
        Command::Show { poll_id } => {
            let view = service.query_poll(&poll_id).await?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Command::End { poll_id } => {
            let results = service.close_poll(&poll_id).await?;
            let view = service.query_poll(&poll_id).await?;
            if view.hide_scores {
                println!("Winner: **{}**", results.winner);
            } else {
                println!("{}", results.summary);
            }
        }
        Command::Watch => {
            info!("Watching for expired polls in {}", config.database_url);
            poll_ender::check_expired_polls_task(service, config.check_interval).await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_split_and_trimmed() {
        assert_eq!(parse_options("Pizza, Sushi ,Tacos"), vec!["Pizza", "Sushi", "Tacos"]);
    }

    #[test]
    fn vote_accepts_negative_ratings() {
        let cli = Cli::try_parse_from(["trusty-poll", "vote", "abc", "-1", "0.5"]).unwrap();
        match cli.command {
            Command::Vote { poll_id, values } => {
                assert_eq!(poll_id, "abc");
                assert_eq!(values, vec![-1.0, 0.5]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn create_defaults_to_slider() {
        let cli = Cli::try_parse_from([
            "trusty-poll",
            "create",
            "--title",
            "Lunch",
            "--options",
            "Pizza,Sushi",
        ])
        .unwrap();
        match cli.command {
            Command::Create { method, hide_scores, duration_minutes, .. } => {
                assert_eq!(method, "slider");
                assert!(!hide_scores);
                assert_eq!(duration_minutes, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
