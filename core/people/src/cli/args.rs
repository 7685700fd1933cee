//! コマンドライン引数（clap derive）

use clap::{Parser, Subcommand};
use common::error::Error;
use people::domain::{CardId, CardPatch, PersonId};

#[derive(Debug, Parser)]
#[command(name = "people")]
#[command(about = "Search people and manage your experience cards")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Run a search (consumes credits)
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Only people who are open to work
        #[arg(long)]
        open_to_work: bool,
        /// Number of pages to fetch
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Show the credit balance
    Credits,
    /// List your card families
    Families,
    /// Structure free text into draft card families
    Draft {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        /// Approve every draft right away
        #[arg(long)]
        approve_all: bool,
    },
    /// Approve draft cards
    Approve {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },
    /// Edit a parent card
    PatchCard {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Delete a parent card and its children
    DeleteCard { id: String },
    /// Delete a child card
    DeleteChild { id: String },
    /// Hide a parent card from search
    HideCard { id: String },
    /// Unlock a person's contact details (consumes credits)
    Unlock { person: String },
    /// Open a person's profile
    Profile { person: String },
    /// List recent searches
    Searches,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Search { .. } => "search",
            Self::Credits => "credits",
            Self::Families => "families",
            Self::Draft { .. } => "draft",
            Self::Approve { .. } => "approve",
            Self::PatchCard { .. } => "patch-card",
            Self::DeleteCard { .. } => "delete-card",
            Self::DeleteChild { .. } => "delete-child",
            Self::HideCard { .. } => "hide-card",
            Self::Unlock { .. } => "unlock",
            Self::Profile { .. } => "profile",
            Self::Searches => "searches",
        }
    }
}

/// `patch-card` のフラグから CardPatch を作る（何も指定が無ければエラー）
pub fn patch_from_flags(
    title: Option<String>,
    start: Option<String>,
    end: Option<String>,
) -> Result<CardPatch, Error> {
    let patch = CardPatch {
        title,
        start_date: start,
        end_date: end,
        ..Default::default()
    };
    if patch.is_empty() {
        return Err(Error::invalid_argument(
            "patch-card needs at least one of --title, --start, --end",
        ));
    }
    Ok(patch)
}

pub fn card_id(s: &str) -> CardId {
    CardId::new(s.trim())
}

pub fn person_id(s: &str) -> PersonId {
    PersonId::new(s.trim())
}
