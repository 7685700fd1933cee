mod cli;

use std::process;

use clap::Parser;
use common::error::Error;
use common::ports::outbound::{LogLevel, LogRecord};
use people::domain::{CardFamily, ExperienceCard, PersonSearchResult};
use people::usecase::search::{LoadMoreOutcome, SearchOutcome};
use people::wiring::{load_config, wire_people, App};

use cli::args::{card_id, patch_from_flags, person_id};
use cli::{Cli, Command};

/// Command をディスパッチする Runner（match は main レイヤーに集約）
struct Runner {
    app: App,
}

impl Runner {
    fn log(&self, record: LogRecord) {
        let _ = self.app.log.log(&record.layer("cli"));
    }

    fn run(&self, cmd: Command) -> Result<i32, Error> {
        let command_name = cmd.name();
        self.log(
            LogRecord::new(LogLevel::Info, "command started")
                .kind("lifecycle")
                .field("command", command_name),
        );
        let result = self.dispatch(cmd);
        let code = match &result {
            Ok(code) => *code,
            Err(e) => e.exit_code(),
        };
        self.log(
            LogRecord::new(LogLevel::Info, "command finished")
                .kind("lifecycle")
                .field("command", command_name)
                .field("exit_code", code),
        );
        if let Err(ref e) = result {
            self.log(LogRecord::new(LogLevel::Error, e.to_string()).kind("error"));
        }
        result
    }

    fn dispatch(&self, cmd: Command) -> Result<i32, Error> {
        let app = &self.app;
        match cmd {
            Command::Search {
                query,
                open_to_work,
                pages,
            } => {
                if let SearchOutcome::Ignored = app.search.perform_search(&query.join(" "), open_to_work)? {
                    return Ok(0);
                }
                for _ in 1..pages {
                    match app.search.load_more()? {
                        LoadMoreOutcome::Appended { has_more: true, .. } => {}
                        _ => break,
                    }
                }
                if let Some(session) = app.search.session() {
                    for person in &session.results {
                        print_person(person);
                    }
                    if session.has_more {
                        println!("(more results available)");
                    }
                }
                println!("credits: {}", app.credits.balance()?);
                Ok(0)
            }
            Command::Credits => {
                println!("{}", app.credits.balance()?);
                Ok(0)
            }
            Command::Families => {
                for family in app.cards.families()? {
                    print_family(&family);
                }
                Ok(0)
            }
            Command::Draft { text, approve_all } => {
                let drafts = app.drafts.structure_text(&text.join(" "))?;
                for family in &drafts {
                    print_family(family);
                }
                if approve_all {
                    let report = app.drafts.approve_all();
                    for id in &report.approved {
                        println!("approved {}", id);
                    }
                    for (id, message) in &report.failed {
                        eprintln!("people: approving {} failed: {}", id, message);
                    }
                    if !report.all_approved() {
                        return Ok(74);
                    }
                }
                Ok(0)
            }
            Command::Approve { ids } => {
                let ids: Vec<_> = ids.iter().map(|s| card_id(s)).collect();
                let report = app.drafts.approve_drafts(&ids);
                for id in &report.approved {
                    println!("approved {}", id);
                }
                for (id, message) in &report.failed {
                    eprintln!("people: approving {} failed: {}", id, message);
                }
                Ok(if report.all_approved() { 0 } else { 74 })
            }
            Command::PatchCard { id, title, start, end } => {
                let patch = patch_from_flags(title, start, end)?;
                app.cards.families()?;
                app.mutations.patch_parent(&card_id(&id), patch)?;
                if let Some(card) = app.store.read(|s| s.cards.parent(&card_id(&id)).cloned()) {
                    print_card("", &card);
                }
                Ok(0)
            }
            Command::DeleteCard { id } => {
                app.cards.families()?;
                app.mutations.delete_parent(&card_id(&id))?;
                Ok(0)
            }
            Command::DeleteChild { id } => {
                app.cards.families()?;
                app.mutations.delete_child(&card_id(&id))?;
                Ok(0)
            }
            Command::HideCard { id } => {
                app.cards.families()?;
                app.mutations.hide_parent(&card_id(&id))?;
                Ok(0)
            }
            Command::Unlock { person } => {
                let resp = app.unlock.unlock_contact(&person_id(&person))?;
                match resp.contact {
                    Some(contact) => {
                        for (label, value) in [
                            ("email", contact.email),
                            ("phone", contact.phone),
                            ("linkedin", contact.linkedin_url),
                        ] {
                            if let Some(v) = value {
                                println!("{}: {}", label, v);
                            }
                        }
                    }
                    None if resp.unlocked => println!("unlocked"),
                    None => println!("not unlocked"),
                }
                Ok(0)
            }
            Command::Profile { person } => {
                let profile = app.profiles.open(&person_id(&person))?;
                println!("{} ({})", profile.display_name, profile.id);
                for line in [&profile.headline, &profile.location].into_iter().flatten() {
                    println!("  {}", line);
                }
                for family in &profile.families {
                    print_family(family);
                }
                Ok(0)
            }
            Command::Searches => {
                for recent in app.recent.list()? {
                    println!(
                        "{}\t{}\t{}",
                        recent.search_id,
                        recent.created_at.as_deref().unwrap_or("-"),
                        recent.query_text
                    );
                }
                Ok(0)
            }
        }
    }
}

fn print_person(p: &PersonSearchResult) {
    let mut flags = Vec::new();
    if p.open_to_work {
        flags.push("open to work");
    }
    if p.open_to_contact {
        flags.push("open to contact");
    }
    if flags.is_empty() {
        println!("{}\t{}", p.id, p.display_name);
    } else {
        println!("{}\t{}\t[{}]", p.id, p.display_name, flags.join(", "));
    }
}

fn print_card(indent: &str, c: &ExperienceCard) {
    let title = c.title.as_deref().unwrap_or("(untitled)");
    match &c.time_range {
        Some(range) => println!("{}{}\t{}\t{}", indent, c.id, title, range),
        None => println!("{}{}\t{}", indent, c.id, title),
    }
}

fn print_family(f: &CardFamily) {
    print_card("", &f.parent);
    for child in &f.children {
        print_card("  ", child);
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            process::exit(if e.use_stderr() { 64 } else { 0 });
        }
    };
    let exit_code = match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("people: {}", e);
            e.exit_code()
        }
    };
    process::exit(exit_code);
}

fn run(cmd: Command) -> Result<i32, Error> {
    let config = load_config()?;
    let app = wire_people(&config)?;
    let runner = Runner { app };
    let result = runner.run(cmd);
    runner.app.logout();
    result
}
