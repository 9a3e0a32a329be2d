//! A terminal voting portal.
//! Signs a voter in against the election service and runs a voting session
//! driven by commands read from standard input.

use std::fmt::{Display, Formatter};
use std::io::BufRead;
use std::str::FromStr;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::{error, info, LevelFilter};
use thiserror::Error;

use voting_portal::engine::{BallotView, ElectionTag, PartyPrompt, PortalView, Signal};
use voting_portal::model::{AccessToken, CandidateId, ElectionId, PartyId, VoterIdentity};
use voting_portal::{ElectionService, HttpElectionService, PortalConfig, VotingEngine};

const PROGRAM_NAME: &str = "voter-portal";

const ABOUT_TEXT: &str = "Vote in the elections you are eligible for.

Settings are read from Portal.toml and PORTAL_* environment variables.
Type `help` once the portal is running to list the commands.";

const VOTER_ID: &str = "VOTER_ID";
const NAME: &str = "name";
const GROUPING: &str = "grouping";
const PARTY: &str = "party";
const TOKEN: &str = "token";
const SERVICE_URL: &str = "service-url";

const HELP_TEXT: &str = "Commands:
  list            show the election list or open ballot again
  party <id>      choose which party's primaries to see
  open <id>       open an election's ballot
  pick <id>       select a candidate on a single-choice ballot
  rank <id>       give a candidate the next rank
  unrank <id>     remove a candidate's rank
  up <id>         move a ranked candidate up one place
  down <id>       move a ranked candidate down one place
  clear           remove every rank
  submit          cast the open ballot
  back            return to the election list
  ok              dismiss a message
  refresh         reload the election list
  quit            sign out and exit";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .arg(
            Arg::new(VOTER_ID)
                .help("Roster ID of the voter signing in")
                .value_parser(value_parser!(u32))
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new(NAME)
                .long(NAME)
                .help("Name shown in the portal header")
                .default_value("Voter"),
        )
        .arg(
            Arg::new(GROUPING)
                .long(GROUPING)
                .help("City, county or state the voter belongs to")
                .default_value(""),
        )
        .arg(
            Arg::new(PARTY)
                .long(PARTY)
                .help("Party the voter is affiliated with"),
        )
        .arg(
            Arg::new(TOKEN)
                .long(TOKEN)
                .help("Credential presented to the election service [default: `access_token` setting]"),
        )
        .arg(
            Arg::new(SERVICE_URL)
                .long(SERVICE_URL)
                .help("Override the election service URL from Portal.toml"),
        )
}

/// Errors that end the portal.
#[derive(Debug, Error)]
enum Error {
    #[error(transparent)]
    Portal(#[from] voting_portal::Error),
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

/// The voter described on the command line.
fn voter(args: &ArgMatches) -> VoterIdentity {
    // Required argument and defaults are guaranteed to be present.
    VoterIdentity {
        id: *args.get_one::<u32>(VOTER_ID).unwrap(),
        display_name: args.get_one::<String>(NAME).unwrap().clone(),
        grouping_name: args.get_one::<String>(GROUPING).unwrap().clone(),
        party_affiliation: args.get_one::<String>(PARTY).cloned(),
    }
}

/// A command typed at the portal prompt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum PortalCommand {
    List,
    Party(PartyId),
    Open(ElectionId),
    Pick(CandidateId),
    Rank(CandidateId),
    Unrank(CandidateId),
    Up(CandidateId),
    Down(CandidateId),
    Clear,
    Submit,
    Back,
    Dismiss,
    Refresh,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
struct ParseCommandError(String);

impl Display for ParseCommandError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (type `help` for the list of commands)", self.0)
    }
}

impl FromStr for PortalCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words
            .next()
            .ok_or_else(|| ParseCommandError("Empty command".to_string()))?
            .to_lowercase();
        let command = match verb.as_str() {
            "list" | "ls" => Self::List,
            "party" => Self::Party(parse_id(&verb, words.next())?),
            "open" => Self::Open(parse_id(&verb, words.next())?),
            "pick" | "select" => Self::Pick(parse_id(&verb, words.next())?),
            "rank" => Self::Rank(parse_id(&verb, words.next())?),
            "unrank" => Self::Unrank(parse_id(&verb, words.next())?),
            "up" => Self::Up(parse_id(&verb, words.next())?),
            "down" => Self::Down(parse_id(&verb, words.next())?),
            "clear" => Self::Clear,
            "submit" => Self::Submit,
            "back" => Self::Back,
            "ok" | "dismiss" => Self::Dismiss,
            "refresh" | "reload" => Self::Refresh,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(ParseCommandError(format!("Unknown command `{other}`"))),
        };
        match words.next() {
            Some(extra) => Err(ParseCommandError(format!("Unexpected `{extra}`"))),
            None => Ok(command),
        }
    }
}

fn parse_id(verb: &str, word: Option<&str>) -> Result<u32, ParseCommandError> {
    let word = word.ok_or_else(|| ParseCommandError(format!("`{verb}` needs an ID")))?;
    word.parse()
        .map_err(|_| ParseCommandError(format!("`{word}` is not a valid ID")))
}

/// Apply a command to the engine.
async fn execute<S: ElectionService>(
    engine: &mut VotingEngine<S>,
    command: PortalCommand,
) -> voting_portal::Result<()> {
    match command {
        PortalCommand::Party(id) => engine.select_party(id)?,
        PortalCommand::Open(id) => engine.open_election(id)?,
        PortalCommand::Pick(id) => engine.select_candidate(id)?,
        PortalCommand::Rank(id) => {
            engine.add_rank(id)?;
        }
        PortalCommand::Unrank(id) => engine.remove_rank(id)?,
        PortalCommand::Up(id) => {
            engine.move_up(id)?;
        }
        PortalCommand::Down(id) => {
            engine.move_down(id)?;
        }
        PortalCommand::Clear => engine.clear_ranks()?,
        PortalCommand::Submit => {
            engine.submit().await?;
        }
        PortalCommand::Back => engine.back(),
        PortalCommand::Dismiss => engine.dismiss(),
        PortalCommand::Refresh => engine.load().await?,
        PortalCommand::List | PortalCommand::Help | PortalCommand::Quit => {}
    }
    Ok(())
}

/// Text rendering of a portal view.
struct Screen<'a>(&'a PortalView);

impl Display for Screen<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let view = self.0;
        if let Some(voter) = &view.voter {
            if voter.grouping_name.is_empty() {
                writeln!(f, "== {} ==", voter.display_name)?;
            } else {
                writeln!(f, "== {} ({}) ==", voter.display_name, voter.grouping_name)?;
            }
        }
        match &view.signal {
            Some(Signal::Error(message)) => writeln!(f, "! {message} (type `ok` to dismiss)")?,
            Some(Signal::Confirmed(confirmation)) => writeln!(
                f,
                "Your ballot for {} was recorded at {}.",
                confirmation.position_name,
                confirmation.confirmed_at.format("%H:%M:%S UTC")
            )?,
            None => {}
        }
        if view.is_submitting() {
            return writeln!(f, "Submitting your ballot...");
        }
        match &view.ballot {
            Some(ballot) => write_ballot(f, ballot, view.submit_enabled),
            None => write_elections(f, view),
        }
    }
}

fn write_elections(f: &mut Formatter<'_>, view: &PortalView) -> std::fmt::Result {
    if !view.loaded {
        return writeln!(f, "No elections loaded. Type `refresh` to try again.");
    }
    match &view.party_prompt {
        PartyPrompt::Hidden => {}
        PartyPrompt::Offered { parties, selected } => {
            writeln!(f, "Choose which party's primaries to vote in (`party <id>`):")?;
            for party in parties {
                let marker = if *selected == Some(party.id) { " (chosen)" } else { "" };
                writeln!(f, "  [{}] {}{}", party.id, party.name, marker)?;
            }
        }
        PartyPrompt::Locked { party } => writeln!(
            f,
            "You are voting in the {party} primaries and cannot switch parties."
        )?,
    }
    if view.elections.is_empty() {
        return writeln!(f, "There are no elections open to you.");
    }
    for election in &view.elections {
        let tag = match &election.tag {
            Some(ElectionTag::Party(party)) => format!(" <{party} primary>"),
            Some(ElectionTag::Blanket { advancing }) => {
                format!(" <all-party primary, top {advancing} advance>")
            }
            Some(ElectionTag::Jungle) => " <all-party>".to_string(),
            None => String::new(),
        };
        writeln!(
            f,
            "  [{}] {}, {} ({}){} {:?}",
            election.id,
            election.position_name,
            election.grouping_name,
            election.method,
            tag,
            election.badge
        )?;
    }
    Ok(())
}

fn write_ballot(f: &mut Formatter<'_>, ballot: &BallotView, submit_enabled: bool) -> std::fmt::Result {
    let election = ballot.election();
    writeln!(f, "{} ({})", election.position_name, election.grouping_name)?;
    let party = |name: &Option<String>| {
        name.as_deref()
            .map(|name| format!(" ({name})"))
            .unwrap_or_default()
    };
    match ballot {
        BallotView::AlreadyVoted { .. } => {
            return writeln!(f, "You have already voted in this election.")
        }
        BallotView::Single {
            instructions,
            choices,
            ..
        } => {
            writeln!(f, "{instructions}")?;
            for choice in choices {
                let mark = if choice.selected { "x" } else { " " };
                writeln!(
                    f,
                    "  ({mark}) [{}] {}{}",
                    choice.candidate.id,
                    choice.candidate.name,
                    party(&choice.candidate.party_name)
                )?;
            }
        }
        BallotView::Ranked {
            instructions,
            choices,
            ..
        } => {
            writeln!(f, "{instructions}")?;
            for choice in choices {
                let rank = choice
                    .rank
                    .map(|rank| rank.to_string())
                    .unwrap_or_else(|| "-".to_string());
                writeln!(
                    f,
                    "  {rank:>2}. [{}] {}{}",
                    choice.candidate.id,
                    choice.candidate.name,
                    party(&choice.candidate.party_name)
                )?;
            }
        }
    }
    if submit_enabled {
        writeln!(f, "Type `submit` to cast your ballot.")?;
    }
    Ok(())
}

/// Request-level logging is ours; silence the HTTP client's own chatter.
fn quiet_http_client() {
    log4rs_dynamic_filters::DynamicLevelFilter::set("reqwest", LevelFilter::Warn);
    log4rs_dynamic_filters::DynamicLevelFilter::set("hyper", LevelFilter::Warn);
}

/// Run a voting session until the voter quits or input ends.
async fn run(args: &ArgMatches) -> Result<(), Error> {
    let config = match args.get_one::<String>(SERVICE_URL) {
        Some(url) => PortalConfig::load_with_service_url(url)?,
        None => PortalConfig::load()?,
    };
    let credential = args
        .get_one::<String>(TOKEN)
        .map(AccessToken::new)
        .or_else(|| config.access_token());
    info!("Using election service at {}", config.service_url());

    let mut engine = VotingEngine::new(HttpElectionService::new(&config)?);
    let mut views = engine.subscribe();
    engine.bind_voter(voter(args), credential);

    quiet_http_client();

    // A failed first load is shown on screen like any other error.
    let _ = engine.load().await;
    println!("{}", Screen(&views.borrow_and_update()));

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<PortalCommand>() {
            Ok(command) => command,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        match command {
            PortalCommand::Quit => break,
            PortalCommand::Help => {
                println!("{HELP_TEXT}");
                continue;
            }
            _ => {}
        }

        let result = execute(&mut engine, command).await;
        // Failures the engine signals appear in the view; the rest are printed here.
        if let Err(err) = result {
            if !matches!(engine.view().signal, Some(Signal::Error(_))) {
                println!("{}", err.user_message());
            }
        }
        if command == PortalCommand::List || views.has_changed().unwrap_or(false) {
            println!("{}", Screen(&views.borrow_and_update()));
        }
    }

    engine.reset();
    println!("Signed out.");
    Ok(())
}

#[rocket::main]
async fn main() {
    // Set up logging.
    log4rs::init_file("log4rs.yaml", log4rs_dynamic_filters::default_deserializers())
        .expect("Failed to initialise logging");
    info!("Initialised logging");

    let args = cli().get_matches();
    if let Err(err) = run(&args).await {
        error!("{err}");
        eprintln!("{err}");
        std::process::exit(1)
    }
}
