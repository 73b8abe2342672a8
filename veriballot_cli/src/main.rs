use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{debug, LevelFilter};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use veriballot::VotingSystem;

/// Construct the CLI configuration.
fn cli() -> Command {
    Command::new("veriballot")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Voter registration, signed ballots, and a verifiable tally")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("db")
                .long("db")
                .value_name("PATH")
                .global(true)
                .help("Ledger file - can also be set with VERIBALLOT_DB"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .global(true)
                .help("Increase log verbosity"),
        )
        .subcommand(
            Command::new("setup")
                .about("Install the candidate roster for a fresh election")
                .arg(
                    Arg::new("CANDIDATE")
                        .num_args(1..)
                        .required(true)
                        .help("Candidate names, in ballot order"),
                ),
        )
        .subcommand(
            Command::new("register")
                .about("Enroll a voter and write their private key to a file")
                .arg(Arg::new("VOTER_ID").required(true))
                .arg(
                    Arg::new("key-out")
                        .long("key-out")
                        .value_name("FILE")
                        .help("Where to write the private key PEM [default: <VOTER_ID>_private_key.pem]"),
                ),
        )
        .subcommand(
            Command::new("vote")
                .about("Sign and cast a ballot")
                .arg(Arg::new("VOTER_ID").required(true))
                .arg(Arg::new("CANDIDATE").required(true))
                .arg(
                    Arg::new("key")
                        .long("key")
                        .value_name("FILE")
                        .required(true)
                        .help("Private key PEM written at registration"),
                ),
        )
        .subcommand(
            Command::new("results").about("Print the tally").arg(
                Arg::new("json")
                    .long("json")
                    .action(ArgAction::SetTrue)
                    .help("Emit the tally as JSON"),
            ),
        )
        .subcommand(
            Command::new("audit").about("Replay integrity checks over every recorded vote"),
        )
        .subcommand(Command::new("reset").about("Wipe voters, votes, and the roster"))
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{h({l})} {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .expect("Failed to initialise logging");
    log4rs::init_config(config).expect("Failed to initialise logging");
}

fn db_path(args: &ArgMatches) -> PathBuf {
    let env_var = std::env::var("VERIBALLOT_DB");
    match args.get_one::<String>("db") {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(env_var.as_deref().unwrap_or("votes.json")),
    }
}

fn main() {
    let matches = cli().get_matches();

    if let Some((name, args)) = matches.subcommand() {
        init_logging(args.get_count("verbose"));

        match run(name, args) {
            Ok(code) => std::process::exit(code),
            Err(err) => {
                eprintln!("veriballot: {:#}", err);
                std::process::exit(1);
            }
        }
    }
}

fn run(name: &str, args: &ArgMatches) -> anyhow::Result<i32> {
    let path = db_path(args);
    debug!("ledger file: {}", path.display());
    let system = VotingSystem::open(&path)?;

    match name {
        "setup" => command_setup(&system, args),
        "register" => command_register(&system, args),
        "vote" => command_vote(&system, args),
        "results" => command_results(&system, args),
        "audit" => command_audit(&system),
        "reset" => command_reset(&system),
        _ => unreachable!("subcommands are exhaustive"),
    }
}

fn command_setup(system: &VotingSystem, args: &ArgMatches) -> anyhow::Result<i32> {
    // Required argument is guaranteed to be present.
    let candidates: Vec<String> = args
        .get_many::<String>("CANDIDATE")
        .unwrap()
        .cloned()
        .collect();

    system.setup_election(candidates)?;
    let roster = system.candidates();
    println!("election ready with {} candidate(s):", roster.len());
    for name in roster {
        println!("  {}", name);
    }
    Ok(0)
}

fn command_register(system: &VotingSystem, args: &ArgMatches) -> anyhow::Result<i32> {
    let voter_id: &String = args.get_one("VOTER_ID").unwrap();

    let registration = system.register(voter_id)?;
    let key_path = match args.get_one::<String>("key-out") {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(format!("{}_private_key.pem", voter_id)),
    };
    fs::write(&key_path, registration.private_key_pem.as_bytes())
        .with_context(|| format!("unable to write key file {}", key_path.display()))?;

    println!("voter registered");
    println!("  hashed id:   {}", registration.hashed_id);
    println!("  private key: {}", key_path.display());
    println!("keep the key file safe; a lost key cannot be recovered");
    Ok(0)
}

fn command_vote(system: &VotingSystem, args: &ArgMatches) -> anyhow::Result<i32> {
    let voter_id: &String = args.get_one("VOTER_ID").unwrap();
    let candidate: &String = args.get_one("CANDIDATE").unwrap();
    let key_file: &String = args.get_one("key").unwrap();

    let private_pem = fs::read_to_string(key_file)
        .with_context(|| format!("unable to read key file {}", key_file))?;
    let receipt = system.submit_vote(voter_id, candidate, &private_pem)?;

    println!("vote accepted for {}", receipt.candidate);
    println!("  voter:   {}", receipt.voter_hash);
    println!("  cast at: {}", receipt.cast_at);
    Ok(0)
}

fn command_results(system: &VotingSystem, args: &ArgMatches) -> anyhow::Result<i32> {
    let tally = system.tally();

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&tally)?);
        return Ok(0);
    }

    let mut rows: Vec<(&String, &u64)> = tally.results.iter().collect();
    rows.sort_by(|a, b| b.1.cmp(a.1));

    println!("=== Results ===");
    for (candidate, count) in rows {
        let share = if tally.total_votes == 0 {
            0.0
        } else {
            *count as f64 / tally.total_votes as f64 * 100.0
        };
        println!("{:<24} {:>6}  ({:.1}%)", candidate, count, share);
    }
    println!();
    println!("registered voters: {}", tally.total_registered);
    println!(
        "votes cast:        {} ({:.1}% participation)",
        tally.total_votes, tally.participation_rate
    );
    Ok(0)
}

fn command_audit(system: &VotingSystem) -> anyhow::Result<i32> {
    let report = system.audit_all();

    if report.ok {
        println!("audit clean: every recorded vote verifies");
        Ok(0)
    } else {
        println!(
            "audit FAILED: {} vote(s) violate ledger integrity",
            report.violations.len()
        );
        for voter in &report.violations {
            println!("  {}", voter);
        }
        Ok(2)
    }
}

fn command_reset(system: &VotingSystem) -> anyhow::Result<i32> {
    system.reset()?;
    println!("ledger wiped: voters, votes, and roster cleared");
    Ok(0)
}
