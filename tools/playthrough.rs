/// Playthrough: interactive shell for walking node content by hand.
///
/// Usage: playthrough --content <dir> [--config <file>] [--start <node>] [--seed <n>]
///
/// Commands:
///   look                 describe the current node and its choices
///   use <element>        interact with an element
///   go <exit>            take an exit or dialogue option
///   attempt              act on the running challenge
///   wait <ms>            advance the clock
///   status               show traits, items and vitals
///   save <file> / load <file>
///   reset                start over
///   help                 list commands
///   quit                 exit

use ember_narrative::core::config::SessionConfig;
use ember_narrative::core::session::{
    InteractionOutcome, InteractionReport, NarrativeSession, SessionSnapshot, Transition,
};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut content_path = None;
    let mut config = SessionConfig::default();
    let mut start = None;
    let mut seed = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--content" if i + 1 < args.len() => {
                i += 1;
                content_path = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                match SessionConfig::load_from_ron(Path::new(&args[i])) {
                    Ok(loaded) => config = loaded,
                    Err(e) => {
                        eprintln!("ERROR: Failed to load config: {}", e);
                        std::process::exit(1);
                    }
                }
            }
            "--start" if i + 1 < args.len() => {
                i += 1;
                start = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().ok();
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(content_path) = content_path else {
        eprintln!("ERROR: --content is required");
        print_usage();
        std::process::exit(1);
    };

    if start.is_some() {
        config.start = start;
    }
    if let Some(seed) = seed {
        config.seed = seed;
    }

    let builder = NarrativeSession::builder().config(config);
    let builder = if Path::new(&content_path).is_file() {
        builder.content_file(&content_path)
    } else {
        builder.content_dir(&content_path)
    };

    let mut session = match builder.build() {
        Ok(session) => session,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Loaded {} nodes, seed {}",
        session.graph().len(),
        session.config().seed
    );
    println!("Type 'help' for commands.\n");
    describe(&session);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("play> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "look" | "l" => describe(&session),
            "use" | "u" => {
                let Some(id) = parts.get(1) else {
                    println!("Usage: use <element>");
                    continue;
                };
                match session.select_element(id) {
                    Ok(report) => print_report(&report, &session),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "go" | "g" => {
                let Some(id) = parts.get(1) else {
                    println!("Usage: go <exit>");
                    continue;
                };
                match session.select_exit(id) {
                    Ok(Transition::Moved { .. }) => describe(&session),
                    Ok(Transition::Blocked(unmet)) => {
                        println!("You cannot go that way yet.");
                        for reason in unmet {
                            println!("  missing: {:?}", reason);
                        }
                    }
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "attempt" | "a" => match session.attempt_challenge() {
                Ok(report) => print_report(&report, &session),
                Err(e) => println!("ERROR: {}", e),
            },
            "wait" | "w" => {
                let ms = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(1000);
                let reports = session.advance_time(ms);
                if reports.is_empty() {
                    match session.active_challenge() {
                        Some(status) => println!(
                            "{} ms left on '{}'",
                            status.remaining_ms, status.element
                        ),
                        None => println!("Time passes."),
                    }
                }
                for report in &reports {
                    print_report(report, &session);
                }
            }
            "status" | "s" => print_status(&session),
            "save" => {
                let Some(path) = parts.get(1) else {
                    println!("Usage: save <file>");
                    continue;
                };
                let text = match ron::ser::to_string_pretty(
                    &session.snapshot(),
                    ron::ser::PrettyConfig::default(),
                ) {
                    Ok(text) => text,
                    Err(e) => {
                        println!("ERROR: {}", e);
                        continue;
                    }
                };
                match std::fs::write(path, text) {
                    Ok(()) => println!("Saved to {}", path),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "load" => {
                let Some(path) = parts.get(1) else {
                    println!("Usage: load <file>");
                    continue;
                };
                match load_snapshot(path) {
                    Ok(snapshot) => match session.restore(snapshot) {
                        Ok(()) => describe(&session),
                        Err(e) => println!("ERROR: {}", e),
                    },
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "reset" => {
                session.reset();
                describe(&session);
            }
            _ => {
                println!("Unknown command: {}. Type 'help' for commands.", cmd);
            }
        }
    }
}

fn load_snapshot(path: &str) -> Result<SessionSnapshot, String> {
    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    ron::from_str(&text).map_err(|e| e.to_string())
}

fn describe(session: &NarrativeSession) {
    let node = session.current_node();
    let mut narration = session.narration();
    println!("\n== {} ==", node.title);
    println!("{}\n", narration.skip());

    let elements = session.element_choices();
    if !elements.is_empty() {
        println!("Elements:");
        for choice in elements {
            let marker = if choice.enabled { " " } else { "x" };
            println!("  [{}] {:<22} {}", marker, choice.item.id, choice.item.title);
        }
    }

    let exits = session.exit_choices();
    if !exits.is_empty() {
        println!("Exits:");
        for choice in exits {
            let marker = if choice.enabled { " " } else { "x" };
            println!("  [{}] {:<22} {}", marker, choice.item.id, choice.item.label);
        }
    }
    println!();
}

fn print_report(report: &InteractionReport, session: &NarrativeSession) {
    match &report.outcome {
        InteractionOutcome::Granted => println!("Done."),
        InteractionOutcome::Succeeded(r) => {
            println!("Success! (rolled {:.2} under {:.2})", r.roll, r.chance)
        }
        InteractionOutcome::Failed(r) => {
            println!("Failure. (rolled {:.2}, needed under {:.2})", r.roll, r.chance)
        }
        InteractionOutcome::ChallengeStarted { time_limit_ms } => {
            println!("You have {} ms. 'attempt' to act, 'wait' to let time pass.", time_limit_ms)
        }
        InteractionOutcome::TimedOut => println!("Time ran out!"),
        InteractionOutcome::Blocked(unmet) => {
            println!("You cannot do that yet.");
            for reason in unmet {
                println!("  missing: {:?}", reason);
            }
        }
    }

    for (name, delta) in &report.applied.traits {
        println!("  {} {:+}", name, delta);
    }
    for item in &report.applied.items {
        println!("  + {}", item);
    }
    if report.applied.gold != 0 {
        println!("  {:+} gold", report.applied.gold);
    }
    if report.damage > 0 {
        println!("  -{} health ({} left)", report.damage, session.ledger().health());
    }
    if report.defeated {
        println!("\nYou have fallen. Type 'reset' to start over.");
    }
    if report.moved_to.is_some() {
        describe(session);
    }
}

fn print_status(session: &NarrativeSession) {
    let ledger = session.ledger();
    println!("Health: {}  Gold: {}", ledger.health(), ledger.gold());

    let mut traits: Vec<(&str, i64)> = ledger.traits().collect();
    traits.sort();
    println!("Traits:");
    for (name, value) in traits {
        println!("  {:<16} {}", name, value);
    }

    let mut items: Vec<&str> = ledger.items().collect();
    items.sort();
    println!("Items: {}", items.join(", "));
    println!("Visited: {}", session.history().len());
}

fn print_usage() {
    println!("Playthrough: interactive shell for walking node content by hand.");
    println!();
    println!("Usage: playthrough --content <dir> [--config <file>] [--start <node>] [--seed <n>]");
    println!();
    println!("  --content <path>  Node file or directory of node files");
    println!("  --config <file>   Session config (RON)");
    println!("  --start <node>    Start node (default: config, then first node)");
    println!("  --seed <n>        RNG seed (default: config, then 0)");
}

fn print_help() {
    println!("Commands:");
    println!("  look               Describe the current node");
    println!("  use <element>      Interact with an element");
    println!("  go <exit>          Take an exit or dialogue option");
    println!("  attempt            Act on the running challenge");
    println!("  wait [ms]          Advance the clock (default 1000)");
    println!("  status             Show traits, items and vitals");
    println!("  save <file>        Write a snapshot");
    println!("  load <file>        Restore a snapshot");
    println!("  reset              Start over");
    println!("  help               Show this help");
    println!("  quit               Exit");
}
