/// Dungeon Crawl example: an automatic walk through the Ember Throne content.
///
/// The hurried forest path and its narrow ledge challenge, then the
/// dungeon: every available element is tried once per room and the first
/// open exit leading somewhere new is taken.
///
/// Run with: cargo run --example dungeon_crawl

use ember_narrative::core::config::SessionConfig;
use ember_narrative::core::session::{InteractionOutcome, NarrativeSession, Transition};
use std::collections::HashSet;
use std::path::Path;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("ember_narrative=info"))
        .init();

    let config = SessionConfig::load_from_ron(Path::new("content/session.ron"))
        .expect("Failed to load session config");

    let mut session = NarrativeSession::builder()
        .content_dir("content/ember_throne")
        .config(config)
        .build()
        .expect("Failed to build session");

    // --- The forest ---
    banner(&session);
    session.select_exit("hurry").expect("hurry exit");
    banner(&session);

    session.select_element("narrow_path").expect("narrow path");
    session.advance_time(1500);
    let report = session.attempt_challenge().expect("attempt");
    println!("Narrow path: {:?} -> {:?}", short(&report.outcome), report.moved_to);
    banner(&session);
    session.select_exit("onward").expect("onward");

    // --- The dungeon ---
    let mut visited: HashSet<String> = HashSet::new();
    for _ in 0..12 {
        banner(&session);
        visited.insert(session.current_node().id.0.clone());

        let element_ids: Vec<String> = session
            .available_elements()
            .iter()
            .map(|e| e.id.clone())
            .collect();
        for id in element_ids {
            let report = session.select_element(&id).expect("select element");
            println!("  {:<20} {}", id, short(&report.outcome));
            if report.damage > 0 {
                println!("  {:<20} -{} health", "", report.damage);
            }
            if report.defeated {
                println!("\nThe dungeon claims another adventurer.");
                return;
            }
        }

        let next = session
            .available_exits()
            .into_iter()
            .find(|e| !visited.contains(e.target.as_str()))
            .or_else(|| session.available_exits().first().copied())
            .map(|e| e.id.clone());

        match next {
            Some(exit) => match session.select_exit(&exit).expect("select exit") {
                Transition::Moved { to, .. } => println!("  -> {}", to),
                Transition::Blocked(unmet) => println!("  blocked: {:?}", unmet),
            },
            None => break,
        }
    }

    let ledger = session.ledger();
    let mut traits: Vec<(&str, i64)> = ledger.traits().collect();
    traits.sort();
    println!("\n--- Journey's end ---");
    println!("Node:   {}", session.current_node().title);
    println!("Health: {}  Gold: {}", ledger.health(), ledger.gold());
    println!("Traits: {:?}", traits);
    println!("Path:   {}", session.history().len());
}

fn banner(session: &NarrativeSession) {
    let node = session.current_node();
    println!("\n=== {} ===", node.title);
    println!("{}", node.description);
}

fn short(outcome: &InteractionOutcome) -> &'static str {
    match outcome {
        InteractionOutcome::Granted => "taken",
        InteractionOutcome::Succeeded(_) => "success",
        InteractionOutcome::Failed(_) => "failure",
        InteractionOutcome::ChallengeStarted { .. } => "started",
        InteractionOutcome::TimedOut => "timed out",
        InteractionOutcome::Blocked(_) => "blocked",
    }
}
