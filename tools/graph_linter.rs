/// Graph Linter: validates node content and flags unreachable or unwinnable parts.
///
/// Usage: graph_linter <content_dir_or_file> [--start <node>]

use ember_narrative::core::graph::{NarrativeGraph, NodeSet};
use ember_narrative::schema::node::{ElementKind, NarrativeNode, Reward};
use std::collections::BTreeSet;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: graph_linter <content_dir_or_file> [--start <node>]");
        process::exit(0);
    }

    let content = Path::new(&args[1]);
    let mut start = None;

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--start" && i + 1 < args.len() {
            i += 1;
            start = Some(args[i].clone());
        }
        i += 1;
    }

    let loaded = if content.is_file() {
        NodeSet::load_from_ron(content)
    } else if content.is_dir() {
        NodeSet::load_from_dir(content)
    } else {
        eprintln!("ERROR: Path '{}' does not exist", content.display());
        process::exit(1);
    };

    let set = match loaded {
        Ok(set) => set,
        Err(e) => {
            eprintln!("ERROR: Failed to load nodes: {}", e);
            process::exit(1);
        }
    };

    println!("Loaded {} nodes", set.len());

    let start = match start.or_else(|| set.nodes.first().map(|n| n.id.0.clone())) {
        Some(start) => start,
        None => {
            eprintln!("ERROR: No nodes to lint");
            process::exit(1);
        }
    };

    let (errors, warnings) = lint_nodes(set, &start);

    println!("\n=== Graph Lint Report (start: {}) ===\n", start);

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn lint_nodes(set: NodeSet, start: &str) -> (Vec<String>, Vec<String>) {
    let problems = set.validate(start);
    if !problems.is_empty() {
        // Structural problems make the reachability checks meaningless.
        let errors = problems.iter().map(ToString::to_string).collect();
        return (errors, Vec::new());
    }

    let mut warnings = Vec::new();
    let graph = match NarrativeGraph::new(set, start) {
        Ok(graph) => graph,
        Err(e) => return (vec![e.to_string()], warnings),
    };

    for id in graph.unreachable() {
        warnings.push(format!("Node '{}' cannot be reached from '{}'", id, start));
    }

    let (granted_traits, granted_items) = granted(graph.nodes());

    for node in graph.nodes() {
        if node.targets().next().is_none() {
            warnings.push(format!("Node '{}' is a dead end", node.id));
        }

        let gates = node
            .elements
            .iter()
            .map(|e| (e.id.as_str(), e.requires.as_ref()))
            .chain(node.exits.iter().map(|e| (e.id.as_str(), e.requires.as_ref())));

        for (choice, requires) in gates {
            let Some(spec) = requires else { continue };
            for (name, min) in &spec.traits {
                if *min > 0 && !granted_traits.contains(name.as_str()) {
                    warnings.push(format!(
                        "Node '{}': '{}' needs trait '{}' but nothing grants it",
                        node.id, choice, name
                    ));
                }
            }
            for item in &spec.items {
                if !granted_items.contains(item.as_str()) {
                    warnings.push(format!(
                        "Node '{}': '{}' needs item '{}' but nothing grants it",
                        node.id, choice, item
                    ));
                }
            }
        }
    }

    (Vec::new(), warnings)
}

/// Every trait raised and item granted anywhere in the content.
fn granted<'a>(nodes: impl Iterator<Item = &'a NarrativeNode>) -> (BTreeSet<&'a str>, BTreeSet<&'a str>) {
    let mut traits = BTreeSet::new();
    let mut items = BTreeSet::new();
    let mut collect = |reward: &'a Reward| {
        traits.extend(
            reward
                .traits
                .iter()
                .filter(|(_, delta)| **delta > 0)
                .map(|(name, _)| name.as_str()),
        );
        items.extend(reward.items.iter().map(String::as_str));
    };

    for node in nodes {
        for element in &node.elements {
            collect(&element.reward);
            collect(&element.failure);
            if let ElementKind::Challenge(challenge) = &element.kind {
                collect(&challenge.success.reward);
                collect(&challenge.failure.reward);
            }
        }
        for exit in &node.exits {
            collect(&exit.reward);
        }
    }
    (traits, items)
}
