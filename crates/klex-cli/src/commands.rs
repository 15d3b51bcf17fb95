use klex_core::{codec, KlexError, Result, TriggerClass};
use klex_daemon::{daemon_status, start_daemon, stop_daemon, JsonStore, DEFAULT_BUNDLE};

use crate::cli::{BundleAction, Commands};

pub fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Add {
            text,
            replacement,
            triggers,
            bundle,
        } => {
            let triggers = parse_triggers(&triggers)?;
            let bundle = bundle.as_deref().unwrap_or(DEFAULT_BUNDLE);
            JsonStore::new().add_hotstring(bundle, &text, &replacement, &triggers)?;
            println!("Added '{}' to bundle '{}'.", text, bundle);
            Ok(())
        }
        Commands::Delete { text } => {
            JsonStore::new().delete_hotstring(&text)?;
            println!("Deleted '{}'.", text);
            Ok(())
        }
        Commands::Update { text, replacement } => {
            JsonStore::new().update_hotstring(&text, &replacement)?;
            println!("Updated '{}'.", text);
            Ok(())
        }
        Commands::List => list_hotstrings(),
        Commands::Start => start_daemon(),
        Commands::Stop => stop_daemon(),
        Commands::Status => daemon_status(),
        Commands::Bundle { action } => handle_bundle(action),
        Commands::Stats => show_stats(),
        Commands::DaemonWorker => klex_daemon::run_daemon_worker(),
    }
}

fn handle_bundle(action: BundleAction) -> Result<()> {
    let store = JsonStore::new();
    match action {
        BundleAction::Enable { name } => {
            store.set_bundle_enabled(&name, true)?;
            println!("Bundle '{}' enabled.", name);
            Ok(())
        }
        BundleAction::Disable { name } => {
            store.set_bundle_enabled(&name, false)?;
            println!("Bundle '{}' disabled.", name);
            Ok(())
        }
        BundleAction::List => {
            let db = store.ensure_initialized()?;
            for bundle in &db.bundles {
                let state = if bundle.enabled { "enabled" } else { "disabled" };
                println!(
                    "{} ({}, {} hotstrings)",
                    bundle.name,
                    state,
                    bundle.hotstrings.len()
                );
            }
            Ok(())
        }
    }
}

fn list_hotstrings() -> Result<()> {
    let db = JsonStore::new().ensure_initialized()?;
    for bundle in &db.bundles {
        if bundle.hotstrings.is_empty() {
            continue;
        }
        println!("[{}]", bundle.name);
        for hs in &bundle.hotstrings {
            let display = codec::decode(&hs.id)?;
            let triggers: Vec<String> = hs.triggers.iter().map(|t| t.to_string()).collect();
            let preview: String = hs.replacement.chars().take(40).collect();
            println!("  {} -> {} ({})", display, preview, triggers.join(", "));
        }
    }
    Ok(())
}

fn show_stats() -> Result<()> {
    let db = JsonStore::new().ensure_initialized()?;
    println!("Expansions: {}", db.stats.expanded);
    println!("Characters saved: {}", db.stats.chars_saved);
    Ok(())
}

fn parse_triggers(list: &str) -> Result<Vec<TriggerClass>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s {
            "enter" => Ok(TriggerClass::Enter),
            "tab" => Ok(TriggerClass::Tab),
            "space" => Ok(TriggerClass::Space),
            "instant" => Ok(TriggerClass::Instant),
            "autocorrect" => Ok(TriggerClass::Autocorrect),
            other => Err(KlexError::Other(format!(
                "unknown trigger class '{}'; expected enter, tab, space, instant or autocorrect",
                other
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trigger_lists() {
        assert_eq!(
            parse_triggers("space, enter").unwrap(),
            vec![TriggerClass::Space, TriggerClass::Enter]
        );
        assert_eq!(
            parse_triggers("instant").unwrap(),
            vec![TriggerClass::Instant]
        );
        assert!(parse_triggers("shrug").is_err());
    }
}
