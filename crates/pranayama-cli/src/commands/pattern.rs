use clap::Subcommand;
use pranayama_core::{Config, Tier};
use serde_json::json;

use super::SelectionArgs;

#[derive(Subcommand)]
pub enum PatternAction {
    /// Show the durations a selection resolves to
    Resolve {
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// List the difficulty tiers
    Tiers,
}

pub fn run(action: PatternAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PatternAction::Resolve { selection } => {
            let config = Config::load()?;
            let selection = selection.selection(&config)?;
            let resolution = selection.resolve();
            let out = json!({
                "mode": selection.mode(),
                "label": selection.display_label(),
                "durations": resolution.durations,
                "nostril_active": resolution.nostril_active,
                "cycle_secs": resolution.durations.total_secs(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        PatternAction::Tiers => {
            let tiers: Vec<_> = Tier::ALL
                .iter()
                .map(|tier| {
                    json!({
                        "tier": tier,
                        "name": tier.sanskrit_name(),
                        "description": tier.description(),
                        "pattern": tier.base_pattern(),
                        "nadi_pattern": tier.nadi_pattern(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&tiers)?);
        }
    }
    Ok(())
}
