use clap::Subcommand;
use pranayama_core::{Database, PatternDurations, Preset, PresetError};

#[derive(Subcommand)]
pub enum PresetAction {
    /// List saved presets
    List,
    /// Show one preset
    Show {
        /// Preset name
        name: String,
    },
    /// Save a preset
    Save {
        /// Preset name
        name: String,
        /// Inhale seconds
        inhale: u32,
        /// Hold seconds
        hold: u32,
        /// Exhale seconds
        exhale: u32,
        /// Relax seconds
        relax: u32,
        /// Replace an existing preset with the same name
        #[arg(long)]
        overwrite: bool,
    },
    /// Delete a preset
    Delete {
        /// Preset name
        name: String,
    },
}

pub fn run(action: PresetAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        PresetAction::List => {
            let presets = db.list_presets()?;
            println!("{}", serde_json::to_string_pretty(&presets)?);
        }
        PresetAction::Show { name } => {
            let preset = db
                .get_preset(&name)?
                .ok_or_else(|| PresetError::NotFound(name.trim().to_string()))?;
            println!("{}", serde_json::to_string_pretty(&preset)?);
        }
        PresetAction::Save {
            name,
            inhale,
            hold,
            exhale,
            relax,
            overwrite,
        } => {
            let preset = Preset {
                name,
                durations: PatternDurations::new(inhale, hold, exhale, relax)?,
            };
            let saved = db.save_preset(&preset, overwrite)?;
            println!("{}", serde_json::to_string_pretty(&saved)?);
        }
        PresetAction::Delete { name } => {
            db.delete_preset(&name)?;
            println!("Preset \"{}\" deleted", name.trim());
        }
    }
    Ok(())
}
