pub mod config;
pub mod history;
pub mod noise;
pub mod pattern;
pub mod preset;
pub mod session;

use clap::Args;
use pranayama_core::{Config, Database, Mode, PatternDurations, PresetError, Selection, Tier};

/// Which pattern to use. Falls back to the configured tier.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Difficulty tier (easy, medium, hard; Sanskrit names also accepted)
    #[arg(long, conflicts_with_all = ["custom", "preset"])]
    pub tier: Option<Tier>,

    /// Alternate-nostril breathing (tiers only)
    #[arg(long)]
    pub nadi: bool,

    /// Ignore the configured alternate-nostril default
    #[arg(long, conflicts_with = "nadi")]
    pub no_nadi: bool,

    /// Custom durations in seconds; the configured values when none are given
    #[arg(
        long,
        num_args = 0..=4,
        value_names = ["INHALE", "HOLD", "EXHALE", "RELAX"],
        conflicts_with = "preset"
    )]
    pub custom: Option<Vec<u32>>,

    /// Saved preset name
    #[arg(long)]
    pub preset: Option<String>,
}

impl SelectionArgs {
    /// Build the selection, printing any policy notice to stderr.
    pub fn selection(&self, config: &Config) -> Result<Selection, Box<dyn std::error::Error>> {
        let mode = if let Some(name) = &self.preset {
            let db = Database::open()?;
            db.get_preset(name)?
                .ok_or_else(|| PresetError::NotFound(name.clone()))?
                .into_mode()
        } else if let Some(values) = &self.custom {
            let durations = match values.as_slice() {
                [] => config.custom_pattern()?,
                [inhale, hold, exhale, relax] => {
                    PatternDurations::new(*inhale, *hold, *exhale, *relax)?
                }
                _ => return Err("--custom takes four values or none".into()),
            };
            Mode::custom(durations)
        } else {
            Mode::tier(self.tier.unwrap_or(config.session.tier))
        };

        let nadi = !self.no_nadi && (self.nadi || config.session.nadi);
        let (selection, notice) = Selection::new(mode, nadi)?;
        // The configured default is silently dropped for custom patterns.
        if let Some(notice) = notice.filter(|_| self.nadi) {
            eprintln!("note: {notice}");
        }
        Ok(selection)
    }
}
