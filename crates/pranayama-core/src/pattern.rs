//! Breathing patterns and the pattern-resolution policy.
//!
//! A [`Mode`] (difficulty tier, custom values or a saved preset) plus the
//! alternate-nostril toggle resolves to concrete [`PatternDurations`].
//!
//! ## Resolution rules
//!
//! ```text
//! Custom | SavedPreset      -> stored durations, alternate-nostril forced off
//! Tier + alternate-nostril  -> Nadi Shodhana ratio table
//! Tier                      -> base tier table
//! ```
//!
//! [`Selection`] is the policy boundary in front of [`resolve`]: it refuses to
//! hold an alternate-nostril flag that the active mode cannot honour, so the
//! toggle a UI shows never disagrees with what the engine does.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A respiratory phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Inhale,
    Hold,
    Exhale,
    Relax,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Inhale => "Inhale",
            Phase::Hold => "Hold",
            Phase::Exhale => "Exhale",
            Phase::Relax => "Relax",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase lengths in whole seconds.
///
/// `hold == 0` is a valid "skip hold" pattern. At least one phase must be
/// non-zero for a session to advance; see [`PatternDurations::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PatternDurations {
    pub inhale: u32,
    pub hold: u32,
    pub exhale: u32,
    pub relax: u32,
}

impl PatternDurations {
    /// Build a validated pattern.
    pub fn new(inhale: u32, hold: u32, exhale: u32, relax: u32) -> Result<Self, ValidationError> {
        let durations = Self {
            inhale,
            hold,
            exhale,
            relax,
        };
        durations.validate()?;
        Ok(durations)
    }

    /// Fails with [`ValidationError::EmptyPattern`] when every phase is zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.total_secs() == 0 {
            return Err(ValidationError::EmptyPattern);
        }
        Ok(())
    }

    /// Duration of `phase` in seconds.
    pub fn get(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Inhale => self.inhale,
            Phase::Hold => self.hold,
            Phase::Exhale => self.exhale,
            Phase::Relax => self.relax,
        }
    }

    pub fn total_secs(&self) -> u64 {
        self.inhale as u64 + self.hold as u64 + self.exhale as u64 + self.relax as u64
    }

    /// `"8-16-8"`: inhale, hold, exhale.
    pub fn short_label(&self) -> String {
        format!("{}-{}-{}", self.inhale, self.hold, self.exhale)
    }

    /// `"8-16-8-10"`: all four phases.
    pub fn full_label(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.inhale, self.hold, self.exhale, self.relax
        )
    }

    /// `"4:4:8"`, or `"4:8"` when the hold is skipped.
    pub fn ratio_label(&self) -> String {
        let mut parts = vec![self.inhale.to_string()];
        if self.hold > 0 {
            parts.push(self.hold.to_string());
        }
        parts.push(self.exhale.to_string());
        parts.join(":")
    }
}

/// Built-in difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Easy,
    Medium,
    Hard,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Easy, Tier::Medium, Tier::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Easy => "easy",
            Tier::Medium => "medium",
            Tier::Hard => "hard",
        }
    }

    /// Traditional name of the tier.
    pub fn sanskrit_name(&self) -> &'static str {
        match self {
            Tier::Easy => "Adhama",
            Tier::Medium => "Madhyama",
            Tier::Hard => "Uttama",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tier::Easy => {
                "A gentle introduction to breath retention. Helps reduce anxiety and \
                 activates the parasympathetic nervous system."
            }
            Tier::Medium => {
                "Increases lung capacity and focus. The longer hold builds CO2 tolerance, \
                 calming the mind deeply."
            }
            Tier::Hard => {
                "For experienced practitioners. The extended hold (64s) triggers deep \
                 meditative states and high energy efficiency."
            }
        }
    }

    /// Standard four-phase table.
    pub fn base_pattern(&self) -> PatternDurations {
        match self {
            Tier::Easy => PatternDurations {
                inhale: 8,
                hold: 16,
                exhale: 8,
                relax: 10,
            },
            Tier::Medium => PatternDurations {
                inhale: 16,
                hold: 32,
                exhale: 22,
                relax: 10,
            },
            Tier::Hard => PatternDurations {
                inhale: 16,
                hold: 64,
                exhale: 32,
                relax: 10,
            },
        }
    }

    /// Alternate-nostril (Nadi Shodhana) ratio table.
    pub fn nadi_pattern(&self) -> PatternDurations {
        match self {
            Tier::Easy => PatternDurations {
                inhale: 4,
                hold: 0,
                exhale: 4,
                relax: 0,
            },
            Tier::Medium => PatternDurations {
                inhale: 4,
                hold: 4,
                exhale: 8,
                relax: 0,
            },
            Tier::Hard => PatternDurations {
                inhale: 4,
                hold: 16,
                exhale: 8,
                relax: 0,
            },
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" | "adhama" => Ok(Tier::Easy),
            "medium" | "madhyama" => Ok(Tier::Medium),
            "hard" | "uttama" => Ok(Tier::Hard),
            other => Err(ValidationError::UnknownTier(other.to_string())),
        }
    }
}

/// A saved custom pattern. Storage owns these; the engine only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(flatten)]
    pub durations: PatternDurations,
}

impl Preset {
    pub fn into_mode(self) -> Mode {
        Mode::SavedPreset {
            name: self.name,
            durations: self.durations,
        }
    }
}

/// The active rhythm source. Exactly one is active at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mode {
    Tier { tier: Tier },
    Custom { durations: PatternDurations },
    SavedPreset {
        name: String,
        durations: PatternDurations,
    },
}

impl Mode {
    pub fn tier(tier: Tier) -> Self {
        Mode::Tier { tier }
    }

    pub fn custom(durations: PatternDurations) -> Self {
        Mode::Custom { durations }
    }

    /// True for `Custom` and `SavedPreset`.
    pub fn is_custom_or_preset(&self) -> bool {
        !matches!(self, Mode::Tier { .. })
    }

    /// Label used when the mode refuses alternate-nostril breathing.
    pub fn context_label(&self) -> String {
        match self {
            Mode::Tier { tier } => tier.sanskrit_name().to_string(),
            Mode::Custom { .. } => "Custom".to_string(),
            Mode::SavedPreset { name, .. } => format!("Saved Preset ({name})"),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Mode::Tier { .. } => Ok(()),
            Mode::Custom { durations } | Mode::SavedPreset { durations, .. } => {
                durations.validate()
            }
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::tier(Tier::Easy)
    }
}

/// Output of [`resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub durations: PatternDurations,
    /// Whether the alternate-nostril cycle is in effect.
    pub nostril_active: bool,
}

/// Map a mode and the requested alternate-nostril flag to concrete durations.
pub fn resolve(mode: &Mode, nostril_requested: bool) -> Resolution {
    match mode {
        Mode::Custom { durations } | Mode::SavedPreset { durations, .. } => Resolution {
            durations: *durations,
            nostril_active: false,
        },
        Mode::Tier { tier } if nostril_requested => Resolution {
            durations: tier.nadi_pattern(),
            nostril_active: true,
        },
        Mode::Tier { tier } => Resolution {
            durations: tier.base_pattern(),
            nostril_active: false,
        },
    }
}

/// Outcome of a selection change that the caller must surface to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PolicyNotice {
    /// Alternate-nostril breathing was switched off because the active mode
    /// (custom values or a saved preset) does not support it.
    NostrilDisallowedInMode { context: String },
}

impl fmt::Display for PolicyNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyNotice::NostrilDisallowedInMode { context } => write!(
                f,
                "Nadi Shodhana is disabled for Custom & Saved Presets (using {context}). \
                 Switch to Easy / Medium / Hard to enable it."
            ),
        }
    }
}

/// Current mode plus the alternate-nostril toggle, kept consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    mode: Mode,
    nostril: bool,
}

impl Selection {
    /// Build a selection, applying the same policy as the setters.
    pub fn new(mode: Mode, nostril: bool) -> Result<(Self, Option<PolicyNotice>), ValidationError> {
        mode.validate()?;
        let mut selection = Self {
            mode,
            nostril: false,
        };
        let notice = selection.set_nostril(nostril);
        Ok((selection, notice))
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// The toggle as it should be displayed; always equal to the effective flag.
    pub fn nostril(&self) -> bool {
        self.nostril
    }

    /// Request the alternate-nostril toggle.
    ///
    /// Under `Custom`/`SavedPreset` an enable request is refused: the flag
    /// stays off and a notice is returned.
    pub fn set_nostril(&mut self, requested: bool) -> Option<PolicyNotice> {
        if requested && self.mode.is_custom_or_preset() {
            self.nostril = false;
            return Some(PolicyNotice::NostrilDisallowedInMode {
                context: self.mode.context_label(),
            });
        }
        self.nostril = requested;
        None
    }

    /// Switch mode. Moving to `Custom`/`SavedPreset` with the toggle on turns
    /// it off and returns a notice.
    pub fn select_mode(&mut self, mode: Mode) -> Result<Option<PolicyNotice>, ValidationError> {
        mode.validate()?;
        self.mode = mode;
        if self.nostril && self.mode.is_custom_or_preset() {
            self.nostril = false;
            return Ok(Some(PolicyNotice::NostrilDisallowedInMode {
                context: self.mode.context_label(),
            }));
        }
        Ok(None)
    }

    pub fn resolve(&self) -> Resolution {
        resolve(&self.mode, self.nostril)
    }

    /// Human-readable description of the active pattern.
    pub fn display_label(&self) -> String {
        let resolution = self.resolve();
        if resolution.nostril_active {
            return format!("NADI SHODHANA ({})", resolution.durations.ratio_label());
        }
        match &self.mode {
            Mode::Tier { tier } => format!(
                "{} ({})",
                tier.sanskrit_name(),
                resolution.durations.full_label()
            ),
            Mode::Custom { durations } => format!("Custom ({})", durations.short_label()),
            Mode::SavedPreset { name, durations } => {
                format!("{name} ({})", durations.short_label())
            }
        }
    }

    /// Label stored on session records.
    pub fn record_label(&self) -> String {
        let label = self.display_label();
        if self.resolve().nostril_active {
            format!("{label} (Nadi Shodhana)")
        } else {
            label
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            nostril: false,
        }
    }
}
