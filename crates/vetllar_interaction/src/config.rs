//! # Interaction Configuration
//!
//! Two kinds of configuration:
//!
//! - [`InteractiveConfig`]: how an interaction behaves. Shared by many
//!   interactables through an `Arc`, never mutated at runtime.
//! - [`InteractorSettings`]: how an interactor scans for targets.
//!
//! Both are loaded once at startup from TOML:
//!
//! ```toml
//! [interactive.lever]
//! interaction_time = 1.5
//! hold = true
//!
//! [interactor.player]
//! trace_mode = "cursor_from_viewpoint"
//! scan_interval = 0.1
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use vetllar_core::EntityId;

use crate::error::{InteractionError, InteractionOutcome};
use crate::types::TraceMode;

/// Default interval between focus scans, in seconds.
pub const DEFAULT_SCAN_INTERVAL: f32 = 0.25;

/// Default sweep distance.
pub const DEFAULT_INTERACTION_DISTANCE: f32 = 100.0;

/// Default sweep radius.
pub const DEFAULT_INTERACTION_RADIUS: f32 = 100.0;

/// Game-specific prerequisite logic attached to an interactive config.
///
/// Keep implementations cheap: they run on every scan for every candidate.
pub trait PrerequisiteCheck: Send + Sync {
    /// May `interactor` focus on the interactable?
    fn can_be_focused_on(&self, interactor: EntityId) -> bool;

    /// May `interactor` interact with the interactable?
    fn can_be_interacted_with(&self, interactor: EntityId) -> bool;
}

/// How an interaction behaves.
#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InteractiveConfig {
    /// Identifies the interaction. Informational only.
    pub interaction_name: String,
    /// Verb shown in prompts, e.g. "Press E to Interact".
    pub action_name: String,
    /// Seconds to complete. `0` or less means instant.
    pub interaction_time: f32,
    /// The input must be held until completion and may be released to
    /// cancel. Ignored for instant interactions.
    #[serde(rename = "hold")]
    pub is_hold_interaction: bool,
    /// Hide the interactable from focus when the prerequisite would refuse
    /// the interaction, instead of showing it as focusable.
    pub unavailable_if_prerequisites_not_met: bool,
    /// Optional prerequisite logic.
    #[serde(skip)]
    pub prerequisite: Option<Arc<dyn PrerequisiteCheck>>,
}

impl Default for InteractiveConfig {
    fn default() -> Self {
        Self {
            interaction_name: String::new(),
            action_name: "Interact".to_owned(),
            interaction_time: 0.0,
            is_hold_interaction: false,
            unavailable_if_prerequisites_not_met: false,
            prerequisite: None,
        }
    }
}

impl std::fmt::Debug for InteractiveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractiveConfig")
            .field("interaction_name", &self.interaction_name)
            .field("action_name", &self.action_name)
            .field("interaction_time", &self.interaction_time)
            .field("is_hold_interaction", &self.is_hold_interaction)
            .field(
                "unavailable_if_prerequisites_not_met",
                &self.unavailable_if_prerequisites_not_met,
            )
            .field("prerequisite", &self.prerequisite.is_some())
            .finish()
    }
}

impl InteractiveConfig {
    /// An instant interaction.
    #[must_use]
    pub fn instant() -> Self {
        Self::default()
    }

    /// A timed interaction that completes on its own.
    #[must_use]
    pub fn timed(interaction_time: f32) -> Self {
        Self {
            interaction_time,
            ..Self::default()
        }
    }

    /// A timed interaction that must be held and can be released to cancel.
    #[must_use]
    pub fn hold(interaction_time: f32) -> Self {
        Self {
            interaction_time,
            is_hold_interaction: true,
            ..Self::default()
        }
    }

    /// Attaches prerequisite logic.
    #[must_use]
    pub fn with_prerequisite(mut self, check: Arc<dyn PrerequisiteCheck>) -> Self {
        self.prerequisite = Some(check);
        self
    }

    /// True when the interaction completes synchronously on start.
    #[inline]
    #[must_use]
    pub fn is_instant(&self) -> bool {
        self.interaction_time <= 0.0
    }

    /// True for timed interactions that can be cancelled by releasing input.
    #[inline]
    #[must_use]
    pub fn is_cancellable(&self) -> bool {
        !self.is_instant() && self.is_hold_interaction
    }

    /// Checks values that cannot be expressed in the type.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::InvalidConfig`] for a non-finite time.
    pub fn validate(&self) -> InteractionOutcome<()> {
        if !self.interaction_time.is_finite() {
            return Err(InteractionError::InvalidConfig(format!(
                "interaction '{}': interaction_time must be finite",
                self.interaction_name
            )));
        }
        Ok(())
    }
}

/// How an interactor scans for targets.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InteractorSettings {
    /// Which scan runs and on which side.
    pub trace_mode: TraceMode,
    /// Sweep length for [`TraceMode::SweepFromOwner`].
    pub interaction_distance: f32,
    /// Sweep radius for [`TraceMode::SweepFromOwner`].
    pub interaction_radius: f32,
    /// Seconds between focus scans.
    pub scan_interval: f32,
    /// Log every scan hit at `trace` level.
    pub show_debug_messages: bool,
}

impl Default for InteractorSettings {
    fn default() -> Self {
        Self {
            trace_mode: TraceMode::SweepFromOwner,
            interaction_distance: DEFAULT_INTERACTION_DISTANCE,
            interaction_radius: DEFAULT_INTERACTION_RADIUS,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            show_debug_messages: false,
        }
    }
}

impl InteractorSettings {
    /// Settings for a cursor-driven interactor.
    #[must_use]
    pub fn cursor() -> Self {
        Self {
            trace_mode: TraceMode::CursorFromViewpoint,
            ..Self::default()
        }
    }

    /// Checks ranges.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::InvalidConfig`] for negative sweep
    /// dimensions or a non-positive scan interval.
    pub fn validate(&self) -> InteractionOutcome<()> {
        let non_negative = |v: f32| v.is_finite() && v >= 0.0;
        if !non_negative(self.interaction_distance) || !non_negative(self.interaction_radius) {
            return Err(InteractionError::InvalidConfig(
                "interaction_distance and interaction_radius must be non-negative".to_owned(),
            ));
        }
        if !self.scan_interval.is_finite() || self.scan_interval <= 0.0 {
            return Err(InteractionError::InvalidConfig(
                "scan_interval must be a positive number of seconds".to_owned(),
            ));
        }
        Ok(())
    }
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    interactive: HashMap<String, InteractiveConfig>,
    interactor: HashMap<String, InteractorSettings>,
}

/// Named configs, loaded once and handed out by reference.
#[derive(Default)]
pub struct ConfigLibrary {
    interactives: HashMap<String, Arc<InteractiveConfig>>,
    interactors: HashMap<String, InteractorSettings>,
}

impl ConfigLibrary {
    /// Creates an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::InvalidConfig`] on a syntax error, an
    /// unknown key, or a value that fails validation.
    pub fn from_toml_str(source: &str) -> InteractionOutcome<Self> {
        let file: ConfigFile =
            toml::from_str(source).map_err(|e| InteractionError::InvalidConfig(e.to_string()))?;

        let mut library = Self::new();
        for (name, mut config) in file.interactive {
            if config.interaction_name.is_empty() {
                config.interaction_name.clone_from(&name);
            }
            config.validate()?;
            library.interactives.insert(name, Arc::new(config));
        }
        for (name, settings) in file.interactor {
            settings.validate()?;
            library.interactors.insert(name, settings);
        }

        tracing::debug!(
            interactives = library.interactives.len(),
            interactors = library.interactors.len(),
            "interaction config loaded"
        );
        Ok(library)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::InvalidConfig`] if the file cannot be
    /// read or parsed.
    pub fn load(path: impl AsRef<std::path::Path>) -> InteractionOutcome<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| InteractionError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Registers a config built in code.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::InvalidConfig`] if validation fails.
    pub fn insert_interactive(
        &mut self,
        name: impl Into<String>,
        config: InteractiveConfig,
    ) -> InteractionOutcome<Arc<InteractiveConfig>> {
        config.validate()?;
        let config = Arc::new(config);
        self.interactives.insert(name.into(), Arc::clone(&config));
        Ok(config)
    }

    /// Attaches prerequisite logic to a named config.
    ///
    /// Must happen before the config is handed to interactables: those keep
    /// the `Arc` they were given.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::InvalidConfig`] if no such config exists.
    pub fn attach_prerequisite(
        &mut self,
        name: &str,
        check: Arc<dyn PrerequisiteCheck>,
    ) -> InteractionOutcome<()> {
        let config = self
            .interactives
            .get_mut(name)
            .ok_or_else(|| InteractionError::InvalidConfig(format!("unknown interactive '{name}'")))?;
        Arc::make_mut(config).prerequisite = Some(check);
        Ok(())
    }

    /// Looks up a shared interactive config.
    #[must_use]
    pub fn interactive(&self, name: &str) -> Option<Arc<InteractiveConfig>> {
        self.interactives.get(name).cloned()
    }

    /// Looks up interactor settings.
    #[must_use]
    pub fn interactor(&self, name: &str) -> Option<&InteractorSettings> {
        self.interactors.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Never;

    impl PrerequisiteCheck for Never {
        fn can_be_focused_on(&self, _: EntityId) -> bool {
            false
        }
        fn can_be_interacted_with(&self, _: EntityId) -> bool {
            false
        }
    }

    const SAMPLE: &str = r#"
        [interactive.door]
        action_name = "Open"

        [interactive.lever]
        interaction_time = 1.5
        hold = true

        [interactor.player]
        trace_mode = "cursor_from_viewpoint"
        scan_interval = 0.1
    "#;

    #[test]
    fn test_parse_library() {
        let library = ConfigLibrary::from_toml_str(SAMPLE).unwrap();

        let door = library.interactive("door").unwrap();
        assert!(door.is_instant());
        assert_eq!(door.action_name, "Open");
        assert_eq!(door.interaction_name, "door");

        let lever = library.interactive("lever").unwrap();
        assert!(lever.is_cancellable());
        assert_eq!(lever.action_name, "Interact");

        let player = library.interactor("player").unwrap();
        assert_eq!(player.trace_mode, TraceMode::CursorFromViewpoint);
        assert_eq!(player.interaction_distance, DEFAULT_INTERACTION_DISTANCE);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ConfigLibrary::from_toml_str("[interactive.x]\nspeed = 3\n");
        assert!(matches!(err, Err(InteractionError::InvalidConfig(_))));
    }

    #[test]
    fn test_bad_scan_interval_rejected() {
        let err = ConfigLibrary::from_toml_str("[interactor.x]\nscan_interval = 0.0\n");
        assert!(matches!(err, Err(InteractionError::InvalidConfig(_))));
    }

    #[test]
    fn test_attach_prerequisite() {
        let mut library = ConfigLibrary::from_toml_str(SAMPLE).unwrap();
        library.attach_prerequisite("door", Arc::new(Never)).unwrap();
        assert!(library.interactive("door").unwrap().prerequisite.is_some());
        assert!(library.attach_prerequisite("missing", Arc::new(Never)).is_err());
    }

    #[test]
    fn test_non_hold_timed_is_not_cancellable() {
        assert!(!InteractiveConfig::timed(2.0).is_cancellable());
        assert!(!InteractiveConfig::instant().is_cancellable());
        assert!(!InteractiveConfig::hold(0.0).is_cancellable());
    }
}
