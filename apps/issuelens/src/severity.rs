//! Severity translation.
//!
//! - `map_eslint_severity`: engine-native level to the shared scale.
//! - `presentation`: shared severity to display priority, prefix and icon.
//!
//! The tree view and the diagnostics surface both read `presentation`, so an
//! issue always looks the same in both places.

use crate::models::eslint::NativeLevel;
use crate::models::Severity;
use serde::Serialize;

/// Engine level to shared severity. `2`/`"error"` is CRITICAL, `1`/`"warn"`
/// is MAJOR, everything else is INFO. Never yields BLOCKER or MINOR.
pub fn map_eslint_severity(level: Option<&NativeLevel>) -> Severity {
    match level {
        Some(NativeLevel::Code(2)) => Severity::Critical,
        Some(NativeLevel::Code(1)) => Severity::Major,
        Some(NativeLevel::Name(name)) if name == "error" => Severity::Critical,
        Some(NativeLevel::Name(name)) if name == "warn" => Severity::Major,
        _ => Severity::Info,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
/// Display priority shared by tree icons and diagnostics. Ordered most
/// urgent first.
pub enum DisplayPriority {
    Error,
    Warning,
    Information,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Presentation {
    pub priority: DisplayPriority,
    /// Prefix for diagnostic messages, e.g. `CRITICAL: ...`.
    pub prefix: &'static str,
    /// Icon class for tree items.
    pub icon: &'static str,
}

const fn entry(priority: DisplayPriority, prefix: &'static str) -> Presentation {
    let icon = match priority {
        DisplayPriority::Error => "error",
        DisplayPriority::Warning => "warning",
        DisplayPriority::Information => "info",
    };
    Presentation {
        priority,
        prefix,
        icon,
    }
}

pub fn presentation(severity: Severity) -> Presentation {
    match severity {
        Severity::Blocker => entry(DisplayPriority::Error, "BLOCKER"),
        Severity::Critical => entry(DisplayPriority::Error, "CRITICAL"),
        Severity::Major => entry(DisplayPriority::Warning, "MAJOR"),
        Severity::Minor => entry(DisplayPriority::Information, "MINOR"),
        Severity::Info => entry(DisplayPriority::Information, "INFO"),
    }
}

/// Same as `presentation` for a raw label; unknown labels are informational.
pub fn presentation_for_label(label: &str) -> Presentation {
    match label.parse::<Severity>() {
        Ok(sev) => presentation(sev),
        Err(_) => entry(DisplayPriority::Information, "INFO"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eslint_mapping_is_total() {
        assert_eq!(map_eslint_severity(Some(&NativeLevel::Code(2))), Severity::Critical);
        assert_eq!(
            map_eslint_severity(Some(&NativeLevel::Name("error".into()))),
            Severity::Critical
        );
        assert_eq!(map_eslint_severity(Some(&NativeLevel::Code(1))), Severity::Major);
        assert_eq!(
            map_eslint_severity(Some(&NativeLevel::Name("warn".into()))),
            Severity::Major
        );
        for other in [
            Some(NativeLevel::Code(0)),
            Some(NativeLevel::Code(3)),
            Some(NativeLevel::Code(-1)),
            Some(NativeLevel::Name("off".into())),
            Some(NativeLevel::Name("ERROR".into())),
            None,
        ] {
            assert_eq!(map_eslint_severity(other.as_ref()), Severity::Info);
        }
    }

    #[test]
    fn test_eslint_mapping_never_blocker_or_minor() {
        let inputs = (-2..5)
            .map(NativeLevel::Code)
            .chain(["error", "warn", "info", ""].map(|s| NativeLevel::Name(s.into())));
        for level in inputs {
            let sev = map_eslint_severity(Some(&level));
            assert!(sev != Severity::Blocker && sev != Severity::Minor);
        }
    }

    #[test]
    fn test_presentation_priorities() {
        assert_eq!(presentation(Severity::Blocker).priority, DisplayPriority::Error);
        assert_eq!(presentation(Severity::Critical).priority, DisplayPriority::Error);
        assert_eq!(presentation(Severity::Major).priority, DisplayPriority::Warning);
        assert_eq!(presentation(Severity::Minor).priority, DisplayPriority::Information);
        assert_eq!(presentation(Severity::Info).icon, "info");
        assert_eq!(presentation(Severity::Critical).prefix, "CRITICAL");
    }

    #[test]
    fn test_unknown_label_is_informational() {
        let p = presentation_for_label("SEVERE");
        assert_eq!(p.priority, DisplayPriority::Information);
        assert_eq!(presentation_for_label("major").priority, DisplayPriority::Warning);
    }
}
