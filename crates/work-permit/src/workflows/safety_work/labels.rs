use std::sync::Arc;

use super::options::{OptionKind, OptionRegistry, NO_HAZARD};
use super::schedule::{TimeSlot, WorkDuration};

/// Delimiter between hazard labels in every display string the service produces or reads.
pub const HAZARD_SEPARATOR: char = '，';

/// Code/label conversions used at the submission and query boundaries.
///
/// Every conversion is total. Unknown codes pass through unchanged and unknown labels map to an
/// empty code, so a stale option list never blocks a write.
#[derive(Debug, Clone)]
pub struct LabelConverter {
    registry: Arc<OptionRegistry>,
}

impl LabelConverter {
    pub fn new(registry: Arc<OptionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &OptionRegistry {
        &self.registry
    }

    pub fn label(&self, kind: OptionKind, code: &str) -> String {
        self.registry.label_of(kind, code).to_string()
    }

    pub fn code(&self, kind: OptionKind, label: &str) -> String {
        self.registry.code_of(kind, label).to_string()
    }

    /// Work content is scoped by work type, so the work-type code must be resolved first.
    pub fn work_content_label(&self, work_type: &str, code: &str) -> String {
        self.registry
            .work_content_label_of(work_type, code)
            .to_string()
    }

    pub fn work_content_code(&self, work_type: &str, label: &str) -> String {
        self.registry
            .work_content_code_of(work_type, label)
            .to_string()
    }

    pub fn no_hazard_label(&self) -> String {
        self.label(OptionKind::HazardType, NO_HAZARD)
    }

    /// Join hazard labels with [`HAZARD_SEPARATOR`]. An empty selection, or one holding only the
    /// "none" code, renders as the "none" label.
    pub fn hazard_display(&self, codes: &[String]) -> String {
        let labels: Vec<&str> = codes
            .iter()
            .map(|code| code.trim())
            .filter(|code| !code.is_empty() && *code != NO_HAZARD)
            .map(|code| self.registry.label_of(OptionKind::HazardType, code))
            .collect();

        if labels.is_empty() {
            return self.no_hazard_label();
        }

        let separator = HAZARD_SEPARATOR.to_string();
        labels.join(&separator)
    }

    /// Split a hazard display string back into codes. The "none" label yields an empty list and
    /// labels without a matching option are dropped.
    pub fn hazard_codes(&self, display: &str) -> Vec<String> {
        let display = display.trim();
        if display.is_empty() || display == self.no_hazard_label() {
            return Vec::new();
        }

        display
            .split(HAZARD_SEPARATOR)
            .map(str::trim)
            .map(|label| self.registry.code_of(OptionKind::HazardType, label))
            .filter(|code| !code.is_empty() && *code != NO_HAZARD)
            .map(str::to_string)
            .collect()
    }

    pub fn time_slot_label(&self, code: &str) -> String {
        match code.trim() {
            "" => String::new(),
            code => match TimeSlot::ALL.into_iter().find(|slot| slot.code() == code) {
                Some(slot) => slot.label().to_string(),
                None => code.to_string(),
            },
        }
    }

    pub fn time_slot_code(&self, label: &str) -> String {
        TimeSlot::from_label(label)
            .map(|slot| slot.code().to_string())
            .unwrap_or_default()
    }

    pub fn duration_label(&self, code: &str) -> String {
        match WorkDuration::from_code(code) {
            Some(duration) => duration.label().to_string(),
            None => code.trim().to_string(),
        }
    }

    pub fn duration_code(&self, label: &str) -> String {
        WorkDuration::from_label(label)
            .map(|duration| duration.code().to_string())
            .unwrap_or_default()
    }
}

impl Default for LabelConverter {
    fn default() -> Self {
        Self::new(Arc::new(OptionRegistry::standard()))
    }
}
