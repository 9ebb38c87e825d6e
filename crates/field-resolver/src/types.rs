//! Resolved plan types

use serde::{Deserialize, Serialize};
use wizard_core_types::{ActionSpec, InteractionKind, OutputSpec};

/// One concrete interaction: where, how and with what.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAction {
    /// Source field, absent for start and continue actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    pub selector: String,
    pub interaction: InteractionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ResolvedAction {
    pub fn for_field(
        field_id: impl Into<String>,
        selector: impl Into<String>,
        interaction: InteractionKind,
        value: Option<String>,
    ) -> Self {
        Self {
            field_id: Some(field_id.into()),
            selector: selector.into(),
            interaction,
            value,
        }
    }

    /// Start or continue action, never carries a value
    pub fn control(spec: &ActionSpec) -> Self {
        Self {
            field_id: None,
            selector: spec.selector.clone(),
            interaction: spec.interaction_kind,
            value: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageActionSet {
    pub page_number: u32,
    #[serde(default)]
    pub page_title: String,
    /// Field actions in declared field order
    pub actions: Vec<ResolvedAction>,
    pub continue_action: ResolvedAction,
}

/// Everything the controller needs to drive one wizard run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPlan {
    pub wizard_id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_action: Option<ResolvedAction>,
    pub pages: Vec<PageActionSet>,
    #[serde(default)]
    pub outputs: Vec<OutputSpec>,
}

impl ResolvedPlan {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Number of field actions across all pages
    pub fn action_count(&self) -> usize {
        self.pages.iter().map(|page| page.actions.len()).sum()
    }

    pub fn last_page_number(&self) -> Option<u32> {
        self.pages.last().map(|page| page.page_number)
    }
}
