//! Wizard structure document: entry point, page order, fields and selectors.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{is_valid_field_id, is_valid_wizard_id};

/// How the engine touches a located element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InteractionKind {
    /// Clear and type the value
    Fill,
    /// Native click
    Click,
    /// Pick an option from a dropdown
    Select,
    /// Type the value then press Enter (typeahead inputs)
    #[serde(alias = "fill_enter")]
    FillThenSubmit,
    /// Click dispatched from page script, for visually hidden inputs
    #[serde(alias = "javascript_click")]
    ScriptClick,
}

impl InteractionKind {
    /// Whether the interaction consumes a value (as opposed to a bare click).
    pub fn takes_value(self) -> bool {
        matches!(
            self,
            InteractionKind::Fill | InteractionKind::Select | InteractionKind::FillThenSubmit
        )
    }

    pub fn is_click(self) -> bool {
        matches!(self, InteractionKind::Click | InteractionKind::ScriptClick)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InteractionKind::Fill => "fill",
            InteractionKind::Click => "click",
            InteractionKind::Select => "select",
            InteractionKind::FillThenSubmit => "fill-then-submit",
            InteractionKind::ScriptClick => "script-click",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_action_kind() -> InteractionKind {
    InteractionKind::Click
}

/// Shape of the value a field expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueKind {
    #[default]
    Text,
    Number,
    SingleChoice,
    MultiChoice,
    DatePart,
}

/// One option of a radio group or dropdown.
///
/// Radio groups usually expose one input per option; such options carry their
/// own selector and are clicked instead of the field selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePart {
    Month,
    Day,
    Year,
}

/// Marks a field as one component of a composite date supplied under `source`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatePartSpec {
    pub source: String,
    pub part: DatePart,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub field_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub selector: String,
    #[serde(alias = "interaction")]
    pub interaction_kind: InteractionKind,
    #[serde(default)]
    pub value_kind: ValueKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_set: Option<Vec<Choice>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_part: Option<DatePartSpec>,
}

impl FieldSpec {
    pub fn choice(&self, value: &str) -> Option<&Choice> {
        self.choice_set
            .as_ref()
            .and_then(|choices| choices.iter().find(|choice| choice.value == value))
    }
}

/// Start and continue actions: a selector plus how to trigger it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub selector: String,
    #[serde(default = "default_action_kind", alias = "interaction")]
    pub interaction_kind: InteractionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ActionSpec {
    pub fn click(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            interaction_kind: InteractionKind::Click,
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    pub page_number: u32,
    #[serde(default)]
    pub page_title: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(alias = "continue_button")]
    pub continue_action: ActionSpec,
}

/// A value read from the final page once the wizard completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub name: String,
    pub selector: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardStructure {
    pub wizard_id: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_action: Option<ActionSpec>,
    pub pages: Vec<PageSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<OutputSpec>,
}

/// A single defect found while checking a wizard structure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureProblem {
    #[error("wizard_id '{0}' must match ^[a-z0-9-]+$")]
    WizardId(String),
    #[error("url '{0}' is not an http(s) URL")]
    Url(String),
    #[error("wizard has no pages")]
    NoPages,
    #[error("page at position {position} has page_number {found}, expected {expected}")]
    PageNumber {
        position: usize,
        found: u32,
        expected: u32,
    },
    #[error("total_pages {declared} does not match {actual} pages")]
    TotalPages { declared: u32, actual: usize },
    #[error("field_id '{0}' must match ^[a-z_][a-z0-9_]*$")]
    FieldId(String),
    #[error("field_id '{field_id}' appears more than once (again on page {page})")]
    DuplicateField { field_id: String, page: u32 },
    #[error("empty selector on {0}")]
    EmptySelector(String),
    #[error("field '{0}' declares date_part but its value_kind is not date-part")]
    DatePartKind(String),
    #[error("field '{field_id}' has an empty choice value")]
    EmptyChoice { field_id: String },
}

#[derive(Debug, Error)]
pub enum StructureError {
    #[error("failed to parse wizard structure: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("wizard structure '{wizard_id}' is invalid: {}", join_problems(.problems))]
    Invalid {
        wizard_id: String,
        problems: Vec<StructureProblem>,
    },
}

fn join_problems(problems: &[StructureProblem]) -> String {
    problems
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl WizardStructure {
    /// Parse and check a wizard structure document.
    pub fn from_json(raw: &str) -> Result<Self, StructureError> {
        let structure: WizardStructure = serde_json::from_str(raw)?;
        structure.validate()?;
        Ok(structure)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Every field in declared page and field order.
    pub fn fields(&self) -> impl Iterator<Item = (&PageSpec, &FieldSpec)> {
        self.pages
            .iter()
            .flat_map(|page| page.fields.iter().map(move |field| (page, field)))
    }

    pub fn field(&self, field_id: &str) -> Option<&FieldSpec> {
        self.fields()
            .map(|(_, field)| field)
            .find(|field| field.field_id == field_id)
    }

    pub fn page(&self, page_number: u32) -> Option<&PageSpec> {
        self.pages.iter().find(|page| page.page_number == page_number)
    }

    /// Load-time checks. All problems are collected before returning.
    pub fn validate(&self) -> Result<(), StructureError> {
        let mut problems = Vec::new();

        if !is_valid_wizard_id(&self.wizard_id) {
            problems.push(StructureProblem::WizardId(self.wizard_id.clone()));
        }

        match url::Url::parse(&self.url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => problems.push(StructureProblem::Url(self.url.clone())),
        }

        if self.pages.is_empty() {
            problems.push(StructureProblem::NoPages);
        }

        if let Some(declared) = self.total_pages {
            if declared as usize != self.pages.len() {
                problems.push(StructureProblem::TotalPages {
                    declared,
                    actual: self.pages.len(),
                });
            }
        }

        if let Some(start) = &self.start_action {
            if start.selector.trim().is_empty() {
                problems.push(StructureProblem::EmptySelector("start_action".into()));
            }
        }

        let mut seen = HashSet::new();
        for (position, page) in self.pages.iter().enumerate() {
            let expected = position as u32 + 1;
            if page.page_number != expected {
                problems.push(StructureProblem::PageNumber {
                    position,
                    found: page.page_number,
                    expected,
                });
            }

            if page.continue_action.selector.trim().is_empty() {
                problems.push(StructureProblem::EmptySelector(format!(
                    "continue_action of page {}",
                    page.page_number
                )));
            }

            for field in &page.fields {
                if !is_valid_field_id(&field.field_id) {
                    problems.push(StructureProblem::FieldId(field.field_id.clone()));
                }
                if !seen.insert(field.field_id.as_str()) {
                    problems.push(StructureProblem::DuplicateField {
                        field_id: field.field_id.clone(),
                        page: page.page_number,
                    });
                }
                if field.selector.trim().is_empty() {
                    problems.push(StructureProblem::EmptySelector(format!(
                        "field '{}'",
                        field.field_id
                    )));
                }
                if field.date_part.is_some() && field.value_kind != ValueKind::DatePart {
                    problems.push(StructureProblem::DatePartKind(field.field_id.clone()));
                }
                if let Some(choices) = &field.choice_set {
                    if choices.iter().any(|choice| choice.value.is_empty()) {
                        problems.push(StructureProblem::EmptyChoice {
                            field_id: field.field_id.clone(),
                        });
                    }
                }
            }
        }

        for output in &self.outputs {
            if output.selector.trim().is_empty() {
                problems.push(StructureProblem::EmptySelector(format!(
                    "output '{}'",
                    output.name
                )));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(StructureError::Invalid {
                wizard_id: self.wizard_id.clone(),
                problems,
            })
        }
    }
}
