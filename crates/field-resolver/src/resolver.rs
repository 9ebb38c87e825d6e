//! Structure/contract join

use serde_json::Value;
use tracing::{debug, info};
use wizard_core_types::{
    DataContract, FieldSpec, InteractionKind, PageSpec, UserData, ValueKind, WizardStructure,
};

use crate::errors::{DriftFault, ResolveError};
use crate::types::{PageActionSet, ResolvedAction, ResolvedPlan};
use crate::values::{date_component, scalar_text};

/// Build the page-ordered action plan for one request.
///
/// Fields whose `field_id` has no contract property (and, for date parts, no
/// contract property for the composite source either) are invisible and
/// produce no action, whatever their `required` flag says. Contract
/// properties with no matching field are ignored. All drift faults are
/// collected before returning.
pub fn resolve(
    structure: &WizardStructure,
    contract: &DataContract,
    user_data: &UserData,
) -> Result<ResolvedPlan, ResolveError> {
    let mut faults = Vec::new();
    let mut pages = Vec::with_capacity(structure.pages.len());

    let mut ordered: Vec<&PageSpec> = structure.pages.iter().collect();
    ordered.sort_by_key(|page| page.page_number);

    for page in ordered {
        let mut actions = Vec::new();
        for field in &page.fields {
            if !is_visible(field, contract) {
                debug!(
                    wizard_id = %structure.wizard_id,
                    field_id = %field.field_id,
                    page = page.page_number,
                    "field has no contract property, skipping"
                );
                continue;
            }
            match resolve_field(page.page_number, field, user_data) {
                Ok(mut resolved) => actions.append(&mut resolved),
                Err(fault) => faults.push(fault),
            }
        }

        pages.push(PageActionSet {
            page_number: page.page_number,
            page_title: page.page_title.clone(),
            actions,
            continue_action: ResolvedAction::control(&page.continue_action),
        });
    }

    if !faults.is_empty() {
        info!(
            wizard_id = %structure.wizard_id,
            faults = faults.len(),
            "wizard structure drifted from contract"
        );
        return Err(ResolveError::Drift {
            wizard_id: structure.wizard_id.clone(),
            faults,
        });
    }

    let plan = ResolvedPlan {
        wizard_id: structure.wizard_id.clone(),
        url: structure.url.clone(),
        start_action: structure.start_action.as_ref().map(ResolvedAction::control),
        pages,
        outputs: structure.outputs.clone(),
    };
    debug!(
        wizard_id = %plan.wizard_id,
        pages = plan.page_count(),
        actions = plan.action_count(),
        "resolved action plan"
    );
    Ok(plan)
}

fn is_visible(field: &FieldSpec, contract: &DataContract) -> bool {
    contract.has_property(&field.field_id)
        || field
            .date_part
            .as_ref()
            .map(|spec| contract.has_property(&spec.source))
            .unwrap_or(false)
}

/// Value supplied for the field, or derived from its composite date source.
fn field_value(field: &FieldSpec, user_data: &UserData) -> Option<Value> {
    if let Some(value) = user_data.get(&field.field_id).filter(|v| !v.is_null()) {
        return Some(value.clone());
    }
    let spec = field.date_part.as_ref()?;
    let composite = user_data.get(&spec.source)?.as_str()?;
    date_component(composite, spec.part).map(Value::String)
}

fn resolve_field(
    page_number: u32,
    field: &FieldSpec,
    user_data: &UserData,
) -> Result<Vec<ResolvedAction>, DriftFault> {
    let Some(value) = field_value(field, user_data) else {
        if field.required {
            return Err(DriftFault::UnresolvedRequiredField {
                field_id: field.field_id.clone(),
                page_number,
            });
        }
        return Ok(Vec::new());
    };

    let unsupported = |reason: &str| DriftFault::UnsupportedValue {
        field_id: field.field_id.clone(),
        page_number,
        reason: reason.to_string(),
    };

    match (&value, field.value_kind) {
        (Value::Array(items), ValueKind::MultiChoice) => {
            let mut actions = Vec::with_capacity(items.len());
            for item in items {
                let text = scalar_text(item)
                    .ok_or_else(|| unsupported("multi-choice items must be scalars"))?;
                actions.push(single_action(page_number, field, text)?);
            }
            Ok(actions)
        }
        (Value::Array(_), _) => Err(unsupported("arrays only drive multi-choice fields")),
        (Value::Object(_), _) => Err(unsupported("objects cannot drive a field")),
        (Value::Bool(flag), _) if field.interaction_kind.is_click() => {
            if *flag {
                Ok(vec![ResolvedAction::for_field(
                    &field.field_id,
                    &field.selector,
                    field.interaction_kind,
                    None,
                )])
            } else {
                Ok(Vec::new())
            }
        }
        (scalar, _) => {
            let text = scalar_text(scalar).ok_or_else(|| unsupported("value is not a scalar"))?;
            Ok(vec![single_action(page_number, field, text)?])
        }
    }
}

fn single_action(
    page_number: u32,
    field: &FieldSpec,
    text: String,
) -> Result<ResolvedAction, DriftFault> {
    let choice = match &field.choice_set {
        Some(_) => Some(field.choice(&text).ok_or_else(|| DriftFault::UnknownChoice {
            field_id: field.field_id.clone(),
            page_number,
            value: text.clone(),
        })?),
        None => None,
    };

    if field.interaction_kind.is_click() {
        // A choice with its own selector is the radio input to press.
        let selector = choice
            .and_then(|choice| choice.selector.as_deref())
            .unwrap_or(&field.selector);
        return Ok(ResolvedAction::for_field(
            &field.field_id,
            selector,
            field.interaction_kind,
            None,
        ));
    }

    let value = match field.interaction_kind {
        InteractionKind::Fill | InteractionKind::Select | InteractionKind::FillThenSubmit => {
            Some(text)
        }
        InteractionKind::Click | InteractionKind::ScriptClick => None,
    };
    Ok(ResolvedAction::for_field(
        &field.field_id,
        &field.selector,
        field.interaction_kind,
        value,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wizard_core_types::{PropertySchema, ValueType};

    fn structure() -> WizardStructure {
        let doc = json!({
            "wizard_id": "fsa-estimator",
            "name": "FSA Student Aid Estimator",
            "url": "https://studentaid.gov/aid-estimator/",
            "start_action": { "selector": "text=Start Estimate" },
            "pages": [
                {
                    "page_number": 1,
                    "page_title": "Student Information",
                    "fields": [
                        {
                            "field_id": "birth_month",
                            "selector": "#dob_month",
                            "interaction_kind": "fill",
                            "value_kind": "date-part",
                            "required": true,
                            "date_part": { "source": "date_of_birth", "part": "month" }
                        },
                        {
                            "field_id": "birth_year",
                            "selector": "#dob_year",
                            "interaction_kind": "fill",
                            "value_kind": "date-part",
                            "required": true,
                            "date_part": { "source": "date_of_birth", "part": "year" }
                        },
                        {
                            "field_id": "ssn",
                            "selector": "#ssn",
                            "interaction_kind": "fill",
                            "required": true
                        },
                        {
                            "field_id": "marital_status",
                            "selector": "input[name=marital]",
                            "interaction_kind": "script-click",
                            "value_kind": "single-choice",
                            "choice_set": [
                                { "value": "unmarried", "selector": "#marital_unmarried" },
                                { "value": "married", "selector": "#marital_married" }
                            ]
                        }
                    ],
                    "continue_action": { "selector": "button[type=submit]" }
                },
                {
                    "page_number": 2,
                    "page_title": "Household",
                    "fields": [
                        {
                            "field_id": "state",
                            "selector": "#state",
                            "interaction_kind": "fill-then-submit",
                            "required": true
                        },
                        {
                            "field_id": "family_size",
                            "selector": "#family_size",
                            "interaction_kind": "fill",
                            "value_kind": "number"
                        },
                        {
                            "field_id": "has_savings",
                            "selector": "#savings_yes",
                            "interaction_kind": "click"
                        },
                        {
                            "field_id": "circumstances",
                            "selector": "#circumstances",
                            "interaction_kind": "click",
                            "value_kind": "multi-choice",
                            "choice_set": [
                                { "value": "orphan", "selector": "#c_orphan" },
                                { "value": "veteran", "selector": "#c_veteran" },
                                { "value": "none", "selector": "#c_none" }
                            ]
                        }
                    ],
                    "continue_action": { "selector": "#submit", "interaction_kind": "script-click" }
                }
            ]
        });
        WizardStructure::from_json(&doc.to_string()).unwrap()
    }

    fn contract() -> DataContract {
        DataContract::default()
            .with_property("birth_month", PropertySchema::of_type(ValueType::String))
            .with_property("birth_year", PropertySchema::of_type(ValueType::String))
            .with_property("date_of_birth", PropertySchema::of_type(ValueType::String))
            .with_property("marital_status", PropertySchema::of_type(ValueType::String))
            .with_property("state", PropertySchema::of_type(ValueType::String))
            .with_property("family_size", PropertySchema::of_type(ValueType::Integer))
            .with_property("has_savings", PropertySchema::of_type(ValueType::Boolean))
            .with_property("circumstances", PropertySchema::of_type(ValueType::Array))
            .with_property("annual_income", PropertySchema::of_type(ValueType::Number))
            .with_required(["state"])
    }

    fn data(value: Value) -> UserData {
        value.as_object().cloned().unwrap()
    }

    fn field_ids(page: &PageActionSet) -> Vec<&str> {
        page.actions
            .iter()
            .filter_map(|action| action.field_id.as_deref())
            .collect()
    }

    #[test]
    fn one_action_per_matching_field_in_declared_order() {
        let plan = resolve(
            &structure(),
            &contract(),
            &data(json!({
                "birth_month": "05",
                "birth_year": "2007",
                "marital_status": "unmarried",
                "state": "IL",
                "family_size": 4,
                "annual_income": 52000
            })),
        )
        .unwrap();

        assert_eq!(plan.page_count(), 2);
        assert_eq!(
            field_ids(&plan.pages[0]),
            vec!["birth_month", "birth_year", "marital_status"]
        );
        assert_eq!(field_ids(&plan.pages[1]), vec!["state", "family_size"]);
        assert_eq!(plan.pages[1].actions[1].value.as_deref(), Some("4"));
        assert_eq!(
            plan.start_action.as_ref().map(|a| a.selector.as_str()),
            Some("text=Start Estimate")
        );
        assert_eq!(plan.pages[1].continue_action.interaction, InteractionKind::ScriptClick);
        assert_eq!(plan.pages[1].continue_action.field_id, None);
    }

    #[test]
    fn field_without_contract_property_is_never_touched() {
        let plan = resolve(
            &structure(),
            &contract(),
            &data(json!({
                "birth_month": "05",
                "birth_year": "2007",
                "state": "IL",
                "ssn": "123-45-6789"
            })),
        )
        .unwrap();

        let all: Vec<_> = plan.pages.iter().flat_map(field_ids).collect();
        assert!(!all.contains(&"ssn"));
        assert!(plan
            .pages
            .iter()
            .flat_map(|page| page.actions.iter())
            .all(|action| action.selector != "#ssn"));
    }

    #[test]
    fn composite_date_is_split_into_parts() {
        let plan = resolve(
            &structure(),
            &contract(),
            &data(json!({"date_of_birth": "2007-05-09", "state": "IL"})),
        )
        .unwrap();
        let page = &plan.pages[0];
        assert_eq!(page.actions[0].value.as_deref(), Some("05"));
        assert_eq!(page.actions[1].value.as_deref(), Some("2007"));
    }

    #[test]
    fn explicit_part_wins_over_composite() {
        let plan = resolve(
            &structure(),
            &contract(),
            &data(json!({"date_of_birth": "2007-05-09", "birth_month": "06", "state": "IL"})),
        )
        .unwrap();
        assert_eq!(plan.pages[0].actions[0].value.as_deref(), Some("06"));
    }

    #[test]
    fn choice_clicks_its_own_selector() {
        let plan = resolve(
            &structure(),
            &contract(),
            &data(json!({
                "birth_month": "05",
                "birth_year": "2007",
                "marital_status": "married",
                "state": "IL",
                "circumstances": ["orphan", "veteran"]
            })),
        )
        .unwrap();

        let marital = &plan.pages[0].actions[2];
        assert_eq!(marital.selector, "#marital_married");
        assert_eq!(marital.interaction, InteractionKind::ScriptClick);
        assert_eq!(marital.value, None);

        let selectors: Vec<_> = plan.pages[1]
            .actions
            .iter()
            .filter(|a| a.field_id.as_deref() == Some("circumstances"))
            .map(|a| a.selector.as_str())
            .collect();
        assert_eq!(selectors, vec!["#c_orphan", "#c_veteran"]);
    }

    #[test]
    fn boolean_click_only_when_true() {
        let base = json!({"birth_month": "05", "birth_year": "2007", "state": "IL"});

        let mut yes = data(base.clone());
        yes.insert("has_savings".into(), json!(true));
        let plan = resolve(&structure(), &contract(), &yes).unwrap();
        assert!(field_ids(&plan.pages[1]).contains(&"has_savings"));

        let mut no = data(base);
        no.insert("has_savings".into(), json!(false));
        let plan = resolve(&structure(), &contract(), &no).unwrap();
        assert!(!field_ids(&plan.pages[1]).contains(&"has_savings"));
    }

    #[test]
    fn drift_faults_are_collected() {
        let err = resolve(
            &structure(),
            &contract(),
            &data(json!({
                "birth_year": "2007",
                "marital_status": "widowed",
                "family_size": [4]
            })),
        )
        .unwrap_err();

        let faults = err.faults();
        assert_eq!(faults.len(), 4);
        assert_eq!(
            faults[0],
            DriftFault::UnresolvedRequiredField {
                field_id: "birth_month".into(),
                page_number: 1
            }
        );
        assert!(matches!(&faults[1], DriftFault::UnknownChoice { value, .. } if value == "widowed"));
        assert_eq!(faults[2].field_id(), "state");
        assert_eq!(faults[3].field_id(), "family_size");
        assert_eq!(faults[3].page_number(), 2);
    }

    #[test]
    fn contract_only_properties_are_ignored() {
        let plan = resolve(
            &structure(),
            &contract(),
            &data(json!({
                "birth_month": "05",
                "birth_year": "2007",
                "state": "IL",
                "annual_income": 52000
            })),
        )
        .unwrap();
        assert_eq!(plan.action_count(), 3);
    }
}
