use crate::text;
use crate::types::WorkItemType;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Field reference name → raw value, as returned by the source system.
pub type FieldSet = BTreeMap<String, Value>;

pub mod fields {
    pub const ID: &str = "System.Id";
    pub const WORK_ITEM_TYPE: &str = "System.WorkItemType";
    pub const TITLE: &str = "System.Title";
    pub const DESCRIPTION: &str = "System.Description";
    pub const ACCEPTANCE_CRITERIA: &str = "Microsoft.VSTS.Common.AcceptanceCriteria";
    pub const CREATED_BY: &str = "System.CreatedBy";
    pub const STATE: &str = "System.State";
    pub const AREA_PATH: &str = "System.AreaPath";
    pub const START_DATE: &str = "Microsoft.VSTS.Scheduling.StartDate";
    pub const TARGET_DATE: &str = "Microsoft.VSTS.Scheduling.TargetDate";

    /// Fields requested for every work item by default.
    pub const REQUIRED: &[&str] = &[
        ID,
        WORK_ITEM_TYPE,
        TITLE,
        DESCRIPTION,
        ACCEPTANCE_CRITERIA,
        CREATED_BY,
        STATE,
        AREA_PATH,
        START_DATE,
        TARGET_DATE,
    ];
}

pub const UNKNOWN_CREATOR: &str = "(Unknown)";

// ---------------------------------------------------------------------------
// WorkItem
// ---------------------------------------------------------------------------

/// Typed snapshot of a cached field-set. Missing fields read as empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: u64,
    pub work_item_type: WorkItemType,
    pub title: String,
    /// Raw rich text; see [`WorkItem::description_text`].
    pub description: String,
    pub acceptance_criteria: String,
    pub created_by: String,
    pub state: String,
    pub area_path: String,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
}

impl WorkItem {
    pub fn from_fields(id: u64, set: &FieldSet) -> Self {
        Self {
            id,
            work_item_type: WorkItemType::parse(&text_field(set, fields::WORK_ITEM_TYPE)),
            title: text_field(set, fields::TITLE),
            description: text_field(set, fields::DESCRIPTION),
            acceptance_criteria: text_field(set, fields::ACCEPTANCE_CRITERIA),
            created_by: creator_display_name(set.get(fields::CREATED_BY)),
            state: text_field(set, fields::STATE),
            area_path: text_field(set, fields::AREA_PATH),
            start_date: parse_date(&text_field(set, fields::START_DATE)),
            target_date: parse_date(&text_field(set, fields::TARGET_DATE)),
        }
    }

    pub fn description_text(&self) -> String {
        text::normalize(&self.description)
    }

    pub fn acceptance_criteria_text(&self) -> String {
        text::normalize(&self.acceptance_criteria)
    }
}

/// Read a field as text. Absent and null read as "", numbers and booleans
/// are rendered, structured values fall back to their JSON form.
pub fn text_field(set: &FieldSet, name: &str) -> String {
    match set.get(name) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Display name for the creator field.
///
/// `"Jane Doe <jane@example.com>"` → `"Jane Doe"`; an identity object yields
/// its `displayName`; anything absent or blank becomes `(Unknown)`.
pub fn creator_display_name(value: Option<&Value>) -> String {
    let name = match value {
        Some(Value::String(s)) => s.split('<').next().unwrap_or("").trim().to_string(),
        Some(Value::Object(map)) => match map.get("displayName") {
            Some(Value::String(s)) => s.trim().to_string(),
            _ => String::new(),
        },
        _ => String::new(),
    };
    if name.is_empty() {
        UNKNOWN_CREATOR.to_string()
    } else {
        name
    }
}

/// Parse the date part of an ISO timestamp (`2026-03-01T00:00:00Z`) or a bare
/// date. Unparseable or empty input yields `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(date) = raw
        .get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
    {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_set(value: Value) -> FieldSet {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn from_fields_full() {
        let set = field_set(json!({
            "System.Id": 54320,
            "System.WorkItemType": "User Story",
            "System.Title": "Export inspections",
            "System.Description": "<div>Export&nbsp;all</div>",
            "Microsoft.VSTS.Common.AcceptanceCriteria": "<ul><li>CSV file</li></ul>",
            "System.CreatedBy": {"displayName": "Jane Doe", "uniqueName": "jane@example.com"},
            "System.State": "New",
            "System.AreaPath": "Project\\Team A",
            "Microsoft.VSTS.Scheduling.StartDate": "2026-03-01T00:00:00Z",
            "Microsoft.VSTS.Scheduling.TargetDate": "2026-03-31T00:00:00Z"
        }));
        let item = WorkItem::from_fields(54320, &set);
        assert_eq!(item.work_item_type, WorkItemType::UserStory);
        assert_eq!(item.title, "Export inspections");
        assert_eq!(item.description_text(), "Export all");
        assert_eq!(item.acceptance_criteria_text(), "CSV file");
        assert_eq!(item.created_by, "Jane Doe");
        assert_eq!(item.area_path, "Project\\Team A");
        assert_eq!(item.start_date, NaiveDate::from_ymd_opt(2026, 3, 1));
        assert_eq!(item.target_date, NaiveDate::from_ymd_opt(2026, 3, 31));
    }

    #[test]
    fn missing_fields_are_empty() {
        let item = WorkItem::from_fields(7, &FieldSet::new());
        assert_eq!(item.title, "");
        assert_eq!(item.description, "");
        assert_eq!(item.acceptance_criteria, "");
        assert_eq!(item.created_by, UNKNOWN_CREATOR);
        assert!(item.start_date.is_none());
        assert_eq!(item.work_item_type, WorkItemType::Other(String::new()));
    }

    #[test]
    fn null_description_is_empty() {
        let set = field_set(json!({"System.Description": null}));
        assert_eq!(text_field(&set, fields::DESCRIPTION), "");
    }

    #[test]
    fn creator_from_string_with_email() {
        let v = json!("Jane Doe <jane@example.com>");
        assert_eq!(creator_display_name(Some(&v)), "Jane Doe");
    }

    #[test]
    fn creator_plain_string() {
        let v = json!("  Build Service ");
        assert_eq!(creator_display_name(Some(&v)), "Build Service");
    }

    #[test]
    fn creator_absent_or_blank() {
        assert_eq!(creator_display_name(None), UNKNOWN_CREATOR);
        assert_eq!(creator_display_name(Some(&json!(""))), UNKNOWN_CREATOR);
        assert_eq!(creator_display_name(Some(&json!("<a@b.c>"))), UNKNOWN_CREATOR);
        assert_eq!(creator_display_name(Some(&json!({"id": "x"}))), UNKNOWN_CREATOR);
    }

    #[test]
    fn parse_date_variants() {
        let d = NaiveDate::from_ymd_opt(2026, 1, 15);
        assert_eq!(parse_date("2026-01-15"), d);
        assert_eq!(parse_date("2026-01-15T08:00:00Z"), d);
        assert_eq!(parse_date("2026-01-15T08:00:00.000+02:00"), d);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("next week"), None);
    }
}
