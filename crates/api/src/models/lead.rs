use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::envelope::ResponseShape;
use crate::resource::{Record, ResourceKind};

/// Lead lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    FollowUpScheduled,
    Interested,
    Qualified,
    Converted,
    NotInterested,
    Unreachable,
    Disqualified,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 9] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::FollowUpScheduled,
        LeadStatus::Interested,
        LeadStatus::Qualified,
        LeadStatus::Converted,
        LeadStatus::NotInterested,
        LeadStatus::Unreachable,
        LeadStatus::Disqualified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::FollowUpScheduled => "follow_up_scheduled",
            LeadStatus::Interested => "interested",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Converted => "converted",
            LeadStatus::NotInterested => "not_interested",
            LeadStatus::Unreachable => "unreachable",
            LeadStatus::Disqualified => "disqualified",
        }
    }

    /// Converted, not interested, unreachable and disqualified leads are closed.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            LeadStatus::Converted
                | LeadStatus::NotInterested
                | LeadStatus::Unreachable
                | LeadStatus::Disqualified
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for creating a lead.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

/// Partial lead update. Unset fields are left out of the request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Record for Lead {
    type Draft = NewLead;
    type Patch = LeadPatch;

    const KIND: ResourceKind = ResourceKind::Lead;
    const SHAPE: ResponseShape = ResponseShape::Result;

    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> Option<&str> {
        self.assigned_to.as_deref()
    }

    fn set_owner_id(&mut self, owner_id: Option<String>) {
        self.assigned_to = owner_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_mongo_style_id() {
        let lead: Lead = serde_json::from_value(json!({
            "_id": "64f0c2",
            "name": "Acme",
            "status": "follow_up_scheduled",
            "assignedTo": "u1",
            "createdAt": "2024-03-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(lead.id, "64f0c2");
        assert_eq!(lead.status, LeadStatus::FollowUpScheduled);
        assert_eq!(lead.owner_id(), Some("u1"));
        assert!(lead.created_at.is_some());
    }

    #[test]
    fn patch_skips_unset_fields() {
        let patch = LeadPatch {
            status: Some(LeadStatus::Qualified),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"status": "qualified"}));
    }

    #[test]
    fn status_strings_match_serde() {
        for status in LeadStatus::ALL {
            assert_eq!(serde_json::to_value(status).unwrap(), json!(status.as_str()));
        }
        assert!(LeadStatus::Converted.is_closed());
        assert!(!LeadStatus::Interested.is_closed());
    }
}
