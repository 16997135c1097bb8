//! Wire types for the registry's GraphQL API

use crate::error::{Error, Result};
use reconcile::{MemberName, Period, RegistryMember};
use serde::{Deserialize, Serialize};

// =============================================================================
// Envelope
// =============================================================================

/// Body of every request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub operation_name: &'a str,
    pub variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

/// Body of every response
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

impl<T> GraphQlResponse<T> {
    /// Data of a successful response, or the errors it carried
    pub fn into_result(self, operation: &str) -> Result<T> {
        if !self.errors.is_empty() {
            return Err(Error::GraphQl {
                operation: operation.to_string(),
                messages: self.errors.into_iter().map(|e| e.message).collect(),
            });
        }
        self.data
            .ok_or_else(|| Error::MissingData(operation.to_string()))
    }
}

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct WireName {
    #[serde(default)]
    pub honorific: String,
    #[serde(default)]
    pub first: String,
    #[serde(default)]
    pub last: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WirePeriod {
    pub id: String,
    pub name: String,
}

impl WirePeriod {
    /// Canonical period this record stands for, if its name is one exactly
    pub fn period(&self) -> Option<Period> {
        Period::ALL.into_iter().find(|p| p.name() == self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMember {
    pub id: String,
    pub name: WireName,
    #[serde(default)]
    pub absence: Vec<WirePeriod>,
    #[serde(default)]
    pub fully_absent: bool,
}

impl From<WireMember> for RegistryMember {
    fn from(m: WireMember) -> Self {
        Self {
            id: m.id,
            honorific: m.name.honorific,
            first_name: m.name.first,
            last_name: m.name.last,
            absent_periods: m.absence.into_iter().map(|p| p.name).collect(),
            fully_absent: m.fully_absent,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdOnly {
    pub id: String,
}

// =============================================================================
// Response data
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct MembersData {
    pub teachers: Vec<WireMember>,
}

#[derive(Debug, Deserialize)]
pub struct PeriodsData {
    pub periods: Vec<WirePeriod>,
}

#[derive(Debug, Deserialize)]
pub struct MutatedMember {
    pub teacher: IdOnly,
}

#[derive(Debug, Deserialize)]
pub struct SheetIdData {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportToData {
    pub report_to: Option<String>,
}

// =============================================================================
// Variables
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MiddleName {
    pub name: String,
    pub vis: bool,
}

/// Name as the registry takes it in mutations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameInput {
    pub honorific: String,
    pub first: String,
    pub last: String,
    pub middle: Vec<MiddleName>,
}

impl From<&MemberName> for NameInput {
    fn from(name: &MemberName) -> Self {
        Self {
            honorific: title_case(&name.honorific),
            first: name.first.clone(),
            last: name.last.clone(),
            middle: Vec::new(),
        }
    }
}

/// Capitalize each word ("ms" -> "Ms")
fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pronoun set sent when creating a member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PronounSet {
    pub sub: &'static str,
    pub obj: &'static str,
    pub pos_adj: &'static str,
    pub pos_pro: &'static str,
    pub refx: &'static str,
    pub gramm_plu: bool,
}

impl PronounSet {
    pub const HE: Self = Self {
        sub: "he",
        obj: "him",
        pos_adj: "his",
        pos_pro: "his",
        refx: "himself",
        gramm_plu: false,
    };

    pub const SHE: Self = Self {
        sub: "she",
        obj: "her",
        pos_adj: "her",
        pos_pro: "hers",
        refx: "herself",
        gramm_plu: false,
    };

    pub const THEY: Self = Self {
        sub: "they",
        obj: "them",
        pos_adj: "their",
        pos_pro: "theirs",
        refx: "themself",
        gramm_plu: true,
    };

    /// Derive pronouns from a normalized honorific
    pub fn for_honorific(honorific: &str) -> Self {
        match honorific {
            "mr" => Self::HE,
            "ms" | "mrs" | "miss" => Self::SHE,
            _ => Self::THEY,
        }
    }
}
