//! Blocking GraphQL client for the registry.

use crate::error::{Error, Result};
use crate::queries;
use crate::types::{
    GraphQlRequest, GraphQlResponse, MembersData, MutatedMember, NameInput, PeriodsData,
    PronounSet, ReportToData, SheetIdData, WirePeriod,
};
use reconcile::{RegistryMember, RegistrySink, RegistrySource, RosterMember};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::{Mutex, PoisonError};

/// Registry client.
///
/// Every request is a POST of `{query, operationName, variables}` to one
/// endpoint, authenticated by `Client-Id` and `Client-Secret` headers.
///
/// # Example
///
/// ```no_run
/// use registry::RegistryClient;
/// use reconcile::RegistrySource;
///
/// let client = RegistryClient::new("https://registry.example.org/graphql", "id", "secret");
/// let members = client.list_members().unwrap();
/// println!("Registry knows {} members", members.len());
/// ```
pub struct RegistryClient {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    url: String,
    client_id: String,
    client_secret: String,
    /// Period records, fetched on first absence write.
    periods: Mutex<Option<Vec<WirePeriod>>>,
}

impl RegistryClient {
    /// Create a new client for the given endpoint.
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            url: url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            periods: Mutex::new(None),
        }
    }

    /// Endpoint this client talks to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Run one query or mutation and return its `data`.
    pub fn execute<T: DeserializeOwned>(
        &self,
        document: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let operation = queries::operation_name(document).unwrap_or("anonymous");
        log::debug!("Registry request {operation}");

        let request = GraphQlRequest {
            query: document,
            operation_name: operation,
            variables,
        };

        let response: GraphQlResponse<T> = self
            .agent
            .post(&self.url)
            .header("Client-Id", &self.client_id)
            .header("Client-Secret", &self.client_secret)
            .send_json(&request)?
            .body_mut()
            .read_json()?;

        response.into_result(operation)
    }

    /// Period records, fetched once per client.
    fn periods(&self) -> Result<Vec<WirePeriod>> {
        let mut cached = self.periods.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(periods) = cached.as_ref() {
            return Ok(periods.clone());
        }

        let data: PeriodsData = self.execute(queries::GET_PERIOD_IDS, json!({}))?;
        log::debug!("Registry has {} periods", data.periods.len());
        *cached = Some(data.periods.clone());
        Ok(data.periods)
    }

    /// Registry ids of the periods a member is absent for.
    fn absent_period_ids(&self, member: &RosterMember) -> Result<Vec<String>> {
        let absence = member.absence();
        Ok(self
            .periods()?
            .into_iter()
            .filter(|record| record.period().is_some_and(|p| absence.absent_during(p)))
            .map(|record| record.id)
            .collect())
    }
}

fn require_id(member: &RosterMember) -> Result<&str> {
    member
        .registry_id()
        .ok_or_else(|| Error::Unregistered(member.name().formatted()))
}

impl RegistrySource for RegistryClient {
    fn list_members(&self) -> anyhow::Result<Vec<RegistryMember>> {
        let data: MembersData = self.execute(queries::GET_MEMBERS, json!({}))?;
        Ok(data.teachers.into_iter().map(Into::into).collect())
    }

    fn report_to(&self) -> anyhow::Result<String> {
        let data: ReportToData = self.execute(queries::GET_REPORT_TO, json!({}))?;
        Ok(data.report_to.unwrap_or_default())
    }

    fn sheet_id(&self) -> anyhow::Result<Option<String>> {
        let data: SheetIdData = self.execute(queries::GET_SHEET_ID, json!({}))?;
        Ok(data.id.filter(|id| !id.is_empty()))
    }
}

impl RegistrySink for RegistryClient {
    fn create_member(&self, member: &RosterMember) -> anyhow::Result<String> {
        let variables = json!({
            "name": NameInput::from(member.name()),
            "pronouns": PronounSet::for_honorific(member.honorific()),
        });
        let data: MutatedMember = self.execute(queries::CREATE_MEMBER, variables)?;
        log::debug!("Created {} as {}", member.name(), data.teacher.id);
        Ok(data.teacher.id)
    }

    fn rename_member(&self, member: &RosterMember) -> anyhow::Result<()> {
        let id = require_id(member)?;
        let variables = json!({
            "id": id,
            "name": NameInput::from(member.name()),
        });
        let _: MutatedMember = self.execute(queries::CHANGE_NAME, variables)?;
        Ok(())
    }

    fn set_absence(&self, member: &RosterMember) -> anyhow::Result<()> {
        let id = require_id(member)?;
        let variables = json!({
            "id": id,
            "periods": self.absent_period_ids(member)?,
            "fullyAbsent": member.absence().is_fully_absent(),
        });
        let _: MutatedMember = self.execute(queries::CHANGE_ABSENCE, variables)?;
        Ok(())
    }

    fn set_report_to(&self, report_to: &str) -> anyhow::Result<()> {
        let _: serde_json::Value =
            self.execute(queries::SET_REPORT_TO, json!({ "reportTo": report_to }))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::{AbsenceStatus, MemberName};

    fn member(id: Option<&str>) -> RosterMember {
        RosterMember::new(
            id.map(str::to_string),
            2,
            MemberName::new("ms", "Jane", "Doe"),
            AbsenceStatus::Present,
        )
    }

    fn with_periods(client: &RegistryClient, names: &[(&str, &str)]) {
        let records = names
            .iter()
            .map(|(id, name)| WirePeriod {
                id: (*id).to_string(),
                name: (*name).to_string(),
            })
            .collect();
        *client.periods.lock().unwrap() = Some(records);
    }

    #[test]
    fn test_client_url() {
        let client = RegistryClient::new("https://registry.test/graphql", "id", "secret");
        assert_eq!(client.url(), "https://registry.test/graphql");
    }

    #[test]
    fn test_writes_require_registry_id() {
        let client = RegistryClient::new("http://127.0.0.1:9/graphql", "id", "secret");
        let err = client.rename_member(&member(None)).unwrap_err();
        let err = err.downcast::<Error>().unwrap();
        assert!(matches!(err, Error::Unregistered(_)));
        assert!(client.set_absence(&member(None)).is_err());
    }

    #[test]
    fn test_absent_period_ids_use_cached_periods() {
        let client = RegistryClient::new("http://127.0.0.1:9/graphql", "id", "secret");
        with_periods(
            &client,
            &[
                ("p1", "Period 1"),
                ("igs", "IGS"),
                ("p3", "Period 3"),
                ("lunch", "Lunch"),
            ],
        );

        let partial = RosterMember::new(
            Some("t".into()),
            2,
            MemberName::new("ms", "Jane", "Doe"),
            AbsenceStatus::partial([reconcile::Period::Igs, reconcile::Period::P3]),
        );
        assert_eq!(client.absent_period_ids(&partial).unwrap(), vec!["igs", "p3"]);

        let full = RosterMember::new(
            Some("t".into()),
            2,
            MemberName::new("ms", "Jane", "Doe"),
            AbsenceStatus::FullDay,
        );
        assert_eq!(
            client.absent_period_ids(&full).unwrap(),
            vec!["p1", "igs", "p3"]
        );

        assert!(client.absent_period_ids(&member(Some("t"))).unwrap().is_empty());
    }

    #[test]
    fn test_unreachable_registry_is_network_error() {
        let client = RegistryClient::new("http://127.0.0.1:9/graphql", "id", "secret");
        let err = client.execute::<MembersData>(queries::GET_MEMBERS, json!({})).unwrap_err();
        assert!(err.is_retryable());
    }
}
