//! Write execution - applies planned actions to the registry in parallel

use crate::context::RegistrySink;
use crate::diff::{Action, ActionKind};
use crate::error::{Error, Result};
use crate::member::RosterMember;
use crate::types::WriteReport;
use rayon::prelude::*;

/// Result of the write phase
#[derive(Debug, Default)]
pub struct WriteOutcome {
    pub report: WriteReport,
    /// Members the registry accepted, each carrying its new id
    pub created: Vec<RosterMember>,
}

/// Outcome of creating one member
struct Creation {
    member: RosterMember,
    created: anyhow::Result<()>,
    /// Follow-up absence write, when the member was absent at all
    absence: Option<anyhow::Result<()>>,
}

/// Apply every action, then create every new member
///
/// Each batch runs on a pool of `jobs` threads. Every write settles on its
/// own: a failure is recorded and never stops the others.
pub fn apply_writes(
    actions: &[Action],
    new_members: Vec<RosterMember>,
    sink: &dyn RegistrySink,
    jobs: usize,
) -> Result<WriteOutcome> {
    let mut outcome = WriteOutcome::default();
    if actions.is_empty() && new_members.is_empty() {
        return Ok(outcome);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .map_err(|e| Error::ThreadPool(e.to_string()))?;

    if !actions.is_empty() {
        log::info!("Applying {} member updates", actions.len());
        let results: Vec<anyhow::Result<()>> = if jobs == 1 || actions.len() == 1 {
            actions.iter().map(|action| apply_action(action, sink)).collect()
        } else {
            pool.install(|| {
                actions
                    .par_iter()
                    .map(|action| apply_action(action, sink))
                    .collect()
            })
        };

        for (action, result) in actions.iter().zip(results) {
            match result {
                Ok(()) => outcome.report.add_success(action.kind),
                Err(e) => {
                    log::warn!("  Failed to {action}: {e:#}");
                    outcome.report.add_failure(action.kind, &action.member, &e);
                }
            }
        }
    }

    if !new_members.is_empty() {
        log::info!("Creating {} new members", new_members.len());
        let creations: Vec<Creation> = if jobs == 1 || new_members.len() == 1 {
            new_members
                .into_iter()
                .map(|member| create_one(member, sink))
                .collect()
        } else {
            pool.install(|| {
                new_members
                    .into_par_iter()
                    .map(|member| create_one(member, sink))
                    .collect()
            })
        };

        for creation in creations {
            if let Err(e) = creation.created {
                log::warn!("  Failed to create {}: {e:#}", creation.member);
                outcome
                    .report
                    .add_failure(ActionKind::CreateMember, &creation.member, &e);
                continue;
            }

            outcome.report.add_success(ActionKind::CreateMember);
            match creation.absence {
                Some(Ok(())) => outcome.report.add_success(ActionKind::ChangeAbsence),
                Some(Err(e)) => {
                    log::warn!("  Failed to set absence of {}: {e:#}", creation.member);
                    outcome
                        .report
                        .add_failure(ActionKind::ChangeAbsence, &creation.member, &e);
                }
                None => {}
            }
            outcome.created.push(creation.member);
        }
    }

    Ok(outcome)
}

fn apply_action(action: &Action, sink: &dyn RegistrySink) -> anyhow::Result<()> {
    log::debug!("  {action}");
    match action.kind {
        ActionKind::ChangeName => sink.rename_member(&action.member),
        ActionKind::ChangeAbsence => sink.set_absence(&action.member),
        ActionKind::CreateMember => sink.create_member(&action.member).map(drop),
    }
}

fn create_one(mut member: RosterMember, sink: &dyn RegistrySink) -> Creation {
    log::debug!("  create {member}");
    match sink.create_member(&member) {
        Ok(id) => {
            member.assign_registry_id(id);
            let absence = member
                .absence()
                .is_absent_at_all()
                .then(|| sink.set_absence(&member));
            Creation {
                member,
                created: Ok(()),
                absence,
            }
        }
        Err(e) => Creation {
            member,
            created: Err(e),
            absence: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::absence::{AbsenceStatus, Period};
    use crate::member::MemberName;
    use crate::mock::{MockRegistry, RegistryCall};

    fn member(id: Option<&str>, last: &str, absence: AbsenceStatus) -> RosterMember {
        RosterMember::new(
            id.map(str::to_string),
            2,
            MemberName::new("ms", "Jo", last),
            absence,
        )
    }

    #[test]
    fn test_nothing_to_do() {
        let registry = MockRegistry::new();
        let outcome = apply_writes(&[], Vec::new(), &registry, 4).unwrap();
        assert!(outcome.report.is_success());
        assert_eq!(outcome.report.succeeded(), 0);
        assert!(registry.calls().is_empty());
    }

    #[test]
    fn test_failures_are_isolated() {
        let registry = MockRegistry::new();
        for (id, last) in [("a", "Able"), ("b", "Baker"), ("c", "Cole")] {
            registry.add_member(id, "ms", "Jo", last);
        }
        registry.fail_writes_for("Baker");

        let actions: Vec<Action> = [("a", "Able"), ("b", "Baker"), ("c", "Cole")]
            .into_iter()
            .map(|(id, last)| {
                Action::new(
                    ActionKind::ChangeAbsence,
                    member(Some(id), last, AbsenceStatus::FullDay),
                )
            })
            .collect();

        let outcome = apply_writes(&actions, Vec::new(), &registry, 3).unwrap();
        assert_eq!(outcome.report.absences_set, 2);
        assert_eq!(outcome.report.failures.len(), 1);
        assert_eq!(outcome.report.failures[0].kind, ActionKind::ChangeAbsence);
        assert!(outcome.report.failures[0].member.contains("Baker"));
        assert!(registry.member("a").unwrap().fully_absent);
        assert!(registry.member("c").unwrap().fully_absent);
        assert!(!registry.member("b").unwrap().fully_absent);
    }

    #[test]
    fn test_creation_assigns_ids_and_follows_up_absence() {
        let registry = MockRegistry::new();
        let new_members = vec![
            member(None, "Present", AbsenceStatus::Present),
            member(None, "Out", AbsenceStatus::partial([Period::P4])),
        ];

        let outcome = apply_writes(&[], new_members, &registry, 2).unwrap();
        assert_eq!(outcome.report.created, 2);
        assert_eq!(outcome.report.absences_set, 1);
        assert_eq!(outcome.created.len(), 2);
        assert!(outcome.created.iter().all(|m| m.registry_id().is_some()));

        let absence_calls: Vec<_> = registry
            .calls()
            .into_iter()
            .filter(|call| matches!(call, RegistryCall::SetAbsence(..)))
            .collect();
        assert_eq!(absence_calls.len(), 1);
    }

    #[test]
    fn test_follow_up_failure_reported_as_absence_change() {
        let registry = MockRegistry::new();
        registry.fail_absence_for("Out");
        let new_members = vec![member(None, "Out", AbsenceStatus::FullDay)];

        let outcome = apply_writes(&[], new_members, &registry, 1).unwrap();
        assert_eq!(outcome.report.created, 1);
        assert_eq!(outcome.report.failures.len(), 1);
        assert_eq!(outcome.report.failures[0].kind, ActionKind::ChangeAbsence);
        // Still created, so still tracked
        assert_eq!(outcome.created.len(), 1);
    }

    #[test]
    fn test_failed_creation_not_tracked() {
        let registry = MockRegistry::new();
        registry.fail_writes_for("Nope");
        let new_members = vec![
            member(None, "Nope", AbsenceStatus::Present),
            member(None, "Fine", AbsenceStatus::Present),
        ];

        let outcome = apply_writes(&[], new_members, &registry, 4).unwrap();
        assert_eq!(outcome.report.created, 1);
        assert_eq!(outcome.report.failures[0].kind, ActionKind::CreateMember);
        assert_eq!(outcome.created.len(), 1);
        assert_eq!(outcome.created[0].last_name(), "Fine");
    }
}
