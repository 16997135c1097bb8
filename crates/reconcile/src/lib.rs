//! # Reconcile
//!
//! Keeps a roster of absence records in step between a human-edited sheet
//! and a remote registry.
//!
//! ## Core Concepts
//!
//! - **RosterMember**: one tracked person, with name, absence and the sheet
//!   row they were last matched to
//! - **AbsenceStatus**: present, absent for some periods, or out all day
//! - **Resolver**: matches sheet rows to roster members in four stages and
//!   produces the registry writes a pass needs
//! - **Orchestrator**: runs passes one at a time and holds writes back while
//!   the sheet is being edited
//!
//! ## Example
//!
//! ```
//! use reconcile::mock::{MockRegistry, MockSheet};
//! use reconcile::{Orchestrator, SyncOptions};
//!
//! let mut row = vec![String::new(); 24];
//! row[0] = "Ms.".into();
//! row[1] = "Jane".into();
//! row[2] = "Doe".into();
//! row[6] = "TRUE".into();
//!
//! let sheet = MockSheet::new(vec![vec![], vec![], row]);
//! let registry = MockRegistry::new();
//! let orchestrator = Orchestrator::new(sheet, registry.clone(), SyncOptions::default());
//!
//! // A fresh orchestrator holds writes until the sheet has been quiet
//! let report = orchestrator.sync(None)?;
//! assert!(!report.gate_open);
//!
//! let report = orchestrator.sync(Some(true))?;
//! assert_eq!(report.summary.creations, 1);
//! assert_eq!(orchestrator.summary(), "Ms. Jane Doe - out ALL DAY\n");
//! # Ok::<(), reconcile::Error>(())
//! ```
//!
//! ## Collaborator Traits
//!
//! - [`SheetSource`]: provides the sheet grid
//! - [`RegistrySource`] / [`RegistrySink`]: read and write the registry
//! - [`Clock`]: wall-clock time for the write gate
//!
//! Implementations live in other crates; [`mock`] has in-memory ones.

pub mod absence;
pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod layout;
pub mod matcher;
pub mod member;
pub mod mock;
pub mod resolver;
pub mod scheduler;
pub mod sync;
pub mod types;

// Re-export main types at crate root
pub use absence::{AbsenceStatus, Period};
pub use context::{Clock, Registry, RegistrySink, RegistrySource, SheetSource, SystemClock};
pub use diff::{Action, ActionKind, ActionSummary, diff_absence, diff_name};
pub use error::{Error, ErrorCategory, Result};
pub use layout::{SheetLayout, column_index};
pub use matcher::{LAX_THRESHOLD, match_score, matches_lax, rank_rows};
pub use member::{MemberName, RegistryMember, RosterMember};
pub use resolver::{PassInput, Resolution, Resolver, Roster, resolve};
pub use scheduler::{ControlHandle, Scheduler};
pub use sync::{Orchestrator, WriteGate};
pub use types::{
    DEFAULT_JOBS, DEFAULT_QUIET_PERIOD_SECS, PassPhase, PassReport, PassTimings, SyncOptions,
    WriteFailure, WriteReport,
};
