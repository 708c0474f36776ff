//! Sequential agent crew.
//!
//! A crew is a fixed, ordered list of [`Stage`]s. Each stage is run by an
//! agent persona ([`AgentProfile`], static text), declares which named
//! fields it reads and which it writes, and delegates the actual work to a
//! [`StageAction`]. The [`Crew`] runner executes stages strictly in order,
//! hands each one only the fields it declared, and checks that it wrote
//! exactly what it declared. There is no retry and no branching.
//!
//! ```text
//! seed ─▶ parse_topic ─▶ research ─▶ outline ─▶ sme_review_1 ─▶ sme_review_2 ─▶ refine_outline
//! ```
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`agent`] | Persona records |
//! | [`stage`] | Stage descriptor and the model/template actions |
//! | [`runner`] | Wiring validation and sequential execution |
//! | [`tasks`] | The built-in `writing` and `rsac` stage sets |
//! | [`log`] | Seed file input and the timestamped output artifact |

pub mod agent;
pub mod log;
pub mod runner;
pub mod stage;
pub mod tasks;

use std::collections::BTreeMap;

use thiserror::Error;

pub use agent::AgentProfile;
pub use runner::{Crew, CrewOutput, StageRecord};
pub use stage::{ModelTask, Stage, StageAction, TaskSpec, TemplateTask};

/// Named text fields passed between stages.
pub type Fields = BTreeMap<String, String>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrewError {
    #[error("stage '{stage}' reads '{field}', which no earlier stage or seed provides")]
    UnsatisfiedInput { stage: String, field: String },

    #[error("stage '{stage}' writes '{field}', which is already provided upstream")]
    DuplicateField { stage: String, field: String },

    #[error("seed must provide exactly {expected:?}, got {got:?}")]
    SeedMismatch { expected: Vec<String>, got: Vec<String> },

    #[error("stage '{stage}' did not produce declared field '{field}'")]
    MissingOutput { stage: String, field: String },

    #[error("stage '{stage}' produced undeclared field '{field}'")]
    UndeclaredOutput { stage: String, field: String },

    #[error("stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },
}
