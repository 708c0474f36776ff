//! Wiring validation and sequential execution.

use std::collections::BTreeSet;

use super::{CrewError, Fields, Stage};

/// What one stage saw and produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    pub stage: String,
    pub role: &'static str,
    pub inputs: Fields,
    pub outputs: Fields,
}

/// Result of a full crew run: per-stage transcript plus every field produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrewOutput {
    pub records: Vec<StageRecord>,
    pub fields: Fields,
}

impl CrewOutput {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// An ordered list of stages whose field wiring has been checked.
#[derive(Debug)]
pub struct Crew {
    seed_fields: BTreeSet<String>,
    stages: Vec<Stage>,
}

impl Crew {
    /// Validate that every read is provided by the seed or an earlier stage,
    /// and that no field is produced twice.
    pub fn new(seed_fields: &[&str], stages: Vec<Stage>) -> Result<Self, CrewError> {
        let seed_fields: BTreeSet<String> = seed_fields.iter().map(|s| s.to_string()).collect();
        let mut available = seed_fields.clone();

        for stage in &stages {
            if let Some(field) = stage.reads().iter().find(|f| !available.contains(*f)) {
                return Err(CrewError::UnsatisfiedInput {
                    stage: stage.name().to_string(),
                    field: field.clone(),
                });
            }
            for field in stage.writes() {
                if !available.insert(field.clone()) {
                    return Err(CrewError::DuplicateField {
                        stage: stage.name().to_string(),
                        field: field.clone(),
                    });
                }
            }
        }

        Ok(Self { seed_fields, stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn seed_fields(&self) -> &BTreeSet<String> {
        &self.seed_fields
    }

    /// Run every stage in order. The first failure aborts the run.
    pub async fn kickoff(&self, seed: Fields) -> Result<CrewOutput, CrewError> {
        let provided: BTreeSet<String> = seed.keys().cloned().collect();
        if provided != self.seed_fields {
            return Err(CrewError::SeedMismatch {
                expected: self.seed_fields.iter().cloned().collect(),
                got: provided.into_iter().collect(),
            });
        }

        let mut fields = seed;
        let mut records = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let mut inputs = Fields::new();
            for field in stage.reads() {
                let value = fields.get(field).ok_or_else(|| CrewError::UnsatisfiedInput {
                    stage: stage.name().to_string(),
                    field: field.clone(),
                })?;
                inputs.insert(field.clone(), value.clone());
            }

            tracing::info!(stage = stage.name(), role = stage.agent().role, "running stage");
            let outputs = stage.run(&inputs).await.map_err(|e| {
                tracing::warn!(stage = stage.name(), error = %e, "stage failed");
                CrewError::Stage {
                    stage: stage.name().to_string(),
                    message: format!("{:#}", e),
                }
            })?;

            if let Some(field) = stage.writes().iter().find(|f| !outputs.contains_key(*f)) {
                return Err(CrewError::MissingOutput {
                    stage: stage.name().to_string(),
                    field: field.clone(),
                });
            }
            if let Some(field) = outputs.keys().find(|f| !stage.writes().contains(*f)) {
                return Err(CrewError::UndeclaredOutput {
                    stage: stage.name().to_string(),
                    field: field.clone(),
                });
            }

            fields.extend(outputs.clone());
            records.push(StageRecord {
                stage: stage.name().to_string(),
                role: stage.agent().role,
                inputs,
                outputs,
            });
        }

        Ok(CrewOutput { records, fields })
    }
}
