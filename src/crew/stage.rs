//! Stage descriptors and actions.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::{AgentProfile, Fields};
use crate::llm::LanguageModel;

/// The work a stage performs: map its declared inputs to its declared outputs.
#[async_trait]
pub trait StageAction: Send + Sync {
    async fn run(&self, agent: &AgentProfile, inputs: &Fields) -> anyhow::Result<Fields>;
}

/// One step of a crew: a persona, the fields it reads and writes, and its action.
pub struct Stage {
    name: String,
    agent: AgentProfile,
    reads: BTreeSet<String>,
    writes: BTreeSet<String>,
    action: Arc<dyn StageAction>,
}

impl Stage {
    pub fn new(
        name: &str,
        agent: AgentProfile,
        reads: &[&str],
        writes: &[&str],
        action: Arc<dyn StageAction>,
    ) -> Self {
        Self {
            name: name.to_string(),
            agent,
            reads: reads.iter().map(|s| s.to_string()).collect(),
            writes: writes.iter().map(|s| s.to_string()).collect(),
            action,
        }
    }

    /// A stage whose single output field is a model completion.
    pub fn model(
        name: &str,
        agent: AgentProfile,
        spec: TaskSpec,
        reads: &[&str],
        write: &str,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        let task = ModelTask::new(spec, write, model);
        Self::new(name, agent, reads, &[write], Arc::new(task))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn agent(&self) -> &AgentProfile {
        &self.agent
    }

    pub fn reads(&self) -> &BTreeSet<String> {
        &self.reads
    }

    pub fn writes(&self) -> &BTreeSet<String> {
        &self.writes
    }

    pub(crate) async fn run(&self, inputs: &Fields) -> anyhow::Result<Fields> {
        self.action.run(&self.agent, inputs).await
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("role", &self.agent.role)
            .field("reads", &self.reads)
            .field("writes", &self.writes)
            .finish()
    }
}

/// What a model-backed stage is asked to do.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    pub description: &'static str,
    pub expected_output: &'static str,
}

/// Asks the language model to perform a task in the persona's voice.
pub struct ModelTask {
    spec: TaskSpec,
    output_field: String,
    model: Arc<dyn LanguageModel>,
}

impl ModelTask {
    pub fn new(spec: TaskSpec, output_field: &str, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            spec,
            output_field: output_field.to_string(),
            model,
        }
    }
}

#[async_trait]
impl StageAction for ModelTask {
    async fn run(&self, agent: &AgentProfile, inputs: &Fields) -> anyhow::Result<Fields> {
        let prompt = render_task_prompt(agent, &self.spec, inputs);
        let text = self.model.complete(&prompt).await?;
        if text.trim().is_empty() {
            anyhow::bail!("model returned an empty response");
        }
        Ok(Fields::from([(self.output_field.clone(), text)]))
    }
}

/// A deterministic stage backed by a plain function.
pub struct TemplateTask<F> {
    render: F,
}

impl<F> TemplateTask<F>
where
    F: Fn(&Fields) -> anyhow::Result<Fields> + Send + Sync,
{
    pub fn new(render: F) -> Self {
        Self { render }
    }
}

#[async_trait]
impl<F> StageAction for TemplateTask<F>
where
    F: Fn(&Fields) -> anyhow::Result<Fields> + Send + Sync,
{
    async fn run(&self, _agent: &AgentProfile, inputs: &Fields) -> anyhow::Result<Fields> {
        (self.render)(inputs)
    }
}

/// Persona, task and inputs rendered as one prompt. Inputs appear in field-name order.
pub fn render_task_prompt(agent: &AgentProfile, spec: &TaskSpec, inputs: &Fields) -> String {
    let mut prompt = format!(
        "You are the {}. {}\nYour goal: {}\n\nTask: {}\n\nExpected output: {}\n",
        agent.role, agent.backstory, agent.goal, spec.description, spec.expected_output
    );
    for (field, value) in inputs {
        prompt.push_str(&format!("\n## {}\n{}\n", field, value));
    }
    prompt
}
