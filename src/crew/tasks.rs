//! Built-in stage sets.
//!
//! `writing` turns a seed abstract into a refined hierarchical outline with
//! six model-backed stages. `rsac` produces a conference submission (title,
//! abstract, session details) from fixed templates and needs no model.

use std::sync::Arc;

use super::agent::{
    DETAIL_WRITER, OUTLINER, RESEARCHER, SME_1, SME_2, SME_REVIEWER, TITLE_ABSTRACT_GENERATOR,
    TOPIC_PARSER,
};
use super::{Crew, CrewError, CrewOutput, Fields, Stage, TaskSpec, TemplateTask};
use crate::llm::LanguageModel;

pub const WRITING_SEED_FIELDS: &[&str] = &["abstract"];
pub const RSAC_SEED_FIELDS: &[&str] = &["abstract", "mission"];

const PARSE_TOPIC: TaskSpec = TaskSpec {
    description: "1. Analyze the seed abstract and extract key topics, \
                  focus areas, and main messages.\n\
                  2. Provide a structured output that includes topics, \
                  focus areas, and primary themes.",
    expected_output: "A structured list of topics, focus areas, \
                     and key messages from the abstract.",
};

const RESEARCH: TaskSpec = TaskSpec {
    description: "1. Use the parsed topics to conduct focused research on the provided topic.\n\
                  2. Summarize the key points, findings, and challenges in the research.\n\
                  3. Create a structured research summary that includes main findings \
                  and implications for RSA.",
    expected_output: "A detailed research summary covering the main findings \
                     and challenges of the topic.",
};

const OUTLINE: TaskSpec = TaskSpec {
    description: "1. Create an initial outline based on the research summary.\n\
                  2. Ensure that the outline includes key sections and logical flow.\n\
                  3. Highlight the areas where SME feedback is required.",
    expected_output: "An initial structured outline covering all key research areas.",
};

const SME_REVIEW_1: TaskSpec = TaskSpec {
    description: "1. Review the initial outline for technical accuracy and completeness.\n\
                  2. Provide insights on potential gaps or areas that need refinement.\n\
                  3. Ensure the outline aligns with research goals and mission context.",
    expected_output: "Annotated outline with technical feedback and suggestions.",
};

const SME_REVIEW_2: TaskSpec = TaskSpec {
    description: "1. Review the outline together with the first reviewer's feedback.\n\
                  2. Add additional context or risk analysis perspectives where needed.\n\
                  3. Ensure that the outline covers all potential risks and mitigation strategies.",
    expected_output: "Cybersecurity risk analysis and additional review inputs for the outline.",
};

const REFINE_OUTLINE: TaskSpec = TaskSpec {
    description: "1. Refine the outline based on the feedback from both reviewers.\n\
                  2. Adjust the structure to include all key points, \
                  supporting ideas, and details.\n\
                  3. Ensure that the hierarchical structure (I, A, i, (a), 1...) is followed.",
    expected_output: "A comprehensive outline with a hierarchical structure \
                     that incorporates all inputs.",
};

/// The six-stage outline writing crew.
pub fn writing_crew(model: Arc<dyn LanguageModel>) -> Result<Crew, CrewError> {
    let stages = vec![
        Stage::model(
            "parse_topic",
            TOPIC_PARSER,
            PARSE_TOPIC,
            &["abstract"],
            "topics",
            model.clone(),
        ),
        Stage::model(
            "research",
            RESEARCHER,
            RESEARCH,
            &["topics"],
            "research_summary",
            model.clone(),
        ),
        Stage::model(
            "outline",
            OUTLINER,
            OUTLINE,
            &["research_summary"],
            "outline",
            model.clone(),
        ),
        Stage::model(
            "sme_review_1",
            SME_1,
            SME_REVIEW_1,
            &["outline"],
            "sme1_feedback",
            model.clone(),
        ),
        Stage::model(
            "sme_review_2",
            SME_2,
            SME_REVIEW_2,
            &["outline", "sme1_feedback"],
            "sme2_feedback",
            model.clone(),
        ),
        Stage::model(
            "refine_outline",
            OUTLINER,
            REFINE_OUTLINE,
            &["outline", "sme1_feedback", "sme2_feedback"],
            "final_outline",
            model,
        ),
    ];
    Crew::new(WRITING_SEED_FIELDS, stages)
}

/// The three-stage conference submission crew.
pub fn rsac_crew() -> Result<Crew, CrewError> {
    let stages = vec![
        Stage::new(
            "title_abstract",
            TITLE_ABSTRACT_GENERATOR,
            &["abstract", "mission"],
            &["title", "session_abstract"],
            Arc::new(TemplateTask::new(title_abstract)),
        ),
        Stage::new(
            "session_details",
            DETAIL_WRITER,
            &["title", "session_abstract"],
            &["session_details"],
            Arc::new(TemplateTask::new(session_details)),
        ),
        Stage::new(
            "review_refine",
            SME_REVIEWER,
            &["session_details"],
            &["refined_details"],
            Arc::new(TemplateTask::new(review_refine)),
        ),
    ];
    Crew::new(RSAC_SEED_FIELDS, stages)
}

fn required<'a>(inputs: &'a Fields, field: &str) -> anyhow::Result<&'a str> {
    match inputs.get(field).map(|v| v.trim()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => anyhow::bail!("missing required input '{}'", field),
    }
}

fn title_abstract(inputs: &Fields) -> anyhow::Result<Fields> {
    required(inputs, "abstract")?;
    let mission = required(inputs, "mission")?;

    let title = format!("AI-Driven Identity Protection: {}", mission);
    let session_abstract = format!(
        "In an era of evolving digital threats, organizations must go beyond traditional IAM strategies. \
         This session, '{}', will reveal how AI-powered IAM solutions enable real-time risk assessment, \
         automated compliance scanning, and intelligent threat detection to protect identities and data. \
         Attendees will learn actionable strategies to strengthen IAM through AI innovation.",
        title
    );
    Ok(Fields::from([
        ("title".to_string(), title),
        ("session_abstract".to_string(), session_abstract),
    ]))
}

fn session_details(inputs: &Fields) -> anyhow::Result<Fields> {
    let title = required(inputs, "title")?;
    let session_abstract = required(inputs, "session_abstract")?;

    let details = format!(
        "**Session Title:** {}\n\n\
         **Abstract Overview:**\n{}\n\n\
         **Problem Statement:**\n\
         The rapid adoption of AI in IAM has brought new challenges, including real-time risk assessment, compliance management, and \
         threat detection. Without robust AI-powered tools, traditional IAM solutions are becoming ineffective against evolving threats.\n\n\
         **Key Discussion Points:**\n\
         - **Understanding AI-Specific IAM Challenges**: How AI introduces both new risks and opportunities in IAM.\n\
         - **AI-Driven Real-Time Risk Assessment**: Implementing dynamic, context-aware risk assessment in IAM systems.\n\
         - **Automated Compliance Management**: Using AI to automate compliance checks and streamline auditing.\n\
         - **Threat Detection in IAM Systems**: Leveraging AI for anomaly detection and real-time response.\n\n\
         This session will feature technical deep dives and real-world case studies from leading organizations that have successfully \
         integrated AI into their IAM strategies.",
        title, session_abstract
    );
    Ok(Fields::from([("session_details".to_string(), details)]))
}

fn review_refine(inputs: &Fields) -> anyhow::Result<Fields> {
    let details = required(inputs, "session_details")?;

    let mut refined = details.to_string();
    if !details.contains("compliance management") {
        refined.push_str(
            "\n\n**Suggested Improvement:** Expand on how AI improves compliance management, \
             particularly in regulated industries like finance and healthcare.",
        );
    }
    if !details.contains("real-world case studies") {
        refined.push_str(
            "\n\n**Suggested Improvement:** Include specific case studies demonstrating AI success in IAM.",
        );
    }
    Ok(Fields::from([("refined_details".to_string(), refined)]))
}

/// Consolidated submission text for an `rsac` run.
pub fn rsac_report(output: &CrewOutput) -> String {
    format!(
        "### Final RSA Conference Submission\n\n\
         **Session Title:** {}\n\n\
         **Abstract:**\n{}\n\n\
         **Session Details:**\n{}\n",
        output.get("title").unwrap_or("No title generated"),
        output.get("session_abstract").unwrap_or("No abstract generated"),
        output.get("refined_details").unwrap_or("No session details generated"),
    )
}

/// Consolidated outline text for a `writing` run.
pub fn writing_report(output: &CrewOutput) -> String {
    format!(
        "### Final Outline\n\n{}\n\n### Topics\n\n{}\n",
        output.get("final_outline").unwrap_or("No outline generated"),
        output.get("topics").unwrap_or("No topics extracted"),
    )
}
