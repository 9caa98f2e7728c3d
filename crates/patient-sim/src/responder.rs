//! In-character patient replies.

use crate::error::GenerationError;
use crate::gateway::GenerationGateway;
use crate::profile::DiseaseContext;

/// Build the reply prompt for one doctor question.
///
/// Layout:
///
/// ```text
/// Patient has been diagnosed with {disease}. Symptoms include {a, b, c}. {background}
/// Doctor's Question: {question}
/// {instructions}
/// Patient's Response:
/// ```
pub fn build_patient_prompt(
    context: &DiseaseContext,
    question: &str,
    instructions: &str,
) -> String {
    let mut prompt = format!("Patient has been diagnosed with {}. ", context.disease);
    if !context.symptoms.is_empty() {
        prompt.push_str(&format!("Symptoms include {}. ", context.symptom_list()));
    }
    prompt.push_str(&context.background_info);
    prompt.push('\n');
    prompt.push_str(&format!("Doctor's Question: {question}\n"));
    if !instructions.trim().is_empty() {
        prompt.push_str(instructions.trim());
        prompt.push('\n');
    }
    prompt.push_str("Patient's Response:");
    prompt
}

/// Answers doctor questions as the patient described by a [`DiseaseContext`].
pub struct PatientResponder<'a> {
    gateway: &'a dyn GenerationGateway,
    instructions: String,
}

impl<'a> PatientResponder<'a> {
    pub fn new(gateway: &'a dyn GenerationGateway) -> Self {
        Self {
            gateway,
            instructions: String::new(),
        }
    }

    /// Free-text steering appended to every reply prompt (e.g. "Answer
    /// briefly and sound anxious.").
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Reply using the responder's own instructions.
    pub async fn respond(
        &self,
        context: &DiseaseContext,
        question: &str,
    ) -> Result<String, GenerationError> {
        self.respond_with(context, question, &self.instructions).await
    }

    /// Reply steered by `instructions` for this question only.
    pub async fn respond_with(
        &self,
        context: &DiseaseContext,
        question: &str,
        instructions: &str,
    ) -> Result<String, GenerationError> {
        let prompt = build_patient_prompt(context, question, instructions);
        self.gateway.generate(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::FnGateway;
    use crate::profile::default_catalog;
    use std::sync::{Arc, Mutex};

    #[test]
    fn prompt_contains_context_and_question() {
        let ctx = &default_catalog()[1];
        let prompt = build_patient_prompt(ctx, "Are you thirsty a lot?", "");
        assert!(prompt.contains("Type 2 Diabetes"));
        for symptom in &ctx.symptoms {
            assert!(prompt.contains(symptom.as_str()), "missing {symptom}");
        }
        assert!(prompt.contains(&ctx.background_info));
        assert!(prompt.contains("Doctor's Question: Are you thirsty a lot?"));
        assert!(prompt.ends_with("Patient's Response:"));
    }

    #[test]
    fn instructions_are_included_when_present() {
        let ctx = &default_catalog()[0];
        let with = build_patient_prompt(ctx, "Q?", "Answer in one sentence.");
        assert!(with.contains("Answer in one sentence.\nPatient's Response:"));

        let without = build_patient_prompt(ctx, "Q?", "   ");
        assert!(without.contains("Doctor's Question: Q?\nPatient's Response:"));
    }

    #[test]
    fn symptomless_context_skips_symptom_sentence() {
        let ctx = DiseaseContext::new("Anxiety", Vec::<String>::new(), "Recently changed jobs.");
        let prompt = build_patient_prompt(&ctx, "How is work?", "");
        assert!(!prompt.contains("Symptoms include"));
        assert!(prompt.contains("Recently changed jobs."));
    }

    #[tokio::test]
    async fn respond_issues_exactly_one_call() {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let p = prompts.clone();
        let gateway = FnGateway::new(move |prompt: &str| {
            p.lock().unwrap().push(prompt.to_string());
            Ok("  It started last week. ".to_string())
        });
        let ctx = &default_catalog()[0];

        let reply = PatientResponder::new(&gateway)
            .with_instructions("Sound worried.")
            .respond(ctx, "When did the headaches start?")
            .await
            .unwrap();

        assert_eq!(reply, "It started last week.");
        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Migraine"));
        assert!(prompts[0].contains("headache, nausea, sensitivity to light"));
        assert!(prompts[0].contains("When did the headaches start?"));
        assert!(prompts[0].contains("Sound worried."));
    }

    #[tokio::test]
    async fn respond_with_overrides_instructions_for_one_call() {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let p = prompts.clone();
        let gateway = FnGateway::new(move |prompt: &str| {
            p.lock().unwrap().push(prompt.to_string());
            Ok("Since Monday.".to_string())
        });
        let ctx = &default_catalog()[0];
        let responder = PatientResponder::new(&gateway).with_instructions("Sound worried.");

        responder
            .respond_with(ctx, "Since when?", "Answer curtly.")
            .await
            .unwrap();
        responder.respond(ctx, "Anything else?").await.unwrap();

        let prompts = prompts.lock().unwrap();
        assert!(prompts[0].contains("Answer curtly.\nPatient's Response:"));
        assert!(!prompts[0].contains("Sound worried."));
        assert!(prompts[1].contains("Sound worried.\nPatient's Response:"));
    }

    #[tokio::test]
    async fn respond_propagates_errors_unchanged() {
        let gateway = FnGateway::new(|_| Err(GenerationError::EmptyResponse));
        let result = PatientResponder::new(&gateway)
            .respond(&default_catalog()[0], "Hi")
            .await;
        assert!(matches!(result, Err(GenerationError::EmptyResponse)));
    }
}
