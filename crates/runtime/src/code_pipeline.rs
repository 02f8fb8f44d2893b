//! The code artifact pipeline.
//!
//! Receives code snapshots from the candidate editor, rejects unchanged
//! content cheaply, persists new revisions immediately, and schedules a
//! debounced LLM prompt so the model sees the state of the solution after a
//! natural pause rather than every keystroke. Persistence failures never
//! cancel the prompt.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use similar::TextDiff;

use viva_domain::chat::Message;
use viva_domain::enums::CodeLanguage;
use viva_domain::error::Result;
use viva_domain::frames::{ClientEvent, CodeContent, Frame};
use viva_store::SolutionStore;

use crate::debounce::Debounce;
use crate::pipeline::{Outlet, Processor};

struct CodeState {
    /// Last seen content per (question, interview), for the quick reject.
    cache: HashMap<(String, String), String>,
    submission_count: u32,
}

pub struct CodePipeline {
    solutions: Arc<dyn SolutionStore>,
    state: Arc<Mutex<CodeState>>,
    debounce: Debounce,
}

impl CodePipeline {
    pub fn new(solutions: Arc<dyn SolutionStore>, quiet: Duration) -> Self {
        Self {
            solutions,
            state: Arc::new(Mutex::new(CodeState {
                cache: HashMap::new(),
                submission_count: 0,
            })),
            debounce: Debounce::new(quiet),
        }
    }

    async fn handle(&mut self, code: CodeContent, out: &Outlet) {
        if code.content.is_empty() {
            tracing::warn!(question_id = %code.question_id, "empty code content received");
            return;
        }

        let key = (code.question_id.clone(), code.candidate_interview_id.clone());
        let language = CodeLanguage::normalize(&code.language);

        // Step 2: quick reject against the in-memory snapshot.
        if self.state.lock().cache.get(&key).map(String::as_str) == Some(code.content.as_str()) {
            tracing::debug!(question_id = %code.question_id, "unchanged code (cache), skipping");
            return;
        }

        // Step 3: diff against the persisted latest.
        let existing = match self
            .solutions
            .get(&code.question_id, &code.candidate_interview_id)
            .await
        {
            Ok(existing) => existing,
            Err(e) => {
                tracing::warn!(error = %e, "solution lookup failed, treating as first submission");
                None
            }
        };
        let is_first = existing.is_none();

        if let Some(previous) = &existing {
            if previous.answer == code.content {
                tracing::debug!(question_id = %code.question_id, "unchanged code (store), refreshing cache");
                self.state.lock().cache.insert(key, code.content);
                return;
            }
            let diff = TextDiff::from_lines(previous.answer.as_str(), code.content.as_str())
                .unified_diff()
                .header("previous", "current")
                .to_string();
            tracing::debug!(
                question_id = %code.question_id,
                diff_lines = diff.lines().count(),
                "code changed\n{diff}"
            );
        } else {
            tracing::info!(question_id = %code.question_id, "first code submission");
        }

        // Step 4: persist the new revision. Errors are logged but do not
        // cancel the prompt.
        if let Err(e) = self
            .solutions
            .upsert(
                &code.question_id,
                &code.candidate_interview_id,
                &code.content,
                language.as_str(),
            )
            .await
        {
            tracing::error!(question_id = %code.question_id, error = %e, "failed to persist code revision");
        }
        self.state.lock().cache.insert(key, code.content.clone());

        // Step 5: (re)arm the debounced prompt with this snapshot.
        let state = self.state.clone();
        let out = out.clone();
        let quiet_secs = self.debounce.quiet().as_secs();
        self.debounce.schedule(move || async move {
            let count = {
                let mut s = state.lock();
                s.submission_count += 1;
                s.submission_count
            };
            let prompt = build_code_prompt(is_first, count, language, &code.content, quiet_secs);
            tracing::info!(
                question_id = %code.question_id,
                submission_count = count,
                is_first,
                "debounce elapsed, sending code to LLM"
            );
            out.push(Frame::LlmAppend {
                messages: vec![Message::user(prompt)],
                run_llm: true,
            })
            .await;
        });
    }
}

#[async_trait::async_trait]
impl Processor for CodePipeline {
    fn name(&self) -> &'static str {
        "code_pipeline"
    }

    async fn process(&mut self, frame: Frame, out: &Outlet) -> Result<()> {
        match frame {
            Frame::Client(ClientEvent::Code(code)) => {
                self.handle(code, out).await;
            }
            other => out.push(other).await,
        }
        Ok(())
    }
}

/// Prompt shown to the model when the quiet window elapses.
fn build_code_prompt(
    is_first: bool,
    submission_count: u32,
    language: CodeLanguage,
    code: &str,
    quiet_secs: u64,
) -> String {
    let heading = if is_first {
        "CANDIDATE CODE SUBMISSION - INITIAL SOLUTION"
    } else {
        "CANDIDATE CODE SUBMISSION - INCREMENTAL UPDATE"
    };
    let context = if is_first {
        format!(
            "This is the candidate's first code submission, captured after \
             {quiet_secs} seconds of inactivity. It may be incomplete or an \
             early approach; judge the direction rather than the syntax."
        )
    } else {
        format!(
            "The candidate kept refining their solution; this snapshot was \
             captured after another {quiet_secs} seconds of inactivity. Assess \
             the progress since the previous version and whether the solution \
             is approaching completeness."
        )
    };

    let mut prompt = format!(
        "{heading}\n\n\
         Language: {}\n\
         Submission count: {submission_count}\n\n\
         Current solution state:\n```{}\n{code}\n```\n\n\
         {context}\n\n\
         The candidate writes in a whiteboard-like editor, so expect minor \
         typos. Respond only if meaningful feedback is warranted; otherwise \
         keep observing.",
        language.as_str(),
        language.as_str().to_ascii_lowercase(),
    );

    let indicators = completeness_indicators(code, language);
    if !indicators.is_empty() {
        prompt.push_str("\n\nSolution completeness indicators:\n");
        for indicator in indicators {
            prompt.push_str("- ");
            prompt.push_str(&indicator);
            prompt.push('\n');
        }
    }
    prompt
}

/// Heuristic signals about how finished the solution looks.
fn completeness_indicators(code: &str, language: CodeLanguage) -> Vec<String> {
    let lower = code.to_lowercase();
    let non_empty_lines = code.lines().filter(|l| !l.trim().is_empty()).count();
    let mut indicators = Vec::new();
    let mut concerns = 0usize;

    if non_empty_lines > 3 {
        indicators.push("has substantial code structure".to_string());
    } else {
        indicators.push("minimal code structure".to_string());
        concerns += 1;
    }

    let has_function = match language {
        CodeLanguage::Javascript | CodeLanguage::Typescript => {
            lower.contains("function") || code.contains("=>")
        }
        CodeLanguage::Python => code.contains("def "),
        CodeLanguage::Java | CodeLanguage::Csharp => {
            lower.contains("public") || lower.contains("static")
        }
        CodeLanguage::Go => code.contains("func "),
        CodeLanguage::Cpp => lower.contains("int main") || code.contains("::"),
        CodeLanguage::Ruby => code.contains("def "),
        CodeLanguage::Php => lower.contains("function"),
        CodeLanguage::Sql => lower.contains("select"),
    };
    if has_function {
        indicators.push("contains a function or entry point".to_string());
    }
    if lower.contains("return") {
        indicators.push("has a return statement".to_string());
    }
    if ["if", "else", "for", "while"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        indicators.push("contains control flow".to_string());
    }
    if ["todo", "fixme", "your code"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        indicators.push("contains placeholder comments".to_string());
        concerns += 1;
    }
    if ["//", "#", "/*", "--"].iter().any(|c| code.contains(c)) {
        indicators.push("contains comments".to_string());
    }

    let assessment = if indicators.len() >= 4 && concerns == 0 {
        "appears substantially complete; consider active engagement"
    } else if indicators.len() >= 3 {
        "moderate progress; continue monitoring"
    } else {
        "early stage; allow continued development"
    };
    indicators.push(assessment.to_string());
    indicators
}
