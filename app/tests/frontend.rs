use std::cell::Cell;
use std::fs;
use std::io::Cursor;

use pdfqa_ai::embeddings::Embedder;
use pdfqa_ai::llm::{ChatCompletion, ChatModel, ChatRequest};
use pdfqa_ai::retrieve::{search, IndexMatch, IndexQuery, MatchMetadata, VectorIndex};
use pdfqa_ai::{Pipeline, View};
use pdfqa_core::config::AppConfig;
use pdfqa_core::domain::ResponsePolicy;
use pdfqa_core::error::AppError;
use pdfqa_core::logs::{LogName, SqliteLogSink};
use pdfqa_core::session::SessionPhase;
use pdfqa_lib::{
    open_log_sink, parse_command, render_text, run, settings_from_config, Command, Frontend,
    Services,
};
use pretty_assertions::assert_eq;

struct FixedEmbedder;

impl Embedder for FixedEmbedder {
    fn embed(&self, _model: &str, _input: &str) -> Result<Vec<f32>, AppError> {
        Ok(vec![0.0, 1.0])
    }
}

struct TwoDocs;

impl VectorIndex for TwoDocs {
    fn query(&self, _req: &IndexQuery<'_>) -> Result<Vec<IndexMatch>, AppError> {
        let doc = |id: &str, score: f32| IndexMatch {
            id: id.to_string(),
            score,
            metadata: Some(MatchMetadata {
                text: Some(format!("text of {id}")),
                pdf_name: Some(format!("{id}.pdf")),
                page_range: Some(serde_json::json!("2-3")),
                link: Some(format!("https://docs.example.org/{id}.pdf")),
            }),
        };
        Ok(vec![doc("manual", 0.9), doc("faq", 0.6)])
    }
}

#[derive(Default)]
struct CountingLlm {
    calls: Cell<u32>,
    last_max_tokens: Cell<u32>,
}

impl ChatModel for CountingLlm {
    fn complete(&self, req: &ChatRequest) -> Result<ChatCompletion, AppError> {
        self.calls.set(self.calls.get() + 1);
        self.last_max_tokens.set(req.max_tokens);
        Ok(ChatCompletion {
            content: "The manual covers it.".to_string(),
            total_tokens: 42,
        })
    }
}

struct TimingOutLlm;

impl ChatModel for TimingOutLlm {
    fn complete(&self, _req: &ChatRequest) -> Result<ChatCompletion, AppError> {
        Err(AppError::new("GENERATION_TIMEOUT", "Completion request timed out")
            .with_retryable(true))
    }
}

const CONFIG: &str = r#"
temperature = 0.1

[openai]
api_key = "sk-test"

[pinecone]
api_key = "pc-test"
index_host = "https://test-larg-openai-abc.svc.pinecone.io"
min_score = 0.65

[log]
backend = "sqlite"
"#;

fn test_pipeline<'a>(llm: &'a dyn ChatModel, sink: &'a SqliteLogSink) -> Pipeline<'a> {
    let cfg = AppConfig::from_toml_str(CONFIG).unwrap();
    Pipeline::new(
        &FixedEmbedder,
        &TwoDocs,
        llm,
        "gpt-4o",
        sink,
        settings_from_config(&cfg),
    )
}

#[test]
fn parses_commands() {
    assert_eq!(parse_command(":long\n"), Command::SetPolicy(ResponsePolicy::Long));
    assert_eq!(parse_command(":short"), Command::SetPolicy(ResponsePolicy::Short));
    assert_eq!(parse_command(":LONG"), Command::SetPolicy(ResponsePolicy::Long));
    assert_eq!(
        parse_command(":medium"),
        Command::Submit(":medium".to_string())
    );
    assert_eq!(parse_command(":up"), Command::Feedback(1));
    assert_eq!(parse_command(":down"), Command::Feedback(0));
    assert_eq!(parse_command(":clear"), Command::Clear);
    assert_eq!(parse_command(":render"), Command::Render);
    assert_eq!(parse_command(":q"), Command::Quit);
    assert_eq!(
        parse_command("  What is covered?  \n"),
        Command::Submit("What is covered?".to_string())
    );
    assert_eq!(parse_command("\n"), Command::Submit(String::new()));
}

#[test]
fn selector_policy_applies_to_next_submission() {
    let sink = SqliteLogSink::open_in_memory().unwrap();
    let llm = CountingLlm::default();
    let pipeline = test_pipeline(&llm, &sink);

    let mut fe = Frontend::new();
    assert!(fe.dispatch(&pipeline, Command::SetPolicy(ResponsePolicy::Long)).is_none());
    let view = fe
        .dispatch(&pipeline, Command::Submit("What is covered?".to_string()))
        .unwrap();
    assert_eq!(view.policy, ResponsePolicy::Long);
    assert_eq!(llm.last_max_tokens.get(), 4096);
    assert_eq!(view.phase, SessionPhase::FeedbackPending);

    fe.dispatch(&pipeline, Command::Feedback(1)).unwrap();
    assert_eq!(sink.rows(LogName::Usage).unwrap().len(), 1);
    let feedback = sink.rows(LogName::Feedback).unwrap();
    assert_eq!(feedback.len(), 1);
    assert_eq!(feedback[0].cells[3], "Positive");
}

#[test]
fn text_frame_shows_answer_prompt_and_table() {
    let sink = SqliteLogSink::open_in_memory().unwrap();
    let llm = CountingLlm::default();
    let pipeline = test_pipeline(&llm, &sink);

    let mut fe = Frontend::new();
    let view: View = fe
        .dispatch(&pipeline, Command::Submit("What is covered?".to_string()))
        .unwrap();
    let text = render_text(&view);

    assert!(text.contains("The manual covers it."));
    assert!(text.contains("Was this answer helpful to you?"));
    assert!(text.contains("YOU CAN REFER TO THESE DOCUMENTS:"));
    assert!(text.contains("Pdf"));
    assert!(text.contains("<https://docs.example.org/manual.pdf>"));
    // min_score = 0.65 drops the faq passage.
    assert!(!text.contains("faq.pdf"));
    assert!(text.contains("[1] text of manual"));
}

#[test]
fn run_loop_dispatches_until_quit() {
    let sink = SqliteLogSink::open_in_memory().unwrap();
    let llm = CountingLlm::default();
    let pipeline = test_pipeline(&llm, &sink);

    let mut input = Cursor::new("\nWhat is covered?\n:render\n:down\n:quit\nignored question\n");
    let mut output: Vec<u8> = Vec::new();
    run(&pipeline, &mut input, &mut output, false).unwrap();

    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("[warning] Enter the Query"));
    assert!(text.contains("[ok] Thank you for your feedback!"));
    assert_eq!(llm.calls.get(), 1);
    assert_eq!(sink.rows(LogName::Feedback).unwrap()[0].cells[3], "Negative");
}

#[test]
fn json_mode_emits_one_view_per_event() {
    let sink = SqliteLogSink::open_in_memory().unwrap();
    let llm = CountingLlm::default();
    let pipeline = test_pipeline(&llm, &sink);

    let mut input = Cursor::new(":long\nWhat is covered?\n:clear\n");
    let mut output: Vec<u8> = Vec::new();
    run(&pipeline, &mut input, &mut output, true).unwrap();

    let lines: Vec<serde_json::Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["phase"], "feedback_pending");
    assert_eq!(lines[0]["policy"], "long");
    assert_eq!(lines[1]["phase"], "idle");
}

#[test]
fn settings_and_sink_come_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs.sqlite");
    let raw = format!("{CONFIG}sqlite_path = {:?}\n", path.display().to_string());
    let cfg = AppConfig::from_toml_str(&raw).unwrap();

    let settings = settings_from_config(&cfg);
    assert_eq!(settings.embedding_model, "text-embedding-3-large");
    assert_eq!(settings.search.top_k, 8);
    assert_eq!(settings.temperature, 0.1);

    let sink = open_log_sink(&cfg).unwrap();
    sink.append_row(
        LogName::Usage,
        &["ts".to_string(), "q".to_string(), "a".to_string(), "1".to_string()],
    )
    .unwrap();
    assert!(path.exists());
}

#[test]
fn timeout_notice_carries_retry_hint() {
    let sink = SqliteLogSink::open_in_memory().unwrap();
    let pipeline = test_pipeline(&TimingOutLlm, &sink);

    let mut fe = Frontend::new();
    let view = fe
        .dispatch(&pipeline, Command::Submit("What is covered?".to_string()))
        .unwrap();
    let text = render_text(&view);

    assert!(text.contains(
        "[error] Error generating response: Completion request timed out \
         (timed out; submit the query again to retry)"
    ));
    assert!(text.contains("No response generated."));
    assert_eq!(sink.rows(LogName::Usage).unwrap()[0].cells[3], "0");
}

#[test]
fn memory_backend_is_built_from_passages_file() {
    let dir = tempfile::tempdir().unwrap();
    let passages = dir.path().join("passages.json");
    fs::write(
        &passages,
        r#"[
            {"text": "warranty lasts two years", "pdf_name": "manual.pdf",
             "page_range": "4", "link": "https://docs.example.org/manual.pdf",
             "vector": [0.0, 1.0]},
            {"text": "returns within 30 days", "pdf_name": "faq.pdf",
             "page_range": "2", "link": "https://docs.example.org/faq.pdf",
             "vector": [1.0, 0.0]}
        ]"#,
    )
    .unwrap();
    let raw = format!(
        "[openai]\napi_key = \"sk-test\"\n\n\
         [pinecone]\nbackend = \"memory\"\npassages_path = {:?}\n\n\
         [log]\nbackend = \"sqlite\"\nsqlite_path = {:?}\n",
        passages.display().to_string(),
        dir.path().join("logs.sqlite").display().to_string(),
    );
    let cfg = AppConfig::from_toml_str(&raw).unwrap();

    let services = Services::from_config(&cfg).unwrap();
    let out = search(services.index.as_ref(), &[0.1, 0.9], &services.settings.search);
    assert!(out.error.is_none());
    assert_eq!(out.result.len(), 2);
    assert_eq!(out.result.items[0].source_title, "manual.pdf");
}
