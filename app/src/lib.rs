use std::io::{BufRead, Write};
use std::time::Duration;

use pdfqa_ai::embeddings::{Embedder, OpenAiEmbedder};
use pdfqa_ai::http::ServiceEndpoint;
use pdfqa_ai::llm::OpenAiChat;
use pdfqa_ai::pipeline::FEEDBACK_PROMPT;
use pdfqa_ai::retrieve::{InMemoryIndex, PineconeIndex, ScoreFilter, SearchOptions, VectorIndex};
use pdfqa_ai::sheets::SheetsLogSink;
use pdfqa_ai::{Event, NoticeLevel, Pipeline, PipelineSettings, View};
use pdfqa_core::config::{AppConfig, IndexBackend, LogBackend};
use pdfqa_core::domain::ResponsePolicy;
use pdfqa_core::error::AppError;
use pdfqa_core::logs::{LogSink, SqliteLogSink};
use pdfqa_core::session::SessionState;
use tracing::info;

pub const HELP: &str = "\
Type a question and press Enter to submit it.
  :short | :long   choose the response type for the next submission
  :up | :down      rate the current answer
  :render          redraw the current answer
  :clear           clear the query and answer
  :help            show this help
  :quit            exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Submit(String),
    SetPolicy(ResponsePolicy),
    Feedback(i64),
    Render,
    Clear,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    if let Some(policy) = trimmed.strip_prefix(':').and_then(ResponsePolicy::from_str) {
        return Command::SetPolicy(policy);
    }
    match trimmed {
        ":up" | ":+1" => Command::Feedback(1),
        ":down" | ":-1" => Command::Feedback(0),
        ":render" => Command::Render,
        ":clear" => Command::Clear,
        ":help" | ":h" => Command::Help,
        ":quit" | ":q" | ":exit" => Command::Quit,
        _ => Command::Submit(trimmed.to_string()),
    }
}

/// One user's session plus the response-type selector, as a UI would hold them.
#[derive(Debug, Default)]
pub struct Frontend {
    pub policy: ResponsePolicy,
    pub session: SessionState,
}

impl Frontend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the frame to draw, or `None` for commands that only touch the selector.
    pub fn dispatch(&mut self, pipeline: &Pipeline<'_>, cmd: Command) -> Option<View> {
        let event = match cmd {
            Command::Submit(text) => Event::Submit {
                text,
                policy: self.policy,
            },
            Command::SetPolicy(policy) => {
                self.policy = policy;
                return None;
            }
            Command::Feedback(score) => Event::Feedback(score),
            Command::Render => Event::Render,
            Command::Clear => Event::Clear,
            Command::Help | Command::Quit => return None,
        };
        Some(pipeline.handle(&mut self.session, event))
    }
}

pub fn render_text(view: &View) -> String {
    let mut out = String::new();

    for n in view.notices.iter() {
        let tag = match n.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        out.push_str(&format!("[{tag}] {}", n.message));
        if n.is_retryable_timeout() {
            out.push_str(" (timed out; submit the query again to retry)");
        }
        out.push('\n');
    }

    if let Some(answer) = &view.answer {
        out.push_str(&format!("\n{}\n\n", answer.text.trim_end()));
    }
    if view.ask_feedback {
        out.push_str(&format!("{FEEDBACK_PROMPT} (:up / :down)\n"));
    }

    if !view.evidence_rows.is_empty() {
        out.push_str("\nYOU CAN REFER TO THESE DOCUMENTS:\n");
        let pdf_w = view
            .evidence_rows
            .iter()
            .map(|r| r.pdf.chars().count())
            .max()
            .unwrap_or(0)
            .max(3);
        let page_w = view
            .evidence_rows
            .iter()
            .map(|r| r.page.chars().count())
            .max()
            .unwrap_or(0)
            .max(4);
        out.push_str(&format!("{:<pdf_w$}  {:<page_w$}  Link\n", "Pdf", "Page"));
        for r in view.evidence_rows.iter() {
            out.push_str(&format!(
                "{:<pdf_w$}  {:<page_w$}  <{}>\n",
                r.pdf, r.page, r.link
            ));
        }
        out.push('\n');
        for (i, text) in view.evidence_texts.iter().enumerate() {
            out.push_str(&format!("[{}] {}\n", i + 1, text.trim()));
        }
    }
    out
}

/// Live service clients built from config. The pipeline borrows from this.
pub struct Services {
    pub embedder: OpenAiEmbedder,
    pub index: Box<dyn VectorIndex>,
    pub chat: OpenAiChat,
    pub sink: Box<dyn LogSink>,
    pub chat_model: String,
    pub settings: PipelineSettings,
}

impl Services {
    pub fn from_config(cfg: &AppConfig) -> Result<Self, AppError> {
        let openai = &cfg.openai;
        let embed_timeout = Duration::from_secs(openai.embed_timeout_secs);
        let chat_timeout = Duration::from_secs(openai.chat_timeout_secs);
        let embedder = OpenAiEmbedder::new(
            ServiceEndpoint::new(&openai.base_url, embed_timeout)?,
            openai.api_key.clone(),
        );
        let chat = OpenAiChat::new(
            ServiceEndpoint::new(&openai.base_url, chat_timeout)?,
            openai.api_key.clone(),
        );

        let index = open_index(cfg, &embedder)?;

        Ok(Self {
            embedder,
            index,
            chat,
            sink: open_log_sink(cfg)?,
            chat_model: openai.chat_model.clone(),
            settings: settings_from_config(cfg),
        })
    }

    pub fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(
            &self.embedder,
            self.index.as_ref(),
            &self.chat,
            &self.chat_model,
            self.sink.as_ref(),
            self.settings.clone(),
        )
    }
}

pub fn settings_from_config(cfg: &AppConfig) -> PipelineSettings {
    PipelineSettings {
        embedding_model: cfg.openai.embedding_model.clone(),
        temperature: cfg.temperature,
        search: SearchOptions {
            top_k: cfg.pinecone.top_k,
            namespace: cfg.pinecone.namespace.clone(),
            filter: ScoreFilter::from_min_score(cfg.pinecone.min_score),
        },
    }
}

/// The hosted index, or a memory index seeded from the passages file.
pub fn open_index(
    cfg: &AppConfig,
    embedder: &dyn Embedder,
) -> Result<Box<dyn VectorIndex>, AppError> {
    let pc = &cfg.pinecone;
    match (pc.backend, &pc.passages_path) {
        (IndexBackend::Pinecone, _) => {
            let timeout = Duration::from_secs(pc.timeout_secs);
            Ok(Box::new(PineconeIndex::new(
                ServiceEndpoint::new(&pc.index_host, timeout)?,
                pc.api_key.clone(),
            )))
        }
        (IndexBackend::Memory, Some(path)) => {
            let index = InMemoryIndex::new();
            let model = &cfg.openai.embedding_model;
            index.seed_from_file(path, &pc.namespace, embedder, model)?;
            Ok(Box::new(index))
        }
        (IndexBackend::Memory, None) => Err(AppError::new(
            "CONFIG_INVALID",
            "pinecone.passages_path is required for the memory backend",
        )),
    }
}

pub fn open_log_sink(cfg: &AppConfig) -> Result<Box<dyn LogSink>, AppError> {
    match cfg.log.backend {
        LogBackend::Sheets => {
            let sheets = &cfg.log.sheets;
            let timeout = Duration::from_secs(sheets.timeout_secs);
            Ok(Box::new(SheetsLogSink::new(
                ServiceEndpoint::new(&sheets.base_url, timeout)?,
                sheets.access_token.clone(),
                sheets.worksheet.clone(),
                sheets.spreadsheets.clone(),
            )))
        }
        LogBackend::Sqlite => Ok(Box::new(SqliteLogSink::open(&cfg.sqlite_log_path())?)),
    }
}

fn write_out(output: &mut dyn Write, text: &str) -> Result<(), AppError> {
    output
        .write_all(text.as_bytes())
        .and_then(|_| output.flush())
        .map_err(|e| {
            AppError::new("IO_WRITE_FAILED", "Failed to write output").with_details(e.to_string())
        })
}

/// Read commands line by line until EOF or `:quit`, drawing a frame after each event.
pub fn run(
    pipeline: &Pipeline<'_>,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
    json: bool,
) -> Result<(), AppError> {
    let mut frontend = Frontend::new();
    if !json {
        write_out(output, &format!("{HELP}\n\n"))?;
    }

    let mut line = String::new();
    loop {
        line.clear();
        let n = input.read_line(&mut line).map_err(|e| {
            AppError::new("IO_READ_FAILED", "Failed to read input").with_details(e.to_string())
        })?;
        if n == 0 {
            break;
        }

        let cmd = parse_command(&line);
        match &cmd {
            Command::Quit => break,
            Command::Help => write_out(output, &format!("{HELP}\n"))?,
            Command::SetPolicy(p) if !json => {
                write_out(output, &format!("Response type: {}\n", p.as_str()))?
            }
            _ => {}
        }

        if let Some(view) = frontend.dispatch(pipeline, cmd) {
            let frame = if json {
                let mut s = serde_json::to_string(&view).map_err(|e| {
                    AppError::new("IO_WRITE_FAILED", "Failed to encode view")
                        .with_details(e.to_string())
                })?;
                s.push('\n');
                s
            } else {
                render_text(&view)
            };
            write_out(output, &frame)?;
        }
    }
    info!("input closed; session ended");
    Ok(())
}
