//! Subcommand handlers.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use casestudy_ai::{
    Coach, Evaluator, ModelRouter, ReplyStream, analyze_document, chat, generate_fact_pattern,
    generate_flashcards, generate_quiz,
};
use casestudy_cases::{CaseQuery, CourtListenerClient, parse_case_id};
use casestudy_core::{
    ArtifactData, ArtifactKind, ChatMessage, EvaluationReport, Expansion, FactPattern, IssueTree, NewArtifact,
    Role, SavedArtifact, SessionConfig, TimedMessage, render_text,
};
use casestudy_intake::{
    DocumentExtractor, IntakeError, LocalObjectStorage, TextExtractor, Upload, UploadRouter,
    combine_documents, extract_or_placeholder, format_file_size, intake_upload,
};
use casestudy_store::{ArtifactStore, DuckStore, MemoryStore};
use chrono::{Local, Utc};
use tracing::{info, warn};

use crate::{Cli, display};

/// Where `evaluate` writes exported reports.
pub struct ReportOutputs {
    pub json: Option<PathBuf>,
    pub markdown: Option<PathBuf>,
}

pub struct App {
    store: Box<dyn ArtifactStore>,
    persistent: bool,
    models: ModelRouter,
    uploads: UploadRouter,
    extractor: DocumentExtractor,
    courtlistener_token: Option<String>,
}

impl App {
    pub async fn open(cli: &Cli) -> Result<Self> {
        let store: Box<dyn ArtifactStore> = match &cli.db {
            Some(path) => {
                info!(path = %path.display(), "opening artifact store");
                Box::new(
                    DuckStore::open_persistent(path)
                        .with_context(|| format!("opening {}", path.display()))?,
                )
            }
            None => Box::new(MemoryStore::new()),
        };

        let mut models = ModelRouter::new(cli.anthropic_api_key.clone(), cli.openai_api_key.clone());
        models.anthropic_base_url = cli.anthropic_base_url.clone();
        models.openai_base_url = cli.openai_base_url.clone();

        let uploads = match &cli.spool_dir {
            Some(dir) => {
                let storage = LocalObjectStorage::new(dir.clone())
                    .await
                    .with_context(|| format!("creating spool dir {}", dir.display()))?;
                UploadRouter::with_storage(Arc::new(storage))
            }
            None => UploadRouter::direct(),
        };

        Ok(Self {
            store,
            persistent: cli.db.is_some(),
            models,
            uploads,
            extractor: DocumentExtractor::new(),
            courtlistener_token: cli.courtlistener_token.clone(),
        })
    }

    fn save(&self, artifact: NewArtifact) -> Result<()> {
        let saved = self.store.save(artifact)?;
        if !self.persistent {
            warn!("no --db given; the artifact only lives until this process exits");
        }
        println!("Saved artifact {}: {}", saved.id, saved.title);
        Ok(())
    }

    async fn read_upload(&self, path: &Path) -> Result<Upload> {
        let upload = Upload::from_path(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        info!(
            filename = %upload.filename,
            size = %format_file_size(upload.size()),
            "loaded file"
        );
        let route = self.uploads.route(upload).await;
        Ok(self.uploads.resolve(route).await?)
    }

    async fn read_uploads(&self, paths: &[PathBuf]) -> Result<Vec<Upload>> {
        let mut uploads = Vec::with_capacity(paths.len());
        for path in paths {
            uploads.push(self.read_upload(path).await?);
        }
        Ok(uploads)
    }

    async fn load_fact_pattern(&self, path: &Path) -> Result<FactPattern> {
        let upload = Upload::from_path(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(intake_upload(&self.uploads, &self.extractor, upload).await?)
    }

    // ── Fact patterns ──

    pub async fn generate_fact_pattern(
        &self,
        config: &SessionConfig,
        output: Option<PathBuf>,
        model: &str,
    ) -> Result<()> {
        let model = self.models.model(model)?;
        let text = generate_fact_pattern(model.as_ref(), config).await?;
        println!("{text}");
        if let Some(path) = output {
            tokio::fs::write(&path, &text)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "fact pattern written");
        }
        Ok(())
    }

    pub async fn extract_fact_pattern(&self, path: &Path) -> Result<()> {
        let fact_pattern = self.load_fact_pattern(path).await?;
        println!("{}", fact_pattern.text());
        Ok(())
    }

    // ── Coaching and evaluation ──

    pub async fn coach(
        &self,
        fact_pattern: &Path,
        config: &SessionConfig,
        history_path: Option<PathBuf>,
        message: Option<String>,
        save: bool,
        model: &str,
    ) -> Result<()> {
        let fact_pattern = self.load_fact_pattern(fact_pattern).await?;
        let mut history: Vec<ChatMessage> = read_json_or_default(history_path.as_deref()).await?;
        if let Some(message) = message {
            history.push(ChatMessage::user(message));
        }

        let coach = Coach::new(self.models.model(model)?);
        let reply = coach.reply(&fact_pattern, config, &history).await?;
        let text = stream_to_stdout(reply).await?;
        history.push(ChatMessage::assistant(text));

        if let Some(path) = &history_path {
            write_json(path, &history).await?;
        }
        if save {
            self.save(NewArtifact::issue_spotting(&fact_pattern, config, &history, None))?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn evaluate(
        &self,
        fact_pattern: &Path,
        answer: &Path,
        config: &SessionConfig,
        history_path: Option<PathBuf>,
        outputs: ReportOutputs,
        save: bool,
        model: &str,
    ) -> Result<()> {
        let fact_pattern = self.load_fact_pattern(fact_pattern).await?;
        let answer = tokio::fs::read_to_string(answer)
            .await
            .with_context(|| format!("reading {}", answer.display()))?;

        let evaluator = Evaluator::new(self.models.model(model)?);
        let evaluation = evaluator.evaluate(&fact_pattern, config, &answer).await?;
        print!("{}", display::evaluation_card(&evaluation));

        if let Some(path) = &outputs.json {
            write_text(path, &evaluation.report.to_json_pretty()?).await?;
        }
        if let Some(path) = &outputs.markdown {
            let date = Local::now().format("%Y-%m-%d").to_string();
            write_text(path, &evaluation.report.to_markdown(&date)).await?;
        }
        if save {
            let history: Vec<ChatMessage> = read_json_or_default(history_path.as_deref()).await?;
            self.save(NewArtifact::issue_spotting(
                &fact_pattern,
                config,
                &history,
                Some(evaluation.report),
            ))?;
        }
        Ok(())
    }

    // ── Study materials ──

    pub async fn quiz(
        &self,
        files: &[PathBuf],
        instructions: Option<String>,
        save: bool,
        model: &str,
    ) -> Result<()> {
        let uploads = self.read_uploads(files).await?;
        let materials = combine_documents(&self.extractor, &uploads).await?;
        let model = self.models.model(model)?;
        let quiz = generate_quiz(model.as_ref(), &materials, instructions.as_deref()).await?;
        print!("{}", display::quiz_card(&quiz));
        if save {
            self.save(NewArtifact::quiz(quiz, instructions, file_names(&uploads)))?;
        }
        Ok(())
    }

    /// Score answers to a saved quiz and write the attempt back.
    pub fn take_quiz(&self, id: i64, answers: BTreeMap<u32, usize>) -> Result<()> {
        let taken = submit_quiz(self.store.as_ref(), id, answers)?;
        if let ArtifactData::Quiz(data) = &taken.data {
            print!("{}", display::quiz_result(data));
        }
        if !self.persistent {
            warn!("no --db given; the attempt only lives until this process exits");
        }
        println!("Updated artifact {}: {}", taken.id, taken.summary);
        Ok(())
    }

    pub async fn flashcards(
        &self,
        files: &[PathBuf],
        instructions: Option<String>,
        save: bool,
        model: &str,
    ) -> Result<()> {
        let uploads = self.read_uploads(files).await?;
        let materials = combine_documents(&self.extractor, &uploads).await?;
        let model = self.models.model(model)?;
        let deck = generate_flashcards(model.as_ref(), &materials, instructions.as_deref()).await?;
        print!("{}", display::flashcard_card(&deck));
        if save {
            self.save(NewArtifact::flashcards(deck, instructions, file_names(&uploads)))?;
        }
        Ok(())
    }

    pub async fn analyze(&self, file: &Path, prompt: &str, save: bool, model: &str) -> Result<()> {
        let upload = self.read_upload(file).await?;
        let text = self.extractor.extract(&upload).await?;
        if text.trim().is_empty() {
            return Err(IntakeError::EmptyText(upload.filename).into());
        }
        let model = self.models.model(model)?;
        let analysis = analyze_document(model.as_ref(), &text, prompt).await?;
        println!("{analysis}");
        if save {
            self.save(NewArtifact::document(&upload.filename, analysis, Some(text)))?;
        }
        Ok(())
    }

    pub async fn chat(
        &self,
        message: String,
        attachments: &[PathBuf],
        history_path: Option<PathBuf>,
        save: bool,
        model: &str,
    ) -> Result<()> {
        let mut history: Vec<TimedMessage> = read_json_or_default(history_path.as_deref()).await?;

        let mut content = message;
        let mut attached = Vec::new();
        for path in attachments {
            let upload = self.read_upload(path).await?;
            let text = extract_or_placeholder(&self.extractor, &upload).await;
            content.push_str(&format!("\n\n[Document: {}]\n\n{text}", upload.filename));
            attached.push(upload.filename);
        }
        history.push(TimedMessage {
            role: Role::User,
            content,
            timestamp: Utc::now(),
        });

        let messages: Vec<ChatMessage> = history
            .iter()
            .map(|m| ChatMessage {
                role: m.role,
                content: m.content.clone(),
            })
            .collect();
        let model = self.models.model(model)?;
        let reply = chat(model.as_ref(), &messages).await?;
        let text = stream_to_stdout(reply).await?;
        history.push(TimedMessage {
            role: Role::Assistant,
            content: text,
            timestamp: Utc::now(),
        });

        if let Some(path) = &history_path {
            write_json(path, &history).await?;
        }
        if save {
            let context = (!attached.is_empty()).then(|| attached.join(", "));
            self.save(NewArtifact::chat(history, context))?;
        }
        Ok(())
    }

    // ── Artifacts ──

    pub fn list_artifacts(&self, kind: Option<ArtifactKind>) -> Result<()> {
        let artifacts = self.store.list(kind)?;
        if artifacts.is_empty() {
            println!("No saved artifacts.");
            return Ok(());
        }
        for artifact in &artifacts {
            println!("{}", display::artifact_row(artifact));
        }
        Ok(())
    }

    pub fn show_artifact(&self, id: i64, json: bool) -> Result<()> {
        let artifact = self.store.get(id)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&artifact)?);
        } else {
            print!("{}", display::artifact_card(&artifact));
        }
        Ok(())
    }

    pub fn delete_artifact(&self, id: i64) -> Result<()> {
        if !self.store.delete(id)? {
            bail!("artifact {id} not found");
        }
        println!("Deleted artifact {id}");
        Ok(())
    }

    // ── Cases ──

    fn case_client(&self) -> Result<CourtListenerClient> {
        let token = self
            .courtlistener_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .context("CourtListener API key not configured (set COURTLISTENER_API_KEY)")?;
        Ok(CourtListenerClient::new(token))
    }

    pub async fn search_cases(&self, query: &CaseQuery) -> Result<()> {
        query.validate()?;
        let results = self.case_client()?.search(query).await?;
        print!("{}", display::case_list(&results));
        Ok(())
    }

    pub async fn show_case(&self, id: &str) -> Result<()> {
        let cluster_id = parse_case_id(id)?;
        let case = self.case_client()?.cluster(cluster_id).await?;
        print!("{}", display::case_card(&case));
        Ok(())
    }
}

/// Render the expected-issue tree of an exported report.
pub fn issues(path: &Path, all: bool) -> Result<()> {
    let json =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let report = EvaluationReport::from_json(&json)
        .with_context(|| format!("{} is not a valid evaluation report", path.display()))?;
    let expansion = if all {
        Expansion::all_expanded()
    } else {
        Expansion::default()
    };
    println!(
        "{} expected issues, {} nodes",
        report.expected_issues.len(),
        IssueTree::count(&report.expected_issues)
    );
    print!("{}", render_text(&report.expected_issues, &expansion));
    Ok(())
}

/// Print a streamed reply as it arrives. Ctrl-C stops the stream and keeps
/// what was received.
///
/// Once installed, the Ctrl-C listener replaces the default SIGINT handling
/// for the rest of the process, so after the stream ends the watcher keeps
/// running and exits with status 130 on the next Ctrl-C.
async fn stream_to_stdout(reply: ReplyStream) -> Result<String> {
    let handle = reply.abort_handle();
    let streaming = Arc::new(AtomicBool::new(true));
    let interrupted = Arc::new(AtomicBool::new(false));
    let (live, flag) = (streaming.clone(), interrupted.clone());
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match on_ctrl_c(&live) {
                CtrlC::AbortStream => {
                    flag.store(true, Ordering::SeqCst);
                    handle.abort();
                }
                CtrlC::Exit => std::process::exit(INTERRUPTED_EXIT_CODE),
            }
        }
    });

    let mut stdout = std::io::stdout();
    let text = reply
        .finish(|chunk, _| {
            let _ = write!(stdout, "{chunk}");
            let _ = stdout.flush();
        })
        .await;
    streaming.store(false, Ordering::SeqCst);
    println!();

    let text = text?;
    if interrupted.load(Ordering::SeqCst) {
        warn!(chars = text.len(), "reply interrupted; keeping partial text");
    }
    Ok(text)
}

/// 128 + SIGINT, as a shell reports it.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug, PartialEq, Eq)]
enum CtrlC {
    AbortStream,
    Exit,
}

/// The first Ctrl-C during a stream stops it; any other Ctrl-C exits.
fn on_ctrl_c(streaming: &AtomicBool) -> CtrlC {
    if streaming.swap(false, Ordering::SeqCst) {
        CtrlC::AbortStream
    } else {
        CtrlC::Exit
    }
}

/// Score a saved quiz and write the attempt back under the same id.
fn submit_quiz(
    store: &dyn ArtifactStore,
    id: i64,
    answers: BTreeMap<u32, usize>,
) -> Result<SavedArtifact> {
    let mut artifact = store.get(id)?.into_new();
    let kind = artifact.kind();
    let ArtifactData::Quiz(data) = &mut artifact.data else {
        bail!("artifact {id} is a {kind}, not a quiz");
    };
    let score = data
        .submit(answers)
        .with_context(|| format!("answers do not fit quiz {id}"))?;
    artifact.summary = data.summary();
    info!(id, score, questions = data.questions.len(), "quiz submitted");
    Ok(store.update(id, artifact)?)
}

fn file_names(uploads: &[Upload]) -> Vec<String> {
    uploads.iter().map(|u| u.filename.clone()).collect()
}

/// Parse a JSON file, or the default when no path is given or the file does
/// not exist yet.
async fn read_json_or_default<T>(path: Option<&Path>) -> Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    let Some(path) = path else {
        return Ok(T::default());
    };
    match tokio::fs::read_to_string(path).await {
        Ok(json) => serde_json::from_str(&json)
            .with_context(|| format!("{} is not valid JSON for this command", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_text(path, &json).await
}

async fn write_text(path: &Path, text: &str) -> Result<()> {
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), bytes = text.len(), "wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_history_file_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        let history: Vec<ChatMessage> = read_json_or_default(Some(&path)).await.unwrap();
        assert!(history.is_empty());
        let none: Vec<ChatMessage> = read_json_or_default(None).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn history_round_trips_through_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        let history = vec![
            ChatMessage::assistant("What duties arise here?"),
            ChatMessage::user("A duty of reasonable care."),
        ];
        write_json(&path, &history).await.unwrap();
        let loaded: Vec<ChatMessage> = read_json_or_default(Some(&path)).await.unwrap();
        assert_eq!(loaded, history);
    }

    #[tokio::test]
    async fn malformed_history_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{not json").unwrap();
        let result: Result<Vec<ChatMessage>> = read_json_or_default(Some(&path)).await;
        assert!(result.is_err());
    }

    #[test]
    fn ctrl_c_aborts_stream_once_then_exits() {
        let streaming = AtomicBool::new(true);
        assert_eq!(on_ctrl_c(&streaming), CtrlC::AbortStream);
        assert_eq!(on_ctrl_c(&streaming), CtrlC::Exit);

        let finished = AtomicBool::new(false);
        assert_eq!(on_ctrl_c(&finished), CtrlC::Exit);
    }

    fn saved_quiz(store: &MemoryStore) -> i64 {
        let question = |id, correct_answer| casestudy_core::QuizQuestion {
            id,
            question: format!("Question {id}"),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answer,
            explanation: "Because.".into(),
            topic: None,
        };
        let quiz = casestudy_core::Quiz {
            questions: vec![question(1, 0), question(2, 3)],
        };
        store
            .save(NewArtifact::quiz(quiz, None, vec!["contracts.pdf".into()]))
            .unwrap()
            .id
    }

    #[test]
    fn submitted_quiz_is_saved_with_score() {
        let store = MemoryStore::new();
        let id = saved_quiz(&store);
        let answers = casestudy_core::parse_answer_sheet("1=A,2=b").unwrap();
        let taken = submit_quiz(&store, id, answers).unwrap();
        assert_eq!(taken.summary, "2 multiple-choice questions, scored 1/2");

        let ArtifactData::Quiz(data) = store.get(id).unwrap().data else {
            panic!("expected quiz payload");
        };
        assert_eq!(data.score, Some(1));
        assert!(data.completed);
        assert_eq!(data.user_answers, BTreeMap::from([(1, 0), (2, 1)]));
    }

    #[test]
    fn submit_quiz_leaves_store_untouched_on_bad_answers() {
        let store = MemoryStore::new();
        let id = saved_quiz(&store);
        assert!(submit_quiz(&store, id, BTreeMap::from([(1, 0)])).is_err());
        let ArtifactData::Quiz(data) = store.get(id).unwrap().data else {
            panic!("expected quiz payload");
        };
        assert!(!data.completed);

        let doc = store
            .save(NewArtifact::document("brief.pdf", "Holding.".into(), None))
            .unwrap();
        assert!(submit_quiz(&store, doc.id, BTreeMap::from([(1, 0)])).is_err());
    }

    #[test]
    fn issues_rejects_invalid_report() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        std::fs::write(&path, r#"{"rubricVersion": "x"}"#).unwrap();
        assert!(issues(&path, false).is_err());
    }
}
