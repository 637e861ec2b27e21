use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use casestudy_ai::AnalysisPreset;
use casestudy_core::{ArtifactKind, Level, SessionConfig, Subject, parse_answer_sheet};
use clap::{Args, Parser, Subcommand};
use tracing::Level as LogLevel;

mod commands;
mod display;

use commands::App;

/// Case Study: issue-spotting practice with a Socratic coach and a strict grader.
#[derive(Parser, Debug)]
#[command(name = "casestudy", version, about, long_about = None)]
struct Cli {
    /// DuckDB file for saved artifacts (in-memory when omitted)
    #[arg(long, global = true, env = "CASESTUDY_DB")]
    db: Option<PathBuf>,

    #[arg(long, global = true, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_api_key: Option<String>,

    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    #[arg(long, global = true, env = "ANTHROPIC_BASE_URL")]
    anthropic_base_url: Option<String>,

    #[arg(long, global = true, env = "OPENAI_BASE_URL")]
    openai_base_url: Option<String>,

    #[arg(long, global = true, env = "COURTLISTENER_API_KEY", hide_env_values = true)]
    courtlistener_token: Option<String>,

    /// Directory large uploads are spooled through before extraction
    #[arg(long, global = true, env = "CASESTUDY_SPOOL_DIR")]
    spool_dir: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Subjects, level and focus shared by the coach and the evaluator.
#[derive(Args, Debug, Clone)]
struct SessionArgs {
    /// Subject(s) to cover; repeat or comma-separate
    #[arg(long = "subject", short = 's', required = true, value_delimiter = ',')]
    subjects: Vec<Subject>,

    /// 1L, 2L, 3L, Bar or Advanced
    #[arg(long, default_value = "1L")]
    level: Level,

    /// Extra focus for the session
    #[arg(long, default_value = "")]
    focus: String,
}

impl SessionArgs {
    fn config(&self) -> SessionConfig {
        SessionConfig::new(self.subjects.iter().copied(), self.level, self.focus.clone())
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate or load a fact pattern
    #[command(subcommand)]
    FactPattern(FactPatternCommands),

    /// Stream the coach's next turn for a fact pattern
    Coach {
        /// Fact pattern file (text, PDF or Word)
        #[arg(long)]
        fact_pattern: PathBuf,

        #[command(flatten)]
        session: SessionArgs,

        /// JSON conversation so far; updated with this turn
        #[arg(long)]
        history: Option<PathBuf>,

        /// Student reply to add to the history before asking
        #[arg(short, long)]
        message: Option<String>,

        /// Save the session as an artifact
        #[arg(long)]
        save: bool,

        #[arg(long, default_value = casestudy_ai::models::COACH)]
        model: String,
    },

    /// Grade an answer against the rubric
    Evaluate {
        #[arg(long)]
        fact_pattern: PathBuf,

        /// File containing the student's answer
        #[arg(long)]
        answer: PathBuf,

        #[command(flatten)]
        session: SessionArgs,

        /// Coaching history to keep with the saved artifact
        #[arg(long)]
        history: Option<PathBuf>,

        /// Write the report as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Write the report as Markdown
        #[arg(long)]
        markdown: Option<PathBuf>,

        #[arg(long)]
        save: bool,

        #[arg(long, default_value = casestudy_ai::models::EVALUATOR)]
        model: String,
    },

    /// Show the expected-issue tree of a saved JSON report
    Issues {
        report: PathBuf,

        /// Expand every node instead of the first two levels
        #[arg(long)]
        all: bool,
    },

    /// Generate or take multiple-choice quizzes
    #[command(subcommand)]
    Quiz(QuizCommands),

    /// Generate flashcards from study materials
    Flashcards {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(long)]
        instructions: Option<String>,

        #[arg(long)]
        save: bool,

        #[arg(long, default_value = casestudy_ai::models::FLASHCARDS)]
        model: String,
    },

    /// Analyse a document with a custom prompt or a preset
    Analyze {
        file: PathBuf,

        #[arg(long, conflicts_with = "preset", required_unless_present = "preset")]
        prompt: Option<String>,

        /// understand, summarize, legal-issues, key-points, case-brief or outline
        #[arg(long)]
        preset: Option<AnalysisPreset>,

        #[arg(long)]
        save: bool,

        #[arg(long, default_value = casestudy_ai::models::DOCUMENT_ANALYSIS)]
        model: String,
    },

    /// Ask the study assistant a question
    Chat {
        message: String,

        /// Documents to attach as context
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,

        /// JSON conversation so far; updated with this exchange
        #[arg(long)]
        history: Option<PathBuf>,

        #[arg(long)]
        save: bool,

        #[arg(long, default_value = casestudy_ai::models::CHAT)]
        model: String,
    },

    /// Saved artifacts
    #[command(subcommand)]
    Artifacts(ArtifactCommands),

    /// Case-law search on CourtListener
    #[command(subcommand)]
    Cases(CaseCommands),
}

#[derive(Subcommand, Debug)]
enum FactPatternCommands {
    /// Write a new fact pattern for the session
    Generate {
        #[command(flatten)]
        session: SessionArgs,

        /// Also write it to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, default_value = casestudy_ai::models::FACT_PATTERN)]
        model: String,
    },

    /// Extract a fact pattern from a document
    Extract { file: PathBuf },
}

#[derive(Subcommand, Debug)]
enum QuizCommands {
    /// Generate a quiz from study materials
    Generate {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(long)]
        instructions: Option<String>,

        #[arg(long)]
        save: bool,

        #[arg(long, default_value = casestudy_ai::models::QUIZ)]
        model: String,
    },

    /// Answer a saved quiz, score it and store the attempt
    Take {
        id: i64,

        /// One letter per question, e.g. `1=C,2=A,3=D`
        #[arg(long, value_parser = parse_answer_sheet)]
        answers: BTreeMap<u32, usize>,
    },
}

#[derive(Subcommand, Debug)]
enum ArtifactCommands {
    /// List saved artifacts, newest first
    #[command(alias = "ls")]
    List {
        #[arg(long)]
        kind: Option<ArtifactKind>,
    },

    /// Show one artifact
    Show {
        id: i64,

        /// Print the stored JSON instead of a card
        #[arg(long)]
        json: bool,
    },

    /// Delete one artifact
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum CaseCommands {
    /// Search opinions
    Search {
        query: String,

        /// Court id, e.g. scotus or ca9
        #[arg(long)]
        court: Option<String>,

        /// Precedential status, or `all`
        #[arg(long)]
        status: Option<String>,

        /// Filed on or after (YYYY-MM-DD)
        #[arg(long)]
        after: Option<String>,

        /// Filed on or before (YYYY-MM-DD)
        #[arg(long)]
        before: Option<String>,

        #[arg(long, default_value_t = casestudy_cases::MAX_PAGE_SIZE)]
        limit: u32,
    },

    /// Show one case by id (`cl-123-0` or a cluster number)
    Show { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            LogLevel::DEBUG
        } else {
            LogLevel::INFO
        })
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!("casestudy v{}", env!("CARGO_PKG_VERSION"));

    let app = App::open(&cli).await?;

    match cli.command {
        Commands::FactPattern(FactPatternCommands::Generate {
            session,
            output,
            model,
        }) => app.generate_fact_pattern(&session.config(), output, &model).await,
        Commands::FactPattern(FactPatternCommands::Extract { file }) => {
            app.extract_fact_pattern(&file).await
        }
        Commands::Coach {
            fact_pattern,
            session,
            history,
            message,
            save,
            model,
        } => {
            app.coach(&fact_pattern, &session.config(), history, message, save, &model)
                .await
        }
        Commands::Evaluate {
            fact_pattern,
            answer,
            session,
            history,
            json,
            markdown,
            save,
            model,
        } => {
            let outputs = commands::ReportOutputs { json, markdown };
            app.evaluate(
                &fact_pattern,
                &answer,
                &session.config(),
                history,
                outputs,
                save,
                &model,
            )
            .await
        }
        Commands::Issues { report, all } => commands::issues(&report, all),
        Commands::Quiz(QuizCommands::Generate {
            files,
            instructions,
            save,
            model,
        }) => app.quiz(&files, instructions, save, &model).await,
        Commands::Quiz(QuizCommands::Take { id, answers }) => app.take_quiz(id, answers),
        Commands::Flashcards {
            files,
            instructions,
            save,
            model,
        } => app.flashcards(&files, instructions, save, &model).await,
        Commands::Analyze {
            file,
            prompt,
            preset,
            save,
            model,
        } => {
            let prompt = match (prompt, preset) {
                (Some(prompt), _) => prompt,
                (None, Some(preset)) => preset.prompt().to_string(),
                (None, None) => anyhow::bail!("either --prompt or --preset is required"),
            };
            app.analyze(&file, &prompt, save, &model).await
        }
        Commands::Chat {
            message,
            attachments,
            history,
            save,
            model,
        } => app.chat(message, &attachments, history, save, &model).await,
        Commands::Artifacts(ArtifactCommands::List { kind }) => app.list_artifacts(kind),
        Commands::Artifacts(ArtifactCommands::Show { id, json }) => app.show_artifact(id, json),
        Commands::Artifacts(ArtifactCommands::Delete { id }) => app.delete_artifact(id),
        Commands::Cases(CaseCommands::Search {
            query,
            court,
            status,
            after,
            before,
            limit,
        }) => {
            let query = casestudy_cases::CaseQuery {
                query,
                court,
                status,
                filed_after: after,
                filed_before: before,
                limit,
            };
            app.search_cases(&query).await
        }
        Commands::Cases(CaseCommands::Show { id }) => app.show_case(&id).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn subjects_accept_commas_and_repeats() {
        let cli = Cli::try_parse_from([
            "casestudy",
            "fact-pattern",
            "generate",
            "--subject",
            "torts,contracts",
            "-s",
            "Torts",
            "--level",
            "2L",
        ])
        .unwrap();
        let Commands::FactPattern(FactPatternCommands::Generate { session, .. }) = cli.command
        else {
            panic!("wrong subcommand");
        };
        let config = session.config();
        assert_eq!(config.subjects, vec![Subject::Torts, Subject::Contracts]);
        assert_eq!(config.level, Level::SecondYear);
    }

    #[test]
    fn analyze_needs_prompt_or_preset() {
        assert!(Cli::try_parse_from(["casestudy", "analyze", "brief.pdf"]).is_err());
        let cli = Cli::try_parse_from(["casestudy", "analyze", "brief.pdf", "--preset", "case-brief"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Analyze {
                preset: Some(AnalysisPreset::CaseBrief),
                ..
            }
        ));
    }

    #[test]
    fn quiz_take_parses_answer_sheet() {
        let cli = Cli::try_parse_from(["casestudy", "quiz", "take", "4", "--answers", "1=c,2=A"])
            .unwrap();
        let Commands::Quiz(QuizCommands::Take { id, answers }) = cli.command else {
            panic!("wrong subcommand");
        };
        assert_eq!(id, 4);
        assert_eq!(answers, BTreeMap::from([(1, 2), (2, 0)]));
        assert!(
            Cli::try_parse_from(["casestudy", "quiz", "take", "4", "--answers", "1=7"]).is_err()
        );
    }

    #[test]
    fn unknown_artifact_kind_is_rejected() {
        assert!(
            Cli::try_parse_from(["casestudy", "artifacts", "list", "--kind", "essay"]).is_err()
        );
    }
}
