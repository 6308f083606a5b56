//! Interactive question/answer loop over an indexed collection.

use std::io::{self, Write};
use std::time::Instant;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use crate::error::QueryError;
use crate::models::{QuerySession, RetrievedSegment};
use crate::services::{AnswerComposer, FALLBACK_ANSWER, Retriever};

pub const DEFAULT_PROMPT: &str = "\n❓ Ask a question about the PDF: ";
pub const DEFAULT_ANSWER_MARKER: &str = "\n💡 Answer:\n";
const EXIT_COMMAND: &str = "exit";

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub questions: usize,
    pub answered: usize,
    pub failed: usize,
}

enum Reply {
    Answered(QuerySession),
    Failed(String),
}

enum LoopState {
    WaitingForInput,
    Retrieving(String),
    Composing {
        question: String,
        hits: Vec<RetrievedSegment>,
        started: Instant,
    },
    Printing(Reply),
    Exited,
}

pub struct QueryLoop {
    retriever: Retriever,
    composer: AnswerComposer,
    prompt: String,
    answer_marker: String,
    show_sources: bool,
}

impl QueryLoop {
    pub fn new(retriever: Retriever, composer: AnswerComposer) -> Self {
        Self {
            retriever,
            composer,
            prompt: DEFAULT_PROMPT.to_string(),
            answer_marker: DEFAULT_ANSWER_MARKER.to_string(),
            show_sources: false,
        }
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn with_answer_marker(mut self, marker: impl Into<String>) -> Self {
        self.answer_marker = marker.into();
        self
    }

    /// Append the page numbers of the retrieved segments to each answer.
    #[must_use]
    pub fn with_sources(mut self, show_sources: bool) -> Self {
        self.show_sources = show_sources;
        self
    }

    /// Answer a single question.
    ///
    /// An empty collection yields the fallback answer without calling the model.
    pub async fn answer(&self, question: &str) -> Result<QuerySession, QueryError> {
        let started = Instant::now();
        let hits = match self.retriever.retrieve(question).await {
            Ok(hits) => hits,
            Err(QueryError::EmptyCollection(collection)) => {
                debug!(collection = %collection, "nothing indexed, answering with fallback");
                return Ok(fallback_session(question, started));
            }
            Err(e) => return Err(e),
        };

        let answer = self.composer.compose(question, &hits).await?;
        Ok(QuerySession {
            question: question.to_string(),
            retrieved: hits,
            answer,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Prompt, read a line, answer it, repeat until `exit` or end of input.
    ///
    /// Query failures are printed and the loop continues. Only I/O errors on
    /// `input` or `output` end it early.
    pub async fn run<R, W>(&self, mut input: R, mut output: W) -> io::Result<SessionSummary>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut summary = SessionSummary::default();
        let mut state = LoopState::WaitingForInput;
        let mut line = String::new();

        loop {
            state = match state {
                LoopState::WaitingForInput => {
                    write!(output, "{}", self.prompt)?;
                    output.flush()?;

                    line.clear();
                    let read = input.read_line(&mut line).await?;
                    let question = line.trim();

                    if read == 0 || question.eq_ignore_ascii_case(EXIT_COMMAND) {
                        LoopState::Exited
                    } else if question.is_empty() {
                        LoopState::WaitingForInput
                    } else {
                        LoopState::Retrieving(question.to_string())
                    }
                }
                LoopState::Retrieving(question) => {
                    summary.questions += 1;
                    let started = Instant::now();
                    match self.retriever.retrieve(&question).await {
                        Ok(hits) => LoopState::Composing {
                            question,
                            hits,
                            started,
                        },
                        Err(QueryError::EmptyCollection(_)) => {
                            LoopState::Printing(Reply::Answered(fallback_session(&question, started)))
                        }
                        Err(e) => {
                            warn!(error = %e, "retrieval failed");
                            LoopState::Printing(Reply::Failed(retrieval_apology(&e)))
                        }
                    }
                }
                LoopState::Composing {
                    question,
                    hits,
                    started,
                } => match self.composer.compose(&question, &hits).await {
                    Ok(answer) => LoopState::Printing(Reply::Answered(QuerySession {
                        question,
                        retrieved: hits,
                        answer,
                        duration_ms: started.elapsed().as_millis() as u64,
                    })),
                    Err(e) => {
                        warn!(error = %e, "generation failed");
                        LoopState::Printing(Reply::Failed(format!(
                            "Sorry, the question \"{question}\" could not be answered: {e}"
                        )))
                    }
                },
                LoopState::Printing(reply) => {
                    match reply {
                        Reply::Answered(session) => {
                            summary.answered += 1;
                            self.print_answer(&mut output, &session)?;
                        }
                        Reply::Failed(message) => {
                            summary.failed += 1;
                            writeln!(output, "\n{message}")?;
                        }
                    }
                    LoopState::WaitingForInput
                }
                LoopState::Exited => break,
            };
        }

        writeln!(output)?;
        output.flush()?;
        debug!(
            questions = summary.questions,
            answered = summary.answered,
            failed = summary.failed,
            "query loop finished"
        );
        Ok(summary)
    }

    fn print_answer<W: Write>(&self, output: &mut W, session: &QuerySession) -> io::Result<()> {
        write!(output, "{}", self.answer_marker)?;
        writeln!(output, "{}", session.answer)?;
        if self.show_sources {
            let pages = session.source_pages();
            if !pages.is_empty() {
                writeln!(output, "{}", format_source_pages(&pages))?;
            }
        }
        Ok(())
    }
}

/// `Sources: p.3, p.5`
pub fn format_source_pages(pages: &[u32]) -> String {
    let pages: Vec<String> = pages.iter().map(|p| format!("p.{p}")).collect();
    format!("Sources: {}", pages.join(", "))
}

fn fallback_session(question: &str, started: Instant) -> QuerySession {
    QuerySession {
        question: question.to_string(),
        retrieved: Vec::new(),
        answer: FALLBACK_ANSWER.to_string(),
        duration_ms: started.elapsed().as_millis() as u64,
    }
}

fn retrieval_apology(error: &QueryError) -> String {
    match error {
        QueryError::Embedding(e) => {
            format!("Sorry, the question could not be embedded right now: {e}")
        }
        QueryError::VectorStore(e) => {
            format!("Sorry, the document index is unavailable right now: {e}")
        }
        other => format!("Sorry, something went wrong: {other}"),
    }
}
