use super::file::{FileParser, ParsedFile, SourceFile};
use crate::classifier::PinnedRule;
use crate::pattern::PatternTable;
use crate::segmenter::SegmenterOptions;
use crate::ui::{ProgressMessage, ProgressPhase};
use crate::{Error, Result};
use chrono::Utc;
use crossbeam::channel::{self, Sender};
use serde::Serialize;
use std::path::PathBuf;

/// A file the batch could not read. The rest of the batch is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: String,
    pub error: String,
}

/// Parsed files in input order plus per-file failures.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub files: Vec<ParsedFile>,
    pub failures: Vec<FileFailure>,
}

impl BatchResult {
    /// Every statement of the batch in file order
    pub fn statements(&self) -> impl Iterator<Item = &crate::Statement> {
        self.files.iter().flat_map(|f| f.statements.iter())
    }

    /// Residue of all files, separated by blank lines
    pub fn unparsed(&self) -> String {
        self.files
            .iter()
            .filter(|f| f.has_unparsed())
            .map(|f| f.unparsed.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Message sent from parser workers to the collector
#[derive(Debug)]
enum ParseMessage {
    Processed { index: usize, file: Box<ParsedFile> },
    Failed { index: usize, path: String, error: String },
}

impl ParseMessage {
    fn index(&self) -> usize {
        match self {
            Self::Processed { index, .. } | Self::Failed { index, .. } => *index,
        }
    }
}

/// Parses many files on a worker pool sharing one read-only pattern table.
pub struct BatchParser<'a> {
    parser: FileParser<'a>,
    threads: usize,
    progress: Option<Sender<ProgressMessage>>,
}

impl<'a> BatchParser<'a> {
    pub fn new(table: &'a PatternTable) -> Self {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            parser: FileParser::new(table),
            threads,
            progress: None,
        }
    }

    pub fn with_options(mut self, options: SegmenterOptions) -> Self {
        self.parser = self.parser.with_options(options);
        self
    }

    pub fn with_pins(mut self, pins: Vec<PinnedRule>) -> Self {
        self.parser = self.parser.with_pins(pins);
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Report per-file progress on `tx`
    pub fn with_progress(mut self, tx: Sender<ProgressMessage>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Read and parse files from disk
    pub fn parse_paths(&self, paths: &[PathBuf]) -> Result<BatchResult> {
        self.run(paths, |path| (path.display().to_string(), SourceFile::read(path)))
    }

    /// Parse in-memory sources
    pub fn parse_sources(&self, sources: &[SourceFile]) -> Result<BatchResult> {
        self.run(sources, |source| (source.name.clone(), Ok(source.clone())))
    }

    fn run<T, F>(&self, items: &[T], load: F) -> Result<BatchResult>
    where
        T: Sync,
        F: Fn(&T) -> (String, Result<SourceFile>) + Sync,
    {
        // One clock for the whole batch, so untimestamped files tie and
        // resolve by input order.
        let fallback = Utc::now();
        let workers = self.threads.min(items.len()).max(1);

        self.report(ProgressMessage::Started {
            phase: ProgressPhase::Parsing,
            total: items.len(),
        });

        let (job_tx, job_rx) = channel::unbounded::<usize>();
        for index in 0..items.len() {
            job_tx.send(index).map_err(|_| Error::WorkerPanic)?;
        }
        drop(job_tx);

        let (msg_tx, msg_rx) = channel::unbounded::<ParseMessage>();

        let slots = crossbeam::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let msg_tx = msg_tx.clone();
                let load = &load;
                let parser = &self.parser;

                scope.spawn(move |_| {
                    for index in job_rx.iter() {
                        let (path, loaded) = load(&items[index]);
                        let message = match loaded {
                            Ok(source) => ParseMessage::Processed {
                                index,
                                file: Box::new(parser.parse(&source, fallback)),
                            },
                            Err(e) => ParseMessage::Failed {
                                index,
                                path,
                                error: e.to_string(),
                            },
                        };
                        if msg_tx.send(message).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(msg_tx);

            let mut slots: Vec<Option<ParseMessage>> = (0..items.len()).map(|_| None).collect();
            for (done, message) in msg_rx.iter().enumerate() {
                let file = match &message {
                    ParseMessage::Processed { file, .. } => file.filename.clone(),
                    ParseMessage::Failed { path, .. } => path.clone(),
                };
                self.report(ProgressMessage::Progress {
                    phase: ProgressPhase::Parsing,
                    current: done + 1,
                    file: Some(file),
                });
                let index = message.index();
                slots[index] = Some(message);
            }
            slots
        })
        .map_err(|_| Error::WorkerPanic)?;

        let mut result = BatchResult::default();
        for message in slots.into_iter().flatten() {
            match message {
                ParseMessage::Processed { file, .. } => result.files.push(*file),
                ParseMessage::Failed { path, error, .. } => {
                    tracing::warn!("Failed to read {}: {}", path, error);
                    self.report(ProgressMessage::Error(format!("{}: {}", path, error)));
                    result.failures.push(FileFailure { path, error });
                }
            }
        }

        self.report(ProgressMessage::Finished {
            phase: ProgressPhase::Parsing,
        });

        tracing::info!(
            "Parsed {} files ({} statements, {} failures) on {} workers",
            result.files.len(),
            result.statements().count(),
            result.failures.len(),
            workers
        );

        Ok(result)
    }

    fn report(&self, message: ProgressMessage) {
        if let Some(tx) = &self.progress {
            // Progress is best-effort; a closed display does not stop parsing.
            let _ = tx.send(message);
        }
    }
}
