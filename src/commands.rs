use crate::{emit_success, OutputMode};
use owo_colors::OwoColorize;
use sqlfold::config::{self, SqlfoldConfig};
use sqlfold::ui::table::{pattern_rows, FileRow, StatementRow, VersionRow};
use sqlfold::ui::{
    self, banner, header, render, section, stats_table, success, summary_row, Icons, ProgressManager,
    ProgressMessage, ProgressPhase,
};
use sqlfold::{Discovery, GeneratorOptions, PatternTable, SqlGenerator, Workspace};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Settings shared by every command
pub struct Context {
    pub mode: OutputMode,
    pub config: SqlfoldConfig,
}

impl Context {
    pub fn load(mode: OutputMode, config_path: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = config_path {
            if !path.exists() {
                anyhow::bail!("config not found at {}", path.display());
            }
        }
        let config = config::load_config(config_path)?.unwrap_or_default();
        Ok(Self { mode, config })
    }

    fn human(&self) -> bool {
        self.mode.is_human() && !sqlfold::output::is_quiet()
    }

    fn patterns_path(&self) -> PathBuf {
        PathBuf::from(&self.config.patterns)
    }

    fn load_patterns(&self) -> anyhow::Result<PatternTable> {
        config::load_patterns(&self.patterns_path())
    }

    /// Discover and parse everything under `paths`.
    fn load_workspace(&self, paths: &[PathBuf]) -> anyhow::Result<Workspace> {
        let discovery = Discovery::new(&self.config.include, &self.config.exclude)?;
        let files = discovery.discover(paths);
        if files.is_empty() {
            anyhow::bail!("no migration files found");
        }

        let mut ws = Workspace::with_table(self.load_patterns()?);
        ws.set_segmenter_options(self.config.segmenter_options());
        if let Some(threads) = self.config.threads {
            ws.set_threads(threads);
        }

        let start = Instant::now();
        let failures = if self.human() {
            header(&format!("Parsing {} migration file(s)", files.len()));
            let (progress, tx) = ProgressManager::new();
            let failures = ws.parse_paths(&files, Some(tx));
            let statements = ws.statements().len();
            let unparsed = ws.files().iter().filter(|f| f.has_unparsed()).count();
            progress.finish_with_summary(start.elapsed(), ws.files().len(), statements, unparsed);
            failures?
        } else {
            ws.parse_paths(&files, None)?
        };

        for failure in &failures {
            if self.mode.is_human() {
                ui::warn(&format!("Could not read {}: {}", failure.path, failure.error));
            }
        }
        Ok(ws)
    }
}

pub fn run_parse(ctx: &Context, paths: &[PathBuf], unparsed: Option<&Path>) -> anyhow::Result<()> {
    let ws = ctx.load_workspace(paths)?;
    let residue = ws.unparsed();

    if let Some(path) = unparsed {
        config::ensure_parent_dir(path)?;
        std::fs::write(path, &residue)?;
    }

    if ctx.mode.is_human() {
        section("Files");
        let rows: Vec<FileRow> = ws.files().iter().map(FileRow::from).collect();
        println!("{}", render(&rows));
        let total: usize = ws.files().iter().map(|f| f.stats.total_lines).sum();
        let parsed: usize = ws.files().iter().map(|f| f.stats.parsed_lines).sum();
        summary_row("Lines classified:", &format!("{}/{}", parsed, total));

        section("Statements");
        let statements = ws.statements();
        let rows: Vec<StatementRow> = statements.iter().map(StatementRow::from).collect();
        println!("{}", render(&rows));

        if residue.is_empty() {
            success("Every statement was classified");
        } else {
            let files = ws.files().iter().filter(|f| f.has_unparsed()).count();
            ui::warn(&format!("Unclassified SQL in {} file(s)", files));
            match unparsed {
                Some(path) => ui::info("Unparsed SQL written to", &path.display().to_string()),
                None => println!("{}", ui::dim("Use --unparsed FILE to save it")),
            }
        }
    } else {
        let data = serde_json::json!({
            "files": ws.files(),
            "unparsed": residue,
        });
        emit_success(ctx.mode, "parse", data)?;
    }
    Ok(())
}

pub fn run_generate(
    ctx: &Context,
    paths: &[PathBuf],
    output: Option<PathBuf>,
    no_summary: bool,
) -> anyhow::Result<()> {
    let ws = ctx.load_workspace(paths)?;
    let generator = SqlGenerator::with_options(GeneratorOptions {
        include_summary: ctx.config.summary && !no_summary,
        ..GeneratorOptions::default()
    });

    let progress = ctx.human().then(ProgressManager::new);
    if let Some((_, tx)) = &progress {
        tx.send(ProgressMessage::Started {
            phase: ProgressPhase::Generating,
            total: 1,
        })
        .ok();
    }

    let statements = ws.statements();
    let script = generator.generate(&statements);
    let latest = generator.plan(&statements).iter().map(|(_, s)| s.len()).sum::<usize>();

    if let Some((manager, tx)) = progress {
        tx.send(ProgressMessage::Finished {
            phase: ProgressPhase::Generating,
        })
        .ok();
        drop(tx);
        manager.finish();
    }

    let output = output.or_else(|| ctx.config.output.as_ref().map(PathBuf::from));
    match &output {
        Some(path) => {
            config::ensure_parent_dir(path)?;
            std::fs::write(path, &script)?;
        }
        None if ctx.mode.is_human() => print!("{}", script),
        None => {}
    }

    if ctx.mode.is_human() {
        if let Some(path) = &output {
            println!(
                "{}",
                stats_table(&[
                    ("Statements", statements.len().to_string()),
                    ("Latest versions", latest.to_string()),
                    ("Output", path.display().to_string()),
                ])
            );
            success(&format!("Wrote {}", path.display()));
        }
    } else {
        let inline = output.is_none().then_some(script);
        let data = serde_json::json!({
            "statements": statements.len(),
            "latest": latest,
            "output": output.as_ref().map(|p| p.display().to_string()),
            "script": inline,
        });
        emit_success(ctx.mode, "generate", data)?;
    }
    Ok(())
}

pub fn run_versions(
    ctx: &Context,
    paths: &[PathBuf],
    kind: Option<&str>,
    name: Option<&str>,
) -> anyhow::Result<()> {
    let ws = ctx.load_workspace(paths)?;
    let sets: Vec<_> = ws
        .version_sets()
        .into_iter()
        .filter(|s| kind.is_none_or(|k| s.kind == k))
        .filter(|s| name.is_none_or(|n| s.name == n))
        .collect();

    if ctx.mode.is_human() {
        section("Versions");
        let rows: Vec<VersionRow> = sets.iter().map(VersionRow::from).collect();
        println!("{}", render(&rows));

        for set in sets.iter().filter(|s| s.len() > 1) {
            println!();
            println!("{} {} {}", Icons::LINK, set.kind.bold(), set.name);
            for version in &set.versions {
                println!(
                    "  {} {} {}",
                    version.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    version.hash,
                    ui::muted(&version.file_name)
                );
            }
        }
    } else {
        emit_success(ctx.mode, "versions", serde_json::to_value(&sets)?)?;
    }
    Ok(())
}

pub fn run_deps(ctx: &Context, paths: &[PathBuf], object: &str) -> anyhow::Result<()> {
    let ws = ctx.load_workspace(paths)?;
    let found = ws.dependencies(object);

    if ctx.mode.is_human() {
        section(&format!("References to {}", object));
        if found.is_empty() {
            println!("{}", ui::dim("No statements reference this object"));
        } else {
            let rows: Vec<StatementRow> = found.iter().map(StatementRow::from).collect();
            println!("{}", render(&rows));
        }
    } else {
        let data = serde_json::json!({
            "object": object,
            "statements": found,
        });
        emit_success(ctx.mode, "deps", data)?;
    }
    Ok(())
}

pub fn run_patterns_list(ctx: &Context) -> anyhow::Result<()> {
    let table = ctx.load_patterns()?;
    if ctx.mode.is_human() {
        section("Patterns");
        println!("{}", render(&pattern_rows(&table)));
        ui::info("Type order", &table.kinds().join(", "));
    } else {
        let data = serde_json::json!({
            "order": table.kinds(),
            "patterns": table.to_records(false),
        });
        emit_success(ctx.mode, "patterns", data)?;
    }
    Ok(())
}

pub fn run_patterns_add(ctx: &Context, kind: &str, regex: &str, description: &str) -> anyhow::Result<()> {
    let mut table = ctx.load_patterns()?;
    let wire = table.add_custom(kind, regex, description)?.regexes[0].to_wire();
    config::save_patterns(&ctx.patterns_path(), &table)?;

    if ctx.mode.is_human() {
        success(&format!("Added {} pattern {}", kind, wire));
    } else {
        emit_success(ctx.mode, "patterns.add", serde_json::json!({ "type": kind, "regex": wire }))?;
    }
    Ok(())
}

pub fn run_patterns_import(ctx: &Context, file: &Path) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(file)?;
    let mut table = ctx.load_patterns()?;
    let report = table.import_json(&json)?;
    config::save_patterns(&ctx.patterns_path(), &table)?;

    if ctx.mode.is_human() {
        success(&format!("Imported {} pattern(s)", report.imported));
        for rejected in &report.rejected {
            ui::warn(&format!("Entry #{} rejected: {}", rejected.index, rejected.reason));
        }
    } else {
        emit_success(ctx.mode, "patterns.import", serde_json::to_value(&report)?)?;
    }
    Ok(())
}

pub fn run_patterns_export(ctx: &Context, all: bool, output: Option<&Path>) -> anyhow::Result<()> {
    let table = ctx.load_patterns()?;
    let json = table.export_json(!all)?;

    match output {
        Some(path) => {
            config::ensure_parent_dir(path)?;
            std::fs::write(path, &json)?;
            if ctx.mode.is_human() {
                success(&format!("Exported patterns to {}", path.display()));
            } else {
                emit_success(ctx.mode, "patterns.export", serde_json::json!({ "output": path.display().to_string() }))?;
            }
        }
        None if ctx.mode.is_human() => println!("{}", json),
        None => emit_success(ctx.mode, "patterns.export", serde_json::from_str(&json)?)?,
    }
    Ok(())
}

pub fn run_patterns_reset(ctx: &Context) -> anyhow::Result<()> {
    let mut table = ctx.load_patterns()?;
    table.reset();
    config::save_patterns(&ctx.patterns_path(), &table)?;

    if ctx.mode.is_human() {
        success("Pattern table reset to defaults");
    } else {
        emit_success(ctx.mode, "patterns.reset", serde_json::json!({ "order": table.kinds() }))?;
    }
    Ok(())
}

pub fn run_patterns_order(ctx: &Context, kinds: &[String]) -> anyhow::Result<()> {
    let mut table = ctx.load_patterns()?;
    let kinds: Vec<&str> = kinds.iter().map(String::as_str).collect();
    table.set_order(&kinds)?;
    config::save_patterns(&ctx.patterns_path(), &table)?;

    if ctx.mode.is_human() {
        ui::info("Type order", &table.kinds().join(", "));
    } else {
        emit_success(ctx.mode, "patterns.order", serde_json::json!({ "order": table.kinds() }))?;
    }
    Ok(())
}

pub fn run_init(mode: OutputMode, config_path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_config_path);
    let config = SqlfoldConfig::default();
    config::write_config(&path, &config, force)?;

    let root = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    config::ensure_gitignore(root)?;

    if mode.is_human() {
        success(&format!("Wrote {}", path.display()));
        ui::info("Patterns", &config.patterns);
    } else {
        emit_success(mode, "init", serde_json::json!({ "config": path.display().to_string() }))?;
    }
    Ok(())
}

pub fn run_version(mode: OutputMode) -> anyhow::Result<()> {
    if mode.is_human() {
        banner(
            &format!("{} {}", Icons::PACKAGE, "sqlfold".bold().style(ui::theme().info.clone())),
            &format!("Version {}", env!("CARGO_PKG_VERSION")),
        );
    } else {
        let data = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        });
        emit_success(mode, "version", data)?;
    }
    Ok(())
}
