use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use quizdup::core::category::normalize_categories;
use quizdup::core::exact::{find_exact_duplicates, remove_exact_duplicates};
use quizdup::core::scanner::{ScanPhase, ScanProgress};
use quizdup::{
    CorpusMatch, CorpusScanner, MatchPolicy, PatternKeywordExtractor, QuestionBank, Report,
    ScanOptions, SimilarityScorer,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Characters of question text shown in listings.
const PREVIEW_CHARS: usize = 60;

#[derive(Parser, Debug)]
#[command(name = "quizdup", version, about = "CLI for finding duplicate quiz questions")]
struct Cli {
    /// Log debug detail to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Duplicate workflows
    Duplicates {
        #[command(subcommand)]
        command: Dups,
    },
}

#[derive(Subcommand, Debug)]
enum Dups {
    /// Compare new candidate questions against an existing bank and each other
    Scan {
        /// Existing question bank
        #[arg(short, long, value_name = "FILE")]
        corpus: PathBuf,
        /// New candidate questions
        #[arg(short = 'n', long, value_name = "FILE")]
        candidates: PathBuf,
        /// Report every corpus match above the floor, not just the best one
        #[arg(long)]
        all_matches: bool,
        /// Additional keyword regex (repeatable)
        #[arg(long = "pattern", value_name = "REGEX")]
        patterns: Vec<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Also write the JSON report to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Exit with an error when duplicates or collisions are found
        #[arg(long)]
        fail_on_duplicates: bool,
    },

    /// List identical question texts and repeated ids in one bank
    Exact {
        /// Question bank to check
        #[arg(short, long, value_name = "FILE")]
        path: PathBuf,
    },

    /// Rewrite category spelling variants to their canonical names
    Categories {
        /// Question bank to rewrite
        #[arg(short, long, value_name = "FILE")]
        path: PathBuf,
        /// Only show what would change
        #[arg(long)]
        dry_run: bool,
    },

    /// Drop questions whose text repeats an earlier one (backup kept as `<name>.backup.json`)
    Remove {
        /// Question bank to rewrite
        #[arg(short, long, value_name = "FILE")]
        path: PathBuf,
        /// Only show what would be removed
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanOutput<'a> {
    generated_at: DateTime<Utc>,
    report: &'a Report,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Duplicates { command } => match command {
            Dups::Scan {
                corpus,
                candidates,
                all_matches,
                patterns,
                json,
                output,
                fail_on_duplicates,
            } => {
                let corpus_bank = load_bank(&corpus)?;
                let candidate_bank = load_bank(&candidates)?;

                let extractor = PatternKeywordExtractor::with_extra_patterns(&patterns)
                    .context("Invalid --pattern")?;
                let policy = if all_matches {
                    MatchPolicy::AllAboveFloor
                } else {
                    MatchPolicy::BestOnly
                };

                if !json {
                    println!(
                        "▶ Scanning {} candidate(s) against {} existing question(s)",
                        candidate_bank.questions.len(),
                        corpus_bank.questions.len()
                    );
                }

                let bar = progress_bar(candidate_bank.questions.len() as u64, json)?;
                let progress = bar.clone();
                let scanner = CorpusScanner::with_scorer(SimilarityScorer::with_extractor(extractor))
                    .with_options(ScanOptions { policy })
                    .with_progress(move |p: ScanProgress| match p.phase {
                        ScanPhase::CorpusComparison => progress.set_position(p.processed as u64),
                        ScanPhase::BatchComparison => {
                            progress.set_message(format!("batch pairs {}/{}", p.processed, p.total))
                        }
                        ScanPhase::Complete => progress.finish_and_clear(),
                    });

                let report = benchmark("comparing questions", !json, || {
                    scanner.scan(&candidate_bank.questions, &corpus_bank.questions)
                })
                .with_context(|| {
                    format!(
                        "Failed to scan {} against {}",
                        candidates.display(),
                        corpus.display()
                    )
                })?;
                bar.finish_and_clear();

                let rendered = serde_json::to_string_pretty(&ScanOutput {
                    generated_at: Utc::now(),
                    report: &report,
                })?;
                if json {
                    println!("{}", rendered);
                } else {
                    print_report(&report);
                }
                if let Some(out) = output {
                    fs::write(&out, rendered + "\n")
                        .with_context(|| format!("Failed to write report {:?}", out))?;
                    if !json {
                        println!("\n✅ Report written to {}", out.display());
                    }
                }

                if fail_on_duplicates && !report.is_clean() {
                    anyhow::bail!(
                        "{} duplicate(s) and {} collision(s) found",
                        report.duplicates.len(),
                        report.collisions.len()
                    );
                }
            }

            Dups::Exact { path } => {
                println!("▶ Checking exact duplicates in: {}", path.display());
                let bank = QuestionBank::load_unchecked(&path)
                    .with_context(|| format!("Failed to read question bank {:?}", path))?;
                let report = find_exact_duplicates(&bank.questions);

                println!("Total questions: {}", bank.questions.len());
                println!("Unique question texts: {}", report.unique_texts);

                if report.text_duplicates.is_empty() {
                    println!("No duplicate question texts found.");
                } else {
                    println!("Found {} duplicate question text(s):", report.text_duplicates.len());
                    for (i, dup) in report.text_duplicates.iter().enumerate() {
                        println!("\n [Duplicate #{}] {}", i + 1, preview(&dup.text));
                        println!(
                            "   ▶ first:     {} ({} {})",
                            dup.first.id, dup.first.level, dup.first.category
                        );
                        println!(
                            "   ▶ duplicate: {} ({} {})",
                            dup.duplicate.id, dup.duplicate.level, dup.duplicate.category
                        );
                    }
                }

                if report.id_duplicates.is_empty() {
                    println!("\nNo duplicate ids found.");
                } else {
                    println!("\nFound {} duplicate id(s):", report.id_duplicates.len());
                    for dup in &report.id_duplicates {
                        println!(
                            "   ▶ {} at indices {}, {}",
                            dup.id, dup.first_index, dup.duplicate_index
                        );
                    }
                }
            }

            Dups::Categories { path, dry_run } => {
                println!("▶ Normalizing categories in: {}", path.display());
                let mut bank = QuestionBank::load_unchecked(&path)
                    .with_context(|| format!("Failed to read question bank {:?}", path))?;

                let (changes, counts) = normalize_categories(&mut bank.questions);
                for change in &changes {
                    println!(
                        "   [{}] {}: {:?} → {:?}",
                        change.index + 1,
                        change.id,
                        change.from,
                        change.to
                    );
                }

                println!("\nTotal questions: {}", bank.questions.len());
                println!("Changed: {}", changes.len());
                println!("Unchanged: {}", bank.questions.len() - changes.len());

                let mut by_count: Vec<_> = counts.into_iter().collect();
                by_count.sort_by(|a, b| b.1.cmp(&a.1));
                println!("\n📈 Categories");
                for (category, count) in by_count {
                    println!("   {}: {}", category, count);
                }

                if changes.is_empty() {
                    return Ok(());
                }
                if dry_run {
                    println!("\n⚠️  Dry-run only; no files were changed.");
                    return Ok(());
                }

                bank.save(&path)
                    .with_context(|| format!("Failed to write question bank {:?}", path))?;
                println!("\n✅ Saved {}", path.display());
            }

            Dups::Remove { path, dry_run } => {
                println!("▶ Removing duplicate questions in: {}", path.display());
                let mut bank = QuestionBank::load_unchecked(&path)
                    .with_context(|| format!("Failed to read question bank {:?}", path))?;
                let before = bank.questions.len();

                let (kept, removed) = remove_exact_duplicates(std::mem::take(&mut bank.questions));
                if removed.is_empty() {
                    println!("No duplicates found.");
                    return Ok(());
                }

                for record in &removed {
                    let prefix = if dry_run { "[dry-run] REMOVE" } else { "Removing" };
                    println!(
                        "   🗑️  {} {} ({} {})",
                        prefix, record.id, record.level, record.category
                    );
                }

                if dry_run {
                    println!("\n⚠️  Dry-run only; no files were changed.");
                    return Ok(());
                }

                let backup = backup_path(&path);
                fs::copy(&path, &backup)
                    .with_context(|| format!("Failed to back up {:?} → {:?}", path, backup))?;
                println!("\n📦 Backup created at {}", backup.display());

                bank.questions = kept;
                bank.save(&path)
                    .with_context(|| format!("Failed to write question bank {:?}", path))?;
                println!(
                    "✅ {} → {} questions ({} removed), saved {}",
                    before,
                    bank.questions.len(),
                    removed.len(),
                    path.display()
                );
            }
        },
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "quizdup=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_bank(path: &Path) -> Result<QuestionBank> {
    QuestionBank::load(path).with_context(|| format!("Failed to load question bank {:?}", path))
}

fn progress_bar(len: u64, hidden: bool) -> Result<ProgressBar> {
    if hidden {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(len);
    bar.set_style(ProgressStyle::with_template(
        "{spinner:.green} [{bar:30}] {pos}/{len} candidates {msg}",
    )?);
    bar.enable_steady_tick(Duration::from_millis(100));
    Ok(bar)
}

fn print_report(report: &Report) {
    println!("\n{}", "=".repeat(60));
    println!("📊 Duplicate check results");
    println!("{}", "=".repeat(60));

    if report.duplicates.is_empty() {
        println!("\n✅ Duplicates: 0");
    } else {
        println!("\n🚨 Duplicates: {}", report.duplicates.len());
        print_matches(&report.duplicates);
    }

    if report.similar.is_empty() {
        println!("\n✅ Similar (needs review): 0");
    } else {
        println!("\n⚠️  Similar (needs review): {}", report.similar.len());
        print_matches(&report.similar);
    }

    if report.collisions.is_empty() {
        println!("\n✅ Collisions within batch: 0");
    } else {
        println!("\n🔄 Collisions within batch: {}", report.collisions.len());
        for collision in &report.collisions {
            println!(
                "\n   {} ↔ {}  score {:.2}",
                collision.first.id, collision.second.id, collision.result.score
            );
            println!("   ▶ {}", preview(&collision.first.question));
            println!("   ▶ {}", preview(&collision.second.question));
            println!("   reason: {}", collision.result.justification());
        }
    }

    println!("\n📈 Candidates per level/category");
    for (partition, count) in &report.candidate_partitions {
        println!("   {}: {}", partition, count);
    }
}

fn print_matches(matches: &[CorpusMatch]) {
    for entry in matches {
        println!(
            "\n   {} → {}  score {:.2}",
            entry.candidate.id, entry.existing.id, entry.result.score
        );
        println!("   new:      {}", preview(&entry.candidate.question));
        println!("   existing: {}", preview(&entry.existing.question));
        println!("   reason:   {}", entry.result.justification());
    }
}

fn preview(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{}…", cut)
}

/// `questions.json` → `questions.backup.json` in the same directory.
fn backup_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "questions".to_string());
    path.with_file_name(format!("{}.backup.json", stem))
}

/// Run `f()`, print how long it took (with `label`) when `report` is set, and return its result.
fn benchmark<T, F: FnOnce() -> T>(label: &str, report: bool, f: F) -> T {
    let start = Instant::now();
    let result = f();
    if report {
        println!("⏱ {} took {:.2?}", label, start.elapsed());
    } else {
        log::debug!("{} took {:.2?}", label, start.elapsed());
    }
    result
}
