use crossterm::style::Stylize;
use rhyme_core::rhyme::PageInfo;
use rhyme_core::{
    EngineConfig, EngineError, OrthographyHints, RhymeEngine, RhymeMatch, RhymeQuery, WordId,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
usage: rhyme_engine [--config PATH] [-v] <command> [args]

commands:
  analyze <text>                      syllables and phonemes of a word
  resolve <text> [--save] [--hints exception;silent;spoken]
  rhymes <word> <length> [--letters a,b] [--traditional] [--professional]
                         [--skip N] [--page N] [--limit N]
  lengths <word> [--letters a,b]      rhyme lengths with at least one match
  suggest <prefix> [--limit N]
  approve <word> | reject <word> | delete <word>
  edit <id> <text> --syllables a|b --phonemes x,y
  words [--approved|--pending] [--search s] [--page N] [--limit N]
  upload <file.csv>                   load a batch file
  ingest <batch> | reprocess <batch> | publish <batch> | records <batch>
  batch <batch> | drop-batch <batch>";

/// Parsed command line: positional words plus `--flag [value]` options.
struct Cli {
    config: Option<PathBuf>,
    verbose: bool,
    command: String,
    args: Vec<String>,
    options: HashMap<String, Option<String>>,
}

const VALUE_OPTIONS: &[&str] = &[
    "config", "letters", "page", "limit", "search", "hints", "skip", "syllables", "phonemes",
];

impl Cli {
    fn parse(raw: impl Iterator<Item = String>) -> Option<Self> {
        let mut positional = Vec::new();
        let mut options = HashMap::new();
        let mut verbose = false;
        let mut raw = raw.peekable();
        while let Some(arg) = raw.next() {
            if arg == "-v" || arg == "--verbose" {
                verbose = true;
            } else if let Some(name) = arg.strip_prefix("--") {
                let value = if VALUE_OPTIONS.contains(&name) { raw.next() } else { None };
                options.insert(name.to_string(), value);
            } else {
                positional.push(arg);
            }
        }
        let config = options.remove("config").flatten().map(PathBuf::from);
        let mut positional = positional.into_iter();
        let command = positional.next()?;
        Some(Self { config, verbose, command, args: positional.collect(), options })
    }

    fn flag(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    fn value(&self, name: &str) -> Option<&str> {
        self.options.get(name).and_then(|v| v.as_deref())
    }

    fn number(&self, name: &str, default: usize) -> usize {
        self.value(name).and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    fn text(&self) -> String {
        self.args.join(" ")
    }

    fn arg(&self, index: usize) -> Result<&str, String> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| format!("'{}' needs more arguments\n\n{USAGE}", self.command))
    }

    fn id_arg(&self, index: usize) -> Result<usize, String> {
        let raw = self.arg(index)?;
        raw.parse().map_err(|_| format!("'{raw}' is not a number"))
    }
}

fn init_tracing(verbose: bool) {
    let filter = std::env::var("RHYME_ENGINE_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).without_time().compact())
        .init();
}

fn default_snapshot_path() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("persian-rhyme-engine");
    path.push("words.bin");
    path
}

fn load_config(cli: &Cli) -> Result<EngineConfig, EngineError> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var_os("RHYME_ENGINE_CONFIG").map(PathBuf::from));
    let mut config = match path {
        Some(path) => EngineConfig::load(&path)?,
        None => EngineConfig::default(),
    };
    if config.snapshot_path.is_none() {
        config.snapshot_path = Some(default_snapshot_path());
    }
    Ok(config)
}

fn main() -> ExitCode {
    let Some(cli) = Cli::parse(std::env::args().skip(1)) else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };
    init_tracing(cli.verbose);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[ERROR] {e}");
            return ExitCode::FAILURE;
        }
    };
    let engine = RhymeEngine::open(config);

    match run(&engine, &cli) {
        Ok(changed) => {
            if changed {
                if let Err(e) = engine.save() {
                    eprintln!("[ERROR] Could not save word store: {e}");
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("[ERROR] {message}");
            ExitCode::FAILURE
        }
    }
}

/// Runs one command. Returns whether the stores changed and need saving.
fn run(engine: &RhymeEngine, cli: &Cli) -> Result<bool, String> {
    let e = |err: EngineError| err.to_string();
    match cli.command.as_str() {
        "analyze" => {
            let analysis = engine.analyze(&cli.text());
            println!("syllables: {}", analysis.syllables.join(" | "));
            println!("phonemes:  {}", analysis.phonemes.join(" | "));
            Ok(false)
        }
        "resolve" => {
            let hints = cli.value("hints").map(parse_hints);
            let resolution = engine.resolve(&cli.text(), hints.as_ref()).map_err(e)?;
            for token in &resolution.tokens {
                let marker = if token.is_known() { "stored" } else { "new" };
                println!("{} [{marker}] {}", token.text, token.entry.syllables().join(" | "));
            }
            println!("syllables: {}", resolution.entry.syllables().join(" | "));
            println!("phonemes:  {}", resolution.entry.phoneme_string());
            let mut changed = resolution.id().is_some();
            if cli.flag("save") {
                let id = engine.confirm(&resolution).map_err(e)?;
                println!("saved as #{id}");
                changed = true;
            }
            Ok(changed)
        }
        "rhymes" => {
            let (anchor, created) = anchor_id(engine, cli.arg(0)?)?;
            let length = cli.id_arg(1)?;
            let query = RhymeQuery {
                letters: cli.value("letters").unwrap_or_default().to_string(),
                traditional: cli.flag("traditional"),
                professional: cli.flag("professional"),
                skip: cli.value("skip").and_then(|v| v.parse().ok()),
                page: cli.number("page", 1),
                limit: cli.number("limit", 0),
                ..RhymeQuery::new(anchor, length)
            };
            let page = engine.find_rhymes(&query).map_err(e)?;
            for item in &page.items {
                println!("{}", render_match(item));
            }
            print_page_info(&page.info);
            Ok(created)
        }
        "lengths" => {
            let (anchor, created) = anchor_id(engine, cli.arg(0)?)?;
            let lengths = engine
                .viable_rhyme_lengths(anchor, cli.value("letters").unwrap_or_default())
                .map_err(e)?;
            let lengths: Vec<String> = lengths.iter().map(usize::to_string).collect();
            println!("{}", lengths.join(", "));
            Ok(created)
        }
        "suggest" => {
            for entry in engine.suggest(cli.arg(0)?, cli.number("limit", 0)) {
                println!("{}", entry.full_form());
            }
            Ok(false)
        }
        "approve" | "reject" | "delete" => {
            let word = cli.text();
            let id = engine
                .find_word(&word)
                .and_then(|entry| entry.id())
                .ok_or_else(|| format!("'{word}' is not in the word store"))?;
            let outcome = match cli.command.as_str() {
                "approve" => engine.set_approved(id, true),
                "reject" => engine.set_rejected(id, true),
                _ => engine.delete_word(id),
            };
            outcome.map_err(e)?;
            Ok(true)
        }
        "edit" => {
            let id = cli.id_arg(0)?;
            cli.arg(1)?;
            let text = cli.args[1..].join(" ");
            let split = |name: &str, sep: char| -> Vec<String> {
                cli.value(name)
                    .unwrap_or_default()
                    .split(sep)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            };
            let entry = engine
                .update_word(id, &text, split("syllables", '|'), split("phonemes", ','))
                .map_err(e)?;
            println!("#{id} {} [{}]", entry.full_form(), entry.phoneme_string());
            Ok(true)
        }
        "words" => {
            let approved = if cli.flag("approved") {
                Some(true)
            } else if cli.flag("pending") {
                Some(false)
            } else {
                None
            };
            let page = engine.list_words(
                approved,
                cli.value("search").unwrap_or_default(),
                cli.number("page", 1),
                cli.number("limit", 25),
            );
            for entry in &page.items {
                let mark = if entry.approved { "✓" } else { " " };
                println!("{mark} #{:<6} {}", entry.id().unwrap_or_default(), entry.full_form());
            }
            print_page_info(&page.info);
            Ok(false)
        }
        "upload" => {
            let path = PathBuf::from(cli.arg(0)?);
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let batch = engine.upload(&file_name, &path).map_err(e)?;
            println!(
                "batch #{}: {} rows inserted, {} failed, {} invalid",
                batch.id, batch.inserted_records, batch.failed_records, batch.invalid_rows
            );
            Ok(true)
        }
        "ingest" | "reprocess" => {
            let batch = cli.id_arg(0)?;
            let report = if cli.command == "ingest" {
                engine.ingest(batch)
            } else {
                engine.reprocess(batch)
            }
            .map_err(e)?;
            println!(
                "processed {}, failed {}, skipped {}, compound parts {}",
                report.processed, report.failed, report.skipped, report.parts_created
            );
            Ok(true)
        }
        "publish" => {
            let published = engine.publish(cli.id_arg(0)?).map_err(e)?;
            println!("{published} words added");
            Ok(true)
        }
        "records" => {
            for record in engine.get_records(cli.id_arg(0)?).map_err(e)? {
                println!(
                    "{:>5} {:?} {} {}",
                    record.row_index,
                    record.status,
                    record.annotated_grapheme,
                    record.derived_phonemes.join(",")
                );
            }
            Ok(false)
        }
        "batch" => {
            let id = cli.id_arg(0)?;
            let batch = engine.batch(id).ok_or_else(|| e(EngineError::BatchNotFound(id)))?;
            println!(
                "#{} {} {:?}: {}/{} rows ({}%), success {}%",
                batch.id,
                batch.file_name,
                batch.status,
                batch.inserted_records,
                batch.total_records,
                batch.progress_percentage(),
                batch.success_rate()
            );
            Ok(false)
        }
        "drop-batch" => {
            let removed = engine.delete_batch(cli.id_arg(0)?).map_err(e)?;
            println!("batch deleted with {removed} records");
            Ok(true)
        }
        other => Err(format!("unknown command '{other}'\n\n{USAGE}")),
    }
}

/// The stored id for `word`, saving it first when it is not in the store yet.
fn anchor_id(engine: &RhymeEngine, word: &str) -> Result<(WordId, bool), String> {
    if let Some(id) = engine.find_word(word).and_then(|entry| entry.id()) {
        return Ok((id, false));
    }
    let resolution = engine.resolve(word, None).map_err(|e| e.to_string())?;
    let id = engine.confirm(&resolution).map_err(|e| e.to_string())?;
    Ok((id, true))
}

/// `exception;silent;spoken`, each an index list.
fn parse_hints(raw: &str) -> OrthographyHints {
    let mut lists = raw.split(';').map(OrthographyHints::parse_list);
    OrthographyHints {
        exception_waw: lists.next().unwrap_or_default(),
        silent_waw: lists.next().unwrap_or_default(),
        spoken_a: lists.next().unwrap_or_default(),
    }
}

fn render_match(item: &RhymeMatch) -> String {
    let Some(span) = item.highlight else {
        return item.surface_form.clone();
    };
    let chars: Vec<char> = item.surface_form.chars().collect();
    let end = span.end.min(chars.len());
    let start = span.start.min(end);
    let before: String = chars[..start].iter().collect();
    let marked: String = chars[start..end].iter().collect();
    let after: String = chars[end..].iter().collect();
    format!("{before}{}{after}", marked.yellow().bold())
}

fn print_page_info(info: &PageInfo) {
    println!(
        "-- page {}/{} ({} items)",
        info.current_page, info.total_pages, info.total_items
    );
}
