mod logging;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lesson_core::csv::{self, CsvFormat, UploadKind};
use lesson_core::model::{LessonId, SectionId};
use services::lessons::{AdvanceOutcome, NavigationController, ScoreAggregator, TracingPresenter};
use services::{
    ApiConfig, BulkUploadFiles, BulkUploadService, Clock, CompletionView, HttpLessonApi,
    verification_policy_from_env,
};
use storage::repository::Storage;
use tracing::info;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArg { name: &'static str },
    UnknownArg(String),
    InvalidLessonId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidKind { raw: String },
    InvalidFormat { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArg { name } => write!(f, "missing required {name}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidLessonId { raw } => write!(f, "invalid --lesson-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidKind { raw } => write!(f, "invalid --kind value: {raw}"),
            ArgsError::InvalidFormat { raw } => write!(f, "invalid format: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

/// A command that ran but whose result should fail the process.
#[derive(Debug)]
struct CommandFailed(String);

impl fmt::Display for CommandFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CommandFailed {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!(
        "  fastlearners check-csv <file> --kind <kind> [--format comma|pipe]"
    );
    eprintln!("  fastlearners normalize-csv <file> --to <comma|pipe|api> [--out <file>]");
    eprintln!("  fastlearners bulk-upload --dir <dir> [--api-format]");
    eprintln!("  fastlearners walk  --lesson-id <id> [--db <sqlite_url>]");
    eprintln!("  fastlearners score --lesson-id <id> [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Kinds:");
    eprintln!(
        "  lessons, concepts, examples, exercises, general-exercises, check-markers, scheme-of-work"
    );
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://progress.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  FASTLEARNERS_API_BASE_URL, FASTLEARNERS_API_TOKEN, FASTLEARNERS_HTTP_TIMEOUT_SECS");
    eprintln!("  FASTLEARNERS_DB_URL, FASTLEARNERS_VERIFY_CONCEPTS, FASTLEARNERS_VERIFY_GENERAL_EXERCISES");
    eprintln!("  RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NormalizeTarget {
    Delimiter(CsvFormat),
    Api,
}

#[derive(Debug)]
enum Command {
    CheckCsv {
        file: PathBuf,
        kind: UploadKind,
        format: Option<CsvFormat>,
    },
    NormalizeCsv {
        file: PathBuf,
        to: NormalizeTarget,
        out: Option<PathBuf>,
    },
    BulkUpload {
        dir: PathBuf,
        api_format: bool,
    },
    Walk {
        lesson_id: LessonId,
        db_url: String,
    },
    Score {
        lesson_id: LessonId,
        db_url: String,
    },
}

fn parse_format(raw: String) -> Result<CsvFormat, ArgsError> {
    match raw.parse::<CsvFormat>() {
        Ok(format) if format != CsvFormat::Unknown => Ok(format),
        _ => Err(ArgsError::InvalidFormat { raw }),
    }
}

fn parse_lesson_id(raw: String) -> Result<LessonId, ArgsError> {
    raw.parse()
        .map_err(|_| ArgsError::InvalidLessonId { raw: raw.clone() })
}

fn default_db_url() -> String {
    std::env::var("FASTLEARNERS_DB_URL")
        .ok()
        .map_or_else(|| "sqlite://progress.sqlite3".into(), normalize_sqlite_url)
}

impl Command {
    fn parse(name: &str, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        match name {
            "check-csv" => Self::parse_check_csv(args),
            "normalize-csv" => Self::parse_normalize_csv(args),
            "bulk-upload" => Self::parse_bulk_upload(args),
            "walk" => {
                let (lesson_id, db_url) = Self::parse_lesson_args(args)?;
                Ok(Self::Walk { lesson_id, db_url })
            }
            "score" => {
                let (lesson_id, db_url) = Self::parse_lesson_args(args)?;
                Ok(Self::Score { lesson_id, db_url })
            }
            other => Err(ArgsError::UnknownArg(other.to_string())),
        }
    }

    fn parse_check_csv(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut file = None;
        let mut kind = None;
        let mut format = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--kind" => {
                    let value = require_value(args, "--kind")?;
                    kind = Some(
                        value
                            .parse::<UploadKind>()
                            .map_err(|_| ArgsError::InvalidKind { raw: value.clone() })?,
                    );
                }
                "--format" => format = Some(parse_format(require_value(args, "--format")?)?),
                _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ if file.is_none() => file = Some(PathBuf::from(arg)),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(Self::CheckCsv {
            file: file.ok_or(ArgsError::MissingArg { name: "<file>" })?,
            kind: kind.ok_or(ArgsError::MissingArg { name: "--kind" })?,
            format,
        })
    }

    fn parse_normalize_csv(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut file = None;
        let mut to = None;
        let mut out = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--to" => {
                    let value = require_value(args, "--to")?;
                    to = Some(if value.trim().eq_ignore_ascii_case("api") {
                        NormalizeTarget::Api
                    } else {
                        NormalizeTarget::Delimiter(parse_format(value)?)
                    });
                }
                "--out" => out = Some(PathBuf::from(require_value(args, "--out")?)),
                _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ if file.is_none() => file = Some(PathBuf::from(arg)),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(Self::NormalizeCsv {
            file: file.ok_or(ArgsError::MissingArg { name: "<file>" })?,
            to: to.ok_or(ArgsError::MissingArg { name: "--to" })?,
            out,
        })
    }

    fn parse_bulk_upload(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut dir = None;
        let mut api_format = false;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--dir" => dir = Some(PathBuf::from(require_value(args, "--dir")?)),
                "--api-format" => api_format = true,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(Self::BulkUpload {
            dir: dir.ok_or(ArgsError::MissingArg { name: "--dir" })?,
            api_format,
        })
    }

    fn parse_lesson_args(
        args: &mut impl Iterator<Item = String>,
    ) -> Result<(LessonId, String), ArgsError> {
        let mut lesson_id = None;
        let mut db_url = default_db_url();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--lesson-id" => {
                    lesson_id = Some(parse_lesson_id(require_value(args, "--lesson-id")?)?);
                }
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        let lesson_id = lesson_id.ok_or(ArgsError::MissingArg {
            name: "--lesson-id",
        })?;
        Ok((lesson_id, db_url))
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn open_storage(db_url: &str) -> Result<Storage, Box<dyn std::error::Error>> {
    prepare_sqlite_file(db_url)?;
    Ok(Storage::sqlite(db_url).await?)
}

fn check_csv(
    file: &Path,
    kind: UploadKind,
    format: Option<CsvFormat>,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(file)?;
    let allowed = format.map(|f| [f]);
    let result = csv::validate(&content, kind.required_columns(), allowed.as_ref().map(|a| &a[..]));

    println!("file:    {}", file.display());
    println!("kind:    {kind}");
    println!("format:  {}", result.format);
    println!("headers: {}", result.headers.join(", "));
    println!("rows:    {}", result.row_count);
    for error in &result.errors {
        println!("error:   {error}");
    }
    if result.is_valid {
        println!("valid");
        Ok(())
    } else {
        Err(CommandFailed(format!("{} is not a valid {kind} file", file.display())).into())
    }
}

fn normalize_csv(
    file: &Path,
    to: NormalizeTarget,
    out: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(file)?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.csv".to_string());
    let (converted, default_name) = match to {
        NormalizeTarget::Api => (csv::to_api_format(&content), csv::api_file_name(&file_name)),
        NormalizeTarget::Delimiter(format) => (
            csv::normalize(&content, format),
            csv::normalized_file_name(&file_name, format),
        ),
    };
    let out = out.unwrap_or_else(|| file.with_file_name(default_name));
    std::fs::write(&out, converted)?;
    println!("wrote {}", out.display());
    Ok(())
}

async fn bulk_upload(dir: &Path, api_format: bool) -> Result<(), Box<dyn std::error::Error>> {
    let files = BulkUploadFiles::from_dir(dir)?;
    let api = Arc::new(HttpLessonApi::new(ApiConfig::from_env()?)?);
    let receipt = BulkUploadService::new(api)
        .with_api_format(api_format)
        .upload(&files)
        .await?;
    println!("{}", receipt.message);
    Ok(())
}

async fn walk(lesson_id: LessonId, db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(db_url).await?;
    let api = Arc::new(HttpLessonApi::new(ApiConfig::from_env()?)?);
    let policy = verification_policy_from_env()?;
    let nav = NavigationController::new(
        api,
        &storage,
        policy.clone(),
        Arc::new(TracingPresenter),
        Clock::system(),
    );

    let content = nav.load_lesson_by_id(lesson_id).await?;
    println!("{} (lesson {lesson_id})", content.topic);
    for section in content.outline().sections() {
        println!("  {}. {}", section.order_index + 1, section.id);
    }

    // Locally verified sections are taken as done by the walker.
    let mut marked: Option<SectionId> = None;
    loop {
        match nav.advance().await {
            AdvanceOutcome::Moved { index } => {
                info!(index, "advanced");
                marked = None;
            }
            AdvanceOutcome::CannotProceed { section }
                if marked != Some(section)
                    && policy.strategy_for(section.section_type())
                        == services::VerifyStrategy::Local =>
            {
                nav.mark_section_completed(section).await?;
                marked = Some(section);
            }
            AdvanceOutcome::Finished(data) => {
                print!("{}", CompletionView::new(&data));
                return Ok(());
            }
            AdvanceOutcome::AlreadyFinished => return Ok(()),
            AdvanceOutcome::CannotProceed { section } => {
                return Err(CommandFailed(format!("cannot proceed past {section}")).into());
            }
            AdvanceOutcome::Incomplete { remaining } => {
                return Err(
                    CommandFailed(format!("{remaining} sections incomplete")).into(),
                );
            }
            AdvanceOutcome::CompletionFailed { message } => {
                return Err(CommandFailed(message).into());
            }
            AdvanceOutcome::Busy | AdvanceOutcome::Cancelled | AdvanceOutcome::Interrupted => {
                return Err(CommandFailed("walk interrupted".to_string()).into());
            }
        }
    }
}

async fn score(lesson_id: LessonId, db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(db_url).await?;
    let api = Arc::new(HttpLessonApi::new(ApiConfig::from_env()?)?);
    let data = ScoreAggregator::new(api, storage.activity)
        .aggregate(lesson_id)
        .await?;
    print!("{}", CompletionView::new(&data));
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let name = match argv.next() {
        None => {
            print_usage();
            return Err(ArgsError::MissingArg { name: "command" }.into());
        }
        Some(arg) if arg == "--help" || arg == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(arg) => arg,
    };

    let command = Command::parse(&name, &mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    match command {
        Command::CheckCsv { file, kind, format } => check_csv(&file, kind, format),
        Command::NormalizeCsv { file, to, out } => normalize_csv(&file, to, out),
        Command::BulkUpload { dir, api_format } => bulk_upload(&dir, api_format).await,
        Command::Walk { lesson_id, db_url } => walk(lesson_id, &db_url).await,
        Command::Score { lesson_id, db_url } => score(lesson_id, &db_url).await,
    }
}

#[tokio::main]
async fn main() {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    logging::init_tracing(&level);

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> std::vec::IntoIter<String> {
        list.iter()
            .map(|s| (*s).to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn parses_check_csv() {
        let cmd = Command::parse(
            "check-csv",
            &mut args(&["concepts.csv", "--kind", "concepts", "--format", "pipe"]),
        )
        .unwrap();
        match cmd {
            Command::CheckCsv { file, kind, format } => {
                assert_eq!(file, PathBuf::from("concepts.csv"));
                assert_eq!(kind, UploadKind::Concepts);
                assert_eq!(format, Some(CsvFormat::Pipe));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn normalize_accepts_api_target() {
        let cmd = Command::parse("normalize-csv", &mut args(&["a.csv", "--to", "api"])).unwrap();
        assert!(matches!(
            cmd,
            Command::NormalizeCsv {
                to: NormalizeTarget::Api,
                out: None,
                ..
            }
        ));
    }

    #[test]
    fn lesson_commands_need_an_id() {
        let err = Command::parse("walk", &mut args(&[])).unwrap_err();
        assert_eq!(err.to_string(), "missing required --lesson-id");
        let err = Command::parse("score", &mut args(&["--lesson-id", "x"])).unwrap_err();
        assert_eq!(err.to_string(), "invalid --lesson-id value: x");
    }

    #[test]
    fn relative_db_paths_become_absolute_urls() {
        let url = normalize_sqlite_url("sqlite:data/progress.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/progress.sqlite3"));
        assert_eq!(
            normalize_sqlite_url("sqlite::memory:".into()),
            "sqlite::memory:"
        );
    }
}
