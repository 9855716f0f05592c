use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser};
use codetype::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    logging,
    runtime::{CrosstermEventSource, EventSource, MonotonicClock, Runner, SessionEvent},
    snippet::{Corpus, Difficulty, FixedPrompt, Language, SnippetSource},
    store::{
        CsvLog, HistoryOrder, HistoryQuery, ResultSink, SqliteStore, StatsSummary,
        VALID_DURATIONS,
    },
    timer::ThreadScheduler,
    KeyOutcome, Phase, Session,
};
use crossterm::{
    cursor,
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute, queue,
    style::Print,
    terminal::{
        disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    tty::IsTty,
};
use std::{
    error::Error,
    io::{self, stdin, Write},
    path::PathBuf,
    time::Duration,
};
use time_humanize::{Accuracy, HumanTime, Tense};
use tracing::warn;

const POLL_INTERVAL_MS: u64 = 100;
const TEXT_TOP_ROW: u16 = 3;

/// timed code-snippet typing test with live speed, accuracy and consistency
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Type a code snippet against the clock. Tab loads a new snippet, Esc restarts, Ctrl+Backspace deletes a word, Ctrl+C quits."
)]
pub struct Cli {
    /// session length in seconds (15, 30, 60 or 120)
    #[clap(short = 's', long, value_parser = parse_duration)]
    secs: Option<u32>,

    /// language to pull snippets from
    #[clap(short = 'l', long, value_enum)]
    language: Option<Language>,

    /// only use snippets of this difficulty
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// custom prompt to type instead of a snippet
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// name stored with your results
    #[clap(long)]
    name: Option<String>,

    /// user id stored with your results; also narrows --history and --stats
    #[clap(long)]
    user_id: Option<String>,

    /// session database path
    #[clap(long)]
    db: Option<PathBuf>,

    /// also append results to this CSV file
    #[clap(long)]
    csv: Option<PathBuf>,

    /// config file path
    #[clap(long)]
    config: Option<PathBuf>,

    /// print the N most recent results and exit
    #[clap(long, value_name = "N")]
    history: Option<usize>,

    /// order of --history: newest first or best wpm first
    #[clap(long, value_enum, default_value_t = HistoryOrder::Newest)]
    sort: HistoryOrder,

    /// print per-language averages and exit
    #[clap(long)]
    stats: bool,

    /// store the given options as the new defaults
    #[clap(long)]
    save_config: bool,
}

fn parse_duration(s: &str) -> Result<u32, String> {
    let secs: u32 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if VALID_DURATIONS.contains(&secs) {
        Ok(secs)
    } else {
        Err(format!("must be one of {VALID_DURATIONS:?}"))
    }
}

impl Cli {
    /// Stored config with command-line overrides applied.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(secs) = self.secs {
            config.duration_secs = secs;
        }
        if let Some(language) = self.language {
            config.language = language;
        }
        if self.difficulty.is_some() {
            config.difficulty = self.difficulty;
        }
        if let Some(name) = &self.name {
            config.display_name = name.clone();
        }
        if self.user_id.is_some() {
            config.user_id = self.user_id.clone();
        }
        config
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config_store = cli
        .config
        .as_ref()
        .map_or_else(FileConfigStore::new, FileConfigStore::with_path);
    let config = cli.apply(config_store.load());
    config.validate()?;
    if cli.save_config {
        config_store.save(&config)?;
    }

    let db_path = cli.db.clone().unwrap_or_else(AppDirs::db_path);

    if cli.history.is_some() || cli.stats {
        logging::init_stderr_logging();
        let store = SqliteStore::open(&db_path)?;
        if let Some(limit) = cli.history {
            let query = HistoryQuery {
                language: cli.language,
                user_id: cli.user_id.clone(),
                order: cli.sort,
            };
            print_history(&store, limit, &query)?;
        }
        if cli.stats {
            print!("{}", format_stats(&store.stats(cli.user_id.as_deref())?));
        }
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    logging::init_file_logging(&AppDirs::log_path())?;

    let mut snippets: Box<dyn SnippetSource> = match &cli.prompt {
        Some(prompt) => Box::new(FixedPrompt::new(prompt.clone())),
        None => Box::new(Corpus::embedded()?.with_difficulty(config.difficulty)),
    };
    let target = snippets.next_snippet(config.language)?;

    let mut sinks: Vec<Box<dyn ResultSink>> = vec![Box::new(SqliteStore::open(&db_path)?)];
    if let Some(csv) = &cli.csv {
        sinks.push(Box::new(CsvLog::new(csv)));
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let source = CrosstermEventSource::new();
    let scheduler = ThreadScheduler::new(source.sender());
    let mut session = Session::new(
        config.session_config(),
        target,
        Box::new(scheduler),
        Box::new(sinks),
    );
    let runner = Runner::new(source, Duration::from_millis(POLL_INTERVAL_MS));

    let outcome = run(
        &mut stdout,
        &runner,
        &mut session,
        snippets.as_mut(),
        config.language,
    );

    disable_raw_mode()?;
    execute!(stdout, LeaveAlternateScreen, cursor::Show)?;

    outcome
}

fn is_quit(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
}

fn run<W: Write, E: EventSource>(
    out: &mut W,
    runner: &Runner<E>,
    session: &mut Session,
    snippets: &mut dyn SnippetSource,
    language: Language,
) -> Result<(), Box<dyn Error>> {
    let clock = MonotonicClock::new();
    draw(out, session)?;

    loop {
        let Some(event) = runner.step() else {
            continue;
        };

        match event {
            SessionEvent::Key(key) if is_quit(&key) => break,
            SessionEvent::Key(key) => {
                if session.handle_key(key, clock.now_ms()) == KeyOutcome::SkipRequested {
                    match snippets.next_snippet(language) {
                        Ok(target) => session.load(target),
                        Err(err) => warn!(error = %err, "could not load a new snippet"),
                    }
                }
            }
            SessionEvent::Tick(timer) => {
                session.on_tick(timer, clock.now_ms());
            }
            SessionEvent::Resize => {}
        }

        draw(out, session)?;
    }

    Ok(())
}

/// Column and row of the slot `typed` characters into `text`.
fn cursor_position(text: &str, typed: usize) -> (u16, u16) {
    text.chars()
        .take(typed)
        .fold((0, 0), |(col, row), c| match c {
            '\n' => (0, row + 1),
            _ => (col + 1, row),
        })
}

fn status_line(session: &Session) -> String {
    match (session.phase(), session.result()) {
        (Phase::Result, Some(result)) => format!(
            "{} wpm · {}% acc · {} raw · {} err · {}% consistency · {}/{} chars",
            result.wpm,
            result.accuracy,
            result.raw_wpm,
            result.errors,
            result.consistency,
            session.log().correct_count(),
            session.log().len(),
        ),
        _ => {
            let live = session.snapshot();
            format!(
                "{} wpm · {}% acc · {}s · {} err",
                live.wpm, live.accuracy, live.remaining_secs, live.errors
            )
        }
    }
}

fn hint_line(session: &Session) -> &'static str {
    let live = session.snapshot();
    if session.phase() == Phase::Result {
        "tab → new test · ctrl+c → quit"
    } else if live.blocked {
        "too many errors - backspace to continue"
    } else if live.caps_lock_on {
        "CAPS LOCK ON"
    } else {
        "tab → new · esc → restart · ctrl+⌫ → delete word"
    }
}

fn draw<W: Write>(out: &mut W, session: &Session) -> io::Result<()> {
    queue!(
        out,
        Clear(ClearType::All),
        cursor::MoveTo(0, 0),
        Print(status_line(session)),
        cursor::MoveTo(0, 1),
        Print(hint_line(session)),
    )?;

    for (row, line) in session.target().as_str().split('\n').enumerate() {
        queue!(out, cursor::MoveTo(0, TEXT_TOP_ROW + row as u16), Print(line))?;
    }

    let (col, row) = cursor_position(session.target().as_str(), session.log().len());
    queue!(out, cursor::MoveTo(col, TEXT_TOP_ROW + row))?;
    out.flush()
}

fn print_history(
    store: &SqliteStore,
    limit: usize,
    query: &HistoryQuery,
) -> Result<(), Box<dyn Error>> {
    let sessions = store.recent(limit, query)?;

    if sessions.is_empty() {
        println!("no sessions recorded yet");
        return Ok(());
    }

    for stored in sessions {
        let age = (Local::now() - stored.created_at)
            .to_std()
            .unwrap_or_default();
        let result = stored.payload;
        println!(
            "{:<16} {:<10} {:>4}s {:>4} wpm {:>4} raw {:>4}% acc {:>3} err {:>4}% cons  {}",
            HumanTime::from(age).to_text_en(Accuracy::Rough, Tense::Past),
            result.language,
            result.duration_secs,
            result.wpm,
            result.raw_wpm,
            result.accuracy,
            result.errors,
            result.consistency,
            result.snippet_id,
        );
    }
    Ok(())
}

fn format_stats(stats: &StatsSummary) -> String {
    if stats.global.total_sessions == 0 {
        return "no sessions recorded yet\n".to_string();
    }

    let global = &stats.global;
    let mut out = format!(
        "{:<10} {:>5} sessions  {:>5.1} wpm  {:>5.1}% acc  top {} wpm\n",
        "all", global.total_sessions, global.avg_wpm, global.avg_accuracy, global.top_wpm
    );
    for lang in &stats.by_language {
        out.push_str(&format!(
            "{:<10} {:>5} sessions  {:>5.1} wpm  {:>5.1} raw  {:>5.1}% acc  {:>4.1} err  top {} wpm\n",
            lang.language.to_string(),
            lang.total_sessions,
            lang.avg_wpm,
            lang.avg_raw_wpm,
            lang.avg_accuracy,
            lang.avg_errors,
            lang.top_wpm,
        ));
    }
    out
}
