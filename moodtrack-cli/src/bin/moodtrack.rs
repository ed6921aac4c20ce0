use moodtrack::auth::parse_jwt_claims;
use moodtrack::client::DEFAULT_DAYS;
use moodtrack::settings::SettingName;
use moodtrack::validation::{parse_date, EntryDraft, RegistrationForm};
use moodtrack::{AppContext, ClientConfig};
use moodtrack_cli::*;

use colored_json::to_colored_json_auto;
use log::{self, debug};
use std::io::Write;
use std::path::PathBuf;
use structopt::StructOpt;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use time::Date;

#[derive(StructOpt)]
#[structopt(
    rename_all = "kebab-case",
    about = "CLI for the moodtrack postpartum wellbeing service"
)]
struct Opt {
    #[structopt(
        global = true,
        long = "--api-base",
        env = "MOODTRACK_API_BASE",
        default_value = "http://localhost:8000/api"
    )]
    api_base: String,

    /// Where tokens, the profile snapshot, and app settings are kept between runs
    #[structopt(
        global = true,
        long = "--session-db",
        env = "MOODTRACK_SESSION_DB",
        default_value = "moodtrack_session.sqlite",
        parse(from_os_str)
    )]
    session_db: PathBuf,

    /// Print raw JSON instead of formatted output
    #[structopt(global = true, long)]
    json: bool,

    /// Log more messages. Pass multiple times for ever more verbosity
    ///
    /// By default, it'll only report errors. Passing `-v` one time also prints
    /// warnings, `-vv` enables info logging, `-vvv` debug, and `-vvvv` trace.
    #[structopt(global = true, long, short = "v", parse(from_occurrences))]
    verbose: i8,

    #[structopt(long = "--shell-completions", hidden = true)]
    shell_completions: Option<structopt::clap::Shell>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt)]
enum AccountCommand {
    Login {
        #[structopt(long, short)]
        username: String,

        #[structopt(long, short)]
        password: String,
    },
    /// Register a new account, and log in as it
    Register {
        #[structopt(long, short)]
        username: String,

        #[structopt(long, short)]
        email: String,

        #[structopt(long, short)]
        password: String,

        #[structopt(long)]
        password_confirm: String,

        #[structopt(long)]
        age: Option<u32>,

        /// Expected or actual delivery date, YYYY-MM-DD
        #[structopt(long)]
        delivery_date: Option<String>,

        /// Who you can lean on: partner, family, friends
        #[structopt(long)]
        support_system: Option<String>,
    },
    /// Forget the stored session. App settings are kept
    Logout,
    Profile,
    /// Change profile fields, given as `field=value` pairs
    Update {
        #[structopt(required = true)]
        fields: Vec<ProfileField>,
    },
}

/// Entry fields shared by check-in and update
#[derive(StructOpt)]
struct EntryFields {
    /// Anxiety level, 1 (calm) to 5 (severe)
    #[structopt(long, short)]
    anxiety: Option<i64>,

    /// Hours slept last night, 0.5 to 24
    #[structopt(long, short)]
    sleep: Option<f64>,

    /// Energy level, 1 to 5
    #[structopt(long, short)]
    energy: Option<i64>,

    /// Appetite, 1 to 5
    #[structopt(long)]
    appetite: Option<i64>,

    #[structopt(long, short)]
    journal: Option<String>,

    /// YYYY-MM-DD; check-ins default to today
    #[structopt(long, parse(try_from_str = parse_date))]
    date: Option<Date>,
}

impl EntryFields {
    fn into_draft(self, mood: Option<String>) -> EntryDraft {
        EntryDraft {
            mood,
            anxiety_level: self.anxiety,
            sleep_hours: self.sleep,
            energy_level: self.energy,
            appetite: self.appetite,
            journal_text: self.journal,
            date: self.date,
        }
    }
}

#[derive(StructOpt)]
enum EntriesCommand {
    List {
        /// Look-back window, 30 days if not given
        #[structopt(long, short)]
        days: Option<u32>,

        /// Only entries whose mood or journal text contains this, ignoring case
        #[structopt(long, short)]
        search: Option<String>,
    },
    Update {
        id: i64,

        #[structopt(long, short)]
        mood: Option<String>,

        #[structopt(flatten)]
        fields: EntryFields,
    },
    Delete {
        id: i64,
    },
}

#[derive(StructOpt)]
enum SettingsCommand {
    Show,
    Set {
        /// notifications, daily-reminders, weekly-reports, dark-mode, or data-sharing
        name: SettingName,

        #[structopt(parse(try_from_str = parse_toggle))]
        value: bool,
    },
    /// Restore the defaults
    Reset,
}

#[derive(StructOpt)]
enum Command {
    /// Summarize configuration and the stored session
    Status,

    Account {
        #[structopt(subcommand)]
        cmd: AccountCommand,
    },

    /// Record how today is going
    Checkin {
        /// happy, sad, angry, anxious, or neutral
        mood: String,

        #[structopt(flatten)]
        fields: EntryFields,
    },

    Entries {
        #[structopt(subcommand)]
        cmd: EntriesCommand,
    },

    /// Averages and mood distribution over a window of days
    Stats {
        #[structopt(long, short)]
        days: Option<u32>,
    },

    /// Risk assessments over a window of days
    Risk {
        #[structopt(long, short)]
        days: Option<u32>,
    },

    /// Today's entry, streak, and the latest assessment
    Dashboard,

    Settings {
        #[structopt(subcommand)]
        cmd: SettingsCommand,
    },

    /// Crisis lines and reading material
    Resources,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let opt = Opt::from_args();

    let log_level = match opt.verbose {
        std::i8::MIN..=-1 => "none",
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        4..=std::i8::MAX => "trace",
    };
    // hyper logging is very verbose, so crank that down even if everything else is more verbose
    let log_filter = format!("{},hyper=error", log_level);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter))
        .format_timestamp(None)
        .init();

    debug!("Args parsed, starting up");

    #[cfg(windows)]
    colored_json::enable_ansi_support();

    if let Some(shell) = opt.shell_completions {
        Opt::clap().gen_completions_to("moodtrack", shell, &mut std::io::stdout());
        std::process::exit(0);
    }

    if let Err(err) = run(opt).await {
        // Be graceful about some errors
        if let Some(io_err) = err.root_cause().downcast_ref::<std::io::Error>() {
            if let std::io::ErrorKind::BrokenPipe = io_err.kind() {
                // presumably due to something like writing to stdout and piped to `head -n10` and
                // stdout was closed
                debug!("got BrokenPipe error, assuming stdout closed as expected and exiting with success");
                std::process::exit(0);
            }
        }
        let mut color_stderr = StandardStream::stderr(if atty::is(atty::Stream::Stderr) {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        });
        color_stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        eprintln!("Error: {:?}", err);
        color_stderr.set_color(&ColorSpec::new())?;
        if let Some(api_err) = err.downcast_ref::<moodtrack::Error>() {
            if api_err.is_unauthorized() {
                eprintln!("session expired, please log in again: moodtrack account login");
            }
        }
        std::process::exit(1);
    }
    Ok(())
}

/// Prints either JSON or the formatted rendition of a result
struct Output {
    json: bool,
    stdout: StandardStream,
}

impl Output {
    fn new(json: bool) -> Self {
        Output {
            json,
            stdout: StandardStream::stdout(if atty::is(atty::Stream::Stdout) {
                ColorChoice::Auto
            } else {
                ColorChoice::Never
            }),
        }
    }

    fn show<T, F>(&mut self, val: &T, pp: F) -> Result<()>
    where
        T: serde::Serialize,
        F: FnOnce(&mut StandardStream, &T) -> Result<()>,
    {
        if self.json {
            let val = serde_json::to_value(val)?;
            writeln!(&mut std::io::stdout(), "{}", to_colored_json_auto(&val)?)?;
            Ok(())
        } else {
            pp(&mut self.stdout, val)
        }
    }
}

async fn run(opt: Opt) -> Result<()> {
    let config = ClientConfig::new(&opt.api_base);
    let app = AppContext::open(&config, &opt.session_db)?;
    let mut out = Output::new(opt.json);

    match opt.cmd {
        Command::Status => {
            let session = app.session().await;
            println!("Configuration");
            println!("  MOODTRACK_API_BASE: {}", app.client().base_url());
            println!("  MOODTRACK_SESSION_DB: {}", opt.session_db.display());
            println!("Session");
            println!("  route: {}", app.initial_route().await);
            match session.access_token {
                Some(ref token) => match parse_jwt_claims(token) {
                    Ok(claims) => {
                        if let Some(user_id) = claims.user_id {
                            println!("  user id: {}", user_id);
                        }
                        if let Some(exp) = claims.expires_at {
                            let expired = claims.is_expired(time::OffsetDateTime::now_utc());
                            println!(
                                "  token expires: {}{}",
                                exp.date(),
                                if expired { " (expired)" } else { "" }
                            );
                        }
                    }
                    Err(e) => println!("  token: <unreadable: {}>", e),
                },
                None => println!("  not logged in"),
            }
            if let Some(profile) = session.profile() {
                println!("  username: {}", profile.username);
            }
        }
        Command::Account {
            cmd: AccountCommand::Login { username, password },
        } => {
            let session = app.login(&username, &password).await?;
            if let Some(profile) = session.profile() {
                out.show(&profile, pretty::pp_profile)?;
            }
        }
        Command::Account {
            cmd:
                AccountCommand::Register {
                    username,
                    email,
                    password,
                    password_confirm,
                    age,
                    delivery_date,
                    support_system,
                },
        } => {
            let form = RegistrationForm {
                username,
                email,
                password,
                password_confirm,
                age,
                delivery_date,
                support_system,
            };
            let session = app.register(&form).await?;
            if let Some(profile) = session.profile() {
                out.show(&profile, pretty::pp_profile)?;
            }
        }
        Command::Account {
            cmd: AccountCommand::Logout,
        } => {
            app.logout().await?;
            println!("logged out");
        }
        Command::Account {
            cmd: AccountCommand::Profile,
        } => {
            let profile = app.refresh_profile().await?;
            out.show(&profile, pretty::pp_profile)?;
        }
        Command::Account {
            cmd: AccountCommand::Update { fields },
        } => {
            let profile = app.update_profile(&profile_changes(fields)).await?;
            out.show(&profile, pretty::pp_profile)?;
        }
        Command::Checkin { mood, fields } => {
            let entry = app.submit_entry(&fields.into_draft(Some(mood))).await?;
            out.show(&entry, pretty::pp_entry)?;
            if !opt.json && entry.risk_category == Some(moodtrack::models::RiskCategory::High) {
                writeln!(&mut out.stdout)?;
                pretty::pp_crisis_lines(&mut out.stdout)?;
            }
        }
        Command::Entries {
            cmd: EntriesCommand::List { days, search },
        } => {
            let mut entries = app
                .client()
                .get_entries(days.unwrap_or(DEFAULT_DAYS))
                .await?;
            if let Some(text) = search {
                entries = filter_entries(entries, &text);
            }
            out.show(&entries, |w, e| pretty::pp_entries(w, e))?;
        }
        Command::Entries {
            cmd: EntriesCommand::Update { id, mood, fields },
        } => {
            let entry = app.amend_entry(id, &fields.into_draft(mood)).await?;
            out.show(&entry, pretty::pp_entry)?;
        }
        Command::Entries {
            cmd: EntriesCommand::Delete { id },
        } => {
            app.client().delete_entry(id).await?;
            println!("deleted entry #{}", id);
        }
        Command::Stats { days } => {
            let days = days.unwrap_or(DEFAULT_DAYS);
            let stats = app.client().get_stats(days).await?;
            out.show(&stats, |w, s| pretty::pp_stats(w, s, days))?;
        }
        Command::Risk { days } => {
            let days = days.unwrap_or(DEFAULT_DAYS);
            let assessments = app.client().get_risk_assessments(days).await?;
            out.show(&assessments, |w, list| {
                if list.is_empty() {
                    writeln!(w, "no assessments in the last {} days", days)?;
                }
                for ra in list.iter() {
                    pretty::pp_risk_assessment(w, ra)?;
                }
                Ok(())
            })?;
        }
        Command::Dashboard => {
            let summary = app.client().get_dashboard_summary().await?;
            out.show(&summary, pretty::pp_dashboard)?;
        }
        Command::Settings {
            cmd: SettingsCommand::Show,
        } => {
            let settings = app.load_settings().await;
            out.show(&settings, pretty::pp_settings)?;
        }
        Command::Settings {
            cmd: SettingsCommand::Set { name, value },
        } => {
            let mut settings = app.load_settings().await;
            settings.set(name, value);
            app.save_settings(&settings).await?;
            out.show(&settings, pretty::pp_settings)?;
        }
        Command::Settings {
            cmd: SettingsCommand::Reset,
        } => {
            let settings = app.reset_settings().await?;
            out.show(&settings, pretty::pp_settings)?;
        }
        Command::Resources => pretty::pp_resources(&mut out.stdout)?,
    }
    Ok(())
}
