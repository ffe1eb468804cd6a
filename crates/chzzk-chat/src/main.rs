//! # chzzk-chat
//!
//! Transcribes a streamer's live chat to a file until interrupted.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::Parser;
use chzzk_auth::{
    ChzzkApi, CookieFile, CredentialSource, Credentials, StaticCredentials, save_cookie_file,
};
use chzzk_client::{
    EventDispatcher, FileTranscript, IdentityCheck, SessionManager, SessionOptions, WsConnector,
};
use chzzk_core::{Labels, Locale, StreamerId};
use chzzk_settings::ChzzkSettings;
use tokio_util::sync::CancellationToken;

/// Default cookie file, relative to the working directory.
const DEFAULT_COOKIES: &str = "cookies.json";

/// Chzzk live chat transcriber.
#[derive(Parser, Debug)]
#[command(name = "chzzk-chat", about = "Record a Chzzk live chat to a file")]
struct Cli {
    /// Streamer channel id (the hash in `chzzk.naver.com/live/<id>`).
    #[arg(long)]
    streamer_id: String,

    /// Transcript file (overrides settings).
    #[arg(long)]
    file_path: Option<PathBuf>,

    /// Session start as unix seconds; elapsed times are measured from it.
    /// Defaults to now.
    #[arg(long)]
    start_time: Option<f64>,

    /// Cookie file to read, or to write with `--save-cookies`.
    #[arg(long)]
    cookies: Option<PathBuf>,

    /// `NID_AUT` cookie value.
    #[arg(long, requires = "nid_ses")]
    nid_aut: Option<String>,

    /// `NID_SES` cookie value.
    #[arg(long, requires = "nid_aut")]
    nid_ses: Option<String>,

    /// Persist `--nid-aut`/`--nid-ses` to the cookie file.
    #[arg(long, requires = "nid_aut")]
    save_cookies: bool,

    /// Settings file (defaults to `~/.chzzk-chat/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Transcript label language.
    #[arg(long)]
    locale: Option<Locale>,

    /// Do not echo records to stdout.
    #[arg(long)]
    no_echo: bool,
}

impl Cli {
    fn cookie_path(&self) -> PathBuf {
        self.cookies
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_COOKIES))
    }

    /// Cookies from the command line win over the cookie file.
    fn credential_source(&self) -> Box<dyn CredentialSource> {
        match (&self.nid_aut, &self.nid_ses) {
            (Some(aut), Some(ses)) => {
                Box::new(StaticCredentials::new(Credentials::new(aut, ses)))
            }
            _ => Box::new(CookieFile::new(self.cookie_path())),
        }
    }

    /// Layer command-line flags over loaded settings.
    fn apply_overrides(&self, mut settings: ChzzkSettings) -> ChzzkSettings {
        if let Some(path) = &self.file_path {
            settings.transcript.path = path.to_string_lossy().into_owned();
        }
        if let Some(locale) = self.locale {
            settings.transcript.locale = locale;
        }
        if self.no_echo {
            settings.transcript.echo = false;
        }
        settings
    }
}

#[allow(clippy::cast_possible_truncation)]
fn start_time_from_secs(secs: f64) -> Result<DateTime<Utc>> {
    if !secs.is_finite() {
        bail!("start time must be a finite number of seconds, got {secs}");
    }
    let millis = (secs * 1000.0).round() as i64;
    DateTime::<Utc>::from_timestamp_millis(millis)
        .with_context(|| format!("start time out of range: {secs}"))
}

fn load_settings(path: Option<&Path>) -> Result<ChzzkSettings> {
    let path = path.map_or_else(chzzk_settings::settings_path, Path::to_path_buf);
    chzzk_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings = args.apply_overrides(load_settings(args.settings.as_deref())?);
    chzzk_core::logging::init_subscriber(&settings.logging.level);

    let start_time = match args.start_time {
        Some(secs) => start_time_from_secs(secs)?,
        None => Utc::now(),
    };

    let credentials = args
        .credential_source()
        .load()
        .context("Failed to load credentials")?;
    if args.save_cookies {
        let path = args.cookie_path();
        save_cookie_file(&path, &credentials)
            .with_context(|| format!("Failed to save cookies to {}", path.display()))?;
        tracing::info!(path = %path.display(), "cookies saved");
    }

    let api = ChzzkApi::new(&settings.api).context("Failed to build HTTP client")?;
    let connector = WsConnector::new(settings.chat.server_url.clone());
    let manager = SessionManager::new(
        StreamerId::from(args.streamer_id.as_str()),
        credentials,
        Arc::new(api),
        Arc::new(connector),
        SessionOptions::from_settings(&settings.chat),
    )
    .await
    .context("Failed to resolve chat target")?;
    let session = manager
        .establish()
        .await
        .context("Failed to connect to chat")?;

    let labels = Labels::for_locale(settings.transcript.locale);
    let transcript_path = PathBuf::from(&settings.transcript.path);
    let transcript = FileTranscript::open(
        &transcript_path,
        settings.transcript.append,
        settings.transcript.echo,
        labels.clone(),
    )
    .with_context(|| format!("Failed to open transcript {}", transcript_path.display()))?;

    tracing::info!(
        channel_name = %manager.channel_name(),
        channel = %session.channel_id,
        transcript = %transcript_path.display(),
        "recording chat"
    );

    let mut dispatcher = EventDispatcher::new(
        manager,
        Box::new(transcript),
        labels,
        IdentityCheck::from_settings(&settings.chat),
    );

    // Wait for shutdown signal
    let cancel = CancellationToken::new();
    let signal = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutting down...");
                    cancel.cancel();
                }
                Err(e) => tracing::warn!(error = %e, "Failed to listen for ctrl-c"),
            }
        })
    };

    let summary = dispatcher.run(session, start_time, &cancel).await;
    signal.abort();

    tracing::info!(
        frames = summary.frames,
        records = summary.records,
        skipped_entries = summary.skipped_entries,
        malformed_frames = summary.malformed_frames,
        pongs = summary.pongs,
        reconnects = summary.reconnects,
        "Shutdown complete"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn cli_requires_streamer_id() {
        assert!(Cli::try_parse_from(["chzzk-chat"]).is_err());
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["chzzk-chat", "--streamer-id", "abc"]);
        assert_eq!(cli.streamer_id, "abc");
        assert!(cli.file_path.is_none());
        assert!(cli.start_time.is_none());
        assert!(!cli.no_echo);
        assert_eq!(cli.cookie_path(), PathBuf::from("cookies.json"));
    }

    #[test]
    fn cli_nid_flags_must_come_together() {
        let result =
            Cli::try_parse_from(["chzzk-chat", "--streamer-id", "abc", "--nid-aut", "a"]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_save_cookies_needs_values() {
        let result = Cli::try_parse_from(["chzzk-chat", "--streamer-id", "abc", "--save-cookies"]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_locale_parses() {
        let cli = Cli::parse_from(["chzzk-chat", "--streamer-id", "abc", "--locale", "en"]);
        assert_eq!(cli.locale, Some(Locale::En));
        assert!(
            Cli::try_parse_from(["chzzk-chat", "--streamer-id", "abc", "--locale", "fr"]).is_err()
        );
    }

    #[test]
    fn overrides_apply_over_settings() {
        let cli = Cli::parse_from([
            "chzzk-chat",
            "--streamer-id",
            "abc",
            "--file-path",
            "/tmp/out.txt",
            "--locale",
            "en",
            "--no-echo",
        ]);
        let settings = cli.apply_overrides(ChzzkSettings::default());
        assert_eq!(settings.transcript.path, "/tmp/out.txt");
        assert_eq!(settings.transcript.locale, Locale::En);
        assert!(!settings.transcript.echo);
    }

    #[test]
    fn no_overrides_keep_settings() {
        let cli = Cli::parse_from(["chzzk-chat", "--streamer-id", "abc"]);
        let settings = cli.apply_overrides(ChzzkSettings::default());
        assert_eq!(settings.transcript.path, "./chat.txt");
        assert!(settings.transcript.echo);
    }

    #[test]
    fn start_time_accepts_fractional_seconds() {
        let t = start_time_from_secs(1_700_000_000.5).unwrap();
        assert_eq!(t.timestamp_millis(), 1_700_000_000_500);
    }

    #[test]
    fn start_time_rejects_nan() {
        assert!(start_time_from_secs(f64::NAN).is_err());
    }

    #[test]
    fn cli_cookies_win_over_file() {
        let cli = Cli::parse_from([
            "chzzk-chat",
            "--streamer-id",
            "abc",
            "--cookies",
            "/nonexistent/cookies.json",
            "--nid-aut",
            "a",
            "--nid-ses",
            "s",
        ]);
        let creds = cli.credential_source().load().unwrap();
        assert_eq!(creds, Credentials::new("a", "s"));
    }

    #[test]
    fn cookie_file_is_default_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, r#"{"NID_AUT": "fa", "NID_SES": "fs"}"#).unwrap();
        let cli = Cli::parse_from([
            "chzzk-chat",
            "--streamer-id",
            "abc",
            "--cookies",
            path.to_str().unwrap(),
        ]);
        let creds = cli.credential_source().load().unwrap();
        assert_eq!(creds.nid_aut(), "fa");
    }

    #[test]
    fn missing_settings_file_uses_defaults() {
        let settings = load_settings(Some(Path::new("/nonexistent/settings.json"))).unwrap();
        assert_eq!(settings.chat.device_type, 2001);
    }
}
