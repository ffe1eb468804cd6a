//! Event dispatcher: the run loop over an established session.
//!
//! One iteration per inbound frame, strictly in arrival order:
//!
//! 1. read a frame (a transport failure re-establishes the session)
//! 2. parse it (a malformed frame is skipped)
//! 3. `ping` gets a `pong` before anything else is read, then the channel
//!    identity is re-checked; `chat`/`donation` entries become log records;
//!    everything else is ignored
//!
//! Cancellation is checked first on every wait, including the identity
//! lookup, and ends the loop without reconnecting.

use std::time::Duration;

use chrono::{DateTime, Utc};
use chzzk_core::protocol;
use chzzk_core::{ChatCategory, EventEntry, Frame, Labels, LogRecord};
use chzzk_settings::{ConnectionSettings, IDENTITY_CHECK_INTERVAL_MS, IdentityCheckMode};
use serde_json::Value;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::session::{Session, SessionManager};
use crate::transcript::TranscriptSink;
use crate::transport::TransportError;

/// `tokio::time::interval` panics on a zero period.
const MIN_TIMER_PERIOD: Duration = Duration::from_millis(1);

/// Connection state of the run loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Reading frames from a live session.
    Connected,
    /// Tearing down and re-establishing.
    Reconnecting,
}

/// When the channel identity is re-checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityCheck {
    /// After answering each server ping.
    OnPing,
    /// On an independent timer.
    Every(Duration),
}

impl IdentityCheck {
    /// Cadence from the `chat` settings section.
    ///
    /// Periods below the accepted minimum are raised to it.
    pub fn from_settings(settings: &ConnectionSettings) -> Self {
        match settings.identity_check {
            IdentityCheckMode::Ping => Self::OnPing,
            IdentityCheckMode::Interval => {
                let ms = settings
                    .identity_check_interval_ms
                    .max(*IDENTITY_CHECK_INTERVAL_MS.start());
                Self::Every(Duration::from_millis(ms))
            }
        }
    }
}

/// Counters for one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames read from the transport.
    pub frames: u64,
    /// Records written to the transcript.
    pub records: u64,
    /// Frames that failed to parse.
    pub malformed_frames: u64,
    /// Entries dropped for a bad profile or missing field.
    pub skipped_entries: u64,
    /// Pongs sent.
    pub pongs: u64,
    /// Successful re-establishments.
    pub reconnects: u64,
}

enum Step {
    Frame(Result<String, TransportError>),
    CheckIdentity,
}

enum Action {
    Continue,
    Reconnect,
    Stop,
}

/// Reads frames, answers pings, and writes chat records.
pub struct EventDispatcher {
    manager: SessionManager,
    sink: Box<dyn TranscriptSink>,
    labels: Labels,
    identity_check: IdentityCheck,
    state: ConnectionState,
    summary: RunSummary,
}

impl EventDispatcher {
    /// Dispatcher writing to `sink`, labelling records with `labels`.
    pub fn new(
        manager: SessionManager,
        sink: Box<dyn TranscriptSink>,
        labels: Labels,
        identity_check: IdentityCheck,
    ) -> Self {
        Self {
            manager,
            sink,
            labels,
            identity_check,
            state: ConnectionState::Connected,
            summary: RunSummary::default(),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Counters so far.
    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Session manager used for identity checks and re-establishment.
    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Run until `cancel` fires.
    ///
    /// Elapsed times in records are measured from `start_time`.
    pub async fn run(
        &mut self,
        session: Session,
        start_time: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> RunSummary {
        let mut session = session;
        let mut timer = self.identity_timer();
        self.state = ConnectionState::Connected;
        info!(
            channel = %session.channel_id,
            sid = %session.session_id,
            channel_name = %self.manager.channel_name(),
            "reading chat"
        );

        loop {
            let step = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tick(timer.as_mut()) => Step::CheckIdentity,
                read = session.transport_mut().recv_text() => Step::Frame(read),
            };

            let action = match step {
                Step::Frame(Ok(text)) => {
                    self.summary.frames += 1;
                    self.handle_frame(&mut session, &text, start_time, cancel)
                        .await
                }
                Step::Frame(Err(e)) => {
                    warn!(channel = %session.channel_id, error = %e, "chat transport failed");
                    Action::Reconnect
                }
                Step::CheckIdentity => self.check_identity(&session, cancel).await,
            };

            match action {
                Action::Continue => {}
                Action::Stop => break,
                Action::Reconnect => {
                    self.state = ConnectionState::Reconnecting;
                    let Some(fresh) = self.manager.reestablish(session, cancel).await else {
                        info!(summary = ?self.summary, "chat run stopped");
                        return self.summary;
                    };
                    session = fresh;
                    self.summary.reconnects += 1;
                    self.state = ConnectionState::Connected;
                    if let Some(t) = timer.as_mut() {
                        t.reset();
                    }
                }
            }
        }

        session.close().await;
        info!(summary = ?self.summary, "chat run stopped");
        self.summary
    }

    fn identity_timer(&self) -> Option<Interval> {
        match self.identity_check {
            IdentityCheck::OnPing => None,
            IdentityCheck::Every(period) => {
                let period = period.max(MIN_TIMER_PERIOD);
                let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                Some(interval)
            }
        }
    }

    async fn handle_frame(
        &mut self,
        session: &mut Session,
        text: &str,
        start_time: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Action {
        let frame = match Frame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                self.summary.malformed_frames += 1;
                debug!(error = %e, "skipping malformed frame");
                return Action::Continue;
            }
        };

        match frame {
            Frame::Ping => {
                let pong = protocol::pong().to_string();
                if let Err(e) = session.transport_mut().send_text(pong).await {
                    warn!(error = %e, "failed to answer ping");
                    return Action::Reconnect;
                }
                self.summary.pongs += 1;
                if self.identity_check == IdentityCheck::OnPing {
                    return self.check_identity(session, cancel).await;
                }
                Action::Continue
            }
            Frame::Events { category, entries } => {
                self.write_entries(category, &entries, start_time);
                Action::Continue
            }
            Frame::Connected { .. } | Frame::Other { .. } => Action::Continue,
        }
    }

    async fn check_identity(&self, session: &Session, cancel: &CancellationToken) -> Action {
        let changed = tokio::select! {
            biased;
            () = cancel.cancelled() => return Action::Stop,
            r = self.manager.channel_identity_changed(&session.channel_id) => r,
        };
        match changed {
            Ok(true) => Action::Reconnect,
            Ok(false) => Action::Continue,
            Err(e) => {
                warn!(error = %e, "channel identity check failed, keeping session");
                Action::Continue
            }
        }
    }

    fn write_entries(&mut self, category: ChatCategory, entries: &[Value], start: DateTime<Utc>) {
        for raw in entries {
            let entry = match EventEntry::from_value(raw) {
                Ok(entry) => entry,
                Err(e) => {
                    self.summary.skipped_entries += 1;
                    debug!(%category, error = %e, "skipping entry");
                    continue;
                }
            };
            let record = LogRecord::new(&entry, category, start, &self.labels);
            match self.sink.write_record(&record) {
                Ok(()) => self.summary.records += 1,
                Err(e) => error!(error = %e, "failed to write transcript record"),
            }
        }
    }
}

async fn tick(timer: Option<&mut Interval>) {
    match timer {
        Some(interval) => {
            let _ = interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
