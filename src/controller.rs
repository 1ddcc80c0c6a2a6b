//! Signing-screen state machine.
//!
//! `Session::step` is pure: it consumes an event, returns the next session and
//! the side effects the router has to run. Completions of those effects come
//! back in as further events.

use log::Level;
use serde::{Deserialize, Serialize};

use crate::error::SignError;
use crate::features::document_store::Document;
use crate::features::placement::{PlacementPolicy, TapPoint, Viewport};
use crate::features::signature::SignatureImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Idle,
    Downloading,
    Viewing,
    Capturing,
    EditArmed,
}

#[derive(Debug)]
pub enum Event {
    Start,
    DownloadFinished(Result<Document, SignError>),
    PageLayout { page_count: u32, viewport: Viewport },
    SignRequested,
    SignatureCaptured(String),
    SignatureEmpty,
    SignatureCancelled,
    PageTapped(TapPoint),
    PlacementFinished(Result<Document, SignError>),
}

/// Everything the worker needs to stamp and save one signature.
#[derive(Debug, Clone)]
pub struct PlacementJob {
    pub document: Document,
    pub signature: SignatureImage,
    pub tap: TapPoint,
    pub viewport: Viewport,
    pub policy: PlacementPolicy,
}

#[derive(Debug)]
pub enum Effect {
    Fetch { url: String },
    Place(Box<PlacementJob>),
    Log { level: Level, message: String },
}

#[derive(Debug, Clone)]
pub struct Session {
    pub mode: Mode,
    pub document: Option<Document>,
    pub signature: Option<SignatureImage>,
    pub viewport: Option<Viewport>,
    pub placing: bool,
    pub fetch_failed: bool,
    pub last_error: Option<String>,
    pub source_url: String,
    pub policy: PlacementPolicy,
}

#[derive(Debug)]
pub struct Transition {
    pub session: Session,
    pub effects: Vec<Effect>,
}

impl Session {
    pub fn new(source_url: impl Into<String>, policy: PlacementPolicy) -> Self {
        Self {
            mode: Mode::Idle,
            document: None,
            signature: None,
            viewport: None,
            placing: false,
            fetch_failed: false,
            last_error: None,
            source_url: source_url.into(),
            policy,
        }
    }

    pub fn step(mut self, event: Event) -> Transition {
        let mut effects = Vec::new();
        match (self.mode, event) {
            (Mode::Idle, Event::Start) => {
                self.mode = Mode::Downloading;
                self.fetch_failed = false;
                effects.push(Effect::Fetch {
                    url: self.source_url.clone(),
                });
            }
            // Retry only once the previous fetch has actually failed.
            (Mode::Downloading, Event::Start) if self.fetch_failed => {
                self.fetch_failed = false;
                self.last_error = None;
                effects.push(Effect::Fetch {
                    url: self.source_url.clone(),
                });
            }
            (Mode::Downloading, Event::DownloadFinished(Ok(doc))) => {
                effects.push(log_effect(
                    Level::Info,
                    format!("document ready: {} ({} pages)", doc.path.display(), doc.page_count()),
                ));
                self.document = Some(doc);
                self.viewport = None;
                self.last_error = None;
                self.mode = Mode::Viewing;
            }
            (Mode::Downloading, Event::DownloadFinished(Err(err))) => {
                effects.push(log_effect(Level::Error, format!("download failed: {err}")));
                self.fetch_failed = true;
                self.last_error = Some(err.code().to_string());
            }
            (_, Event::PageLayout { page_count, viewport }) if self.document.is_some() => {
                self.viewport = Some(viewport);
                effects.push(log_effect(
                    Level::Debug,
                    format!(
                        "renderer reported {page_count} pages at {}x{}",
                        viewport.width, viewport.height
                    ),
                ));
            }
            (Mode::Viewing, Event::SignRequested) if !self.placing => {
                self.mode = Mode::Capturing;
                self.last_error = None;
            }
            (Mode::Capturing, Event::SignatureCaptured(raw)) => {
                match SignatureImage::from_capture(&raw) {
                    Ok(Some(sig)) => {
                        self.signature = Some(sig);
                        self.mode = Mode::EditArmed;
                    }
                    Ok(None) => {
                        effects.push(log_effect(Level::Debug, "empty signature ignored".into()));
                    }
                    Err(err) => {
                        effects.push(log_effect(Level::Warn, format!("signature rejected: {err}")));
                        self.last_error = Some(err.code().to_string());
                        self.mode = Mode::Viewing;
                    }
                }
            }
            (Mode::Capturing, Event::SignatureEmpty) => {
                effects.push(log_effect(Level::Debug, "signature pad empty".into()));
            }
            (Mode::Capturing, Event::SignatureCancelled) => {
                self.mode = Mode::Viewing;
            }
            (Mode::EditArmed, Event::PageTapped(tap)) => {
                // Disarm before the job starts so further taps fall through.
                self.mode = Mode::Viewing;
                match self.placement_job(tap) {
                    Some(job) => {
                        self.placing = true;
                        effects.push(Effect::Place(Box::new(job)));
                    }
                    None => {
                        effects.push(log_effect(
                            Level::Warn,
                            "tap ignored: no document or signature".into(),
                        ));
                    }
                }
            }
            (_, Event::PlacementFinished(result)) if self.placing => {
                self.placing = false;
                self.mode = Mode::Viewing;
                match result {
                    Ok(doc) => {
                        effects.push(log_effect(
                            Level::Info,
                            format!("signed copy active: {}", doc.path.display()),
                        ));
                        self.document = Some(doc);
                        // The host re-reports geometry once it has loaded the new file.
                        self.viewport = None;
                        self.last_error = None;
                    }
                    Err(err) => {
                        effects.push(log_effect(Level::Error, format!("placement failed: {err}")));
                        self.last_error = Some(err.code().to_string());
                    }
                }
            }
            (mode, event) => {
                effects.push(log_effect(
                    Level::Debug,
                    format!("ignored {} in {mode:?}", event_name(&event)),
                ));
            }
        }
        Transition {
            session: self,
            effects,
        }
    }

    fn placement_job(&self, tap: TapPoint) -> Option<PlacementJob> {
        let document = self.document.clone()?;
        let signature = self.signature.clone()?;
        // A missing viewport is reported by the engine as invalid geometry.
        let viewport = self.viewport.unwrap_or(Viewport {
            width: 0.0,
            height: 0.0,
        });
        Some(PlacementJob {
            document,
            signature,
            tap,
            viewport,
            policy: self.policy,
        })
    }
}

fn log_effect(level: Level, message: String) -> Effect {
    Effect::Log { level, message }
}

fn event_name(event: &Event) -> &'static str {
    match event {
        Event::Start => "start",
        Event::DownloadFinished(_) => "download_finished",
        Event::PageLayout { .. } => "page_layout",
        Event::SignRequested => "sign_requested",
        Event::SignatureCaptured(_) => "signature_captured",
        Event::SignatureEmpty => "signature_empty",
        Event::SignatureCancelled => "signature_cancelled",
        Event::PageTapped(_) => "page_tapped",
        Event::PlacementFinished(_) => "placement_finished",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::codec;
    use crate::features::pdf::test_support::{blank_pdf, signature_png};
    use crate::features::placement::Platform;
    use std::path::PathBuf;

    fn doc(name: &str) -> Document {
        Document::from_bytes(PathBuf::from(name), blank_pdf(&[(600.0, 800.0)])).unwrap()
    }

    fn capture() -> String {
        format!("data:image/png;base64,{}", codec::encode(&signature_png()))
    }

    fn tap() -> TapPoint {
        TapPoint {
            page: 1,
            x: 50.0,
            y: 50.0,
        }
    }

    fn run(session: Session, events: Vec<Event>) -> (Session, Vec<Effect>) {
        let mut effects = Vec::new();
        let mut session = session;
        for event in events {
            let t = session.step(event);
            session = t.session;
            effects.extend(t.effects);
        }
        (session, effects)
    }

    fn viewing() -> Session {
        let (session, _) = run(
            Session::new("http://example.test/a.pdf", Platform::Android.policy()),
            vec![
                Event::Start,
                Event::DownloadFinished(Ok(doc("/tmp/a.pdf"))),
                Event::PageLayout {
                    page_count: 1,
                    viewport: Viewport {
                        width: 400.0,
                        height: 540.0,
                    },
                },
            ],
        );
        assert_eq!(session.mode, Mode::Viewing);
        session
    }

    fn armed() -> Session {
        let (session, _) = run(
            viewing(),
            vec![Event::SignRequested, Event::SignatureCaptured(capture())],
        );
        assert_eq!(session.mode, Mode::EditArmed);
        session
    }

    #[test]
    fn start_requests_fetch() {
        let t = Session::new("http://example.test/a.pdf", Platform::Android.policy())
            .step(Event::Start);
        assert_eq!(t.session.mode, Mode::Downloading);
        assert!(matches!(&t.effects[..], [Effect::Fetch { url }] if url == "http://example.test/a.pdf"));
    }

    #[test]
    fn failed_download_stalls_until_restarted() {
        let (session, effects) = run(
            Session::new("u", Platform::Android.policy()),
            vec![
                Event::Start,
                Event::DownloadFinished(Err(SignError::Network("down".into()))),
            ],
        );
        assert_eq!(session.mode, Mode::Downloading);
        assert_eq!(session.last_error.as_deref(), Some("network_error"));
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::Log { level: Level::Error, .. })));

        let retry = session.step(Event::Start);
        assert!(matches!(&retry.effects[..], [Effect::Fetch { .. }]));
        let again = retry.session.step(Event::Start);
        assert!(!again.effects.iter().any(|e| matches!(e, Effect::Fetch { .. })));
    }

    #[test]
    fn taps_outside_edit_mode_are_ignored() {
        let t = viewing().step(Event::PageTapped(tap()));
        assert_eq!(t.session.mode, Mode::Viewing);
        assert!(!t.session.placing);
        assert!(!t.effects.iter().any(|e| matches!(e, Effect::Place(_))));
    }

    #[test]
    fn capture_outside_capturing_is_ignored() {
        let t = viewing().step(Event::SignatureCaptured(capture()));
        assert_eq!(t.session.mode, Mode::Viewing);
        assert!(t.session.signature.is_none());
    }

    #[test]
    fn empty_capture_keeps_pad_open() {
        let (session, _) = run(
            viewing(),
            vec![
                Event::SignRequested,
                Event::SignatureCaptured("data:image/png;base64,".into()),
                Event::SignatureEmpty,
            ],
        );
        assert_eq!(session.mode, Mode::Capturing);
        assert!(session.signature.is_none());
    }

    #[test]
    fn cancel_returns_to_viewing() {
        let (session, _) = run(viewing(), vec![Event::SignRequested, Event::SignatureCancelled]);
        assert_eq!(session.mode, Mode::Viewing);
    }

    #[test]
    fn malformed_capture_falls_back_to_viewing() {
        let (session, _) = run(
            viewing(),
            vec![
                Event::SignRequested,
                Event::SignatureCaptured("data:image/png;base64,%%%".into()),
            ],
        );
        assert_eq!(session.mode, Mode::Viewing);
        assert_eq!(session.last_error.as_deref(), Some("malformed_input"));
    }

    #[test]
    fn tap_in_edit_mode_disarms_and_requests_placement() {
        let t = armed().step(Event::PageTapped(tap()));
        assert_eq!(t.session.mode, Mode::Viewing);
        assert!(t.session.placing);
        let job = t
            .effects
            .iter()
            .find_map(|e| match e {
                Effect::Place(job) => Some(job),
                _ => None,
            })
            .expect("place effect");
        assert_eq!(job.tap, tap());
        assert_eq!(job.viewport.width, 400.0);

        let second = t.session.step(Event::PageTapped(tap()));
        assert!(!second.effects.iter().any(|e| matches!(e, Effect::Place(_))));
    }

    #[test]
    fn sign_request_ignored_while_placing() {
        let t = armed().step(Event::PageTapped(tap()));
        let t = t.session.step(Event::SignRequested);
        assert_eq!(t.session.mode, Mode::Viewing);
    }

    #[test]
    fn successful_placement_swaps_document() {
        let t = armed().step(Event::PageTapped(tap()));
        let signed = doc("/tmp/a_signed_1.pdf");
        let t = t.session.step(Event::PlacementFinished(Ok(signed)));
        assert_eq!(t.session.mode, Mode::Viewing);
        assert!(!t.session.placing);
        assert_eq!(
            t.session.document.as_ref().map(|d| d.path.clone()),
            Some(PathBuf::from("/tmp/a_signed_1.pdf"))
        );
        assert!(t.session.viewport.is_none());
    }

    #[test]
    fn failed_placement_keeps_prior_document() {
        let t = armed().step(Event::PageTapped(tap()));
        let t = t.session.step(Event::PlacementFinished(Err(SignError::PageOutOfRange {
            page: 3,
            count: 1,
        })));
        assert_eq!(t.session.mode, Mode::Viewing);
        assert!(!t.session.placing);
        assert_eq!(
            t.session.document.as_ref().map(|d| d.path.clone()),
            Some(PathBuf::from("/tmp/a.pdf"))
        );
        assert_eq!(t.session.last_error.as_deref(), Some("page_out_of_range"));
    }

    #[test]
    fn stray_placement_result_is_ignored() {
        let before = viewing();
        let t = before.step(Event::PlacementFinished(Ok(doc("/tmp/other.pdf"))));
        assert_eq!(
            t.session.document.as_ref().map(|d| d.path.clone()),
            Some(PathBuf::from("/tmp/a.pdf"))
        );
    }
}
