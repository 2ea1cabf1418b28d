//! Executes [`Intent`]s against the configured collaborators.
//!
//! Failures are collected, never propagated: the transition that produced an intent
//! has already been committed and stays committed.

use tracing::{debug, warn};

use crate::engine::BookingEngine;
use crate::intent::{
    CalendarSync, Intent, Mailer, MeetingLinkProvider, MeetingRequest, ProviderError,
};
use crate::store::BookingStore;

/// Side-effect providers. Calendar and mail are optional; their intents are deferred
/// when no provider is configured.
pub struct Collaborators<'a> {
    pub meetings: &'a dyn MeetingLinkProvider,
    pub calendar: Option<&'a dyn CalendarSync>,
    pub mailer: Option<&'a dyn Mailer>,
}

#[derive(Debug, Default)]
pub struct DispatchReport {
    /// `(booking_id, link)` for every link obtained and stored.
    pub meeting_links: Vec<(String, String)>,
    pub failures: Vec<(Intent, String)>,
    /// Intents this dispatcher does not execute, returned to the caller untouched.
    pub deferred: Vec<Intent>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

enum Step {
    Ran(Result<(), String>),
    Defer,
    Skip,
}

pub fn dispatch_intents<S: BookingStore>(
    engine: &BookingEngine<S>,
    intents: Vec<Intent>,
    collaborators: &Collaborators<'_>,
) -> DispatchReport {
    let mut report = DispatchReport::default();

    for intent in intents {
        let step = match &intent {
            Intent::RequestMeetingLink(request) => {
                Step::Ran(request_link(engine, collaborators.meetings, request, &mut report))
            }
            Intent::SyncCalendar { booking_id, action } => match collaborators.calendar {
                Some(calendar) => Step::Ran(calendar.sync(booking_id, *action).map_err(describe)),
                None => Step::Defer,
            },
            Intent::SendEmail {
                kind,
                recipient_id,
                booking_id,
            } => match collaborators.mailer {
                Some(mailer) => Step::Ran(
                    mailer
                        .send(*kind, recipient_id, booking_id)
                        .map_err(describe),
                ),
                None => Step::Defer,
            },
            // Reminder bookkeeping already happened inside the transition.
            Intent::ScheduleNotifications { .. } | Intent::DiscardNotifications { .. } => {
                Step::Skip
            }
            Intent::StartCheckout { .. } | Intent::IssueRefund { .. } => Step::Defer,
        };

        match step {
            Step::Ran(Ok(())) => {}
            Step::Ran(Err(message)) => {
                warn!(?intent, error = %message, "side effect failed");
                report.failures.push((intent, message));
            }
            Step::Defer => report.deferred.push(intent),
            Step::Skip => debug!(?intent, "notification intent already applied"),
        }
    }

    report
}

fn request_link<S: BookingStore>(
    engine: &BookingEngine<S>,
    provider: &dyn MeetingLinkProvider,
    request: &MeetingRequest,
    report: &mut DispatchReport,
) -> Result<(), String> {
    let link = provider.request_link(request).map_err(describe)?;
    engine
        .attach_meeting_link(&request.booking_id, &link)
        .map_err(|e| e.to_string())?;
    report.meeting_links.push((request.booking_id.clone(), link));
    Ok(())
}

fn describe(e: ProviderError) -> String {
    e.to_string()
}
