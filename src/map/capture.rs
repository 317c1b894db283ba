//! Capture-and-publish decisions.

use std::fmt;

use serde::Serialize;

use crate::models::NewReport;
use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    NoLocation,
    NoIdentity,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoLocation => f.write_str("no current location"),
            SkipReason::NoIdentity => f.write_str("not signed in"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureDecision {
    Publish(NewReport),
    Skip(SkipReason),
}

/// Handle a confirmation: close the scanner, show the success dialog and
/// decide whether a report can be written.
///
/// The dialog is shown either way. Every call is independent; nothing is
/// de-duplicated.
pub fn confirm(session: &mut SessionState) -> CaptureDecision {
    session.capture.scanning = false;
    session.capture.success_dialog = true;

    let Some(location) = session.current_location else {
        return CaptureDecision::Skip(SkipReason::NoLocation);
    };
    let Some(identity) = &session.identity else {
        return CaptureDecision::Skip(SkipReason::NoIdentity);
    };

    CaptureDecision::Publish(NewReport::new(location, identity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LatLng, UserId, INITIAL_VERIFIED_COUNT};

    fn session() -> SessionState {
        let mut session = SessionState::new(LatLng::new(12.9716, 77.5946).unwrap());
        session.capture.scanning = true;
        session
    }

    #[test]
    fn test_publish_at_current_location() {
        let mut session = session();
        let fix = LatLng::new(12.9177, 77.6238).unwrap();
        session.current_location = Some(fix);
        session.identity = Some(UserId::new("u1"));

        let CaptureDecision::Publish(report) = confirm(&mut session) else {
            panic!("expected a publish decision");
        };
        assert_eq!((report.lat, report.lng), (fix.lat, fix.lng));
        assert_eq!(report.reporter_id, "u1");
        assert_eq!(report.verified_count, INITIAL_VERIFIED_COUNT);
        assert!(!session.capture.scanning);
        assert!(session.capture.success_dialog);
    }

    #[test]
    fn test_skip_without_location_or_identity() {
        let mut session = session();
        session.identity = Some(UserId::new("u1"));
        assert_eq!(confirm(&mut session), CaptureDecision::Skip(SkipReason::NoLocation));
        assert!(session.capture.success_dialog);

        let mut session = self::session();
        session.current_location = Some(LatLng::new(1.0, 1.0).unwrap());
        assert_eq!(confirm(&mut session), CaptureDecision::Skip(SkipReason::NoIdentity));
        assert!(!session.capture.scanning);
    }

    #[test]
    fn test_repeated_confirmations_are_independent() {
        let mut session = session();
        session.current_location = Some(LatLng::new(1.0, 1.0).unwrap());
        session.identity = Some(UserId::new("u1"));

        let first = confirm(&mut session);
        let second = confirm(&mut session);
        assert!(matches!(first, CaptureDecision::Publish(_)));
        assert_eq!(first, second);
    }
}
