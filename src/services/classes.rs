use chrono::Duration;
use futures_util::future::join_all;

use crate::{
    models::{auth::AuthenticatedUser, class::Class, class::CreateClassRequest},
    store::Store,
};

/// Result of a recurring creation: the inserts are independent, so a
/// partial failure keeps whatever succeeded.
#[derive(Debug)]
pub struct RecurringOutcome {
    pub created: Vec<Class>,
    pub failed: usize,
}

/// One request per week: the start (and end, when present) shift by whole
/// weeks, every other field is shared.
fn build_occurrences(req: &CreateClassRequest, weeks: u32) -> Vec<CreateClassRequest> {
    (0..weeks)
        .map(|week| {
            let offset = Duration::weeks(week as i64);
            let mut occurrence = req.clone();
            occurrence.start_at = req.start_at + offset;
            occurrence.end_at = req.end_at.map(|end| end + offset);
            occurrence.is_recurring = false;
            occurrence.recurring_weeks = None;
            occurrence
        })
        .collect()
}

pub struct ClassService;

impl ClassService {
    /// Issues one insert per week concurrently and waits for all of them;
    /// failures are reported in aggregate, successes are not rolled back.
    pub async fn create_recurring(
        store: &Store,
        actor: &AuthenticatedUser,
        req: &CreateClassRequest,
        weeks: u32,
    ) -> RecurringOutcome {
        let occurrences = build_occurrences(req, weeks);
        let inserts = occurrences
            .iter()
            .map(|occurrence| store.classes.insert(actor, occurrence));
        let results = join_all(inserts).await;

        let mut created = Vec::new();
        let mut failed = 0;
        for result in results {
            match result {
                Ok(class) => created.push(class),
                Err(err) => {
                    failed += 1;
                    tracing::warn!("recurring class insert failed: {err}");
                }
            }
        }
        RecurringOutcome { created, failed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::class::{HomeworkStatus, Subject};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn base_request() -> CreateClassRequest {
        CreateClassRequest {
            student_id: Uuid::new_v4(),
            subject: Subject::Matematyka,
            start_at: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
            end_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap()),
            temat: Some("Funkcje liniowe".into()),
            zrozumienie: None,
            trudnosci: None,
            praca_domowa: None,
            status_pd: HomeworkStatus::Zadane,
            is_recurring: true,
            recurring_weeks: Some(4),
        }
    }

    #[test]
    fn four_weeks_produce_four_monday_slots() {
        let occurrences = build_occurrences(&base_request(), 4);
        assert_eq!(occurrences.len(), 4);

        let expected_days = [1, 8, 15, 22];
        for (occurrence, day) in occurrences.iter().zip(expected_days) {
            assert_eq!(
                occurrence.start_at,
                Utc.with_ymd_and_hms(2024, 1, day, 10, 0, 0).unwrap()
            );
            assert_eq!(
                occurrence.end_at,
                Some(Utc.with_ymd_and_hms(2024, 1, day, 11, 0, 0).unwrap())
            );
        }
    }

    #[test]
    fn occurrences_share_all_other_fields() {
        let req = base_request();
        for occurrence in build_occurrences(&req, 4) {
            assert_eq!(occurrence.student_id, req.student_id);
            assert_eq!(occurrence.subject, req.subject);
            assert_eq!(occurrence.temat, req.temat);
            assert_eq!(occurrence.status_pd, req.status_pd);
            assert!(!occurrence.is_recurring);
            assert_eq!(occurrence.recurring_weeks, None);
        }
    }

    #[test]
    fn one_week_is_a_single_untouched_slot() {
        let req = base_request();
        let occurrences = build_occurrences(&req, 1);
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].start_at, req.start_at);
    }

    #[test]
    fn missing_end_time_stays_missing() {
        let mut req = base_request();
        req.end_at = None;
        for occurrence in build_occurrences(&req, 3) {
            assert_eq!(occurrence.end_at, None);
        }
    }
}
