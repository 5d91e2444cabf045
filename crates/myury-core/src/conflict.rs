//! [`ConflictDetector`] — finds the weeks of a term in which a proposed weekly
//! slot collides with an already-booked timeslot.

use std::{collections::BTreeMap, sync::Arc};

use crate::{
  Error,
  schedule::{ProposedSlot, TERM_WEEKS},
  store::SchedulerStore,
};

/// Week index (1-based) → id of the conflicting booked timeslot. Weeks without
/// a conflict are absent.
pub type ConflictReport = BTreeMap<u32, i64>;

pub struct ConflictDetector<S> {
  store: Arc<S>,
}

impl<S: SchedulerStore> ConflictDetector<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Project `slot` over weeks `1..=TERM_WEEKS` of `term_id` and report each
  /// week whose projection overlaps a booked timeslot.
  pub async fn find_conflicts(
    &self,
    term_id: i64,
    slot: ProposedSlot,
  ) -> Result<ConflictReport, S::Error> {
    slot.validate()?;

    let term = self
      .store
      .get_term(term_id)
      .await?
      .ok_or(Error::TermNotFound(term_id))?;

    let mut report = ConflictReport::new();
    for week in 1..=TERM_WEEKS {
      let (start, end) = slot.project(term.start_date, week)?;
      let booked = self.store.first_overlapping_timeslot(start, end).await?;
      if let Some(booked) = booked.filter(|b| b.overlaps(start, end)) {
        report.insert(week, booked.timeslot_id);
      }
    }

    tracing::debug!(
      term_id,
      %slot,
      conflicts = report.len(),
      "checked schedule conflicts"
    );
    Ok(report)
  }
}
