//! The pipeline stage machine.
//!
//! Holds the session stage, one status slot per action and one dispatch
//! generation per action. A completion is applied only if it carries the
//! generation its action still has and the action's prerequisite still
//! holds; anything else is stale and discarded.

use std::collections::HashMap;

use crate::core::{ActionKind, ActionStatus, PipelineStage};
use crate::errors::ActionError;

/// Identifies one dispatched call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchTicket {
    /// The dispatched action.
    pub action: ActionKind,
    /// The action's generation at dispatch.
    pub generation: u64,
}

/// Stage, status slots and generation counters of one session.
#[derive(Debug, Clone, Default)]
pub struct StageMachine {
    stage: PipelineStage,
    statuses: HashMap<ActionKind, ActionStatus>,
    generations: HashMap<ActionKind, u64>,
}

impl StageMachine {
    /// Creates a machine in `no_data` with every slot idle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current stage.
    #[must_use]
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// The status of an action's slot.
    #[must_use]
    pub fn status(&self, action: ActionKind) -> ActionStatus {
        self.statuses.get(&action).cloned().unwrap_or_default()
    }

    /// Every slot, in action order.
    #[must_use]
    pub fn statuses(&self) -> Vec<(ActionKind, ActionStatus)> {
        ActionKind::ALL
            .into_iter()
            .map(|action| (action, self.status(action)))
            .collect()
    }

    /// The current dispatch generation of an action.
    #[must_use]
    pub fn generation(&self, action: ActionKind) -> u64 {
        self.generations.get(&action).copied().unwrap_or(0)
    }

    /// Returns true if the stage satisfies the action's prerequisite.
    #[must_use]
    pub fn can_run(&self, action: ActionKind) -> bool {
        self.stage.satisfies(action.required_stage())
    }

    /// Returns true if a reset call is outstanding.
    #[must_use]
    pub fn reset_in_flight(&self) -> bool {
        self.status(ActionKind::Reset).is_in_flight()
    }


    /// Checks whether `action` may be dispatched now.
    ///
    /// A failed prerequisite is also recorded in the action's slot.
    ///
    /// # Errors
    ///
    /// Returns `ResetInProgress`, `AlreadyInFlight` or `PrerequisiteNotMet`.
    pub fn check(&mut self, action: ActionKind) -> Result<(), ActionError> {
        if action != ActionKind::Reset && self.reset_in_flight() {
            return Err(ActionError::ResetInProgress { action });
        }
        if self.status(action).is_in_flight() {
            return Err(ActionError::AlreadyInFlight { action });
        }
        if !self.can_run(action) {
            let error = ActionError::prerequisite(action, self.stage);
            self.statuses
                .insert(action, ActionStatus::Failed(error.to_string()));
            return Err(error);
        }
        Ok(())
    }

    /// Checks and dispatches `action`, marking its slot in flight.
    ///
    /// Dispatching a reset invalidates every outstanding call.
    ///
    /// # Errors
    ///
    /// Returns the error from [`StageMachine::check`].
    pub fn begin(&mut self, action: ActionKind) -> Result<DispatchTicket, ActionError> {
        self.check(action)?;

        if action == ActionKind::Reset {
            self.bump_all();
            for status in self.statuses.values_mut() {
                if status.is_in_flight() {
                    *status = ActionStatus::Idle;
                }
            }
        } else {
            *self.generations.entry(action).or_insert(0) += 1;
        }

        self.statuses.insert(action, ActionStatus::InFlight);
        Ok(DispatchTicket {
            action,
            generation: self.generation(action),
        })
    }

    /// Records a local failure without dispatching.
    ///
    /// Leaves an in-flight slot untouched.
    pub fn record_failure(&mut self, action: ActionKind, message: impl Into<String>) {
        if !self.status(action).is_in_flight() {
            self.statuses
                .insert(action, ActionStatus::Failed(message.into()));
        }
    }

    /// Returns true if a completion for `ticket` would be applied.
    #[must_use]
    pub fn is_current(&self, ticket: &DispatchTicket) -> bool {
        self.generation(ticket.action) == ticket.generation && self.can_run(ticket.action)
    }

    /// Applies the outcome of a completed call.
    ///
    /// Success moves the stage to the action's target and supersedes every
    /// outstanding call that read what the action replaced. Failure records
    /// the message and leaves the stage alone.
    ///
    /// # Errors
    ///
    /// Returns `StaleResponse` if the ticket was superseded, in which case
    /// nothing but a dangling in-flight slot is touched.
    pub fn transition(
        &mut self,
        ticket: &DispatchTicket,
        outcome: Result<(), String>,
    ) -> Result<(), ActionError> {
        if !self.is_current(ticket) {
            if self.generation(ticket.action) == ticket.generation {
                // The prerequisite was undone while the call was outstanding.
                self.statuses.insert(ticket.action, ActionStatus::Idle);
            }
            return Err(ActionError::StaleResponse {
                action: ticket.action,
                generation: ticket.generation,
            });
        }

        match outcome {
            Ok(()) => {
                self.stage = ticket.action.stage_after(self.stage);
                self.supersede(ticket.action);
                self.statuses.insert(ticket.action, ActionStatus::Succeeded);
            }
            Err(message) => {
                self.statuses
                    .insert(ticket.action, ActionStatus::Failed(message));
            }
        }
        Ok(())
    }

    /// Completes a reset.
    ///
    /// The session returns to `no_data` whatever the outcome; only the
    /// reset slot remembers how the call went.
    pub fn finish_reset(&mut self, outcome: Result<(), String>) {
        self.stage = PipelineStage::NoData;
        self.statuses.clear();
        self.bump_all();
        let status = match outcome {
            Ok(()) => ActionStatus::Succeeded,
            Err(message) => ActionStatus::Failed(message),
        };
        self.statuses.insert(ActionKind::Reset, status);
    }

    fn supersede(&mut self, producer: ActionKind) {
        for action in ActionKind::ALL {
            if action.is_superseded_by(producer) {
                *self.generations.entry(action).or_insert(0) += 1;
                if self.status(action).is_in_flight() {
                    self.statuses.insert(action, ActionStatus::Idle);
                }
            }
        }
    }

    fn bump_all(&mut self) {
        for action in ActionKind::ALL {
            *self.generations.entry(action).or_insert(0) += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorClass;

    fn advance(machine: &mut StageMachine, actions: &[ActionKind]) {
        for action in actions {
            let ticket = machine.begin(*action).unwrap();
            machine.transition(&ticket, Ok(())).unwrap();
        }
    }

    #[test]
    fn test_new_machine() {
        let machine = StageMachine::new();
        assert_eq!(machine.stage(), PipelineStage::NoData);
        assert_eq!(machine.status(ActionKind::Upload), ActionStatus::Idle);
        assert!(machine.can_run(ActionKind::Upload));
        assert!(!machine.can_run(ActionKind::Predict));
    }

    #[test]
    fn test_happy_path() {
        let mut machine = StageMachine::new();
        advance(
            &mut machine,
            &[ActionKind::Upload, ActionKind::Clean, ActionKind::Train],
        );
        assert_eq!(machine.stage(), PipelineStage::Trained);
        assert!(machine.can_run(ActionKind::Predict));
        assert!(machine.status(ActionKind::Train).is_success());
    }

    #[test]
    fn test_prerequisite_not_met_is_recorded() {
        let mut machine = StageMachine::new();
        let err = machine.begin(ActionKind::FetchMetrics).unwrap_err();

        assert!(matches!(err, ActionError::PrerequisiteNotMet { .. }));
        assert_eq!(err.class(), ErrorClass::LocalValidation);
        assert!(machine.status(ActionKind::FetchMetrics).is_failure());
        assert_eq!(machine.generation(ActionKind::FetchMetrics), 0);
    }

    #[test]
    fn test_already_in_flight() {
        let mut machine = StageMachine::new();
        let ticket = machine.begin(ActionKind::Upload).unwrap();

        let err = machine.begin(ActionKind::Upload).unwrap_err();
        assert!(matches!(err, ActionError::AlreadyInFlight { .. }));
        assert!(machine.status(ActionKind::Upload).is_in_flight());

        machine.record_failure(ActionKind::Upload, "ignored");
        assert!(machine.status(ActionKind::Upload).is_in_flight());

        machine.transition(&ticket, Ok(())).unwrap();
        assert_eq!(machine.stage(), PipelineStage::Uploaded);
    }

    #[test]
    fn test_failure_leaves_stage() {
        let mut machine = StageMachine::new();
        advance(&mut machine, &[ActionKind::Upload]);

        let ticket = machine.begin(ActionKind::Clean).unwrap();
        machine
            .transition(&ticket, Err("No hay datos".to_string()))
            .unwrap();

        assert_eq!(machine.stage(), PipelineStage::Uploaded);
        assert_eq!(
            machine.status(ActionKind::Clean).error_message(),
            Some("No hay datos")
        );
    }

    #[test]
    fn test_reupload_demotes_stage() {
        let mut machine = StageMachine::new();
        advance(
            &mut machine,
            &[ActionKind::Upload, ActionKind::Clean, ActionKind::Train],
        );
        advance(&mut machine, &[ActionKind::Upload]);
        assert_eq!(machine.stage(), PipelineStage::Uploaded);
        assert!(!machine.can_run(ActionKind::Predict));
    }

    #[test]
    fn test_reset_discards_inflight_completion() {
        let mut machine = StageMachine::new();
        advance(&mut machine, &[ActionKind::Upload, ActionKind::Clean]);

        let train = machine.begin(ActionKind::Train).unwrap();
        let reset = machine.begin(ActionKind::Reset).unwrap();
        assert_eq!(reset.action, ActionKind::Reset);
        assert_eq!(machine.status(ActionKind::Train), ActionStatus::Idle);

        let err = machine.begin(ActionKind::Upload).unwrap_err();
        assert!(matches!(err, ActionError::ResetInProgress { .. }));

        machine.finish_reset(Ok(()));
        let err = machine.transition(&train, Ok(())).unwrap_err();
        assert_eq!(err.class(), ErrorClass::StaleResponseIgnored);
        assert_eq!(machine.stage(), PipelineStage::NoData);
        assert!(machine.status(ActionKind::Reset).is_success());
    }

    #[test]
    fn test_failed_reset_still_returns_to_no_data() {
        let mut machine = StageMachine::new();
        advance(&mut machine, &[ActionKind::Upload]);

        machine.begin(ActionKind::Reset).unwrap();
        machine.finish_reset(Err("backend down".to_string()));

        assert_eq!(machine.stage(), PipelineStage::NoData);
        assert!(machine.status(ActionKind::Reset).is_failure());
        assert_eq!(machine.status(ActionKind::Upload), ActionStatus::Idle);
    }

    #[test]
    fn test_completion_after_prerequisite_undone_is_stale() {
        let mut machine = StageMachine::new();
        advance(
            &mut machine,
            &[ActionKind::Upload, ActionKind::Clean, ActionKind::Train],
        );

        let metrics = machine.begin(ActionKind::FetchMetrics).unwrap();
        advance(&mut machine, &[ActionKind::Upload]);

        let err = machine.transition(&metrics, Ok(())).unwrap_err();
        assert!(matches!(err, ActionError::StaleResponse { .. }));
        assert_eq!(machine.status(ActionKind::FetchMetrics), ActionStatus::Idle);
        assert_eq!(machine.stage(), PipelineStage::Uploaded);
    }

    #[test]
    fn test_reupload_supersedes_outstanding_clean() {
        let mut machine = StageMachine::new();
        advance(&mut machine, &[ActionKind::Upload]);

        let clean = machine.begin(ActionKind::Clean).unwrap();
        let info = machine.begin(ActionKind::DataInfo).unwrap();
        advance(&mut machine, &[ActionKind::Upload]);
        assert_eq!(machine.status(ActionKind::Clean), ActionStatus::Idle);

        let err = machine.transition(&clean, Ok(())).unwrap_err();
        assert!(matches!(err, ActionError::StaleResponse { .. }));
        assert!(machine.transition(&info, Ok(())).is_err());
        assert_eq!(machine.stage(), PipelineStage::Uploaded);
        assert_eq!(machine.status(ActionKind::Clean), ActionStatus::Idle);

        advance(&mut machine, &[ActionKind::Clean]);
        assert_eq!(machine.stage(), PipelineStage::Cleaned);
    }

    #[test]
    fn test_reclean_keeps_trained_stage() {
        let mut machine = StageMachine::new();
        advance(
            &mut machine,
            &[ActionKind::Upload, ActionKind::Clean, ActionKind::Train],
        );

        let export = machine.begin(ActionKind::Export).unwrap();
        let predict = machine.begin(ActionKind::Predict).unwrap();
        advance(&mut machine, &[ActionKind::Clean]);

        assert_eq!(machine.stage(), PipelineStage::Trained);
        assert!(machine.transition(&export, Ok(())).is_err());
        machine.transition(&predict, Ok(())).unwrap();
    }

    #[test]
    fn test_distinct_actions_in_flight_together() {
        let mut machine = StageMachine::new();
        advance(
            &mut machine,
            &[ActionKind::Upload, ActionKind::Clean, ActionKind::Train],
        );

        let metrics = machine.begin(ActionKind::FetchMetrics).unwrap();
        let predict = machine.begin(ActionKind::Predict).unwrap();
        machine.transition(&predict, Ok(())).unwrap();
        machine.transition(&metrics, Ok(())).unwrap();
        assert_eq!(machine.stage(), PipelineStage::Trained);
    }
}
