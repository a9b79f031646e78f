//! Checkpoint discipline shared by the orchestrators.
//!
//! Every phase that performs a durable external side effect hands its result
//! to [`Checkpointer`], which writes the state before the orchestrator is
//! allowed to look at success or failure.

use anyhow::{Context, Result, anyhow};
use envboot_common::EnvState;

use crate::application::ports::StateStore;
use crate::domain::{Outcome, Phase};

/// Forces a durable write after a phase returns state.
pub struct Checkpointer<'a, S: StateStore> {
    store: &'a S,
}

impl<'a, S: StateStore> Checkpointer<'a, S> {
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Persist `state` after `phase` succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be written.
    pub async fn save(&self, phase: Phase, state: &EnvState) -> Result<()> {
        self.store
            .set(state)
            .await
            .with_context(|| format!("saving state after {phase}"))?;
        tracing::debug!(%phase, "checkpoint written");
        Ok(())
    }

    /// Persist whatever state `outcome` carries, then surface its result.
    ///
    /// A partial failure is checkpointed before its cause propagates. If the
    /// checkpoint itself fails, both errors are reported.
    ///
    /// # Errors
    ///
    /// Returns the phase's cause wrapped with the phase name, or the
    /// persistence error.
    pub async fn record(&self, phase: Phase, outcome: Outcome) -> Result<EnvState> {
        match outcome {
            Outcome::Success(state) => {
                self.save(phase, &state).await?;
                Ok(state)
            }
            Outcome::PartialFailure(state, cause) => {
                tracing::warn!(%phase, "phase failed with partial state; checkpointing");
                if let Err(save_err) = self.store.set(&state).await {
                    return Err(anyhow!(
                        "{phase}: {cause:#}; additionally saving partial state failed: {save_err:#}"
                    ));
                }
                Err(cause.context(phase.name()))
            }
            Outcome::Failure(cause) => Err(cause.context(phase.name())),
        }
    }
}
