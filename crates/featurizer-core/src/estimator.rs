//! Estimator
//!
//! Drives an [`Accumulator`] through the `Pending -> Training -> Finished`
//! lifecycle and the multi-pass fit protocol. The estimator never buffers
//! data: when another pass is required the caller re-iterates its dataset.

use crate::{
    Accumulator, AnnotationStore, FeaturizerError, FitResult, TrainingConfig, TrainingContext,
    TrainingState,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Context borrowing only the fields the accumulator does not own, so the
/// accumulator can be borrowed mutably alongside it
macro_rules! context {
    ($estimator:ident, $state:expr) => {
        TrainingContext::new(
            &$estimator.annotations,
            $estimator.column,
            $estimator.accumulator.name(),
            $state,
            $estimator.pass,
        )
    };
}

/// Training-phase owner of an accumulator
pub struct Estimator<A: Accumulator> {
    accumulator: A,
    state: TrainingState,
    annotations: Arc<AnnotationStore>,
    column: usize,
    config: TrainingConfig,
    /// Current pass, 0 before training starts
    pass: u32,
    /// Items still accepted in the current pass when a budget is configured
    remaining_items: Option<u64>,
    /// Set when a pass ended inside `fit` and no further pass is allowed
    pass_limit_reached: bool,
}

impl<A: Accumulator> Estimator<A> {
    /// Create an estimator with the default training limits
    pub fn new(
        accumulator: A,
        annotations: Arc<AnnotationStore>,
        column: usize,
    ) -> Result<Self, FeaturizerError> {
        Self::with_config(accumulator, annotations, column, TrainingConfig::default())
    }

    pub fn with_config(
        accumulator: A,
        annotations: Arc<AnnotationStore>,
        column: usize,
        config: TrainingConfig,
    ) -> Result<Self, FeaturizerError> {
        config.validate()?;
        let num_columns = annotations.num_columns()?;
        if column >= num_columns {
            return Err(FeaturizerError::InvalidArgument(format!(
                "{}: column {} is out of range for {} annotation columns",
                accumulator.name(),
                column,
                num_columns
            )));
        }

        debug!("Created {} estimator for column {}", accumulator.name(), column);
        Ok(Self {
            accumulator,
            state: TrainingState::Pending,
            annotations,
            column,
            remaining_items: config.max_training_items,
            config,
            pass: 0,
            pass_limit_reached: false,
        })
    }

    pub fn name(&self) -> &'static str {
        self.accumulator.name()
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn get_state(&self) -> TrainingState {
        self.state
    }

    pub fn is_training_complete(&self) -> bool {
        self.state == TrainingState::Finished
    }

    /// Current pass, starting at 1 once training begins
    pub fn pass(&self) -> u32 {
        self.pass
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn annotations(&self) -> &Arc<AnnotationStore> {
        &self.annotations
    }

    pub fn accumulator(&self) -> &A {
        &self.accumulator
    }

    /// Move from `Pending` to `Training`
    pub fn begin_training(&mut self) -> Result<(), FeaturizerError> {
        self.require(TrainingState::Pending, "begin_training")?;

        let ctx = context!(self, TrainingState::Pending);
        self.accumulator.begin_training(&ctx)?;

        self.state = TrainingState::Training;
        self.pass = 1;
        debug!("{} training started", self.name());
        Ok(())
    }

    /// Feed one item
    pub fn fit(&mut self, item: &A::Input) -> Result<FitResult, FeaturizerError> {
        self.fit_batch(std::slice::from_ref(item))
    }

    /// Feed a batch of items in order
    ///
    /// With an item budget the batch is cut to what the current pass still
    /// accepts; once the budget is spent the pass is treated as exhausted.
    pub fn fit_batch(&mut self, items: &[A::Input]) -> Result<FitResult, FeaturizerError> {
        self.require(TrainingState::Training, "fit")?;
        if items.is_empty() {
            return Err(FeaturizerError::InvalidArgument(format!(
                "{}: fit requires at least one item",
                self.name()
            )));
        }
        self.check_pass_limit()?;

        let accepted = match self.remaining_items {
            Some(remaining) => items.len().min(usize::try_from(remaining).unwrap_or(usize::MAX)),
            None => items.len(),
        };

        let ctx = context!(self, TrainingState::Training);
        let result = self.accumulator.fit(&items[..accepted], &ctx)?;
        if let Some(remaining) = self.remaining_items.as_mut() {
            *remaining -= accepted as u64;
        }

        match result {
            FitResult::Complete => {
                self.finish()?;
                Ok(FitResult::Complete)
            }
            FitResult::ResetAndContinue => {
                self.advance_pass();
                Ok(FitResult::ResetAndContinue)
            }
            FitResult::Continue if self.remaining_items == Some(0) => {
                debug!("{} item budget spent in pass {}", self.name(), self.pass);
                if self.accumulator.needs_another_pass() {
                    self.advance_pass();
                    Ok(FitResult::ResetAndContinue)
                } else {
                    self.finish()?;
                    Ok(FitResult::Complete)
                }
            }
            FitResult::Continue => Ok(FitResult::Continue),
        }
    }

    /// Signal that the current pass reached the end of available data
    ///
    /// Either starts another pass (state stays `Training`) or finishes.
    /// A no-op once finished.
    pub fn on_data_completed(&mut self) -> Result<(), FeaturizerError> {
        if self.state == TrainingState::Finished {
            return Ok(());
        }
        self.require(TrainingState::Training, "on_data_completed")?;
        self.check_pass_limit()?;

        if self.accumulator.needs_another_pass() {
            if self.pass >= self.config.max_passes {
                return Err(FeaturizerError::PassLimitExceeded {
                    limit: self.config.max_passes,
                });
            }
            self.start_next_pass();
        } else {
            self.finish()?;
        }
        Ok(())
    }

    /// Force the transition to `Finished`
    ///
    /// Valid from `Pending` (for featurizers that need no data) or
    /// `Training`; a no-op once finished.
    pub fn complete_training(&mut self) -> Result<(), FeaturizerError> {
        match self.state {
            TrainingState::Finished => Ok(()),
            TrainingState::Pending | TrainingState::Training => self.finish(),
        }
    }

    /// Produce a transformer from the finished accumulator
    ///
    /// May be called repeatedly; each call yields an independent transformer.
    pub fn create_transformer(&self) -> Result<A::Transformer, FeaturizerError> {
        self.require(TrainingState::Finished, "create_transformer")?;
        let transformer = self.accumulator.create_transformer()?;
        info!("Created {} transformer", self.name());
        Ok(transformer)
    }

    /// Fails once a pass ended inside `fit` with no pass left, or the
    /// budget of the last pass is spent
    fn check_pass_limit(&self) -> Result<(), FeaturizerError> {
        if self.pass_limit_reached || self.remaining_items == Some(0) {
            Err(FeaturizerError::PassLimitExceeded {
                limit: self.config.max_passes,
            })
        } else {
            Ok(())
        }
    }

    /// Move on after `fit` already applied its batch; never fails
    fn advance_pass(&mut self) {
        if self.pass >= self.config.max_passes {
            warn!(
                "{} wants pass {} but is limited to {}",
                self.name(),
                self.pass + 1,
                self.config.max_passes
            );
            self.pass_limit_reached = true;
        } else {
            self.start_next_pass();
        }
    }

    fn start_next_pass(&mut self) {
        self.pass += 1;
        self.remaining_items = self.config.max_training_items;
        self.accumulator.begin_pass(self.pass);
        debug!("{} starting pass {}", self.name(), self.pass);
    }

    fn finish(&mut self) -> Result<(), FeaturizerError> {
        let ctx = context!(self, TrainingState::Finished);
        self.accumulator.complete_training(&ctx)?;

        self.state = TrainingState::Finished;
        debug!("{} training finished after {} passes", self.name(), self.pass);
        Ok(())
    }

    fn require(&self, state: TrainingState, operation: &'static str) -> Result<(), FeaturizerError> {
        if self.state == state {
            Ok(())
        } else {
            Err(FeaturizerError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }
}

impl<A: Accumulator> std::fmt::Debug for Estimator<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Estimator")
            .field("name", &self.name())
            .field("state", &self.state)
            .field("column", &self.column)
            .field("pass", &self.pass)
            .finish()
    }
}
