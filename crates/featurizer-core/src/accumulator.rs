//! Accumulator Contract

use crate::{FeaturizerError, FitResult, TrainingContext, Transformer};
use std::marker::PhantomData;

/// Training-time state of one featurizer
///
/// The estimator owns the lifecycle; an accumulator only sees data and
/// answers questions about it. `fit` must either fully apply a batch or
/// leave the accumulator untouched.
pub trait Accumulator: Send {
    type Input;
    type Transformer: Transformer;

    /// Name used for logging and as the annotation key this accumulator
    /// publishes under
    fn name(&self) -> &'static str;

    /// Called once when training starts, before any data
    fn begin_training(&mut self, _ctx: &TrainingContext<'_>) -> Result<(), FeaturizerError> {
        Ok(())
    }

    fn fit(
        &mut self,
        items: &[Self::Input],
        ctx: &TrainingContext<'_>,
    ) -> Result<FitResult, FeaturizerError>;

    /// Whether the data seen so far requires another full pass
    fn needs_another_pass(&self) -> bool {
        false
    }

    /// Called when the estimator moves on to `pass`
    fn begin_pass(&mut self, _pass: u32) {}

    /// Finalize parameters; publishing annotations is allowed here
    fn complete_training(&mut self, _ctx: &TrainingContext<'_>) -> Result<(), FeaturizerError> {
        Ok(())
    }

    fn create_transformer(&self) -> Result<Self::Transformer, FeaturizerError>;
}

/// Accumulator for featurizers whose transformer is fully determined by
/// construction parameters
///
/// Needs no data: the first `fit` completes training, and every transformer
/// is a copy of the prototype.
pub struct InferenceOnly<T, In> {
    name: &'static str,
    prototype: T,
    _input: PhantomData<fn(In)>,
}

impl<T, In> InferenceOnly<T, In> {
    pub fn new(name: &'static str, prototype: T) -> Self {
        Self {
            name,
            prototype,
            _input: PhantomData,
        }
    }

    pub fn prototype(&self) -> &T {
        &self.prototype
    }
}

impl<T, In> Accumulator for InferenceOnly<T, In>
where
    T: Transformer + Clone,
{
    type Input = In;
    type Transformer = T;

    fn name(&self) -> &'static str {
        self.name
    }

    fn fit(&mut self, _items: &[In], _ctx: &TrainingContext<'_>) -> Result<FitResult, FeaturizerError> {
        Ok(FitResult::Complete)
    }

    fn create_transformer(&self) -> Result<T, FeaturizerError> {
        Ok(self.prototype.clone())
    }
}
