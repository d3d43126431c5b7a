//! Training Lifecycle Types

/// Lifecycle of an estimator
///
/// Transitions only move forward: `Pending -> Training -> Finished`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrainingState {
    Pending = 1,
    Training = 2,
    Finished = 3,
}

impl std::fmt::Display for TrainingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "Pending",
            Self::Training => "Training",
            Self::Finished => "Finished",
        };
        f.write_str(name)
    }
}

/// Outcome of a single fit call
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FitResult {
    /// No further data is needed
    Complete = 1,
    /// Feed the next item of the current pass
    Continue = 2,
    /// Restart iteration from the first item of the dataset
    ResetAndContinue = 3,
}
