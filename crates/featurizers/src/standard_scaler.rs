//! Standard Scaler
//!
//! Two-pass estimator: the first pass accumulates the mean, the second the
//! squared deviations from it. On completion the statistics are published
//! as an annotation; a later scaler on the same column picks them up and
//! finishes without data.

use featurizer_core::{
    Accumulator, AnnotationStore, ArchiveFormat, ArchiveReader, ArchiveWriter, Estimator,
    FeaturizerError, FitResult, Numeric, TrainingConfig, TrainingContext, Transformer,
};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

pub const STANDARD_SCALER: &str = "StandardScaler";

/// Population statistics of one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingStatistics {
    pub count: u64,
    pub mean: f64,
    pub std_dev: f64,
}

/// Training state of the scaler
pub struct StandardScalerAccumulator<T> {
    with_mean: bool,
    with_std: bool,
    pass: u32,
    count: u64,
    sum: f64,
    mean: f64,
    deviation_count: u64,
    squared_deviations: f64,
    /// Statistics published by an earlier scaler on the same column
    upstream: Option<ScalingStatistics>,
    statistics: Option<ScalingStatistics>,
    _input: PhantomData<fn(&T)>,
}

impl<T> StandardScalerAccumulator<T> {
    pub fn new(with_mean: bool, with_std: bool) -> Self {
        Self {
            with_mean,
            with_std,
            pass: 1,
            count: 0,
            sum: 0.0,
            mean: 0.0,
            deviation_count: 0,
            squared_deviations: 0.0,
            upstream: None,
            statistics: None,
            _input: PhantomData,
        }
    }

    /// Final statistics, once training has completed
    pub fn statistics(&self) -> Option<ScalingStatistics> {
        self.statistics
    }
}

impl<T: Numeric> Accumulator for StandardScalerAccumulator<T> {
    type Input = T;
    type Transformer = StandardScalerTransformer<T>;

    fn name(&self) -> &'static str {
        STANDARD_SCALER
    }

    fn begin_training(&mut self, ctx: &TrainingContext<'_>) -> Result<(), FeaturizerError> {
        self.upstream = ctx.read::<ScalingStatistics>(STANDARD_SCALER)?.map(|stats| *stats);
        if let Some(stats) = self.upstream {
            debug!(
                "StandardScaler column {} reusing published statistics (count={})",
                ctx.column(),
                stats.count
            );
        }
        Ok(())
    }

    fn fit(&mut self, items: &[T], _ctx: &TrainingContext<'_>) -> Result<FitResult, FeaturizerError> {
        if self.upstream.is_some() {
            return Ok(FitResult::Complete);
        }

        let values: Vec<f64> = items.iter().map(|v| v.to_f64()).collect();
        if let Some(position) = values.iter().position(|v| v.is_nan()) {
            return Err(FeaturizerError::InvalidArgument(format!(
                "StandardScaler: item {} of the batch is null",
                position
            )));
        }

        if self.pass == 1 {
            self.count += values.len() as u64;
            self.sum += values.iter().sum::<f64>();
        } else {
            self.deviation_count += values.len() as u64;
            self.squared_deviations += values
                .iter()
                .map(|v| (v - self.mean) * (v - self.mean))
                .sum::<f64>();
        }
        Ok(FitResult::Continue)
    }

    fn needs_another_pass(&self) -> bool {
        self.pass == 1 && self.count > 0 && self.upstream.is_none()
    }

    fn begin_pass(&mut self, pass: u32) {
        self.pass = pass;
        if pass == 2 {
            self.mean = self.sum / self.count as f64;
        }
    }

    fn complete_training(&mut self, ctx: &TrainingContext<'_>) -> Result<(), FeaturizerError> {
        if let Some(stats) = self.upstream {
            self.statistics = Some(stats);
            return Ok(());
        }

        if self.count == 0 {
            // Forced completion before any data; a producer may have published since
            return match ctx.read::<ScalingStatistics>(STANDARD_SCALER)? {
                Some(stats) => {
                    self.statistics = Some(*stats);
                    Ok(())
                }
                None => Err(FeaturizerError::invalid_argument(
                    "StandardScaler: no training data and no published statistics",
                )),
            };
        }

        if self.deviation_count == 0 {
            return Err(FeaturizerError::invalid_argument(
                "StandardScaler: training ended before the deviation pass",
            ));
        }

        let stats = ScalingStatistics {
            count: self.count,
            mean: self.mean,
            std_dev: (self.squared_deviations / self.deviation_count as f64).sqrt(),
        };
        ctx.publish(stats)?;
        self.statistics = Some(stats);
        Ok(())
    }

    fn create_transformer(&self) -> Result<StandardScalerTransformer<T>, FeaturizerError> {
        let stats = self.statistics.ok_or_else(|| {
            FeaturizerError::Internal("StandardScaler finished without statistics".to_string())
        })?;
        Ok(StandardScalerTransformer::new(stats, self.with_mean, self.with_std))
    }
}

/// Centers and scales values with fixed statistics
pub struct StandardScalerTransformer<T> {
    statistics: ScalingStatistics,
    with_mean: bool,
    with_std: bool,
    _input: PhantomData<fn(&T)>,
}

impl<T> StandardScalerTransformer<T> {
    pub fn new(statistics: ScalingStatistics, with_mean: bool, with_std: bool) -> Self {
        Self {
            statistics,
            with_mean,
            with_std,
            _input: PhantomData,
        }
    }

    pub fn statistics(&self) -> &ScalingStatistics {
        &self.statistics
    }

    fn center(&self) -> f64 {
        if self.with_mean {
            self.statistics.mean
        } else {
            0.0
        }
    }

    fn scale(&self) -> f64 {
        if self.with_std && self.statistics.std_dev != 0.0 {
            self.statistics.std_dev
        } else {
            1.0
        }
    }
}

impl<T> Clone for StandardScalerTransformer<T> {
    fn clone(&self) -> Self {
        Self::new(self.statistics, self.with_mean, self.with_std)
    }
}

impl<T> PartialEq for StandardScalerTransformer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.statistics == other.statistics
            && self.with_mean == other.with_mean
            && self.with_std == other.with_std
    }
}

impl<T> std::fmt::Debug for StandardScalerTransformer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardScalerTransformer")
            .field("statistics", &self.statistics)
            .field("with_mean", &self.with_mean)
            .field("with_std", &self.with_std)
            .finish()
    }
}

impl<T: Numeric> Transformer for StandardScalerTransformer<T> {
    type Input = T;
    type Output = f64;

    const FORMAT: ArchiveFormat = ArchiveFormat::new(0x0004, 1, 0);

    fn execute(&mut self, input: &T) -> Result<f64, FeaturizerError> {
        Ok((input.to_f64() - self.center()) / self.scale())
    }

    fn save_fields(&self, writer: &mut ArchiveWriter) -> Result<(), FeaturizerError> {
        writer
            .write_record(&self.statistics)?
            .write_bool(self.with_mean)
            .write_bool(self.with_std);
        Ok(())
    }

    fn load_fields(reader: &mut ArchiveReader<'_>) -> Result<Self, FeaturizerError> {
        let statistics = reader.read_record::<ScalingStatistics>()?;
        let with_mean = reader.read_bool()?;
        let with_std = reader.read_bool()?;
        Ok(Self::new(statistics, with_mean, with_std))
    }
}

pub type StandardScalerEstimator<T> = Estimator<StandardScalerAccumulator<T>>;

pub fn standard_scaler_estimator<T: Numeric>(
    with_mean: bool,
    with_std: bool,
    annotations: Arc<AnnotationStore>,
    column: usize,
    config: TrainingConfig,
) -> Result<StandardScalerEstimator<T>, FeaturizerError> {
    Estimator::with_config(
        StandardScalerAccumulator::new(with_mean, with_std),
        annotations,
        column,
        config,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use featurizer_core::{ErrorKind, TrainingState};
    use proptest::prelude::*;

    const DATA: [f64; 4] = [1.0, 3.0, 5.0, 7.0];

    fn scaler(annotations: &Arc<AnnotationStore>) -> StandardScalerEstimator<f64> {
        standard_scaler_estimator(true, true, Arc::clone(annotations), 0, TrainingConfig::default())
            .unwrap()
    }

    fn train(estimator: &mut StandardScalerEstimator<f64>, data: &[f64]) {
        estimator.begin_training().unwrap();
        while !estimator.is_training_complete() {
            for value in data {
                if estimator.fit(value).unwrap() != FitResult::Continue {
                    break;
                }
            }
            estimator.on_data_completed().unwrap();
        }
    }

    #[test]
    fn test_two_pass_training() {
        let annotations = Arc::new(AnnotationStore::default());
        let mut estimator = scaler(&annotations);
        estimator.begin_training().unwrap();

        estimator.fit_batch(&DATA).unwrap();
        estimator.on_data_completed().unwrap();
        assert_eq!(estimator.get_state(), TrainingState::Training);
        assert_eq!(estimator.pass(), 2);

        estimator.fit_batch(&DATA).unwrap();
        estimator.on_data_completed().unwrap();
        assert!(estimator.is_training_complete());

        let stats = estimator.accumulator().statistics().unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 4.0);
        assert!((stats.std_dev - 5.0f64.sqrt()).abs() < 1e-12);

        let mut transformer = estimator.create_transformer().unwrap();
        assert_eq!(transformer.execute(&4.0).unwrap(), 0.0);
        assert!((transformer.execute(&(4.0 + 5.0f64.sqrt())).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_statistics_published_on_finish() {
        let annotations = Arc::new(AnnotationStore::default());
        let mut estimator = scaler(&annotations);
        train(&mut estimator, &DATA);

        let published = annotations
            .read::<ScalingStatistics>(0, STANDARD_SCALER)
            .unwrap()
            .unwrap();
        assert_eq!(Some(*published), estimator.accumulator().statistics());
    }

    #[test]
    fn test_downstream_scaler_reuses_statistics() {
        let annotations = Arc::new(AnnotationStore::default());
        let mut producer = scaler(&annotations);
        train(&mut producer, &DATA);

        let mut consumer = scaler(&annotations);
        consumer.begin_training().unwrap();
        assert_eq!(consumer.fit(&100.0).unwrap(), FitResult::Complete);
        assert_eq!(
            consumer.create_transformer().unwrap(),
            producer.create_transformer().unwrap()
        );
    }

    #[test]
    fn test_constant_column_only_centers() {
        let annotations = Arc::new(AnnotationStore::default());
        let mut estimator = scaler(&annotations);
        train(&mut estimator, &[2.0, 2.0, 2.0]);

        let mut transformer = estimator.create_transformer().unwrap();
        assert_eq!(transformer.statistics().std_dev, 0.0);
        assert_eq!(transformer.execute(&5.0).unwrap(), 3.0);
    }

    #[test]
    fn test_without_mean_or_std() {
        let stats = ScalingStatistics {
            count: 4,
            mean: 4.0,
            std_dev: 2.0,
        };
        let mut no_mean = StandardScalerTransformer::<f64>::new(stats, false, true);
        let mut no_std = StandardScalerTransformer::<f64>::new(stats, true, false);
        assert_eq!(no_mean.execute(&8.0).unwrap(), 4.0);
        assert_eq!(no_std.execute(&8.0).unwrap(), 4.0);
    }

    #[test]
    fn test_null_batch_rejected_without_mutation() {
        let annotations = Arc::new(AnnotationStore::default());
        let mut estimator = scaler(&annotations);
        estimator.begin_training().unwrap();
        estimator.fit_batch(&[1.0, 2.0]).unwrap();

        let err = estimator.fit_batch(&[3.0, f64::NAN]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(estimator.accumulator().count, 2);
        assert_eq!(estimator.accumulator().sum, 3.0);
    }

    #[test]
    fn test_single_pass_limit_fails() {
        let annotations = Arc::new(AnnotationStore::default());
        let config = TrainingConfig::default().with_max_passes(1);
        let mut estimator =
            standard_scaler_estimator::<f64>(true, true, annotations, 0, config).unwrap();
        estimator.begin_training().unwrap();
        estimator.fit_batch(&DATA).unwrap();

        let err = estimator.on_data_completed().unwrap_err();
        assert_eq!(err, FeaturizerError::PassLimitExceeded { limit: 1 });
    }

    #[test]
    fn test_forced_completion_without_data_fails() {
        let annotations = Arc::new(AnnotationStore::default());
        let mut estimator = scaler(&annotations);
        let err = estimator.complete_training().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(estimator.get_state(), TrainingState::Pending);
    }

    #[test]
    fn test_forced_completion_in_first_pass_fails() {
        let annotations = Arc::new(AnnotationStore::default());
        let mut estimator = scaler(&annotations);
        estimator.begin_training().unwrap();
        estimator.fit_batch(&DATA).unwrap();
        assert!(estimator.complete_training().is_err());
        assert_eq!(estimator.get_state(), TrainingState::Training);
    }

    #[test]
    fn test_saved_data_round_trip() {
        let annotations = Arc::new(AnnotationStore::default());
        let mut estimator = scaler(&annotations);
        train(&mut estimator, &DATA);

        let mut original = estimator.create_transformer().unwrap();
        let bytes = original.to_bytes().unwrap();
        let mut restored = StandardScalerTransformer::<f64>::from_bytes(&bytes).unwrap();
        assert_eq!(restored, original);
        assert_eq!(restored.execute(&9.5).unwrap(), original.execute(&9.5).unwrap());
    }

    proptest! {
        #[test]
        fn prop_transform_survives_round_trip(
            data in proptest::collection::vec(-1.0e6f64..1.0e6, 1..32),
            probe in -1.0e6f64..1.0e6,
        ) {
            let annotations = Arc::new(AnnotationStore::default());
            let mut estimator = scaler(&annotations);
            train(&mut estimator, &data);

            let mut original = estimator.create_transformer().unwrap();
            let mut restored = StandardScalerTransformer::<f64>::from_bytes(&original.to_bytes().unwrap()).unwrap();
            prop_assert_eq!(restored.execute(&probe).unwrap(), original.execute(&probe).unwrap());
        }
    }
}
