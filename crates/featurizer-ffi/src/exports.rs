//! Exported Featurizer Instances
//!
//! Every instance gets the same set of functions, named
//! `<instance>_<operation>`. All of them return `true` on success; on
//! failure they return `false` and write an error handle to `error`.
//! A null `error` pointer makes the call fail without doing anything.

use featurizer_core::{AnnotationStore, InferenceOnly, TrainingConfig};
use featurizers::{
    hash_one_hot_vectorizer_estimator, l1_normalize_estimator, missing_dummies_estimator,
    standard_scaler_estimator, HashOneHotVectorizerTransformer, L1NormalizeTransformer,
    MissingDummiesTransformer, StandardScalerAccumulator,
};
use std::sync::Arc;

/// Each estimator created through the boundary trains alone, in column 0 of
/// its own store
fn annotation_store(config: &TrainingConfig) -> Arc<AnnotationStore> {
    Arc::new(AnnotationStore::new(config.annotation_columns))
}

macro_rules! featurizer_exports {
    (
        $instance:ident {
            accumulator: $accumulator:ty,
            create($($param:ident: $param_ty:ty),*) => $make:expr $(,)?
        }
    ) => {
        pub mod $instance {
            use super::*;
            use crate::boundary::{self, guard, FromC, IntoC};
            use featurizer_core::{Accumulator, Transformer};

            type Estimated = $accumulator;
            type Produced = <Estimated as Accumulator>::Transformer;
            type Input = <Estimated as Accumulator>::Input;
            type RawInput = <Input as FromC>::Raw;
            type Output = <<Produced as Transformer>::Output as IntoC>::C;

            /// Create an estimator and start its training
            ///
            /// # Safety
            /// `out` and `error` must be null or valid for writes.
            #[export_name = concat!(stringify!($instance), "_create_estimator")]
            pub unsafe extern "C" fn create_estimator(
                $($param: $param_ty,)*
                out: *mut u64,
                error: *mut u64,
            ) -> bool {
                guard(concat!(stringify!($instance), "_create_estimator"), error, || {
                    boundary::create_estimator::<Estimated, _>($make, out)
                })
            }

            /// # Safety
            /// `error` must be null or valid for writes.
            #[export_name = concat!(stringify!($instance), "_destroy_estimator")]
            pub unsafe extern "C" fn destroy_estimator(handle: u64, error: *mut u64) -> bool {
                guard(concat!(stringify!($instance), "_destroy_estimator"), error, || {
                    boundary::destroy::<featurizer_core::Estimator<Estimated>>(handle)
                })
            }

            /// Current training state: 1 pending, 2 training, 3 finished
            ///
            /// # Safety
            /// `state` and `error` must be null or valid for writes.
            #[export_name = concat!(stringify!($instance), "_get_state")]
            pub unsafe extern "C" fn get_state(handle: u64, state: *mut u8, error: *mut u64) -> bool {
                guard(concat!(stringify!($instance), "_get_state"), error, || {
                    boundary::get_state::<Estimated>(handle, state)
                })
            }

            /// # Safety
            /// `complete` and `error` must be null or valid for writes.
            #[export_name = concat!(stringify!($instance), "_is_training_complete")]
            pub unsafe extern "C" fn is_training_complete(
                handle: u64,
                complete: *mut bool,
                error: *mut u64,
            ) -> bool {
                guard(concat!(stringify!($instance), "_is_training_complete"), error, || {
                    boundary::is_training_complete::<Estimated>(handle, complete)
                })
            }

            /// Feed one item; writes 1 complete, 2 continue, 3 reset and continue
            ///
            /// # Safety
            /// `input` must be valid for its type; `result` and `error` must be
            /// null or valid for writes.
            #[export_name = concat!(stringify!($instance), "_fit")]
            pub unsafe extern "C" fn fit(
                handle: u64,
                input: RawInput,
                result: *mut u8,
                error: *mut u64,
            ) -> bool {
                guard(concat!(stringify!($instance), "_fit"), error, || {
                    boundary::fit::<Estimated>(handle, input, result)
                })
            }

            /// Feed a batch of items
            ///
            /// # Safety
            /// `input` must be null or valid for `items` reads; `result` and
            /// `error` must be null or valid for writes.
            #[export_name = concat!(stringify!($instance), "_fit_buffer")]
            pub unsafe extern "C" fn fit_buffer(
                handle: u64,
                input: *const RawInput,
                items: usize,
                result: *mut u8,
                error: *mut u64,
            ) -> bool {
                guard(concat!(stringify!($instance), "_fit_buffer"), error, || {
                    boundary::fit_buffer::<Estimated>(handle, input, items, result)
                })
            }

            /// Signal the end of one pass over the data
            ///
            /// # Safety
            /// `error` must be null or valid for writes.
            #[export_name = concat!(stringify!($instance), "_on_data_completed")]
            pub unsafe extern "C" fn on_data_completed(handle: u64, error: *mut u64) -> bool {
                guard(concat!(stringify!($instance), "_on_data_completed"), error, || {
                    boundary::on_data_completed::<Estimated>(handle)
                })
            }

            /// # Safety
            /// `error` must be null or valid for writes.
            #[export_name = concat!(stringify!($instance), "_complete_training")]
            pub unsafe extern "C" fn complete_training(handle: u64, error: *mut u64) -> bool {
                guard(concat!(stringify!($instance), "_complete_training"), error, || {
                    boundary::complete_training::<Estimated>(handle)
                })
            }

            /// # Safety
            /// `out` and `error` must be null or valid for writes.
            #[export_name = concat!(stringify!($instance), "_create_transformer_from_estimator")]
            pub unsafe extern "C" fn create_transformer_from_estimator(
                handle: u64,
                out: *mut u64,
                error: *mut u64,
            ) -> bool {
                guard(
                    concat!(stringify!($instance), "_create_transformer_from_estimator"),
                    error,
                    || boundary::create_transformer_from_estimator::<Estimated>(handle, out),
                )
            }

            /// # Safety
            /// `buffer` must be null or valid for `len` reads; `out` and `error`
            /// must be null or valid for writes.
            #[export_name = concat!(stringify!($instance), "_create_transformer_from_saved_data")]
            pub unsafe extern "C" fn create_transformer_from_saved_data(
                buffer: *const u8,
                len: usize,
                out: *mut u64,
                error: *mut u64,
            ) -> bool {
                guard(
                    concat!(stringify!($instance), "_create_transformer_from_saved_data"),
                    error,
                    || boundary::create_transformer_from_saved_data::<Produced>(buffer, len, out),
                )
            }

            /// Serialize a transformer; release the buffer with
            /// `featurizer_destroy_transformer_save_data`
            ///
            /// # Safety
            /// `buffer`, `len` and `error` must be null or valid for writes.
            #[export_name = concat!(stringify!($instance), "_create_transformer_save_data")]
            pub unsafe extern "C" fn create_transformer_save_data(
                handle: u64,
                buffer: *mut *mut u8,
                len: *mut usize,
                error: *mut u64,
            ) -> bool {
                guard(
                    concat!(stringify!($instance), "_create_transformer_save_data"),
                    error,
                    || boundary::create_transformer_save_data::<Produced>(handle, buffer, len),
                )
            }

            /// # Safety
            /// `input` must be valid for its type; `output` and `error` must be
            /// null or valid for writes.
            #[export_name = concat!(stringify!($instance), "_transform")]
            pub unsafe extern "C" fn transform(
                handle: u64,
                input: RawInput,
                output: *mut Output,
                error: *mut u64,
            ) -> bool {
                guard(concat!(stringify!($instance), "_transform"), error, || {
                    boundary::transform::<Produced, Input>(handle, input, output)
                })
            }

            /// Drain buffered outputs; an empty drain yields a null buffer
            ///
            /// # Safety
            /// `output`, `items` and `error` must be null or valid for writes.
            #[export_name = concat!(stringify!($instance), "_flush")]
            pub unsafe extern "C" fn flush(
                handle: u64,
                output: *mut *mut Output,
                items: *mut usize,
                error: *mut u64,
            ) -> bool {
                guard(concat!(stringify!($instance), "_flush"), error, || {
                    boundary::flush::<Produced>(handle, output, items)
                })
            }

            /// # Safety
            /// `error` must be null or valid for writes.
            #[export_name = concat!(stringify!($instance), "_destroy_transformer")]
            pub unsafe extern "C" fn destroy_transformer(handle: u64, error: *mut u64) -> bool {
                guard(concat!(stringify!($instance), "_destroy_transformer"), error, || {
                    boundary::destroy::<Produced>(handle)
                })
            }
        }
    };
}

featurizer_exports!(hash_one_hot_vectorizer_int8 {
    accumulator: InferenceOnly<HashOneHotVectorizerTransformer<i8>, i8>,
    create(seed: u32, num_columns: u32) => |config: &TrainingConfig| {
        hash_one_hot_vectorizer_estimator::<i8, i8>(
            seed, num_columns, annotation_store(config), 0, config.clone(),
        )
    },
});

featurizer_exports!(hash_one_hot_vectorizer_int32 {
    accumulator: InferenceOnly<HashOneHotVectorizerTransformer<i32>, i32>,
    create(seed: u32, num_columns: u32) => |config: &TrainingConfig| {
        hash_one_hot_vectorizer_estimator::<i32, i32>(
            seed, num_columns, annotation_store(config), 0, config.clone(),
        )
    },
});

featurizer_exports!(hash_one_hot_vectorizer_int64 {
    accumulator: InferenceOnly<HashOneHotVectorizerTransformer<i64>, i64>,
    create(seed: u32, num_columns: u32) => |config: &TrainingConfig| {
        hash_one_hot_vectorizer_estimator::<i64, i64>(
            seed, num_columns, annotation_store(config), 0, config.clone(),
        )
    },
});

featurizer_exports!(hash_one_hot_vectorizer_float64 {
    accumulator: InferenceOnly<HashOneHotVectorizerTransformer<f64>, f64>,
    create(seed: u32, num_columns: u32) => |config: &TrainingConfig| {
        hash_one_hot_vectorizer_estimator::<f64, f64>(
            seed, num_columns, annotation_store(config), 0, config.clone(),
        )
    },
});

featurizer_exports!(hash_one_hot_vectorizer_string {
    accumulator: InferenceOnly<HashOneHotVectorizerTransformer<str>, String>,
    create(seed: u32, num_columns: u32) => |config: &TrainingConfig| {
        hash_one_hot_vectorizer_estimator::<str, String>(
            seed, num_columns, annotation_store(config), 0, config.clone(),
        )
    },
});

featurizer_exports!(missing_dummies_float32 {
    accumulator: InferenceOnly<MissingDummiesTransformer<f32>, f32>,
    create() => |config: &TrainingConfig| {
        missing_dummies_estimator::<f32>(annotation_store(config), 0, config.clone())
    },
});

featurizer_exports!(missing_dummies_float64 {
    accumulator: InferenceOnly<MissingDummiesTransformer<f64>, f64>,
    create() => |config: &TrainingConfig| {
        missing_dummies_estimator::<f64>(annotation_store(config), 0, config.clone())
    },
});

featurizer_exports!(l1_normalize_int32 {
    accumulator: InferenceOnly<L1NormalizeTransformer<i32>, Vec<i32>>,
    create() => |config: &TrainingConfig| {
        l1_normalize_estimator::<i32>(annotation_store(config), 0, config.clone())
    },
});

featurizer_exports!(l1_normalize_float64 {
    accumulator: InferenceOnly<L1NormalizeTransformer<f64>, Vec<f64>>,
    create() => |config: &TrainingConfig| {
        l1_normalize_estimator::<f64>(annotation_store(config), 0, config.clone())
    },
});

featurizer_exports!(standard_scaler_float64 {
    accumulator: StandardScalerAccumulator<f64>,
    create(with_mean: bool, with_std: bool) => |config: &TrainingConfig| {
        standard_scaler_estimator::<f64>(
            with_mean, with_std, annotation_store(config), 0, config.clone(),
        )
    },
});
