pub mod error;
pub mod validation;
pub mod config;
pub mod neighborhood;
pub mod selection;
pub mod operation;
pub mod reference;
pub mod resolver;
pub mod request;
pub mod progress;
pub mod backend;
pub mod driver;

pub use error::{IterationError, OperationFailure, OperationKind, Result, Stage};
pub use config::{IterationConfig, MaskedRegistration, MetricKind, Regularization, RegularizationKind, RegistrationSettings};
pub use neighborhood::{compute_weights, compute_weights_with, GaussianDecayWeight, Neighbor, UniformWeight, WeightFunction, WeightTable};
pub use selection::{MaskedAssignment, SliceSelection, SubsetSet};
pub use operation::{AverageRequest, BlankRequest, MetricDescriptor, Operation, RegistrationRequest, SliceRequest};
pub use backend::{BatchReport, DryRunBackend, ExecutionBackend, OperationRunner, ParallelBackend, SequentialBackend};
pub use progress::{ConsoleProgressCallback, HistoryCallback, ProgressCallback, ProgressInfo, ProgressTracker};
pub use driver::{plan_iteration, DeformableIteration, IterationPlan, IterationReport};
