pub mod distribution;
pub mod job;
pub mod loaders;
pub mod rubric;
pub mod settings;
pub mod student;

pub use distribution::{
    Assignment, ChunkFailure, DistributionReport, JobProgress, RepairOutcome, RepairStatus,
    StudentDistribution, StudentWarning, WarningKind,
};
pub use job::DistributionJob;
pub use loaders::{load_all_class_sheets, load_class_sheet};
pub use rubric::{PerformanceType, RubricCriterion, ScoreEntry};
pub use settings::AppSettings;
pub use student::{ClassMetadata, ClassSheet, SheetStudent, Student};
