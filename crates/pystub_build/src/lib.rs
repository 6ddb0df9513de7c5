// pystub_build - Class file introspection and Python stub synthesis
pub mod descriptor;
pub mod metadata;
pub mod pipeline;
pub mod reconcile;
pub mod stub;

pub use descriptor::{annotation_type, readable_type};
pub use metadata::{ClassRecord, ClassTable, ClassTableBuilder, IntrospectError};
pub use pipeline::{GenerationReport, UnitReport, generate};
pub use reconcile::{CollisionReconciler, CollisionRecord, ReconcileError, StubTree};
pub use stub::{INIT_FILE_NAME, StubError, StubFile, StubSynthesizer, SynthesisSummary};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Shared unit '{0}' is not part of the dependency snapshot")]
    MissingSharedUnit(String),
    #[error("Introspection failed for unit '{unit}': {source}")]
    Introspect {
        unit: String,
        #[source]
        source: IntrospectError,
    },
    #[error("Stub synthesis failed for unit '{unit}': {source}")]
    Stub {
        unit: String,
        #[source]
        source: StubError,
    },
    #[error("Collision reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),
}
