//! FaceChart Core Library
//!
//! Clinical charting session engine for injectable treatments: the zone
//! catalog, injection points and annotations, the session store with its
//! pending-sync queue, and the coordinator that drains it.

pub mod config;
pub mod error;
pub mod model;
pub mod patients;
pub mod smoothing;
pub mod storage;
pub mod store;
pub mod sync;
pub mod tools;
pub mod zones;

pub use config::{ChartingConfig, ConfigError};
pub use error::{ChartError, ChartResult};
pub use model::{
    Dose, FreehandAnnotation, InjectionPoint, Patient, PointDraft, ProductCategory, SoapNotes,
    TreatmentPhoto, TreatmentSession,
};
pub use patients::{MemoryDirectory, PatientDirectory};
pub use smoothing::{smooth_path, smooth_points};
pub use storage::{AutoSave, FileStorage, MemoryStorage, SessionRepository, StorageError};
pub use store::ChartingStore;
pub use sync::{HttpRemote, MemoryRemote, RemoteSync, SyncCoordinator, SyncError, SyncEvent};
pub use tools::{ChartCommand, ChartMode, CommandOutcome, DrawingCapture, execute};
pub use zones::{FaceZone, ZONE_CATALOG_VERSION};
