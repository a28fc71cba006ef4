pub mod index;
pub mod loader;
pub mod record;

pub use index::{AnnotationIndex, RateConversion};
pub use loader::{load_labels, load_labels_from_reader, LoadedLabels};
pub use record::{AnnotationRecord, BoundingBox, RawAnnotation};
