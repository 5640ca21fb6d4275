pub mod fingerprint_base;
pub mod angle;
pub mod template;

pub use fingerprint_base::{Minutia, MinutiaType, Point, PointF, MAX_COORDINATE};
pub use template::{MinutiaRecord, TemplateError};
