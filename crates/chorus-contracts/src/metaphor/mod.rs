mod error;
mod framework;
mod registry;
mod render;
mod report;
mod suggest;

pub use error::MetaphorError;
pub use framework::{Framework, TemplateId};
pub use registry::{FrameworkRegistry, LoadMode};
pub use render::render_framework;
pub use report::{
    export_framework_report, ConceptCoverage, FrameworkOverview, FrameworkReport, FrameworkStats,
    FRAMEWORK_REPORT_FILE,
};
