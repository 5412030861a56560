mod analyze;
mod audit;
mod gateway;
mod inspect;

pub use analyze::{run_analyze, run_design, AnalyzeArgs, DesignArgs};
pub use audit::run_audit;
pub use gateway::{run_health, run_serve};
pub use inspect::{run_capture, run_qa, run_survey};
