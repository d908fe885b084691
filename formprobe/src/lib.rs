pub mod handlers;

pub use handlers::{build_scan_options, is_authorized_target, run_scan, ScanArgs, DEMO_TARGET};
