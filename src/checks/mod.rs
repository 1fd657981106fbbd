//! Package checks. Each check is a pure function of its inputs that returns
//! diagnostics; none of them stop early or touch the filesystem beyond reads.

pub mod consistency;
pub mod links;
pub mod scripts;
pub mod security;
pub mod structure;
pub mod triggers;

pub use scripts::ScriptChecker;
pub use security::{SecurityScanner, SignatureSet};
pub use triggers::{analyze, TriggerAnalysis};
