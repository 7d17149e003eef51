pub mod detect;
pub mod legacy;
pub mod orchestrator;
pub mod ubl;
pub mod xml;

pub use detect::Dialect;
pub use orchestrator::{run_archive, ArchiveOutcome};

/// Thin wrapper over [`ted_core::parse_monetary_value`] for dialect parsers:
/// a malformed amount is missing data, not a fatal error, so the ambiguous-
/// or no-match case is logged and downgraded to `None` here rather than
/// propagated.
pub(crate) fn monetary_value(text: &str, field_name: &str) -> Option<f64> {
    match ted_core::parse_monetary_value(text, field_name) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(field = field_name, error = %err, "unparseable monetary value");
            None
        }
    }
}
