//! Keys analysis.
//!
//! Canonicalizes every SQL record of a workload and accumulates the tables,
//! filter columns, grouping columns and join predicates each query uses.

pub mod analyzer;
pub mod schema;
pub mod state;

pub use analyzer::KeysAnalyzer;
pub use schema::{KeysArtifact, QueryAnalysisResult, QueryFailure};
pub use state::{DirectiveState, SqlAction};

use crate::loader::Loader;
use crate::utils::config::KeysConfig;
use crate::utils::error::LoadError;
use log::info;

/// Run the keys analyzer over a whole loader
///
/// # Arguments
/// * `loader` - Record source; closed before returning
/// * `config` - Versions used by `skip_if_below_version`
///
/// # Errors
/// * Loader failures reported by `close`
/// * `LoadError::InvalidDirective` - an illegal directive transition
///
/// # Example
/// ```ignore
/// let mut loader = open_loader(InputType::Sql, "workload.sql", &LoaderOptions::default())?;
/// let artifact = analyze_keys(loader.as_mut(), &KeysConfig::default())?;
/// ```
pub fn analyze_keys<L: Loader + ?Sized>(
    loader: &mut L,
    config: &KeysConfig,
) -> Result<KeysArtifact, LoadError> {
    let mut analyzer = KeysAnalyzer::new(config.clone());
    let mut records = 0usize;

    while let Some(record) = loader.next() {
        records += 1;
        if let Err(e) = analyzer.process(&record) {
            let _ = loader.close();
            return Err(e);
        }
    }
    loader.close()?;

    let artifact = analyzer.finish();
    info!(
        "Analyzed {} records: {} distinct queries, {} failures",
        records,
        artifact.queries.len(),
        artifact.failed.len()
    );
    Ok(artifact)
}
