use crate::output::FileType;
use crate::utils::config::SCHEMA_VERSION;

/// Display version information
pub fn display_version() {
    println!("Shardlens v{}", env!("CARGO_PKG_VERSION"));
    println!("Artifact Schema: v{}", SCHEMA_VERSION);
    let kinds: Vec<&str> = [
        FileType::Keys,
        FileType::Transactions,
        FileType::DbInfo,
        FileType::Trace,
        FileType::Planalyze,
    ]
    .iter()
    .map(|k| k.as_str())
    .collect();
    println!("Artifact kinds: {}", kinds.join(", "));
    println!();
    println!("Workload analysis for sharded SQL routing layers.");
}
