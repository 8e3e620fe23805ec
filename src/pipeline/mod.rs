pub mod diagnosis; // Prompt builder + diagnostic analysis engine
pub mod dump; // Analysis dump (only when CLINSIGHT_DUMP_DIR is set)
pub mod extraction;
pub mod import;
pub mod normalize;
pub mod processor; // ingest → assess → analyze → persist
pub mod quality;
