use serde::Serialize;

/// Stats from a full pipeline run.
#[derive(Debug, Default, Serialize)]
pub struct PipelineStats {
    pub snapshots_read: u64,
    pub snapshots_malformed: u64,
    pub duplicates_dropped: u64,
    pub chunks_written: u64,
    pub chunk_rows_written: u64,
    pub chunk_files_reconciled: u64,
    pub rows_scanned: u64,
    pub canonical_rows: u64,
    pub labels_carried: u64,
    pub correction_sheets: u64,
    pub corrections_applied: u64,
    pub label_conflicts: u64,
    pub rows_labeled: u64,
    pub rows_relabeled: u64,
    pub duplicate_rows_filled: u64,
}

impl std::fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Pipeline Run Complete ===")?;
        writeln!(f, "Snapshots read:      {}", self.snapshots_read)?;
        writeln!(f, "Malformed filtered:  {}", self.snapshots_malformed)?;
        writeln!(f, "Duplicates dropped:  {}", self.duplicates_dropped)?;
        writeln!(f, "Chunks written:      {}", self.chunks_written)?;
        writeln!(f, "Chunk rows written:  {}", self.chunk_rows_written)?;
        writeln!(f, "\nReconciliation:")?;
        writeln!(f, "  Chunk files:       {}", self.chunk_files_reconciled)?;
        writeln!(f, "  Rows scanned:      {}", self.rows_scanned)?;
        writeln!(f, "  Canonical rows:    {}", self.canonical_rows)?;
        writeln!(f, "  Labels carried:    {}", self.labels_carried)?;
        writeln!(f, "\nLabeling:")?;
        writeln!(f, "  Correction sheets: {}", self.correction_sheets)?;
        writeln!(f, "  Corrections used:  {}", self.corrections_applied)?;
        writeln!(f, "  Conflicts:         {}", self.label_conflicts)?;
        writeln!(f, "  Rows labeled:      {}", self.rows_labeled)?;
        writeln!(f, "  Rows relabeled:    {}", self.rows_relabeled)?;
        writeln!(f, "  Duplicates filled: {}", self.duplicate_rows_filled)?;
        Ok(())
    }
}
