/// Tuning options for table detection.
///
/// The defaults match common report layouts: tables at least two columns
/// wide and two data rows tall, closed by two consecutive empty rows.
#[derive(Clone, Debug)]
pub struct DetectConfig {
    /// Discard candidate rectangles narrower than this
    pub min_columns: usize,
    /// Discard candidate rectangles with fewer data rows than this
    pub min_rows: usize,
    /// Consecutive empty rows required to close a vertical band
    pub max_empty_rows: usize,
    /// Consecutive empty columns tolerated inside one rectangle; wider gaps
    /// split the band into side-by-side rectangles
    pub max_empty_cols: usize,
    /// Minimum header score to accept a header row
    pub header_density: f64,
    /// Dominant-kind fraction below which a column is demoted to Text
    pub column_consistency: f64,
    /// Copy the origin value into every cell of a merged rectangle
    pub expand_merged_cells: bool,
    /// Populate merge info on every cell of a merged rectangle
    pub track_merge_metadata: bool,
}

impl Default for DetectConfig {
    fn default() -> Self {
        DetectConfig {
            min_columns: 2,
            min_rows: 2,
            max_empty_rows: 2,
            max_empty_cols: 1,
            header_density: 0.5,
            column_consistency: 0.7,
            expand_merged_cells: true,
            track_merge_metadata: true,
        }
    }
}
