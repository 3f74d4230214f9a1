use crate::model::cell::Cell;
use crate::model::cell::CellKind;
use crate::model::table::Table;

/// Summary statistics for a numeric column.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub mean: f64,
}

/// Per-column profile computed by [`Table::analyze_columns`].
#[derive(Clone, Debug)]
pub struct ColumnStats {
    pub name: String,
    /// Most frequent non-empty kind; ties resolve Text > Number > Date > Bool
    pub inferred: CellKind,
    pub total: usize,
    pub empty: usize,
    /// Distinct raw lexemes among non-empty cells
    pub unique: usize,
    pub text: usize,
    pub number: usize,
    pub date: usize,
    pub boolean: usize,
    pub formula: usize,
    /// Up to five raw strings, in order of first occurrence
    pub samples: Vec<String>,
    /// Present when the column's non-empty cells are majority Number
    pub numeric: Option<NumericStats>,
}

const SAMPLE_LIMIT: usize = 5;

/// Kind a cell contributes to the per-column tally. A formula with a cached
/// numeric value counts as a number, so computed columns infer to Number.
fn effective_kind(cell: &Cell) -> CellKind {
    match cell.kind() {
        CellKind::Formula if cell.value.as_f64().is_some() => CellKind::Number,
        kind => kind,
    }
}

impl Table {
    /// Profiles every column: kind counts, distinct values, first-seen
    /// samples, and numeric summaries for majority-Number columns. The table
    /// itself is left untouched.
    pub fn analyze_columns(&self) -> Vec<ColumnStats> {
        self.headers()
            .iter()
            .enumerate()
            .map(|(column, name)| self.analyze_column(column, name))
            .collect()
    }

    fn analyze_column(&self, column: usize, name: &str) -> ColumnStats {
        let mut stats = ColumnStats {
            name: name.to_owned(),
            inferred: CellKind::Empty,
            total: self.row_count(),
            empty: 0,
            unique: 0,
            text: 0,
            number: 0,
            date: 0,
            boolean: 0,
            formula: 0,
            samples: Vec::new(),
            numeric: None,
        };

        let mut seen = std::collections::HashSet::<&str>::new();
        let mut values = Vec::<f64>::new();
        for row in self.rows() {
            let cell = match row.get(column) {
                Some(cell) if !cell.is_empty() => cell,
                _ => {
                    stats.empty += 1;
                    continue;
                }
            };
            match effective_kind(cell) {
                CellKind::Text => stats.text += 1,
                CellKind::Number => {
                    stats.number += 1;
                    if let Some(value) = cell.value.as_f64() {
                        values.push(value);
                    }
                }
                CellKind::Date => stats.date += 1,
                CellKind::Bool => stats.boolean += 1,
                CellKind::Formula => stats.formula += 1,
                CellKind::Empty => unreachable!("empty cells are counted above"),
            }
            if seen.insert(cell.raw.as_str()) {
                stats.unique += 1;
                if stats.samples.len() < SAMPLE_LIMIT {
                    stats.samples.push(cell.raw.to_owned());
                }
            }
        }

        let filled = stats.total - stats.empty;
        stats.inferred = infer_kind(&stats);
        if filled > 0 && stats.number * 2 > filled && !values.is_empty() {
            let sum: f64 = values.iter().sum();
            stats.numeric = Some(NumericStats {
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                sum,
                mean: sum / values.len() as f64,
            });
        }
        stats
    }
}

fn infer_kind(stats: &ColumnStats) -> CellKind {
    // Tie-break order: Text > Number > Date > Bool > Formula
    let counts = [
        (CellKind::Text, stats.text),
        (CellKind::Number, stats.number),
        (CellKind::Date, stats.date),
        (CellKind::Bool, stats.boolean),
        (CellKind::Formula, stats.formula),
    ];
    let mut best = (CellKind::Empty, 0usize);
    for (kind, count) in counts {
        if count > best.1 {
            best = (kind, count);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cell::CellValue;
    use crate::model::table::Row;

    fn number_cell(row: usize, col: usize, value: f64) -> Cell {
        Cell::new(row, col, CellValue::Number(value), value.to_string())
    }

    fn text_cell(row: usize, col: usize, text: &str) -> Cell {
        Cell::new(row, col, CellValue::Text(text.to_owned()), text.to_owned())
    }

    fn table_of(rows: Vec<Row>) -> Table {
        Table::new(
            "T".to_owned(),
            "S".to_owned(),
            0,
            0,
            rows.len(),
            0,
            0,
            vec!["A".to_owned()],
            vec![CellKind::Text],
            rows,
        )
    }

    #[test]
    fn numeric_column_gets_summary() {
        let table = table_of(vec![
            Row::new(vec![number_cell(1, 0, 2.0)]),
            Row::new(vec![number_cell(2, 0, 4.0)]),
            Row::new(vec![number_cell(3, 0, 6.0)]),
        ]);
        let stats = &table.analyze_columns()[0];
        assert_eq!(stats.inferred, CellKind::Number);
        assert_eq!(stats.unique, 3);
        let numeric = stats.numeric.expect("majority number column");
        assert_eq!(numeric.min, 2.0);
        assert_eq!(numeric.max, 6.0);
        assert_eq!(numeric.sum, 12.0);
        assert_eq!(numeric.mean, 4.0);
    }

    #[test]
    fn tie_breaks_to_text() {
        let table = table_of(vec![
            Row::new(vec![text_cell(1, 0, "a")]),
            Row::new(vec![number_cell(2, 0, 1.0)]),
        ]);
        assert_eq!(table.analyze_columns()[0].inferred, CellKind::Text);
    }

    #[test]
    fn all_empty_column_is_empty_kind() {
        let table = table_of(vec![
            Row::new(vec![Cell::empty(1, 0)]),
            Row::new(vec![Cell::empty(2, 0)]),
        ]);
        let stats = &table.analyze_columns()[0];
        assert_eq!(stats.inferred, CellKind::Empty);
        assert_eq!(stats.empty, 2);
        assert!(stats.samples.is_empty());
        assert!(stats.numeric.is_none());
    }

    #[test]
    fn formula_with_cached_number_counts_as_number() {
        let formula = Cell::new(
            1,
            0,
            CellValue::Formula {
                source: "B2*C2".to_owned(),
                cached: Box::new(CellValue::Number(8.0)),
            },
            "8".to_owned(),
        );
        let table = table_of(vec![
            Row::new(vec![formula]),
            Row::new(vec![number_cell(2, 0, 3.0)]),
        ]);
        let stats = &table.analyze_columns()[0];
        assert_eq!(stats.inferred, CellKind::Number);
        assert_eq!(stats.formula, 0);
        assert_eq!(stats.number, 2);
    }

    #[test]
    fn samples_keep_first_occurrence_order() {
        let table = table_of(vec![
            Row::new(vec![text_cell(1, 0, "b")]),
            Row::new(vec![text_cell(2, 0, "a")]),
            Row::new(vec![text_cell(3, 0, "b")]),
        ]);
        let stats = &table.analyze_columns()[0];
        assert_eq!(stats.samples, vec!["b".to_owned(), "a".to_owned()]);
        assert_eq!(stats.unique, 2);
    }
}
