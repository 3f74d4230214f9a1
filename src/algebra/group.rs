//! Group-by with aggregation. Rows are partitioned by the raw texts of the
//! grouping columns and emitted in lexicographic order of the joined key, so
//! output is deterministic regardless of input order.

use crate::model::Cell;
use crate::model::CellKind;
use crate::model::CellValue;
use crate::model::Row;
use crate::model::Table;
use std::collections::BTreeMap;

/// Aggregation operator applied per group.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AggregateOp {
    /// Non-empty cells in the target column
    Count,
    /// Sum of cells parseable as f64; non-parseable cells are skipped
    Sum,
    /// Sum divided by the count of parseable cells
    Avg,
    Min,
    Max,
}

impl AggregateOp {
    const fn name(&self) -> &'static str {
        match self {
            Self::Count => "Count",
            Self::Sum => "Sum",
            Self::Avg => "Avg",
            Self::Min => "Min",
            Self::Max => "Max",
        }
    }
}

/// One aggregation request: operator, target column, optional output alias.
#[derive(Clone, Debug)]
pub struct Aggregation {
    pub op: AggregateOp,
    pub column: String,
    pub alias: Option<String>,
}

impl Aggregation {
    fn new(op: AggregateOp, column: &str) -> Aggregation {
        Aggregation {
            op,
            column: column.to_owned(),
            alias: None,
        }
    }

    pub fn count(column: &str) -> Aggregation {
        Self::new(AggregateOp::Count, column)
    }

    pub fn sum(column: &str) -> Aggregation {
        Self::new(AggregateOp::Sum, column)
    }

    pub fn avg(column: &str) -> Aggregation {
        Self::new(AggregateOp::Avg, column)
    }

    pub fn min(column: &str) -> Aggregation {
        Self::new(AggregateOp::Min, column)
    }

    pub fn max(column: &str) -> Aggregation {
        Self::new(AggregateOp::Max, column)
    }

    /// Overrides the default `<Op>_<Column>` output name.
    pub fn with_alias(mut self, alias: &str) -> Aggregation {
        self.alias = Some(alias.to_owned());
        self
    }

    fn output_name(&self) -> String {
        self.alias
            .to_owned()
            .unwrap_or_else(|| format!("{}_{}", self.op.name(), self.column))
    }
}

/// A table partitioned by grouping columns, awaiting aggregation.
pub struct GroupedTable<'a> {
    table: &'a Table,
    columns: Vec<String>,
}

impl Table {
    /// Partitions rows by the tuple of raw texts at `columns`. Missing
    /// columns contribute the empty string, so grouping by an unknown column
    /// produces a single group.
    pub fn group_by(&self, columns: &[&str]) -> GroupedTable<'_> {
        GroupedTable {
            table: self,
            columns: columns.iter().map(|column| (*column).to_owned()).collect(),
        }
    }
}

impl GroupedTable<'_> {
    /// Runs the aggregations over every group and emits one row per group:
    /// the group-key columns first (cells copied from the group's first row),
    /// then one cell per aggregation. Groups appear in lexicographic order of
    /// the NUL-joined key.
    pub fn aggregate(&self, aggregations: &[Aggregation]) -> Table {
        let table = self.table;
        let key_indexes: Vec<Option<usize>> = self
            .columns
            .iter()
            .map(|column| table.column_index(column))
            .collect();

        let mut groups = BTreeMap::<String, Vec<&Row>>::new();
        for row in table.rows() {
            let key = key_indexes
                .iter()
                .map(|index| index.map(|index| row.raw(index)).unwrap_or(""))
                .collect::<Vec<&str>>()
                .join("\0");
            groups.entry(key).or_default().push(row);
        }

        let mut headers: Vec<String> = self.columns.to_vec();
        let mut column_kinds: Vec<CellKind> = key_indexes
            .iter()
            .map(|index| {
                index
                    .and_then(|index| table.column_kinds().get(index).copied())
                    .unwrap_or_default()
            })
            .collect();
        for aggregation in aggregations {
            headers.push(aggregation.output_name());
            column_kinds.push(CellKind::Number);
        }

        let mut rows = Vec::<Row>::with_capacity(groups.len());
        for (group_index, members) in groups.values().enumerate() {
            let mut cells = Vec::<Cell>::with_capacity(headers.len());
            for (offset, index) in key_indexes.iter().enumerate() {
                let cell = index
                    .and_then(|index| members[0].get(index).cloned())
                    .unwrap_or_else(|| Cell::empty(group_index, offset));
                cells.push(cell);
            }
            for (offset, aggregation) in aggregations.iter().enumerate() {
                let position = (group_index, key_indexes.len() + offset);
                cells.push(apply(aggregation, table, members, position));
            }
            rows.push(Row::new(cells));
        }

        table.derived(headers, column_kinds, rows)
    }
}

/// Computes one aggregation over a group. Non-numeric data never raises:
/// unusable cells are skipped and an empty cell is produced when nothing
/// remains.
fn apply(
    aggregation: &Aggregation,
    table: &Table,
    members: &[&Row],
    position: (usize, usize),
) -> Cell {
    let (row, col) = position;
    let target = table.column_index(&aggregation.column);

    if aggregation.op == AggregateOp::Count {
        let count = members
            .iter()
            .filter(|member| {
                target
                    .and_then(|index| member.get(index))
                    .map(|cell| !cell.is_empty())
                    .unwrap_or(false)
            })
            .count();
        return number_cell(row, col, count as f64);
    }

    let values: Vec<f64> = members
        .iter()
        .filter_map(|member| target.and_then(|index| member.get(index)))
        .filter_map(Cell::to_number)
        .collect();
    if values.is_empty() {
        return Cell::empty(row, col);
    }
    let value = match aggregation.op {
        AggregateOp::Sum => values.iter().sum(),
        AggregateOp::Avg => values.iter().sum::<f64>() / values.len() as f64,
        AggregateOp::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        AggregateOp::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        AggregateOp::Count => unreachable!("count is handled above"),
    };
    number_cell(row, col, value)
}

fn number_cell(row: usize, col: usize, value: f64) -> Cell {
    Cell::new(row, col, CellValue::Number(value), value.to_string())
}
