//! # Schema validation
//!
//! Matches a workbook's detected shape against a user-declared template:
//! required sheets, per-sheet column lists with expected kinds, row-count
//! bounds, and custom predicates. Validation is read-only and reports every
//! issue it finds rather than stopping at the first.

use crate::error::SheetScanError;
use crate::model::CellKind;
use crate::model::Sheet;
use crate::model::Table;
use crate::model::Workbook;
use std::collections::HashMap;
use thiserror::Error;

/// How strictly a column's cells must match the expected kind.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TypeStrictness {
    /// At least half of the non-empty cells match
    Lenient,
    /// At least 80% of the non-empty cells match
    #[default]
    Moderate,
    /// Every non-empty cell matches
    Strict,
}

impl TypeStrictness {
    pub fn threshold(&self) -> f64 {
        match self {
            Self::Lenient => 0.5,
            Self::Moderate => 0.8,
            Self::Strict => 1.0,
        }
    }
}

/// One expected column: its name and, optionally, the kind its cells must
/// have.
#[derive(Clone, Debug)]
pub struct ColumnSchema {
    pub name: String,
    pub kind: Option<CellKind>,
}

impl ColumnSchema {
    pub fn named(name: &str) -> ColumnSchema {
        ColumnSchema {
            name: name.to_owned(),
            kind: None,
        }
    }

    pub fn of_kind(name: &str, kind: CellKind) -> ColumnSchema {
        ColumnSchema {
            name: name.to_owned(),
            kind: Some(kind),
        }
    }
}

/// A named predicate evaluated against the sheet's table.
#[derive(Copy, Clone, Debug)]
pub struct CustomCheck {
    pub name: &'static str,
    pub check: fn(&Table) -> bool,
}

/// Expectations for one sheet, applied to its first detected table.
#[derive(Clone, Debug, Default)]
pub struct SheetSchema {
    /// Required columns, in the order they must appear
    pub columns: Vec<ColumnSchema>,
    pub min_rows: Option<usize>,
    pub max_rows: Option<usize>,
    /// Reject columns that are not part of the schema
    pub strict_columns: bool,
    pub strictness: TypeStrictness,
    pub checks: Vec<CustomCheck>,
}

/// Workbook-level expectations: which sheets must exist and, optionally,
/// which are allowed to.
#[derive(Clone, Debug, Default)]
pub struct WorkbookTemplate {
    pub required_sheets: Vec<String>,
    /// Reject sheets that are neither required nor covered by a schema
    pub strict_sheets: bool,
    /// Per-sheet schemas, keyed by sheet name
    pub schemas: HashMap<String, SheetSchema>,
}

/// One validation finding. Issues carry enough location data to be acted on.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum ValidationIssue {
    #[error("Required sheet '{sheet}' is missing")]
    MissingSheet { sheet: String },

    #[error("Sheet '{sheet}' is not allowed by the template")]
    UnexpectedSheet { sheet: String },

    #[error("Sheet '{sheet}' has no detected table")]
    MissingTable { sheet: String },

    #[error("Sheet '{sheet}': required column '{column}' is missing")]
    MissingColumn { sheet: String, column: String },

    #[error("Sheet '{sheet}': column '{column}' is not allowed by the schema")]
    UnexpectedColumn { sheet: String, column: String },

    #[error("Sheet '{sheet}': column '{column}' is out of order")]
    ColumnOrder { sheet: String, column: String },

    #[error("Sheet '{sheet}': column '{column}' expected kind {expected}, only {fraction:.2} of cells match")]
    ColumnKind {
        sheet: String,
        column: String,
        expected: CellKind,
        fraction: f64,
    },

    #[error("Sheet '{sheet}': {actual} row(s) outside the allowed range")]
    RowCount {
        sheet: String,
        actual: usize,
        min: Option<usize>,
        max: Option<usize>,
    },

    #[error("Sheet '{sheet}': {actual} column(s), at least {minimum} required")]
    ColumnCount {
        sheet: String,
        actual: usize,
        minimum: usize,
    },

    #[error("Sheet '{sheet}': custom check '{check}' failed")]
    CustomCheckFailed { sheet: String, check: String },
}

/// Walks the workbook against the template and collects every issue.
pub fn validate_workbook(workbook: &Workbook, template: &WorkbookTemplate) -> Vec<ValidationIssue> {
    let mut issues = Vec::<ValidationIssue>::new();

    for required in &template.required_sheets {
        if workbook.sheet(required).is_none() {
            issues.push(ValidationIssue::MissingSheet {
                sheet: required.to_owned(),
            });
        }
    }
    if template.strict_sheets {
        for sheet in &workbook.sheets {
            let allowed = template.required_sheets.contains(&sheet.name)
                || template.schemas.contains_key(&sheet.name);
            if !allowed {
                issues.push(ValidationIssue::UnexpectedSheet {
                    sheet: sheet.name.to_owned(),
                });
            }
        }
    }

    // Walk sheets in document order so output is deterministic
    for sheet in &workbook.sheets {
        if let Some(schema) = template.schemas.get(&sheet.name) {
            validate_sheet(sheet, schema, &mut issues);
        }
    }
    issues
}

/// Validates and converts any findings into the `ValidationFailed` error.
pub fn ensure_valid(workbook: &Workbook, template: &WorkbookTemplate) -> Result<(), SheetScanError> {
    let issues = validate_workbook(workbook, template);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(SheetScanError::ValidationFailed(issues.len()))
    }
}

fn validate_sheet(sheet: &Sheet, schema: &SheetSchema, issues: &mut Vec<ValidationIssue>) {
    let table = match sheet.tables.first() {
        Some(table) => table,
        None => {
            issues.push(ValidationIssue::MissingTable {
                sheet: sheet.name.to_owned(),
            });
            return;
        }
    };

    if table.column_count() < schema.columns.len() {
        issues.push(ValidationIssue::ColumnCount {
            sheet: sheet.name.to_owned(),
            actual: table.column_count(),
            minimum: schema.columns.len(),
        });
    }

    // Required columns must exist, keep their relative order, and match the
    // expected kind at the schema's strictness level
    let mut last_position = None::<usize>;
    for column in &schema.columns {
        let position = match table.column_index(&column.name) {
            Some(position) => position,
            None => {
                issues.push(ValidationIssue::MissingColumn {
                    sheet: sheet.name.to_owned(),
                    column: column.name.to_owned(),
                });
                continue;
            }
        };
        if last_position.map(|last| position < last).unwrap_or(false) {
            issues.push(ValidationIssue::ColumnOrder {
                sheet: sheet.name.to_owned(),
                column: column.name.to_owned(),
            });
        }
        last_position = Some(position);

        if let Some(expected) = column.kind {
            if let Some(fraction) = kind_fraction(table, position, expected) {
                if fraction < schema.strictness.threshold() {
                    issues.push(ValidationIssue::ColumnKind {
                        sheet: sheet.name.to_owned(),
                        column: column.name.to_owned(),
                        expected,
                        fraction,
                    });
                }
            }
        }
    }

    if schema.strict_columns {
        for header in table.headers() {
            if !schema.columns.iter().any(|column| &column.name == header) {
                issues.push(ValidationIssue::UnexpectedColumn {
                    sheet: sheet.name.to_owned(),
                    column: header.to_owned(),
                });
            }
        }
    }

    let rows = table.row_count();
    let below = schema.min_rows.map(|min| rows < min).unwrap_or(false);
    let above = schema.max_rows.map(|max| rows > max).unwrap_or(false);
    if below || above {
        issues.push(ValidationIssue::RowCount {
            sheet: sheet.name.to_owned(),
            actual: rows,
            min: schema.min_rows,
            max: schema.max_rows,
        });
    }

    for check in &schema.checks {
        if !(check.check)(table) {
            issues.push(ValidationIssue::CustomCheckFailed {
                sheet: sheet.name.to_owned(),
                check: check.name.to_owned(),
            });
        }
    }
}

/// Fraction of a column's non-empty cells whose kind equals `expected`.
/// None when the column has no non-empty cells, which counts as a match.
fn kind_fraction(table: &Table, column: usize, expected: CellKind) -> Option<f64> {
    let mut filled = 0usize;
    let mut matching = 0usize;
    for row in table.rows() {
        if let Some(cell) = row.get(column) {
            if !cell.is_empty() {
                filled += 1;
                if cell.kind() == expected {
                    matching += 1;
                }
            }
        }
    }
    if filled == 0 {
        None
    } else {
        Some(matching as f64 / filled as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Cell;
    use crate::model::CellValue;
    use crate::model::Row;
    use std::path::PathBuf;

    fn cell(row: usize, col: usize, value: CellValue, raw: &str) -> Cell {
        Cell::new(row, col, value, raw.to_owned())
    }

    fn orders_table() -> Table {
        Table::new(
            "Orders_Table1".to_owned(),
            "Orders".to_owned(),
            0,
            0,
            3,
            0,
            1,
            vec!["ID".to_owned(), "Amount".to_owned()],
            vec![CellKind::Number, CellKind::Number],
            vec![
                Row::new(vec![
                    cell(1, 0, CellValue::Number(1.0), "1"),
                    cell(1, 1, CellValue::Number(10.0), "10"),
                ]),
                Row::new(vec![
                    cell(2, 0, CellValue::Number(2.0), "2"),
                    cell(2, 1, CellValue::Text("n/a".to_owned()), "n/a"),
                ]),
            ],
        )
    }

    fn workbook() -> Workbook {
        Workbook {
            source_path: PathBuf::from("orders.xlsx"),
            sheets: vec![Sheet {
                name: "Orders".to_owned(),
                index: 0,
                tables: vec![orders_table()],
                warnings: Vec::new(),
            }],
        }
    }

    fn schema() -> SheetSchema {
        SheetSchema {
            columns: vec![
                ColumnSchema::of_kind("ID", CellKind::Number),
                ColumnSchema::of_kind("Amount", CellKind::Number),
            ],
            ..SheetSchema::default()
        }
    }

    fn template(schema: SheetSchema) -> WorkbookTemplate {
        WorkbookTemplate {
            required_sheets: vec!["Orders".to_owned()],
            strict_sheets: false,
            schemas: HashMap::from([("Orders".to_owned(), schema)]),
        }
    }

    #[test]
    fn missing_sheet_is_reported() {
        let workbook = Workbook {
            source_path: PathBuf::from("empty.xlsx"),
            sheets: Vec::new(),
        };
        let issues = validate_workbook(&workbook, &template(schema()));
        assert_eq!(
            issues,
            vec![ValidationIssue::MissingSheet {
                sheet: "Orders".to_owned()
            }]
        );
    }

    #[test]
    fn moderate_strictness_rejects_half_matching_column() {
        // Amount is 1 number out of 2 non-empty cells: 0.5 < 0.8
        let issues = validate_workbook(&workbook(), &template(schema()));
        assert_eq!(issues.len(), 1);
        assert!(matches!(
            issues[0],
            ValidationIssue::ColumnKind { ref column, .. } if column == "Amount"
        ));
    }

    #[test]
    fn lenient_strictness_accepts_it() {
        let schema = SheetSchema {
            strictness: TypeStrictness::Lenient,
            ..schema()
        };
        assert!(validate_workbook(&workbook(), &template(schema)).is_empty());
    }

    #[test]
    fn row_bounds_and_missing_columns() {
        let schema = SheetSchema {
            columns: vec![ColumnSchema::named("ID"), ColumnSchema::named("Ghost")],
            min_rows: Some(5),
            ..SheetSchema::default()
        };
        let issues = validate_workbook(&workbook(), &template(schema));
        assert!(issues.contains(&ValidationIssue::MissingColumn {
            sheet: "Orders".to_owned(),
            column: "Ghost".to_owned(),
        }));
        assert!(issues.iter().any(|issue| matches!(issue, ValidationIssue::RowCount { actual: 2, .. })));
    }

    #[test]
    fn column_order_violation() {
        let schema = SheetSchema {
            columns: vec![ColumnSchema::named("Amount"), ColumnSchema::named("ID")],
            ..SheetSchema::default()
        };
        let issues = validate_workbook(&workbook(), &template(schema));
        assert!(issues.iter().any(|issue| matches!(
            issue,
            ValidationIssue::ColumnOrder { ref column, .. } if column == "ID"
        )));
    }

    #[test]
    fn strict_columns_flags_extras() {
        let schema = SheetSchema {
            columns: vec![ColumnSchema::named("ID")],
            strict_columns: true,
            ..SheetSchema::default()
        };
        let issues = validate_workbook(&workbook(), &template(schema));
        assert!(issues.contains(&ValidationIssue::UnexpectedColumn {
            sheet: "Orders".to_owned(),
            column: "Amount".to_owned(),
        }));
    }

    #[test]
    fn sheet_without_tables_is_missing_table() {
        let workbook = Workbook {
            source_path: PathBuf::from("orders.xlsx"),
            sheets: vec![Sheet {
                name: "Orders".to_owned(),
                index: 0,
                tables: Vec::new(),
                warnings: Vec::new(),
            }],
        };
        let issues = validate_workbook(&workbook, &template(schema()));
        assert_eq!(
            issues,
            vec![ValidationIssue::MissingTable {
                sheet: "Orders".to_owned()
            }]
        );
    }

    #[test]
    fn custom_checks_and_ensure_valid() {
        let schema = SheetSchema {
            checks: vec![CustomCheck {
                name: "has-rows",
                check: |table| table.row_count() > 10,
            }],
            ..SheetSchema::default()
        };
        let issues = validate_workbook(&workbook(), &template(schema.to_owned()));
        assert!(issues.contains(&ValidationIssue::CustomCheckFailed {
            sheet: "Orders".to_owned(),
            check: "has-rows".to_owned(),
        }));
        assert!(matches!(
            ensure_valid(&workbook(), &template(schema)),
            Err(SheetScanError::ValidationFailed(1))
        ));
    }

    #[test]
    fn strict_sheets_rejects_unlisted_sheet() {
        let mut template = template(schema());
        template.strict_sheets = true;
        template.required_sheets.clear();
        template.schemas.clear();
        let issues = validate_workbook(&workbook(), &template);
        assert_eq!(
            issues,
            vec![ValidationIssue::UnexpectedSheet {
                sheet: "Orders".to_owned()
            }]
        );
    }
}
