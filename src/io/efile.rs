//! E-file emitter.
//!
//! An E file is a flat text document read by batch load-forecast runners:
//!
//! ```text
//! <! Grid=... Type=... Time= 2024-05-01 08:00:00!>
//!
//! <Label>
//! @  col1  col2
//! #  v1  v2
//! </Label>
//! ```
//!
//! Blocks are written in insertion order. The default document carries the
//! fixed run parameters, the holiday calendar, one excluded date and empty
//! weather blocks;
//! callers append their own blocks (history load, temperature, ...) after.

use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::calendar::HolidayCalendar;
use crate::domain::{Cell, Frequency, Table, WideTable, MISSING_MARKER};
use crate::error::{AppError, CoreError, EXIT_INPUT};

/// Date format used inside E files.
pub const EFILE_DATE_FMT: &str = "%Y%m%d";

const GRID_DEFAULT: &str = "调度口径";
const TYPE_DEFAULT: &str = "短期正常日负荷预测";

/// Title line fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EFileHeader {
    pub grid: String,
    pub kind: String,
    pub time: NaiveDateTime,
}

impl EFileHeader {
    pub fn new(time: NaiveDateTime) -> Self {
        Self {
            grid: GRID_DEFAULT.to_string(),
            kind: TYPE_DEFAULT.to_string(),
            time,
        }
    }
}

/// One labelled block of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct EFileBlock {
    label: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl EFileBlock {
    pub fn new(label: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            label: label.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) -> Result<(), CoreError> {
        if row.len() != self.columns.len() {
            return Err(CoreError::ShapeMismatch {
                context: format!("row width of block <{}>", self.label),
                expected: vec![self.columns.len()],
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// A block with the table's columns (index first), missing cells as `null`.
    pub fn from_table(label: impl Into<String>, table: &Table) -> Self {
        let table = table.reset_index();
        Self {
            label: label.into(),
            columns: table.columns().to_vec(),
            rows: table
                .rows()
                .iter()
                .map(|row| row.iter().map(|c| c.render(MISSING_MARKER)).collect())
                .collect(),
        }
    }

    /// `Date` plus one column per grid label, missing values as `null`.
    pub fn from_wide(label: impl Into<String>, wide: &WideTable) -> Self {
        let mut block = Self::empty_grid(label, wide.frequency());
        block.rows = wide
            .rows()
            .iter()
            .map(|r| {
                let mut row = Vec::with_capacity(r.values.len() + 1);
                row.push(r.date.format(EFILE_DATE_FMT).to_string());
                row.extend(r.values.iter().map(|v| Cell::from(*v).render(MISSING_MARKER)));
                row
            })
            .collect();
        block
    }

    /// `Date` + grid labels header with no rows.
    pub fn empty_grid(label: impl Into<String>, frequency: Frequency) -> Self {
        let mut columns = vec!["Date".to_string()];
        columns.extend(frequency.labels().iter().cloned());
        Self::new(label, columns)
    }

    /// Single-column `Date` block.
    pub fn dates(label: impl Into<String>, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        let mut block = Self::new(label, vec!["Date".to_string()]);
        block.rows = dates
            .into_iter()
            .map(|d| vec![d.format(EFILE_DATE_FMT).to_string()])
            .collect();
        block
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render with the leading newline and the closing tag.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push('\n');
        out.push_str(&format!("<{}>\n", self.label));

        out.push('@');
        for c in &self.columns {
            out.push_str("  ");
            out.push_str(c);
        }
        out.push('\n');

        // Right-align each column to its widest cell.
        let widths: Vec<usize> = (0..self.columns.len())
            .map(|i| self.rows.iter().map(|r| r[i].chars().count()).max().unwrap_or(0))
            .collect();
        let lines: Vec<String> = self
            .rows
            .iter()
            .map(|row| {
                let mut line = String::from("#");
                for (cell, w) in row.iter().zip(&widths) {
                    line.push_str(&format!(" {cell:>w$}", w = *w));
                }
                line
            })
            .collect();
        out.push_str(&lines.join("\n"));

        out.push_str(&format!("\n</{}>\n", self.label));
        out
    }
}

/// Dates of the batch run written into `ControlParameterBatchTest`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchWindow {
    pub begin: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EFileDocument {
    header: EFileHeader,
    blocks: Vec<EFileBlock>,
}

impl EFileDocument {
    pub fn new(header: EFileHeader) -> Self {
        Self {
            header,
            blocks: Vec::new(),
        }
    }

    /// Document with the default blocks, in their fixed order.
    pub fn with_defaults(header: EFileHeader, window: BatchWindow, calendar: &HolidayCalendar) -> Self {
        Self {
            header,
            blocks: default_blocks(window, calendar),
        }
    }

    /// Append a block. Labels must be unique.
    pub fn insert(&mut self, block: EFileBlock) -> Result<(), CoreError> {
        if self.get(block.label()).is_some() {
            return Err(CoreError::DuplicateBlock(block.label().to_string()));
        }
        self.blocks.push(block);
        Ok(())
    }

    /// Replace the block with the same label in place, or append it.
    pub fn replace(&mut self, block: EFileBlock) -> Option<EFileBlock> {
        match self.blocks.iter().position(|b| b.label == block.label) {
            Some(i) => Some(std::mem::replace(&mut self.blocks[i], block)),
            None => {
                self.blocks.push(block);
                None
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<&EFileBlock> {
        self.blocks.iter().find(|b| b.label == label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().map(|b| b.label.as_str())
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "<! Grid={} Type={} Time= {}!> \n",
            self.header.grid,
            self.header.kind,
            self.header.time.format("%Y-%m-%d %H:%M:%S")
        );
        for block in &self.blocks {
            out.push_str(&block.render());
        }
        out
    }

    pub fn write(&self, path: &Path) -> Result<(), AppError> {
        fs::write(path, self.render())
            .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write E file '{}': {e}", path.display())))?;
        debug!(path = %path.display(), blocks = self.blocks.len(), "E file written");
        Ok(())
    }
}

/// The fixed blocks every batch-run E file starts with.
pub fn default_blocks(window: BatchWindow, calendar: &HolidayCalendar) -> Vec<EFileBlock> {
    let begin = window.begin.format(EFILE_DATE_FMT).to_string();
    let end = window.end.format(EFILE_DATE_FMT).to_string();

    let control = property_block(
        "ControlParameterBatchTest",
        &["PropertyID", "PropertyName", "Value"],
        &[
            &["ForecastBeginDay", "测试起始日", begin.as_str()],
            &["ForecastEndDay", "测试结束日", end.as_str()],
            &["ForecastNumDay", "预测天数", "1"],
            &["NewPoint", "新息点数", "38"],
            &["IsMultiThread", "是否启用多线程", "0"],
            &["Algorithm", "算法", "109"],
            &["NumOfRound", "训练轮次", "300"],
        ],
    );
    let search = property_block(
        "SearchParameter",
        &["PropertyID", "ValueRange", "Type"],
        &[
            &["Time_Interval", "(4)", "None"],
            &["Thresh_Day", "(1.5)", "None"],
            &["Recent_Days", "(400)", "None"],
            &["Moment_Use_Day", "(60)", "None"],
            &["Day_Acc_Thresh", "(80)", "None"],
        ],
    );
    let optimization = property_block(
        "OptimizationParameter",
        &["PropertyID", "PropertyName", "Value"],
        &[
            &["IsSearchParam", "是否启用参数搜索", "1"],
            &["Max_Search_Num", "最大搜索次数", "1"],
            &["ThreadNum", "线程数", "3"],
        ],
    );

    let excluded = property_block("DateNotIncluded", &["Date", "Cause"], &[&["20210101", "疫情"]]);
    let stat = |label: &str| EFileBlock::new(label, vec!["Date".to_string(), "AVG".to_string()]);

    vec![
        control,
        search,
        optimization,
        EFileBlock::dates("HolidayInfo", calendar.holidays()),
        EFileBlock::dates("AdjustedWorkday", calendar.adjusted_workdays()),
        excluded,
        EFileBlock::empty_grid("Algo109", Frequency::P96),
        EFileBlock::empty_grid("Humidity", Frequency::P96),
        EFileBlock::empty_grid("Wind", Frequency::P96),
        EFileBlock::empty_grid("Precipitation", Frequency::P96),
        stat("HumidityStat"),
        stat("WindStat"),
        stat("PrecipitationStat"),
    ]
}

fn property_block(label: &str, columns: &[&str], rows: &[&[&str]]) -> EFileBlock {
    EFileBlock {
        label: label.to_string(),
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows: rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WideRow;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn header() -> EFileHeader {
        EFileHeader {
            grid: "G".to_string(),
            kind: "T".to_string(),
            time: d(2024, 5, 1).and_hms_opt(8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn block_layout() {
        let mut block = EFileBlock::new("Temp", vec!["Date".to_string(), "AVG".to_string()]);
        block.push_row(vec!["20240501".to_string(), "7".to_string()]).unwrap();
        block.push_row(vec!["20240502".to_string(), "12.5".to_string()]).unwrap();
        assert!(block.push_row(vec!["x".to_string()]).is_err());

        assert_eq!(
            block.render(),
            "\n<Temp>\n@  Date  AVG\n# 20240501    7\n# 20240502 12.5\n</Temp>\n"
        );
    }

    #[test]
    fn empty_blocks_keep_their_header() {
        let block = EFileBlock::new("WindStat", vec!["Date".to_string(), "AVG".to_string()]);
        assert_eq!(block.render(), "\n<WindStat>\n@  Date  AVG\n\n</WindStat>\n");
    }

    #[test]
    fn wide_tables_become_grid_blocks() {
        let mut values = vec![Some(1.0); 24];
        values[3] = None;
        let wide = WideTable::new("DATE", Frequency::P24, vec![WideRow { date: d(2024, 5, 1), values }]).unwrap();
        let block = EFileBlock::from_wide("HistoryLoad", &wide);
        assert_eq!(block.columns().len(), 25);
        assert_eq!(block.columns()[1], "T0000");
        let text = block.render();
        assert!(text.contains("# 20240501"));
        assert!(text.contains("null"));
    }

    #[test]
    fn default_document_order_and_unique_labels() {
        let cal = HolidayCalendar::from_dates([d(2024, 10, 1)]).with_adjusted_workdays([d(2024, 10, 12)]);
        let window = BatchWindow {
            begin: d(2024, 10, 1),
            end: d(2024, 10, 31),
        };
        let mut doc = EFileDocument::with_defaults(header(), window, &cal);
        doc.insert(EFileBlock::new("HistoryLoad", vec!["Date".to_string()])).unwrap();

        let labels: Vec<&str> = doc.labels().collect();
        assert_eq!(labels[0], "ControlParameterBatchTest");
        assert_eq!(labels[3], "HolidayInfo");
        assert_eq!(labels[12], "PrecipitationStat");
        assert_eq!(labels[13], "HistoryLoad");

        let dup = doc.insert(EFileBlock::new("Wind", Vec::new())).unwrap_err();
        assert_eq!(dup, CoreError::DuplicateBlock("Wind".to_string()));

        let text = doc.render();
        assert!(text.starts_with("<! Grid=G Type=T Time= 2024-05-01 08:00:00!> \n\n<ControlParameterBatchTest>\n"));
        assert!(text.contains("# 20241001\n</HolidayInfo>"));
        assert!(text.contains("20241012"));
        assert!(text.contains("ForecastEndDay"));
        assert!(text.contains("<DateNotIncluded>\n@  Date  Cause\n# 20210101 疫情\n</DateNotIncluded>"));
    }

    #[test]
    fn replace_keeps_position() {
        let cal = HolidayCalendar::default();
        let window = BatchWindow {
            begin: d(2024, 1, 1),
            end: d(2024, 1, 2),
        };
        let mut doc = EFileDocument::with_defaults(header(), window, &cal);
        let old = doc.replace(EFileBlock::dates("DateNotIncluded", [d(2024, 1, 1)]));
        assert!(old.is_some());
        assert_eq!(doc.labels().nth(5), Some("DateNotIncluded"));
        assert_eq!(doc.get("DateNotIncluded").map(EFileBlock::len), Some(1));
    }
}
