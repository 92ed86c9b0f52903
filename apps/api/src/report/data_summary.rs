//! Parses pasted or uploaded tabular data and renders the Markdown summary
//! substituted for `{data_summary}`.

use std::collections::HashMap;

const PREVIEW_ROWS: usize = 5;
const MAX_CATEGORICAL_COLUMNS: usize = 5;
const TOP_VALUES: usize = 10;

/// A parsed table. Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DataTable {
    fn column(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows.iter().map(move |row| row[index].as_str())
    }

    /// Values of a column if every non-empty cell is numeric.
    fn numeric_column(&self, index: usize) -> Option<Vec<f64>> {
        let mut values = Vec::new();
        for cell in self.column(index) {
            if cell.trim().is_empty() {
                continue;
            }
            values.push(parse_number(cell)?);
        }
        (!values.is_empty()).then_some(values)
    }
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses text as a Markdown table, then TSV, then CSV.
pub fn parse_table(text: &str) -> Option<DataTable> {
    let text = text.trim_start_matches('\u{feff}');
    let first_line = text.lines().map(str::trim).find(|l| !l.is_empty())?;

    if first_line.starts_with('|') {
        return build_table(markdown_records(text));
    }

    let tsv = split_records(text, '\t');
    if tsv.first().is_some_and(|header| header.len() > 1) {
        if let Some(table) = build_table(tsv) {
            return Some(table);
        }
    }

    build_table(split_records(text, ','))
}

fn is_separator_row(line: &str) -> bool {
    line.contains('-') && line.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

fn markdown_records(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_separator_row(line))
        .map(|line| {
            let inner = line.strip_prefix('|').unwrap_or(line);
            let inner = inner.strip_suffix('|').unwrap_or(inner);
            inner.split('|').map(|cell| cell.trim().to_string()).collect()
        })
        .collect()
}

/// Splits delimited text into records, honouring RFC 4180 double quotes
/// (embedded delimiters, newlines and `""` escapes). Blank records are skipped.
fn split_records(text: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    let mut finish_record = |record: &mut Vec<String>, field: &mut String| {
        record.push(std::mem::take(field));
        let blank = record.iter().all(|f| f.trim().is_empty());
        let done = std::mem::take(record);
        if !blank {
            records.push(done);
        }
    };

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            c if c == delimiter => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => finish_record(&mut record, &mut field),
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        finish_record(&mut record, &mut field);
    }

    records
        .into_iter()
        .map(|r| r.into_iter().map(|f| f.trim().to_string()).collect())
        .collect()
}

/// Applies header detection and pads short rows. `None` when a row is wider
/// than the header.
fn build_table(mut records: Vec<Vec<String>>) -> Option<DataTable> {
    let first = records.first()?;
    let width = first.len();
    if width == 0 || records.iter().any(|r| r.len() > width) {
        return None;
    }

    let numeric = first.iter().filter(|c| parse_number(c).is_some()).count();
    let columns: Vec<String> = if numeric * 2 > width {
        (1..=width).map(|i| format!("列{i}")).collect()
    } else {
        records
            .remove(0)
            .into_iter()
            .enumerate()
            .map(|(i, name)| if name.is_empty() { format!("列{}", i + 1) } else { name })
            .collect()
    };

    for row in &mut records {
        row.resize(width, String::new());
    }
    Some(DataTable {
        columns,
        rows: records,
    })
}

/// Summary of `text`, or the raw text in a fence when it is not a table.
pub fn summarize_text(text: &str) -> String {
    match parse_table(text) {
        Some(table) => summarize(&table),
        None => format!("## 原始数据\n\n```\n{}\n```", text.trim()),
    }
}

pub fn summarize(table: &DataTable) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push("## 数据概览\n".to_string());
    parts.push(format!("- 总记录数：{}", table.rows.len()));
    parts.push(format!("- 字段列表：{}\n", table.columns.join(", ")));

    parts.push("## 数据示例（前5条）\n".to_string());
    let preview: Vec<Vec<String>> = table.rows.iter().take(PREVIEW_ROWS).cloned().collect();
    parts.push(markdown_table(&table.columns, &preview));

    let mut numeric: Vec<(usize, Vec<f64>)> = Vec::new();
    let mut categorical: Vec<usize> = Vec::new();
    for index in 0..table.columns.len() {
        match table.numeric_column(index) {
            Some(values) => numeric.push((index, values)),
            None if table.column(index).any(|c| !c.is_empty()) => categorical.push(index),
            None => {}
        }
    }

    if !numeric.is_empty() {
        parts.push("\n## 数值字段统计\n".to_string());
        parts.push(describe(table, &numeric));
    }

    if !categorical.is_empty() {
        parts.push("\n## 分类字段分布\n".to_string());
        for &index in categorical.iter().take(MAX_CATEGORICAL_COLUMNS) {
            let name = &table.columns[index];
            parts.push(format!("\n### {name}\n"));
            let rows: Vec<Vec<String>> = value_counts(table.column(index))
                .into_iter()
                .take(TOP_VALUES)
                .map(|(value, count)| vec![value.to_string(), count.to_string()])
                .collect();
            parts.push(markdown_table(&[name.clone(), "count".to_string()], &rows));
        }
    }

    parts.push("\n## 完整数据（CSV格式）\n".to_string());
    parts.push("```csv".to_string());
    parts.push(to_csv(table));
    parts.push("```".to_string());

    parts.join("\n")
}

/// count/mean/std/min/quartiles/max per numeric column.
fn describe(table: &DataTable, numeric: &[(usize, Vec<f64>)]) -> String {
    let mut header = vec![String::new()];
    header.extend(numeric.iter().map(|(i, _)| table.columns[*i].clone()));

    let stats: Vec<Stats> = numeric.iter().map(|(_, values)| Stats::of(values)).collect();
    let rows = [
        ("count", stats.iter().map(|s| format_number(s.count as f64)).collect::<Vec<_>>()),
        ("mean", stats.iter().map(|s| format_number(s.mean)).collect()),
        ("std", stats.iter().map(|s| s.std.map_or("-".to_string(), format_number)).collect()),
        ("min", stats.iter().map(|s| format_number(s.min)).collect()),
        ("25%", stats.iter().map(|s| format_number(s.q1)).collect()),
        ("50%", stats.iter().map(|s| format_number(s.median)).collect()),
        ("75%", stats.iter().map(|s| format_number(s.q3)).collect()),
        ("max", stats.iter().map(|s| format_number(s.max)).collect()),
    ]
    .into_iter()
    .map(|(label, values)| {
        let mut row = vec![label.to_string()];
        row.extend(values);
        row
    })
    .collect::<Vec<_>>();

    markdown_table(&header, &rows)
}

#[derive(Debug)]
struct Stats {
    count: usize,
    mean: f64,
    std: Option<f64>,
    min: f64,
    q1: f64,
    median: f64,
    q3: f64,
    max: f64,
}

impl Stats {
    /// `values` must be non-empty.
    fn of(values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let std = (n > 1).then(|| {
            let var = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            var.sqrt()
        });

        Self {
            count: n,
            mean,
            std,
            min: sorted[0],
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
            max: sorted[n - 1],
        }
    }
}

/// Linear interpolation between closest ranks of a sorted slice.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let rounded = format!("{value:.4}");
    rounded.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Non-empty values by descending count; ties keep first-seen order.
fn value_counts<'a>(values: impl Iterator<Item = &'a str>) -> Vec<(&'a str, usize)> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values.filter(|v| !v.is_empty()) {
        let count = counts.entry(value).or_insert(0);
        if *count == 0 {
            order.push(value);
        }
        *count += 1;
    }

    let mut result: Vec<(&str, usize)> = order.into_iter().map(|v| (v, counts[v])).collect();
    result.sort_by(|a, b| b.1.cmp(&a.1));
    result
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', " ")
}

fn markdown_row(row: &[String]) -> String {
    let cells: Vec<String> = row.iter().map(|c| escape_cell(c)).collect();
    format!("| {} |", cells.join(" | "))
}

fn markdown_table(header: &[String], rows: &[Vec<String>]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(markdown_row(header));
    lines.push(format!("|{}", " --- |".repeat(header.len())));
    lines.extend(rows.iter().map(|row| markdown_row(row)));
    lines.join("\n")
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_line(row: &[String]) -> String {
    row.iter().map(|c| csv_field(c)).collect::<Vec<_>>().join(",")
}

fn to_csv(table: &DataTable) -> String {
    let mut out = csv_line(&table.columns);
    out.push('\n');
    for row in &table.rows {
        out.push_str(&csv_line(row));
        out.push('\n');
    }
    out
}
