use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::commands::{DatasetSummary, ValidationReport};

pub fn print_summary(summary: &DatasetSummary) {
    println!("{}", summary_table(summary));
}

pub fn summary_table(summary: &DatasetSummary) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Field"), header_cell("Value")]);
    apply_table_style(&mut table);
    table.add_row(vec![label_cell("Command"), Cell::new(summary.command)]);
    table.add_row(vec![
        label_cell("Output"),
        Cell::new(summary.output.display().to_string()),
    ]);
    table.add_row(vec![label_cell("Rows"), Cell::new(summary.rows)]);
    table.add_row(vec![label_cell("Columns"), Cell::new(summary.columns)]);
    for (label, value) in &summary.details {
        table.add_row(vec![label_cell(label), Cell::new(value)]);
    }
    table
}

pub fn print_validation(report: &ValidationReport) {
    println!("Metadata: {}", report.path.display());
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Columns"),
        header_cell("Masks"),
        header_cell("Sets"),
        header_cell("Problems"),
    ]);
    apply_table_style(&mut table);
    for index in 0..4 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    table.add_row(vec![
        Cell::new(report.columns),
        Cell::new(report.masks),
        Cell::new(report.sets),
        problem_count_cell(report.problems.len()),
    ]);
    println!("{table}");
    if !report.problems.is_empty() {
        println!("{}", problem_table(&report.problems));
    }
}

fn problem_table(problems: &[String]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("#"), header_cell("Problem")]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for (index, problem) in problems.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1).fg(Color::DarkGrey),
            Cell::new(problem).fg(Color::Red),
        ]);
    }
    table
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn label_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

fn problem_count_cell(count: usize) -> Cell {
    if count == 0 {
        Cell::new(count).fg(Color::Green)
    } else {
        Cell::new(count).fg(Color::Red).add_attribute(Attribute::Bold)
    }
}
