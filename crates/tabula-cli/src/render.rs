//! Table rendering for terminal output

use comfy_table::{presets::UTF8_FULL, Table as DisplayTable};

use tabula_ir::Table;

/// Render a table for display, header row first.
pub fn render(table: &Table) -> DisplayTable {
    let mut out = DisplayTable::new();
    out.load_preset(UTF8_FULL);
    out.set_header(table.column_names());
    for row in 0..table.row_count() {
        out.add_row(
            table
                .columns()
                .iter()
                .map(|column| column.values[row].to_string()),
        );
    }
    out
}
