use chrono::Duration;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::analysis::duration::format_duration;

pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn duration_cell(duration: Duration) -> Cell {
    Cell::new(format_duration(duration))
}

/// Green while inside the budget, red once it is overrun.
pub fn budget_cell(remaining: Duration) -> Cell {
    let text = format_duration(remaining);
    if remaining < Duration::zero() {
        Cell::new(text).fg(TableColor::Red)
    } else if remaining < Duration::minutes(5) {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Green)
    }
}
