use super::band::{BandKind, ColumnKind, TableBand};
use crate::element::{ElementBase, ImageElement, TextElement};
use crate::fragment::Fragment;
use crate::LayoutError;
use log::error;
use reportflow_traits::{value_to_string, Canvas, EvaluationContext};
use serde_json::Value;

/// One cell of a table row.
#[derive(Debug, Clone)]
pub(crate) enum Cell {
    Text(TextElement),
    Image(ImageElement),
}

impl Cell {
    pub(crate) fn base(&self) -> &ElementBase {
        match self {
            Cell::Text(e) => &e.base,
            Cell::Image(e) => &e.base,
        }
    }

    fn prepare(&mut self, ctx: &dyn EvaluationContext, canvas: Option<&mut dyn Canvas>) -> Result<(), LayoutError> {
        match self {
            Cell::Text(e) => e.prepare(ctx, canvas),
            Cell::Image(e) => e.prepare(ctx, canvas),
        }
    }

    fn total_height(&self) -> f32 {
        match self {
            Cell::Text(e) => e.total_height(),
            Cell::Image(e) => e.base.height,
        }
    }

    /// Height still to be placed when the row continues on another page.
    fn remaining_height(&self) -> f32 {
        match self {
            Cell::Text(e) => e.remaining_height(),
            Cell::Image(e) if e.base.rendering_complete => 0.0,
            Cell::Image(e) => e.base.height,
        }
    }

    fn set_height(&mut self, height: f32) {
        match self {
            Cell::Text(e) => e.set_height(height),
            Cell::Image(e) => e.set_height(height),
        }
    }

    fn next_fragment(&mut self, offset_y: f32, container_height: f32) -> Result<Option<Fragment>, LayoutError> {
        if self.base().rendering_complete {
            return Ok(None);
        }
        let (fragment, _) = match self {
            Cell::Text(e) => e.next_fragment(offset_y, container_height)?,
            Cell::Image(e) => e.next_fragment(offset_y, container_height)?,
        };
        Ok(fragment)
    }

    fn cleanup(&mut self) {
        if let Cell::Image(e) = self {
            e.cleanup();
        }
    }
}

/// Group key of the following row of the same band.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NextRow {
    /// Not created yet; rows waiting for it are not flushed until the data
    /// is exhausted.
    Pending,
    Known(String),
}

/// A band expanded for one data row.
#[derive(Debug, Clone)]
pub(crate) struct TableRow {
    pub serial: u64,
    pub kind: BandKind,
    pub cells: Vec<Cell>,
    pub height: f32,
    /// Height already rendered when the row is split across pages.
    pub consumed: f32,
    pub group_key: String,
    has_group: bool,
    before_group: bool,
    print_if_result: bool,
    /// `None` for the first row of the band.
    pub prev_group_key: Option<String>,
    pub next: NextRow,
}

impl TableRow {
    /// Builds the cells of `band` for the visible `columns`. Simple array
    /// columns fan out into one cell per array entry.
    pub fn new(
        serial: u64,
        band: &mut TableBand,
        columns: &[usize],
        table_x: f32,
        ctx: &dyn EvaluationContext,
        prev_group_key: Option<String>,
    ) -> Self {
        let mut cells = Vec::new();
        let mut x = table_x;
        for &index in columns {
            let Some(column) = band.columns.get_mut(index) else {
                continue;
            };
            if column.kind.is_none() {
                column.kind = Some(column.decide_kind(ctx));
            }
            match &column.kind {
                Some(ColumnKind::Image) => {
                    cells.push(Cell::Image(column.image_cell(x, band.height)));
                    x += column.width;
                    continue;
                }
                Some(ColumnKind::SimpleArray(parameter)) => {
                    let values = match ctx.data(&parameter.name) {
                        Some(Value::Array(values)) => values.as_slice(),
                        _ => &[],
                    };
                    for value in values {
                        let entry = ctx.formatted_value(value, parameter, None, true);
                        cells.push(Cell::Text(column.text_cell(x, band.height, Some(entry))));
                        x += column.width;
                    }
                    continue;
                }
                Some(ColumnKind::Text) | None => {}
            }

            cells.push(Cell::Text(column.text_cell(x, band.height, None)));
            x += column.width;
        }

        Self {
            serial,
            kind: band.kind,
            cells,
            height: 0.0,
            consumed: 0.0,
            group_key: String::new(),
            has_group: band.has_group(),
            before_group: band.before_group,
            print_if_result: true,
            prev_group_key,
            next: NextRow::Pending,
        }
    }

    /// Evaluates group key and print condition, prepares the cells and sizes
    /// the row to its tallest cell.
    pub fn prepare(
        &mut self,
        band: &TableBand,
        ctx: &dyn EvaluationContext,
        mut canvas: Option<&mut dyn Canvas>,
        row_index: Option<usize>,
    ) -> Result<(), LayoutError> {
        if band.has_group() {
            self.group_key = value_to_string(&ctx.evaluate(&band.group_expression, band.id, "group_expression")?);
        }
        self.print_if_result = ctx.evaluate_condition(&band.print_if, band.id, "print_if")?;

        let background = band.row_background(row_index);
        let mut height = band.height;
        for cell in &mut self.cells {
            cell.prepare(ctx, canvas.as_mut().map(|c| &mut **c as &mut dyn Canvas))?;
            if let (Cell::Text(text), Some(color)) = (&mut *cell, background) {
                text.apply_row_background(color);
            }
            height = height.max(cell.total_height());
        }
        self.height = height;
        for cell in &mut self.cells {
            cell.set_height(height);
        }
        Ok(())
    }

    pub fn is_printed(&self) -> bool {
        if !self.print_if_result {
            return false;
        }
        if !self.has_group {
            return true;
        }
        if self.before_group {
            self.prev_group_key.as_ref() != Some(&self.group_key)
        } else {
            match &self.next {
                NextRow::Pending => true,
                NextRow::Known(key) => *key != self.group_key,
            }
        }
    }

    /// Content rows can only be flushed once the following row is known or
    /// no more rows will come.
    pub fn is_ready(&self, all_rows_processed: bool) -> bool {
        self.kind != BandKind::Content || all_rows_processed || self.next != NextRow::Pending
    }

    pub fn remaining_height(&self) -> f32 {
        self.height - self.consumed
    }

    /// After a split the row continues with what its tallest cell has left.
    /// Cells place whole lines, so this can exceed the height not yet drawn.
    pub fn continue_after_split(&mut self) {
        let left = self.cells.iter().map(Cell::remaining_height).fold(0.0, f32::max);
        self.consumed = self.height - left;
    }

    pub fn width(&self) -> f32 {
        self.cells.iter().map(|c| c.base().width).sum()
    }

    pub fn column_widths(&self) -> Vec<f32> {
        self.cells.iter().map(|c| c.base().width).collect()
    }

    /// Creates the cell fragments of the row placed at `row_y`. Cells that
    /// were split continue where the previous page stopped.
    pub fn create_fragments(&mut self, row_y: f32, container_height: f32) -> Result<Vec<Fragment>, LayoutError> {
        let mut fragments = Vec::with_capacity(self.cells.len());
        for cell in &mut self.cells {
            match cell.next_fragment(row_y, container_height)? {
                Some(fragment) => fragments.push(fragment),
                None if !cell.base().rendering_complete => {
                    error!("Table cell {} could not be placed at {:.2}", cell.base().id, row_y);
                }
                None => {}
            }
        }
        Ok(fragments)
    }

    pub fn cleanup(&mut self) {
        for cell in &mut self.cells {
            cell.cleanup();
        }
    }
}
