//! Tables: header, grouped content bands and footer over an array parameter.
//!
//! Data rows are consumed lazily in batches. A content row is only flushed
//! into a page once the row following it in the same band is known, since
//! the group expression of an after-group band compares against it.

pub mod band;
pub mod block;
mod row;

pub use band::{BandKind, TableBand, TableColumn};
pub use block::{RowBlock, TableBlock};

use crate::algorithms::fits;
use crate::element::ElementBase;
use crate::fragment::Fragment;
use crate::LayoutError;
use log::debug;
use reportflow_traits::{strip_parameter_name, Canvas, EvaluationContext, ScopedContext};
use reportflow_types::{Color, Parameter, ParameterType, Rect, TableBorder};
use row::TableRow;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Last row created for a content band.
#[derive(Debug, Clone)]
struct PrevRow {
    serial: u64,
    group_key: String,
}

#[derive(Debug, Clone)]
pub struct TableElement {
    pub base: ElementBase,
    /// `${param}` of type array; without one the table has a single empty row.
    pub data_source: String,
    pub header: Option<TableBand>,
    pub content_bands: Vec<TableBand>,
    pub footer: Option<TableBand>,
    pub border: TableBorder,
    pub border_color: Color,
    pub border_width: f32,
    /// Data rows prepared before rows are flushed into the page.
    pub batch_size: usize,

    columns: Vec<usize>,
    row_parameters: Arc<[Parameter]>,
    rows: Vec<Value>,
    row_index: usize,
    print_header: bool,
    print_footer: bool,
    prepared_rows: VecDeque<TableRow>,
    prev_content_rows: Vec<Option<PrevRow>>,
    next_serial: u64,
}

impl TableElement {
    pub fn new(base: ElementBase, data_source: impl Into<String>) -> Self {
        Self {
            base,
            data_source: data_source.into(),
            header: None,
            content_bands: Vec::new(),
            footer: None,
            border: TableBorder::None,
            border_color: Color::BLACK,
            border_width: 0.0,
            batch_size: DEFAULT_BATCH_SIZE,
            columns: Vec::new(),
            row_parameters: Arc::from(Vec::new()),
            rows: Vec::new(),
            row_index: 0,
            print_header: false,
            print_footer: false,
            prepared_rows: VecDeque::new(),
            prev_content_rows: Vec::new(),
            next_serial: 0,
        }
    }

    pub fn with_header(mut self, header: TableBand) -> Self {
        self.header = Some(header);
        self
    }

    /// Appends a content band. Bands added before the first band without
    /// group expression are before-group bands.
    pub fn with_content_band(mut self, mut band: TableBand) -> Self {
        let main_content_added = self.content_bands.iter().any(|b| !b.has_group());
        band.before_group = !main_content_added;
        self.content_bands.push(band);
        self
    }

    pub fn with_footer(mut self, footer: TableBand) -> Self {
        self.footer = Some(footer);
        self
    }

    pub fn with_border(mut self, border: TableBorder, color: Color, width: f32) -> Self {
        self.border = border;
        self.border_color = color;
        self.border_width = width;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn column_count(&self) -> usize {
        self.header
            .iter()
            .chain(&self.content_bands)
            .chain(&self.footer)
            .map(|band| band.columns.len())
            .max()
            .unwrap_or(0)
    }

    fn invalid_data(&self, message: impl Into<String>) -> LayoutError {
        LayoutError::InvalidData {
            element_id: self.base.id,
            field: "data_source",
            message: message.into(),
        }
    }

    /// Visible columns; header columns whose print condition is false are removed.
    fn visible_columns(&self, ctx: &dyn EvaluationContext) -> Result<Vec<usize>, LayoutError> {
        let mut columns = Vec::new();
        for index in 0..self.column_count() {
            let printed = match self.header.as_ref().and_then(|h| h.columns.get(index)) {
                Some(column) => ctx.evaluate_condition(&column.print_if, column.id, "print_if")?,
                None => true,
            };
            if printed {
                columns.push(index);
            }
        }
        Ok(columns)
    }

    fn load_rows(&mut self, ctx: &dyn EvaluationContext) -> Result<(), LayoutError> {
        let name = strip_parameter_name(&self.data_source);
        if name.is_empty() {
            // A static table, faked by one empty data row.
            self.row_parameters = Arc::from(Vec::new());
            self.rows = vec![Value::Object(Default::default())];
            return Ok(());
        }
        let parameter = ctx
            .parameter(name)
            .ok_or_else(|| self.invalid_data(format!("parameter '{name}' does not exist")))?;
        if parameter.kind != ParameterType::Array {
            return Err(self.invalid_data(format!("parameter '{name}' is not an array")));
        }
        self.row_parameters = Arc::from(parameter.children.clone());
        self.rows = match ctx.data(name) {
            Some(Value::Array(rows)) => rows.clone(),
            Some(Value::Null) | None => return Err(self.invalid_data(format!("no data for '{name}'"))),
            Some(_) => return Err(self.invalid_data(format!("data of '{name}' is not a list"))),
        };
        Ok(())
    }

    pub fn prepare(
        &mut self,
        ctx: &mut dyn EvaluationContext,
        mut canvas: Option<&mut dyn Canvas>,
        verify_only: bool,
    ) -> Result<(), LayoutError> {
        self.columns = self.visible_columns(&*ctx)?;
        self.load_rows(&*ctx)?;
        self.row_index = 0;
        self.print_header = self.header.is_some();
        self.print_footer = self.footer.is_some();
        self.prepared_rows.clear();
        self.prev_content_rows = vec![None; self.content_bands.len()];
        self.next_serial = 0;

        if verify_only {
            self.verify(ctx, canvas.as_mut().map(|c| &mut **c as &mut dyn Canvas))?;
        }
        Ok(())
    }

    /// Builds every row once so evaluation errors surface before layout.
    fn verify(&mut self, ctx: &mut dyn EvaluationContext, mut canvas: Option<&mut dyn Canvas>) -> Result<(), LayoutError> {
        let x = self.base.x;
        if let Some(header) = self.header.as_mut() {
            let mut row = TableRow::new(0, header, &self.columns, x, &*ctx, None);
            row.prepare(header, &*ctx, canvas.as_mut().map(|c| &mut **c as &mut dyn Canvas), None)?;
        }
        for data in &self.rows {
            let scoped = ScopedContext::push(ctx, self.row_parameters.clone(), data.clone());
            for band in &mut self.content_bands {
                let mut row = TableRow::new(0, band, &self.columns, x, &*scoped, None);
                row.prepare(band, &*scoped, canvas.as_mut().map(|c| &mut **c as &mut dyn Canvas), None)?;
            }
        }
        if let Some(footer) = self.footer.as_mut() {
            let mut row = TableRow::new(0, footer, &self.columns, x, &*ctx, None);
            row.prepare(footer, &*ctx, canvas.as_mut().map(|c| &mut **c as &mut dyn Canvas), None)?;
        }
        Ok(())
    }

    fn is_layout_complete(&self) -> bool {
        let header_done = !self.print_header || self.header.as_ref().is_some_and(|h| h.repeat_header);
        header_done && !self.print_footer && self.row_index >= self.rows.len() && self.prepared_rows.is_empty()
    }

    fn serial(&mut self) -> u64 {
        self.next_serial += 1;
        self.next_serial
    }

    fn prepare_header_row(&mut self, ctx: &dyn EvaluationContext, canvas: &mut dyn Canvas) -> Result<Option<TableRow>, LayoutError> {
        let serial = self.serial();
        let x = self.base.x;
        let Some(header) = self.header.as_mut() else {
            return Ok(None);
        };
        let mut row = TableRow::new(serial, header, &self.columns, x, ctx, None);
        row.prepare(header, ctx, Some(canvas), None)?;
        Ok(Some(row))
    }

    fn prepare_footer_row(&mut self, ctx: &dyn EvaluationContext, canvas: &mut dyn Canvas) -> Result<Option<TableRow>, LayoutError> {
        let serial = self.serial();
        let x = self.base.x;
        let Some(footer) = self.footer.as_mut() else {
            return Ok(None);
        };
        let mut row = TableRow::new(serial, footer, &self.columns, x, ctx, None);
        row.prepare(footer, ctx, Some(canvas), None)?;
        Ok(Some(row))
    }

    /// Expands every content band for the current data row.
    fn prepare_data_row(&mut self, ctx: &mut dyn EvaluationContext, canvas: &mut dyn Canvas) -> Result<(), LayoutError> {
        let data = self.rows[self.row_index].clone();
        let scoped = ScopedContext::push(ctx, self.row_parameters.clone(), data);
        for band_index in 0..self.content_bands.len() {
            let serial = self.serial();
            let prev = self.prev_content_rows[band_index].take();
            let band = &mut self.content_bands[band_index];
            let mut row = TableRow::new(
                serial,
                band,
                &self.columns,
                self.base.x,
                &*scoped,
                prev.as_ref().map(|p| p.group_key.clone()),
            );
            row.prepare(band, &*scoped, Some(&mut *canvas), Some(self.row_index))?;

            if let Some(prev) = prev
                && let Some(prev_row) = self.prepared_rows.iter_mut().find(|r| r.serial == prev.serial)
            {
                prev_row.next = row::NextRow::Known(row.group_key.clone());
            }
            self.prev_content_rows[band_index] = Some(PrevRow {
                serial,
                group_key: row.group_key.clone(),
            });
            self.prepared_rows.push_back(row);
        }
        Ok(())
    }

    pub fn next_fragment(
        &mut self,
        offset_y: f32,
        container_height: f32,
        ctx: &mut dyn EvaluationContext,
        canvas: &mut dyn Canvas,
    ) -> Result<(Option<Fragment>, bool), LayoutError> {
        self.base.render_y = offset_y;
        self.base.render_bottom = offset_y;
        if self.is_layout_complete() {
            self.base.rendering_complete = true;
            return Ok((None, true));
        }

        let mut block = TableBlock::new(
            Rect::new(self.base.x, offset_y, self.base.width, 0.0),
            self.border,
            self.border_color,
            self.border_width,
        );

        // The header may still be queued from a page where nothing fit.
        let header_queued = self.prepared_rows.front().is_some_and(|r| r.kind == BandKind::Header);
        if self.print_header && !header_queued {
            if let Some(row) = self.prepare_header_row(&*ctx, canvas)? {
                self.prepared_rows.push_front(row);
            }
            if !self.header.as_ref().is_some_and(|h| h.repeat_header) {
                self.print_header = false;
            }
        }

        let mut remaining_batch = self.batch_size;
        while self.row_index < self.rows.len() {
            self.prepare_data_row(ctx, canvas)?;
            self.row_index += 1;
            remaining_batch -= 1;
            if remaining_batch == 0 {
                remaining_batch = self.batch_size;
                if self.row_index < self.rows.len() {
                    self.flush(&mut block, offset_y, container_height)?;
                    if block.full {
                        break;
                    }
                }
            }
        }

        if self.row_index >= self.rows.len() && self.print_footer {
            if let Some(row) = self.prepare_footer_row(&*ctx, canvas)? {
                self.prepared_rows.push_back(row);
            }
            self.print_footer = false;
        }

        self.flush(&mut block, offset_y, container_height)?;

        let complete = self.is_layout_complete();
        self.base.rendering_complete = complete;
        if block.is_empty() {
            if !complete && offset_y == 0.0 {
                let needed = self.prepared_rows.front().map_or(0.0, TableRow::remaining_height);
                return Err(LayoutError::ElementTooLarge {
                    element_id: self.base.id,
                    field: "height",
                    needed,
                    available: container_height,
                });
            }
            return Ok((None, complete));
        }

        debug!(
            "Table {}: {} row(s) at offset {:.2}, height {:.2}, {} data row(s) left",
            self.base.id,
            block.rows.len(),
            offset_y,
            block.rect.height,
            self.rows.len() - self.row_index
        );
        self.base.render_bottom = block.rect.bottom();
        self.base.first_render_element = false;
        Ok((Some(Fragment::Table(block)), complete))
    }

    /// Moves prepared rows whose print state is known into `block` while
    /// they fit.
    fn flush(&mut self, block: &mut TableBlock, offset_y: f32, container_height: f32) -> Result<(), LayoutError> {
        let all_rows_processed = self.row_index >= self.rows.len();
        let mut ready = VecDeque::new();
        let mut pending = VecDeque::new();
        for row in self.prepared_rows.drain(..) {
            if !row.is_ready(all_rows_processed) {
                pending.push_back(row);
            } else if row.kind != BandKind::Content || row.is_printed() {
                ready.push_back(row);
            }
        }

        while !block.full && !ready.is_empty() {
            // Rows can be split from each other only at the top of the page.
            let allow_split = offset_y == 0.0 && block.content_rows == 0;
            let starts_with_header = ready.front().is_some_and(|r| r.kind == BandKind::Header);
            let ends_with_footer = ready.back().is_some_and(|r| r.kind == BandKind::Footer);
            // The header goes with the first row, the footer with the last one.
            let count = match ready.len() {
                3 if starts_with_header && ends_with_footer => 3,
                n if starts_with_header || (n == 2 && ends_with_footer) => n.min(2),
                _ => 1,
            };
            let available = container_height - offset_y - block.rect.height;
            let added = self.add_rows(block, &mut ready, count, allow_split, available, container_height)?;
            if added == 0 {
                break;
            }
            self.base.first_render_element = false;
        }

        ready.append(&mut pending);
        self.prepared_rows = ready;
        Ok(())
    }

    fn add_rows(
        &mut self,
        block: &mut TableBlock,
        rows: &mut VecDeque<TableRow>,
        count: usize,
        allow_split: bool,
        mut available: f32,
        container_height: f32,
    ) -> Result<usize, LayoutError> {
        if !allow_split {
            let height: f32 = rows.iter().take(count).map(TableRow::remaining_height).sum();
            if !fits(height, available) {
                block.full = true;
                return Ok(0);
            }
            for _ in 0..count {
                if let Some(row) = rows.pop_front() {
                    Self::place_row(block, row, container_height)?;
                }
            }
            return Ok(count);
        }

        let mut added = 0;
        for _ in 0..count {
            let Some(row) = rows.front_mut() else {
                break;
            };
            let height = row.remaining_height();
            if fits(height, available) {
                if let Some(row) = rows.pop_front() {
                    Self::place_row(block, row, container_height)?;
                }
                available -= height;
                added += 1;
                continue;
            }

            if row.kind == BandKind::Content && block.content_rows == 0 && available > 0.0 {
                // Taller than a page: continue the cells on the next page.
                let row_y = block.rect.bottom();
                let cells = row.create_fragments(row_y, container_height)?;
                if !cells.is_empty() {
                    row.continue_after_split();
                    debug!("Table {}: row split across pages, {:.2} left", self.base.id, row.remaining_height());
                    block.push_row(RowBlock {
                        height: available,
                        column_widths: row.column_widths(),
                        cells,
                    });
                }
            }
            block.full = true;
            break;
        }
        Ok(added)
    }

    /// Releases the image keys of rows still waiting for a page.
    pub fn cleanup(&mut self) {
        for row in &mut self.prepared_rows {
            row.cleanup();
        }
    }

    fn place_row(block: &mut TableBlock, mut row: TableRow, container_height: f32) -> Result<(), LayoutError> {
        let row_y = block.rect.bottom();
        let cells = row.create_fragments(row_y, container_height)?;
        if row.kind == BandKind::Content {
            block.content_rows += 1;
        }
        block.push_row(RowBlock {
            height: row.remaining_height(),
            column_widths: row.column_widths(),
            cells,
        });
        Ok(())
    }
}
