use std::path::{Path, PathBuf};
use std::time::Instant;

use arboard::Clipboard;
use polars::prelude::DataFrame;
use ratatui::crossterm::event::KeyEvent;
use rayon::prelude::*;
use tracing::{debug, info, trace, warn};

use crate::display;
use crate::domain::{EXPORT_FILE_NAME, HELP_TEXT, Message, ViewerConfig, ViewerError};
use crate::export;
use crate::inputter::{InputResult, Inputter};
use crate::loader::Loader;
use crate::schema;
use crate::ui::{
    COLUMN_WIDTH_MARGIN, SCROLLBAR_WIDTH, STATUSLINE_HEIGHT, TABLE_HEADER_HEIGHT, TITLE_HEIGHT,
};

#[derive(Debug, PartialEq)]
pub enum Status {
    EMPTY,
    READY,
    QUITTING,
}

// One fully formatted display column, all rows.
struct GridColumn {
    label: String,
    max_width: usize,
    render_width: usize,
    cells: Vec<String>,
}

/// Window of one column handed to the UI for rendering.
#[derive(Clone)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
}

impl ColumnView {
    fn empty() -> Self {
        ColumnView {
            name: String::new(),
            width: 0,
            data: Vec::new(),
        }
    }
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
    pub index_width: usize,
}

impl UILayout {
    pub fn from_values(index_width: usize, ui_width: usize, ui_height: usize) -> Self {
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width.saturating_sub(SCROLLBAR_WIDTH + index_width),
            table_height: ui_height
                .saturating_sub(TITLE_HEIGHT + TABLE_HEADER_HEIGHT + STATUSLINE_HEIGHT),
            index_width,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

/// Everything the UI needs to draw one frame.
pub struct UIData {
    pub name: String,
    pub table: Vec<ColumnView>,
    pub index: ColumnView,
    pub show_index: bool,
    pub nrows: usize,
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub show_popup: bool,
    pub popup_message: String,
    pub layout: UILayout,
    pub cmdinput: InputResult,
    pub active_cmdinput: bool,
    pub export_ready: bool,
    pub status_message: String,
    pub last_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            table: Vec::new(),
            index: ColumnView::empty(),
            show_index: false,
            nrows: 0,
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            show_popup: false,
            popup_message: String::new(),
            layout: UILayout::default(),
            cmdinput: InputResult::default(),
            active_cmdinput: false,
            export_ready: false,
            status_message: String::new(),
            last_update: Instant::now(),
        }
    }
}

pub struct Model {
    config: ViewerConfig,
    pub status: Status,
    loader: Loader,
    table_name: String,
    grid: Vec<GridColumn>,
    nrows: usize,
    export: Option<String>,
    curser_row: usize,
    curser_column: usize,
    offset_row: usize,
    offset_column: usize,
    visible_columns: Vec<usize>,
    show_index: bool,
    show_popup: bool,
    popup_message: String,
    uilayout: UILayout,
    uidata: UIData,
    input: Inputter,
    active_cmdinput: bool,
    status_message: String,
}

impl Model {
    pub fn init(config: &ViewerConfig, ui_width: usize, ui_height: usize) -> Self {
        let mut model = Self {
            config: config.clone(),
            status: Status::EMPTY,
            loader: Loader::new(),
            table_name: String::new(),
            grid: Vec::new(),
            nrows: 0,
            export: None,
            curser_row: 0,
            curser_column: 0,
            offset_row: 0,
            offset_column: 0,
            visible_columns: Vec::new(),
            show_index: true,
            show_popup: false,
            popup_message: String::new(),
            uilayout: UILayout::from_values(0, ui_width, ui_height),
            uidata: UIData::empty(),
            input: Inputter::default(),
            active_cmdinput: false,
            status_message: "No file loaded, press <o> to open one".to_string(),
        };
        model.update_table_data();
        model
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    /// One full pass for an opened file: load, validate, format, prepare the
    /// export payload. Any failure clears the view, lands on the status line
    /// and leaves the viewer waiting for the next file.
    pub fn open_file(&mut self, path: PathBuf) {
        info!("Opening {:?}", path);
        match self.run_pass(&path) {
            Ok(()) => {}
            Err(e) => {
                warn!("Pass for {:?} halted: {e}", path);
                self.clear_table();
                self.status_message = e.to_string();
            }
        }
        self.update_table_data();
    }

    fn run_pass(&mut self, path: &Path) -> Result<(), ViewerError> {
        let frame = self.loader.load(path)?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();
        self.ingest(&frame, &name)
    }

    fn ingest(&mut self, frame: &DataFrame, name: &str) -> Result<(), ViewerError> {
        schema::validate(frame)?;
        let projected = display::project(frame)?;

        let grid: Result<Vec<GridColumn>, ViewerError> = projected
            .get_columns()
            .par_iter()
            .map(|column| {
                let spec = display::column_spec(column.name().as_str())
                    .ok_or_else(|| ViewerError::ColumnNotFound(column.name().to_string()))?;
                let cells = display::format_cells(column, &spec.kind)?;
                let max_width = cells
                    .iter()
                    .map(|c| c.chars().count())
                    .max()
                    .unwrap_or(0)
                    .max(spec.label.chars().count());
                Ok(GridColumn {
                    label: spec.label.to_string(),
                    max_width,
                    render_width: 0,
                    cells,
                })
            })
            .collect();

        self.grid = grid?;
        self.nrows = frame.height();
        self.table_name = name.to_string();
        self.curser_row = 0;
        self.curser_column = 0;
        self.offset_row = 0;
        self.offset_column = 0;
        self.status = Status::READY;
        self.status_message = format!("Loaded {} rows from {}", self.nrows, name);
        debug!("Ingested {} rows from '{}'", self.nrows, name);

        // Validation already guarantees the username column, but the exporter
        // checks for itself; a disagreement surfaces as a status message
        // instead of tearing down the rendered table.
        match export::profile_urls(frame) {
            Ok(payload) => self.export = Some(payload),
            Err(e) => {
                self.export = None;
                self.status_message = e.to_string();
            }
        }
        Ok(())
    }

    fn clear_table(&mut self) {
        self.grid.clear();
        self.nrows = 0;
        self.export = None;
        self.table_name.clear();
        self.curser_row = 0;
        self.curser_column = 0;
        self.offset_row = 0;
        self.offset_column = 0;
        self.visible_columns.clear();
        self.status = Status::EMPTY;
    }

    pub fn update(&mut self, message: Message) -> Result<(), ViewerError> {
        // A popup swallows everything except closing, resizing and quitting
        if self.show_popup
            && !matches!(
                message,
                Message::Exit | Message::Quit | Message::Help | Message::Resize(_, _)
            )
        {
            return Ok(());
        }

        match message {
            Message::Quit => self.quit(),
            Message::Exit => self.exit(),
            Message::Help => self.show_help(),
            Message::Resize(width, height) => self.ui_resize(width, height),
            Message::OpenFile => self.enter_prompt(),
            Message::RawKey(key) => self.raw_input(key),
            Message::Export => self.save_export(),
            Message::CopyCell => self.copy_cell(),
            Message::CopyRow => self.copy_row(),
            Message::ToggleIndex => self.toggle_index(),
            Message::MoveUp => self.move_selection_up(1),
            Message::MoveDown => self.move_selection_down(1),
            Message::MovePageUp => self.move_selection_up(self.uilayout.table_height.max(1)),
            Message::MovePageDown => self.move_selection_down(self.uilayout.table_height.max(1)),
            Message::MoveBeginning => self.select_row(0),
            Message::MoveEnd => self.select_row(self.nrows.saturating_sub(1)),
            Message::MoveLeft => self.move_selection_left(),
            Message::MoveRight => self.move_selection_right(),
        }
        Ok(())
    }

    // ------------------------- view bookkeeping -------------------------- //

    fn index_width(&self) -> usize {
        if self.show_index && self.nrows > 0 {
            self.nrows.to_string().len() + 1
        } else {
            0
        }
    }

    // Rebuilds UIData from the current state; every mutation funnels through
    // here so the UI always draws a consistent snapshot.
    fn update_table_data(&mut self) {
        self.uilayout =
            UILayout::from_values(self.index_width(), self.uilayout.width, self.uilayout.height);

        let mut table = Vec::new();
        let mut index = ColumnView::empty();
        let rbegin = self.offset_row;
        let rend = std::cmp::min(rbegin + self.uilayout.table_height, self.nrows);

        if !self.grid.is_empty() && rend > rbegin {
            // Cap each column at the configured width
            for column in self.grid.iter_mut() {
                column.render_width = std::cmp::min(
                    column.max_width + COLUMN_WIDTH_MARGIN,
                    self.config.max_column_width,
                );
            }

            // Collect the columns that fit, allowing one partial column at
            // the right edge
            self.visible_columns.clear();
            let mut used = 0;
            for (cidx, column) in self.grid[self.offset_column..].iter_mut().enumerate() {
                if used + column.render_width + 1 <= self.uilayout.table_width {
                    self.visible_columns.push(cidx + self.offset_column);
                    used += column.render_width + 1;
                } else {
                    if used < self.uilayout.table_width {
                        column.render_width = self.uilayout.table_width - used;
                        self.visible_columns.push(cidx + self.offset_column);
                    }
                    break;
                }
            }
            if self.visible_columns.is_empty() {
                self.visible_columns.push(self.offset_column);
            }
            self.curser_column =
                std::cmp::min(self.curser_column, self.visible_columns.len() - 1);
            self.curser_row = std::cmp::min(self.curser_row, rend - rbegin - 1);

            for &idx in self.visible_columns.iter() {
                let column = &self.grid[idx];
                table.push(ColumnView {
                    name: visible_name(&column.label, column.render_width),
                    width: column.render_width,
                    data: column.cells[rbegin..rend].to_vec(),
                });
            }

            if self.show_index {
                index = ColumnView {
                    name: String::new(),
                    width: self.uilayout.index_width,
                    data: (rbegin..rend).map(|i| (i + 1).to_string()).collect(),
                };
            }
        }

        self.uidata = UIData {
            name: self.table_name.clone(),
            table,
            index,
            show_index: self.show_index && self.nrows > 0,
            nrows: self.nrows,
            selected_row: self.curser_row,
            selected_column: self.curser_column,
            abs_selected_row: self.offset_row + self.curser_row,
            show_popup: self.show_popup,
            popup_message: self.popup_message.clone(),
            layout: self.uilayout.clone(),
            cmdinput: self.input.get(),
            active_cmdinput: self.active_cmdinput,
            export_ready: self.export.is_some(),
            status_message: self.status_message.clone(),
            last_update: Instant::now(),
        };
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(self.index_width(), width, height);
        self.update_table_data();
    }

    // --------------------------- interaction ----------------------------- //

    fn show_help(&mut self) {
        self.show_popup = true;
        self.popup_message = HELP_TEXT.to_string();
        self.update_table_data();
    }

    fn exit(&mut self) {
        if self.show_popup {
            self.show_popup = false;
            self.popup_message.clear();
        } else if self.active_cmdinput {
            self.active_cmdinput = false;
            self.input.clear();
        }
        self.update_table_data();
    }

    fn enter_prompt(&mut self) {
        trace!("Entering open-file prompt ...");
        self.input.clear();
        self.active_cmdinput = true;
        self.update_table_data();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if !self.active_cmdinput {
            return;
        }
        let result = self.input.read(key);
        if result.finished {
            self.active_cmdinput = false;
            self.input.clear();
            if !result.canceled && !result.input.is_empty() {
                self.open_path(&result.input);
                return;
            }
        }
        self.update_table_data();
    }

    fn open_path(&mut self, raw: &str) {
        match shellexpand::full(raw) {
            Ok(expanded) => self.open_file(PathBuf::from(expanded.as_ref())),
            Err(e) => {
                self.status_message = format!("Failed to expand path: {e}");
                self.update_table_data();
            }
        }
    }

    fn save_export(&mut self) {
        match &self.export {
            Some(payload) => {
                match export::save(Path::new(EXPORT_FILE_NAME), payload) {
                    Ok(count) => {
                        self.status_message =
                            format!("Wrote {count} profile urls to {EXPORT_FILE_NAME}");
                    }
                    Err(e) => self.status_message = format!("Export failed: {e}"),
                }
            }
            None => {
                self.status_message = "Nothing to export, open a valid file first".to_string();
            }
        }
        self.update_table_data();
    }

    fn current_cell(&self) -> Option<String> {
        let column = self.grid.get(*self.visible_columns.get(self.curser_column)?)?;
        column.cells.get(self.offset_row + self.curser_row).cloned()
    }

    fn copy_cell(&mut self) {
        let Some(cell) = self.current_cell() else {
            return;
        };
        self.copy_to_clipboard(cell);
    }

    fn copy_row(&mut self) {
        if self.grid.is_empty() {
            return;
        }
        let row = self.offset_row + self.curser_row;
        let content: Vec<String> = self
            .grid
            .iter()
            .filter_map(|c| c.cells.get(row))
            .map(|c| wrap_cell_content(c))
            .collect();
        self.copy_to_clipboard(content.join(","));
    }

    fn copy_to_clipboard(&mut self, content: String) {
        trace!("Cell content: {}", content);
        match Clipboard::new().and_then(|mut clipboard| clipboard.set_text(content)) {
            Ok(_) => self.status_message = "Copied to clipboard".to_string(),
            Err(e) => self.status_message = format!("Clipboard error: {e}"),
        }
        self.update_table_data();
    }

    fn toggle_index(&mut self) {
        self.show_index = !self.show_index;
        self.update_table_data();
    }

    // ---------------------------- movement -------------------------------- //

    fn select_row(&mut self, row: usize) {
        if self.nrows == 0 {
            return;
        }
        let row = std::cmp::min(row, self.nrows - 1);
        let height = self.uilayout.table_height.max(1);
        if row < self.offset_row {
            self.offset_row = row;
            self.curser_row = 0;
        } else if row >= self.offset_row + height {
            self.offset_row = row + 1 - height;
            self.curser_row = height - 1;
        } else {
            self.curser_row = row - self.offset_row;
        }
        self.update_table_data();
    }

    fn move_selection_up(&mut self, size: usize) {
        if self.nrows == 0 {
            return;
        }
        let current = self.offset_row + self.curser_row;
        self.select_row(current.saturating_sub(size));
    }

    fn move_selection_down(&mut self, size: usize) {
        if self.nrows == 0 {
            return;
        }
        self.select_row(self.offset_row + self.curser_row + size);
    }

    fn move_selection_left(&mut self) {
        if self.curser_column > 0 {
            self.curser_column -= 1;
        } else if self.offset_column > 0 {
            self.offset_column -= 1;
        }
        self.update_table_data();
    }

    fn move_selection_right(&mut self) {
        if self.grid.is_empty() {
            return;
        }
        if self.curser_column + 1 < self.visible_columns.len() {
            self.curser_column += 1;
        } else if self.offset_column + self.visible_columns.len() < self.grid.len() {
            self.offset_column += 1;
        }
        self.update_table_data();
    }
}

fn visible_name(name: &str, width: usize) -> String {
    if width < 3 {
        return String::new();
    }
    if name.chars().count() > width {
        let mut reduced: String = name.chars().take(width - 3).collect();
        reduced.push_str("...");
        reduced
    } else {
        name.to_string()
    }
}

fn wrap_cell_content(cell: &str) -> String {
    let needs_escaping = cell.contains('"');
    let needs_wrapping = cell.chars().any(|c| c == ' ' || c == '\t' || c == ',');
    let mut out = String::from(cell);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping {
        out = format!("\"{out}\"");
    }
    out
}
