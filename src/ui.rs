use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::{Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        Block, Cell, Clear, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState,
        Table, TableState,
    },
};

use crate::domain::ViewerConfig;
use crate::model::UIData;

pub const TITLE_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const STATUSLINE_HEIGHT: usize = 1;
pub const SCROLLBAR_WIDTH: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;

/// Draws UIData snapshots. All terminal output happens here; the model and
/// the components below it never touch the output surface.
pub struct TableUI {}

impl TableUI {
    pub fn new(_cfg: &ViewerConfig) -> Self {
        Self {}
    }

    pub fn draw(&self, uidata: &UIData, frame: &mut Frame) {
        let [title_area, table_area, status_area] = Layout::vertical([
            Constraint::Length(TITLE_HEIGHT as u16),
            Constraint::Min(0),
            Constraint::Length(STATUSLINE_HEIGHT as u16),
        ])
        .areas(frame.area());

        self.draw_title(uidata, frame, title_area);
        self.draw_table(uidata, frame, table_area);
        self.draw_statusline(uidata, frame, status_area);

        if uidata.show_popup {
            self.draw_popup(uidata, frame);
        }
    }

    fn draw_title(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::from(" ✨ Instagram Data Viewer ").bold()];
        if !uidata.name.is_empty() {
            spans.push(Span::from(format!("— {} ", uidata.name)).dim());
        }
        frame.render_widget(Line::from(spans), area);
    }

    fn draw_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.table.is_empty() {
            let hint = Paragraph::new(uidata.status_message.as_str())
                .centered()
                .block(Block::bordered().title(" No data "));
            frame.render_widget(hint, area);
            return;
        }

        let [index_area, data_area, scrollbar_area] = Layout::horizontal([
            Constraint::Length(uidata.layout.index_width as u16),
            Constraint::Min(0),
            Constraint::Length(SCROLLBAR_WIDTH as u16),
        ])
        .areas(area);

        if uidata.show_index {
            // Blank first line keeps the numbers aligned with the data rows
            let mut lines = vec![Line::from("")];
            for number in uidata.index.data.iter() {
                lines.push(Line::from(number.as_str()).dim());
            }
            frame.render_widget(Paragraph::new(Text::from(lines)), index_area);
        }

        let header = Row::new(
            uidata
                .table
                .iter()
                .map(|column| Cell::from(column.name.as_str()))
                .collect::<Vec<Cell>>(),
        )
        .style(Style::new().bold().underlined());

        let visible_rows = uidata.table.first().map(|c| c.data.len()).unwrap_or(0);
        let rows: Vec<Row> = (0..visible_rows)
            .map(|ridx| {
                Row::new(
                    uidata
                        .table
                        .iter()
                        .map(|column| Cell::from(column.data[ridx].as_str()))
                        .collect::<Vec<Cell>>(),
                )
            })
            .collect();

        let widths: Vec<Constraint> = uidata
            .table
            .iter()
            .map(|column| Constraint::Length(column.width as u16))
            .collect();

        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(1)
            .row_highlight_style(Style::new().reversed())
            .cell_highlight_style(Style::new().reversed().bold());

        let mut state = TableState::default();
        state.select(Some(uidata.selected_row));
        state.select_column(Some(uidata.selected_column));
        frame.render_stateful_widget(table, data_area, &mut state);

        if uidata.nrows > 0 {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight);
            let mut scrollbar_state =
                ScrollbarState::new(uidata.nrows.saturating_sub(1)).position(uidata.abs_selected_row);
            frame.render_stateful_widget(scrollbar, scrollbar_area, &mut scrollbar_state);
        }
    }

    fn draw_statusline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.active_cmdinput {
            let prompt = "Open file: ";
            let line = Line::from(vec![
                Span::from(prompt).bold(),
                Span::from(uidata.cmdinput.input.as_str()),
            ]);
            frame.render_widget(line, area);
            frame.set_cursor_position(Position::new(
                area.x + (prompt.chars().count() + uidata.cmdinput.curser_pos) as u16,
                area.y,
            ));
            return;
        }

        let mut hints = vec![
            Span::from(" Open "),
            Span::from("<o>").blue().bold(),
        ];
        if uidata.export_ready {
            hints.push(Span::from(" Export "));
            hints.push(Span::from("<e>").blue().bold());
        }
        hints.push(Span::from(" Help "));
        hints.push(Span::from("<?>").blue().bold());
        hints.push(Span::from(" Quit "));
        hints.push(Span::from("<q> ").blue().bold());
        if uidata.nrows > 0 {
            hints.push(
                Span::from(format!(" {}/{} ", uidata.abs_selected_row + 1, uidata.nrows)).dim(),
            );
        }

        frame.render_widget(Line::from(uidata.status_message.as_str()), area);
        frame.render_widget(Paragraph::new(Line::from(hints)).right_aligned(), area);
    }

    fn draw_popup(&self, uidata: &UIData, frame: &mut Frame) {
        let area = centered_rect(frame.area(), 60, 18);
        let popup = Paragraph::new(uidata.popup_message.as_str())
            .block(Block::bordered().title(" Help "));
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
