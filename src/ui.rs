use crate::app::App;
use crate::interaction::{format_count, place_tooltip, tooltip_lines};
use crate::layout::{about_panel, FilterTarget, ABOUT_LABEL};
use crate::map::color::{ramp, HIGHLIGHT, NO_DATA};
use crate::map::{ChoroplethMap, Fill};
use crate::timeline::{TimelineChart, YearScale};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
    Frame,
};

const TITLE: &str = "Global Whale Catches";
const FRAME_COLOR: Color = Color::DarkGray;
const CURVE_COLOR: Color = Color::Cyan;
const BORDER_GLYPH_COLOR: Color = Color::Gray;
const SCRUBBER_BG: Color = Color::Rgb(48, 48, 48);
const LEGEND_STEPS: u16 = 16;
const HELP: &str = " ←/→:year Home/End a:all 1-9:species Tab/Space:pick ?:about q:quit";

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    render_header(frame, app);
    render_filters(frame, app);
    render_timeline(frame, app);
    render_map(frame, app);
    render_legend(frame, app);
    render_status_bar(frame, app);
    render_tooltip(frame, app);
    if app.show_about {
        render_about(frame, app);
    }
}

fn render_header(frame: &mut Frame, app: &App) {
    let layout = &app.layout;
    let mut spans = vec![Span::styled(
        format!(" {TITLE} "),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    if !app.dataset.source.is_empty() {
        spans.push(Span::styled(
            format!("· {}", app.dataset.source),
            Style::default().fg(FRAME_COLOR),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), layout.header);

    let about_style = if app.show_about {
        Style::default().fg(Color::Black).bg(Color::Yellow)
    } else {
        Style::default().fg(Color::Yellow)
    };
    frame.render_widget(Paragraph::new(Span::styled(ABOUT_LABEL, about_style)), layout.about_button);
}

fn render_filters(frame: &mut Frame, app: &App) {
    let filter = &app.state.selected_species;
    for button in &app.layout.buttons {
        let active = match button.target {
            FilterTarget::All => filter.is_all(),
            FilterTarget::Species(idx) => app
                .dataset
                .species
                .get(idx)
                .is_some_and(|s| filter.contains(&s.code)),
        };
        let mut style = if active {
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray).bg(Color::Rgb(40, 40, 40))
        };
        if matches!(button.target, FilterTarget::Species(idx) if app.focused_species() == Some(idx)) {
            style = style.add_modifier(Modifier::UNDERLINED | Modifier::REVERSED);
        }
        let label = Paragraph::new(format!(" {} ", button.label)).style(style);
        frame.render_widget(label, button.rect);
    }
}

fn render_timeline(frame: &mut Frame, app: &App) {
    let layout = &app.layout;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(FRAME_COLOR))
        .title(Span::styled(
            " Whales caught per year ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    frame.render_widget(block, layout.timeline);

    let scale = app.year_scale();
    let chart = TimelineChart::draw(
        &scale,
        layout.timeline_plot.height,
        &app.snapshot().global,
        app.interaction.overlay(),
    );

    let axis = &layout.timeline_axis;
    if axis.height > 0 {
        let label_style = Style::default().fg(FRAME_COLOR);
        let top = Rect::new(axis.x, axis.y, axis.width.saturating_sub(1), 1);
        let bottom = Rect::new(axis.x, axis.bottom() - 1, axis.width.saturating_sub(1), 1);
        frame.render_widget(
            Paragraph::new(compact_count(chart.max)).style(label_style).alignment(Alignment::Right),
            top,
        );
        frame.render_widget(Paragraph::new("0").style(label_style).alignment(Alignment::Right), bottom);
    }

    frame.render_widget(
        TimelineWidget {
            chart: &chart,
            scale,
            year: app.state.current_year(),
        },
        layout.timeline_plot,
    );
    frame.render_widget(
        HandleWidget {
            scale,
            year: app.state.current_year(),
            range: app.state.year_range(),
        },
        layout.timeline_handle,
    );
}

/// Curve, hover overlay and scrubber column
struct TimelineWidget<'a> {
    chart: &'a TimelineChart,
    scale: YearScale,
    year: i32,
}

impl Widget for TimelineWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let scrubber = self.scale.column_for(self.year);
        for row in 0..area.height {
            for col in 0..area.width {
                let Some(cell) = buf.cell_mut(Position::new(area.x + col, area.y + row)) else {
                    continue;
                };
                let (cx, cy) = (col as usize, row as usize);
                if area.x + col == scrubber {
                    cell.set_bg(SCRUBBER_BG);
                }
                // Overlay wins where both curves touch a cell
                let overlay = self.chart.overlay.as_ref().and_then(|c| c.glyph(cx, cy));
                if let Some(ch) = overlay {
                    cell.set_char(ch).set_fg(HIGHLIGHT);
                } else if let Some(ch) = self.chart.base.glyph(cx, cy) {
                    cell.set_char(ch).set_fg(CURVE_COLOR);
                }
            }
        }
    }
}

/// Row under the plot: range ends and the ▲ handle with the current year
struct HandleWidget {
    scale: YearScale,
    year: i32,
    range: (i32, i32),
}

impl Widget for HandleWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.is_empty() {
            return;
        }
        let dim = Style::default().fg(FRAME_COLOR);
        let first = self.range.0.to_string();
        let last = self.range.1.to_string();
        put(buf, area, area.x, &first, dim);
        put(buf, area, area.right().saturating_sub(last.len() as u16), &last, dim);

        let handle = self.scale.column_for(self.year);
        let style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
        let label = format!("▲ {}", self.year);
        let width = label.chars().count() as u16;
        // The ▲ stays on the year's column; the label flips left near the end
        if handle + width <= area.right() {
            put(buf, area, handle, &label, style);
        } else {
            let flipped = format!("{} ▲", self.year);
            put(buf, area, (handle + 1).saturating_sub(width), &flipped, style);
        }
    }
}

/// Write `text` on the first row of `area`, cut at its right edge
fn put(buf: &mut Buffer, area: Rect, x: u16, text: &str, style: Style) {
    let area = area.intersection(buf.area);
    if area.is_empty() || x < area.x || x >= area.right() {
        return;
    }
    buf.set_stringn(x, area.y, text, (area.right() - x) as usize, style);
}

fn render_map(frame: &mut Frame, app: &App) {
    let layout = &app.layout;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(FRAME_COLOR))
        .title(Span::styled(
            format!(" Catches by country, {} ", app.state.current_year()),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    frame.render_widget(block, layout.map);

    match app.map() {
        Some(map) => frame.render_widget(
            MapWidget {
                map,
                fills: &app.snapshot().fills,
                highlight: &app.snapshot().highlight,
            },
            layout.map_inner,
        ),
        None => {
            let reason = app.map_error().unwrap_or("no outline loaded");
            let text = vec![
                Line::from(Span::styled("Map unavailable", Style::default().fg(Color::Yellow))),
                Line::from(Span::styled(reason.to_string(), Style::default().fg(FRAME_COLOR))),
                Line::from(Span::styled(
                    "The timeline and filters still work.",
                    Style::default().fg(FRAME_COLOR),
                )),
            ];
            let placeholder = Paragraph::new(text)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
            let inner = layout.map_inner;
            let y = inner.y + inner.height.saturating_sub(3) / 2;
            frame.render_widget(placeholder, Rect::new(inner.x, y, inner.width, inner.bottom().saturating_sub(y)));
        }
    }
}

/// Choropleth cells with country borders drawn on top
struct MapWidget<'a> {
    map: &'a ChoroplethMap,
    fills: &'a [Fill],
    highlight: &'a [bool],
}

impl Widget for MapWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // The raster can lag the panel while a resize settles
        let (cols, rows) = self.map.size();
        let cols = cols.min(area.width as usize);
        let rows = rows.min(area.height as usize);

        for row in 0..rows {
            for col in 0..cols {
                let Some(cell) = buf.cell_mut(Position::new(area.x + col as u16, area.y + row as u16)) else {
                    continue;
                };
                if let Some(idx) = self.map.owner(col, row) {
                    let bg = if self.highlight.get(idx).copied().unwrap_or(false) {
                        HIGHLIGHT
                    } else {
                        match self.fills.get(idx) {
                            Some(Fill::Value { color, .. }) => *color,
                            _ => NO_DATA,
                        }
                    };
                    cell.set_bg(bg);
                }
                if let Some(ch) = self.map.border_glyph(col, row) {
                    cell.set_char(ch).set_fg(BORDER_GLYPH_COLOR);
                }
            }
        }
    }
}

fn render_legend(frame: &mut Frame, app: &App) {
    let snapshot = app.snapshot();
    let max = snapshot.aggregate.max_value();

    let mut spans = vec![Span::styled(" 0 ", Style::default().fg(FRAME_COLOR))];
    for step in 0..LEGEND_STEPS {
        let t = step as f64 / (LEGEND_STEPS - 1) as f64;
        spans.push(Span::styled(" ", Style::default().bg(ramp(t))));
    }
    spans.push(Span::styled(
        format!(" {}  ", format_count(max)),
        Style::default().fg(FRAME_COLOR),
    ));
    spans.push(Span::styled("  ", Style::default().bg(NO_DATA)));
    spans.push(Span::styled(" no data", Style::default().fg(FRAME_COLOR)));
    frame.render_widget(Paragraph::new(Line::from(spans)), app.layout.legend);

    let stats = Line::from(vec![
        Span::styled("Whales caught: ", Style::default().fg(FRAME_COLOR)),
        Span::styled(
            format_count(snapshot.year_total),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::styled("  Year: ", Style::default().fg(FRAME_COLOR)),
        Span::styled(
            app.state.current_year().to_string(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
    ]);
    frame.render_widget(Paragraph::new(stats).alignment(Alignment::Right), app.layout.legend);
}

fn render_status_bar(frame: &mut Frame, app: &App) {
    let filter = &app.state.selected_species;
    let showing = if filter.is_all() {
        "all species".to_string()
    } else {
        filter
            .iter()
            .map(|code| app.dataset.species.name_of(code))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let status = Line::from(vec![
        Span::styled(" Showing: ", Style::default().fg(FRAME_COLOR)),
        Span::styled(showing, Style::default().fg(Color::Cyan)),
        Span::styled(" |", Style::default().fg(FRAME_COLOR)),
        Span::styled(HELP, Style::default().fg(FRAME_COLOR)),
    ]);
    frame.render_widget(Paragraph::new(status), app.layout.status);
}

fn render_tooltip(frame: &mut Frame, app: &App) {
    let Some(breakdown) = app.interaction.tooltip() else {
        return;
    };
    let lines = tooltip_lines(breakdown);
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 4;
    let height = lines.len() as u16 + 2;
    let rect = place_tooltip(app.interaction.pointer(), (width, height), app.layout.area);

    let mut text: Vec<Line> = Vec::with_capacity(lines.len());
    for (idx, line) in lines.into_iter().enumerate() {
        let style = match idx {
            0 => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            1 => Style::default().fg(Color::White),
            _ => Style::default().fg(Color::Gray),
        };
        text.push(Line::from(Span::styled(format!(" {line}"), style)));
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(HIGHLIGHT));

    frame.render_widget(Clear, rect);
    frame.render_widget(Paragraph::new(text).block(block), rect);
}

fn render_about(frame: &mut Frame, app: &App) {
    let panel = about_panel(app.layout.area);
    let label = Style::default().fg(FRAME_COLOR);
    let value = Style::default().fg(Color::White);
    let (first, last) = app.state.year_range();

    let text = vec![
        Line::from(Span::styled(TITLE, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from(Span::styled(
            "Whales caught per country and year. Darker countries caught more \
             in the selected year; scrub the timeline or pick species to explore.",
            value,
        )),
        Line::from(""),
        Line::from(vec![Span::styled("Source: ", label), Span::styled(app.dataset.source.clone(), value)]),
        Line::from(vec![Span::styled("URL:    ", label), Span::styled(app.dataset.url.clone(), value)]),
        Line::from(vec![
            Span::styled("Years:  ", label),
            Span::styled(format!("{first}-{last}"), value),
        ]),
        Line::from(vec![
            Span::styled("Species:", label),
            Span::styled(format!(" {}", app.dataset.species.len()), value),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Greenland and the Faroe Islands are shown with Denmark.",
            label,
        )),
        Line::from(""),
        Line::from(Span::styled("Esc, ? or a click outside closes this panel", label)),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(" About ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)));

    frame.render_widget(Clear, panel);
    frame.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: true }), panel);
}

/// Full-screen panel shown when the dataset cannot be loaded
pub fn render_fatal(frame: &mut Frame, message: &str) {
    let area = frame.area();
    let hint = Style::default().fg(Color::Gray);
    let text = vec![
        Line::from(Span::styled(
            "The whaling dataset could not be loaded.",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(message.to_string(), Style::default().fg(Color::White))),
        Line::from(""),
        Line::from(Span::styled("Things to check:", hint)),
        Line::from(Span::styled("  • the --data path points at the preprocessed JSON file", hint)),
        Line::from(Span::styled("  • re-run the data preprocessing step to regenerate it", hint)),
        Line::from(Span::styled(
            "  • the file is valid JSON with metadata, timeline and byCountryYear",
            hint,
        )),
        Line::from(""),
        Line::from(Span::styled("Press q or Esc to exit", Style::default().fg(FRAME_COLOR))),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(Span::styled(" Error ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)));
    frame.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: false }), area);
}

/// Short axis label: 1234 -> "1.2k", 2500000 -> "2.5M"
fn compact_count(n: u64) -> String {
    match n {
        0..=999 => n.to_string(),
        1_000..=999_999 => format!("{:.1}k", n as f64 / 1_000.0),
        _ => format!("{:.1}M", n as f64 / 1_000_000.0),
    }
}
