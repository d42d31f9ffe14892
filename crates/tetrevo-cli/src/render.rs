//! Text rendering of simulator frames.

use std::{fmt::Write as _, io, thread, time::Duration};

use tetrevo_engine::{Cell, Position, RenderFrame, RenderSink};

/// Writes every frame as a bordered text board.
///
/// Locked blocks use their piece letter, the falling piece uses `#`.
#[derive(Debug)]
pub struct TextRenderer<W> {
    writer: W,
    delay: Duration,
    frames: usize,
}

impl TextRenderer<io::Stderr> {
    pub fn stderr(delay: Duration) -> Self {
        Self::new(io::stderr(), delay)
    }
}

impl<W> TextRenderer<W>
where
    W: io::Write,
{
    pub fn new(writer: W, delay: Duration) -> Self {
        Self {
            writer,
            delay,
            frames: 0,
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl<W> RenderSink for TextRenderer<W>
where
    W: io::Write,
{
    fn render(&mut self, frame: &RenderFrame) {
        self.frames += 1;
        let text = format_frame(self.frames, frame);
        if self.writer.write_all(text.as_bytes()).is_err() {
            return;
        }
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }
}

pub fn format_frame(number: usize, frame: &RenderFrame) -> String {
    let grid = &frame.grid;
    let swap = frame.swap_slot.map_or('-', |kind| kind.as_char());
    let mut text = String::new();
    let _ = writeln!(
        text,
        "#{number} score: {} swap: {swap} next: {}",
        frame.score,
        frame.piece_kind.as_char()
    );
    let border = format!("+{}+", "-".repeat(grid.width()));
    let _ = writeln!(text, "{border}");
    for y in (0..grid.height()).rev() {
        text.push('|');
        for x in 0..grid.width() {
            let falling = i32::try_from(x)
                .ok()
                .zip(i32::try_from(y).ok())
                .is_some_and(|(x, y)| frame.piece_cells.contains(&Position::new(x, y)));
            text.push(match grid.cell(x, y) {
                Cell::Empty if falling => '#',
                cell => cell.as_char(),
            });
        }
        text.push_str("|\n");
    }
    let _ = writeln!(text, "{border}");
    text
}
