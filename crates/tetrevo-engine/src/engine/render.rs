use crate::{Grid, PieceKind, Position};

/// Owned snapshot of what a render sink needs to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFrame {
    pub grid: Grid,
    /// Absolute cells of the falling piece.
    pub piece_cells: [Position; 4],
    pub piece_kind: PieceKind,
    pub swap_slot: Option<PieceKind>,
    pub score: u32,
}

/// Outbound visualization hook.
///
/// Called after any state change the caller wants shown. Sinks never report
/// back; a sink that cannot draw simply drops the frame.
pub trait RenderSink {
    fn render(&mut self, frame: &RenderFrame);
}

impl<F> RenderSink for F
where
    F: FnMut(&RenderFrame),
{
    fn render(&mut self, frame: &RenderFrame) {
        self(frame);
    }
}

/// Sink that discards every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderSink;

impl RenderSink for NullRenderSink {
    fn render(&mut self, _frame: &RenderFrame) {}
}
