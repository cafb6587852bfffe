use rand::Rng;

use crate::vocab::Vocabulary;

/// One glyph on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub ch: char,
    pub x: i32,
    pub y: i32,
}

/// One vertical run of characters at a fixed x. Maps 1:1 to a transcript line.
#[derive(Clone, Debug)]
pub struct Column {
    pub text: String,
    pub x: i32,
    pub placements: Vec<Placement>,
}

/// Columns in right-to-left order, as rendered and as transcribed.
#[derive(Clone, Debug)]
pub struct Layout {
    pub columns: Vec<Column>,
}

impl Layout {
    /// Newline-joined column strings, right-to-left column order.
    pub fn transcript(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Fraction of the glyph size that a column may not cross on the left edge.
const LEFT_MARGIN_FACTOR: f64 = 0.3;
/// Column pitch as a fraction of the glyph size.
const LINE_SPACING_FACTOR: f64 = 1.1;
/// Probability of the sparse branch of the per-column character-count policy.
const SPARSE_COLUMN_PROBABILITY: f64 = 0.6;

/// Plan vertical right-to-left columns over a `width` x `height` canvas for
/// glyphs of `size` pixels.
///
/// Geometry:
/// - a random start offset pads the first column in from the right edge and
///   offsets each column's first glyph vertically;
/// - `floor(width / size) - 1` columns are planned, but the loop stops early
///   once the next column would cross the left margin;
/// - per column, the character count is either uniform over the full range
///   or biased into the upper quartile, so columns read as sparse or nearly
///   full rather than uniformly medium.
///
/// A column is always recorded before the stop condition is evaluated, so the
/// last column may sit partly in the margin; transcript and placements stay
/// in lockstep either way.
pub fn plan_layout(
    width: u32,
    height: u32,
    size: u32,
    vocab: &Vocabulary,
    rng: &mut impl Rng,
) -> Layout {
    let size = size.max(1);
    let min_dim = width.min(height);

    let start_offset = rng.gen_range(size + min_dim / 100..=size + min_dim / 20);
    let planned_columns = (width / size).saturating_sub(1);
    let rows = height / size;
    let max_chars = rows.saturating_sub(1).max(1);

    let spacing = f64::from(size) * LINE_SPACING_FACTOR;
    let left_margin = f64::from(size) * LEFT_MARGIN_FACTOR;
    let mut x_position = f64::from(width) - f64::from(start_offset);

    let mut columns = Vec::with_capacity(planned_columns as usize);
    for _ in 0..planned_columns {
        let char_count = if rng.gen_bool(SPARSE_COLUMN_PROBABILITY) {
            rng.gen_range(1..=max_chars)
        } else {
            let lo = (rows * 3 / 4).saturating_sub(1).clamp(1, max_chars);
            rng.gen_range(lo..=max_chars)
        };

        let col_x = x_position as i32;
        let mut y = start_offset as i32 - size as i32
            + rng.gen_range(1..=(size / 2).max(1)) as i32;

        let mut text = String::with_capacity(char_count as usize);
        let mut placements = Vec::with_capacity(char_count as usize);
        for _ in 0..char_count {
            let ch = vocab.sample(rng);
            text.push(ch);
            placements.push(Placement { ch, x: col_x, y });
            y += size as i32;
        }

        columns.push(Column { text, x: col_x, placements });

        x_position -= spacing;
        if x_position < left_margin {
            break;
        }
    }

    Layout { columns }
}
