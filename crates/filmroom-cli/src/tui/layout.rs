//! Column widths for the annotation view.

/// Width of the note list and of the status column.
pub const SIDE_WIDTH: u16 = 30;

/// Narrowest terminal that still gets the column view.
pub const MIN_COLUMNS_WIDTH: u16 = 80;
const THREE_COLUMNS_WIDTH: u16 = 90;
const FOUR_COLUMNS_WIDTH: u16 = 160;

/// Computed widths, left to right. Unused columns are 0.
///
/// One cell separates adjacent columns, so the widths of an `n`-column
/// layout add up to the terminal width minus `n - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    pub count: u8,
    pub widths: [u16; 4],
}

impl Columns {
    /// Single-column mini-player mode.
    pub const fn is_mini(&self) -> bool {
        self.count == 1
    }
}

pub fn compute_columns(width: u16) -> Columns {
    if width >= FOUR_COLUMNS_WIDTH {
        let rest = width - 2 * SIDE_WIDTH - 3;
        let detail = rest / 2;
        Columns {
            count: 4,
            widths: [SIDE_WIDTH, detail, rest - detail, SIDE_WIDTH],
        }
    } else if width >= THREE_COLUMNS_WIDTH {
        let rest = width - SIDE_WIDTH - 2;
        let tackles = rest / 2;
        Columns {
            count: 3,
            widths: [SIDE_WIDTH, rest - tackles, tackles, 0],
        }
    } else if width >= MIN_COLUMNS_WIDTH {
        Columns {
            count: 2,
            widths: [SIDE_WIDTH, width - SIDE_WIDTH - 1, 0, 0],
        }
    } else {
        Columns {
            count: 1,
            widths: [width, 0, 0, 0],
        }
    }
}
