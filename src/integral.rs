//! Zero-bordered integral image of the vote grid.

/// Integral image of a grid padded with `border` zero cells on every side.
///
/// Entry `(row, col)` holds the sum of all padded cells above and left of it, so the
/// sum of the `(2 * border + 1)²` window centered at grid cell `(r, c)` needs four
/// lookups starting at integral position `(r, c)`.
#[derive(Clone, Debug)]
pub struct BorderedIntegral {
    width: usize,
    border: usize,
    data: Vec<u64>,
}

impl BorderedIntegral {
    /// Builds the integral of a row-major `grid` with `grid_width` columns.
    pub fn new(grid: &[u32], grid_width: usize, border: usize) -> Self {
        debug_assert!(grid_width > 0 && grid.len() % grid_width == 0);
        let grid_height = grid.len() / grid_width;

        let width = grid_width + 2 * border + 1;
        let height = grid_height + 2 * border + 1;
        let mut data = vec![0u64; width * height];

        for row in 1..height {
            let mut row_sum = 0u64;
            for col in 1..width {
                let (grid_row, grid_col) = (row - 1, col - 1);
                if grid_row >= border && grid_row < border + grid_height && grid_col >= border && grid_col < border + grid_width {
                    row_sum += grid[(grid_row - border) * grid_width + grid_col - border] as u64;
                }
                data[row * width + col] = data[(row - 1) * width + col] + row_sum;
            }
        }

        Self { width, border, data }
    }

    /// Sum of the window of size `2 * border + 1` centered at grid cell `(row, col)`.
    pub fn window_sum(&self, row: usize, col: usize) -> u64 {
        let window = 2 * self.border + 1;
        let top = row * self.width + col;
        let bottom = (row + window) * self.width + col;
        self.data[bottom + window] + self.data[top] - self.data[top + window] - self.data[bottom]
    }

    pub fn border(&self) -> usize {
        self.border
    }
}
