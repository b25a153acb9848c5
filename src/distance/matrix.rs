//! Dense integer matrix for distances and durations.

use crate::models::Coordinate;

/// A dense n×n integer matrix stored in row-major order.
///
/// Built from grid coordinates with Manhattan distance, plus one trailing
/// depot row and column that stay zero.
///
/// # Examples
///
/// ```
/// use u_pdptw::models::Coordinate;
/// use u_pdptw::distance::DistanceMatrix;
///
/// let points = vec![Coordinate::new(0, 0), Coordinate::new(3, 4)];
/// let dm = DistanceMatrix::with_depot(&points);
/// assert_eq!(dm.size(), 3);
/// assert_eq!(dm.get(0, 1), 7);
/// assert_eq!(dm.get(2, 1), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceMatrix {
    data: Vec<i64>,
    size: usize,
}

impl DistanceMatrix {
    /// Creates a matrix of the given size, initialized to zero.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size * size],
            size,
        }
    }

    /// Manhattan distances between `points`, followed by a zero depot row and column.
    pub fn with_depot(points: &[Coordinate]) -> Self {
        let n = points.len();
        let mut dm = Self::new(n + 1);
        for i in 0..n {
            for j in (i + 1)..n {
                let d = points[i].manhattan(&points[j]);
                dm.set(i, j, d);
                dm.set(j, i, d);
            }
        }
        dm
    }

    /// Creates a matrix from an explicit n×n grid.
    ///
    /// Returns `None` if the data length doesn't match `size * size`.
    pub fn from_data(size: usize, data: Vec<i64>) -> Option<Self> {
        if data.len() != size * size {
            return None;
        }
        Some(Self { data, size })
    }

    /// Returns the entry from `from` to `to`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn get(&self, from: usize, to: usize) -> i64 {
        self.data[from * self.size + to]
    }

    /// Sets the entry from `from` to `to`.
    pub fn set(&mut self, from: usize, to: usize, value: i64) {
        self.data[from * self.size + to] = value;
    }

    /// Number of rows (and columns).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Largest entry, zero for an empty matrix.
    pub fn max_value(&self) -> i64 {
        self.data.iter().copied().max().unwrap_or(0)
    }

    /// Returns `true` if `m[i][j] == m[j][i]` everywhere.
    pub fn is_symmetric(&self) -> bool {
        for i in 0..self.size {
            for j in (i + 1)..self.size {
                if self.get(i, j) != self.get(j, i) {
                    return false;
                }
            }
        }
        true
    }

    /// Applies `f` to every entry except the last (depot) row and column,
    /// which stay zero.
    pub fn map_except_depot(&self, f: impl Fn(i64) -> i64) -> Self {
        let mut out = Self::new(self.size);
        let inner = self.size.saturating_sub(1);
        for i in 0..inner {
            for j in 0..inner {
                out.set(i, j, f(self.get(i, j)));
            }
        }
        out
    }
}
