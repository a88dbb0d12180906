use serde::{Deserialize, Serialize};

/// Contiguous Column Major Matrix data container.
///
/// This structure borrows a dense matrix of values stored in a single contiguous memory block
/// in column-major order (Fortran-style), which allows for efficient column slicing.
/// Learners consume features through this view.
///
/// # Type Parameters
/// * `T` - The numeric type of the data (e.g., `f64`, `u16` for binned data).
pub struct Matrix<'a, T> {
    /// The raw data stored in a single slice.
    pub data: &'a [T],
    /// Indices into the data row-wise.
    pub index: Vec<usize>,
    /// Number of rows in the matrix.
    pub rows: usize,
    /// Number of columns in the matrix.
    pub cols: usize,
}

impl<'a, T> Matrix<'a, T> {
    /// Create a new Matrix.
    pub fn new(data: &'a [T], rows: usize, cols: usize) -> Self {
        Matrix {
            data,
            index: (0..rows).collect(),
            rows,
            cols,
        }
    }

    /// Get a single reference to an item in the matrix.
    ///
    /// * `i` - The ith row of the data to get.
    /// * `j` - the jth column of the data to get.
    pub fn get(&self, i: usize, j: usize) -> &T {
        &self.data[j * self.rows + i]
    }

    /// Get access to a row of the data, as an iterator.
    pub fn get_row_iter(&self, row: usize) -> std::iter::StepBy<std::iter::Skip<std::slice::Iter<'a, T>>> {
        self.data.iter().skip(row).step_by(self.rows)
    }

    /// Get an entire column in the matrix.
    ///
    /// * `col` - The index of the column to get.
    pub fn get_col(&self, col: usize) -> &[T] {
        &self.data[col * self.rows..(col + 1) * self.rows]
    }
}

impl<'a, T> Matrix<'a, T>
where
    T: Copy,
{
    /// Get a row of the data as a vector.
    pub fn get_row(&self, row: usize) -> Vec<T> {
        self.get_row_iter(row).copied().collect()
    }

    /// Copy the selected rows into a new column-major buffer.
    pub fn select_rows(&self, rows: &[usize]) -> Vec<T> {
        let mut out = Vec::with_capacity(rows.len() * self.cols);
        for col in 0..self.cols {
            let col_data = self.get_col(col);
            out.extend(rows.iter().map(|&i| col_data[i]));
        }
        out
    }

    /// Copy the matrix with one extra column appended at the end.
    pub fn append_col(&self, values: &[T]) -> Vec<T> {
        let mut out = Vec::with_capacity(self.data.len() + self.rows);
        out.extend_from_slice(&self.data[..self.rows * self.cols]);
        out.extend_from_slice(values);
        out
    }
}

/// Owned column-major feature matrix with named columns.
///
/// Produced by preprocessing and owned by the orchestrator; learners
/// borrow it through [`FeatureMatrix::view`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct FeatureMatrix {
    pub data: Vec<f64>,
    pub rows: usize,
    pub cols: usize,
    pub names: Vec<String>,
}

impl FeatureMatrix {
    /// Build from column-major data. The number of columns is taken from `names`.
    pub fn new(data: Vec<f64>, rows: usize, names: Vec<String>) -> Self {
        let cols = names.len();
        debug_assert_eq!(data.len(), rows * cols);
        FeatureMatrix { data, rows, cols, names }
    }

    /// Build from a list of named columns.
    pub fn from_columns(columns: Vec<(String, Vec<f64>)>, rows: usize) -> Self {
        let mut data = Vec::with_capacity(rows * columns.len());
        let mut names = Vec::with_capacity(columns.len());
        for (name, values) in columns {
            debug_assert_eq!(values.len(), rows);
            data.extend(values);
            names.push(name);
        }
        FeatureMatrix::new(data, rows, names)
    }

    pub fn view(&self) -> Matrix<'_, f64> {
        Matrix::new(&self.data, self.rows, self.cols)
    }

    pub fn get_col(&self, col: usize) -> &[f64] {
        &self.data[col * self.rows..(col + 1) * self.rows]
    }

    pub fn get_col_mut(&mut self, col: usize) -> &mut [f64] {
        let rows = self.rows;
        &mut self.data[col * rows..(col + 1) * rows]
    }

    pub fn get_row(&self, row: usize) -> Vec<f64> {
        self.view().get_row(row)
    }

    pub fn select_rows(&self, rows: &[usize]) -> FeatureMatrix {
        FeatureMatrix::new(self.view().select_rows(rows), rows.len(), self.names.clone())
    }

    /// First `n` rows (or all rows when there are fewer).
    pub fn head(&self, n: usize) -> FeatureMatrix {
        let idx: Vec<usize> = (0..n.min(self.rows)).collect();
        self.select_rows(&idx)
    }

    /// New matrix with an extra named column appended.
    pub fn with_column(&self, name: &str, values: &[f64]) -> FeatureMatrix {
        let mut names = self.names.clone();
        names.push(name.to_string());
        FeatureMatrix::new(self.view().append_col(values), self.rows, names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_columns() {
        let v = vec![1, 2, 3, 5, 6, 7];
        let m = Matrix::new(&v, 3, 2);
        assert_eq!(m.get_col(1), &vec![5, 6, 7]);
        assert_eq!(m.get_row(2), vec![3, 7]);
        assert_eq!(*m.get(0, 0), 1);
        assert_eq!(*m.get(1, 0), 2);
        assert_eq!(*m.get(0, 1), 5);
    }

    #[test]
    fn test_select_rows_and_append() {
        let v = vec![1.0, 2.0, 3.0, 5.0, 6.0, 7.0];
        let m = Matrix::new(&v, 3, 2);
        assert_eq!(m.select_rows(&[2, 0]), vec![3.0, 1.0, 7.0, 5.0]);
        assert_eq!(m.append_col(&[0.0, 1.0, 0.0]), vec![1.0, 2.0, 3.0, 5.0, 6.0, 7.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_feature_matrix() {
        let fm = FeatureMatrix::from_columns(
            vec![("a".to_string(), vec![1.0, 2.0]), ("b".to_string(), vec![3.0, 4.0])],
            2,
        );
        assert_eq!(fm.cols, 2);
        assert_eq!(fm.get_row(1), vec![2.0, 4.0]);
        let fm2 = fm.with_column("c", &[9.0, 8.0]);
        assert_eq!(fm2.names, vec!["a", "b", "c"]);
        assert_eq!(fm2.get_col(2), &[9.0, 8.0]);
        assert_eq!(fm2.head(1).get_row(0), vec![1.0, 3.0, 9.0]);
    }
}
