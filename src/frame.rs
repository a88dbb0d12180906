//! DataFrame
//!
//! A small column oriented table of named float and string columns.
//! Floats use NaN for missing values, strings use the empty string.
use crate::errors::CausalError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Column {
    Float(Vec<f64>),
    Str(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Column::Float(_) => "float",
            Column::Str(_) => "str",
        }
    }

    pub fn as_float(&self) -> Option<&[f64]> {
        match self {
            Column::Float(v) => Some(v),
            Column::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&[String]> {
        match self {
            Column::Float(_) => None,
            Column::Str(v) => Some(v),
        }
    }

    /// Rows at the given positions, in that order.
    pub fn take(&self, indices: &[usize]) -> Column {
        match self {
            Column::Float(v) => Column::Float(indices.iter().map(|&i| v[i]).collect()),
            Column::Str(v) => Column::Str(indices.iter().map(|&i| v[i].clone()).collect()),
        }
    }

    /// String rendering of a single cell, used for label encoding.
    pub fn cell_string(&self, i: usize) -> String {
        match self {
            Column::Float(v) => v[i].to_string(),
            Column::Str(v) => v[i].clone(),
        }
    }
}

impl From<Vec<f64>> for Column {
    fn from(v: Vec<f64>) -> Self {
        Column::Float(v)
    }
}

impl From<Vec<String>> for Column {
    fn from(v: Vec<String>) -> Self {
        Column::Str(v)
    }
}

impl From<Vec<&str>> for Column {
    fn from(v: Vec<&str>) -> Self {
        Column::Str(v.into_iter().map(String::from).collect())
    }
}

/// Ordered collection of equally sized named columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataFrame {
    columns: Vec<(String, Column)>,
}

impl DataFrame {
    pub fn new() -> Self {
        DataFrame { columns: Vec::new() }
    }

    /// Add a new column, the name must be unused and the height must match.
    pub fn with_column<C: Into<Column>>(mut self, name: &str, column: C) -> Result<Self, CausalError> {
        let column = column.into();
        if self.columns.iter().any(|(n, _)| n == name) {
            return Err(CausalError::DuplicateColumn(name.to_string()));
        }
        self.check_height(name, &column)?;
        self.columns.push((name.to_string(), column));
        Ok(self)
    }

    /// Insert or replace a column.
    pub fn set_column<C: Into<Column>>(&mut self, name: &str, column: C) -> Result<(), CausalError> {
        let column = column.into();
        match self.columns.iter().position(|(n, _)| n == name) {
            Some(pos) => {
                if column.len() != self.height() {
                    return Err(CausalError::LengthMismatch(name.to_string(), self.height(), column.len()));
                }
                self.columns[pos].1 = column;
            }
            None => {
                self.check_height(name, &column)?;
                self.columns.push((name.to_string(), column));
            }
        }
        Ok(())
    }

    fn check_height(&self, name: &str, column: &Column) -> Result<(), CausalError> {
        if !self.columns.is_empty() && column.len() != self.height() {
            return Err(CausalError::LengthMismatch(name.to_string(), self.height(), column.len()));
        }
        Ok(())
    }

    pub fn column(&self, name: &str) -> Result<&Column, CausalError> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
            .ok_or_else(|| CausalError::MissingColumn(name.to_string()))
    }

    /// Float column, erroring on string columns.
    pub fn float_column(&self, name: &str) -> Result<&[f64], CausalError> {
        let col = self.column(name)?;
        col.as_float().ok_or_else(|| {
            CausalError::InvalidColumnType(name.to_string(), col.type_name().to_string(), "float".to_string())
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, |(_, c)| c.len())
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(n, c)| (n.as_str(), c))
    }

    /// New frame with only the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<DataFrame, CausalError> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            columns.push((name.to_string(), self.column(name)?.clone()));
        }
        Ok(DataFrame { columns })
    }

    /// Rows where the mask is true.
    pub fn filter(&self, mask: &[bool]) -> Result<DataFrame, CausalError> {
        if mask.len() != self.height() {
            return Err(CausalError::LengthMismatch("mask".to_string(), self.height(), mask.len()));
        }
        let indices: Vec<usize> = mask.iter().enumerate().filter(|(_, m)| **m).map(|(i, _)| i).collect();
        self.take(&indices)
    }

    /// Rows at the given positions, in that order.
    pub fn take(&self, indices: &[usize]) -> Result<DataFrame, CausalError> {
        let height = self.height();
        if let Some(bad) = indices.iter().find(|&&i| i >= height) {
            return Err(CausalError::RowOutOfRange(*bad, height));
        }
        Ok(DataFrame {
            columns: self.columns.iter().map(|(n, c)| (n.clone(), c.take(indices))).collect(),
        })
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> DataFrame {
        let indices: Vec<usize> = (0..n.min(self.height())).collect();
        DataFrame {
            columns: self.columns.iter().map(|(n, c)| (n.clone(), c.take(&indices))).collect(),
        }
    }
}
