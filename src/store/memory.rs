//! In-memory grid backend for tests.

use super::{CellWrite, TableBackend};
use anyhow::Result;
use std::cell::RefCell;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    grid: RefCell<Vec<Vec<String>>>,
}

impl TableBackend for MemoryBackend {
    fn header_row(&self) -> Result<Vec<String>> {
        Ok(self.grid.borrow().first().cloned().unwrap_or_default())
    }

    fn date_column(&self) -> Result<Vec<String>> {
        Ok(self
            .grid
            .borrow()
            .iter()
            .map(|row| row.first().cloned().unwrap_or_default())
            .collect())
    }

    fn row(&self, index: usize) -> Result<Vec<String>> {
        Ok(self
            .grid
            .borrow()
            .get(index.saturating_sub(1))
            .cloned()
            .unwrap_or_default())
    }

    fn append_row(&self, cells: &[String]) -> Result<()> {
        self.grid.borrow_mut().push(cells.to_vec());
        Ok(())
    }

    fn update_cells(&self, writes: &[CellWrite]) -> Result<()> {
        let mut grid = self.grid.borrow_mut();
        for write in writes {
            if grid.len() < write.row {
                grid.resize(write.row, Vec::new());
            }
            let row = &mut grid[write.row - 1];
            if row.len() < write.col {
                row.resize(write.col, String::new());
            }
            row[write.col - 1] = write.value.clone();
        }
        Ok(())
    }
}
