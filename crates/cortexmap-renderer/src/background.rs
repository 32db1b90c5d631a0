use serde::{Deserialize, Serialize};

use cortexmap_core::error::{check_len, Result};
use cortexmap_core::Rgba;

/// Per-vertex background class, ordered by priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundClass {
    #[default]
    Default,
    Sulcus,
    Masked,
}

impl BackgroundClass {
    /// Row of the background color table.
    pub fn table_row(self) -> u32 {
        match self {
            BackgroundClass::Default => 0,
            BackgroundClass::Masked => 1,
            BackgroundClass::Sulcus => 2,
        }
    }
}

/// Background classes of every vertex and the 3-row color table they index.
///
/// Marking only ever raises a vertex's class; [`Background::reset`] is the
/// only way back to default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Background {
    classes: Vec<BackgroundClass>,
    table: [Rgba; 3],
}

impl Background {
    pub fn new(n_vertices: usize, default_color: Rgba, mask_color: Rgba, sulcus_color: Rgba) -> Self {
        Self {
            classes: vec![BackgroundClass::Default; n_vertices],
            table: [default_color, mask_color, sulcus_color],
        }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Mark the flagged vertices as sulcus. Returns the vertices whose class
    /// changed.
    pub fn mark_sulcus(&mut self, flags: &[bool]) -> Result<Vec<usize>> {
        self.raise(flags, BackgroundClass::Sulcus)
    }

    /// Mark the flagged vertices as masked. Returns the vertices whose class
    /// changed.
    pub fn mark_masked(&mut self, flags: &[bool]) -> Result<Vec<usize>> {
        self.raise(flags, BackgroundClass::Masked)
    }

    fn raise(&mut self, flags: &[bool], class: BackgroundClass) -> Result<Vec<usize>> {
        check_len("background flags", self.classes.len(), flags.len())?;
        let mut changed = Vec::new();
        for (v, (current, &flag)) in self.classes.iter_mut().zip(flags).enumerate() {
            if flag && class > *current {
                *current = class;
                changed.push(v);
            }
        }
        Ok(changed)
    }

    pub fn reset(&mut self) {
        self.classes.fill(BackgroundClass::Default);
    }

    pub fn class(&self, vertex: usize) -> Option<BackgroundClass> {
        self.classes.get(vertex).copied()
    }

    pub fn color(&self, vertex: usize) -> Option<Rgba> {
        self.class(vertex).map(|c| self.row_color(c))
    }

    /// Background color of every vertex.
    pub fn colors(&self) -> Vec<Rgba> {
        self.classes.iter().map(|&c| self.row_color(c)).collect()
    }

    fn row_color(&self, class: BackgroundClass) -> Rgba {
        self.table[class.table_row() as usize]
    }

    pub fn table(&self) -> &[Rgba; 3] {
        &self.table
    }

    pub fn set_default_color(&mut self, color: Rgba) {
        self.table[BackgroundClass::Default.table_row() as usize] = color;
    }

    pub fn set_mask_color(&mut self, color: Rgba) {
        self.table[BackgroundClass::Masked.table_row() as usize] = color;
    }

    pub fn set_sulcus_color(&mut self, color: Rgba) {
        self.table[BackgroundClass::Sulcus.table_row() as usize] = color;
    }

    /// Table row of every vertex, as uploaded to the GPU.
    pub fn rows(&self) -> Vec<u32> {
        self.classes.iter().map(|c| c.table_row()).collect()
    }
}
