//! Multi-slot overlay tables and their CPU compositing rule.
//!
//! Each slot holds one column of per-vertex LUT coordinates, one column of
//! per-vertex weights and a `LUT_LEN` color table. Slots blend by weighted
//! average; they do not stack.

use serde::{Deserialize, Serialize};

use cortexmap_core::error::{check_len, Error, Result};
use cortexmap_core::{Rgba, ValueRange};

use crate::colormap::{build_lut, lut_lookup, Colormap, ColormapParams, LUT_LEN};

/// Columns allocated before any overlay is added.
pub const INITIAL_SLOTS: usize = 2;

/// Default upper bound on the number of slots.
pub const DEFAULT_CAPACITY: usize = 4;

/// Which mesh vertices an overlay writes to.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum VertexSelection {
    #[default]
    All,
    Indices(Vec<usize>),
    /// One flag per mesh vertex.
    Mask(Vec<bool>),
}

impl VertexSelection {
    /// Resolve into vertex indices, in selection order.
    pub fn resolve(&self, n_vertices: usize) -> Result<Vec<usize>> {
        let indices: Vec<usize> = match self {
            VertexSelection::All => (0..n_vertices).collect(),
            VertexSelection::Indices(indices) => {
                if let Some(&index) = indices.iter().find(|&&i| i >= n_vertices) {
                    return Err(Error::IndexOutOfBounds {
                        what: "mesh vertices",
                        index,
                        len: n_vertices,
                    });
                }
                indices.clone()
            }
            VertexSelection::Mask(mask) => {
                check_len("vertex mask", n_vertices, mask.len())?;
                mask.iter()
                    .enumerate()
                    .filter(|&(_, &m)| m)
                    .map(|(i, _)| i)
                    .collect()
            }
        };
        if indices.is_empty() {
            return Err(Error::EmptySelection);
        }
        Ok(indices)
    }
}

/// What an `add_overlay` call changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayChange {
    pub slot: usize,
    /// Sorted vertices whose coordinate or weight may have changed.
    pub vertices: Vec<usize>,
    /// `true` when a new column was appended to every table.
    pub grown: bool,
}

#[derive(Debug, Clone)]
struct OverlaySlot {
    coords: Vec<f32>,
    alphas: Vec<f32>,
    lut: Vec<Rgba>,
    range: Option<ValueRange>,
    params: Option<ColormapParams>,
    covered: Vec<usize>,
}

impl OverlaySlot {
    fn empty(n_vertices: usize) -> Self {
        Self {
            coords: vec![0.0; n_vertices],
            alphas: vec![0.0; n_vertices],
            lut: vec![Rgba::TRANSPARENT; LUT_LEN],
            range: None,
            params: None,
            covered: Vec::new(),
        }
    }
}

/// Ordered overlay slots of one mesh.
#[derive(Debug, Clone)]
pub struct OverlayStore {
    n_vertices: usize,
    capacity: usize,
    slots: Vec<OverlaySlot>,
    used: usize,
}

impl OverlayStore {
    pub fn new(n_vertices: usize, capacity: usize) -> Result<Self> {
        if capacity < INITIAL_SLOTS {
            return Err(Error::InvalidCapacity(capacity));
        }
        Ok(Self {
            n_vertices,
            capacity,
            slots: (0..INITIAL_SLOTS)
                .map(|_| OverlaySlot::empty(n_vertices))
                .collect(),
            used: 0,
        })
    }

    /// Write `values` at the selected vertices of `slot`.
    ///
    /// `None` targets the next unused slot. Writing `slot == allocated`
    /// appends one column; anything further is rejected. Inputs are fully
    /// validated before the store is touched, so an error leaves it as it was.
    pub fn add_overlay(
        &mut self,
        values: &[f32],
        selection: &VertexSelection,
        slot: Option<usize>,
        colormap: &dyn Colormap,
        params: &ColormapParams,
    ) -> Result<OverlayChange> {
        let indices = selection.resolve(self.n_vertices)?;
        check_len("overlay values", indices.len(), values.len())?;
        if !values.iter().all(|v| v.is_finite()) {
            return Err(Error::NonFinite("overlay values"));
        }
        let range = ValueRange::from_values(values).ok_or(Error::EmptySelection)?;

        let slot = slot.unwrap_or(self.used);
        let allocated = self.slots.len();
        if slot >= self.capacity {
            return Err(Error::SlotCapacity {
                requested: slot,
                capacity: self.capacity,
            });
        }
        if slot > allocated {
            return Err(Error::SlotOutOfSequence {
                requested: slot,
                allocated,
            });
        }
        let lut = build_lut(colormap, range, params)?;

        let grown = slot == allocated;
        if grown {
            self.slots.push(OverlaySlot::empty(self.n_vertices));
            log::info!("Overlay tables grown to {} slots", self.slots.len());
        }

        let column = &mut self.slots[slot];
        let mut dirty = std::mem::take(&mut column.covered);
        for &v in &dirty {
            column.coords[v] = 0.0;
            column.alphas[v] = 0.0;
        }
        for (&v, &value) in indices.iter().zip(values) {
            column.coords[v] = range.normalize(value).clamp(0.0, 1.0);
            column.alphas[v] = 1.0;
        }
        column.lut = lut;
        column.range = Some(range);
        column.params = Some(params.clone());

        let mut covered = indices;
        covered.sort_unstable();
        covered.dedup();
        dirty.extend_from_slice(&covered);
        dirty.sort_unstable();
        dirty.dedup();
        column.covered = covered;

        self.used = self.used.max(slot + 1);
        log::debug!(
            "Overlay {} written on {} vertices, range ({}, {})",
            slot,
            column.covered.len(),
            range.min,
            range.max
        );
        Ok(OverlayChange {
            slot,
            vertices: dirty,
            grown,
        })
    }

    /// Rebuild the LUT of `slot` (last used slot when `None`) from its
    /// recorded range. Coordinates and weights are left untouched.
    ///
    /// Returns `Ok(None)` when no overlay has been added yet and no slot was
    /// named.
    pub fn update_colormap(
        &mut self,
        slot: Option<usize>,
        colormap: &dyn Colormap,
        params: &ColormapParams,
    ) -> Result<Option<usize>> {
        let slot = match slot {
            Some(s) => s,
            None if self.used == 0 => return Ok(None),
            None => self.used - 1,
        };
        let range = self
            .slots
            .get(slot)
            .and_then(|s| s.range)
            .ok_or(Error::UnknownSlot(slot))?;
        let lut = build_lut(colormap, range, params)?;
        let column = &mut self.slots[slot];
        column.lut = lut;
        column.params = Some(params.clone());
        log::debug!("Colormap of overlay {} updated to '{}'", slot, params.cmap);
        Ok(Some(slot))
    }

    pub fn vertex_count(&self) -> usize {
        self.n_vertices
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Allocated columns, written or not.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// One past the highest slot ever written.
    pub fn used(&self) -> usize {
        self.used
    }

    pub fn coords(&self, slot: usize) -> Option<&[f32]> {
        self.slots.get(slot).map(|s| s.coords.as_slice())
    }

    pub fn alphas(&self, slot: usize) -> Option<&[f32]> {
        self.slots.get(slot).map(|s| s.alphas.as_slice())
    }

    pub fn lut(&self, slot: usize) -> Option<&[Rgba]> {
        self.slots.get(slot).map(|s| s.lut.as_slice())
    }

    pub fn params(&self, slot: usize) -> Option<&ColormapParams> {
        self.slots.get(slot).and_then(|s| s.params.as_ref())
    }

    pub fn data_range(&self, slot: usize) -> Option<ValueRange> {
        self.slots.get(slot).and_then(|s| s.range)
    }

    /// Data range of the last used slot.
    pub fn minmax(&self) -> Option<ValueRange> {
        self.used.checked_sub(1).and_then(|s| self.data_range(s))
    }

    /// Coordinate table, slot-major (`[slot * n_vertices + vertex]`).
    pub fn coords_table(&self) -> Vec<f32> {
        self.slots.iter().flat_map(|s| s.coords.iter().copied()).collect()
    }

    /// Weight table, slot-major.
    pub fn alphas_table(&self) -> Vec<f32> {
        self.slots.iter().flat_map(|s| s.alphas.iter().copied()).collect()
    }

    /// Every LUT, slot-major, as a `(slots, LUT_LEN)` RGBA texture.
    pub fn lut_texture(&self) -> Vec<[f32; 4]> {
        self.slots
            .iter()
            .flat_map(|s| s.lut.iter().map(Rgba::to_array))
            .collect()
    }

    /// Blend every used slot over `background` at `vertex`.
    ///
    /// `None` when `vertex` is not a vertex of the mesh.
    pub fn composite(&self, vertex: usize, background: Rgba) -> Option<Rgba> {
        (vertex < self.n_vertices).then(|| self.blend(vertex, background))
    }

    /// Caller guarantees `vertex < n_vertices`.
    pub(crate) fn blend(&self, vertex: usize, background: Rgba) -> Rgba {
        let mut acc = Rgba::TRANSPARENT;
        let mut weight = 0.0f32;
        for slot in &self.slots[..self.used] {
            let a = slot.alphas[vertex];
            if a > 0.0 {
                let c = lut_lookup(&slot.lut, slot.coords[vertex]);
                acc = Rgba::new(
                    acc.r + a * c.r,
                    acc.g + a * c.g,
                    acc.b + a * c.b,
                    acc.a + a * c.a,
                );
                weight += a;
            }
        }
        let div = weight.max(1.0);
        let overlay = Rgba::new(acc.r / div, acc.g / div, acc.b / div, acc.a / div);
        background.mix(&overlay, overlay.a)
    }

    /// [`Self::composite`] for every vertex, one background per vertex.
    pub fn composite_colors(&self, backgrounds: &[Rgba]) -> Result<Vec<Rgba>> {
        check_len("background colors", self.n_vertices, backgrounds.len())?;
        Ok(backgrounds
            .iter()
            .enumerate()
            .map(|(v, &bg)| self.blend(v, bg))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colormap::BuiltinColormap;

    fn gray() -> ColormapParams {
        ColormapParams::named("gray")
    }

    #[test]
    fn test_invalid_capacity() {
        assert_eq!(OverlayStore::new(4, 1).unwrap_err(), Error::InvalidCapacity(1));
        let store = OverlayStore::new(4, 2).unwrap();
        assert_eq!(store.slot_count(), 2);
        assert_eq!(store.used(), 0);
    }

    #[test]
    fn test_selection_resolve() {
        assert_eq!(VertexSelection::All.resolve(3).unwrap(), vec![0, 1, 2]);
        assert_eq!(
            VertexSelection::Mask(vec![true, false, true]).resolve(3).unwrap(),
            vec![0, 2]
        );
        assert_eq!(
            VertexSelection::Mask(vec![false; 3]).resolve(3).unwrap_err(),
            Error::EmptySelection
        );
        assert!(VertexSelection::Indices(vec![5]).resolve(3).unwrap_err().is_configuration());
        assert!(VertexSelection::Mask(vec![true]).resolve(3).is_err());
    }

    #[test]
    fn test_half_range_coordinate() {
        let mut store = OverlayStore::new(3, 4).unwrap();
        let change = store
            .add_overlay(
                &[0.0, 5.0, 10.0],
                &VertexSelection::All,
                None,
                &BuiltinColormap,
                &gray(),
            )
            .unwrap();
        assert_eq!(change.slot, 0);
        assert!(!change.grown);
        assert_eq!(store.coords(0).unwrap()[1], 0.5);
        assert_eq!(store.data_range(0), Some(ValueRange::new(0.0, 10.0)));
        assert_eq!(store.minmax(), Some(ValueRange::new(0.0, 10.0)));
    }

    #[test]
    fn test_uncovered_vertices_stay_zero() {
        let mut store = OverlayStore::new(4, 4).unwrap();
        store
            .add_overlay(
                &[1.0, 2.0],
                &VertexSelection::Indices(vec![1, 3]),
                None,
                &BuiltinColormap,
                &gray(),
            )
            .unwrap();
        assert_eq!(store.alphas(0).unwrap(), &[0.0, 1.0, 0.0, 1.0]);
        assert_eq!(store.coords(0).unwrap(), &[0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_add_overlay_idempotent() {
        let mut store = OverlayStore::new(3, 4).unwrap();
        let sel = VertexSelection::Indices(vec![0, 2]);
        store
            .add_overlay(&[1.0, 4.0], &sel, Some(0), &BuiltinColormap, &gray())
            .unwrap();
        let coords = store.coords_table();
        let alphas = store.alphas_table();
        let lut = store.lut_texture();
        store
            .add_overlay(&[1.0, 4.0], &sel, Some(0), &BuiltinColormap, &gray())
            .unwrap();
        assert_eq!(store.coords_table(), coords);
        assert_eq!(store.alphas_table(), alphas);
        assert_eq!(store.lut_texture(), lut);
        assert_eq!(store.used(), 1);
    }

    #[test]
    fn test_rewrite_clears_previous_coverage() {
        let mut store = OverlayStore::new(4, 4).unwrap();
        store
            .add_overlay(
                &[1.0, 2.0],
                &VertexSelection::Indices(vec![0, 1]),
                Some(0),
                &BuiltinColormap,
                &gray(),
            )
            .unwrap();
        let change = store
            .add_overlay(
                &[3.0],
                &VertexSelection::Indices(vec![2]),
                Some(0),
                &BuiltinColormap,
                &gray(),
            )
            .unwrap();
        assert_eq!(change.vertices, vec![0, 1, 2]);
        assert_eq!(store.alphas(0).unwrap(), &[0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_growth_one_slot_at_a_time() {
        let mut store = OverlayStore::new(2, 4).unwrap();
        for expected in 0..4 {
            let change = store
                .add_overlay(&[0.0, 1.0], &VertexSelection::All, None, &BuiltinColormap, &gray())
                .unwrap();
            assert_eq!(change.slot, expected);
            assert_eq!(change.grown, expected >= INITIAL_SLOTS);
            assert_eq!(store.slot_count(), INITIAL_SLOTS.max(expected + 1));
        }
        let err = store
            .add_overlay(&[0.0, 1.0], &VertexSelection::All, None, &BuiltinColormap, &gray())
            .unwrap_err();
        assert_eq!(
            err,
            Error::SlotCapacity {
                requested: 4,
                capacity: 4
            }
        );
        assert_eq!(store.slot_count(), 4);
    }

    #[test]
    fn test_out_of_sequence_slot() {
        let mut store = OverlayStore::new(2, 8).unwrap();
        let err = store
            .add_overlay(&[0.0, 1.0], &VertexSelection::All, Some(3), &BuiltinColormap, &gray())
            .unwrap_err();
        assert_eq!(
            err,
            Error::SlotOutOfSequence {
                requested: 3,
                allocated: 2
            }
        );
        assert_eq!(store.slot_count(), 2);
        assert_eq!(store.used(), 0);
    }

    #[test]
    fn test_failed_add_leaves_store_untouched() {
        let mut store = OverlayStore::new(2, 4).unwrap();
        let err = store
            .add_overlay(
                &[0.0, 1.0],
                &VertexSelection::All,
                Some(2),
                &BuiltinColormap,
                &ColormapParams::named("unknown"),
            )
            .unwrap_err();
        assert_eq!(err, Error::UnknownColormap("unknown".to_string()));
        assert_eq!(store.slot_count(), 2);
        assert!(store
            .add_overlay(&[f32::NAN, 1.0], &VertexSelection::All, None, &BuiltinColormap, &gray())
            .is_err());
        assert_eq!(store.used(), 0);
    }

    #[test]
    fn test_update_colormap_only_touches_extremes() {
        let mut store = OverlayStore::new(3, 4).unwrap();
        store
            .add_overlay(
                &[0.0, 5.0, 10.0],
                &VertexSelection::All,
                None,
                &BuiltinColormap,
                &ColormapParams::default(),
            )
            .unwrap();
        let before = store.lut(0).unwrap().to_vec();
        let coords = store.coords_table();
        let params = ColormapParams {
            vmin: Some(0.5),
            vmax: Some(9.5),
            under: Some(Rgba::BLACK),
            over: Some(Rgba::WHITE),
            ..Default::default()
        };
        assert_eq!(store.update_colormap(None, &BuiltinColormap, &params).unwrap(), Some(0));
        let after = store.lut(0).unwrap();
        assert_eq!(after[0], Rgba::BLACK);
        assert_eq!(after[LUT_LEN - 1], Rgba::WHITE);
        let mid = (0.5 * (LUT_LEN - 1) as f32).round() as usize;
        assert_eq!(after[mid], before[mid]);
        assert_eq!(store.coords_table(), coords);
    }

    #[test]
    fn test_update_colormap_without_overlay() {
        let mut store = OverlayStore::new(3, 4).unwrap();
        assert_eq!(store.update_colormap(None, &BuiltinColormap, &gray()).unwrap(), None);
        assert_eq!(
            store.update_colormap(Some(1), &BuiltinColormap, &gray()).unwrap_err(),
            Error::UnknownSlot(1)
        );
    }

    #[test]
    fn test_composite_no_layer_is_background() {
        let store = OverlayStore::new(2, 4).unwrap();
        let bg = Rgba::new(0.3, 0.6, 0.9, 1.0);
        assert_eq!(store.composite(0, bg), Some(bg));
        assert_eq!(store.composite(2, bg), None);
    }

    #[test]
    fn test_composite_single_layer_is_exact_lut_color() {
        let mut store = OverlayStore::new(3, 4).unwrap();
        store
            .add_overlay(
                &[0.0, 5.0, 10.0],
                &VertexSelection::All,
                None,
                &BuiltinColormap,
                &ColormapParams::default(),
            )
            .unwrap();
        let expected = lut_lookup(store.lut(0).unwrap(), 0.5);
        assert_eq!(store.composite(1, Rgba::WHITE), Some(expected));
    }

    #[test]
    fn test_composite_layers_average() {
        let mut store = OverlayStore::new(1, 4).unwrap();
        // Single values give degenerate ranges, painted mid-colormap.
        store
            .add_overlay(&[0.0], &VertexSelection::All, Some(0), &BuiltinColormap, &gray())
            .unwrap();
        store
            .add_overlay(&[1.0], &VertexSelection::All, Some(1), &BuiltinColormap, &gray())
            .unwrap();
        let a = lut_lookup(store.lut(0).unwrap(), store.coords(0).unwrap()[0]);
        let b = lut_lookup(store.lut(1).unwrap(), store.coords(1).unwrap()[0]);
        let c = store.composite(0, Rgba::BLACK).unwrap();
        assert!((c.r - (a.r + b.r) / 2.0).abs() < 1e-6);
        assert!((c.a - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_tables_are_slot_major() {
        let mut store = OverlayStore::new(2, 4).unwrap();
        store
            .add_overlay(&[7.0], &VertexSelection::Indices(vec![1]), Some(0), &BuiltinColormap, &gray())
            .unwrap();
        assert_eq!(store.alphas_table(), vec![0.0, 1.0, 0.0, 0.0]);
        assert_eq!(store.lut_texture().len(), 2 * LUT_LEN);
    }
}
