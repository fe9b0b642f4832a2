// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cell items: creation, grid placement, states, place-holder
//! anchoring, and footprint queries.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Point;

use crate::event::{EventArgs, ItemEvent};
use crate::scene::{CellContent, INVALID, ItemContent, ItemId, LayerId, Scene, VisibilityBinding};
use crate::stage::Stage;
use crate::surface::Surface;

use super::def::{IsoDefinition, IsoError, IsoState};
use super::order;

impl<S: Surface> Scene<S> {
    /// The ordering facts of a cell item: row, col, rows, cols, z.
    pub(crate) fn cell_sort_key(&self, idx: u32) -> Option<(f64, f64, f64, f64, f64)> {
        match &self.content[idx as usize] {
            ItemContent::Cell(cell) => Some((
                cell.row,
                cell.col,
                f64::from(cell.size.0),
                f64::from(cell.size.1),
                cell.z,
            )),
            _ => None,
        }
    }

    /// The grid position of a cell item.
    #[must_use]
    pub fn cell_position(&self, id: ItemId) -> Option<(f64, f64)> {
        self.validate_item(id);
        match &self.content[id.idx as usize] {
            ItemContent::Cell(cell) => Some((cell.row, cell.col)),
            _ => None,
        }
    }

    /// The catalog type name of a cell item.
    #[must_use]
    pub fn cell_kind(&self, id: ItemId) -> Option<&str> {
        self.validate_item(id);
        match &self.content[id.idx as usize] {
            ItemContent::Cell(cell) => Some(cell.kind.as_str()),
            _ => None,
        }
    }

    /// The current state of a cell item.
    #[must_use]
    pub fn cell_state(&self, id: ItemId) -> Option<&IsoState> {
        self.validate_item(id);
        match &self.content[id.idx as usize] {
            ItemContent::Cell(cell) => Some(&cell.state),
            _ => None,
        }
    }

    /// Whether a cell item is horizontally flipped.
    #[must_use]
    pub fn cell_flip(&self, id: ItemId) -> Option<bool> {
        self.validate_item(id);
        match &self.content[id.idx as usize] {
            ItemContent::Cell(cell) => Some(cell.flip_h),
            _ => None,
        }
    }

    /// The paint-order key of a cell item.
    #[must_use]
    pub fn cell_z(&self, id: ItemId) -> Option<f64> {
        self.validate_item(id);
        match &self.content[id.idx as usize] {
            ItemContent::Cell(cell) => Some(cell.z),
            _ => None,
        }
    }
}

impl<S: Surface> Stage<S> {
    // -- Configuration ---------------------------------------------------

    /// Installs the isometric grid, catalog, and closed tag registry.
    ///
    /// Every definition's tag is checked against `tags`; an unknown tag
    /// aborts configuration. Tag order defines the z band: lower-index
    /// tags paint first.
    pub fn configure_iso(
        &mut self,
        grid: super::IsoGrid,
        catalog: super::IsoCatalog<S>,
        tags: Vec<String>,
    ) -> Result<(), IsoError> {
        catalog.validate(&tags)?;
        self.iso = Some(super::IsoContext {
            grid,
            catalog,
            tags,
            pending: Vec::new(),
        });
        Ok(())
    }

    /// The configured grid.
    #[must_use]
    pub fn iso_grid(&self) -> Option<&super::IsoGrid> {
        self.iso.as_ref().map(|ctx| &ctx.grid)
    }

    /// Replaces the grid definition (origin, cell size, multiplier).
    ///
    /// # Panics
    ///
    /// Panics if the isometric extension is not configured.
    pub fn set_iso_grid(&mut self, grid: super::IsoGrid) {
        let ctx = self
            .iso
            .as_mut()
            .expect("set_iso_grid requires configure_iso");
        ctx.grid = grid;
    }

    /// The configured catalog.
    #[must_use]
    pub fn iso_catalog(&self) -> Option<&super::IsoCatalog<S>> {
        self.iso.as_ref().map(|ctx| &ctx.catalog)
    }

    // -- Cell lifecycle --------------------------------------------------

    /// Creates a detached cell item of catalog type `kind`, optionally
    /// placed at a grid position.
    pub fn create_cell(
        &mut self,
        kind: &str,
        state: IsoState,
        flip_h: bool,
        position: Option<(f64, f64)>,
    ) -> Result<ItemId, IsoError> {
        let ctx = self.iso.as_mut().ok_or(IsoError::NotConfigured)?;
        let definition = ctx.catalog.definition(kind)?.clone();
        let definition = if flip_h {
            definition.flipped()
        } else {
            definition
        };
        let image = ctx.catalog.image(kind, &state, flip_h)?;
        let z = band_for(&ctx.tags, &definition.tag);
        let multiplier = ctx.grid.multiplier;
        let center = load_center(&definition, kind, &state, flip_h, &image, multiplier)?;

        let (w, h) = (f64::from(image.width()), f64::from(image.height()));
        let content = ItemContent::Cell(CellContent {
            source: image.clone(),
            display: image,
            kind: String::from(kind),
            state,
            flip_h,
            row: 0.0,
            col: 0.0,
            center,
            size: definition.size,
            z,
            visible_in: None,
        });
        let item = self
            .scene
            .alloc_item(kurbo::Rect::new(0.0, 0.0, w, h), content);
        if let Some((row, col)) = position {
            self.place_cell(item, row, col, None);
        }
        Ok(item)
    }

    /// Moves a cell item to a grid position, queueing the depth re-sort.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the item is not a cell.
    pub fn set_cell_position(&mut self, item: ItemId, row: f64, col: f64) {
        self.place_cell(item, row, col, None);
    }

    /// Places a cell, optionally overriding its z key.
    fn place_cell(&mut self, item: ItemId, row: f64, col: f64, z: Option<f64>) {
        self.scene.validate_item(item);
        let grid = self
            .iso
            .as_ref()
            .map(|ctx| ctx.grid)
            .expect("cell items require configure_iso");
        let idx = item.idx;
        let (center, rows) = {
            let ItemContent::Cell(cell) = &mut self.scene.content[idx as usize] else {
                panic!("set_cell_position on non-cell item {item:?}");
            };
            cell.row = row;
            cell.col = col;
            if let Some(z) = z {
                cell.z = z;
            }
            (cell.center, cell.size.0)
        };
        let pos = grid.screen_pos(row, col, center);
        self.scene.set_pos(item, pos);

        let owner = self.scene.owner[idx as usize];
        if owner != INVALID {
            if rows > 1 {
                let col_from = col;
                order::update_multi_row(&mut self.scene, owner, idx, row, rows, col_from);
                self.mark_cell_moved(owner, None);
            } else {
                self.mark_cell_moved(owner, Some(idx));
            }
        }
    }

    /// Changes a cell item's state: swaps to the state's image and
    /// center, re-evaluates the visibility of dependent items bound to
    /// this container, and fires
    /// [`StateChanged`](crate::event::ItemEvent::StateChanged).
    pub fn set_cell_state(&mut self, item: ItemId, state: IsoState) -> Result<(), IsoError> {
        self.scene.validate_item(item);
        let idx = item.idx;
        let (kind, flip_h, previous) = {
            let ItemContent::Cell(cell) = &self.scene.content[idx as usize] else {
                return Ok(());
            };
            if cell.state == state {
                return Ok(());
            }
            (cell.kind.clone(), cell.flip_h, cell.state.clone())
        };

        let ctx = self.iso.as_mut().ok_or(IsoError::NotConfigured)?;
        let definition = ctx.catalog.definition(&kind)?.clone();
        let definition = if flip_h {
            definition.flipped()
        } else {
            definition
        };
        let image = ctx.catalog.image(&kind, &state, flip_h)?;
        let multiplier = ctx.grid.multiplier;
        let center = load_center(&definition, &kind, &state, flip_h, &image, multiplier)?;

        let alpha = self.scene.item_alpha[idx as usize];
        let (w, h) = (f64::from(image.width()), f64::from(image.height()));
        let (row, col) = {
            let ItemContent::Cell(cell) = &mut self.scene.content[idx as usize] else {
                unreachable!("checked above");
            };
            cell.display = if alpha == 255 {
                image.clone()
            } else {
                alloc::rc::Rc::new(image.with_alpha(alpha))
            };
            cell.source = image;
            cell.state = state.clone();
            cell.center = center;
            (cell.row, cell.col)
        };
        self.scene.set_size(item, w, h);
        self.scene.mark_content(idx);
        self.place_cell(item, row, col, None);

        // Dependent items bound to this container's states follow along.
        for over in self.items_over(item) {
            let binding = match &self.scene.content[over.idx as usize] {
                ItemContent::Cell(cell) => cell.visible_in.clone(),
                _ => None,
            };
            if let Some(binding) = binding
                && binding.container_kind == kind
            {
                self.scene
                    .set_visible(over, binding.visible_in.contains(&state.name));
            }
        }

        self.fire(
            item,
            ItemEvent::StateChanged,
            &EventArgs::StateChanged { previous },
        );
        Ok(())
    }

    /// Flips a cell item horizontally, swapping to the mirrored image
    /// and definition.
    pub fn set_cell_flip(&mut self, item: ItemId, flip_h: bool) -> Result<(), IsoError> {
        self.scene.validate_item(item);
        let idx = item.idx;
        let (kind, state, old_rows, row, col) = {
            let ItemContent::Cell(cell) = &self.scene.content[idx as usize] else {
                return Ok(());
            };
            if cell.flip_h == flip_h {
                return Ok(());
            }
            (
                cell.kind.clone(),
                cell.state.clone(),
                cell.size.0,
                cell.row,
                cell.col,
            )
        };

        let ctx = self.iso.as_mut().ok_or(IsoError::NotConfigured)?;
        let definition = ctx.catalog.definition(&kind)?.clone();
        let definition = if flip_h {
            definition.flipped()
        } else {
            definition
        };
        let image = ctx.catalog.image(&kind, &state, flip_h)?;
        let multiplier = ctx.grid.multiplier;
        let center = load_center(&definition, &kind, &state, flip_h, &image, multiplier)?;

        let alpha = self.scene.item_alpha[idx as usize];
        {
            let ItemContent::Cell(cell) = &mut self.scene.content[idx as usize] else {
                unreachable!("checked above");
            };
            cell.display = if alpha == 255 {
                image.clone()
            } else {
                alloc::rc::Rc::new(image.with_alpha(alpha))
            };
            cell.source = image;
            cell.flip_h = flip_h;
            cell.center = center;
            cell.size = definition.size;
        }
        self.scene.mark_content(idx);

        // A footprint change invalidates the multi-row bookkeeping.
        let owner = self.scene.owner[idx as usize];
        if old_rows > 1 && owner != INVALID {
            self.scene.layer_multi_row[owner as usize].retain(|e| e.item != idx);
            self.mark_cell_moved(owner, None);
        }
        self.place_cell(item, row, col, None);
        Ok(())
    }

    // -- Place holders ---------------------------------------------------

    /// Centers a cell item on a named place holder of `container`,
    /// assigning the anchor's fractional z key (`below` shifts one band
    /// down). With `visible_in`, the item is only visible while the
    /// container (matched by type name) is in one of the listed states.
    pub fn set_to_place_holder(
        &mut self,
        item: ItemId,
        container: ItemId,
        place_holder: &str,
        below: bool,
        visible_in: Option<Vec<String>>,
    ) -> Result<(), IsoError> {
        self.scene.validate_item(item);
        self.scene.validate_item(container);

        let (ckind, cflip, ccenter, cz, cstate) = {
            let ItemContent::Cell(cell) = &self.scene.content[container.idx as usize] else {
                return Err(IsoError::MissingDefinition(String::from("<container>")));
            };
            (
                cell.kind.clone(),
                cell.flip_h,
                cell.center,
                cell.z,
                cell.state.clone(),
            )
        };
        let (kind, state, flip_h) = {
            let ItemContent::Cell(cell) = &self.scene.content[item.idx as usize] else {
                return Err(IsoError::MissingDefinition(String::from("<item>")));
            };
            (cell.kind.clone(), cell.state.clone(), cell.flip_h)
        };

        let ctx = self.iso.as_mut().ok_or(IsoError::NotConfigured)?;
        let grid = ctx.grid;
        let container_def = ctx.catalog.definition(&ckind)?.clone();
        let container_def = if cflip {
            container_def.flipped()
        } else {
            container_def
        };
        let anchor = container_def.place_holder(&ckind, place_holder)?.clone();

        // The anchor's grid cell, read off the container's current
        // screen position.
        let cbounds = self.scene.bounds[container.idx as usize];
        let m = grid.multiplier;
        let (ph_row, ph_col) = grid.rowcol_at(
            cbounds.x0 + (ccenter.x + anchor.x) * m,
            cbounds.y0 + (ccenter.y + anchor.y) * m,
        );
        let (crow, ccol) = {
            let ItemContent::Cell(cell) = &self.scene.content[container.idx as usize] else {
                unreachable!("checked above");
            };
            (cell.row, cell.col)
        };
        let (ph_row, ph_col) = (ph_row as f64, ph_col as f64);
        let drow = ph_row - crow;
        let dcol = ph_col - ccol;

        // Re-derive the item's own base center, then shift it so the
        // item draws centered over the anchor (height lifts it up).
        let ctx = self.iso.as_mut().ok_or(IsoError::NotConfigured)?;
        let definition = ctx.catalog.definition(&kind)?.clone();
        let definition = if flip_h {
            definition.flipped()
        } else {
            definition
        };
        let image = ctx.catalog.image(&kind, &state, flip_h)?;
        let base = load_center(&definition, &kind, &state, flip_h, &image, m)?;
        let center = Point::new(
            base.x - anchor.x + (dcol - drow) * grid.cell_width / 2.0,
            base.y - (anchor.y - anchor.height) + (dcol + drow) * grid.cell_height / 2.0,
        );

        let mut z = anchor.z_key(ccenter, cz);
        if below {
            z -= 1.0;
        }

        {
            let ItemContent::Cell(cell) = &mut self.scene.content[item.idx as usize] else {
                unreachable!("checked above");
            };
            cell.center = center;
            cell.visible_in = visible_in.clone().map(|states| VisibilityBinding {
                container_kind: ckind,
                visible_in: states,
            });
        }
        if let Some(states) = visible_in {
            self.scene
                .set_visible(item, states.contains(&cstate.name));
        }
        self.place_cell(item, ph_row, ph_col, Some(z));
        Ok(())
    }

    // -- Footprint queries -----------------------------------------------

    /// The cell items painting after `item` whose footprint overlaps it,
    /// in paint order. Stops at the first non-overlapping item.
    pub fn items_over(&mut self, item: ItemId) -> Vec<ItemId> {
        self.resolve_iso_pending();
        let mut over = Vec::new();
        let Some(layer) = self.scene.item_layer(item) else {
            return over;
        };
        let Some((row, col, rows, cols, _)) = self.scene.cell_sort_key(item.idx) else {
            return over;
        };
        let items = self.scene.layer_items[layer.idx as usize].clone();
        let Some(start) = items.iter().position(|&idx| idx == item.idx) else {
            return over;
        };
        for &idx in &items[start + 1..] {
            let Some((crow, ccol, crows, ccols, _)) = self.scene.cell_sort_key(idx) else {
                break;
            };
            if order::footprints_overlap((row, col), (rows, cols), (crow, ccol), (crows, ccols)) {
                over.push(self.scene.item_id_at(idx));
            } else {
                break;
            }
        }
        over
    }

    /// The first cell item in `item`'s layer whose footprint would
    /// collide if `item` moved to `(row, col)`. `None` when the spot is
    /// free — never an error.
    pub fn collision_test(&mut self, item: ItemId, row: f64, col: f64) -> Option<ItemId> {
        self.resolve_iso_pending();
        let layer = self.scene.item_layer(item)?;
        let (_, _, rows, cols, _) = self.scene.cell_sort_key(item.idx)?;
        let items = self.scene.layer_items[layer.idx as usize].clone();
        for idx in items {
            if idx == item.idx {
                continue;
            }
            let Some((crow, ccol, crows, ccols, _)) = self.scene.cell_sort_key(idx) else {
                continue;
            };
            if crow < row + rows && ccol < col + cols && crow + crows > row && ccol + ccols > col {
                return Some(self.scene.item_id_at(idx));
            }
        }
        None
    }

    // -- Stage bookkeeping -----------------------------------------------

    /// Applies queued depth re-sorts (called before hit tests and before
    /// rendering).
    pub(crate) fn resolve_iso_pending(&mut self) {
        if let Some(ctx) = &mut self.iso
            && !ctx.pending.is_empty()
        {
            order::resolve(&mut self.scene, &mut ctx.pending);
        }
    }

    /// Queues a full re-sort for a newly staged layer.
    pub(crate) fn mark_layer_positions(&mut self, layer: LayerId) {
        self.mark_cell_moved(layer.idx, None);
    }

    fn mark_cell_moved(&mut self, layer: u32, item: Option<u32>) {
        if let Some(ctx) = &mut self.iso {
            order::mark_moved(&mut ctx.pending, layer, item);
        }
    }

    /// Registers the iso bookkeeping for a cell item that just joined a
    /// layer.
    pub(crate) fn note_cell_attached(&mut self, layer: LayerId, item: ItemId) {
        if self.iso.is_none() {
            return;
        }
        let Some((row, col, rows, _, _)) = self.scene.cell_sort_key(item.idx) else {
            return;
        };
        #[expect(
            clippy::cast_possible_truncation,
            reason = "footprint rows come from a u32 definition field"
        )]
        let rows_u = rows as u32;
        if rows_u > 1 {
            order::update_multi_row(&mut self.scene, layer.idx, item.idx, row, rows_u, col);
            self.mark_cell_moved(layer.idx, None);
        } else {
            self.mark_cell_moved(layer.idx, Some(item.idx));
        }
    }

    /// Registers the iso bookkeeping for a cell item about to leave its
    /// layer.
    pub(crate) fn note_cell_detached(&mut self, item: ItemId) {
        if self.iso.is_none() {
            return;
        }
        let Some(layer) = self.scene.item_layer(item) else {
            return;
        };
        let Some((_, _, rows, _, _)) = self.scene.cell_sort_key(item.idx) else {
            return;
        };
        if rows > 1.0 {
            self.mark_cell_moved(layer.idx, None);
        }
    }
}

impl<S: Surface> Scene<S> {
    fn content_image_width(&self, idx: u32) -> u32 {
        match &self.content[idx as usize] {
            ItemContent::Cell(cell) => cell.display.width(),
            _ => 0,
        }
    }

    fn content_image_height(&self, idx: u32) -> u32 {
        match &self.content[idx as usize] {
            ItemContent::Cell(cell) => cell.display.height(),
            _ => 0,
        }
    }
}

/// The z band for a tag: its index in the registry, or a distant band
/// for unregistered tags (kept out of validated catalogs).
fn band_for(tags: &[String], tag: &str) -> f64 {
    match tags.iter().position(|t| t == tag) {
        Some(index) => index as f64,
        None => 999.0,
    }
}

/// The image center for a state, flip-adjusted the way the projection
/// expects.
fn load_center<S: Surface>(
    definition: &IsoDefinition,
    kind: &str,
    state: &IsoState,
    flip_h: bool,
    image: &alloc::rc::Rc<S>,
    multiplier: f64,
) -> Result<Point, IsoError> {
    let mut center = definition.state_center(kind, state)?;
    if flip_h {
        center.x = f64::from(image.width()) / multiplier - center.x;
    }
    Ok(center)
}
