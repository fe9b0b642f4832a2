// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cell definitions, states, place holders, and the validated catalog.
//!
//! Definitions and their images are supplied programmatically (decoding
//! and persisted level formats are collaborators' concerns). The catalog
//! is validated against the closed tag registry when installed: a
//! definition carrying an unknown tag is a configuration error at load
//! time, not a runtime lookup failure.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Point;

use crate::surface::Surface;

/// Errors raised while configuring or using the isometric extension.
///
/// All of these are fatal configuration/resource conditions: the scene
/// must not come up half-initialized on top of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IsoError {
    /// The stage has no isometric grid/catalog configured.
    NotConfigured,
    /// No definition exists for the named item type.
    MissingDefinition(String),
    /// A definition's tag is not in the tag registry.
    UnknownTag {
        /// The item type carrying the tag.
        kind: String,
        /// The unregistered tag.
        tag: String,
    },
    /// A state was requested that the definition does not declare.
    UnknownState {
        /// The item type.
        kind: String,
        /// The undeclared state name.
        state: String,
    },
    /// No image is registered under the derived key.
    MissingImage(String),
    /// The named place holder does not exist on the container's
    /// definition.
    MissingPlaceHolder {
        /// The container item type.
        kind: String,
        /// The requested place-holder tag.
        tag: String,
    },
}

impl core::fmt::Display for IsoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "isometric grid is not configured on this stage"),
            Self::MissingDefinition(kind) => {
                write!(f, "missing definition for item '{kind}'")
            }
            Self::UnknownTag { kind, tag } => {
                write!(f, "item '{kind}' uses tag '{tag}' which is not registered")
            }
            Self::UnknownState { kind, state } => {
                write!(f, "state '{state}' is not defined for item '{kind}'")
            }
            Self::MissingImage(key) => write!(f, "no image registered for '{key}'"),
            Self::MissingPlaceHolder { kind, tag } => {
                write!(f, "item '{kind}' has no place holder '{tag}'")
            }
        }
    }
}

impl core::error::Error for IsoError {}

/// A named state of a cell item (e.g. a door that can be open or
/// closed). The suffix selects the state's image variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IsoState {
    /// State name.
    pub name: String,
    /// Image key suffix; empty for the default state.
    pub suffix: String,
}

impl IsoState {
    /// The default state (empty suffix).
    #[must_use]
    pub fn base() -> Self {
        Self {
            name: String::new(),
            suffix: String::new(),
        }
    }

    /// Creates a named state.
    #[must_use]
    pub fn new(name: &str, suffix: &str) -> Self {
        Self {
            name: String::from(name),
            suffix: String::from(suffix),
        }
    }

    /// Whether this is the default state.
    #[must_use]
    pub fn is_base(&self) -> bool {
        self.suffix.is_empty()
    }
}

/// A per-state override of the image center.
#[derive(Clone, Debug, PartialEq)]
pub struct IsoDefState {
    /// State name this entry applies to.
    pub name: String,
    /// Center of the topmost cell in the state's image.
    pub center: Point,
}

/// An anchor point on a cell item where dependent items can sit.
#[derive(Clone, Debug, PartialEq)]
pub struct IsoPlaceHolder {
    /// Name of the anchor.
    pub tag: String,
    /// X offset from the item's center, in image pixels.
    pub x: f64,
    /// Y offset from the item's center, in image pixels.
    pub y: f64,
    /// Height of the anchor above the ground plane.
    pub height: f64,
}

impl IsoPlaceHolder {
    /// Creates a place holder.
    #[must_use]
    pub fn new(tag: &str, x: f64, y: f64, height: f64) -> Self {
        Self {
            tag: String::from(tag),
            x,
            y,
            height,
        }
    }

    /// The paint-order key an item anchored here receives: the
    /// container's band with a fraction breaking ties between anchors by
    /// their on-image position.
    #[must_use]
    pub fn z_key(&self, container_center: Point, container_z: f64) -> f64 {
        container_z.floor()
            + ((container_center.y + self.y) * 2048.0 + (container_center.x + self.x)) / 4_194_304.0
    }
}

/// The definition of a cell item type.
#[derive(Clone, Debug, PartialEq)]
pub struct IsoDefinition {
    /// Center of the topmost cell inside the default-state image.
    pub center: Point,
    /// Footprint in cells: (rows, cols).
    pub size: (u32, u32),
    /// Anchors where dependent items can be placed.
    pub place_holders: Vec<IsoPlaceHolder>,
    /// Paint-order tag; must be present in the tag registry.
    pub tag: String,
    /// Non-default states and their center overrides.
    pub states: Vec<IsoDefState>,
}

impl IsoDefinition {
    /// The center to use for a state, or an error naming the undeclared
    /// state.
    pub(crate) fn state_center(&self, kind: &str, state: &IsoState) -> Result<Point, IsoError> {
        if state.is_base() {
            return Ok(self.center);
        }
        self.states
            .iter()
            .find(|s| s.name == state.name)
            .map(|s| s.center)
            .ok_or_else(|| IsoError::UnknownState {
                kind: String::from(kind),
                state: state.name.clone(),
            })
    }

    /// The named place holder, or an error.
    pub(crate) fn place_holder(&self, kind: &str, tag: &str) -> Result<&IsoPlaceHolder, IsoError> {
        self.place_holders
            .iter()
            .find(|p| p.tag == tag)
            .ok_or_else(|| IsoError::MissingPlaceHolder {
                kind: String::from(kind),
                tag: String::from(tag),
            })
    }

    /// The definition seen by a horizontally flipped item: footprint
    /// swapped, place-holder x offsets negated.
    #[must_use]
    pub(crate) fn flipped(&self) -> Self {
        Self {
            center: self.center,
            size: (self.size.1, self.size.0),
            place_holders: self
                .place_holders
                .iter()
                .map(|p| IsoPlaceHolder {
                    tag: p.tag.clone(),
                    x: -p.x,
                    y: p.y,
                    height: p.height,
                })
                .collect(),
            tag: self.tag.clone(),
            states: self.states.clone(),
        }
    }
}

/// The definition and image registry for one item set.
pub struct IsoCatalog<S: Surface> {
    definitions: BTreeMap<String, IsoDefinition>,
    images: BTreeMap<String, Rc<S>>,
}

impl<S: Surface> core::fmt::Debug for IsoCatalog<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IsoCatalog")
            .field("definitions", &self.definitions.len())
            .field("images", &self.images.len())
            .finish_non_exhaustive()
    }
}

impl<S: Surface> Default for IsoCatalog<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Surface> IsoCatalog<S> {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self {
            definitions: BTreeMap::new(),
            images: BTreeMap::new(),
        }
    }

    /// Registers a definition under an item type name.
    pub fn insert_definition(&mut self, kind: &str, definition: IsoDefinition) {
        self.definitions.insert(String::from(kind), definition);
    }

    /// Registers the image for `kind` in `state`.
    pub fn insert_image(&mut self, kind: &str, state: &IsoState, image: Rc<S>) {
        self.images.insert(image_key(kind, state, false), image);
    }

    /// Looks up a definition.
    pub fn definition(&self, kind: &str) -> Result<&IsoDefinition, IsoError> {
        self.definitions
            .get(kind)
            .ok_or_else(|| IsoError::MissingDefinition(String::from(kind)))
    }

    /// Iterates over `(kind, definition)` pairs.
    pub fn definitions(&self) -> impl Iterator<Item = (&str, &IsoDefinition)> {
        self.definitions.iter().map(|(k, d)| (k.as_str(), d))
    }

    /// The item types whose definition carries `tag`.
    #[must_use]
    pub fn kinds_with_tag(&self, tag: &str) -> Vec<&str> {
        self.definitions
            .iter()
            .filter(|(_, d)| d.tag == tag)
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Checks every definition's tag against the registry.
    pub fn validate(&self, tags: &[String]) -> Result<(), IsoError> {
        for (kind, def) in &self.definitions {
            if !tags.contains(&def.tag) {
                return Err(IsoError::UnknownTag {
                    kind: kind.clone(),
                    tag: def.tag.clone(),
                });
            }
        }
        Ok(())
    }

    /// The image for `kind` in `state`, deriving and caching the flipped
    /// variant on first use.
    pub fn image(&mut self, kind: &str, state: &IsoState, flip_h: bool) -> Result<Rc<S>, IsoError> {
        let key = image_key(kind, state, flip_h);
        if let Some(image) = self.images.get(&key) {
            return Ok(image.clone());
        }
        if flip_h {
            let base = self
                .images
                .get(&image_key(kind, state, false))
                .ok_or_else(|| IsoError::MissingImage(key.clone()))?;
            let flipped = Rc::new(base.flipped_h());
            self.images.insert(key, flipped.clone());
            return Ok(flipped);
        }
        Err(IsoError::MissingImage(key))
    }
}

/// Builds the image-registry key for a type/state/flip combination.
fn image_key(kind: &str, state: &IsoState, flip_h: bool) -> String {
    let mut key = String::from(kind);
    if !state.suffix.is_empty() {
        key.push('_');
        key.push_str(&state.suffix);
    }
    if flip_h {
        key.push_str("?H");
    }
    key
}
