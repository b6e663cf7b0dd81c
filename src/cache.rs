//! Incremental world to screen transform cache.
//!
//! Panning is the most frequent map interaction and overlay geometries can
//! carry many vertices, so a cache keeps the screen polylines from its last
//! full projection and, as long as only the translation part of the
//! projection changed, shifts them by a single screen-space delta instead of
//! projecting every vertex again.

use glam::DVec2;
use tracing::trace;

use crate::geometry::{Polyline, WorldPoint};
use crate::projection::ProjectionContext;

/// The projection a cache's polylines were last brought up to date with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheAnchor {
    context: ProjectionContext,
}

impl CacheAnchor {
    pub fn world_corner(&self) -> WorldPoint {
        self.context.world_corner()
    }

    pub fn scale(&self) -> f64 {
        self.context.scale()
    }

    pub fn rotation(&self) -> f64 {
        self.context.rotation()
    }

    pub fn viewport_size(&self) -> DVec2 {
        self.context.viewport_size()
    }
}

/// Screen polylines plus the anchor they are valid under.
#[derive(Debug, Clone, Default)]
pub struct ScreenPolylineCache {
    anchor: Option<CacheAnchor>,
    polylines: Vec<Polyline>,
}

impl ScreenPolylineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the cached polylines up to date with `context`.
    ///
    /// `source` projects the raw geometry and is only called when a full
    /// recompute is needed: on first use, after [`invalidate`](Self::invalidate),
    /// while the cache is empty, or when scale or rotation changed. A pure
    /// translation shifts the cached points in place.
    ///
    /// Returns whether the polylines changed.
    pub fn update<F>(&mut self, context: &ProjectionContext, source: F) -> bool
    where
        F: FnOnce(&ProjectionContext) -> Vec<Polyline>,
    {
        let Some(anchor) = self.anchor else {
            self.recompute(context, source);
            return true;
        };

        if !context.is_translation_of(&anchor.context) {
            trace!(
                scale = context.scale(),
                rotation = context.rotation(),
                "scale or rotation changed, reprojecting"
            );
            self.recompute(context, source);
            return true;
        }

        if self.polylines.is_empty() {
            // Empty source data may have grown since the last projection.
            self.recompute(context, source);
            return !self.polylines.is_empty();
        }

        if anchor.context == *context {
            return false;
        }

        // Both projections share their linear part, so any world point moves
        // by the same screen delta.
        let reference = anchor.world_corner();
        let delta = context.project(reference) - anchor.context.project(reference);
        for point in self.polylines.iter_mut().flatten() {
            *point += delta;
        }
        self.anchor = Some(CacheAnchor { context: *context });
        trace!(?delta, points = self.point_count(), "translated cached polylines");
        true
    }

    fn recompute<F>(&mut self, context: &ProjectionContext, source: F)
    where
        F: FnOnce(&ProjectionContext) -> Vec<Polyline>,
    {
        self.polylines = source(context);
        self.anchor = Some(CacheAnchor { context: *context });
        trace!(
            polylines = self.polylines.len(),
            points = self.point_count(),
            "reprojected polylines"
        );
    }

    /// Force the next [`update`](Self::update) to reproject from source.
    ///
    /// The current polylines stay readable until then.
    pub fn invalidate(&mut self) {
        self.anchor = None;
    }

    /// Drop the polylines and the anchor.
    pub fn clear(&mut self) {
        self.anchor = None;
        self.polylines.clear();
    }

    pub fn anchor(&self) -> Option<CacheAnchor> {
        self.anchor
    }

    pub fn polylines(&self) -> &[Polyline] {
        &self.polylines
    }

    pub fn point_count(&self) -> usize {
        self.polylines.iter().map(Vec::len).sum()
    }
}
